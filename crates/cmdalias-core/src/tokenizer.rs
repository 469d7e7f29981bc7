//! Mapping tokenizer: splits an alias mapping into individual commands.
//!
//! Two conventions are supported:
//!
//! - **Prefix-token** (default): the mapping is lexed into shell-style words
//!   (single and double quotes group whitespace, backslash escapes the next
//!   character). A word starting with the command prefix begins a new
//!   command. A standalone unquoted separator also ends the current command,
//!   so `a b ; /c` and `a b /c` split the same way.
//! - **Delimiter**: the mapping is split on a literal separator character.
//!
//! Quotes are preserved in the emitted command text so the downstream
//! interpreter sees arguments exactly as the operator wrote them. The one
//! exception is a word that is entirely quoted and starts with the command
//! prefix: it is a whole command grouped by the operator and is emitted
//! without its quotes.
//!
//! [`Tokenizer::split_words`] applies the same conventions to words that a
//! shell has already split, such as command-line arguments.

use std::iter::Peekable;
use std::str::CharIndices;

/// Errors produced while splitting a mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("unterminated {quote} quote starting at offset {offset}")]
    Malformed { quote: char, offset: usize },

    #[error("no commands supplied")]
    Empty,

    #[error("command contains a NUL byte")]
    Nul,
}

/// How a mapping string is split into commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Convention {
    #[default]
    PrefixToken,
    Delimiter,
}

/// Splits alias mappings into ordered command lists.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    convention: Convention,
    prefix: char,
    separator: char,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(Convention::PrefixToken, '/', ';')
    }
}

impl Tokenizer {
    pub fn new(convention: Convention, prefix: char, separator: char) -> Self {
        Self {
            convention,
            prefix,
            separator,
        }
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// The character that marks the start of a command.
    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Split `mapping` into non-empty commands, in order.
    pub fn split(&self, mapping: &str) -> Result<Vec<String>, MappingError> {
        let commands = match self.convention {
            Convention::PrefixToken => self.split_prefixed(mapping)?,
            Convention::Delimiter => mapping
                .split(self.separator)
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        };

        if commands.is_empty() {
            return Err(MappingError::Empty);
        }
        Ok(commands)
    }

    /// Group words that were already split by a shell (command-line
    /// arguments) into commands.
    ///
    /// Words are taken literally; no quotes or escapes are interpreted.
    ///
    /// - Prefix-token: a word starting with the prefix begins a new command
    ///   and a word equal to the separator ends one. Other words are appended
    ///   to the current command, re-quoted if they contain whitespace.
    /// - Delimiter: if any word contains the separator the words are joined
    ///   with spaces and split on it, otherwise each word is one command.
    pub fn split_words<S: AsRef<str>>(
        &self,
        words: &[S],
    ) -> Result<Vec<String>, MappingError> {
        let words: Vec<&str> = words.iter().map(|w| w.as_ref().trim()).collect();
        let commands = match self.convention {
            Convention::PrefixToken => self.group_words(&words)?,
            Convention::Delimiter if words.iter().any(|w| w.contains(self.separator)) => {
                return self.split(&words.join(" "));
            }
            Convention::Delimiter => words
                .into_iter()
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect(),
        };

        if commands.is_empty() {
            return Err(MappingError::Empty);
        }
        Ok(commands)
    }

    fn group_words(&self, words: &[&str]) -> Result<Vec<String>, MappingError> {
        let mut commands = Vec::new();
        let mut current = String::new();

        for &word in words {
            if word.is_empty() {
                continue;
            }
            let is_separator = word.chars().eq(std::iter::once(self.separator));
            if (is_separator || word.starts_with(self.prefix)) && !current.is_empty() {
                commands.push(std::mem::take(&mut current));
            }
            if is_separator {
                continue;
            }

            if current.is_empty() {
                current.push_str(word);
            } else if word.contains(char::is_whitespace) {
                let quoted = shlex::try_quote(word).map_err(|_| MappingError::Nul)?;
                current.push(' ');
                current.push_str(&quoted);
            } else {
                current.push(' ');
                current.push_str(word);
            }
        }
        if !current.is_empty() {
            commands.push(current);
        }

        Ok(commands)
    }

    fn split_prefixed(&self, mapping: &str) -> Result<Vec<String>, MappingError> {
        let mut lexer = Lexer::new(mapping, Some(self.separator));
        let mut commands = Vec::new();
        let mut current: Vec<String> = Vec::new();

        let flush = |current: &mut Vec<String>, commands: &mut Vec<String>| {
            if !current.is_empty() {
                commands.push(current.join(" "));
                current.clear();
            }
        };

        while let Some(lexeme) = lexer.next_lexeme()? {
            match lexeme {
                Lexeme::Separator => flush(&mut current, &mut commands),
                Lexeme::Word(word) => {
                    if word.whole_quoted && word.text.starts_with(self.prefix) {
                        flush(&mut current, &mut commands);
                        current.push(word.text);
                    } else {
                        if word.raw.starts_with(self.prefix) {
                            flush(&mut current, &mut commands);
                        }
                        current.push(word.raw);
                    }
                }
            }
        }
        flush(&mut current, &mut commands);

        Ok(commands)
    }
}

/// Peel the first shell-style word off `text`.
///
/// Returns the unquoted word and the untouched remainder with leading
/// whitespace removed, or `None` if `text` is blank.
pub fn split_first_token(text: &str) -> Result<Option<(String, &str)>, MappingError> {
    let mut lexer = Lexer::new(text, None);
    match lexer.next_lexeme()? {
        Some(Lexeme::Word(word)) => {
            let rest = text[lexer.offset()..].trim_start();
            Ok(Some((word.text, rest)))
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Default)]
struct Word {
    /// Source text including quotes and escapes.
    raw: String,
    /// Text with quotes and escapes removed.
    text: String,
    /// The word is exactly one quoted span.
    whole_quoted: bool,
}

#[derive(Debug)]
enum Lexeme {
    Word(Word),
    Separator,
}

struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    separator: Option<char>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, separator: Option<char>) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            separator,
        }
    }

    /// Byte offset of the next unread character.
    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len())
    }

    fn next_lexeme(&mut self) -> Result<Option<Lexeme>, MappingError> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some(&(_, first)) = self.chars.peek() else {
            return Ok(None);
        };
        if Some(first) == self.separator {
            self.chars.next();
            return Ok(Some(Lexeme::Separator));
        }

        let mut word = Word::default();
        while let Some(&(idx, c)) = self.chars.peek() {
            if c.is_whitespace() || Some(c) == self.separator {
                break;
            }
            self.chars.next();
            word.whole_quoted = false;

            match c {
                '"' | '\'' => self.quoted(&mut word, c, idx)?,
                '\\' => {
                    word.raw.push(c);
                    match self.chars.next() {
                        Some((_, escaped)) => {
                            word.raw.push(escaped);
                            word.text.push(escaped);
                        }
                        None => word.text.push(c),
                    }
                }
                _ => {
                    word.raw.push(c);
                    word.text.push(c);
                }
            }
        }

        Ok(Some(Lexeme::Word(word)))
    }

    fn quoted(&mut self, word: &mut Word, quote: char, offset: usize) -> Result<(), MappingError> {
        let opens_word = word.raw.is_empty();
        word.raw.push(quote);

        loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(MappingError::Malformed { quote, offset });
            };
            word.raw.push(c);
            if c == quote {
                break;
            }
            if c == '\\' && quote == '"' {
                let Some((_, escaped)) = self.chars.next() else {
                    return Err(MappingError::Malformed { quote, offset });
                };
                word.raw.push(escaped);
                word.text.push(escaped);
                continue;
            }
            word.text.push(c);
        }

        word.whole_quoted = opens_word;
        Ok(())
    }
}
