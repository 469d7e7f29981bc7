//! Operator command surface.
//!
//! Recognises `alias.add`, `alias.remove`, `alias.list`, and `alias.switch`
//! (the namespace is configurable) in raw text. A leading command prefix
//! such as `/` is accepted but not required. Execution lives in the engine.

use crate::tokenizer::{MappingError, split_first_token};

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasCommand {
    /// Create or update `name` from a raw mapping string.
    Add { name: String, mapping: String },
    /// Delete `name`.
    Remove { name: String },
    /// List every alias.
    List,
    /// Query (`None`) or switch the session's active group.
    Switch { group: Option<String> },
}

impl AliasCommand {
    /// Verb used for logging.
    pub fn verb(&self) -> &'static str {
        match self {
            AliasCommand::Add { .. } => "add",
            AliasCommand::Remove { .. } => "remove",
            AliasCommand::List => "list",
            AliasCommand::Switch { .. } => "switch",
        }
    }
}

/// A recognised operator command with unusable arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("malformed arguments: {0}")]
    Malformed(String),
}

impl From<MappingError> for CommandError {
    fn from(e: MappingError) -> Self {
        CommandError::Malformed(e.to_string())
    }
}

/// Parses operator commands out of raw text.
#[derive(Debug, Clone)]
pub struct CommandParser {
    namespace: String,
    prefix: char,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new("alias", '/')
    }
}

impl CommandParser {
    pub fn new(namespace: impl Into<String>, prefix: char) -> Self {
        Self {
            namespace: namespace.into(),
            prefix,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Parse `text` as an operator command.
    ///
    /// Returns `None` when `text` is not an operator command at all, so it
    /// can fall through to alias matching.
    pub fn parse(&self, text: &str) -> Option<Result<AliasCommand, CommandError>> {
        let text = text.trim();
        let text = text.strip_prefix(self.prefix).unwrap_or(text);
        let rest = text.strip_prefix(self.namespace.as_str())?.strip_prefix('.')?;

        let (verb, args) = match rest.find(char::is_whitespace) {
            Some(i) => (&rest[..i], rest[i..].trim()),
            None => (rest, ""),
        };

        let ns = &self.namespace;
        let parsed = match verb {
            "add" => self.parse_add(args),
            "remove" | "rm" => single_arg(args).and_then(|name| {
                name.map(|name| AliasCommand::Remove { name })
                    .ok_or_else(|| CommandError::Usage(format!("{ns}.remove <name>")))
            }),
            "list" | "ls" => Ok(AliasCommand::List),
            "switch" => single_arg(args).map(|group| AliasCommand::Switch { group }),
            _ => return None,
        };
        Some(parsed)
    }

    fn parse_add(&self, args: &str) -> Result<AliasCommand, CommandError> {
        let usage = || CommandError::Usage(format!("{}.add <name> <commands...>", self.namespace));
        let (name, mapping) = split_first_token(args)?.ok_or_else(usage)?;
        if name.trim().is_empty() {
            return Err(usage());
        }
        Ok(AliasCommand::Add {
            name,
            mapping: mapping.to_string(),
        })
    }
}

/// Parse zero or one shell-style argument.
fn single_arg(args: &str) -> Result<Option<String>, CommandError> {
    let mut words = shlex::split(args)
        .ok_or_else(|| CommandError::Malformed("unbalanced quotes".to_string()))?;
    match words.len() {
        0 | 1 => Ok(words.pop()),
        n => Err(CommandError::Usage(format!(
            "expected a single argument, got {n}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Option<Result<AliasCommand, CommandError>> {
        CommandParser::default().parse(text)
    }

    #[test]
    fn test_parse_add() {
        assert_eq!(
            parse("alias.add combo /cmd1 /cmd2 {args}"),
            Some(Ok(AliasCommand::Add {
                name: "combo".to_string(),
                mapping: "/cmd1 /cmd2 {args}".to_string(),
            }))
        );
    }

    #[test]
    fn test_parse_add_with_prefix_and_quoted_name() {
        assert_eq!(
            parse(r#"/alias.add "good night" "/say bye" /quit"#),
            Some(Ok(AliasCommand::Add {
                name: "good night".to_string(),
                mapping: r#""/say bye" /quit"#.to_string(),
            }))
        );
    }

    #[test]
    fn test_parse_add_without_commands_keeps_empty_mapping() {
        assert_eq!(
            parse("alias.add lonely"),
            Some(Ok(AliasCommand::Add {
                name: "lonely".to_string(),
                mapping: String::new(),
            }))
        );
    }

    #[test]
    fn test_parse_add_without_name_is_usage_error() {
        assert!(matches!(parse("alias.add"), Some(Err(CommandError::Usage(_)))));
        assert!(matches!(parse("alias.add \"\" /x"), Some(Err(CommandError::Usage(_)))));
    }

    #[test]
    fn test_parse_remove() {
        assert_eq!(
            parse("alias.remove hi"),
            Some(Ok(AliasCommand::Remove {
                name: "hi".to_string()
            }))
        );
        assert!(matches!(parse("alias.remove"), Some(Err(CommandError::Usage(_)))));
        assert!(matches!(parse("alias.remove a b"), Some(Err(CommandError::Usage(_)))));
        assert!(matches!(
            parse("alias.remove 'open"),
            Some(Err(CommandError::Malformed(_)))
        ));
    }

    #[test]
    fn test_parse_list_and_switch() {
        assert_eq!(parse("  alias.list  "), Some(Ok(AliasCommand::List)));
        assert_eq!(
            parse("alias.switch"),
            Some(Ok(AliasCommand::Switch { group: None }))
        );
        assert_eq!(
            parse("alias.switch ops"),
            Some(Ok(AliasCommand::Switch {
                group: Some("ops".to_string())
            }))
        );
    }

    #[test]
    fn test_non_commands_fall_through() {
        assert_eq!(parse("hello"), None);
        assert_eq!(parse("alias"), None);
        assert_eq!(parse("aliasadd x"), None);
        assert_eq!(parse("alias.unknown x"), None);
        assert_eq!(parse("/greet alias.add"), None);
    }

    #[test]
    fn test_custom_namespace() {
        let parser = CommandParser::new("macro", '!');
        assert_eq!(parser.parse("!macro.list"), Some(Ok(AliasCommand::List)));
        assert_eq!(parser.parse("alias.list"), None);
    }
}
