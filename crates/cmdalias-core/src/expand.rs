//! Alias matching and argument substitution.
//!
//! Matching is first-registered-wins over the store's insertion order. In the
//! default [`MatchMode::Prefix`] an alias matches whenever its name is a
//! literal prefix of the input, so alias `a` matches `abc` with args `bc`.
//!
//! Arguments are routed per alias: when any command of the alias contains
//! `{args}`, only those placeholders receive the arguments. Otherwise every
//! command gets the arguments appended.

use tracing::debug;

use crate::event::{ExpandedCommand, ExpansionRequest};
use crate::store::AliasDefinition;

/// Placeholder replaced by the trailing arguments.
pub const ARGS_PLACEHOLDER: &str = "{args}";

/// How an alias name must line up with the start of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Literal prefix, no boundary check.
    #[default]
    Prefix,
    /// The name must be followed by whitespace or the end of input.
    Word,
}

/// The result of expanding one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Name of the alias that matched.
    pub alias: String,
    /// Trailing arguments after the alias name.
    pub args: String,
    /// Commands to dispatch, in order.
    pub commands: Vec<ExpandedCommand>,
}

impl Expansion {
    /// The command texts, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.text.as_str()).collect()
    }
}

/// Finds the alias an input refers to and expands it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    mode: MatchMode,
}

impl Matcher {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Return the first alias matching `text` and the trimmed arguments.
    pub fn find<'a, 't, I>(
        &self,
        text: &'t str,
        aliases: I,
    ) -> Option<(&'a AliasDefinition, &'t str)>
    where
        I: IntoIterator<Item = &'a AliasDefinition>,
    {
        let text = text.trim();
        aliases.into_iter().find_map(|alias| {
            let rest = text.strip_prefix(alias.name.as_str())?;
            match self.mode {
                MatchMode::Prefix => Some((alias, rest.trim())),
                MatchMode::Word if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                    Some((alias, rest.trim()))
                }
                MatchMode::Word => None,
            }
        })
    }

    /// Expand `request` against `aliases`, or `None` if nothing matches.
    pub fn expand<'a, I>(&self, request: &ExpansionRequest<'_>, aliases: I) -> Option<Expansion>
    where
        I: IntoIterator<Item = &'a AliasDefinition>,
    {
        let (alias, args) = self.find(request.text, aliases)?;
        debug!(alias = %alias.name, args = %args, session = %request.session_id, "Alias matched");

        let depth = request.depth.saturating_add(1);
        let append = !alias.commands.iter().any(|c| c.contains(ARGS_PLACEHOLDER));
        let commands = alias
            .commands
            .iter()
            .map(|template| {
                let text = if append {
                    substitute(template, args)
                } else {
                    template.replace(ARGS_PLACEHOLDER, args).trim_end().to_string()
                };
                ExpandedCommand::new(
                    text,
                    request.session_id,
                    request.origin,
                    depth,
                )
            })
            .collect();

        Some(Expansion {
            alias: alias.name.clone(),
            args: args.to_string(),
            commands,
        })
    }
}

/// Fill a command template with `args`.
///
/// Every `{args}` is replaced; a template without the placeholder gets the
/// arguments appended after a single space. Trailing whitespace is trimmed.
pub fn substitute(template: &str, args: &str) -> String {
    let command = if template.contains(ARGS_PLACEHOLDER) {
        template.replace(ARGS_PLACEHOLDER, args)
    } else if args.is_empty() {
        template.to_string()
    } else {
        format!("{template} {args}")
    };
    command.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alias(name: &str, commands: &[&str]) -> AliasDefinition {
        AliasDefinition {
            name: name.to_string(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn expand(aliases: &[AliasDefinition], text: &str) -> Option<Vec<String>> {
        Matcher::default()
            .expand(&ExpansionRequest::new(text, "s1"), aliases)
            .map(|e| e.commands.into_iter().map(|c| c.text).collect())
    }

    #[test]
    fn test_placeholder_substitution() {
        let aliases = [alias("hi", &["/greet {args}"])];
        assert_eq!(expand(&aliases, "hi there"), Some(vec!["/greet there".to_string()]));
    }

    #[test]
    fn test_multi_command_order_and_append() {
        let aliases = [alias("combo", &["/cmd1", "/cmd2 {args}"])];
        assert_eq!(
            expand(&aliases, "combo x y"),
            Some(vec!["/cmd1".to_string(), "/cmd2 x y".to_string()])
        );

        let aliases = [alias("both", &["/cmd1", "/cmd2"])];
        assert_eq!(
            expand(&aliases, "both x y"),
            Some(vec!["/cmd1 x y".to_string(), "/cmd2 x y".to_string()])
        );
    }

    #[test]
    fn test_append_without_args_adds_no_space() {
        let aliases = [alias("combo", &["/cmd1", "/cmd2 {args}"])];
        assert_eq!(
            expand(&aliases, "combo"),
            Some(vec!["/cmd1".to_string(), "/cmd2".to_string()])
        );
    }

    #[test]
    fn test_every_placeholder_is_replaced() {
        assert_eq!(substitute("/echo {args} and {args}", "x"), "/echo x and x");
        assert_eq!(substitute("/echo {args}", ""), "/echo");
        assert_eq!(substitute("/ping", "host"), "/ping host");
    }

    #[test]
    fn test_first_registered_prefix_wins() {
        let aliases = [alias("a", &["/first {args}"]), alias("ab", &["/second"])];
        let expansion = Matcher::default()
            .expand(&ExpansionRequest::new("ab", "s1"), &aliases)
            .unwrap();
        assert_eq!(expansion.alias, "a");
        assert_eq!(expansion.args, "b");
        assert_eq!(expansion.texts(), vec!["/first b"]);
    }

    #[test]
    fn test_literal_prefix_consumes_partial_word() {
        let aliases = [alias("a", &["/x"])];
        assert_eq!(expand(&aliases, "abc"), Some(vec!["/x bc".to_string()]));
    }

    #[test]
    fn test_word_mode_requires_boundary() {
        let aliases = [alias("a", &["/first"]), alias("ab", &["/second {args}"])];
        let matcher = Matcher::new(MatchMode::Word);
        let expansion = matcher
            .expand(&ExpansionRequest::new("ab cd", "s1"), &aliases)
            .unwrap();
        assert_eq!(expansion.alias, "ab");
        assert_eq!(expansion.texts(), vec!["/second cd"]);

        assert!(matcher.expand(&ExpansionRequest::new("abc", "s1"), &aliases).is_none());
        assert!(matcher.expand(&ExpansionRequest::new("a", "s1"), &aliases).is_some());
    }

    #[test]
    fn test_input_is_trimmed() {
        let aliases = [alias("hi", &["/greet {args}"])];
        assert_eq!(
            expand(&aliases, "   hi    there   "),
            Some(vec!["/greet there".to_string()])
        );
    }

    #[test]
    fn test_no_match() {
        let aliases = [alias("hi", &["/greet"])];
        assert_eq!(expand(&aliases, "hello"), None);
        assert_eq!(expand(&[], "hi"), None);
    }

    #[test]
    fn test_expanded_commands_carry_session_origin_and_depth() {
        let aliases = [alias("hi", &["/greet {args}", "/wave"])];
        let request = ExpansionRequest::new("hi you", "chan-9");
        let expansion = Matcher::default().expand(&request, &aliases).unwrap();

        for command in &expansion.commands {
            assert_eq!(command.session_id, "chan-9");
            assert_eq!(command.origin, request.origin);
            assert_eq!(command.depth, 1);
        }
        assert_ne!(expansion.commands[0].id, expansion.commands[1].id);
    }
}
