//! Configuration builders for tests.

use std::path::Path;

use cmdalias_config::{AppConfig, GroupConfig};

/// Fluent builder for [`AppConfig`] in tests.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .store_path(tmp.path().join("aliases.json"))
///     .max_cascade_depth(2)
///     .group("ops", &["deploy"])
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn store_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.store.path = path.as_ref().display().to_string();
        self
    }

    pub fn delimiter_convention(mut self, separator: char) -> Self {
        self.config.tokenizer.convention = "delimiter".to_string();
        self.config.tokenizer.separator = separator.to_string();
        self
    }

    pub fn command_prefix(mut self, prefix: char) -> Self {
        self.config.tokenizer.command_prefix = prefix.to_string();
        self
    }

    pub fn word_matching(mut self) -> Self {
        self.config.matcher.mode = "word".to_string();
        self
    }

    pub fn max_cascade_depth(mut self, depth: u8) -> Self {
        self.config.matcher.max_cascade_depth = depth;
        self
    }

    pub fn commands_enabled(mut self, enabled: bool) -> Self {
        self.config.commands.enabled = enabled;
        self
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.config.commands.namespace = namespace.to_string();
        self
    }

    pub fn group(mut self, name: &str, aliases: &[&str]) -> Self {
        self.config.groups.push(GroupConfig {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
