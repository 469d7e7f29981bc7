#![deny(unsafe_code)]

//! Configuration loading and validation for cmdalias.
//!
//! Loads TOML configuration files and validates them against expected schemas.
//! Provides the [`AppConfig`] type as the central configuration structure.
//! String-typed settings (conventions, match modes) are validated here and
//! converted into typed values by `cmdalias-core`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Alias store persistence.
    #[serde(default)]
    pub store: StoreConfig,

    /// How alias mappings are split into individual commands.
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// How incoming text is matched against aliases.
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Operator command surface (`alias.add`, `alias.list`, ...).
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Named alias groups a session can switch to.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the alias table is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON alias file.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "data/aliases.json".to_string()
}

/// Mapping tokenizer configuration.
///
/// ## TOML Example
///
/// ```toml
/// [tokenizer]
/// convention = "prefix"
/// command_prefix = "/"
/// separator = ";"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Splitting convention: "prefix" or "delimiter".
    #[serde(default = "default_convention")]
    pub convention: String,

    /// Character that marks the start of a new command (prefix convention).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Literal separator between commands.
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            convention: default_convention(),
            command_prefix: default_command_prefix(),
            separator: default_separator(),
        }
    }
}

fn default_convention() -> String {
    "prefix".to_string()
}

fn default_command_prefix() -> String {
    "/".to_string()
}

fn default_separator() -> String {
    ";".to_string()
}

/// Alias matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Match mode: "prefix" (literal prefix) or "word" (name must end at a
    /// word boundary).
    #[serde(default = "default_match_mode")]
    pub mode: String,

    /// How many times an expanded command may itself be expanded again.
    /// `0` disables cascading entirely.
    #[serde(default)]
    pub max_cascade_depth: u8,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            mode: default_match_mode(),
            max_cascade_depth: 0,
        }
    }
}

fn default_match_mode() -> String {
    "prefix".to_string()
}

/// Upper bound for `matcher.max_cascade_depth`.
pub const MAX_CASCADE_DEPTH: u8 = 8;

/// Operator command surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Whether `alias.*` operator commands are recognised at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Namespace of operator commands (`<namespace>.add`, ...).
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: default_namespace(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    "alias".to_string()
}

/// A named subset of aliases.
///
/// ## TOML Example
///
/// ```toml
/// [[groups]]
/// name = "moderation"
/// aliases = ["ban", "mute"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Group name.
    pub name: String,

    /// Alias names visible while this group is active.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        debug!(path = %path.display(), bytes = content.len(), "Loaded config file");
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store.path must not be empty".to_string(),
            ));
        }

        let valid_conventions = ["prefix", "delimiter"];
        if !valid_conventions.contains(&self.tokenizer.convention.as_str()) {
            return Err(ConfigError::Validation(format!(
                "tokenizer.convention must be one of {:?}, got {:?}",
                valid_conventions, self.tokenizer.convention
            )));
        }
        single_char("tokenizer.command_prefix", &self.tokenizer.command_prefix)?;
        single_char("tokenizer.separator", &self.tokenizer.separator)?;
        if self.tokenizer.command_prefix == self.tokenizer.separator {
            return Err(ConfigError::Validation(
                "tokenizer.command_prefix and tokenizer.separator must differ".to_string(),
            ));
        }

        let valid_modes = ["prefix", "word"];
        if !valid_modes.contains(&self.matcher.mode.as_str()) {
            return Err(ConfigError::Validation(format!(
                "matcher.mode must be one of {:?}, got {:?}",
                valid_modes, self.matcher.mode
            )));
        }
        if self.matcher.max_cascade_depth > MAX_CASCADE_DEPTH {
            return Err(ConfigError::Validation(format!(
                "matcher.max_cascade_depth must be at most {MAX_CASCADE_DEPTH}, got {}",
                self.matcher.max_cascade_depth
            )));
        }

        let namespace = &self.commands.namespace;
        if namespace.is_empty() || namespace.chars().any(|c| c.is_whitespace() || c == '.') {
            return Err(ConfigError::Validation(format!(
                "commands.namespace must be a non-empty word without dots, got {namespace:?}"
            )));
        }

        let mut seen = HashSet::new();
        for (i, group) in self.groups.iter().enumerate() {
            if group.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "groups[{i}].name must not be empty"
                )));
            }
            if group.name == "*" {
                return Err(ConfigError::Validation(format!(
                    "groups[{i}].name \"*\" is reserved"
                )));
            }
            if !seen.insert(group.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "groups[{i}].name {:?} is defined more than once",
                    group.name
                )));
            }
        }

        Ok(())
    }
}

fn single_char(field: &str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_whitespace() && c != '"' && c != '\'' => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "{field} must be a single non-whitespace, non-quote character, got {value:?}"
        ))),
    }
}
