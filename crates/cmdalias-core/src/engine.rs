//! Engine entry point and dispatch guard.
//!
//! [`AliasEngine::handle`] is called once per event. It enforces three rules:
//!
//! 1. Expanded commands are not matched again, unless cascading is enabled
//!    and the command has not yet reached the configured depth.
//! 2. When an event is consumed (alias match or operator command), the host
//!    is told to stop default processing exactly once, before anything else.
//! 3. Expanded commands are re-submitted strictly in order, each awaited
//!    before the next.

use std::sync::Arc;

use cmdalias_config::{AppConfig, ConfigError};
use tracing::{debug, info};

use crate::command::{AliasCommand, CommandParser};
use crate::error::AliasError;
use crate::event::Event;
use crate::expand::{Expansion, MatchMode, Matcher};
use crate::group::{GroupError, GroupSelector, SwitchOutcome};
use crate::host::{Host, SessionData};
use crate::store::{AliasSnapshot, AliasStore, StoreError, UpsertOutcome};
use crate::tokenizer::{Convention, MappingError, Tokenizer};

/// Typed engine settings, usually derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tokenizer: Tokenizer,
    pub matcher: Matcher,
    /// How many times an expanded command may be expanded again.
    pub max_cascade_depth: u8,
    /// `None` disables the operator command surface.
    pub commands: Option<CommandParser>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tokenizer: Tokenizer::default(),
            matcher: Matcher::default(),
            max_cascade_depth: 0,
            commands: Some(CommandParser::default()),
        }
    }
}

impl EngineSettings {
    /// Convert validated configuration into typed settings.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let convention = match config.tokenizer.convention.as_str() {
            "prefix" => Convention::PrefixToken,
            "delimiter" => Convention::Delimiter,
            other => {
                return Err(ConfigError::Validation(format!(
                    "unknown tokenizer convention {other:?}"
                )));
            }
        };
        let prefix = first_char("tokenizer.command_prefix", &config.tokenizer.command_prefix)?;
        let separator = first_char("tokenizer.separator", &config.tokenizer.separator)?;

        let mode = match config.matcher.mode.as_str() {
            "prefix" => MatchMode::Prefix,
            "word" => MatchMode::Word,
            other => {
                return Err(ConfigError::Validation(format!(
                    "unknown matcher mode {other:?}"
                )));
            }
        };

        Ok(Self {
            tokenizer: Tokenizer::new(convention, prefix, separator),
            matcher: Matcher::new(mode),
            max_cascade_depth: config.matcher.max_cascade_depth,
            commands: config
                .commands
                .enabled
                .then(|| CommandParser::new(config.commands.namespace.clone(), prefix)),
        })
    }
}

fn first_char(field: &str, value: &str) -> Result<char, ConfigError> {
    value
        .chars()
        .next()
        .ok_or_else(|| ConfigError::Validation(format!("{field} must not be empty")))
}

/// What the engine did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Raw input that matched nothing; the host continues its default handling.
    NoMatch,
    /// An expanded command the engine will not touch; the host's interpreter
    /// should execute it.
    Forward,
    /// The event was consumed and `dispatched` commands were re-submitted.
    Expanded { alias: String, dispatched: usize },
    /// The event was an operator command and a reply was sent.
    Handled { command: &'static str },
}

/// The alias engine: store, group selector, and settings.
pub struct AliasEngine {
    store: Arc<AliasStore>,
    groups: Arc<GroupSelector>,
    settings: EngineSettings,
}

impl AliasEngine {
    pub fn new(
        store: Arc<AliasStore>,
        groups: Arc<GroupSelector>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            groups,
            settings,
        }
    }

    /// Build an engine from configuration, loading the alias file.
    pub async fn from_config(
        config: &AppConfig,
        sessions: Arc<dyn SessionData>,
    ) -> Result<Self, ConfigError> {
        let settings = EngineSettings::from_config(config)?;
        let store = Arc::new(AliasStore::open(&config.store.path).await);
        let groups = Arc::new(GroupSelector::from_config(&config.groups, sessions));
        Ok(Self::new(store, groups, settings))
    }

    pub fn store(&self) -> &Arc<AliasStore> {
        &self.store
    }

    pub fn groups(&self) -> &Arc<GroupSelector> {
        &self.groups
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Whether `event` may be matched against aliases at all.
    pub fn is_eligible(&self, event: &Event) -> bool {
        event.depth() <= self.settings.max_cascade_depth
    }

    /// Expand `event` without dispatching anything.
    pub fn expand(&self, event: &Event) -> Option<Expansion> {
        if !self.is_eligible(event) {
            return None;
        }
        let filter = self.groups.filter(event.session_id());
        let snapshot = self.store.list();
        self.settings
            .matcher
            .expand(&event.request(), snapshot.iter().filter(|a| filter.allows(a)))
    }

    /// Process one event to completion.
    ///
    /// Only host failures are returned as errors; everything else ends up in
    /// the [`Outcome`] or in a reply.
    pub async fn handle(&self, event: &Event, host: &dyn Host) -> Result<Outcome, AliasError> {
        if !self.is_eligible(event) {
            debug!(event = %event.id(), depth = event.depth(), "Expanded command passed through");
            return Ok(Outcome::Forward);
        }

        if let Event::Raw(raw) = event
            && let Some(parsed) = self.settings.commands.as_ref().and_then(|p| p.parse(&raw.text))
        {
            host.stop_propagation(raw.id).await?;
            let (verb, reply) = match parsed {
                Ok(command) => {
                    let verb = command.verb();
                    (verb, self.execute(command, &raw.session_id).await)
                }
                Err(e) => ("invalid", e.to_string()),
            };
            host.reply(&raw.session_id, &reply).await?;
            return Ok(Outcome::Handled { command: verb });
        }

        let Some(expansion) = self.expand(event) else {
            return Ok(if event.is_expanded() {
                Outcome::Forward
            } else {
                Outcome::NoMatch
            });
        };

        host.stop_propagation(event.id()).await?;
        let dispatched = expansion.commands.len();
        for command in expansion.commands {
            host.resubmit(command).await?;
        }

        info!(
            alias = %expansion.alias,
            session = %event.session_id(),
            dispatched,
            "Alias expanded"
        );
        Ok(Outcome::Expanded {
            alias: expansion.alias,
            dispatched,
        })
    }

    /// Tokenize `mapping` and store it under `name`.
    pub async fn add_alias(&self, name: &str, mapping: &str) -> Result<UpsertOutcome, AliasError> {
        self.save(name, self.settings.tokenizer.split(mapping)).await
    }

    /// Store pre-split words (for example command-line arguments) under
    /// `name`. See [`Tokenizer::split_words`] for how words are grouped.
    pub async fn add_alias_words<S: AsRef<str>>(
        &self,
        name: &str,
        words: &[S],
    ) -> Result<UpsertOutcome, AliasError> {
        self.save(name, self.settings.tokenizer.split_words(words)).await
    }

    async fn save(
        &self,
        name: &str,
        commands: Result<Vec<String>, MappingError>,
    ) -> Result<UpsertOutcome, AliasError> {
        let commands = match commands {
            Ok(commands) => commands,
            Err(MappingError::Empty) => {
                return Err(StoreError::InvalidAlias("no commands supplied".to_string()).into());
            }
            Err(e) => return Err(e.into()),
        };
        let outcome = self.store.upsert(name, commands).await?;
        info!(alias = %name.trim(), ?outcome, "Alias saved");
        Ok(outcome)
    }

    /// Delete `name`, reporting [`AliasError::UnknownAlias`] if it is absent.
    pub async fn remove_alias(&self, name: &str) -> Result<(), AliasError> {
        let name = name.trim();
        if self.store.remove(name).await {
            info!(alias = %name, "Alias removed");
            Ok(())
        } else {
            Err(AliasError::UnknownAlias(name.to_string()))
        }
    }

    pub fn list_aliases(&self) -> AliasSnapshot {
        self.store.list()
    }

    /// Run an operator command and produce the reply text.
    pub async fn execute(&self, command: AliasCommand, session_id: &str) -> String {
        match command {
            AliasCommand::Add { name, mapping } => {
                let outcome = self.add_alias(&name, &mapping).await;
                let name = name.trim();
                match outcome {
                    Ok(UpsertOutcome::Created) => format!("Added alias `{name}`"),
                    Ok(UpsertOutcome::Updated) => format!("Updated alias `{name}`"),
                    Err(e) => format!("Cannot add alias `{name}`: {}", describe(&e)),
                }
            }
            AliasCommand::Remove { name } => {
                let name = name.trim();
                match self.remove_alias(name).await {
                    Ok(()) => format!("Removed alias `{name}`"),
                    Err(_) => format!("Alias `{name}` not found"),
                }
            }
            AliasCommand::List => format_list(&self.store.list()),
            AliasCommand::Switch { group } => {
                match self.groups.switch(session_id, group.as_deref()) {
                    Ok(outcome) => self.describe_switch(outcome),
                    Err(GroupError::UnknownGroup(group)) => {
                        format!("Unknown alias group `{group}`")
                    }
                    Err(e) => e.to_string(),
                }
            }
        }
    }

    fn describe_switch(&self, outcome: SwitchOutcome) -> String {
        match outcome {
            SwitchOutcome::Current(Some(group)) => format!("Active alias group: {group}"),
            SwitchOutcome::Current(None) | SwitchOutcome::Cleared { previous: None } => {
                let available = self.groups.group_names();
                if available.is_empty() {
                    "No active alias group".to_string()
                } else {
                    format!(
                        "No active alias group (available: {})",
                        available.join(", ")
                    )
                }
            }
            SwitchOutcome::Unchanged(group) => format!("Already using alias group {group}"),
            SwitchOutcome::Switched(group) => format!("Switched to alias group {group}"),
            SwitchOutcome::Cleared {
                previous: Some(group),
            } => format!("Left alias group {group}"),
        }
    }
}

/// Plain-language reason for a failed add.
fn describe(e: &AliasError) -> String {
    match e {
        AliasError::Store(StoreError::InvalidAlias(reason)) => reason.clone(),
        AliasError::Mapping(MappingError::Empty) => "no commands supplied".to_string(),
        other => other.to_string(),
    }
}

/// Render the alias table as `name -> cmd1 | cmd2` lines.
pub fn format_list(aliases: &AliasSnapshot) -> String {
    if aliases.is_empty() {
        return "No aliases defined".to_string();
    }
    let lines: Vec<String> = aliases
        .iter()
        .map(|a| format!("{} -> {}", a.name, a.commands.join(" | ")))
        .collect();
    format!("Aliases:\n{}", lines.join("\n"))
}
