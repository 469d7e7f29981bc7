//! Per-session alias groups.
//!
//! A group is a named subset of alias names. While a session has an active
//! group, only aliases listed in that group are visible to the matcher for
//! that session. Sessions without an active group see every alias.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use cmdalias_config::GroupConfig;
use tracing::{debug, warn};

use crate::host::SessionData;
use crate::store::AliasDefinition;

/// Group name that clears the active group in [`GroupSelector::switch`].
pub const CLEAR_GROUP: &str = "*";

/// Errors from group selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    #[error("unknown alias group: {0}")]
    UnknownGroup(String),

    #[error("invalid alias group: {0}")]
    InvalidGroup(String),
}

/// Result of [`GroupSelector::switch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Query only: the session's active group.
    Current(Option<String>),
    /// The session was already on this group.
    Unchanged(String),
    /// The session now uses this group.
    Switched(String),
    /// The active group was cleared.
    Cleared { previous: Option<String> },
}

/// Which aliases a session may use.
#[derive(Debug, Clone, Default)]
pub struct AliasFilter(Option<HashSet<String>>);

impl AliasFilter {
    /// A filter that lets every alias through.
    pub fn all() -> Self {
        Self(None)
    }

    /// Whether `alias` may be matched under this filter.
    pub fn allows(&self, alias: &AliasDefinition) -> bool {
        self.0
            .as_ref()
            .is_none_or(|names| names.contains(&alias.name))
    }

    /// True when every alias is allowed.
    pub fn is_unrestricted(&self) -> bool {
        self.0.is_none()
    }
}

/// Registry of alias groups plus per-session selection.
pub struct GroupSelector {
    groups: RwLock<BTreeMap<String, Vec<String>>>,
    sessions: Arc<dyn SessionData>,
}

impl GroupSelector {
    pub fn new(sessions: Arc<dyn SessionData>) -> Self {
        Self {
            groups: RwLock::new(BTreeMap::new()),
            sessions,
        }
    }

    /// Build a selector with the groups declared in configuration.
    pub fn from_config(groups: &[GroupConfig], sessions: Arc<dyn SessionData>) -> Self {
        let selector = Self::new(sessions);
        for group in groups {
            if let Err(e) = selector.define_group(&group.name, group.aliases.clone()) {
                warn!(group = %group.name, error = %e, "Skipping configured alias group");
            }
        }
        selector
    }

    /// Create or replace a group. Returns `true` if a group was replaced.
    pub fn define_group(&self, name: &str, aliases: Vec<String>) -> Result<bool, GroupError> {
        let name = name.trim();
        if name.is_empty() || name == CLEAR_GROUP {
            return Err(GroupError::InvalidGroup(format!(
                "group name {name:?} is not allowed"
            )));
        }

        let aliases = aliases
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        let replaced = match self.groups.write() {
            Ok(mut groups) => groups.insert(name.to_string(), aliases).is_some(),
            Err(poisoned) => poisoned
                .into_inner()
                .insert(name.to_string(), aliases)
                .is_some(),
        };
        debug!(group = %name, replaced, "Alias group defined");
        Ok(replaced)
    }

    /// Known group names, sorted.
    pub fn group_names(&self) -> Vec<String> {
        self.read(|groups| groups.keys().cloned().collect())
    }

    /// Alias names in a group.
    pub fn members(&self, name: &str) -> Option<Vec<String>> {
        self.read(|groups| groups.get(name).cloned())
    }

    pub fn active_group(&self, session_id: &str) -> Option<String> {
        self.sessions.active_group(session_id)
    }

    /// Query, switch, or clear the session's active group.
    ///
    /// `None` reports the current group, [`CLEAR_GROUP`] clears it, any other
    /// name must be a known group.
    pub fn switch(
        &self,
        session_id: &str,
        group: Option<&str>,
    ) -> Result<SwitchOutcome, GroupError> {
        let current = self.sessions.active_group(session_id);
        let Some(group) = group.map(str::trim) else {
            return Ok(SwitchOutcome::Current(current));
        };

        if group == CLEAR_GROUP {
            self.sessions.set_active_group(session_id, None);
            debug!(session = %session_id, "Alias group cleared");
            return Ok(SwitchOutcome::Cleared { previous: current });
        }

        if !self.read(|groups| groups.contains_key(group)) {
            return Err(GroupError::UnknownGroup(group.to_string()));
        }
        if current.as_deref() == Some(group) {
            return Ok(SwitchOutcome::Unchanged(group.to_string()));
        }

        self.sessions
            .set_active_group(session_id, Some(group.to_string()));
        debug!(session = %session_id, group = %group, "Alias group switched");
        Ok(SwitchOutcome::Switched(group.to_string()))
    }

    /// The alias filter for a session.
    ///
    /// An active group that no longer exists does not restrict anything.
    pub fn filter(&self, session_id: &str) -> AliasFilter {
        let Some(active) = self.sessions.active_group(session_id) else {
            return AliasFilter::all();
        };
        match self.members(&active) {
            Some(members) => AliasFilter(Some(members.into_iter().collect())),
            None => {
                warn!(
                    session = %session_id,
                    group = %active,
                    "Active alias group no longer exists"
                );
                AliasFilter::all()
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&BTreeMap<String, Vec<String>>) -> T) -> T {
        match self.groups.read() {
            Ok(groups) => f(&groups),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}
