//! Host boundary.
//!
//! The engine never talks to a transport or an interpreter directly. It calls
//! back into a [`Host`] to reply to the user, to suppress the host's default
//! handling of an event, and to re-submit expanded commands. Per-session
//! state the engine needs (the active alias group) lives in host-provided
//! [`SessionData`].

use std::collections::HashMap;
use std::sync::Mutex;

use crate::BoxFuture;
use crate::event::{EventId, ExpandedCommand};

/// Errors reported by a host while handling engine callbacks.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("reply failed: {0}")]
    Reply(String),

    #[error("resubmit failed: {0}")]
    Resubmit(String),

    #[error("host channel closed")]
    Closed,
}

/// Callbacks from the engine into the host runtime.
pub trait Host: Send + Sync {
    /// Send a user-visible reply to a session.
    fn reply<'a>(
        &'a self,
        session_id: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), HostError>>;

    /// Stop the host's default processing of `event`. Called at most once
    /// per event, before any expanded command is re-submitted.
    fn stop_propagation(&self, event: EventId) -> BoxFuture<'_, Result<(), HostError>>;

    /// Hand an expanded command back to the host as a new event.
    fn resubmit(&self, command: ExpandedCommand) -> BoxFuture<'_, Result<(), HostError>>;
}

/// Session-scoped storage provided by the host.
pub trait SessionData: Send + Sync {
    /// The active alias group of a session, if any.
    fn active_group(&self, session_id: &str) -> Option<String>;

    /// Set or clear the active alias group of a session.
    fn set_active_group(&self, session_id: &str, group: Option<String>);
}

/// [`SessionData`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionData {
    groups: Mutex<HashMap<String, String>>,
}

impl MemorySessionData {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionData for MemorySessionData {
    fn active_group(&self, session_id: &str) -> Option<String> {
        self.groups
            .lock()
            .ok()
            .and_then(|groups| groups.get(session_id).cloned())
    }

    fn set_active_group(&self, session_id: &str, group: Option<String>) {
        if let Ok(mut groups) = self.groups.lock() {
            match group {
                Some(group) => {
                    groups.insert(session_id.to_string(), group);
                }
                None => {
                    groups.remove(session_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_session_data_is_per_session() {
        let data = MemorySessionData::new();
        assert_eq!(data.active_group("a"), None);

        data.set_active_group("a", Some("ops".to_string()));
        assert_eq!(data.active_group("a").as_deref(), Some("ops"));
        assert_eq!(data.active_group("b"), None);

        data.set_active_group("a", None);
        assert_eq!(data.active_group("a"), None);
    }

    #[test]
    fn test_host_error_display() {
        assert_eq!(HostError::Closed.to_string(), "host channel closed");
        assert_eq!(
            HostError::Resubmit("queue full".to_string()).to_string(),
            "resubmit failed: queue full"
        );
    }
}
