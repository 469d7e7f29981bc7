//! Envelopes published on the daemon's outbound bus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::event::EventId;

/// What an envelope tells the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// A user-visible reply from an operator command.
    Reply,
    /// A command the host's interpreter should execute.
    Command,
    /// Raw input no alias claimed; the host handles it as usual.
    Passthrough,
    /// Default processing of the referenced event must not happen.
    Suppressed,
}

/// A message leaving the daemon.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub id: u64,
    pub timestamp: SystemTime,
    pub session_id: String,
    pub body: String,
    pub kind: EnvelopeKind,
    /// The event this envelope refers to.
    pub event: EventId,
}

impl Envelope {
    pub fn new(kind: EnvelopeKind, session_id: &str, body: &str, event: EventId) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            timestamp: SystemTime::now(),
            session_id: session_id.to_string(),
            body: body.to_string(),
            kind,
            event,
        }
    }
}
