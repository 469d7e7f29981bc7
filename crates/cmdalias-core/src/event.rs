//! Events flowing into the engine.
//!
//! Every piece of incoming text is either a [`RawEvent`] delivered by the host
//! or an [`ExpandedCommand`] produced by a previous expansion. Only raw events
//! are eligible for alias matching unless cascading is explicitly enabled.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier of an event, handed back to the host when it must stop
/// default processing of that event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    /// Allocate a fresh, process-unique identifier.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The numeric value of this identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Text delivered by the host for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub id: EventId,
    pub session_id: String,
    pub text: String,
}

impl RawEvent {
    /// Create a raw event with a freshly allocated id.
    pub fn new(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: EventId::next(),
            session_id: session_id.into(),
            text: text.into(),
        }
    }
}

/// A single command produced by expanding an alias.
///
/// Carries only what the downstream interpreter needs. `depth` is the number
/// of expansions that led to this command (1 for a direct expansion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedCommand {
    pub id: EventId,
    pub origin: EventId,
    pub session_id: String,
    pub text: String,
    pub depth: u8,
}

impl ExpandedCommand {
    pub(crate) fn new(text: String, session_id: &str, origin: EventId, depth: u8) -> Self {
        Self {
            id: EventId::next(),
            origin,
            session_id: session_id.to_string(),
            text,
            depth,
        }
    }
}

/// An event presented to the engine entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Text straight from the host.
    Raw(RawEvent),
    /// A command re-submitted by the engine itself.
    Expanded(ExpandedCommand),
}

impl Event {
    /// Shorthand for a raw event.
    pub fn raw(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Event::Raw(RawEvent::new(session_id, text))
    }

    /// Identifier the host uses to refer to this event.
    pub fn id(&self) -> EventId {
        match self {
            Event::Raw(raw) => raw.id,
            Event::Expanded(cmd) => cmd.id,
        }
    }

    /// Session the event belongs to; replies and expansions stay in it.
    pub fn session_id(&self) -> &str {
        match self {
            Event::Raw(raw) => &raw.session_id,
            Event::Expanded(cmd) => &cmd.session_id,
        }
    }

    /// The input line or expanded command text.
    pub fn text(&self) -> &str {
        match self {
            Event::Raw(raw) => &raw.text,
            Event::Expanded(cmd) => &cmd.text,
        }
    }

    /// Number of expansions behind this event (0 for raw input).
    pub fn depth(&self) -> u8 {
        match self {
            Event::Raw(_) => 0,
            Event::Expanded(cmd) => cmd.depth,
        }
    }

    /// Whether the engine produced this event.
    pub fn is_expanded(&self) -> bool {
        matches!(self, Event::Expanded(_))
    }

    /// Borrow this event as an expansion request.
    pub fn request(&self) -> ExpansionRequest<'_> {
        ExpansionRequest {
            text: self.text(),
            session_id: self.session_id(),
            origin: self.id(),
            depth: self.depth(),
        }
    }
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        Event::Raw(raw)
    }
}

impl From<ExpandedCommand> for Event {
    fn from(cmd: ExpandedCommand) -> Self {
        Event::Expanded(cmd)
    }
}

/// Input to one match-and-expand cycle. Lives only for that cycle.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionRequest<'a> {
    pub text: &'a str,
    pub session_id: &'a str,
    pub origin: EventId,
    pub depth: u8,
}

impl<'a> ExpansionRequest<'a> {
    pub fn new(text: &'a str, session_id: &'a str) -> Self {
        Self {
            text,
            session_id,
            origin: EventId::next(),
            depth: 0,
        }
    }
}
