#![deny(unsafe_code)]

//! cmdalias core engine.
//!
//! Resolves operator-defined aliases in incoming text and expands them into
//! one or more commands that are handed back to the host, in order, exactly
//! once. The host runtime (message ingestion, command interpreter) is reached
//! only through the [`Host`] trait; [`AliasDaemon`] is a reference runtime that
//! drives the engine over an in-process message bus.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future: the return type for async trait
/// methods that are consumed through `&dyn Trait`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Build metadata (version, git hash, profile).
pub mod build_info;
/// Operator command surface (`alias.add`, `alias.remove`, ...).
pub mod command;
/// Event-loop runtime that drives the engine over a message bus.
pub mod daemon;
/// Engine entry point and dispatch guard.
pub mod engine;
/// Aggregated error type.
pub mod error;
/// Raw and expanded events flowing through the engine.
pub mod event;
/// Alias matching and argument substitution.
pub mod expand;
/// Per-session alias groups.
pub mod group;
/// Host boundary traits.
pub mod host;
/// In-memory log collector.
pub mod logging;
/// Envelope types for the outbound bus.
pub mod message;
/// Durable alias table.
pub mod store;
/// Mapping tokenizer.
pub mod tokenizer;

pub use daemon::{AliasDaemon, DaemonError, DaemonHandle};
pub use engine::{AliasEngine, EngineSettings, Outcome};
pub use error::AliasError;
pub use event::{Event, EventId, ExpandedCommand, RawEvent};
pub use group::GroupSelector;
pub use host::{Host, HostError, MemorySessionData, SessionData};
pub use logging::{LogCollector, LogEntry, LogReader};
pub use message::{Envelope, EnvelopeKind};
pub use store::{AliasDefinition, AliasSnapshot, AliasStore, UpsertOutcome};
pub use tokenizer::Tokenizer;
