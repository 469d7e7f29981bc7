//! A [`Host`] that records every callback.

use std::sync::Mutex;

use cmdalias_core::{BoxFuture, EventId, ExpandedCommand, Host, HostError};

/// One call the engine made into the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Reply { session_id: String, text: String },
    Stop(EventId),
    Resubmit(ExpandedCommand),
}

/// Records callbacks in order. Optionally fails resubmits.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    fail_resubmit: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose `resubmit` always fails.
    pub fn failing_resubmit() -> Self {
        Self {
            fail_resubmit: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("host lock poisoned").clone()
    }

    /// Reply texts, in order.
    pub fn replies(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Reply { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Re-submitted commands, in order.
    pub fn resubmitted(&self) -> Vec<ExpandedCommand> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Resubmit(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Texts of re-submitted commands, in order.
    pub fn resubmitted_texts(&self) -> Vec<String> {
        self.resubmitted().into_iter().map(|c| c.text).collect()
    }

    /// Events whose propagation was stopped, in order.
    pub fn stopped(&self) -> Vec<EventId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Stop(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("host lock poisoned").clear();
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().expect("host lock poisoned").push(call);
    }
}

impl Host for RecordingHost {
    fn reply<'a>(
        &'a self,
        session_id: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), HostError>> {
        self.record(HostCall::Reply {
            session_id: session_id.to_string(),
            text: text.to_string(),
        });
        Box::pin(async { Ok(()) })
    }

    fn stop_propagation(&self, event: EventId) -> BoxFuture<'_, Result<(), HostError>> {
        self.record(HostCall::Stop(event));
        Box::pin(async { Ok(()) })
    }

    fn resubmit(&self, command: ExpandedCommand) -> BoxFuture<'_, Result<(), HostError>> {
        if self.fail_resubmit {
            return Box::pin(async { Err(HostError::Resubmit("interpreter offline".to_string())) });
        }
        self.record(HostCall::Resubmit(command));
        Box::pin(async { Ok(()) })
    }
}
