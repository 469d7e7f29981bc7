//! Reference runtime: drives an [`AliasEngine`] from an inbound queue and
//! publishes what the host should do on a broadcast bus.
//!
//! Expanded commands are fed back through the engine before the next inbound
//! event is taken, so one alias's commands are never interleaved with other
//! input.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::BoxFuture;
use crate::engine::{AliasEngine, Outcome};
use crate::event::{Event, EventId, ExpandedCommand};
use crate::host::{Host, HostError};
use crate::message::{Envelope, EnvelopeKind};

/// Commands accepted by a running daemon.
#[derive(Debug)]
pub enum DaemonCommand {
    /// Process an event.
    Event(Event),
    /// Finish queued events and stop.
    Shutdown,
}

/// Errors from the daemon handle.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("daemon channel closed")]
    Closed,
}

/// The event loop. Spawn [`AliasDaemon::run`] and talk to it through a
/// [`DaemonHandle`].
pub struct AliasDaemon {
    engine: Arc<AliasEngine>,
    command_rx: mpsc::Receiver<DaemonCommand>,
    bus_tx: broadcast::Sender<Envelope>,
}

/// Cloneable handle for submitting input to a running daemon.
#[derive(Clone)]
pub struct DaemonHandle {
    command_tx: mpsc::Sender<DaemonCommand>,
    bus_tx: broadcast::Sender<Envelope>,
}

impl DaemonHandle {
    /// Queue raw text from a session. Returns the id of the new event.
    pub async fn submit(&self, session_id: &str, text: &str) -> Result<EventId, DaemonError> {
        let event = Event::raw(session_id, text);
        let id = event.id();
        self.submit_event(event).await?;
        Ok(id)
    }

    pub async fn submit_event(&self, event: Event) -> Result<(), DaemonError> {
        self.command_tx
            .send(DaemonCommand::Event(event))
            .await
            .map_err(|_| DaemonError::Closed)
    }

    /// Subscribe to outbound envelopes. Only envelopes published after this
    /// call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.bus_tx.subscribe()
    }

    /// Ask the daemon to stop after draining queued events.
    pub async fn shutdown(&self) -> Result<(), DaemonError> {
        self.command_tx
            .send(DaemonCommand::Shutdown)
            .await
            .map_err(|_| DaemonError::Closed)
    }
}

impl AliasDaemon {
    pub fn new(engine: Arc<AliasEngine>) -> (Self, DaemonHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (bus_tx, _) = broadcast::channel(256);

        let daemon = Self {
            engine,
            command_rx,
            bus_tx: bus_tx.clone(),
        };
        let handle = DaemonHandle { command_tx, bus_tx };
        (daemon, handle)
    }

    /// Run until [`DaemonHandle::shutdown`] is called or every handle is
    /// dropped.
    pub async fn run(mut self) {
        info!(aliases = self.engine.store().len(), "Alias daemon started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                DaemonCommand::Event(event) => {
                    dispatch(&self.engine, &self.bus_tx, event).await;
                }
                DaemonCommand::Shutdown => {
                    info!("Alias daemon shutting down");
                    while let Ok(cmd) = self.command_rx.try_recv() {
                        if let DaemonCommand::Event(event) = cmd {
                            dispatch(&self.engine, &self.bus_tx, event).await;
                        }
                    }
                    break;
                }
            }
        }

        if let Err(e) = self.engine.store().flush().await {
            warn!(error = %e, "Pending alias changes could not be written");
        }
        info!("Alias daemon stopped");
    }
}

/// Run one inbound event and everything it expands into, depth first.
async fn dispatch(engine: &AliasEngine, bus_tx: &broadcast::Sender<Envelope>, event: Event) {
    let mut work = VecDeque::from([event]);

    while let Some(event) = work.pop_front() {
        let host = BusHost::new(bus_tx, &event);
        match engine.handle(&event, &host).await {
            Ok(Outcome::NoMatch) => {
                host.publish(EnvelopeKind::Passthrough, event.session_id(), event.text());
            }
            Ok(Outcome::Forward) => {
                host.publish(EnvelopeKind::Command, event.session_id(), event.text());
            }
            Ok(outcome) => debug!(event = %event.id(), ?outcome, "Event consumed"),
            Err(e) => warn!(event = %event.id(), error = %e, "Event handling failed"),
        }

        for command in host.take_pending().into_iter().rev() {
            work.push_front(Event::Expanded(command));
        }
    }
}

/// [`Host`] bound to a single event, publishing onto the bus.
struct BusHost<'a> {
    bus_tx: &'a broadcast::Sender<Envelope>,
    session_id: String,
    event: EventId,
    pending: Mutex<Vec<ExpandedCommand>>,
}

impl<'a> BusHost<'a> {
    fn new(bus_tx: &'a broadcast::Sender<Envelope>, event: &Event) -> Self {
        Self {
            bus_tx,
            session_id: event.session_id().to_string(),
            event: event.id(),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn publish(&self, kind: EnvelopeKind, session_id: &str, body: &str) {
        // No subscribers is not an error.
        let _ = self
            .bus_tx
            .send(Envelope::new(kind, session_id, body, self.event));
    }

    fn take_pending(&self) -> Vec<ExpandedCommand> {
        self.pending
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default()
    }
}

impl Host for BusHost<'_> {
    fn reply<'a>(
        &'a self,
        session_id: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), HostError>> {
        self.publish(EnvelopeKind::Reply, session_id, text);
        Box::pin(async { Ok(()) })
    }

    fn stop_propagation(&self, event: EventId) -> BoxFuture<'_, Result<(), HostError>> {
        let _ = self
            .bus_tx
            .send(Envelope::new(EnvelopeKind::Suppressed, &self.session_id, "", event));
        Box::pin(async { Ok(()) })
    }

    fn resubmit(&self, command: ExpandedCommand) -> BoxFuture<'_, Result<(), HostError>> {
        let result = self
            .pending
            .lock()
            .map(|mut pending| pending.push(command))
            .map_err(|_| HostError::Resubmit("pending queue poisoned".to_string()));
        Box::pin(async move { result })
    }
}
