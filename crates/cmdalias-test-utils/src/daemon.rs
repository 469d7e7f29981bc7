//! Daemon test helpers.
//!
//! [`TestDaemon`] builds an engine from a TOML config whose alias file lives
//! in a temp directory, spawns the event loop, and collects envelopes.

use std::path::PathBuf;
use std::sync::Arc;

use cmdalias_config::AppConfig;
use cmdalias_core::{AliasDaemon, AliasEngine, DaemonHandle, Envelope, MemorySessionData};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A running daemon with an owned temp directory.
///
/// The temp directory is deleted when this value is dropped.
pub struct TestDaemon {
    pub engine: Arc<AliasEngine>,
    pub handle: DaemonHandle,
    pub store_path: PathBuf,
    bus_rx: broadcast::Receiver<Envelope>,
    task: Option<JoinHandle<()>>,
    _temp_dir: TempDir,
}

impl TestDaemon {
    /// Start a daemon from the given TOML. `[store] path` is always
    /// overridden to point into the temp directory.
    pub async fn with_toml(toml_content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("cmdalias.toml");
        tokio::fs::write(&config_path, toml_content)
            .await
            .expect("failed to write test config");

        let mut config = AppConfig::load(&config_path)
            .await
            .expect("failed to parse test config");
        let store_path = temp_dir.path().join("aliases.json");
        config.store.path = store_path.display().to_string();

        Self::start(config, store_path, temp_dir).await
    }

    /// Start a daemon with default configuration.
    pub async fn default_config() -> Self {
        Self::with_toml("").await
    }

    async fn start(config: AppConfig, store_path: PathBuf, temp_dir: TempDir) -> Self {
        let engine = AliasEngine::from_config(&config, Arc::new(MemorySessionData::new()))
            .await
            .expect("failed to build engine");
        let engine = Arc::new(engine);

        let (daemon, handle) = AliasDaemon::new(Arc::clone(&engine));
        let bus_rx = handle.subscribe();
        let task = tokio::spawn(daemon.run());

        Self {
            engine,
            handle,
            store_path,
            bus_rx,
            task: Some(task),
            _temp_dir: temp_dir,
        }
    }

    /// Submit raw text from `session_id`.
    pub async fn send(&self, session_id: &str, text: &str) {
        self.handle
            .submit(session_id, text)
            .await
            .expect("daemon stopped unexpectedly");
    }

    /// Shut down, wait for the loop to finish, and return every envelope
    /// published since start. The temp directory stays until drop.
    pub async fn finish(&mut self) -> Vec<Envelope> {
        if let Some(task) = self.task.take() {
            self.handle
                .shutdown()
                .await
                .expect("daemon stopped unexpectedly");
            task.await.expect("daemon task panicked");
        }

        let mut envelopes = Vec::new();
        while let Ok(envelope) = self.bus_rx.try_recv() {
            envelopes.push(envelope);
        }
        envelopes
    }
}
