#![deny(unsafe_code)]

//! Shared test utilities for the cmdalias workspace.
//!
//! Provides config builders, temp-dir backed stores and daemons, a recording
//! [`Host`](cmdalias_core::Host), and tracing helpers so that integration
//! tests stay short.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! cmdalias-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon;
pub mod host;
pub mod store;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use daemon::TestDaemon;
pub use host::{HostCall, RecordingHost};
pub use store::TestStore;
