//! Log capture for tests that assert on emitted diagnostics.

use cmdalias_core::{LogCollector, LogReader};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Capture events emitted on the current thread until the guard is dropped.
///
/// Use with `#[tokio::test]` (current-thread runtime) so that spawned work
/// logs on the same thread.
///
/// ```ignore
/// let (logs, _guard) = capture_logs();
/// store.load().await;
/// assert!(logs.contains("Alias file unusable"));
/// ```
pub fn capture_logs() -> (LogReader, DefaultGuard) {
    let collector = LogCollector::new(256);
    let reader = collector.reader();
    let guard = tracing_subscriber::registry().with(collector).set_default();
    (reader, guard)
}
