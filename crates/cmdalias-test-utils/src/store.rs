//! Temp-dir backed alias stores.

use std::path::PathBuf;
use std::sync::Arc;

use cmdalias_core::AliasStore;
use tempfile::TempDir;

/// An [`AliasStore`] whose file lives in a temp directory.
///
/// The directory is removed when this value is dropped.
pub struct TestStore {
    pub store: Arc<AliasStore>,
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TestStore {
    /// Empty store; the file does not exist yet.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("aliases.json");
        Self {
            store: Arc::new(AliasStore::new(&path)),
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Store opened over a file pre-filled with `content`.
    pub async fn with_file(content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("aliases.json");
        tokio::fs::write(&path, content)
            .await
            .expect("failed to write alias file");
        Self {
            store: Arc::new(AliasStore::open(&path).await),
            path,
            _temp_dir: temp_dir,
        }
    }

    /// A fresh store over the same file, as after a restart.
    pub async fn reopen(&self) -> AliasStore {
        AliasStore::open(&self.path).await
    }

    /// Raw file contents.
    pub async fn read_file(&self) -> String {
        tokio::fs::read_to_string(&self.path)
            .await
            .expect("failed to read alias file")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}
