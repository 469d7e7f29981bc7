//! Durable alias table.
//!
//! [`AliasStore`] keeps the alias table in memory as an immutable,
//! insertion-ordered `Arc<Vec<AliasDefinition>>` and mirrors it to a JSON file
//! after every mutation. Mutations are serialized through an async writer
//! lock held across the file write, and the in-memory table is swapped in a
//! single step, so readers always see either the old or the new table.
//!
//! ## File format
//!
//! ```json
//! {
//!   "version": 1,
//!   "aliases": [
//!     { "name": "hi", "commands": ["/greet {args}"] }
//!   ]
//! }
//! ```
//!
//! A missing file loads as an empty table. An unreadable, unparseable, or
//! otherwise invalid file also loads as an empty table, with a warning.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Errors from the alias store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid alias: {0}")]
    InvalidAlias(String),

    #[error("failed to read alias file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse alias file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("alias file is invalid: {0}")]
    Corrupt(String),

    #[error("failed to persist alias file: {0}")]
    Persist(#[source] std::io::Error),
}

/// An alias name and the commands it expands to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasDefinition {
    pub name: String,
    pub commands: Vec<String>,
}

impl AliasDefinition {
    /// Build a definition, trimming the name and every command and dropping
    /// blank commands.
    pub fn new(name: &str, commands: Vec<String>) -> Result<Self, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidAlias(
                "alias name must not be empty".to_string(),
            ));
        }

        let commands: Vec<String> = commands
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if commands.is_empty() {
            return Err(StoreError::InvalidAlias("no commands supplied".to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            commands,
        })
    }

    /// Whether this definition already satisfies the invariants enforced by
    /// [`AliasDefinition::new`].
    fn is_normalized(&self) -> bool {
        !self.name.is_empty()
            && self.name.trim() == self.name
            && !self.commands.is_empty()
            && self
                .commands
                .iter()
                .all(|c| !c.is_empty() && c.trim() == c)
    }
}

/// Whether an upsert created a new alias or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// An immutable view of the alias table at one point in time.
///
/// Cheap to clone; iteration can be restarted any number of times and is
/// unaffected by later mutations of the store.
#[derive(Debug, Clone, Default)]
pub struct AliasSnapshot(Arc<Vec<AliasDefinition>>);

impl AliasSnapshot {
    /// Aliases in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, AliasDefinition> {
        self.0.iter()
    }

    /// Number of aliases in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up an alias by its trimmed name.
    pub fn get(&self, name: &str) -> Option<&AliasDefinition> {
        self.0.iter().find(|a| a.name == name)
    }

    /// Alias names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|a| a.name.as_str()).collect()
    }

    /// Borrow the underlying table, e.g. for serialization.
    pub fn as_slice(&self) -> &[AliasDefinition] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a AliasSnapshot {
    type Item = &'a AliasDefinition;
    type IntoIter = std::slice::Iter<'a, AliasDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Serialize)]
struct AliasFileRef<'a> {
    version: u32,
    aliases: &'a [AliasDefinition],
}

#[derive(Deserialize)]
struct AliasFile {
    version: u32,
    aliases: Vec<AliasDefinition>,
}

/// The durable alias table shared by every session.
#[derive(Debug)]
pub struct AliasStore {
    path: PathBuf,
    table: RwLock<Arc<Vec<AliasDefinition>>>,
    writer: tokio::sync::Mutex<()>,
    dirty: AtomicBool,
}

impl AliasStore {
    /// Create an empty store bound to `path` without touching the file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: RwLock::new(Arc::new(Vec::new())),
            writer: tokio::sync::Mutex::new(()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Create a store bound to `path` and load whatever it currently holds.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self::new(path);
        store.load().await;
        store
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current table in insertion order.
    pub fn list(&self) -> AliasSnapshot {
        AliasSnapshot(self.current())
    }

    /// Copy of a single alias.
    pub fn get(&self, name: &str) -> Option<AliasDefinition> {
        self.current().iter().find(|a| a.name == name).cloned()
    }

    /// Number of aliases currently stored.
    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    /// Whether the last persist attempt failed and the file is behind memory.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Insert a new alias at the end, or replace the commands of an existing
    /// one in place.
    ///
    /// Only an invalid name or command list is reported as an error. A failed
    /// write is logged and retried on the next mutation.
    pub async fn upsert(
        &self,
        name: &str,
        commands: Vec<String>,
    ) -> Result<UpsertOutcome, StoreError> {
        let definition = AliasDefinition::new(name, commands)?;

        let _writer = self.writer.lock().await;
        let mut next = (*self.current()).clone();
        let outcome = match next.iter_mut().find(|a| a.name == definition.name) {
            Some(existing) => {
                existing.commands = definition.commands;
                UpsertOutcome::Updated
            }
            None => {
                next.push(definition);
                UpsertOutcome::Created
            }
        };

        let next = Arc::new(next);
        self.replace(Arc::clone(&next));
        self.persist(&next).await;

        debug!(alias = %name.trim(), ?outcome, "Alias upserted");
        Ok(outcome)
    }

    /// Delete an alias. Returns whether anything was removed.
    pub async fn remove(&self, name: &str) -> bool {
        let _writer = self.writer.lock().await;
        let current = self.current();
        if !current.iter().any(|a| a.name == name) {
            return false;
        }

        let next: Vec<AliasDefinition> = current
            .iter()
            .filter(|a| a.name != name)
            .cloned()
            .collect();
        let next = Arc::new(next);
        self.replace(Arc::clone(&next));
        self.persist(&next).await;

        debug!(alias = %name, "Alias removed");
        true
    }

    /// Replace the table with the contents of the backing file.
    ///
    /// Never fails: a missing file yields an empty table, and an unreadable
    /// or invalid file yields an empty table plus a warning. Returns the
    /// number of aliases loaded.
    pub async fn load(&self) -> usize {
        let _writer = self.writer.lock().await;

        let table = match read_file(&self.path).await {
            Ok(Some(aliases)) => {
                info!(path = %self.path.display(), count = aliases.len(), "Loaded aliases");
                aliases
            }
            Ok(None) => {
                info!(path = %self.path.display(), "Alias file not found, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Alias file unusable, starting with an empty table"
                );
                Vec::new()
            }
        };

        let count = table.len();
        self.replace(Arc::new(table));
        self.dirty.store(false, Ordering::Release);
        count
    }

    /// Write the full table to the backing file atomically.
    pub async fn save(&self) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        let table = self.current();
        write_atomic(&self.path, &table).await?;
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    /// Retry a failed persist, if one is pending.
    pub async fn flush(&self) -> Result<(), StoreError> {
        if self.is_dirty() {
            self.save().await
        } else {
            Ok(())
        }
    }

    async fn persist(&self, table: &[AliasDefinition]) {
        match write_atomic(&self.path, table).await {
            Ok(()) => self.dirty.store(false, Ordering::Release),
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to persist aliases; in-memory table kept, will retry on next change"
                );
            }
        }
    }

    fn current(&self) -> Arc<Vec<AliasDefinition>> {
        match self.table.read() {
            Ok(table) => Arc::clone(&table),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn replace(&self, next: Arc<Vec<AliasDefinition>>) {
        match self.table.write() {
            Ok(mut table) => *table = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

/// Read and validate the alias file. `Ok(None)` means the file is absent.
async fn read_file(path: &Path) -> Result<Option<Vec<AliasDefinition>>, StoreError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Read(e)),
    };

    let file: AliasFile = serde_json::from_str(&content)?;
    if file.version != FORMAT_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported format version {}",
            file.version
        )));
    }

    let mut seen = HashSet::new();
    for (i, alias) in file.aliases.iter().enumerate() {
        if !alias.is_normalized() {
            return Err(StoreError::Corrupt(format!(
                "aliases[{i}] has an empty or untrimmed name or command"
            )));
        }
        if !seen.insert(alias.name.as_str()) {
            return Err(StoreError::Corrupt(format!(
                "aliases[{i}] duplicates alias {:?}",
                alias.name
            )));
        }
    }

    Ok(Some(file.aliases))
}

/// Serialize `table` next to `path` and rename it into place.
async fn write_atomic(path: &Path, table: &[AliasDefinition]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(StoreError::Persist)?;
    }

    let body = serde_json::to_vec_pretty(&AliasFileRef {
        version: FORMAT_VERSION,
        aliases: table,
    })
    .map_err(|e| StoreError::Persist(std::io::Error::other(e)))?;

    let tmp_path = temp_path(path);
    tokio::fs::write(&tmp_path, &body)
        .await
        .map_err(StoreError::Persist)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(StoreError::Persist(e));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cmds(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn names(store: &AliasStore) -> Vec<String> {
        store.list().iter().map(|a| a.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates_in_place() {
        let tmp = TempDir::new().unwrap();
        let store = AliasStore::new(tmp.path().join("aliases.json"));

        assert_eq!(
            store.upsert("a", cmds(&["/one"])).await.unwrap(),
            UpsertOutcome::Created
        );
        store.upsert("b", cmds(&["/two"])).await.unwrap();
        assert_eq!(
            store.upsert("a", cmds(&["/three", "/four"])).await.unwrap(),
            UpsertOutcome::Updated
        );

        assert_eq!(names(&store), vec!["a", "b"]);
        let a = store.get("a").unwrap();
        assert_eq!(a.commands, vec!["/three", "/four"]);
        assert_eq!(store.list().iter().filter(|x| x.name == "a").count(), 1);
    }

    #[tokio::test]
    async fn test_upsert_normalizes_input() {
        let tmp = TempDir::new().unwrap();
        let store = AliasStore::new(tmp.path().join("aliases.json"));

        store
            .upsert("  hi ", cmds(&["  /greet {args} ", "", "   "]))
            .await
            .unwrap();
        assert_eq!(
            store.get("hi").unwrap(),
            AliasDefinition {
                name: "hi".to_string(),
                commands: cmds(&["/greet {args}"]),
            }
        );
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_commands_and_leaves_store_unchanged() {
        let tmp = TempDir::new().unwrap();
        let store = AliasStore::new(tmp.path().join("aliases.json"));
        store.upsert("keep", cmds(&["/x"])).await.unwrap();

        let err = store.upsert("new", Vec::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidAlias(_)));
        let err = store.upsert("keep", cmds(&["  "])).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidAlias(_)));
        let err = store.upsert("   ", cmds(&["/x"])).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidAlias(_)));

        assert_eq!(names(&store), vec!["keep"]);
        assert_eq!(store.get("keep").unwrap().commands, vec!["/x"]);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = AliasStore::new(tmp.path().join("aliases.json"));
        store.upsert("a", cmds(&["/a"])).await.unwrap();
        store.upsert("b", cmds(&["/b"])).await.unwrap();

        assert!(store.remove("a").await);
        assert!(!store.remove("a").await);
        assert!(!store.remove("missing").await);
        assert_eq!(names(&store), vec!["b"]);
    }

    #[tokio::test]
    async fn test_save_load_round_trip_preserves_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("aliases.json");
        let store = AliasStore::new(&path);
        store.upsert("zeta", cmds(&["/z"])).await.unwrap();
        store.upsert("alpha", cmds(&["/a1", "/a2 {args}"])).await.unwrap();
        store.upsert("mid", cmds(&[r#"/say "x y""#])).await.unwrap();
        store.save().await.unwrap();

        let reopened = AliasStore::open(&path).await;
        assert_eq!(reopened.list().as_slice(), store.list().as_slice());
        assert_eq!(names(&reopened), vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_mutations_persist_without_explicit_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("aliases.json");
        let store = AliasStore::new(&path);
        store.upsert("a", cmds(&["/a"])).await.unwrap();
        store.upsert("b", cmds(&["/b"])).await.unwrap();
        store.remove("a").await;

        let reopened = AliasStore::open(&path).await;
        assert_eq!(names(&reopened), vec!["b"]);
        assert!(!tokio::fs::try_exists(temp_path(&path)).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = AliasStore::open(tmp.path().join("absent.json")).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("aliases.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        let store = AliasStore::open(&path).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_entries_load_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("aliases.json");

        let bodies = [
            r#"{"version":1,"aliases":[{"name":"ok","commands":["/x"]},{"name":"","commands":["/y"]}]}"#,
            r#"{"version":1,"aliases":[{"name":"a","commands":[]}]}"#,
            r#"{"version":1,"aliases":[{"name":"a","commands":["/x"]},{"name":"a","commands":["/y"]}]}"#,
            r#"{"version":2,"aliases":[]}"#,
            r#"[{"name":"a","commands":["/x"]}]"#,
        ];
        for body in bodies {
            tokio::fs::write(&path, body).await.unwrap();
            let store = AliasStore::open(&path).await;
            assert!(store.is_empty(), "expected empty table for {body}");
        }
    }

    #[tokio::test]
    async fn test_load_replaces_table_wholesale() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("aliases.json");
        tokio::fs::write(
            &path,
            r#"{"version":1,"aliases":[{"name":"x","commands":["/x"]}]}"#,
        )
        .await
        .unwrap();

        let store = AliasStore::new(&path);
        assert_eq!(store.load().await, 1);
        tokio::fs::write(&path, b"garbage").await.unwrap();
        assert_eq!(store.load().await, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_later_mutations() {
        let tmp = TempDir::new().unwrap();
        let store = AliasStore::new(tmp.path().join("aliases.json"));
        store.upsert("a", cmds(&["/a"])).await.unwrap();

        let snapshot = store.list();
        store.upsert("b", cmds(&["/b"])).await.unwrap();
        store.remove("a").await;

        assert_eq!(snapshot.names(), vec!["a"]);
        assert_eq!(snapshot.iter().count(), snapshot.iter().count());
        assert_eq!(store.list().names(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_memory_and_marks_dirty() {
        let tmp = TempDir::new().unwrap();
        // A regular file where a directory is expected makes every write fail.
        let blocker = tmp.path().join("blocker");
        tokio::fs::write(&blocker, b"").await.unwrap();
        let store = AliasStore::new(blocker.join("aliases.json"));

        let outcome = store.upsert("a", cmds(&["/a"])).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);
        assert_eq!(names(&store), vec!["a"]);
        assert!(store.is_dirty());
        assert!(store.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_flush_retries_after_failure() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("later");
        tokio::fs::write(&dir, b"").await.unwrap();
        let path = dir.join("aliases.json");
        let store = AliasStore::new(&path);
        store.upsert("a", cmds(&["/a"])).await.unwrap();
        assert!(store.is_dirty());

        tokio::fs::remove_file(&dir).await.unwrap();
        store.flush().await.unwrap();
        assert!(!store.is_dirty());
        assert_eq!(names(&AliasStore::open(&path).await), vec!["a"]);
    }

    #[tokio::test]
    async fn test_concurrent_writers_are_serialized() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("aliases.json");
        let store = Arc::new(AliasStore::new(&path));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.upsert(&format!("a{i}"), vec![format!("/cmd{i}")]).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.len(), 16);
        let reopened = AliasStore::open(&path).await;
        assert_eq!(reopened.len(), 16);
    }
}
