use crate::app_dirs::AppDirs;
use rand::Rng;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::warn;

const KEY_USER_ID: &str = "userId";
const KEY_SPEECHES: &str = "speeches";
const KEY_CURRENT_SPEECH: &str = "currentSpeech";
const KEY_CURRENT_REHEARSAL: &str = "currentRehearsal";

/// Synchronous string-to-string persistence, the only thing the session
/// store assumes about its backing. Values survive restarts within one
/// profile; nothing is shared across machines.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// SQLite-backed key-value store, one `kv` table.
#[derive(Debug)]
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    pub fn open_default() -> rusqlite::Result<Self> {
        let path = AppDirs::session_db_path().unwrap_or_else(|| PathBuf::from("podium_session.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Err(err) = self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        ) {
            warn!(%err, key, "session write failed");
        }
    }

    fn remove(&mut self, key: &str) {
        if let Err(err) = self.conn.execute("DELETE FROM kv WHERE key = ?1", [key]) {
            warn!(%err, key, "session delete failed");
        }
    }
}

/// In-memory store for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    map: std::collections::HashMap<String, String>,
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }
}

/// Owner of the persisted session identifiers: user id, speech history,
/// active speech and active rehearsal. No other component touches the
/// backing store directly.
pub struct SessionStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stable opaque identifier for this profile, created on first access.
    pub fn get_or_create_user_id(&mut self) -> String {
        if let Some(id) = self.store.get(KEY_USER_ID) {
            return id;
        }
        let id = generate_user_id();
        self.store.set(KEY_USER_ID, &id);
        id
    }

    /// Append `id` to the speech history and make it the active speech.
    pub fn add_speech(&mut self, id: &str) {
        let mut speeches = self.speeches();
        speeches.push(id.to_string());
        self.write_speeches(&speeches);
        self.store.set(KEY_CURRENT_SPEECH, id);
    }

    /// Remove `id` from the history and clear the active speech. The
    /// clear is unconditional even when `id` is not the active speech;
    /// that is the observed contract, kept as-is.
    pub fn delete_speech(&mut self, id: &str) {
        let speeches: Vec<String> = self
            .speeches()
            .into_iter()
            .filter(|existing| existing != id)
            .collect();
        self.write_speeches(&speeches);
        self.store.remove(KEY_CURRENT_SPEECH);
    }

    /// Ordered speech history; a missing or corrupt stored list reads as
    /// empty rather than failing.
    pub fn speeches(&self) -> Vec<String> {
        let Some(raw) = self.store.get(KEY_SPEECHES) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(list) => list,
            Err(err) => {
                warn!(%err, "corrupt speech list in session store, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn get_current_speech(&self) -> Option<String> {
        self.store.get(KEY_CURRENT_SPEECH)
    }

    pub fn add_rehearsal(&mut self, id: &str) {
        self.store.set(KEY_CURRENT_REHEARSAL, id);
    }

    pub fn get_current_rehearsal(&self) -> Option<String> {
        self.store.get(KEY_CURRENT_REHEARSAL)
    }

    pub fn delete_current_rehearsal(&mut self) {
        self.store.remove(KEY_CURRENT_REHEARSAL);
    }

    fn write_speeches(&mut self, speeches: &[String]) {
        let encoded = serde_json::to_string(speeches).unwrap_or_else(|_| "[]".to_string());
        self.store.set(KEY_SPEECHES, &encoded);
    }
}

fn generate_user_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| {
            let n = rng.gen_range(0..36u32);
            std::char::from_digit(n, 36).unwrap_or('0')
        })
        .collect();
    format!("user_{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore<MemoryKvStore> {
        SessionStore::new(MemoryKvStore::default())
    }

    #[test]
    fn user_id_is_stable_across_calls() {
        let mut session = store();
        let first = session.get_or_create_user_id();
        let second = session.get_or_create_user_id();
        assert_eq!(first, second);
        assert!(first.starts_with("user_"));
        assert_eq!(first.len(), "user_".len() + 9);
    }

    #[test]
    fn generated_ids_are_base36() {
        let id = generate_user_id();
        let suffix = id.strip_prefix("user_").unwrap();
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn add_speech_appends_and_sets_current() {
        let mut session = store();
        session.add_speech("sp-1");
        session.add_speech("sp-2");
        assert_eq!(session.speeches(), vec!["sp-1", "sp-2"]);
        assert_eq!(session.get_current_speech().as_deref(), Some("sp-2"));
    }

    #[test]
    fn delete_speech_removes_from_history() {
        let mut session = store();
        session.add_speech("sp-1");
        session.add_speech("sp-2");
        session.delete_speech("sp-1");
        assert_eq!(session.speeches(), vec!["sp-2"]);
    }

    #[test]
    fn delete_speech_clears_current_even_when_not_current() {
        let mut session = store();
        session.add_speech("sp-1");
        session.add_speech("sp-2");
        // sp-2 is current; deleting sp-1 still clears it
        session.delete_speech("sp-1");
        assert_eq!(session.get_current_speech(), None);
    }

    #[test]
    fn corrupt_speech_list_reads_as_empty() {
        let mut kv = MemoryKvStore::default();
        kv.set(KEY_SPEECHES, "{not a list");
        let mut session = SessionStore::new(kv);
        assert!(session.speeches().is_empty());
        // and stays usable
        session.add_speech("sp-1");
        assert_eq!(session.speeches(), vec!["sp-1"]);
    }

    #[test]
    fn rehearsal_lifecycle() {
        let mut session = store();
        assert_eq!(session.get_current_rehearsal(), None);
        session.add_rehearsal("rh-9");
        assert_eq!(session.get_current_rehearsal().as_deref(), Some("rh-9"));
        session.delete_current_rehearsal();
        assert_eq!(session.get_current_rehearsal(), None);
    }

    #[test]
    fn sqlite_store_round_trips() {
        let mut kv = SqliteKvStore::open_in_memory().unwrap();
        assert_eq!(kv.get("k"), None);
        kv.set("k", "v1");
        kv.set("k", "v2");
        assert_eq!(kv.get("k").as_deref(), Some("v2"));
        kv.remove("k");
        assert_eq!(kv.get("k"), None);
    }
}
