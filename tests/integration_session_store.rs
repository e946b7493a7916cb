// Session identifiers must survive process restarts; exercise the real
// SQLite-backed store against a temp file, reopening between steps.

use podium::session::{KvStore, SessionStore, SqliteKvStore};
use tempfile::tempdir;

#[test]
fn user_id_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.db");

    let first = {
        let kv = SqliteKvStore::open(&path).unwrap();
        SessionStore::new(kv).get_or_create_user_id()
    };
    let second = {
        let kv = SqliteKvStore::open(&path).unwrap();
        SessionStore::new(kv).get_or_create_user_id()
    };

    assert_eq!(first, second);
    assert!(first.starts_with("user_"));
}

#[test]
fn speech_history_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.db");

    {
        let kv = SqliteKvStore::open(&path).unwrap();
        let mut session = SessionStore::new(kv);
        session.add_speech("sp-1");
        session.add_speech("sp-2");
        session.add_rehearsal("rh-1");
    }

    let kv = SqliteKvStore::open(&path).unwrap();
    let mut session = SessionStore::new(kv);
    assert_eq!(session.speeches(), vec!["sp-1", "sp-2"]);
    assert_eq!(session.get_current_speech().as_deref(), Some("sp-2"));
    assert_eq!(session.get_current_rehearsal().as_deref(), Some("rh-1"));

    session.delete_speech("sp-1");
    assert_eq!(session.speeches(), vec!["sp-2"]);
    // deleting a non-current speech still clears the current one
    assert_eq!(session.get_current_speech(), None);
}

#[test]
fn corrupt_speech_list_on_disk_reads_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.db");

    {
        let mut kv = SqliteKvStore::open(&path).unwrap();
        kv.set("speeches", "definitely not json");
    }

    let kv = SqliteKvStore::open(&path).unwrap();
    let session = SessionStore::new(kv);
    assert!(session.speeches().is_empty());
}
