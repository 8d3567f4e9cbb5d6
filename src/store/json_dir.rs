use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use uuid::Uuid;

use crate::error::{MigrationError, MigrationResult};
use crate::types::Document;

use super::{project_out, validate_document, DocumentStore, InsertOutcome, StoreSession, ID_FIELD};

const URI_SCHEME: &str = "file://";
const COLLECTION_EXT: &str = "jsonl";

/// Directory-backed document store.
///
/// `file:///var/lib/migrate` maps database `db` and collection `c` to
/// `/var/lib/migrate/db/c.jsonl`, one JSON document per line. The root directory must exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDirStore;

impl JsonDirStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for JsonDirStore {
    fn connect(&self, uri: &str, timeout: Duration) -> MigrationResult<Box<dyn StoreSession>> {
        let unreachable = |message: String| MigrationError::StoreUnreachable {
            uri: uri.to_string(),
            message,
        };
        let path = uri
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| unreachable(format!("unsupported uri scheme (expected {URI_SCHEME})")))?;
        let root = PathBuf::from(path);
        if !root.is_dir() {
            return Err(unreachable(format!("{} is not a directory", root.display())));
        }
        tracing::debug!(root = %root.display(), ?timeout, "document store session opened");
        Ok(Box::new(JsonDirSession { root }))
    }
}

struct JsonDirSession {
    root: PathBuf,
}

impl JsonDirSession {
    fn collection_path(&self, database: &str, collection: &str) -> MigrationResult<PathBuf> {
        for (what, name) in [("database", database), ("collection", collection)] {
            let valid = !name.is_empty()
                && name != "."
                && name != ".."
                && !name.contains(['/', '\\']);
            if !valid {
                return Err(MigrationError::Store {
                    message: format!("invalid {what} name '{name}'"),
                });
            }
        }
        Ok(self
            .root
            .join(database)
            .join(format!("{collection}.{COLLECTION_EXT}")))
    }
}

fn with_id(doc: Document) -> Document {
    if doc.contains_key(ID_FIELD) {
        return doc;
    }
    let mut out = Document::new();
    let id = Uuid::new_v4().simple().to_string();
    out.insert(ID_FIELD.to_string(), serde_json::Value::String(id));
    out.extend(doc);
    out
}

fn read_documents(path: &Path) -> MigrationResult<Vec<Document>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)?;
    let mut docs = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc = serde_json::from_str::<Document>(line).map_err(|e| MigrationError::Store {
            message: format!("corrupt document at {}:{}: {e}", path.display(), i + 1),
        })?;
        docs.push(doc);
    }
    Ok(docs)
}

impl StoreSession for JsonDirSession {
    fn ping(&mut self) -> MigrationResult<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(MigrationError::StoreUnreachable {
                uri: format!("{URI_SCHEME}{}", self.root.display()),
                message: "root directory disappeared".to_string(),
            })
        }
    }

    fn insert_many(
        &mut self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> MigrationResult<InsertOutcome> {
        let path = self.collection_path(database, collection)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut out = BufWriter::new(file);

        let mut outcome = InsertOutcome::default();
        for doc in documents {
            if let Err(reason) = validate_document(&doc) {
                tracing::debug!(collection, reason = %reason, "document rejected");
                outcome.rejected += 1;
                continue;
            }
            let written = serde_json::to_string(&with_id(doc))
                .map_err(MigrationError::from)
                .and_then(|line| writeln!(out, "{line}").map_err(MigrationError::from));
            match written {
                Ok(()) => outcome.inserted += 1,
                Err(e) => {
                    tracing::debug!(collection, err = %e, "document rejected");
                    outcome.rejected += 1;
                }
            }
        }
        out.flush()?;
        Ok(outcome)
    }

    fn find_all(
        &mut self,
        database: &str,
        collection: &str,
        exclude_fields: &[&str],
    ) -> MigrationResult<Vec<Document>> {
        let path = self.collection_path(database, collection)?;
        Ok(read_documents(&path)?
            .into_iter()
            .map(|doc| project_out(doc, exclude_fields))
            .collect())
    }

    fn close(self: Box<Self>) -> MigrationResult<()> {
        tracing::debug!(root = %self.root.display(), "document store session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(v: serde_json::Value) -> Document {
        match v {
            serde_json::Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn uri(dir: &Path) -> String {
        format!("{URI_SCHEME}{}", dir.display())
    }

    #[test]
    fn insert_then_find_all_round_trips_and_assigns_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new();
        let mut session = store.connect(&uri(dir.path()), Duration::from_secs(1)).unwrap();
        session.ping().unwrap();

        let outcome = session
            .insert_many("db", "stations", vec![doc(json!({"a": 1})), doc(json!({"a": 2}))])
            .unwrap();
        assert_eq!(outcome, InsertOutcome { inserted: 2, rejected: 0 });

        let with_ids = session.find_all("db", "stations", &[]).unwrap();
        assert!(with_ids.iter().all(|d| d.contains_key(ID_FIELD)));
        assert_eq!(with_ids[0].keys().next().map(String::as_str), Some(ID_FIELD));

        let projected = session.find_all("db", "stations", &[ID_FIELD]).unwrap();
        assert_eq!(projected, vec![doc(json!({"a": 1})), doc(json!({"a": 2}))]);
        session.close().unwrap();
    }

    #[test]
    fn ids_stay_unique_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new();
        for n in 0..2 {
            let mut session = store.connect(&uri(dir.path()), Duration::from_secs(1)).unwrap();
            session.insert_many("db", "runs", vec![doc(json!({"n": n}))]).unwrap();
            session.close().unwrap();
        }

        let mut session = store.connect(&uri(dir.path()), Duration::from_secs(1)).unwrap();
        let ids: Vec<_> = session
            .find_all("db", "runs", &[])
            .unwrap()
            .into_iter()
            .map(|d| d.get(ID_FIELD).cloned())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(Option::is_some));
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn invalid_documents_are_skipped_without_blocking_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = JsonDirStore::new()
            .connect(&uri(dir.path()), Duration::from_secs(1))
            .unwrap();
        let outcome = session
            .insert_many(
                "db",
                "c",
                vec![doc(json!({"a": 1})), doc(json!({"$bad": 1})), doc(json!({"a": 3}))],
            )
            .unwrap();
        assert_eq!(outcome, InsertOutcome { inserted: 2, rejected: 1 });
    }

    #[test]
    fn missing_collection_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = JsonDirStore::new()
            .connect(&uri(dir.path()), Duration::from_secs(1))
            .unwrap();
        assert!(session.find_all("db", "nothing", &[ID_FIELD]).unwrap().is_empty());
    }

    #[test]
    fn connect_fails_fast_for_unknown_scheme_or_missing_root() {
        let store = JsonDirStore::new();
        let err = store
            .connect("mongodb://localhost:27017", Duration::from_millis(10))
            .err()
            .unwrap();
        assert!(err.to_string().contains("unsupported uri scheme"));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert!(store.connect(&uri(&missing), Duration::from_millis(10)).is_err());
    }

    #[test]
    fn collection_names_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = JsonDirStore::new()
            .connect(&uri(dir.path()), Duration::from_secs(1))
            .unwrap();
        assert!(session.insert_many("db", "../x", vec![]).is_err());
    }
}
