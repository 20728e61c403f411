use chrono::Local;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collections::{DailyMessages, Journal, LastUnlocked, LoveNotes, Songs, Timeline};
use crate::utils::timestamp_prefix;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create data directory {}: {source}", path.display())]
    DirectoryError { path: PathBuf, source: io::Error },
    #[error("Failed to write document {}: {source}", path.display())]
    WriteError { path: PathBuf, source: io::Error },
    #[error("Failed to move damaged document {} aside: {source}", path.display())]
    QuarantineError { path: PathBuf, source: io::Error },
    #[error("Failed to serialize document: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// A document as read from disk. `damaged` is set when the file exists
/// but could not be read or parsed, and `value` is the empty stand-in.
struct Loaded<T> {
    value: T,
    damaged: bool,
}

impl<T> Loaded<T> {
    fn intact(value: T) -> Self {
        Self { value, damaged: false }
    }

    fn damaged(value: T) -> Self {
        Self { value, damaged: true }
    }
}

/// One structured entry of a collection.
///
/// `validate` runs after deserialization on every load; a record that
/// returns `Err` is skipped instead of failing the whole collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug {
    fn validate(self) -> Result<Self, String> {
        Ok(self)
    }
}

/// A named, ordered sequence of records persisted as one JSON array.
pub trait Collection {
    const NAME: &'static str;
    type Record: Record;

    /// Written to disk the first time the document is found missing or empty
    fn seed() -> Vec<Self::Record> {
        Vec::new()
    }
}

/// A named single JSON value persisted as its own document.
pub trait Scalar {
    const NAME: &'static str;
    type Value: Serialize + DeserializeOwned + Default + Clone + Debug;
}

/// JSON documents under one data directory, one file per collection.
///
/// Every load-modify-store cycle holds a per-document mutex, so appends
/// made through the same `DocumentStore` never lose each other's
/// updates. Separate processes sharing the directory are last-writer-wins.
#[derive(Debug)]
pub struct DocumentStore {
    root: PathBuf,
    locks: Mutex<HashMap<&'static str, Arc<Mutex<()>>>>,
}

impl DocumentStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::DirectoryError {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the JSON document backing `name`
    pub fn document_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    fn lock_for(&self, name: &'static str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(name).or_default().clone()
    }

    /// Read every record of a collection, seeding it if the document is absent
    pub fn load_collection<C: Collection>(&self) -> Result<Vec<C::Record>, StoreError> {
        let lock = self.lock_for(C::NAME);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_collection::<C>()?.value)
    }

    /// Append one record and persist the whole collection. Returns the new length.
    pub fn append_record<C: Collection>(&self, record: C::Record) -> Result<usize, StoreError> {
        let lock = self.lock_for(C::NAME);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let loaded = self.read_collection::<C>()?;
        if loaded.damaged {
            self.quarantine(C::NAME)?;
        }
        let mut records = loaded.value;
        records.push(record);
        self.write_document(C::NAME, &records)?;
        info!(collection = C::NAME, len = records.len(), "appended record");
        Ok(records.len())
    }

    /// Replace the whole collection
    pub fn overwrite_collection<C: Collection>(
        &self,
        records: &[C::Record],
    ) -> Result<(), StoreError> {
        let lock = self.lock_for(C::NAME);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_document(C::NAME, &records)?;
        info!(collection = C::NAME, len = records.len(), "overwrote collection");
        Ok(())
    }

    pub fn load_scalar<S: Scalar>(&self) -> Result<S::Value, StoreError> {
        let lock = self.lock_for(S::NAME);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_scalar::<S>()?.value)
    }

    /// Read, modify and store a scalar under one lock.
    ///
    /// `update` returns whether it changed the value; nothing is written
    /// when it returns `false`. Returns what `update` returned.
    pub fn update_scalar<S: Scalar>(
        &self,
        update: impl FnOnce(&mut S::Value) -> bool,
    ) -> Result<bool, StoreError> {
        let lock = self.lock_for(S::NAME);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut loaded = self.read_scalar::<S>()?;
        if !update(&mut loaded.value) {
            return Ok(false);
        }
        if loaded.damaged {
            self.quarantine(S::NAME)?;
        }
        self.write_document(S::NAME, &loaded.value)?;
        info!(document = S::NAME, value = ?loaded.value, "updated scalar");
        Ok(true)
    }

    pub fn overwrite_scalar<S: Scalar>(&self, value: &S::Value) -> Result<(), StoreError> {
        let lock = self.lock_for(S::NAME);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_document(S::NAME, value)?;
        info!(document = S::NAME, ?value, "overwrote scalar");
        Ok(())
    }

    /// Truncate every collection to `[]` and reset every scalar
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.overwrite_collection::<Timeline>(&[])?;
        self.overwrite_collection::<Journal>(&[])?;
        self.overwrite_collection::<LoveNotes>(&[])?;
        self.overwrite_collection::<Songs>(&[])?;
        self.overwrite_collection::<DailyMessages>(&[])?;
        self.overwrite_scalar::<LastUnlocked>(&None)?;
        Ok(())
    }

    /// Every document in one JSON object keyed by document name
    pub fn export(&self) -> Result<Value, StoreError> {
        let mut doc = Map::new();
        doc.insert(
            Timeline::NAME.to_string(),
            serde_json::to_value(self.load_collection::<Timeline>()?)?,
        );
        doc.insert(
            Journal::NAME.to_string(),
            serde_json::to_value(self.load_collection::<Journal>()?)?,
        );
        doc.insert(
            LoveNotes::NAME.to_string(),
            serde_json::to_value(self.load_collection::<LoveNotes>()?)?,
        );
        doc.insert(
            Songs::NAME.to_string(),
            serde_json::to_value(self.load_collection::<Songs>()?)?,
        );
        doc.insert(
            DailyMessages::NAME.to_string(),
            serde_json::to_value(self.load_collection::<DailyMessages>()?)?,
        );
        doc.insert(
            LastUnlocked::NAME.to_string(),
            serde_json::to_value(self.load_scalar::<LastUnlocked>()?)?,
        );
        Ok(Value::Object(doc))
    }

    /// Read the document for a collection. Caller holds the collection lock.
    fn read_collection<C: Collection>(&self) -> Result<Loaded<Vec<C::Record>>, StoreError> {
        let path = self.document_path(C::NAME);
        let Some(contents) = self.read_document(C::NAME, &path) else {
            return Ok(Loaded::damaged(Vec::new()));
        };

        if contents.trim().is_empty() {
            let seed = C::seed();
            self.write_document(C::NAME, &seed)?;
            info!(collection = C::NAME, len = seed.len(), "seeded collection");
            return Ok(Loaded::intact(seed));
        }

        let values: Vec<Value> = match serde_json::from_str(&contents) {
            Ok(values) => values,
            Err(e) => {
                warn!(
                    collection = C::NAME,
                    path = %path.display(),
                    error = %e,
                    "malformed collection document, treating as empty"
                );
                return Ok(Loaded::damaged(Vec::new()));
            }
        };

        let mut records = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let parsed = serde_json::from_value::<C::Record>(value)
                .map_err(|e| e.to_string())
                .and_then(<C::Record as Record>::validate);
            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => {
                    warn!(collection = C::NAME, index, %reason, "skipping invalid record")
                }
            }
        }
        debug!(collection = C::NAME, len = records.len(), "loaded collection");
        Ok(Loaded::intact(records))
    }

    /// Read a scalar document. Caller holds its lock.
    fn read_scalar<S: Scalar>(&self) -> Result<Loaded<S::Value>, StoreError> {
        let path = self.document_path(S::NAME);
        let Some(contents) = self.read_document(S::NAME, &path) else {
            return Ok(Loaded::damaged(S::Value::default()));
        };
        if contents.trim().is_empty() {
            let value = S::Value::default();
            self.write_document(S::NAME, &value)?;
            return Ok(Loaded::intact(value));
        }
        match serde_json::from_str(&contents) {
            Ok(value) => Ok(Loaded::intact(value)),
            Err(e) => {
                warn!(document = S::NAME, error = %e, "malformed scalar document, using default");
                Ok(Loaded::damaged(S::Value::default()))
            }
        }
    }

    /// Rename a damaged document to `<name>.json.corrupt-<timestamp>` so the
    /// next write does not destroy it.
    fn quarantine(&self, name: &str) -> Result<PathBuf, StoreError> {
        let path = self.document_path(name);
        let stamp = timestamp_prefix(Local::now().naive_local());
        let aside = self.root.join(format!("{name}.json.corrupt-{stamp}"));
        fs::rename(&path, &aside).map_err(|source| StoreError::QuarantineError {
            path: path.clone(),
            source,
        })?;
        warn!(
            document = name,
            from = %path.display(),
            to = %aside.display(),
            "moved damaged document aside"
        );
        Ok(aside)
    }

    /// `Some("")` for a missing document, `None` when it exists but cannot be read
    fn read_document(&self, name: &str, path: &Path) -> Option<String> {
        match fs::read_to_string(path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Some(String::new()),
            Err(e) => {
                warn!(document = name, path = %path.display(), error = %e, "unreadable document");
                None
            }
        }
    }

    /// Pretty-printed write through a sibling temp file and a rename
    fn write_document<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let mut json = serde_json::to_string_pretty(value)?;
        json.push('\n');

        let path = self.document_path(name);
        let tmp = self.root.join(format!(".{name}.json.tmp"));
        fs::write(&tmp, json).map_err(|source| StoreError::WriteError {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::WriteError {
            path: path.clone(),
            source,
        })?;
        Ok(())
    }
}
