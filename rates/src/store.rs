//! Durable JSON blob storage with atomic replacement.
//!
//! Every save goes to a uniquely named temporary file in the target
//! directory and is then renamed over the canonical path, so a concurrent
//! reader sees either the previous complete document or the new one.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{RatesError, RatesResult};

/// Storage for one opaque structured document.
pub trait BlobStore: Send + Sync {
    /// Replace the stored document.
    fn save(&self, data: &Value) -> RatesResult<()>;

    /// Load the stored document. A missing document is an empty object.
    fn load(&self) -> RatesResult<Value>;

    /// Whether a document has been written.
    fn exists(&self) -> bool;

    /// Location of the document, for diagnostics.
    fn path(&self) -> &Path;
}

/// Load and deserialize a document whose fields all have defaults.
pub fn load_typed<T: DeserializeOwned>(store: &dyn BlobStore) -> RatesResult<T> {
    let value = store.load()?;
    serde_json::from_value(value).map_err(|e| RatesError::storage(store.path(), e))
}

/// Serialize and save a document.
pub fn save_typed<T: Serialize>(store: &dyn BlobStore, data: &T) -> RatesResult<()> {
    let value = serde_json::to_value(data).map_err(|e| RatesError::storage(store.path(), e))?;
    store.save(&value)
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for the given file path. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(path = %path.display(), "JSON store initialized");
        Self { path }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());
        let temp_name = format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple());
        match self.path.parent() {
            Some(parent) => parent.join(temp_name),
            None => PathBuf::from(temp_name),
        }
    }

    /// Write the document to a fresh temporary file next to the canonical
    /// path and flush it to disk. The canonical file is not touched.
    pub(crate) fn write_temp(&self, data: &Value) -> RatesResult<PathBuf> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| RatesError::storage(parent, e))?;
            }
        }

        let temp_path = self.temp_path();
        let result = (|| -> std::io::Result<()> {
            let mut file = File::create(&temp_path)?;
            serde_json::to_writer_pretty(&mut file, data)?;
            file.write_all(b"\n")?;
            file.sync_all()
        })();

        match result {
            Ok(()) => Ok(temp_path),
            Err(e) => {
                discard_temp(&temp_path);
                Err(RatesError::storage(&self.path, e))
            }
        }
    }

    /// Atomically move a finished temporary file over the canonical path.
    pub(crate) fn commit(&self, temp_path: &Path) -> RatesResult<()> {
        fs::rename(temp_path, &self.path).map_err(|e| {
            discard_temp(temp_path);
            RatesError::storage(&self.path, e)
        })
    }
}

impl BlobStore for JsonFileStore {
    fn save(&self, data: &Value) -> RatesResult<()> {
        let result = self.write_temp(data).and_then(|temp| self.commit(&temp));
        match &result {
            Ok(()) => debug!(path = %self.path.display(), "Document saved"),
            Err(e) => error!(path = %self.path.display(), error = %e, "Failed to save document"),
        }
        result
    }

    fn load(&self) -> RatesResult<Value> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No document yet, returning empty object");
                return Ok(Value::Object(Default::default()));
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read document");
                return Err(RatesError::storage(&self.path, e));
            }
        };

        serde_json::from_str(&contents).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "Malformed document");
            RatesError::storage(&self.path, e)
        })
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn discard_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
        }
    }
}
