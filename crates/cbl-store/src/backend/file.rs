use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::backend::StorageBackend;
use crate::error::{StoreError, StoreResult};
use crate::namespace::Namespace;

/// File-per-namespace backend.
///
/// Each namespace is one `<name>.json` document under the root directory, the
/// durable stand-in for a browser storage area: small payloads, replaced
/// whole on every write. Writes go through a sibling temp file and a rename
/// so a reader never observes a half-written document as the current payload.
///
/// Two processes pointed at the same root are last-writer-wins; nothing here
/// reconciles them. Correctness guarantees are scoped to a single writer.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open a backend rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io_error(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, namespace: &Namespace) -> PathBuf {
        self.root.join(format!("{namespace}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, namespace: &Namespace) -> Option<String> {
        let path = self.document_path(namespace);
        match fs::read_to_string(&path) {
            Ok(payload) => Some(payload),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                // Unreadable counts as absent: the caller reseeds and the
                // next put replaces the document.
                warn!(namespace = %namespace, path = %path.display(), error = %e,
                      "unreadable payload, treating namespace as absent");
                None
            }
        }
    }

    fn put(&self, namespace: &Namespace, payload: &str) -> StoreResult<()> {
        let path = self.document_path(namespace);
        let tmp = self.root.join(format!("{namespace}.json.tmp"));

        let mut file = fs::File::create(&tmp).map_err(|e| StoreError::io_error(&tmp, e))?;
        file.write_all(payload.as_bytes())
            .map_err(|e| StoreError::io_error(&tmp, e))?;
        file.sync_all().map_err(|e| StoreError::io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io_error(&path, e))?;
        Ok(())
    }

    fn remove(&self, namespace: &Namespace) -> StoreResult<()> {
        let path = self.document_path(namespace);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io_error(&path, e)),
        }
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
