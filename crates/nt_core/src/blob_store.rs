//! Content-addressed storage for binary media payloads (§4.4).
//!
//! Blobs are opaque bytes written as flat files under `.nt/objects/`, sharded
//! by the first two hex characters of their OID. Writes are idempotent:
//! writing an already-present OID is a no-op.

use crate::error::{NtError, Result};
use crate::oid::Oid;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum size for a single blob (100 MB), guarding against OOM on
/// maliciously or accidentally huge media files.
const MAX_BLOB_SIZE: usize = 100 * 1024 * 1024;

/// Addresses binary media payloads by content hash under a root directory.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Creates a blob store rooted at `.nt/objects` (or any directory).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, oid: Oid) -> PathBuf {
        let rel = oid.relative_path();
        self.root.join(format!("{rel}.blob"))
    }

    /// Returns true if a blob with this OID exists on disk.
    pub fn exists(&self, oid: Oid) -> bool {
        self.path_for(oid).exists()
    }

    /// Writes `data`, returning its content-addressed OID. A no-op if the
    /// OID already exists on disk.
    pub fn put(&self, data: &[u8]) -> Result<Oid> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(NtError::ConflictError {
                path: "<blob>".to_string(),
                reason: format!("blob of {} bytes exceeds limit of {MAX_BLOB_SIZE}", data.len()),
            });
        }

        let oid = Oid::new_from_bytes(data);
        if self.exists(oid) {
            return Ok(oid);
        }

        let path = self.path_for(oid);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| NtError::io(parent, e))?;
        }

        let tmp_path = path.with_extension("blob.tmp");
        let mut tmp = fs::File::create(&tmp_path).map_err(|e| NtError::io(&tmp_path, e))?;
        tmp.write_all(data).map_err(|e| NtError::io(&tmp_path, e))?;
        tmp.sync_all().map_err(|e| NtError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| NtError::io(&path, e))?;

        Ok(oid)
    }

    /// Reads the raw bytes of a blob. MIME typing is recorded in the index
    /// (§4.5), not here — the blob store only knows content.
    pub fn get(&self, oid: Oid) -> Result<Vec<u8>> {
        let path = self.path_for(oid);
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NtError::NotFound(oid.as_hex())
            } else {
                NtError::io(&path, e)
            }
        })
    }

    /// Deletes a blob if present. Used by GC; missing files are not an error.
    pub fn delete(&self, oid: Oid) -> Result<()> {
        let path = self.path_for(oid);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(NtError::io(&path, e)),
        }
    }
}
