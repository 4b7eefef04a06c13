//! Staging conflict detection (§4.5, §7).
//!
//! The walker stages a pack file as soon as it notices a change; nothing
//! stops the source file from being edited again before `commit` actually
//! runs. [`check_for_conflicts`] re-stats every staged entry immediately
//! before a commit promotes it, so a commit never silently captures content
//! the index never saw.

use crate::error::{NtError, Result};
use crate::index::Index;
use std::fs;
use std::path::Path;

/// Report produced by `nt add`: which paths were newly staged, and how.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddReport {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
}

impl AddReport {
    /// True if nothing changed — an `add` over an already-clean tree.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Verifies every staged (non-tombstone) entry's source file still matches
/// the mtime and size recorded when it was staged. Returns the first
/// mismatch as a [`NtError::ConflictError`] — the caller should tell the
/// user to re-run `nt add` on that path before committing again.
pub fn check_for_conflicts(index: &Index, root: &Path) -> Result<()> {
    for entry in &index.entries {
        if !entry.staged || entry.staged_tombstone.is_some() {
            continue;
        }

        let path = root.join(&entry.relative_path);
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(NtError::ConflictError {
                    path: entry.relative_path.clone(),
                    reason: "staged for commit but no longer exists on disk".to_string(),
                });
            }
            Err(e) => return Err(NtError::io(&path, e)),
        };

        let staged_mtime = entry.staged_mtime.unwrap_or(entry.mtime);
        let staged_size = entry.staged_size.unwrap_or(entry.size);

        if mtime_of(&metadata) != staged_mtime || metadata.len() != staged_size {
            return Err(NtError::ConflictError {
                path: entry.relative_path.clone(),
                reason: "file changed again after staging; re-run 'nt add' before committing".to_string(),
            });
        }
    }
    Ok(())
}

fn mtime_of(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
