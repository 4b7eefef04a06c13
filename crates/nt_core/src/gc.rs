//! Garbage collection for objects unreferenced by the index (§4.8).
//!
//! Unlike a mark-and-sweep collector walking a commit graph, the index
//! already *is* the reachability set: every live or staged pack-file OID
//! lives on an [`crate::index::Index`] entry, and every blob OID lives on its
//! object cache. `gc` only has to enumerate `.nt/objects/**/*.pack` and
//! `*.blob`, and delete whatever OID is not in one of those two sets.

use crate::blob_store::BlobStore;
use crate::error::{NtError, Result};
use crate::index::Index;
use crate::oid::Oid;
use std::fs;
use std::path::Path;

/// Progress callback for GC operations: `(current, total, phase)`, phase one
/// of `"scan"` or `"sweep"`.
pub type GcProgressCallback = dyn Fn(usize, usize, &str);

/// Configuration for a GC run.
#[derive(Debug, Clone, Default)]
pub struct GcConfig {
    /// Don't actually delete objects, just report what would be deleted.
    pub dry_run: bool,
}

/// Report from a GC run.
#[derive(Debug, Default)]
pub struct GcReport {
    /// Total number of on-disk pack/blob files scanned.
    pub objects_scanned: usize,
    /// Number of objects still reachable from the index (kept).
    pub objects_reachable: usize,
    /// Number of objects deleted (or that would be, under `dry_run`).
    pub objects_deleted: usize,
    /// Bytes freed from deletion.
    pub bytes_freed: u64,
    /// Non-fatal errors encountered while deleting.
    pub errors: Vec<String>,
}

/// Runs GC against `objects_root` (normally `.nt/objects`), using `index` as
/// the sole source of truth for reachability (§4.8): "never deletes an OID
/// referenced by the current index."
pub fn gc(
    index: &Index,
    objects_root: &Path,
    _blob_store: &BlobStore,
    config: GcConfig,
    progress: Option<&GcProgressCallback>,
) -> Result<GcReport> {
    let mut report = GcReport::default();

    let reachable_packs = index.reachable_packfiles();
    let reachable_blobs = index.reachable_blobs();

    if let Some(cb) = progress {
        cb(0, 2, "scan");
    }
    let entries = scan_objects(objects_root)?;
    report.objects_scanned = entries.len();

    if let Some(cb) = progress {
        cb(1, 2, "sweep");
    }

    let total = entries.len();
    let (mut deleted, mut bytes_freed, mut reachable_count) = (0usize, 0u64, 0usize);

    for (idx, entry) in entries.into_iter().enumerate() {
        if let Some(cb) = progress {
            if idx % 100 == 0 || idx + 1 == total {
                cb(idx + 1, total, "sweep");
            }
        }

        let is_reachable = match entry.kind {
            ObjectFileKind::Pack => reachable_packs.contains(&entry.oid),
            ObjectFileKind::Blob => reachable_blobs.contains(&entry.oid),
        };

        if is_reachable {
            reachable_count += 1;
            continue;
        }

        if config.dry_run {
            deleted += 1;
            bytes_freed += entry.size;
            continue;
        }

        match fs::remove_file(&entry.path) {
            Ok(()) => {
                deleted += 1;
                bytes_freed += entry.size;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                report.errors.push(format!("failed to delete {}: {e}", entry.path.display()));
            }
        }
    }

    report.objects_reachable = reachable_count;
    report.objects_deleted = deleted;
    report.bytes_freed = bytes_freed;

    if let Some(cb) = progress {
        cb(2, 2, "done");
    }

    Ok(report)
}

enum ObjectFileKind {
    Pack,
    Blob,
}

struct ObjectFileEntry {
    oid: Oid,
    kind: ObjectFileKind,
    path: std::path::PathBuf,
    size: u64,
}

/// Walks the two-level `ab/cdef...pack`/`.blob` shard layout, recovering each
/// file's OID from its sharded path rather than its content (a pack file's
/// own OID is its content hash, but a stale/corrupt pack should still be
/// sweep-eligible by the name it was written under).
fn scan_objects(objects_root: &Path) -> Result<Vec<ObjectFileEntry>> {
    let mut out = Vec::new();
    if !objects_root.exists() {
        return Ok(out);
    }

    for shard in fs::read_dir(objects_root).map_err(|e| NtError::io(objects_root, e))? {
        let shard = shard.map_err(|e| NtError::io(objects_root, e))?;
        let shard_path = shard.path();
        if !shard_path.is_dir() {
            continue;
        }
        let Some(prefix) = shard_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if prefix.len() != 2 {
            continue;
        }

        for file in fs::read_dir(&shard_path).map_err(|e| NtError::io(&shard_path, e))? {
            let file = file.map_err(|e| NtError::io(&shard_path, e))?;
            let path = file.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let (suffix, kind) = if let Some(s) = file_name.strip_suffix(".pack") {
                (s, ObjectFileKind::Pack)
            } else if let Some(s) = file_name.strip_suffix(".blob") {
                (s, ObjectFileKind::Blob)
            } else {
                continue;
            };

            let Ok(oid) = Oid::from_hex(&format!("{prefix}{suffix}")) else {
                continue;
            };
            let size = file.metadata().map(|m| m.len()).unwrap_or(0);
            out.push(ObjectFileEntry { oid, kind, path, size });
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, GoLink};
    use crate::pack::{BlobRef, PackFile};
    use tempfile::TempDir;

    fn pack_with_blob(path_seed: &[u8], blob_oid: Oid) -> PackFile {
        let mut pack = PackFile::new(Oid::new_from_bytes(path_seed), "go.md", 100, 10, 100);
        pack.append_object(
            &Entity::GoLink(GoLink {
                oid: Oid::new_from_bytes(b"link"),
                go_name: "docs".into(),
                title: "Docs".into(),
                url: "https://example.com".into(),
                note_oid: Oid::new_from_bytes(b"note"),
                mtime: 100,
            }),
            "GoLink",
            100,
        )
        .unwrap();
        pack.append_blob(BlobRef { oid: blob_oid, mime: "image/svg+xml".into() });
        pack
    }

    #[test]
    fn sweeps_unreferenced_pack_and_keeps_referenced() {
        let tmp = TempDir::new().unwrap();
        let objects_root = tmp.path().join("objects");
        let blob_store = BlobStore::new(&objects_root);

        let keep_blob = blob_store.put(b"keep me").unwrap();
        let live = pack_with_blob(b"go.md", keep_blob);
        live.save(&objects_root.join(format!("{}.pack", live.oid.relative_path()))).unwrap();

        let orphan_blob = blob_store.put(b"delete me").unwrap();
        let orphan = pack_with_blob(b"orphan.md", orphan_blob);
        orphan.save(&objects_root.join(format!("{}.pack", orphan.oid.relative_path()))).unwrap();

        let mut index = Index::new();
        index.stage("go.md", &live, 100, 10);
        index.commit(200);

        let report = gc(&index, &objects_root, &blob_store, GcConfig::default(), None).unwrap();

        assert_eq!(report.objects_scanned, 4);
        assert!(!objects_root.join(format!("{}.pack", orphan.oid.relative_path())).exists());
        assert!(objects_root.join(format!("{}.pack", live.oid.relative_path())).exists());
        assert!(!blob_store.exists(orphan_blob));
        assert!(blob_store.exists(keep_blob));
        assert_eq!(report.objects_deleted, 2);
    }

    #[test]
    fn dry_run_counts_without_deleting() {
        let tmp = TempDir::new().unwrap();
        let objects_root = tmp.path().join("objects");
        let blob_store = BlobStore::new(&objects_root);

        let orphan_blob = blob_store.put(b"orphan bytes").unwrap();
        let orphan = pack_with_blob(b"orphan.md", orphan_blob);
        orphan.save(&objects_root.join(format!("{}.pack", orphan.oid.relative_path()))).unwrap();

        let index = Index::new();
        let config = GcConfig { dry_run: true };
        let report = gc(&index, &objects_root, &blob_store, config, None).unwrap();

        assert_eq!(report.objects_deleted, 2);
        assert!(objects_root.join(format!("{}.pack", orphan.oid.relative_path())).exists());
        assert!(blob_store.exists(orphan_blob));
    }

    #[test]
    fn missing_objects_directory_scans_as_empty() {
        let tmp = TempDir::new().unwrap();
        let objects_root = tmp.path().join("objects");
        let blob_store = BlobStore::new(&objects_root);
        let index = Index::new();

        let report = gc(&index, &objects_root, &blob_store, GcConfig::default(), None).unwrap();
        assert_eq!(report.objects_scanned, 0);
    }
}
