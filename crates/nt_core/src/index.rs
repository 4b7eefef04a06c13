//! The index: a single mutable manifest tracking every known source file,
//! its committed and staged pack file, and denormalized object/blob caches
//! for OID lookups without opening every pack (§4.5).

use crate::entity::Kind;
use crate::error::{NtError, Result};
use crate::oid::Oid;
use crate::pack::PackFile;
use crate::pathspec::PathSpecSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One tracked source file, with its live (committed) state and an optional
/// staged delta awaiting commit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexEntry {
    pub relative_path: String,
    /// The committed pack's OID. [`Oid::NIL`] means this entry has never
    /// been committed (it exists only as a staged addition).
    #[serde(default = "nil_packfile_oid")]
    pub packfile_oid: Oid,
    #[serde(default)]
    pub mtime: i64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub staged: bool,
    pub staged_packfile_oid: Option<Oid>,
    pub staged_mtime: Option<i64>,
    pub staged_size: Option<u64>,
    /// Set when staging a deletion: the Unix time the tombstone was staged.
    pub staged_tombstone: Option<i64>,
}

fn nil_packfile_oid() -> Oid {
    Oid::NIL
}

impl IndexEntry {
    fn new_staged(relative_path: String, pack: &PackFile, mtime: i64, size: u64) -> Self {
        Self {
            relative_path,
            packfile_oid: Oid::NIL,
            mtime: 0,
            size: 0,
            staged: true,
            staged_packfile_oid: Some(pack.oid),
            staged_mtime: Some(mtime),
            staged_size: Some(size),
            staged_tombstone: None,
        }
    }

    /// True if this entry has no committed state — purely a staged add.
    pub fn is_new(&self) -> bool {
        self.packfile_oid.is_nil()
    }
}

/// A denormalized `(oid, kind, packfile_oid)` row letting object reads skip
/// straight to the pack file that holds them.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ObjectCacheEntry {
    pub oid: Oid,
    pub kind: Kind,
    pub packfile_oid: Oid,
}

/// A denormalized `(oid, mime, packfile_oid)` row for blob lookups.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlobCacheEntry {
    pub oid: Oid,
    pub mime: String,
    pub packfile_oid: Oid,
}

/// Result of comparing two indexes (e.g. local vs. a sync peer's manifest).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub missing_packfiles: Vec<Oid>,
    pub missing_blobs: Vec<Oid>,
}

/// The `.nt/index` manifest.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Index {
    pub committed_at: Option<i64>,
    #[serde(default)]
    pub entries: Vec<IndexEntry>,
    #[serde(default)]
    pub objects: Vec<ObjectCacheEntry>,
    #[serde(default)]
    pub blobs: Vec<BlobCacheEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the index from its on-disk YAML document, or an empty index if
    /// the document does not exist yet (a fresh repository).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = fs::read_to_string(path).map_err(|e| NtError::io(path, e))?;
        serde_yaml::from_str(&contents).map_err(|e| NtError::ParseError {
            path: path.to_path_buf(),
            reason: format!("parsing index: {e}"),
        })
    }

    /// Serializes to YAML and writes atomically to `path` (tmp + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).map_err(|e| NtError::ParseError {
            path: path.to_path_buf(),
            reason: format!("serializing index: {e}"),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| NtError::io(parent, e))?;
        }

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, yaml).map_err(|e| NtError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, path).map_err(|e| NtError::io(path, e))?;
        Ok(())
    }

    pub fn find_entry(&self, relative_path: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.relative_path == relative_path)
    }

    fn find_entry_mut(&mut self, relative_path: &str) -> Option<&mut IndexEntry> {
        self.entries.iter_mut().find(|e| e.relative_path == relative_path)
    }

    /// Records `pack` as the staged state of `relative_path`, creating the
    /// entry if this path is not yet tracked.
    pub fn stage(&mut self, relative_path: &str, pack: &PackFile, mtime: i64, size: u64) {
        self.add_cache_entries(pack);

        match self.find_entry_mut(relative_path) {
            Some(entry) => {
                entry.staged = true;
                entry.staged_packfile_oid = Some(pack.oid);
                entry.staged_mtime = Some(mtime);
                entry.staged_size = Some(size);
                entry.staged_tombstone = None;
            }
            None => {
                self.entries
                    .push(IndexEntry::new_staged(relative_path.to_string(), pack, mtime, size));
            }
        }

        self.prune_caches();
    }

    /// Stages the deletion of `relative_path`. Errors if the path is not
    /// tracked — there is nothing to delete.
    pub fn tombstone(&mut self, relative_path: &str, now: i64) -> Result<()> {
        let entry = self
            .find_entry_mut(relative_path)
            .ok_or_else(|| NtError::NotFound(relative_path.to_string()))?;
        entry.staged = true;
        entry.staged_packfile_oid = None;
        entry.staged_mtime = None;
        entry.staged_size = None;
        entry.staged_tombstone = Some(now);
        self.prune_caches();
        Ok(())
    }

    /// Promotes every staged delta to committed state, dropping tombstoned
    /// entries. Maintains the cache-closure invariant: after this call,
    /// `objects`/`blobs` contain no row whose `packfile_oid` is unreachable
    /// from `entries`.
    pub fn commit(&mut self, now: i64) -> usize {
        let mut committed = 0;
        self.entries.retain_mut(|entry| {
            if !entry.staged {
                return true;
            }
            committed += 1;
            if entry.staged_tombstone.is_some() {
                return false;
            }
            entry.packfile_oid = entry.staged_packfile_oid.unwrap_or(entry.packfile_oid);
            entry.mtime = entry.staged_mtime.unwrap_or(entry.mtime);
            entry.size = entry.staged_size.unwrap_or(entry.size);
            entry.staged = false;
            entry.staged_packfile_oid = None;
            entry.staged_mtime = None;
            entry.staged_size = None;
            entry.staged_tombstone = None;
            true
        });

        if committed > 0 {
            self.committed_at = Some(now);
        }
        self.prune_caches();
        committed
    }

    /// Discards the staged delta for `relative_path`, reverting to its
    /// committed state. Removes the entry outright if it was a pure staged
    /// addition with no committed history.
    pub fn reset(&mut self, relative_path: &str) -> Result<()> {
        let remove = {
            let entry = self
                .find_entry_mut(relative_path)
                .ok_or_else(|| NtError::NotFound(relative_path.to_string()))?;
            if entry.is_new() {
                true
            } else {
                entry.staged = false;
                entry.staged_packfile_oid = None;
                entry.staged_mtime = None;
                entry.staged_size = None;
                entry.staged_tombstone = None;
                false
            }
        };
        if remove {
            self.entries.retain(|e| e.relative_path != relative_path);
        }
        self.prune_caches();
        Ok(())
    }

    /// True if any entry carries an uncommitted staged delta.
    pub fn has_pending_changes(&self) -> bool {
        self.entries.iter().any(|e| e.staged)
    }

    /// Entries whose relative path matches `spec` (or every entry, if `spec`
    /// is empty — the "no path given" default).
    pub fn walk<'a>(&'a self, spec: &PathSpecSet) -> Vec<&'a IndexEntry> {
        self.entries
            .iter()
            .filter(|e| spec.is_empty() || spec.matches_any(&e.relative_path))
            .collect()
    }

    /// Compares this index's committed pack files and blobs against a peer
    /// index (e.g. a sync remote's manifest), reporting what the local index
    /// lacks: OIDs the peer has that aren't among this index's committed
    /// entries. Staged-but-never-committed additions are not counted as
    /// already present.
    pub fn diff(&self, remote: &Index) -> DiffResult {
        let local_committed: std::collections::HashSet<Oid> = self
            .entries
            .iter()
            .map(|e| e.packfile_oid)
            .filter(|oid| !oid.is_nil())
            .collect();

        let local_packs: std::collections::HashSet<Oid> = self
            .objects
            .iter()
            .map(|o| o.packfile_oid)
            .filter(|oid| local_committed.contains(oid))
            .collect();
        let local_blobs: std::collections::HashSet<Oid> = self
            .blobs
            .iter()
            .filter(|b| local_committed.contains(&b.packfile_oid))
            .map(|b| b.oid)
            .collect();

        let mut missing_packfiles: Vec<Oid> = remote
            .objects
            .iter()
            .map(|o| o.packfile_oid)
            .filter(|oid| !local_packs.contains(oid))
            .collect();
        missing_packfiles.sort();
        missing_packfiles.dedup();

        let mut missing_blobs: Vec<Oid> = remote
            .blobs
            .iter()
            .map(|b| b.oid)
            .filter(|oid| !local_blobs.contains(oid))
            .collect();
        missing_blobs.sort();
        missing_blobs.dedup();

        DiffResult {
            missing_packfiles,
            missing_blobs,
        }
    }

    /// Loads the pack file at `oid` from `.nt/objects/<shard>.pack`.
    pub fn read_pack_file(&self, objects_root: &Path, oid: Oid) -> Result<PackFile> {
        let path = objects_root.join(format!("{}.pack", oid.relative_path()));
        PackFile::load(&path)
    }

    /// Resolves and decodes an entity by OID via the object cache.
    pub fn read_object(&self, objects_root: &Path, oid: Oid) -> Result<crate::entity::Entity> {
        let cached = self
            .objects
            .iter()
            .find(|o| o.oid == oid)
            .ok_or_else(|| NtError::NotFound(oid.as_hex()))?;
        let pack = self.read_pack_file(objects_root, cached.packfile_oid)?;
        pack.get_entity(oid)
    }

    /// Resolves a blob's MIME type via the blob cache, then reads its bytes
    /// from `store`.
    pub fn read_blob(&self, store: &crate::blob_store::BlobStore, oid: Oid) -> Result<(Vec<u8>, String)> {
        let cached = self
            .blobs
            .iter()
            .find(|b| b.oid == oid)
            .ok_or_else(|| NtError::NotFound(oid.as_hex()))?;
        let data = store.get(oid)?;
        Ok((data, cached.mime.clone()))
    }

    /// All pack-file OIDs referenced by any entry, committed or staged.
    pub fn reachable_packfiles(&self) -> std::collections::HashSet<Oid> {
        let mut set = std::collections::HashSet::new();
        for entry in &self.entries {
            if !entry.packfile_oid.is_nil() {
                set.insert(entry.packfile_oid);
            }
            if let Some(oid) = entry.staged_packfile_oid {
                set.insert(oid);
            }
        }
        set
    }

    /// All blob OIDs reachable from the current cache (committed view).
    pub fn reachable_blobs(&self) -> std::collections::HashSet<Oid> {
        self.blobs.iter().map(|b| b.oid).collect()
    }

    fn add_cache_entries(&mut self, pack: &PackFile) {
        for object in &pack.objects {
            if !self.objects.iter().any(|o| o.oid == object.oid) {
                self.objects.push(ObjectCacheEntry {
                    oid: object.oid,
                    kind: object.kind,
                    packfile_oid: pack.oid,
                });
            }
        }
        for blob in &pack.blobs {
            if !self.blobs.iter().any(|b| b.oid == blob.oid) {
                self.blobs.push(BlobCacheEntry {
                    oid: blob.oid,
                    mime: blob.mime.clone(),
                    packfile_oid: pack.oid,
                });
            }
        }
    }

    /// Drops cache rows whose `packfile_oid` no longer appears on any entry.
    fn prune_caches(&mut self) {
        let reachable = self.reachable_packfiles();
        self.objects.retain(|o| reachable.contains(&o.packfile_oid));
        self.blobs.retain(|b| reachable.contains(&b.packfile_oid));
    }
}
