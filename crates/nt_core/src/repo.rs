//! Repository handle providing the main `nt` API (§4, §6).
//!
//! [`Repository`] wires together the index, blob store, database mirror and
//! the walker/staging pipeline behind the operations a CLI front-end calls
//! directly: `add`, `commit`, `reset`, `status`, `gc`, `diff`, `cat-file` and
//! `search`. Every mutating operation holds the repository lock for its
//! duration; read-only operations (`status`, `diff`, `cat_file`, `search`)
//! do not need it since they never touch `.nt/index`.

use crate::blob_store::BlobStore;
use crate::config::Config;
use crate::error::{NtError, Result};
use crate::index::{DiffResult, Index};
use crate::lint::LintConfig;
use crate::mirror::{CommitChange, Mirror, SearchHit};
use crate::oid::Oid;
use crate::pack::PackFile;
use crate::pathspec::PathSpecSet;
use crate::staging::{self, AddReport};
use crate::walker::{self, Change};
use fs2::FileExt;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_NTIGNORE: &str = "*.tmp\n*.swp\n.DS_Store\n";

/// An `nt` repository handle.
pub struct Repository {
    /// Directory containing the tracked Markdown tree (parent of `.nt`).
    root: PathBuf,
    /// The `.nt` state directory, possibly overridden via `NT_HOME`.
    nt_dir: PathBuf,
    config: Config,
    lint: LintConfig,
    index: Index,
    blob_store: BlobStore,
    mirror: Mirror,
}

/// What `cat_file` resolved an OID to.
pub enum CatFileEntry {
    Entity(crate::entity::Entity),
    Blob { data: Vec<u8>, mime: String },
}

/// Fresh classification of the working tree against the index, without
/// mutating anything (the read-only counterpart to [`Repository::add`]).
#[derive(Clone, Debug, Default)]
pub struct StatusReport {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
    /// Paths already staged (from a prior `add`) awaiting `commit`.
    pub pending_commit: Vec<String>,
    /// Media references that could not be resolved to a file on disk.
    pub dangling_media: Vec<(Oid, String)>,
}

impl Repository {
    /// Opens an existing repository. Honors an `NT_HOME` environment
    /// variable override, read once, which takes precedence over searching
    /// for `.nt` under `path` (§6, §10.1).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let (root, nt_dir) = resolve_dirs(path.as_ref());
        if !nt_dir.join("index").exists() && !nt_dir.exists() {
            return Err(NtError::NotFound(format!("no .nt repository at {}", nt_dir.display())));
        }
        Self::load(root, nt_dir)
    }

    /// Initializes a new repository under `path`, bootstrapping `.nt` and a
    /// default `.ntignore`. Errors if a repository already exists there.
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let (root, nt_dir) = resolve_dirs(path.as_ref());
        if nt_dir.exists() {
            return Err(NtError::ConflictError {
                path: nt_dir.display().to_string(),
                reason: "repository already initialized".to_string(),
            });
        }

        fs::create_dir_all(nt_dir.join("objects")).map_err(|e| NtError::io(&nt_dir, e))?;
        Config::default().save(&nt_dir)?;
        LintConfig::default().save(&nt_dir)?;
        Index::new().save(&nt_dir.join("index"))?;

        let ntignore_path = root.join(".ntignore");
        if !ntignore_path.exists() {
            fs::write(&ntignore_path, DEFAULT_NTIGNORE).map_err(|e| NtError::io(&ntignore_path, e))?;
        }

        debug!(root = %root.display(), "initialized repository");
        Self::load(root, nt_dir)
    }

    fn load(root: PathBuf, nt_dir: PathBuf) -> Result<Self> {
        let config = Config::load(&nt_dir)?;
        let lint = LintConfig::load(&nt_dir)?;
        let index = Index::load(&nt_dir.join("index"))?;
        let blob_store = BlobStore::new(nt_dir.join("objects"));
        let mirror = Mirror::open(&nt_dir.join("database.db"))?;

        Ok(Self {
            root,
            nt_dir,
            config,
            lint,
            index,
            blob_store,
            mirror,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn objects_root(&self) -> PathBuf {
        self.nt_dir.join("objects")
    }

    fn index_path(&self) -> PathBuf {
        self.nt_dir.join("index")
    }

    /// Discovers, classifies and stages every file matching `pathspec`
    /// (every tracked file, if empty). Staged deletions are recorded as
    /// tombstones for files that vanished from disk since the last commit.
    pub fn add(&mut self, pathspec: &[String], now: i64) -> Result<AddReport> {
        let _lock = self.acquire_lock()?;

        let spec = PathSpecSet::compile(pathspec);
        let ignore = walker::load_ignore_file(&self.root)?;
        let files = walker::discover_files(&self.root, &ignore)?;
        let parser = crate::parser::DefaultParser;
        let schema = self.lint.schema.clone();

        let mut report = AddReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        // Stat and classify sequentially (cheap), then fan the expensive
        // parse-and-build step for every changed file out across a bounded
        // worker pool. The index itself is never touched off this thread
        // (§9 "Cooperative parallelism": a single owner for the index).
        let mut candidates: Vec<(String, i64, u64, Change)> = Vec::new();
        for relative_path in &files {
            if !spec.is_empty() && !spec.matches_any(relative_path) {
                continue;
            }
            seen.insert(relative_path.clone());

            let full_path = self.root.join(relative_path);
            let metadata = fs::metadata(&full_path).map_err(|e| NtError::io(&full_path, e))?;
            let mtime = mtime_of(&metadata);
            let size = metadata.len();

            let change = walker::classify(&self.index, relative_path, mtime, size);
            if change == Change::Unchanged {
                report.unchanged.push(relative_path.clone());
                continue;
            }
            candidates.push((relative_path.clone(), mtime, size, change));
        }

        let objects_root = self.objects_root();
        let built: Vec<Result<(String, i64, u64, Change, PackFile)>> = candidates
            .into_par_iter()
            .map(|(relative_path, mtime, size, change)| {
                let full_path = self.root.join(&relative_path);
                let content = fs::read(&full_path).map_err(|e| NtError::io(&full_path, e))?;
                let pack = walker::build_pack_file(&self.root, &relative_path, &content, mtime, now, &parser, &schema, &self.blob_store)?;
                pack.save(&objects_root.join(format!("{}.pack", pack.oid.relative_path())))?;
                Ok((relative_path, mtime, size, change, pack))
            })
            .collect();

        for result in built {
            let (relative_path, mtime, size, change, pack) = result?;
            self.index.stage(&relative_path, &pack, mtime, size);
            match change {
                Change::Added => report.added.push(relative_path),
                Change::Modified => report.modified.push(relative_path),
                Change::Unchanged => unreachable!(),
            }
        }

        let tracked_paths: Vec<String> = self.index.entries.iter().map(|e| e.relative_path.clone()).collect();
        for relative_path in tracked_paths {
            if seen.contains(&relative_path) {
                continue;
            }
            if !spec.is_empty() && !spec.matches_any(&relative_path) {
                continue;
            }
            if self.root.join(&relative_path).exists() {
                continue;
            }
            self.index.tombstone(&relative_path, now)?;
            report.deleted.push(relative_path);
        }

        self.index.save(&self.index_path())?;
        debug!(added = report.added.len(), modified = report.modified.len(), deleted = report.deleted.len(), "add complete");
        Ok(report)
    }

    /// Re-verifies every staged entry against disk, then promotes staged
    /// deltas into the index and syncs the database mirror transactionally.
    /// Returns the number of entries committed.
    pub fn commit(&mut self, now: i64) -> Result<usize> {
        let _lock = self.acquire_lock()?;

        staging::check_for_conflicts(&self.index, &self.root)?;

        if !self.index.has_pending_changes() {
            return Ok(0);
        }

        let mut loaded_packs: Vec<PackFile> = Vec::new();
        let mut old_oids: Vec<Option<Oid>> = Vec::new();
        let mut has_new_pack: Vec<bool> = Vec::new();

        for entry in &self.index.entries {
            if !entry.staged {
                continue;
            }
            old_oids.push(if entry.is_new() { None } else { Some(entry.packfile_oid) });
            match entry.staged_packfile_oid {
                Some(oid) => {
                    loaded_packs.push(self.index.read_pack_file(&self.objects_root(), oid)?);
                    has_new_pack.push(true);
                }
                None => has_new_pack.push(false),
            }
        }

        let mut pack_iter = loaded_packs.iter();
        let mut changes: Vec<CommitChange> = Vec::with_capacity(old_oids.len());
        for (old_oid, is_new_pack) in old_oids.into_iter().zip(has_new_pack) {
            let new_pack = if is_new_pack { pack_iter.next() } else { None };
            changes.push(CommitChange { old_packfile_oid: old_oid, new_pack });
        }

        self.mirror.sync_commit(&changes)?;
        let committed = self.index.commit(now);
        self.index.save(&self.index_path())?;

        debug!(committed, "commit applied");
        Ok(committed)
    }

    /// Discards staged deltas for every path matching `pathspec`, reverting
    /// each to its last committed state.
    pub fn reset(&mut self, pathspec: &[String]) -> Result<Vec<String>> {
        let _lock = self.acquire_lock()?;

        let spec = PathSpecSet::compile(pathspec);
        let targets: Vec<String> = self
            .index
            .entries
            .iter()
            .filter(|e| e.staged && (spec.is_empty() || spec.matches_any(&e.relative_path)))
            .map(|e| e.relative_path.clone())
            .collect();

        for relative_path in &targets {
            self.index.reset(relative_path)?;
        }

        self.index.save(&self.index_path())?;
        Ok(targets)
    }

    /// Fresh classification of the working tree, without mutating the index.
    pub fn status(&self) -> Result<StatusReport> {
        let ignore = walker::load_ignore_file(&self.root)?;
        let files = walker::discover_files(&self.root, &ignore)?;

        let mut report = StatusReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for relative_path in &files {
            seen.insert(relative_path.clone());
            let full_path = self.root.join(relative_path);
            let metadata = fs::metadata(&full_path).map_err(|e| NtError::io(&full_path, e))?;
            let mtime = mtime_of(&metadata);
            let size = metadata.len();

            match walker::classify(&self.index, relative_path, mtime, size) {
                Change::Added => report.added.push(relative_path.clone()),
                Change::Modified => report.modified.push(relative_path.clone()),
                Change::Unchanged => report.unchanged.push(relative_path.clone()),
            }
        }

        for entry in &self.index.entries {
            if !entry.is_new() && !seen.contains(&entry.relative_path) {
                report.deleted.push(entry.relative_path.clone());
            }
            if entry.staged {
                report.pending_commit.push(entry.relative_path.clone());
            }
        }
        report.pending_commit.sort();
        report.deleted.sort();

        report.dangling_media = self.mirror.dangling_media()?;
        Ok(report)
    }

    /// Runs garbage collection, sweeping any `.nt/objects` pack or blob no
    /// longer reachable from the index (§4.8).
    pub fn gc(&self, config: crate::gc::GcConfig, progress: Option<&crate::gc::GcProgressCallback>) -> Result<crate::gc::GcReport> {
        crate::gc::gc(&self.index, &self.objects_root(), &self.blob_store, config, progress)
    }

    /// Compares this repository's index against a peer index manifest,
    /// reporting which pack files and blobs the peer is missing.
    pub fn diff(&self, remote_index_path: &Path) -> Result<DiffResult> {
        let remote = Index::load(remote_index_path)?;
        Ok(self.index.diff(&remote))
    }

    /// Resolves an OID to either a decoded entity or raw blob bytes.
    pub fn cat_file(&self, oid: Oid) -> Result<CatFileEntry> {
        match self.index.read_object(&self.objects_root(), oid) {
            Ok(entity) => Ok(CatFileEntry::Entity(entity)),
            Err(NtError::NotFound(_)) => {
                let (data, mime) = self.index.read_blob(&self.blob_store, oid)?;
                Ok(CatFileEntry::Blob { data, mime })
            }
            Err(e) => Err(e),
        }
    }

    /// Runs a search query against the database mirror (§4.7).
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.mirror.search(query)
    }

    /// Acquires exclusive lock on the repository, used for every mutating
    /// operation. The lock file records the holding PID so a crashed process
    /// never permanently wedges the repository.
    fn acquire_lock(&self) -> Result<LockGuard> {
        let lock_path = self.nt_dir.join("index.lock");
        acquire_lock_with_retry(&lock_path, 0)
    }
}

fn resolve_dirs(path: &Path) -> (PathBuf, PathBuf) {
    match std::env::var_os("NT_HOME") {
        Some(home) => {
            let nt_dir = PathBuf::from(home);
            let root = nt_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
            (root, nt_dir)
        }
        None => (path.to_path_buf(), path.join(".nt")),
    }
}

fn mtime_of(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn acquire_lock_with_retry(lock_path: &Path, retry_count: u32) -> Result<LockGuard> {
    if retry_count > 2 {
        return Err(NtError::LockBusy { pid: std::process::id() });
    }

    match OpenOptions::new().write(true).create_new(true).open(lock_path) {
        Ok(mut file) => {
            let pid = std::process::id();
            writeln!(file, "{pid}").map_err(|e| NtError::io(lock_path, e))?;
            file.flush().map_err(|e| NtError::io(lock_path, e))?;

            file.try_lock_exclusive().map_err(|_| NtError::LockBusy { pid })?;

            Ok(LockGuard {
                file: Some(file),
                path: lock_path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => handle_existing_lock(lock_path, retry_count),
        Err(e) => Err(NtError::io(lock_path, e)),
    }
}

fn handle_existing_lock(lock_path: &Path, retry_count: u32) -> Result<LockGuard> {
    match fs::read_to_string(lock_path) {
        Ok(content) => {
            if let Ok(pid) = content.trim().parse::<u32>() {
                if is_process_alive(pid) {
                    return Err(NtError::LockBusy { pid });
                }

                warn!(pid, "detected stale repository lock from dead process, cleaning up");
                if let Err(e) = fs::remove_file(lock_path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(NtError::io(lock_path, e));
                    }
                }
                return acquire_lock_with_retry(lock_path, retry_count + 1);
            }

            warn!("lock file has invalid content, attempting cleanup");
            let _ = fs::remove_file(lock_path);
            acquire_lock_with_retry(lock_path, retry_count + 1)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => acquire_lock_with_retry(lock_path, retry_count + 1),
        Err(_) => Err(NtError::LockBusy { pid: 0 }),
    }
}

/// RAII guard for the repository lock: releases the OS-level lock and
/// unlinks `.nt/index.lock` on drop.
struct LockGuard {
    file: Option<File>,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
        }
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}/stat")).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_note(root: &Path, relative_path: &str, content: &str) {
        let path = root.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn init_then_open_roundtrips() {
        let tmp = TempDir::new().unwrap();
        {
            let _repo = Repository::init(tmp.path()).unwrap();
        }
        assert!(tmp.path().join(".nt/objects").is_dir());
        assert!(tmp.path().join(".ntignore").exists());

        let repo = Repository::open(tmp.path()).unwrap();
        assert_eq!(repo.root(), tmp.path());
    }

    #[test]
    fn init_twice_errors() {
        let tmp = TempDir::new().unwrap();
        Repository::init(tmp.path()).unwrap();
        let err = Repository::init(tmp.path()).unwrap_err();
        assert!(matches!(err, NtError::ConflictError { .. }));
    }

    #[test]
    fn add_then_commit_then_status_is_clean() {
        let tmp = TempDir::new().unwrap();
        let mut repo = Repository::init(tmp.path()).unwrap();
        write_note(tmp.path(), "go.md", "# Go\nSome body text.");

        let report = repo.add(&[], 100).unwrap();
        assert_eq!(report.added, vec!["go.md".to_string()]);

        let committed = repo.commit(200).unwrap();
        assert_eq!(committed, 1);

        let status = repo.status().unwrap();
        assert!(status.unchanged.contains(&"go.md".to_string()));
        assert!(status.pending_commit.is_empty());
        assert!(status.added.is_empty());
    }

    #[test]
    fn reset_discards_staged_addition() {
        let tmp = TempDir::new().unwrap();
        let mut repo = Repository::init(tmp.path()).unwrap();
        write_note(tmp.path(), "go.md", "# Go\nBody.");
        repo.add(&[], 100).unwrap();

        let reverted = repo.reset(&[]).unwrap();
        assert_eq!(reverted, vec!["go.md".to_string()]);

        let status = repo.status().unwrap();
        assert!(status.added.contains(&"go.md".to_string()));
    }

    #[test]
    fn commit_is_searchable_afterwards() {
        let tmp = TempDir::new().unwrap();
        let mut repo = Repository::init(tmp.path()).unwrap();
        write_note(tmp.path(), "go.md", "# Go\nSome full-text searchable body.");
        repo.add(&[], 100).unwrap();
        repo.commit(200).unwrap();

        let hits = repo.search("searchable").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_relative_path, "go.md");
    }

    #[test]
    fn add_stages_deletion_of_vanished_file() {
        let tmp = TempDir::new().unwrap();
        let mut repo = Repository::init(tmp.path()).unwrap();
        write_note(tmp.path(), "go.md", "# Go\nBody.");
        repo.add(&[], 100).unwrap();
        repo.commit(200).unwrap();

        fs::remove_file(tmp.path().join("go.md")).unwrap();
        let report = repo.add(&[], 300).unwrap();
        assert_eq!(report.deleted, vec!["go.md".to_string()]);

        repo.commit(400).unwrap();
        let status = repo.status().unwrap();
        assert!(status.deleted.is_empty());
        assert!(status.added.is_empty());
    }

    #[test]
    fn cat_file_resolves_note_entity() {
        let tmp = TempDir::new().unwrap();
        let mut repo = Repository::init(tmp.path()).unwrap();
        write_note(tmp.path(), "go.md", "# Go\nBody.");
        repo.add(&[], 100).unwrap();

        let entry = repo.index.objects.first().copied().unwrap();
        match repo.cat_file(entry.oid).unwrap() {
            CatFileEntry::Entity(_) => {}
            CatFileEntry::Blob { .. } => panic!("expected entity"),
        }
    }
}
