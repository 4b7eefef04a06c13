use anyhow::{Context, Result};
use nt_core::Repository;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// An isolated, disposable directory tree for exercising a [`Repository`]
/// end to end, without touching the real filesystem outside `/tmp`.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn empty() -> Result<Self> {
        let dir = TempDir::new().context("creating temp workspace")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Initializes a fresh `.nt` repository in this workspace.
    pub fn init_repo(&self) -> Result<Repository> {
        Ok(Repository::init(self.path())?)
    }

    /// Opens a previously-initialized `.nt` repository in this workspace.
    pub fn open_repo(&self) -> Result<Repository> {
        Ok(Repository::open(self.path())?)
    }

    pub fn write_file(&self, relative_path: &str, content: &str) -> Result<()> {
        let full_path = self.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating parent directories for {relative_path}"))?;
        }
        fs::write(&full_path, content).with_context(|| format!("writing {relative_path}"))?;
        Ok(())
    }

    pub fn remove_file(&self, relative_path: &str) -> Result<()> {
        fs::remove_file(self.path().join(relative_path))
            .with_context(|| format!("removing {relative_path}"))?;
        Ok(())
    }

    pub fn objects_dir(&self) -> std::path::PathBuf {
        self.path().join(".nt").join("objects")
    }

    /// Counts regular files under `.nt/objects`, recursively — the on-disk
    /// pack/blob count referenced by §8 scenario 2 and 5.
    pub fn object_file_count(&self) -> usize {
        fn walk(dir: &Path, count: &mut usize) {
            let Ok(entries) = fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, count);
                } else {
                    *count += 1;
                }
            }
        }
        let mut count = 0;
        walk(&self.objects_dir(), &mut count);
        count
    }
}
