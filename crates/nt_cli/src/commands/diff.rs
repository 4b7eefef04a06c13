//! `nt diff <remote>` — compare against a peer's index manifest.

use anyhow::{Context, Result};
use console::style;
use nt_core::Repository;
use std::path::Path;

pub fn run(remote: &str) -> Result<()> {
    let repo = Repository::open(".").context("not an nt repository (run 'nt init' first)")?;
    let result = repo.diff(Path::new(remote))?;

    if result.missing_packfiles.is_empty() && result.missing_blobs.is_empty() {
        println!("{}", style("up to date with remote").dim());
        return Ok(());
    }

    if !result.missing_packfiles.is_empty() {
        println!("{}", style("pack files missing locally:").bold());
        for oid in &result.missing_packfiles {
            println!("  {}", oid.as_hex());
        }
    }
    if !result.missing_blobs.is_empty() {
        println!("{}", style("blobs missing locally:").bold());
        for oid in &result.missing_blobs {
            println!("  {}", oid.as_hex());
        }
    }

    Ok(())
}
