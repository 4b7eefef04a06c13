//! `nt status` — classify the working tree against the index without mutating it.

use anyhow::{Context, Result};
use console::style;
use nt_core::Repository;

pub fn run() -> Result<()> {
    let repo = Repository::open(".").context("not an nt repository (run 'nt init' first)")?;
    let report = repo.status()?;

    if !report.pending_commit.is_empty() {
        println!("{}", style("Changes staged for commit:").bold());
        for path in &report.pending_commit {
            println!("  {path}");
        }
        println!();
    }

    if !report.added.is_empty() {
        println!("{}", style("Untracked files:").bold());
        for path in &report.added {
            println!("  {} {path}", style("new").green());
        }
        println!();
    }

    if !report.modified.is_empty() {
        println!("{}", style("Changed files:").bold());
        for path in &report.modified {
            println!("  {} {path}", style("modified").yellow());
        }
        println!();
    }

    if !report.deleted.is_empty() {
        println!("{}", style("Missing files:").bold());
        for path in &report.deleted {
            println!("  {} {path}", style("deleted").red());
        }
        println!();
    }

    if !report.dangling_media.is_empty() {
        println!("{}", style("Dangling media references:").bold());
        for (oid, path) in &report.dangling_media {
            println!("  {} {path} ({})", style("dangling").red(), &oid.as_hex()[..12]);
        }
        println!();
    }

    if report.pending_commit.is_empty()
        && report.added.is_empty()
        && report.modified.is_empty()
        && report.deleted.is_empty()
    {
        println!("{}", style("nothing to commit, working tree clean").dim());
    }

    Ok(())
}
