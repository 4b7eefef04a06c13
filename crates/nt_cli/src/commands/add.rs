//! `nt add <pathspec...>` — stage additions, modifications and deletions.

use anyhow::{Context, Result};
use chrono::Utc;
use console::style;
use nt_core::Repository;

pub fn run(pathspec: &[String]) -> Result<()> {
    let mut repo = Repository::open(".").context("not an nt repository (run 'nt init' first)")?;
    let now = Utc::now().timestamp();

    let report = repo.add(pathspec, now)?;

    for path in &report.added {
        println!("{} {path}", style("add").green());
    }
    for path in &report.modified {
        println!("{} {path}", style("mod").yellow());
    }
    for path in &report.deleted {
        println!("{} {path}", style("del").red());
    }

    if report.is_empty() {
        println!("{}", style("nothing to add, working tree matches the index").dim());
    } else {
        println!();
        println!(
            "{} added, {} modified, {} deleted ({} unchanged)",
            report.added.len(),
            report.modified.len(),
            report.deleted.len(),
            report.unchanged.len(),
        );
        println!("run {} to record these changes", style("nt commit").cyan());
    }

    Ok(())
}
