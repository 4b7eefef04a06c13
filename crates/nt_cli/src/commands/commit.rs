//! `nt commit` — promote staged deltas into the index and sync the mirror.

use anyhow::{Context, Result};
use chrono::Utc;
use console::style;
use nt_core::Repository;

pub fn run() -> Result<()> {
    let mut repo = Repository::open(".").context("not an nt repository (run 'nt init' first)")?;
    let now = Utc::now().timestamp();

    let committed = repo.commit(now)?;

    if committed == 0 {
        println!("{}", style("nothing to commit, staging area is clean").dim());
    } else {
        println!("{} {committed} entries", style("committed").green().bold());
    }

    Ok(())
}
