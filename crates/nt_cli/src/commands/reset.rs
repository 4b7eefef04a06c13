//! `nt reset <pathspec...>` — discard staged deltas, reverting to committed state.

use anyhow::{Context, Result};
use console::style;
use nt_core::Repository;

pub fn run(pathspec: &[String]) -> Result<()> {
    let mut repo = Repository::open(".").context("not an nt repository (run 'nt init' first)")?;

    let reverted = repo.reset(pathspec)?;

    if reverted.is_empty() {
        println!("{}", style("nothing staged to reset").dim());
    } else {
        for path in &reverted {
            println!("{} {path}", style("reset").yellow());
        }
    }

    Ok(())
}
