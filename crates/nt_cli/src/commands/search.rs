//! `nt search <query>` — query the database mirror's full-text index (§4.7).

use anyhow::{Context, Result};
use console::style;
use nt_core::Repository;

pub fn run(query: &str) -> Result<()> {
    let repo = Repository::open(".").context("not an nt repository (run 'nt init' first)")?;
    let hits = repo.search(query)?;

    if hits.is_empty() {
        println!("{}", style("no matches").dim());
        return Ok(());
    }

    for hit in &hits {
        println!("{}  {}  {}", &hit.oid.as_hex()[..12], style(&hit.title).bold(), style(&hit.file_relative_path).dim());
    }

    Ok(())
}
