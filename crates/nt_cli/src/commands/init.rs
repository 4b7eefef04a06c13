//! `nt init` — bootstrap a new repository under the current directory.

use anyhow::{Context, Result};
use console::style;
use nt_core::Repository;

pub fn run() -> Result<()> {
    let repo = Repository::init(".").context("failed to initialize repository")?;

    println!("Initialized empty nt repository in {}", style(repo.root().join(".nt").display()).cyan());
    println!();
    println!("  .nt/config      core + reference + deck settings");
    println!("  .nt/lint        lint rules and attribute schemas");
    println!("  .nt/index       the manifest of tracked files");
    println!("  .nt/database.db relational + full-text mirror");
    println!("  .nt/objects/    pack files and blobs");
    println!("  .ntignore       ignore rules for the walker");

    Ok(())
}
