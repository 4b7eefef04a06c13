//! `nt cat-file <oid>` — resolve an OID to its decoded entity or raw blob bytes.

use anyhow::{Context, Result};
use nt_core::{CatFileEntry, Oid, Repository};
use std::io::Write;

pub fn run(oid: &str) -> Result<()> {
    let repo = Repository::open(".").context("not an nt repository (run 'nt init' first)")?;
    let oid = Oid::from_hex(oid).with_context(|| format!("'{oid}' is not a valid 40-hex oid"))?;

    match repo.cat_file(oid)? {
        CatFileEntry::Entity(entity) => {
            let yaml = serde_yaml::to_string(&entity).context("serializing entity")?;
            print!("{yaml}");
        }
        CatFileEntry::Blob { data, mime } => {
            eprintln!("# blob, {} bytes, mime: {mime}", data.len());
            std::io::stdout().write_all(&data)?;
        }
    }

    Ok(())
}
