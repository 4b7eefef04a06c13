//! `nt gc` — sweep pack files and blobs unreferenced by the index.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use nt_core::{GcConfig, Repository};

pub fn run(dry_run: bool) -> Result<()> {
    let repo = Repository::open(".").context("not an nt repository (run 'nt init' first)")?;

    if dry_run {
        println!("{} running gc in dry-run mode (no objects will be deleted)...", style("->").cyan());
    } else {
        println!();
        println!("{} this will permanently delete pack files and blobs unreferenced by the index.", style("warning:").yellow().bold());
        println!("  run with {} first to see what would be deleted.", style("--dry-run").cyan());
        println!();
        print!("continue with garbage collection? [y/N]: ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{} garbage collection cancelled.", style("x").red());
            return Ok(());
        }
    }

    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:12} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("█▓▒░  "),
    );
    let pb_clone = pb.clone();
    let callback = move |current: usize, total: usize, phase: &str| {
        pb_clone.set_length(total.max(1) as u64);
        pb_clone.set_position(current as u64);
        pb_clone.set_message(phase.to_string());
    };

    let config = GcConfig { dry_run };
    let report = repo.gc(config, Some(&callback))?;
    pb.finish_and_clear();

    println!("{}", style("Garbage collection report:").bold());
    println!("  scanned:   {}", report.objects_scanned);
    println!("  reachable: {}", style(report.objects_reachable).green());
    println!(
        "  deleted:   {}",
        if report.objects_deleted > 0 { style(report.objects_deleted).yellow() } else { style(0).green() }
    );
    println!("  freed:     {:.2} KB", report.bytes_freed as f64 / 1024.0);

    if dry_run && report.objects_deleted > 0 {
        println!();
        println!("dry run only — re-run without {} to actually delete", style("--dry-run").cyan());
    }

    for error in &report.errors {
        eprintln!("{} {error}", style("error:").red().bold());
    }
    if !report.errors.is_empty() {
        anyhow::bail!("gc completed with {} error(s)", report.errors.len());
    }

    Ok(())
}
