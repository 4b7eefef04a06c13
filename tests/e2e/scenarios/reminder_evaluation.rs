//! Seed scenario 4: reminder tags on a note are evaluated against a frozen
//! clock end to end, through `add`/`commit` and a `cat_file` of the derived
//! reminder object.

use crate::harness::TestWorkspace;
use chrono::NaiveDate;
use nt_core::{next_occurrence_for_tag, CatFileEntry, Entity, Oid};

fn unix_of(y: i32, m: u32, d: u32) -> i64 {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp()
}

/// Recomputes a reminder's OID the way `walker::build_pack_file` derives it,
/// so the test can `cat_file` it without reaching into index internals.
fn reminder_oid(note_oid: Oid, tag: &str) -> Oid {
    Oid::new_from_bytes(format!("{note_oid}:reminder:{tag}").as_bytes())
}

#[test]
fn every_tuesday_tag_resolves_against_frozen_clock() {
    let frozen = unix_of(2023, 7, 1); // a Saturday
    let tag = "reminder-every-${tuesday}";

    let ws = TestWorkspace::empty().unwrap();
    let mut repo = ws.init_repo().unwrap();
    ws.write_file("go.md", &format!("# Standup\n`#{tag}`\nDaily notes.")).unwrap();

    repo.add(&[], frozen).unwrap();
    repo.commit(frozen).unwrap();

    let hits = repo.search("kind:free standup").unwrap();
    assert_eq!(hits.len(), 1);
    let oid = reminder_oid(hits[0].oid, tag);

    match repo.cat_file(oid).unwrap() {
        CatFileEntry::Entity(Entity::Reminder(rem)) => {
            assert_eq!(rem.next_performed_at, Some(unix_of(2023, 7, 4)));
        }
        _ => panic!("expected a reminder entity"),
    }
}

#[test]
fn every_odd_year_february_tag_resolves_against_frozen_clock() {
    let frozen = unix_of(2023, 7, 1);
    let tag = "reminder-every-${odd-year}-02-01";

    let ws = TestWorkspace::empty().unwrap();
    let mut repo = ws.init_repo().unwrap();
    ws.write_file("go.md", &format!("# Taxes\n`#{tag}`\nAnnual filing.")).unwrap();

    repo.add(&[], frozen).unwrap();
    repo.commit(frozen).unwrap();

    let hits = repo.search("kind:free taxes").unwrap();
    assert_eq!(hits.len(), 1);
    let oid = reminder_oid(hits[0].oid, tag);

    match repo.cat_file(oid).unwrap() {
        CatFileEntry::Entity(Entity::Reminder(rem)) => {
            assert_eq!(rem.next_performed_at, Some(unix_of(2025, 2, 1)));
        }
        _ => panic!("expected a reminder entity"),
    }

    // The pure evaluator agrees, independent of the storage round-trip.
    assert_eq!(
        next_occurrence_for_tag(tag, NaiveDate::from_ymd_opt(2023, 7, 1).unwrap()),
        Some(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
    );
}
