//! Seed scenario 5: staging then resetting a never-committed file leaves no
//! trace in the index, and a subsequent `gc` leaves no pack file behind.

use crate::harness::TestWorkspace;
use nt_core::GcConfig;

#[test]
fn reset_on_staged_new_file_removes_it_entirely() {
    let ws = TestWorkspace::empty().unwrap();
    let mut repo = ws.init_repo().unwrap();

    ws.write_file("draft.md", "# Draft\nNot ready yet.").unwrap();
    let report = repo.add(&[], 0).unwrap();
    assert_eq!(report.added, vec!["draft.md".to_string()]);

    let status_before = repo.status().unwrap();
    assert_eq!(status_before.pending_commit, vec!["draft.md".to_string()]);

    let reverted = repo.reset(&["draft.md".to_string()]).unwrap();
    assert_eq!(reverted, vec!["draft.md".to_string()]);

    let status_after = repo.status().unwrap();
    assert!(status_after.pending_commit.is_empty());
    // The file is back to untracked, since the only trace of it was staging.
    assert_eq!(status_after.added, vec!["draft.md".to_string()]);

    let gc_report = repo.gc(GcConfig { dry_run: false }, None).unwrap();
    assert_eq!(gc_report.objects_deleted, 0);
    assert_eq!(ws.object_file_count(), 0);
}
