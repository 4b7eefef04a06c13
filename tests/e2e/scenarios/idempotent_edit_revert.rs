//! Seed scenario 2: editing a line and reverting it, repeated with a `gc`
//! after each commit, must leave the on-disk object count unchanged.

use crate::harness::TestWorkspace;
use nt_core::GcConfig;

const ORIGINAL: &str = "# Notes\n`@kind: reference`\nExample: see the attached diagram.";
const EDITED: &str = "# Notes\n`@kind: reference`\nExample(s): see the attached diagram.";

#[test]
fn ten_rounds_of_edit_and_revert_leave_object_count_stable() {
    let ws = TestWorkspace::empty().unwrap();
    let mut repo = ws.init_repo().unwrap();

    ws.write_file("go.md", ORIGINAL).unwrap();
    repo.add(&[], 0).unwrap();
    repo.commit(0).unwrap();
    repo.gc(GcConfig { dry_run: false }, None).unwrap();

    let baseline_objects = ws.object_file_count();
    let baseline_hits = repo.search("kind:reference example").unwrap().len();

    for i in 0..10 {
        let now = 10 + i * 2;

        ws.write_file("go.md", EDITED).unwrap();
        repo.add(&[], now).unwrap();
        repo.commit(now).unwrap();
        repo.gc(GcConfig { dry_run: false }, None).unwrap();

        ws.write_file("go.md", ORIGINAL).unwrap();
        repo.add(&[], now + 1).unwrap();
        repo.commit(now + 1).unwrap();
        repo.gc(GcConfig { dry_run: false }, None).unwrap();

        assert_eq!(ws.object_file_count(), baseline_objects, "round {i}: object count drifted");
        assert_eq!(
            repo.search("kind:reference example").unwrap().len(),
            baseline_hits,
            "round {i}: row count drifted"
        );
    }
}
