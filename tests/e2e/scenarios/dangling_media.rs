//! Seed scenario 3: a note referencing a media file that is not present on
//! disk still produces a media entity, flagged dangling, with no blob.

use crate::harness::TestWorkspace;

#[test]
fn missing_media_reference_is_recorded_as_dangling() {
    let ws = TestWorkspace::empty().unwrap();
    let mut repo = ws.init_repo().unwrap();

    ws.write_file("go.md", "# Go\n![missing](./medias/go.svg)").unwrap();
    repo.add(&[], 0).unwrap();
    repo.commit(0).unwrap();

    let status = repo.status().unwrap();
    assert_eq!(status.dangling_media.len(), 1);
    assert_eq!(status.dangling_media[0].1, "medias/go.svg");

    // No blob directory was created for a reference that never resolved.
    assert!(!ws.path().join("medias").join("go.svg").exists());
}
