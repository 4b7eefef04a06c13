//! Seed scenario 6: full-text search tracks a note through insert, content
//! update and deletion.

use crate::harness::TestWorkspace;

#[test]
fn fts_index_tracks_insert_update_and_delete() {
    let ws = TestWorkspace::empty().unwrap();
    let mut repo = ws.init_repo().unwrap();

    ws.write_file("go.md", "# Go\n`@kind: reference`\nIndexed via FTS5.").unwrap();
    repo.add(&[], 0).unwrap();
    repo.commit(0).unwrap();

    assert_eq!(repo.search("kind:reference fts5").unwrap().len(), 1);

    ws.write_file("go.md", "# Go\n`@kind: reference`\nIndexed via full-text.").unwrap();
    repo.add(&[], 1).unwrap();
    repo.commit(1).unwrap();

    assert_eq!(repo.search("kind:reference full").unwrap().len(), 1);
    assert!(repo.search("kind:reference fts5").unwrap().is_empty());

    ws.remove_file("go.md").unwrap();
    repo.add(&[], 2).unwrap();
    repo.commit(2).unwrap();

    assert!(repo.search("kind:reference full").unwrap().is_empty());
    assert!(repo.search("kind:reference fts5").unwrap().is_empty());
}
