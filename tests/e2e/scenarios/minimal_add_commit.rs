//! Seed scenario 1: a repository with one reference note and one flashcard,
//! `add .; commit`, checked against both the index and the database mirror.

use crate::harness::TestWorkspace;

#[test]
fn minimal_add_commit_produces_one_pack_and_one_row_per_kind() {
    let ws = TestWorkspace::empty().unwrap();
    let mut repo = ws.init_repo().unwrap();

    ws.write_file(
        "go.md",
        "# Networking\n\
         `@kind: reference`\n\
         Some notes on TCP handshakes.\n\n\
         # Flashcard\n\
         `@kind: flashcard`\n\
         What is a SYN packet?\n\
         ---\n\
         The first segment of the TCP three-way handshake.\n",
    )
    .unwrap();

    let report = repo.add(&[], 0).unwrap();
    assert_eq!(report.added, vec!["go.md".to_string()]);

    let committed = repo.commit(0).unwrap();
    assert_eq!(committed, 1);

    assert_eq!(ws.object_file_count(), 1);

    let hits = repo.search("kind:reference handshake").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file_relative_path, "go.md");

    let flashcards = repo.search("kind:flashcard").unwrap();
    assert_eq!(flashcards.len(), 1);
}

#[test]
fn second_add_over_a_clean_tree_is_empty() {
    let ws = TestWorkspace::empty().unwrap();
    let mut repo = ws.init_repo().unwrap();
    ws.write_file("go.md", "# Go\nSome notes.").unwrap();

    repo.add(&[], 0).unwrap();
    repo.commit(0).unwrap();

    let second = repo.add(&[], 1).unwrap();
    assert!(second.is_empty());
}
