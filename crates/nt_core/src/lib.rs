//! nt core library
//!
//! A content-addressed object store and incremental indexer for a personal
//! Markdown knowledge repository: notes, flashcards, media, go-links and
//! reminders, all derived from plain Markdown files tracked under `.nt/`.
//!
//! # Quick start
//!
//! ```
//! use nt_core::Repository;
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let mut repo = Repository::init(tmp.path()).unwrap();
//! std::fs::write(tmp.path().join("go.md"), "# Go\nSome notes.").unwrap();
//!
//! let report = repo.add(&[], 0).unwrap();
//! assert_eq!(report.added, vec!["go.md".to_string()]);
//! repo.commit(0).unwrap();
//! ```

mod attribute;
mod blob_store;
mod config;
mod derive;
mod entity;
mod error;
mod gc;
mod index;
mod lint;
mod mirror;
mod object_data;
mod oid;
mod pack;
mod parser;
mod pathspec;
mod reminder;
mod repo;
mod staging;
mod walker;

pub use attribute::{AttributeMap, AttributeSchema, AttributeType, AttributeValue};
pub use blob_store::BlobStore;
pub use config::{Config, CoreConfig, DeckConfig, ReferenceConfig};
pub use entity::{
    build_note_tree, Entity, File, Flashcard, GoLink, Kind, Media, MediaKind, Note, NoteKind,
    Object, Reminder, Relation, SrsState, Study,
};
pub use error::{NtError, Result};
pub use gc::{gc, GcConfig, GcProgressCallback, GcReport};
pub use index::{BlobCacheEntry, DiffResult, Index, IndexEntry, ObjectCacheEntry};
pub use lint::{LintConfig, LintRule};
pub use mirror::{CommitChange, Mirror, SearchHit};
pub use oid::Oid;
pub use pack::{BlobRef, PackFile, PackObject};
pub use parser::{DefaultParser, FileParser, ParsedFile, ParsedLink, ParsedMediaRef, ParsedNote};
pub use pathspec::PathSpecSet;
pub use reminder::{
    next_occurrence, next_occurrence_for_tag, parse as parse_reminder, MonthField, Pattern, TimeExpr,
    YearField,
};
pub use repo::{CatFileEntry, Repository, StatusReport};
pub use staging::{check_for_conflicts, AddReport};
pub use walker::{build_pack_file, classify, discover_files, Change};
