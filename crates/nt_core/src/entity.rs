//! The closed tagged entity variant and its shared capability trait.
//!
//! Replaces a dynamic type-switch over entities (§9) with an `Entity` sum
//! type; `ObjectData::decode` dispatches on the YAML-tagged `kind` field that
//! `#[serde(tag = "kind")]` produces automatically.

use crate::attribute::AttributeMap;
use crate::oid::Oid;
use serde::{Deserialize, Serialize};

/// Discriminant for an [`Entity`] variant, also used as the plaintext `kind`
/// field on a [`crate::pack::PackObject`] so a reader can pick a codec path
/// before decompressing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    File,
    Note,
    Flashcard,
    Media,
    #[serde(rename = "link")]
    GoLink,
    Reminder,
    Study,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Kind::File => "file",
            Kind::Note => "note",
            Kind::Flashcard => "flashcard",
            Kind::Media => "media",
            Kind::GoLink => "link",
            Kind::Reminder => "reminder",
            Kind::Study => "study",
        };
        write!(f, "{s}")
    }
}

/// Shared capability set every entity variant implements (§3, §9):
/// `{kind, unique_oid, modification_time, serialize, deserialize,
/// sub_objects, blobs}`. `serialize`/`deserialize` are handled uniformly by
/// [`crate::object_data`] over the whole [`Entity`] enum, so this trait
/// covers the remaining, variant-specific facets.
pub trait Object {
    /// The entity's kind discriminant.
    fn kind(&self) -> Kind;
    /// The entity's own, content- or randomly-derived OID.
    fn unique_oid(&self) -> Oid;
    /// Last-modified Unix timestamp.
    fn modification_time(&self) -> i64;
    /// OIDs of entities this one directly owns (e.g. a File's root notes).
    /// Child notes are *not* listed on their parent; see [`Note::parent_oid`].
    fn sub_objects(&self) -> Vec<Oid>;
    /// Blob OIDs this entity references (media payloads, rendered snapshots).
    fn blobs(&self) -> Vec<Oid>;
}

/// The note's editorial type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Free,
    Reference,
    Note,
    Flashcard,
    Cheatsheet,
    Journal,
    Todo,
    Quote,
    Artwork,
}

/// A binary asset's inferred family, from its file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Picture,
    Video,
    Document,
    Unknown,
}

impl MediaKind {
    /// Infers a media kind from a file extension (without the leading dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" | "wav" | "flac" | "ogg" | "m4a" => MediaKind::Audio,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "bmp" => MediaKind::Picture,
            "mp4" | "mov" | "avi" | "mkv" | "webm" => MediaKind::Video,
            "pdf" | "doc" | "docx" | "txt" | "epub" => MediaKind::Document,
            _ => MediaKind::Unknown,
        }
    }
}

/// One source Markdown file. Owns a tree of notes (built on demand from
/// [`Note::parent_oid`], never stored as back-pointers here).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub oid: Oid,
    pub relative_path: String,
    pub size: u64,
    pub mtime: i64,
    /// Content hash of the raw file bytes, used to detect unchanged content
    /// across pack-file regenerations (§4.3).
    pub hash: Oid,
    pub attributes: AttributeMap,
    /// OIDs of the root-level notes (those with no parent) contained in this
    /// file's pack. Deeper structure is derived on demand from each note's
    /// `parent_oid`.
    pub root_notes: Vec<Oid>,
}

/// A heading-scoped section of a file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub oid: Oid,
    pub kind: NoteKind,
    pub title: String,
    pub parent_oid: Option<Oid>,
    pub raw_content: String,
    pub body: String,
    pub html: String,
    pub text: String,
    /// Hash of the body after stripping block-tag and attribute lines (§4.9).
    pub content_hash: Oid,
    pub tags: Vec<String>,
    pub attributes: AttributeMap,
    pub mtime: i64,
}

/// Derived from a [`Note`] whose body splits on a `---` line into front/back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub oid: Oid,
    pub note_oid: Oid,
    pub front: String,
    pub back: String,
    pub srs: SrsState,
    pub mtime: i64,
}

/// Spaced-repetition bookkeeping carried on a flashcard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SrsState {
    pub card_type: String,
    pub queue: String,
    pub due: i64,
    pub interval: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
    pub lapses: u32,
}

impl Default for SrsState {
    fn default() -> Self {
        Self {
            card_type: "new".to_string(),
            queue: "new".to_string(),
            due: 0,
            interval: 0,
            ease_factor: 2.5,
            repetitions: 0,
            lapses: 0,
        }
    }
}

/// A binary asset referenced from a note.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub oid: Oid,
    pub note_oid: Oid,
    pub relative_path: String,
    pub kind: MediaKind,
    /// True when `relative_path` did not resolve to a file on disk.
    pub dangling: bool,
    pub blob_oid: Option<Oid>,
    pub mime_type: Option<String>,
    pub mtime: i64,
}

/// A titled hyperlink bearing a short-name alias.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoLink {
    pub oid: Oid,
    pub go_name: String,
    pub title: String,
    pub url: String,
    pub note_oid: Oid,
    pub mtime: i64,
}

/// A task bearing a time expression (§4.9, §6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub oid: Oid,
    pub note_oid: Oid,
    /// The raw `#reminder-<expr>` tag, kept for re-evaluation.
    pub tag: String,
    pub next_performed_at: Option<i64>,
    pub mtime: i64,
}

/// A per-answer spaced-repetition feedback log entry attached to a flashcard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub oid: Oid,
    pub flashcard_oid: Oid,
    pub performed_at: i64,
    pub grade: u8,
    pub mtime: i64,
}

/// Directed edge `(source_oid, source_kind) -> (target_oid, target_kind, type)`.
///
/// Not part of the closed [`Entity`] variant (§9 names exactly the seven
/// kinds above): a relation has no OID of its own and is never individually
/// addressable, so it is carried alongside a pack file's objects rather than
/// as one (see [`crate::pack::PackFile::relations`]), and projected straight
/// into the mirror's `relations` table on commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source_oid: Oid,
    pub source_kind: Kind,
    pub target_oid: Oid,
    pub target_kind: Kind,
    pub rel_type: String,
}

/// The closed entity variant (§9): `File | Note | Flashcard | Media | GoLink
/// | Reminder | Study`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    File(File),
    Note(Note),
    Flashcard(Flashcard),
    Media(Media),
    #[serde(rename = "link")]
    GoLink(GoLink),
    Reminder(Reminder),
    Study(Study),
}

impl Object for Entity {
    fn kind(&self) -> Kind {
        match self {
            Entity::File(_) => Kind::File,
            Entity::Note(_) => Kind::Note,
            Entity::Flashcard(_) => Kind::Flashcard,
            Entity::Media(_) => Kind::Media,
            Entity::GoLink(_) => Kind::GoLink,
            Entity::Reminder(_) => Kind::Reminder,
            Entity::Study(_) => Kind::Study,
        }
    }

    fn unique_oid(&self) -> Oid {
        match self {
            Entity::File(e) => e.oid,
            Entity::Note(e) => e.oid,
            Entity::Flashcard(e) => e.oid,
            Entity::Media(e) => e.oid,
            Entity::GoLink(e) => e.oid,
            Entity::Reminder(e) => e.oid,
            Entity::Study(e) => e.oid,
        }
    }

    fn modification_time(&self) -> i64 {
        match self {
            Entity::File(e) => e.mtime,
            Entity::Note(e) => e.mtime,
            Entity::Flashcard(e) => e.mtime,
            Entity::Media(e) => e.mtime,
            Entity::GoLink(e) => e.mtime,
            Entity::Reminder(e) => e.mtime,
            Entity::Study(e) => e.mtime,
        }
    }

    fn sub_objects(&self) -> Vec<Oid> {
        match self {
            Entity::File(e) => e.root_notes.clone(),
            _ => Vec::new(),
        }
    }

    fn blobs(&self) -> Vec<Oid> {
        match self {
            Entity::Media(e) => e.blob_oid.into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// Builds the parent/child note forest for one file on demand from a flat
/// list of notes, keyed by each note's `parent_oid`. Never stored as
/// back-pointers on disk (§9).
pub fn build_note_tree(notes: &[Note]) -> std::collections::BTreeMap<Oid, Vec<Oid>> {
    let mut children: std::collections::BTreeMap<Oid, Vec<Oid>> = std::collections::BTreeMap::new();
    for note in notes {
        if let Some(parent) = note.parent_oid {
            children.entry(parent).or_default().push(note.oid);
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(oid_seed: &[u8], parent: Option<Oid>) -> Note {
        Note {
            oid: Oid::new_from_bytes(oid_seed),
            kind: NoteKind::Note,
            title: "Title".to_string(),
            parent_oid: parent,
            raw_content: String::new(),
            body: String::new(),
            html: String::new(),
            text: String::new(),
            content_hash: Oid::new_from_bytes(b"content"),
            tags: vec![],
            attributes: Default::default(),
            mtime: 0,
        }
    }

    #[test]
    fn build_note_tree_groups_children_by_parent() {
        let root = note(b"root", None);
        let child_a = note(b"child-a", Some(root.oid));
        let child_b = note(b"child-b", Some(root.oid));
        let notes = vec![root.clone(), child_a.clone(), child_b.clone()];

        let tree = build_note_tree(&notes);
        let mut children = tree.get(&root.oid).cloned().unwrap_or_default();
        children.sort();
        let mut expected = vec![child_a.oid, child_b.oid];
        expected.sort();
        assert_eq!(children, expected);
    }

    #[test]
    fn entity_kind_matches_variant() {
        let golink = Entity::GoLink(GoLink {
            oid: Oid::new(),
            go_name: "docs".into(),
            title: "Docs".into(),
            url: "https://example.com".into(),
            note_oid: Oid::new(),
            mtime: 0,
        });
        assert_eq!(golink.kind(), Kind::GoLink);
    }

    #[test]
    fn media_blobs_returns_its_own_blob_oid() {
        let blob = Oid::new_from_bytes(b"blob");
        let media = Entity::Media(Media {
            oid: Oid::new(),
            note_oid: Oid::new(),
            relative_path: "medias/go.svg".into(),
            kind: MediaKind::Picture,
            dangling: false,
            blob_oid: Some(blob),
            mime_type: Some("image/svg+xml".into()),
            mtime: 0,
        });
        assert_eq!(media.blobs(), vec![blob]);
    }

    #[test]
    fn media_kind_inferred_from_extension() {
        assert_eq!(MediaKind::from_extension("svg"), MediaKind::Picture);
        assert_eq!(MediaKind::from_extension("mp3"), MediaKind::Audio);
        assert_eq!(MediaKind::from_extension("xyz"), MediaKind::Unknown);
    }
}
