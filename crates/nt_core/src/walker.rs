//! Repository walker (§4.6): discovers files under a path spec, applies
//! `.ntignore`, classifies additions/modifications/deletions against the
//! index, and builds the pack file for each changed source file.

use crate::attribute::AttributeSchema;
use crate::blob_store::BlobStore;
use crate::derive;
use crate::entity::{
    Entity, File as FileEntity, Flashcard, GoLink, Kind, Media, MediaKind, Note, NoteKind, Reminder, Relation, SrsState,
};
use crate::error::{NtError, Result};
use crate::index::Index;
use crate::oid::Oid;
use crate::pack::{BlobRef, PackFile};
use crate::parser::{FileParser, ParsedNote};
use crate::pathspec::PathSpecSet;
use crate::reminder;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

/// One file's classification against the index's committed state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Added,
    Modified,
    Unchanged,
}

/// Walks `root`, filtering through `ignore`, and returns every regular
/// file's repository-relative path in deterministic (sorted) order.
///
/// Symlinks are followed only when their target resolves under `root`
/// (§4.6); a symlink escaping the repository is skipped rather than erroring.
pub fn discover_files(root: &Path, ignore: &PathSpecSet) -> Result<Vec<String>> {
    let mut out = Vec::new();
    walk_dir(root, root, ignore, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk_dir(root: &Path, dir: &Path, ignore: &PathSpecSet, out: &mut Vec<String>) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(NtError::io(dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| NtError::io(dir, e))?;
        let path = entry.path();

        if path.file_name().and_then(|n| n.to_str()) == Some(".nt") && path.parent() == Some(root) {
            continue;
        }

        let relative = match path.strip_prefix(root) {
            Ok(r) => r.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };

        let file_type = entry.file_type().map_err(|e| NtError::io(&path, e))?;
        if file_type.is_symlink() {
            let Ok(resolved) = fs::canonicalize(&path) else { continue };
            let Ok(root_resolved) = fs::canonicalize(root) else { continue };
            if !resolved.starts_with(&root_resolved) {
                continue;
            }
            if resolved.is_dir() {
                if !ignore.is_excluded(&format!("{relative}/")) {
                    walk_dir(root, &resolved, ignore, out)?;
                }
                continue;
            }
        } else if file_type.is_dir() {
            if !ignore.is_excluded(&format!("{relative}/")) {
                walk_dir(root, &path, ignore, out)?;
            }
            continue;
        }

        if !ignore.is_excluded(&relative) {
            out.push(relative);
        }
    }
    Ok(())
}

/// Loads `.ntignore` from `root`, or an empty rule set if absent.
pub fn load_ignore_file(root: &Path) -> Result<PathSpecSet> {
    let path = root.join(".ntignore");
    if !path.exists() {
        return Ok(PathSpecSet::compile::<&str>(&[]));
    }
    let content = fs::read_to_string(&path).map_err(|e| NtError::io(&path, e))?;
    let lines: Vec<&str> = content.lines().collect();
    Ok(PathSpecSet::compile(&lines))
}

/// Compares a discovered file's on-disk metadata against its committed index
/// entry: an mtime or size mismatch means the file changed since the last
/// commit (§4.6). A file with no entry at all is a fresh addition.
pub fn classify(index: &Index, relative_path: &str, mtime: i64, size: u64) -> Change {
    match index.find_entry(relative_path) {
        None => Change::Added,
        Some(entry) if entry.is_new() => Change::Added,
        Some(entry) if entry.mtime != mtime || entry.size != size => Change::Modified,
        Some(_) => Change::Unchanged,
    }
}

/// Builds a new pack file for `relative_path` from its current on-disk
/// content: parses it, derives every entity (§4.9), extracts blobs for
/// resolvable media, and appends everything to a fresh [`PackFile`].
#[allow(clippy::too_many_arguments)]
pub fn build_pack_file(
    repo_root: &Path,
    relative_path: &str,
    content: &[u8],
    mtime: i64,
    now: i64,
    parser: &dyn FileParser,
    schema: &AttributeSchema,
    blob_store: &BlobStore,
) -> Result<PackFile> {
    let text = String::from_utf8_lossy(content).into_owned();
    let parsed = parser.parse(&text);

    let file_oid = Oid::new_from_bytes(relative_path.as_bytes());
    let pack_oid = Oid::new_from_bytes(content);
    let mut pack = PackFile::new(pack_oid, relative_path, mtime, content.len() as u64, now);

    let mut file_attributes = crate::attribute::AttributeMap::new();
    for (key, value) in &parsed.front_matter {
        if let Some(coerced) = schema.coerce(key, value) {
            file_attributes.insert(key.clone(), coerced);
        }
    }

    let note_oids = assign_note_oids(relative_path, &parsed.notes);
    let mut root_notes = Vec::new();

    for (i, parsed_note) in parsed.notes.iter().enumerate() {
        let note_oid = note_oids[i];
        let parent_oid = parsed_note.parent_index.map(|p| note_oids[p]);
        if parent_oid.is_none() {
            root_notes.push(note_oid);
        }

        let kind = parsed_note
            .declared_kind
            .as_deref()
            .and_then(note_kind_from_str)
            .unwrap_or(NoteKind::Free);

        let (rendered, tags) = derive::extract_tags(&parsed_note.raw_content);
        let (rendered, attributes) = derive::extract_attributes(&rendered, schema);
        let content_hash = derive::content_hash(&parsed_note.raw_content, schema);

        let note = Note {
            oid: note_oid,
            kind,
            title: parsed_note.title.clone(),
            parent_oid,
            raw_content: parsed_note.raw_content.clone(),
            body: rendered.clone(),
            html: String::new(),
            text: rendered.clone(),
            content_hash,
            tags: tags.clone(),
            attributes,
            mtime,
        };
        pack.append_object(&Entity::Note(note), format!("Note: {}", parsed_note.title), now)?;

        if let Some(parent) = parent_oid {
            pack.relations.push(Relation {
                source_oid: parent,
                source_kind: Kind::Note,
                target_oid: note_oid,
                target_kind: Kind::Note,
                rel_type: "parent".to_string(),
            });
        }

        if kind == NoteKind::Flashcard {
            if let Some((front, back)) = derive::split_flashcard(&rendered) {
                let flashcard = Flashcard {
                    oid: Oid::new_from_bytes(format!("{note_oid}:flashcard").as_bytes()),
                    note_oid,
                    front,
                    back,
                    srs: SrsState::default(),
                    mtime,
                };
                pack.relations.push(Relation {
                    source_oid: note_oid,
                    source_kind: Kind::Note,
                    target_oid: flashcard.oid,
                    target_kind: Kind::Flashcard,
                    rel_type: "owns".to_string(),
                });
                pack.append_object(&Entity::Flashcard(flashcard), "Flashcard", now)?;
            }
        }

        for tag in &tags {
            if let Some(expr_str) = tag.strip_prefix("reminder-") {
                if let Some(expr) = reminder::parse(expr_str) {
                    let today = unix_to_date(now);
                    let next = reminder::next_occurrence(&expr, today).map(date_to_unix);
                    let rem = Reminder {
                        oid: Oid::new_from_bytes(format!("{note_oid}:reminder:{tag}").as_bytes()),
                        note_oid,
                        tag: tag.clone(),
                        next_performed_at: next,
                        mtime,
                    };
                    pack.relations.push(Relation {
                        source_oid: note_oid,
                        source_kind: Kind::Note,
                        target_oid: rem.oid,
                        target_kind: Kind::Reminder,
                        rel_type: "owns".to_string(),
                    });
                    pack.append_object(&Entity::Reminder(rem), format!("Reminder: {tag}"), now)?;
                }
            }
        }

        for link in &parsed_note.links {
            if let Some(go_name) = derive::extract_go_name(&link.title) {
                let golink = GoLink {
                    oid: Oid::new_from_bytes(format!("{note_oid}:golink:{go_name}").as_bytes()),
                    go_name,
                    title: link.title.clone(),
                    url: link.url.clone(),
                    note_oid,
                    mtime,
                };
                pack.relations.push(Relation {
                    source_oid: note_oid,
                    source_kind: Kind::Note,
                    target_oid: golink.oid,
                    target_kind: Kind::GoLink,
                    rel_type: "owns".to_string(),
                });
                pack.append_object(&Entity::GoLink(golink), format!("GoLink: {}", link.title), now)?;
            }
        }

        for image in &parsed_note.images {
            let media_oid = Oid::new_from_bytes(format!("{note_oid}:media:{}", image.relative_path).as_bytes());
            let ext = Path::new(&image.relative_path)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("");
            let media_kind = MediaKind::from_extension(ext);
            let source_path = Path::new(relative_path)
                .parent()
                .map(|p| repo_root.join(p).join(&image.relative_path))
                .unwrap_or_else(|| repo_root.join(&image.relative_path));

            let (dangling, blob_oid, mime_type) = match fs::read(&source_path) {
                Ok(bytes) => {
                    let oid = blob_store.put(&bytes)?;
                    let mime = mime_guess_from_extension(ext);
                    pack.append_blob(BlobRef { oid, mime: mime.clone() });
                    (false, Some(oid), Some(mime))
                }
                Err(_) => (true, None, None),
            };

            let media = Media {
                oid: media_oid,
                note_oid,
                relative_path: image.relative_path.clone(),
                kind: media_kind,
                dangling,
                blob_oid,
                mime_type,
                mtime,
            };
            pack.relations.push(Relation {
                source_oid: note_oid,
                source_kind: Kind::Note,
                target_oid: media.oid,
                target_kind: Kind::Media,
                rel_type: "owns".to_string(),
            });
            pack.append_object(&Entity::Media(media), format!("Media: {}", image.relative_path), now)?;
        }
    }

    let file_entity = FileEntity {
        oid: file_oid,
        relative_path: relative_path.to_string(),
        size: content.len() as u64,
        mtime,
        hash: pack_oid,
        attributes: file_attributes,
        root_notes,
    };
    pack.append_object(&Entity::File(file_entity), format!("File: {relative_path}"), now)?;

    Ok(pack)
}

/// Assigns each parsed note a position-stable OID (derived from file path +
/// title chain), so a note's identity survives a body-only edit — only its
/// separate `content_hash` field changes in that case (§4.9, §9).
fn assign_note_oids(relative_path: &str, notes: &[ParsedNote]) -> Vec<Oid> {
    let mut oids = vec![Oid::NIL; notes.len()];
    for i in 0..notes.len() {
        let mut chain = vec![notes[i].title.clone()];
        let mut cursor = notes[i].parent_index;
        while let Some(p) = cursor {
            chain.push(notes[p].title.clone());
            cursor = notes[p].parent_index;
        }
        chain.reverse();
        let key = format!("{relative_path}\u{1f}{}", chain.join("\u{1f}"));
        oids[i] = Oid::new_from_bytes(key.as_bytes());
    }
    oids
}

fn note_kind_from_str(s: &str) -> Option<NoteKind> {
    match s {
        "free" => Some(NoteKind::Free),
        "reference" => Some(NoteKind::Reference),
        "note" => Some(NoteKind::Note),
        "flashcard" => Some(NoteKind::Flashcard),
        "cheatsheet" => Some(NoteKind::Cheatsheet),
        "journal" => Some(NoteKind::Journal),
        "todo" => Some(NoteKind::Todo),
        "quote" => Some(NoteKind::Quote),
        "artwork" => Some(NoteKind::Artwork),
        _ => None,
    }
}

fn unix_to_date(ts: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + chrono::Duration::seconds(ts)
}

fn date_to_unix(date: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    (date - epoch).num_seconds()
}

fn mime_guess_from_extension(ext: &str) -> String {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
    .to_string()
}
