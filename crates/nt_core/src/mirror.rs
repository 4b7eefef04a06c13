//! The database mirror (§4.7): a `rusqlite`-backed relational + full-text
//! projection of committed pack-file objects, synced transactionally inside
//! `commit`. The reference implementation's embedded-KV crate has no SQL or
//! FTS capability, so this mirror is built on `rusqlite` instead — a
//! deliberate substitution, documented in `DESIGN.md`.
//!
//! Every row carries the OID of the pack file it came from, so a commit can
//! drop an entry's *entire* previous contribution with one
//! `DELETE ... WHERE packfile_oid = ?` before inserting the new pack's rows —
//! cheaper and safer than reconciling individual rows (§4.7's "contains
//! exactly the objects reachable from committed entries").

use crate::entity::{Entity, Kind};
use crate::error::Result;
use crate::oid::Oid;
use crate::pack::PackFile;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// One change to apply to the mirror during a commit: the pack file
/// previously backing this path (if any, to be purged) and its replacement
/// (`None` for a tombstone).
pub struct CommitChange<'a> {
    pub old_packfile_oid: Option<Oid>,
    pub new_pack: Option<&'a PackFile>,
}

/// A full-text or structured search hit.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub oid: Oid,
    pub title: String,
    pub file_relative_path: String,
}

/// Process-scoped, mutex-protected connection to `.nt/database.db` (§4.7's
/// "shared resource policy": the database connection is process-scoped and
/// mutex-protected, never shared raw across worker threads).
pub struct Mirror {
    conn: Mutex<Connection>,
}

impl Mirror {
    /// Opens (creating if absent) the database at `path` and ensures its
    /// schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let mirror = Self { conn: Mutex::new(conn) };
        mirror.ensure_schema()?;
        Ok(mirror)
    }

    /// An in-memory mirror, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mirror = Self { conn: Mutex::new(conn) };
        mirror.ensure_schema()?;
        Ok(mirror)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock().expect("mirror connection mutex poisoned");
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Applies a batch of commit changes transactionally: each change's old
    /// pack's rows are purged, then its replacement pack's rows (if any) are
    /// inserted. Rolling back on any failure (§4.7, §7 "database errors abort
    /// the entire commit").
    pub fn sync_commit(&self, changes: &[CommitChange]) -> Result<()> {
        let mut conn = self.conn.lock().expect("mirror connection mutex poisoned");
        let tx = conn.transaction()?;

        for change in changes {
            if let Some(old_oid) = change.old_packfile_oid {
                delete_by_packfile(&tx, old_oid)?;
            }
            if let Some(pack) = change.new_pack {
                insert_pack(&tx, pack)?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Runs a search query against the mirror (§4.7): bare terms hit the FTS5
    /// virtual table over note bodies; `kind:<k>`, `path:<prefix>`, and
    /// `@<attr>:<value>` tokens narrow the candidate set structurally.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let plan = QueryPlan::parse(query);
        let conn = self.conn.lock().expect("mirror connection mutex poisoned");

        let mut sql = String::from(
            "SELECT n.oid, n.title, n.file_relative_path FROM notes n WHERE 1 = 1",
        );
        let mut args: Vec<String> = Vec::new();

        if let Some(kind) = &plan.kind {
            sql.push_str(" AND n.kind = ?");
            args.push(kind.clone());
        }
        if let Some(prefix) = &plan.path_prefix {
            sql.push_str(" AND n.file_relative_path LIKE ?");
            args.push(format!("{prefix}%"));
        }
        for (name, value) in &plan.attrs {
            sql.push_str(" AND n.attributes_json LIKE ?");
            args.push(format!("%\"{name}\":%{value}%"));
        }
        if !plan.terms.is_empty() {
            sql.push_str(" AND n.oid IN (SELECT oid FROM notes_fts WHERE notes_fts MATCH ?)");
            args.push(plan.terms.join(" "));
        }
        sql.push_str(" ORDER BY n.title");

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(params.as_slice(), |row| {
            let oid_hex: String = row.get(0)?;
            let title: String = row.get(1)?;
            let path: String = row.get(2)?;
            Ok((oid_hex, title, path))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (oid_hex, title, file_relative_path) = row?;
            let oid = Oid::from_hex(&oid_hex)?;
            hits.push(SearchHit { oid, title, file_relative_path });
        }
        Ok(hits)
    }

    /// Returns every media row flagged `dangling = true` (used by the `nt
    /// status` dangling-media report and §8 scenario 3).
    pub fn dangling_media(&self) -> Result<Vec<(Oid, String)>> {
        let conn = self.conn.lock().expect("mirror connection mutex poisoned");
        let mut stmt = conn.prepare("SELECT oid, relative_path FROM medias WHERE dangling = 1 ORDER BY relative_path")?;
        let rows = stmt.query_map([], |row| {
            let oid_hex: String = row.get(0)?;
            let path: String = row.get(1)?;
            Ok((oid_hex, path))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (oid_hex, path) = row?;
            out.push((Oid::from_hex(&oid_hex)?, path));
        }
        Ok(out)
    }
}

struct QueryPlan {
    terms: Vec<String>,
    kind: Option<String>,
    path_prefix: Option<String>,
    attrs: Vec<(String, String)>,
}

impl QueryPlan {
    fn parse(query: &str) -> Self {
        let mut plan = QueryPlan {
            terms: Vec::new(),
            kind: None,
            path_prefix: None,
            attrs: Vec::new(),
        };

        for token in query.split_whitespace() {
            if let Some(k) = token.strip_prefix("kind:") {
                plan.kind = Some(k.to_string());
            } else if let Some(p) = token.strip_prefix("path:") {
                plan.path_prefix = Some(p.to_string());
            } else if let Some(rest) = token.strip_prefix('@') {
                if let Some((name, value)) = rest.split_once(':') {
                    plan.attrs.push((name.to_string(), value.to_string()));
                    continue;
                }
                plan.terms.push(token.to_string());
            } else {
                plan.terms.push(token.to_string());
            }
        }
        plan
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    oid TEXT PRIMARY KEY,
    packfile_oid TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    size INTEGER NOT NULL,
    mtime INTEGER NOT NULL,
    hash TEXT NOT NULL,
    attributes_json TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS notes (
    oid TEXT PRIMARY KEY,
    packfile_oid TEXT NOT NULL,
    file_relative_path TEXT NOT NULL,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    parent_oid TEXT,
    content_hash TEXT NOT NULL,
    tags_json TEXT NOT NULL,
    attributes_json TEXT NOT NULL,
    mtime INTEGER NOT NULL
);
CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(oid UNINDEXED, title, body);
CREATE TABLE IF NOT EXISTS flashcards (
    oid TEXT PRIMARY KEY,
    packfile_oid TEXT NOT NULL,
    note_oid TEXT NOT NULL,
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    card_type TEXT NOT NULL,
    queue TEXT NOT NULL,
    due INTEGER NOT NULL,
    interval INTEGER NOT NULL,
    ease_factor REAL NOT NULL,
    repetitions INTEGER NOT NULL,
    lapses INTEGER NOT NULL,
    mtime INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS medias (
    oid TEXT PRIMARY KEY,
    packfile_oid TEXT NOT NULL,
    note_oid TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    kind TEXT NOT NULL,
    dangling INTEGER NOT NULL,
    blob_oid TEXT,
    mime_type TEXT,
    mtime INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS golinks (
    oid TEXT PRIMARY KEY,
    packfile_oid TEXT NOT NULL,
    go_name TEXT NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    note_oid TEXT NOT NULL,
    mtime INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS reminders (
    oid TEXT PRIMARY KEY,
    packfile_oid TEXT NOT NULL,
    note_oid TEXT NOT NULL,
    tag TEXT NOT NULL,
    next_performed_at INTEGER,
    mtime INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS studies (
    oid TEXT PRIMARY KEY,
    packfile_oid TEXT NOT NULL,
    flashcard_oid TEXT NOT NULL,
    performed_at INTEGER NOT NULL,
    grade INTEGER NOT NULL,
    mtime INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS relations (
    packfile_oid TEXT NOT NULL,
    source_oid TEXT NOT NULL,
    source_kind TEXT NOT NULL,
    target_oid TEXT NOT NULL,
    target_kind TEXT NOT NULL,
    rel_type TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notes_packfile ON notes(packfile_oid);
CREATE INDEX IF NOT EXISTS idx_flashcards_packfile ON flashcards(packfile_oid);
CREATE INDEX IF NOT EXISTS idx_medias_packfile ON medias(packfile_oid);
CREATE INDEX IF NOT EXISTS idx_golinks_packfile ON golinks(packfile_oid);
CREATE INDEX IF NOT EXISTS idx_reminders_packfile ON reminders(packfile_oid);
CREATE INDEX IF NOT EXISTS idx_studies_packfile ON studies(packfile_oid);
CREATE INDEX IF NOT EXISTS idx_relations_packfile ON relations(packfile_oid);
CREATE INDEX IF NOT EXISTS idx_files_packfile ON files(packfile_oid);
";

fn delete_by_packfile(tx: &rusqlite::Transaction, oid: Oid) -> Result<()> {
    let hex = oid.as_hex();
    let note_oids: Vec<String> = {
        let mut stmt = tx.prepare("SELECT oid FROM notes WHERE packfile_oid = ?1")?;
        let rows = stmt.query_map(params![hex], |r| r.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };
    for table in ["files", "notes", "flashcards", "medias", "golinks", "reminders", "studies", "relations"] {
        tx.execute(&format!("DELETE FROM {table} WHERE packfile_oid = ?1"), params![hex])?;
    }
    for note_oid in note_oids {
        tx.execute("DELETE FROM notes_fts WHERE oid = ?1", params![note_oid])?;
    }
    Ok(())
}

fn insert_pack(tx: &rusqlite::Transaction, pack: &PackFile) -> Result<()> {
    let packfile_oid = pack.oid.as_hex();

    for object in &pack.objects {
        let entity = pack.get_entity(object.oid)?;
        match entity {
            Entity::File(f) => {
                tx.execute(
                    "INSERT OR REPLACE INTO files (oid, packfile_oid, relative_path, size, mtime, hash, attributes_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        f.oid.as_hex(),
                        packfile_oid,
                        f.relative_path,
                        f.size as i64,
                        f.mtime,
                        f.hash.as_hex(),
                        serde_json::to_string(&f.attributes).unwrap_or_default(),
                    ],
                )?;
            }
            Entity::Note(n) => {
                tx.execute(
                    "INSERT OR REPLACE INTO notes (oid, packfile_oid, file_relative_path, kind, title, parent_oid, content_hash, tags_json, attributes_json, mtime) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        n.oid.as_hex(),
                        packfile_oid,
                        pack.file_relative_path,
                        format!("{:?}", n.kind).to_lowercase(),
                        n.title,
                        n.parent_oid.map(|o| o.as_hex()),
                        n.content_hash.as_hex(),
                        serde_json::to_string(&n.tags).unwrap_or_default(),
                        serde_json::to_string(&n.attributes).unwrap_or_default(),
                        n.mtime,
                    ],
                )?;
                tx.execute("DELETE FROM notes_fts WHERE oid = ?1", params![n.oid.as_hex()])?;
                tx.execute(
                    "INSERT INTO notes_fts (oid, title, body) VALUES (?1, ?2, ?3)",
                    params![n.oid.as_hex(), n.title, n.text],
                )?;
            }
            Entity::Flashcard(c) => {
                tx.execute(
                    "INSERT OR REPLACE INTO flashcards (oid, packfile_oid, note_oid, front, back, card_type, queue, due, interval, ease_factor, repetitions, lapses, mtime) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        c.oid.as_hex(),
                        packfile_oid,
                        c.note_oid.as_hex(),
                        c.front,
                        c.back,
                        c.srs.card_type,
                        c.srs.queue,
                        c.srs.due,
                        c.srs.interval,
                        c.srs.ease_factor,
                        c.srs.repetitions,
                        c.srs.lapses,
                        c.mtime,
                    ],
                )?;
            }
            Entity::Media(m) => {
                tx.execute(
                    "INSERT OR REPLACE INTO medias (oid, packfile_oid, note_oid, relative_path, kind, dangling, blob_oid, mime_type, mtime) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        m.oid.as_hex(),
                        packfile_oid,
                        m.note_oid.as_hex(),
                        m.relative_path,
                        format!("{:?}", m.kind).to_lowercase(),
                        m.dangling,
                        m.blob_oid.map(|o| o.as_hex()),
                        m.mime_type,
                        m.mtime,
                    ],
                )?;
            }
            Entity::GoLink(g) => {
                tx.execute(
                    "INSERT OR REPLACE INTO golinks (oid, packfile_oid, go_name, title, url, note_oid, mtime) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![g.oid.as_hex(), packfile_oid, g.go_name, g.title, g.url, g.note_oid.as_hex(), g.mtime],
                )?;
            }
            Entity::Reminder(r) => {
                tx.execute(
                    "INSERT OR REPLACE INTO reminders (oid, packfile_oid, note_oid, tag, next_performed_at, mtime) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![r.oid.as_hex(), packfile_oid, r.note_oid.as_hex(), r.tag, r.next_performed_at, r.mtime],
                )?;
            }
            Entity::Study(s) => {
                tx.execute(
                    "INSERT OR REPLACE INTO studies (oid, packfile_oid, flashcard_oid, performed_at, grade, mtime) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![s.oid.as_hex(), packfile_oid, s.flashcard_oid.as_hex(), s.performed_at, s.grade, s.mtime],
                )?;
            }
        }
    }

    for relation in &pack.relations {
        tx.execute(
            "INSERT INTO relations (packfile_oid, source_oid, source_kind, target_oid, target_kind, rel_type) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                packfile_oid,
                relation.source_oid.as_hex(),
                kind_label(relation.source_kind),
                relation.target_oid.as_hex(),
                kind_label(relation.target_kind),
                relation.rel_type,
            ],
        )?;
    }

    Ok(())
}

fn kind_label(kind: Kind) -> String {
    kind.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{GoLink, Media, MediaKind, Note, NoteKind};
    use crate::oid::Oid;

    fn pack_with_note(path: &str, body: &str) -> PackFile {
        let mut pack = PackFile::new(Oid::new_from_bytes(format!("{path}:{body}").as_bytes()), path, 100, 10, 100);
        let note = Note {
            oid: Oid::new_from_bytes(format!("{path}:note").as_bytes()),
            kind: NoteKind::Reference,
            title: "Go".to_string(),
            parent_oid: None,
            raw_content: body.to_string(),
            body: body.to_string(),
            html: String::new(),
            text: body.to_string(),
            content_hash: Oid::new_from_bytes(body.as_bytes()),
            tags: vec![],
            attributes: Default::default(),
            mtime: 100,
        };
        pack.append_object(&Entity::Note(note), "Note: Go", 100).unwrap();
        pack
    }

    #[test]
    fn commit_inserts_note_row_and_fts_entry() {
        let mirror = Mirror::open_in_memory().unwrap();
        let pack = pack_with_note("go.md", "FTS5");
        mirror
            .sync_commit(&[CommitChange {
                old_packfile_oid: None,
                new_pack: Some(&pack),
            }])
            .unwrap();

        let hits = mirror.search("kind:reference fts5").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Go");
    }

    #[test]
    fn fts_lifecycle_update_then_delete() {
        let mirror = Mirror::open_in_memory().unwrap();
        let v1 = pack_with_note("go.md", "FTS5");
        mirror
            .sync_commit(&[CommitChange {
                old_packfile_oid: None,
                new_pack: Some(&v1),
            }])
            .unwrap();
        assert_eq!(mirror.search("kind:reference fts5").unwrap().len(), 1);

        let v2 = pack_with_note("go.md", "full-text");
        mirror
            .sync_commit(&[CommitChange {
                old_packfile_oid: Some(v1.oid),
                new_pack: Some(&v2),
            }])
            .unwrap();
        assert!(mirror.search("kind:reference full").unwrap().len() == 1);
        assert!(mirror.search("kind:reference fts5").unwrap().is_empty());

        mirror
            .sync_commit(&[CommitChange {
                old_packfile_oid: Some(v2.oid),
                new_pack: None,
            }])
            .unwrap();
        assert!(mirror.search("kind:reference full").unwrap().is_empty());
    }

    #[test]
    fn dangling_media_is_queryable() {
        let mirror = Mirror::open_in_memory().unwrap();
        let mut pack = PackFile::new(Oid::new_from_bytes(b"go.md"), "go.md", 100, 10, 100);
        let media = Media {
            oid: Oid::new_from_bytes(b"media"),
            note_oid: Oid::new_from_bytes(b"note"),
            relative_path: "medias/go.svg".to_string(),
            kind: MediaKind::Picture,
            dangling: true,
            blob_oid: None,
            mime_type: None,
            mtime: 100,
        };
        pack.append_object(&Entity::Media(media), "Media", 100).unwrap();
        mirror
            .sync_commit(&[CommitChange {
                old_packfile_oid: None,
                new_pack: Some(&pack),
            }])
            .unwrap();

        let dangling = mirror.dangling_media().unwrap();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].1, "medias/go.svg");
    }

    #[test]
    fn path_prefix_filters_results() {
        let mirror = Mirror::open_in_memory().unwrap();
        let a = pack_with_note("notes/a.md", "alpha body");
        let b = pack_with_note("other/b.md", "alpha body");
        mirror
            .sync_commit(&[
                CommitChange { old_packfile_oid: None, new_pack: Some(&a) },
                CommitChange { old_packfile_oid: None, new_pack: Some(&b) },
            ])
            .unwrap();

        let hits = mirror.search("path:notes/ alpha").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_relative_path, "notes/a.md");
    }

    #[test]
    fn golink_rows_are_purged_with_their_packfile() {
        let mirror = Mirror::open_in_memory().unwrap();
        let mut pack = PackFile::new(Oid::new_from_bytes(b"go.md"), "go.md", 100, 10, 100);
        let golink = GoLink {
            oid: Oid::new_from_bytes(b"golink"),
            go_name: "docs".to_string(),
            title: "Docs".to_string(),
            url: "https://example.com".to_string(),
            note_oid: Oid::new_from_bytes(b"note"),
            mtime: 100,
        };
        pack.append_object(&Entity::GoLink(golink), "GoLink", 100).unwrap();
        mirror
            .sync_commit(&[CommitChange { old_packfile_oid: None, new_pack: Some(&pack) }])
            .unwrap();

        mirror
            .sync_commit(&[CommitChange { old_packfile_oid: Some(pack.oid), new_pack: None }])
            .unwrap();

        let conn = mirror.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM golinks", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }
}
