//! PackFile: the atomic persistence unit for one source Markdown file (§4.3).

use crate::entity::{Entity, Kind, Object, Relation};
use crate::error::{NtError, Result};
use crate::object_data;
use crate::oid::Oid;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One entity, compressed and embedded as a base64 scalar (§4.2, §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackObject {
    pub oid: Oid,
    pub kind: Kind,
    pub ctime: i64,
    pub desc: String,
    pub data: String,
}

/// A reference to a blob stored in the blob store, scoped to this pack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlobRef {
    pub oid: Oid,
    pub mime: String,
}

/// The atomic persistence unit corresponding to one source file.
///
/// The pack's own OID equals the source file's content OID (§4.3): editing a
/// file produces a *new* pack with a *new* OID (the content changed), while
/// re-saving unchanged content reuses the same OID with a bumped `ctime`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackFile {
    pub oid: Oid,
    pub file_relative_path: String,
    pub file_mtime: i64,
    pub file_size: u64,
    pub ctime: i64,
    #[serde(default)]
    pub objects: Vec<PackObject>,
    #[serde(default)]
    pub blobs: Vec<BlobRef>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl PackFile {
    /// Starts a new, empty pack for a source file.
    pub fn new(oid: Oid, file_relative_path: impl Into<String>, file_mtime: i64, file_size: u64, ctime: i64) -> Self {
        Self {
            oid,
            file_relative_path: file_relative_path.into(),
            file_mtime,
            file_size,
            ctime,
            objects: Vec::new(),
            blobs: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Encodes `entity` via the ObjectData codec (§4.2) and appends it.
    pub fn append_object(&mut self, entity: &Entity, desc: impl Into<String>, ctime: i64) -> Result<()> {
        let encoded = object_data::encode(entity)?;
        let data = object_data::to_base64(&encoded);
        self.objects.push(PackObject {
            oid: entity.unique_oid(),
            kind: entity.kind(),
            ctime,
            desc: desc.into(),
            data,
        });
        Ok(())
    }

    /// Appends a blob reference (the bytes themselves live in the blob store).
    pub fn append_blob(&mut self, blob_ref: BlobRef) {
        if !self.blobs.iter().any(|b| b.oid == blob_ref.oid) {
            self.blobs.push(blob_ref);
        }
    }

    /// Looks up a pack object by OID.
    pub fn get(&self, oid: Oid) -> Result<&PackObject> {
        self.objects
            .iter()
            .find(|o| o.oid == oid)
            .ok_or_else(|| NtError::NotFound(oid.as_hex()))
    }

    /// Decodes the pack object at `oid` back into its entity.
    pub fn get_entity(&self, oid: Oid) -> Result<Entity> {
        let object = self.get(oid)?;
        let compressed = object_data::from_base64(&object.data)?;
        object_data::decode(&compressed, object.kind, &oid.as_hex())
    }

    /// Returns the first blob reference with the given MIME type, if any.
    pub fn find_first_blob_with_mime(&self, mime: &str) -> Option<&BlobRef> {
        self.blobs.iter().find(|b| b.mime == mime)
    }

    /// Serializes to YAML and writes atomically to `path` (tmp + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).map_err(|e| NtError::ParseError {
            path: path.to_path_buf(),
            reason: format!("serializing pack file: {e}"),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| NtError::io(parent, e))?;
        }

        let tmp_path = path.with_extension("pack.tmp");
        fs::write(&tmp_path, yaml).map_err(|e| NtError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, path).map_err(|e| NtError::io(path, e))?;
        Ok(())
    }

    /// Loads a pack file from its on-disk YAML representation.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| NtError::io(path, e))?;
        serde_yaml::from_str(&contents).map_err(|e| NtError::ParseError {
            path: path.to_path_buf(),
            reason: format!("parsing pack file: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::GoLink;
    use tempfile::TempDir;

    fn sample_pack() -> PackFile {
        let mut pack = PackFile::new(Oid::new_from_bytes(b"go.md"), "go.md", 1_700_000_000, 42, 1_700_000_000);
        let link = Entity::GoLink(GoLink {
            oid: Oid::new_from_bytes(b"golink-1"),
            go_name: "docs".to_string(),
            title: "Documentation".to_string(),
            url: "https://example.com".to_string(),
            note_oid: Oid::new_from_bytes(b"note-1"),
            mtime: 1_700_000_000,
        });
        pack.append_object(&link, "GoLink: docs", 1_700_000_000).unwrap();
        pack.append_blob(BlobRef {
            oid: Oid::new_from_bytes(b"blob-1"),
            mime: "image/svg+xml".to_string(),
        });
        pack
    }

    #[test]
    fn round_trips_through_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ab").join("cdef.pack");
        let pack = sample_pack();
        pack.save(&path).unwrap();
        let loaded = PackFile::load(&path).unwrap();

        assert_eq!(loaded.oid, pack.oid);
        assert_eq!(loaded.objects.len(), 1);
        assert_eq!(loaded.blobs.len(), 1);
    }

    #[test]
    fn get_entity_decodes_back_to_original() {
        let pack = sample_pack();
        let oid = pack.objects[0].oid;
        let entity = pack.get_entity(oid).unwrap();
        assert_eq!(entity.kind(), Kind::GoLink);
    }

    #[test]
    fn find_first_blob_with_mime_matches() {
        let pack = sample_pack();
        assert!(pack.find_first_blob_with_mime("image/svg+xml").is_some());
        assert!(pack.find_first_blob_with_mime("audio/mpeg").is_none());
    }

    #[test]
    fn get_missing_oid_is_not_found() {
        let pack = sample_pack();
        let err = pack.get(Oid::new_from_bytes(b"missing")).unwrap_err();
        assert!(matches!(err, NtError::NotFound(_)));
    }

    #[test]
    fn append_blob_is_deduplicated_by_oid() {
        let mut pack = sample_pack();
        let before = pack.blobs.len();
        pack.append_blob(BlobRef {
            oid: Oid::new_from_bytes(b"blob-1"),
            mime: "image/svg+xml".to_string(),
        });
        assert_eq!(pack.blobs.len(), before);
    }
}
