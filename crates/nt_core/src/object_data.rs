//! ObjectData codec: a single envelope that can carry any entity variant.
//!
//! Entities are serialized to their canonical YAML form, then zlib-compressed.
//! Inside a pack file the compressed bytes appear as one base64 scalar so the
//! whole pack stays a plain YAML document.

use crate::entity::{Entity, Kind};
use crate::error::{NtError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Serializes `entity` to canonical YAML, then zlib-compresses the result.
pub fn encode(entity: &Entity) -> Result<Vec<u8>> {
    let yaml = serde_yaml::to_string(entity).map_err(|e| NtError::ParseError {
        path: Default::default(),
        reason: format!("encoding entity to yaml: {e}"),
    })?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(yaml.as_bytes())
        .map_err(|e| NtError::io("<object-data>", e))?;
    encoder.finish().map_err(|e| NtError::io("<object-data>", e))
}

/// Base64-encodes compressed bytes for embedding as a single YAML scalar.
pub fn to_base64(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decodes a base64 scalar back into compressed bytes.
pub fn from_base64(s: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s.trim())
        .map_err(|e| NtError::DecodeError {
            oid: "<unknown>".to_string(),
            reason: format!("invalid base64 payload: {e}"),
        })
}

/// Zlib-inflates and YAML-parses `bytes`, dispatching on `kind`.
///
/// `oid` is used only to annotate error messages.
pub fn decode(bytes: &[u8], kind: Kind, oid: &str) -> Result<Entity> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut yaml = String::new();
    decoder
        .read_to_string(&mut yaml)
        .map_err(|e| NtError::DecodeError {
            oid: oid.to_string(),
            reason: format!("corrupt zlib stream: {e}"),
        })?;

    let entity: Entity = serde_yaml::from_str(&yaml).map_err(|e| NtError::DecodeError {
        oid: oid.to_string(),
        reason: format!("yaml parse failure: {e}"),
    })?;

    if entity.kind() != kind {
        return Err(NtError::DecodeError {
            oid: oid.to_string(),
            reason: format!(
                "declared kind {:?} does not match decoded variant {:?}",
                kind,
                entity.kind()
            ),
        });
    }

    Ok(entity)
}
