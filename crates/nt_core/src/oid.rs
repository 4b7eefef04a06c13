//! Object identifiers: 40-hex strings, either random or content-derived.

use crate::error::{NtError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A 20-byte content identifier, displayed and stored as 40 lowercase hex
/// characters (SHA-1 width — any collision-resistant 160-bit hash is fine).
///
/// ```
/// use nt_core::Oid;
///
/// let a = Oid::new_from_bytes(b"same content");
/// let b = Oid::new_from_bytes(b"same content");
/// assert_eq!(a, b);
/// assert_eq!(a.as_hex().len(), 40);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Oid([u8; Oid::LEN]);

impl Oid {
    /// Length of an Oid in bytes.
    pub const LEN: usize = 20;
    /// Length of an Oid as a hex string.
    pub const HEX_LEN: usize = 40;

    /// The nil OID (40 zeros): "never committed."
    pub const NIL: Oid = Oid([0u8; Self::LEN]);

    /// Returns true if this is the nil OID.
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; Self::LEN]
    }

    /// Generates a new random OID (UUID v4 derived).
    ///
    /// Honors the test seam set via [`pin_next`] for reproducible fixtures.
    pub fn new() -> Self {
        if let Some(pinned) = take_pinned() {
            return pinned;
        }
        let uuid = uuid::Uuid::new_v4();
        let mut bytes = [0u8; Self::LEN];
        let uuid_bytes = uuid.as_bytes();
        bytes[..16].copy_from_slice(uuid_bytes);
        // Remaining 4 bytes come from a second random UUID's head so the OID
        // space is not just a zero-padded UUID.
        let filler = uuid::Uuid::new_v4();
        bytes[16..].copy_from_slice(&filler.as_bytes()[..4]);
        Self(bytes)
    }

    /// Computes the content-derived OID for arbitrary bytes.
    ///
    /// Deterministic: equal bytes always produce an equal OID.
    pub fn new_from_bytes(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..Self::LEN]);
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Returns the lowercase 40-hex representation.
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses an OID from a 40-hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN {
            return Err(NtError::InvalidOid(format!(
                "expected {} hex chars, got {}",
                Self::HEX_LEN,
                s.len()
            )));
        }
        let bytes = hex::decode(s).map_err(|e| NtError::InvalidOid(e.to_string()))?;
        let arr: [u8; Self::LEN] = bytes
            .try_into()
            .map_err(|_| NtError::InvalidOid("invalid length".to_string()))?;
        Ok(Self(arr))
    }

    /// Returns `first_two_chars/remaining_chars`, the on-disk sharded path
    /// for this OID relative to `.nt/objects/`.
    pub fn relative_path(&self) -> String {
        let hex = self.as_hex();
        format!("{}/{}", &hex[..2], &hex[2..])
    }
}

impl Default for Oid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.as_hex())
    }
}

impl std::str::FromStr for Oid {
    type Err = NtError;
    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.as_hex()
    }
}

impl TryFrom<String> for Oid {
    type Error = NtError;
    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}

// Test seam: lets tests pin the next `Oid::new()` call to a fixed value,
// for reproducible fixtures that assert on exact random OIDs.
static PIN_ACTIVE: AtomicBool = AtomicBool::new(false);
static PINNED: Mutex<Option<Oid>> = Mutex::new(None);

fn take_pinned() -> Option<Oid> {
    if !PIN_ACTIVE.load(Ordering::SeqCst) {
        return None;
    }
    let mut guard = PINNED.lock().expect("oid pin mutex poisoned");
    guard.take()
}

/// Pins the next call to [`Oid::new`] to return `oid`. Intended for tests
/// that need deterministic random OIDs; clears itself after one use.
pub fn pin_next(oid: Oid) {
    PIN_ACTIVE.store(true, Ordering::SeqCst);
    *PINNED.lock().expect("oid pin mutex poisoned") = Some(oid);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        let a = Oid::new_from_bytes(b"hello world");
        let b = Oid::new_from_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_for_different_bytes() {
        let a = Oid::new_from_bytes(b"hello world");
        let b = Oid::new_from_bytes(b"hello there");
        assert_ne!(a, b);
    }

    #[test]
    fn hex_roundtrip() {
        let oid = Oid::new_from_bytes(b"roundtrip me");
        let hex = oid.as_hex();
        assert_eq!(hex.len(), 40);
        assert_eq!(Oid::from_hex(&hex).unwrap(), oid);
    }

    #[test]
    fn relative_path_splits_first_two_chars() {
        let oid = Oid::from_hex(&"ab".to_string().repeat(20)).unwrap();
        assert_eq!(oid.relative_path(), format!("ab/{}", "ab".repeat(19)));
    }

    #[test]
    fn nil_oid_is_forty_zeros() {
        assert_eq!(Oid::NIL.as_hex(), "0".repeat(40));
        assert!(Oid::NIL.is_nil());
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(Oid::from_hex("abc").is_err());
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        assert!(Oid::from_hex(&"g".repeat(40)).is_err());
    }

    #[test]
    fn pin_next_controls_one_random_oid() {
        let pinned = Oid::new_from_bytes(b"pinned value");
        pin_next(pinned);
        assert_eq!(Oid::new(), pinned);
        // Pin is consumed; subsequent calls are random again.
        assert_ne!(Oid::new(), pinned);
    }
}
