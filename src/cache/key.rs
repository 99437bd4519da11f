//! Request fingerprints.
//!
//! Each field is hashed length-prefixed, so no choice of field contents can
//! make two different triples feed the same byte stream into the hasher.

use std::fmt;

/// 256-bit blake3 digest of (text, target language, source language).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 8 bytes as hex, enough to correlate log lines.
    pub fn short(&self) -> String {
        self.0[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.short())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&blake3::Hash::from(self.0).to_hex())
    }
}

pub fn derive_key(text: &str, target_language: &str, source_language: &str) -> CacheKey {
    let mut hasher = blake3::Hasher::new();
    for field in [text, target_language, source_language] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    CacheKey(*hasher.finalize().as_bytes())
}
