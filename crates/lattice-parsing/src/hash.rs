//! Content hashing: streaming xxh3-64 over file bytes, seed 0.

use lattice_core::ContentHash;
use xxhash_rust::xxh3::Xxh3;

/// Streaming 64-bit content hasher.
pub struct ContentHasher {
    inner: Xxh3,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(0),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn digest(&self) -> ContentHash {
        ContentHash(self.inner.digest())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot digest of a byte string.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let mut hasher = ContentHasher::new();
    hasher.update(bytes);
    hasher.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_output() {
        let a = hash_bytes(b"export const x = 1;");
        let b = hash_bytes(b"export const x = 1;");
        assert_eq!(a, b);
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut h = ContentHasher::new();
        h.update(b"export const ");
        h.update(b"x = 1;");
        assert_eq!(h.digest(), hash_bytes(b"export const x = 1;"));
    }

    #[test]
    fn different_input_different_output() {
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
    }
}
