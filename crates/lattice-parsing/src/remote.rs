//! Remote-execution seam: content-addressed blob uploads for distributed
//! runs. Invoked only when the `distributed` option is on.

use std::sync::Mutex;

use lattice_core::types::artifacts::CasDigest;
use lattice_core::FxHashMap;

use crate::hash::hash_bytes;

/// Uploads a blob to a content-addressed store and returns its digest.
/// `None` means the upload was declined or failed; the artifact then
/// simply carries no digest.
pub trait BlobStore: Sync {
    fn upload_blob(&self, bytes: &[u8]) -> Option<CasDigest>;
}

/// In-memory CAS for local runs and tests.
pub struct InMemoryBlobStore {
    blobs: Mutex<FxHashMap<u64, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().expect("blob store lock poisoned").len()
    }

    pub fn get(&self, digest: &CasDigest) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .expect("blob store lock poisoned")
            .get(&digest.hash)
            .cloned()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn upload_blob(&self, bytes: &[u8]) -> Option<CasDigest> {
        let digest = CasDigest {
            hash: hash_bytes(bytes).0,
            size: bytes.len() as u64,
        };
        self.blobs
            .lock()
            .expect("blob store lock poisoned")
            .insert(digest.hash, bytes.to_vec());
        Some(digest)
    }
}
