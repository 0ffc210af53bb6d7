//! In-memory blob store for attachment bytes.

use crate::message::ports::blob::{BlobError, BlobResult, BlobStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct BlobState {
    objects: HashMap<String, Vec<u8>>,
    fail_next: bool,
}

/// Blob store that keeps uploaded bytes in memory.
///
/// URLs have the form `memory://<uuid>/<file name>`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    state: Arc<RwLock<BlobState>>,
}

impl InMemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next upload fail with an unavailable error.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Unavailable`] when lock acquisition fails.
    pub fn fail_next_upload(&self) -> BlobResult<()> {
        self.lock()?.fail_next = true;
        Ok(())
    }

    /// Returns the bytes stored under `url`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Unavailable`] when lock acquisition fails.
    pub fn get(&self, url: &str) -> BlobResult<Option<Vec<u8>>> {
        Ok(self.lock()?.objects.get(url).cloned())
    }

    /// Returns the number of stored objects.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Unavailable`] when lock acquisition fails.
    pub fn object_count(&self) -> BlobResult<usize> {
        Ok(self.lock()?.objects.len())
    }

    fn lock(&self) -> BlobResult<RwLockWriteGuard<'_, BlobState>> {
        self.state
            .write()
            .map_err(|err| BlobError::unavailable(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(
        &self,
        file_name: &str,
        _content_type: &str,
        bytes: &[u8],
    ) -> BlobResult<String> {
        let mut state = self.lock()?;
        if state.fail_next {
            state.fail_next = false;
            return Err(BlobError::unavailable(std::io::Error::other(
                "injected blob store failure",
            )));
        }
        let url = format!("memory://{}/{file_name}", Uuid::new_v4());
        state.objects.insert(url.clone(), bytes.to_vec());
        Ok(url)
    }
}
