//! Short-lived URLs that give the media adapter access to stored bytes.
//!
//! A [`BlobHandle`] is issued for a stored file and stays valid until it is
//! released. Releasing happens explicitly through [`BlobHandle::release`] or
//! implicitly when the last clone of the handle is dropped, so a handle
//! cannot outlive every owner that could release it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:playnest/";

struct RegisteredBlob {
    mime_type: String,
    data: Arc<[u8]>,
}

#[derive(Default)]
struct Registry {
    blobs: HashMap<String, RegisteredBlob>,
    // Latest URL issued per stored file. Upgrading happens outside of revoke
    // so that dropping a handle never re-enters the lock.
    by_file: HashMap<i64, (String, Weak<HandleInner>)>,
}

impl Registry {
    fn revoke(&mut self, url: &str, file_id: i64) -> bool {
        let removed = self.blobs.remove(url).is_some();
        if removed {
            if matches!(self.by_file.get(&file_id), Some((latest, _)) if latest == url) {
                self.by_file.remove(&file_id);
            }
            debug!("Revoked {}", url);
        }
        removed
    }
}

/// Issues and resolves byte-access URLs
#[derive(Clone, Default)]
pub struct BlobUrlRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl BlobUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes of a stored file and return a handle to them
    pub fn create(&self, file_id: i64, mime_type: &str, data: Arc<[u8]>) -> BlobHandle {
        let url = format!("{}{}", URL_PREFIX, Uuid::new_v4());
        let inner = Arc::new(HandleInner {
            url: url.clone(),
            file_id,
            registry: Arc::downgrade(&self.inner),
        });

        let mut registry = self.inner.lock();
        registry
            .by_file
            .insert(file_id, (url.clone(), Arc::downgrade(&inner)));
        registry.blobs.insert(
            url,
            RegisteredBlob {
                mime_type: mime_type.to_string(),
                data,
            },
        );

        BlobHandle { inner }
    }

    /// A live handle already issued for this stored file, if any
    pub fn attached(&self, file_id: i64) -> Option<BlobHandle> {
        let registry = self.inner.lock();
        let (url, weak) = registry.by_file.get(&file_id)?;
        if !registry.blobs.contains_key(url) {
            return None;
        }
        weak.upgrade().map(|inner| BlobHandle { inner })
    }

    /// Bytes and MIME type behind a URL; revoked URLs resolve to nothing
    pub fn resolve(&self, url: &str) -> Option<(String, Arc<[u8]>)> {
        let registry = self.inner.lock();
        registry
            .blobs
            .get(url)
            .map(|blob| (blob.mime_type.clone(), blob.data.clone()))
    }

    /// Number of URLs that have not been released yet
    pub fn live_count(&self) -> usize {
        self.inner.lock().blobs.len()
    }
}

struct HandleInner {
    url: String,
    file_id: i64,
    registry: Weak<Mutex<Registry>>,
}

impl HandleInner {
    fn release(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.lock().revoke(&self.url, self.file_id),
            None => false,
        }
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// A byte-access URL for one stored file
///
/// Cloning shares the same URL. The URL is revoked by `release()` or when the
/// last clone goes away, whichever comes first.
#[derive(Clone)]
pub struct BlobHandle {
    inner: Arc<HandleInner>,
}

impl BlobHandle {
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn file_id(&self) -> i64 {
        self.inner.file_id
    }

    /// Revoke the URL now. Returns false if it was already revoked.
    pub fn release(&self) -> bool {
        self.inner.release()
    }
}

impl std::fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobHandle")
            .field("url", &self.inner.url)
            .field("file_id", &self.inner.file_id)
            .finish()
    }
}

impl PartialEq for BlobHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.url == other.inner.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes() -> Arc<[u8]> {
        Arc::from(vec![1u8, 2, 3])
    }

    #[test]
    fn test_resolve_until_released() {
        let registry = BlobUrlRegistry::new();
        let handle = registry.create(7, "audio/mpeg", bytes());
        assert!(handle.url().starts_with("blob:"));

        let (mime, data) = registry.resolve(handle.url()).unwrap();
        assert_eq!(mime, "audio/mpeg");
        assert_eq!(&data[..], &[1, 2, 3]);

        assert!(handle.release());
        assert!(!handle.release());
        assert!(registry.resolve(handle.url()).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_dropping_last_clone_revokes() {
        let registry = BlobUrlRegistry::new();
        let handle = registry.create(1, "video/mp4", bytes());
        let clone = handle.clone();

        drop(handle);
        assert_eq!(registry.live_count(), 1);
        drop(clone);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_attached_reuses_live_handle() {
        let registry = BlobUrlRegistry::new();
        let handle = registry.create(3, "audio/mpeg", bytes());

        let again = registry.attached(3).unwrap();
        assert_eq!(again, handle);
        assert!(registry.attached(4).is_none());

        handle.release();
        assert!(registry.attached(3).is_none());
    }

    #[test]
    fn test_registry_outlived_by_handle() {
        let registry = BlobUrlRegistry::new();
        let handle = registry.create(1, "audio/mpeg", bytes());
        drop(registry);
        assert!(!handle.release());
    }
}
