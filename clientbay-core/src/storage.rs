//! Blob storage seam. File bytes never touch the relational store; uploads
//! go through this trait and only the resulting key/url are persisted.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct StorageError(pub String);

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "storage error: {}", self.0)
    }
}

pub type StorageFuture<T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send>>;

pub trait BlobStorage: Send + Sync + 'static {
    /// Store bytes under `key`, returning a public URL.
    fn put(&self, key: String, content_type: String, bytes: Vec<u8>) -> StorageFuture<String>;
    fn delete(&self, key: String) -> StorageFuture<()>;
}

struct Blob {
    content_type: String,
    bytes: Vec<u8>,
}

/// In-memory store for tests and local development.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Blob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().expect("blob store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().expect("blob store lock").contains_key(key)
    }

    /// Content type and bytes for `key`, if stored.
    pub fn get(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.blobs
            .lock()
            .expect("blob store lock")
            .get(key)
            .map(|b| (b.content_type.clone(), b.bytes.clone()))
    }
}

impl BlobStorage for MemoryBlobStore {
    fn put(&self, key: String, content_type: String, bytes: Vec<u8>) -> StorageFuture<String> {
        let blobs = Arc::clone(&self.blobs);
        Box::pin(async move {
            let url = format!("memory://{key}");
            blobs
                .lock()
                .map_err(|_| StorageError("blob store lock poisoned".into()))?
                .insert(key, Blob { content_type, bytes });
            Ok(url)
        })
    }

    fn delete(&self, key: String) -> StorageFuture<()> {
        let blobs = Arc::clone(&self.blobs);
        Box::pin(async move {
            blobs
                .lock()
                .map_err(|_| StorageError("blob store lock poisoned".into()))?
                .remove(&key);
            Ok(())
        })
    }
}
