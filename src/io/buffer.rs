//! Pass-scoped cache of raw buffer payloads.
//!
//! A [`BufferCache`] belongs to exactly one verification pass over one
//! document. It is never shared between passes, so concurrently running
//! scenarios cannot observe each other's bytes.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::document::{self, Document};
use crate::io::uri;

#[remain::sorted]
#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("Document Error: {0}")]
    Document(#[from] document::Err),
    #[error("IO Error: {0}")]
    IoError(String),
    #[error("Buffer {0} has no URI and the document carries no GLB binary chunk for it")]
    MissingBinaryChunk(usize),
    #[error("Resource not found: {}", .0.display())]
    ResourceNotFound(PathBuf),
    #[error("URI Error: {0}")]
    Uri(#[from] uri::Err),
}

#[derive(Debug, Default)]
pub struct BufferCache {
    loaded: HashMap<usize, Vec<u8>>,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes of buffer `index` of `document`, loading them on
    /// first use. GLB binary chunks are served straight from the document.
    pub fn resolve<'a>(&'a mut self, document: &'a Document, index: usize) -> Result<&'a [u8], Err> {
        let buffer = document.buffer(index)?;
        let uri = match buffer.uri.as_deref() {
            Some(uri) => uri,
            None => {
                return match (&document.blob, index) {
                    (Some(blob), 0) => Ok(blob.as_slice()),
                    _ => Err(Err::MissingBinaryChunk(index)),
                };
            }
        };

        if !self.loaded.contains_key(&index) {
            let bytes = load_uri(document, uri)?;
            tracing::debug!(index, len = bytes.len(), "loaded buffer");
            self.loaded.insert(index, bytes);
        } else {
            tracing::trace!(index, "buffer cache hit");
        }
        Ok(self.loaded[&index].as_slice())
    }

    /// Number of buffers loaded so far.
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

fn load_uri(document: &Document, uri: &str) -> Result<Vec<u8>, Err> {
    if uri::is_data_uri(uri) {
        return Ok(uri::decode_data_uri(uri)?);
    }
    let path = uri::resolve_path(document.base_dir.as_deref(), uri)?;
    std::fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Err::ResourceNotFound(path.clone()),
        _ => Err::IoError(format!("Failed to read buffer {}: {}", path.display(), e)),
    })
}
