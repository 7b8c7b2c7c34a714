// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Byte sources that loaders read from.

use crate::error::LoadError;
use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Asynchronous access to raw asset bytes.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Reads the full contents addressed by `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>, LoadError>;

    /// Resolves a path referenced from inside another asset (for example a
    /// glTF buffer URI) relative to the referencing asset.
    fn resolve_relative(&self, base: &str, relative: &str) -> String {
        match base.rfind('/') {
            Some(index) => format!("{}/{}", &base[..index], relative),
            None => relative.to_string(),
        }
    }
}

/// Reads assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    /// Serves paths relative to `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The directory paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl AssetSource for FileSource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let full = self.full_path(path);
        tokio::fs::read(&full).await.map_err(|e| LoadError::Source {
            path: path.to_string(),
            reason: format!("{}: {}", full.display(), e),
        })
    }
}

/// Serves assets from memory, optionally with simulated latency.
///
/// Used by headless hosts that bundle their assets and by tests that need to
/// observe how often a path was actually read.
#[derive(Default)]
pub struct MemorySource {
    files: RwLock<AHashMap<String, Arc<[u8]>>>,
    reads: RwLock<AHashMap<String, usize>>,
    total_reads: AtomicUsize,
    latency: Option<Duration>,
}

impl MemorySource {
    /// An empty source with no latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every read by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Stores or replaces the bytes for `path`.
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        let bytes: Vec<u8> = bytes.into();
        self.files.write().insert(path.to_string(), Arc::from(bytes));
    }

    /// Removes `path`.
    pub fn remove(&self, path: &str) -> bool {
        self.files.write().remove(path).is_some()
    }

    /// How many times `path` has been read.
    pub fn read_count(&self, path: &str) -> usize {
        self.reads.read().get(path).copied().unwrap_or(0)
    }

    /// How many reads happened in total.
    pub fn total_reads(&self) -> usize {
        self.total_reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AssetSource for MemorySource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        *self.reads.write().entry(path.to_string()).or_insert(0) += 1;
        self.total_reads.fetch_add(1, Ordering::Relaxed);
        let bytes = self.files.read().get(path).cloned();
        bytes.map(|b| b.to_vec()).ok_or_else(|| LoadError::Source {
            path: path.to_string(),
            reason: "not found".to_string(),
        })
    }
}
