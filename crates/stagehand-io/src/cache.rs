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

//! The application-wide asset cache.

use crate::config::LoaderConfig;
use crate::decoders::{
    Decoder, DracoDecoder, FileSystemResolver, GltfDecoder, ImageDecoder, ImageKind, ObjDecoder,
    SplatDecoder,
};
use crate::error::LoadError;
use crate::inflight::{EntryState, InFlightMap, LoadStats};
use crate::loader::{CachedLoader, FormatLoader};
use crate::registry::LoaderRegistry;
use crate::source::AssetSource;
use stagehand_core::asset::ResourceTemplate;
use stagehand_core::resource::RenderDevice;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identity of a cached asset. Paths are compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Format tag.
    pub format: String,
    /// Source path.
    pub path: String,
}

impl CacheKey {
    /// Builds a key.
    pub fn new(format: &str, path: &str) -> Self {
        Self {
            format: format.to_string(),
            path: path.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.format, self.path)
    }
}

/// Deduplicating cache of decoded templates, keyed by `(format, path)`.
///
/// One instance is created at the application root and shared (behind an
/// `Arc`) with everything that loads assets. Requests for the same key
/// while a decode is in flight join that decode; a failed decode leaves no
/// entry behind, so the next request retries.
///
/// The cache owns the templates it stores. Consumers instantiate copies
/// from them and never attach the templates themselves.
///
/// # Examples
///
/// ```no_run
/// use stagehand_core::resource::ResourceLedger;
/// use stagehand_io::{AssetCache, LoaderConfig};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), stagehand_io::LoadError> {
/// let config = LoaderConfig::default();
/// let device = Arc::new(ResourceLedger::new());
/// let cache = AssetCache::with_default_loaders(Arc::new(config.file_source()), device, &config);
///
/// let chair = cache.request("gltf", "models/chair.glb").await?;
/// let again = cache.request("gltf", "models/chair.glb").await?;
/// assert!(Arc::ptr_eq(&chair, &again));
/// # Ok(())
/// # }
/// ```
pub struct AssetCache {
    registry: LoaderRegistry,
    entries: Arc<InFlightMap<CacheKey, Arc<ResourceTemplate>>>,
    device: Arc<dyn RenderDevice>,
    disposed: Arc<AtomicBool>,
}

impl AssetCache {
    /// An empty cache with no loaders.
    pub fn new(device: Arc<dyn RenderDevice>) -> Self {
        Self {
            registry: LoaderRegistry::new(),
            entries: Arc::new(InFlightMap::new()),
            device,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A cache with the standard loader set: `gltf`, `obj`, `draco`,
    /// `splat`, `rgbe`, `exr` and `texture`.
    pub fn with_default_loaders(
        source: Arc<dyn AssetSource>,
        device: Arc<dyn RenderDevice>,
        config: &LoaderConfig,
    ) -> Self {
        fn cached<D: Decoder>(
            tag: &str,
            decoder: D,
            source: &Arc<dyn AssetSource>,
            device: &Arc<dyn RenderDevice>,
        ) -> Arc<dyn FormatLoader> {
            Arc::new(CachedLoader::new(
                tag,
                decoder,
                Arc::clone(source),
                Arc::clone(device),
            ))
        }

        let cache = Self::new(Arc::clone(&device));
        let resolver = Arc::new(FileSystemResolver::new(&config.asset_root));
        let splat = match config.max_splat_points {
            Some(max) => SplatDecoder::with_max_points(max),
            None => SplatDecoder::new(),
        };

        cache.register_loader("gltf", cached("gltf", GltfDecoder::new(resolver), &source, &device));
        cache.register_loader("obj", cached("obj", ObjDecoder, &source, &device));
        cache.register_loader("draco", cached("draco", DracoDecoder::new(), &source, &device));
        cache.register_loader("splat", cached("splat", splat, &source, &device));
        for (tag, kind) in [
            ("rgbe", ImageKind::Rgbe),
            ("exr", ImageKind::Exr),
            ("texture", ImageKind::Ldr),
        ] {
            cache.register_loader(tag, cached(tag, ImageDecoder::new(kind), &source, &device));
        }
        cache
    }

    /// Registers (or replaces) the loader for `tag`.
    pub fn register_loader(&self, tag: &str, loader: Arc<dyn FormatLoader>) {
        self.registry.register(tag, loader);
    }

    /// The loader registered for `tag`.
    pub fn loader(&self, tag: &str) -> Option<Arc<dyn FormatLoader>> {
        self.registry.get(tag)
    }

    /// Registered format tags, sorted.
    pub fn formats(&self) -> Vec<String> {
        self.registry.formats()
    }

    /// The device templates are allocated from.
    pub fn device(&self) -> &Arc<dyn RenderDevice> {
        &self.device
    }

    /// Returns the template for `(format, path)`, decoding it if needed.
    ///
    /// - `Ready`: the stored template, immediately.
    /// - `Pending`: waits for the in-flight decode and shares its outcome.
    /// - absent: looks up the loader ([`LoadError::UnknownFormat`] if none,
    ///   without creating an entry) and starts the decode.
    ///
    /// The decode runs detached, so dropping this future does not cancel it.
    pub async fn request(
        &self,
        format: &str,
        path: &str,
    ) -> Result<Arc<ResourceTemplate>, LoadError> {
        let key = CacheKey::new(format, path);
        if self.is_disposed() {
            self.release_late(&key);
            return Err(LoadError::CacheDisposed);
        }
        let result = self
            .entries
            .get_or_load(key.clone(), || {
                let loader = self
                    .registry
                    .get(format)
                    .ok_or_else(|| LoadError::UnknownFormat {
                        format: format.to_string(),
                    })?;
                let disposed = Arc::clone(&self.disposed);
                let device = Arc::clone(&self.device);
                let path = path.to_string();
                Ok(async move {
                    let template = Arc::new(loader.decode(&path).await?);
                    if disposed.load(Ordering::Acquire) {
                        template.release(&*device);
                        return Err(LoadError::CacheDisposed);
                    }
                    Ok(template)
                })
            })
            .await;

        if self.is_disposed() {
            // The decode settled after dispose drained the cache.
            self.release_late(&key);
            return Err(LoadError::CacheDisposed);
        }
        result
    }

    fn release_late(&self, key: &CacheKey) {
        if let Some(late) = self.entries.remove_ready(key) {
            late.release(&*self.device);
            log::debug!("Released {key}, which settled after dispose");
        }
    }

    /// Like [`AssetCache::request`], but gives up after `timeout` with
    /// [`LoadError::TimedOut`]. The decode keeps running and still fills the
    /// cache when it completes.
    pub async fn request_with_timeout(
        &self,
        format: &str,
        path: &str,
        timeout: Duration,
    ) -> Result<Arc<ResourceTemplate>, LoadError> {
        match tokio::time::timeout(timeout, self.request(format, path)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Stopped waiting for {format}:{path} after {timeout:?}");
                Err(LoadError::TimedOut {
                    path: path.to_string(),
                    waited: timeout,
                })
            }
        }
    }

    /// State of `(format, path)`, or `None` if absent.
    pub fn state(&self, format: &str, path: &str) -> Option<EntryState> {
        self.entries.state(&CacheKey::new(format, path))
    }

    /// Drops a ready entry and releases its template. Pending entries are
    /// not touched. Returns `true` if something was evicted.
    pub fn evict(&self, format: &str, path: &str) -> bool {
        let key = CacheKey::new(format, path);
        match self.entries.remove_ready(&key) {
            Some(template) => {
                template.release(&*self.device);
                log::debug!("Evicted {key}");
                true
            }
            None => false,
        }
    }

    /// Drops and releases every ready entry. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let templates = self.entries.drain_ready();
        for template in &templates {
            template.release(&*self.device);
        }
        log::info!("Cleared {} cached templates", templates.len());
        templates.len()
    }

    /// Clears the cache and disposes every loader. Idempotent. Decodes still
    /// in flight release their result when they finish.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.clear();
        self.registry.dispose_all();
        log::info!("Asset cache disposed");
    }

    /// Returns `true` once [`AssetCache::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of entries, pending or ready.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Request counters.
    pub fn stats(&self) -> LoadStats {
        self.entries.stats()
    }
}
