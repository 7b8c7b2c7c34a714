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

//! The per-format loader contract and its caching implementation.

use crate::decoders::Decoder;
use crate::error::LoadError;
use crate::inflight::{InFlightMap, LoadStats};
use crate::source::AssetSource;
use async_trait::async_trait;
use stagehand_core::asset::ResourceTemplate;
use stagehand_core::resource::RenderDevice;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decodes one file format.
///
/// Every successful [`FormatLoader::decode`] returns a template the caller
/// owns outright: its GPU handles are not shared with the loader or with any
/// other caller. Loaders may cache internally, but must never hand out their
/// cached value itself.
#[async_trait]
pub trait FormatLoader: Send + Sync {
    /// The format tag this loader is registered under.
    fn format(&self) -> &str;

    /// Produces a template for `path`.
    async fn decode(&self, path: &str) -> Result<ResourceTemplate, LoadError>;

    /// Releases every cached template and native decoder state. Idempotent.
    /// Later calls to [`FormatLoader::decode`] fail with
    /// [`LoadError::LoaderDisposed`].
    fn dispose(&self);

    /// Returns `true` once [`FormatLoader::dispose`] has run.
    fn is_disposed(&self) -> bool;
}

/// A [`FormatLoader`] built from a [`Decoder`].
///
/// Keeps the canonical decoded template of each path in a local pending/ready
/// cache, so a path is read and decoded once even under concurrent requests,
/// and hands each caller a fresh copy of it.
pub struct CachedLoader<D: Decoder> {
    inner: Arc<LoaderInner<D>>,
}

struct LoaderInner<D> {
    format: String,
    decoder: D,
    source: Arc<dyn AssetSource>,
    device: Arc<dyn RenderDevice>,
    cache: Arc<InFlightMap<String, Arc<ResourceTemplate>>>,
    disposed: AtomicBool,
}

impl<D: Decoder> CachedLoader<D> {
    /// Creates a loader for `format`, reading bytes from `source` and
    /// allocating from `device`.
    pub fn new(
        format: impl Into<String>,
        decoder: D,
        source: Arc<dyn AssetSource>,
        device: Arc<dyn RenderDevice>,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                format: format.into(),
                decoder,
                source,
                device,
                cache: Arc::new(InFlightMap::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// The canonical template cached for `path`, if decoded.
    pub fn cached(&self, path: &str) -> Option<Arc<ResourceTemplate>> {
        self.inner.cache.peek(&path.to_string())
    }

    /// Number of paths cached or in flight.
    pub fn cached_count(&self) -> usize {
        self.inner.cache.len()
    }

    /// Request counters of the local cache.
    pub fn stats(&self) -> LoadStats {
        self.inner.cache.stats()
    }

    fn disposed_error(&self) -> LoadError {
        LoadError::LoaderDisposed {
            format: self.inner.format.clone(),
        }
    }
}

impl<D: Decoder> LoaderInner<D> {
    async fn decode_uncached(
        self: Arc<Self>,
        path: String,
    ) -> Result<Arc<ResourceTemplate>, LoadError> {
        let bytes = self.source.read(&path).await?;

        let worker = Arc::clone(&self);
        let label = path.clone();
        let asset = tokio::task::spawn_blocking(move || {
            worker.decoder.decode(&label, &bytes, &*worker.device)
        })
        .await
        .map_err(|e| LoadError::decode(&path, format!("decoder panicked: {e}")))??;

        let template = Arc::new(ResourceTemplate::new(path.as_str(), asset));
        if self.disposed.load(Ordering::Acquire) {
            template.release(&*self.device);
            return Err(LoadError::LoaderDisposed {
                format: self.format.clone(),
            });
        }
        log::info!(
            "Decoded '{}' with the {} loader ({})",
            path,
            self.format,
            template.asset().kind_name()
        );
        Ok(template)
    }
}

#[async_trait]
impl<D: Decoder> FormatLoader for CachedLoader<D> {
    fn format(&self) -> &str {
        &self.inner.format
    }

    async fn decode(&self, path: &str) -> Result<ResourceTemplate, LoadError> {
        if self.is_disposed() {
            return Err(self.disposed_error());
        }
        let canonical = self
            .inner
            .cache
            .get_or_load(path.to_string(), || {
                let inner = Arc::clone(&self.inner);
                let path = path.to_string();
                Ok(inner.decode_uncached(path))
            })
            .await?;

        if self.is_disposed() {
            // The decode finished after dispose drained the cache.
            if let Some(late) = self.inner.cache.remove_ready(&path.to_string()) {
                late.release(&*self.inner.device);
            }
            return Err(self.disposed_error());
        }
        let copy = canonical.instantiate(&*self.inner.device)?;
        Ok(ResourceTemplate::new(canonical.label(), copy))
    }

    fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let templates = self.inner.cache.drain_ready();
        for template in &templates {
            template.release(&*self.inner.device);
        }
        self.inner.decoder.release();
        log::info!(
            "Disposed the {} loader, released {} cached templates",
            self.inner.format,
            templates.len()
        );
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::source::MemorySource;
    use stagehand_core::asset::Asset;
    use stagehand_core::resource::ResourceLedger;
    use stagehand_core::scene::{Geometry, GeometryShape, Material, MaterialParams, SceneNode};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Decodes any non-empty bytes into a one-mesh model and counts calls.
    #[derive(Default)]
    pub(crate) struct CountingDecoder {
        pub(crate) calls: Arc<AtomicUsize>,
        pub(crate) released: Arc<AtomicBool>,
    }

    impl Decoder for CountingDecoder {
        fn decode(
            &self,
            path: &str,
            bytes: &[u8],
            device: &dyn RenderDevice,
        ) -> Result<Asset, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if bytes.starts_with(b"bad") {
                return Err(LoadError::decode(path, "corrupt"));
            }
            let geometry = Arc::new(Geometry::new(device, path, GeometryShape::unit_box()));
            let material = Arc::new(Material::new(device, path, MaterialParams::standard()));
            Ok(Asset::Model(SceneNode::with_mesh(path, geometry, material)))
        }

        fn release(&self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn loader(
        source: Arc<MemorySource>,
        ledger: Arc<ResourceLedger>,
    ) -> (CachedLoader<CountingDecoder>, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let decoder = CountingDecoder::default();
        let (calls, released) = (decoder.calls.clone(), decoder.released.clone());
        (CachedLoader::new("model", decoder, source, ledger), calls, released)
    }

    #[tokio::test]
    async fn test_each_call_gets_an_independent_copy() {
        // ARRANGE
        let source = Arc::new(MemorySource::new());
        source.insert("chair.glb", b"ok".to_vec());
        let ledger = Arc::new(ResourceLedger::new());
        let (loader, calls, _) = loader(source.clone(), ledger.clone());

        // ACT
        let first = loader.decode("chair.glb").await.unwrap();
        let second = loader.decode("chair.glb").await.unwrap();

        // ASSERT
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.read_count("chair.glb"), 1);
        assert_eq!(first.clone_count(), 0);
        assert!(first.asset().handles().is_disjoint(&second.asset().handles()));
        let canonical = loader.cached("chair.glb").unwrap();
        assert_eq!(canonical.clone_count(), 2);
        assert!(canonical
            .asset()
            .handles()
            .is_disjoint(&first.asset().handles()));
    }

    #[tokio::test]
    async fn test_releasing_one_copy_leaves_the_other_live() {
        let source = Arc::new(MemorySource::new());
        source.insert("chair.glb", b"ok".to_vec());
        let ledger = Arc::new(ResourceLedger::new());
        let (loader, _, _) = loader(source, ledger.clone());

        let first = loader.decode("chair.glb").await.unwrap();
        let second = loader.decode("chair.glb").await.unwrap();
        first.release(&*ledger);

        assert!(second
            .asset()
            .handles()
            .iter()
            .all(|handle| ledger.is_live(*handle)));
    }

    #[tokio::test]
    async fn test_concurrent_decodes_read_once() {
        let source = Arc::new(MemorySource::new().with_latency(Duration::from_millis(20)));
        source.insert("tree.obj", b"ok".to_vec());
        let ledger = Arc::new(ResourceLedger::new());
        let (loader, calls, _) = loader(source.clone(), ledger);
        let loader = Arc::new(loader);

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let loader = loader.clone();
                tokio::spawn(async move { loader.decode("tree.obj").await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.read_count("tree.obj"), 1);
    }

    #[tokio::test]
    async fn test_failed_decode_is_not_cached() {
        let source = Arc::new(MemorySource::new());
        source.insert("crate.glb", b"bad".to_vec());
        let ledger = Arc::new(ResourceLedger::new());
        let (loader, calls, _) = loader(source.clone(), ledger);

        assert!(matches!(
            loader.decode("crate.glb").await,
            Err(LoadError::DecodeFailure { .. })
        ));
        source.insert("crate.glb", b"ok".to_vec());
        assert!(loader.decode("crate.glb").await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dispose_releases_cache_and_blocks_reuse() {
        let source = Arc::new(MemorySource::new());
        source.insert("chair.glb", b"ok".to_vec());
        let ledger = Arc::new(ResourceLedger::new());
        let (loader, _, released) = loader(source, ledger.clone());

        let copy = loader.decode("chair.glb").await.unwrap();
        let canonical = loader.cached("chair.glb").unwrap();
        loader.dispose();
        loader.dispose();

        assert!(loader.is_disposed());
        assert!(released.load(Ordering::SeqCst));
        assert!(canonical.is_released());
        // The caller's copy is still theirs.
        assert!(copy.asset().handles().iter().all(|h| ledger.is_live(*h)));
        assert_eq!(ledger.rejected_releases(), 0);
        assert!(matches!(
            loader.decode("chair.glb").await,
            Err(LoadError::LoaderDisposed { .. })
        ));
    }
}
