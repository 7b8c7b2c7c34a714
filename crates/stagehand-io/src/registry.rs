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

//! Format tag to loader mapping.

use crate::loader::FormatLoader;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Maps format tags (`"gltf"`, `"rgbe"`, ...) to loaders.
///
/// The registry owns its loaders: replacing a tag disposes the loader that
/// was registered under it, and [`LoaderRegistry::dispose_all`] disposes
/// everything.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: RwLock<AHashMap<String, Arc<dyn FormatLoader>>>,
}

impl LoaderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `loader` under `tag`. Returns `true` if a previous loader
    /// was replaced (and disposed).
    pub fn register(&self, tag: &str, loader: Arc<dyn FormatLoader>) -> bool {
        let previous = self.loaders.write().insert(tag.to_string(), loader);
        match previous {
            Some(old) => {
                log::info!("Replacing loader for format '{tag}'");
                old.dispose();
                true
            }
            None => {
                log::debug!("Registered loader for format '{tag}'");
                false
            }
        }
    }

    /// The loader registered under `tag`.
    pub fn get(&self, tag: &str) -> Option<Arc<dyn FormatLoader>> {
        self.loaders.read().get(tag).cloned()
    }

    /// Returns `true` if `tag` has a loader.
    pub fn contains(&self, tag: &str) -> bool {
        self.loaders.read().contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn formats(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.loaders.read().keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Number of registered loaders.
    pub fn len(&self) -> usize {
        self.loaders.read().len()
    }

    /// Returns `true` if no loader is registered.
    pub fn is_empty(&self) -> bool {
        self.loaders.read().is_empty()
    }

    /// Disposes and unregisters every loader.
    pub fn dispose_all(&self) {
        let loaders: Vec<_> = self.loaders.write().drain().collect();
        for (tag, loader) in loaders {
            log::debug!("Disposing loader for format '{tag}'");
            loader.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::CountingDecoder;
    use crate::loader::CachedLoader;
    use crate::source::MemorySource;
    use stagehand_core::resource::ResourceLedger;

    fn counting_loader(tag: &str) -> Arc<dyn FormatLoader> {
        Arc::new(CachedLoader::new(
            tag,
            CountingDecoder::default(),
            Arc::new(MemorySource::new()),
            Arc::new(ResourceLedger::new()),
        ))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = LoaderRegistry::new();
        assert!(!registry.register("splat", counting_loader("splat")));
        assert!(!registry.register("gltf", counting_loader("gltf")));

        assert_eq!(registry.formats(), vec!["gltf", "splat"]);
        assert_eq!(registry.get("gltf").unwrap().format(), "gltf");
        assert!(registry.get("fbx").is_none());
    }

    #[test]
    fn test_replacing_disposes_previous_loader() {
        let registry = LoaderRegistry::new();
        let first = counting_loader("gltf");
        registry.register("gltf", Arc::clone(&first));

        assert!(registry.register("gltf", counting_loader("gltf")));

        assert!(first.is_disposed());
        assert!(!registry.get("gltf").unwrap().is_disposed());
    }

    #[test]
    fn test_dispose_all_empties_registry() {
        let registry = LoaderRegistry::new();
        let loader = counting_loader("obj");
        registry.register("obj", Arc::clone(&loader));

        registry.dispose_all();

        assert!(registry.is_empty());
        assert!(loader.is_disposed());
    }
}
