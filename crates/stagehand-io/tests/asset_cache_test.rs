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

use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use stagehand_core::asset::Asset;
use stagehand_core::math::Vec3;
use stagehand_core::resource::ResourceLedger;
use stagehand_io::decoders::ObjDecoder;
use stagehand_io::{
    AssetCache, CachedLoader, EntryState, FormatLoader, LoadError, LoaderConfig, MemorySource,
};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const CUBE_OBJ: &str = "\
o cube
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

fn obj_cache(
    latency: Duration,
) -> (
    AssetCache,
    Arc<MemorySource>,
    Arc<CachedLoader<ObjDecoder>>,
    Arc<ResourceLedger>,
) {
    let source = Arc::new(MemorySource::new().with_latency(latency));
    let ledger = Arc::new(ResourceLedger::new());
    let loader = Arc::new(CachedLoader::new(
        "obj",
        ObjDecoder,
        source.clone(),
        ledger.clone(),
    ));
    let cache = AssetCache::new(ledger.clone());
    cache.register_loader("obj", loader.clone());
    (cache, source, loader, ledger)
}

#[tokio::test]
async fn test_concurrent_requests_share_one_decode() -> Result<()> {
    // --- 1. Setup: a slow source so every request overlaps the first ---
    let (cache, source, _, _) = obj_cache(Duration::from_millis(50));
    source.insert("cube.obj", CUBE_OBJ);
    let cache = Arc::new(cache);

    // --- 2. Fire the requests ---
    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.request("obj", "cube.obj").await })
        })
        .collect();
    let mut templates = Vec::new();
    for task in tasks {
        templates.push(task.await??);
    }

    // --- 3. Assert: one read, one template ---
    assert_eq!(source.read_count("cube.obj"), 1);
    assert!(templates.iter().all(|t| Arc::ptr_eq(t, &templates[0])));
    assert_eq!(cache.state("obj", "cube.obj"), Some(EntryState::Ready));
    Ok(())
}

#[tokio::test]
async fn test_cold_load_clones_the_canonical_once() -> Result<()> {
    let (cache, source, loader, ledger) = obj_cache(Duration::ZERO);
    source.insert("cube.obj", CUBE_OBJ);

    let template = cache.request("obj", "cube.obj").await?;

    let canonical = loader.cached("cube.obj").expect("loader keeps the canonical decode");
    assert_eq!(canonical.clone_count(), 1);
    assert!(canonical
        .asset()
        .handles()
        .is_disjoint(&template.asset().handles()));
    assert!(template
        .asset()
        .handles()
        .iter()
        .all(|handle| ledger.is_live(*handle)));
    Ok(())
}

#[tokio::test]
async fn test_failed_decode_can_be_retried() -> Result<()> {
    let (cache, source, _, _) = obj_cache(Duration::ZERO);
    source.insert("cube.obj", "# no geometry yet\n");

    let first = cache.request("obj", "cube.obj").await;
    assert!(matches!(first, Err(LoadError::DecodeFailure { .. })));
    assert_eq!(cache.state("obj", "cube.obj"), None);

    source.insert("cube.obj", CUBE_OBJ);
    let second = cache.request("obj", "cube.obj").await?;

    assert!(second.asset().as_model().is_some());
    assert_eq!(source.read_count("cube.obj"), 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_file_reports_the_path() {
    let (cache, _, _, _) = obj_cache(Duration::ZERO);

    let result = cache.request("obj", "ghost.obj").await;

    match result {
        Err(LoadError::Source { path, .. }) => assert_eq!(path, "ghost.obj"),
        other => panic!("expected a source error, got {other:?}"),
    }
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_timeout_leaves_the_decode_running() -> Result<()> {
    let (cache, source, _, _) = obj_cache(Duration::from_millis(100));
    source.insert("cube.obj", CUBE_OBJ);

    let timed_out = cache
        .request_with_timeout("obj", "cube.obj", Duration::from_millis(5))
        .await;

    assert!(matches!(timed_out, Err(LoadError::TimedOut { .. })));
    assert_eq!(cache.state("obj", "cube.obj"), Some(EntryState::Pending));

    let template = cache.request("obj", "cube.obj").await?;
    assert!(template.asset().as_model().is_some());
    assert_eq!(source.read_count("cube.obj"), 1);
    Ok(())
}

#[tokio::test]
async fn test_clear_then_dispose_releases_everything() -> Result<()> {
    let (cache, source, loader, ledger) = obj_cache(Duration::ZERO);
    source.insert("cube.obj", CUBE_OBJ);
    cache.request("obj", "cube.obj").await?;

    assert_eq!(cache.clear(), 1);
    assert!(cache.is_empty());
    cache.dispose();

    assert!(loader.is_disposed());
    assert_eq!(ledger.live_count(), 0);
    assert_eq!(ledger.rejected_releases(), 0);
    Ok(())
}

#[tokio::test]
async fn test_default_loaders_read_from_disk() -> Result<()> {
    // --- 1. Setup: real files in a temporary asset root ---
    let dir = tempdir()?;
    let mut png = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([0, 128, 255, 255])))
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    std::fs::write(dir.path().join("albedo.png"), &png)?;
    std::fs::create_dir(dir.path().join("models"))?;
    std::fs::write(dir.path().join("models/cube.obj"), CUBE_OBJ)?;

    let config = LoaderConfig {
        asset_root: dir.path().to_path_buf(),
        ..LoaderConfig::default()
    };
    let ledger = Arc::new(ResourceLedger::new());
    let cache =
        AssetCache::with_default_loaders(Arc::new(config.file_source()), ledger.clone(), &config);

    // --- 2. Load ---
    let texture = cache.request("texture", "albedo.png").await?;
    let model = cache.request("obj", "models/cube.obj").await?;

    // --- 3. Assert ---
    match texture.asset() {
        Asset::Texture(texture) => assert_eq!(texture.data().width, 8),
        other => panic!("expected a texture, got {}", other.kind_name()),
    }
    assert_eq!(model.asset().as_model().map(|m| m.node_count()), Some(2));

    cache.dispose();
    assert_eq!(ledger.live_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_failures_share_one_outcome() -> Result<()> {
    // --- 1. Setup: a slow source holding an OBJ without geometry ---
    let (cache, source, _, _) = obj_cache(Duration::from_millis(50));
    source.insert("broken.obj", "# nothing to draw\n");
    let cache = Arc::new(cache);

    // --- 2. Fire the requests ---
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.request("obj", "broken.obj").await })
        })
        .collect();
    let mut errors = Vec::new();
    for task in tasks {
        match task.await? {
            Ok(_) => panic!("a geometry-less OBJ must not decode"),
            Err(e) => errors.push(e),
        }
    }

    // --- 3. Assert: one read, one shared failure, no entry left ---
    assert_eq!(source.read_count("broken.obj"), 1);
    assert!(matches!(errors[0], LoadError::DecodeFailure { .. }));
    assert!(errors.iter().all(|e| *e == errors[0]));
    assert_eq!(cache.state("obj", "broken.obj"), None);
    assert_eq!(cache.stats().failed, 1);
    Ok(())
}

#[tokio::test]
async fn test_mutating_a_copy_leaves_the_cached_template_alone() -> Result<()> {
    // --- 1. Setup ---
    let (cache, source, _, ledger) = obj_cache(Duration::ZERO);
    source.insert("cube.obj", CUBE_OBJ);
    let template = cache.request("obj", "cube.obj").await?;

    // --- 2. Take a copy and move it around ---
    let mut copy = match template.instantiate(&*ledger)? {
        Asset::Model(node) => node,
        other => panic!("expected a model, got {}", other.kind_name()),
    };
    copy.transform.position = Vec3::new(9.0, 9.0, 9.0);
    copy.name = "moved".to_string();
    for child in copy.children_mut() {
        child.transform.scale = Vec3::new(3.0, 3.0, 3.0);
        child.visible = false;
    }

    // --- 3. Assert: a fresh request still sees the decoded state ---
    let again = cache.request("obj", "cube.obj").await?;
    assert!(Arc::ptr_eq(&template, &again));
    let cached = again.asset().as_model().expect("cached model");
    assert_eq!(cached.transform.position, Vec3::ZERO);
    assert_ne!(cached.name, "moved");
    for child in cached.children() {
        assert_eq!(child.transform.scale, Vec3::ONE);
        assert!(child.visible);
    }

    let second = match again.instantiate(&*ledger)? {
        Asset::Model(node) => node,
        other => panic!("expected a model, got {}", other.kind_name()),
    };
    assert_eq!(second.transform.position, Vec3::ZERO);
    Ok(())
}
