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

// Stagehand stage viewer
// Loads a config (or builds a default one), runs a few frames per stage and
// tears everything down, logging what the renderer would receive.

use anyhow::Result;
use stagehand_core::params::{ParamSet, ParamValue};
use stagehand_core::resource::{Disposable, RenderDevice, ResourceLedger};
use stagehand_io::{AssetCache, AssetSource, MemorySource};
use stagehand_stage::{
    AddOptions, RenderSubmitter, RenderView, StageConfig, StageCoordinator, StagehandConfig,
};
use std::sync::Arc;

const FRAMES_PER_STAGE: usize = 3;

const PYRAMID_OBJ: &str = "\
o pyramid
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
v 0 1.5 0
f 1 2 3 4
f 1 2 5
f 2 3 5
f 3 4 5
f 4 1 5
";

/// Logs each submitted frame instead of drawing it.
struct LogSubmitter {
    frames: usize,
}

impl RenderSubmitter for LogSubmitter {
    fn submit(&mut self, view: RenderView<'_>) {
        self.frames += 1;
        log::info!(
            "frame {} | stage '{}' | {} objects | {} lights | camera at {:?} | environment {}",
            self.frames,
            view.stage,
            view.scene.len(),
            view.lighting.len() + view.environment_lights.map_or(0, |_| 2),
            view.camera.position,
            view.environment.map_or("none", |map| map.label()),
        );
    }
}

fn default_config() -> StagehandConfig {
    let mut config = StagehandConfig::default();
    config.stages.insert(
        "showroom".to_string(),
        StageConfig::default().with_controls("auto_orbit"),
    );
    config.stages.insert(
        "gallery".to_string(),
        StageConfig::default()
            .with_environment_preset("pointe_sunset_03")
            .with_camera("wide_shot"),
    );
    config.active_stage = Some("showroom".to_string());
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    // --- Configuration: a RON file from argv, or the built-in walkthrough ---
    let (config, source): (StagehandConfig, Arc<dyn AssetSource>) =
        match std::env::args().nth(1) {
            Some(path) => {
                let config = StagehandConfig::load(&path)?;
                let source: Arc<dyn AssetSource> = Arc::new(config.loaders.file_source());
                (config, source)
            }
            None => {
                let memory = MemorySource::new();
                memory.insert("models/pyramid.obj", PYRAMID_OBJ);
                let source: Arc<dyn AssetSource> = Arc::new(memory);
                (default_config(), source)
            }
        };

    let ledger = Arc::new(ResourceLedger::new());
    let device: Arc<dyn RenderDevice> = ledger.clone();
    let cache = Arc::new(AssetCache::with_default_loaders(
        source,
        device,
        &config.loaders,
    ));
    log::info!("Registered formats: {}", cache.formats().join(", "));

    // --- Stages ---
    let mut stages = StageCoordinator::from_config(Arc::clone(&cache), &config)?;
    stages.set_submitter(Box::new(LogSubmitter { frames: 0 }));
    let names: Vec<String> = stages.stage_names().iter().map(|s| s.to_string()).collect();

    for name in &names {
        stages.prepare_environment(name).await?;
        if let Some(map) = stages.stage(name).and_then(|s| s.environment().current()) {
            if let Some(reason) = map.fallback_reason() {
                log::warn!("Stage '{name}' uses the procedural sky: {reason}");
            }
        }

        let key = ParamSet::new().with("intensity", ParamValue::Float(2.5));
        if let Some(stage) = stages.stage_mut(name) {
            let (environment, scene) = stage.environment_and_scene_mut();
            environment.update_parameters(1.2, 0.25, 1.1, scene);
            stage.lighting_mut().add_light("key", "directional", &key)?;
            stage.lighting_mut().add_light("fill", "ambient", &ParamSet::new())?;
        }

        match stages
            .load_into(name, "obj", "models/pyramid.obj", AddOptions::default())
            .await
        {
            Ok(id) => log::info!("Loaded pyramid into '{name}' as {id:?}"),
            Err(e) => log::warn!("Could not load the pyramid into '{name}': {e}"),
        }

        let plinth = stages.components().instantiate("box", "physical")?;
        if let Some(scene) = stages.scene_mut(name) {
            scene.add(plinth, AddOptions::default().tagged("plinth"));
        }
    }

    // --- Frames ---
    stages.resize(1920, 1080);
    for name in &names {
        stages.set_active_stage(name);
        for _ in 0..FRAMES_PER_STAGE {
            stages.update(1.0 / 60.0);
        }
    }

    // --- Teardown ---
    stages.dispose();
    cache.dispose();
    log::info!(
        "Shutdown complete: {} allocations, {} still live",
        ledger.allocation_count(),
        ledger.live_count()
    );
    Ok(())
}
