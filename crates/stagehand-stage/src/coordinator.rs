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

//! The top-level stage orchestrator.

use crate::camera::{Camera, CameraManager, CameraRig};
use crate::components::ComponentRegistry;
use crate::config::{EnvironmentOptions, SceneSettings, StageConfig, StagehandConfig};
use crate::environment::{EnvironmentBuilder, EnvironmentLights, EnvironmentMap};
use crate::error::StageError;
use crate::lighting::LightingRig;
use crate::scene::{AddOptions, SceneContainer};
use stagehand_core::resource::{Disposable, ReleaseSet, RenderDevice};
use stagehand_core::scene::{NodeId, SceneNode};
use stagehand_io::AssetCache;
use std::fmt;
use std::sync::Arc;

/// Identifies a stage within its coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(u64);

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage#{}", self.0)
    }
}

/// What the renderer receives each frame.
#[derive(Clone, Copy)]
pub struct RenderView<'a> {
    /// Name of the active stage.
    pub stage: &'a str,
    /// The scene to draw.
    pub scene: &'a SceneContainer,
    /// The camera to draw it from.
    pub camera: &'a Camera,
    /// The stage's lights.
    pub lighting: &'a LightingRig,
    /// The installed environment map.
    pub environment: Option<&'a EnvironmentMap>,
    /// The environment's sun and ambient lights, when they contribute.
    pub environment_lights: Option<&'a EnvironmentLights>,
}

/// The render boundary: receives the active stage once per update.
pub trait RenderSubmitter: Send {
    /// Draws one frame.
    fn submit(&mut self, view: RenderView<'_>);
}

/// A scene with its camera, environment and lighting.
pub struct Stage {
    id: StageId,
    name: String,
    config: StageConfig,
    scene: SceneContainer,
    camera: CameraRig,
    environment: EnvironmentBuilder,
    lighting: LightingRig,
}

impl Stage {
    /// The stage's id.
    pub fn id(&self) -> StageId {
        self.id
    }

    /// The stage's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The options the stage was created with.
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// The scene.
    pub fn scene(&self) -> &SceneContainer {
        &self.scene
    }

    /// Mutable scene.
    pub fn scene_mut(&mut self) -> &mut SceneContainer {
        &mut self.scene
    }

    /// Camera and controls.
    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    /// Mutable camera and controls.
    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    /// The environment builder.
    pub fn environment(&self) -> &EnvironmentBuilder {
        &self.environment
    }

    /// The lights.
    pub fn lighting(&self) -> &LightingRig {
        &self.lighting
    }

    /// Mutable lights.
    pub fn lighting_mut(&mut self) -> &mut LightingRig {
        &mut self.lighting
    }

    /// Environment builder and scene together, for calls that need both.
    pub fn environment_and_scene_mut(&mut self) -> (&mut EnvironmentBuilder, &mut SceneContainer) {
        (&mut self.environment, &mut self.scene)
    }

    fn update(&mut self, dt: f32) {
        self.camera.update(dt);
        self.lighting.update();
    }

    fn view(&self) -> RenderView<'_> {
        RenderView {
            stage: &self.name,
            scene: &self.scene,
            camera: &self.camera.camera,
            lighting: &self.lighting,
            environment: self.environment.current(),
            environment_lights: self.environment.lights().filter(|l| l.active),
        }
    }
}

/// Creates stages, picks the active one and tears everything down in order.
///
/// The coordinator owns its stages, the [`ComponentRegistry`] and the
/// [`CameraManager`] they share. The [`AssetCache`] is injected and stays
/// with its owner: disposing the coordinator does not dispose the cache.
///
/// ```no_run
/// use stagehand_core::resource::ResourceLedger;
/// use stagehand_io::{AssetCache, LoaderConfig};
/// use stagehand_stage::{StageConfig, StageCoordinator};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), stagehand_stage::StageError> {
/// let config = LoaderConfig::default();
/// let cache = Arc::new(AssetCache::with_default_loaders(
///     Arc::new(config.file_source()),
///     Arc::new(ResourceLedger::new()),
///     &config,
/// ));
/// let mut stages = StageCoordinator::new(cache);
/// stages.create_stage("showroom", StageConfig::default().with_environment("studio.hdr"))?;
/// stages.prepare_environment("showroom").await?;
/// stages.set_active_stage("showroom");
/// stages.update(1.0 / 60.0);
/// # Ok(())
/// # }
/// ```
pub struct StageCoordinator {
    cache: Arc<AssetCache>,
    device: Arc<dyn RenderDevice>,
    cameras: CameraManager,
    components: ComponentRegistry,
    scene_settings: SceneSettings,
    environment_options: EnvironmentOptions,
    stages: Vec<Stage>,
    active: Option<String>,
    submitter: Option<Box<dyn RenderSubmitter>>,
    next_id: u64,
    disposed: bool,
}

impl StageCoordinator {
    /// A coordinator with default settings and the stock components.
    pub fn new(cache: Arc<AssetCache>) -> Self {
        let device = Arc::clone(cache.device());
        let aspect = crate::config::Viewport::default().aspect();
        Self {
            components: ComponentRegistry::with_defaults(Arc::clone(&device)),
            cache,
            device,
            cameras: CameraManager::new(aspect),
            scene_settings: SceneSettings::default(),
            environment_options: EnvironmentOptions::default(),
            stages: Vec::new(),
            active: None,
            submitter: None,
            next_id: 1,
            disposed: false,
        }
    }

    /// A coordinator configured from `config`, with its startup stages
    /// created and the requested one activated.
    pub fn from_config(cache: Arc<AssetCache>, config: &StagehandConfig) -> Result<Self, StageError> {
        let mut coordinator = Self::new(cache);
        coordinator.scene_settings = config.scene.clone();
        coordinator.environment_options = config.environment.clone();
        coordinator.cameras = CameraManager::new(config.viewport.aspect());
        for (name, stage) in &config.stages {
            coordinator.create_stage(name, stage.clone())?;
        }
        if let Some(active) = &config.active_stage {
            coordinator.set_active_stage(active);
        }
        Ok(coordinator)
    }

    /// Installs the render boundary.
    pub fn set_submitter(&mut self, submitter: Box<dyn RenderSubmitter>) {
        self.submitter = Some(submitter);
    }

    /// Creates a stage and returns its id, which resolves to the stage's
    /// scene through [`StageCoordinator::scene_of`]. Names must be unique;
    /// stages coexist until disposed.
    pub fn create_stage(&mut self, name: &str, config: StageConfig) -> Result<StageId, StageError> {
        if self.disposed {
            return Err(StageError::Disposed);
        }
        if self.stage(name).is_some() {
            return Err(StageError::DuplicateStage {
                name: name.to_string(),
            });
        }
        let id = StageId(self.next_id);
        self.next_id += 1;

        let stage = Stage {
            id,
            name: name.to_string(),
            scene: SceneContainer::new(name, Arc::clone(&self.device), self.scene_settings.clone()),
            camera: self.cameras.create_rig(&config.camera, &config.controls),
            environment: EnvironmentBuilder::new(
                Arc::clone(&self.cache),
                config.environment_options(&self.environment_options),
            ),
            lighting: LightingRig::new(Arc::clone(&self.device)),
            config,
        };
        log::info!("Created stage '{name}' ({id})");
        self.stages.push(stage);
        Ok(id)
    }

    /// Makes `name` the stage that receives updates. Unknown names are
    /// ignored and the current stage stays active. Returns whether the
    /// switch happened.
    pub fn set_active_stage(&mut self, name: &str) -> bool {
        if self.stage(name).is_none() {
            log::warn!("Ignoring switch to unknown stage '{name}'");
            return false;
        }
        log::debug!("Active stage is now '{name}'");
        self.active = Some(name.to_string());
        true
    }

    /// The active stage.
    pub fn active_stage(&self) -> Option<&Stage> {
        self.stage(self.active.as_deref()?)
    }

    /// Name of the active stage.
    pub fn active_stage_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Advances the active stage's controls and lights, then submits it for
    /// rendering. Inactive stages are left untouched.
    pub fn update(&mut self, dt: f32) {
        let Some(active) = self.active.as_deref() else {
            return;
        };
        let Some(stage) = self.stages.iter_mut().find(|s| s.name == active) else {
            return;
        };
        stage.update(dt);
        if let Some(submitter) = self.submitter.as_mut() {
            submitter.submit(stage.view());
        }
    }

    /// Applies a new viewport size to every stage camera and to future
    /// stages.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.cameras.set_viewport(width, height);
        for stage in &mut self.stages {
            stage.camera.camera.set_viewport(width, height);
        }
        log::debug!("Resized to {width}x{height}");
    }

    /// Adds `node` to the active stage's scene. Without an active stage the
    /// node is released and `None` is returned.
    pub fn add_to_stage(&mut self, node: SceneNode, options: AddOptions) -> Option<NodeId> {
        let index = self
            .active
            .as_deref()
            .and_then(|name| self.stage_index(name).ok());
        match index {
            Some(index) => Some(self.stages[index].scene.add(node, options)),
            None => {
                log::warn!("No active stage, releasing '{}'", node.name);
                ReleaseSet::new(&*self.device).release_node(&node);
                None
            }
        }
    }

    /// Requests `(format, path)` from the cache and adds a copy to the stage
    /// `name`.
    pub async fn load_into(
        &mut self,
        name: &str,
        format: &str,
        path: &str,
        options: AddOptions,
    ) -> Result<NodeId, StageError> {
        self.stage_index(name)?;
        let template = self.cache.request(format, path).await?;
        let index = self.stage_index(name)?;
        self.stages[index].scene.add_template(&template, options)
    }

    /// Bakes the stage's configured environment or preset image (falling
    /// back to the procedural map) and installs it.
    pub async fn prepare_environment(&mut self, name: &str) -> Result<(), StageError> {
        let index = self.stage_index(name)?;
        let stage = &mut self.stages[index];
        let map = stage.environment.bake(stage.config.environment_path()).await;
        stage.environment.install(map, &mut stage.scene);
        Ok(())
    }

    /// Tears down one stage: lighting, environment, then scene. The shared
    /// components are kept. Returns `false` if there is no such stage.
    pub fn dispose_stage(&mut self, name: &str) -> bool {
        let Ok(index) = self.stage_index(name) else {
            return false;
        };
        let mut stage = self.stages.remove(index);
        stage.lighting.dispose();
        stage.environment.dispose();
        stage.scene.dispose();
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        log::info!("Disposed stage '{name}'");
        true
    }

    /// The stage called `name`.
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Mutable access to the stage called `name`.
    pub fn stage_mut(&mut self, name: &str) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|s| s.name == name)
    }

    /// The scene of stage `name`.
    pub fn scene(&self, name: &str) -> Option<&SceneContainer> {
        self.stage(name).map(Stage::scene)
    }

    /// Mutable scene of stage `name`.
    pub fn scene_mut(&mut self, name: &str) -> Option<&mut SceneContainer> {
        self.stage_mut(name).map(Stage::scene_mut)
    }

    /// The scene of the stage created as `id`.
    pub fn scene_of(&self, id: StageId) -> Option<&SceneContainer> {
        self.stages.iter().find(|s| s.id == id).map(Stage::scene)
    }

    /// Mutable scene of the stage created as `id`.
    pub fn scene_of_mut(&mut self, id: StageId) -> Option<&mut SceneContainer> {
        self.stages.iter_mut().find(|s| s.id == id).map(Stage::scene_mut)
    }

    /// Stage names in creation order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// The shared component registry.
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Mutable shared component registry.
    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    /// The shared camera manager.
    pub fn cameras(&self) -> &CameraManager {
        &self.cameras
    }

    /// The injected asset cache.
    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    fn stage_index(&self, name: &str) -> Result<usize, StageError> {
        self.stages
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| StageError::UnknownStage {
                name: name.to_string(),
            })
    }
}

impl Disposable for StageCoordinator {
    /// Disposes lighting, then environments, then components, then scenes,
    /// so aggregates let go of resources before the resources are freed.
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for stage in &mut self.stages {
            stage.lighting.dispose();
        }
        for stage in &mut self.stages {
            stage.environment.dispose();
        }
        self.components.dispose();
        for stage in &mut self.stages {
            stage.scene.dispose();
        }
        log::info!("Disposed {} stages", self.stages.len());
        self.stages.clear();
        self.active = None;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::params::ParamSet;
    use stagehand_core::resource::{ResourceKind, ResourceLedger};
    use stagehand_io::{LoadError, LoaderConfig, MemorySource};
    use std::sync::Mutex;

    fn coordinator() -> (StageCoordinator, Arc<MemorySource>, Arc<ResourceLedger>) {
        let source = Arc::new(MemorySource::new());
        let ledger = Arc::new(ResourceLedger::new());
        let cache = AssetCache::with_default_loaders(
            source.clone(),
            ledger.clone(),
            &LoaderConfig::default(),
        );
        (StageCoordinator::new(Arc::new(cache)), source, ledger)
    }

    #[derive(Clone, Default)]
    struct RecordingSubmitter {
        frames: Arc<Mutex<Vec<String>>>,
    }

    impl RenderSubmitter for RecordingSubmitter {
        fn submit(&mut self, view: RenderView<'_>) {
            self.frames.lock().unwrap().push(view.stage.to_string());
        }
    }

    #[test]
    fn test_create_stage_rejects_duplicates() {
        let (mut stages, _, _) = coordinator();

        let first = stages.create_stage("lobby", StageConfig::default()).unwrap();
        let second = stages.create_stage("garden", StageConfig::default()).unwrap();

        assert_ne!(first, second);
        assert!(matches!(
            stages.create_stage("lobby", StageConfig::default()),
            Err(StageError::DuplicateStage { .. })
        ));
        assert_eq!(stages.stage_names(), vec!["lobby", "garden"]);
        assert!(stages.active_stage().is_none());
    }

    #[test]
    fn test_stage_id_resolves_to_its_scene() {
        let (mut stages, _, _) = coordinator();
        let lobby = stages.create_stage("lobby", StageConfig::default()).unwrap();
        let garden = stages.create_stage("garden", StageConfig::default()).unwrap();

        let node = stages.components().instantiate("plane", "basic").unwrap();
        let id = stages
            .scene_of_mut(garden)
            .unwrap()
            .add(node, AddOptions::default());

        assert_eq!(stages.scene_of(lobby).unwrap().name(), "lobby");
        assert!(stages.scene_of(garden).unwrap().contains(id));
        assert!(stages.scene("lobby").unwrap().is_empty());
        stages.dispose_stage("garden");
        assert!(stages.scene_of(garden).is_none());
    }

    #[test]
    fn test_unknown_stage_leaves_active_stage_alone() {
        let (mut stages, _, _) = coordinator();
        stages.create_stage("lobby", StageConfig::default()).unwrap();
        assert!(stages.set_active_stage("lobby"));

        assert!(!stages.set_active_stage("attic"));

        assert_eq!(stages.active_stage_name(), Some("lobby"));
    }

    #[test]
    fn test_update_only_submits_the_active_stage() {
        // ARRANGE
        let (mut stages, _, _) = coordinator();
        let submitter = RecordingSubmitter::default();
        stages.set_submitter(Box::new(submitter.clone()));
        stages
            .create_stage("lobby", StageConfig::default().with_controls("auto_orbit"))
            .unwrap();
        stages
            .create_stage("garden", StageConfig::default().with_controls("auto_orbit"))
            .unwrap();

        // ACT
        stages.update(0.1);
        stages.set_active_stage("garden");
        stages.update(0.1);
        stages.update(0.1);

        // ASSERT
        assert_eq!(*submitter.frames.lock().unwrap(), vec!["garden", "garden"]);
        let lobby = stages.stage("lobby").unwrap().camera();
        let garden = stages.stage("garden").unwrap().camera();
        assert_eq!(lobby.controls.as_ref().unwrap().azimuth(), 0.0);
        assert_ne!(garden.controls.as_ref().unwrap().azimuth(), 0.0);
    }

    #[test]
    fn test_resize_updates_every_camera() {
        let (mut stages, _, _) = coordinator();
        stages.create_stage("lobby", StageConfig::default()).unwrap();

        stages.resize(800, 400);
        stages.create_stage("garden", StageConfig::default()).unwrap();

        for name in ["lobby", "garden"] {
            let camera = &stages.stage(name).unwrap().camera().camera;
            assert_eq!(camera.aspect, 2.0);
        }
    }

    #[test]
    fn test_add_without_active_stage_releases_the_node() {
        let (mut stages, _, ledger) = coordinator();
        stages.create_stage("lobby", StageConfig::default()).unwrap();
        let before = ledger.live_count();
        let node = stages.components().instantiate("box", "standard").unwrap();

        assert!(stages.add_to_stage(node, AddOptions::default()).is_none());

        assert_eq!(ledger.live_count(), before);
    }

    #[tokio::test]
    async fn test_load_into_unknown_stage_fails() {
        let (mut stages, _, _) = coordinator();

        let result = stages
            .load_into("attic", "obj", "chair.obj", AddOptions::default())
            .await;

        assert!(matches!(result, Err(StageError::UnknownStage { .. })));
    }

    #[tokio::test]
    async fn test_prepare_environment_installs_a_fallback() {
        let (mut stages, _, ledger) = coordinator();
        stages
            .create_stage("lobby", StageConfig::default().with_environment("missing.hdr"))
            .unwrap();

        stages.prepare_environment("lobby").await.unwrap();

        let stage = stages.stage("lobby").unwrap();
        let map = stage.environment().current().unwrap();
        assert!(map.is_procedural());
        assert!(map.fallback_reason().is_some());
        assert_eq!(stage.scene().environment().unwrap().map, map.handle());
        assert_eq!(ledger.live_of(ResourceKind::Generator), 0);
    }

    #[tokio::test]
    async fn test_environment_preset_configures_the_stage() {
        // ARRANGE
        let (mut stages, _, _) = coordinator();
        stages
            .create_stage("night", StageConfig::default().with_environment_preset("neo_tokyo"))
            .unwrap();

        // ACT
        stages.prepare_environment("night").await.unwrap();

        // ASSERT
        let stage = stages.stage("night").unwrap();
        let map = stage.environment().current().unwrap();
        // The preset image is not in the source, so the settings land on
        // the fallback.
        assert!(matches!(map.fallback_reason(), Some(LoadError::Source { .. })));
        assert_eq!(map.intensity, 1.2);
        assert_eq!(map.blur, 0.15);
        let lights = stage.environment().lights().unwrap();
        assert!(lights.active);
        assert_eq!(lights.sun.light.intensity, 0.3);
        assert_eq!(lights.ambient.light.intensity, 1.0);
    }

    #[test]
    fn test_dispose_stage_keeps_shared_components() {
        let (mut stages, _, ledger) = coordinator();
        stages.create_stage("lobby", StageConfig::default()).unwrap();
        stages.set_active_stage("lobby");
        stages
            .stage_mut("lobby")
            .unwrap()
            .lighting_mut()
            .add_light("key", "point", &ParamSet::new())
            .unwrap();

        assert!(stages.dispose_stage("lobby"));
        assert!(!stages.dispose_stage("lobby"));

        assert!(stages.active_stage().is_none());
        assert_eq!(ledger.live_of(ResourceKind::Light), 3);
        assert!(!stages.components().is_disposed());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut stages, _, ledger) = coordinator();
        stages.create_stage("lobby", StageConfig::default()).unwrap();
        stages.set_active_stage("lobby");
        let node = stages.components().instantiate("sphere", "physical").unwrap();
        stages.add_to_stage(node, AddOptions::default());

        stages.dispose();
        stages.dispose();

        assert!(stages.is_disposed());
        assert_eq!(ledger.live_count(), 0);
        assert_eq!(ledger.rejected_releases(), 0);
        assert!(matches!(
            stages.create_stage("lobby", StageConfig::default()),
            Err(StageError::Disposed)
        ));
        assert!(!stages.cache().is_disposed());
    }
}
