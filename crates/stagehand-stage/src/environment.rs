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

//! Environment maps: baking, the procedural fallback and scene binding.
//!
//! A bake requests the source image from the [`AssetCache`], uploads a
//! working copy, runs it through a [`PrefilterGenerator`] and releases both
//! the generator and the working copy before the map is returned. Only the
//! map itself outlives the bake.
//!
//! Each builder also owns a sun and an ambient light that travel with the
//! environment. They stay inactive until a map is installed.

use crate::config::EnvironmentOptions;
use crate::scene::{EnvironmentBinding, SceneContainer};
use stagehand_core::asset::Asset;
use stagehand_core::math::Vec3;
use stagehand_core::resource::{Disposable, GpuHandle, ReleaseSet, RenderDevice, ResourceKind};
use stagehand_core::scene::{Light, TextureData};
use stagehand_io::{AssetCache, LoadError};
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;

/// Height of the first mip level; the width is twice that.
pub const DEFAULT_BASE_HEIGHT: u32 = 64;

/// Upper bound on the length of a mip chain.
pub const MAX_MIP_LEVELS: usize = 6;

const AMBIENT_TERM: f32 = 0.5;
const KEY_LIGHT_TERM: f32 = 0.5;
const KEY_LIGHT_POSITION: Vec3 = Vec3::new(5.0, 5.0, 5.0);

/// The cache format tag used for an environment source, from its extension.
pub fn environment_format(path: &str) -> Option<&'static str> {
    let extension = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "hdr" => Some("rgbe"),
        "exr" => Some("exr"),
        "png" | "jpg" | "jpeg" => Some("texture"),
        _ => None,
    }
}

/// One level of a prefiltered chain.
#[derive(Debug, Clone)]
pub struct MipLevel {
    /// Roughness this level is sampled at, in `[0, 1]`.
    pub roughness: f32,
    /// Linear RGB texels.
    pub data: Arc<TextureData>,
}

/// A baked, prefiltered environment map.
#[derive(Debug)]
pub struct EnvironmentMap {
    handle: GpuHandle,
    label: String,
    levels: Vec<MipLevel>,
    fallback_reason: Option<LoadError>,
    /// Reflection intensity.
    pub intensity: f32,
    /// Rotation around the vertical axis, in radians.
    pub rotation: f32,
    /// Tone-mapping exposure.
    pub exposure: f32,
    /// Background blurriness.
    pub blur: f32,
}

impl EnvironmentMap {
    /// Handle of the map.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Source path, or `"procedural"`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The mip chain, sharpest first.
    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    /// Why the procedural fallback was used, if a bake failed.
    pub fn fallback_reason(&self) -> Option<&LoadError> {
        self.fallback_reason.as_ref()
    }

    /// Returns `true` if the map was synthesized rather than baked from an
    /// image.
    pub fn is_procedural(&self) -> bool {
        self.label == "procedural"
    }
}

/// The transient program that prefilters an environment image.
///
/// A generator holds its own handle. Call [`PrefilterGenerator::release`]
/// after a bake; dropping it releases the handle as well.
pub struct PrefilterGenerator {
    device: Arc<dyn RenderDevice>,
    handle: GpuHandle,
    released: bool,
}

impl PrefilterGenerator {
    /// Compiles a generator on `device`.
    pub fn new(device: Arc<dyn RenderDevice>) -> Self {
        let handle = device.allocate(ResourceKind::Generator, "prefilter generator");
        Self {
            device,
            handle,
            released: false,
        }
    }

    /// The generator's handle.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Builds a mip chain from an equirectangular `source`.
    ///
    /// Level 0 is `source` resampled to `2h x h` with `h = base_height`.
    /// Each further level averages 2x2 blocks of the previous one, wrapping
    /// around horizontally. Roughness grows linearly from 0 on level 0 to 1
    /// on the last level.
    pub fn prefilter(&self, source: &TextureData, base_height: u32) -> Vec<MipLevel> {
        let height = base_height.max(1);
        let width = height * 2;
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let sx = (x as f32 + 0.5) * source.width as f32 / width as f32;
                let sy = (y as f32 + 0.5) * source.height as f32 / height as f32;
                texels.push(source.texel_rgb(sx as u32, sy as u32));
            }
        }

        let count = (height.ilog2() as usize + 1).min(MAX_MIP_LEVELS);
        let mut chain = vec![(width, height, texels)];
        while chain.len() < count {
            let Some((w, h, prev)) = chain.last() else {
                break;
            };
            let next = downsample(*w, *h, prev);
            chain.push(next);
        }

        let last = (count.max(2) - 1) as f32;
        chain
            .into_iter()
            .enumerate()
            .map(|(level, (w, h, texels))| MipLevel {
                roughness: if count == 1 { 0.0 } else { level as f32 / last },
                data: Arc::new(TextureData::rgb32f(w, h, &texels)),
            })
            .collect()
    }

    /// Prefilters `source` and allocates the resulting map.
    pub fn bake(
        &self,
        label: &str,
        source: &TextureData,
        base_height: u32,
        options: &EnvironmentOptions,
    ) -> EnvironmentMap {
        let levels = self.prefilter(source, base_height);
        log::trace!("Prefiltered '{label}' into {} levels", levels.len());
        EnvironmentMap {
            handle: self.device.allocate(ResourceKind::EnvironmentMap, label),
            label: label.to_string(),
            levels,
            fallback_reason: None,
            intensity: options.intensity,
            rotation: options.rotation,
            exposure: options.exposure,
            blur: options.blur,
        }
    }

    /// Releases the generator.
    pub fn release(mut self) {
        self.release_handle();
    }

    fn release_handle(&mut self) {
        if !self.released {
            self.device.release(self.handle);
            self.released = true;
        }
    }
}

impl Drop for PrefilterGenerator {
    fn drop(&mut self) {
        self.release_handle();
    }
}

fn downsample(width: u32, height: u32, texels: &[[f32; 3]]) -> (u32, u32, Vec<[f32; 3]>) {
    let next_w = (width / 2).max(1);
    let next_h = (height / 2).max(1);
    let at = |x: u32, y: u32| texels[(y.min(height - 1) * width + x % width) as usize];
    let mut out = Vec::with_capacity((next_w * next_h) as usize);
    for y in 0..next_h {
        for x in 0..next_w {
            let (sx, sy) = (x * 2, y * 2);
            let block = [at(sx, sy), at(sx + 1, sy), at(sx, sy + 1), at(sx + 1, sy + 1)];
            let mut sum = [0.0; 3];
            for texel in block {
                for (acc, c) in sum.iter_mut().zip(texel) {
                    *acc += c * 0.25;
                }
            }
            out.push(sum);
        }
    }
    (next_w, next_h, out)
}

/// A uniformly lit capture: an ambient term plus one directional key light.
fn procedural_source(height: u32) -> TextureData {
    let height = height.max(1);
    let width = height * 2;
    let key = KEY_LIGHT_POSITION.normalize();
    let mut texels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let latitude = (0.5 - (y as f32 + 0.5) / height as f32) * PI;
        for x in 0..width {
            let longitude = ((x as f32 + 0.5) / width as f32 - 0.5) * 2.0 * PI;
            let direction = Vec3::new(
                latitude.cos() * longitude.sin(),
                latitude.sin(),
                latitude.cos() * longitude.cos(),
            );
            let value = AMBIENT_TERM + KEY_LIGHT_TERM * direction.dot(key).max(0.0);
            texels.push([value; 3]);
        }
    }
    TextureData::rgb32f(width, height, &texels)
}

/// A light owned by the environment rather than by the stage's rig.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentLight {
    /// Handle of the light.
    pub handle: GpuHandle,
    /// Light parameters.
    pub light: Light,
}

/// The sun and ambient lights that accompany an environment map.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentLights {
    /// Shadow-casting directional light.
    pub sun: EnvironmentLight,
    /// Uniform fill.
    pub ambient: EnvironmentLight,
    /// Whether the lights contribute. Set once a map is installed.
    pub active: bool,
}

impl EnvironmentLights {
    fn allocate(device: &dyn RenderDevice, options: &EnvironmentOptions) -> Self {
        let mut sun = Light::directional();
        sun.intensity = options.sun_intensity;
        let mut ambient = Light::ambient();
        ambient.intensity = options.ambient_intensity;
        Self {
            sun: EnvironmentLight {
                handle: device.allocate(ResourceKind::Light, "environment sun"),
                light: sun,
            },
            ambient: EnvironmentLight {
                handle: device.allocate(ResourceKind::Light, "environment ambient"),
                light: ambient,
            },
            active: false,
        }
    }

    fn release(self, device: &dyn RenderDevice) {
        device.release(self.sun.handle);
        device.release(self.ambient.handle);
    }
}

/// Bakes environment maps for one stage and owns the one currently
/// installed, together with its lights.
pub struct EnvironmentBuilder {
    cache: Arc<AssetCache>,
    device: Arc<dyn RenderDevice>,
    options: EnvironmentOptions,
    base_height: u32,
    current: Option<EnvironmentMap>,
    lights: Option<EnvironmentLights>,
    disposed: bool,
}

impl EnvironmentBuilder {
    /// A builder resolving sources through `cache`. Allocates the
    /// environment lights.
    pub fn new(cache: Arc<AssetCache>, options: EnvironmentOptions) -> Self {
        let device = Arc::clone(cache.device());
        let lights = EnvironmentLights::allocate(&*device, &options);
        Self {
            cache,
            device,
            options,
            base_height: DEFAULT_BASE_HEIGHT,
            current: None,
            lights: Some(lights),
            disposed: false,
        }
    }

    /// Overrides the height of the first mip level.
    pub fn with_base_height(mut self, base_height: u32) -> Self {
        self.base_height = base_height.max(1);
        self
    }

    /// Bakes `path` strictly: any failure is returned.
    pub async fn bake_source(&self, path: &str) -> Result<EnvironmentMap, LoadError> {
        let format = environment_format(path).ok_or_else(|| LoadError::UnknownFormat {
            format: Path::new(path)
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })?;
        let template = self.cache.request(format, path).await?;

        let raw = template.instantiate(&*self.device)?;
        let mut releases = ReleaseSet::new(&*self.device);
        let texture = match &raw {
            Asset::Texture(texture) => Arc::clone(texture),
            other => {
                other.release(&mut releases);
                return Err(LoadError::decode(
                    path,
                    format!("expected an image, found a {}", other.kind_name()),
                ));
            }
        };

        let generator = PrefilterGenerator::new(Arc::clone(&self.device));
        let map = generator.bake(path, texture.data(), self.base_height, &self.options);
        generator.release();
        raw.release(&mut releases);

        log::info!("Baked environment '{path}' ({} levels)", map.levels.len());
        Ok(map)
    }

    /// Bakes `path`, falling back to a procedural map when there is no path
    /// or the bake fails.
    pub async fn bake(&self, path: Option<&str>) -> EnvironmentMap {
        match path {
            Some(path) => match self.bake_source(path).await {
                Ok(map) => map,
                Err(e) => {
                    log::warn!("Environment '{path}' failed ({e}), using procedural fallback");
                    self.procedural(Some(e))
                }
            },
            None => self.procedural(None),
        }
    }

    /// Synthesizes the fallback map through a generator, like a real bake.
    pub fn procedural(&self, reason: Option<LoadError>) -> EnvironmentMap {
        let source = procedural_source(self.base_height);
        let generator = PrefilterGenerator::new(Arc::clone(&self.device));
        let mut map = generator.bake("procedural", &source, self.base_height, &self.options);
        generator.release();
        map.fallback_reason = reason;
        log::debug!("Synthesized procedural environment");
        map
    }

    /// Makes `map` the current map and binds it to `scene`. The previous map
    /// is released.
    pub fn install(&mut self, map: EnvironmentMap, scene: &mut SceneContainer) {
        if self.disposed {
            log::warn!("Environment builder is disposed, releasing '{}'", map.label);
            self.device.release(map.handle);
            return;
        }
        if let Some(old) = self.current.replace(map) {
            self.device.release(old.handle);
        }
        if let Some(lights) = &mut self.lights {
            lights.active = true;
        }
        self.sync_lights();
        scene.set_environment(self.binding());
        scene.set_exposure(self.options.exposure);
    }

    /// Updates intensity, rotation and exposure on the current map and on
    /// `scene`. Nothing is re-baked.
    pub fn update_parameters(
        &mut self,
        intensity: f32,
        rotation: f32,
        exposure: f32,
        scene: &mut SceneContainer,
    ) {
        self.options.intensity = intensity.max(0.0);
        self.options.rotation = rotation;
        self.options.exposure = exposure.max(0.0);
        self.sync(scene);
    }

    /// Current options.
    pub fn options(&self) -> &EnvironmentOptions {
        &self.options
    }

    /// Debug object. Changes apply on
    /// [`EnvironmentBuilder::update_from_debug`].
    pub fn options_mut(&mut self) -> &mut EnvironmentOptions {
        &mut self.options
    }

    /// Sets the sun and ambient intensities. Takes effect without a map
    /// installed; the lights contribute once one is.
    pub fn set_light_intensities(&mut self, sun: f32, ambient: f32) {
        self.options.sun_intensity = sun.max(0.0);
        self.options.ambient_intensity = ambient.max(0.0);
        self.sync_lights();
    }

    /// Applies the debug object to the current map, the lights and `scene`.
    pub fn update_from_debug(&mut self, scene: &mut SceneContainer) {
        self.options.blur = self.options.blur.clamp(0.0, 1.0);
        self.sync(scene);
    }

    fn sync(&mut self, scene: &mut SceneContainer) {
        if let Some(map) = &mut self.current {
            map.intensity = self.options.intensity;
            map.rotation = self.options.rotation;
            map.exposure = self.options.exposure;
            map.blur = self.options.blur;
        }
        if self.current.is_some() {
            scene.set_environment(self.binding());
        }
        scene.set_exposure(self.options.exposure);
        self.sync_lights();
    }

    fn sync_lights(&mut self) {
        if let Some(lights) = &mut self.lights {
            lights.sun.light.intensity = self.options.sun_intensity;
            lights.ambient.light.intensity = self.options.ambient_intensity;
        }
    }

    /// The installed map.
    pub fn current(&self) -> Option<&EnvironmentMap> {
        self.current.as_ref()
    }

    /// The environment lights. `None` once disposed.
    pub fn lights(&self) -> Option<&EnvironmentLights> {
        self.lights.as_ref()
    }

    /// How the installed map should be bound to a scene.
    pub fn binding(&self) -> Option<EnvironmentBinding> {
        self.current.as_ref().map(|map| EnvironmentBinding {
            map: map.handle,
            intensity: map.intensity,
            rotation: map.rotation,
            blur: map.blur,
            as_background: self.options.background_enabled,
        })
    }
}

impl Disposable for EnvironmentBuilder {
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(map) = self.current.take() {
            self.device.release(map.handle);
            log::debug!("Released environment '{}'", map.label);
        }
        if let Some(lights) = self.lights.take() {
            lights.release(&*self.device);
        }
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
