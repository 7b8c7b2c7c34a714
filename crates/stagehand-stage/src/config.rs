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

//! Configuration surfaces: per-stage options, environment options, scene
//! settings and the aggregate [`StagehandConfig`] read from RON.
//!
//! Everything is permissive. Missing keys take their defaults and unknown
//! keys are ignored, so hand-edited files keep working across versions.

use crate::error::StageError;
use crate::presets::{environment_preset, EnvironmentPreset};
use serde::{Deserialize, Serialize};
use stagehand_io::LoaderConfig;
use std::collections::BTreeMap;
use std::path::Path;

/// Options a stage is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Environment image to bake, relative to the asset root. `None` uses
    /// the preset's image, or the procedural fallback without one.
    pub environment: Option<String>,
    /// Key into [`ENVIRONMENT_PRESETS`](crate::presets::ENVIRONMENT_PRESETS).
    pub environment_preset: Option<String>,
    /// Camera preset name.
    pub camera: String,
    /// Controls preset name (`"orbit"`, `"auto_orbit"` or `"none"`).
    pub controls: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            environment: None,
            environment_preset: None,
            camera: "default".to_string(),
            controls: "orbit".to_string(),
        }
    }
}

impl StageConfig {
    /// Builder for the environment path.
    pub fn with_environment(mut self, path: impl Into<String>) -> Self {
        self.environment = Some(path.into());
        self
    }

    /// Builder for the environment preset.
    pub fn with_environment_preset(mut self, key: impl Into<String>) -> Self {
        self.environment_preset = Some(key.into());
        self
    }

    /// The preset this stage refers to, if it names a known one.
    pub fn resolved_environment_preset(&self) -> Option<&'static EnvironmentPreset> {
        let key = self.environment_preset.as_deref()?;
        let preset = environment_preset(key);
        if preset.is_none() {
            log::warn!("Unknown environment preset '{key}'");
        }
        preset
    }

    /// The image to bake: the explicit path, else the preset's image.
    pub fn environment_path(&self) -> Option<&str> {
        self.environment
            .as_deref()
            .or_else(|| self.resolved_environment_preset().map(|p| p.path))
    }

    /// `base` with the preset's settings applied, if there is one.
    pub fn environment_options(&self, base: &EnvironmentOptions) -> EnvironmentOptions {
        match self.resolved_environment_preset() {
            Some(preset) => preset.options(base),
            None => base.clone(),
        }
    }

    /// Builder for the camera preset.
    pub fn with_camera(mut self, preset: impl Into<String>) -> Self {
        self.camera = preset.into();
        self
    }

    /// Builder for the controls preset.
    pub fn with_controls(mut self, controls: impl Into<String>) -> Self {
        self.controls = controls.into();
        self
    }
}

/// Scalar settings applied to a baked environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentOptions {
    /// Reflection intensity.
    pub intensity: f32,
    /// Background blurriness in `[0, 1]`.
    pub blur: f32,
    /// Rotation around the vertical axis, in radians.
    pub rotation: f32,
    /// Tone-mapping exposure.
    pub exposure: f32,
    /// Show the map as the scene background.
    pub background_enabled: bool,
    /// Intensity of the environment's sun light.
    pub sun_intensity: f32,
    /// Intensity of the environment's ambient light.
    pub ambient_intensity: f32,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            blur: 0.0,
            rotation: 0.0,
            exposure: 1.0,
            background_enabled: true,
            sun_intensity: 0.0,
            ambient_intensity: 1.0,
        }
    }
}

/// Fog, either linear between `near` and `far` or exponential when
/// `density` is positive. A known `preset` overrides color and density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogSettings {
    /// Whether fog is applied.
    pub enabled: bool,
    /// `0xRRGGBB` color.
    pub color: u32,
    /// Distance where fog starts.
    pub near: f32,
    /// Distance where fog is opaque.
    pub far: f32,
    /// Exponential-squared density. `0` selects linear fog.
    pub density: f32,
    /// Key into [`FOG_PRESETS`](crate::presets::FOG_PRESETS).
    pub preset: Option<String>,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            color: 0x000000,
            near: 1.0,
            far: 1000.0,
            density: 0.0,
            preset: None,
        }
    }
}

/// Solid background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundSettings {
    /// Whether a solid color is drawn behind the scene.
    pub enabled: bool,
    /// `0xRRGGBB` color.
    pub color: u32,
    /// Background opacity.
    pub alpha: f32,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            color: 0x000000,
            alpha: 1.0,
        }
    }
}

/// Shadow map settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Whether shadows are rendered.
    pub enabled: bool,
    /// Re-render shadow maps every frame.
    pub auto_update: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_update: true,
        }
    }
}

/// Tone mapping settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMappingSettings {
    /// Whether tone mapping is applied.
    pub enabled: bool,
    /// Exposure multiplier.
    pub exposure: f32,
}

impl Default for ToneMappingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            exposure: 1.0,
        }
    }
}

/// Fog, background, shadow and tone-mapping state of a scene.
///
/// Each scene keeps one of these as its debug object: edit it through
/// [`SceneContainer::settings_mut`](crate::SceneContainer::settings_mut) and
/// call `update_from_debug` to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Fog.
    pub fog: FogSettings,
    /// Background.
    pub background: BackgroundSettings,
    /// Shadows.
    pub shadows: ShadowSettings,
    /// Tone mapping.
    pub tone_mapping: ToneMappingSettings,
}

/// Initial viewport size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Viewport {
    /// Width over height, or `1.0` for a degenerate viewport.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Everything an application needs to set up its stages.
///
/// ```
/// use stagehand_stage::StagehandConfig;
///
/// let config = StagehandConfig::from_ron_str(
///     r#"(
///         environment: (exposure: 1.5),
///         stages: { "showroom": (camera: "wide_shot") },
///     )"#,
/// )
/// .unwrap();
/// assert_eq!(config.environment.exposure, 1.5);
/// assert_eq!(config.stages["showroom"].controls, "orbit");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagehandConfig {
    /// Loader settings.
    pub loaders: LoaderConfig,
    /// Initial scene settings for every stage.
    pub scene: SceneSettings,
    /// Environment options for every stage.
    pub environment: EnvironmentOptions,
    /// Initial viewport.
    pub viewport: Viewport,
    /// Stages to create at startup, by name.
    pub stages: BTreeMap<String, StageConfig>,
    /// Stage to activate once the startup stages exist.
    pub active_stage: Option<String>,
}

impl StagehandConfig {
    /// Parses a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self, StageError> {
        ron::from_str(source).map_err(|e| StageError::Config(e.to_string()))
    }

    /// Reads and parses a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StageError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| StageError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_ron_str(&source)?;
        log::info!(
            "Loaded configuration from {} ({} stages)",
            path.display(),
            config.stages.len()
        );
        Ok(config)
    }

    /// Serializes to pretty RON.
    pub fn to_ron_string(&self) -> Result<String, StageError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| StageError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = StagehandConfig::from_ron_str("()").unwrap();
        assert_eq!(config, StagehandConfig::default());
        assert_eq!(config.viewport.width, 1280);
        assert!(config.scene.background.enabled);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = StagehandConfig::from_ron_str(
            r#"(
                renderer: "webgl",
                environment: (intensity: 2.0, sparkle: true),
                stages: {
                    "studio": (environment: Some("studio.hdr"), lens_flare: true),
                },
            )"#,
        )
        .unwrap();

        assert_eq!(config.environment.intensity, 2.0);
        assert_eq!(config.environment.exposure, 1.0);
        let studio = &config.stages["studio"];
        assert_eq!(studio.environment.as_deref(), Some("studio.hdr"));
        assert_eq!(studio.camera, "default");
    }

    #[test]
    fn test_environment_preset_supplies_path_and_settings() {
        let config = StagehandConfig::from_ron_str(
            r#"(
                environment: (rotation: 0.5),
                scene: (fog: (enabled: true, preset: Some("dusk"))),
                stages: {
                    "night": (environment_preset: Some("satara_night")),
                    "custom": (environment: Some("own.hdr"), environment_preset: Some("comic")),
                    "typo": (environment_preset: Some("sataranight")),
                },
            )"#,
        )
        .unwrap();

        let night = &config.stages["night"];
        assert_eq!(night.environment_path(), Some("environment_maps/hdr/satara_night.hdr"));
        let options = night.environment_options(&config.environment);
        assert_eq!((options.intensity, options.blur), (0.8, 0.1));
        assert_eq!((options.sun_intensity, options.ambient_intensity), (0.2, 0.8));
        assert_eq!(options.rotation, 0.5);

        // An explicit path wins over the preset's image, not its settings.
        let custom = &config.stages["custom"];
        assert_eq!(custom.environment_path(), Some("own.hdr"));
        assert_eq!(custom.environment_options(&config.environment).intensity, 1.3);

        let typo = &config.stages["typo"];
        assert_eq!(typo.environment_path(), None);
        assert_eq!(typo.environment_options(&config.environment), config.environment);

        assert_eq!(config.scene.fog.preset.as_deref(), Some("dusk"));
    }

    #[test]
    fn test_malformed_source_is_a_config_error() {
        let result = StagehandConfig::from_ron_str("(viewport: (width: \"wide\"))");
        assert!(matches!(result, Err(StageError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(active_stage: Some(\"lobby\"), viewport: (width: 640, height: 480))").unwrap();

        let config = StagehandConfig::load(file.path()).unwrap();

        assert_eq!(config.active_stage.as_deref(), Some("lobby"));
        assert_eq!(config.viewport.aspect(), 640.0 / 480.0);
    }

    #[test]
    fn test_round_trips_through_ron() {
        let mut config = StagehandConfig::default();
        config
            .stages
            .insert("a".to_string(), StageConfig::default().with_camera("close_up"));

        let text = config.to_ron_string().unwrap();

        assert_eq!(StagehandConfig::from_ron_str(&text).unwrap(), config);
    }
}
