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

//! Named environment and fog presets that stage configs refer to by key.

use crate::config::EnvironmentOptions;
use EnvironmentCategory::*;

/// What an environment preset depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentCategory {
    /// Low sun over open land.
    Sunset,
    /// Night skies.
    Night,
    /// Cloudless skies.
    Puresky,
    /// City streets.
    Urban,
    /// Studio softboxes.
    Studio,
    /// Interiors.
    Indoor,
    /// Painted or graded captures.
    Stylized,
}

/// A stock environment: a source image plus the settings it looks right with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentPreset {
    /// Display name.
    pub name: &'static str,
    /// Source image, relative to the asset root.
    pub path: &'static str,
    /// Grouping.
    pub category: EnvironmentCategory,
    /// Reflection intensity.
    pub intensity: f32,
    /// Background blurriness.
    pub background_blur: f32,
    /// Environment sun intensity.
    pub sun_intensity: f32,
    /// Environment ambient intensity.
    pub ambient_intensity: f32,
    /// Show the map as the background.
    pub background_enabled: bool,
}

impl EnvironmentPreset {
    /// `base` with the preset's settings applied. Rotation and exposure are
    /// not part of a preset and are kept.
    pub fn options(&self, base: &EnvironmentOptions) -> EnvironmentOptions {
        EnvironmentOptions {
            intensity: self.intensity,
            blur: self.background_blur,
            sun_intensity: self.sun_intensity,
            ambient_intensity: self.ambient_intensity,
            background_enabled: self.background_enabled,
            ..base.clone()
        }
    }
}

#[allow(clippy::too_many_arguments)]
const fn environment(
    name: &'static str,
    path: &'static str,
    category: EnvironmentCategory,
    intensity: f32,
    background_blur: f32,
    sun_intensity: f32,
    ambient_intensity: f32,
    background_enabled: bool,
) -> EnvironmentPreset {
    EnvironmentPreset {
        name,
        path,
        category,
        intensity,
        background_blur,
        sun_intensity,
        ambient_intensity,
        background_enabled,
    }
}

/// The stock environments, by key.
pub const ENVIRONMENT_PRESETS: [(&str, EnvironmentPreset); 13] = [
    (
        "pointe_sunset_03",
        environment("Pointe Sunset 03", "environment_maps/hdr/pointe_sunset_03.hdr", Sunset, 1.2, 0.0, 0.8, 1.0, true),
    ),
    (
        "pointe_sunset_08",
        environment("Pointe Sunset 08", "environment_maps/hdr/pointe_sunset_08.hdr", Sunset, 1.1, 0.0, 0.7, 0.9, true),
    ),
    (
        "satara_night",
        environment("Satara Night", "environment_maps/hdr/satara_night.hdr", Night, 0.8, 0.1, 0.2, 0.8, true),
    ),
    (
        "blaubeuren_night",
        environment("Blaubeuren Night", "environment_maps/hdr/blaubeuren_night.hdr", Night, 0.7, 0.0, 0.1, 0.9, true),
    ),
    (
        "night_bridge",
        environment("Night Bridge", "environment_maps/hdr/night_bridge.hdr", Night, 0.9, 0.05, 0.3, 0.8, true),
    ),
    (
        "autumn_field",
        environment("Autumn Field", "environment_maps/hdr/autumn_field.hdr", Puresky, 1.3, 0.0, 1.0, 1.0, true),
    ),
    (
        "kloppenheim",
        environment("Kloppenheim", "environment_maps/hdr/kloppenheim.hdr", Puresky, 1.2, 0.0, 1.1, 0.9, true),
    ),
    (
        "shanghai_bund",
        environment("Shanghai Bund", "environment_maps/hdr/shanghai_bund.hdr", Urban, 1.1, 0.1, 0.4, 0.9, true),
    ),
    (
        "neo_tokyo",
        environment("Neo Tokyo", "environment_maps/hdr/neo_tokyo.hdr", Urban, 1.2, 0.15, 0.3, 1.0, true),
    ),
    (
        "softbox",
        environment("Studio Softbox", "environment_maps/hdr/softbox.hdr", Studio, 1.0, 0.0, 0.2, 1.2, false),
    ),
    (
        "creepy_bathroom",
        environment("Creepy Bathroom", "environment_maps/hdr/creepy_bathroom.hdr", Indoor, 0.8, 0.2, 0.1, 0.7, true),
    ),
    (
        "grunge_pop",
        environment("Grunge Pop", "environment_maps/hdr/grunge_pop.hdr", Stylized, 1.4, 0.0, 0.6, 1.1, true),
    ),
    (
        "comic",
        environment("Comic", "environment_maps/hdr/comic.hdr", Stylized, 1.3, 0.0, 0.8, 1.0, true),
    ),
];

/// The environment preset called `key`.
pub fn environment_preset(key: &str) -> Option<&'static EnvironmentPreset> {
    ENVIRONMENT_PRESETS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, preset)| preset)
}

/// Keys of the environment presets in `category`, in table order.
pub fn environment_presets_in(category: EnvironmentCategory) -> Vec<&'static str> {
    ENVIRONMENT_PRESETS
        .iter()
        .filter(|(_, preset)| preset.category == category)
        .map(|(name, _)| *name)
        .collect()
}

/// A stock fog look.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogPreset {
    /// `0xRRGGBB` color. `None` turns fog off.
    pub color: Option<u32>,
    /// Exponential-squared density.
    pub density: f32,
    /// One-line description.
    pub description: &'static str,
}

const fn fog(color: u32, density: f32, description: &'static str) -> FogPreset {
    FogPreset {
        color: Some(color),
        density,
        description,
    }
}

/// The stock fog looks, by key.
pub const FOG_PRESETS: [(&str, FogPreset); 26] = [
    (
        "none",
        FogPreset {
            color: None,
            density: 0.0,
            description: "No fog",
        },
    ),
    ("soft_blue", fog(0xe0e1ff, 0.08, "Soft blue atmosphere")),
    ("morning_mist", fog(0xd4e1ff, 0.12, "Light morning mist")),
    ("warm_dawn", fog(0xfff1e6, 0.1, "Warm dawn haze")),
    ("forest_haze", fog(0xe6ffe6, 0.15, "Green forest haze")),
    ("twilight_purple", fog(0xf0e6ff, 0.13, "Purple twilight")),
    ("deep_blue", fog(0x2c3e50, 0.18, "Deep blue depths")),
    ("dark_teal", fog(0x2d545e, 0.16, "Dark teal atmosphere")),
    ("dark_atmosphere", fog(0x1a1a1a, 0.2, "Dark, ominous fog")),
    ("midnight_blue", fog(0x34495e, 0.17, "Midnight blue fog")),
    ("sunset_orange", fog(0xff9966, 0.11, "Warm sunset glow")),
    ("dramatic_red", fog(0xff6b6b, 0.14, "Dramatic red haze")),
    ("bright_teal", fog(0x4ecdc4, 0.09, "Bright teal mist")),
    ("rich_purple", fog(0x9b59b6, 0.15, "Rich purple atmosphere")),
    ("full_moon", fog(0xc4c9d6, 0.12, "Full moon night")),
    ("blue_moon", fog(0xa5b5d9, 0.14, "Blue moon glow")),
    ("blood_moon", fog(0x8b0000, 0.16, "Blood moon haze")),
    ("golden_hour", fog(0xffa500, 0.1, "Golden hour glow")),
    ("magic_hour", fog(0x4b0082, 0.13, "Magic hour twilight")),
    ("dawn", fog(0xff7f50, 0.11, "Early dawn")),
    ("dusk", fog(0x483d8b, 0.15, "Evening dusk")),
    ("misty_mountains", fog(0xe6e6fa, 0.17, "Misty mountain air")),
    ("desert_heat", fog(0xffd700, 0.08, "Desert heat haze")),
    ("arctic_chill", fog(0xf0ffff, 0.14, "Cold arctic mist")),
    ("storm_coming", fog(0x4a4a4a, 0.19, "Approaching storm")),
    ("ethereal", fog(0xdda0dd, 0.12, "Ethereal dream")),
];

/// The fog preset called `key`.
pub fn fog_preset(key: &str) -> Option<&'static FogPreset> {
    FOG_PRESETS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, preset)| preset)
}
