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

//! # Stagehand Stage
//!
//! Composes loaded assets into addressable stages and tears them down in a
//! fixed order.
//!
//! A [`Stage`] bundles a [`SceneContainer`], a [`CameraRig`], an
//! [`EnvironmentBuilder`] and a [`LightingRig`]. The [`StageCoordinator`]
//! creates stages, decides which one receives per-frame updates and owns the
//! [`ComponentRegistry`] and [`CameraManager`] shared by all of them. Assets
//! come from an injected [`AssetCache`](stagehand_io::AssetCache).

#![warn(missing_docs)]

pub mod camera;
pub mod components;
pub mod config;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod lighting;
pub mod presets;
pub mod scene;

pub use camera::{Camera, CameraManager, CameraPreset, CameraRig, OrbitControls};
pub use components::{ComponentKind, ComponentRef, ComponentRegistry, ComponentTemplate};
pub use config::{EnvironmentOptions, SceneSettings, StageConfig, StagehandConfig};
pub use coordinator::{RenderSubmitter, RenderView, Stage, StageCoordinator, StageId};
pub use environment::{
    EnvironmentBuilder, EnvironmentLight, EnvironmentLights, EnvironmentMap, MipLevel,
    PrefilterGenerator,
};
pub use error::StageError;
pub use lighting::{LightInstance, LightingRig};
pub use presets::{EnvironmentCategory, EnvironmentPreset, FogPreset};
pub use scene::{AddOptions, Background, EnvironmentBinding, Fog, SceneContainer};
