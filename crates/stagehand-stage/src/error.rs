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

//! Error type for stage composition.

use crate::components::ComponentKind;
use stagehand_core::ResourceError;
use stagehand_io::LoadError;
use thiserror::Error;

/// Errors raised by stages and the managers they compose.
///
/// Disposal never produces one of these: releasing twice is absorbed, not
/// reported.
#[derive(Error, Debug)]
pub enum StageError {
    /// `create_stage` was called with a name already in use.
    #[error("a stage named '{name}' already exists")]
    DuplicateStage {
        /// The rejected name.
        name: String,
    },

    /// An operation named a stage that does not exist.
    #[error("no stage named '{name}'")]
    UnknownStage {
        /// The requested name.
        name: String,
    },

    /// `instantiate` named a component that is not registered.
    #[error("no {kind} component named '{name}'")]
    MissingComponent {
        /// Which registry was searched.
        kind: ComponentKind,
        /// The requested name.
        name: String,
    },

    /// `add_light` named a light type that has no template.
    #[error("unknown light type '{light_type}'")]
    UnknownLightType {
        /// The requested type.
        light_type: String,
    },

    /// The template holds something that cannot be placed in a scene graph.
    #[error("'{label}' is a {kind} and cannot be added to a scene")]
    NotDrawable {
        /// Label of the template.
        label: String,
        /// Kind of asset it holds.
        kind: &'static str,
    },

    /// Requesting the asset failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A template could not be instantiated.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The owner was used after being disposed.
    #[error("used after dispose")]
    Disposed,
}
