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

//! Decoded assets and the templates they are cached as.

mod duplicate;
mod template;

pub use duplicate::Duplicator;
pub use template::ResourceTemplate;

use crate::resource::{GpuHandle, ReleaseSet};
use crate::scene::{Geometry, SceneNode, Texture};
use std::collections::HashSet;
use std::sync::Arc;

/// The result of decoding one file.
#[derive(Debug)]
pub enum Asset {
    /// A node hierarchy with meshes, as produced by model and splat formats.
    Model(SceneNode),
    /// Bare geometry, as produced by compressed geometry formats.
    Geometry(Arc<Geometry>),
    /// A single image.
    Texture(Arc<Texture>),
}

impl Asset {
    /// Short name of the variant, for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Asset::Model(_) => "model",
            Asset::Geometry(_) => "geometry",
            Asset::Texture(_) => "texture",
        }
    }

    /// Every distinct GPU handle the asset references.
    pub fn handles(&self) -> HashSet<GpuHandle> {
        match self {
            Asset::Model(node) => node.handles(),
            Asset::Geometry(geometry) => HashSet::from([geometry.handle()]),
            Asset::Texture(texture) => HashSet::from([texture.handle()]),
        }
    }

    /// Independent copy on fresh handles.
    pub fn duplicate(&self, duplicator: &mut Duplicator<'_>) -> Asset {
        match self {
            Asset::Model(node) => Asset::Model(duplicator.node(node)),
            Asset::Geometry(geometry) => Asset::Geometry(duplicator.geometry(geometry)),
            Asset::Texture(texture) => Asset::Texture(duplicator.texture(texture)),
        }
    }

    /// Releases every handle the asset references.
    pub fn release(&self, releases: &mut ReleaseSet<'_>) {
        match self {
            Asset::Model(node) => releases.release_node(node),
            Asset::Geometry(geometry) => releases.release_geometry(geometry),
            Asset::Texture(texture) => releases.release_texture(texture),
        }
    }

    /// The node hierarchy, for assets that have one.
    pub fn as_model(&self) -> Option<&SceneNode> {
        match self {
            Asset::Model(node) => Some(node),
            _ => None,
        }
    }
}
