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

//! Per-format decoders.
//!
//! A decoder turns the bytes of one file into an [`Asset`], allocating the
//! GPU handles it needs from the given device. Decoders are synchronous and
//! run on the blocking pool; caching, deduplication and copying are handled
//! by [`CachedLoader`](crate::loader::CachedLoader).
//!
//! A decoder must not hand back a partially built asset: if it fails after
//! allocating, it releases what it allocated before returning the error.

mod draco;
mod gltf;
mod image;
mod obj;
mod splat;

pub use self::draco::{DracoDecoder, GeometryCodec};
pub use self::gltf::{FileSystemResolver, GltfDecoder, ResourceResolver};
pub use self::image::{ImageDecoder, ImageKind};
pub use self::obj::ObjDecoder;
pub use self::splat::{SplatDecoder, SPLAT_RECORD_SIZE};

use crate::error::LoadError;
use stagehand_core::asset::Asset;
use stagehand_core::resource::RenderDevice;

/// Decodes one file format.
pub trait Decoder: Send + Sync + 'static {
    /// Decodes `bytes` read from `path`.
    fn decode(
        &self,
        path: &str,
        bytes: &[u8],
        device: &dyn RenderDevice,
    ) -> Result<Asset, LoadError>;

    /// Frees native decoder state (WASM modules, transcoders). Called once
    /// when the owning loader is disposed.
    fn release(&self) {}
}
