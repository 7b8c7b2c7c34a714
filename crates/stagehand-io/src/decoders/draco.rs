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

//! Draco compressed geometry.
//!
//! Decompression itself is delegated to a [`GeometryCodec`] supplied by the
//! host, since the reference decoder is a native or WASM module.

use super::Decoder;
use crate::error::LoadError;
use stagehand_core::asset::Asset;
use stagehand_core::resource::RenderDevice;
use stagehand_core::scene::{Geometry, GeometryShape, MeshData};
use std::sync::Arc;

const DRACO_MAGIC: &[u8] = b"DRACO";

/// A native geometry decompressor.
pub trait GeometryCodec: Send + Sync {
    /// Decompresses a full Draco bitstream.
    fn decode(&self, bytes: &[u8]) -> Result<MeshData, String>;

    /// Frees the codec's native state.
    fn release(&self) {}
}

/// Decodes `.drc` files into bare geometry.
#[derive(Default)]
pub struct DracoDecoder {
    codec: Option<Arc<dyn GeometryCodec>>,
}

impl DracoDecoder {
    /// A decoder without a codec. Every decode fails with
    /// [`LoadError::UnsupportedFeature`] after the header check.
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder that decompresses through `codec`.
    pub fn with_codec(codec: Arc<dyn GeometryCodec>) -> Self {
        Self { codec: Some(codec) }
    }
}

impl Decoder for DracoDecoder {
    fn decode(
        &self,
        path: &str,
        bytes: &[u8],
        device: &dyn RenderDevice,
    ) -> Result<Asset, LoadError> {
        if !bytes.starts_with(DRACO_MAGIC) {
            return Err(LoadError::decode(path, "missing DRACO header"));
        }
        let codec = self.codec.as_ref().ok_or_else(|| LoadError::UnsupportedFeature {
            path: path.to_string(),
            feature: "Draco geometry codec".to_string(),
        })?;
        let data = codec.decode(bytes).map_err(|e| LoadError::decode(path, e))?;
        if data.positions.is_empty() {
            return Err(LoadError::decode(path, "decoded geometry has no vertices"));
        }
        Ok(Asset::Geometry(Arc::new(Geometry::new(
            device,
            path,
            GeometryShape::Mesh(Arc::new(data)),
        ))))
    }

    fn release(&self) {
        if let Some(codec) = &self.codec {
            codec.release();
        }
    }
}
