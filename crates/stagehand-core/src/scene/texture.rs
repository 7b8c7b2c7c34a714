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

//! Decoded images and the textures that own their GPU copy.

use crate::math::LinearRgba;
use crate::resource::{GpuHandle, RenderDevice, ResourceKind};
use std::sync::Arc;

/// Pixel layout of [`TextureData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit RGBA, sRGB encoded.
    Rgba8Srgb,
    /// 32-bit float RGB, linear. Used for HDR sources.
    Rgb32Float,
}

impl TextureFormat {
    /// Size of one texel in bytes.
    pub const fn bytes_per_texel(self) -> usize {
        match self {
            TextureFormat::Rgba8Srgb => 4,
            TextureFormat::Rgb32Float => 12,
        }
    }
}

/// How a texture is projected when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureMapping {
    /// Regular UV mapping.
    Uv,
    /// Latitude/longitude panorama, used for environment sources.
    Equirectangular,
}

/// CPU-side pixels. Immutable once decoded and shared between copies.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Pixel layout.
    pub format: TextureFormat,
    /// Tightly packed rows, top to bottom.
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Wraps RGBA8 pixels.
    pub fn rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8Srgb,
            pixels,
        }
    }

    /// Packs linear RGB float texels.
    pub fn rgb32f(width: u32, height: u32, texels: &[[f32; 3]]) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgb32Float,
            pixels: bytemuck::cast_slice(texels).to_vec(),
        }
    }

    /// Reads one texel as linear RGB. Coordinates are clamped to the image.
    pub fn texel_rgb(&self, x: u32, y: u32) -> [f32; 3] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 3];
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let stride = self.format.bytes_per_texel();
        let offset = (y * self.width as usize + x) * stride;
        let Some(bytes) = self.pixels.get(offset..offset + stride) else {
            return [0.0; 3];
        };
        match self.format {
            TextureFormat::Rgba8Srgb => {
                let hex = (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2]);
                LinearRgba::from_hex(hex).to_rgb_array()
            }
            TextureFormat::Rgb32Float => bytemuck::pod_read_unaligned::<[f32; 3]>(bytes),
        }
    }
}

/// A sampled image resident on the GPU.
#[derive(Debug)]
pub struct Texture {
    handle: GpuHandle,
    label: String,
    data: Arc<TextureData>,
    /// Projection used when sampling.
    pub mapping: TextureMapping,
}

impl Texture {
    /// Uploads `data`, allocating a new handle.
    pub fn new(
        device: &dyn RenderDevice,
        label: &str,
        data: Arc<TextureData>,
        mapping: TextureMapping,
    ) -> Self {
        Self {
            handle: device.allocate(ResourceKind::Texture, label),
            label: label.to_string(),
            data,
            mapping,
        }
    }

    /// The owned handle.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Shared CPU pixels.
    pub fn data(&self) -> &Arc<TextureData> {
        &self.data
    }

    /// Uploads the same pixels again under a fresh handle.
    pub fn duplicate(&self, device: &dyn RenderDevice) -> Self {
        Self::new(device, &self.label, Arc::clone(&self.data), self.mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texel_rgb_reads_float_layout() {
        let data = TextureData::rgb32f(2, 1, &[[0.0, 0.5, 1.0], [2.0, 3.0, 4.0]]);
        assert_eq!(data.texel_rgb(1, 0), [2.0, 3.0, 4.0]);
        // Out of range clamps to the last texel.
        assert_eq!(data.texel_rgb(9, 9), [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_texel_rgb_linearizes_srgb() {
        let data = TextureData::rgba8(1, 1, vec![255, 0, 0, 255]);
        assert_eq!(data.texel_rgb(0, 0), [1.0, 0.0, 0.0]);
    }
}
