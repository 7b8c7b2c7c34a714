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

//! Image decoders, for plain textures and HDR environment sources.

use super::Decoder;
use crate::error::LoadError;
use ::image::ImageFormat;
use stagehand_core::asset::Asset;
use stagehand_core::resource::RenderDevice;
use stagehand_core::scene::{Texture, TextureData, TextureMapping};
use std::sync::Arc;

/// Which family of image a decoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// PNG, JPEG and the other 8-bit formats, kept in sRGB.
    Ldr,
    /// Radiance RGBE (`.hdr`), decoded to linear float.
    Rgbe,
    /// OpenEXR, decoded to linear float.
    Exr,
}

/// Decodes a single image into a texture.
///
/// HDR sources are tagged with equirectangular mapping, since they are
/// almost always environment panoramas.
#[derive(Debug, Clone, Copy)]
pub struct ImageDecoder {
    kind: ImageKind,
}

impl ImageDecoder {
    /// A decoder for `kind`.
    pub fn new(kind: ImageKind) -> Self {
        Self { kind }
    }
}

impl Decoder for ImageDecoder {
    fn decode(
        &self,
        path: &str,
        bytes: &[u8],
        device: &dyn RenderDevice,
    ) -> Result<Asset, LoadError> {
        let decoded = match self.kind {
            ImageKind::Ldr => ::image::load_from_memory(bytes),
            ImageKind::Rgbe => ::image::load_from_memory_with_format(bytes, ImageFormat::Hdr),
            ImageKind::Exr => ::image::load_from_memory_with_format(bytes, ImageFormat::OpenExr),
        }
        .map_err(|e| LoadError::decode(path, format!("failed to decode image: {e}")))?;

        let (data, mapping) = match self.kind {
            ImageKind::Ldr => {
                let rgba = decoded.to_rgba8();
                let (width, height) = rgba.dimensions();
                (
                    TextureData::rgba8(width, height, rgba.into_raw()),
                    TextureMapping::Uv,
                )
            }
            ImageKind::Rgbe | ImageKind::Exr => {
                let rgb = decoded.to_rgb32f();
                let (width, height) = rgb.dimensions();
                let texels: &[[f32; 3]] = bytemuck::cast_slice(rgb.as_raw().as_slice());
                (
                    TextureData::rgb32f(width, height, texels),
                    TextureMapping::Equirectangular,
                )
            }
        };
        log::debug!(
            "Decoded {:?} image '{}' ({}x{})",
            self.kind,
            path,
            data.width,
            data.height
        );
        Ok(Asset::Texture(Arc::new(Texture::new(
            device,
            path,
            Arc::new(data),
            mapping,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{DynamicImage, Rgba, RgbaImage};
    use stagehand_core::resource::ResourceLedger;
    use stagehand_core::scene::TextureFormat;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let image = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_ldr_decodes_png() {
        let ledger = ResourceLedger::new();

        let asset = ImageDecoder::new(ImageKind::Ldr)
            .decode("albedo.png", &png_bytes(), &ledger)
            .unwrap();

        match asset {
            Asset::Texture(texture) => {
                assert_eq!((texture.data().width, texture.data().height), (4, 2));
                assert_eq!(texture.data().format, TextureFormat::Rgba8Srgb);
                assert_eq!(texture.mapping, TextureMapping::Uv);
            }
            other => panic!("unexpected asset {}", other.kind_name()),
        }
    }

    #[test]
    fn test_rgbe_rejects_png_bytes() {
        let ledger = ResourceLedger::new();
        let result = ImageDecoder::new(ImageKind::Rgbe).decode("sky.hdr", &png_bytes(), &ledger);
        assert!(matches!(result, Err(LoadError::DecodeFailure { .. })));
        assert_eq!(ledger.allocation_count(), 0);
    }

    #[test]
    fn test_garbage_is_a_decode_failure() {
        let ledger = ResourceLedger::new();
        let result = ImageDecoder::new(ImageKind::Ldr).decode("x.png", b"not an image", &ledger);
        assert!(matches!(result, Err(LoadError::DecodeFailure { .. })));
    }
}
