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

//! Gaussian splat decoder for the packed `.splat` layout.

use super::Decoder;
use crate::error::LoadError;
use bytemuck::{Pod, Zeroable};
use stagehand_core::asset::Asset;
use stagehand_core::math::Vec3;
use stagehand_core::resource::RenderDevice;
use stagehand_core::scene::{
    Geometry, GeometryShape, Material, MaterialKind, MaterialParams, PointCloudData, SceneNode,
};
use std::sync::Arc;

/// Size in bytes of one packed splat record.
pub const SPLAT_RECORD_SIZE: usize = std::mem::size_of::<SplatRecord>();

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SplatRecord {
    position: [f32; 3],
    scale: [f32; 3],
    color: [u8; 4],
    rotation: [u8; 4],
}

/// Decodes packed splat records into a point-cloud model.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplatDecoder {
    max_points: Option<usize>,
}

impl SplatDecoder {
    /// A decoder keeping every splat.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `max_points` splats; the rest of the file is ignored.
    pub fn with_max_points(max_points: usize) -> Self {
        Self {
            max_points: Some(max_points),
        }
    }
}

impl Decoder for SplatDecoder {
    fn decode(
        &self,
        path: &str,
        bytes: &[u8],
        device: &dyn RenderDevice,
    ) -> Result<Asset, LoadError> {
        if bytes.is_empty() || bytes.len() % SPLAT_RECORD_SIZE != 0 {
            return Err(LoadError::decode(
                path,
                format!(
                    "{} bytes is not a whole number of {SPLAT_RECORD_SIZE}-byte splats",
                    bytes.len()
                ),
            ));
        }

        let total = bytes.len() / SPLAT_RECORD_SIZE;
        let keep = self.max_points.map_or(total, |max| total.min(max));
        if keep < total {
            log::warn!("'{path}' has {total} splats, keeping the first {keep}");
        }

        let mut data = PointCloudData::default();
        for chunk in bytes.chunks_exact(SPLAT_RECORD_SIZE).take(keep) {
            let record: SplatRecord = bytemuck::pod_read_unaligned(chunk);
            data.positions.push(Vec3::from_array(record.position));
            data.scales.push(Vec3::from_array(record.scale));
            data.colors.push(record.color);
            data.rotations.push(record.rotation);
        }

        let geometry = Arc::new(Geometry::new(
            device,
            path,
            GeometryShape::Points(Arc::new(data)),
        ));
        let mut params = MaterialParams::new(MaterialKind::Points { size: 1.0 });
        params.transparent = true;
        let material = Arc::new(Material::new(device, path, params));
        Ok(Asset::Model(SceneNode::with_mesh(path, geometry, material)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::resource::ResourceLedger;

    fn records(count: usize) -> Vec<u8> {
        (0..count)
            .flat_map(|i| {
                let record = SplatRecord {
                    position: [i as f32, 0.0, 0.0],
                    scale: [0.1; 3],
                    color: [255, 128, 0, 255],
                    rotation: [128, 128, 128, 255],
                };
                bytemuck::bytes_of(&record).to_vec()
            })
            .collect()
    }

    #[test]
    fn test_record_layout_is_32_bytes() {
        assert_eq!(SPLAT_RECORD_SIZE, 32);
    }

    #[test]
    fn test_decodes_every_record() {
        let ledger = ResourceLedger::new();

        let asset = SplatDecoder::new().decode("garden.splat", &records(4), &ledger).unwrap();

        let mesh = asset.as_model().unwrap().mesh.as_ref().unwrap();
        match &mesh.geometry.shape {
            GeometryShape::Points(points) => {
                assert_eq!(points.len(), 4);
                assert_eq!(points.positions[3].x, 3.0);
                assert_eq!(points.colors[0], [255, 128, 0, 255]);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_point_cap_truncates() {
        let ledger = ResourceLedger::new();
        let asset = SplatDecoder::with_max_points(2)
            .decode("garden.splat", &records(5), &ledger)
            .unwrap();
        let mesh = asset.as_model().unwrap().mesh.as_ref().unwrap();
        assert_eq!(mesh.geometry.shape.vertex_count(), 2);
    }

    #[test]
    fn test_ragged_length_is_a_decode_failure() {
        let ledger = ResourceLedger::new();
        let mut bytes = records(1);
        bytes.pop();
        let result = SplatDecoder::new().decode("garden.splat", &bytes, &ledger);
        assert!(matches!(result, Err(LoadError::DecodeFailure { .. })));
        assert_eq!(ledger.allocation_count(), 0);
    }
}
