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

//! Flat parameter sets ("debug objects").
//!
//! A tuning UI edits a [`ParamSet`] in place; the owning component applies it
//! with [`Tunable::apply_params`] when asked to update from its debug object.
//! Keys a component does not understand are ignored, so a UI can carry extra
//! entries without breaking anything.

use crate::math::LinearRgba;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single tunable value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A scalar.
    Float(f32),
    /// A packed sRGB `0xRRGGBB` color.
    Color(u32),
    /// A toggle.
    Flag(bool),
}

/// An ordered map of named parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ParamSet::set`].
    pub fn with(mut self, key: &str, value: ParamValue) -> Self {
        self.set(key, value);
        self
    }

    /// Inserts or overwrites a value.
    pub fn set(&mut self, key: &str, value: ParamValue) {
        self.0.insert(key.to_string(), value);
    }

    /// Returns a raw value.
    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.0.get(key).copied()
    }

    /// Returns a scalar. Flags read as `0.0`/`1.0`.
    pub fn float(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            ParamValue::Float(v) => Some(v),
            ParamValue::Flag(b) => Some(if b { 1.0 } else { 0.0 }),
            ParamValue::Color(_) => None,
        }
    }

    /// Returns a color decoded to linear space.
    pub fn color(&self, key: &str) -> Option<LinearRgba> {
        match self.get(key)? {
            ParamValue::Color(hex) => Some(LinearRgba::from_hex(hex)),
            _ => None,
        }
    }

    /// Returns a toggle.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            ParamValue::Flag(b) => Some(b),
            _ => None,
        }
    }

    /// Copies every entry of `other` over this set.
    pub fn merge(&mut self, other: &ParamSet) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Something that can export and re-apply its tunable parameters.
pub trait Tunable {
    /// Snapshot of the current parameters.
    fn params(&self) -> ParamSet;

    /// Applies every recognised entry of `params`.
    fn apply_params(&mut self, params: &ParamSet);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters_reject_mismatched_kinds() {
        let params = ParamSet::new()
            .with("intensity", ParamValue::Float(2.0))
            .with("color", ParamValue::Color(0xff0000))
            .with("cast_shadow", ParamValue::Flag(true));

        assert_eq!(params.float("intensity"), Some(2.0));
        assert_eq!(params.float("cast_shadow"), Some(1.0));
        assert_eq!(params.float("color"), None);
        assert_eq!(params.flag("intensity"), None);
        assert!(params.color("color").is_some());
    }

    #[test]
    fn test_merge_overwrites_existing_keys() {
        let mut base = ParamSet::new().with("a", ParamValue::Float(1.0));
        base.merge(
            &ParamSet::new()
                .with("a", ParamValue::Float(5.0))
                .with("b", ParamValue::Flag(false)),
        );
        assert_eq!(base.float("a"), Some(5.0));
        assert_eq!(base.len(), 2);
    }
}
