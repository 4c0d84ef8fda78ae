//! Build-time configuration.

use serde::{Deserialize, Serialize};

use crate::error::{OctreeError, Result};
use rayoct_math::Real;

/// Largest supported grid resolution (cells per axis).
pub const MAX_RESOLUTION: u32 = 512;

/// Default grid resolution (cells per axis).
pub const DEFAULT_RESOLUTION: u32 = 64;

/// Octree construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeSettings {
    /// Cells per axis. Clamped to `1..=512` at creation.
    pub resolution: u32,
    /// Expected number of faces, used to pre-size the arenas.
    pub face_count_hint: usize,
    /// Distance the world box is grown on every side before gridding.
    pub bounds_padding: Real,
    /// Hard limit on branch records.
    pub max_branches: usize,
    /// Hard limit on node records.
    pub max_nodes: usize,
}

impl Default for OctreeSettings {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            face_count_hint: 0,
            bounds_padding: 0.01,
            max_branches: 1024 * 4096,
            max_nodes: 4096 * 4096,
        }
    }
}

impl OctreeSettings {
    /// Settings with the given resolution and defaults elsewhere.
    pub fn with_resolution(resolution: u32) -> Self {
        Self {
            resolution,
            ..Self::default()
        }
    }

    /// Resolution after clamping to the supported range.
    pub fn clamped_resolution(&self) -> u32 {
        self.resolution.clamp(1, MAX_RESOLUTION)
    }

    /// Check values that would make construction meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_branches == 0 || self.max_nodes == 0 {
            return Err(OctreeError::InvalidSettings(
                "pool capacities must be non-zero".into(),
            ));
        }
        if !self.bounds_padding.is_finite() || self.bounds_padding < 0.0 {
            return Err(OctreeError::InvalidSettings(format!(
                "bounds padding must be finite and non-negative, got {}",
                self.bounds_padding
            )));
        }
        Ok(())
    }
}
