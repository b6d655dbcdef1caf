//! Seams to the external voxel traversal primitive and the pluggable
//! pixel-visualization policy.

use glam::Vec3;

/// Result of marching a single ray through the voxel scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchSample {
    /// Whether the ray reached a surface.
    pub hit: bool,
    /// Surface normal at the hit point; unspecified on a miss.
    pub normal: Vec3,
    /// Distance from the ray origin to the hit; unspecified on a miss.
    pub distance: f32,
    /// Deepest tree level visited.
    pub levels: u32,
    /// Traversal iterations spent on this ray.
    pub iterations: u32,
}

impl MarchSample {
    /// A no-hit sample carrying only the iteration count.
    pub fn miss(iterations: u32) -> Self {
        Self {
            hit: false,
            normal: Vec3::ZERO,
            distance: 0.0,
            levels: 0,
            iterations,
        }
    }
}

/// The external voxel traversal primitive.
///
/// Implementations hold whatever resident scene data they need (address
/// space, root offset); the scheduler treats them as opaque and pure. The
/// `cone_scale2` argument is the squared ray-cone scale from
/// [`ray_cone_scale2`](crate::lod::ray_cone_scale2): a voxel of edge `q` at
/// squared distance `d²` stops subdividing once `q² · cone_scale2 ≤ d²`.
/// Internal traversal failures must degrade to a miss sample, never panic;
/// a tile is never aborted by its scene.
pub trait VoxelMarcher: Sync {
    fn march(&self, origin: Vec3, direction: Vec3, cone_scale2: f32) -> MarchSample;
}

/// Maps one traversal sample to an RGBA pixel.
pub trait PixelShader: Sync {
    fn shade(&self, sample: &MarchSample) -> [f32; 4];
}

/// Reference debug policy: iteration count (scaled by 1/30) on the red
/// channel, green and blue zero, alpha fixed at 0.9, for hits and misses
/// alike.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterationHeat;

impl PixelShader for IterationHeat {
    fn shade(&self, sample: &MarchSample) -> [f32; 4] {
        [sample.iterations as f32 / 30.0, 0.0, 0.0, 0.9]
    }
}

/// Debug policy mapping the hit normal from `[-1,1]` into RGB; misses are
/// opaque black.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalShade;

impl PixelShader for NormalShade {
    fn shade(&self, sample: &MarchSample) -> [f32; 4] {
        if sample.hit {
            let n = sample.normal * 0.5 + Vec3::splat(0.5);
            [n.x, n.y, n.z, 1.0]
        } else {
            [0.0, 0.0, 0.0, 1.0]
        }
    }
}
