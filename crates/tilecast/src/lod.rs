//! Per-frame level-of-detail ray-cone scale.

use crate::mapping::CameraMapping;

/// Squared ray-cone scale for one frame.
///
/// Derived from the horizontal divergence of the mapping: the source and
/// target quad widths span a triangle whose apex angle recovers the
/// effective horizontal field of view, divided down to the angle one pixel
/// column subtends. The returned value is the traversal contract: a voxel
/// of edge `q` at squared distance `d²` stops subdividing once
/// `q² · scale² ≤ d²` (it no longer spans a pixel).
///
/// Computed once per frame, not per pixel. `screen_width` must be nonzero.
pub fn ray_cone_scale2(mapping: &CameraMapping, screen_width: u32) -> f32 {
    debug_assert!(screen_width > 0);

    let source_width = mapping.source.max_width();
    let target_width = mapping.target.max_width();
    let triangle_height = target_width - source_width;

    let center = mapping.uv_to_ray(0.0, 0.0);
    let triangle_base = (center.target - center.source).length();

    let horizontal_fov = (triangle_height / triangle_base).atan();
    let pixel_angle = horizontal_fov / screen_width as f32;
    let ray_scale = 1.0 / (2.0 * (pixel_angle * 0.5).tan());
    ray_scale * ray_scale
}
