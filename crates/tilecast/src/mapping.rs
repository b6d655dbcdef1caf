//! Frustum-corner camera mapping: two ordered quads (near "source", far
//! "target") and bilinear uv→ray interpolation between them.

use crate::camera::Frustum;
use glam::Vec3;
use thiserror::Error;

/// Tolerance when matching observed corner positions against the analytic
/// plane positions. Generous enough for providers that recompute corners in
/// single precision, far below any sane frustum extent.
const MATCH_EPSILON: f32 = 1e-3;

/// Corner-table construction failures. All of these mean the reference
/// frustum is geometrically degenerate (zero width, height or depth); no
/// valid sign assignment exists and the caller must not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("degenerate frustum: corners {first} and {second} coincide")]
    CoincidentCorners { first: usize, second: usize },
    #[error("degenerate frustum: no corner matches sign triple ({x:+}, {y:+}, {z:+})")]
    UnmatchedSign { x: i32, y: i32, z: i32 },
    #[error("degenerate frustum: corner {corner} matches more than one sign triple")]
    AmbiguousCorner { corner: usize },
}

/// Four ordered 3-D corner points used for bilinear ray construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub top_left: Vec3,
    pub top_right: Vec3,
    pub bottom_right: Vec3,
    pub bottom_left: Vec3,
}

impl Quad {
    /// Bilinear interpolation over the quad with `u,v` in `[0, 1]`:
    /// (0,0) is `top_left`, (1,0) `top_right`, (0,1) `bottom_left`,
    /// (1,1) `bottom_right`.
    pub fn bilinear(&self, u: f32, v: f32) -> Vec3 {
        let p = self.top_left + (self.top_right - self.top_left) * u;
        let q = self.bottom_left + (self.bottom_right - self.bottom_left) * u;
        p + (q - p) * v
    }

    /// Longer of the two horizontal edges. The LOD estimator uses this as
    /// the quad's effective width.
    pub fn max_width(&self) -> f32 {
        let top = (self.top_right - self.top_left).length();
        let bottom = (self.bottom_right - self.bottom_left).length();
        top.max(bottom)
    }
}

/// A view ray as its near/far plane intersections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub source: Vec3,
    pub target: Vec3,
}

impl Ray {
    /// Unit direction from the near point toward the far point.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        (self.target - self.source).normalize()
    }
}

/// Fixed bijection from sign triples `(x,y,z)` in `{-1,+1}³` (x =
/// left/right, y = bottom/top, z = near/far) to indices into a provider's
/// 8-corner array.
///
/// Built once from a non-degenerate reference frustum by matching each of
/// its enumerated corners against the analytically known plane position for
/// every sign combination, then reused for every later mapping. Construct
/// it explicitly at startup and pass it by reference; it is constant for
/// the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CornerTable {
    index: [usize; 8],
}

impl CornerTable {
    /// Builds the table from a reference frustum.
    pub fn new(reference: &Frustum) -> Result<Self, MappingError> {
        let corners = reference.corner_points();
        let mut index = [usize::MAX; 8];
        let mut claimed = [false; 8];

        for &x in &[-1i32, 1] {
            for &y in &[-1i32, 1] {
                for &z in &[-1i32, 1] {
                    let expected = if z < 0 {
                        reference.near_plane_pos(x as f32, y as f32)
                    } else {
                        reference.far_plane_pos(x as f32, y as f32)
                    };

                    let mut found = None;
                    for (corner, &position) in corners.iter().enumerate() {
                        if (position - expected).abs().max_element() <= MATCH_EPSILON {
                            if let Some(first) = found {
                                return Err(MappingError::CoincidentCorners {
                                    first,
                                    second: corner,
                                });
                            }
                            found = Some(corner);
                        }
                    }

                    let corner = found.ok_or(MappingError::UnmatchedSign { x, y, z })?;
                    if claimed[corner] {
                        return Err(MappingError::AmbiguousCorner { corner });
                    }
                    claimed[corner] = true;
                    index[Self::slot(x, y, z)] = corner;
                }
            }
        }

        Ok(Self { index })
    }

    /// Builds the table from the crate's canonical reference frustum.
    pub fn canonical() -> Result<Self, MappingError> {
        Self::new(&Frustum::reference())
    }

    /// Corner-array index for a sign triple; each component must be −1 or +1.
    #[inline]
    pub fn corner_index(&self, x: i32, y: i32, z: i32) -> usize {
        debug_assert!(x == -1 || x == 1);
        debug_assert!(y == -1 || y == 1);
        debug_assert!(z == -1 || z == 1);
        self.index[Self::slot(x, y, z)]
    }

    #[inline]
    fn slot(x: i32, y: i32, z: i32) -> usize {
        (((x > 0) as usize) << 2) | (((y > 0) as usize) << 1) | ((z > 0) as usize)
    }
}

/// Per-frame ray-generation geometry: the near-plane `source` quad and the
/// far-plane `target` quad, both ordered top-left, top-right, bottom-right,
/// bottom-left. Built once per frame from the camera's 8 corner points and
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMapping {
    pub source: Quad,
    pub target: Quad,
}

impl CameraMapping {
    /// Assembles the mapping from a provider's 8 corner points using a
    /// previously built corner table. The corner at sign `(x, y, -1)`
    /// becomes the near-plane corner at `(x, y)`, the one at `(x, y, +1)`
    /// the far-plane corner at the same position.
    pub fn from_corners(corners: &[Vec3; 8], table: &CornerTable) -> Self {
        let corner = |x: i32, y: i32, z: i32| corners[table.corner_index(x, y, z)];
        Self {
            source: Quad {
                top_left: corner(-1, 1, -1),
                top_right: corner(1, 1, -1),
                bottom_right: corner(1, -1, -1),
                bottom_left: corner(-1, -1, -1),
            },
            target: Quad {
                top_left: corner(-1, 1, 1),
                top_right: corner(1, 1, 1),
                bottom_right: corner(1, -1, 1),
                bottom_left: corner(-1, -1, 1),
            },
        }
    }

    /// Convenience over [`CameraMapping::from_corners`] for the in-repo
    /// frustum provider.
    pub fn from_frustum(frustum: &Frustum, table: &CornerTable) -> Self {
        Self::from_corners(&frustum.corner_points(), table)
    }

    /// Ray for screen coordinates `u,v` in `[-1, 1]`, (0,0) at the screen
    /// center, (−1,−1) at the bottom-left corner pair and (+1,+1) at the
    /// top-right. `u` remaps as `(u+1)/2`; `v` remaps as `(1−v)/2`, which
    /// inverts the axis so positive `v` selects the top of the quads.
    pub fn uv_to_ray(&self, u: f32, v: f32) -> Ray {
        let u01 = (u + 1.0) * 0.5;
        let v01 = (1.0 - v) * 0.5;
        Ray {
            source: self.source.bilinear(u01, v01),
            target: self.target.bilinear(u01, v01),
        }
    }
}
