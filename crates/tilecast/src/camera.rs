use glam::Vec3;

/// A camera view frustum: the truncated pyramid between the near and far
/// planes, described by an orthonormal basis plus field-of-view parameters.
///
/// This is the reference corner provider for this crate. Any provider works
/// as long as it enumerates the same 8 corners consistently; the
/// [`CornerTable`](crate::mapping::CornerTable) discovers the enumeration
/// order once and reuses it for every later frame.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Apex of the pyramid (camera position).
    pub position: Vec3,
    /// Unit view direction.
    pub front: Vec3,
    /// Unit up vector, orthogonal to `front`.
    pub up: Vec3,
    /// Distance to the near plane along `front`.
    pub near: f32,
    /// Distance to the far plane along `front`.
    pub far: f32,
    /// Full horizontal field of view (radians).
    pub horizontal_fov: f32,
    /// Viewport width / height.
    pub aspect: f32,
}

impl Frustum {
    /// Creates a frustum, normalizing `front` and re-orthogonalizing `up`
    /// against it. Geometric validity (positive depth, nonzero FOV) is not
    /// checked here; degenerate frustums surface as corner-table
    /// construction errors.
    pub fn new(
        position: Vec3,
        front: Vec3,
        up: Vec3,
        near: f32,
        far: f32,
        horizontal_fov: f32,
        aspect: f32,
    ) -> Self {
        let front = front.normalize();
        let up = (up - front * up.dot(front)).normalize();
        Self {
            position,
            front,
            up,
            near,
            far,
            horizontal_fov,
            aspect,
        }
    }

    /// The canonical reference frustum used to build the process-wide corner
    /// table. Its exact pose is irrelevant; it only has to be non-degenerate.
    pub fn reference() -> Self {
        Self::new(
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::Y,
            20.0,
            250.0,
            1.0,
            1.0,
        )
    }

    /// Right-handed basis third axis (camera right in world space).
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up)
    }

    /// Position on the plane at distance `d` for normalized plane
    /// coordinates `x,y` in `[-1, 1]` (x = left/right, y = bottom/top).
    fn plane_pos(&self, d: f32, x: f32, y: f32) -> Vec3 {
        let half_w = d * (self.horizontal_fov * 0.5).tan();
        let half_h = half_w / self.aspect;
        self.position + self.front * d + self.right() * (x * half_w) + self.up * (y * half_h)
    }

    /// Near-plane position for signs `x,y` in `[-1, 1]`.
    #[inline]
    pub fn near_plane_pos(&self, x: f32, y: f32) -> Vec3 {
        self.plane_pos(self.near, x, y)
    }

    /// Far-plane position for signs `x,y` in `[-1, 1]`.
    #[inline]
    pub fn far_plane_pos(&self, x: f32, y: f32) -> Vec3 {
        self.plane_pos(self.far, x, y)
    }

    /// The 8 frustum corners in this provider's enumeration order: index
    /// `0b(x)(y)(z)` where bit 2 is the x sign, bit 1 the y sign, and bit 0
    /// selects the plane (0 = near, 1 = far); bit value 0 means −1, 1 means
    /// +1.
    pub fn corner_points(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::ZERO; 8];
        for (index, corner) in corners.iter_mut().enumerate() {
            let x = if index & 0b100 != 0 { 1.0 } else { -1.0 };
            let y = if index & 0b010 != 0 { 1.0 } else { -1.0 };
            let d = if index & 0b001 != 0 {
                self.far
            } else {
                self.near
            };
            *corner = self.plane_pos(d, x, y);
        }
        corners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_is_orthonormal() {
        let f = Frustum::reference();
        assert!((f.front.length() - 1.0).abs() < 1e-6);
        assert!((f.up.length() - 1.0).abs() < 1e-6);
        assert!(f.front.dot(f.up).abs() < 1e-6);
        assert!((f.right().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_corner_enumeration_matches_plane_positions() {
        let f = Frustum::reference();
        let corners = f.corner_points();
        assert_eq!(corners[0b000], f.near_plane_pos(-1.0, -1.0));
        assert_eq!(corners[0b001], f.far_plane_pos(-1.0, -1.0));
        assert_eq!(corners[0b010], f.near_plane_pos(-1.0, 1.0));
        assert_eq!(corners[0b110], f.near_plane_pos(1.0, 1.0));
        assert_eq!(corners[0b111], f.far_plane_pos(1.0, 1.0));
    }

    #[test]
    fn test_plane_extents_follow_fov_and_aspect() {
        let f = Frustum::new(
            Vec3::ZERO,
            Vec3::Z,
            Vec3::Y,
            1.0,
            100.0,
            std::f32::consts::FRAC_PI_2,
            2.0,
        );
        // At 90 degrees the half-width equals the plane distance.
        let right_edge = f.near_plane_pos(1.0, 0.0);
        assert!((right_edge - f.position - f.front).cross(f.right()).length() < 1e-5);
        assert!(((right_edge - (f.position + f.front)).length() - 1.0).abs() < 1e-5);
        // Aspect 2 halves the vertical extent.
        let top_edge = f.near_plane_pos(0.0, 1.0);
        assert!(((top_edge - (f.position + f.front)).length() - 0.5).abs() < 1e-5);
    }
}
