//! Math utilities and types
//!
//! Provides the fundamental math types used throughout the renderer.

pub use nalgebra::{Matrix3, Matrix4, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// RGB radiance/importance value.
///
/// The renderer carries light as an RGB triple; a spectral color model is
/// explicitly out of scope.
pub type Spectrum = Vec3;

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Point3,
    /// Maximum corner of the bounding box
    pub max: Point3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (invalid) AABB that expands from nothing
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Create an AABB centered at a point with given half-extents
    pub fn from_center_extents(center: Point3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Whether the box encloses a non-degenerate region
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Get the half-extents of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Get the full side lengths of the AABB
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Largest full side length
    pub fn max_extent(&self) -> f32 {
        let s = self.size();
        s.x.max(s.y).max(s.z)
    }

    /// Radius of the sphere circumscribing the box
    pub fn bounding_radius(&self) -> f32 {
        self.extents().norm()
    }

    /// Grow this AABB to enclose another
    pub fn expand(&mut self, other: &Aabb) {
        self.min = Point3::new(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.min.z.min(other.min.z),
        );
        self.max = Point3::new(
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
            self.max.z.max(other.max.z),
        );
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Point3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Test ray intersection with this AABB using the slab method.
    ///
    /// Returns the distance to the entry point if the ray segment
    /// `[t_min, t_max]` overlaps the box, `None` otherwise.
    pub fn intersect_ray(&self, origin: Point3, dir: Vec3, t_min: f32, t_max: f32) -> Option<f32> {
        let inv_dir = Vec3::new(
            if dir.x != 0.0 { 1.0 / dir.x } else { f32::INFINITY },
            if dir.y != 0.0 { 1.0 / dir.y } else { f32::INFINITY },
            if dir.z != 0.0 { 1.0 / dir.z } else { f32::INFINITY },
        );

        let t1 = (self.min.x - origin.x) * inv_dir.x;
        let t2 = (self.max.x - origin.x) * inv_dir.x;
        let t3 = (self.min.y - origin.y) * inv_dir.y;
        let t4 = (self.max.y - origin.y) * inv_dir.y;
        let t5 = (self.min.z - origin.z) * inv_dir.z;
        let t6 = (self.max.z - origin.z) * inv_dir.z;

        let entry = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let exit = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if exit >= entry && exit >= t_min && entry <= t_max {
            Some(entry.max(t_min))
        } else {
            None
        }
    }
}

/// Build an orthonormal basis around a unit normal.
///
/// Returns two tangent vectors completing `n` into a right-handed frame.
/// Duff et al. branchless construction.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = 1.0_f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let t = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bt = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (t, bt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_contains_point() {
        let aabb = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));

        assert!(aabb.contains_point(Point3::origin()));
        assert!(aabb.contains_point(Point3::new(0.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Point3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_intersects() {
        let aabb1 = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
        let aabb2 = Aabb::new(Point3::new(1.0, 1.0, 1.0), Point3::new(3.0, 3.0, 3.0));
        let aabb3 = Aabb::new(Point3::new(5.0, 5.0, 5.0), Point3::new(7.0, 7.0, 7.0));

        assert!(aabb1.intersects(&aabb2));
        assert!(!aabb1.intersects(&aabb3));
    }

    #[test]
    fn test_aabb_expand_from_empty() {
        let mut aabb = Aabb::empty();
        assert!(!aabb.is_valid());

        aabb.expand(&Aabb::new(
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
        ));
        aabb.expand(&Aabb::new(
            Point3::new(0.0, -2.0, 0.0),
            Point3::new(0.5, 0.5, 3.0),
        ));

        assert!(aabb.is_valid());
        assert_relative_eq!(aabb.min.x, -1.0);
        assert_relative_eq!(aabb.min.y, -2.0);
        assert_relative_eq!(aabb.max.z, 3.0);
    }

    #[test]
    fn test_aabb_ray_slab() {
        let aabb = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));

        // Ray pointing at the box from outside
        let hit = aabb.intersect_ray(
            Point3::new(0.0, 0.0, -5.0),
            Vec3::new(0.0, 0.0, 1.0),
            0.0,
            f32::INFINITY,
        );
        assert_relative_eq!(hit.unwrap(), 4.0);

        // Ray pointing away
        assert!(aabb
            .intersect_ray(
                Point3::new(0.0, 0.0, -5.0),
                Vec3::new(0.0, 0.0, -1.0),
                0.0,
                f32::INFINITY,
            )
            .is_none());

        // Segment too short to reach the box
        assert!(aabb
            .intersect_ray(
                Point3::new(0.0, 0.0, -5.0),
                Vec3::new(0.0, 0.0, 1.0),
                0.0,
                2.0,
            )
            .is_none());
    }

    #[test]
    fn test_orthonormal_basis() {
        for n in [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(1.0, 2.0, -0.5).normalize(),
        ] {
            let (t, b) = orthonormal_basis(n);
            assert_relative_eq!(t.dot(&n), 0.0, epsilon = 1e-6);
            assert_relative_eq!(b.dot(&n), 0.0, epsilon = 1e-6);
            assert_relative_eq!(t.dot(&b), 0.0, epsilon = 1e-6);
            assert_relative_eq!(t.norm(), 1.0, epsilon = 1e-6);
        }
    }
}
