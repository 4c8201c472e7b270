//! Ray type and query flags

use bitflags::bitflags;

use crate::foundation::math::{Point3, Vec3};

/// Offset applied when spawning rays from a surface to dodge
/// self-intersection caused by floating-point placement error.
pub const RAY_EPSILON: f32 = 1e-4;

/// Fraction of the segment length shadow rays are shortened by, so the
/// target surface itself never registers as an occluder.
pub const SHADOW_EPSILON: f32 = 1e-3;

bitflags! {
    /// Controls how much of a surface interaction is computed for a hit.
    ///
    /// Backends may skip work for fields the caller does not request; the
    /// hit position and distance are always valid.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RayFlags: u32 {
        /// Hit distance, position, and geometric normal only
        const MINIMAL = 1 << 0;
        /// Surface parameterization (uv coordinates)
        const UV = 1 << 1;
        /// Interpolated shading frame
        const SHADING_FRAME = 1 << 2;
        /// Everything
        const ALL = Self::MINIMAL.bits() | Self::UV.bits() | Self::SHADING_FRAME.bits();
    }
}

/// A ray segment in world space.
///
/// Queries consider hits with distance in `[t_min, t_max]`. The direction
/// is not required to be normalized, but every constructor in this crate
/// produces normalized directions and the interaction records assume it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3 {
    /// Ray origin
    pub origin: Point3,
    /// Ray direction
    pub dir: Vec3,
    /// Minimum hit distance
    pub t_min: f32,
    /// Maximum hit distance
    pub t_max: f32,
    /// Time value associated with the ray (for motion sampling)
    pub time: f32,
}

impl Ray3 {
    /// Create an unbounded ray
    pub fn new(origin: Point3, dir: Vec3) -> Self {
        Self {
            origin,
            dir,
            t_min: 0.0,
            t_max: f32::INFINITY,
            time: 0.0,
        }
    }

    /// Create a ray limited to a maximum distance
    pub fn new_bounded(origin: Point3, dir: Vec3, t_max: f32) -> Self {
        Self {
            origin,
            dir,
            t_min: 0.0,
            t_max,
            time: 0.0,
        }
    }

    /// Set the time value
    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    /// Point reached after travelling distance `t`
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + self.dir * t
    }
}

impl Default for Ray3 {
    fn default() -> Self {
        Self::new(Point3::origin(), Vec3::new(0.0, 0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_at() {
        let ray = Ray3::new(Point3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        let p = ray.at(2.5);
        assert_relative_eq!(p.y, 2.5);
        assert_relative_eq!(p.x, 1.0);
    }

    #[test]
    fn test_ray_flags_all() {
        assert!(RayFlags::ALL.contains(RayFlags::UV));
        assert!(RayFlags::ALL.contains(RayFlags::SHADING_FRAME));
        assert!(!RayFlags::MINIMAL.contains(RayFlags::UV));
    }
}
