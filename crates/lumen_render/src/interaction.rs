//! Hit records and sampling records exchanged between the scene, the
//! acceleration backends, and the emitters.
//!
//! Queries never use a side error channel: a miss or an invalidated
//! sample is encoded in-band (infinite distance, zero pdf, sentinel
//! index), so batched callers keep a uniform shape.

use crate::foundation::math::{Point3, Vec2, Vec3};
use crate::ray::{Ray3, RAY_EPSILON, SHADOW_EPSILON};

/// Sentinel index marking "no shape" / "no emitter" in hit and sample
/// records.
pub const INVALID_INDEX: u32 = u32::MAX;

/// Lightweight hit record produced by the acceleration backend.
///
/// Holds just enough to decide hit/miss and to defer the full surface
/// interaction computation to the owning shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreliminaryIntersection {
    /// Hit distance along the ray, infinite on miss
    pub t: f32,
    /// Surface parameterization at the hit
    pub uv: Vec2,
    /// Index of the hit shape in the backend's flat shape list
    pub shape_index: u32,
}

impl PreliminaryIntersection {
    /// The canonical miss record
    pub fn invalid() -> Self {
        Self {
            t: f32::INFINITY,
            uv: Vec2::zeros(),
            shape_index: INVALID_INDEX,
        }
    }

    /// Whether the record describes an actual hit
    pub fn is_valid(&self) -> bool {
        self.t.is_finite()
    }
}

impl Default for PreliminaryIntersection {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Fully-evaluated surface interaction returned by nearest-hit queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInteraction {
    /// Hit distance along the ray, infinite on miss
    pub t: f32,
    /// Hit position in world space
    pub p: Point3,
    /// Geometric normal (unit length, outward facing)
    pub n: Vec3,
    /// Surface parameterization at the hit
    pub uv: Vec2,
    /// Direction toward the ray origin (unit length)
    pub wi: Vec3,
    /// Time value propagated from the query ray
    pub time: f32,
    /// Index of the hit shape in the backend's flat shape list
    pub shape_index: u32,
}

impl SurfaceInteraction {
    /// The canonical miss record
    pub fn invalid() -> Self {
        Self {
            t: f32::INFINITY,
            p: Point3::origin(),
            n: Vec3::zeros(),
            uv: Vec2::zeros(),
            wi: Vec3::zeros(),
            time: 0.0,
            shape_index: INVALID_INDEX,
        }
    }

    /// Whether the record describes an actual hit
    pub fn is_valid(&self) -> bool {
        self.t.is_finite()
    }

    /// Reduce to a plain reference point for follow-up sampling
    pub fn as_reference(&self) -> Interaction {
        Interaction {
            p: self.p,
            n: self.n,
            time: self.time,
        }
    }
}

impl Default for SurfaceInteraction {
    fn default() -> Self {
        Self::invalid()
    }
}

/// A reference point on (or off) a surface, used as the origin of
/// next-event-estimation queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    /// Position in world space
    pub p: Point3,
    /// Geometric normal; zero for points not on a surface
    pub n: Vec3,
    /// Associated time value
    pub time: f32,
}

impl Interaction {
    /// Create a reference point with no surface normal
    pub fn from_point(p: Point3) -> Self {
        Self {
            p,
            n: Vec3::zeros(),
            time: 0.0,
        }
    }

    /// Spawn a shadow ray from this point toward `target`.
    ///
    /// The origin is nudged along the normal and the segment shortened so
    /// neither endpoint's surface reports a spurious occlusion.
    pub fn spawn_ray_to(&self, target: Point3) -> Ray3 {
        let to_target = target - self.p;
        let dist = to_target.norm();
        let dir = to_target / dist;
        let offset = if self.n.dot(&dir) >= 0.0 {
            self.n * RAY_EPSILON
        } else {
            -self.n * RAY_EPSILON
        };
        let mut ray = Ray3::new_bounded(self.p + offset, dir, dist * (1.0 - SHADOW_EPSILON));
        ray.time = self.time;
        ray
    }
}

/// A sampled position on a shape's surface (area density)
#[derive(Debug, Clone, Copy)]
pub struct PositionSample {
    /// Sampled position
    pub p: Point3,
    /// Surface normal at the sample
    pub n: Vec3,
    /// Density with respect to surface area
    pub pdf: f32,
}

/// A sampled direction toward an emitter, plus enough geometry to
/// re-evaluate or re-weight the sample later.
#[derive(Debug, Clone, Copy)]
pub struct DirectionSample {
    /// Sampled position on the emitter (or a far point for environment
    /// emitters)
    pub p: Point3,
    /// Emitter surface normal at the sample, zero when meaningless
    pub n: Vec3,
    /// Unit direction from the reference point toward the sample
    pub d: Vec3,
    /// Distance from the reference point to the sample
    pub dist: f32,
    /// Density with respect to solid angle at the reference point,
    /// including any discrete selection probability folded in by the scene
    pub pdf: f32,
    /// Whether the sample stems from a Dirac-delta distribution
    pub delta: bool,
    /// Index of the emitter that produced the sample, in the scene's
    /// emitter list
    pub emitter_index: u32,
}

impl DirectionSample {
    /// The canonical zero sample
    pub fn invalid() -> Self {
        Self {
            p: Point3::origin(),
            n: Vec3::zeros(),
            d: Vec3::zeros(),
            dist: 0.0,
            pdf: 0.0,
            delta: false,
            emitter_index: INVALID_INDEX,
        }
    }
}

impl Default for DirectionSample {
    fn default() -> Self {
        Self::invalid()
    }
}
