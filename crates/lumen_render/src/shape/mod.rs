//! Geometry instances
//!
//! Shapes are the polymorphic geometry objects aggregated by the scene.
//! A shape may carry an attached emitter or sensor (surface-bound lights
//! and cameras are discovered through their geometry), and instancing
//! containers group member shapes that only the acceleration backend
//! resolves.

mod group;
mod sphere;

pub use group::ShapeGroup;
pub use sphere::{emissive_sphere, Sphere};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::emitter::Emitter;
use crate::foundation::math::{Aabb, Vec2};
use crate::interaction::{PositionSample, PreliminaryIntersection, SurfaceInteraction};
use crate::object::SceneElement;
use crate::ray::{Ray3, RayFlags};
use crate::sensor::Sensor;

/// Per-instance bookkeeping shared by every shape implementation.
///
/// The dirty flag marks parameter edits that invalidate the acceleration
/// backend; the gradient flag marks instances participating in
/// differentiable re-optimization. Both use interior mutability because
/// shapes are shared with the backend behind `Arc`.
#[derive(Debug, Default)]
pub struct InstanceState {
    dirty: AtomicBool,
    grad_enabled: AtomicBool,
}

impl InstanceState {
    /// Fresh state: clean, gradients disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag the instance as edited since the last backend rebuild
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Whether the instance is currently flagged dirty
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Read the dirty flag and clear it in one step.
    ///
    /// The change-propagation pass consumes each edit exactly once.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Enable or disable gradient tracking for this instance
    pub fn set_grad_enabled(&self, enabled: bool) {
        self.grad_enabled.store(enabled, Ordering::Release);
    }

    /// Whether any parameter of this instance tracks gradients
    pub fn grad_enabled(&self) -> bool {
        self.grad_enabled.load(Ordering::Acquire)
    }
}

/// A geometry instance.
///
/// Capability queries ([`emitter`](Shape::emitter),
/// [`sensor`](Shape::sensor), [`is_group`](Shape::is_group)) replace
/// runtime type tests during scene classification.
pub trait Shape: SceneElement {
    /// World-space bounds of this shape
    fn bbox(&self) -> Aabb;

    /// Total surface area
    fn surface_area(&self) -> f32;

    /// The emitter attached to this surface, if any
    fn emitter(&self) -> Option<Arc<dyn Emitter>> {
        None
    }

    /// The sensor attached to this surface, if any
    fn sensor(&self) -> Option<Arc<dyn Sensor>> {
        None
    }

    /// Whether this shape is an instancing container
    fn is_group(&self) -> bool {
        false
    }

    /// Member shapes of an instancing container (empty otherwise)
    fn group_members(&self) -> Vec<Arc<dyn Shape>> {
        Vec::new()
    }

    /// Find the nearest intersection with `ray`, if any.
    ///
    /// Returns the hit distance and surface parameterization; the full
    /// interaction is computed separately via
    /// [`compute_surface_interaction`](Shape::compute_surface_interaction).
    fn intersect_preliminary(&self, ray: &Ray3) -> Option<(f32, Vec2)>;

    /// Whether `ray` hits the shape at all (occlusion test)
    fn intersect_test(&self, ray: &Ray3) -> bool {
        self.intersect_preliminary(ray).is_some()
    }

    /// Expand a preliminary hit into a full surface interaction.
    ///
    /// `flags` controls which optional fields are computed. The
    /// `shape_index` of the result is copied from `prelim`.
    fn compute_surface_interaction(
        &self,
        ray: &Ray3,
        prelim: &PreliminaryIntersection,
        flags: RayFlags,
    ) -> SurfaceInteraction;

    /// Sample a point on the surface with uniform area density
    fn sample_position(&self, u: [f32; 2]) -> PositionSample;

    /// Density of [`sample_position`](Shape::sample_position) with
    /// respect to surface area
    fn pdf_position(&self) -> f32 {
        1.0 / self.surface_area()
    }

    /// Per-instance dirty/gradient bookkeeping
    fn state(&self) -> &InstanceState;
}
