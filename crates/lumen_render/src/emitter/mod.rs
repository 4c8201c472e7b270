//! Light emitters
//!
//! An emitter is either standalone (point light), surface-bound (area
//! light reached through its owning shape), or the single allowed
//! environment emitter representing the scene background.
//!
//! `sample_direction` returns the sampled geometry together with an
//! importance weight: the emitted radiance already divided by the
//! solid-angle density of the sample. The scene folds the discrete
//! light-selection probability into both (chain rule for mixture
//! sampling).

mod area;
mod environment;
mod point;

pub use area::AreaEmitter;
pub use environment::ConstantEmitter;
pub use point::PointEmitter;

use bitflags::bitflags;

use crate::foundation::math::{Aabb, Spectrum, Vec3};
use crate::interaction::{DirectionSample, Interaction};
use crate::object::SceneElement;
use crate::ray::Ray3;

bitflags! {
    /// Classification bits for emitters
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EmitterFlags: u32 {
        /// Emission from a Dirac-delta position (point lights)
        const DELTA_POSITION = 1 << 0;
        /// Bound to a surface; reached via the owning shape, never listed
        /// at the top level
        const SURFACE = 1 << 1;
        /// Emission arrives from infinitely far away
        const INFINITE = 1 << 2;
        /// The scene background; at most one per scene
        const ENVIRONMENT = 1 << 3;
    }
}

/// A light source
pub trait Emitter: SceneElement {
    /// Classification flags
    fn flags(&self) -> EmitterFlags;

    /// Whether this emitter represents the scene background
    fn is_environment(&self) -> bool {
        self.flags().contains(EmitterFlags::ENVIRONMENT)
    }

    /// Inform the emitter of the scene bounds.
    ///
    /// Called after the acceleration backend exists, and again on every
    /// parameter-change notification; environment emitters derive their
    /// effective radius from it.
    fn set_scene_bounds(&self, bounds: Aabb) {
        let _ = bounds;
    }

    /// Sample a ray leaving the emitter, with importance weight.
    ///
    /// `u1` re-stratifies the discrete selection residual, `u2` samples
    /// the emission position, and `u3` the emission direction.
    fn sample_ray(&self, time: f32, u1: f32, u2: [f32; 2], u3: [f32; 2]) -> (Ray3, Spectrum);

    /// Sample a direction from `it` toward the emitter.
    ///
    /// Returns the sample and the emitted radiance divided by the sample's
    /// solid-angle density. A zero-pdf sample means the attempt failed
    /// (e.g. the back side of an area light was chosen).
    fn sample_direction(&self, it: &Interaction, u: [f32; 2]) -> (DirectionSample, Spectrum);

    /// Solid-angle density of producing `ds` from `it`.
    ///
    /// Zero for delta emitters, which cannot be reached by chance.
    fn pdf_direction(&self, it: &Interaction, ds: &DirectionSample) -> f32;

    /// Emitted radiance along an existing direction sample
    fn eval_direction(&self, it: &Interaction, ds: &DirectionSample) -> Spectrum;

    /// Radiance carried by an escaped ray travelling along `d`.
    ///
    /// Non-zero only for environment emitters.
    fn eval_escape(&self, d: Vec3) -> Spectrum {
        let _ = d;
        Spectrum::zeros()
    }
}
