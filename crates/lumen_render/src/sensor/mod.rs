//! Cameras and image storage

mod film;
mod perspective;

pub use film::Film;
pub use perspective::PerspectiveSensor;

use std::sync::Arc;

use crate::foundation::math::{Aabb, Spectrum};
use crate::object::SceneElement;
use crate::ray::Ray3;

/// A camera observing the scene.
///
/// Sensors require knowledge of the scene for environment-relative
/// framing; the scene hands them its bounds once construction completes.
pub trait Sensor: SceneElement {
    /// Inform the sensor of the scene bounds
    fn set_scene_bounds(&self, bounds: Aabb) {
        let _ = bounds;
    }

    /// Generate a camera ray.
    ///
    /// `position_sample` addresses the film plane in `[0, 1)^2`
    /// (top-left origin); `aperture_sample` is reserved for lens models.
    /// Returns the ray and its importance weight.
    fn sample_ray(
        &self,
        position_sample: [f32; 2],
        aperture_sample: [f32; 2],
        time: f32,
    ) -> (Ray3, Spectrum);

    /// The output buffer this sensor renders into
    fn film(&self) -> Arc<Film>;
}
