//! Isotropic point light

use std::any::Any;

use crate::emitter::{Emitter, EmitterFlags};
use crate::foundation::math::{Point3, Spectrum};
use crate::foundation::sampling::square_to_uniform_sphere;
use crate::interaction::{DirectionSample, Interaction};
use crate::object::SceneElement;
use crate::ray::Ray3;

/// Point light radiating `intensity` uniformly in all directions.
///
/// A Dirac-delta emitter: direction samples carry pdf 1 and can never be
/// produced by chance, so `pdf_direction` and `eval_direction` are zero.
#[derive(Debug)]
pub struct PointEmitter {
    id: String,
    position: Point3,
    intensity: Spectrum,
}

impl PointEmitter {
    /// Create a point light
    pub fn new(id: impl Into<String>, position: Point3, intensity: Spectrum) -> Self {
        Self {
            id: id.into(),
            position,
            intensity,
        }
    }

    /// Light position in world space
    pub fn position(&self) -> Point3 {
        self.position
    }
}

impl SceneElement for PointEmitter {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        "point"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Emitter for PointEmitter {
    fn flags(&self) -> EmitterFlags {
        EmitterFlags::DELTA_POSITION
    }

    fn sample_ray(&self, time: f32, _u1: f32, _u2: [f32; 2], u3: [f32; 2]) -> (Ray3, Spectrum) {
        let dir = square_to_uniform_sphere(u3);
        let ray = Ray3::new(self.position, dir).with_time(time);
        // intensity / pdf, with pdf = 1 / (4 pi)
        (ray, self.intensity * 4.0 * std::f32::consts::PI)
    }

    fn sample_direction(&self, it: &Interaction, _u: [f32; 2]) -> (DirectionSample, Spectrum) {
        let to_light = self.position - it.p;
        let dist2 = to_light.norm_squared();
        if dist2 == 0.0 {
            return (DirectionSample::invalid(), Spectrum::zeros());
        }
        let dist = dist2.sqrt();

        let ds = DirectionSample {
            p: self.position,
            n: crate::foundation::math::Vec3::zeros(),
            d: to_light / dist,
            dist,
            pdf: 1.0,
            delta: true,
            emitter_index: crate::interaction::INVALID_INDEX,
        };
        (ds, self.intensity / dist2)
    }

    fn pdf_direction(&self, _it: &Interaction, _ds: &DirectionSample) -> f32 {
        0.0
    }

    fn eval_direction(&self, _it: &Interaction, _ds: &DirectionSample) -> Spectrum {
        Spectrum::zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sample_direction_inverse_square() {
        let light = PointEmitter::new("l", Point3::new(0.0, 2.0, 0.0), Spectrum::new(8.0, 8.0, 8.0));
        let it = Interaction::from_point(Point3::origin());

        let (ds, weight) = light.sample_direction(&it, [0.5, 0.5]);
        assert_relative_eq!(ds.dist, 2.0);
        assert_relative_eq!(ds.pdf, 1.0);
        assert!(ds.delta);
        assert_relative_eq!(weight.x, 2.0); // 8 / 2^2
    }

    #[test]
    fn test_delta_light_has_zero_chance_density() {
        let light = PointEmitter::new("l", Point3::origin(), Spectrum::new(1.0, 1.0, 1.0));
        let it = Interaction::from_point(Point3::new(1.0, 0.0, 0.0));
        let (ds, _) = light.sample_direction(&it, [0.1, 0.9]);
        assert_eq!(light.pdf_direction(&it, &ds), 0.0);
        assert_eq!(light.eval_direction(&it, &ds), Spectrum::zeros());
    }
}
