//! Surface-bound area light

use std::any::Any;
use std::sync::{Arc, RwLock, Weak};

use crate::emitter::{Emitter, EmitterFlags};
use crate::foundation::math::Spectrum;
use crate::interaction::{DirectionSample, Interaction, INVALID_INDEX};
use crate::object::SceneElement;
use crate::ray::Ray3;
use crate::shape::Shape;

/// Uniform diffuse area light bound to a shape's surface.
///
/// Area emitters are never listed at the scene's top level; the scene
/// discovers them through their owning shape during classification, which
/// keeps each light sampled exactly once.
#[derive(Debug)]
pub struct AreaEmitter {
    id: String,
    radiance: Spectrum,
    shape: RwLock<Weak<dyn Shape>>,
}

impl AreaEmitter {
    /// Create an area light emitting `radiance` from every surface point
    pub fn new(id: impl Into<String>, radiance: Spectrum) -> Self {
        let unattached: Weak<dyn Shape> = Weak::<crate::shape::Sphere>::new();
        Self {
            id: id.into(),
            radiance,
            shape: RwLock::new(unattached),
        }
    }

    /// Wire the back-reference to the owning shape.
    ///
    /// The reference is weak; the shape owns the emitter, not the other
    /// way around.
    pub fn attach_shape(&self, shape: &Arc<dyn Shape>) {
        *self.shape.write().unwrap() = Arc::downgrade(shape);
    }

    /// Emitted radiance
    pub fn radiance(&self) -> Spectrum {
        self.radiance
    }

    fn shape(&self) -> Option<Arc<dyn Shape>> {
        self.shape.read().unwrap().upgrade()
    }
}

impl SceneElement for AreaEmitter {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        "area"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Emitter for AreaEmitter {
    fn flags(&self) -> EmitterFlags {
        EmitterFlags::SURFACE
    }

    fn sample_ray(&self, time: f32, _u1: f32, u2: [f32; 2], u3: [f32; 2]) -> (Ray3, Spectrum) {
        let Some(shape) = self.shape() else {
            return (Ray3::default(), Spectrum::zeros());
        };

        let ps = shape.sample_position(u2);
        let (t, b) = crate::foundation::math::orthonormal_basis(ps.n);

        // Cosine-weighted hemisphere around the surface normal
        let r = u3[0].sqrt();
        let phi = 2.0 * std::f32::consts::PI * u3[1];
        let local = crate::foundation::math::Vec3::new(
            r * phi.cos(),
            r * phi.sin(),
            (1.0 - u3[0]).max(0.0).sqrt(),
        );
        let dir = t * local.x + b * local.y + ps.n * local.z;

        let ray = Ray3::new(ps.p + ps.n * crate::ray::RAY_EPSILON, dir).with_time(time);
        // radiance * cos / (pdf_pos * pdf_dir), with pdf_dir = cos / pi
        (ray, self.radiance * std::f32::consts::PI / ps.pdf)
    }

    fn sample_direction(&self, it: &Interaction, u: [f32; 2]) -> (DirectionSample, Spectrum) {
        let Some(shape) = self.shape() else {
            return (DirectionSample::invalid(), Spectrum::zeros());
        };

        let ps = shape.sample_position(u);
        let to_light = ps.p - it.p;
        let dist2 = to_light.norm_squared();
        if dist2 == 0.0 {
            return (DirectionSample::invalid(), Spectrum::zeros());
        }
        let dist = dist2.sqrt();
        let d = to_light / dist;

        // Facing away: the sample sees the back of the light
        let cos_emitter = ps.n.dot(&-d);
        if cos_emitter <= 0.0 {
            return (DirectionSample::invalid(), Spectrum::zeros());
        }

        // Area density converted to solid angle at the reference point
        let pdf = ps.pdf * dist2 / cos_emitter;

        let ds = DirectionSample {
            p: ps.p,
            n: ps.n,
            d,
            dist,
            pdf,
            delta: false,
            emitter_index: INVALID_INDEX,
        };
        (ds, self.radiance / pdf)
    }

    fn pdf_direction(&self, _it: &Interaction, ds: &DirectionSample) -> f32 {
        let Some(shape) = self.shape() else {
            return 0.0;
        };
        let cos_emitter = ds.n.dot(&-ds.d);
        if cos_emitter <= 0.0 {
            return 0.0;
        }
        shape.pdf_position() * ds.dist * ds.dist / cos_emitter
    }

    fn eval_direction(&self, _it: &Interaction, ds: &DirectionSample) -> Spectrum {
        if ds.n.dot(&-ds.d) > 0.0 {
            self.radiance
        } else {
            Spectrum::zeros()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use crate::shape::emissive_sphere;
    use approx::assert_relative_eq;

    #[test]
    fn test_detached_emitter_yields_zero_samples() {
        let emitter = AreaEmitter::new("a", Spectrum::new(1.0, 1.0, 1.0));
        let it = Interaction::from_point(Point3::origin());
        let (ds, weight) = emitter.sample_direction(&it, [0.5, 0.5]);
        assert_eq!(ds.pdf, 0.0);
        assert_eq!(weight, Spectrum::zeros());
    }

    #[test]
    fn test_sample_direction_consistent_with_pdf() {
        let (_sphere, emitter) =
            emissive_sphere("glow", Point3::new(0.0, 0.0, 5.0), 1.0, Spectrum::new(2.0, 2.0, 2.0));
        let it = Interaction::from_point(Point3::origin());

        // Search for a sample on the visible side
        let mut found = false;
        for i in 0..32 {
            let u = [f32::from(i as u8) / 32.0, 0.4];
            let (ds, weight) = emitter.sample_direction(&it, u);
            if ds.pdf > 0.0 {
                // weight * pdf recovers the radiance
                assert_relative_eq!(weight.x * ds.pdf, 2.0, epsilon = 1e-4);
                // and the recomputed density matches the sampled one
                assert_relative_eq!(
                    emitter.pdf_direction(&it, &ds),
                    ds.pdf,
                    epsilon = 1e-3
                );
                found = true;
            }
        }
        assert!(found);
    }
}
