//! Constant environment emitter

use std::any::Any;
use std::sync::RwLock;

use crate::emitter::{Emitter, EmitterFlags};
use crate::foundation::math::{Aabb, Point3, Spectrum, Vec3};
use crate::foundation::sampling::{square_to_uniform_sphere, uniform_sphere_pdf};
use crate::interaction::{DirectionSample, Interaction, INVALID_INDEX};
use crate::object::SceneElement;
use crate::ray::Ray3;

/// Uniform background radiance arriving from every direction.
///
/// The single allowed environment emitter of a scene. It is unbounded:
/// its effective geometry is a sphere circumscribing the scene bounds,
/// which the scene hands over once the acceleration backend exists and
/// again after every parameter change.
#[derive(Debug)]
pub struct ConstantEmitter {
    id: String,
    radiance: Spectrum,
    bounds: RwLock<Aabb>,
}

impl ConstantEmitter {
    /// Create a constant environment emitter
    pub fn new(id: impl Into<String>, radiance: Spectrum) -> Self {
        Self {
            id: id.into(),
            radiance,
            bounds: RwLock::new(Aabb::empty()),
        }
    }

    /// Background radiance
    pub fn radiance(&self) -> Spectrum {
        self.radiance
    }

    /// Center and radius of the effective bounding sphere
    fn bounding_sphere(&self) -> (Point3, f32) {
        let bounds = *self.bounds.read().unwrap();
        if bounds.is_valid() {
            // Never collapse to a point scene
            (bounds.center(), bounds.bounding_radius().max(1.0))
        } else {
            (Point3::origin(), 1.0)
        }
    }
}

impl SceneElement for ConstantEmitter {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        "constant"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Emitter for ConstantEmitter {
    fn flags(&self) -> EmitterFlags {
        EmitterFlags::INFINITE | EmitterFlags::ENVIRONMENT
    }

    fn set_scene_bounds(&self, bounds: Aabb) {
        *self.bounds.write().unwrap() = bounds;
    }

    fn sample_ray(&self, time: f32, _u1: f32, u2: [f32; 2], u3: [f32; 2]) -> (Ray3, Spectrum) {
        let (center, radius) = self.bounding_sphere();

        // Point on the bounding sphere, shooting inward
        let n_out = square_to_uniform_sphere(u2);
        let origin = center + n_out * radius;
        let (t, b) = crate::foundation::math::orthonormal_basis(-n_out);

        let r = u3[0].sqrt();
        let phi = 2.0 * std::f32::consts::PI * u3[1];
        let local = Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u3[0]).max(0.0).sqrt());
        let dir = t * local.x + b * local.y + (-n_out) * local.z;

        let ray = Ray3::new(origin, dir).with_time(time);
        // radiance * cos / (pdf_pos * pdf_dir): the cosine cancels against
        // the cosine-weighted direction density, leaving area * pi
        let area = 4.0 * std::f32::consts::PI * radius * radius;
        (ray, self.radiance * area * std::f32::consts::PI)
    }

    fn sample_direction(&self, it: &Interaction, u: [f32; 2]) -> (DirectionSample, Spectrum) {
        let (_, radius) = self.bounding_sphere();
        let d = square_to_uniform_sphere(u);
        let dist = 2.0 * radius;
        let pdf = uniform_sphere_pdf();

        let ds = DirectionSample {
            p: it.p + d * dist,
            n: -d,
            d,
            dist,
            pdf,
            delta: false,
            emitter_index: INVALID_INDEX,
        };
        (ds, self.radiance / pdf)
    }

    fn pdf_direction(&self, _it: &Interaction, _ds: &DirectionSample) -> f32 {
        uniform_sphere_pdf()
    }

    fn eval_direction(&self, _it: &Interaction, _ds: &DirectionSample) -> Spectrum {
        self.radiance
    }

    fn eval_escape(&self, _d: Vec3) -> Spectrum {
        self.radiance
    }
}
