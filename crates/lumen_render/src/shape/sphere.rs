//! Analytic sphere shape

use std::any::Any;
use std::sync::{Arc, RwLock};

use crate::emitter::{AreaEmitter, Emitter};
use crate::foundation::math::{Aabb, Point3, Spectrum, Vec2, Vec3};
use crate::foundation::sampling::square_to_uniform_sphere;
use crate::interaction::{PositionSample, PreliminaryIntersection, SurfaceInteraction};
use crate::object::SceneElement;
use crate::ray::{Ray3, RayFlags};
use crate::sensor::Sensor;
use crate::shape::{InstanceState, Shape};

#[derive(Debug, Clone, Copy)]
struct SphereGeom {
    center: Point3,
    radius: f32,
}

/// Analytic sphere, optionally carrying an attached emitter or sensor.
///
/// Geometry parameters can be edited after construction; edits flag the
/// instance dirty so the next parameter-change notification rebuilds the
/// acceleration backend.
#[derive(Debug)]
pub struct Sphere {
    id: String,
    geom: RwLock<SphereGeom>,
    emitter: Option<Arc<dyn Emitter>>,
    sensor: Option<Arc<dyn Sensor>>,
    state: InstanceState,
}

impl Sphere {
    /// Create a sphere from center and radius
    pub fn new(id: impl Into<String>, center: Point3, radius: f32) -> Self {
        Self {
            id: id.into(),
            geom: RwLock::new(SphereGeom { center, radius }),
            emitter: None,
            sensor: None,
            state: InstanceState::new(),
        }
    }

    /// Attach an emitter, turning this sphere into an area light carrier
    pub fn with_emitter(mut self, emitter: Arc<dyn Emitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Attach a sensor bound to this surface
    pub fn with_sensor(mut self, sensor: Arc<dyn Sensor>) -> Self {
        self.sensor = Some(sensor);
        self
    }

    /// Current center
    pub fn center(&self) -> Point3 {
        self.geom.read().unwrap().center
    }

    /// Current radius
    pub fn radius(&self) -> f32 {
        self.geom.read().unwrap().radius
    }

    /// Move the sphere, flagging the instance dirty
    pub fn set_center(&self, center: Point3) {
        self.geom.write().unwrap().center = center;
        self.state.mark_dirty();
    }

    /// Resize the sphere, flagging the instance dirty
    pub fn set_radius(&self, radius: f32) {
        self.geom.write().unwrap().radius = radius;
        self.state.mark_dirty();
    }
}

impl SceneElement for Sphere {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        "sphere"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Shape for Sphere {
    fn bbox(&self) -> Aabb {
        let g = *self.geom.read().unwrap();
        let r = Vec3::new(g.radius, g.radius, g.radius);
        Aabb::from_center_extents(g.center, r)
    }

    fn surface_area(&self) -> f32 {
        let r = self.radius();
        4.0 * std::f32::consts::PI * r * r
    }

    fn emitter(&self) -> Option<Arc<dyn Emitter>> {
        self.emitter.clone()
    }

    fn sensor(&self) -> Option<Arc<dyn Sensor>> {
        self.sensor.clone()
    }

    fn intersect_preliminary(&self, ray: &Ray3) -> Option<(f32, Vec2)> {
        let g = *self.geom.read().unwrap();
        let oc = ray.origin - g.center;
        let a = ray.dir.norm_squared();
        let half_b = oc.dot(&ray.dir);
        let c = oc.norm_squared() - g.radius * g.radius;

        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();

        // Nearest root within the ray segment
        let mut t = (-half_b - sqrt_d) / a;
        if t < ray.t_min || t > ray.t_max {
            t = (-half_b + sqrt_d) / a;
            if t < ray.t_min || t > ray.t_max {
                return None;
            }
        }

        let local = (ray.at(t) - g.center) / g.radius;
        let uv = Vec2::new(
            0.5 + local.x.atan2(local.z) * std::f32::consts::FRAC_1_PI * 0.5,
            local.y.clamp(-1.0, 1.0).acos() * std::f32::consts::FRAC_1_PI,
        );
        Some((t, uv))
    }

    fn compute_surface_interaction(
        &self,
        ray: &Ray3,
        prelim: &PreliminaryIntersection,
        flags: RayFlags,
    ) -> SurfaceInteraction {
        let g = *self.geom.read().unwrap();
        let p = ray.at(prelim.t);
        let n = (p - g.center) / g.radius;

        SurfaceInteraction {
            t: prelim.t,
            p,
            n,
            uv: if flags.contains(RayFlags::UV) {
                prelim.uv
            } else {
                Vec2::zeros()
            },
            wi: -ray.dir,
            time: ray.time,
            shape_index: prelim.shape_index,
        }
    }

    fn sample_position(&self, u: [f32; 2]) -> PositionSample {
        let g = *self.geom.read().unwrap();
        let n = square_to_uniform_sphere(u);
        PositionSample {
            p: g.center + n * g.radius,
            n,
            pdf: self.pdf_position(),
        }
    }

    fn state(&self) -> &InstanceState {
        &self.state
    }
}

/// Build a sphere with an attached area emitter, wiring the back-reference
/// the emitter needs for surface sampling.
pub fn emissive_sphere(
    id: impl Into<String>,
    center: Point3,
    radius: f32,
    radiance: Spectrum,
) -> (Arc<Sphere>, Arc<AreaEmitter>) {
    let id = id.into();
    let emitter = Arc::new(AreaEmitter::new(format!("{id}_emitter"), radiance));
    let sphere = Arc::new(
        Sphere::new(id, center, radius).with_emitter(emitter.clone() as Arc<dyn Emitter>),
    );
    emitter.attach_shape(&(sphere.clone() as Arc<dyn Shape>));
    (sphere, emitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_intersection_head_on() {
        let sphere = Sphere::new("s", Point3::new(0.0, 0.0, 3.0), 1.0);
        let ray = Ray3::new(Point3::origin(), Vec3::new(0.0, 0.0, 1.0));

        let (t, _uv) = sphere.intersect_preliminary(&ray).unwrap();
        assert_relative_eq!(t, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_intersection_from_inside() {
        let sphere = Sphere::new("s", Point3::origin(), 2.0);
        let ray = Ray3::new(Point3::origin(), Vec3::new(1.0, 0.0, 0.0));

        let (t, _uv) = sphere.intersect_preliminary(&ray).unwrap();
        assert_relative_eq!(t, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new("s", Point3::new(0.0, 5.0, 0.0), 1.0);
        let ray = Ray3::new(Point3::origin(), Vec3::new(0.0, 0.0, 1.0));
        assert!(sphere.intersect_preliminary(&ray).is_none());
    }

    #[test]
    fn test_sphere_respects_segment_bounds() {
        let sphere = Sphere::new("s", Point3::new(0.0, 0.0, 3.0), 1.0);
        let mut ray = Ray3::new(Point3::origin(), Vec3::new(0.0, 0.0, 1.0));
        ray.t_max = 1.5;
        assert!(sphere.intersect_preliminary(&ray).is_none());
    }

    #[test]
    fn test_surface_interaction_normal_points_outward() {
        let sphere = Sphere::new("s", Point3::new(0.0, 0.0, 3.0), 1.0);
        let ray = Ray3::new(Point3::origin(), Vec3::new(0.0, 0.0, 1.0));
        let (t, uv) = sphere.intersect_preliminary(&ray).unwrap();
        let prelim = PreliminaryIntersection {
            t,
            uv,
            shape_index: 0,
        };

        let si = sphere.compute_surface_interaction(&ray, &prelim, RayFlags::ALL);
        assert_relative_eq!(si.n.z, -1.0, epsilon = 1e-5);
        assert_relative_eq!(si.wi.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_set_radius_marks_dirty() {
        let sphere = Sphere::new("s", Point3::origin(), 1.0);
        assert!(!sphere.state().is_dirty());
        sphere.set_radius(2.0);
        assert!(sphere.state().is_dirty());
        assert_relative_eq!(sphere.radius(), 2.0);
    }

    #[test]
    fn test_sample_position_lies_on_surface() {
        let sphere = Sphere::new("s", Point3::new(1.0, 2.0, 3.0), 0.5);
        let ps = sphere.sample_position([0.3, 0.7]);
        assert_relative_eq!((ps.p - Point3::new(1.0, 2.0, 3.0)).norm(), 0.5, epsilon = 1e-5);
        assert_relative_eq!(ps.pdf, 1.0 / sphere.surface_area(), epsilon = 1e-6);
    }
}
