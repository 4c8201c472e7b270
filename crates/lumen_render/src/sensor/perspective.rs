//! Pinhole perspective camera

use std::any::Any;
use std::sync::{Arc, RwLock};

use crate::foundation::math::{Aabb, Point3, Spectrum, Vec3};
use crate::object::SceneElement;
use crate::ray::Ray3;
use crate::sensor::{Film, Sensor};

/// Pinhole perspective camera.
///
/// Right-handed; the view axis runs from `eye` toward `target`. The
/// vertical field of view is given in degrees.
#[derive(Debug)]
pub struct PerspectiveSensor {
    id: String,
    eye: Point3,
    target: Point3,
    up: Vec3,
    fov_y_deg: f32,
    near_clip: f32,
    far_clip: f32,
    focus_distance: f32,
    film: Arc<Film>,
    scene_bounds: RwLock<Aabb>,
}

impl PerspectiveSensor {
    /// Create a perspective camera
    pub fn new(
        id: impl Into<String>,
        eye: Point3,
        target: Point3,
        up: Vec3,
        fov_y_deg: f32,
        near_clip: f32,
        far_clip: f32,
        focus_distance: f32,
        film: Film,
    ) -> Self {
        debug_assert!(fov_y_deg > 0.0 && fov_y_deg < 180.0);
        debug_assert!(far_clip > near_clip && near_clip > 0.0);

        Self {
            id: id.into(),
            eye,
            target,
            up: up.normalize(),
            fov_y_deg,
            near_clip,
            far_clip,
            focus_distance,
            film: Arc::new(film),
            scene_bounds: RwLock::new(Aabb::empty()),
        }
    }

    /// Camera position in world space
    pub fn eye(&self) -> Point3 {
        self.eye
    }

    /// Point the camera looks at
    pub fn target(&self) -> Point3 {
        self.target
    }

    /// Vertical field of view in degrees
    pub fn fov_y_deg(&self) -> f32 {
        self.fov_y_deg
    }

    /// Near clipping distance
    pub fn near_clip(&self) -> f32 {
        self.near_clip
    }

    /// Far clipping distance
    pub fn far_clip(&self) -> f32 {
        self.far_clip
    }

    /// Focus distance
    pub fn focus_distance(&self) -> f32 {
        self.focus_distance
    }

    /// Bounds of the owning scene, as last handed over via
    /// [`Sensor::set_scene_bounds`]; invalid until the scene is built
    pub fn scene_bounds(&self) -> Aabb {
        *self.scene_bounds.read().unwrap()
    }

    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(&self.up).normalize();
        let up = right.cross(&forward);
        (forward, right, up)
    }
}

impl SceneElement for PerspectiveSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        "perspective"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sensor for PerspectiveSensor {
    fn set_scene_bounds(&self, bounds: Aabb) {
        *self.scene_bounds.write().unwrap() = bounds;
    }

    fn sample_ray(
        &self,
        position_sample: [f32; 2],
        _aperture_sample: [f32; 2],
        time: f32,
    ) -> (Ray3, Spectrum) {
        let (forward, right, up) = self.basis();

        let tan_half = (self.fov_y_deg.to_radians() * 0.5).tan();
        let aspect = self.film.width() as f32 / self.film.height() as f32;

        let sx = (2.0 * position_sample[0] - 1.0) * tan_half * aspect;
        let sy = (1.0 - 2.0 * position_sample[1]) * tan_half;

        let dir = (forward + right * sx + up * sy).normalize();
        let mut ray = Ray3::new(self.eye, dir).with_time(time);
        // Clip planes are measured along the view axis
        let inv_cos = 1.0 / dir.dot(&forward);
        ray.t_min = self.near_clip * inv_cos;
        ray.t_max = self.far_clip * inv_cos;

        (ray, Spectrum::new(1.0, 1.0, 1.0))
    }

    fn film(&self) -> Arc<Film> {
        self.film.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_camera() -> PerspectiveSensor {
        PerspectiveSensor::new(
            "cam",
            Point3::new(0.0, 0.0, -5.0),
            Point3::origin(),
            Vec3::new(0.0, 1.0, 0.0),
            45.0,
            0.1,
            100.0,
            5.0,
            Film::new(64, 64),
        )
    }

    #[test]
    fn test_center_ray_points_forward() {
        let cam = test_camera();
        let (ray, weight) = cam.sample_ray([0.5, 0.5], [0.5, 0.5], 0.0);
        assert_relative_eq!(ray.dir.z, 1.0, epsilon = 1e-6);
        assert_eq!(weight, Spectrum::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_corner_ray_within_fov() {
        let cam = test_camera();
        let (ray, _) = cam.sample_ray([0.0, 0.0], [0.5, 0.5], 0.0);
        let forward = Vec3::new(0.0, 0.0, 1.0);
        let cos = ray.dir.dot(&forward);
        // Square film: the corner half-angle is atan(sqrt(2) * tan(fov/2))
        let max_angle = (2.0_f32.sqrt() * (22.5_f32.to_radians()).tan()).atan();
        assert!(cos.acos() <= max_angle + 1e-4);
        // Top-left sample maps to the camera's upper left; facing +z with
        // +y up, the camera's left is world +x
        assert!(ray.dir.x > 0.0 && ray.dir.y > 0.0);
    }

    #[test]
    fn test_clip_planes_bound_ray_segment() {
        let cam = test_camera();
        let (ray, _) = cam.sample_ray([0.5, 0.5], [0.5, 0.5], 0.0);
        assert_relative_eq!(ray.t_min, 0.1, epsilon = 1e-6);
        assert_relative_eq!(ray.t_max, 100.0, epsilon = 1e-4);
    }
}
