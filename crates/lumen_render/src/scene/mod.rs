//! Scene aggregation and query dispatch
//!
//! The [`Scene`] owns every renderable object, selects and manages the
//! acceleration backend, answers ray queries, and importance-samples
//! light emitters for next-event estimation. It is the single entry
//! point a light-transport algorithm talks to.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::accel::{self, Accel, AccelError, ExecMode};
use crate::config::SceneSettings;
use crate::emitter::{Emitter, EmitterFlags};
use crate::foundation::math::{Aabb, Point3, Spectrum, Vec3};
use crate::integrator::{DirectIntegrator, Integrator};
use crate::interaction::{
    DirectionSample, Interaction, PreliminaryIntersection, SurfaceInteraction, INVALID_INDEX,
};
use crate::object::{SceneObject, TraversalCallback};
use crate::ray::{Ray3, RayFlags};
use crate::sensor::{Film, PerspectiveSensor, Sensor};
use crate::shape::Shape;

/// Vertical field of view of the synthesized fallback camera, in degrees
const DEFAULT_FOV_Y_DEG: f32 = 45.0;

/// Film resolution of the synthesized fallback camera
const DEFAULT_FILM_SIZE: u32 = 256;

/// Scene error type
#[derive(Error, Debug)]
pub enum SceneError {
    /// A second environment emitter was supplied
    #[error("only one environment emitter can be specified per scene")]
    DuplicateEnvironment,

    /// A second light-transport algorithm was supplied
    #[error("only one integrator can be specified per scene")]
    DuplicateIntegrator,

    /// `render` was called with an out-of-range sensor index
    #[error("sensor index {index} is out of bounds ({count} sensors)")]
    InvalidSensorIndex {
        /// Requested index
        index: usize,
        /// Number of sensors in the scene
        count: usize,
    },

    /// The acceleration backend failed
    #[error(transparent)]
    Accel(#[from] AccelError),
}

/// The aggregate root owning all renderable content.
///
/// Constructed once from a flat set of named objects, mutated in place
/// only through [`parameters_changed`](Scene::parameters_changed), and
/// torn down exactly once, releasing the acceleration backend strictly
/// before the owned children.
pub struct Scene {
    children: Vec<(String, SceneObject)>,
    shapes: Vec<Arc<dyn Shape>>,
    groups: Vec<Arc<dyn Shape>>,
    emitters: Vec<Arc<dyn Emitter>>,
    sensors: Vec<Arc<dyn Sensor>>,
    integrator: Option<Arc<dyn Integrator>>,
    environment: Option<Arc<dyn Emitter>>,
    bbox: Aabb,
    emitter_pmf: f32,
    shapes_grad_enabled: bool,
    accel: Box<dyn Accel>,
    settings: SceneSettings,
}

impl Scene {
    /// Build a scene from a collection of named child objects.
    ///
    /// Children are classified by role; missing cameras and integrators
    /// are synthesized with a warning. Construction fails on a duplicate
    /// environment emitter or integrator, or if the backend cannot build
    /// its index.
    pub fn new(
        children: Vec<(String, SceneObject)>,
        settings: SceneSettings,
    ) -> Result<Self, SceneError> {
        Self::with_backend(children, settings, accel::create_backend(settings.mode))
    }

    /// Build a scene over a caller-supplied backend (used by tests to
    /// instrument backend interactions).
    pub(crate) fn with_backend(
        children: Vec<(String, SceneObject)>,
        settings: SceneSettings,
        mut backend: Box<dyn Accel>,
    ) -> Result<Self, SceneError> {
        let mut shapes: Vec<Arc<dyn Shape>> = Vec::new();
        let mut groups: Vec<Arc<dyn Shape>> = Vec::new();
        let mut emitters: Vec<Arc<dyn Emitter>> = Vec::new();
        let mut sensors: Vec<Arc<dyn Sensor>> = Vec::new();
        let mut integrator: Option<Arc<dyn Integrator>> = None;
        let mut environment: Option<Arc<dyn Emitter>> = None;
        let mut bbox = Aabb::empty();

        let mut named_children = Vec::with_capacity(children.len());
        for (index, (name, object)) in children.into_iter().enumerate() {
            let name = if name.is_empty() {
                format!("__unnamed_{index}")
            } else {
                name
            };

            match &object {
                SceneObject::Shape(shape) => {
                    if let Some(emitter) = shape.emitter() {
                        emitters.push(emitter);
                    }
                    if let Some(sensor) = shape.sensor() {
                        sensors.push(sensor);
                    }
                    if shape.is_group() {
                        groups.push(shape.clone());
                    } else {
                        bbox.expand(&shape.bbox());
                        shapes.push(shape.clone());
                    }
                }
                SceneObject::Emitter(emitter) => {
                    // Surface emitters join the list via their owning
                    // shape; listing them here would double-sample them.
                    if !emitter.flags().contains(EmitterFlags::SURFACE) {
                        emitters.push(emitter.clone());
                    }
                    if emitter.is_environment() {
                        if environment.is_some() {
                            return Err(SceneError::DuplicateEnvironment);
                        }
                        environment = Some(emitter.clone());
                    }
                }
                SceneObject::Sensor(sensor) => sensors.push(sensor.clone()),
                SceneObject::Integrator(algo) => {
                    if integrator.is_some() {
                        return Err(SceneError::DuplicateIntegrator);
                    }
                    integrator = Some(algo.clone());
                }
                SceneObject::Other(_) => {}
            }

            named_children.push((name, object));
        }

        if sensors.is_empty() {
            log::warn!("no sensors found, instantiating a perspective camera");
            sensors.push(Arc::new(Self::default_sensor(&bbox)));
        }

        let integrator = integrator.unwrap_or_else(|| {
            log::warn!("no integrator found, instantiating a path tracer");
            Arc::new(DirectIntegrator::new("default_integrator"))
        });

        // The backend must exist before sensors and emitters learn the
        // scene bounds: some of them answer queries against it.
        backend.build(&shapes, &groups)?;

        for sensor in &sensors {
            sensor.set_scene_bounds(bbox);
        }
        for emitter in &emitters {
            emitter.set_scene_bounds(bbox);
        }
        if let Some(env) = &environment {
            env.set_scene_bounds(bbox);
        }

        let emitter_pmf = if emitters.is_empty() {
            0.0
        } else {
            1.0 / emitters.len() as f32
        };

        Ok(Self {
            children: named_children,
            shapes,
            groups,
            emitters,
            sensors,
            integrator: Some(integrator),
            environment,
            bbox,
            emitter_pmf,
            shapes_grad_enabled: false,
            accel: backend,
            settings,
        })
    }

    /// Synthesize the fallback camera: 45° vertical field of view, framed
    /// on the view axis through the bounding-box center so the whole box
    /// is visible.
    fn default_sensor(bbox: &Aabb) -> PerspectiveSensor {
        let film = Film::new(DEFAULT_FILM_SIZE, DEFAULT_FILM_SIZE);

        if bbox.is_valid() {
            let center = bbox.center();
            let size = bbox.size();
            let extent = bbox.max_extent();

            let distance = extent / (2.0 * (DEFAULT_FOV_Y_DEG.to_radians() * 0.5).tan());
            let near_clip = distance / 100.0;
            let far_clip = extent * 5.0 + distance;
            let focus_distance = distance + size.z * 0.5;

            PerspectiveSensor::new(
                "default_sensor",
                Point3::new(center.x, center.y, bbox.min.z - distance),
                center,
                Vec3::new(0.0, 1.0, 0.0),
                DEFAULT_FOV_Y_DEG,
                near_clip,
                far_clip,
                focus_distance,
                film,
            )
        } else {
            PerspectiveSensor::new(
                "default_sensor",
                Point3::new(0.0, 0.0, -4.0),
                Point3::origin(),
                Vec3::new(0.0, 1.0, 0.0),
                DEFAULT_FOV_Y_DEG,
                0.01,
                100.0,
                4.0,
                film,
            )
        }
    }

    // ------------------------------------------------------------------
    // Accessors

    /// Flat list of geometry instances (groups excluded)
    pub fn shapes(&self) -> &[Arc<dyn Shape>] {
        &self.shapes
    }

    /// Instancing containers
    pub fn groups(&self) -> &[Arc<dyn Shape>] {
        &self.groups
    }

    /// Light emitters, in stable sampling order
    pub fn emitters(&self) -> &[Arc<dyn Emitter>] {
        &self.emitters
    }

    /// Cameras
    pub fn sensors(&self) -> &[Arc<dyn Sensor>] {
        &self.sensors
    }

    /// The environment emitter, if the scene has one
    pub fn environment(&self) -> Option<&Arc<dyn Emitter>> {
        self.environment.as_ref()
    }

    /// The top-level light-transport algorithm
    pub fn integrator(&self) -> Option<&Arc<dyn Integrator>> {
        self.integrator.as_ref()
    }

    /// World-space bounds (union of all non-group geometry bounds)
    pub fn bbox(&self) -> Aabb {
        self.bbox
    }

    /// Whether any geometry parameter currently tracks gradients
    pub fn shapes_grad_enabled(&self) -> bool {
        self.shapes_grad_enabled
    }

    /// Settings the scene was built with
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    /// The emitter associated with a surface interaction: the hit shape's
    /// attached emitter, or the environment for a miss.
    pub fn emitter_for(&self, si: &SurfaceInteraction) -> Option<Arc<dyn Emitter>> {
        if si.is_valid() {
            self.accel
                .shapes()
                .get(si.shape_index as usize)
                .and_then(|shape| shape.emitter())
        } else {
            self.environment.clone()
        }
    }

    // ------------------------------------------------------------------
    // Rendering

    /// Render the scene through the given sensor.
    ///
    /// Delegates entirely to the scene's light-transport algorithm and
    /// returns the sensor's output buffer.
    pub fn render(
        &self,
        sensor_index: usize,
        seed: u64,
        spp: u32,
    ) -> Result<Arc<Film>, SceneError> {
        let sensor = self
            .sensors
            .get(sensor_index)
            .ok_or(SceneError::InvalidSensorIndex {
                index: sensor_index,
                count: self.sensors.len(),
            })?;

        let integrator = self
            .integrator
            .as_ref()
            .expect("a scene always holds an integrator after construction");

        integrator.render(self, sensor.as_ref(), seed, spp)?;
        Ok(sensor.film())
    }

    // ------------------------------------------------------------------
    // Ray queries (pure dispatch to the backend)

    /// Nearest-hit query returning full surface interactions.
    ///
    /// One answer per lane; inactive lanes receive the miss record. The
    /// `coherent` hint may speed up traversal but never changes results.
    pub fn ray_intersect(
        &self,
        rays: &[Ray3],
        flags: RayFlags,
        coherent: bool,
        active: &[bool],
    ) -> Vec<SurfaceInteraction> {
        let prelims = self.accel.ray_intersect_preliminary(rays, coherent, active);
        prelims
            .iter()
            .zip(rays)
            .map(|(prelim, ray)| self.finalize_interaction(prelim, ray, flags))
            .collect()
    }

    /// Nearest-hit query returning lightweight hit records
    pub fn ray_intersect_preliminary(
        &self,
        rays: &[Ray3],
        coherent: bool,
        active: &[bool],
    ) -> Vec<PreliminaryIntersection> {
        self.accel.ray_intersect_preliminary(rays, coherent, active)
    }

    /// Occlusion query: whether anything blocks each ray segment
    pub fn ray_test(&self, rays: &[Ray3], coherent: bool, active: &[bool]) -> Vec<bool> {
        self.accel.ray_test(rays, coherent, active)
    }

    /// Unaccelerated nearest-hit query (diagnostic path).
    ///
    /// Fails loudly on backends without the naive capability; there is no
    /// silent fallback.
    pub fn ray_intersect_naive(
        &self,
        rays: &[Ray3],
        active: &[bool],
    ) -> Result<Vec<SurfaceInteraction>, SceneError> {
        let prelims = self.accel.ray_intersect_naive(rays, active)?;
        Ok(prelims
            .iter()
            .zip(rays)
            .map(|(prelim, ray)| self.finalize_interaction(prelim, ray, RayFlags::ALL))
            .collect())
    }

    fn finalize_interaction(
        &self,
        prelim: &PreliminaryIntersection,
        ray: &Ray3,
        flags: RayFlags,
    ) -> SurfaceInteraction {
        if !prelim.is_valid() {
            return SurfaceInteraction::invalid();
        }
        match self.accel.shapes().get(prelim.shape_index as usize) {
            Some(shape) => shape.compute_surface_interaction(ray, prelim, flags),
            None => SurfaceInteraction::invalid(),
        }
    }

    // ------------------------------------------------------------------
    // Emitter sampling

    /// Uniformly select an emitter from `index_sample` in `[0, 1)`.
    ///
    /// Returns `(index, weight, residual)`: the chosen index (the invalid
    /// sentinel when the scene has no lights), the emitter count as the
    /// selection weight, and the re-stratified residual of the input
    /// sample, uniform on `[0, 1)` again and safe to reuse.
    pub fn sample_emitter(&self, index_sample: f32) -> (u32, f32, f32) {
        let count = self.emitters.len();
        if count < 2 {
            if count == 1 {
                return (0, 1.0, index_sample);
            }
            return (INVALID_INDEX, 0.0, index_sample);
        }

        let count_f = count as f32;
        let scaled = index_sample * count_f;
        let index = (scaled as u32).min(count as u32 - 1);
        (index, count_f, scaled - index as f32)
    }

    /// Discrete probability of selecting any given emitter (1/N).
    ///
    /// Meaningless when the scene has no emitters; callers check the
    /// light count first.
    pub fn pdf_emitter(&self, _index: u32) -> f32 {
        self.emitter_pmf
    }

    /// Sample a ray leaving some emitter, weighted by the discrete
    /// selection weight. A zero ray and weight are returned for scenes
    /// without lights, or for an inactive lane.
    pub fn sample_emitter_ray(
        &self,
        time: f32,
        u1: f32,
        u2: [f32; 2],
        u3: [f32; 2],
        active: bool,
    ) -> (Ray3, Spectrum, Option<Arc<dyn Emitter>>) {
        if !active {
            return (Ray3::default(), Spectrum::zeros(), None);
        }

        let count = self.emitters.len();
        if count > 1 || (count == 1 && !self.settings.inline_single_emitter) {
            let (index, weight, u1_re) = self.sample_emitter(u1);
            let emitter = &self.emitters[index as usize];
            let (ray, spec) = emitter.sample_ray(time, u1_re, u2, u3);
            (ray, spec * weight, Some(emitter.clone()))
        } else if count == 1 {
            // Single light: skip the selection step entirely
            let emitter = &self.emitters[0];
            let (ray, spec) = emitter.sample_ray(time, u1, u2, u3);
            (ray, spec, Some(emitter.clone()))
        } else {
            (Ray3::default(), Spectrum::zeros(), None)
        }
    }

    /// Sample a direction toward some emitter from `it`.
    ///
    /// The returned pdf is multiplied by the discrete selection
    /// probability and the weight by the selection weight (chain rule
    /// for mixture sampling). With `test_visibility`, occluded samples are
    /// invalidated in place — pdf and radiance zeroed — rather than
    /// discarded, so batched callers keep a uniform shape.
    pub fn sample_emitter_direction(
        &self,
        it: &Interaction,
        sample: [f32; 2],
        test_visibility: bool,
        active: bool,
    ) -> (DirectionSample, Spectrum) {
        if !active {
            return (DirectionSample::invalid(), Spectrum::zeros());
        }

        let count = self.emitters.len();
        let (mut ds, mut spec);

        if count > 1 || (count == 1 && !self.settings.inline_single_emitter) {
            let (index, weight, residual) = self.sample_emitter(sample[0]);
            let emitter = &self.emitters[index as usize];

            let (d, s) = emitter.sample_direction(it, [residual, sample[1]]);
            ds = d;
            spec = s;

            // Account for the discrete probability of picking this light
            ds.pdf *= self.pdf_emitter(index);
            spec *= weight;
            ds.emitter_index = index;
        } else if count == 1 {
            let (d, s) = self.emitters[0].sample_direction(it, sample);
            ds = d;
            spec = s;
            ds.emitter_index = 0;
        } else {
            return (DirectionSample::invalid(), Spectrum::zeros());
        }

        if test_visibility && ds.pdf != 0.0 {
            let shadow_ray = it.spawn_ray_to(ds.p);
            let occluded = self.ray_test(&[shadow_ray], false, &[true])[0];
            if occluded {
                spec = Spectrum::zeros();
                ds.pdf = 0.0;
            }
        }

        (ds, spec)
    }

    /// Density of producing `ds` from `it` through
    /// [`sample_emitter_direction`](Scene::sample_emitter_direction),
    /// including the discrete selection probability.
    pub fn pdf_emitter_direction(&self, it: &Interaction, ds: &DirectionSample) -> f32 {
        match self.emitters.get(ds.emitter_index as usize) {
            Some(emitter) => emitter.pdf_direction(it, ds) * self.emitter_pmf,
            None => 0.0,
        }
    }

    /// Emitted radiance along an existing direction sample
    pub fn eval_emitter_direction(&self, it: &Interaction, ds: &DirectionSample) -> Spectrum {
        match self.emitters.get(ds.emitter_index as usize) {
            Some(emitter) => emitter.eval_direction(it, ds),
            None => Spectrum::zeros(),
        }
    }

    // ------------------------------------------------------------------
    // Introspection and mutation

    /// Expose every child object to `callback`, keyed by the child's
    /// identifier. Auto-generated identifiers are replaced by the
    /// object's type name so external keys stay stable.
    pub fn traverse(&self, callback: &mut dyn TraversalCallback) {
        for (name, object) in &self.children {
            let key = if name.is_empty() || name.starts_with("__unnamed") {
                object.type_name()
            } else {
                name.as_str()
            };
            callback.put_object(key, object);
        }
    }

    /// Propagate external parameter edits.
    ///
    /// Re-informs bound-dependent objects of the (possibly resized)
    /// scene bounds, consumes every shape's dirty flag exactly once,
    /// rebuilds the backend fully if any shape was dirty, and recomputes
    /// the aggregate gradient-tracking flag.
    pub fn parameters_changed(&mut self, keys: &[&str]) -> Result<(), SceneError> {
        log::debug!("scene parameters changed: {keys:?}");

        let mut bbox = Aabb::empty();
        for shape in &self.shapes {
            bbox.expand(&shape.bbox());
        }
        self.bbox = bbox;

        if let Some(env) = &self.environment {
            env.set_scene_bounds(self.bbox);
        }

        // Read-and-clear: each dirty flag is consumed exactly once, and
        // every shape is visited (no short-circuit) so no edit survives
        // into the next notification.
        let mut accel_dirty = false;
        for shape in &self.shapes {
            accel_dirty |= shape.state().take_dirty();
        }
        for group in &self.groups {
            accel_dirty |= group.state().take_dirty();
        }

        if accel_dirty {
            self.accel.rebuild(&self.shapes, &self.groups)?;
        }

        self.shapes_grad_enabled = false;
        for shape in &self.shapes {
            if shape.state().grad_enabled() {
                self.shapes_grad_enabled = true;
                break;
            }
        }
        Ok(())
    }

    /// Human-readable structural dump of all children
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scene[")?;
        writeln!(f, "  children = [")?;
        for (index, (name, object)) in self.children.iter().enumerate() {
            let trailer = if index + 1 < self.children.len() { "," } else { "" };
            writeln!(f, "    {} = {:?}{}", name, object.as_element(), trailer)?;
        }
        writeln!(f, "  ]")?;
        write!(f, "]")
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("children", &self.children.len())
            .field("shapes", &self.shapes.len())
            .field("emitters", &self.emitters.len())
            .field("sensors", &self.sensors.len())
            .field("mode", &self.settings.mode)
            .finish()
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        // The backend may hold references into the geometry; release it
        // strictly before the child lists are torn down.
        self.accel.release();

        self.emitters.clear();
        self.shapes.clear();
        self.groups.clear();
        self.sensors.clear();
        self.children.clear();
        self.integrator = None;
        self.environment = None;

        if self.settings.mode == ExecMode::Wavefront {
            // All object references are gone; sweep whatever the backend
            // left behind in the global registry.
            let trimmed = accel::registry::trim();
            if trimmed > 0 {
                log::debug!("scene teardown trimmed {trimmed} stale registry handles");
            }
        }
    }
}
