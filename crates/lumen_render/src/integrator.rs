//! Light-transport algorithms
//!
//! The scene only depends on the [`Integrator`] trait boundary; the
//! shipped [`DirectIntegrator`] is the documented default delegate so
//! that `Scene::render` works out of the box.

use std::any::Any;

use crate::foundation::math::Spectrum;
use crate::foundation::sampling::Pcg32;
use crate::interaction::DirectionSample;
use crate::object::SceneElement;
use crate::ray::RayFlags;
use crate::scene::{Scene, SceneError};
use crate::sensor::Sensor;

/// A top-level light-transport algorithm.
///
/// `render` fills the sensor's film; the scene owns at most one
/// integrator and delegates its `render` entry point to it wholesale.
pub trait Integrator: SceneElement {
    /// Render the scene as observed by `sensor` into the sensor's film
    fn render(
        &self,
        scene: &Scene,
        sensor: &dyn Sensor,
        seed: u64,
        spp: u32,
    ) -> Result<(), SceneError>;
}

/// Unidirectional estimator with one bounce of next-event estimation.
///
/// This is the integrator synthesized when a scene is built without one.
/// Surfaces are treated as ideal diffuse reflectors; BSDF models are
/// outside this crate's scope.
#[derive(Debug, Default)]
pub struct DirectIntegrator {
    id: String,
}

impl DirectIntegrator {
    /// Create the default integrator
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl SceneElement for DirectIntegrator {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        "path"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Integrator for DirectIntegrator {
    fn render(
        &self,
        scene: &Scene,
        sensor: &dyn Sensor,
        seed: u64,
        spp: u32,
    ) -> Result<(), SceneError> {
        let film = sensor.film();
        let (width, height) = (film.width(), film.height());
        let spp = spp.max(1);

        for y in 0..height {
            let mut row = vec![Spectrum::zeros(); width as usize];

            for pass in 0..spp {
                // One scanline forms a wave of coherent primary rays
                let mut rngs: Vec<Pcg32> = (0..width)
                    .map(|x| {
                        let lane = u64::from(y) * u64::from(width) + u64::from(x);
                        Pcg32::new(seed, lane * u64::from(spp) + u64::from(pass))
                    })
                    .collect();

                let rays: Vec<_> = rngs
                    .iter_mut()
                    .enumerate()
                    .map(|(x, rng)| {
                        let jitter = rng.next_2d();
                        let pos = [
                            (x as f32 + jitter[0]) / width as f32,
                            (y as f32 + jitter[1]) / height as f32,
                        ];
                        sensor.sample_ray(pos, rng.next_2d(), 0.0).0
                    })
                    .collect();

                let active = vec![true; rays.len()];
                let interactions = scene.ray_intersect(&rays, RayFlags::ALL, true, &active);

                for (x, si) in interactions.iter().enumerate() {
                    let rng = &mut rngs[x];

                    if !si.is_valid() {
                        if let Some(env) = scene.environment() {
                            row[x] += env.eval_escape(rays[x].dir);
                        }
                        continue;
                    }

                    // Emission of a directly hit light
                    if let Some(emitter) = scene.emitter_for(si) {
                        let it = si.as_reference();
                        let ds = DirectionSample {
                            p: si.p,
                            n: si.n,
                            d: rays[x].dir,
                            dist: si.t,
                            pdf: 1.0,
                            delta: false,
                            emitter_index: crate::interaction::INVALID_INDEX,
                        };
                        row[x] += emitter.eval_direction(&it, &ds);
                    }

                    // Next-event estimation with a deferred visibility test
                    let (ds, weight) =
                        scene.sample_emitter_direction(&si.as_reference(), rng.next_2d(), true, true);
                    if ds.pdf > 0.0 {
                        let cos = si.n.dot(&ds.d).max(0.0);
                        row[x] += weight * cos * std::f32::consts::FRAC_1_PI;
                    }
                }
            }

            let inv_spp = 1.0 / spp as f32;
            for (x, value) in row.iter().enumerate() {
                film.put(x as u32, y, value * inv_spp);
            }
        }

        Ok(())
    }
}
