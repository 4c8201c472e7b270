//! # Lumen Render
//!
//! Scene aggregation and ray-query core for physically-based light
//! transport simulation.
//!
//! The crate answers the two questions a rendering algorithm asks
//! repeatedly — *what does this ray hit?* and *how should I sample a
//! light source?* — behind one uniform interface over two execution
//! backends (vectorized CPU and batch-major wavefront).
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use lumen_render::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let children = vec![
//!         (
//!             "ball".to_string(),
//!             SceneObject::Shape(Arc::new(Sphere::new(
//!                 "ball",
//!                 Point3::origin(),
//!                 1.0,
//!             ))),
//!         ),
//!         (
//!             "lamp".to_string(),
//!             SceneObject::Emitter(Arc::new(PointEmitter::new(
//!                 "lamp",
//!                 Point3::new(0.0, 4.0, 0.0),
//!                 Spectrum::new(20.0, 20.0, 20.0),
//!             ))),
//!         ),
//!     ];
//!
//!     // A default camera and integrator are synthesized with a warning
//!     let scene = Scene::new(children, SceneSettings::default())?;
//!     let film = scene.render(0, 42, 1)?;
//!     assert!(film.width() > 0);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

pub mod accel;
pub mod config;
pub mod emitter;
pub mod foundation;
pub mod integrator;
pub mod interaction;
pub mod object;
pub mod ray;
pub mod scene;
pub mod sensor;
pub mod shape;

pub use accel::{Accel, AccelCapabilities, AccelError, ExecMode};
pub use config::{Config, ConfigError, SceneSettings};
pub use scene::{Scene, SceneError};

/// Common imports for crate users
pub mod prelude {
    pub use crate::accel::ExecMode;
    pub use crate::config::{Config, SceneSettings};
    pub use crate::emitter::{AreaEmitter, ConstantEmitter, Emitter, PointEmitter};
    pub use crate::foundation::math::{Aabb, Point3, Spectrum, Vec2, Vec3};
    pub use crate::integrator::{DirectIntegrator, Integrator};
    pub use crate::interaction::{
        DirectionSample, Interaction, PreliminaryIntersection, SurfaceInteraction,
    };
    pub use crate::object::{SceneObject, TraversalCallback};
    pub use crate::ray::{Ray3, RayFlags};
    pub use crate::scene::{Scene, SceneError};
    pub use crate::sensor::{Film, PerspectiveSensor, Sensor};
    pub use crate::shape::{emissive_sphere, Shape, ShapeGroup, Sphere};
}
