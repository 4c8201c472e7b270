//! Acceleration backends
//!
//! A backend indexes the scene's geometry and answers nearest-hit and
//! any-hit ray queries over batches of lanes. Exactly one backend is
//! selected per scene, at construction, by [`ExecMode`]; it never changes
//! afterwards. Backend internals stay behind the [`Accel`] strategy
//! trait — the scene contains no backend-specific logic.

pub mod bvh;
pub mod registry;
pub mod wavefront;

pub use bvh::BvhAccel;
pub use wavefront::WavefrontAccel;

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interaction::PreliminaryIntersection;
use crate::ray::Ray3;
use crate::shape::Shape;

/// Numeric execution mode of a scene.
///
/// Selects the acceleration backend once at scene construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecMode {
    /// Vectorized CPU batches with immediate per-lane traversal
    VectorCpu,
    /// Batch-major wavefront execution over flattened instance buffers,
    /// the mode a just-in-time device backend plugs into
    Wavefront,
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecMode::VectorCpu => write!(f, "vector-cpu"),
            ExecMode::Wavefront => write!(f, "wavefront"),
        }
    }
}

/// Backend error type
#[derive(Error, Debug)]
pub enum AccelError {
    /// A capability the active backend does not implement was requested.
    /// This fails loudly; there is no silent fallback.
    #[error("operation `{operation}` is not implemented by the {backend} backend")]
    Unsupported {
        /// Name of the requested operation
        operation: &'static str,
        /// Name of the active backend
        backend: &'static str,
    },

    /// The backend could not build its index
    #[error("acceleration structure build failed: {0}")]
    BuildFailed(String),

    /// A query reached a backend that was released or never built
    #[error("acceleration backend queried before build or after release")]
    NotBuilt,
}

bitflags! {
    /// Optional operations a backend may implement
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccelCapabilities: u32 {
        /// Unaccelerated linear-scan nearest-hit queries (diagnostic path)
        const NAIVE = 1 << 0;
    }
}

/// Strategy interface over the acceleration backends.
///
/// Batched queries take one ray per lane plus an `active` mask of equal
/// length; inactive lanes receive the canonical miss answer and never
/// influence active lanes. The `coherent` hint may speed up traversal of
/// spatially coherent batches but never changes results.
pub trait Accel: fmt::Debug + Send + Sync {
    /// Name of this backend, for diagnostics
    fn backend_name(&self) -> &'static str;

    /// Operations this backend supports beyond the core contract
    fn capabilities(&self) -> AccelCapabilities;

    /// Build the index over the flat shape list plus instancing groups
    fn build(
        &mut self,
        shapes: &[Arc<dyn Shape>],
        groups: &[Arc<dyn Shape>],
    ) -> Result<(), AccelError>;

    /// Discard and rebuild the index after parameter edits
    fn rebuild(
        &mut self,
        shapes: &[Arc<dyn Shape>],
        groups: &[Arc<dyn Shape>],
    ) -> Result<(), AccelError> {
        self.release();
        self.build(shapes, groups)
    }

    /// The flat shape set the index was built over (groups expanded)
    fn shapes(&self) -> &[Arc<dyn Shape>];

    /// Nearest-hit query per lane
    fn ray_intersect_preliminary(
        &self,
        rays: &[Ray3],
        coherent: bool,
        active: &[bool],
    ) -> Vec<PreliminaryIntersection>;

    /// Any-hit (occlusion) query per lane
    fn ray_test(&self, rays: &[Ray3], coherent: bool, active: &[bool]) -> Vec<bool>;

    /// Unaccelerated nearest-hit query (diagnostic path).
    ///
    /// Backends without [`AccelCapabilities::NAIVE`] return
    /// [`AccelError::Unsupported`].
    fn ray_intersect_naive(
        &self,
        rays: &[Ray3],
        active: &[bool],
    ) -> Result<Vec<PreliminaryIntersection>, AccelError>;

    /// Release the index and every reference into the shape set
    fn release(&mut self);
}

/// Instantiate the backend for `mode`.
///
/// Selection is static per scene instance; the scene calls this exactly
/// once during construction.
pub fn create_backend(mode: ExecMode) -> Box<dyn Accel> {
    match mode {
        ExecMode::VectorCpu => Box::new(BvhAccel::new()),
        ExecMode::Wavefront => Box::new(WavefrontAccel::new()),
    }
}

/// Process-wide backend initialization, invoked once per process before
/// the first scene is built.
pub fn static_init(mode: ExecMode) {
    if mode == ExecMode::Wavefront {
        // Bring the handle registry into existence eagerly
        let _ = registry::len();
    }
    log::debug!("static acceleration init for {mode} backend");
}

/// Process-wide backend shutdown, invoked once per process after the
/// last scene is gone.
pub fn static_shutdown(mode: ExecMode) {
    if mode == ExecMode::Wavefront {
        let swept = registry::trim();
        if swept > 0 {
            log::debug!("swept {swept} stale registry handles at shutdown");
        }
        let live = registry::len();
        if live > 0 {
            log::warn!("{live} registry handles still live at shutdown");
        }
    }
    log::debug!("static acceleration shutdown for {mode} backend");
}

/// Expand the scene's geometry into the flat set a backend indexes:
/// top-level shapes first, then the members of every instancing group.
pub(crate) fn flatten_shapes(
    shapes: &[Arc<dyn Shape>],
    groups: &[Arc<dyn Shape>],
) -> Vec<Arc<dyn Shape>> {
    let mut flat = shapes.to_vec();
    for group in groups {
        flat.extend(group.group_members());
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection_by_mode() {
        let cpu = create_backend(ExecMode::VectorCpu);
        assert!(cpu.capabilities().contains(AccelCapabilities::NAIVE));

        let wavefront = create_backend(ExecMode::Wavefront);
        assert!(!wavefront.capabilities().contains(AccelCapabilities::NAIVE));
    }

    #[test]
    fn test_exec_mode_display() {
        assert_eq!(ExecMode::VectorCpu.to_string(), "vector-cpu");
        assert_eq!(ExecMode::Wavefront.to_string(), "wavefront");
    }

    #[test]
    fn test_static_hooks_are_idempotent_per_process() {
        let _guard = registry::test_lock();
        static_init(ExecMode::VectorCpu);
        static_shutdown(ExecMode::VectorCpu);

        static_init(ExecMode::Wavefront);
        assert_eq!(registry::len(), 0);
        static_shutdown(ExecMode::Wavefront);
        assert_eq!(registry::len(), 0);
    }
}
