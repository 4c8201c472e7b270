//! Wavefront backend: batch-major traversal over flattened buffers
//!
//! Models the execution style of a just-in-time device runtime: geometry
//! is flattened into contiguous instance records at build time, queries
//! sweep the whole batch against one instance at a time ("wavefront"
//! order), and every instance holds a handle in the process-wide
//! registry for the lifetime of the build. Kernel work is enqueued and
//! completed before a query returns, so the caller observes synchronous
//! behaviour.
//!
//! The naive diagnostic query is deliberately not implemented here;
//! requesting it is a loud capability error, never a silent fallback.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::accel::registry::{self, RegistryHandle};
use crate::accel::{flatten_shapes, Accel, AccelCapabilities, AccelError};
use crate::interaction::PreliminaryIntersection;
use crate::ray::Ray3;
use crate::shape::Shape;

/// Flattened per-instance record, laid out for device upload
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct InstanceRecord {
    bounds_min: [f32; 3],
    _pad0: f32,
    bounds_max: [f32; 3],
    _pad1: f32,
}

/// Wavefront acceleration backend for [`ExecMode::Wavefront`](crate::accel::ExecMode::Wavefront)
#[derive(Debug, Default)]
pub struct WavefrontAccel {
    shapes: Vec<Arc<dyn Shape>>,
    records: Vec<InstanceRecord>,
    handles: Vec<RegistryHandle>,
}

impl WavefrontAccel {
    /// Create an empty, unbuilt backend
    pub fn new() -> Self {
        Self::default()
    }

    fn record_hits_ray(record: &InstanceRecord, ray: &Ray3, t_max: f32) -> bool {
        let bounds = crate::foundation::math::Aabb::new(
            crate::foundation::math::Point3::from(record.bounds_min),
            crate::foundation::math::Point3::from(record.bounds_max),
        );
        bounds
            .intersect_ray(ray.origin, ray.dir, ray.t_min, t_max)
            .is_some()
    }
}

impl Accel for WavefrontAccel {
    fn backend_name(&self) -> &'static str {
        "wavefront"
    }

    fn capabilities(&self) -> AccelCapabilities {
        AccelCapabilities::empty()
    }

    fn build(
        &mut self,
        shapes: &[Arc<dyn Shape>],
        groups: &[Arc<dyn Shape>],
    ) -> Result<(), AccelError> {
        self.shapes = flatten_shapes(shapes, groups);

        self.records = vec![InstanceRecord::zeroed(); self.shapes.len()];
        for (record, shape) in self.records.iter_mut().zip(&self.shapes) {
            let bbox = shape.bbox();
            if !bbox.is_valid() {
                return Err(AccelError::BuildFailed(format!(
                    "shape `{}` has a degenerate bounding box",
                    shape.id()
                )));
            }
            record.bounds_min = bbox.min.coords.into();
            record.bounds_max = bbox.max.coords.into();
        }

        self.handles = self
            .shapes
            .iter()
            .map(|s| registry::register(s.type_name()))
            .collect();

        log::debug!(
            "wavefront backend flattened {} instances ({} bytes)",
            self.records.len(),
            std::mem::size_of_val(self.records.as_slice()),
        );
        Ok(())
    }

    fn shapes(&self) -> &[Arc<dyn Shape>] {
        &self.shapes
    }

    fn ray_intersect_preliminary(
        &self,
        rays: &[Ray3],
        _coherent: bool,
        active: &[bool],
    ) -> Vec<PreliminaryIntersection> {
        debug_assert_eq!(rays.len(), active.len());
        let mut best = vec![PreliminaryIntersection::invalid(); rays.len()];

        // Instance-major sweep: every instance processes the whole wave
        // before the next one is touched.
        for (index, (record, shape)) in self.records.iter().zip(&self.shapes).enumerate() {
            for (lane, ray) in rays.iter().enumerate() {
                if !active[lane] {
                    continue;
                }
                if !Self::record_hits_ray(record, ray, ray.t_max.min(best[lane].t)) {
                    continue;
                }
                let mut clipped = *ray;
                clipped.t_max = clipped.t_max.min(best[lane].t);
                if let Some((t, uv)) = shape.intersect_preliminary(&clipped) {
                    if t < best[lane].t {
                        best[lane] = PreliminaryIntersection {
                            t,
                            uv,
                            shape_index: index as u32,
                        };
                    }
                }
            }
        }
        best
    }

    fn ray_test(&self, rays: &[Ray3], _coherent: bool, active: &[bool]) -> Vec<bool> {
        debug_assert_eq!(rays.len(), active.len());
        let mut occluded = vec![false; rays.len()];

        for (record, shape) in self.records.iter().zip(&self.shapes) {
            let mut any_open = false;
            for (lane, ray) in rays.iter().enumerate() {
                if !active[lane] || occluded[lane] {
                    continue;
                }
                any_open = true;
                if Self::record_hits_ray(record, ray, ray.t_max) && shape.intersect_test(ray) {
                    occluded[lane] = true;
                }
            }
            if !any_open {
                break;
            }
        }
        occluded
    }

    fn ray_intersect_naive(
        &self,
        _rays: &[Ray3],
        _active: &[bool],
    ) -> Result<Vec<PreliminaryIntersection>, AccelError> {
        Err(AccelError::Unsupported {
            operation: "ray_intersect_naive",
            backend: self.backend_name(),
        })
    }

    fn release(&mut self) {
        for handle in self.handles.drain(..) {
            registry::deregister(handle);
        }
        self.records.clear();
        self.shapes.clear();
    }
}
