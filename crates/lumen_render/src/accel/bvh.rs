//! Vectorized-CPU backend: bounding volume hierarchy
//!
//! Median-split BVH over the flat shape set. Each lane of a batch is
//! traversed with an explicit node stack; the naive linear-scan query is
//! also implemented here as the diagnostic reference path.

use std::sync::Arc;

use crate::accel::{Accel, AccelCapabilities, AccelError, flatten_shapes};
use crate::foundation::math::Aabb;
use crate::interaction::PreliminaryIntersection;
use crate::ray::Ray3;
use crate::shape::Shape;

/// Maximum shapes per leaf before a split is attempted
const LEAF_SIZE: usize = 4;

#[derive(Debug, Clone)]
struct BvhNode {
    bounds: Aabb,
    /// Index of the left child; the right child immediately follows the
    /// left subtree. Unused for leaves.
    left: u32,
    right: u32,
    /// Range into the shape ordering for leaves; `count == 0` marks an
    /// inner node.
    start: u32,
    count: u32,
}

/// BVH-based acceleration backend for [`ExecMode::VectorCpu`](crate::accel::ExecMode::VectorCpu)
#[derive(Debug, Default)]
pub struct BvhAccel {
    nodes: Vec<BvhNode>,
    order: Vec<u32>,
    shapes: Vec<Arc<dyn Shape>>,
}

impl BvhAccel {
    /// Create an empty, unbuilt backend
    pub fn new() -> Self {
        Self::default()
    }

    fn build_recursive(&mut self, range: &mut [u32], start: u32, shape_bounds: &[Aabb]) -> u32 {
        let mut bounds = Aabb::empty();
        for &i in range.iter() {
            bounds.expand(&shape_bounds[i as usize]);
        }

        let node_index = self.nodes.len() as u32;
        self.nodes.push(BvhNode {
            bounds,
            left: 0,
            right: 0,
            start,
            count: range.len() as u32,
        });

        if range.len() <= LEAF_SIZE {
            return node_index;
        }

        // Median split along the longest axis of the centroid bounds
        let size = bounds.size();
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };
        range.sort_unstable_by(|&a, &b| {
            let ca = shape_bounds[a as usize].center()[axis];
            let cb = shape_bounds[b as usize].center()[axis];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = range.len() / 2;
        let (left_range, right_range) = range.split_at_mut(mid);

        let left = self.build_recursive(left_range, start, shape_bounds);
        let right = self.build_recursive(right_range, start + mid as u32, shape_bounds);

        let node = &mut self.nodes[node_index as usize];
        node.left = left;
        node.right = right;
        node.count = 0;
        node_index
    }

    fn intersect_leaf(
        &self,
        node: &BvhNode,
        ray: &Ray3,
        best: &mut PreliminaryIntersection,
    ) {
        for &i in &self.order[node.start as usize..(node.start + node.count) as usize] {
            let shape = &self.shapes[i as usize];
            let mut clipped = *ray;
            clipped.t_max = clipped.t_max.min(best.t);
            if let Some((t, uv)) = shape.intersect_preliminary(&clipped) {
                if t < best.t {
                    *best = PreliminaryIntersection {
                        t,
                        uv,
                        shape_index: i,
                    };
                }
            }
        }
    }

    fn intersect_one(&self, ray: &Ray3) -> PreliminaryIntersection {
        let mut best = PreliminaryIntersection::invalid();
        if self.nodes.is_empty() {
            return best;
        }

        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            let t_limit = ray.t_max.min(best.t);
            if node
                .bounds
                .intersect_ray(ray.origin, ray.dir, ray.t_min, t_limit)
                .is_none()
            {
                continue;
            }

            if node.count > 0 {
                self.intersect_leaf(node, ray, &mut best);
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
        best
    }

    fn test_one(&self, ray: &Ray3) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node
                .bounds
                .intersect_ray(ray.origin, ray.dir, ray.t_min, ray.t_max)
                .is_none()
            {
                continue;
            }

            if node.count > 0 {
                for &i in &self.order[node.start as usize..(node.start + node.count) as usize] {
                    if self.shapes[i as usize].intersect_test(ray) {
                        return true;
                    }
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
        false
    }
}

impl Accel for BvhAccel {
    fn backend_name(&self) -> &'static str {
        "vector-cpu"
    }

    fn capabilities(&self) -> AccelCapabilities {
        AccelCapabilities::NAIVE
    }

    fn build(
        &mut self,
        shapes: &[Arc<dyn Shape>],
        groups: &[Arc<dyn Shape>],
    ) -> Result<(), AccelError> {
        self.shapes = flatten_shapes(shapes, groups);
        self.nodes.clear();
        self.order = (0..self.shapes.len() as u32).collect();

        if self.shapes.is_empty() {
            return Ok(());
        }

        let bounds: Vec<Aabb> = self.shapes.iter().map(|s| s.bbox()).collect();
        for (i, b) in bounds.iter().enumerate() {
            if !b.is_valid() {
                return Err(AccelError::BuildFailed(format!(
                    "shape `{}` has a degenerate bounding box",
                    self.shapes[i].id()
                )));
            }
        }

        let mut order = std::mem::take(&mut self.order);
        self.build_recursive(&mut order, 0, &bounds);
        self.order = order;

        log::debug!(
            "built BVH over {} shapes ({} nodes)",
            self.shapes.len(),
            self.nodes.len()
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
        rays.iter()
            .zip(active)
            .map(|(ray, &live)| {
                if live {
                    self.intersect_one(ray)
                } else {
                    PreliminaryIntersection::invalid()
                }
            })
            .collect()
    }

    fn ray_test(&self, rays: &[Ray3], _coherent: bool, active: &[bool]) -> Vec<bool> {
        debug_assert_eq!(rays.len(), active.len());
        rays.iter()
            .zip(active)
            .map(|(ray, &live)| live && self.test_one(ray))
            .collect()
    }

    fn ray_intersect_naive(
        &self,
        rays: &[Ray3],
        active: &[bool],
    ) -> Result<Vec<PreliminaryIntersection>, AccelError> {
        debug_assert_eq!(rays.len(), active.len());
        Ok(rays
            .iter()
            .zip(active)
            .map(|(ray, &live)| {
                let mut best = PreliminaryIntersection::invalid();
                if !live {
                    return best;
                }
                for (i, shape) in self.shapes.iter().enumerate() {
                    let mut clipped = *ray;
                    clipped.t_max = clipped.t_max.min(best.t);
                    if let Some((t, uv)) = shape.intersect_preliminary(&clipped) {
                        if t < best.t {
                            best = PreliminaryIntersection {
                                t,
                                uv,
                                shape_index: i as u32,
                            };
                        }
                    }
                }
                best
            })
            .collect())
    }

    fn release(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.shapes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Point3, Vec3};
    use crate::shape::{ShapeGroup, Sphere};
    use approx::assert_relative_eq;

    fn grid_of_spheres(n: i32) -> Vec<Arc<dyn Shape>> {
        let mut shapes: Vec<Arc<dyn Shape>> = Vec::new();
        for i in 0..n {
            for j in 0..n {
                shapes.push(Arc::new(Sphere::new(
                    format!("s{i}_{j}"),
                    Point3::new(i as f32 * 3.0, j as f32 * 3.0, 10.0),
                    1.0,
                )));
            }
        }
        shapes
    }

    #[test]
    fn test_bvh_matches_naive_reference() {
        let shapes = grid_of_spheres(4);
        let mut accel = BvhAccel::new();
        accel.build(&shapes, &[]).unwrap();

        let rays: Vec<Ray3> = (0..16)
            .map(|i| {
                Ray3::new(
                    Point3::new(i as f32 * 0.7, i as f32 * 0.9, 0.0),
                    Vec3::new(0.05 * i as f32, 0.0, 1.0).normalize(),
                )
            })
            .collect();
        let active = vec![true; rays.len()];

        let fast = accel.ray_intersect_preliminary(&rays, false, &active);
        let slow = accel.ray_intersect_naive(&rays, &active).unwrap();

        for (a, b) in fast.iter().zip(&slow) {
            assert_eq!(a.is_valid(), b.is_valid());
            if a.is_valid() {
                assert_relative_eq!(a.t, b.t, epsilon = 1e-4);
                assert_eq!(a.shape_index, b.shape_index);
            }
        }
    }

    #[test]
    fn test_inactive_lanes_report_miss() {
        let shapes = grid_of_spheres(2);
        let mut accel = BvhAccel::new();
        accel.build(&shapes, &[]).unwrap();

        let ray = Ray3::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let rays = vec![ray, ray];
        let hits = accel.ray_intersect_preliminary(&rays, false, &[true, false]);

        assert!(hits[0].is_valid());
        assert!(!hits[1].is_valid());

        let occluded = accel.ray_test(&rays, false, &[true, false]);
        assert!(occluded[0]);
        assert!(!occluded[1]);
    }

    #[test]
    fn test_group_members_are_expanded() {
        let a: Arc<dyn Shape> = Arc::new(Sphere::new("a", Point3::new(0.0, 0.0, 5.0), 1.0));
        let group: Arc<dyn Shape> = Arc::new(ShapeGroup::new("g", vec![a]));

        let mut accel = BvhAccel::new();
        accel.build(&[], &[group]).unwrap();

        let rays = [Ray3::new(Point3::origin(), Vec3::new(0.0, 0.0, 1.0))];
        let hits = accel.ray_intersect_preliminary(&rays, false, &[true]);
        assert!(hits[0].is_valid());
        assert_relative_eq!(hits[0].t, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_empty_scene_always_misses() {
        let mut accel = BvhAccel::new();
        accel.build(&[], &[]).unwrap();

        let rays = [Ray3::new(Point3::origin(), Vec3::new(0.0, 0.0, 1.0))];
        assert!(!accel.ray_intersect_preliminary(&rays, false, &[true])[0].is_valid());
        assert!(!accel.ray_test(&rays, false, &[true])[0]);
    }

    #[test]
    fn test_release_clears_references() {
        let shapes = grid_of_spheres(2);
        let weak = Arc::downgrade(&shapes[0]);
        let mut accel = BvhAccel::new();
        accel.build(&shapes, &[]).unwrap();

        drop(shapes);
        assert!(weak.upgrade().is_some());

        accel.release();
        assert!(weak.upgrade().is_none());
        assert!(accel.shapes().is_empty());
    }
}
