//! Instancing container

use std::any::Any;
use std::sync::Arc;

use crate::foundation::math::{Aabb, Vec2};
use crate::interaction::{PositionSample, PreliminaryIntersection, SurfaceInteraction};
use crate::object::SceneElement;
use crate::ray::{Ray3, RayFlags};
use crate::shape::{InstanceState, Shape};

/// A container of member shapes resolved by the acceleration backend.
///
/// Groups are excluded from the scene's flat geometry list and from the
/// world bounding box; their members are virtual until the backend
/// expands them at build time.
#[derive(Debug)]
pub struct ShapeGroup {
    id: String,
    members: Vec<Arc<dyn Shape>>,
    state: InstanceState,
}

impl ShapeGroup {
    /// Create a group from member shapes
    pub fn new(id: impl Into<String>, members: Vec<Arc<dyn Shape>>) -> Self {
        Self {
            id: id.into(),
            members,
            state: InstanceState::new(),
        }
    }

    /// Number of member shapes
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl SceneElement for ShapeGroup {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        "shapegroup"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Shape for ShapeGroup {
    fn bbox(&self) -> Aabb {
        let mut bbox = Aabb::empty();
        for member in &self.members {
            bbox.expand(&member.bbox());
        }
        bbox
    }

    fn surface_area(&self) -> f32 {
        self.members.iter().map(|m| m.surface_area()).sum()
    }

    fn is_group(&self) -> bool {
        true
    }

    fn group_members(&self) -> Vec<Arc<dyn Shape>> {
        self.members.clone()
    }

    // The container itself is never traced; backends expand its members.
    fn intersect_preliminary(&self, _ray: &Ray3) -> Option<(f32, Vec2)> {
        None
    }

    fn compute_surface_interaction(
        &self,
        _ray: &Ray3,
        _prelim: &PreliminaryIntersection,
        _flags: RayFlags,
    ) -> SurfaceInteraction {
        SurfaceInteraction::invalid()
    }

    fn sample_position(&self, _u: [f32; 2]) -> PositionSample {
        PositionSample {
            p: crate::foundation::math::Point3::origin(),
            n: crate::foundation::math::Vec3::zeros(),
            pdf: 0.0,
        }
    }

    fn state(&self) -> &InstanceState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use crate::shape::Sphere;

    #[test]
    fn test_group_exposes_members() {
        let a: Arc<dyn Shape> = Arc::new(Sphere::new("a", Point3::origin(), 1.0));
        let b: Arc<dyn Shape> = Arc::new(Sphere::new("b", Point3::new(4.0, 0.0, 0.0), 1.0));
        let group = ShapeGroup::new("g", vec![a, b]);

        assert!(group.is_group());
        assert_eq!(group.group_members().len(), 2);
        assert_eq!(group.len(), 2);

        let bbox = group.bbox();
        assert!(bbox.contains_point(Point3::new(-1.0, 0.0, 0.0)));
        assert!(bbox.contains_point(Point3::new(5.0, 0.0, 0.0)));
    }
}
