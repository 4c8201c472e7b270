//! Scene object model
//!
//! Every child handed to the scene is one of a closed set of roles; the
//! tagged [`SceneObject`] variant replaces fragile runtime type tests
//! during classification.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::emitter::Emitter;
use crate::integrator::Integrator;
use crate::sensor::Sensor;
use crate::shape::Shape;

/// Behaviour common to every object a scene can own
pub trait SceneElement: fmt::Debug + Send + Sync {
    /// Identifier of this object; may be empty
    fn id(&self) -> &str;

    /// Stable, human-readable type name used as the fallback traversal key
    fn type_name(&self) -> &'static str;

    /// Access to the concrete type, for callers that need more than the
    /// trait surface (mirrors the backend `as_any` escape hatch)
    fn as_any(&self) -> &dyn Any;
}

/// A named child object, tagged by its role in the scene
#[derive(Debug, Clone)]
pub enum SceneObject {
    /// A geometry instance (possibly carrying an attached emitter/sensor)
    Shape(Arc<dyn Shape>),
    /// A standalone light source
    Emitter(Arc<dyn Emitter>),
    /// A camera
    Sensor(Arc<dyn Sensor>),
    /// The top-level light-transport algorithm
    Integrator(Arc<dyn Integrator>),
    /// An opaque object the scene stores but does not interpret
    Other(Arc<dyn SceneElement>),
}

impl SceneObject {
    /// View the object through the common element interface
    pub fn as_element(&self) -> &dyn SceneElement {
        match self {
            SceneObject::Shape(o) => o.as_ref(),
            SceneObject::Emitter(o) => o.as_ref(),
            SceneObject::Sensor(o) => o.as_ref(),
            SceneObject::Integrator(o) => o.as_ref(),
            SceneObject::Other(o) => o.as_ref(),
        }
    }

    /// Type name of the wrapped object
    pub fn type_name(&self) -> &'static str {
        self.as_element().type_name()
    }
}

/// Visitor receiving every child of a scene for serialization or
/// introspection.
pub trait TraversalCallback {
    /// Called once per child, keyed by the child's stable identifier
    fn put_object(&mut self, key: &str, object: &SceneObject);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use crate::shape::Sphere;

    #[test]
    fn test_scene_object_element_view() {
        let obj = SceneObject::Shape(Arc::new(Sphere::new("ball", Point3::origin(), 1.0)));
        assert_eq!(obj.as_element().id(), "ball");
        assert_eq!(obj.type_name(), "sphere");
    }
}
