//! Physics backend boundary
//!
//! The core only forwards collidable components across this seam; the
//! backend is invoked by processors during their phases and is otherwise
//! opaque.

use crate::ecs::registry::EntityId;
use crate::foundation::math::Vec3;

/// Collision shape description handed to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderDesc {
    /// Sphere with the given radius
    Sphere {
        /// Sphere radius
        radius: f32,
    },
    /// Axis-aligned box with the given half extents
    Box {
        /// Half extents along each axis
        half_extents: Vec3,
    },
}

impl ColliderDesc {
    /// Sphere collider with the given radius
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Axis-aligned box collider with the given half extents
    pub fn aabb(half_extents: Vec3) -> Self {
        Self::Box { half_extents }
    }
}

/// Seam to the physics/collision collaborator
pub trait PhysicsBackend: Send {
    /// A collidable component was added with its owning entity
    fn add_collidable(&mut self, entity: EntityId, collider: &ColliderDesc);

    /// The entity's collidable component was removed
    fn remove_collidable(&mut self, entity: EntityId);
}
