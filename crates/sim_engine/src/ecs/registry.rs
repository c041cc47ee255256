//! Entity registry with lookup-by-capability

use slotmap::{new_key_type, SlotMap};

use super::component::Capabilities;
use super::entity::Entity;

new_key_type! {
    /// Stable identifier for a registered entity
    pub struct EntityId;
}

/// Holds every registered entity and supports lookup by capability
#[derive(Default)]
pub struct Registry {
    entities: SlotMap<EntityId, Entity>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, taking ownership of it and its sub-entities
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        self.entities.insert(entity)
    }

    /// Deregister an entity, returning it if it was registered
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    /// Borrow a registered entity
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutably borrow a registered entity
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Iterate all registered entities
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    /// Iterate entities whose capability union (including sub-entities)
    /// intersects `caps`
    pub fn entities_with(&self, caps: Capabilities) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .filter(move |(_, e)| e.capabilities().intersects(caps))
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entities are registered
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::CollidableComponent;
    use crate::physics::ColliderDesc;

    #[test]
    fn lookup_by_capability() {
        let mut registry = Registry::new();
        let plain = registry.insert(Entity::new());
        let collidable = registry.insert(Entity::new().with_component(CollidableComponent {
            collider: ColliderDesc::sphere(0.5),
        }));

        let found: Vec<_> = registry
            .entities_with(Capabilities::COLLIDABLE)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(found, vec![collidable]);

        registry.remove(collidable);
        assert!(registry.get(collidable).is_none());
        assert!(registry.get(plain).is_some());
        assert_eq!(registry.len(), 1);
    }
}
