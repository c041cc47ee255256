//! Entity implementation

use std::any::TypeId;

use thiserror::Error;

use super::component::{Capabilities, Component};

/// Errors from entity mutation
#[derive(Error, Debug)]
pub enum EntityError {
    /// A component of this type key is already attached
    #[error("entity already has a component of type {0}")]
    DuplicateComponent(&'static str),
}

/// Identity-bearing container of components
///
/// Owns its components exclusively, at most one per component type key, and
/// may own nested sub-entities that are added/removed with it recursively.
#[derive(Default)]
pub struct Entity {
    components: Vec<Box<dyn Component>>,
    children: Vec<Entity>,
}

impl Entity {
    /// Create an empty entity
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style component attachment; panics on a duplicate type key
    #[must_use]
    pub fn with_component(mut self, component: impl Component) -> Self {
        self.add_component(Box::new(component))
            .unwrap_or_else(|e| panic!("with_component: {e}"));
        self
    }

    /// Builder-style sub-entity attachment
    #[must_use]
    pub fn with_child(mut self, child: Entity) -> Self {
        self.children.push(child);
        self
    }

    /// Attach a component; a type key maps to at most one instance
    pub fn add_component(&mut self, component: Box<dyn Component>) -> Result<(), EntityError> {
        if self.has_component_type(component.as_ref()) {
            return Err(EntityError::DuplicateComponent(component.type_name()));
        }
        self.components.push(component);
        Ok(())
    }

    /// Whether a component with the same type key is already attached
    pub fn has_component_type(&self, component: &dyn Component) -> bool {
        let type_id = component.as_any().type_id();
        self.components
            .iter()
            .any(|c| c.as_any().type_id() == type_id)
    }

    /// Detach and return the component of type `T`, if attached
    pub fn remove_component<T: Component>(&mut self) -> Option<Box<dyn Component>> {
        let index = self
            .components
            .iter()
            .position(|c| c.as_any().type_id() == TypeId::of::<T>())?;
        Some(self.components.remove(index))
    }

    /// Borrow the component of type `T`, if attached
    pub fn component<T: Component>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|c| c.as_any().downcast_ref::<T>())
    }

    /// Mutably borrow the component of type `T`, if attached
    pub fn component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Iterate the attached components in attachment order
    pub fn components(&self) -> impl Iterator<Item = &dyn Component> {
        self.components.iter().map(AsRef::as_ref)
    }

    /// Mutably iterate the attached components
    pub fn components_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Component>> {
        self.components.iter_mut()
    }

    /// Attach a nested sub-entity
    pub fn add_child(&mut self, child: Entity) {
        self.children.push(child);
    }

    /// The nested sub-entities
    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    /// Mutably borrow the nested sub-entities
    pub fn children_mut(&mut self) -> &mut [Entity] {
        &mut self.children
    }

    /// Union of the capability tags declared here and in all sub-entities
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = self
            .components
            .iter()
            .fold(Capabilities::empty(), |acc, c| acc | c.capabilities());
        for child in &self.children {
            caps |= child.capabilities();
        }
        caps
    }
}
