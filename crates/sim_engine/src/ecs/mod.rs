//! Entity/component registry
//!
//! Entities are identity-bearing bags of typed components, one component per
//! type key. Components declare capability tags; the world classifies them by
//! tag when routing adds/removes to the scheduler, the graphics thread, and
//! the physics backend.

pub mod component;
pub mod entity;
pub mod registry;

pub use component::{
    Capabilities, CameraComponent, CollidableComponent, Component, DrawableComponent,
    EnvironmentComponent, OverlayComponent, PassComponent, ProcessorComponent, ProcessorSpec,
};
pub use entity::{Entity, EntityError};
pub use registry::{EntityId, Registry};
