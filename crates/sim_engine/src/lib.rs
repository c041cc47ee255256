//! # Sim Engine
//!
//! A real-time entity/component simulation runtime. Many independently
//! scheduled units of per-frame logic ("processors") coordinate with a
//! single dedicated graphics thread that owns all scene mutation and
//! presentation.
//!
//! ## Architecture
//!
//! - **Entities** are bags of typed components classified by capability tag
//! - **Processors** run two-phase logic: `compute` off the graphics thread,
//!   `commit` on it, gated by an arming condition (frame tick, posted
//!   event, buffered input, or an AND-composite of those)
//! - **The scheduler** turns stimuli into ready processors and commit lists
//! - **The frame loop** reconciles shadow lists, draws through a pluggable
//!   backend, and spends the remaining frame budget on commit work
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sim_engine::prelude::*;
//!
//! struct Spin;
//!
//! impl Processor for Spin {
//!     fn compute(&mut self, _trigger: &TriggerInfo) {
//!         // simulation logic, off the graphics thread
//!     }
//!     fn commit(&mut self, _trigger: &TriggerInfo) {
//!         // graphics-state mutation requests
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SimConfig::default();
//!     # let backend: Box<dyn GraphicsBackend> = unimplemented!();
//!     let world = World::new(&config, backend)?;
//!     world.add_processor(Box::new(Spin), ArmingCondition::frame_tick(), false);
//!     world.attach_surface(Surface {
//!         label: "main".into(),
//!         width: 1280,
//!         height: 720,
//!     })?;
//!     loop {
//!         let ready = world.poll();
//!         world.run_commit_list(ready)?;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod events;
pub mod foundation;
pub mod physics;
pub mod render;
pub mod schedule;

mod world;

pub use config::{ConfigError, SimConfig};
pub use world::{World, WorldError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::SimConfig,
        ecs::{
            Capabilities, CameraComponent, CollidableComponent, Component, DrawableComponent,
            Entity, EntityId, EnvironmentComponent, OverlayComponent, PassComponent,
            ProcessorComponent,
        },
        events::{EventId, InputBackend, InputEvent},
        foundation::math::{Mat4, Quat, Transform, Vec3},
        physics::{ColliderDesc, PhysicsBackend},
        render::{
            CameraRig, Drawable, EnvironmentMap, FrameRateListener, GraphicsBackend, Overlay,
            PostPass, SceneObject, Surface, UpdateQueue,
        },
        schedule::{ArmingCondition, CommitList, Processor, ProcessorId, TriggerInfo},
        World, WorldError,
    };
}
