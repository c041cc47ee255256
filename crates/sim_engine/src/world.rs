//! The world façade
//!
//! Top-level context object owning the registry, the scheduler, the event
//! pool, and the graphics-thread handle. There is no global state: multiple
//! independent worlds can coexist in one process, which is also how the
//! tests run.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;

use crate::config::SimConfig;
use crate::ecs::component::Capabilities;
use crate::ecs::entity::{Entity, EntityError};
use crate::ecs::registry::{EntityId, Registry};
use crate::ecs::Component;
use crate::events::allocator::{EventPool, EventPoolError};
use crate::events::input::InputBackend;
use crate::events::{EventId, InputEvent};
use crate::physics::PhysicsBackend;
use crate::render::frame_loop::{
    FrameLoopError, FrameRateListener, GraphicsCallback, GraphicsHandle,
};
use crate::render::shadow::{QueueError, UpdateQueue};
use crate::render::{GraphicsBackend, Surface};
use crate::schedule::{ArmingCondition, CommitList, Processor, ProcessorId, Scheduler};

const GRAPHICS_FAMILIES: Capabilities = Capabilities::DRAWABLE
    .union(Capabilities::CAMERA)
    .union(Capabilities::ENVIRONMENT)
    .union(Capabilities::PASS)
    .union(Capabilities::OVERLAY);

/// World-level errors
#[derive(Error, Debug)]
pub enum WorldError {
    /// The entity ID is not registered in this world
    #[error("unknown entity")]
    UnknownEntity,

    /// Entity mutation failed
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Event pool operation failed
    #[error(transparent)]
    EventPool(#[from] EventPoolError),

    /// The graphics thread is unavailable
    #[error(transparent)]
    Graphics(#[from] FrameLoopError),

    /// Frame rate must be positive
    #[error("invalid frame rate: {0}")]
    InvalidFrameRate(f32),
}

impl From<QueueError> for WorldError {
    fn from(_: QueueError) -> Self {
        Self::Graphics(FrameLoopError::Stopped)
    }
}

/// Top-level façade coordinating every subsystem
///
/// All methods take `&self` and are callable from any thread; the graphics
/// thread is spawned at construction and shut down (draining outstanding
/// commit work) when the world is dropped.
pub struct World {
    registry: Mutex<Registry>,
    scheduler: Arc<Scheduler>,
    graphics: GraphicsHandle,
    queue: UpdateQueue,
    events: Mutex<EventPool>,
    physics: Option<Mutex<Box<dyn PhysicsBackend>>>,
    input: Option<Mutex<Box<dyn InputBackend>>>,
}

impl World {
    /// Create a world around an initialized graphics backend
    ///
    /// Spawns the graphics thread; it parks until a surface is attached.
    pub fn new(config: &SimConfig, backend: Box<dyn GraphicsBackend>) -> Result<Self, WorldError> {
        log::info!(
            "initializing world (target {:.1} fps)",
            config.desired_frame_rate
        );
        let scheduler = Arc::new(Scheduler::new());
        let graphics = GraphicsHandle::spawn(config, backend, Arc::clone(&scheduler))?;
        let queue = graphics.update_queue();
        Ok(Self {
            registry: Mutex::new(Registry::new()),
            scheduler,
            graphics,
            queue,
            events: Mutex::new(EventPool::new()),
            physics: None,
            input: None,
        })
    }

    /// Attach the physics collaborator
    #[must_use]
    pub fn with_physics(mut self, backend: Box<dyn PhysicsBackend>) -> Self {
        self.physics = Some(Mutex::new(backend));
        self
    }

    /// Attach the input collaborator
    #[must_use]
    pub fn with_input(mut self, backend: Box<dyn InputBackend>) -> Self {
        self.input = Some(Mutex::new(backend));
        self
    }

    // ----- entities and components -------------------------------------

    /// Register an entity (and its sub-entities, recursively), routing each
    /// component to the subsystem its capability tags name
    pub fn add_entity(&self, entity: Entity) -> Result<EntityId, WorldError> {
        let mut registry = self.lock_registry();
        let id = registry.insert(entity);
        if let Some(entity) = registry.get_mut(id) {
            self.route_added(id, entity)?;
        }
        Ok(id)
    }

    /// Deregister an entity, undoing the routing of every component in it
    /// and its sub-entities
    pub fn remove_entity(&self, id: EntityId) -> Result<(), WorldError> {
        let mut entity = self
            .lock_registry()
            .remove(id)
            .ok_or(WorldError::UnknownEntity)?;
        self.route_removed(id, &mut entity)
    }

    /// Attach a component to a registered entity and route it
    pub fn add_component(
        &self,
        id: EntityId,
        mut component: Box<dyn Component>,
    ) -> Result<(), WorldError> {
        let mut registry = self.lock_registry();
        let entity = registry.get_mut(id).ok_or(WorldError::UnknownEntity)?;
        if entity.has_component_type(component.as_ref()) {
            return Err(EntityError::DuplicateComponent(component.type_name()).into());
        }
        self.route_component_added(id, &mut component)?;
        entity.add_component(component)?;
        Ok(())
    }

    /// Detach the component of type `T` from a registered entity,
    /// undoing its routing
    pub fn remove_component<T: Component>(&self, id: EntityId) -> Result<(), WorldError> {
        let mut component = {
            let mut registry = self.lock_registry();
            let entity = registry.get_mut(id).ok_or(WorldError::UnknownEntity)?;
            entity
                .remove_component::<T>()
                .ok_or(WorldError::UnknownEntity)?
        };
        self.route_component_removed(id, &mut component)
    }

    /// Number of registered entities
    pub fn entity_count(&self) -> usize {
        self.lock_registry().len()
    }

    fn route_added(&self, id: EntityId, entity: &mut Entity) -> Result<(), WorldError> {
        for component in entity.components_mut() {
            self.route_component_added(id, component)?;
        }
        for child in entity.children_mut() {
            self.route_added(id, child)?;
        }
        Ok(())
    }

    fn route_removed(&self, id: EntityId, entity: &mut Entity) -> Result<(), WorldError> {
        for component in entity.components_mut() {
            self.route_component_removed(id, component)?;
        }
        for child in entity.children_mut() {
            self.route_removed(id, child)?;
        }
        Ok(())
    }

    fn route_component_added(
        &self,
        id: EntityId,
        component: &mut Box<dyn Component>,
    ) -> Result<(), WorldError> {
        let caps = component.capabilities();
        if caps.intersects(GRAPHICS_FAMILIES) {
            if let Some(object) = component.scene_object() {
                self.queue.add(object)?;
            }
        }
        if caps.contains(Capabilities::COLLIDABLE) {
            if let (Some(physics), Some(collider)) = (&self.physics, component.collider()) {
                lock(physics).add_collidable(id, collider);
            }
        }
        if caps.contains(Capabilities::PROCESSOR) {
            if let Some(spec) = component.take_processor() {
                let pid =
                    self.scheduler
                        .add_processor(spec.processor, spec.condition, spec.renderer_local);
                component.set_processor_id(pid);
            }
        }
        Ok(())
    }

    fn route_component_removed(
        &self,
        id: EntityId,
        component: &mut Box<dyn Component>,
    ) -> Result<(), WorldError> {
        let caps = component.capabilities();
        if caps.intersects(GRAPHICS_FAMILIES) {
            if let Some(object) = component.scene_object() {
                self.queue.remove(object.family(), object.id())?;
            }
        }
        if caps.contains(Capabilities::COLLIDABLE) {
            if let Some(physics) = &self.physics {
                lock(physics).remove_collidable(id);
            }
        }
        if caps.contains(Capabilities::PROCESSOR) {
            if let Some(pid) = component.processor_id() {
                self.scheduler.remove_processor(pid);
            }
        }
        Ok(())
    }

    // ----- processors and scheduling -----------------------------------

    /// Register a free-standing processor, not tied to any entity
    pub fn add_processor(
        &self,
        processor: Box<dyn Processor>,
        condition: ArmingCondition,
        renderer_local: bool,
    ) -> ProcessorId {
        self.scheduler
            .add_processor(processor, condition, renderer_local)
    }

    /// Deregister a processor
    pub fn remove_processor(&self, id: ProcessorId) {
        self.scheduler.remove_processor(id);
    }

    /// Scan for ready processors, run their compute phase, and return the
    /// commit list for [`Self::run_commit_list`]
    ///
    /// The caller owes the list a submission: processors in it stay parked
    /// (never ready again) until their commit completes.
    pub fn poll(&self) -> CommitList {
        self.scheduler.poll()
    }

    /// Submit a commit list to the graphics thread and block until every
    /// entry (and every chain link) has committed
    ///
    /// The rendezvous pairs only while the frame loop is iterating; a
    /// submission made before a surface is attached blocks until one arrives.
    pub fn run_commit_list(&self, list: CommitList) -> Result<(), WorldError> {
        Ok(self.graphics.run_commit_list(list)?)
    }

    // ----- events -------------------------------------------------------

    /// Allocate the lowest free event ID
    pub fn allocate_event(&self) -> EventId {
        lock(&self.events).allocate()
    }

    /// Return an event ID to the pool
    ///
    /// Free before detaching the listening condition: a recycled ID
    /// broadcasts to whoever holds it now.
    pub fn free_event(&self, id: EventId) -> Result<(), WorldError> {
        Ok(lock(&self.events).free(id)?)
    }

    /// Broadcast an event to every listening condition; fire-and-forget,
    /// callable from any thread
    pub fn post_event(&self, id: EventId) {
        self.scheduler.notify_posted_event(id);
    }

    /// Deliver a buffered input batch from the input collaborator
    pub fn notify_input_batch(&self, events: &[InputEvent]) {
        self.scheduler.notify_input_batch(events);
    }

    /// Forward a device-tracking registration to the input collaborator
    pub fn start_tracking(&self, device: &str) {
        if let Some(input) = &self.input {
            lock(input).start_tracking(device);
        }
    }

    /// Forward a device-tracking deregistration to the input collaborator
    pub fn stop_tracking(&self, device: &str) {
        if let Some(input) = &self.input {
            lock(input).stop_tracking(device);
        }
    }

    // ----- graphics thread ---------------------------------------------

    /// Supply the presentation surface; the frame loop starts iterating
    pub fn attach_surface(&self, surface: Surface) -> Result<(), WorldError> {
        Ok(self.graphics.attach_surface(surface)?)
    }

    /// Change the target frame rate
    pub fn set_desired_frame_rate(&self, fps: f32) -> Result<(), WorldError> {
        if fps <= 0.0 {
            return Err(WorldError::InvalidFrameRate(fps));
        }
        let interval = Duration::from_secs_f64(1.0 / f64::from(fps));
        Ok(self.graphics.set_frame_interval(interval)?)
    }

    /// Register the frame-rate listener, reporting every `every_n` frames
    pub fn set_frame_rate_listener(
        &self,
        listener: Box<dyn FrameRateListener>,
        every_n: u64,
    ) -> Result<(), WorldError> {
        Ok(self.graphics.set_rate_listener(listener, every_n)?)
    }

    /// Queue a one-shot callback with backend access on the graphics thread
    pub fn run_on_graphics_thread(&self, callback: GraphicsCallback) -> Result<(), WorldError> {
        Ok(self.graphics.run_callback(callback)?)
    }

    /// A cloneable handle for commit-phase side effects (state refreshes)
    pub fn update_queue(&self) -> UpdateQueue {
        self.queue.clone()
    }

    /// Request shutdown and wait for the graphics thread to drain and exit
    pub fn shutdown(&mut self) {
        self.graphics.shutdown();
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        lock(&self.registry)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
