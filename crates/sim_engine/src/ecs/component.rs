//! Component trait and built-in capability payloads
//!
//! Classification is by capability tag, not by type inspection: every
//! component declares the tagged interfaces it implements, and the routing
//! code switches exhaustively on tags. Adding a component kind means
//! declaring its tags and (if graphics- or physics-relevant) overriding the
//! matching accessor.

use std::any::Any;
use std::sync::Arc;

use bitflags::bitflags;

use crate::physics::ColliderDesc;
use crate::render::objects::{CameraRig, Drawable, EnvironmentMap, Overlay, PostPass, SceneObject};
use crate::schedule::{ArmingCondition, Processor, ProcessorId};

bitflags! {
    /// Capability tags a component can declare
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        /// Appears in the graphics thread's drawable list
        const DRAWABLE    = 1 << 0;
        /// Appears in the graphics thread's camera list
        const CAMERA      = 1 << 1;
        /// Appears in the graphics thread's environment-map list
        const ENVIRONMENT = 1 << 2;
        /// Appears in the graphics thread's post-processing pass list
        const PASS        = 1 << 3;
        /// Appears in the graphics thread's overlay list
        const OVERLAY     = 1 << 4;
        /// Forwarded to the physics backend
        const COLLIDABLE  = 1 << 5;
        /// Registered with the processor scheduler
        const PROCESSOR   = 1 << 6;
    }
}

/// Typed capability payload attached to exactly one entity at a time
///
/// The default accessor implementations return nothing; a component overrides
/// the accessors matching its declared tags.
pub trait Component: Any + Send {
    /// The capability tags this component declares
    fn capabilities(&self) -> Capabilities;

    /// Diagnostic name of the concrete component type
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The shared scene object for graphics-tagged components
    fn scene_object(&self) -> Option<SceneObject> {
        None
    }

    /// The collider description for `COLLIDABLE` components
    fn collider(&self) -> Option<&ColliderDesc> {
        None
    }

    /// Take the processor registration payload, once, for `PROCESSOR`
    /// components
    fn take_processor(&mut self) -> Option<ProcessorSpec> {
        None
    }

    /// The scheduler identity assigned when this component was registered
    fn processor_id(&self) -> Option<ProcessorId> {
        None
    }

    /// Record the scheduler identity after registration
    fn set_processor_id(&mut self, _id: ProcessorId) {}

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Everything needed to register a processor with the scheduler
pub struct ProcessorSpec {
    /// The processor itself (head of its chain)
    pub processor: Box<dyn Processor>,
    /// Its arming condition, bound exactly once at registration
    pub condition: ArmingCondition,
    /// Whether both phases must run on the graphics thread
    pub renderer_local: bool,
}

/// Component carrying a drawable scene object
pub struct DrawableComponent {
    /// The shared drawable, also held by the graphics thread's shadow list
    pub drawable: Arc<Drawable>,
}

impl Component for DrawableComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::DRAWABLE
    }

    fn scene_object(&self) -> Option<SceneObject> {
        Some(SceneObject::Drawable(Arc::clone(&self.drawable)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Component carrying a camera rig
pub struct CameraComponent {
    /// The shared camera rig
    pub rig: Arc<CameraRig>,
}

impl Component for CameraComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CAMERA
    }

    fn scene_object(&self) -> Option<SceneObject> {
        Some(SceneObject::Camera(Arc::clone(&self.rig)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Component carrying an environment map
pub struct EnvironmentComponent {
    /// The shared environment map
    pub map: Arc<EnvironmentMap>,
}

impl Component for EnvironmentComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ENVIRONMENT
    }

    fn scene_object(&self) -> Option<SceneObject> {
        Some(SceneObject::Environment(Arc::clone(&self.map)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Component carrying a post-processing pass
pub struct PassComponent {
    /// The shared pass
    pub pass: Arc<PostPass>,
}

impl Component for PassComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PASS
    }

    fn scene_object(&self) -> Option<SceneObject> {
        Some(SceneObject::Pass(Arc::clone(&self.pass)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Component carrying a 2D overlay
pub struct OverlayComponent {
    /// The shared overlay
    pub overlay: Arc<Overlay>,
}

impl Component for OverlayComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::OVERLAY
    }

    fn scene_object(&self) -> Option<SceneObject> {
        Some(SceneObject::Overlay(Arc::clone(&self.overlay)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Component forwarded to the physics backend
pub struct CollidableComponent {
    /// Collision shape description, opaque to the core
    pub collider: ColliderDesc,
}

impl Component for CollidableComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::COLLIDABLE
    }

    fn collider(&self) -> Option<&ColliderDesc> {
        Some(&self.collider)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Component registering a processor with the scheduler
///
/// The registration payload is taken when the owning entity is added to the
/// world; afterwards the component only remembers the assigned scheduler
/// identity so removal can deregister it.
pub struct ProcessorComponent {
    spec: Option<ProcessorSpec>,
    registered: Option<ProcessorId>,
}

impl ProcessorComponent {
    /// Create a processor component from its registration payload
    pub fn new(
        processor: Box<dyn Processor>,
        condition: ArmingCondition,
        renderer_local: bool,
    ) -> Self {
        Self {
            spec: Some(ProcessorSpec {
                processor,
                condition,
                renderer_local,
            }),
            registered: None,
        }
    }
}

impl Component for ProcessorComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PROCESSOR
    }

    fn take_processor(&mut self) -> Option<ProcessorSpec> {
        self.spec.take()
    }

    fn processor_id(&self) -> Option<ProcessorId> {
        self.registered
    }

    fn set_processor_id(&mut self, id: ProcessorId) {
        self.registered = Some(id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
