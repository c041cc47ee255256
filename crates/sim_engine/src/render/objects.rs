//! Shared scene objects
//!
//! These are the payloads that cross the thread boundary: the application
//! (and processors during commit) mutate the interior state, the graphics
//! thread reads it when refreshing and drawing. Each object carries a
//! process-unique identity so removals can name it without transferring
//! ownership.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::foundation::math::Transform;

static NEXT_SCENE_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneObjectId(u64);

impl SceneObjectId {
    fn next() -> Self {
        Self(NEXT_SCENE_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

fn lock_pose(pose: &Mutex<Transform>) -> MutexGuard<'_, Transform> {
    match pose.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A renderable object with an interior-mutable pose
pub struct Drawable {
    id: SceneObjectId,
    label: String,
    pose: Mutex<Transform>,
    visible: AtomicBool,
}

impl Drawable {
    /// Create a visible drawable at the identity pose
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: SceneObjectId::next(),
            label: label.into(),
            pose: Mutex::new(Transform::identity()),
            visible: AtomicBool::new(true),
        }
    }

    /// This object's identity
    pub fn id(&self) -> SceneObjectId {
        self.id
    }

    /// Diagnostic label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Snapshot the current pose
    pub fn pose(&self) -> Transform {
        lock_pose(&self.pose).clone()
    }

    /// Replace the pose (typically from a processor's commit phase)
    pub fn set_pose(&self, pose: Transform) {
        *lock_pose(&self.pose) = pose;
    }

    /// Mutate the pose in place
    pub fn update_pose(&self, f: impl FnOnce(&mut Transform)) {
        f(&mut lock_pose(&self.pose));
    }

    /// Whether the object should be drawn
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// Show or hide the object
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }
}

/// Interior camera state
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    /// Camera pose in world space
    pub pose: Transform,
    /// Vertical field of view in degrees
    pub fov_y_deg: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            pose: Transform::identity(),
            fov_y_deg: 60.0,
        }
    }
}

/// A camera with interior-mutable state
pub struct CameraRig {
    id: SceneObjectId,
    label: String,
    state: Mutex<CameraState>,
}

impl CameraRig {
    /// Create a camera rig with default state
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: SceneObjectId::next(),
            label: label.into(),
            state: Mutex::new(CameraState::default()),
        }
    }

    /// This object's identity
    pub fn id(&self) -> SceneObjectId {
        self.id
    }

    /// Diagnostic label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Snapshot the current state
    pub fn state(&self) -> CameraState {
        match self.state.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Mutate the state in place
    pub fn update_state(&self, f: impl FnOnce(&mut CameraState)) {
        match self.state.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

/// A skybox/environment map
pub struct EnvironmentMap {
    id: SceneObjectId,
    label: String,
}

impl EnvironmentMap {
    /// Create an environment map
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: SceneObjectId::next(),
            label: label.into(),
        }
    }

    /// This object's identity
    pub fn id(&self) -> SceneObjectId {
        self.id
    }

    /// Diagnostic label
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A post-processing pass
pub struct PostPass {
    id: SceneObjectId,
    label: String,
    enabled: AtomicBool,
}

impl PostPass {
    /// Create an enabled pass
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: SceneObjectId::next(),
            label: label.into(),
            enabled: AtomicBool::new(true),
        }
    }

    /// This object's identity
    pub fn id(&self) -> SceneObjectId {
        self.id
    }

    /// Diagnostic label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the pass should run
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enable or disable the pass
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

/// A 2D overlay drawn after the scene
pub struct Overlay {
    id: SceneObjectId,
    label: String,
    visible: AtomicBool,
}

impl Overlay {
    /// Create a visible overlay
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: SceneObjectId::next(),
            label: label.into(),
            visible: AtomicBool::new(true),
        }
    }

    /// This object's identity
    pub fn id(&self) -> SceneObjectId {
        self.id
    }

    /// Diagnostic label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the overlay should be drawn
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// Show or hide the overlay
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }
}

/// The graphics-relevant list families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListFamily {
    /// Renderable objects
    Drawables,
    /// Camera rigs
    Cameras,
    /// Environment maps
    Environments,
    /// Post-processing passes
    Passes,
    /// 2D overlays
    Overlays,
}

impl ListFamily {
    /// All families, in reconciliation order
    pub const ALL: [ListFamily; 5] = [
        ListFamily::Drawables,
        ListFamily::Cameras,
        ListFamily::Environments,
        ListFamily::Passes,
        ListFamily::Overlays,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Drawables => 0,
            Self::Cameras => 1,
            Self::Environments => 2,
            Self::Passes => 3,
            Self::Overlays => 4,
        }
    }
}

impl std::fmt::Display for ListFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Drawables => "drawables",
            Self::Cameras => "cameras",
            Self::Environments => "environments",
            Self::Passes => "passes",
            Self::Overlays => "overlays",
        };
        f.write_str(name)
    }
}

/// A shared scene object tagged with its list family
#[derive(Clone)]
pub enum SceneObject {
    /// A renderable object
    Drawable(std::sync::Arc<Drawable>),
    /// A camera rig
    Camera(std::sync::Arc<CameraRig>),
    /// An environment map
    Environment(std::sync::Arc<EnvironmentMap>),
    /// A post-processing pass
    Pass(std::sync::Arc<PostPass>),
    /// A 2D overlay
    Overlay(std::sync::Arc<Overlay>),
}

impl SceneObject {
    /// The list family this object belongs to
    pub fn family(&self) -> ListFamily {
        match self {
            Self::Drawable(_) => ListFamily::Drawables,
            Self::Camera(_) => ListFamily::Cameras,
            Self::Environment(_) => ListFamily::Environments,
            Self::Pass(_) => ListFamily::Passes,
            Self::Overlay(_) => ListFamily::Overlays,
        }
    }

    /// This object's identity
    pub fn id(&self) -> SceneObjectId {
        match self {
            Self::Drawable(d) => d.id(),
            Self::Camera(c) => c.id(),
            Self::Environment(e) => e.id(),
            Self::Pass(p) => p.id(),
            Self::Overlay(o) => o.id(),
        }
    }
}
