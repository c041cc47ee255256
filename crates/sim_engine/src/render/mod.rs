//! Graphics-thread machinery
//!
//! A single dedicated thread owns all presentation state: private shadow
//! copies of every graphics-relevant list, the per-frame reconciliation of
//! pending changes, and the time-bounded execution of commit lists. Actual
//! drawing is delegated across the [`backend::GraphicsBackend`] seam.

pub mod backend;
pub mod frame_loop;
pub mod objects;
pub mod shadow;

pub use backend::{BackendError, BackendResult, GraphicsBackend, Surface};
pub use frame_loop::{FrameLoopError, FrameRateListener, GraphicsHandle, LoopState};
pub use objects::{
    CameraRig, Drawable, EnvironmentMap, ListFamily, Overlay, PostPass, SceneObject, SceneObjectId,
};
pub use shadow::UpdateQueue;
