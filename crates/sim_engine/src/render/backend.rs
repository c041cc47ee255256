//! Backend abstraction for the graphics collaborator
//!
//! The frame loop drives a backend through this trait and never touches
//! windowing or draw-call details itself. Backends are moved onto the
//! graphics thread at spawn time and stay there.

use thiserror::Error;

use super::objects::{CameraRig, Drawable, EnvironmentMap, Overlay, PostPass};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a graphics backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// The presentation surface is gone (window closed, device lost)
    #[error("presentation surface lost: {0}")]
    SurfaceLost(String),

    /// Any other backend failure
    #[error("graphics backend failure: {0}")]
    Failure(String),
}

/// A presentation surface supplied by the windowing collaborator
#[derive(Debug, Clone)]
pub struct Surface {
    /// Diagnostic label (window title, canvas id)
    pub label: String,

    /// Surface width in pixels
    pub width: u32,

    /// Surface height in pixels
    pub height: u32,
}

/// The rendering seam the frame loop drives once per iteration
///
/// Refresh calls push changed geometric/camera/pass state down to the
/// backend; the draw sequence each frame is clear, environment, drawables,
/// passes, overlays, present.
pub trait GraphicsBackend: Send {
    /// A presentation surface became available
    fn attach_surface(&mut self, surface: Surface) -> BackendResult<()>;

    /// Push a drawable's current state to the backend
    fn refresh_drawable(&mut self, drawable: &Drawable) -> BackendResult<()>;

    /// Push a camera's current state to the backend
    fn refresh_camera(&mut self, camera: &CameraRig) -> BackendResult<()>;

    /// Push a pass's current state to the backend
    fn refresh_pass(&mut self, pass: &PostPass) -> BackendResult<()>;

    /// Clear color/depth buffers
    fn clear_buffers(&mut self) -> BackendResult<()>;

    /// Draw the environment/skybox
    fn draw_environment(&mut self, map: &EnvironmentMap) -> BackendResult<()>;

    /// Draw one object
    fn draw(&mut self, drawable: &Drawable) -> BackendResult<()>;

    /// Run one post-processing pass
    fn run_pass(&mut self, pass: &PostPass) -> BackendResult<()>;

    /// Draw one overlay
    fn draw_overlay(&mut self, overlay: &Overlay) -> BackendResult<()>;

    /// Present the finished frame
    fn present(&mut self) -> BackendResult<()>;
}
