//! Buffered input events
//!
//! The input collaborator delivers these in batches; the scheduler hands a
//! batch to every processor armed on input.

/// A single buffered input event
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Key was pressed
    KeyPressed(u32),

    /// Key was released
    KeyReleased(u32),

    /// Mouse button event
    MouseButton {
        /// The mouse button that was pressed/released
        button: u32,
        /// Whether the button was pressed (true) or released (false)
        pressed: bool,
    },

    /// Mouse movement
    MouseMoved {
        /// New X coordinate
        x: f64,
        /// New Y coordinate
        y: f64,
    },

    /// Window was resized
    WindowResized {
        /// New window width
        width: u32,
        /// New window height
        height: u32,
    },

    /// Window close requested
    WindowCloseRequested,
}

/// Registration seam for the input collaborator
///
/// `start_tracking`/`stop_tracking` calls on the world are forwarded here
/// verbatim; the backend is otherwise opaque to the core.
pub trait InputBackend: Send {
    /// Begin delivering events for the named device
    fn start_tracking(&mut self, device: &str);

    /// Stop delivering events for the named device
    fn stop_tracking(&mut self, device: &str);
}
