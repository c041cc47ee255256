//! Application-defined signal events and buffered input
//!
//! Events are small integer IDs allocated from a reusable pool. Posting an
//! event is a fire-and-forget broadcast to every arming condition currently
//! listening for that ID.

pub mod allocator;
pub mod input;

pub use allocator::{EventId, EventPool, EventPoolError};
pub use input::{InputBackend, InputEvent};
