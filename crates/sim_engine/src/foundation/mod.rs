//! Foundation utilities shared by every subsystem
//!
//! Small, dependency-light building blocks: timing, logging setup, and math
//! types used by scene objects and processors.

pub mod logging;
pub mod math;
pub mod time;
