//! Processor scheduling
//!
//! The arming/triggering scheduler: conditions record stimuli, the scheduler
//! decides which processors become eligible, and commit lists carry their
//! graphics-thread work across the thread boundary.

pub mod commit;
pub mod condition;
pub mod processor;
pub mod scheduler;

pub use commit::CommitList;
pub use condition::{ArmingCondition, TriggerInfo};
pub use processor::Processor;
pub use scheduler::{ProcessorId, Scheduler};
