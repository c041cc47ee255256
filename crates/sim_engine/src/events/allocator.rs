//! Event ID allocation
//!
//! A pool of small non-negative integers. IDs are recycled: freeing an ID and
//! allocating again may return the same value. Callers must free an ID before
//! detaching the condition listening for it, otherwise a later owner of the
//! recycled ID will broadcast to the stale listener.

use thiserror::Error;

/// Identifier for an application-defined signal event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u32);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// Errors from event-pool operations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EventPoolError {
    /// The ID was not allocated (or already freed)
    #[error("event id {0} is not currently allocated")]
    NotAllocated(EventId),
}

/// Pool of reusable event IDs
///
/// `allocate` always returns the lowest free integer. The pool itself is not
/// synchronized; concurrent allocation requires external serialization
/// (the world façade wraps it in a mutex).
#[derive(Debug, Default)]
pub struct EventPool {
    in_use: Vec<bool>,
}

impl EventPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the lowest free event ID
    pub fn allocate(&mut self) -> EventId {
        for (i, used) in self.in_use.iter_mut().enumerate() {
            if !*used {
                *used = true;
                return EventId(i as u32);
            }
        }
        self.in_use.push(true);
        EventId((self.in_use.len() - 1) as u32)
    }

    /// Return an event ID to the free set
    pub fn free(&mut self, id: EventId) -> Result<(), EventPoolError> {
        match self.in_use.get_mut(id.0 as usize) {
            Some(used) if *used => {
                *used = false;
                Ok(())
            }
            _ => Err(EventPoolError::NotAllocated(id)),
        }
    }

    /// Whether the given ID is currently allocated
    pub fn is_allocated(&self, id: EventId) -> bool {
        self.in_use.get(id.0 as usize).copied().unwrap_or(false)
    }

    /// Number of currently allocated IDs
    pub fn allocated_count(&self) -> usize {
        self.in_use.iter().filter(|u| **u).count()
    }
}
