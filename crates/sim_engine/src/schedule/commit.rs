//! Commit lists
//!
//! A commit list is an ordered, immutable snapshot of ready processors whose
//! compute phase has already run. The graphics thread consumes the list,
//! running each entry's commit phase (and its whole chain), before the
//! submitting thread is released from the rendezvous. At most one list is
//! outstanding at a time.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::schedule::condition::TriggerInfo;
use crate::schedule::processor::{for_each_link, Processor};
use crate::schedule::scheduler::ProcessorId;

/// A processor shared between the scheduler and the graphics thread
pub type SharedProcessor = Arc<Mutex<Box<dyn Processor>>>;

/// Which phase of the two-phase contract to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// The off-graphics-thread logic phase
    Compute,
    /// The graphics-thread mutation phase
    Commit,
}

/// A ready processor, its firing data, and its scheduler identity
pub struct ReadyProcessor {
    pub(crate) id: ProcessorId,
    pub(crate) processor: SharedProcessor,
    pub(crate) trigger: TriggerInfo,
}

impl ReadyProcessor {
    /// Scheduler identity of this entry's processor
    pub fn id(&self) -> ProcessorId {
        self.id
    }

    /// The firing data handed to both phases
    pub fn trigger(&self) -> &TriggerInfo {
        &self.trigger
    }
}

/// An ordered batch of ready processors awaiting their commit phase
#[derive(Default)]
pub struct CommitList {
    entries: VecDeque<ReadyProcessor>,
}

impl CommitList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the list has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of top-level entries (chains count as one)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn push(&mut self, entry: ReadyProcessor) {
        self.entries.push_back(entry);
    }

    pub(crate) fn pop(&mut self) -> Option<ReadyProcessor> {
        self.entries.pop_front()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ReadyProcessor> {
        self.entries.iter()
    }
}

impl Drop for CommitList {
    fn drop(&mut self) {
        // Entries still present never committed; their conditions stay
        // consumed and the scheduler will not offer them again.
        if !self.entries.is_empty() {
            log::warn!(
                "commit list dropped with {} unexecuted entries; their processors stay parked",
                self.entries.len()
            );
        }
    }
}

/// Run one phase for an entry's whole chain, in chain order
///
/// A panic inside the processor is caught, logged, and treated as the end of
/// that entry's pass; the caller continues with the next scheduled processor
/// rather than aborting the loop.
pub(crate) fn run_phase(entry: &ReadyProcessor, phase: Phase) -> bool {
    let mut guard = match entry.processor.lock() {
        Ok(guard) => guard,
        // A previous panic poisoned the lock; the state is the processor's
        // own responsibility, keep running it.
        Err(poisoned) => poisoned.into_inner(),
    };
    let head: &mut dyn Processor = guard.as_mut();
    let trigger = &entry.trigger;
    let result = catch_unwind(AssertUnwindSafe(|| {
        for_each_link(head, &mut |link| match phase {
            Phase::Compute => link.compute(trigger),
            Phase::Commit => link.commit(trigger),
        });
    }));
    if let Err(payload) = result {
        let what = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        log::error!(
            "processor {:?} panicked during {:?}: {what}; continuing",
            entry.id,
            phase
        );
        return false;
    }
    true
}
