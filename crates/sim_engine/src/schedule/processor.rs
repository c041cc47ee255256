//! Processors: schedulable two-phase units of per-frame logic

use crate::schedule::condition::TriggerInfo;

/// A schedulable unit of per-frame logic with a two-phase contract
///
/// `compute` runs on whichever thread polls the scheduler and must not touch
/// graphics state; `commit` always runs on the graphics thread and is the
/// only phase permitted to request graphics-state mutation. Side effects from
/// commit (refresh requests, posted events, entity changes) go through queue
/// handles and are applied asynchronously, never inline.
pub trait Processor: Send {
    /// First phase: pure logic, off the graphics thread
    fn compute(&mut self, trigger: &TriggerInfo);

    /// Second phase: graphics-state mutation requests, on the graphics thread
    fn commit(&mut self, trigger: &TriggerInfo);

    /// The next processor in this chain, if any
    ///
    /// Chain links have no arming condition of their own: once the head of a
    /// chain runs, every link runs, each link's commit after its
    /// predecessor's. A started chain always runs to completion, even past
    /// the frame's time budget, so keep chains short.
    fn next_in_chain(&mut self) -> Option<&mut dyn Processor> {
        None
    }
}

/// Walk a chain from its head, applying `f` to every link in order
pub fn for_each_link(head: &mut dyn Processor, f: &mut dyn FnMut(&mut dyn Processor)) {
    f(head);
    if let Some(next) = head.next_in_chain() {
        for_each_link(next, f);
    }
}

/// Length of the chain starting at `head` (including the head)
pub fn chain_len(head: &mut dyn Processor) -> usize {
    let mut len = 0;
    for_each_link(head, &mut |_| len += 1);
    len
}
