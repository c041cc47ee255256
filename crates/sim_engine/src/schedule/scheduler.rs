//! The processor manager
//!
//! Tracks every processor and its arming condition, receives trigger
//! notifications from any thread, and decides which processors become
//! eligible to run. Polling runs the compute phase for everything that became
//! ready and returns a commit list for the graphics thread.

use std::sync::{Arc, Mutex};

use crate::events::{EventId, InputEvent};
use crate::schedule::commit::{run_phase, CommitList, Phase, ReadyProcessor, SharedProcessor};
use crate::schedule::condition::ArmingCondition;
use crate::schedule::processor::Processor;

/// Unique identifier for a registered processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessorId(pub(crate) u64);

struct ProcessorSlot {
    id: ProcessorId,
    processor: SharedProcessor,
    condition: ArmingCondition,
    renderer_local: bool,
    /// A firing has been consumed but its commit has not yet completed;
    /// the slot stays out of the ready scan until re-armed.
    in_flight: bool,
}

#[derive(Default)]
struct SchedulerState {
    slots: Vec<ProcessorSlot>,
    next_id: u64,
}

/// Tracks processors and their arming conditions; decides who runs
///
/// All notification entry points are callable from any thread. No priority
/// exists between independently-armed processors: they become ready in scan
/// order, and callers relying on ordering between them have a latent bug.
#[derive(Default)]
pub struct Scheduler {
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor with its arming condition
    ///
    /// Binds the condition to the processor; a processor cannot be scheduled
    /// without one. `renderer_local` processors run both phases on the
    /// graphics thread and never appear in polled commit lists.
    pub fn add_processor(
        &self,
        processor: Box<dyn Processor>,
        condition: ArmingCondition,
        renderer_local: bool,
    ) -> ProcessorId {
        let mut state = self.lock_state();
        let id = ProcessorId(state.next_id);
        state.next_id += 1;
        state.slots.push(ProcessorSlot {
            id,
            processor: Arc::new(Mutex::new(processor)),
            condition,
            renderer_local,
            in_flight: false,
        });
        log::debug!("registered processor {id:?} (renderer_local={renderer_local})");
        id
    }

    /// Deregister a processor; a no-op for unknown IDs
    ///
    /// The condition goes with it, so there is no partially-detached state:
    /// replacing a composite condition means remove + add, atomically from
    /// the scheduler's point of view.
    pub fn remove_processor(&self, id: ProcessorId) {
        let mut state = self.lock_state();
        state.slots.retain(|slot| slot.id != id);
    }

    /// Number of registered processors
    pub fn processor_count(&self) -> usize {
        self.lock_state().slots.len()
    }

    /// Record a completed frame for every frame-tick condition
    pub fn notify_frame_tick(&self) {
        let mut state = self.lock_state();
        for slot in &mut state.slots {
            slot.condition.note_frame_tick();
        }
    }

    /// Broadcast a posted event to every listening condition
    pub fn notify_posted_event(&self, id: EventId) {
        let mut state = self.lock_state();
        for slot in &mut state.slots {
            slot.condition.note_posted_event(id);
        }
    }

    /// Deliver a buffered input batch to every input condition
    pub fn notify_input_batch(&self, events: &[InputEvent]) {
        let mut state = self.lock_state();
        for slot in &mut state.slots {
            slot.condition.note_input_batch(events);
        }
    }

    /// Scan for fully-triggered processors, run their compute phase, and
    /// return them as a commit list
    ///
    /// Renderer-local processors are excluded; the frame loop runs those
    /// itself. The scheduler lock is released before any compute call runs.
    ///
    /// Every entry is now in flight: the caller must see the list through
    /// commit ([`Self::mark_committed`] per entry, normally via the graphics
    /// thread's commit pass). A list dropped unexecuted leaves its
    /// processors parked forever.
    pub fn poll(&self) -> CommitList {
        self.poll_filtered(false)
    }

    /// Like [`Self::poll`], restricted to renderer-local processors
    ///
    /// Only the graphics thread should call this.
    pub fn poll_renderer_local(&self) -> CommitList {
        self.poll_filtered(true)
    }

    fn poll_filtered(&self, renderer_local: bool) -> CommitList {
        let mut list = CommitList::new();
        {
            let mut state = self.lock_state();
            for slot in &mut state.slots {
                if slot.renderer_local != renderer_local || slot.in_flight {
                    continue;
                }
                if slot.condition.is_triggered() {
                    let trigger = slot.condition.consume();
                    slot.in_flight = true;
                    list.push(ReadyProcessor {
                        id: slot.id,
                        processor: Arc::clone(&slot.processor),
                        trigger,
                    });
                }
            }
        }
        for entry in list.iter() {
            run_phase(entry, Phase::Compute);
        }
        list
    }

    /// Re-arm a processor's condition after its commit completed
    ///
    /// Clears the triggered state exactly once per firing; until this call
    /// the processor cannot become ready again.
    pub fn mark_committed(&self, id: ProcessorId) {
        let mut state = self.lock_state();
        if let Some(slot) = state.slots.iter_mut().find(|slot| slot.id == id) {
            slot.condition.rearm();
            slot.in_flight = false;
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SchedulerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::condition::TriggerInfo;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProcessor {
        computes: Arc<AtomicU32>,
    }

    impl Processor for CountingProcessor {
        fn compute(&mut self, _trigger: &TriggerInfo) {
            self.computes.fetch_add(1, Ordering::SeqCst);
        }

        fn commit(&mut self, _trigger: &TriggerInfo) {}
    }

    fn counting(scheduler: &Scheduler, condition: ArmingCondition) -> (ProcessorId, Arc<AtomicU32>) {
        let computes = Arc::new(AtomicU32::new(0));
        let id = scheduler.add_processor(
            Box::new(CountingProcessor {
                computes: computes.clone(),
            }),
            condition,
            false,
        );
        (id, computes)
    }

    #[test]
    fn frame_tick_processor_ready_at_most_once_per_tick() {
        let scheduler = Scheduler::new();
        let (id, computes) = counting(&scheduler, ArmingCondition::frame_tick());

        scheduler.notify_frame_tick();
        let list = scheduler.poll();
        assert_eq!(list.len(), 1);
        assert_eq!(computes.load(Ordering::SeqCst), 1);

        // Not re-armed yet: another poll finds nothing, even after a tick.
        scheduler.notify_frame_tick();
        assert!(scheduler.poll().is_empty());

        scheduler.mark_committed(id);
        scheduler.notify_frame_tick();
        assert_eq!(scheduler.poll().len(), 1);
        assert_eq!(computes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn posted_event_firing_clears_between_polls() {
        let scheduler = Scheduler::new();
        let (id, _) = counting(
            &scheduler,
            ArmingCondition::posted_event([EventId(7), EventId(9)]),
        );

        scheduler.notify_posted_event(EventId(7));
        scheduler.notify_posted_event(EventId(7));
        let mut list = scheduler.poll();
        let entry = list.pop().expect("ready");
        assert_eq!(entry.trigger().posted_ids(), &[EventId(7)]);
        scheduler.mark_committed(id);

        scheduler.notify_posted_event(EventId(9));
        let mut list = scheduler.poll();
        let entry = list.pop().expect("ready");
        assert_eq!(entry.trigger().posted_ids(), &[EventId(9)]);
    }

    #[test]
    fn renderer_local_processors_only_appear_in_local_polls() {
        let scheduler = Scheduler::new();
        let computes = Arc::new(AtomicU32::new(0));
        scheduler.add_processor(
            Box::new(CountingProcessor {
                computes: computes.clone(),
            }),
            ArmingCondition::frame_tick(),
            true,
        );
        scheduler.notify_frame_tick();
        assert!(scheduler.poll().is_empty());
        assert_eq!(scheduler.poll_renderer_local().len(), 1);
    }

    #[test]
    fn removed_processor_never_becomes_ready() {
        let scheduler = Scheduler::new();
        let (id, _) = counting(&scheduler, ArmingCondition::frame_tick());
        scheduler.remove_processor(id);
        scheduler.notify_frame_tick();
        assert!(scheduler.poll().is_empty());
        assert_eq!(scheduler.processor_count(), 0);
    }

    #[test]
    fn unsubmitted_list_keeps_processors_parked() {
        let scheduler = Scheduler::new();
        let (id, _) = counting(&scheduler, ArmingCondition::frame_tick());

        scheduler.notify_frame_tick();
        drop(scheduler.poll());

        // The firing was consumed but never committed: no amount of ticking
        // re-offers the processor.
        scheduler.notify_frame_tick();
        assert!(scheduler.poll().is_empty());

        scheduler.mark_committed(id);
        scheduler.notify_frame_tick();
        assert_eq!(scheduler.poll().len(), 1);
    }

    #[test]
    fn starved_processor_is_simply_never_ready() {
        let scheduler = Scheduler::new();
        let (_, computes) = counting(&scheduler, ArmingCondition::posted_event([EventId(42)]));
        scheduler.notify_frame_tick();
        scheduler.notify_posted_event(EventId(1));
        assert!(scheduler.poll().is_empty());
        assert_eq!(computes.load(Ordering::SeqCst), 0);
    }
}
