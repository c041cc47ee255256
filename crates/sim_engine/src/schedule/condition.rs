//! Arming conditions
//!
//! An arming condition gates when a processor becomes eligible to run. A
//! condition records stimuli (frame ticks, posted events, input batches) as
//! they arrive; the scheduler polls the triggered state and hands the
//! accumulated stimulus data to the processor's compute phase.

use crate::events::{EventId, InputEvent};

/// Accumulated stimulus data handed to a processor's compute/commit phases
///
/// Opaque to the scheduler: processors interpret whichever parts their
/// condition populates.
#[derive(Debug, Clone, Default)]
pub struct TriggerInfo {
    frame_ticked: bool,
    posted: Vec<EventId>,
    input: Vec<InputEvent>,
}

impl TriggerInfo {
    /// Whether a frame tick contributed to this firing
    pub fn frame_ticked(&self) -> bool {
        self.frame_ticked
    }

    /// Event IDs that fired since the last clear, duplicates coalesced
    pub fn posted_ids(&self) -> &[EventId] {
        &self.posted
    }

    /// The buffered input batch, if input contributed to this firing
    pub fn input_events(&self) -> &[InputEvent] {
        &self.input
    }
}

/// Predicate gating when a processor becomes eligible to run
///
/// A composite condition triggers only once every child has triggered at
/// least once since the last re-arm (AND-semantics). Triggered state is
/// cleared exactly once per firing, after the owning processor's commit has
/// completed.
#[derive(Debug)]
pub enum ArmingCondition {
    /// Triggers once per completed frame
    FrameTick {
        /// Whether a tick has been recorded since the last re-arm
        armed: bool,
    },

    /// Triggers when any of a fixed set of event IDs is posted
    PostedEvent {
        /// IDs this condition listens for
        listen: Vec<EventId>,
        /// IDs that actually fired since the last re-arm (coalesced)
        fired: Vec<EventId>,
    },

    /// Triggers when a buffered batch of input events is available
    Input {
        /// Whether a batch has arrived since the last re-arm
        armed: bool,
        /// The accumulated batch
        batch: Vec<InputEvent>,
    },

    /// Triggers once every child condition has triggered (AND, not OR)
    Composite(Vec<ArmingCondition>),
}

impl ArmingCondition {
    /// Condition that triggers once per completed frame
    pub fn frame_tick() -> Self {
        Self::FrameTick { armed: false }
    }

    /// Condition that triggers on any of the given posted event IDs
    pub fn posted_event(ids: impl IntoIterator<Item = EventId>) -> Self {
        Self::PostedEvent {
            listen: ids.into_iter().collect(),
            fired: Vec::new(),
        }
    }

    /// Condition that triggers when buffered input arrives
    pub fn input() -> Self {
        Self::Input {
            armed: false,
            batch: Vec::new(),
        }
    }

    /// Condition that triggers once all children have triggered
    pub fn composite(children: Vec<ArmingCondition>) -> Self {
        Self::Composite(children)
    }

    /// Record a completed frame tick
    pub fn note_frame_tick(&mut self) {
        match self {
            Self::FrameTick { armed } => *armed = true,
            Self::Composite(children) => {
                for child in children {
                    child.note_frame_tick();
                }
            }
            _ => {}
        }
    }

    /// Record a posted event, idempotent per ID
    pub fn note_posted_event(&mut self, id: EventId) {
        match self {
            Self::PostedEvent { listen, fired } => {
                if listen.contains(&id) && !fired.contains(&id) {
                    fired.push(id);
                }
            }
            Self::Composite(children) => {
                for child in children {
                    child.note_posted_event(id);
                }
            }
            _ => {}
        }
    }

    /// Record an available input batch
    pub fn note_input_batch(&mut self, events: &[InputEvent]) {
        match self {
            Self::Input { armed, batch } => {
                *armed = true;
                batch.extend_from_slice(events);
            }
            Self::Composite(children) => {
                for child in children {
                    child.note_input_batch(events);
                }
            }
            _ => {}
        }
    }

    /// Whether the condition has fully triggered since its last re-arm
    ///
    /// An empty composite never triggers.
    pub fn is_triggered(&self) -> bool {
        match self {
            Self::FrameTick { armed } => *armed,
            Self::PostedEvent { fired, .. } => !fired.is_empty(),
            Self::Input { armed, .. } => *armed,
            Self::Composite(children) => {
                !children.is_empty() && children.iter().all(Self::is_triggered)
            }
        }
    }

    /// Move the accumulated stimulus data out for the current firing
    ///
    /// Armed flags stay set until [`Self::rearm`]; the scheduler keeps the
    /// processor out of the ready scan in between, so a firing is consumed
    /// exactly once.
    pub fn consume(&mut self) -> TriggerInfo {
        let mut info = TriggerInfo::default();
        self.drain_into(&mut info);
        info
    }

    fn drain_into(&mut self, info: &mut TriggerInfo) {
        match self {
            Self::FrameTick { armed } => info.frame_ticked |= *armed,
            Self::PostedEvent { fired, .. } => {
                for id in fired.drain(..) {
                    if !info.posted.contains(&id) {
                        info.posted.push(id);
                    }
                }
            }
            Self::Input { batch, .. } => info.input.append(batch),
            Self::Composite(children) => {
                for child in children {
                    child.drain_into(info);
                }
            }
        }
    }

    /// Clear the triggered state so the condition can trigger again
    ///
    /// Called once per firing, after the owning processor's commit returns.
    /// Stimuli recorded between consume and re-arm are dropped.
    pub fn rearm(&mut self) {
        match self {
            Self::FrameTick { armed } => *armed = false,
            Self::PostedEvent { fired, .. } => fired.clear(),
            Self::Input { armed, batch } => {
                *armed = false;
                batch.clear();
            }
            Self::Composite(children) => {
                for child in children {
                    child.rearm();
                }
            }
        }
    }
}
