//! Shadow lists and change reconciliation
//!
//! For each graphics-relevant collection the graphics thread keeps a private
//! render-view copy distinct from whatever the application mutates. Changes
//! arrive through a bounded single-consumer funnel and are applied once per
//! frame, never mid-draw, so no shared mutable containers exist between
//! threads. Additions land on the matching "needs state refresh" queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use crossbeam::channel::{Receiver, Sender, TrySendError};
use thiserror::Error;

use super::objects::{
    CameraRig, Drawable, EnvironmentMap, ListFamily, Overlay, PostPass, SceneObject, SceneObjectId,
};

/// A pending mutation of one graphics-relevant list
pub enum SceneChange {
    /// Append the object to its family's shadow list
    Add(SceneObject),
    /// Drop the identified object from the family's shadow list
    Remove(ListFamily, SceneObjectId),
    /// Re-enqueue the object onto its family's refresh queue
    Refresh(SceneObject),
}

/// Errors from submitting changes to the graphics thread
#[derive(Error, Debug)]
pub enum QueueError {
    /// The graphics thread has stopped; the change can never apply
    #[error("graphics thread is stopped, change queue disconnected")]
    Disconnected,
}

/// Writer-side counters of the live list sizes, one per family
///
/// The reconciler compares these against the shadow-list sizes after each
/// drain; divergence indicates a missed add/remove and is logged, not fatal.
#[derive(Clone, Default)]
pub(crate) struct LiveCounts {
    counts: Arc<[AtomicUsize; 5]>,
}

impl LiveCounts {
    pub(crate) fn incr(&self, family: ListFamily) {
        self.counts[family.index()].fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn decr(&self, family: ListFamily) {
        self.counts[family.index()].fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn get(&self, family: ListFamily) -> usize {
        self.counts[family.index()].load(Ordering::SeqCst)
    }
}

/// Cloneable handle for submitting scene changes from any thread
///
/// This is the funnel into the graphics thread; processors hold one to
/// request state refreshes from their commit phase, the world holds one to
/// route entity adds/removes. Two lanes feed the same reconciliation pass: a
/// bounded lane that applies backpressure to application threads, and an
/// unbounded lane for changes originating on the graphics thread itself,
/// which must never block on the funnel it is responsible for draining.
#[derive(Clone)]
pub struct UpdateQueue {
    tx: Sender<SceneChange>,
    renderer_tx: Sender<SceneChange>,
    renderer_thread: Arc<OnceLock<ThreadId>>,
    live: LiveCounts,
}

impl UpdateQueue {
    pub(crate) fn new(
        tx: Sender<SceneChange>,
        renderer_tx: Sender<SceneChange>,
        renderer_thread: Arc<OnceLock<ThreadId>>,
        live: LiveCounts,
    ) -> Self {
        Self {
            tx,
            renderer_tx,
            renderer_thread,
            live,
        }
    }

    /// Queue an object for addition to its family's list
    pub fn add(&self, object: SceneObject) -> Result<(), QueueError> {
        self.live.incr(object.family());
        self.send(SceneChange::Add(object))
    }

    /// Queue an object for removal from its family's list
    pub fn remove(&self, family: ListFamily, id: SceneObjectId) -> Result<(), QueueError> {
        self.live.decr(family);
        self.send(SceneChange::Remove(family, id))
    }

    /// Queue a state refresh for an already-added object
    ///
    /// The usual commit-phase side effect: the object's new state reaches the
    /// backend on the next frame, never synchronously.
    pub fn request_refresh(&self, object: SceneObject) -> Result<(), QueueError> {
        self.send(SceneChange::Refresh(object))
    }

    fn send(&self, change: SceneChange) -> Result<(), QueueError> {
        // The graphics thread is the funnel's only consumer and drains it
        // between frames; a blocking send from a commit phase would deadlock
        // it on its own queue. Its changes take the unbounded lane.
        if self.renderer_thread.get().copied() == Some(thread::current().id()) {
            return self
                .renderer_tx
                .send(change)
                .map_err(|_| QueueError::Disconnected);
        }
        // Bounded lane: block the producer rather than grow without limit.
        match self.tx.try_send(change) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(change)) => {
                self.tx.send(change).map_err(|_| QueueError::Disconnected)
            }
            Err(TrySendError::Disconnected(_)) => Err(QueueError::Disconnected),
        }
    }
}

/// Per-frame reconciliation statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Objects appended to shadow lists
    pub added: usize,
    /// Objects dropped from shadow lists
    pub removed: usize,
    /// Objects queued for a state refresh (including additions)
    pub refreshed: usize,
}

/// The graphics thread's private render-view copies of every list family
#[derive(Default)]
pub struct ShadowLists {
    drawables: Vec<Arc<Drawable>>,
    cameras: Vec<Arc<CameraRig>>,
    environments: Vec<Arc<EnvironmentMap>>,
    passes: Vec<Arc<PostPass>>,
    overlays: Vec<Arc<Overlay>>,

    refresh_drawables: Vec<Arc<Drawable>>,
    refresh_cameras: Vec<Arc<CameraRig>>,
    refresh_passes: Vec<Arc<PostPass>>,
}

impl ShadowLists {
    /// Create empty shadow lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain both change lanes and apply every pending mutation
    ///
    /// An empty funnel is a no-op: nothing is touched and no refresh entries
    /// are produced. After the drain, shadow sizes are checked against the
    /// writer-side live counts.
    pub(crate) fn reconcile(
        &mut self,
        rx: &Receiver<SceneChange>,
        renderer_rx: &Receiver<SceneChange>,
        live: &LiveCounts,
    ) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        while let Ok(change) = rx.try_recv() {
            self.apply(change, &mut stats);
        }
        while let Ok(change) = renderer_rx.try_recv() {
            self.apply(change, &mut stats);
        }
        self.check_divergence(live);
        stats
    }

    fn apply(&mut self, change: SceneChange, stats: &mut ReconcileStats) {
        match change {
            SceneChange::Add(object) => {
                stats.added += 1;
                match object {
                    SceneObject::Drawable(d) => {
                        stats.refreshed += 1;
                        self.refresh_drawables.push(Arc::clone(&d));
                        self.drawables.push(d);
                    }
                    SceneObject::Camera(c) => {
                        stats.refreshed += 1;
                        self.refresh_cameras.push(Arc::clone(&c));
                        self.cameras.push(c);
                    }
                    SceneObject::Environment(e) => self.environments.push(e),
                    SceneObject::Pass(p) => {
                        stats.refreshed += 1;
                        self.refresh_passes.push(Arc::clone(&p));
                        self.passes.push(p);
                    }
                    SceneObject::Overlay(o) => self.overlays.push(o),
                }
            }
            SceneChange::Remove(family, id) => {
                stats.removed += 1;
                match family {
                    ListFamily::Drawables => {
                        self.drawables.retain(|d| d.id() != id);
                        self.refresh_drawables.retain(|d| d.id() != id);
                    }
                    ListFamily::Cameras => {
                        self.cameras.retain(|c| c.id() != id);
                        self.refresh_cameras.retain(|c| c.id() != id);
                    }
                    ListFamily::Environments => self.environments.retain(|e| e.id() != id),
                    ListFamily::Passes => {
                        self.passes.retain(|p| p.id() != id);
                        self.refresh_passes.retain(|p| p.id() != id);
                    }
                    ListFamily::Overlays => self.overlays.retain(|o| o.id() != id),
                }
            }
            SceneChange::Refresh(object) => match object {
                SceneObject::Drawable(d) => {
                    stats.refreshed += 1;
                    self.refresh_drawables.push(d);
                }
                SceneObject::Camera(c) => {
                    stats.refreshed += 1;
                    self.refresh_cameras.push(c);
                }
                SceneObject::Pass(p) => {
                    stats.refreshed += 1;
                    self.refresh_passes.push(p);
                }
                // No backend refresh state exists for these families.
                SceneObject::Environment(_) | SceneObject::Overlay(_) => {}
            },
        }
    }

    fn check_divergence(&self, live: &LiveCounts) {
        for family in ListFamily::ALL {
            let shadow = self.len(family);
            let expected = live.get(family);
            if shadow != expected {
                log::warn!(
                    "shadow list {family} holds {shadow} objects but live list holds {expected}"
                );
            }
        }
    }

    /// Size of one family's shadow list
    pub fn len(&self, family: ListFamily) -> usize {
        match family {
            ListFamily::Drawables => self.drawables.len(),
            ListFamily::Cameras => self.cameras.len(),
            ListFamily::Environments => self.environments.len(),
            ListFamily::Passes => self.passes.len(),
            ListFamily::Overlays => self.overlays.len(),
        }
    }

    /// Whether there is anything to draw this frame
    pub fn has_renderables(&self) -> bool {
        !self.drawables.is_empty() || !self.environments.is_empty() || !self.overlays.is_empty()
    }

    /// The drawable shadow list
    pub fn drawables(&self) -> &[Arc<Drawable>] {
        &self.drawables
    }

    /// The camera shadow list
    pub fn cameras(&self) -> &[Arc<CameraRig>] {
        &self.cameras
    }

    /// The environment shadow list
    pub fn environments(&self) -> &[Arc<EnvironmentMap>] {
        &self.environments
    }

    /// The pass shadow list
    pub fn passes(&self) -> &[Arc<PostPass>] {
        &self.passes
    }

    /// The overlay shadow list
    pub fn overlays(&self) -> &[Arc<Overlay>] {
        &self.overlays
    }

    pub(crate) fn take_refresh_drawables(&mut self) -> Vec<Arc<Drawable>> {
        std::mem::take(&mut self.refresh_drawables)
    }

    pub(crate) fn take_refresh_cameras(&mut self) -> Vec<Arc<CameraRig>> {
        std::mem::take(&mut self.refresh_cameras)
    }

    pub(crate) fn take_refresh_passes(&mut self) -> Vec<Arc<PostPass>> {
        std::mem::take(&mut self.refresh_passes)
    }

    #[cfg(test)]
    fn refresh_len(&self) -> usize {
        self.refresh_drawables.len() + self.refresh_cameras.len() + self.refresh_passes.len()
    }
}
