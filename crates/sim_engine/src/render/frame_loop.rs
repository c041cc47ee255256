//! The graphics-thread frame loop
//!
//! A dedicated thread that owns all presentation state. Each iteration
//! reconciles pending list changes, runs renderer-local processors and
//! one-shot callbacks, refreshes and draws through the backend, spends the
//! remaining frame budget on the outstanding commit list, fires the frame
//! tick, and paces itself to the desired interval. Deadline misses are
//! recorded by the rate counter only; there is no catch-up.

use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use thiserror::Error;

use crate::config::SimConfig;
use crate::foundation::time::FrameRateCounter;
use crate::render::backend::{BackendResult, GraphicsBackend, Surface};
use crate::render::shadow::{LiveCounts, SceneChange, ShadowLists, UpdateQueue};
use crate::schedule::commit::{run_phase, CommitList, Phase, ReadyProcessor};
use crate::schedule::scheduler::Scheduler;

/// States of the graphics-thread state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Thread not yet started
    Uninitialized,
    /// Backend initialized, parked until a presentation surface arrives
    WaitingForSurface,
    /// Iterating frames
    Running,
    /// Shutdown requested; finishing the in-flight commit list
    Draining,
    /// Thread exited
    Stopped,
}

/// Receives the measured frame rate every N completed frames
pub trait FrameRateListener: Send {
    /// A reporting window completed with the given measured rate
    fn frame_rate(&mut self, fps: f32);
}

impl<F: FnMut(f32) + Send> FrameRateListener for F {
    fn frame_rate(&mut self, fps: f32) {
        self(fps);
    }
}

/// Errors from interacting with the graphics thread
#[derive(Error, Debug)]
pub enum FrameLoopError {
    /// The graphics thread is not running; the request can never complete.
    /// Surfacing this is what keeps a rendezvous caller from blocking on a
    /// dead thread.
    #[error("graphics thread is stopped")]
    Stopped,

    /// The OS refused to spawn the graphics thread
    #[error("failed to spawn graphics thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// One-shot work executed on the graphics thread with backend access
pub type GraphicsCallback = Box<dyn FnOnce(&mut dyn GraphicsBackend) + Send>;

enum ControlMsg {
    AttachSurface(Surface),
    SetFrameInterval(Duration),
    SetRateListener {
        listener: Box<dyn FrameRateListener>,
        every_n: u64,
    },
    RunCallback(GraphicsCallback),
    Shutdown,
}

struct CommitSubmission {
    list: CommitList,
    done: Sender<()>,
}

struct PendingCommit {
    list: CommitList,
    done: Sender<()>,
}

/// Owning handle to the graphics thread
///
/// Dropping the handle shuts the thread down, draining any outstanding
/// commit list first.
pub struct GraphicsHandle {
    control_tx: Sender<ControlMsg>,
    commit_tx: Sender<CommitSubmission>,
    update_queue: UpdateQueue,
    join: Option<JoinHandle<()>>,
}

impl GraphicsHandle {
    /// Spawn the graphics thread around an initialized backend
    pub(crate) fn spawn(
        config: &SimConfig,
        backend: Box<dyn GraphicsBackend>,
        scheduler: Arc<Scheduler>,
    ) -> Result<Self, FrameLoopError> {
        let (control_tx, control_rx) = unbounded();
        // Zero capacity: a submission pairs directly with the graphics
        // thread, so at most one commit list is ever outstanding.
        let (commit_tx, commit_rx) = bounded(0);
        let (change_tx, change_rx) = bounded(config.change_queue_capacity);
        // Unbounded lane for the graphics thread's own changes; it cannot
        // block on the funnel it is the sole consumer of.
        let (renderer_change_tx, renderer_change_rx) = unbounded();
        let renderer_thread = Arc::new(OnceLock::new());
        let live = LiveCounts::default();
        let update_queue = UpdateQueue::new(
            change_tx,
            renderer_change_tx,
            Arc::clone(&renderer_thread),
            live.clone(),
        );

        let frame_interval = config.frame_interval();
        let rate_counter = FrameRateCounter::new(config.rate_report_interval);
        let join = thread::Builder::new().name("graphics".into()).spawn(move || {
            let _ = renderer_thread.set(thread::current().id());
            FrameLoop {
                backend,
                scheduler,
                shadow: ShadowLists::new(),
                control_rx,
                commit_rx,
                change_rx,
                renderer_change_rx,
                live,
                frame_interval,
                rate_counter,
                rate_listener: None,
                callbacks: Vec::new(),
                pending: None,
                state: LoopState::Uninitialized,
            }
            .run();
        })?;

        Ok(Self {
            control_tx,
            commit_tx,
            update_queue,
            join: Some(join),
        })
    }

    /// A cloneable handle for submitting scene changes
    pub fn update_queue(&self) -> UpdateQueue {
        self.update_queue.clone()
    }

    /// Supply the presentation surface; the loop starts iterating
    pub fn attach_surface(&self, surface: Surface) -> Result<(), FrameLoopError> {
        self.send_control(ControlMsg::AttachSurface(surface))
    }

    /// Change the target frame interval
    pub fn set_frame_interval(&self, interval: Duration) -> Result<(), FrameLoopError> {
        self.send_control(ControlMsg::SetFrameInterval(interval))
    }

    /// Register the frame-rate listener, reporting every `every_n` frames
    pub fn set_rate_listener(
        &self,
        listener: Box<dyn FrameRateListener>,
        every_n: u64,
    ) -> Result<(), FrameLoopError> {
        self.send_control(ControlMsg::SetRateListener { listener, every_n })
    }

    /// Queue a one-shot callback to run on the graphics thread
    pub fn run_callback(&self, callback: GraphicsCallback) -> Result<(), FrameLoopError> {
        self.send_control(ControlMsg::RunCallback(callback))
    }

    /// Submit a commit list and block until the graphics thread has executed
    /// every entry (and every chain link) in it
    ///
    /// The only cross-thread blocking rendezvous in the core. The submission
    /// pairs only once the frame loop is iterating: before a surface is
    /// attached the caller blocks until one arrives. Returns an error instead
    /// of blocking forever when the graphics thread is stopped; a shutdown
    /// that races with a submission still drains and signals it.
    pub fn run_commit_list(&self, list: CommitList) -> Result<(), FrameLoopError> {
        if list.is_empty() {
            return Ok(());
        }
        let (done_tx, done_rx) = bounded(1);
        self.commit_tx
            .send(CommitSubmission {
                list,
                done: done_tx,
            })
            .map_err(|_| FrameLoopError::Stopped)?;
        done_rx.recv().map_err(|_| FrameLoopError::Stopped)
    }

    /// Request shutdown and wait for the thread to drain and exit
    pub fn shutdown(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = self.control_tx.send(ControlMsg::Shutdown);
            if join.join().is_err() {
                log::error!("graphics thread panicked during shutdown");
            }
        }
    }

    fn send_control(&self, msg: ControlMsg) -> Result<(), FrameLoopError> {
        self.control_tx.send(msg).map_err(|_| FrameLoopError::Stopped)
    }
}

impl Drop for GraphicsHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct FrameLoop {
    backend: Box<dyn GraphicsBackend>,
    scheduler: Arc<Scheduler>,
    shadow: ShadowLists,
    control_rx: Receiver<ControlMsg>,
    commit_rx: Receiver<CommitSubmission>,
    change_rx: Receiver<SceneChange>,
    renderer_change_rx: Receiver<SceneChange>,
    live: LiveCounts,
    frame_interval: Duration,
    rate_counter: FrameRateCounter,
    rate_listener: Option<Box<dyn FrameRateListener>>,
    callbacks: Vec<GraphicsCallback>,
    pending: Option<PendingCommit>,
    state: LoopState,
}

impl FrameLoop {
    fn run(mut self) {
        log::info!("graphics thread started, waiting for surface");
        self.state = LoopState::WaitingForSurface;

        while self.state == LoopState::WaitingForSurface {
            match self.control_rx.recv() {
                Ok(msg) => self.handle_control(msg),
                Err(_) => self.state = LoopState::Draining,
            }
        }

        while self.state == LoopState::Running {
            self.iterate();
        }

        if self.state == LoopState::Draining {
            self.drain();
        }
        self.state = LoopState::Stopped;
        log::info!("graphics thread stopped");
    }

    /// One Running iteration
    fn iterate(&mut self) {
        let frame_start = Instant::now();

        loop {
            match self.control_rx.try_recv() {
                Ok(msg) => self.handle_control(msg),
                Err(crossbeam::channel::TryRecvError::Empty) => break,
                Err(crossbeam::channel::TryRecvError::Disconnected) => {
                    self.state = LoopState::Draining;
                }
            }
            if self.state != LoopState::Running {
                return;
            }
        }

        let _stats = self
            .shadow
            .reconcile(&self.change_rx, &self.renderer_change_rx, &self.live);

        if self.shadow.has_renderables() {
            self.render_frame();
        }

        self.run_commit_budgeted(frame_start);

        // Frame-tick conditions armed now are observed no earlier than the
        // next poll, which happens before the next frame's execution.
        self.scheduler.notify_frame_tick();

        let elapsed = frame_start.elapsed();
        if elapsed < self.frame_interval {
            thread::sleep(self.frame_interval - elapsed);
        }
        // A miss pushes the next frame later; no correction is attempted.

        if let Some(fps) = self.rate_counter.frame_completed() {
            if let Some(listener) = self.rate_listener.as_mut() {
                listener.frame_rate(fps);
            }
        }
    }

    fn handle_control(&mut self, msg: ControlMsg) {
        match msg {
            ControlMsg::AttachSurface(surface) => {
                let label = surface.label.clone();
                match self.backend.attach_surface(surface) {
                    Ok(()) => {
                        if self.state == LoopState::WaitingForSurface {
                            log::info!("surface '{label}' attached, frame loop running");
                            self.state = LoopState::Running;
                            // Measurement starts with the first real frame.
                            self.rate_counter.reset();
                        }
                    }
                    Err(e) => log::error!("failed to attach surface '{label}': {e}"),
                }
            }
            ControlMsg::SetFrameInterval(interval) => {
                self.frame_interval = interval;
            }
            ControlMsg::SetRateListener { listener, every_n } => {
                self.rate_counter.set_report_every(every_n);
                self.rate_listener = Some(listener);
            }
            ControlMsg::RunCallback(callback) => {
                self.callbacks.push(callback);
            }
            ControlMsg::Shutdown => {
                log::info!("graphics thread shutdown requested");
                self.state = LoopState::Draining;
            }
        }
    }

    /// Refresh queued state and draw the scene
    fn render_frame(&mut self) {
        // Processors that must run on this thread (e.g. camera follow).
        let mut local = self.scheduler.poll_renderer_local();
        while let Some(entry) = local.pop() {
            run_phase(&entry, Phase::Commit);
            self.scheduler.mark_committed(entry.id());
        }

        for callback in self.callbacks.drain(..) {
            callback(self.backend.as_mut());
        }

        for drawable in self.shadow.take_refresh_drawables() {
            note("refresh drawable", self.backend.refresh_drawable(&drawable));
        }
        for camera in self.shadow.take_refresh_cameras() {
            note("refresh camera", self.backend.refresh_camera(&camera));
        }
        for pass in self.shadow.take_refresh_passes() {
            note("refresh pass", self.backend.refresh_pass(&pass));
        }

        note("clear", self.backend.clear_buffers());
        for map in self.shadow.environments() {
            note("environment", self.backend.draw_environment(map));
        }
        for drawable in self.shadow.drawables() {
            if drawable.is_visible() {
                note("draw", self.backend.draw(drawable));
            }
        }
        for pass in self.shadow.passes() {
            if pass.is_enabled() {
                note("pass", self.backend.run_pass(pass));
            }
        }
        for overlay in self.shadow.overlays() {
            if overlay.is_visible() {
                note("overlay", self.backend.draw_overlay(overlay));
            }
        }
        note("present", self.backend.present());
    }

    /// Spend the remaining frame budget on the outstanding commit list
    ///
    /// The budget gates starting the next top-level entry only; a started
    /// chain runs to its end regardless. At least one entry runs per frame
    /// so an over-budget frame still makes progress. A list that does not
    /// finish within the budget resumes next frame; the submitter stays
    /// blocked until the list is exhausted.
    fn run_commit_budgeted(&mut self, frame_start: Instant) {
        if self.pending.is_none() {
            if let Ok(submission) = self.commit_rx.try_recv() {
                self.pending = Some(PendingCommit {
                    list: submission.list,
                    done: submission.done,
                });
            }
        }
        let exhausted = {
            let Some(pending) = self.pending.as_mut() else {
                return;
            };
            let mut ran_any = false;
            while !ran_any || frame_start.elapsed() < self.frame_interval {
                let Some(entry) = pending.list.pop() else {
                    break;
                };
                Self::commit_entry(&self.scheduler, &entry);
                ran_any = true;
            }
            pending.list.is_empty()
        };

        if exhausted {
            if let Some(finished) = self.pending.take() {
                // Release whichever thread is blocked in the rendezvous.
                let _ = finished.done.send(());
            }
        }
    }

    fn commit_entry(scheduler: &Scheduler, entry: &ReadyProcessor) {
        run_phase(entry, Phase::Commit);
        scheduler.mark_committed(entry.id());
    }

    /// Finish outstanding commit work before exiting so no submitter is
    /// left blocked on a dead thread
    fn drain(&mut self) {
        if let Some(mut pending) = self.pending.take() {
            while let Some(entry) = pending.list.pop() {
                Self::commit_entry(&self.scheduler, &entry);
            }
            let _ = pending.done.send(());
        }
        while let Ok(submission) = self.commit_rx.try_recv() {
            let mut list = submission.list;
            while let Some(entry) = list.pop() {
                Self::commit_entry(&self.scheduler, &entry);
            }
            let _ = submission.done.send(());
        }
    }
}

fn note(what: &str, result: BackendResult<()>) {
    if let Err(e) = result {
        log::error!("backend {what} failed: {e}");
    }
}
