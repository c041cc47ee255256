//! End-to-end tests driving a world against a recording graphics backend.
//!
//! These exercise the full path: entity routing, the scene-change funnel
//! into the graphics thread, the poll/commit rendezvous, and frame pacing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use sim_engine::prelude::*;
use sim_engine::render::{BackendResult, SceneObjectId};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    AttachSurface(String),
    RefreshDrawable(SceneObjectId),
    Draw(SceneObjectId),
    Present,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn contains(&self, call: &Call) -> bool {
        self.calls.lock().unwrap().contains(call)
    }
}

struct RecordingBackend {
    recorder: Recorder,
}

impl GraphicsBackend for RecordingBackend {
    fn attach_surface(&mut self, surface: Surface) -> BackendResult<()> {
        self.recorder.record(Call::AttachSurface(surface.label));
        Ok(())
    }

    fn refresh_drawable(&mut self, drawable: &Drawable) -> BackendResult<()> {
        self.recorder.record(Call::RefreshDrawable(drawable.id()));
        Ok(())
    }

    fn refresh_camera(&mut self, _camera: &CameraRig) -> BackendResult<()> {
        Ok(())
    }

    fn refresh_pass(&mut self, _pass: &PostPass) -> BackendResult<()> {
        Ok(())
    }

    fn clear_buffers(&mut self) -> BackendResult<()> {
        Ok(())
    }

    fn draw_environment(&mut self, _map: &EnvironmentMap) -> BackendResult<()> {
        Ok(())
    }

    fn draw(&mut self, drawable: &Drawable) -> BackendResult<()> {
        self.recorder.record(Call::Draw(drawable.id()));
        Ok(())
    }

    fn run_pass(&mut self, _pass: &PostPass) -> BackendResult<()> {
        Ok(())
    }

    fn draw_overlay(&mut self, _overlay: &Overlay) -> BackendResult<()> {
        Ok(())
    }

    fn present(&mut self) -> BackendResult<()> {
        self.recorder.record(Call::Present);
        Ok(())
    }
}

fn recording_world(fps: f32) -> (World, Recorder) {
    let recorder = Recorder::default();
    let config = SimConfig {
        desired_frame_rate: fps,
        ..SimConfig::default()
    };
    let backend = RecordingBackend {
        recorder: recorder.clone(),
    };
    let world = World::new(&config, Box::new(backend)).unwrap();
    (world, recorder)
}

fn surface() -> Surface {
    Surface {
        label: "test".into(),
        width: 640,
        height: 480,
    }
}

fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn added_drawable_is_refreshed_then_drawn() {
    let (world, recorder) = recording_world(200.0);
    let drawable = Arc::new(Drawable::new("ship"));
    let id = drawable.id();
    world
        .add_entity(Entity::new().with_component(DrawableComponent { drawable }))
        .unwrap();
    world.attach_surface(surface()).unwrap();

    assert!(wait_until(Duration::from_secs(2), || recorder
        .contains(&Call::Draw(id))));

    let calls = recorder.calls();
    let refreshes = calls
        .iter()
        .filter(|c| **c == Call::RefreshDrawable(id))
        .count();
    assert_eq!(refreshes, 1, "new drawable is refreshed exactly once");
    let refresh_pos = calls
        .iter()
        .position(|c| *c == Call::RefreshDrawable(id))
        .unwrap();
    let draw_pos = calls.iter().position(|c| *c == Call::Draw(id)).unwrap();
    assert!(refresh_pos < draw_pos, "refresh precedes the first draw");
    assert!(calls.contains(&Call::Present));
}

#[test]
fn removed_drawable_is_not_drawn_again() {
    let (world, recorder) = recording_world(200.0);
    let keeper = Arc::new(Drawable::new("keeper"));
    let keeper_id = keeper.id();
    let victim = Arc::new(Drawable::new("victim"));
    let victim_id = victim.id();
    world
        .add_entity(Entity::new().with_component(DrawableComponent { drawable: keeper }))
        .unwrap();
    let victim_entity = world
        .add_entity(Entity::new().with_component(DrawableComponent { drawable: victim }))
        .unwrap();
    world.attach_surface(surface()).unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
        recorder.contains(&Call::Draw(keeper_id)) && recorder.contains(&Call::Draw(victim_id))
    }));

    world.remove_entity(victim_entity).unwrap();
    // Give the graphics thread time to reconcile the removal, then discard
    // everything drawn up to that point.
    thread::sleep(Duration::from_millis(100));
    recorder.take();

    assert!(wait_until(Duration::from_secs(2), || recorder
        .contains(&Call::Draw(keeper_id))));
    let calls = recorder.calls();
    assert!(
        !calls.contains(&Call::Draw(victim_id)),
        "removed drawable must not be drawn after reconciliation"
    );
    assert_eq!(world.entity_count(), 1);
}

#[derive(Clone, Default)]
struct Journal {
    entries: Arc<Mutex<Vec<(&'static str, &'static str)>>>,
}

impl Journal {
    fn push(&self, label: &'static str, phase: &'static str) {
        self.entries.lock().unwrap().push((label, phase));
    }

    fn entries(&self) -> Vec<(&'static str, &'static str)> {
        self.entries.lock().unwrap().clone()
    }
}

struct ChainLink {
    label: &'static str,
    journal: Journal,
    next: Option<Box<ChainLink>>,
}

impl Processor for ChainLink {
    fn compute(&mut self, _trigger: &TriggerInfo) {
        self.journal.push(self.label, "compute");
    }

    fn commit(&mut self, _trigger: &TriggerInfo) {
        self.journal.push(self.label, "commit");
    }

    fn next_in_chain(&mut self) -> Option<&mut dyn Processor> {
        self.next.as_deref_mut().map(|link| link as &mut dyn Processor)
    }
}

#[test]
fn chain_commits_complete_before_rendezvous_returns() {
    let (world, _recorder) = recording_world(200.0);
    world.attach_surface(surface()).unwrap();

    let journal = Journal::default();
    let chain = ChainLink {
        label: "head",
        journal: journal.clone(),
        next: Some(Box::new(ChainLink {
            label: "tail",
            journal: journal.clone(),
            next: None,
        })),
    };
    let event = world.allocate_event();
    world.add_processor(
        Box::new(chain),
        ArmingCondition::posted_event([event]),
        false,
    );

    world.post_event(event);
    let list = world.poll();
    assert_eq!(list.len(), 1, "a chain is one commit-list entry");
    // The whole chain computes at poll time, in chain order.
    assert_eq!(
        journal.entries(),
        vec![("head", "compute"), ("tail", "compute")]
    );

    world.run_commit_list(list).unwrap();
    // Once the rendezvous releases, every link has committed, in order.
    let entries = journal.entries();
    assert_eq!(
        &entries[2..],
        &[("head", "commit"), ("tail", "commit")],
        "both commits land before the submitter resumes"
    );
}

struct PostedLog {
    firings: Arc<Mutex<Vec<Vec<EventId>>>>,
}

impl Processor for PostedLog {
    fn compute(&mut self, trigger: &TriggerInfo) {
        self.firings.lock().unwrap().push(trigger.posted_ids().to_vec());
    }

    fn commit(&mut self, _trigger: &TriggerInfo) {}
}

#[test]
fn each_firing_carries_only_its_own_events() {
    let (world, _recorder) = recording_world(200.0);
    world.attach_surface(surface()).unwrap();

    let firings = Arc::new(Mutex::new(Vec::new()));
    let first = world.allocate_event();
    let second = world.allocate_event();
    world.add_processor(
        Box::new(PostedLog {
            firings: Arc::clone(&firings),
        }),
        ArmingCondition::posted_event([first, second]),
        false,
    );

    world.post_event(first);
    world.run_commit_list(world.poll()).unwrap();
    world.post_event(second);
    let list = world.poll();
    assert_eq!(list.len(), 1);
    world.run_commit_list(list).unwrap();

    assert_eq!(
        *firings.lock().unwrap(),
        vec![vec![first], vec![second]],
        "the first firing's event does not leak into the second"
    );
}

struct InputLog {
    batches: Arc<Mutex<Vec<Vec<InputEvent>>>>,
}

impl Processor for InputLog {
    fn compute(&mut self, trigger: &TriggerInfo) {
        self.batches
            .lock()
            .unwrap()
            .push(trigger.input_events().to_vec());
    }

    fn commit(&mut self, _trigger: &TriggerInfo) {}
}

#[test]
fn input_batches_reach_armed_processors() {
    let (world, _recorder) = recording_world(200.0);
    world.attach_surface(surface()).unwrap();
    let batches = Arc::new(Mutex::new(Vec::new()));
    world.add_processor(
        Box::new(InputLog {
            batches: Arc::clone(&batches),
        }),
        ArmingCondition::input(),
        false,
    );

    assert!(world.poll().is_empty(), "no batch, no firing");
    world.notify_input_batch(&[InputEvent::KeyPressed(32), InputEvent::KeyReleased(32)]);
    let list = world.poll();
    assert_eq!(list.len(), 1);
    assert_eq!(
        *batches.lock().unwrap(),
        vec![vec![InputEvent::KeyPressed(32), InputEvent::KeyReleased(32)]]
    );
    world.run_commit_list(list).unwrap();

    // Committed and re-armed: a fresh batch fires again.
    world.notify_input_batch(&[InputEvent::WindowCloseRequested]);
    let list = world.poll();
    assert_eq!(list.len(), 1);
    world.run_commit_list(list).unwrap();
    assert_eq!(batches.lock().unwrap().len(), 2);
}

struct CommitCounter {
    commits: Arc<AtomicUsize>,
}

impl Processor for CommitCounter {
    fn compute(&mut self, _trigger: &TriggerInfo) {}

    fn commit(&mut self, _trigger: &TriggerInfo) {
        self.commits.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn processor_component_runs_renderer_local_until_removed() {
    let (world, _recorder) = recording_world(200.0);
    let commits = Arc::new(AtomicUsize::new(0));
    let entity = world
        .add_entity(
            Entity::new()
                .with_component(DrawableComponent {
                    drawable: Arc::new(Drawable::new("prop")),
                })
                .with_component(ProcessorComponent::new(
                    Box::new(CommitCounter {
                        commits: Arc::clone(&commits),
                    }),
                    ArmingCondition::frame_tick(),
                    true,
                )),
        )
        .unwrap();
    world.attach_surface(surface()).unwrap();

    // Renderer-local processors commit on the graphics thread without any
    // poll/run_commit_list call from this thread.
    assert!(wait_until(Duration::from_secs(2), || {
        commits.load(Ordering::SeqCst) >= 2
    }));

    world.remove_component::<ProcessorComponent>(entity).unwrap();
    thread::sleep(Duration::from_millis(100));
    let settled = commits.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(
        commits.load(Ordering::SeqCst),
        settled,
        "a deregistered processor stops firing"
    );
}

#[test]
fn frame_pacing_tracks_the_target_rate() {
    let (world, _recorder) = recording_world(30.0);
    let reports: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    world
        .set_frame_rate_listener(
            Box::new(move |fps: f32| sink.lock().unwrap().push(fps)),
            10,
        )
        .unwrap();
    world.attach_surface(surface()).unwrap();

    thread::sleep(Duration::from_millis(1300));

    let reports = reports.lock().unwrap();
    assert!(reports.len() >= 2, "expected several reports, got {reports:?}");
    // Sleep pacing never runs fast; leave generous headroom below the
    // target for loaded machines.
    for &fps in reports.iter().skip(1) {
        assert!(fps < 36.0, "measured {fps} fps against a 30 fps target");
        assert!(fps > 18.0, "measured {fps} fps against a 30 fps target");
    }
}

struct Idle;

impl Processor for Idle {
    fn compute(&mut self, _trigger: &TriggerInfo) {}

    fn commit(&mut self, _trigger: &TriggerInfo) {}
}

struct RefreshStorm {
    queue: UpdateQueue,
    drawable: Arc<Drawable>,
    bursts: usize,
}

impl Processor for RefreshStorm {
    fn compute(&mut self, _trigger: &TriggerInfo) {}

    fn commit(&mut self, _trigger: &TriggerInfo) {
        for _ in 0..self.bursts {
            self.queue
                .request_refresh(SceneObject::Drawable(Arc::clone(&self.drawable)))
                .unwrap();
        }
    }
}

#[test]
fn commit_refresh_burst_larger_than_the_funnel_completes() {
    let recorder = Recorder::default();
    let config = SimConfig {
        desired_frame_rate: 200.0,
        change_queue_capacity: 4,
        ..SimConfig::default()
    };
    let backend = RecordingBackend {
        recorder: recorder.clone(),
    };
    let world = World::new(&config, Box::new(backend)).unwrap();
    let drawable = Arc::new(Drawable::new("swarm"));
    let id = drawable.id();
    world
        .add_entity(Entity::new().with_component(DrawableComponent {
            drawable: Arc::clone(&drawable),
        }))
        .unwrap();
    world.attach_surface(surface()).unwrap();
    assert!(wait_until(Duration::from_secs(2), || recorder
        .contains(&Call::Draw(id))));

    let event = world.allocate_event();
    world.add_processor(
        Box::new(RefreshStorm {
            queue: world.update_queue(),
            drawable,
            bursts: 32,
        }),
        ArmingCondition::posted_event([event]),
        false,
    );
    world.post_event(event);
    let list = world.poll();
    assert_eq!(list.len(), 1);

    // A commit flooding the change funnel far past its capacity must not
    // wedge the graphics thread on its own queue.
    let world = Arc::new(world);
    let submitter = {
        let world = Arc::clone(&world);
        thread::spawn(move || world.run_commit_list(list))
    };
    assert!(
        wait_until(Duration::from_secs(3), || submitter.is_finished()),
        "rendezvous must release even when the commit floods the change funnel"
    );
    submitter.join().unwrap().unwrap();

    // Every queued refresh still reaches the backend on a later frame.
    assert!(wait_until(Duration::from_secs(2), || {
        recorder
            .calls()
            .iter()
            .filter(|c| **c == Call::RefreshDrawable(id))
            .count()
            >= 33
    }));
}

#[test]
fn rendezvous_waits_for_a_running_frame_loop() {
    let (world, _recorder) = recording_world(200.0);
    let event = world.allocate_event();
    world.add_processor(Box::new(Idle), ArmingCondition::posted_event([event]), false);
    world.post_event(event);
    let list = world.poll();
    assert_eq!(list.len(), 1);

    let world = Arc::new(world);
    let submitter = {
        let world = Arc::clone(&world);
        thread::spawn(move || world.run_commit_list(list))
    };
    thread::sleep(Duration::from_millis(100));
    assert!(
        !submitter.is_finished(),
        "no surface yet, the submission cannot pair"
    );

    world.attach_surface(surface()).unwrap();
    assert!(wait_until(Duration::from_secs(2), || submitter.is_finished()));
    submitter.join().unwrap().unwrap();
}

#[derive(Debug, Clone, PartialEq)]
enum PhysicsCall {
    Added(EntityId, ColliderDesc),
    Removed(EntityId),
}

#[derive(Clone, Default)]
struct RecordingPhysics {
    calls: Arc<Mutex<Vec<PhysicsCall>>>,
}

impl PhysicsBackend for RecordingPhysics {
    fn add_collidable(&mut self, entity: EntityId, collider: &ColliderDesc) {
        self.calls
            .lock()
            .unwrap()
            .push(PhysicsCall::Added(entity, collider.clone()));
    }

    fn remove_collidable(&mut self, entity: EntityId) {
        self.calls.lock().unwrap().push(PhysicsCall::Removed(entity));
    }
}

#[test]
fn collidable_components_route_to_the_physics_backend() {
    let physics = RecordingPhysics::default();
    let world = recording_world(200.0)
        .0
        .with_physics(Box::new(physics.clone()));

    let hull = ColliderDesc::sphere(1.0);
    let fin = ColliderDesc::aabb(Vec3::new(0.5, 0.1, 0.2));
    let entity = world
        .add_entity(
            Entity::new()
                .with_component(CollidableComponent {
                    collider: hull.clone(),
                })
                .with_child(Entity::new().with_component(CollidableComponent {
                    collider: fin.clone(),
                })),
        )
        .unwrap();
    // Parent components first, then sub-entities, all under the parent's id.
    assert_eq!(
        *physics.calls.lock().unwrap(),
        vec![
            PhysicsCall::Added(entity, hull),
            PhysicsCall::Added(entity, fin)
        ]
    );

    world.remove_entity(entity).unwrap();
    let calls = physics.calls.lock().unwrap();
    assert_eq!(
        &calls[2..],
        &[PhysicsCall::Removed(entity), PhysicsCall::Removed(entity)]
    );
}

struct RecordingTracker {
    calls: Arc<Mutex<Vec<(String, bool)>>>,
}

impl InputBackend for RecordingTracker {
    fn start_tracking(&mut self, device: &str) {
        self.calls.lock().unwrap().push((device.to_string(), true));
    }

    fn stop_tracking(&mut self, device: &str) {
        self.calls.lock().unwrap().push((device.to_string(), false));
    }
}

#[test]
fn tracking_registrations_forward_to_the_input_backend() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let world = recording_world(200.0).0.with_input(Box::new(RecordingTracker {
        calls: Arc::clone(&calls),
    }));

    world.start_tracking("gamepad0");
    world.stop_tracking("gamepad0");
    assert_eq!(
        *calls.lock().unwrap(),
        vec![("gamepad0".to_string(), true), ("gamepad0".to_string(), false)]
    );
}

#[test]
fn commit_submission_after_shutdown_errors_instead_of_blocking() {
    let (mut world, _recorder) = recording_world(200.0);
    let event = world.allocate_event();
    world.add_processor(Box::new(Idle), ArmingCondition::posted_event([event]), false);
    world.post_event(event);
    let list = world.poll();
    assert!(!list.is_empty());

    world.shutdown();
    let err = world.run_commit_list(list).unwrap_err();
    assert!(matches!(err, WorldError::Graphics(_)));
}

#[test]
fn independent_worlds_coexist() {
    let (world_a, recorder_a) = recording_world(200.0);
    let (world_b, recorder_b) = recording_world(200.0);
    let drawable_a = Arc::new(Drawable::new("a"));
    let id_a = drawable_a.id();
    let drawable_b = Arc::new(Drawable::new("b"));
    let id_b = drawable_b.id();
    world_a
        .add_entity(Entity::new().with_component(DrawableComponent {
            drawable: drawable_a,
        }))
        .unwrap();
    world_b
        .add_entity(Entity::new().with_component(DrawableComponent {
            drawable: drawable_b,
        }))
        .unwrap();
    world_a.attach_surface(surface()).unwrap();
    world_b.attach_surface(surface()).unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
        recorder_a.contains(&Call::Draw(id_a)) && recorder_b.contains(&Call::Draw(id_b))
    }));
    assert!(!recorder_a.calls().contains(&Call::Draw(id_b)));
    assert!(!recorder_b.calls().contains(&Call::Draw(id_a)));
}
