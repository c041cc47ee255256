//! Pulse demo application
//!
//! Drives the engine headless through a console backend: a spinning satellite
//! updated once per frame, and a status overlay blinked by a timer-posted
//! event. Demonstrates entity routing, processor chains, the poll/commit
//! rendezvous, and frame-rate reporting without a real GPU.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sim_engine::prelude::*;
use sim_engine::render::BackendResult;

/// Backend that narrates draw traffic to the log instead of a GPU
struct ConsoleBackend {
    frames: u64,
}

impl ConsoleBackend {
    fn new() -> Self {
        Self { frames: 0 }
    }
}

impl GraphicsBackend for ConsoleBackend {
    fn attach_surface(&mut self, surface: Surface) -> BackendResult<()> {
        log::info!(
            "surface '{}' attached ({}x{})",
            surface.label,
            surface.width,
            surface.height
        );
        Ok(())
    }

    fn refresh_drawable(&mut self, drawable: &Drawable) -> BackendResult<()> {
        log::info!("refreshing drawable '{}'", drawable.label());
        Ok(())
    }

    fn refresh_camera(&mut self, camera: &CameraRig) -> BackendResult<()> {
        log::info!("refreshing camera '{}'", camera.label());
        Ok(())
    }

    fn refresh_pass(&mut self, pass: &PostPass) -> BackendResult<()> {
        log::info!("refreshing pass '{}'", pass.label());
        Ok(())
    }

    fn clear_buffers(&mut self) -> BackendResult<()> {
        Ok(())
    }

    fn draw_environment(&mut self, map: &EnvironmentMap) -> BackendResult<()> {
        log::trace!("environment '{}'", map.label());
        Ok(())
    }

    fn draw(&mut self, drawable: &Drawable) -> BackendResult<()> {
        let position = drawable.pose().position;
        log::trace!(
            "draw '{}' at ({:.2}, {:.2}, {:.2})",
            drawable.label(),
            position.x,
            position.y,
            position.z
        );
        Ok(())
    }

    fn run_pass(&mut self, pass: &PostPass) -> BackendResult<()> {
        log::trace!("pass '{}'", pass.label());
        Ok(())
    }

    fn draw_overlay(&mut self, overlay: &Overlay) -> BackendResult<()> {
        log::trace!("overlay '{}'", overlay.label());
        Ok(())
    }

    fn present(&mut self) -> BackendResult<()> {
        self.frames += 1;
        if self.frames % 120 == 0 {
            log::debug!("{} frames presented", self.frames);
        }
        Ok(())
    }
}

/// Advances an orbit angle each frame and writes the resulting pose
struct Orbit {
    drawable: Arc<Drawable>,
    angle: f32,
    step: f32,
    radius: f32,
    next: Option<Box<Spin>>,
}

impl Processor for Orbit {
    fn compute(&mut self, trigger: &TriggerInfo) {
        if trigger.frame_ticked() {
            self.angle = (self.angle + self.step) % TAU;
        }
    }

    fn commit(&mut self, _trigger: &TriggerInfo) {
        let position = Vec3::new(
            self.radius * self.angle.cos(),
            0.0,
            self.radius * self.angle.sin(),
        );
        self.drawable.update_pose(|pose| pose.position = position);
    }

    fn next_in_chain(&mut self) -> Option<&mut dyn Processor> {
        self.next.as_deref_mut().map(|link| link as &mut dyn Processor)
    }
}

/// Chained after [`Orbit`]: spins the same drawable about its own axis
struct Spin {
    drawable: Arc<Drawable>,
    angle: f32,
    step: f32,
}

impl Processor for Spin {
    fn compute(&mut self, trigger: &TriggerInfo) {
        if trigger.frame_ticked() {
            self.angle = (self.angle + self.step) % TAU;
        }
    }

    fn commit(&mut self, _trigger: &TriggerInfo) {
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), self.angle);
        self.drawable.update_pose(|pose| pose.rotation = rotation);
    }
}

/// Toggles the status overlay on each posted heartbeat
struct Blink {
    overlay: Arc<Overlay>,
}

impl Processor for Blink {
    fn compute(&mut self, trigger: &TriggerInfo) {
        log::debug!("heartbeat: {:?}", trigger.posted_ids());
    }

    fn commit(&mut self, _trigger: &TriggerInfo) {
        self.overlay.set_visible(!self.overlay.is_visible());
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = SimConfig::default();
    let world = World::new(&config, Box::new(ConsoleBackend::new()))?;

    log::info!("building scene...");
    let satellite = Arc::new(Drawable::new("satellite"));
    let overlay = Arc::new(Overlay::new("status"));
    let camera = Arc::new(CameraRig::new("main"));

    let orbit = Orbit {
        drawable: Arc::clone(&satellite),
        angle: 0.0,
        step: TAU / 240.0,
        radius: 4.0,
        next: Some(Box::new(Spin {
            drawable: Arc::clone(&satellite),
            angle: 0.0,
            step: TAU / 60.0,
        })),
    };

    world.add_entity(
        Entity::new()
            .with_component(DrawableComponent {
                drawable: satellite,
            })
            .with_component(ProcessorComponent::new(
                Box::new(orbit),
                ArmingCondition::frame_tick(),
                false,
            )),
    )?;
    world.add_entity(Entity::new().with_component(CameraComponent { rig: camera }))?;
    world.add_entity(Entity::new().with_component(OverlayComponent {
        overlay: Arc::clone(&overlay),
    }))?;

    let heartbeat = world.allocate_event();
    world.add_processor(
        Box::new(Blink { overlay }),
        ArmingCondition::posted_event([heartbeat]),
        false,
    );

    world.set_frame_rate_listener(
        Box::new(|fps: f32| log::info!("measured frame rate: {fps:.1} fps")),
        120,
    )?;

    world.attach_surface(Surface {
        label: "pulse".into(),
        width: 1280,
        height: 720,
    })?;

    log::info!("running for five seconds...");
    let mut last_beat = std::time::Instant::now();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if last_beat.elapsed() >= Duration::from_millis(500) {
            world.post_event(heartbeat);
            last_beat = std::time::Instant::now();
        }
        let ready = world.poll();
        world.run_commit_list(ready)?;
        thread::sleep(Duration::from_millis(4));
    }

    world.free_event(heartbeat)?;
    log::info!("demo finished");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("starting pulse demo");
    match run() {
        Ok(()) => {
            log::info!("pulse demo finished successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("application error: {e}");
            Err(e)
        }
    }
}
