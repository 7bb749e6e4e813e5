mod input;

use arplace::assets::{GltfFileLoader, ModelLoader};
use arplace::config::Config;
use arplace::geometry::{Aabb, Pose};
use arplace::interaction::InputSourceId;
use arplace::sim::{NotificationLog, RecordingScene, SimHitFeed, SimLoader, SimPlatform};
use arplace::{FrameInfo, Notification, SessionManager};
use glam::Vec3;
use input::{GestureScript, InputEvent};

use std::path::Path;
use std::time::{Duration, Instant};

const FRAME_DT: f64 = 1.0 / 60.0;
const HAND: InputSourceId = InputSourceId(0);

/// Menu actions the demo script fires at fixed frames.
#[derive(Debug, Clone)]
enum DemoCommand {
    MarkReady,
    Activate,
    SelectModel(String),
    ToggleAutoRotate,
    HotSwap(String),
    ClearAndReselect,
    PlaceWhenSurfaceFound(String),
    EndSession,
}

/// Scripted run of a whole session against the simulated platform.
pub struct DemoApp {
    session: SessionManager,
    feed: SimHitFeed,
    scene: RecordingScene,
    notifications: NotificationLog,
    commands: Vec<(u32, DemoCommand)>,
    input: GestureScript,
    surface: Pose,
    surface_from: u32,
    frame: u32,
    paced: bool,
}

impl DemoApp {
    pub fn new(config: Config, models: &[&str]) -> Self {
        let feed = SimHitFeed::new();
        let platform = SimPlatform::new(&feed);
        let scene = RecordingScene::new();
        let notifications = NotificationLog::new();

        let root = Path::new(&config.asset_root);
        let (loader, paced): (Box<dyn ModelLoader>, bool) = if root.is_dir() {
            log::info!("Loading models from {}", root.display());
            (Box::new(GltfFileLoader::new(root)), true)
        } else {
            log::warn!(
                "Asset root {} not found; using placeholder models",
                root.display()
            );
            let cube = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
            (Box::new(SimLoader::instant(cube)), false)
        };

        let session = SessionManager::new(
            config,
            Box::new(platform),
            loader,
            Box::new(scene.clone()),
            Box::new(notifications.clone()),
        );

        let first = models.first().copied().unwrap_or("model.glb").to_string();
        let second = models.get(1).copied().unwrap_or(first.as_str()).to_string();
        let third = models.get(2).copied().unwrap_or(first.as_str()).to_string();

        let commands = vec![
            (0, DemoCommand::SelectModel(first)),
            (2, DemoCommand::MarkReady),
            (3, DemoCommand::Activate),
            (130, DemoCommand::ToggleAutoRotate),
            (190, DemoCommand::ToggleAutoRotate),
            (200, DemoCommand::HotSwap(second)),
            (240, DemoCommand::ClearAndReselect),
            (250, DemoCommand::PlaceWhenSurfaceFound(third)),
            (330, DemoCommand::EndSession),
        ];
        let input = GestureScript::new(Vec3::ZERO)
            .select(40, HAND)
            .grab(HAND, 80, 120, Vec3::new(0.3, 0.0, 0.1));

        Self {
            session,
            feed,
            scene,
            notifications,
            commands,
            input,
            surface: Pose::from_position(Vec3::new(0.0, -0.8, -1.2)),
            surface_from: 20,
            frame: 0,
            paced,
        }
    }

    pub fn run(&mut self, frames: u32) {
        let frame_duration = Duration::from_secs_f64(FRAME_DT);
        let mut next_frame_time = Instant::now();

        while self.frame < frames {
            self.step();
            if self.paced {
                next_frame_time += frame_duration;
                let now = Instant::now();
                if next_frame_time > now {
                    std::thread::sleep(next_frame_time - now);
                }
            }
        }

        log::info!(
            "Finished after {} frames: {} object(s) in scene, {} added, {} removed",
            self.frame,
            self.scene.object_count(),
            self.scene.adds(),
            self.scene.removes()
        );
    }

    fn step(&mut self) {
        let frame = self.frame;
        self.frame += 1;

        let due: Vec<DemoCommand> = self
            .commands
            .iter()
            .filter(|(at, _)| *at == frame)
            .map(|(_, command)| command.clone())
            .collect();
        for command in due {
            self.apply_command(command);
        }

        let target = self.session.placement().map(|p| p.transform.position);
        for event in self.input.events(frame, target) {
            self.apply_input(event);
        }

        let hit = (frame >= self.surface_from).then_some(self.surface);
        self.feed.set_hit(hit);

        let info = FrameInfo::new(frame as f64 * FRAME_DT, Pose::IDENTITY);
        self.session.update(Some(&info));

        for notification in self.notifications.take() {
            log_notification(frame, &notification);
        }
    }

    fn apply_command(&mut self, command: DemoCommand) {
        log::debug!("Command: {:?}", command);
        match command {
            DemoCommand::MarkReady => self.session.mark_ready(),
            DemoCommand::Activate => {
                if let Err(err) = self.session.activate() {
                    log::error!("Activation failed: {}", err);
                }
            }
            DemoCommand::SelectModel(path) => self.session.select_model(&path),
            DemoCommand::ToggleAutoRotate => {
                if self.session.toggle_auto_rotate().is_none() {
                    log::warn!("Nothing placed to rotate");
                }
            }
            DemoCommand::HotSwap(path) => self.session.hot_swap(&path),
            DemoCommand::ClearAndReselect => self.session.clear_and_reselect(),
            DemoCommand::PlaceWhenSurfaceFound(path) => self.session.place_when_surface_found(&path),
            DemoCommand::EndSession => self.session.end_session(),
        }
    }

    fn apply_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Select(source) => {
                if !self.session.on_select(source) {
                    log::debug!("Select ignored");
                }
            }
            InputEvent::Start(source, pose) => {
                if !self.session.on_interaction_start(source, pose) {
                    log::warn!("Gesture missed the object");
                }
            }
            InputEvent::Move(source, pose) => {
                self.session.on_interaction_move(source, pose);
            }
            InputEvent::End(source) => {
                self.session.on_interaction_end(source);
                if let Some(placement) = self.session.placement() {
                    log::info!(
                        "Object now at {:?}, yaw {:.1}°",
                        placement.transform.position,
                        placement.pose().yaw().to_degrees()
                    );
                }
            }
        }
    }
}

fn log_notification(frame: u32, notification: &Notification) {
    match notification {
        Notification::Status(text) => log::info!("[frame {}] 💬 {}", frame, text),
        Notification::ModelLoadFailed { path, reason } => {
            log::error!("[frame {}] ❌ {} failed to load: {}", frame, path, reason)
        }
        Notification::SessionStartFailed(reason) => {
            log::error!("[frame {}] ❌ session failed to start: {}", frame, reason)
        }
        other => log::info!("[frame {}] {:?}", frame, other),
    }
}
