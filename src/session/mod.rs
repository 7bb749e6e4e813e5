//! Session lifecycle: `Idle -> Activating -> Active -> Ending -> Idle`.
//!
//! `SessionManager` owns every piece of session-wide state (tracker, reticle,
//! placement, gesture) and is driven by exactly one `update` per rendered
//! frame. Within a frame the order is fixed: handshake, finished loads,
//! tracking and reticle, queued placement, gesture moves, rotation, then the
//! transform push to the scene host.

pub mod notify;
pub mod timing;

pub use notify::{Notification, Notifier};
pub use timing::FrameClock;

use crate::assets::{AssetCache, ModelLoader};
use crate::config::Config;
use crate::geometry::Pose;
use crate::interaction::{InputSourceId, Manipulation, RotationCore};
use crate::placement::{AttachEvent, HotSwapOutcome, PlaceOutcome, Placement, PlacementController};
use crate::platform::{HandshakeFuture, SessionHandle, XrPlatform};
use crate::scene::SceneHost;
use crate::task::poll_once;
use crate::tracking::{Reticle, SurfaceTracker};
use notify::status;
use std::task::Poll;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Activating,
    Active,
    /// Teardown in progress; never observable between calls.
    Ending,
}

/// Per-frame data from the render callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Seconds, monotonic.
    pub time: f64,
    /// Viewer (camera) pose in the session reference frame.
    pub viewer: Pose,
}

impl FrameInfo {
    pub fn new(time: f64, viewer: Pose) -> Self {
        Self { time, viewer }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("immersive AR is not supported on this platform")]
    Unsupported,
    #[error("a session is already active")]
    AlreadyActive,
    #[error("activation is locked until the readiness check passes")]
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionStartError {
    #[error("session request rejected: {0}")]
    Rejected(String),
    #[error("reference space unavailable: {0}")]
    ReferenceSpace(String),
    #[error("hit-test source unavailable: {0}")]
    HitTestSource(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    #[error("tracking lost: {0}")]
    Lost(String),
}

pub struct SessionManager {
    config: Config,
    state: SessionState,
    ready: bool,
    platform: Box<dyn XrPlatform>,
    scene: Box<dyn SceneHost>,
    notifier: Box<dyn Notifier>,
    handshake: Option<HandshakeFuture>,
    handle: Option<SessionHandle>,
    epoch: u64,
    tracker: SurfaceTracker,
    reticle: Reticle,
    placement: PlacementController,
    manipulation: Manipulation,
    clock: FrameClock,
    viewer: Pose,
    frame_time: f64,
}

impl SessionManager {
    pub fn new(
        config: Config,
        platform: Box<dyn XrPlatform>,
        loader: Box<dyn ModelLoader>,
        scene: Box<dyn SceneHost>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let placement = PlacementController::new(AssetCache::new(loader), config.scale_table());
        let rotation = RotationCore::new(
            config.auto_rotate_speed(),
            config.smoothing_factor,
            config.upright_pitch(),
            config.upright_roll(),
        );
        let clock = FrameClock::new(config.first_frame_dt);
        Self {
            config,
            state: SessionState::Idle,
            ready: false,
            platform,
            scene,
            notifier,
            handshake: None,
            handle: None,
            epoch: 0,
            tracker: SurfaceTracker::new(),
            reticle: Reticle::new(),
            placement,
            manipulation: Manipulation::new(rotation),
            clock,
            viewer: Pose::IDENTITY,
            frame_time: 0.0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn session_handle(&self) -> Option<SessionHandle> {
        self.handle
    }

    pub fn reticle_visible(&self) -> bool {
        self.reticle.is_visible()
    }

    pub fn reticle_pose(&self) -> Option<Pose> {
        self.reticle.pose()
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.current()
    }

    pub fn is_attaching(&self) -> bool {
        self.placement.is_attaching()
    }

    pub fn pending_request(&self) -> Option<&str> {
        self.placement.pending_request()
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.placement.selected_model()
    }

    pub fn manipulation(&self) -> &Manipulation {
        &self.manipulation
    }

    pub fn is_manipulating(&self) -> bool {
        self.manipulation.is_active()
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.manipulation.rotation().is_auto_rotating()
    }

    /// Opened by the external readiness check (QR scan); closed again when a
    /// session ends.
    pub fn mark_ready(&mut self) {
        if !self.ready {
            log::info!("Readiness check passed; session may start");
        }
        self.ready = true;
    }

    pub fn activate(&mut self) -> Result<(), ActivationError> {
        if self.state != SessionState::Idle {
            return Err(ActivationError::AlreadyActive);
        }
        if !self.platform.is_supported() {
            log::warn!("Immersive AR not supported");
            return Err(ActivationError::Unsupported);
        }
        if !self.ready {
            return Err(ActivationError::NotReady);
        }
        self.epoch += 1;
        self.handshake = Some(self.platform.request_session());
        self.state = SessionState::Activating;
        log::info!("Session requested (epoch {})", self.epoch);
        Ok(())
    }

    /// One pass per rendered frame. `None` (no frame data) only advances the
    /// handshake; finished loads wait for the next frame, so nothing is
    /// attached or announced without one.
    pub fn update(&mut self, frame: Option<&FrameInfo>) {
        if self.state == SessionState::Activating {
            self.poll_handshake();
        }
        let Some(frame) = frame else {
            return;
        };
        self.apply_loads();
        if self.state != SessionState::Active {
            return;
        }
        let dt = self.clock.tick(frame.time);
        self.viewer = frame.viewer;
        self.frame_time = frame.time;

        self.update_tracking(frame);
        if self.state != SessionState::Active {
            return;
        }

        if self.reticle.is_visible() && !self.manipulation.is_active() {
            if let Some(path) = self.placement.take_pending() {
                log::info!("Surface found; placing queued model {}", path);
                self.confirm_placement(&path);
            }
        }

        let Some(current) = self.placement.current_mut() else {
            return;
        };
        let moved = self.manipulation.apply(current);
        let rotated = self.manipulation.tick(dt, current);
        if moved || rotated {
            self.placement.sync_transform(self.scene.as_mut());
        }
    }

    /// Place `path` at the reticle. No-op (returns `false`) unless the
    /// reticle is visible, no gesture is open and no hot-swap is loading.
    pub fn confirm_placement(&mut self, path: &str) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        if self.manipulation.is_active() {
            log::debug!("Placement of {} ignored: gesture in progress", path);
            return false;
        }
        if self.placement.is_swapping() {
            log::debug!("Placement of {} ignored: model change in progress", path);
            return false;
        }
        let Some(pose) = self.reticle.pose() else {
            log::debug!("Placement of {} ignored: no surface", path);
            return false;
        };

        self.placement.select_model(path);
        match self
            .placement
            .place_at(path, pose, self.epoch, self.scene.as_mut())
        {
            PlaceOutcome::Placed => self.placed(path, false),
            PlaceOutcome::Loading => {
                self.manipulation.set_object(None);
                log::info!("Waiting for {} to load", path);
            }
        }
        true
    }

    /// Platform select event: place the currently selected model.
    pub fn on_select(&mut self, source: InputSourceId) -> bool {
        let Some(path) = self.placement.selected_model().map(str::to_owned) else {
            log::debug!("Select from {:?} ignored: no model selected", source);
            return false;
        };
        self.confirm_placement(&path)
    }

    pub fn select_model(&mut self, path: &str) {
        self.placement.select_model(path);
    }

    /// Place now if a surface is showing, otherwise on the first frame that
    /// shows one.
    pub fn place_when_surface_found(&mut self, path: &str) {
        self.placement.select_model(path);
        if self.reticle.is_visible() && self.confirm_placement(path) {
            return;
        }
        log::info!("Queued {} until a surface is found", path);
        self.placement.set_pending(path);
    }

    /// Replace the placed model, keeping its pose. Without a placement the
    /// path only becomes the selection for the next placement.
    pub fn hot_swap(&mut self, path: &str) {
        self.manipulation.cancel();
        if self.state != SessionState::Active {
            self.placement.select_model(path);
            log::info!("{} selected for the next session", path);
            self.status(status::model_selected(path));
            return;
        }

        let was_swapping = self.placement.is_swapping();
        let swap = self.placement.hot_swap(path, self.epoch, self.scene.as_mut());
        let (swapped, outcome) = match swap {
            HotSwapOutcome::Swapped(outcome) => (true, outcome),
            HotSwapOutcome::Retargeted(outcome) => (was_swapping, outcome),
            HotSwapOutcome::Recorded => {
                self.status(status::model_selected(path));
                return;
            }
        };
        if swapped {
            self.reticle.hide(self.scene.as_mut());
            self.status(status::model_changed(path));
        }
        match outcome {
            PlaceOutcome::Placed => self.placed(path, swapped),
            PlaceOutcome::Loading => self.manipulation.set_object(None),
        }
    }

    /// Remove the placement (and any attach still loading) and let the
    /// reticle come back with a fresh surface-found notification.
    pub fn clear_and_reselect(&mut self) {
        self.manipulation.cancel();
        if self.placement.clear(self.scene.as_mut()) {
            log::info!("Placement cleared; waiting for a new surface");
        }
        self.manipulation.set_object(None);
        self.reticle.rearm();
        if self.state == SessionState::Active {
            self.status(status::RESELECT.to_string());
        }
    }

    /// `None` when there is no object to rotate.
    pub fn toggle_auto_rotate(&mut self) -> Option<bool> {
        self.manipulation.rotation_mut().toggle_auto_rotate()
    }

    pub fn set_placement_visible(&mut self, visible: bool) -> bool {
        if !visible {
            self.manipulation.cancel();
        }
        self.placement.set_visible(visible, self.scene.as_mut())
    }

    pub fn on_interaction_start(&mut self, source: InputSourceId, pose: Pose) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        let Some(current) = self.placement.current() else {
            return false;
        };
        self.manipulation
            .begin(source, &pose, &self.viewer, self.frame_time, current)
    }

    pub fn on_interaction_move(&mut self, source: InputSourceId, pose: Pose) -> bool {
        self.manipulation.queue_move(source, pose)
    }

    pub fn on_interaction_end(&mut self, source: InputSourceId) -> bool {
        let ended = self.manipulation.end(source, self.placement.current_mut());
        if ended {
            self.placement.sync_transform(self.scene.as_mut());
        }
        ended
    }

    /// Explicit end (user). Also abandons a handshake still in progress.
    pub fn end_session(&mut self) {
        match self.state {
            SessionState::Active | SessionState::Activating => self.teardown(true),
            SessionState::Idle | SessionState::Ending => {
                log::debug!("end_session ignored in state {:?}", self.state)
            }
        }
    }

    /// The platform ended the session on its own.
    pub fn on_platform_session_ended(&mut self) {
        match self.state {
            SessionState::Active | SessionState::Activating => self.teardown(false),
            SessionState::Idle | SessionState::Ending => {}
        }
    }

    fn poll_handshake(&mut self) {
        let Some(future) = self.handshake.as_mut() else {
            return;
        };
        let result = match poll_once(future) {
            Poll::Pending => return,
            Poll::Ready(result) => result,
        };
        self.handshake = None;

        match result {
            Ok(binding) => {
                log::info!("Session {:?} active", binding.handle);
                self.handle = Some(binding.handle);
                self.tracker.attach(binding.hit_test, binding.reference_space);
                self.clock.reset();
                self.state = SessionState::Active;
                self.notifier.notify(Notification::SessionStarted);
                self.status(status::SESSION_STARTED.to_string());
            }
            Err(err) => {
                log::warn!("Session start failed: {}", err);
                self.state = SessionState::Idle;
                self.notifier
                    .notify(Notification::SessionStartFailed(err.to_string()));
            }
        }
    }

    fn apply_loads(&mut self) {
        let live_epoch = (self.state == SessionState::Active).then_some(self.epoch);
        let events = self.placement.poll_loads(live_epoch, self.scene.as_mut());
        for event in events {
            match event {
                AttachEvent::Placed { path, swapped } => self.placed(&path, swapped),
                AttachEvent::Failed { path, reason } => {
                    log::warn!("Could not place {}: {}", path, reason);
                    self.notifier
                        .notify(Notification::ModelLoadFailed { path, reason });
                }
            }
        }
    }

    fn update_tracking(&mut self, frame: &FrameInfo) {
        if self.placement.has_placement()
            || self.placement.is_swapping()
            || self.manipulation.is_active()
        {
            self.reticle.hide(self.scene.as_mut());
            return;
        }
        match self.tracker.sample(frame) {
            Ok(surface) => {
                if self.reticle.present(surface, self.scene.as_mut()) {
                    log::info!("Surface found");
                    self.notifier.notify(Notification::SurfaceFound);
                    self.status(status::SURFACE_FOUND.to_string());
                }
            }
            Err(err) => {
                log::warn!("Ending session: {}", err);
                self.end_session();
            }
        }
    }

    /// A swap already reported its status when it was requested.
    fn placed(&mut self, path: &str, swapped: bool) {
        self.reticle.hide(self.scene.as_mut());
        self.track_placed_object();
        self.notifier.notify(Notification::ModelPlaced {
            path: path.to_string(),
        });
        if !swapped {
            self.status(status::MODEL_PLACED.to_string());
        }
        self.notifier.notify(Notification::ReadyForReselect);
    }

    fn track_placed_object(&mut self) {
        let orientation = self.placement.current().map(|p| p.transform.rotation);
        self.manipulation.set_object(orientation);
    }

    fn teardown(&mut self, end_platform_session: bool) {
        self.state = SessionState::Ending;
        log::info!("Ending session (epoch {})", self.epoch);

        self.handshake = None;
        self.manipulation.cancel();
        self.tracker.release();
        self.placement.teardown(self.scene.as_mut());
        self.manipulation.set_object(None);
        self.reticle.hide(self.scene.as_mut());
        self.reticle.rearm();
        if let Some(handle) = self.handle.take() {
            if end_platform_session {
                self.platform.end_session(handle);
            }
        }
        self.ready = false;
        self.clock.reset();
        self.epoch += 1;

        self.notifier.notify(Notification::SessionEnded);
        self.status(status::SESSION_ENDED.to_string());
        self.state = SessionState::Idle;
    }

    fn status(&mut self, text: String) {
        self.notifier.notify(Notification::Status(text));
    }
}
