use glam::Quat;

use super::InputSourceId;
use crate::geometry::{quat_approx_eq, upright_with_yaw, wrap_angle, yaw_of};

const SNAP_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSession {
    pub source: InputSourceId,
    /// Controller yaw seen on the previous update.
    pub last_yaw: f32,
    pub started_at: f64,
}

/// Yaw-only rotation: manual (controller twist), auto (constant speed) and
/// smoothing of the live orientation toward a separately tracked target.
#[derive(Debug)]
pub struct RotationCore {
    session: Option<RotationSession>,
    auto_rotate: bool,
    speed: f32,
    smoothing: f32,
    pitch: f32,
    roll: f32,
    target: Option<Quat>,
}

impl RotationCore {
    /// `speed` in radians per second; `smoothing` is the per-frame slerp factor.
    pub fn new(speed: f32, smoothing: f32, pitch: f32, roll: f32) -> Self {
        Self {
            session: None,
            auto_rotate: false,
            speed,
            smoothing: smoothing.clamp(0.0, 1.0),
            pitch,
            roll,
            target: None,
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&RotationSession> {
        self.session.as_ref()
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.auto_rotate
    }

    pub fn has_object(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<Quat> {
        self.target
    }

    pub fn target_yaw(&self) -> Option<f32> {
        self.target.map(yaw_of)
    }

    /// Track a new object (its current orientation becomes the target), or
    /// stop tracking with `None`, which also turns auto-rotate off.
    pub fn set_object(&mut self, orientation: Option<Quat>) {
        self.target = orientation;
        if orientation.is_none() {
            self.session = None;
            self.auto_rotate = false;
        }
    }

    /// Flip auto-rotate. `None` when there is no object to rotate.
    pub fn toggle_auto_rotate(&mut self) -> Option<bool> {
        self.target?;
        if let Some(session) = self.session.take() {
            log::debug!("Manual rotation by {:?} cancelled by auto-rotate toggle", session.source);
        }
        self.auto_rotate = !self.auto_rotate;
        log::info!("Auto-rotate {}", if self.auto_rotate { "on" } else { "off" });
        Some(self.auto_rotate)
    }

    pub fn begin(&mut self, source: InputSourceId, controller: Quat, time: f64) -> bool {
        if self.target.is_none() || self.session.is_some() {
            return false;
        }
        if self.auto_rotate {
            self.auto_rotate = false;
            log::debug!("Auto-rotate stopped by manual rotation");
        }
        self.session = Some(RotationSession {
            source,
            last_yaw: yaw_of(controller),
            started_at: time,
        });
        true
    }

    /// Apply the controller's yaw change since the last call to `current`.
    /// The result is upright and also becomes the target.
    pub fn rotate(&mut self, source: InputSourceId, controller: Quat, current: Quat) -> Option<Quat> {
        let session = self.session.as_mut().filter(|s| s.source == source)?;
        let yaw = yaw_of(controller);
        let delta = wrap_angle(yaw - session.last_yaw);
        session.last_yaw = yaw;
        let orientation = upright_with_yaw(yaw_of(current) + delta, self.pitch, self.roll);
        self.target = Some(orientation);
        Some(orientation)
    }

    pub fn end(&mut self, source: InputSourceId) -> bool {
        if self.session.as_ref().is_some_and(|s| s.source == source) {
            self.session = None;
            return true;
        }
        false
    }

    pub fn cancel(&mut self) {
        self.session = None;
    }

    /// Advance auto-rotate by `dt` and smooth `live` toward the target.
    /// Returns the orientation the object should have this frame.
    pub fn tick(&mut self, dt: f32, live: Quat) -> Quat {
        let Some(target) = self.target else {
            return live;
        };
        if self.session.is_some() {
            return live;
        }
        let target = if self.auto_rotate {
            let advanced = (Quat::from_rotation_y(self.speed * dt) * target).normalize();
            self.target = Some(advanced);
            advanced
        } else {
            target
        };

        let next = live.slerp(target, self.smoothing).normalize();
        if quat_approx_eq(next, target, SNAP_EPSILON) {
            target
        } else {
            next
        }
    }
}
