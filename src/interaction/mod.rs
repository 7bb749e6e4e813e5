//! Drag and rotate gestures on the placed object.
//!
//! A gesture starts on the input source whose ray hits the object; that
//! source then owns both the drag and the rotate session until it ends.
//! Other sources are ignored meanwhile. Moves arriving between frames are
//! coalesced and applied once per `update`.

pub mod drag;
pub mod rotate;

pub use drag::{DragCore, DragSession};
pub use rotate::{RotationCore, RotationSession};

use crate::geometry::{ray_hits_obb, Pose};
use crate::placement::Placement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputSourceId(pub u32);

pub struct Manipulation {
    drag: DragCore,
    rotate: RotationCore,
    owner: Option<InputSourceId>,
    pending_move: Option<Pose>,
}

impl Manipulation {
    pub fn new(rotate: RotationCore) -> Self {
        Self {
            drag: DragCore::new(),
            rotate,
            owner: None,
            pending_move: None,
        }
    }

    /// A gesture is open.
    pub fn is_active(&self) -> bool {
        self.owner.is_some()
    }

    pub fn owner(&self) -> Option<InputSourceId> {
        self.owner
    }

    pub fn drag(&self) -> &DragCore {
        &self.drag
    }

    pub fn rotation(&self) -> &RotationCore {
        &self.rotate
    }

    pub fn rotation_mut(&mut self) -> &mut RotationCore {
        &mut self.rotate
    }

    /// Follow the placed object's orientation, or stop following with `None`.
    pub fn set_object(&mut self, orientation: Option<glam::Quat>) {
        self.rotate.set_object(orientation);
    }

    /// Start a gesture if `source` points at the visible object and no other
    /// source holds one. A refusal is not an error.
    pub fn begin(
        &mut self,
        source: InputSourceId,
        pose: &Pose,
        viewer: &Pose,
        time: f64,
        placement: &Placement,
    ) -> bool {
        if let Some(owner) = self.owner {
            if owner != source {
                log::debug!("Ignoring {:?}: gesture held by {:?}", source, owner);
            }
            return false;
        }
        if !placement.visible {
            return false;
        }

        let ray = pose.ray();
        let Some(t) = ray_hits_obb(&ray, placement.transform.matrix(), &placement.instance.bounds)
        else {
            log::trace!("{:?} missed the placed object", source);
            return false;
        };
        let hit = ray.at(t);

        self.drag
            .begin(source, hit, placement.transform.position, viewer.forward(), time);
        self.rotate.begin(source, pose.orientation, time);
        self.owner = Some(source);
        self.pending_move = None;
        log::info!("Gesture started by {:?}", source);
        true
    }

    /// Keep the latest pose from the owning source; others are dropped.
    pub fn queue_move(&mut self, source: InputSourceId, pose: Pose) -> bool {
        if self.owner != Some(source) {
            return false;
        }
        self.pending_move = Some(pose);
        true
    }

    /// Apply the coalesced move to the object. Returns whether it changed.
    pub fn apply(&mut self, placement: &mut Placement) -> bool {
        let (Some(source), Some(pose)) = (self.owner, self.pending_move.take()) else {
            return false;
        };
        let mut changed = false;
        if let Some(position) = self.drag.drag(source, &pose.ray()) {
            placement.transform.position = position;
            changed = true;
        }
        if let Some(orientation) = self
            .rotate
            .rotate(source, pose.orientation, placement.transform.rotation)
        {
            placement.transform.rotation = orientation;
            changed = true;
        }
        changed
    }

    /// End the gesture held by `source`, flushing its last queued move.
    pub fn end(&mut self, source: InputSourceId, placement: Option<&mut Placement>) -> bool {
        if self.owner != Some(source) {
            return false;
        }
        if let Some(placement) = placement {
            self.apply(placement);
        }
        self.drag.end(source);
        self.rotate.end(source);
        self.owner = None;
        self.pending_move = None;
        log::info!("Gesture ended by {:?}", source);
        true
    }

    pub fn cancel(&mut self) {
        if let Some(owner) = self.owner.take() {
            log::debug!("Gesture by {:?} cancelled", owner);
        }
        self.drag.cancel();
        self.rotate.cancel();
        self.pending_move = None;
    }

    /// Per-frame rotation step (auto-rotate and smoothing).
    pub fn tick(&mut self, dt: f32, placement: &mut Placement) -> bool {
        let live = placement.transform.rotation;
        let next = self.rotate.tick(dt, live);
        if next == live {
            return false;
        }
        placement.transform.rotation = next;
        true
    }
}
