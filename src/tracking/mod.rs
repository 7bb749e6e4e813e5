pub mod reticle;

pub use reticle::Reticle;

use crate::geometry::Pose;
use crate::platform::HitTestSource;
use crate::session::{FrameInfo, TrackingError};

/// Wraps the platform hit-test source; yields at most one surface pose per
/// frame, relative to the session reference frame.
pub struct SurfaceTracker {
    source: Option<Box<dyn HitTestSource>>,
    reference_from_tracking: Pose,
}

impl Default for SurfaceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceTracker {
    pub fn new() -> Self {
        Self {
            source: None,
            reference_from_tracking: Pose::IDENTITY,
        }
    }

    pub fn attach(&mut self, source: Box<dyn HitTestSource>, reference_space: Pose) {
        self.release();
        self.source = Some(source);
        self.reference_from_tracking = reference_space.inverse();
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }

    /// Cancel and drop the hit-test source.
    pub fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.cancel();
            log::info!("Hit-test source cancelled");
        }
        self.reference_from_tracking = Pose::IDENTITY;
    }

    /// First hit of the frame, if any. Without a source this is simply `None`.
    pub fn sample(&mut self, frame: &FrameInfo) -> Result<Option<Pose>, TrackingError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let hits = source.sample(frame)?;
        Ok(hits
            .first()
            .map(|hit| self.reference_from_tracking.mul_pose(hit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimHitFeed;
    use glam::{Quat, Vec3};

    fn frame() -> FrameInfo {
        FrameInfo::new(0.0, Pose::IDENTITY)
    }

    #[test]
    fn detached_tracker_samples_nothing() {
        let mut tracker = SurfaceTracker::new();
        assert_eq!(tracker.sample(&frame()).unwrap(), None);
    }

    #[test]
    fn first_hit_is_expressed_in_reference_space() {
        let feed = SimHitFeed::new();
        let mut tracker = SurfaceTracker::new();
        let reference = Pose::from_position(Vec3::new(0.0, 1.0, 0.0));
        tracker.attach(Box::new(feed.source()), reference);

        feed.set_hits(vec![
            Pose::from_position(Vec3::new(0.0, 1.0, -2.0)),
            Pose::from_position(Vec3::new(5.0, 5.0, 5.0)),
        ]);
        let pose = tracker.sample(&frame()).unwrap().unwrap();
        assert!(pose.position.abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1e-6));

        feed.set_hits(Vec::new());
        assert_eq!(tracker.sample(&frame()).unwrap(), None);
    }

    #[test]
    fn rotated_reference_space() {
        let feed = SimHitFeed::new();
        let mut tracker = SurfaceTracker::new();
        let reference = Pose::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        tracker.attach(Box::new(feed.source()), reference);
        feed.set_hit(Some(Pose::from_position(Vec3::new(-1.0, 0.0, 0.0))));
        let pose = tracker.sample(&frame()).unwrap().unwrap();
        assert!(pose.position.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn release_cancels_source() {
        let feed = SimHitFeed::new();
        let mut tracker = SurfaceTracker::new();
        tracker.attach(Box::new(feed.source()), Pose::IDENTITY);
        tracker.release();
        assert!(feed.is_cancelled());
        assert!(!tracker.is_attached());
    }

    #[test]
    fn tracking_error_propagates() {
        let feed = SimHitFeed::new();
        let mut tracker = SurfaceTracker::new();
        tracker.attach(Box::new(feed.source()), Pose::IDENTITY);
        feed.fail_next("camera lost");
        assert!(tracker.sample(&frame()).is_err());
    }
}
