use glam::Vec3;

use super::InputSourceId;
use crate::geometry::{Plane, Ray};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub source: InputSourceId,
    /// Faces the viewer at start time and passes through the grab point.
    pub plane: Plane,
    /// Grab point minus object origin.
    pub offset: Vec3,
    pub started_at: f64,
}

/// Plane-constrained translation for one input source at a time.
#[derive(Debug, Default)]
pub struct DragCore {
    session: Option<DragSession>,
}

impl DragCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Returns `false` when another source already holds the drag.
    pub fn begin(
        &mut self,
        source: InputSourceId,
        hit_point: Vec3,
        object_position: Vec3,
        view_forward: Vec3,
        time: f64,
    ) -> bool {
        if let Some(active) = &self.session {
            if active.source != source {
                log::debug!(
                    "Drag start from {:?} ignored: {:?} is dragging",
                    source,
                    active.source
                );
            }
            return false;
        }
        let normal = -view_forward.normalize_or_zero();
        self.session = Some(DragSession {
            source,
            plane: Plane::from_normal_and_point(normal, hit_point),
            offset: hit_point - object_position,
            started_at: time,
        });
        log::debug!("Drag started by {:?} at {:?}", source, hit_point);
        true
    }

    /// New object position for this ray, or `None` if the source does not
    /// hold the drag or the ray misses the plane.
    pub fn drag(&self, source: InputSourceId, ray: &Ray) -> Option<Vec3> {
        let session = self.session.as_ref().filter(|s| s.source == source)?;
        let hit = ray.intersect_plane(&session.plane)?;
        Some(hit - session.offset)
    }

    pub fn end(&mut self, source: InputSourceId) -> bool {
        if self.session.as_ref().is_some_and(|s| s.source == source) {
            self.session = None;
            log::debug!("Drag ended by {:?}", source);
            return true;
        }
        false
    }

    pub fn cancel(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: InputSourceId = InputSourceId(0);

    fn run_drag(object: Vec3, grab: Vec3, view_forward: Vec3, moves: &[Vec3], eye: Vec3) -> Vec3 {
        let mut core = DragCore::new();
        assert!(core.begin(SOURCE, grab, object, view_forward, 0.0));
        let mut position = object;
        for target in moves {
            let ray = Ray::new(eye, *target - eye);
            if let Some(next) = core.drag(SOURCE, &ray) {
                position = next;
            }
        }
        assert!(core.end(SOURCE));
        position
    }

    #[test]
    fn final_position_is_last_hit_minus_offset() {
        let eye = Vec3::new(0.0, 0.0, 2.0);
        let forwards = [Vec3::NEG_Z, Vec3::new(0.0, -1.0, -1.0).normalize()];
        let offsets = [
            Vec3::ZERO,
            Vec3::new(0.1, 0.05, 0.0),
            Vec3::new(-0.2, 0.0, 0.15),
        ];
        let object = Vec3::new(0.0, -0.5, -1.0);

        for forward in forwards {
            let normal = -forward;
            for offset in offsets {
                let grab = object + offset;
                // Points on the drag plane through `grab`.
                let tangent = normal.cross(Vec3::X).normalize_or_zero();
                let tangent = if tangent == Vec3::ZERO { Vec3::Y } else { tangent };
                let moves = [
                    grab + Vec3::X * 0.1,
                    grab + tangent * 0.2,
                    grab + Vec3::X * -0.3 + tangent * 0.1,
                ];
                let last = moves[2];
                let final_position = run_drag(object, grab, forward, &moves, eye);
                let expected = last - offset;
                assert!(
                    final_position.abs_diff_eq(expected, 1e-4),
                    "forward {:?} offset {:?}: {:?} != {:?}",
                    forward,
                    offset,
                    final_position,
                    expected
                );
            }
        }
    }

    #[test]
    fn parallel_ray_leaves_position_unchanged() {
        let mut core = DragCore::new();
        core.begin(SOURCE, Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, -1.0), Vec3::NEG_Z, 0.0);
        let parallel = Ray::new(Vec3::new(0.0, 0.0, 0.0), Vec3::X);
        assert_eq!(core.drag(SOURCE, &parallel), None);
        let away = Ray::new(Vec3::ZERO, Vec3::Z);
        assert_eq!(core.drag(SOURCE, &away), None);
    }

    #[test]
    fn second_source_is_ignored() {
        let mut core = DragCore::new();
        let other = InputSourceId(1);
        assert!(core.begin(SOURCE, Vec3::ZERO, Vec3::ZERO, Vec3::NEG_Z, 0.0));
        assert!(!core.begin(other, Vec3::X, Vec3::ZERO, Vec3::NEG_Z, 0.1));
        assert_eq!(core.session().unwrap().source, SOURCE);
        assert_eq!(core.drag(other, &Ray::new(Vec3::Z, Vec3::NEG_Z)), None);
        assert!(!core.end(other));
        assert!(core.is_dragging());
        assert!(core.end(SOURCE));
        assert!(!core.is_dragging());
    }
}
