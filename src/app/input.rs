use arplace::geometry::Pose;
use arplace::interaction::InputSourceId;
use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy)]
pub enum InputEvent {
    Select(InputSourceId),
    Start(InputSourceId, Pose),
    Move(InputSourceId, Pose),
    End(InputSourceId),
}

/// A grab of the placed object: aim at it on `start`, sweep the aim point by
/// `sweep` (which also swings the controller's yaw), release on `end`.
#[derive(Debug, Clone, Copy)]
struct Gesture {
    source: InputSourceId,
    start: u32,
    end: u32,
    sweep: Vec3,
}

/// Scripted controller input, replayed frame by frame.
#[derive(Debug, Default)]
pub struct GestureScript {
    eye: Vec3,
    selects: Vec<(u32, InputSourceId)>,
    gestures: Vec<Gesture>,
    anchor: Option<Vec3>,
}

impl GestureScript {
    pub fn new(eye: Vec3) -> Self {
        Self {
            eye,
            ..Self::default()
        }
    }

    pub fn select(mut self, frame: u32, source: InputSourceId) -> Self {
        self.selects.push((frame, source));
        self
    }

    pub fn grab(mut self, source: InputSourceId, start: u32, end: u32, sweep: Vec3) -> Self {
        self.gestures.push(Gesture {
            source,
            start,
            end: end.max(start + 1),
            sweep,
        });
        self
    }

    /// Events for `frame`. `target` is where the object currently sits; a
    /// gesture locks onto it when it starts.
    pub fn events(&mut self, frame: u32, target: Option<Vec3>) -> Vec<InputEvent> {
        let mut events: Vec<InputEvent> = self
            .selects
            .iter()
            .filter(|(at, _)| *at == frame)
            .map(|(_, source)| InputEvent::Select(*source))
            .collect();

        for gesture in &self.gestures {
            if frame < gesture.start || frame > gesture.end {
                continue;
            }
            if frame == gesture.start {
                self.anchor = target;
            }
            let Some(anchor) = self.anchor else {
                continue;
            };
            let progress = (frame - gesture.start) as f32 / (gesture.end - gesture.start) as f32;
            let pose = aim(self.eye, anchor + gesture.sweep * progress);
            if frame == gesture.start {
                events.push(InputEvent::Start(gesture.source, pose));
            } else {
                events.push(InputEvent::Move(gesture.source, pose));
            }
            if frame == gesture.end {
                events.push(InputEvent::End(gesture.source));
                self.anchor = None;
            }
        }
        events
    }
}

/// Controller pose at `eye` pointing at `target`.
pub fn aim(eye: Vec3, target: Vec3) -> Pose {
    let direction = (target - eye).normalize_or_zero();
    Pose::new(eye, Quat::from_rotation_arc(Vec3::NEG_Z, direction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grab_emits_start_moves_end() {
        let source = InputSourceId(0);
        let mut script = GestureScript::new(Vec3::ZERO).grab(source, 10, 12, Vec3::X);
        let target = Some(Vec3::new(0.0, 0.0, -1.0));

        assert!(script.events(9, target).is_empty());
        assert!(matches!(script.events(10, target)[..], [InputEvent::Start(..)]));
        assert!(matches!(script.events(11, None)[..], [InputEvent::Move(..)]));
        assert!(matches!(
            script.events(12, None)[..],
            [InputEvent::Move(..), InputEvent::End(_)]
        ));
        assert!(script.events(13, target).is_empty());
    }

    #[test]
    fn aim_points_at_target() {
        let pose = aim(Vec3::ZERO, Vec3::new(1.0, 0.0, -1.0));
        assert!(pose.forward().abs_diff_eq(Vec3::new(1.0, 0.0, -1.0).normalize(), 1e-5));
    }
}
