use crate::geometry::Pose;
use crate::scene::SceneHost;

/// Surface indicator. Pushes visibility/pose changes to the scene host and
/// reports the hidden→visible edge so the caller can announce "surface found"
/// once per acquisition.
#[derive(Debug, Default)]
pub struct Reticle {
    pose: Option<Pose>,
    announced: bool,
}

impl Reticle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.pose.is_some()
    }

    pub fn pose(&self) -> Option<Pose> {
        self.pose
    }

    /// Apply this frame's surface pose (`None` hides). Returns `true` when the
    /// surface-found notification should fire.
    pub fn present(&mut self, surface: Option<Pose>, scene: &mut dyn SceneHost) -> bool {
        match surface {
            Some(pose) => {
                if self.pose != Some(pose) {
                    scene.set_reticle(Some(&pose));
                }
                self.pose = Some(pose);
                if self.announced {
                    return false;
                }
                self.announced = true;
                true
            }
            None => {
                self.hide(scene);
                false
            }
        }
    }

    pub fn hide(&mut self, scene: &mut dyn SceneHost) {
        if self.pose.take().is_some() {
            scene.set_reticle(None);
            self.announced = false;
        }
    }

    /// Re-arm the one-shot notification without touching visibility.
    pub fn rearm(&mut self) {
        self.announced = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RecordingScene;
    use glam::Vec3;

    #[test]
    fn surface_found_fires_once_per_acquisition() {
        let mut scene = RecordingScene::new();
        let mut reticle = Reticle::new();
        let a = Pose::from_position(Vec3::new(0.0, 0.0, -1.0));
        let b = Pose::from_position(Vec3::new(0.1, 0.0, -1.0));

        assert!(reticle.present(Some(a), &mut scene));
        assert!(!reticle.present(Some(b), &mut scene));
        assert!(!reticle.present(None, &mut scene));
        assert!(!reticle.is_visible());
        assert!(reticle.present(Some(a), &mut scene));
    }

    #[test]
    fn scene_sees_only_changes() {
        let mut scene = RecordingScene::new();
        let mut reticle = Reticle::new();
        let a = Pose::from_position(Vec3::new(0.0, 0.0, -1.0));

        reticle.present(Some(a), &mut scene);
        reticle.present(Some(a), &mut scene);
        reticle.present(None, &mut scene);
        reticle.present(None, &mut scene);
        assert_eq!(scene.reticle_updates(), 2);
        assert_eq!(scene.reticle(), None);
    }

    #[test]
    fn rearm_allows_refire_while_visible() {
        let mut scene = RecordingScene::new();
        let mut reticle = Reticle::new();
        let a = Pose::from_position(Vec3::ZERO);
        assert!(reticle.present(Some(a), &mut scene));
        reticle.rearm();
        assert!(reticle.present(Some(a), &mut scene));
    }
}
