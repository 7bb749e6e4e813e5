//! Render-side boundary. The core decides *what* is in the scene; the host
//! owns the actual renderables and draws them after `update` returns.

use crate::assets::{InstanceId, ModelInstance};
use crate::geometry::{Pose, Transform};

pub trait SceneHost {
    fn add_object(&mut self, instance: &ModelInstance, transform: &Transform);
    fn remove_object(&mut self, id: InstanceId);
    fn set_object_transform(&mut self, id: InstanceId, transform: &Transform);
    fn set_object_visible(&mut self, id: InstanceId, visible: bool);
    /// `None` hides the reticle.
    fn set_reticle(&mut self, pose: Option<&Pose>);
}

