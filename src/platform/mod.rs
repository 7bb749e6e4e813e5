//! Collaborator traits for the tracking platform (an immersive AR runtime or
//! a simulator). The core never talks to a device API directly.

use crate::geometry::Pose;
use crate::session::{FrameInfo, SessionStartError, TrackingError};
use futures::future::LocalBoxFuture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

/// Everything a successful handshake hands over.
pub struct SessionBinding {
    pub handle: SessionHandle,
    /// Origin of the session reference frame, expressed in tracking space.
    pub reference_space: Pose,
    pub hit_test: Box<dyn HitTestSource>,
}

pub type HandshakeFuture = LocalBoxFuture<'static, Result<SessionBinding, SessionStartError>>;

pub trait XrPlatform {
    fn is_supported(&self) -> bool;
    /// Start the handshake. The future resolves once the reference frame and
    /// hit-test source are available.
    fn request_session(&mut self) -> HandshakeFuture;
    fn end_session(&mut self, handle: SessionHandle);
}

pub trait HitTestSource {
    /// Hit results for this frame in tracking space, nearest first.
    fn sample(&mut self, frame: &FrameInfo) -> Result<Vec<Pose>, TrackingError>;
    fn cancel(&mut self);
}
