//! Deterministic stand-ins for the platform, loader, scene host and
//! notification sink. The demo binary runs on these; so do the tests.
//!
//! Every type here is a cheap handle over shared state: keep one clone,
//! hand another to the session manager, and drive or inspect through yours.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, FutureExt};

use crate::assets::{AssetError, InstanceId, LoadFuture, ModelInstance, ModelLoader, ModelTemplate};
use crate::geometry::{Aabb, Pose, Transform};
use crate::platform::{HandshakeFuture, HitTestSource, SessionBinding, SessionHandle, XrPlatform};
use crate::scene::SceneHost;
use crate::session::notify::display_name;
use crate::session::{FrameInfo, Notification, Notifier, SessionStartError, TrackingError};

// ========================================================================
// Hit-test feed
// ========================================================================

#[derive(Debug, Default)]
struct FeedState {
    hits: Vec<Pose>,
    fail_next: Option<String>,
    cancelled: bool,
    samples: usize,
}

/// Scripted hit-test results. `source()` hands out the platform side.
#[derive(Debug, Clone, Default)]
pub struct SimHitFeed {
    state: Rc<RefCell<FeedState>>,
}

impl SimHitFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> SimHitSource {
        self.state.borrow_mut().cancelled = false;
        SimHitSource {
            state: Rc::clone(&self.state),
        }
    }

    pub fn set_hits(&self, hits: Vec<Pose>) {
        self.state.borrow_mut().hits = hits;
    }

    pub fn set_hit(&self, hit: Option<Pose>) {
        self.set_hits(hit.into_iter().collect());
    }

    /// The next sample reports tracking loss.
    pub fn fail_next(&self, reason: &str) {
        self.state.borrow_mut().fail_next = Some(reason.to_string());
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().cancelled
    }

    pub fn sample_count(&self) -> usize {
        self.state.borrow().samples
    }
}

pub struct SimHitSource {
    state: Rc<RefCell<FeedState>>,
}

impl HitTestSource for SimHitSource {
    fn sample(&mut self, _frame: &FrameInfo) -> Result<Vec<Pose>, TrackingError> {
        let mut state = self.state.borrow_mut();
        state.samples += 1;
        if let Some(reason) = state.fail_next.take() {
            return Err(TrackingError::Lost(reason));
        }
        Ok(state.hits.clone())
    }

    fn cancel(&mut self) {
        self.state.borrow_mut().cancelled = true;
    }
}

// ========================================================================
// Platform
// ========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Handshake {
    Immediate,
    Deferred,
    Fail(SessionStartError),
}

struct PlatformState {
    supported: bool,
    handshake: Handshake,
    feed: SimHitFeed,
    reference_space: Pose,
    next_handle: u64,
    requests: usize,
    waiting: Option<oneshot::Sender<Result<SessionBinding, SessionStartError>>>,
    ended: Vec<SessionHandle>,
}

#[derive(Clone)]
pub struct SimPlatform {
    state: Rc<RefCell<PlatformState>>,
}

impl SimPlatform {
    fn build(supported: bool, handshake: Handshake, feed: SimHitFeed) -> Self {
        Self {
            state: Rc::new(RefCell::new(PlatformState {
                supported,
                handshake,
                feed,
                reference_space: Pose::IDENTITY,
                next_handle: 1,
                requests: 0,
                waiting: None,
                ended: Vec::new(),
            })),
        }
    }

    /// Supported platform whose handshake completes on the first poll.
    pub fn new(feed: &SimHitFeed) -> Self {
        Self::build(true, Handshake::Immediate, feed.clone())
    }

    /// Handshake completes only after `complete_handshake`.
    pub fn deferred(feed: &SimHitFeed) -> Self {
        Self::build(true, Handshake::Deferred, feed.clone())
    }

    pub fn unsupported() -> Self {
        Self::build(false, Handshake::Immediate, SimHitFeed::new())
    }

    /// The platform rejects the session request.
    pub fn failing(reason: &str) -> Self {
        Self::failing_with(SessionStartError::Rejected(reason.to_string()))
    }

    /// The session opens but the floor reference space cannot be created.
    pub fn without_reference_space(reason: &str) -> Self {
        Self::failing_with(SessionStartError::ReferenceSpace(reason.to_string()))
    }

    /// The session opens but hit testing is unavailable.
    pub fn without_hit_test(reason: &str) -> Self {
        Self::failing_with(SessionStartError::HitTestSource(reason.to_string()))
    }

    fn failing_with(error: SessionStartError) -> Self {
        Self::build(true, Handshake::Fail(error), SimHitFeed::new())
    }

    pub fn with_reference_space(self, reference_space: Pose) -> Self {
        self.state.borrow_mut().reference_space = reference_space;
        self
    }

    pub fn complete_handshake(&self) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(sender) = state.waiting.take() else {
            return false;
        };
        let binding = Self::binding(&mut state);
        sender.send(Ok(binding)).is_ok()
    }

    pub fn request_count(&self) -> usize {
        self.state.borrow().requests
    }

    pub fn ended_sessions(&self) -> Vec<SessionHandle> {
        self.state.borrow().ended.clone()
    }

    fn binding(state: &mut PlatformState) -> SessionBinding {
        let handle = SessionHandle(state.next_handle);
        state.next_handle += 1;
        SessionBinding {
            handle,
            reference_space: state.reference_space,
            hit_test: Box::new(state.feed.source()),
        }
    }
}

impl XrPlatform for SimPlatform {
    fn is_supported(&self) -> bool {
        self.state.borrow().supported
    }

    fn request_session(&mut self) -> HandshakeFuture {
        let mut state = self.state.borrow_mut();
        state.requests += 1;
        match state.handshake.clone() {
            Handshake::Immediate => future::ready(Ok(Self::binding(&mut state))).boxed_local(),
            Handshake::Fail(error) => future::ready(Err(error)).boxed_local(),
            Handshake::Deferred => {
                let (sender, receiver) = oneshot::channel();
                state.waiting = Some(sender);
                receiver
                    .map(|result| {
                        result.unwrap_or_else(|_| {
                            Err(SessionStartError::Rejected("handshake abandoned".into()))
                        })
                    })
                    .boxed_local()
            }
        }
    }

    fn end_session(&mut self, handle: SessionHandle) {
        log::debug!("Simulated platform ending {:?}", handle);
        self.state.borrow_mut().ended.push(handle);
    }
}

// ========================================================================
// Model loader
// ========================================================================

type LoadSender = oneshot::Sender<Result<ModelTemplate, AssetError>>;

struct LoaderState {
    deferred: bool,
    bounds: Aabb,
    counts: HashMap<String, usize>,
    waiting: HashMap<String, Vec<LoadSender>>,
}

/// Loader with scripted completion. `instant` loads resolve on the first
/// poll; `deferred` loads wait for `complete` or `fail`.
#[derive(Clone)]
pub struct SimLoader {
    state: Rc<RefCell<LoaderState>>,
}

impl SimLoader {
    fn build(deferred: bool, bounds: Aabb) -> Self {
        Self {
            state: Rc::new(RefCell::new(LoaderState {
                deferred,
                bounds,
                counts: HashMap::new(),
                waiting: HashMap::new(),
            })),
        }
    }

    pub fn instant(bounds: Aabb) -> Self {
        Self::build(false, bounds)
    }

    pub fn deferred() -> Self {
        Self::build(true, Aabb::new(glam::Vec3::splat(-0.5), glam::Vec3::splat(0.5)))
    }

    pub fn load_count(&self, path: &str) -> usize {
        self.state.borrow().counts.get(path).copied().unwrap_or(0)
    }

    pub fn complete(&self, path: &str) -> bool {
        let loaded = sim_template(path, self.state.borrow().bounds);
        self.resolve(path, || Ok(loaded.clone()))
    }

    pub fn fail(&self, path: &str, reason: &str) -> bool {
        self.resolve(path, || {
            Err(AssetError::Rejected {
                path: path.to_string(),
                reason: reason.to_string(),
            })
        })
    }

    fn resolve(&self, path: &str, result: impl Fn() -> Result<ModelTemplate, AssetError>) -> bool {
        let senders = self.state.borrow_mut().waiting.remove(path).unwrap_or_default();
        let mut delivered = false;
        for sender in senders {
            delivered |= sender.send(result()).is_ok();
        }
        delivered
    }
}

fn sim_template(path: &str, bounds: Aabb) -> ModelTemplate {
    ModelTemplate {
        name: display_name(path).to_string(),
        bounds,
    }
}

impl ModelLoader for SimLoader {
    fn load(&mut self, path: &str) -> LoadFuture {
        let mut state = self.state.borrow_mut();
        *state.counts.entry(path.to_string()).or_insert(0) += 1;
        if !state.deferred {
            return future::ready(Ok(sim_template(path, state.bounds))).boxed_local();
        }
        let (sender, receiver) = oneshot::channel();
        state.waiting.entry(path.to_string()).or_default().push(sender);
        let path = path.to_string();
        receiver
            .map(move |result| result.unwrap_or_else(|_| Err(AssetError::LoaderDropped { path })))
            .boxed_local()
    }
}

// ========================================================================
// Scene host
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneOp {
    Add(InstanceId),
    Remove(InstanceId),
    Transform(InstanceId),
    Visible(InstanceId, bool),
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub instance: ModelInstance,
    pub transform: Transform,
    pub visible: bool,
}

#[derive(Debug, Default)]
struct SceneState {
    ops: Vec<SceneOp>,
    objects: BTreeMap<InstanceId, SceneObject>,
    max_objects: usize,
    reticle: Option<Pose>,
    reticle_updates: usize,
}

/// Scene host that records what it was told to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingScene {
    state: Rc<RefCell<SceneState>>,
}

impl RecordingScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<SceneOp> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    pub fn adds(&self) -> usize {
        self.count_ops(|op| matches!(op, SceneOp::Add(_)))
    }

    pub fn removes(&self) -> usize {
        self.count_ops(|op| matches!(op, SceneOp::Remove(_)))
    }

    pub fn object_count(&self) -> usize {
        self.state.borrow().objects.len()
    }

    /// Most objects ever attached at once.
    pub fn max_objects(&self) -> usize {
        self.state.borrow().max_objects
    }

    pub fn object_transform(&self, id: InstanceId) -> Option<Transform> {
        self.state.borrow().objects.get(&id).map(|o| o.transform)
    }

    pub fn object_visible(&self, id: InstanceId) -> Option<bool> {
        self.state.borrow().objects.get(&id).map(|o| o.visible)
    }

    /// Name of the model behind each attached object.
    pub fn object_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .objects
            .values()
            .map(|o| o.instance.name.clone())
            .collect()
    }

    pub fn reticle(&self) -> Option<Pose> {
        self.state.borrow().reticle
    }

    pub fn reticle_updates(&self) -> usize {
        self.state.borrow().reticle_updates
    }

    fn count_ops(&self, predicate: impl Fn(&SceneOp) -> bool) -> usize {
        self.state.borrow().ops.iter().filter(|op| predicate(op)).count()
    }
}

impl SceneHost for RecordingScene {
    fn add_object(&mut self, instance: &ModelInstance, transform: &Transform) {
        let mut state = self.state.borrow_mut();
        state.ops.push(SceneOp::Add(instance.id));
        state.objects.insert(
            instance.id,
            SceneObject {
                instance: instance.clone(),
                transform: *transform,
                visible: true,
            },
        );
        state.max_objects = state.max_objects.max(state.objects.len());
    }

    fn remove_object(&mut self, id: InstanceId) {
        let mut state = self.state.borrow_mut();
        state.ops.push(SceneOp::Remove(id));
        state.objects.remove(&id);
    }

    fn set_object_transform(&mut self, id: InstanceId, transform: &Transform) {
        let mut state = self.state.borrow_mut();
        state.ops.push(SceneOp::Transform(id));
        if let Some(object) = state.objects.get_mut(&id) {
            object.transform = *transform;
        }
    }

    fn set_object_visible(&mut self, id: InstanceId, visible: bool) {
        let mut state = self.state.borrow_mut();
        state.ops.push(SceneOp::Visible(id, visible));
        if let Some(object) = state.objects.get_mut(&id) {
            object.visible = visible;
        }
    }

    fn set_reticle(&mut self, pose: Option<&Pose>) {
        let mut state = self.state.borrow_mut();
        state.reticle = pose.copied();
        state.reticle_updates += 1;
    }
}

// ========================================================================
// Notifications
// ========================================================================

#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Rc<RefCell<Vec<Notification>>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, notification: &Notification) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|n| *n == notification)
            .count()
    }

    /// Drain what has been recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

impl Notifier for NotificationLog {
    fn notify(&mut self, notification: Notification) {
        self.entries.borrow_mut().push(notification);
    }
}
