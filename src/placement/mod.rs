//! The single placed object and the requests that lead to it.
//!
//! Callers (the session manager) gate placement on reticle visibility and on
//! there being no open manipulation; this module owns the object lifetime,
//! the per-model scale, hot-swapping and the asynchronous attach path.

use crate::assets::{normalize_path, AssetCache, CacheLookup, InstanceId, ModelInstance, ScaleTable};
use crate::geometry::{Pose, Transform};
use crate::scene::SceneHost;

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub instance: ModelInstance,
    /// Path as requested by the caller.
    pub path: String,
    pub transform: Transform,
    pub visible: bool,
}

impl Placement {
    pub fn id(&self) -> InstanceId {
        self.instance.id
    }

    pub fn pose(&self) -> Pose {
        self.transform.pose()
    }
}

/// A placement waiting for its model to finish loading.
#[derive(Debug, Clone, PartialEq)]
struct AttachRequest {
    path: String,
    pose: Pose,
    epoch: u64,
    /// Replaces an object that was already placed; `pose` is that object's.
    swap: bool,
}

impl AttachRequest {
    fn matches(&self, key: &str) -> bool {
        normalize_path(&self.path) == key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// Cache hit: the object is attached now.
    Placed,
    /// Cache miss: attached on a later frame once the load resolves.
    Loading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotSwapOutcome {
    /// A placed object was replaced at its pose.
    Swapped(PlaceOutcome),
    /// An in-flight attach now targets the new model.
    Retargeted(PlaceOutcome),
    /// Nothing placed: the path becomes the selection for the next confirm.
    Recorded,
}

/// What happened to the pending attach when loads were polled.
#[derive(Debug)]
pub enum AttachEvent {
    Placed { path: String, swapped: bool },
    Failed { path: String, reason: String },
}

pub struct PlacementController {
    cache: AssetCache,
    scales: ScaleTable,
    current: Option<Placement>,
    in_flight: Option<AttachRequest>,
    pending: Option<String>,
    selected: Option<String>,
}

impl PlacementController {
    pub fn new(cache: AssetCache, scales: ScaleTable) -> Self {
        Self {
            cache,
            scales,
            current: None,
            in_flight: None,
            pending: None,
            selected: None,
        }
    }

    pub fn current(&self) -> Option<&Placement> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Placement> {
        self.current.as_mut()
    }

    pub fn has_placement(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_attaching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// A hot-swap removed the placed object and its replacement is still
    /// loading. The old pose is held until it attaches.
    pub fn is_swapping(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|request| request.swap)
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select_model(&mut self, path: &str) {
        self.selected = Some(path.to_string());
    }

    pub fn pending_request(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn set_pending(&mut self, path: &str) {
        self.pending = Some(path.to_string());
    }

    pub fn take_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    /// Remove any placed object, then place `path` at `pose`.
    pub fn place_at(
        &mut self,
        path: &str,
        pose: Pose,
        epoch: u64,
        scene: &mut dyn SceneHost,
    ) -> PlaceOutcome {
        self.request(path, pose, epoch, false, scene)
    }

    fn request(
        &mut self,
        path: &str,
        pose: Pose,
        epoch: u64,
        swap: bool,
        scene: &mut dyn SceneHost,
    ) -> PlaceOutcome {
        self.remove_current(scene);
        match self.cache.request(path) {
            CacheLookup::Ready(instance) => {
                self.in_flight = None;
                self.attach(instance, path, pose, scene);
                PlaceOutcome::Placed
            }
            CacheLookup::Loading => {
                self.in_flight = Some(AttachRequest {
                    path: path.to_string(),
                    pose,
                    epoch,
                    swap,
                });
                PlaceOutcome::Loading
            }
        }
    }

    pub fn hot_swap(&mut self, path: &str, epoch: u64, scene: &mut dyn SceneHost) -> HotSwapOutcome {
        self.select_model(path);
        if let Some(pose) = self.current.as_ref().map(Placement::pose) {
            log::info!("Hot-swapping placed model to {}", path);
            return HotSwapOutcome::Swapped(self.request(path, pose, epoch, true, scene));
        }
        if let Some(request) = self.in_flight.take() {
            log::info!(
                "Retargeting pending placement from {} to {}",
                request.path,
                path
            );
            return HotSwapOutcome::Retargeted(self.request(
                path,
                request.pose,
                epoch,
                request.swap,
                scene,
            ));
        }
        log::info!("{} selected; it will be used for the next placement", path);
        HotSwapOutcome::Recorded
    }

    /// Drop the placed object and any attach still waiting on a load.
    pub fn clear(&mut self, scene: &mut dyn SceneHost) -> bool {
        let had_request = self.in_flight.take().is_some();
        self.remove_current(scene) || had_request
    }

    /// Session teardown: nothing survives except the cache and the selection.
    pub fn teardown(&mut self, scene: &mut dyn SceneHost) {
        self.clear(scene);
        self.pending = None;
    }

    /// Poll loads and resolve the pending attach. A result is applied only
    /// if it still answers the current request and `live_epoch` matches the
    /// epoch the request was made in.
    pub fn poll_loads(
        &mut self,
        live_epoch: Option<u64>,
        scene: &mut dyn SceneHost,
    ) -> Vec<AttachEvent> {
        let mut events = Vec::new();
        for outcome in self.cache.poll() {
            let wanted = self
                .in_flight
                .as_ref()
                .is_some_and(|request| request.matches(&outcome.path));
            if !wanted {
                log::debug!("Load for {} finished; no placement is waiting on it", outcome.path);
                continue;
            }
            let Some(request) = self.in_flight.take() else {
                continue;
            };

            match outcome.result {
                Ok(()) => {
                    if live_epoch != Some(request.epoch) {
                        log::debug!("Discarding load result for {}: session changed", request.path);
                        continue;
                    }
                    let Some(instance) = self.cache.instantiate(&request.path) else {
                        continue;
                    };
                    self.remove_current(scene);
                    self.attach(instance, &request.path, request.pose, scene);
                    events.push(AttachEvent::Placed {
                        path: request.path,
                        swapped: request.swap,
                    });
                }
                Err(err) => {
                    if self.pending.as_deref() == Some(request.path.as_str()) {
                        self.pending = None;
                    }
                    events.push(AttachEvent::Failed {
                        path: request.path,
                        reason: err.to_string(),
                    });
                }
            }
        }
        events
    }

    pub fn set_visible(&mut self, visible: bool, scene: &mut dyn SceneHost) -> bool {
        match self.current.as_mut() {
            Some(placement) => {
                if placement.visible != visible {
                    placement.visible = visible;
                    scene.set_object_visible(placement.id(), visible);
                }
                true
            }
            None => false,
        }
    }

    /// Push the placed object's transform to the scene host.
    pub fn sync_transform(&self, scene: &mut dyn SceneHost) {
        if let Some(placement) = &self.current {
            scene.set_object_transform(placement.id(), &placement.transform);
        }
    }

    fn attach(&mut self, instance: ModelInstance, path: &str, pose: Pose, scene: &mut dyn SceneHost) {
        let scale = self.scales.scale_for(path);
        let transform = Transform::from_pose(&pose, scale);
        scene.add_object(&instance, &transform);
        log::info!(
            "Placed '{}' ({}) at {:?} scale {}",
            instance.name,
            path,
            pose.position,
            scale
        );
        self.current = Some(Placement {
            instance,
            path: path.to_string(),
            transform,
            visible: true,
        });
    }

    fn remove_current(&mut self, scene: &mut dyn SceneHost) -> bool {
        match self.current.take() {
            Some(old) => {
                scene.remove_object(old.id());
                log::info!("Removed placed model {}", old.path);
                true
            }
            None => false,
        }
    }
}
