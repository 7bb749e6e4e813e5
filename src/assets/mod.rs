//! Model cache and loader boundary.
//!
//! The cache is keyed by normalized model path and holds loaded-but-never-
//! placed templates. Placements only ever receive an instantiated copy, so
//! two placements of the same model cannot alias each other. The cache also
//! owns the in-flight load futures, which makes it the single answer to
//! "is this path already loading or loaded?".

pub mod gltf;
pub mod scale;

pub use gltf::GltfFileLoader;
pub use scale::{is_usable_scale, ScaleRule, ScaleTable};

use crate::geometry::Aabb;
use crate::task::poll_once;
use futures::future::LocalBoxFuture;
use std::collections::HashMap;
use std::task::Poll;

/// Loaded model data, never mutated once cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTemplate {
    pub name: String,
    pub bounds: Aabb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

/// A placeable copy of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    pub id: InstanceId,
    pub source: String,
    pub name: String,
    pub bounds: Aabb,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read model at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse glTF JSON in {path}: {source}")]
    ParseGltf {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed GLB container: {path}")]
    InvalidGlb { path: String },
    #[error("model has no POSITION bounds: {path}")]
    MissingBounds { path: String },
    #[error("loader dropped the request for {path}")]
    LoaderDropped { path: String },
    #[error("model load rejected for {path}: {reason}")]
    Rejected { path: String, reason: String },
}

/// Failure surfaced outward when a placement cannot get its model.
pub type ModelLoadError = AssetError;

pub type LoadFuture = LocalBoxFuture<'static, Result<ModelTemplate, ModelLoadError>>;

/// Resolves a model path to a template. Implementations must not block:
/// slow work belongs inside the returned future.
pub trait ModelLoader {
    fn load(&mut self, path: &str) -> LoadFuture;
}

pub enum CacheLookup {
    Ready(ModelInstance),
    Loading,
}

/// Result of a load that finished during `AssetCache::poll`.
#[derive(Debug)]
pub struct LoadOutcome {
    pub path: String,
    pub result: Result<(), AssetError>,
}

pub struct AssetCache {
    loader: Box<dyn ModelLoader>,
    entries: HashMap<String, ModelTemplate>,
    in_flight: HashMap<String, LoadFuture>,
    next_instance_id: u64,
}

impl AssetCache {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        Self {
            loader,
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            next_instance_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    pub fn is_loading(&self, path: &str) -> bool {
        self.in_flight.contains_key(&normalize_path(path))
    }

    /// Hit: a fresh instance right away. Miss: make sure exactly one load is
    /// running for the path and report `Loading`.
    pub fn request(&mut self, path: &str) -> CacheLookup {
        let key = normalize_path(path);
        if let Some(instance) = self.instantiate_key(&key) {
            log::debug!("Model cache hit: {}", key);
            return CacheLookup::Ready(instance);
        }
        if !self.in_flight.contains_key(&key) {
            log::info!("Loading model: {}", key);
            let future = self.loader.load(&key);
            self.in_flight.insert(key, future);
        } else {
            log::debug!("Model already loading: {}", key);
        }
        CacheLookup::Loading
    }

    pub fn instantiate(&mut self, path: &str) -> Option<ModelInstance> {
        self.instantiate_key(&normalize_path(path))
    }

    fn instantiate_key(&mut self, key: &str) -> Option<ModelInstance> {
        let template = self.entries.get(key)?;
        let id = InstanceId(self.next_instance_id);
        self.next_instance_id += 1;
        Some(ModelInstance {
            id,
            source: key.to_string(),
            name: template.name.clone(),
            bounds: template.bounds,
        })
    }

    /// Drive every in-flight load once. Finished loads are cached (success)
    /// or dropped (failure) and reported.
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let mut finished = Vec::new();
        for (key, future) in self.in_flight.iter_mut() {
            if let Poll::Ready(result) = poll_once(future) {
                finished.push((key.clone(), result));
            }
        }

        let mut outcomes = Vec::with_capacity(finished.len());
        for (key, result) in finished {
            self.in_flight.remove(&key);
            match result {
                Ok(template) => {
                    log::info!(
                        "Loaded model '{}' ({}) center={:?} extent={:?}",
                        template.name,
                        key,
                        template.bounds.center(),
                        template.bounds.extent()
                    );
                    self.entries.entry(key.clone()).or_insert(template);
                    outcomes.push(LoadOutcome {
                        path: key,
                        result: Ok(()),
                    });
                }
                Err(err) => {
                    log::warn!("Failed to load model {}: {}", key, err);
                    outcomes.push(LoadOutcome {
                        path: key,
                        result: Err(err),
                    });
                }
            }
        }
        outcomes
    }
}

/// Cache key for a model path: forward slashes, no leading `./`, no empty segments.
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    let absolute = trimmed.starts_with('/');
    let joined = trimmed
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimLoader;
    use glam::Vec3;

    #[test]
    fn normalize_collapses_prefixes_and_separators() {
        assert_eq!(normalize_path("./asset/pizza.glb"), "asset/pizza.glb");
        assert_eq!(normalize_path(" asset\\\\pizza.glb "), "asset/pizza.glb");
        assert_eq!(normalize_path("././a//b/./c.glb"), "a/b/c.glb");
        assert_eq!(normalize_path("/srv/models/x.glb"), "/srv/models/x.glb");
    }

    #[test]
    fn miss_starts_one_load_and_hit_returns_fresh_instances() {
        let loader = SimLoader::deferred();
        let mut cache = AssetCache::new(Box::new(loader.clone()));

        assert!(matches!(cache.request("a.model"), CacheLookup::Loading));
        assert!(matches!(cache.request("./a.model"), CacheLookup::Loading));
        assert_eq!(loader.load_count("a.model"), 1);
        assert!(cache.is_loading("a.model"));

        loader.complete("a.model");
        let outcomes = cache.poll();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_ok());
        assert!(!cache.is_loading("a.model"));

        let first = match cache.request("a.model") {
            CacheLookup::Ready(instance) => instance,
            CacheLookup::Loading => panic!("expected cache hit"),
        };
        let second = cache.instantiate("a.model").unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.bounds, second.bounds);
        assert_eq!(loader.load_count("a.model"), 1);
    }

    #[test]
    fn failed_load_is_not_cached_and_can_retry() {
        let loader = SimLoader::deferred();
        let mut cache = AssetCache::new(Box::new(loader.clone()));

        cache.request("broken.model");
        loader.fail("broken.model", "404");
        let outcomes = cache.poll();
        assert!(outcomes[0].result.is_err());
        assert!(!cache.contains("broken.model"));

        cache.request("broken.model");
        assert_eq!(loader.load_count("broken.model"), 2);
    }

    #[test]
    fn instant_loader_resolves_on_first_poll() {
        let loader = SimLoader::instant(Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        let mut cache = AssetCache::new(Box::new(loader));
        cache.request("cube.model");
        assert_eq!(cache.poll().len(), 1);
        assert_eq!(cache.len(), 1);
    }
}
