//! File-backed loader for `.gltf` / `.glb` models.
//!
//! Only the JSON document is parsed: model bounds come from the min/max of
//! every primitive's POSITION accessor. Node transforms are not applied.
//! Reading and parsing run on a worker thread so a load never stalls a frame.

use super::{AssetError, LoadFuture, ModelLoader, ModelTemplate};
use crate::geometry::Aabb;
use futures::channel::oneshot;
use futures::FutureExt;
use glam::Vec3;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;
const GLB_HEADER_LEN: usize = 12;
const GLB_CHUNK_HEADER_LEN: usize = 8;

#[derive(Deserialize)]
struct GltfDocument {
    #[serde(default)]
    accessors: Vec<GltfAccessor>,
    #[serde(default)]
    meshes: Vec<GltfMesh>,
}

#[derive(Deserialize)]
struct GltfAccessor {
    #[serde(default)]
    min: Option<Vec<f32>>,
    #[serde(default)]
    max: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct GltfMesh {
    #[serde(default)]
    primitives: Vec<GltfPrimitive>,
}

#[derive(Deserialize)]
struct GltfPrimitive {
    #[serde(default)]
    attributes: HashMap<String, usize>,
}

pub struct GltfFileLoader {
    asset_root: PathBuf,
}

impl GltfFileLoader {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.asset_root.join(candidate)
        }
    }
}

impl ModelLoader for GltfFileLoader {
    fn load(&mut self, path: &str) -> LoadFuture {
        let file = self.resolve(path);
        let key = path.to_string();
        let (tx, rx) = oneshot::channel();
        let worker_key = key.clone();
        std::thread::spawn(move || {
            let result = load_template_from_file(&file, &worker_key);
            // Receiver gone means nobody wants the result anymore.
            let _ = tx.send(result);
        });
        rx.map(move |received| {
            received.unwrap_or_else(|_| Err(AssetError::LoaderDropped { path: key }))
        })
        .boxed_local()
    }
}

fn load_template_from_file(file: &Path, key: &str) -> Result<ModelTemplate, AssetError> {
    let bytes = std::fs::read(file).map_err(|source| AssetError::Read {
        path: file.display().to_string(),
        source,
    })?;
    let name = file
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("model")
        .to_string();
    let bounds = parse_bounds(&bytes, key)?;
    Ok(ModelTemplate { name, bounds })
}

/// Bounds of a glTF model given either the JSON text or a binary GLB.
pub fn parse_bounds(bytes: &[u8], path: &str) -> Result<Aabb, AssetError> {
    let json = if bytes.starts_with(GLB_MAGIC) {
        glb_json_chunk(bytes).ok_or_else(|| AssetError::InvalidGlb {
            path: path.to_string(),
        })?
    } else {
        bytes
    };
    let document: GltfDocument =
        serde_json::from_slice(json).map_err(|source| AssetError::ParseGltf {
            path: path.to_string(),
            source,
        })?;

    let mut bounds = Aabb::EMPTY;
    for primitive in document.meshes.iter().flat_map(|mesh| mesh.primitives.iter()) {
        let Some(&index) = primitive.attributes.get("POSITION") else {
            continue;
        };
        let Some(accessor) = document.accessors.get(index) else {
            continue;
        };
        if let (Some(min), Some(max)) = (&accessor.min, &accessor.max) {
            if min.len() == 3 && max.len() == 3 {
                let accessor_bounds = Aabb::new(
                    Vec3::new(min[0], min[1], min[2]),
                    Vec3::new(max[0], max[1], max[2]),
                );
                bounds = bounds.union(&accessor_bounds);
            }
        }
    }

    if bounds.is_empty() {
        return Err(AssetError::MissingBounds {
            path: path.to_string(),
        });
    }
    Ok(bounds)
}

fn glb_json_chunk(bytes: &[u8]) -> Option<&[u8]> {
    let header = bytes.get(GLB_HEADER_LEN..GLB_HEADER_LEN + GLB_CHUNK_HEADER_LEN)?;
    let chunk_len = u32::from_le_bytes(header[0..4].try_into().ok()?) as usize;
    let chunk_type = u32::from_le_bytes(header[4..8].try_into().ok()?);
    if chunk_type != GLB_CHUNK_JSON {
        return None;
    }
    let start = GLB_HEADER_LEN + GLB_CHUNK_HEADER_LEN;
    bytes.get(start..start.checked_add(chunk_len)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::poll_once;
    use std::task::Poll;

    const TWO_PRIMITIVES: &str = r#"{
        "asset": {"version": "2.0"},
        "accessors": [
            {"min": [-1.0, 0.0, -0.5], "max": [1.0, 0.3, 0.5]},
            {"count": 12},
            {"min": [0.0, 0.0, 0.0], "max": [0.5, 2.0, 0.25]}
        ],
        "meshes": [
            {"primitives": [{"attributes": {"POSITION": 0, "NORMAL": 1}}]},
            {"primitives": [{"attributes": {"POSITION": 2}}]}
        ]
    }"#;

    fn glb_from_json(json: &str) -> Vec<u8> {
        let mut payload = json.as_bytes().to_vec();
        while payload.len() % 4 != 0 {
            payload.push(b' ');
        }
        let total = (GLB_HEADER_LEN + GLB_CHUNK_HEADER_LEN + payload.len()) as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(GLB_MAGIC);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&total.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
        bytes.extend_from_slice(&payload);
        bytes
    }

    #[test]
    fn bounds_union_over_primitives() {
        let bounds = parse_bounds(TWO_PRIMITIVES.as_bytes(), "pizza.gltf").unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, -0.5));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 0.5));
    }

    #[test]
    fn glb_json_chunk_is_read() {
        let bytes = glb_from_json(TWO_PRIMITIVES);
        let bounds = parse_bounds(&bytes, "pizza.glb").unwrap();
        assert_eq!(bounds.max.y, 2.0);
    }

    #[test]
    fn truncated_glb_is_rejected() {
        let mut bytes = glb_from_json(TWO_PRIMITIVES);
        bytes.truncate(40);
        assert!(matches!(
            parse_bounds(&bytes, "cut.glb"),
            Err(AssetError::InvalidGlb { .. })
        ));
    }

    #[test]
    fn document_without_positions_has_no_bounds() {
        let json = r#"{"meshes": [{"primitives": [{"attributes": {}}]}]}"#;
        assert!(matches!(
            parse_bounds(json.as_bytes(), "empty.gltf"),
            Err(AssetError::MissingBounds { .. })
        ));
    }

    #[test]
    fn loader_reports_missing_file() {
        let root = std::env::temp_dir().join("arplace-missing-assets");
        let mut loader = GltfFileLoader::new(root);
        let mut future = loader.load("nope.glb");
        let result = loop {
            if let Poll::Ready(result) = poll_once(&mut future) {
                break result;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        };
        assert!(matches!(result, Err(AssetError::Read { .. })));
    }

    #[test]
    fn loader_reads_gltf_from_asset_root() {
        let root = std::env::temp_dir().join(format!("arplace-assets-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("Margherita.gltf"), TWO_PRIMITIVES).unwrap();

        let mut loader = GltfFileLoader::new(&root);
        let mut future = loader.load("Margherita.gltf");
        let template = loop {
            if let Poll::Ready(result) = poll_once(&mut future) {
                break result.unwrap();
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        };
        assert_eq!(template.name, "Margherita");
        assert_eq!(template.bounds.min.x, -1.0);

        let _ = std::fs::remove_dir_all(&root);
    }
}
