//! Typed view of a glTF 2.0 document.
//!
//! Only the fields consumed by decoding, validation and comparison are
//! modelled; everything else is kept in [`Document::json`] for ad hoc
//! inspection. Optional numeric fields receive their glTF defaults while
//! deserializing so consumers never re-apply them.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::shared::absolute_path;

/// Magic bytes at the start of a GLB container.
pub const GLB_MAGIC: &[u8; 4] = b"glTF";

#[remain::sorted]
#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("{kind} index {index} is out of range (document has {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Document does not match the glTF structure: {0}")]
    InvalidDocument(String),
    #[error("IO Error: {0}")]
    IoError(String),
    #[error("Input is neither glTF JSON nor GLB: {0}")]
    NotGltf(String),
    #[error("Resource not found: {}", .0.display())]
    ResourceNotFound(PathBuf),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub asset: AssetMeta,
    #[serde(default)]
    pub accessors: Vec<Accessor>,
    #[serde(default)]
    pub buffer_views: Vec<BufferView>,
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub textures: Vec<Texture>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub animations: Vec<Animation>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub skins: Vec<Skin>,
    pub scene: Option<usize>,
    #[serde(default)]
    pub extensions_used: Vec<String>,
    #[serde(default)]
    pub extensions_required: Vec<String>,
    #[serde(default)]
    pub extensions: Map<String, Value>,

    /// Directory external URIs are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
    /// Binary chunk of a GLB container.
    #[serde(skip)]
    pub blob: Option<Vec<u8>>,
    /// The complete JSON the document was parsed from.
    #[serde(skip)]
    pub json: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMeta {
    #[serde(default)]
    pub version: String,
    pub generator: Option<String>,
    pub min_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    #[serde(default)]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub element_type: String,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
    pub sparse: Option<Value>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<u32>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub uri: Option<String>,
    pub byte_length: usize,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<Primitive>,
    #[serde(default)]
    pub weights: Vec<f32>,
}

/// Triangle list, the default primitive topology.
pub const MODE_TRIANGLES: u32 = 4;

fn default_mode() -> u32 {
    MODE_TRIANGLES
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive {
    #[serde(default)]
    pub attributes: IndexMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    #[serde(default = "default_mode")]
    pub mode: u32,
    #[serde(default)]
    pub targets: Vec<IndexMap<String, usize>>,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub name: Option<String>,
    #[serde(default)]
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    pub normal_texture: Option<TextureInfo>,
    pub occlusion_texture: Option<TextureInfo>,
    pub emissive_texture: Option<TextureInfo>,
    #[serde(default)]
    pub emissive_factor: [f32; 3],
    #[serde(default = "default_alpha_mode")]
    pub alpha_mode: String,
    #[serde(default = "default_alpha_cutoff")]
    pub alpha_cutoff: f32,
    #[serde(default)]
    pub double_sided: bool,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

fn default_alpha_mode() -> String {
    "OPAQUE".to_string()
}

fn default_alpha_cutoff() -> f32 {
    0.5
}

fn default_factor() -> f32 {
    1.0
}

fn default_base_color() -> [f32; 4] {
    [1.0; 4]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    #[serde(default = "default_base_color")]
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureInfo>,
    #[serde(default = "default_factor")]
    pub metallic_factor: f32,
    #[serde(default = "default_factor")]
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureInfo>,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: default_base_color(),
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
    pub scale: Option<f32>,
    pub strength: Option<f32>,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Texture {
    pub name: Option<String>,
    pub sampler: Option<usize>,
    pub source: Option<usize>,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub buffer_view: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub name: Option<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub samplers: Vec<AnimationSampler>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub sampler: usize,
    pub target: ChannelTarget,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTarget {
    pub node: Option<usize>,
    pub path: String,
}

fn default_interpolation() -> String {
    "LINEAR".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSampler {
    pub input: usize,
    pub output: usize,
    #[serde(default = "default_interpolation")]
    pub interpolation: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: Option<String>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    #[serde(default)]
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    pub name: Option<String>,
    #[serde(default)]
    pub joints: Vec<usize>,
    pub inverse_bind_matrices: Option<usize>,
}

fn lookup<'a, T>(items: &'a [T], kind: &'static str, index: usize) -> Result<&'a T, Err> {
    items.get(index).ok_or(Err::IndexOutOfRange {
        kind,
        index,
        len: items.len(),
    })
}

impl Document {
    /// Parses glTF JSON or a GLB container. `base_dir` is the directory
    /// external URIs are resolved against.
    pub fn from_slice(bytes: &[u8], base_dir: Option<&Path>) -> Result<Self, Err> {
        let (json_bytes, blob) = if bytes.starts_with(GLB_MAGIC) {
            let glb = gltf::Glb::from_slice(bytes)
                .map_err(|e| Err::NotGltf(format!("invalid GLB container: {}", e)))?;
            (glb.json.into_owned(), glb.bin.map(|bin| bin.into_owned()))
        } else {
            (bytes.to_vec(), None)
        };

        let json: Value = serde_json::from_slice(&json_bytes)
            .map_err(|e| Err::NotGltf(format!("invalid JSON: {}", e)))?;
        if !json.is_object() {
            return Err(Err::NotGltf("top-level JSON value is not an object".to_string()));
        }

        let mut document = Document::deserialize(&json)
            .map_err(|e| Err::InvalidDocument(e.to_string()))?;
        document.base_dir = base_dir.map(Path::to_path_buf);
        document.blob = blob;
        document.json = json;
        Ok(document)
    }

    /// Reads and parses the asset at `path`, resolving external URIs
    /// relative to its directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Err> {
        let path = absolute_path(path.as_ref());
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Err::ResourceNotFound(path.clone()),
            _ => Err::IoError(format!("Failed to read {}: {}", path.display(), e)),
        })?;
        Self::from_slice(&bytes, path.parent())
    }

    pub fn accessor(&self, index: usize) -> Result<&Accessor, Err> {
        lookup(&self.accessors, "accessor", index)
    }

    pub fn buffer_view(&self, index: usize) -> Result<&BufferView, Err> {
        lookup(&self.buffer_views, "bufferView", index)
    }

    pub fn buffer(&self, index: usize) -> Result<&Buffer, Err> {
        lookup(&self.buffers, "buffer", index)
    }

    pub fn mesh(&self, index: usize) -> Result<&Mesh, Err> {
        lookup(&self.meshes, "mesh", index)
    }

    pub fn material(&self, index: usize) -> Result<&Material, Err> {
        lookup(&self.materials, "material", index)
    }

    pub fn texture(&self, index: usize) -> Result<&Texture, Err> {
        lookup(&self.textures, "texture", index)
    }

    pub fn animation(&self, index: usize) -> Result<&Animation, Err> {
        lookup(&self.animations, "animation", index)
    }

    pub fn node(&self, index: usize) -> Result<&Node, Err> {
        lookup(&self.nodes, "node", index)
    }

    pub fn mesh_by_name(&self, name: &str) -> Option<(usize, &Mesh)> {
        self.meshes
            .iter()
            .enumerate()
            .find(|(_, mesh)| mesh.name.as_deref() == Some(name))
    }

    pub fn material_by_name(&self, name: &str) -> Option<(usize, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .find(|(_, material)| material.name.as_deref() == Some(name))
    }

    pub fn animation_by_name(&self, name: &str) -> Option<(usize, &Animation)> {
        self.animations
            .iter()
            .enumerate()
            .find(|(_, animation)| animation.name.as_deref() == Some(name))
    }

    pub fn uses_extension(&self, name: &str) -> bool {
        self.extensions_used.iter().any(|used| used == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "asset": { "version": "2.0", "generator": "test" },
        "buffers": [ { "byteLength": 24, "uri": "data.bin" } ],
        "bufferViews": [ { "buffer": 0, "byteLength": 24, "byteStride": 12 } ],
        "accessors": [ { "bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC3" } ],
        "meshes": [ { "name": "Cube", "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
        "materials": [ { "name": "Red" } ],
        "someVendorField": { "ignored": true }
    }"#;

    #[test]
    fn test_defaults_applied_at_parse_time() {
        let doc = Document::from_slice(MINIMAL.as_bytes(), None).unwrap();
        assert_eq!(doc.asset.version, "2.0");
        assert_eq!(doc.accessors[0].byte_offset, 0);
        assert!(!doc.accessors[0].normalized);
        assert_eq!(doc.buffer_views[0].byte_offset, 0);
        assert_eq!(doc.buffer_views[0].byte_stride, Some(12));
        assert_eq!(doc.meshes[0].primitives[0].mode, MODE_TRIANGLES);

        let material = &doc.materials[0];
        assert_eq!(material.pbr_metallic_roughness.base_color_factor, [1.0; 4]);
        assert_eq!(material.pbr_metallic_roughness.metallic_factor, 1.0);
        assert_eq!(material.emissive_factor, [0.0; 3]);
        assert_eq!(material.alpha_mode, "OPAQUE");
        assert_eq!(material.alpha_cutoff, 0.5);
    }

    #[test]
    fn test_lookup_out_of_range() {
        let doc = Document::from_slice(MINIMAL.as_bytes(), None).unwrap();
        assert!(doc.accessor(0).is_ok());
        match doc.accessor(3) {
            Err(Err::IndexOutOfRange { kind, index, len }) => {
                assert_eq!(kind, "accessor");
                assert_eq!(index, 3);
                assert_eq!(len, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let doc = Document::from_slice(MINIMAL.as_bytes(), None).unwrap();
        assert_eq!(doc.mesh_by_name("Cube").map(|(i, _)| i), Some(0));
        assert!(doc.mesh_by_name("Sphere").is_none());
        assert_eq!(doc.material_by_name("Red").map(|(i, _)| i), Some(0));
        assert!(doc.json.get("someVendorField").is_some());
    }

    #[test]
    fn test_rejects_non_gltf_input() {
        assert!(matches!(
            Document::from_slice(b"solid cube\nendsolid", None),
            Err(Err::NotGltf(_))
        ));
        assert!(matches!(
            Document::from_slice(b"[1, 2, 3]", None),
            Err(Err::NotGltf(_))
        ));
        assert!(matches!(
            Document::from_slice(b"glTF\x02\x00\x00\x00", None),
            Err(Err::NotGltf(_))
        ));
    }

    #[test]
    fn test_structure_mismatch_is_invalid_document() {
        let json = r#"{ "asset": { "version": "2.0" }, "accessors": [ { "count": "two" } ] }"#;
        assert!(matches!(
            Document::from_slice(json.as_bytes(), None),
            Err(Err::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_missing_file_names_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing.gltf");
        match Document::from_path(&missing) {
            Err(Err::ResourceNotFound(path)) => {
                assert!(path.is_absolute());
                assert!(path.ends_with("nothing.gltf"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
