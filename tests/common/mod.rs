//! Fixture assets written into temporary directories.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

/// A one-triangle asset, optionally animated.
#[derive(Debug, Clone)]
pub struct FixtureAsset {
    pub positions: Vec<[f32; 3]>,
    pub animated: bool,
    pub default_scene: bool,
}

impl FixtureAsset {
    pub fn triangle(positions: &[[f32; 3]]) -> Self {
        Self {
            positions: positions.to_vec(),
            animated: false,
            default_scene: true,
        }
    }

    pub fn with_animation(mut self) -> Self {
        self.animated = true;
        self
    }

    pub fn without_default_scene(mut self) -> Self {
        self.default_scene = false;
        self
    }

    /// The JSON document (without buffer URI) and the binary payload.
    fn build(&self) -> (Value, Vec<u8>) {
        let mut bin: Vec<u8> = self
            .positions
            .iter()
            .flatten()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let position_len = bin.len();

        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for position in &self.positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(position[axis]);
                max[axis] = max[axis].max(position[axis]);
            }
        }

        let mut accessors = vec![json!({
            "bufferView": 0, "componentType": 5126, "count": self.positions.len(),
            "type": "VEC3", "min": min, "max": max
        })];
        let mut buffer_views = vec![json!({ "buffer": 0, "byteLength": position_len })];
        let mut animations = Vec::new();

        if self.animated {
            let times = [0.0f32, 1.0];
            let translations = [0.0f32, 0.0, 0.0, 0.0, 2.0, 0.0];
            bin.extend(times.iter().flat_map(|v| v.to_le_bytes()));
            bin.extend(translations.iter().flat_map(|v| v.to_le_bytes()));
            accessors.push(json!({
                "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0]
            }));
            accessors.push(json!({ "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3" }));
            buffer_views.push(json!({ "buffer": 0, "byteOffset": position_len, "byteLength": 8 }));
            buffer_views.push(json!({ "buffer": 0, "byteOffset": position_len + 8, "byteLength": 24 }));
            animations.push(json!({
                "name": "Slide",
                "channels": [ { "sampler": 0, "target": { "node": 0, "path": "translation" } } ],
                "samplers": [ { "input": 1, "output": 2 } ]
            }));
        }

        let mut document = json!({
            "asset": { "version": "2.0", "generator": "fixture" },
            "scenes": [ { "nodes": [0] } ],
            "nodes": [ { "name": "Triangle", "mesh": 0 } ],
            "meshes": [ { "name": "Triangle", "primitives": [ { "attributes": { "POSITION": 0 }, "material": 0 } ] } ],
            "materials": [ {
                "name": "Plain",
                "pbrMetallicRoughness": { "baseColorFactor": [0.8, 0.2, 0.2, 1.0], "metallicFactor": 0.0 }
            } ],
            "accessors": accessors,
            "bufferViews": buffer_views,
            "buffers": [ { "byteLength": bin.len() } ]
        });
        if self.default_scene {
            document["scene"] = json!(0);
        }
        if !animations.is_empty() {
            document["animations"] = Value::Array(animations);
        }
        (document, bin)
    }

    /// Writes `<name>.gltf` and `<name> data.bin` into `dir`.
    pub fn write_gltf(&self, dir: &Path, name: &str) -> PathBuf {
        let (mut document, bin) = self.build();
        document["buffers"][0]["uri"] = json!(format!("{}%20data.bin", name));
        std::fs::write(dir.join(format!("{} data.bin", name)), bin).unwrap();
        let path = dir.join(format!("{}.gltf", name));
        std::fs::write(&path, serde_json::to_vec_pretty(&document).unwrap()).unwrap();
        path
    }

    /// Writes `<name>.glb` into `dir`.
    pub fn write_glb(&self, dir: &Path, name: &str) -> PathBuf {
        let (document, bin) = self.build();
        let path = dir.join(format!("{}.glb", name));
        std::fs::write(&path, glb(&document, &bin)).unwrap();
        path
    }
}

fn glb(document: &Value, bin: &[u8]) -> Vec<u8> {
    let mut json = serde_json::to_vec(document).unwrap();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
    out.extend_from_slice(&bin);
    out
}

pub const TRIANGLE: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

pub const TRIANGLE_REORDERED: [[f32; 3]; 3] = [[0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
