//! Order-independent structural digest of an asset: named meshes with
//! their attribute fingerprints, materials and animations.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::compare::Err;
use crate::core::document::{Document, Material, TextureInfo};
use crate::core::shared::{ComponentType, ElementType};
use crate::fingerprint::Fingerprint;
use crate::io::accessor::decode_accessor;
use crate::io::buffer::BufferCache;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSummary {
    pub meshes: BTreeMap<String, MeshSummary>,
    pub materials: BTreeMap<String, MaterialSummary>,
    pub animations: BTreeMap<String, AnimationSummary>,
    pub extensions_used: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshSummary {
    pub primitive_count: usize,
    pub modes: Vec<u32>,
    pub attributes: BTreeMap<String, AttributeSummary>,
}

/// Dense float `VEC3` attributes are fingerprinted; anything else is only
/// counted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeSummary {
    Fingerprint(Fingerprint),
    Count(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSummary {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: String,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub textures: BTreeSet<&'static str>,
    pub extensions: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSummary {
    pub channel_count: usize,
    pub target_paths: Vec<String>,
    pub interpolations: Vec<String>,
}

/// Key of each entity: its name, or `#index` when it has none or shares
/// it with another entity of the same kind.
fn entity_keys<'a>(names: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let names: Vec<Option<&str>> = names.collect();
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for name in names.iter().flatten() {
        *occurrences.entry(*name).or_insert(0) += 1;
    }
    names
        .iter()
        .enumerate()
        .map(|(index, name)| match name {
            Some(name) if occurrences.get(name) == Some(&1) => name.to_string(),
            _ => format!("#{}", index),
        })
        .collect()
}

/// Dense float `VEC3` accessors. Sparse ones are only counted.
fn is_fingerprintable(document: &Document, accessor: usize) -> Result<bool, Err> {
    let accessor = document.accessor(accessor)?;
    Ok(accessor.sparse.is_none()
        && ComponentType::from_code(accessor.component_type) == Some(ComponentType::F32)
        && ElementType::from_name(&accessor.element_type) == Some(ElementType::Vec3))
}

fn summarize_material(material: &Material) -> MaterialSummary {
    let pbr = &material.pbr_metallic_roughness;
    let slots: [(&'static str, &Option<TextureInfo>); 5] = [
        ("baseColorTexture", &pbr.base_color_texture),
        ("metallicRoughnessTexture", &pbr.metallic_roughness_texture),
        ("normalTexture", &material.normal_texture),
        ("occlusionTexture", &material.occlusion_texture),
        ("emissiveTexture", &material.emissive_texture),
    ];
    MaterialSummary {
        base_color_factor: pbr.base_color_factor,
        metallic_factor: pbr.metallic_factor,
        roughness_factor: pbr.roughness_factor,
        emissive_factor: material.emissive_factor,
        alpha_mode: material.alpha_mode.clone(),
        alpha_cutoff: material.alpha_cutoff,
        double_sided: material.double_sided,
        textures: slots
            .into_iter()
            .filter(|(_, texture)| texture.is_some())
            .map(|(slot, _)| slot)
            .collect(),
        extensions: material.extensions.keys().cloned().collect(),
    }
}

impl StructureSummary {
    /// Digests `document`, decoding float `VEC3` attributes through `buffers`.
    pub fn from_document(document: &Document, buffers: &mut BufferCache) -> Result<Self, Err> {
        let mut meshes = BTreeMap::new();
        let keys = entity_keys(document.meshes.iter().map(|mesh| mesh.name.as_deref()));
        for (key, mesh) in keys.into_iter().zip(&document.meshes) {
            let mut modes: Vec<u32> = mesh.primitives.iter().map(|primitive| primitive.mode).collect();
            modes.sort_unstable();

            let mut attributes: BTreeMap<String, AttributeSummary> = BTreeMap::new();
            for primitive in &mesh.primitives {
                for (semantic, &accessor) in &primitive.attributes {
                    let summary = if is_fingerprintable(document, accessor)? {
                        let decoded = decode_accessor(document, buffers, accessor)?;
                        AttributeSummary::Fingerprint(Fingerprint::from_attribute(&decoded)?)
                    } else {
                        AttributeSummary::Count(document.accessor(accessor)?.count)
                    };
                    let merged = match (attributes.remove(semantic), summary) {
                        (None, summary) => summary,
                        (Some(AttributeSummary::Fingerprint(mut merged)), AttributeSummary::Fingerprint(next)) => {
                            merged.merge(&next);
                            AttributeSummary::Fingerprint(merged)
                        }
                        (Some(AttributeSummary::Count(merged)), AttributeSummary::Count(next)) => {
                            AttributeSummary::Count(merged.saturating_add(next))
                        }
                        // Mixed encodings of one semantic: the element total still compares.
                        (Some(previous), next) => {
                            AttributeSummary::Count(element_total(&previous).saturating_add(element_total(&next)))
                        }
                    };
                    attributes.insert(semantic.clone(), merged);
                }
            }

            meshes.insert(
                key,
                MeshSummary {
                    primitive_count: mesh.primitives.len(),
                    modes,
                    attributes,
                },
            );
        }

        let keys = entity_keys(document.materials.iter().map(|material| material.name.as_deref()));
        let materials = keys
            .into_iter()
            .zip(&document.materials)
            .map(|(key, material)| (key, summarize_material(material)))
            .collect();

        let keys = entity_keys(document.animations.iter().map(|animation| animation.name.as_deref()));
        let animations = keys
            .into_iter()
            .zip(&document.animations)
            .map(|(key, animation)| {
                let mut target_paths: Vec<String> = animation
                    .channels
                    .iter()
                    .map(|channel| channel.target.path.clone())
                    .collect();
                target_paths.sort();
                let mut interpolations: Vec<String> = animation
                    .samplers
                    .iter()
                    .map(|sampler| sampler.interpolation.clone())
                    .collect();
                interpolations.sort();
                let summary = AnimationSummary {
                    channel_count: animation.channels.len(),
                    target_paths,
                    interpolations,
                };
                (key, summary)
            })
            .collect();

        Ok(Self {
            meshes,
            materials,
            animations,
            extensions_used: document.extensions_used.iter().cloned().collect(),
        })
    }
}

fn element_total(summary: &AttributeSummary) -> usize {
    match summary {
        AttributeSummary::Fingerprint(fingerprint) => fingerprint.total(),
        AttributeSummary::Count(count) => *count,
    }
}
