use std::collections::HashSet;

use crate::core::document::{Document, Primitive};
use crate::validate::ReportInfo;

/// Summarizes `document` the way the glTF-Validator info block does.
pub fn collect_info(document: &Document) -> ReportInfo {
    let primitives = || document.meshes.iter().flat_map(|mesh| mesh.primitives.iter());

    let mut info = ReportInfo {
        version: document.asset.version.clone(),
        generator: document.asset.generator.clone(),
        extensions_used: document.extensions_used.clone(),
        extensions_required: document.extensions_required.clone(),
        animation_count: document.animations.len(),
        material_count: document.materials.len(),
        has_morph_targets: primitives().any(|primitive| !primitive.targets.is_empty()),
        has_skins: !document.skins.is_empty(),
        has_textures: !document.textures.is_empty(),
        has_default_scene: document.scene.is_some(),
        ..ReportInfo::default()
    };

    for primitive in primitives() {
        let uvs = count_sets(primitive, "TEXCOORD_");
        let influences = count_sets(primitive, "JOINTS_") * 4;
        info.max_uvs = info.max_uvs.max(uvs);
        info.max_influences = info.max_influences.max(influences);
        info.max_attributes = info.max_attributes.max(primitive.attributes.len());
    }

    for mesh_index in drawn_meshes(document) {
        let Ok(mesh) = document.mesh(mesh_index) else {
            continue;
        };
        for primitive in &mesh.primitives {
            info.draw_call_count += 1;
            info.total_vertex_count = info.total_vertex_count.saturating_add(vertex_count(document, primitive));
            info.total_triangle_count = info.total_triangle_count.saturating_add(triangle_count(document, primitive));
        }
    }
    info
}

fn count_sets(primitive: &Primitive, prefix: &str) -> usize {
    primitive
        .attributes
        .keys()
        .filter(|semantic| semantic.starts_with(prefix))
        .count()
}

fn vertex_count(document: &Document, primitive: &Primitive) -> usize {
    primitive
        .attributes
        .get("POSITION")
        .and_then(|&index| document.accessor(index).ok())
        .map_or(0, |accessor| accessor.count)
}

fn triangle_count(document: &Document, primitive: &Primitive) -> usize {
    let elements = match primitive.indices {
        Some(index) => document.accessor(index).map_or(0, |accessor| accessor.count),
        None => vertex_count(document, primitive),
    };
    match primitive.mode {
        4 => elements / 3,
        5 | 6 => elements.saturating_sub(2),
        _ => 0,
    }
}

/// Mesh indices instanced by nodes, once per instance. Nodes are walked
/// from every scene, or from every root node when there are no scenes.
/// Within one walk a node is expanded at most once, so shared children
/// and loops do not multiply the work.
fn drawn_meshes(document: &Document) -> Vec<usize> {
    let walks: Vec<Vec<usize>> = if document.scenes.is_empty() {
        let children: HashSet<usize> = document
            .nodes
            .iter()
            .flat_map(|node| node.children.iter().copied())
            .collect();
        vec![(0..document.nodes.len())
            .filter(|index| !children.contains(index))
            .collect()]
    } else {
        document.scenes.iter().map(|scene| scene.nodes.clone()).collect()
    };

    let mut meshes = Vec::new();
    for mut stack in walks {
        let mut visited = vec![false; document.nodes.len()];
        while let Some(index) = stack.pop() {
            match visited.get_mut(index) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            let Ok(node) = document.node(index) else {
                continue;
            };
            if let Some(mesh) = node.mesh {
                meshes.push(mesh);
            }
            stack.extend(node.children.iter().copied());
        }
    }
    meshes
}
