//! A [`Validator`] built on the `gltf` crate's schema and index checks,
//! extended with the buffer and resource checks the crate leaves out.

use crate::core::document::{self, Document};
use crate::core::shared::{ComponentType, ElementType};
use crate::io::uri;
use crate::validate::info::collect_info;
use crate::validate::{Err, Issue, Report, ReportInfo, ResourceFetcher, Severity, Validator};

/// Version reported in [`Report::validator_version`].
const VALIDATOR_VERSION: &str = concat!("gltf-verify ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, Default)]
pub struct GltfValidator;

impl GltfValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for GltfValidator {
    async fn validate<F: ResourceFetcher>(&self, asset: &[u8], fetcher: &F) -> Result<Report, Err> {
        let is_glb = asset.starts_with(document::GLB_MAGIC);
        let document = match Document::from_slice(asset, None) {
            Ok(document) => document,
            Err(document::Err::InvalidDocument(message)) => {
                let mut report = Report::new(ReportInfo::default());
                report.push(Issue::error("TYPE_MISMATCH", "/", message));
                return Ok(finish(report, is_glb));
            }
            Err(e) => return Err(Err::FormatUnrecognized(e.to_string())),
        };

        let mut report = Report::new(collect_info(&document));
        check_schema(&document, &mut report);
        check_node_hierarchy(&document, &mut report);
        let buffer_lengths = check_buffers(&document, fetcher, &mut report).await;
        check_images(&document, fetcher, &mut report).await;
        check_buffer_views(&document, &buffer_lengths, &mut report);
        check_accessors(&document, &mut report);
        check_unused(&document, &mut report);
        Ok(finish(report, is_glb))
    }
}

fn finish(mut report: Report, is_glb: bool) -> Report {
    report.mime_type = Some(if is_glb { "model/gltf-binary" } else { "model/gltf+json" }.to_string());
    report.validator_version = Some(VALIDATOR_VERSION.to_string());
    report
}

/// Turns a `gltf` crate path such as `meshes[0].primitives[1].attributes["POSITION"]`
/// into a JSON pointer like `/meshes/0/primitives/1/attributes/POSITION`.
/// Quoted keys are kept whole and escaped as RFC 6901 reference tokens.
fn json_pointer(path: &str) -> String {
    let mut pointer = String::with_capacity(path.len() + 1);
    let mut rest = path;
    while !rest.is_empty() {
        let (segment, next) = if let Some(quoted) = rest.strip_prefix("[\"") {
            let end = quoted.find("\"]").unwrap_or(quoted.len());
            (&quoted[..end], quoted.get(end + 2..).unwrap_or_default())
        } else {
            let trimmed = rest.trim_start_matches(|c: char| c == '.' || c == '[');
            let end = trimmed.find(|c: char| c == '.' || c == '[').unwrap_or(trimmed.len());
            (trimmed[..end].trim_end_matches(']'), &trimmed[end..])
        };
        rest = next;
        if segment.is_empty() {
            continue;
        }
        pointer.push('/');
        pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    if pointer.is_empty() {
        pointer.push('/');
    }
    pointer
}

fn check_schema(document: &Document, report: &mut Report) {
    let root: gltf::json::Root = match serde_json::from_value(document.json.clone()) {
        Ok(root) => root,
        Err(e) => {
            report.push(Issue::error("TYPE_MISMATCH", "/", e.to_string()));
            return;
        }
    };
    match gltf::Document::from_json(root) {
        Ok(_) => {}
        Err(gltf::Error::Validation(errors)) => {
            use gltf::json::validation::Error as E;
            for (path, error) in errors {
                let (severity, code) = match &error {
                    E::IndexOutOfBounds => (Severity::Error, "UNRESOLVED_REFERENCE"),
                    E::Missing => (Severity::Error, "UNDEFINED_PROPERTY"),
                    E::Unsupported => (Severity::Warning, "UNSUPPORTED_EXTENSION"),
                    _ => (Severity::Error, "INVALID_VALUE"),
                };
                report.push(Issue::new(severity, code, json_pointer(path.as_str()), error.to_string()));
            }
        }
        Err(e) => report.push(Issue::error("INVALID_GLTF", "/", e.to_string())),
    }
}

/// Reports nodes claimed by more than one parent and cycles in the
/// parent chain. The first parent listing a node keeps it.
fn check_node_hierarchy(document: &Document, report: &mut Report) {
    let mut parents: Vec<Option<usize>> = vec![None; document.nodes.len()];
    for (index, node) in document.nodes.iter().enumerate() {
        for (slot, &child) in node.children.iter().enumerate() {
            let Some(parent) = parents.get_mut(child) else {
                continue;
            };
            match parent {
                Some(previous) => report.push(Issue::error(
                    "NODE_PARENT_OVERRIDE",
                    format!("/nodes/{}/children/{}", index, slot),
                    format!("Value overrides parent of node {} (already a child of node {}).", child, previous),
                )),
                None => *parent = Some(index),
            }
        }
    }

    const UNSEEN: u8 = 0;
    const ON_CHAIN: u8 = 1;
    const SETTLED: u8 = 2;
    let mut state = vec![UNSEEN; parents.len()];
    for start in 0..parents.len() {
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current {
            match state[index] {
                SETTLED => break,
                ON_CHAIN => {
                    report.push(Issue::error(
                        "NODE_LOOP",
                        format!("/nodes/{}", index),
                        "Node is part of a node loop.",
                    ));
                    break;
                }
                _ => {
                    state[index] = ON_CHAIN;
                    chain.push(index);
                    current = parents[index];
                }
            }
        }
        for index in chain {
            state[index] = SETTLED;
        }
    }
}

/// Checks that every buffer's payload is available and long enough.
/// Returns the actual payload length per buffer, when it could be loaded.
async fn check_buffers<F: ResourceFetcher>(
    document: &Document,
    fetcher: &F,
    report: &mut Report,
) -> Vec<Option<usize>> {
    let mut lengths = Vec::with_capacity(document.buffers.len());
    for (index, buffer) in document.buffers.iter().enumerate() {
        let pointer = format!("/buffers/{}", index);
        let length = match buffer.uri.as_deref() {
            None => match (&document.blob, index) {
                (Some(blob), 0) => Some(blob.len()),
                _ => {
                    report.push(Issue::error(
                        "BUFFER_MISSING_GLB_DATA",
                        &pointer,
                        "Buffer has no URI and no GLB binary chunk.",
                    ));
                    None
                }
            },
            Some(uri) => load_resource(uri, fetcher, &pointer, report).await.map(|bytes| bytes.len()),
        };
        if let Some(length) = length {
            if length < buffer.byte_length {
                report.push(Issue::error(
                    "BUFFER_BYTE_LENGTH_MISMATCH",
                    &pointer,
                    format!(
                        "Actual data length {} is less than the declared buffer byteLength {}.",
                        length, buffer.byte_length
                    ),
                ));
            }
        }
        lengths.push(length);
    }
    lengths
}

async fn check_images<F: ResourceFetcher>(document: &Document, fetcher: &F, report: &mut Report) {
    for (index, image) in document.images.iter().enumerate() {
        if let Some(uri) = image.uri.as_deref() {
            let pointer = format!("/images/{}", index);
            load_resource(uri, fetcher, &pointer, report).await;
        }
    }
}

async fn load_resource<F: ResourceFetcher>(
    uri: &str,
    fetcher: &F,
    pointer: &str,
    report: &mut Report,
) -> Option<Vec<u8>> {
    let loaded = if uri::is_data_uri(uri) {
        uri::decode_data_uri(uri).map_err(|e| ("INVALID_URI", e.to_string()))
    } else {
        fetcher.fetch(uri).await.map_err(|e| ("IO_ERROR", e.to_string()))
    };
    match loaded {
        Ok(bytes) => Some(bytes),
        Err((code, message)) => {
            report.push(Issue::error(code, pointer, message));
            None
        }
    }
}

fn check_buffer_views(document: &Document, buffer_lengths: &[Option<usize>], report: &mut Report) {
    for (index, view) in document.buffer_views.iter().enumerate() {
        let Ok(buffer) = document.buffer(view.buffer) else {
            continue;
        };
        let end = view.byte_offset.saturating_add(view.byte_length);
        let available = buffer_lengths
            .get(view.buffer)
            .copied()
            .flatten()
            .map_or(buffer.byte_length, |actual| actual.min(buffer.byte_length));
        if end > available {
            report.push(Issue::error(
                "BUFFER_VIEW_TOO_LONG",
                format!("/bufferViews/{}", index),
                format!(
                    "BufferView does not fit buffer ({}) byteLength ({}).",
                    view.buffer, available
                ),
            ));
        }
    }
}

fn check_accessors(document: &Document, report: &mut Report) {
    for (index, accessor) in document.accessors.iter().enumerate() {
        let Some(view) = accessor.buffer_view.and_then(|view| document.buffer_view(view).ok()) else {
            continue;
        };
        let (Some(component), Some(element)) = (
            ComponentType::from_code(accessor.component_type),
            ElementType::from_name(&accessor.element_type),
        ) else {
            continue;
        };
        if accessor.count == 0 {
            continue;
        }
        let element_size = component.size() * element.arity();
        let stride = view.byte_stride.unwrap_or(element_size);
        let end = (accessor.count - 1)
            .checked_mul(stride)
            .and_then(|span| span.checked_add(accessor.byte_offset))
            .and_then(|span| span.checked_add(element_size));
        if end.map_or(true, |end| end > view.byte_length) {
            report.push(Issue::error(
                "ACCESSOR_TOO_LONG",
                format!("/accessors/{}", index),
                format!(
                    "Accessor (offset: {}, length: {}) does not fit referenced bufferView [{}] length {}.",
                    accessor.byte_offset,
                    accessor.count.saturating_mul(element_size),
                    accessor.buffer_view.unwrap_or_default(),
                    view.byte_length
                ),
            ));
        }
    }
}

fn check_unused(document: &Document, report: &mut Report) {
    let mut used_meshes = vec![false; document.meshes.len()];
    for mesh in document.nodes.iter().filter_map(|node| node.mesh) {
        if let Some(used) = used_meshes.get_mut(mesh) {
            *used = true;
        }
    }
    let mut used_materials = vec![false; document.materials.len()];
    let materials = document
        .meshes
        .iter()
        .flat_map(|mesh| &mesh.primitives)
        .filter_map(|primitive| primitive.material);
    for material in materials {
        if let Some(used) = used_materials.get_mut(material) {
            *used = true;
        }
    }

    let unused = |kind: &str, flags: &[bool]| -> Vec<Issue> {
        flags
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(index, _)| {
                Issue::new(
                    Severity::Information,
                    "UNUSED_OBJECT",
                    format!("/{}/{}", kind, index),
                    "This object may be unused.",
                )
            })
            .collect()
    };
    for issue in unused("meshes", &used_meshes)
        .into_iter()
        .chain(unused("materials", &used_materials))
    {
        report.push(issue);
    }
}
