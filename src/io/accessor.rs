//! Decoding of float accessors into typed tuples.
//!
//! Follows the accessor -> bufferView -> buffer chain. Only 32-bit float
//! components with `SCALAR` or `VEC3` elements are supported; every byte
//! range is checked against the bufferView and the resolved buffer before
//! it is read.

use crate::core::document::{self, Document};
use crate::core::shared::{ComponentType, ElementType};
use crate::io::buffer::{self, BufferCache};

#[remain::sorted]
#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("Accessor {accessor} reads up to byte {end} but its {region} holds only {limit} bytes")]
    AccessorOutOfBounds {
        accessor: usize,
        end: usize,
        limit: usize,
        region: &'static str,
    },
    #[error("Buffer Error: {0}")]
    Buffer(#[from] buffer::Err),
    #[error("Document Error: {0}")]
    Document(#[from] document::Err),
    #[error("Accessor {0} is sparse, sparse accessors are not supported")]
    SparseAccessor(usize),
    #[error("Unsupported component type {0}, only 5126 (FLOAT) can be decoded")]
    UnsupportedComponentType(u32),
    #[error("Unsupported element type '{0}', only SCALAR and VEC3 can be decoded")]
    UnsupportedElementType(String),
}

/// The logical content of an accessor: `count` tuples of the declared arity.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedAttribute {
    Scalar(Vec<f32>),
    Vec3(Vec<[f32; 3]>),
}

impl DecodedAttribute {
    /// Number of tuples.
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(values) => values.len(),
            Self::Vec3(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Scalar(_) => ElementType::Scalar,
            Self::Vec3(_) => ElementType::Vec3,
        }
    }

    pub fn as_vec3(&self) -> Option<&[[f32; 3]]> {
        match self {
            Self::Vec3(values) => Some(values),
            Self::Scalar(_) => None,
        }
    }

    /// All components in tuple order.
    pub fn to_flat(&self) -> Vec<f32> {
        match self {
            Self::Scalar(values) => values.clone(),
            Self::Vec3(values) => values.iter().flatten().copied().collect(),
        }
    }
}

/// Checks that `accessor` is something this decoder can read and returns
/// the component width and the element type.
fn supported_layout(component_type: u32, element_type: &str) -> Result<(usize, ElementType), Err> {
    let width = match ComponentType::from_code(component_type) {
        Some(ty @ ComponentType::F32) => ty.size(),
        _ => return Err(Err::UnsupportedComponentType(component_type)),
    };
    let element = match ElementType::from_name(element_type) {
        Some(ty @ (ElementType::Scalar | ElementType::Vec3)) => ty,
        _ => return Err(Err::UnsupportedElementType(element_type.to_string())),
    };
    Ok((width, element))
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

/// Decodes accessor `index` of `document`, loading buffers through the
/// pass-scoped `buffers` cache.
pub fn decode_accessor(
    document: &Document,
    buffers: &mut BufferCache,
    index: usize,
) -> Result<DecodedAttribute, Err> {
    let accessor = document.accessor(index)?;
    if accessor.sparse.is_some() {
        return Err(Err::SparseAccessor(index));
    }
    let (width, element) = supported_layout(accessor.component_type, &accessor.element_type)?;
    let arity = element.arity();
    let count = accessor.count;

    let Some(view_index) = accessor.buffer_view else {
        // Accessors without a bufferView are zero-initialized.
        return Ok(match element {
            ElementType::Vec3 => DecodedAttribute::Vec3(vec![[0.0; 3]; count]),
            _ => DecodedAttribute::Scalar(vec![0.0; count]),
        });
    };
    let view = document.buffer_view(view_index)?;

    let element_size = width * arity;
    let stride = view.byte_stride.unwrap_or(element_size);

    if count > 0 {
        let end = (count - 1)
            .checked_mul(stride)
            .and_then(|span| span.checked_add(accessor.byte_offset))
            .and_then(|span| span.checked_add(element_size))
            .unwrap_or(usize::MAX);
        if end > view.byte_length {
            return Err(Err::AccessorOutOfBounds {
                accessor: index,
                end,
                limit: view.byte_length,
                region: "bufferView",
            });
        }
    }

    let bytes = buffers.resolve(document, view.buffer)?;
    let view_end = view.byte_offset.saturating_add(view.byte_length);
    if view_end > bytes.len() {
        return Err(Err::AccessorOutOfBounds {
            accessor: index,
            end: view_end,
            limit: bytes.len(),
            region: "buffer",
        });
    }

    // In bounds whenever there is an element to read.
    let base = view.byte_offset.saturating_add(accessor.byte_offset);
    tracing::trace!(accessor = index, count, stride, base, "decoding accessor");

    let decoded = match element {
        ElementType::Vec3 => DecodedAttribute::Vec3(
            (0..count)
                .map(|i| {
                    let offset = base + i * stride;
                    [
                        read_f32(bytes, offset),
                        read_f32(bytes, offset + width),
                        read_f32(bytes, offset + 2 * width),
                    ]
                })
                .collect(),
        ),
        _ => DecodedAttribute::Scalar(
            (0..count).map(|i| read_f32(bytes, base + i * stride)).collect(),
        ),
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn floats_to_data_uri(values: &[f32]) -> String {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    fn document(buffer: &[f32], views: &str, accessors: &str) -> Document {
        let json = format!(
            r#"{{ "asset": {{"version": "2.0"}},
                 "buffers": [ {{ "uri": "{}", "byteLength": {} }} ],
                 "bufferViews": {},
                 "accessors": {} }}"#,
            floats_to_data_uri(buffer),
            buffer.len() * 4,
            views,
            accessors
        );
        Document::from_slice(json.as_bytes(), None).unwrap()
    }

    #[test]
    fn test_strided_vec3_decode() {
        // Two interleaved (position, normal) records of 24 bytes each.
        let data = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let doc = document(
            &data,
            r#"[ { "buffer": 0, "byteLength": 48, "byteStride": 24 } ]"#,
            r#"[ { "bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC3" },
                 { "bufferView": 0, "byteOffset": 12, "componentType": 5126, "count": 2, "type": "VEC3" } ]"#,
        );
        let mut buffers = BufferCache::new();
        let positions = decode_accessor(&doc, &mut buffers, 0).unwrap();
        let normals = decode_accessor(&doc, &mut buffers, 1).unwrap();
        assert_eq!(positions, DecodedAttribute::Vec3(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 0.0]]));
        assert_eq!(normals, DecodedAttribute::Vec3(vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]));
        assert_eq!(buffers.len(), 1);
    }

    #[test]
    fn test_tightly_packed_scalar_with_offsets() {
        let data = [9.0, 0.5, 1.5, 2.5];
        let doc = document(
            &data,
            r#"[ { "buffer": 0, "byteOffset": 4, "byteLength": 12 } ]"#,
            r#"[ { "bufferView": 0, "byteOffset": 4, "componentType": 5126, "count": 2, "type": "SCALAR" } ]"#,
        );
        let decoded = decode_accessor(&doc, &mut BufferCache::new(), 0).unwrap();
        assert_eq!(decoded, DecodedAttribute::Scalar(vec![1.5, 2.5]));
        assert_eq!(decoded.element_type(), ElementType::Scalar);
        assert!(decoded.as_vec3().is_none());
    }

    #[test]
    fn test_out_of_bounds_accessor_rejected() {
        let data = [0.0; 6];
        let doc = document(
            &data,
            r#"[ { "buffer": 0, "byteLength": 24 } ]"#,
            r#"[ { "bufferView": 0, "byteOffset": 4, "componentType": 5126, "count": 2, "type": "VEC3" } ]"#,
        );
        match decode_accessor(&doc, &mut BufferCache::new(), 0) {
            Err(Err::AccessorOutOfBounds { accessor, end, limit, region }) => {
                assert_eq!(accessor, 0);
                assert_eq!(end, 28);
                assert_eq!(limit, 24);
                assert_eq!(region, "bufferView");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_view_past_buffer_end_rejected() {
        let data = [0.0; 3];
        let doc = document(
            &data,
            r#"[ { "buffer": 0, "byteLength": 24 } ]"#,
            r#"[ { "bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC3" } ]"#,
        );
        assert!(matches!(
            decode_accessor(&doc, &mut BufferCache::new(), 0),
            Err(Err::AccessorOutOfBounds { region: "buffer", limit: 12, .. })
        ));
    }

    #[test]
    fn test_huge_count_does_not_overflow() {
        let data = [0.0; 3];
        let doc = document(
            &data,
            r#"[ { "buffer": 0, "byteLength": 12 } ]"#,
            r#"[ { "bufferView": 0, "componentType": 5126, "count": 18446744073709551615, "type": "VEC3" } ]"#,
        );
        assert!(matches!(
            decode_accessor(&doc, &mut BufferCache::new(), 0),
            Err(Err::AccessorOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_empty_accessor_with_huge_offset() {
        let data = [0.0; 3];
        let doc = document(
            &data,
            r#"[ { "buffer": 0, "byteOffset": 4, "byteLength": 8 } ]"#,
            r#"[ { "bufferView": 0, "byteOffset": 18446744073709551615, "componentType": 5126, "count": 0, "type": "VEC3" } ]"#,
        );
        let decoded = decode_accessor(&doc, &mut BufferCache::new(), 0).unwrap();
        assert!(decoded.to_flat().is_empty());
    }

    #[test]
    fn test_unsupported_types_rejected() {
        let data = [0.0; 4];
        let doc = document(
            &data,
            r#"[ { "buffer": 0, "byteLength": 16 } ]"#,
            r#"[ { "bufferView": 0, "componentType": 5123, "count": 2, "type": "SCALAR" },
                 { "bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC2" } ]"#,
        );
        let mut buffers = BufferCache::new();
        assert!(matches!(
            decode_accessor(&doc, &mut buffers, 0),
            Err(Err::UnsupportedComponentType(5123))
        ));
        match decode_accessor(&doc, &mut buffers, 1) {
            Err(Err::UnsupportedElementType(name)) => assert_eq!(name, "VEC2"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(buffers.is_empty());
    }

    #[test]
    fn test_missing_buffer_view_decodes_zeros() {
        let doc = document(
            &[],
            "[]",
            r#"[ { "componentType": 5126, "count": 2, "type": "VEC3" } ]"#,
        );
        let decoded = decode_accessor(&doc, &mut BufferCache::new(), 0).unwrap();
        assert_eq!(decoded.to_flat(), vec![0.0; 6]);
    }

    #[test]
    fn test_index_out_of_range() {
        let doc = document(&[], "[]", "[]");
        assert!(matches!(
            decode_accessor(&doc, &mut BufferCache::new(), 4),
            Err(Err::Document(document::Err::IndexOutOfRange { kind: "accessor", index: 4, len: 0 }))
        ));
    }
}
