//! Order-independent fingerprints of 3-component float attributes.
//!
//! Every vector is rounded to [`FINGERPRINT_PRECISION`] decimal digits and
//! counted, so two attributes holding the same multiset of vectors in any
//! order produce equal fingerprints. The rounding is lossy and fixed;
//! changing it changes which regressions can be detected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::io::accessor::DecodedAttribute;

/// Decimal digits kept per component.
pub const FINGERPRINT_PRECISION: usize = 3;

#[remain::sorted]
#[derive(Debug, Clone, thiserror::Error)]
pub enum Err {
    #[error("Attribute data of {0} components cannot be grouped into 3-component vectors")]
    MalformedAttributeData(usize),
}

/// Maps a canonical vector key such as `"1.000,0.000,0.000"` to the number
/// of times it occurs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(BTreeMap<String, usize>);

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec3(vectors: &[[f32; 3]]) -> Self {
        let mut fingerprint = Self::new();
        for &vector in vectors {
            fingerprint.insert(vector);
        }
        fingerprint
    }

    /// Groups a flat component stream into vectors before fingerprinting.
    pub fn from_flat(components: &[f32]) -> Result<Self, Err> {
        if components.len() % 3 != 0 {
            return Err(Err::MalformedAttributeData(components.len()));
        }
        let mut fingerprint = Self::new();
        for chunk in components.chunks_exact(3) {
            fingerprint.insert([chunk[0], chunk[1], chunk[2]]);
        }
        Ok(fingerprint)
    }

    pub fn from_attribute(attribute: &DecodedAttribute) -> Result<Self, Err> {
        match attribute.as_vec3() {
            Some(vectors) => Ok(Self::from_vec3(vectors)),
            None => Self::from_flat(&attribute.to_flat()),
        }
    }

    pub fn insert(&mut self, vector: [f32; 3]) {
        *self.0.entry(vector_key(vector)).or_insert(0) += 1;
    }

    /// Adds the occurrences of `other` to this fingerprint.
    pub fn merge(&mut self, other: &Fingerprint) {
        for (key, count) in &other.0 {
            *self.0.entry(key.clone()).or_insert(0) += count;
        }
    }

    /// Occurrences of `key`, zero when absent.
    pub fn count(&self, key: &str) -> usize {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of vectors fingerprinted.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(key, count)| (key.as_str(), *count))
    }
}

/// Canonical key of a vector: components rounded and comma-joined, with
/// negative zero folded into positive zero.
pub fn vector_key(vector: [f32; 3]) -> String {
    let [x, y, z] = vector.map(component_key);
    format!("{},{},{}", x, y, z)
}

fn component_key(value: f32) -> String {
    let formatted = format!("{:.*}", FINGERPRINT_PRECISION, value);
    match formatted.strip_prefix('-') {
        Some(magnitude) if magnitude.bytes().all(|b| b == b'0' || b == b'.') => magnitude.to_string(),
        _ => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reordering_gives_same_fingerprint() {
        let a = Fingerprint::from_vec3(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        let b = Fingerprint::from_vec3(&[[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        assert_eq!(a, b);
        assert_eq!(a.count("1.000,0.000,0.000"), 2);
        assert_eq!(a.count("0.000,1.000,0.000"), 1);
        assert_eq!(a.len(), 2);
        assert_eq!(a.total(), 3);

        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "1.000,0.000,0.000": 2, "0.000,1.000,0.000": 1 })
        );
    }

    #[test]
    fn test_every_permutation_matches() {
        let vectors: [[f32; 3]; 4] = [
            [0.25, -0.5, 1.0],
            [3.0, 2.0, 1.0],
            [0.25, -0.5, 1.0],
            [-7.125, 0.0, 4.5],
        ];
        let expected = Fingerprint::from_vec3(&vectors);
        let mut permuted = vectors;
        for rotation in 0..vectors.len() {
            permuted.rotate_left(1);
            assert_eq!(Fingerprint::from_vec3(&permuted), expected, "rotation {}", rotation);
            permuted.reverse();
            assert_eq!(Fingerprint::from_vec3(&permuted), expected, "reversed rotation {}", rotation);
        }
    }

    #[test]
    fn test_negative_zero_is_canonicalized() {
        assert_eq!(vector_key([-0.0, 1.0, 0.0]), vector_key([0.0, 1.0, 0.0]));
        assert_eq!(vector_key([-0.0, 1.0, 0.0]), "0.000,1.000,0.000");
        // Tiny negatives round to zero as well.
        assert_eq!(vector_key([-0.0001, 0.0, -0.0004]), "0.000,0.000,0.000");
        assert_eq!(vector_key([-0.5, 0.0, 0.0]), "-0.500,0.000,0.000");
    }

    #[test]
    fn test_rounding_absorbs_roundoff() {
        let a = Fingerprint::from_vec3(&[[0.70710677, 0.70710677, 0.0]]);
        let b = Fingerprint::from_vec3(&[[0.7071068, 0.7071067, 1e-7]]);
        assert_eq!(a, b);
        let c = Fingerprint::from_vec3(&[[0.709, 0.7071067, 0.0]]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_flat_stream_must_group_into_vectors() {
        let fingerprint = Fingerprint::from_flat(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        assert_eq!(fingerprint.total(), 2);
        assert!(matches!(
            Fingerprint::from_flat(&[1.0, 0.0, 0.0, 1.0]),
            Err(Err::MalformedAttributeData(4))
        ));
        assert!(matches!(
            Fingerprint::from_attribute(&DecodedAttribute::Scalar(vec![1.0, 2.0])),
            Err(Err::MalformedAttributeData(2))
        ));
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut a = Fingerprint::from_vec3(&[[1.0, 0.0, 0.0]]);
        a.merge(&Fingerprint::from_vec3(&[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]));
        assert_eq!(a.count("1.000,0.000,0.000"), 2);
        assert_eq!(a.count("0.000,0.000,1.000"), 1);
        assert_eq!(a.iter().count(), 2);
    }
}
