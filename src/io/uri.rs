//! Resolution of URIs found in glTF buffers and images.

use std::path::{Path, PathBuf};

use base64::Engine;

use crate::core::shared::absolute_path;

#[remain::sorted]
#[derive(Debug, Clone, thiserror::Error)]
pub enum Err {
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),
    #[error("Invalid URI '{0}': not valid UTF-8 after percent-decoding")]
    InvalidUri(String),
}

pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Decodes the payload of a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, Err> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Err::InvalidDataUri("missing 'data:' scheme".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Err::InvalidDataUri("missing ',' separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(Err::InvalidDataUri(format!(
            "only base64 payloads are supported, got '{}'",
            header
        )));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Err::InvalidDataUri(e.to_string()))
}

/// Resolves a relative (percent-encoded) URI against the document directory.
/// The result is absolute so that it can be reported as is.
pub fn resolve_path(base_dir: Option<&Path>, uri: &str) -> Result<PathBuf, Err> {
    let decoded = urlencoding::decode(uri).map_err(|_| Err::InvalidUri(uri.to_string()))?;
    let relative = Path::new(decoded.as_ref());
    let joined = match base_dir {
        Some(base) => base.join(relative),
        None => relative.to_path_buf(),
    };
    Ok(absolute_path(&joined))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_uri() {
        // "AAECAw==" is [0, 1, 2, 3]
        let bytes = decode_data_uri("data:application/octet-stream;base64,AAECAw==").unwrap();
        assert_eq!(bytes, vec![0, 1, 2, 3]);
        assert!(is_data_uri("data:application/gltf-buffer;base64,"));
        assert!(!is_data_uri("buffer.bin"));
    }

    #[test]
    fn test_decode_data_uri_errors() {
        assert!(decode_data_uri("data:text/plain,hello").is_err());
        assert!(decode_data_uri("data:application/octet-stream;base64").is_err());
        assert!(decode_data_uri("data:application/octet-stream;base64,@@@").is_err());
    }

    #[test]
    fn test_resolve_path_percent_decoding() {
        let base = Path::new("/assets/scene");
        let path = resolve_path(Some(base), "my%20buffer.bin").unwrap();
        assert_eq!(path, PathBuf::from("/assets/scene/my buffer.bin"));
        assert!(resolve_path(None, "relative.bin").unwrap().is_absolute());
    }
}
