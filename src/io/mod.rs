/// Decoding of accessors into typed float tuples.
pub mod accessor;

/// Pass-scoped loading and caching of buffer payloads.
pub mod buffer;

/// Resolution of data URIs and relative file URIs.
pub mod uri;
