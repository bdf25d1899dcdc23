/// Typed glTF document model and loading of glTF/GLB bytes.
pub mod document;

/// Shared definitions: component and element types, configuration trait.
pub mod shared;
