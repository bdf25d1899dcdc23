// lib.rs

/// Contains the glTF document model and the shared definitions.
pub mod core;

/// Contains buffer resolution and accessor decoding.
pub mod io;

/// Order-independent fingerprints of vector attributes.
pub mod fingerprint;

/// Conformance validation and the validation report.
pub mod validate;

/// Equivalence checking of assets.
pub mod compare;

/// Settings of a verification run.
pub mod config;

/// Produce-then-compare scenarios.
pub mod scenario;

/// Contains the most commonly used traits, types, and objects.
pub mod prelude {
    pub use crate::compare::checks::{
        expect_approx,
        expect_approx_slice,
        expect_count,
        expect_eq,
        expect_extension,
    };
    pub use crate::compare::{self, compare_assets, Checker, StructureSummary, VerifiedAsset};
    pub use crate::config::Config;
    pub use crate::core::document::Document;
    pub use crate::core::shared::ConfigType;
    pub use crate::fingerprint::Fingerprint;
    pub use crate::io::accessor::{decode_accessor, DecodedAttribute};
    pub use crate::io::buffer::BufferCache;
    pub use crate::scenario::{run_scenario, AssetProducer, CommandProducer, Scenario};
    pub use crate::validate::{self, validate_file, GltfValidator, Report, ResourceFetcher, ValidationSummary, Validator};
}
