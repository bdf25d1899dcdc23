//! Equivalence checking of glTF assets.
//!
//! A [`Checker`] validates both sides, compares their validation summaries
//! and then their [`StructureSummary`], failing with
//! [`Err::EquivalenceMismatch`] on the first difference.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::core::document::{self, Animation, Document, Material, Mesh};
use crate::core::shared::absolute_path;
use crate::fingerprint::{self, Fingerprint};
use crate::io::accessor::{self, decode_accessor, DecodedAttribute};
use crate::io::buffer::{self, BufferCache};
use crate::validate::{self, Report, ValidationSummary, Validator};

/// Tolerant float comparison.
pub mod approx;

/// Scenario assertions.
pub mod checks;

/// Structural digest of an asset.
pub mod structure;

pub use structure::StructureSummary;

#[remain::sorted]
#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("Accessor Error: {0}")]
    Accessor(#[from] accessor::Err),
    #[error("Buffer Error: {0}")]
    Buffer(#[from] buffer::Err),
    #[error("Document Error: {0}")]
    Document(#[from] document::Err),
    #[error("{what} mismatch\nexpected:\n{expected}\nactual:\n{actual}")]
    EquivalenceMismatch {
        what: String,
        expected: String,
        actual: String,
    },
    #[error("Fingerprint Error: {0}")]
    Fingerprint(#[from] fingerprint::Err),
    #[error("Asset producer failed: {0}")]
    ProducerFailed(String),
    #[error("Scenario timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Validation Error: {0}")]
    Validation(#[from] validate::Err),
}

/// An asset that passed validation, with its parsed document and the
/// buffer cache of this pass.
#[derive(Debug)]
pub struct VerifiedAsset {
    path: PathBuf,
    report: Report,
    document: Document,
    buffers: BufferCache,
}

fn names<'a>(names: impl Iterator<Item = &'a Option<String>>) -> Vec<&'a str> {
    names.filter_map(Option::as_deref).collect()
}

impl VerifiedAsset {
    /// Validates the asset at `path`; invalid assets are rejected.
    pub async fn load<V: Validator>(validator: &V, path: &Path) -> Result<Self, Err> {
        let path = absolute_path(path);
        let bytes = validate::read_asset(&path).await?;
        let report = validate::validate_bytes(validator, &path, &bytes).await?;
        let document = Document::from_slice(&bytes, path.parent())?;
        Ok(Self {
            path,
            report,
            document,
            buffers: BufferCache::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn summary(&self) -> ValidationSummary {
        self.report.summary()
    }

    pub fn decode(&mut self, accessor: usize) -> Result<DecodedAttribute, Err> {
        Ok(decode_accessor(&self.document, &mut self.buffers, accessor)?)
    }

    pub fn fingerprint(&mut self, accessor: usize) -> Result<Fingerprint, Err> {
        let decoded = self.decode(accessor)?;
        Ok(Fingerprint::from_attribute(&decoded)?)
    }

    /// Fingerprint of `semantic` over every primitive of the named mesh.
    pub fn attribute_fingerprint(&mut self, mesh: &str, semantic: &str) -> Result<Fingerprint, Err> {
        let (_, found) = self.document.mesh_by_name(mesh).ok_or_else(|| {
            checks::mismatch(
                &format!("mesh named {}", mesh),
                mesh,
                &names(self.document.meshes.iter().map(|mesh| &mesh.name)),
            )
        })?;
        let accessors: Vec<usize> = found
            .primitives
            .iter()
            .filter_map(|primitive| primitive.attributes.get(semantic).copied())
            .collect();
        if accessors.is_empty() {
            let semantics: Vec<&String> = found
                .primitives
                .iter()
                .flat_map(|primitive| primitive.attributes.keys())
                .collect();
            return Err(checks::mismatch(
                &format!("attribute {} of mesh {}", semantic, mesh),
                semantic,
                &semantics,
            ));
        }

        let mut fingerprint = Fingerprint::new();
        for accessor in accessors {
            let decoded = decode_accessor(&self.document, &mut self.buffers, accessor)?;
            fingerprint.merge(&Fingerprint::from_attribute(&decoded)?);
        }
        Ok(fingerprint)
    }

    pub fn mesh_by_name(&self, name: &str) -> Result<&Mesh, Err> {
        match self.document.mesh_by_name(name) {
            Some((_, mesh)) => Ok(mesh),
            None => Err(checks::mismatch(
                &format!("mesh named {}", name),
                name,
                &names(self.document.meshes.iter().map(|mesh| &mesh.name)),
            )),
        }
    }

    pub fn material_by_name(&self, name: &str) -> Result<&Material, Err> {
        match self.document.material_by_name(name) {
            Some((_, material)) => Ok(material),
            None => Err(checks::mismatch(
                &format!("material named {}", name),
                name,
                &names(self.document.materials.iter().map(|material| &material.name)),
            )),
        }
    }

    pub fn animation_by_name(&self, name: &str) -> Result<&Animation, Err> {
        match self.document.animation_by_name(name) {
            Some((_, animation)) => Ok(animation),
            None => Err(checks::mismatch(
                &format!("animation named {}", name),
                name,
                &names(self.document.animations.iter().map(|animation| &animation.name)),
            )),
        }
    }

    pub fn structure(&mut self) -> Result<StructureSummary, Err> {
        StructureSummary::from_document(&self.document, &mut self.buffers)
    }
}

/// Compares two verified assets. The validation summaries are compared
/// only when `compare_summary` is set.
pub fn compare_assets(
    expected: &mut VerifiedAsset,
    actual: &mut VerifiedAsset,
    compare_summary: bool,
) -> Result<(), Err> {
    if compare_summary {
        checks::expect_eq("validation summary", &expected.summary(), &actual.summary())?;
    } else {
        tracing::info!(expected = %expected.path.display(), "skipping validation summary comparison");
    }

    let expected_structure = expected.structure()?;
    let actual_structure = actual.structure()?;
    checks::expect_match("asset structure", &expected_structure, &actual_structure)?;
    tracing::debug!(
        meshes = expected_structure.meshes.len(),
        materials = expected_structure.materials.len(),
        animations = expected_structure.animations.len(),
        "asset structures match"
    );
    Ok(())
}

/// Loads and compares assets with one validator and configuration.
#[derive(Debug, Clone)]
pub struct Checker<V> {
    validator: V,
    config: Config,
}

impl<V: Validator> Checker<V> {
    pub fn new(validator: V, config: Config) -> Self {
        Self { validator, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validates the asset at `path`. Every call starts a new pass with an
    /// empty buffer cache.
    pub async fn load(&self, path: &Path) -> Result<VerifiedAsset, Err> {
        VerifiedAsset::load(&self.validator, path).await
    }

    /// Checks that `actual` is equivalent to the fixture at `expected`.
    pub async fn compare(&self, expected: &Path, actual: &Path) -> Result<(), Err> {
        let mut expected_asset = self.load(expected).await?;
        let mut actual_asset = self.load(actual).await?;
        let compare_summary = self.config.should_compare_summary(expected_asset.path());
        compare_assets(&mut expected_asset, &mut actual_asset, compare_summary)?;
        tracing::info!(
            expected = %expected_asset.path().display(),
            actual = %actual_asset.path().display(),
            "assets are equivalent"
        );
        Ok(())
    }
}
