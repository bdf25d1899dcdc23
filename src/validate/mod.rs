//! Conformance validation of glTF assets.
//!
//! A [`Validator`] turns asset bytes into a [`Report`] shaped like the
//! Khronos glTF-Validator JSON report, fetching external resources through
//! a caller supplied [`ResourceFetcher`]. [`validate_file`] runs a validator
//! over a file on disk and turns error-severity issues into
//! [`Err::ValidationFailed`].

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::shared::absolute_path;
use crate::io::uri;

/// Info block computation from a parsed document.
pub mod info;

/// Validator built on the `gltf` crate.
pub mod native;

pub use native::GltfValidator;

/// Number of issues carried by [`Err::ValidationFailed`].
pub const MAX_REPORTED_ISSUES: usize = 6;

#[remain::sorted]
#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("Input is not recognized as glTF or GLB: {0}")]
    FormatUnrecognized(String),
    #[error("IO Error: {0}")]
    IoError(String),
    #[error("Resource not found: {}", .0.display())]
    ResourceNotFound(PathBuf),
    #[error("URI Error: {0}")]
    Uri(#[from] uri::Err),
    #[error("{} failed validation with {} error(s):\n{}", .path.display(), .report.error_count(), .issues.join("\n"))]
    ValidationFailed {
        path: PathBuf,
        issues: Vec<String>,
        report: Box<Report>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Error),
            1 => Some(Self::Warning),
            2 => Some(Self::Information),
            3 => Some(Self::Hint),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub code: String,
    pub message: String,
    pub severity: u8,
    #[serde(default)]
    pub pointer: Option<String>,
}

impl Issue {
    pub fn new(severity: Severity, code: &str, pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: severity.code(),
            pointer: Some(pointer.into()),
        }
    }

    pub fn error(code: &str, pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, pointer, message)
    }

    pub fn is_error(&self) -> bool {
        Severity::from_code(self.severity) == Some(Severity::Error)
    }

    /// `pointer: message (code)`, as shown in failure diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "{}: {} ({})",
            self.pointer.as_deref().unwrap_or("/"),
            self.message,
            self.code
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issues {
    #[serde(default)]
    pub num_errors: usize,
    #[serde(default)]
    pub num_warnings: usize,
    #[serde(default)]
    pub num_infos: usize,
    #[serde(default)]
    pub num_hints: usize,
    #[serde(default)]
    pub messages: Vec<Issue>,
    #[serde(default)]
    pub truncated: bool,
}

/// The informational block of a report. Unknown fields are preserved in
/// `other` but never take part in comparisons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportInfo {
    pub version: String,
    pub generator: Option<String>,
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
    pub animation_count: usize,
    pub material_count: usize,
    pub has_morph_targets: bool,
    pub has_skins: bool,
    pub has_textures: bool,
    pub has_default_scene: bool,
    pub draw_call_count: usize,
    pub total_vertex_count: usize,
    pub total_triangle_count: usize,
    #[serde(rename = "maxUVs")]
    pub max_uvs: usize,
    pub max_influences: usize,
    pub max_attributes: usize,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub validator_version: Option<String>,
    #[serde(default)]
    pub issues: Issues,
    #[serde(default)]
    pub info: ReportInfo,
}

impl Report {
    pub fn new(info: ReportInfo) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    pub fn push(&mut self, issue: Issue) {
        match Severity::from_code(issue.severity) {
            Some(Severity::Error) => self.issues.num_errors += 1,
            Some(Severity::Warning) => self.issues.num_warnings += 1,
            Some(Severity::Information) => self.issues.num_infos += 1,
            Some(Severity::Hint) | None => self.issues.num_hints += 1,
        }
        self.issues.messages.push(issue);
    }

    /// Error-severity issues. Reports whose message list was truncated
    /// still count every error through `numErrors`.
    pub fn error_count(&self) -> usize {
        let listed = self.errors().count();
        listed.max(self.issues.num_errors)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.messages.iter().filter(|issue| issue.is_error())
    }

    /// Warnings, infos and hints do not make an asset invalid.
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary::from(&self.info)
    }
}

/// The fixed subset of report info fields that take part in equivalence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub version: String,
    pub animation_count: usize,
    pub material_count: usize,
    pub has_morph_targets: bool,
    pub has_skins: bool,
    pub has_textures: bool,
    pub has_default_scene: bool,
    pub draw_call_count: usize,
    pub total_triangle_count: usize,
    #[serde(rename = "maxUVs")]
    pub max_uvs: usize,
    pub max_influences: usize,
}

impl From<&ReportInfo> for ValidationSummary {
    fn from(info: &ReportInfo) -> Self {
        Self {
            version: info.version.clone(),
            animation_count: info.animation_count,
            material_count: info.material_count,
            has_morph_targets: info.has_morph_targets,
            has_skins: info.has_skins,
            has_textures: info.has_textures,
            has_default_scene: info.has_default_scene,
            draw_call_count: info.draw_call_count,
            total_triangle_count: info.total_triangle_count,
            max_uvs: info.max_uvs,
            max_influences: info.max_influences,
        }
    }
}

/// Supplies the bytes of external resources referenced by an asset.
pub trait ResourceFetcher {
    fn fetch(&self, uri: &str) -> impl Future<Output = Result<Vec<u8>, Err>>;
}

/// Fetches resources from the filesystem, relative to the asset directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    base_dir: PathBuf,
}

impl FsFetcher {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl ResourceFetcher for FsFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, Err> {
        let path = uri::resolve_path(Some(&self.base_dir), uri)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Err::ResourceNotFound(path.clone()),
            _ => Err::IoError(format!("Failed to read {}: {}", path.display(), e)),
        })
    }
}

/// Produces a conformance report for raw asset bytes (glTF JSON or GLB).
///
/// Implementations return [`Err::FormatUnrecognized`] when the bytes are
/// not a glTF asset at all; structural problems belong in the report.
pub trait Validator {
    fn validate<F: ResourceFetcher>(
        &self,
        asset: &[u8],
        fetcher: &F,
    ) -> impl Future<Output = Result<Report, Err>>;
}

/// Reads the asset at `path` without blocking the runtime.
pub async fn read_asset(path: &Path) -> Result<Vec<u8>, Err> {
    let path = absolute_path(path);
    tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Err::ResourceNotFound(path.clone()),
        _ => Err::IoError(format!("Failed to read {}: {}", path.display(), e)),
    })
}

/// Validates the asset at `path` and fails if the report has errors.
pub async fn validate_file<V: Validator>(validator: &V, path: &Path) -> Result<Report, Err> {
    let bytes = read_asset(path).await?;
    validate_bytes(validator, path, &bytes).await
}

/// Like [`validate_file`] for asset bytes already read from `path`.
/// External resources are still fetched relative to `path`.
pub async fn validate_bytes<V: Validator>(validator: &V, path: &Path, bytes: &[u8]) -> Result<Report, Err> {
    let path = absolute_path(path);
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut report = validator.validate(bytes, &FsFetcher::new(base_dir)).await?;
    report.uri.get_or_insert_with(|| path.display().to_string());
    tracing::info!(
        path = %path.display(),
        errors = report.issues.num_errors,
        warnings = report.issues.num_warnings,
        "validated asset"
    );
    ensure_valid(&path, report)
}

/// Passes `report` through when it has no error-severity issues.
pub fn ensure_valid(path: &Path, report: Report) -> Result<Report, Err> {
    if report.is_valid() {
        return Ok(report);
    }
    let issues = report
        .errors()
        .take(MAX_REPORTED_ISSUES)
        .map(Issue::describe)
        .collect();
    Err(Err::ValidationFailed {
        path: path.to_path_buf(),
        issues,
        report: Box::new(report),
    })
}
