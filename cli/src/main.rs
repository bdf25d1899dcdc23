use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use gltf_verify::prelude::*;

#[derive(Parser)]
#[command(name = "gltf-verify")]
#[command(about = "A CLI tool for validating glTF assets and checking them for equivalence")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an asset and print its issues and summary
    Validate {
        /// glTF or GLB file
        asset: PathBuf,
    },
    /// Check that an asset is equivalent to a fixture
    Compare {
        /// Fixture file
        expected: PathBuf,

        /// Produced file
        actual: PathBuf,

        /// Do not compare the validation summaries
        #[arg(long)]
        skip_summary: bool,
    },
    /// Print the fingerprint of a float VEC3 accessor
    Fingerprint {
        /// glTF or GLB file
        asset: PathBuf,

        /// Accessor index
        #[arg(short, long)]
        accessor: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { asset } => validate_asset(&asset).await,
        Commands::Compare {
            expected,
            actual,
            skip_summary,
        } => {
            let config = <Config as ConfigType>::default().with_compare_summary(!skip_summary);
            let checker = Checker::new(GltfValidator::new(), config);
            checker.compare(&expected, &actual).await?;
            println!("{} is equivalent to {}", actual.display(), expected.display());
            Ok(())
        }
        Commands::Fingerprint { asset, accessor } => {
            let document = Document::from_path(&asset)?;
            let decoded = decode_accessor(&document, &mut BufferCache::new(), accessor)?;
            let fingerprint = Fingerprint::from_attribute(&decoded)?;
            println!("{}", serde_json::to_string_pretty(&fingerprint)?);
            Ok(())
        }
    }
}

fn print_report(report: &Report) -> Result<()> {
    for issue in &report.issues.messages {
        println!("[{}] {}", issue.severity, issue.describe());
    }
    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(())
}

async fn validate_asset(asset: &Path) -> Result<()> {
    match validate_file(&GltfValidator::new(), asset).await {
        Ok(report) => print_report(&report),
        Err(validate::Err::ValidationFailed { report, .. }) => {
            print_report(&report)?;
            anyhow::bail!(
                "{} failed validation with {} error(s)",
                asset.display(),
                report.error_count()
            )
        }
        Err(e) => Err(e.into()),
    }
}
