//! Produce-then-compare scenarios bounded by a timeout.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::compare::{Checker, Err};
use crate::validate::Validator;

/// Argument placeholder replaced by the output path of the asset.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Writes an asset to a given path. Production is one-shot and never
/// retried.
pub trait AssetProducer {
    fn produce(&self, output: &Path) -> impl Future<Output = Result<(), Err>>;
}

/// Produces assets by running an external program, e.g. a content-creation
/// tool in batch mode.
#[derive(Debug, Clone)]
pub struct CommandProducer {
    program: OsString,
    args: Vec<String>,
}

impl CommandProducer {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument; [`OUTPUT_PLACEHOLDER`] in it is substituted.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl AssetProducer for CommandProducer {
    async fn produce(&self, output: &Path) -> Result<(), Err> {
        let output_arg = output.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output_arg))
            .collect();
        let program = self.program.to_string_lossy();
        tracing::debug!(program = %program, ?args, "running asset producer");

        // The child is killed if the scenario is dropped on timeout.
        let result = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Err::ProducerFailed(format!("failed to start {}: {}", program, e)))?;

        if !result.status.success() {
            return Err(Err::ProducerFailed(format!(
                "{} exited with {}: {}",
                program,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        if !output.exists() {
            return Err(Err::ProducerFailed(format!(
                "{} did not write {}",
                program,
                output.display()
            )));
        }
        Ok(())
    }
}

/// A fixture and the path the produced counterpart is written to.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub expected: PathBuf,
    pub output: PathBuf,
}

impl Scenario {
    pub fn new(name: impl Into<String>, expected: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            expected: expected.into(),
            output: output.into(),
        }
    }
}

/// Produces the asset of `scenario` and compares it against its fixture,
/// failing with [`Err::TimedOut`] once the configured timeout expires.
pub async fn run_scenario<P, V>(checker: &Checker<V>, producer: &P, scenario: &Scenario) -> Result<(), Err>
where
    P: AssetProducer,
    V: Validator,
{
    let timeout = checker.config().scenario_timeout();
    tracing::info!(scenario = %scenario.name, "starting scenario");

    let run = async {
        producer.produce(&scenario.output).await?;
        checker.compare(&scenario.expected, &scenario.output).await
    };
    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(())) => {
            tracing::info!(scenario = %scenario.name, "scenario passed");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::warn!(scenario = %scenario.name, error = %e, "scenario failed");
            Err(e)
        }
        Err(_) => {
            tracing::warn!(scenario = %scenario.name, ?timeout, "scenario timed out");
            Err(Err::TimedOut(timeout))
        }
    }
}
