//! `merge` and `merge-change` command implementations.

use std::io::{BufReader, Read, Write};
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osmerge_core::{
    BoundRemovedAction, ChangeRecord, ConflictResolutionMethod, EntityItem, MergeOptions,
};
use osmerge_pipeline::{DEFAULT_BUFFER_CAPACITY, Pipeline, PipelineReport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::jsonl::{JsonLinesReader, JsonLinesWriter};
use crate::{
    ARG_BOUND_REMOVED_ACTION, ARG_BUFFER_CAPACITY, ARG_CONFLICT_RESOLUTION_METHOD, ARG_LEFT,
    ARG_OUTPUT, ARG_RIGHT, CliError, ENV_MERGE_CHANGE_LEFT, ENV_MERGE_CHANGE_OUTPUT,
    ENV_MERGE_CHANGE_RIGHT, ENV_MERGE_LEFT, ENV_MERGE_OUTPUT, ENV_MERGE_RIGHT,
};

/// Name of the merge task inside the command's pipeline.
pub(crate) const MERGE_TASK: &str = "merge";

/// CLI arguments for the `merge` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Merge two sorted JSON Lines snapshot streams into one. \
                 Entities present in both inputs are resolved to a single \
                 whole entity. Options can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Merge two sorted entity snapshots"
)]
#[ortho_config(prefix = "OSMERGE")]
pub(crate) struct MergeArgs {
    /// Path to the first (left) snapshot.
    #[arg(long = ARG_LEFT, value_name = "path")]
    #[serde(default)]
    pub(crate) left: Option<Utf8PathBuf>,
    /// Path to the second (right) snapshot.
    #[arg(long = ARG_RIGHT, value_name = "path")]
    #[serde(default)]
    pub(crate) right: Option<Utf8PathBuf>,
    /// Path of the merged snapshot to write.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Conflict resolution: timestamp (default), version or lastSource.
    #[arg(long = ARG_CONFLICT_RESOLUTION_METHOD, value_name = "method")]
    #[serde(default)]
    pub(crate) conflict_resolution_method: Option<String>,
    /// Reaction to a bound declared by one input only: ignore (default),
    /// warn or fail.
    #[arg(long = ARG_BOUND_REMOVED_ACTION, value_name = "action")]
    #[serde(default)]
    pub(crate) bound_removed_action: Option<String>,
    /// Records buffered between pipeline tasks.
    #[arg(long = ARG_BUFFER_CAPACITY, value_name = "records")]
    #[serde(default)]
    pub(crate) buffer_capacity: Option<usize>,
}

/// CLI arguments for the `merge-change` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Merge two sorted JSON Lines change streams into one. \
                 Changes to the same entity are resolved to a single whole \
                 change record; actions are never combined.",
    about = "Merge two sorted change streams"
)]
#[ortho_config(prefix = "OSMERGE")]
pub(crate) struct MergeChangeArgs {
    /// Path to the first (left) change stream.
    #[arg(long = ARG_LEFT, value_name = "path")]
    #[serde(default)]
    pub(crate) left: Option<Utf8PathBuf>,
    /// Path to the second (right) change stream.
    #[arg(long = ARG_RIGHT, value_name = "path")]
    #[serde(default)]
    pub(crate) right: Option<Utf8PathBuf>,
    /// Path of the merged change stream to write.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Conflict resolution: timestamp (default), version or lastSource.
    #[arg(long = ARG_CONFLICT_RESOLUTION_METHOD, value_name = "method")]
    #[serde(default)]
    pub(crate) conflict_resolution_method: Option<String>,
    /// Records buffered between pipeline tasks.
    #[arg(long = ARG_BUFFER_CAPACITY, value_name = "records")]
    #[serde(default)]
    pub(crate) buffer_capacity: Option<usize>,
}

impl MergeArgs {
    pub(crate) fn into_config(self) -> Result<MergeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        MergeConfig::try_from(merged)
    }
}

impl MergeChangeArgs {
    pub(crate) fn into_config(self) -> Result<MergeChangeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        MergeChangeConfig::try_from(merged)
    }
}

/// Input and output paths shared by both merge commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StreamPaths {
    /// First input.
    pub(crate) left: Utf8PathBuf,
    /// Second input.
    pub(crate) right: Utf8PathBuf,
    /// Merged output.
    pub(crate) output: Utf8PathBuf,
}

impl StreamPaths {
    fn resolve(
        left: Option<Utf8PathBuf>,
        right: Option<Utf8PathBuf>,
        output: Option<Utf8PathBuf>,
        [left_env, right_env, output_env]: [&'static str; 3],
    ) -> Result<Self, CliError> {
        let left = left.ok_or(CliError::MissingArgument {
            field: ARG_LEFT,
            env: left_env,
        })?;
        let right = right.ok_or(CliError::MissingArgument {
            field: ARG_RIGHT,
            env: right_env,
        })?;
        let output = output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: output_env,
        })?;
        Ok(Self {
            left,
            right,
            output,
        })
    }

    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.left, ARG_LEFT)?;
        Self::require_existing(&self.right, ARG_RIGHT)?;
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match osmerge_fs::is_regular_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn parse_option<T>(raw: Option<&str>, field: &'static str) -> Result<Option<T>, CliError>
where
    T: FromStr<Err = String>,
{
    raw.map(T::from_str)
        .transpose()
        .map_err(|message| CliError::InvalidOption { field, message })
}

fn resolve_capacity(raw: Option<usize>) -> Result<usize, CliError> {
    match raw {
        Some(0) => Err(CliError::InvalidOption {
            field: ARG_BUFFER_CAPACITY,
            message: "buffer capacity must be at least 1".to_owned(),
        }),
        Some(capacity) => Ok(capacity),
        None => Ok(DEFAULT_BUFFER_CAPACITY),
    }
}

/// Resolved `merge` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergeConfig {
    pub(crate) paths: StreamPaths,
    pub(crate) options: MergeOptions,
    pub(crate) buffer_capacity: usize,
}

impl TryFrom<MergeArgs> for MergeConfig {
    type Error = CliError;

    fn try_from(args: MergeArgs) -> Result<Self, Self::Error> {
        let paths = StreamPaths::resolve(
            args.left,
            args.right,
            args.output,
            [ENV_MERGE_LEFT, ENV_MERGE_RIGHT, ENV_MERGE_OUTPUT],
        )?;
        let method: Option<ConflictResolutionMethod> = parse_option(
            args.conflict_resolution_method.as_deref(),
            ARG_CONFLICT_RESOLUTION_METHOD,
        )?;
        let action: Option<BoundRemovedAction> =
            parse_option(args.bound_removed_action.as_deref(), ARG_BOUND_REMOVED_ACTION)?;
        Ok(Self {
            paths,
            options: MergeOptions::with_method(method.unwrap_or_default())
                .bound_removed_action(action.unwrap_or_default()),
            buffer_capacity: resolve_capacity(args.buffer_capacity)?,
        })
    }
}

/// Resolved `merge-change` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergeChangeConfig {
    pub(crate) paths: StreamPaths,
    pub(crate) method: ConflictResolutionMethod,
    pub(crate) buffer_capacity: usize,
}

impl TryFrom<MergeChangeArgs> for MergeChangeConfig {
    type Error = CliError;

    fn try_from(args: MergeChangeArgs) -> Result<Self, Self::Error> {
        let paths = StreamPaths::resolve(
            args.left,
            args.right,
            args.output,
            [
                ENV_MERGE_CHANGE_LEFT,
                ENV_MERGE_CHANGE_RIGHT,
                ENV_MERGE_CHANGE_OUTPUT,
            ],
        )?;
        let method: Option<ConflictResolutionMethod> = parse_option(
            args.conflict_resolution_method.as_deref(),
            ARG_CONFLICT_RESOLUTION_METHOD,
        )?;
        Ok(Self {
            paths,
            method: method.unwrap_or_default(),
            buffer_capacity: resolve_capacity(args.buffer_capacity)?,
        })
    }
}

pub(crate) fn run_merge(args: MergeArgs) -> Result<PipelineReport, CliError> {
    let config = args.into_config()?;
    config.paths.validate_sources()?;
    execute_merge(&config)
}

pub(crate) fn run_merge_change(args: MergeChangeArgs) -> Result<PipelineReport, CliError> {
    let config = args.into_config()?;
    config.paths.validate_sources()?;
    execute_merge_change(&config)
}

/// Merge two snapshot files into `config.paths.output`.
pub(crate) fn execute_merge(config: &MergeConfig) -> Result<PipelineReport, CliError> {
    let paths = &config.paths;
    let mut pipeline = Pipeline::with_buffer_capacity(config.buffer_capacity)?;
    let left = pipeline.source("read-left", open_reader::<EntityItem>(&paths.left)?)?;
    let right = pipeline.source("read-right", open_reader::<EntityItem>(&paths.right)?)?;
    let merged = pipeline.entity_merge(MERGE_TASK, left, right, config.options)?;
    pipeline.sink("write", merged, create_writer::<EntityItem>(&paths.output)?);
    run_to_output(pipeline, &paths.output)
}

/// Merge two change files into `config.paths.output`.
pub(crate) fn execute_merge_change(
    config: &MergeChangeConfig,
) -> Result<PipelineReport, CliError> {
    let paths = &config.paths;
    let mut pipeline = Pipeline::with_buffer_capacity(config.buffer_capacity)?;
    let left = pipeline.source("read-left", open_reader::<ChangeRecord>(&paths.left)?)?;
    let right = pipeline.source("read-right", open_reader::<ChangeRecord>(&paths.right)?)?;
    let merged = pipeline.change_merge(MERGE_TASK, left, right, config.method)?;
    pipeline.sink("write", merged, create_writer::<ChangeRecord>(&paths.output)?);
    run_to_output(pipeline, &paths.output)
}

fn open_reader<T: DeserializeOwned>(
    path: &Utf8Path,
) -> Result<JsonLinesReader<BufReader<impl Read + Send + 'static>, T>, CliError> {
    let file = osmerge_fs::open_input(path).map_err(|source| CliError::OpenInput {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(JsonLinesReader::new(file))
}

fn create_writer<T: Serialize>(
    path: &Utf8Path,
) -> Result<JsonLinesWriter<impl Write + Send + 'static, T>, CliError> {
    let file = osmerge_fs::create_output(path).map_err(|source| CliError::CreateOutput {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(JsonLinesWriter::new(file))
}

fn run_to_output(pipeline: Pipeline, output: &Utf8Path) -> Result<PipelineReport, CliError> {
    match pipeline.run() {
        Ok(report) => {
            let written = report.task(MERGE_TASK).map_or(0, |task| task.records);
            info!("wrote {written} records to {output}");
            Ok(report)
        }
        Err(err) => {
            discard_output(output);
            Err(CliError::Pipeline(err))
        }
    }
}

// A failed merge must not leave a truncated result behind.
fn discard_output(output: &Utf8Path) {
    if let Err(source) = osmerge_fs::remove_file(output) {
        warn!("failed to remove partial output {output}: {source}");
    }
}

#[cfg(test)]
pub(crate) fn merge_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<MergeConfig, CliError> {
    let merged = MergeArgs::merge_from_layers(layers).map_err(CliError::from)?;
    MergeConfig::try_from(merged)
}
