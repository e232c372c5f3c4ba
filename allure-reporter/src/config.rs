// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporter configuration.
//!
//! Configuration comes in two layers: [`AllureConfig`] is the raw,
//! serde-deserializable form a runner reads out of its own configuration
//! files, and [`ReporterConfig`] is the evaluated form with defaults applied,
//! paths resolved and values validated. Evaluation happens once, before any
//! lifecycle event is processed; it is the only fatal step in this crate.

use crate::errors::ConfigError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Raw reporter configuration, as deserialized from the runner's own
/// configuration.
///
/// Every field has a default, so an empty configuration section is valid.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AllureConfig {
    /// Destination for persisted report records. Relative paths are resolved
    /// against the runner's output root at evaluation time.
    #[serde(default = "default_output_directory")]
    pub output_directory: Utf8PathBuf,

    /// Whether to remove existing `*.xml` report files from the output
    /// directory before the run starts.
    #[serde(default)]
    pub delete_previous_results: bool,

    /// Maximum number of characters of humanized step arguments included in
    /// step names. Negative values are rejected at evaluation time.
    #[serde(default = "default_arguments_length")]
    pub arguments_length: i64,

    /// Whether issue keys are prefixed to test titles and failure messages.
    #[serde(default)]
    pub issues_in_test_name: bool,

    /// Extra annotation names to exclude from parsing, in addition to the
    /// built-in framework-reserved set.
    #[serde(default)]
    pub ignored_annotations: Vec<String>,
}

impl AllureConfig {
    /// The default output directory, relative to the runner's output root.
    pub const DEFAULT_RESULTS_DIRECTORY: &'static str = "allure-results";

    /// The default maximum length of humanized step arguments.
    pub const DEFAULT_ARGUMENTS_LENGTH: i64 = 200;

    /// Evaluates this configuration against the runner's output root.
    ///
    /// Returns a [`ConfigError`] for invalid values; this is the only fatal
    /// error the reporter raises, and it happens before any event is
    /// processed.
    pub fn evaluate(&self, output_root: &Utf8Path) -> Result<ReporterConfig, ConfigError> {
        let arguments_length = usize::try_from(self.arguments_length).map_err(|_| {
            ConfigError::NegativeArgumentsLength {
                value: self.arguments_length,
            }
        })?;

        let output_directory = if self.output_directory.is_absolute() {
            self.output_directory.clone()
        } else {
            output_root.join(&self.output_directory)
        };

        Ok(ReporterConfig {
            output_directory,
            delete_previous_results: self.delete_previous_results,
            arguments_length,
            issues_in_test_name: self.issues_in_test_name,
            ignored_annotations: self.ignored_annotations.clone(),
        })
    }
}

impl Default for AllureConfig {
    fn default() -> Self {
        Self {
            output_directory: default_output_directory(),
            delete_previous_results: false,
            arguments_length: default_arguments_length(),
            issues_in_test_name: false,
            ignored_annotations: vec![],
        }
    }
}

fn default_output_directory() -> Utf8PathBuf {
    AllureConfig::DEFAULT_RESULTS_DIRECTORY.into()
}

fn default_arguments_length() -> i64 {
    AllureConfig::DEFAULT_ARGUMENTS_LENGTH
}

/// Evaluated reporter configuration.
///
/// Produced by [`AllureConfig::evaluate`]; all paths are absolute with
/// respect to the runner's output root and all values are validated.
#[derive(Clone, Debug)]
pub struct ReporterConfig {
    output_directory: Utf8PathBuf,
    delete_previous_results: bool,
    arguments_length: usize,
    issues_in_test_name: bool,
    ignored_annotations: Vec<String>,
}

impl ReporterConfig {
    /// Returns the resolved output directory.
    pub fn output_directory(&self) -> &Utf8Path {
        &self.output_directory
    }

    /// Returns true if previous `*.xml` results are removed before the run.
    pub fn delete_previous_results(&self) -> bool {
        self.delete_previous_results
    }

    /// Returns the maximum number of characters of step arguments included
    /// in step names.
    pub fn arguments_length(&self) -> usize {
        self.arguments_length
    }

    /// Returns true if issue keys are prefixed to test titles and failure
    /// messages.
    pub fn issues_in_test_name(&self) -> bool {
        self.issues_in_test_name
    }

    /// Returns the extra annotation names excluded from parsing.
    pub fn ignored_annotations(&self) -> &[String] {
        &self.ignored_annotations
    }
}
