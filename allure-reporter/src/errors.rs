// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the reporter.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while evaluating the reporter configuration.
///
/// Configuration errors are the only fatal errors in this crate: they are
/// raised before any lifecycle event is processed.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// `arguments_length` must be a non-negative number of characters.
    #[error("invalid value for arguments_length: {value} (must be non-negative)")]
    NegativeArgumentsLength {
        /// The rejected value.
        value: i64,
    },
}

/// An error that occurred while preparing the output directory.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PrepareOutputError {
    /// The output directory could not be created.
    #[error("error creating output directory `{dir}`")]
    Create {
        /// The directory being created.
        dir: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: io::Error,
    },

    /// The output directory could not be listed while removing previous
    /// results.
    #[error("error listing output directory `{dir}`")]
    List {
        /// The directory being listed.
        dir: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: io::Error,
    },

    /// A previous result file could not be removed.
    #[error("error removing previous result file `{file}`")]
    Remove {
        /// The file being removed.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while writing a lifecycle event to the report
/// sink.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    /// An error occurred while operating on the file system.
    #[error("error operating on path `{file}`")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: io::Error,
    },

    /// An error occurred while serializing a test-suite record.
    #[error("error writing test-suite record to `{file}`")]
    Serialize {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: allure_model::SerializeError,
    },

    /// A lifecycle event arrived that does not fit the currently open
    /// record path.
    #[error("lifecycle event `{event}` arrived out of order: {reason}")]
    OutOfOrder {
        /// The offending event.
        event: &'static str,

        /// Why the event does not fit the current state.
        reason: &'static str,
    },
}
