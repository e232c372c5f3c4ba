// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runner-side lifecycle event payloads.
//!
//! These types are the boundary between a test runner and the
//! [`AllureReporter`](crate::reporter::AllureReporter): the runner constructs
//! them once, when an event crosses into the reporter, and the reporter never
//! inspects runner internals beyond them.

use indexmap::IndexMap;

/// A test about to be executed.
///
/// The two shapes cover the ways runners expose the executable method: as a
/// scenario object whose display name is a feature sentence, or as a plain
/// test whose display name is the method name itself (possibly decorated
/// with a data-set marker).
#[derive(Clone, Debug)]
pub enum TestDescriptor {
    /// A scenario-style test: the feature sentence is displayed, the method
    /// name identifies the code.
    Scenario {
        /// The human-readable feature sentence.
        feature: String,

        /// The name of the test method.
        method_name: String,

        /// The fully qualified name of the class declaring the method.
        declaring_class: String,

        /// The current example row for data-driven scenarios, in declaration
        /// order. A `dataset` entry, if present, names the row.
        examples: IndexMap<String, String>,
    },

    /// A plain unit-style test.
    Plain {
        /// The test name as reported by the runner. May carry a
        /// `with data set` decoration for data-provider invocations.
        name: String,

        /// The fully qualified name of the class declaring the test.
        declaring_class: String,
    },
}

impl TestDescriptor {
    /// Returns the fully qualified name of the declaring class.
    pub fn declaring_class(&self) -> &str {
        match self {
            TestDescriptor::Scenario {
                declaring_class, ..
            } => declaring_class,
            TestDescriptor::Plain {
                declaring_class, ..
            } => declaring_class,
        }
    }
}

/// A failure reported by the runner for the active test.
///
/// Constructed once when the failure crosses into the reporter, so the
/// reporter never inspects exception objects or their hierarchies.
#[derive(Clone, Debug)]
pub struct FailureDetails {
    /// The failure message. May be empty.
    pub message: String,

    /// The runtime type name of the underlying failure, used as a fallback
    /// label when the message is empty.
    pub type_label: String,

    /// A structural expectation mismatch, when the failure carries one.
    pub diff: Option<ExpectationDiff>,
}

impl FailureDetails {
    /// Creates failure details with no structural diff.
    pub fn new(message: impl Into<String>, type_label: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            type_label: type_label.into(),
            diff: None,
        }
    }

    /// Attaches a structural expectation mismatch.
    pub fn with_diff(mut self, diff: ExpectationDiff) -> Self {
        self.diff = Some(diff);
        self
    }
}

/// The two sides of a structural expectation mismatch.
#[derive(Clone, Debug)]
pub struct ExpectationDiff {
    /// The expected value, rendered as text.
    pub expected: String,

    /// The actual value, rendered as text.
    pub actual: String,
}

impl ExpectationDiff {
    /// Creates a new `ExpectationDiff`.
    pub fn new(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// A step about to be executed inside the active test.
///
/// Both fields arrive already humanized by the runner; the reporter only
/// concatenates, truncates and substitutes characters.
#[derive(Clone, Debug)]
pub struct StepRecord {
    /// The humanized action, without arguments.
    pub action: String,

    /// The humanized arguments, joined into one string.
    pub arguments: String,
}

impl StepRecord {
    /// Creates a new `StepRecord`.
    pub fn new(action: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            arguments: arguments.into(),
        }
    }
}
