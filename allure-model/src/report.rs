// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::SerializeError, serialize::serialize_suite};
use chrono::{DateTime, Utc};
use std::io;

/// A single test suite record.
///
/// This is the root element of an allure record file: one suite, its test
/// cases, and the steps recorded inside them.
#[derive(Clone, Debug)]
pub struct TestSuite {
    /// The fully qualified name of this suite.
    pub name: String,

    /// A human-readable title, overriding the name in rendered reports.
    pub title: Option<String>,

    /// A longer description of the suite.
    pub description: Option<String>,

    /// The time at which the suite began execution.
    pub start: Option<DateTime<Utc>>,

    /// The time at which the suite finished execution.
    pub stop: Option<DateTime<Utc>>,

    /// The test cases that form this suite.
    pub test_cases: Vec<TestCase>,

    /// Labels attached to the suite as a whole.
    pub labels: Vec<Label>,
}

impl TestSuite {
    /// Creates a new `TestSuite` with the given name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: sanitize(name.as_ref()),
            title: None,
            description: None,
            start: None,
            stop: None,
            test_cases: vec![],
            labels: vec![],
        }
    }

    /// Sets the human-readable title.
    pub fn set_title(&mut self, title: impl AsRef<str>) -> &mut Self {
        self.title = Some(sanitize(title.as_ref()));
        self
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl AsRef<str>) -> &mut Self {
        self.description = Some(sanitize(description.as_ref()));
        self
    }

    /// Sets the start timestamp.
    pub fn set_start(&mut self, start: impl Into<DateTime<Utc>>) -> &mut Self {
        self.start = Some(start.into());
        self
    }

    /// Sets the stop timestamp.
    pub fn set_stop(&mut self, stop: impl Into<DateTime<Utc>>) -> &mut Self {
        self.stop = Some(stop.into());
        self
    }

    /// Adds a test case to this suite.
    pub fn add_test_case(&mut self, test_case: TestCase) -> &mut Self {
        self.test_cases.push(test_case);
        self
    }

    /// Adds a label to this suite.
    pub fn add_label(&mut self, label: Label) -> &mut Self {
        self.labels.push(label);
        self
    }

    /// Serialize this suite to the given writer as a `testsuite.xml` record.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_suite(self, writer)
    }

    /// Serialize this suite to a string.
    pub fn to_xml_string(&self) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|utf8_err| quick_xml::Error::from(utf8_err).into())
    }
}

/// A single test case within a [`TestSuite`].
#[derive(Clone, Debug)]
pub struct TestCase {
    /// The name of the test case, as reported by the runner.
    pub name: String,

    /// A human-readable title, overriding the name in rendered reports.
    pub title: Option<String>,

    /// A longer description of the test case.
    pub description: Option<String>,

    /// The outcome of the test case.
    pub status: Status,

    /// Failure details, present for every non-passed status that carries a
    /// message.
    pub failure: Option<Failure>,

    /// The time at which the test case began execution.
    pub start: Option<DateTime<Utc>>,

    /// The time at which the test case finished execution.
    pub stop: Option<DateTime<Utc>>,

    /// The steps recorded inside the test case.
    pub steps: Vec<Step>,

    /// Labels attached to the test case, e.g. issue keys or severity.
    pub labels: Vec<Label>,

    /// Parameters the test case was invoked with.
    pub parameters: Vec<Parameter>,
}

impl TestCase {
    /// Creates a new `TestCase` with the given name and a `Passed` status.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: sanitize(name.as_ref()),
            title: None,
            description: None,
            status: Status::Passed,
            failure: None,
            start: None,
            stop: None,
            steps: vec![],
            labels: vec![],
            parameters: vec![],
        }
    }

    /// Sets the human-readable title.
    pub fn set_title(&mut self, title: impl AsRef<str>) -> &mut Self {
        self.title = Some(sanitize(title.as_ref()));
        self
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl AsRef<str>) -> &mut Self {
        self.description = Some(sanitize(description.as_ref()));
        self
    }

    /// Sets the status.
    pub fn set_status(&mut self, status: Status) -> &mut Self {
        self.status = status;
        self
    }

    /// Sets the failure details.
    pub fn set_failure(&mut self, failure: Failure) -> &mut Self {
        self.failure = Some(failure);
        self
    }

    /// Sets the start timestamp.
    pub fn set_start(&mut self, start: impl Into<DateTime<Utc>>) -> &mut Self {
        self.start = Some(start.into());
        self
    }

    /// Sets the stop timestamp.
    pub fn set_stop(&mut self, stop: impl Into<DateTime<Utc>>) -> &mut Self {
        self.stop = Some(stop.into());
        self
    }

    /// Adds a completed step.
    pub fn add_step(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Adds a label.
    pub fn add_label(&mut self, label: Label) -> &mut Self {
        self.labels.push(label);
        self
    }

    /// Adds an invocation parameter.
    pub fn add_parameter(&mut self, parameter: Parameter) -> &mut Self {
        self.parameters.push(parameter);
        self
    }
}

/// A sub-action recorded inside a test case.
///
/// Steps may nest arbitrarily deep.
#[derive(Clone, Debug)]
pub struct Step {
    /// The display name of the step.
    pub name: String,

    /// The outcome of the step.
    pub status: Status,

    /// The time at which the step began execution.
    pub start: Option<DateTime<Utc>>,

    /// The time at which the step finished execution.
    pub stop: Option<DateTime<Utc>>,

    /// Nested steps.
    pub steps: Vec<Step>,
}

impl Step {
    /// Creates a new `Step` with the given name and a `Passed` status.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: sanitize(name.as_ref()),
            status: Status::Passed,
            start: None,
            stop: None,
            steps: vec![],
        }
    }

    /// Sets the status.
    pub fn set_status(&mut self, status: Status) -> &mut Self {
        self.status = status;
        self
    }

    /// Sets the start timestamp.
    pub fn set_start(&mut self, start: impl Into<DateTime<Utc>>) -> &mut Self {
        self.start = Some(start.into());
        self
    }

    /// Sets the stop timestamp.
    pub fn set_stop(&mut self, stop: impl Into<DateTime<Utc>>) -> &mut Self {
        self.stop = Some(stop.into());
        self
    }

    /// Adds a completed nested step.
    pub fn add_step(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }
}

/// The outcome of a test case or step.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Status {
    /// The test passed.
    #[default]
    Passed,

    /// An assertion failed.
    Failed,

    /// The test errored in an unexpected way.
    Broken,

    /// The test is marked incomplete.
    Pending,

    /// The test was skipped.
    Canceled,
}

impl Status {
    /// Returns the wire representation of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Broken => "broken",
            Status::Pending => "pending",
            Status::Canceled => "canceled",
        }
    }
}

/// Failure details attached to a non-passed test case.
#[derive(Clone, Debug)]
pub struct Failure {
    /// The human-readable failure message.
    pub message: String,

    /// The stack trace, if any.
    pub stack_trace: Option<String>,
}

impl Failure {
    /// Creates a new `Failure` with the given message.
    pub fn new(message: impl AsRef<str>) -> Self {
        Self {
            message: sanitize(message.as_ref()),
            stack_trace: None,
        }
    }

    /// Sets the stack trace.
    pub fn set_stack_trace(&mut self, stack_trace: impl AsRef<str>) -> &mut Self {
        self.stack_trace = Some(sanitize(stack_trace.as_ref()));
        self
    }
}

/// A name/value label attached to a suite or a test case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Label {
    /// The label name.
    pub name: String,

    /// The label value.
    pub value: String,
}

impl Label {
    /// Creates a new `Label`.
    pub fn new(name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        Self {
            name: sanitize(name.as_ref()),
            value: sanitize(value.as_ref()),
        }
    }

    /// Creates an `issue` label for an external tracker key.
    pub fn issue(key: impl AsRef<str>) -> Self {
        Self::new("issue", key)
    }

    /// Creates a `severity` label.
    pub fn severity(value: impl AsRef<str>) -> Self {
        Self::new("severity", value)
    }
}

/// A parameter a test case was invoked with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    /// The parameter name.
    pub name: String,

    /// The parameter value.
    pub value: String,

    /// What kind of parameter this is.
    pub kind: ParameterKind,
}

impl Parameter {
    /// Creates a new argument parameter.
    pub fn argument(name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        Self {
            name: sanitize(name.as_ref()),
            value: sanitize(value.as_ref()),
            kind: ParameterKind::Argument,
        }
    }
}

/// The kind of a [`Parameter`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParameterKind {
    /// A data-set or method argument.
    Argument,

    /// An environment variable.
    EnvironmentVariable,

    /// A system property.
    SystemProperty,
}

impl ParameterKind {
    /// Returns the wire representation of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKind::Argument => "argument",
            ParameterKind::EnvironmentVariable => "environment-variable",
            ParameterKind::SystemProperty => "system-property",
        }
    }
}

// XML 1.0 forbids most control characters outright, so strip them before they
// reach the serializer.
fn sanitize(input: &str) -> String {
    input.replace(
        |c| matches!(c, '\x00'..='\x08' | '\x0b' | '\x0c' | '\x0e'..='\x1f'),
        "",
    )
}
