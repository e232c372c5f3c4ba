// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report model sink.
//!
//! The [`ReportSink`] trait is the write side of the report model: the
//! translator issues begin/update/end operations in valid nesting order and
//! the sink owns identifiers, timestamps and persistence.
//! [`AllureFileSink`] is the production implementation: it assembles
//! [`allure_model`] records along the single active suite → test case → step
//! path and serializes one `<uuid>-testsuite.xml` file per suite.

use crate::{
    config::ReporterConfig,
    errors::{PrepareOutputError, SinkError},
};
use allure_model::{Failure, Label, Parameter, Status, Step, TestCase, TestSuite};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::fmt;
use std::fs::File;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifier of a suite record issued by a [`ReportSink`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SuiteId(Uuid);

/// Identifier of a test-case record issued by a [`ReportSink`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TestCaseId(Uuid);

/// Identifier of a step record issued by a [`ReportSink`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct StepId(Uuid);

macro_rules! impl_id {
    ($id:ident) => {
        impl $id {
            /// Mints a fresh identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_id!(SuiteId);
impl_id!(TestCaseId);
impl_id!(StepId);

/// The data carried by a suite-started operation.
#[derive(Clone, Debug)]
pub struct SuiteStart {
    /// The fully qualified suite name.
    pub name: String,

    /// A title override mined from class-level annotations.
    pub title: Option<String>,

    /// A description mined from class-level annotations.
    pub description: Option<String>,
}

impl SuiteStart {
    /// Creates a new `SuiteStart` with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
        }
    }
}

/// The data carried by a test-case-started operation.
#[derive(Clone, Debug)]
pub struct TestCaseStart {
    /// The display name, as reported by the runner (data-set suffix
    /// included).
    pub name: String,

    /// A description mined from method-level annotations.
    pub description: Option<String>,

    /// Labels mined from method-level annotations (issues, severity).
    pub labels: Vec<Label>,

    /// The parameters the test case was invoked with.
    pub parameters: Vec<Parameter>,
}

impl TestCaseStart {
    /// Creates a new `TestCaseStart` with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            labels: vec![],
            parameters: vec![],
        }
    }
}

/// The non-passed outcome kinds a translator can assign to a test case.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusKind {
    /// An assertion failed.
    Failed,

    /// The test errored in an unexpected way.
    Broken,

    /// The test is marked incomplete.
    Pending,

    /// The test was skipped.
    Canceled,
}

impl StatusKind {
    fn to_status(self) -> Status {
        match self {
            StatusKind::Failed => Status::Failed,
            StatusKind::Broken => Status::Broken,
            StatusKind::Pending => Status::Pending,
            StatusKind::Canceled => Status::Canceled,
        }
    }
}

/// The write side of the report model.
///
/// Operations must arrive in valid nesting order: one open suite at a time,
/// test cases inside an open suite, steps inside the open test case. The
/// sink assigns identifiers and timestamps.
pub trait ReportSink {
    /// Opens a suite record.
    fn begin_suite(&mut self, suite: SuiteStart) -> Result<SuiteId, SinkError>;

    /// Closes a suite record and persists it.
    fn end_suite(&mut self, suite_id: SuiteId) -> Result<(), SinkError>;

    /// Opens a test-case record under an open suite.
    fn begin_test_case(
        &mut self,
        suite_id: SuiteId,
        test_case: TestCaseStart,
    ) -> Result<TestCaseId, SinkError>;

    /// Overrides the title of the open test case.
    fn set_test_title(&mut self, test_id: TestCaseId, title: &str) -> Result<(), SinkError>;

    /// Records the outcome of the open test case.
    fn set_test_status(
        &mut self,
        test_id: TestCaseId,
        kind: StatusKind,
        message: &str,
    ) -> Result<(), SinkError>;

    /// Closes the open test-case record.
    fn end_test_case(&mut self, test_id: TestCaseId) -> Result<(), SinkError>;

    /// Opens a step record inside the open test case.
    fn begin_step(&mut self, name: &str) -> Result<StepId, SinkError>;

    /// Closes the innermost open step record.
    fn end_step(&mut self, step_id: StepId) -> Result<(), SinkError>;
}

/// The production [`ReportSink`]: assembles [`allure_model`] records and
/// writes one `<uuid>-testsuite.xml` file per suite into the output
/// directory.
///
/// If the host process terminates abnormally, the open suite is never
/// serialized and open steps keep no stop timestamp; unterminated records
/// are a documented limitation of the synchronous lifecycle.
#[derive(Debug)]
pub struct AllureFileSink {
    output_directory: Utf8PathBuf,
    suite: Option<OpenSuite>,
}

#[derive(Debug)]
struct OpenSuite {
    id: SuiteId,
    suite: TestSuite,
    test_case: Option<OpenTestCase>,
}

#[derive(Debug)]
struct OpenTestCase {
    id: TestCaseId,
    test_case: TestCase,
    steps: Vec<OpenStep>,
}

#[derive(Debug)]
struct OpenStep {
    id: StepId,
    step: Step,
}

impl AllureFileSink {
    /// Creates a file sink, preparing the configured output directory.
    ///
    /// The directory is created if missing; when `delete_previous_results`
    /// is set, existing `*.xml` files in it are removed first.
    pub fn new(config: &ReporterConfig) -> Result<Self, PrepareOutputError> {
        prepare_output_directory(config.output_directory(), config.delete_previous_results())?;
        Ok(Self {
            output_directory: config.output_directory().to_owned(),
            suite: None,
        })
    }

    /// Returns the output directory records are written to.
    pub fn output_directory(&self) -> &Utf8Path {
        &self.output_directory
    }

    fn open_suite_mut(
        &mut self,
        suite_id: SuiteId,
        event: &'static str,
    ) -> Result<&mut OpenSuite, SinkError> {
        match &mut self.suite {
            Some(open) if open.id == suite_id => Ok(open),
            Some(_) => Err(SinkError::OutOfOrder {
                event,
                reason: "identifier does not match the open suite",
            }),
            None => Err(SinkError::OutOfOrder {
                event,
                reason: "no suite is open",
            }),
        }
    }

    fn open_test_case_mut(
        &mut self,
        test_id: TestCaseId,
        event: &'static str,
    ) -> Result<&mut OpenTestCase, SinkError> {
        let open = match &mut self.suite {
            Some(open) => open,
            None => {
                return Err(SinkError::OutOfOrder {
                    event,
                    reason: "no suite is open",
                })
            }
        };
        match &mut open.test_case {
            Some(case) if case.id == test_id => Ok(case),
            Some(_) => Err(SinkError::OutOfOrder {
                event,
                reason: "identifier does not match the open test case",
            }),
            None => Err(SinkError::OutOfOrder {
                event,
                reason: "no test case is open",
            }),
        }
    }
}

impl ReportSink for AllureFileSink {
    fn begin_suite(&mut self, suite: SuiteStart) -> Result<SuiteId, SinkError> {
        if self.suite.is_some() {
            return Err(SinkError::OutOfOrder {
                event: "suite-started",
                reason: "another suite is still open",
            });
        }

        let SuiteStart {
            name,
            title,
            description,
        } = suite;

        let mut record = TestSuite::new(name);
        record.set_start(Utc::now());
        if let Some(title) = title {
            record.set_title(title);
        }
        if let Some(description) = description {
            record.set_description(description);
        }

        let id = SuiteId::new();
        self.suite = Some(OpenSuite {
            id,
            suite: record,
            test_case: None,
        });
        Ok(id)
    }

    fn end_suite(&mut self, suite_id: SuiteId) -> Result<(), SinkError> {
        // Validate before taking so a mismatched id leaves the suite open.
        self.open_suite_mut(suite_id, "suite-finished")?;
        let mut open = self.suite.take().expect("suite was just validated");

        if let Some(case) = open.test_case.take() {
            warn!(
                test = %case.test_case.name,
                "suite finished with an open test case"
            );
            attach_test_case(&mut open.suite, case);
        }
        open.suite.set_stop(Utc::now());

        let file = self
            .output_directory
            .join(format!("{}-testsuite.xml", open.id));
        debug!(%file, "writing test-suite record");
        let f = File::create(&file).map_err(|error| SinkError::Fs {
            file: file.clone(),
            error,
        })?;
        open.suite
            .serialize(f)
            .map_err(|error| SinkError::Serialize { file, error })
    }

    fn begin_test_case(
        &mut self,
        suite_id: SuiteId,
        test_case: TestCaseStart,
    ) -> Result<TestCaseId, SinkError> {
        let open = self.open_suite_mut(suite_id, "test-case-started")?;
        if open.test_case.is_some() {
            return Err(SinkError::OutOfOrder {
                event: "test-case-started",
                reason: "another test case is still open",
            });
        }

        let TestCaseStart {
            name,
            description,
            labels,
            parameters,
        } = test_case;

        let mut record = TestCase::new(name);
        record.set_start(Utc::now());
        if let Some(description) = description {
            record.set_description(description);
        }
        for label in labels {
            record.add_label(label);
        }
        for parameter in parameters {
            record.add_parameter(parameter);
        }

        let id = TestCaseId::new();
        open.test_case = Some(OpenTestCase {
            id,
            test_case: record,
            steps: vec![],
        });
        Ok(id)
    }

    fn set_test_title(&mut self, test_id: TestCaseId, title: &str) -> Result<(), SinkError> {
        let case = self.open_test_case_mut(test_id, "test-title-set")?;
        case.test_case.set_title(title);
        Ok(())
    }

    fn set_test_status(
        &mut self,
        test_id: TestCaseId,
        kind: StatusKind,
        message: &str,
    ) -> Result<(), SinkError> {
        let case = self.open_test_case_mut(test_id, "test-status-set")?;
        case.test_case.set_status(kind.to_status());
        if !message.is_empty() {
            case.test_case.set_failure(Failure::new(message));
        }
        Ok(())
    }

    fn end_test_case(&mut self, test_id: TestCaseId) -> Result<(), SinkError> {
        self.open_test_case_mut(test_id, "test-case-finished")?;
        let open = self.suite.as_mut().expect("test case was just validated");
        let case = open
            .test_case
            .take()
            .expect("test case was just validated");
        attach_test_case(&mut open.suite, case);
        Ok(())
    }

    fn begin_step(&mut self, name: &str) -> Result<StepId, SinkError> {
        let open = match &mut self.suite {
            Some(open) => open,
            None => {
                return Err(SinkError::OutOfOrder {
                    event: "step-started",
                    reason: "no suite is open",
                })
            }
        };
        let case = match &mut open.test_case {
            Some(case) => case,
            None => {
                return Err(SinkError::OutOfOrder {
                    event: "step-started",
                    reason: "no test case is open",
                })
            }
        };

        let mut record = Step::new(name);
        record.set_start(Utc::now());
        let id = StepId::new();
        case.steps.push(OpenStep { id, step: record });
        Ok(id)
    }

    fn end_step(&mut self, step_id: StepId) -> Result<(), SinkError> {
        let case = match self.suite.as_mut().and_then(|open| open.test_case.as_mut()) {
            Some(case) => case,
            None => {
                return Err(SinkError::OutOfOrder {
                    event: "step-finished",
                    reason: "no test case is open",
                })
            }
        };
        match case.steps.last() {
            Some(open_step) if open_step.id == step_id => {}
            Some(_) => {
                return Err(SinkError::OutOfOrder {
                    event: "step-finished",
                    reason: "identifier does not match the innermost open step",
                })
            }
            None => {
                return Err(SinkError::OutOfOrder {
                    event: "step-finished",
                    reason: "no step is open",
                })
            }
        }

        let mut finished = case.steps.pop().expect("step was just validated");
        finished.step.set_stop(Utc::now());
        match case.steps.last_mut() {
            Some(parent) => {
                parent.step.add_step(finished.step);
            }
            None => {
                case.test_case.add_step(finished.step);
            }
        }
        Ok(())
    }
}

// Steps still open at this point (unpaired step events) are attached without
// stop timestamps rather than silently completed.
fn attach_test_case(suite: &mut TestSuite, mut case: OpenTestCase) {
    for open_step in case.steps.drain(..) {
        case.test_case.add_step(open_step.step);
    }
    case.test_case.set_stop(Utc::now());
    suite.add_test_case(case.test_case);
}

fn prepare_output_directory(
    dir: &Utf8Path,
    delete_previous_results: bool,
) -> Result<(), PrepareOutputError> {
    std::fs::create_dir_all(dir).map_err(|error| PrepareOutputError::Create {
        dir: dir.to_owned(),
        error,
    })?;

    if !delete_previous_results {
        return Ok(());
    }

    let entries = dir.read_dir_utf8().map_err(|error| PrepareOutputError::List {
        dir: dir.to_owned(),
        error,
    })?;
    for entry in entries {
        let entry = entry.map_err(|error| PrepareOutputError::List {
            dir: dir.to_owned(),
            error,
        })?;
        let path = entry.path();
        let is_file = entry.file_type().map(|ty| ty.is_file()).unwrap_or(false);
        if is_file && path.extension() == Some("xml") {
            debug!(%path, "removing previous result file");
            std::fs::remove_file(path).map_err(|error| PrepareOutputError::Remove {
                file: path.to_owned(),
                error,
            })?;
        }
    }
    Ok(())
}
