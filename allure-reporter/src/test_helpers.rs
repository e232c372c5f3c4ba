// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test-only sink that records operations for order-sensitive assertions.

use crate::{
    errors::SinkError,
    sink::{ReportSink, StatusKind, StepId, SuiteId, SuiteStart, TestCaseId, TestCaseStart},
};
use std::collections::HashMap;

/// One recorded sink operation, with identifiers resolved back to names.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum SinkOp {
    SuiteStarted {
        name: String,
        title: Option<String>,
        description: Option<String>,
    },
    SuiteFinished {
        name: String,
    },
    TestCaseStarted {
        suite: String,
        name: String,
        description: Option<String>,
        labels: Vec<(String, String)>,
        parameters: Vec<(String, String)>,
    },
    TestTitleSet {
        title: String,
    },
    TestStatusSet {
        kind: StatusKind,
        message: String,
    },
    TestCaseFinished {
        name: String,
    },
    StepStarted {
        name: String,
    },
    StepFinished {
        name: String,
    },
}

/// A [`ReportSink`] that never fails and records every operation.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    ops: Vec<SinkOp>,
    suite_names: HashMap<SuiteId, String>,
    case_names: HashMap<TestCaseId, String>,
    step_names: HashMap<StepId, String>,
}

impl RecordingSink {
    /// Returns the operations recorded so far.
    pub(crate) fn ops(&self) -> Vec<SinkOp> {
        self.ops.clone()
    }
}

impl ReportSink for RecordingSink {
    fn begin_suite(&mut self, suite: SuiteStart) -> Result<SuiteId, SinkError> {
        let id = SuiteId::new();
        self.suite_names.insert(id, suite.name.clone());
        self.ops.push(SinkOp::SuiteStarted {
            name: suite.name,
            title: suite.title,
            description: suite.description,
        });
        Ok(id)
    }

    fn end_suite(&mut self, suite_id: SuiteId) -> Result<(), SinkError> {
        let name = self.suite_names[&suite_id].clone();
        self.ops.push(SinkOp::SuiteFinished { name });
        Ok(())
    }

    fn begin_test_case(
        &mut self,
        suite_id: SuiteId,
        test_case: TestCaseStart,
    ) -> Result<TestCaseId, SinkError> {
        let id = TestCaseId::new();
        self.case_names.insert(id, test_case.name.clone());
        self.ops.push(SinkOp::TestCaseStarted {
            suite: self.suite_names[&suite_id].clone(),
            name: test_case.name,
            description: test_case.description,
            labels: test_case
                .labels
                .into_iter()
                .map(|label| (label.name, label.value))
                .collect(),
            parameters: test_case
                .parameters
                .into_iter()
                .map(|parameter| (parameter.name, parameter.value))
                .collect(),
        });
        Ok(id)
    }

    fn set_test_title(&mut self, _test_id: TestCaseId, title: &str) -> Result<(), SinkError> {
        self.ops.push(SinkOp::TestTitleSet {
            title: title.to_owned(),
        });
        Ok(())
    }

    fn set_test_status(
        &mut self,
        _test_id: TestCaseId,
        kind: StatusKind,
        message: &str,
    ) -> Result<(), SinkError> {
        self.ops.push(SinkOp::TestStatusSet {
            kind,
            message: message.to_owned(),
        });
        Ok(())
    }

    fn end_test_case(&mut self, test_id: TestCaseId) -> Result<(), SinkError> {
        let name = self.case_names[&test_id].clone();
        self.ops.push(SinkOp::TestCaseFinished { name });
        Ok(())
    }

    fn begin_step(&mut self, name: &str) -> Result<StepId, SinkError> {
        let id = StepId::new();
        self.step_names.insert(id, name.to_owned());
        self.ops.push(SinkOp::StepStarted {
            name: name.to_owned(),
        });
        Ok(id)
    }

    fn end_step(&mut self, step_id: StepId) -> Result<(), SinkError> {
        let name = self.step_names[&step_id].clone();
        self.ops.push(SinkOp::StepFinished { name });
        Ok(())
    }
}
