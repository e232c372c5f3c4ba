// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The lifecycle translator.
//!
//! [`AllureReporter`] receives one runner event at a time and emits the
//! correctly ordered sequence of [`ReportSink`] operations. It owns the only
//! mutable state in the pipeline: which suite is open, which test is active,
//! and which steps are on the stack.

use crate::{
    annotations::{Annotation, AnnotationSource},
    config::ReporterConfig,
    errors::{PrepareOutputError, SinkError},
    events::{FailureDetails, StepRecord, TestDescriptor},
    format,
    sink::{
        AllureFileSink, ReportSink, StatusKind, StepId, SuiteId, SuiteStart, TestCaseId,
        TestCaseStart,
    },
};
use allure_model::{Label, Parameter};
use swrite::{swrite, SWrite};
use tracing::{debug, warn};

/// The marker a runner embeds in test names for data-provider invocations.
const DATA_SET_MARKER: &str = "with data set";

/// Translates runner lifecycle events into report sink operations.
///
/// One instance is constructed per run and handed to the runner's
/// event-subscription point; there is no process-wide accessor. Events must
/// arrive strictly sequentially, in the order the runner produces them.
///
/// Suite identity is derived from the test's declaring class, prefixed with
/// the runner-reported suite name: one runner suite may span several classes,
/// and each class gets its own report suite. The open suite is closed
/// whenever a test from a different class starts, and once more by the final
/// suite-after event.
pub struct AllureReporter<S, A> {
    sink: S,
    annotations: A,
    arguments_length: usize,
    issues_in_test_name: bool,
    root_prefix: String,
    suite: Option<OpenSuite>,
    active_test: Option<ActiveTestState>,
    step_stack: Vec<StepId>,
}

struct OpenSuite {
    qualified_name: String,
    id: SuiteId,
}

/// State held between a test-start and the matching test-end event.
struct ActiveTestState {
    id: TestCaseId,
    raw_name: String,
    base_name: String,
    data_set: Option<String>,
    issues: Vec<String>,
}

impl<A: AnnotationSource> AllureReporter<AllureFileSink, A> {
    /// Creates a reporter writing records through an [`AllureFileSink`],
    /// preparing the output directory.
    pub fn with_file_sink(
        config: &ReporterConfig,
        annotations: A,
    ) -> Result<Self, PrepareOutputError> {
        let sink = AllureFileSink::new(config)?;
        Ok(Self::new(config, sink, annotations))
    }
}

impl<S: ReportSink, A: AnnotationSource> AllureReporter<S, A> {
    /// Creates a reporter over an arbitrary sink.
    pub fn new(config: &ReporterConfig, sink: S, annotations: A) -> Self {
        Self {
            sink,
            annotations,
            arguments_length: config.arguments_length(),
            issues_in_test_name: config.issues_in_test_name(),
            root_prefix: String::new(),
            suite: None,
            active_test: None,
            step_stack: vec![],
        }
    }

    /// Returns the sink this reporter writes to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// A runner suite is about to execute.
    ///
    /// Only records the name prefix; report suites are opened lazily by the
    /// first test of each class.
    pub fn on_suite_before(&mut self, suite_name: &str) {
        self.root_prefix = format!("{suite_name}.");
    }

    /// A test is about to execute.
    pub fn on_test_start(&mut self, test: TestDescriptor) -> Result<(), SinkError> {
        self.active_test = None;
        self.step_stack.clear();

        let declaring_class = test.declaring_class().to_owned();
        let suite_id = self.ensure_suite(&declaring_class)?;

        let (raw_name, base_name, data_set, parameters) = match test {
            TestDescriptor::Plain { name, .. } => {
                let (base_name, data_set) = split_data_set(&name);
                (name, base_name, data_set, vec![])
            }
            TestDescriptor::Scenario {
                feature,
                method_name,
                mut examples,
                ..
            } => {
                let data_set = examples
                    .shift_remove("dataset")
                    .map(|value| format!("| \"{value}\""));
                let parameters = examples
                    .into_iter()
                    .map(|(name, value)| Parameter::argument(name, value))
                    .collect();
                (feature, method_name, data_set, parameters)
            }
        };

        let annotations = self
            .annotations
            .method_annotations(&declaring_class, &base_name);

        let mut case_start = TestCaseStart::new(raw_name.as_str());
        case_start.parameters = parameters;
        let mut title = None;
        let mut issue_keys = vec![];
        for annotation in annotations {
            match annotation {
                Annotation::Title(value) => {
                    if title.is_none() {
                        title = Some(value);
                    }
                }
                Annotation::Description(value) => {
                    case_start.description = Some(value);
                }
                Annotation::Issues(keys) => {
                    for key in keys {
                        case_start.labels.push(Label::issue(&key));
                        issue_keys.push(key);
                    }
                }
                Annotation::Severity(severity) => {
                    case_start.labels.push(Label::severity(severity.as_str()));
                }
                Annotation::Other { .. } => {}
            }
        }

        let id = self.sink.begin_test_case(suite_id, case_start)?;

        let mut state = ActiveTestState {
            id,
            raw_name,
            base_name,
            data_set,
            issues: vec![],
        };
        if let Some(title) = title {
            if self.issues_in_test_name {
                state.issues = issue_keys;
            }
            let composed = compose_title(&state.issues, &title, state.data_set.as_deref());
            self.sink.set_test_title(id, &composed)?;
        }
        self.active_test = Some(state);
        Ok(())
    }

    /// The active test failed an assertion.
    pub fn on_test_fail(&mut self, failure: &FailureDetails) -> Result<(), SinkError> {
        self.record_status(StatusKind::Failed, format::failure_message(failure))
    }

    /// The active test errored in an unexpected way.
    pub fn on_test_error(&mut self, failure: &FailureDetails) -> Result<(), SinkError> {
        self.record_status(StatusKind::Broken, format::broken_message(failure))
    }

    /// The active test is incomplete.
    pub fn on_test_incomplete(&mut self, failure: &FailureDetails) -> Result<(), SinkError> {
        self.record_status(StatusKind::Pending, failure.message.clone())
    }

    /// The active test was skipped.
    pub fn on_test_skipped(&mut self, failure: &FailureDetails) -> Result<(), SinkError> {
        self.record_status(StatusKind::Canceled, failure.message.clone())
    }

    /// The active test finished, whatever its outcome.
    pub fn on_test_end(&mut self) -> Result<(), SinkError> {
        match self.active_test.take() {
            Some(active) => {
                debug!(test = %active.base_name, "test case finished");
                self.sink.end_test_case(active.id)
            }
            None => {
                warn!("test-finished event with no active test case");
                Ok(())
            }
        }
    }

    /// A step is about to execute inside the active test.
    pub fn on_step_before(&mut self, step: &StepRecord) -> Result<(), SinkError> {
        let name = format::step_name(&step.action, &step.arguments, self.arguments_length);
        let id = self.sink.begin_step(&name)?;
        self.step_stack.push(id);
        Ok(())
    }

    /// The innermost step finished.
    pub fn on_step_after(&mut self) -> Result<(), SinkError> {
        match self.step_stack.pop() {
            Some(id) => self.sink.end_step(id),
            None => {
                warn!("step-finished event with no open step");
                Ok(())
            }
        }
    }

    /// The runner suite finished; closes the open report suite, if any.
    pub fn on_suite_after(&mut self) -> Result<(), SinkError> {
        match self.suite.take() {
            Some(open) => self.sink.end_suite(open.id),
            None => Ok(()),
        }
    }

    /// Opens the report suite for `declaring_class`, closing the previous
    /// one if the class changed. Class-level annotation enrichment happens
    /// exactly once per suite open; same-suite test starts are no-ops here.
    fn ensure_suite(&mut self, declaring_class: &str) -> Result<SuiteId, SinkError> {
        let qualified_name = format!("{}{declaring_class}", self.root_prefix);
        if let Some(open) = &self.suite {
            if open.qualified_name == qualified_name {
                return Ok(open.id);
            }
        }
        if let Some(open) = self.suite.take() {
            // The suite changed under us.
            self.sink.end_suite(open.id)?;
        }

        let mut start = SuiteStart::new(qualified_name.as_str());
        for annotation in self.annotations.class_annotations(declaring_class) {
            match annotation {
                Annotation::Title(value) => start.title = Some(value),
                Annotation::Description(value) => start.description = Some(value),
                _ => {}
            }
        }

        let id = self.sink.begin_suite(start)?;
        self.suite = Some(OpenSuite { qualified_name, id });
        Ok(id)
    }

    fn record_status(&mut self, kind: StatusKind, message: String) -> Result<(), SinkError> {
        let active = match &self.active_test {
            Some(active) => active,
            None => {
                warn!("status event with no active test case");
                return Ok(());
            }
        };
        debug!(test = %active.raw_name, ?kind, "recording test status");
        let message = format::prefix_issues(&active.issues, &message);
        self.sink.set_test_status(active.id, kind, &message)
    }
}

fn split_data_set(raw_name: &str) -> (String, Option<String>) {
    match raw_name.find(DATA_SET_MARKER) {
        Some(pos) => {
            let base_name = raw_name[..pos].trim_end().to_owned();
            let data_set = format!("|{}", &raw_name[pos + DATA_SET_MARKER.len()..]);
            (base_name, Some(data_set))
        }
        None => (raw_name.to_owned(), None),
    }
}

fn compose_title(issues: &[String], title: &str, data_set: Option<&str>) -> String {
    let mut composed = String::new();
    if !issues.is_empty() {
        swrite!(composed, "{} ", issues.join(" "));
    }
    composed.push_str(title);
    if let Some(data_set) = data_set {
        swrite!(composed, " {data_set}");
    }
    composed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotations::AnnotationRegistry,
        config::AllureConfig,
        events::ExpectationDiff,
        test_helpers::{RecordingSink, SinkOp},
    };
    use camino::Utf8Path;
    use indexmap::indexmap;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn reporter(
        issues_in_test_name: bool,
        annotations: AnnotationRegistry,
    ) -> AllureReporter<RecordingSink, AnnotationRegistry> {
        let config = AllureConfig {
            issues_in_test_name,
            ..AllureConfig::default()
        }
        .evaluate(Utf8Path::new("/tmp/out"))
        .expect("default config is valid");
        AllureReporter::new(&config, RecordingSink::default(), annotations)
    }

    fn plain(name: &str, declaring_class: &str) -> TestDescriptor {
        TestDescriptor::Plain {
            name: name.to_owned(),
            declaring_class: declaring_class.to_owned(),
        }
    }

    fn case_started(suite: &str, name: &str) -> SinkOp {
        SinkOp::TestCaseStarted {
            suite: suite.to_owned(),
            name: name.to_owned(),
            description: None,
            labels: vec![],
            parameters: vec![],
        }
    }

    #[test]
    fn suites_are_deduplicated_and_closed_on_class_change() {
        let mut reporter = reporter(false, AnnotationRegistry::new());

        reporter.on_suite_before("unit");
        reporter.on_test_start(plain("testOne", "FooTest")).unwrap();
        reporter.on_test_end().unwrap();
        reporter.on_test_start(plain("testTwo", "FooTest")).unwrap();
        reporter.on_test_end().unwrap();
        reporter.on_test_start(plain("testBar", "BarTest")).unwrap();
        reporter.on_test_end().unwrap();
        reporter.on_suite_after().unwrap();

        assert_eq!(
            reporter.sink().ops(),
            vec![
                SinkOp::SuiteStarted {
                    name: "unit.FooTest".to_owned(),
                    title: None,
                    description: None,
                },
                case_started("unit.FooTest", "testOne"),
                SinkOp::TestCaseFinished {
                    name: "testOne".to_owned()
                },
                case_started("unit.FooTest", "testTwo"),
                SinkOp::TestCaseFinished {
                    name: "testTwo".to_owned()
                },
                SinkOp::SuiteFinished {
                    name: "unit.FooTest".to_owned()
                },
                SinkOp::SuiteStarted {
                    name: "unit.BarTest".to_owned(),
                    title: None,
                    description: None,
                },
                case_started("unit.BarTest", "testBar"),
                SinkOp::TestCaseFinished {
                    name: "testBar".to_owned()
                },
                SinkOp::SuiteFinished {
                    name: "unit.BarTest".to_owned()
                },
            ],
        );
    }

    #[test]
    fn suite_is_opened_without_suite_before() {
        let mut reporter = reporter(false, AnnotationRegistry::new());
        reporter.on_test_start(plain("testOne", "FooTest")).unwrap();

        assert_eq!(
            reporter.sink().ops()[0],
            SinkOp::SuiteStarted {
                name: "FooTest".to_owned(),
                title: None,
                description: None,
            },
        );
    }

    #[test]
    fn suite_start_is_enriched_from_class_annotations() {
        let mut annotations = AnnotationRegistry::new();
        annotations.register_class(
            "FooTest",
            [("title", "Foo features"), ("description", "All about foo")],
        );
        let mut reporter = reporter(false, annotations);

        reporter.on_suite_before("unit");
        reporter.on_test_start(plain("testOne", "FooTest")).unwrap();

        assert_eq!(
            reporter.sink().ops()[0],
            SinkOp::SuiteStarted {
                name: "unit.FooTest".to_owned(),
                title: Some("Foo features".to_owned()),
                description: Some("All about foo".to_owned()),
            },
        );
    }

    #[test]
    fn class_annotations_are_queried_once_per_suite_open() {
        struct CountingSource {
            class_queries: Cell<usize>,
        }

        impl AnnotationSource for CountingSource {
            fn class_annotations(&self, _class_name: &str) -> Vec<Annotation> {
                self.class_queries.set(self.class_queries.get() + 1);
                vec![]
            }

            fn method_annotations(
                &self,
                _class_name: &str,
                _method_name: &str,
            ) -> Vec<Annotation> {
                vec![]
            }
        }

        let config = AllureConfig::default()
            .evaluate(Utf8Path::new("/tmp/out"))
            .unwrap();
        let source = CountingSource {
            class_queries: Cell::new(0),
        };
        let mut reporter = AllureReporter::new(&config, RecordingSink::default(), source);

        reporter.on_test_start(plain("testOne", "FooTest")).unwrap();
        reporter.on_test_end().unwrap();
        reporter.on_test_start(plain("testTwo", "FooTest")).unwrap();
        reporter.on_test_end().unwrap();

        assert_eq!(reporter.annotations.class_queries.get(), 1);
    }

    #[test]
    fn title_and_issues_compose_when_option_enabled() {
        let mut annotations = AnnotationRegistry::new();
        annotations.register_method(
            "LoginTest",
            "testLogin",
            [("title", "Login works"), ("issues", "JIRA-1, JIRA-2")],
        );
        let mut reporter = reporter(true, annotations);

        reporter.on_suite_before("acceptance");
        reporter
            .on_test_start(plain("testLogin", "LoginTest"))
            .unwrap();
        reporter
            .on_test_fail(&FailureDetails::new("boom", "AssertionError"))
            .unwrap();
        reporter.on_test_end().unwrap();

        let ops = reporter.sink().ops();
        assert_eq!(
            ops[1],
            SinkOp::TestCaseStarted {
                suite: "acceptance.LoginTest".to_owned(),
                name: "testLogin".to_owned(),
                description: None,
                labels: vec![
                    ("issue".to_owned(), "JIRA-1".to_owned()),
                    ("issue".to_owned(), "JIRA-2".to_owned()),
                ],
                parameters: vec![],
            },
        );
        assert_eq!(
            ops[2],
            SinkOp::TestTitleSet {
                title: "JIRA-1 JIRA-2 Login works".to_owned()
            },
        );
        assert_eq!(
            ops[3],
            SinkOp::TestStatusSet {
                kind: StatusKind::Failed,
                message: "JIRA-1 JIRA-2\nboom".to_owned(),
            },
        );
    }

    #[test]
    fn issues_stay_out_of_names_when_option_disabled() {
        let mut annotations = AnnotationRegistry::new();
        annotations.register_method(
            "LoginTest",
            "testLogin",
            [("title", "Login works"), ("issues", "JIRA-1")],
        );
        let mut reporter = reporter(false, annotations);

        reporter
            .on_test_start(plain("testLogin", "LoginTest"))
            .unwrap();
        reporter
            .on_test_fail(&FailureDetails::new("boom", "AssertionError"))
            .unwrap();

        let ops = reporter.sink().ops();
        // Issue labels are attached regardless; only names and messages are
        // gated by the option.
        assert_eq!(
            ops[1],
            SinkOp::TestCaseStarted {
                suite: "LoginTest".to_owned(),
                name: "testLogin".to_owned(),
                description: None,
                labels: vec![("issue".to_owned(), "JIRA-1".to_owned())],
                parameters: vec![],
            },
        );
        assert_eq!(
            ops[2],
            SinkOp::TestTitleSet {
                title: "Login works".to_owned()
            },
        );
        assert_eq!(
            ops[3],
            SinkOp::TestStatusSet {
                kind: StatusKind::Failed,
                message: "boom".to_owned(),
            },
        );
    }

    #[test]
    fn no_title_annotation_means_no_title_override() {
        let mut reporter = reporter(true, AnnotationRegistry::new());
        reporter.on_test_start(plain("testOne", "FooTest")).unwrap();

        let ops = reporter.sink().ops();
        assert!(
            !ops.iter()
                .any(|op| matches!(op, SinkOp::TestTitleSet { .. })),
            "unexpected title override: {ops:?}"
        );
    }

    #[test]
    fn data_set_names_split_and_stay_verbatim() {
        let mut annotations = AnnotationRegistry::new();
        annotations.register_method("MathTest", "testAdd", [("title", "Add numbers")]);
        let mut reporter = reporter(false, annotations);

        reporter
            .on_test_start(plain("testAdd with data set #2", "MathTest"))
            .unwrap();

        let ops = reporter.sink().ops();
        // The display name keeps the data-set decoration verbatim; the
        // annotation lookup used the base name.
        assert_eq!(ops[1], case_started("MathTest", "testAdd with data set #2"));
        assert_eq!(
            ops[2],
            SinkOp::TestTitleSet {
                title: "Add numbers | #2".to_owned()
            },
        );
    }

    #[test]
    fn scenario_dataset_becomes_suffix_and_parameters() {
        let mut annotations = AnnotationRegistry::new();
        annotations.register_method("CartCest", "checkCart", [("title", "Cart works")]);
        let mut reporter = reporter(false, annotations);

        reporter
            .on_test_start(TestDescriptor::Scenario {
                feature: "check cart totals".to_owned(),
                method_name: "checkCart".to_owned(),
                declaring_class: "CartCest".to_owned(),
                examples: indexmap! {
                    "dataset".to_owned() => "guest".to_owned(),
                    "qty".to_owned() => "2".to_owned(),
                },
            })
            .unwrap();

        let ops = reporter.sink().ops();
        assert_eq!(
            ops[1],
            SinkOp::TestCaseStarted {
                suite: "CartCest".to_owned(),
                name: "check cart totals".to_owned(),
                description: None,
                labels: vec![],
                parameters: vec![("qty".to_owned(), "2".to_owned())],
            },
        );
        assert_eq!(
            ops[2],
            SinkOp::TestTitleSet {
                title: "Cart works | \"guest\"".to_owned()
            },
        );
    }

    #[test]
    fn status_kinds_map_to_their_events() {
        let mut reporter = reporter(false, AnnotationRegistry::new());
        reporter.on_test_start(plain("testOne", "FooTest")).unwrap();
        reporter
            .on_test_error(&FailureDetails::new("", "RuntimeException"))
            .unwrap();
        reporter.on_test_end().unwrap();

        reporter.on_test_start(plain("testTwo", "FooTest")).unwrap();
        reporter
            .on_test_incomplete(&FailureDetails::new("not done yet", "Incomplete"))
            .unwrap();
        reporter.on_test_end().unwrap();

        reporter.on_test_start(plain("testThree", "FooTest")).unwrap();
        reporter
            .on_test_skipped(&FailureDetails::new("requires db", "Skipped"))
            .unwrap();
        reporter.on_test_end().unwrap();

        let statuses: Vec<_> = reporter
            .sink()
            .ops()
            .into_iter()
            .filter(|op| matches!(op, SinkOp::TestStatusSet { .. }))
            .collect();
        assert_eq!(
            statuses,
            vec![
                SinkOp::TestStatusSet {
                    kind: StatusKind::Broken,
                    message: "RuntimeException".to_owned(),
                },
                SinkOp::TestStatusSet {
                    kind: StatusKind::Pending,
                    message: "not done yet".to_owned(),
                },
                SinkOp::TestStatusSet {
                    kind: StatusKind::Canceled,
                    message: "requires db".to_owned(),
                },
            ],
        );
    }

    #[test]
    fn failed_status_carries_diff_block() {
        let mut reporter = reporter(false, AnnotationRegistry::new());
        reporter.on_test_start(plain("testOne", "FooTest")).unwrap();
        reporter
            .on_test_fail(
                &FailureDetails::new("values differ", "AssertionError")
                    .with_diff(ExpectationDiff::new("foo", "bar")),
            )
            .unwrap();

        assert_eq!(
            reporter.sink().ops()[2],
            SinkOp::TestStatusSet {
                kind: StatusKind::Failed,
                message: "values differ\n- Expected | + Actual\n-foo\n+bar".to_owned(),
            },
        );
    }

    #[test]
    fn test_end_without_status_emits_single_finish() {
        let mut reporter = reporter(false, AnnotationRegistry::new());
        reporter.on_test_start(plain("testOne", "FooTest")).unwrap();
        reporter.on_test_end().unwrap();
        reporter.on_suite_after().unwrap();

        assert_eq!(
            reporter.sink().ops(),
            vec![
                SinkOp::SuiteStarted {
                    name: "FooTest".to_owned(),
                    title: None,
                    description: None,
                },
                case_started("FooTest", "testOne"),
                SinkOp::TestCaseFinished {
                    name: "testOne".to_owned()
                },
                SinkOp::SuiteFinished {
                    name: "FooTest".to_owned()
                },
            ],
        );
    }

    #[test]
    fn steps_nest_and_pair() {
        let mut reporter = reporter(false, AnnotationRegistry::new());
        reporter.on_test_start(plain("testOne", "FooTest")).unwrap();
        reporter
            .on_step_before(&StepRecord::new("open", "shop.page"))
            .unwrap();
        reporter
            .on_step_before(&StepRecord::new("click", "buy"))
            .unwrap();
        reporter.on_step_after().unwrap();
        reporter.on_step_after().unwrap();

        let ops = reporter.sink().ops();
        assert_eq!(
            ops[2..].to_vec(),
            vec![
                SinkOp::StepStarted {
                    name: "open shop\u{2022}page".to_owned()
                },
                SinkOp::StepStarted {
                    name: "click buy".to_owned()
                },
                SinkOp::StepFinished {
                    name: "click buy".to_owned()
                },
                SinkOp::StepFinished {
                    name: "open shop\u{2022}page".to_owned()
                },
            ],
        );
    }

    #[test]
    fn stray_events_are_tolerated() {
        let mut reporter = reporter(false, AnnotationRegistry::new());

        // None of these have an active test or open step; all must be
        // swallowed without a sink operation.
        reporter
            .on_test_fail(&FailureDetails::new("boom", "AssertionError"))
            .unwrap();
        reporter.on_test_end().unwrap();
        reporter.on_step_after().unwrap();
        reporter.on_suite_after().unwrap();

        assert_eq!(reporter.sink().ops(), vec![]);
    }
}
