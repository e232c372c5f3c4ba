// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a [`TestSuite`] record.

use crate::{
    errors::SerializeError, Failure, Label, Parameter, Step, TestCase, TestSuite,
};
use chrono::{DateTime, Utc};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::io;

static TEST_SUITE_TAG: &str = "ns2:test-suite";
static MODEL_NAMESPACE: &str = "urn:model.allure.qatools.yandex.ru";
static NAME_TAG: &str = "name";
static TITLE_TAG: &str = "title";
static DESCRIPTION_TAG: &str = "description";
static TEST_CASES_TAG: &str = "test-cases";
static TEST_CASE_TAG: &str = "test-case";
static FAILURE_TAG: &str = "failure";
static MESSAGE_TAG: &str = "message";
static STACK_TRACE_TAG: &str = "stack-trace";
static STEPS_TAG: &str = "steps";
static STEP_TAG: &str = "step";
static LABELS_TAG: &str = "labels";
static LABEL_TAG: &str = "label";
static PARAMETERS_TAG: &str = "parameters";
static PARAMETER_TAG: &str = "parameter";

pub(crate) fn serialize_suite(
    suite: &TestSuite,
    writer: impl io::Write,
) -> Result<(), SerializeError> {
    let mut writer = Writer::new_with_indent(writer, b' ', 4);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;

    serialize_suite_impl(suite, &mut writer)?;

    // Trailing newline.
    let mut inner = writer.into_inner();
    inner.write_all(b"\n")?;
    Ok(())
}

fn serialize_suite_impl(
    suite: &TestSuite,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let TestSuite {
        name,
        title,
        description,
        start,
        stop,
        test_cases,
        labels,
    } = suite;

    let mut suite_tag = BytesStart::new(TEST_SUITE_TAG);
    suite_tag.push_attribute(("xmlns:ns2", MODEL_NAMESPACE));
    push_timestamps(&mut suite_tag, start, stop);
    writer.write_event(Event::Start(suite_tag))?;

    serialize_text_element(NAME_TAG, name, writer)?;
    if let Some(title) = title {
        serialize_text_element(TITLE_TAG, title, writer)?;
    }
    if let Some(description) = description {
        serialize_text_element(DESCRIPTION_TAG, description, writer)?;
    }

    serialize_empty_start_tag(TEST_CASES_TAG, writer)?;
    for test_case in test_cases {
        serialize_test_case(test_case, writer)?;
    }
    serialize_end_tag(TEST_CASES_TAG, writer)?;

    serialize_labels(labels, writer)?;

    serialize_end_tag(TEST_SUITE_TAG, writer)?;
    writer.write_event(Event::Eof)?;

    Ok(())
}

fn serialize_test_case(
    test_case: &TestCase,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let TestCase {
        name,
        title,
        description,
        status,
        failure,
        start,
        stop,
        steps,
        labels,
        parameters,
    } = test_case;

    let mut test_case_tag = BytesStart::new(TEST_CASE_TAG);
    push_timestamps(&mut test_case_tag, start, stop);
    test_case_tag.push_attribute(("status", status.as_str()));
    writer.write_event(Event::Start(test_case_tag))?;

    serialize_text_element(NAME_TAG, name, writer)?;
    if let Some(title) = title {
        serialize_text_element(TITLE_TAG, title, writer)?;
    }
    if let Some(description) = description {
        serialize_text_element(DESCRIPTION_TAG, description, writer)?;
    }
    if let Some(failure) = failure {
        serialize_failure(failure, writer)?;
    }
    serialize_steps(steps, writer)?;
    serialize_labels(labels, writer)?;

    if !parameters.is_empty() {
        serialize_empty_start_tag(PARAMETERS_TAG, writer)?;
        for parameter in parameters {
            serialize_parameter(parameter, writer)?;
        }
        serialize_end_tag(PARAMETERS_TAG, writer)?;
    }

    serialize_end_tag(TEST_CASE_TAG, writer)?;

    Ok(())
}

fn serialize_failure(
    failure: &Failure,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let Failure {
        message,
        stack_trace,
    } = failure;

    serialize_empty_start_tag(FAILURE_TAG, writer)?;
    serialize_text_element(MESSAGE_TAG, message, writer)?;
    if let Some(stack_trace) = stack_trace {
        serialize_text_element(STACK_TRACE_TAG, stack_trace, writer)?;
    }
    serialize_end_tag(FAILURE_TAG, writer)?;

    Ok(())
}

fn serialize_steps(
    steps: &[Step],
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    if steps.is_empty() {
        return Ok(());
    }

    serialize_empty_start_tag(STEPS_TAG, writer)?;
    for step in steps {
        serialize_step(step, writer)?;
    }
    serialize_end_tag(STEPS_TAG, writer)?;

    Ok(())
}

fn serialize_step(step: &Step, writer: &mut Writer<impl io::Write>) -> Result<(), SerializeError> {
    let Step {
        name,
        status,
        start,
        stop,
        steps,
    } = step;

    let mut step_tag = BytesStart::new(STEP_TAG);
    push_timestamps(&mut step_tag, start, stop);
    step_tag.push_attribute(("status", status.as_str()));
    writer.write_event(Event::Start(step_tag))?;

    serialize_text_element(NAME_TAG, name, writer)?;
    serialize_steps(steps, writer)?;

    serialize_end_tag(STEP_TAG, writer)?;

    Ok(())
}

fn serialize_labels(
    labels: &[Label],
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    if labels.is_empty() {
        return Ok(());
    }

    serialize_empty_start_tag(LABELS_TAG, writer)?;
    for label in labels {
        let mut label_tag = BytesStart::new(LABEL_TAG);
        label_tag.extend_attributes([
            ("name", label.name.as_str()),
            ("value", label.value.as_str()),
        ]);
        writer.write_event(Event::Empty(label_tag))?;
    }
    serialize_end_tag(LABELS_TAG, writer)?;

    Ok(())
}

fn serialize_parameter(
    parameter: &Parameter,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let Parameter { name, value, kind } = parameter;

    let mut parameter_tag = BytesStart::new(PARAMETER_TAG);
    parameter_tag.extend_attributes([
        ("name", name.as_str()),
        ("value", value.as_str()),
        ("kind", kind.as_str()),
    ]);
    writer.write_event(Event::Empty(parameter_tag))
        .map_err(SerializeError::from)
}

fn serialize_text_element(
    tag_name: &'static str,
    text: &str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_empty_start_tag(tag_name, writer)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    serialize_end_tag(tag_name, writer)?;

    Ok(())
}

fn serialize_empty_start_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let tag = BytesStart::new(tag_name);
    writer.write_event(Event::Start(tag)).map_err(SerializeError::from)
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let end_tag = BytesEnd::new(tag_name);
    writer.write_event(Event::End(end_tag)).map_err(SerializeError::from)
}

fn push_timestamps(
    tag: &mut BytesStart<'_>,
    start: &Option<DateTime<Utc>>,
    stop: &Option<DateTime<Utc>>,
) {
    // Times are serialized as milliseconds since the epoch.
    if let Some(start) = start {
        tag.push_attribute(("start", start.timestamp_millis().to_string().as_str()));
    }
    if let Some(stop) = stop {
        tag.push_attribute(("stop", stop.timestamp_millis().to_string().as_str()));
    }
}
