// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure message and step-name formatting.

use crate::events::FailureDetails;
use similar::{ChangeTag, TextDiff};
use swrite::{swrite, SWrite};

/// The report format uses `.` as a hierarchical path separator, so literal
/// dots in step text would corrupt grouping. They are replaced with a bullet.
const DOT_SUBSTITUTE: &str = "\u{2022}";

/// Builds the display name of a step from its humanized action and
/// arguments.
///
/// Arguments are truncated to `max_arguments_len` characters before
/// concatenation. The result never contains a literal `.` character.
pub fn step_name(action: &str, arguments: &str, max_arguments_len: usize) -> String {
    let truncated: String = arguments.chars().take(max_arguments_len).collect();
    let mut name = String::with_capacity(action.len() + truncated.len() + 1);
    swrite!(name, "{action} {truncated}");
    name.replace('.', DOT_SUBSTITUTE)
}

/// Builds the report message for an assertion failure.
///
/// When the failure carries a structural expectation mismatch and the diff
/// is non-empty, a two-line `Expected | Actual` block is appended to the
/// original message.
pub fn failure_message(failure: &FailureDetails) -> String {
    let mut message = failure.message.clone();
    if let Some(diff) = &failure.diff {
        if let Some(block) = diff_block(&diff.expected, &diff.actual) {
            swrite!(message, "\n- Expected | + Actual\n{block}");
        }
    }
    message
}

/// Builds the report message for an unexpected error.
///
/// Falls back to the failure's runtime type label when no message text is
/// available.
pub fn broken_message(failure: &FailureDetails) -> String {
    if failure.message.is_empty() {
        failure.type_label.clone()
    } else {
        failure.message.clone()
    }
}

/// Prefixes a message with the recorded issue keys, if any.
pub fn prefix_issues(issues: &[String], message: &str) -> String {
    if issues.is_empty() {
        return message.to_owned();
    }
    format!("{}\n{}", issues.join(" "), message)
}

fn diff_block(expected: &str, actual: &str) -> Option<String> {
    if expected == actual {
        return None;
    }

    let diff = TextDiff::from_lines(expected, actual);
    let mut block = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        let line = change.value();
        swrite!(block, "{sign}{}\n", line.trim_end_matches('\n'));
    }
    // Drop the trailing newline added by the loop.
    block.pop();
    (!block.is_empty()).then_some(block)
}
