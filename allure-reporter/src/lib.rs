// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Translate test-runner lifecycle events into allure report records.
//!
//! The entry point is [`reporter::AllureReporter`]: a synchronous translator
//! that receives one lifecycle event at a time from a test runner (suite
//! before/after, test start/fail/error/incomplete/skipped/end, step
//! before/after), reconstructs the suite → test case → step hierarchy, mines
//! titles and issue references from an [annotation
//! source](annotations::AnnotationSource), and drives a [report
//! sink](sink::ReportSink). The bundled [`sink::AllureFileSink`] persists one
//! `*-testsuite.xml` record per suite via [`allure_model`].
//!
//! The translator is strictly sequential and single-threaded: events must
//! arrive in the order the runner produces them. If the host process dies
//! mid-run, the last open records are left unterminated in the output; that
//! is a documented limitation, not something the reporter papers over.

pub mod annotations;
pub mod config;
pub mod errors;
pub mod events;
pub mod format;
pub mod reporter;
pub mod sink;

#[cfg(test)]
mod test_helpers;
