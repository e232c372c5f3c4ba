// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io;
use thiserror::Error;

/// An error that occurs while serializing a [`TestSuite`](crate::TestSuite).
///
/// Returned by [`TestSuite::serialize`](crate::TestSuite::serialize) and
/// [`TestSuite::to_xml_string`](crate::TestSuite::to_xml_string).
#[derive(Debug, Error)]
pub enum SerializeError {
    /// An error occurred while producing XML.
    #[error("error serializing test-suite record")]
    Xml(#[from] quick_xml::Error),

    /// An error occurred while writing to the underlying writer.
    #[error("error writing test-suite record")]
    Io(#[from] io::Error),
}
