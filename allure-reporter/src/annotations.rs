// Copyright (c) The allure-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Annotation metadata source.
//!
//! Test classes and methods can carry annotations (title, description, issue
//! references, severity) that enrich the generated report. The reporter only
//! consumes the [`AnnotationSource`] trait; [`AnnotationRegistry`] is the
//! bundled in-process implementation, fed with raw `(name, value)` tags by
//! whatever glue sits between the runner and the reporter.
//!
//! Lookup misses are not errors: an unknown class or method simply yields no
//! metadata, and the run proceeds without enrichment.

use crate::config::ReporterConfig;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// A typed annotation record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Annotation {
    /// A human-readable title overriding the test or suite name.
    Title(String),

    /// A longer description.
    Description(String),

    /// External tracker issue keys, in declaration order.
    Issues(Vec<String>),

    /// The severity of a test.
    Severity(Severity),

    /// An annotation the reporter recognizes as present but does not
    /// interpret.
    Other {
        /// The raw annotation name.
        name: String,
    },
}

/// Severity levels understood by report renderers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Severity {
    /// The most severe level.
    Blocker,
    /// A critical test.
    Critical,
    /// The default level.
    Normal,
    /// A minor test.
    Minor,
    /// The least severe level.
    Trivial,
}

impl Severity {
    /// Returns the wire representation of this severity.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Blocker => "blocker",
            Severity::Critical => "critical",
            Severity::Normal => "normal",
            Severity::Minor => "minor",
            Severity::Trivial => "trivial",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "blocker" => Some(Severity::Blocker),
            "critical" => Some(Severity::Critical),
            "normal" => Some(Severity::Normal),
            "minor" => Some(Severity::Minor),
            "trivial" => Some(Severity::Trivial),
            _ => None,
        }
    }
}

/// A source of annotation metadata for classes and methods.
///
/// A miss (unknown class or method) yields an empty collection, never an
/// error: reporting must not be the reason a test run fails.
pub trait AnnotationSource {
    /// Returns the annotations declared on a class.
    fn class_annotations(&self, class_name: &str) -> Vec<Annotation>;

    /// Returns the annotations declared on a method of a class.
    fn method_annotations(&self, class_name: &str, method_name: &str) -> Vec<Annotation>;
}

/// The bundled in-process [`AnnotationSource`].
///
/// Raw `(name, value)` tags are parsed into typed [`Annotation`]s on
/// registration. Names on the ignore-list are dropped entirely; this keeps
/// framework-reserved tags (lifecycle hooks, data providers and the like)
/// from being mistaken for report metadata.
#[derive(Clone, Debug, Default)]
pub struct AnnotationRegistry {
    ignored: BTreeSet<String>,
    classes: HashMap<String, Vec<Annotation>>,
    methods: HashMap<(String, String), Vec<Annotation>>,
}

impl AnnotationRegistry {
    /// Annotation names reserved by test frameworks, ignored by default.
    pub const RESERVED_ANNOTATIONS: &'static [&'static str] = &[
        "after",
        "afterClass",
        "before",
        "beforeClass",
        "dataProvider",
        "depends",
        "env",
        "example",
        "examples",
        "group",
        "incomplete",
        "prepare",
        "skip",
        "specify",
        "test",
        "ticket",
    ];

    /// Creates a registry with the built-in ignore-list.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.add_ignored(Self::RESERVED_ANNOTATIONS.iter().copied());
        registry
    }

    /// Creates a registry with the built-in ignore-list plus the extra names
    /// from the configuration.
    pub fn from_config(config: &ReporterConfig) -> Self {
        let mut registry = Self::new();
        registry.add_ignored(config.ignored_annotations().iter().cloned());
        registry
    }

    /// Adds extra annotation names to the ignore-list.
    pub fn add_ignored(&mut self, names: impl IntoIterator<Item = impl Into<String>>) {
        self.ignored.extend(names.into_iter().map(Into::into));
    }

    /// Registers the raw annotation tags declared on a class.
    pub fn register_class<N, V>(
        &mut self,
        class_name: impl Into<String>,
        tags: impl IntoIterator<Item = (N, V)>,
    ) where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let annotations = self.parse_tags(tags);
        self.classes.insert(class_name.into(), annotations);
    }

    /// Registers the raw annotation tags declared on a method.
    pub fn register_method<N, V>(
        &mut self,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        tags: impl IntoIterator<Item = (N, V)>,
    ) where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let annotations = self.parse_tags(tags);
        self.methods
            .insert((class_name.into(), method_name.into()), annotations);
    }

    fn parse_tags<N, V>(&self, tags: impl IntoIterator<Item = (N, V)>) -> Vec<Annotation>
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        tags.into_iter()
            .filter_map(|(name, value)| self.parse_tag(name.as_ref(), value.as_ref()))
            .collect()
    }

    fn parse_tag(&self, name: &str, value: &str) -> Option<Annotation> {
        if self.ignored.contains(name) {
            return None;
        }
        let annotation = match name {
            "title" => Annotation::Title(value.to_owned()),
            "description" => Annotation::Description(value.to_owned()),
            "issue" | "issues" => Annotation::Issues(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_owned)
                    .collect(),
            ),
            "severity" => match Severity::parse(value) {
                Some(severity) => Annotation::Severity(severity),
                None => Annotation::Other {
                    name: name.to_owned(),
                },
            },
            _ => Annotation::Other {
                name: name.to_owned(),
            },
        };
        Some(annotation)
    }
}

impl AnnotationSource for AnnotationRegistry {
    fn class_annotations(&self, class_name: &str) -> Vec<Annotation> {
        match self.classes.get(class_name) {
            Some(annotations) => annotations.clone(),
            None => {
                debug!(class = class_name, "no class annotations registered");
                vec![]
            }
        }
    }

    fn method_annotations(&self, class_name: &str, method_name: &str) -> Vec<Annotation> {
        match self
            .methods
            .get(&(class_name.to_owned(), method_name.to_owned()))
        {
            Some(annotations) => annotations.clone(),
            None => {
                debug!(
                    class = class_name,
                    method = method_name,
                    "no method annotations registered"
                );
                vec![]
            }
        }
    }
}
