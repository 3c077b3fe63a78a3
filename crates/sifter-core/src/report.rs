//! Test-report collaborators and scan result records
//!
//! The host automation system owns the real test-report object model;
//! this module defines the narrow interface the scanner consumes (a list
//! of failed tests, each with up to four optional text fields) and the
//! immutable records a scan produces.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The text fields of a failed test a signature can match against, in
/// fixed priority order: the first matching field wins for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestField {
    /// Short error message attached to the failure
    ErrorDetails,
    /// Full error stack trace
    ErrorStackTrace,
    /// Captured standard error
    Stderr,
    /// Captured standard output
    Stdout,
}

impl TestField {
    /// Candidate check order for one failed test.
    pub const PRIORITY: [TestField; 4] = [
        TestField::ErrorDetails,
        TestField::ErrorStackTrace,
        TestField::Stderr,
        TestField::Stdout,
    ];
}

impl fmt::Display for TestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ErrorDetails => write!(f, "error_details"),
            Self::ErrorStackTrace => write!(f, "error_stack_trace"),
            Self::Stderr => write!(f, "stderr"),
            Self::Stdout => write!(f, "stdout"),
        }
    }
}

/// One failed test item, as exposed by the host's test report.
pub trait FailedTest: Send + Sync {
    /// Short error message, if recorded.
    fn error_details(&self) -> Option<String>;
    /// Error stack trace, if recorded.
    fn error_stack_trace(&self) -> Option<String>;
    /// Captured standard error, if recorded.
    fn stderr(&self) -> Option<String>;
    /// Captured standard output, if recorded.
    fn stdout(&self) -> Option<String>;
    /// Locator URL of this item, relative to its build's test report.
    fn url(&self) -> String;

    /// Non-null candidate fields in priority order.
    fn candidates(&self) -> Vec<(TestField, String)> {
        TestField::PRIORITY
            .iter()
            .filter_map(|field| {
                let value = match field {
                    TestField::ErrorDetails => self.error_details(),
                    TestField::ErrorStackTrace => self.error_stack_trace(),
                    TestField::Stderr => self.stderr(),
                    TestField::Stdout => self.stdout(),
                };
                value.map(|text| (*field, text))
            })
            .collect()
    }
}

/// One test-report action attached to a build.  A build may carry several
/// independent actions (e.g. separate suites publishing separately).
pub trait TestAction: Send + Sync {
    /// The failed tests this action reports.
    fn failed_tests(&self) -> Vec<Arc<dyn FailedTest>>;
}

/// The record produced when a signature matches a failed test's text.
///
/// Immutable after creation; always built from exactly the item and
/// field that matched, never re-derived during reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundIndication {
    /// URL of the build the match belongs to.
    pub build_url: String,
    /// String form of the pattern that matched.
    pub pattern: String,
    /// Locator URL of the matched test item.
    pub url: String,
    /// The matched text, console markers stripped.
    pub matched_text: String,
    /// Which text field produced the match.
    pub field: TestField,
}

/// The explicit per-artifact result of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// A signature matched; the indication says where.
    Found(FoundIndication),
    /// The scan completed and nothing matched.
    NoMatch,
}

impl ScanOutcome {
    /// The indication, if this outcome carries one.
    #[must_use]
    pub fn indication(&self) -> Option<&FoundIndication> {
        match self {
            Self::Found(found) => Some(found),
            Self::NoMatch => None,
        }
    }
}

/// One child run's entry in a composite build's aggregate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateEntry {
    /// Child run URL.
    pub url: String,
    /// Child run display name.
    pub display_name: String,
    /// Child run ordinal.
    pub number: u32,
    /// The child's scan outcome, if one was recorded.
    pub outcome: Option<ScanOutcome>,
}

/// The single aggregate record attached to a composite build's parent:
/// every child run sharing the triggering ordinal, with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixAggregate {
    /// The triggering build ordinal.
    pub number: u32,
    /// Entries for the children sharing that ordinal.
    pub entries: Vec<AggregateEntry>,
}
