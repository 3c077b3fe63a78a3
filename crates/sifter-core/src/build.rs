//! Build/run collaborator interface
//!
//! The host automation system owns builds, child runs, and their
//! persistence.  The scanner and scheduler see them only through
//! [`BuildRun`]: ordinal, display name, result severity, child
//! enumeration for composite (matrix/parameterized) builds, test-report
//! actions, outcome attachment, and a save hook.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::report::{MatrixAggregate, ScanOutcome, TestAction};

/// Build result severity, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    /// Everything passed
    Success,
    /// Built, but with test failures
    Unstable,
    /// The build itself failed
    Failure,
    /// The build was skipped
    NotBuilt,
    /// The build was cancelled
    Aborted,
}

impl BuildResult {
    /// Whether this result is strictly worse than `other`.
    #[must_use]
    pub fn is_worse_than(self, other: BuildResult) -> bool {
        self > other
    }
}

/// Opaque handle to a build or, for composite builds, a child run.
///
/// Implementations wrap the host's build objects.  Outcome storage is
/// exclusively owned by the artifact: only the scan of that specific
/// artifact reads, clears, or writes it.
pub trait BuildRun: Send + Sync {
    /// Build ordinal.  For a composite build, child runs sharing the
    /// parent's ordinal belong to the triggering execution (re-runs may
    /// produce several children with the same ordinal).
    fn number(&self) -> u32;

    /// Human-readable name for log messages.
    fn display_name(&self) -> String;

    /// Result severity.
    fn result(&self) -> BuildResult;

    /// Root-relative locator URL, with a trailing slash.
    fn url(&self) -> String;

    /// Child runs for a composite build, `None` for a simple build.
    fn child_runs(&self) -> Option<Vec<Arc<dyn BuildRun>>>;

    /// Test-report actions attached to this build.
    fn test_actions(&self) -> Vec<Arc<dyn TestAction>>;

    /// The recorded failure-cause outcome, if any.
    fn failure_outcome(&self) -> Option<ScanOutcome>;

    /// Record or clear the failure-cause outcome.
    fn set_failure_outcome(&self, outcome: Option<ScanOutcome>);

    /// Attach the composite aggregate record (parent builds only).
    fn attach_aggregate(&self, aggregate: MatrixAggregate);

    /// Persist this artifact's state.
    ///
    /// # Errors
    ///
    /// Whatever the host's persistence layer reports; callers log and
    /// continue, they never roll back in-memory results.
    fn save(&self) -> crate::Result<()>;
}
