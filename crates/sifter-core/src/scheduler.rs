//! Scan scheduler: one persisted outcome per build-completion event
//!
//! [`ScanTask`] decides what to scan for a given build trigger.  A
//! simple build is scanned directly.  A composite (matrix/parameterized)
//! build fans out over its child runs: a child is scanned when it has no
//! recorded outcome yet, its result is worse than success, and its
//! ordinal equals the triggering build's ordinal (re-runs can produce
//! several children sharing the parent's ordinal; all of them count).
//! Afterwards — always, even when individual child scans failed — every
//! child sharing the triggering ordinal is folded into one
//! [`MatrixAggregate`] attached to the parent, and the parent is saved.
//!
//! Re-scan is idempotent: each scan clears the artifact's stored outcome
//! before recomputing.  An error scanning one artifact is logged and
//! swallowed so sibling artifacts are always processed; `run()` never
//! propagates anything to the invoking framework.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

use crate::build::BuildRun;
use crate::knowledge::KnowledgeBase;
use crate::pattern::FailureCause;
use crate::report::{AggregateEntry, MatrixAggregate, ScanOutcome};
use crate::scanner::{ScanBudget, TestReportScanner};
use crate::{BuildResult, Result};

/// The "scan one artifact" operation the scheduler drives.
///
/// Implementations search the artifact with every configured failure
/// signature, stopping at the first match, and attach the resulting
/// [`ScanOutcome`] to the artifact.  [`CauseScanner`] covers test
/// reports; hosts with more consumers (console logs, …) compose them
/// behind this trait.
pub trait BuildScanner: Send + Sync {
    /// Scan `build` and attach its outcome.
    ///
    /// # Errors
    ///
    /// Unexpected faults only; timeouts and missing fields are handled
    /// inside the scan.
    fn scan_build(&self, build: &dyn BuildRun, log: &mut dyn Write) -> Result<()>;
}

/// Scans a build's test reports with every cause in the knowledge base.
pub struct CauseScanner {
    knowledge: Arc<dyn KnowledgeBase>,
    budget: ScanBudget,
}

impl CauseScanner {
    /// Create a scanner over `knowledge` with the given budget.
    #[must_use]
    pub fn new(knowledge: Arc<dyn KnowledgeBase>, budget: ScanBudget) -> Self {
        Self { knowledge, budget }
    }

    fn first_match(
        &self,
        causes: &[FailureCause],
        build: &dyn BuildRun,
        log: &mut dyn Write,
    ) -> Option<ScanOutcome> {
        for cause in causes {
            for indication in &cause.indications {
                let scanner = TestReportScanner::new(indication, self.budget);
                if let Some(found) = scanner.scan_with_log(build, log) {
                    debug!(
                        cause = %cause.name,
                        pattern = %indication,
                        build = %build.display_name(),
                        "failure cause identified"
                    );
                    return Some(ScanOutcome::Found(found));
                }
            }
        }
        None
    }
}

impl BuildScanner for CauseScanner {
    fn scan_build(&self, build: &dyn BuildRun, log: &mut dyn Write) -> Result<()> {
        let causes = self.knowledge.causes()?;
        let outcome = self
            .first_match(&causes, build, log)
            .unwrap_or(ScanOutcome::NoMatch);
        self.knowledge.record_outcome(&build.url(), &outcome)?;
        build.set_failure_outcome(Some(outcome));
        Ok(())
    }
}

/// One scheduler invocation: scans the artifacts belonging to a single
/// build trigger and persists a single aggregated result.
pub struct ScanTask {
    build: Arc<dyn BuildRun>,
    knowledge: Arc<dyn KnowledgeBase>,
    scanner: Arc<dyn BuildScanner>,
}

impl ScanTask {
    /// Create a task for one triggering build.
    #[must_use]
    pub fn new(
        build: Arc<dyn BuildRun>,
        knowledge: Arc<dyn KnowledgeBase>,
        scanner: Arc<dyn BuildScanner>,
    ) -> Self {
        Self {
            build,
            knowledge,
            scanner,
        }
    }

    /// Run the task on a dedicated worker thread (one per
    /// build-completion event).
    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    /// Scan everything this trigger selects.  All errors are logged and
    /// swallowed; the invoking framework never sees a failure.
    pub fn run(&self) {
        match self.build.child_runs() {
            Some(children) => {
                for child in &children {
                    if child.failure_outcome().is_none()
                        && child.result().is_worse_than(BuildResult::Success)
                        && child.number() == self.build.number()
                    {
                        self.scan_one(child.as_ref());
                    }
                }
                self.finish_composite(&children);
            }
            None => self.scan_one(self.build.as_ref()),
        }
    }

    /// Fold every child sharing the triggering ordinal — scanned just
    /// now or carrying an older outcome — into the parent's aggregate.
    fn finish_composite(&self, children: &[Arc<dyn BuildRun>]) {
        let entries: Vec<AggregateEntry> = children
            .iter()
            .filter(|child| child.number() == self.build.number())
            .map(|child| AggregateEntry {
                url: child.url(),
                display_name: child.display_name(),
                number: child.number(),
                outcome: child.failure_outcome(),
            })
            .collect();
        debug!(
            build = %self.build.display_name(),
            children = entries.len(),
            "attaching matrix aggregate"
        );
        self.build.attach_aggregate(MatrixAggregate {
            number: self.build.number(),
            entries,
        });
        if let Err(err) = self.build.save() {
            warn!(
                build = %self.build.display_name(),
                error = %err,
                "failed to persist matrix aggregate"
            );
        }
    }

    /// Clear-then-scan-then-persist for one artifact.  Errors are logged
    /// here so siblings keep going.
    fn scan_one(&self, build: &dyn BuildRun) {
        // Re-scans must not write into the build's own log.
        let mut log = io::sink();
        if let Err(err) = self.try_scan_one(build, &mut log) {
            error!(
                build = %build.display_name(),
                error = %err,
                "could not scan build for failure causes"
            );
        }
    }

    fn try_scan_one(&self, build: &dyn BuildRun, log: &mut dyn Write) -> Result<()> {
        self.knowledge.remove_outcome(&build.url())?;
        build.set_failure_outcome(None);
        self.scanner.scan_build(build, log)?;
        build.save()
    }
}
