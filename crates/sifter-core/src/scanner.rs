//! Bounded scanner: budgeted search for one indication in test results
//!
//! [`TestReportScanner`] looks for the first text field, across all
//! failed tests of all test-report actions of a build, that fully
//! matches one indication — inside a [`ScanBudget`]:
//!
//! - the *per-line* budget bounds a single match attempt, enforced by a
//!   [`Watchdog`] cancelling the [`InterruptibleText`] the match reads
//!   through;
//! - the *per-file* budget bounds the total time spent on one test
//!   action's failed-test list, checked once per item.
//!
//! Both are wall-clock.  A timed-out attempt is logged and treated as
//! "no match for this item"; it never fails the scan.  A blown per-file
//! budget skips the rest of that one action; other actions and other
//! artifacts are unaffected.

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::build::BuildRun;
use crate::console::strip_markers;
use crate::error::ScanError;
use crate::interrupt::{CancelToken, InterruptibleText, MatchAbort};
use crate::pattern::Indication;
use crate::report::{FailedTest, FoundIndication, TestField};
use crate::watchdog::Watchdog;
use crate::Result;

/// Default bound on a single match attempt.
pub const DEFAULT_PER_LINE_TIMEOUT: Duration = Duration::from_millis(1_000);
/// Default bound on scanning one test action's failed-test list.
pub const DEFAULT_PER_FILE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// The two independent wall-clock budgets of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanBudget {
    /// Bounds a single pattern match attempt.
    pub per_line: Duration,
    /// Bounds the total scan of one test action.
    pub per_file: Duration,
}

impl Default for ScanBudget {
    fn default() -> Self {
        Self {
            per_line: DEFAULT_PER_LINE_TIMEOUT,
            per_file: DEFAULT_PER_FILE_TIMEOUT,
        }
    }
}

/// Scans a build's test results for one failure indication.
#[derive(Debug)]
pub struct TestReportScanner<'a> {
    indication: &'a Indication,
    budget: ScanBudget,
}

impl<'a> TestReportScanner<'a> {
    /// Create a scanner for one indication with the given budget.
    #[must_use]
    pub fn new(indication: &'a Indication, budget: ScanBudget) -> Self {
        Self { indication, budget }
    }

    /// Find the first matching text field across the build's test
    /// actions, or `None` if nothing matches within budget.
    ///
    /// Timeouts are recovered internally; only unexpected matcher faults
    /// surface as errors.
    ///
    /// # Errors
    ///
    /// [`ScanError::Engine`] when the matching engine faults for a
    /// reason other than cancellation.
    pub fn scan(&self, build: &dyn BuildRun) -> Result<Option<FoundIndication>> {
        let token = CancelToken::new();
        let mut watchdog = Watchdog::spawn(token.clone(), self.budget.per_line);
        let result = self.scan_actions(build, &token, &mut watchdog);
        watchdog.request_stop();
        watchdog.join();
        // Drain a fire that raced normal completion so it cannot abort
        // a later, unrelated match on this worker.
        token.clear();
        result
    }

    /// Like [`TestReportScanner::scan`], but recovers every error:
    /// failures are logged, one diagnostic line goes to `log`, and the
    /// scan reports "no match".
    pub fn scan_with_log(
        &self,
        build: &dyn BuildRun,
        log: &mut dyn Write,
    ) -> Option<FoundIndication> {
        let start = Instant::now();
        let found = match self.scan(build) {
            Ok(found) => found,
            Err(err) => {
                error!(
                    pattern = %self.indication,
                    build = %build.display_name(),
                    error = %err,
                    "could not scan test results for indication"
                );
                let _ = writeln!(
                    log,
                    "[sifter] could not scan test results for indication '{}': {err}",
                    self.indication
                );
                None
            }
        };
        debug!(
            pattern = %self.indication,
            build = %build.display_name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            matched = found.is_some(),
            "test result scan finished"
        );
        found
    }

    fn scan_actions(
        &self,
        build: &dyn BuildRun,
        token: &CancelToken,
        watchdog: &mut Watchdog,
    ) -> Result<Option<FoundIndication>> {
        for action in build.test_actions() {
            let action_start = Instant::now();
            for test in action.failed_tests() {
                match self.match_test(test.as_ref(), token) {
                    Ok(Some((field, text))) => {
                        // First match in the first action that yields one
                        // wins; remaining items and actions are skipped.
                        return Ok(Some(self.found(build, test.as_ref(), field, &text)));
                    }
                    Ok(None) => {}
                    Err(MatchAbort::Interrupted) => {
                        warn!(
                            pattern = %self.indication,
                            build = %build.display_name(),
                            "timeout scanning for indication, skipping item"
                        );
                        // The fired watchdog is dead; re-arm a fresh one
                        // so the remaining items stay protected.
                        watchdog.request_stop();
                        watchdog.join();
                        token.clear();
                        *watchdog = Watchdog::spawn(token.clone(), self.budget.per_line);
                    }
                    Err(MatchAbort::Engine(detail)) => {
                        return Err(ScanError::Engine(detail).into());
                    }
                }
                watchdog.touch();
                if action_start.elapsed() > self.budget.per_file {
                    warn!(
                        pattern = %self.indication,
                        build = %build.display_name(),
                        per_file_ms = self.budget.per_file.as_millis() as u64,
                        "file timeout scanning for indication, skipping remaining items"
                    );
                    break;
                }
            }
        }
        Ok(None)
    }

    /// Check one failed test's candidate fields in priority order.
    fn match_test(
        &self,
        test: &dyn FailedTest,
        token: &CancelToken,
    ) -> std::result::Result<Option<(TestField, String)>, MatchAbort> {
        for (field, text) in test.candidates() {
            let seq = InterruptibleText::new(&text, token);
            if self.indication.matches_fully(&seq)? {
                return Ok(Some((field, text)));
            }
        }
        Ok(None)
    }

    fn found(
        &self,
        build: &dyn BuildRun,
        test: &dyn FailedTest,
        field: TestField,
        text: &str,
    ) -> FoundIndication {
        FoundIndication {
            build_url: build.url(),
            pattern: self.indication.as_str().to_string(),
            url: format!("{}testReport{}", build.url(), test.url()),
            matched_text: strip_markers(text).into_owned(),
            field,
        }
    }
}
