//! Knowledge-base collaborator interface
//!
//! The knowledge base owns the configured failure causes (each carrying
//! one or more compiled indications) and the per-artifact scan outcomes.
//! During a scan it is read-only for causes; outcomes are cleared and
//! re-recorded by the scan of the owning artifact only.
//!
//! [`MemoryKnowledgeBase`] is the in-process implementation used by
//! tests and by embedders that do their own persistence; the
//! SQLite-backed implementation lives in [`crate::storage`].

use std::collections::HashMap;
use std::sync::Mutex;

use crate::pattern::FailureCause;
use crate::report::ScanOutcome;
use crate::Result;

/// Read/clear/write interface to the failure-cause store.
pub trait KnowledgeBase: Send + Sync {
    /// Enumerate the configured failure causes.
    ///
    /// # Errors
    ///
    /// Store-specific lookup or decode failures.
    fn causes(&self) -> Result<Vec<FailureCause>>;

    /// Remove any stored outcome for the artifact at `build_url`.
    /// Idempotent: removing a missing outcome is not an error.
    ///
    /// # Errors
    ///
    /// Store-specific write failures.
    fn remove_outcome(&self, build_url: &str) -> Result<()>;

    /// Record (upserting) the outcome for the artifact at `build_url`.
    ///
    /// # Errors
    ///
    /// Store-specific write failures.
    fn record_outcome(&self, build_url: &str, outcome: &ScanOutcome) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    causes: Vec<FailureCause>,
    outcomes: HashMap<String, ScanOutcome>,
}

/// In-process knowledge base backed by a mutex-protected map.
#[derive(Debug, Default)]
pub struct MemoryKnowledgeBase {
    inner: Mutex<MemoryInner>,
}

impl MemoryKnowledgeBase {
    /// Create an empty knowledge base.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a knowledge base preloaded with `causes`.
    #[must_use]
    pub fn with_causes(causes: Vec<FailureCause>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                causes,
                outcomes: HashMap::new(),
            }),
        }
    }

    /// Add a cause.
    pub fn add_cause(&self, cause: FailureCause) {
        self.lock().causes.push(cause);
    }

    /// The stored outcome for `build_url`, if any.
    #[must_use]
    pub fn outcome(&self, build_url: &str) -> Option<ScanOutcome> {
        self.lock().outcomes.get(build_url).cloned()
    }

    /// Number of stored outcomes.
    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.lock().outcomes.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KnowledgeBase for MemoryKnowledgeBase {
    fn causes(&self) -> Result<Vec<FailureCause>> {
        Ok(self.lock().causes.clone())
    }

    fn remove_outcome(&self, build_url: &str) -> Result<()> {
        self.lock().outcomes.remove(build_url);
        Ok(())
    }

    fn record_outcome(&self, build_url: &str, outcome: &ScanOutcome) -> Result<()> {
        self.lock()
            .outcomes
            .insert(build_url.to_string(), outcome.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Indication;

    #[test]
    fn causes_round_trip() {
        let kb = MemoryKnowledgeBase::new();
        kb.add_cause(
            FailureCause::new("oom", "out of memory")
                .with_indication(Indication::new(".*OutOfMemoryError.*").unwrap()),
        );
        let causes = kb.causes().unwrap();
        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].name, "oom");
        assert_eq!(causes[0].indications.len(), 1);
    }

    #[test]
    fn record_upserts_and_remove_is_idempotent() {
        let kb = MemoryKnowledgeBase::new();
        kb.record_outcome("job/app/1/", &ScanOutcome::NoMatch).unwrap();
        kb.record_outcome("job/app/1/", &ScanOutcome::NoMatch).unwrap();
        assert_eq!(kb.outcome_count(), 1);
        assert_eq!(kb.outcome("job/app/1/"), Some(ScanOutcome::NoMatch));

        kb.remove_outcome("job/app/1/").unwrap();
        kb.remove_outcome("job/app/1/").unwrap();
        assert!(kb.outcome("job/app/1/").is_none());
    }
}
