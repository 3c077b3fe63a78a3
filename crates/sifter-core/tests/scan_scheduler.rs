//! End-to-end scheduler scenarios: simple builds, matrix fan-out with
//! ordinal correlation, aggregation, idempotent re-scan, and sibling
//! isolation when one artifact's scan fails.

use std::io::Write;
use std::sync::{Arc, Mutex};

use sifter_core::{
    BuildResult, BuildRun, BuildScanner, CauseScanner, Error, FailedTest, FailureCause,
    Indication, KnowledgeBase, MatrixAggregate, MemoryKnowledgeBase, ScanBudget, ScanOutcome,
    ScanTask, TestAction,
};

// ---------------------------------------------------------------------------
// Fakes standing in for the host automation system
// ---------------------------------------------------------------------------

struct FakeTest {
    details: Option<String>,
    stack: Option<String>,
    url: String,
}

impl FakeTest {
    fn with_stack(stack: &str, url: &str) -> Arc<Self> {
        Arc::new(Self {
            details: None,
            stack: Some(stack.to_string()),
            url: url.to_string(),
        })
    }
}

impl FailedTest for FakeTest {
    fn error_details(&self) -> Option<String> {
        self.details.clone()
    }
    fn error_stack_trace(&self) -> Option<String> {
        self.stack.clone()
    }
    fn stderr(&self) -> Option<String> {
        None
    }
    fn stdout(&self) -> Option<String> {
        None
    }
    fn url(&self) -> String {
        self.url.clone()
    }
}

struct FakeAction {
    tests: Vec<Arc<dyn FailedTest>>,
}

impl TestAction for FakeAction {
    fn failed_tests(&self) -> Vec<Arc<dyn FailedTest>> {
        self.tests.clone()
    }
}

#[derive(Default)]
struct FakeState {
    outcome: Option<ScanOutcome>,
    aggregate: Option<MatrixAggregate>,
    saves: u32,
}

struct FakeBuild {
    number: u32,
    name: String,
    result: BuildResult,
    url: String,
    children: Vec<Arc<FakeBuild>>,
    actions: Vec<Arc<dyn TestAction>>,
    state: Mutex<FakeState>,
}

impl FakeBuild {
    fn simple(number: u32, name: &str, stack: &str) -> Arc<Self> {
        let url = format!("job/{name}/{number}/");
        Arc::new(Self {
            number,
            name: format!("{name} #{number}"),
            result: BuildResult::Unstable,
            url,
            children: Vec::new(),
            actions: vec![Arc::new(FakeAction {
                tests: vec![FakeTest::with_stack(stack, "/suite/case")],
            })],
            state: Mutex::new(FakeState::default()),
        })
    }

    fn without_failures(number: u32, name: &str) -> Arc<Self> {
        Arc::new(Self {
            number,
            name: format!("{name} #{number}"),
            result: BuildResult::Unstable,
            url: format!("job/{name}/{number}/"),
            children: Vec::new(),
            actions: vec![Arc::new(FakeAction { tests: Vec::new() })],
            state: Mutex::new(FakeState::default()),
        })
    }

    fn composite(number: u32, name: &str, children: Vec<Arc<FakeBuild>>) -> Arc<Self> {
        Arc::new(Self {
            number,
            name: format!("{name} #{number}"),
            result: BuildResult::Failure,
            url: format!("job/{name}/{number}/"),
            children,
            actions: Vec::new(),
            state: Mutex::new(FakeState::default()),
        })
    }

    fn saves(&self) -> u32 {
        self.state.lock().unwrap().saves
    }

    fn aggregate(&self) -> Option<MatrixAggregate> {
        self.state.lock().unwrap().aggregate.clone()
    }
}

impl BuildRun for FakeBuild {
    fn number(&self) -> u32 {
        self.number
    }
    fn display_name(&self) -> String {
        self.name.clone()
    }
    fn result(&self) -> BuildResult {
        self.result
    }
    fn url(&self) -> String {
        self.url.clone()
    }
    fn child_runs(&self) -> Option<Vec<Arc<dyn BuildRun>>> {
        if self.children.is_empty() {
            None
        } else {
            Some(
                self.children
                    .iter()
                    .map(|c| Arc::clone(c) as Arc<dyn BuildRun>)
                    .collect(),
            )
        }
    }
    fn test_actions(&self) -> Vec<Arc<dyn TestAction>> {
        self.actions.clone()
    }
    fn failure_outcome(&self) -> Option<ScanOutcome> {
        self.state.lock().unwrap().outcome.clone()
    }
    fn set_failure_outcome(&self, outcome: Option<ScanOutcome>) {
        self.state.lock().unwrap().outcome = outcome;
    }
    fn attach_aggregate(&self, aggregate: MatrixAggregate) {
        self.state.lock().unwrap().aggregate = Some(aggregate);
    }
    fn save(&self) -> sifter_core::Result<()> {
        self.state.lock().unwrap().saves += 1;
        Ok(())
    }
}

const NPE_STACK: &str = "java.lang.NullPointerException at Foo.bar";

fn npe_knowledge() -> Arc<MemoryKnowledgeBase> {
    Arc::new(MemoryKnowledgeBase::with_causes(vec![FailureCause::new(
        "npe",
        "null dereference",
    )
    .with_indication(Indication::new(".*NullPointerException.*").unwrap())]))
}

fn task_for(build: Arc<FakeBuild>, kb: Arc<MemoryKnowledgeBase>) -> ScanTask {
    let scanner = Arc::new(CauseScanner::new(
        kb.clone() as Arc<dyn KnowledgeBase>,
        ScanBudget::default(),
    ));
    ScanTask::new(build, kb as Arc<dyn KnowledgeBase>, scanner)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn simple_build_gets_one_persisted_outcome() {
    let kb = npe_knowledge();
    let build = FakeBuild::simple(7, "app", NPE_STACK);
    task_for(build.clone(), kb.clone()).run();

    let outcome = build.failure_outcome().expect("outcome attached");
    let found = outcome.indication().expect("a signature matched");
    assert_eq!(found.matched_text, NPE_STACK);
    assert_eq!(found.pattern, ".*NullPointerException.*");
    assert_eq!(found.url, "job/app/7/testReport/suite/case");
    assert_eq!(found.build_url, "job/app/7/");
    assert_eq!(build.saves(), 1);
    assert_eq!(kb.outcome("job/app/7/"), Some(outcome));
}

#[test]
fn unmatched_build_gets_explicit_no_match() {
    let kb = npe_knowledge();
    let build = FakeBuild::simple(8, "app", "java.io.IOException: broken pipe");
    task_for(build.clone(), kb.clone()).run();

    assert_eq!(build.failure_outcome(), Some(ScanOutcome::NoMatch));
    assert_eq!(kb.outcome("job/app/8/"), Some(ScanOutcome::NoMatch));
}

#[test]
fn rescan_is_idempotent() {
    let kb = npe_knowledge();
    let build = FakeBuild::simple(9, "app", NPE_STACK);

    task_for(build.clone(), kb.clone()).run();
    let first = build.failure_outcome().expect("first outcome");

    task_for(build.clone(), kb.clone()).run();
    let second = build.failure_outcome().expect("second outcome");

    assert_eq!(first, second);
    // The clear step removed the first stored outcome before the second
    // recompute; nothing accumulated.
    assert_eq!(kb.outcome_count(), 1);
    assert_eq!(build.saves(), 2);
}

#[test]
fn matrix_fan_out_selects_children_by_ordinal() {
    // Children with ordinals [5, 5, 6]; the trigger is ordinal 5.  The
    // two ordinal-5 children are scanned and aggregated, the ordinal-6
    // child is untouched.
    let kb = npe_knowledge();
    let matching = FakeBuild::simple(5, "app-linux", NPE_STACK);
    let no_match = FakeBuild::without_failures(5, "app-macos");
    let other_ordinal = FakeBuild::simple(6, "app-windows", NPE_STACK);
    let parent = FakeBuild::composite(
        5,
        "app",
        vec![matching.clone(), no_match.clone(), other_ordinal.clone()],
    );

    task_for(parent.clone(), kb.clone()).run();

    assert!(matching
        .failure_outcome()
        .expect("ordinal-5 child scanned")
        .indication()
        .is_some());
    assert_eq!(no_match.failure_outcome(), Some(ScanOutcome::NoMatch));
    assert!(other_ordinal.failure_outcome().is_none());
    assert_eq!(other_ordinal.saves(), 0, "ordinal-6 child must be untouched");

    let aggregate = parent.aggregate().expect("aggregate attached to parent");
    assert_eq!(aggregate.number, 5);
    assert_eq!(aggregate.entries.len(), 2);
    // One indication, one explicit no-match, both referenced.
    let outcomes: Vec<_> = aggregate
        .entries
        .iter()
        .map(|e| e.outcome.clone().expect("every entry carries an outcome"))
        .collect();
    assert!(outcomes
        .iter()
        .any(|o| o.indication().is_some_and(|f| f.matched_text == NPE_STACK)));
    assert!(outcomes.iter().any(|o| *o == ScanOutcome::NoMatch));
    assert_eq!(parent.saves(), 1);
}

#[test]
fn child_with_recorded_outcome_is_not_rescanned() {
    let kb = npe_knowledge();
    let already_done = FakeBuild::simple(3, "app-linux", NPE_STACK);
    already_done.set_failure_outcome(Some(ScanOutcome::NoMatch));
    let parent = FakeBuild::composite(3, "app", vec![already_done.clone()]);

    task_for(parent.clone(), kb).run();

    // Not rescanned: the preset outcome survived and the child was never
    // saved, but it still shows up in the aggregate.
    assert_eq!(already_done.failure_outcome(), Some(ScanOutcome::NoMatch));
    assert_eq!(already_done.saves(), 0);
    let aggregate = parent.aggregate().expect("aggregate attached");
    assert_eq!(aggregate.entries.len(), 1);
    assert_eq!(aggregate.entries[0].outcome, Some(ScanOutcome::NoMatch));
}

#[test]
fn successful_child_is_skipped() {
    let kb = npe_knowledge();
    let passed = Arc::new(FakeBuild {
        number: 4,
        name: "app-linux #4".to_string(),
        result: BuildResult::Success,
        url: "job/app-linux/4/".to_string(),
        children: Vec::new(),
        actions: Vec::new(),
        state: Mutex::new(FakeState::default()),
    });
    let parent = FakeBuild::composite(4, "app", vec![passed.clone()]);

    task_for(parent, kb).run();

    assert!(passed.failure_outcome().is_none());
    assert_eq!(passed.saves(), 0);
}

#[test]
fn failing_sibling_scan_does_not_stop_the_others() {
    struct FailFor {
        url: String,
        inner: CauseScanner,
    }

    impl BuildScanner for FailFor {
        fn scan_build(
            &self,
            build: &dyn BuildRun,
            log: &mut dyn Write,
        ) -> sifter_core::Result<()> {
            if build.url() == self.url {
                return Err(Error::Persistence("disk full".to_string()));
            }
            self.inner.scan_build(build, log)
        }
    }

    let kb = npe_knowledge();
    let broken = FakeBuild::simple(2, "app-linux", NPE_STACK);
    let healthy = FakeBuild::simple(2, "app-macos", NPE_STACK);
    let parent = FakeBuild::composite(2, "app", vec![broken.clone(), healthy.clone()]);

    let scanner = Arc::new(FailFor {
        url: broken.url(),
        inner: CauseScanner::new(kb.clone() as Arc<dyn KnowledgeBase>, ScanBudget::default()),
    });
    ScanTask::new(parent.clone(), kb as Arc<dyn KnowledgeBase>, scanner).run();

    assert!(broken.failure_outcome().is_none(), "failed scan leaves no outcome");
    assert!(healthy
        .failure_outcome()
        .expect("sibling still scanned")
        .indication()
        .is_some());
    // The aggregate always runs, even with a failed child scan.
    let aggregate = parent.aggregate().expect("aggregate attached");
    assert_eq!(aggregate.entries.len(), 2);
    assert_eq!(parent.saves(), 1);
}
