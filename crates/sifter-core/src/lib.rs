//! sifter-core: bounded failure-signature scanning over build/test output
//!
//! This crate locates, inside the results of a finished build or test run,
//! the first occurrence of a known failure signature and reports where it
//! was found.  Failure signatures are user-authored regular expressions run
//! against arbitrary text (error details, stack traces, stdout/stderr
//! captures), so the core problem is keeping that search safe and bounded
//! under adversarial input rather than the string search itself.
//!
//! # Architecture
//!
//! ```text
//! ScanTask (one per build-completion event)
//!     ├── simple build ────► scan_one ──► BuildScanner (CauseScanner)
//!     └── composite build ─► per-child scan_one ──► MatrixAggregate on parent
//!                                    │
//!                          TestReportScanner (per indication)
//!                                    │
//!                     Watchdog ◄── CancelToken ──► InterruptibleText
//!                                    │
//!                          anchored DFA full-match
//! ```
//!
//! # Modules
//!
//! - `watchdog`: idle timer that cancels a stuck match attempt
//! - `interrupt`: cancellation token and interruptible text view
//! - `pattern`: compiled failure indications and full-match adapter
//! - `scanner`: budgeted scan of a build's failed-test text fields
//! - `scheduler`: per-build fan-out, aggregation, and persistence
//! - `knowledge`: knowledge-base collaborator interface
//! - `storage`: SQLite-backed knowledge base
//! - `build` / `report`: host collaborator traits and result records
//! - `console`: console-formatting-marker stripping
//! - `config` / `logging`: TOML configuration and tracing setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod build;
pub mod config;
pub mod console;
pub mod error;
pub mod interrupt;
pub mod knowledge;
pub mod logging;
pub mod pattern;
pub mod report;
pub mod scanner;
pub mod scheduler;
pub mod storage;
pub mod watchdog;

pub use build::{BuildResult, BuildRun};
pub use error::{Error, Result};
pub use interrupt::{CancelToken, InterruptibleText, MatchAbort};
pub use knowledge::{KnowledgeBase, MemoryKnowledgeBase};
pub use pattern::{FailureCause, Indication};
pub use report::{
    AggregateEntry, FailedTest, FoundIndication, MatrixAggregate, ScanOutcome, TestAction,
    TestField,
};
pub use scanner::{ScanBudget, TestReportScanner};
pub use scheduler::{BuildScanner, CauseScanner, ScanTask};
pub use storage::SqliteKnowledgeBase;
pub use watchdog::Watchdog;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
