//! Failure indications: compiled patterns and the interruptible match adapter
//!
//! An [`Indication`] is one user-authored failure signature.  The pattern
//! text is validated with the `regex` crate, then compiled into an
//! anchored dense DFA (`regex-automata`) that this module drives
//! byte-by-byte through an [`InterruptibleText`].  Driving the automaton
//! manually is what preserves the cancellation boundary: every byte read
//! goes through the interruptible view, so a watchdog can abort a match
//! attempt at character granularity without corrupting engine state.
//!
//! Matching is full-match, not substring search: the pattern must cover
//! the entire text field.  Signatures that should match anywhere are
//! written with explicit `.*` edges, e.g. `.*NullPointerException.*`.

use std::fmt;

use regex_automata::dfa::dense;
use regex_automata::dfa::{Automaton, StartKind};
use regex_automata::{Anchored, Input};

use crate::error::PatternError;
use crate::interrupt::{InterruptibleText, MatchAbort};

/// A compiled failure signature with its original string form.
#[derive(Debug, Clone)]
pub struct Indication {
    pattern: String,
    dfa: dense::DFA<Vec<u32>>,
}

impl Indication {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// [`PatternError::InvalidRegex`] if the pattern is not a valid
    /// regular expression, [`PatternError::Unsupported`] if it cannot be
    /// compiled into the bounded matching automaton.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        // Validate against the standard engine first for friendlier
        // diagnostics than the automaton builder produces.
        regex::Regex::new(pattern).map_err(|err| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            detail: err.to_string(),
        })?;

        let dfa = dense::Builder::new()
            .configure(dense::Config::new().start_kind(StartKind::Anchored))
            .build(pattern)
            .map_err(|err| PatternError::Unsupported {
                pattern: pattern.to_string(),
                detail: err.to_string(),
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            dfa,
        })
    }

    /// The original pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether the pattern matches the *entire* wrapped text.
    ///
    /// Every byte is read through the interruptible view, so a set
    /// cancellation token aborts the attempt at the next access.
    ///
    /// # Errors
    ///
    /// [`MatchAbort::Interrupted`] when the view's token was set
    /// mid-match; [`MatchAbort::Engine`] for unexpected automaton faults.
    pub fn matches_fully(&self, seq: &InterruptibleText<'_>) -> Result<bool, MatchAbort> {
        let input = Input::new(seq.as_str()).anchored(Anchored::Yes);
        let mut state = self
            .dfa
            .start_state_forward(&input)
            .map_err(|err| MatchAbort::Engine(err.to_string()))?;

        for index in 0..seq.len() {
            let byte = seq.byte_at(index)?;
            state = self.dfa.next_state(state, byte);
            if self.dfa.is_dead_state(state) {
                return Ok(false);
            }
            if self.dfa.is_quit_state(state) {
                return Err(MatchAbort::Engine(format!(
                    "automaton quit at byte offset {index}"
                )));
            }
        }

        state = self.dfa.next_eoi_state(state);
        Ok(self.dfa.is_match_state(state))
    }
}

impl fmt::Display for Indication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// A named group of indications, as configured in the knowledge base.
///
/// A cause describes one known failure mode ("flaky DNS in integration
/// tests", "OOM-killed worker") and carries the signatures that identify
/// it.  The scan stops at the first indication of the first cause that
/// matches.
#[derive(Debug, Clone)]
pub struct FailureCause {
    /// Human-readable cause name, unique within a knowledge base.
    pub name: String,
    /// Longer description shown alongside a reported cause.
    pub description: String,
    /// Free-form category tags.
    pub categories: Vec<String>,
    /// Signatures identifying this cause.
    pub indications: Vec<Indication>,
}

impl FailureCause {
    /// Create a cause with no indications yet.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            categories: Vec::new(),
            indications: Vec::new(),
        }
    }

    /// Add an indication.
    #[must_use]
    pub fn with_indication(mut self, indication: Indication) -> Self {
        self.indications.push(indication);
        self
    }

    /// Add a category tag.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }
}
