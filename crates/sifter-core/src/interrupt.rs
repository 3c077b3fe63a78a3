//! Cancellation token and interruptible text view
//!
//! A regex match over attacker- or bug-produced text can run for a very
//! long time.  The matching adapter in [`crate::pattern`] therefore never
//! touches a haystack directly: it reads through an [`InterruptibleText`],
//! which checks a [`CancelToken`] on every byte access and aborts the
//! in-progress match with [`MatchAbort::Interrupted`] once the token is
//! set.  The token is the only state shared between the scanning worker
//! and the watchdog that cancels it.
//!
//! An interruption is deliberately distinct from "no match": callers must
//! never treat a timed-out attempt as a negative result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Why an in-progress match attempt stopped without producing an answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchAbort {
    /// The cancellation token was set mid-match (per-line timeout).
    #[error("match attempt interrupted")]
    Interrupted,

    /// The matching engine reported a fault the adapter cannot classify.
    #[error("match engine fault: {0}")]
    Engine(String),
}

/// Shared cancellation flag linking a watchdog to a scanning worker.
///
/// Clones share the same underlying flag.  Setting the token is sticky
/// until [`CancelToken::clear`] is called; the worker that owns the scan
/// clears residual state after joining its watchdog so a late fire cannot
/// leak into a later, unrelated match.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token.  Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the token has been set.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Reset the token so the next match attempt starts clean.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Read-only view over a text buffer that observes a [`CancelToken`].
///
/// The view never mutates the underlying buffer; any number of views may
/// wrap the same buffer concurrently.  Every [`InterruptibleText::byte_at`]
/// call checks the token first, which is what makes an otherwise
/// uninterruptible matching loop abortable mid-operation.
#[derive(Debug, Clone, Copy)]
pub struct InterruptibleText<'a> {
    text: &'a str,
    token: &'a CancelToken,
}

impl<'a> InterruptibleText<'a> {
    /// Wrap a text buffer with a cancellation token.
    #[must_use]
    pub fn new(text: &'a str, token: &'a CancelToken) -> Self {
        Self { text, token }
    }

    /// The wrapped text.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// Length of the wrapped text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the wrapped text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Read one byte, checking the cancellation token first.
    ///
    /// # Errors
    ///
    /// Returns [`MatchAbort::Interrupted`] if the token is set, or
    /// [`MatchAbort::Engine`] if `index` is out of bounds (a matching
    /// engine must never read past the haystack it was given).
    pub fn byte_at(&self, index: usize) -> Result<u8, MatchAbort> {
        if self.token.is_cancelled() {
            return Err(MatchAbort::Interrupted);
        }
        self.text
            .as_bytes()
            .get(index)
            .copied()
            .ok_or_else(|| MatchAbort::Engine(format!("read past end of haystack: {index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_unset() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        token.cancel();
        assert!(other.is_cancelled());
        other.clear();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn byte_at_reads_in_order() {
        let token = CancelToken::new();
        let seq = InterruptibleText::new("abc", &token);
        assert_eq!(seq.byte_at(0), Ok(b'a'));
        assert_eq!(seq.byte_at(2), Ok(b'c'));
        assert_eq!(seq.len(), 3);
        assert!(!seq.is_empty());
    }

    #[test]
    fn cancelled_token_aborts_access() {
        let token = CancelToken::new();
        let seq = InterruptibleText::new("abc", &token);
        token.cancel();
        assert_eq!(seq.byte_at(0), Err(MatchAbort::Interrupted));
    }

    #[test]
    fn interruption_is_not_a_negative_match() {
        // Interrupted and Engine are distinct abort reasons; neither is
        // representable as Ok(false).
        assert_ne!(
            MatchAbort::Interrupted,
            MatchAbort::Engine("boom".to_string())
        );
    }

    #[test]
    fn views_share_a_buffer_independently() {
        let token_a = CancelToken::new();
        let token_b = CancelToken::new();
        let text = "shared";
        let a = InterruptibleText::new(text, &token_a);
        let b = InterruptibleText::new(text, &token_b);
        token_a.cancel();
        assert_eq!(a.byte_at(0), Err(MatchAbort::Interrupted));
        assert_eq!(b.byte_at(0), Ok(b's'));
    }

    #[test]
    fn out_of_bounds_read_is_an_engine_fault() {
        let token = CancelToken::new();
        let seq = InterruptibleText::new("x", &token);
        assert!(matches!(seq.byte_at(5), Err(MatchAbort::Engine(_))));
    }
}
