//! Ordering state for decrypted chunks.
//!
//! The decoder assigns each successfully validated chunk the next sequence
//! number and commits it here. Acceptance is strictly increasing: a
//! candidate at or below the accepted mark is rejected and the mark is left
//! untouched. The state is exposed publicly so transports that carry
//! explicit sequence numbers can drive it directly.

use crate::error::DecodeError;

/// Strictly-increasing acceptance mark for chunk ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceState {
    last: i64,
    legacy_tracking: bool,
}

impl SequenceState {
    /// Fresh state; the first candidate is `0`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last: -1,
            legacy_tracking: false,
        }
    }

    /// Fresh state in legacy tracking mode.
    ///
    /// In this mode a successful acceptance does **not** advance the mark,
    /// mirroring peers that shipped with a non-advancing tracker. Every
    /// candidate then resolves to `0` and duplicates are never rejected.
    /// Enable it only when wire compatibility with such a peer is required.
    #[must_use]
    pub fn with_legacy_tracking() -> Self {
        Self {
            last: -1,
            legacy_tracking: true,
        }
    }

    /// The currently accepted mark (`-1` before the first chunk).
    #[must_use]
    pub fn last(&self) -> i64 {
        self.last
    }

    /// The sequence number the next chunk will be assigned.
    #[must_use]
    pub fn next_candidate(&self) -> i64 {
        self.last + 1
    }

    /// Accept `candidate` if it advances past the mark, committing it.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfOrder`] without mutating the mark when
    /// `candidate` is at or below it.
    pub fn accept(&mut self, candidate: i64) -> Result<i64, DecodeError> {
        if candidate <= self.last {
            return Err(DecodeError::OutOfOrder {
                candidate,
                last: self.last,
            });
        }
        if !self.legacy_tracking {
            self.last = candidate;
        }
        Ok(candidate)
    }
}

impl Default for SequenceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_monotonic_candidates() {
        let mut state = SequenceState::new();
        assert_eq!(state.next_candidate(), 0);
        assert_eq!(state.accept(0), Ok(0));
        assert_eq!(state.accept(1), Ok(1));
        assert_eq!(state.last(), 1);
    }

    #[test]
    fn duplicate_candidate_is_out_of_order() {
        let mut state = SequenceState::new();
        state.accept(0).unwrap();
        assert_eq!(
            state.accept(0),
            Err(DecodeError::OutOfOrder {
                candidate: 0,
                last: 0,
            })
        );
        // The mark is untouched by the rejection.
        assert_eq!(state.last(), 0);
    }

    #[test]
    fn gaps_are_allowed_forward() {
        let mut state = SequenceState::new();
        assert_eq!(state.accept(7), Ok(7));
        assert_eq!(state.next_candidate(), 8);
    }

    #[test]
    fn legacy_tracking_never_advances() {
        let mut state = SequenceState::with_legacy_tracking();
        assert_eq!(state.accept(0), Ok(0));
        assert_eq!(state.last(), -1);
        // The same candidate keeps passing.
        assert_eq!(state.accept(0), Ok(0));
        assert_eq!(state.next_candidate(), 0);
    }
}
