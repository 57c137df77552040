//! Per-side sequence number tracking
//!
//! Classifies each live update's sequence number as in-order, stale, or a
//! forward gap, and coordinates the one-shot resubscription flag so gap
//! recovery is requested at most once while it is in flight. An explicit
//! feed-side gap signal suppresses locally inferred gap handling until the
//! covering retransmission completes.

/// Classification of one observed sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqOutcome {
    /// In order (or tracker reseed); the event should be applied.
    Accept,
    /// Forward jump past the expected successor. `resubscribe` is true
    /// exactly once per detected gap.
    Gap {
        last: i64,
        current: i64,
        resubscribe: bool,
    },
    /// At or behind the last seen number; tolerated but not applied.
    Stale { last: i64, current: i64 },
}

/// Tracks one side's last-seen sequence number. Zero means uninitialized;
/// the exchange restarts numbering at 1 after certain recovery scenarios.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceTracker {
    last_sequence: i64,
    gap_signaled: bool,
    resubscribed: bool,
}

impl SequenceTracker {
    pub fn new() -> Self {
        SequenceTracker::default()
    }

    /// Classify `current` and update tracker state.
    pub fn process(&mut self, current: i64) -> SeqOutcome {
        let last = self.last_sequence;

        // Tracker (re)initialization, and numbering restarts at 1.
        if last == 0 || last == 1 || (current == 1 && last > 1) {
            self.last_sequence = current;
            return SeqOutcome::Accept;
        }

        if current == last + 1 {
            self.last_sequence = current;
            return SeqOutcome::Accept;
        }

        if current <= last {
            return SeqOutcome::Stale { last, current };
        }

        // Forward jump. The counter is left alone; recovery reseeds it.
        let resubscribe = !self.gap_signaled && !self.resubscribed;
        if resubscribe {
            self.resubscribed = true;
        }
        SeqOutcome::Gap {
            last,
            current,
            resubscribe,
        }
    }

    /// Record the explicit feed-side gap signal. Returns true when the flag
    /// was newly set, so the caller can log it once.
    pub fn signal_gap(&mut self) -> bool {
        !std::mem::replace(&mut self.gap_signaled, true)
    }

    /// Clear the explicit gap signal; returns whether it had been set.
    pub fn clear_gap_signal(&mut self) -> bool {
        std::mem::replace(&mut self.gap_signaled, false)
    }

    pub fn gap_signaled(&self) -> bool {
        self.gap_signaled
    }

    pub fn last_sequence(&self) -> i64 {
        self.last_sequence
    }

    /// Zero the counter only, so the next update reseeds it without a false
    /// gap. Used at retransmission completion.
    pub fn reset_sequence(&mut self) {
        self.last_sequence = 0;
    }

    /// Full reset, used when an initial paint restarts recovery.
    pub fn reset(&mut self) {
        *self = SequenceTracker::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_accepts_anything() {
        let mut tracker = SequenceTracker::new();
        assert_eq!(tracker.process(42), SeqOutcome::Accept);
        assert_eq!(tracker.last_sequence(), 42);
    }

    #[test]
    fn test_in_order_accepted() {
        let mut tracker = SequenceTracker::new();
        tracker.process(5);
        assert_eq!(tracker.process(6), SeqOutcome::Accept);
        assert_eq!(tracker.last_sequence(), 6);
    }

    #[test]
    fn test_restart_at_one_accepted() {
        let mut tracker = SequenceTracker::new();
        tracker.process(9);
        assert_eq!(tracker.process(1), SeqOutcome::Accept);
        assert_eq!(tracker.last_sequence(), 1);
        // last == 1 also accepts anything
        assert_eq!(tracker.process(77), SeqOutcome::Accept);
    }

    #[test]
    fn test_gap_resubscribes_once() {
        let mut tracker = SequenceTracker::new();
        tracker.process(5);
        assert_eq!(
            tracker.process(8),
            SeqOutcome::Gap { last: 5, current: 8, resubscribe: true }
        );
        // still gapped: no second resubscription
        assert_eq!(
            tracker.process(10),
            SeqOutcome::Gap { last: 5, current: 10, resubscribe: false }
        );
    }

    #[test]
    fn test_stale_is_not_a_gap() {
        let mut tracker = SequenceTracker::new();
        tracker.process(5);
        tracker.process(6);
        assert_eq!(tracker.process(4), SeqOutcome::Stale { last: 6, current: 4 });
        assert_eq!(tracker.process(6), SeqOutcome::Stale { last: 6, current: 6 });
        assert_eq!(tracker.last_sequence(), 6);
    }

    #[test]
    fn test_signaled_gap_suppresses_resubscribe() {
        let mut tracker = SequenceTracker::new();
        tracker.process(5);
        assert!(tracker.signal_gap());
        assert!(!tracker.signal_gap()); // already set, logged once
        assert_eq!(
            tracker.process(9),
            SeqOutcome::Gap { last: 5, current: 9, resubscribe: false }
        );
        assert!(tracker.clear_gap_signal());
        assert!(!tracker.clear_gap_signal());
    }

    #[test]
    fn test_reset_sequence_reseeds() {
        let mut tracker = SequenceTracker::new();
        tracker.process(5);
        tracker.process(8); // gap, resubscribed
        tracker.reset_sequence();
        assert_eq!(tracker.process(30), SeqOutcome::Accept);
        assert_eq!(tracker.last_sequence(), 30);
    }

    #[test]
    fn test_full_reset_clears_resubscription() {
        let mut tracker = SequenceTracker::new();
        tracker.process(5);
        tracker.process(8); // resubscribe issued
        tracker.reset();
        tracker.process(5);
        assert_eq!(
            tracker.process(8),
            SeqOutcome::Gap { last: 5, current: 8, resubscribe: true }
        );
    }
}
