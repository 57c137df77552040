//! Depth Handler - Market Depth Book Reconstruction
//!
//! Rebuilds and maintains live market-depth books (by-order and by-level)
//! from a stream of incremental update events. Features include:
//! - Positional table-command semantics (add/delete/replace/modify/execute/clear)
//! - Bounded-depth, two-sided, position-indexed books
//! - Per-side sequence gap detection with one-shot resubscription
//! - Retransmission burst tracking with gap-check suppression
//! - Initial-paint snapshot loading and recovery
//! - Feed processing statistics

pub mod book;
pub mod dispatcher;
pub mod event;
pub mod retransmission;
pub mod sequence;
pub mod stats;

pub use book::{ApplyError, BookEntry, DepthBook};
pub use dispatcher::{DepthFeedHandler, EventError, SessionControl};
pub use event::{BookKind, DepthEvent, EventSubtype, Fragment, RowFields, Side, TableCommand};
pub use retransmission::{RetransPhase, RetransmissionTracker};
pub use sequence::{SeqOutcome, SequenceTracker};
pub use stats::{DepthStats, LatencyStats};
