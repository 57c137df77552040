//! Depth event dispatch
//!
//! Routes each incoming update event to the right book operation: latches the
//! book kind from the first event, classifies subtype and side, runs sequence
//! and retransmission bookkeeping, loads initial-paint snapshots, and exposes
//! the read surface the display layer queries.

use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::book::{ApplyError, BookEntry, DepthBook};
use crate::event::{BookKind, DepthEvent, EventSubtype, Fragment, RowFields, Side, TableCommand};
use crate::retransmission::{RetransPhase, RetransmissionTracker};
use crate::sequence::{SeqOutcome, SequenceTracker};
use crate::stats::DepthStats;

/// Session operations the handler calls back into.
pub trait SessionControl {
    /// Re-request the given subscriptions after a detected gap. Invoked at
    /// most once per gap until a fresh initial paint is observed.
    fn resubscribe(&self, subscriptions: &[String]);
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("{command} without a usable position")]
    MissingPosition { command: &'static str },

    #[error("REPLACE_BY_BROKER without a broker")]
    MissingBroker,

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

#[derive(Debug, Default)]
struct FeedState {
    kind: Option<BookKind>,
    bid_seq: SequenceTracker,
    ask_seq: SequenceTracker,
    retrans: RetransmissionTracker,
    stats: DepthStats,
}

impl FeedState {
    fn seq(&mut self, side: Side) -> &mut SequenceTracker {
        match side {
            Side::Bid => &mut self.bid_seq,
            Side::Ask => &mut self.ask_seq,
        }
    }
}

/// Rebuilds both sides of a depth subscription from the event stream.
///
/// `process_event` is the single entry point for the session callback; the
/// read methods are safe to call concurrently from a display thread. Each
/// side book sits behind its own lock, held for the full duration of every
/// operation that touches it; tracker and statistics state sits behind a
/// second lock owned by the event path.
pub struct DepthFeedHandler<S: SessionControl> {
    session: S,
    subscriptions: Vec<String>,
    bid: Mutex<DepthBook>,
    ask: Mutex<DepthBook>,
    state: Mutex<FeedState>,
}

impl<S: SessionControl> DepthFeedHandler<S> {
    pub fn new(session: S, subscriptions: Vec<String>) -> Self {
        DepthFeedHandler {
            session,
            subscriptions,
            bid: Mutex::new(DepthBook::new()),
            ask: Mutex::new(DepthBook::new()),
            state: Mutex::new(FeedState::default()),
        }
    }

    /// Apply one already-decoded event. Never propagates a failure; malformed
    /// events are logged and dropped without touching book state.
    pub fn process_event(&self, event: &DepthEvent) {
        let started = Instant::now();
        let mut state = self.state.lock();
        state.stats.record_event();

        // Book kind is latched from the first event of the subscription.
        match state.kind {
            None => {
                state.kind = Some(event.kind);
                info!(kind = event.kind.label(), "book kind selected");
            }
            Some(kind) if kind != event.kind => {
                debug!(
                    declared = event.kind.label(),
                    active = kind.label(),
                    "event kind differs from subscription kind"
                );
            }
            _ => {}
        }

        if event.subtype == EventSubtype::TableInitPaint {
            self.process_paint(&mut state, event);
        } else if let Some(side) = event.subtype.side() {
            self.process_update(&mut state, side, event);
        }

        state.stats.record_apply_latency(started.elapsed().as_micros() as u64);
    }

    fn process_update(&self, state: &mut FeedState, side: Side, event: &DepthEvent) {
        if event.gap_detected && state.seq(side).signal_gap() {
            warn!(
                side = side.label(),
                "feed signaled a gap, local gap checks suppressed until retransmission completes"
            );
        }

        if event.subtype.is_retransmission() {
            self.track_retransmission(state, side, event);
            // A retransmission frame may still interleave a row mutation.
            if event.table_command.is_some() {
                self.apply_update_command(state, side, event);
            }
            return;
        }

        if state.retrans.is_active(side) {
            // Sequence checking is bypassed while the side's burst is in flight.
            self.apply_update_command(state, side, event);
            return;
        }

        let Some(sequence) = event.sequence_number else {
            debug!(side = side.label(), "live update without a sequence number");
            self.apply_update_command(state, side, event);
            return;
        };

        match state.seq(side).process(sequence) {
            SeqOutcome::Accept => self.apply_update_command(state, side, event),
            SeqOutcome::Stale { last, current } => {
                state.stats.record_stale();
                warn!(side = side.label(), last, current, "stale or duplicate update ignored");
            }
            SeqOutcome::Gap { last, current, resubscribe } => {
                state.stats.record_gap();
                if resubscribe {
                    warn!(side = side.label(), last, current, "sequence gap detected, resubscribing");
                    state.stats.record_resubscription();
                    self.session.resubscribe(&self.subscriptions);
                } else {
                    debug!(side = side.label(), last, current, "sequence gap while recovery pending");
                }
                // The pending repaint supersedes book state; the mutation is
                // still applied rather than deepening visible staleness.
                self.apply_update_command(state, side, event);
            }
        }
    }

    fn track_retransmission(&self, state: &mut FeedState, side: Side, event: &DepthEvent) {
        let multi_tick = event.multi_tick.unwrap_or(0);
        match state.retrans.observe(side, multi_tick) {
            RetransPhase::Started => {
                state.stats.record_burst();
                info!(side = side.label(), "retransmission started");
            }
            RetransPhase::InProgress => {}
            RetransPhase::Completed { was_active, all_done } => {
                // Next ordinary update reseeds the counter without a false gap.
                state.seq(side).reset_sequence();
                if was_active {
                    info!("{} retran completed", side.label());
                }
                if all_done {
                    let signaled =
                        state.bid_seq.clear_gap_signal() | state.ask_seq.clear_gap_signal();
                    if signaled {
                        info!("gap detected retran completed");
                    } else {
                        info!("retran completed");
                    }
                }
            }
        }
    }

    fn apply_update_command(&self, state: &mut FeedState, side: Side, event: &DepthEvent) {
        let Some(command) = event.table_command else {
            state.stats.record_malformed();
            warn!(side = side.label(), "update without a table command dropped");
            return;
        };
        let kind = state.kind.unwrap_or(event.kind);
        let result = {
            let mut book = self.book(side).lock();
            apply_command(&mut book, kind, command, &event.row)
        };
        match result {
            Ok(()) => state.stats.record_mutation(),
            Err(err) => {
                state.stats.record_malformed();
                warn!(side = side.label(), command = command.label(), %err, "update dropped");
            }
        }
    }

    fn process_paint(&self, state: &mut FeedState, event: &DepthEvent) {
        state.stats.record_paint();
        let kind = state.kind.unwrap_or(event.kind);
        let fresh = matches!(event.fragment, Fragment::Start | Fragment::None);

        {
            let mut bid = self.bid.lock();
            let mut ask = self.ask.lock();

            if fresh {
                bid.clear_all();
                ask.clear_all();
                // Ask and bid windows are reported identically; one value
                // seeds both sides.
                if let Some(window) = event.window_size {
                    bid.set_window_size(window);
                    ask.set_window_size(window);
                }
                if let Some(book_type) = &event.book_type {
                    bid.set_book_type(book_type.clone());
                    ask.set_book_type(book_type.clone());
                }
                info!(kind = kind.label(), window = bid.window_size(), "initial paint, books reset");
            }

            for row in &event.bid_rows {
                Self::apply_paint_row(state, &mut bid, kind, Side::Bid, row);
            }
            for row in &event.ask_rows {
                Self::apply_paint_row(state, &mut ask, kind, Side::Ask, row);
            }
        }

        // The snapshot is trusted; live updates reseed cleanly after it.
        state.bid_seq.reset();
        state.ask_seq.reset();
    }

    fn apply_paint_row(
        state: &mut FeedState,
        book: &mut DepthBook,
        kind: BookKind,
        side: Side,
        row: &RowFields,
    ) {
        let Some(command) = row.command else {
            state.stats.record_malformed();
            warn!(side = side.label(), "paint row without a table command skipped");
            return;
        };
        match apply_command(book, kind, command, row) {
            Ok(()) => state.stats.record_mutation(),
            Err(err) => {
                state.stats.record_malformed();
                warn!(side = side.label(), command = command.label(), %err, "paint row skipped");
            }
        }
    }

    /// Display read path; absent when the position is past the book or holds
    /// an invalid placeholder.
    pub fn entry(&self, side: Side, position: usize) -> Option<BookEntry> {
        self.book(side).lock().entry(position)
    }

    pub fn window_size(&self, side: Side) -> usize {
        self.book(side).lock().window_size()
    }

    pub fn book_type(&self, side: Side) -> String {
        self.book(side).lock().book_type().to_string()
    }

    /// Kind latched from the first event; `None` until then.
    pub fn book_kind(&self) -> Option<BookKind> {
        self.state.lock().kind
    }

    pub fn stats(&self) -> DepthStats {
        self.state.lock().stats.clone()
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    fn book(&self, side: Side) -> &Mutex<DepthBook> {
        match side {
            Side::Bid => &self.bid,
            Side::Ask => &self.ask,
        }
    }
}

fn apply_command(
    book: &mut DepthBook,
    kind: BookKind,
    command: TableCommand,
    row: &RowFields,
) -> Result<(), EventError> {
    match command {
        TableCommand::ClearAll => book.clear_all(),
        TableCommand::DeleteAll => book.delete_all(),
        TableCommand::DeleteSide => book.delete_side(),
        TableCommand::Delete => book.delete(required_position(command, row)?),
        TableCommand::DeleteBetter => book.delete_better_than(required_position(command, row)?),
        TableCommand::ReplaceClear => book.replace_clear(required_position(command, row)?),
        TableCommand::Add => book.add(required_position(command, row)?, entry_from_row(kind, row))?,
        TableCommand::Modify => book.modify(required_position(command, row)?, entry_from_row(kind, row)),
        TableCommand::Replace => book.replace(required_position(command, row)?, entry_from_row(kind, row)),
        TableCommand::Execute => book.execute(required_position(command, row)?, entry_from_row(kind, row)),
        TableCommand::ReplaceByBroker => {
            if row.broker.is_none() {
                return Err(EventError::MissingBroker);
            }
            book.replace_by_broker(entry_from_row(kind, row));
        }
    }
    Ok(())
}

fn required_position(command: TableCommand, row: &RowFields) -> Result<usize, EventError> {
    row.book_position()
        .ok_or(EventError::MissingPosition { command: command.label() })
}

fn entry_from_row(kind: BookKind, row: &RowFields) -> BookEntry {
    let price = row.price.unwrap_or_default();
    let size = row.size.unwrap_or_default();
    let time = row.time.clone().unwrap_or_default();
    match kind {
        BookKind::ByOrder => {
            BookEntry::by_order(row.broker.clone().unwrap_or_default(), price, time, size)
        }
        BookKind::ByLevel => {
            BookEntry::by_level(price, time, size, row.number_of_orders.unwrap_or_default())
        }
    }
}
