//! Scripted depth feed replay
//!
//! Paints an initial by-level book, streams a randomized run of live updates
//! with a sequence gap injected partway through, and prints the resulting
//! book and feed statistics.

use depth_handler::{
    BookKind, DepthEvent, DepthFeedHandler, EventSubtype, Fragment, RowFields, SessionControl,
    Side, TableCommand,
};
use rand::Rng;

struct LoggingSession;

impl SessionControl for LoggingSession {
    fn resubscribe(&self, subscriptions: &[String]) {
        tracing::info!(?subscriptions, "session resubscribe requested");
    }
}

fn add_row(position: i64, price: f64, size: i32) -> RowFields {
    RowFields {
        command: Some(TableCommand::Add),
        position: Some(position),
        price: Some(price),
        size: Some(size),
        time: Some("09:30:00.000".to_string()),
        number_of_orders: Some(1),
        broker: None,
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let handler = DepthFeedHandler::new(LoggingSession, vec!["XYZ.DEPTH".to_string()]);

    // Initial paint: ten levels a side, window of ten.
    let mut paint = DepthEvent::initial_paint(BookKind::ByLevel, Fragment::Start);
    paint.window_size = Some(10);
    paint.book_type = Some("MARKET_DEPTH".to_string());
    for i in 0..10 {
        paint.bid_rows.push(add_row(i + 1, 100.0 - i as f64 * 0.05, 100));
        paint.ask_rows.push(add_row(i + 1, 100.05 + i as f64 * 0.05, 100));
    }
    handler.process_event(&paint);

    // Live flow with a bid-side gap injected at the halfway mark.
    let mut rng = rand::thread_rng();
    let mut bid_seq = 0i64;
    let mut ask_seq = 0i64;
    let mut gap_injected = false;
    for i in 0..2000 {
        let (subtype, side) = if rng.gen_bool(0.5) {
            (EventSubtype::Bid, Side::Bid)
        } else {
            (EventSubtype::Ask, Side::Ask)
        };

        let sequence = match side {
            Side::Bid => {
                bid_seq += 1;
                if i >= 1000 && !gap_injected {
                    bid_seq += 5; // dropped packets
                    gap_injected = true;
                }
                bid_seq
            }
            Side::Ask => {
                ask_seq += 1;
                ask_seq
            }
        };
        let depth = handler.window_size(side).max(1) as i64;
        let position = rng.gen_range(1..=depth.min(5));
        let drift = rng.gen_range(-0.10..0.10);
        let base = if side == Side::Bid { 100.0 } else { 100.05 };

        let command = match rng.gen_range(0u8..10) {
            0 => TableCommand::Delete,
            1 => TableCommand::Modify,
            2..=3 => TableCommand::Replace,
            _ => TableCommand::Add,
        };

        let event = DepthEvent {
            sequence_number: Some(sequence),
            table_command: Some(command),
            row: add_row(position, base + drift, rng.gen_range(1..500)),
            ..DepthEvent::update(BookKind::ByLevel, subtype)
        };
        handler.process_event(&event);
    }

    println!("\n{:>4}  {:>10}  {:>8}  {:>10}  {:>8}", "pos", "bid px", "bid sz", "ask px", "ask sz");
    for position in 0..handler.window_size(Side::Bid) {
        let bid = handler.entry(Side::Bid, position);
        let ask = handler.entry(Side::Ask, position);
        println!(
            "{:>4}  {:>10}  {:>8}  {:>10}  {:>8}",
            position,
            bid.as_ref().map_or("-".to_string(), |e| format!("{:.2}", e.price)),
            bid.as_ref().map_or("-".to_string(), |e| e.size.to_string()),
            ask.as_ref().map_or("-".to_string(), |e| format!("{:.2}", e.price)),
            ask.as_ref().map_or("-".to_string(), |e| e.size.to_string()),
        );
    }
    println!();

    handler.stats().print_summary();
}
