//! Depth update event model
//!
//! Typed representation of the already-decoded update events the market-data
//! session delivers. Transport and field decoding happen upstream; the types
//! here are the contract between the session callback and the dispatcher.

/// Market side of a book or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }

}

/// Which depth variant a subscription carries. Selected from the first event
/// and sticky for the life of the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookKind {
    /// One row per resting order, rows carry a broker id.
    ByOrder,
    /// One row per price level, rows carry an order count.
    ByLevel,
}

impl BookKind {
    pub fn label(&self) -> &'static str {
        match self {
            BookKind::ByOrder => "by-order",
            BookKind::ByLevel => "by-level",
        }
    }
}

/// Declared event subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubtype {
    Bid,
    Ask,
    BidRetrans,
    AskRetrans,
    TableInitPaint,
}

impl EventSubtype {
    /// Side the event addresses; `None` for initial-paint events, which carry
    /// both sides.
    pub fn side(&self) -> Option<Side> {
        match self {
            EventSubtype::Bid | EventSubtype::BidRetrans => Some(Side::Bid),
            EventSubtype::Ask | EventSubtype::AskRetrans => Some(Side::Ask),
            EventSubtype::TableInitPaint => None,
        }
    }

    pub fn is_retransmission(&self) -> bool {
        matches!(self, EventSubtype::BidRetrans | EventSubtype::AskRetrans)
    }
}

/// Fragmentation marker. Only the distinction between a first chunk
/// (`Start`/`None`) and a continuation matters to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Start,
    None,
    Intermediate,
    End,
}

/// Mutation verb carried by an update or paint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCommand {
    Add,
    Delete,
    DeleteAll,
    DeleteBetter,
    DeleteSide,
    Execute,
    Modify,
    Replace,
    ReplaceByBroker,
    ReplaceClear,
    ClearAll,
}

impl TableCommand {
    pub fn label(&self) -> &'static str {
        match self {
            TableCommand::Add => "ADD",
            TableCommand::Delete => "DEL",
            TableCommand::DeleteAll => "DELALL",
            TableCommand::DeleteBetter => "DELBETTER",
            TableCommand::DeleteSide => "DELSIDE",
            TableCommand::Execute => "EXEC",
            TableCommand::Modify => "MOD",
            TableCommand::Replace => "REPLACE",
            TableCommand::ReplaceByBroker => "REPLACE_BY_BROKER",
            TableCommand::ReplaceClear => "REPLACE_CLEAR",
            TableCommand::ClearAll => "CLEARALL",
        }
    }
}

/// Row-level fields of an update or of one initial-paint array element.
/// Every field is optional on the wire; absent optional fields default when a
/// book entry is built, while operations that need a position treat an absent
/// or non-positive one as malformed.
///
/// `command` is populated only on initial-paint rows; live updates carry the
/// verb at the event level.
#[derive(Debug, Clone, Default)]
pub struct RowFields {
    pub command: Option<TableCommand>,
    /// Raw wire position, 1-based when positive.
    pub position: Option<i64>,
    pub price: Option<f64>,
    pub size: Option<i32>,
    /// Formatted HH:MM:SS.mmm, as supplied by the feed.
    pub time: Option<String>,
    /// By-level rows only.
    pub number_of_orders: Option<i32>,
    /// By-order rows only.
    pub broker: Option<String>,
}

impl RowFields {
    /// Zero-based book position. A raw value that is absent or not positive
    /// means "not applicable" and maps to `None`.
    pub fn book_position(&self) -> Option<usize> {
        match self.position {
            Some(raw) if raw > 0 => Some((raw - 1) as usize),
            _ => None,
        }
    }
}

/// One already-decoded depth update event.
#[derive(Debug, Clone)]
pub struct DepthEvent {
    pub kind: BookKind,
    pub subtype: EventSubtype,
    pub fragment: Fragment,
    /// Explicit feed-side gap signal.
    pub gap_detected: bool,
    /// Mutation verb for live updates.
    pub table_command: Option<TableCommand>,
    /// Retransmission continuation marker; zero ends a burst.
    pub multi_tick: Option<i64>,
    /// Monotonic per-side sequence number on live updates.
    pub sequence_number: Option<i64>,
    pub row: RowFields,
    /// Initial paint only.
    pub window_size: Option<usize>,
    /// Initial paint only, exchange-supplied label.
    pub book_type: Option<String>,
    /// Initial paint only.
    pub bid_rows: Vec<RowFields>,
    /// Initial paint only.
    pub ask_rows: Vec<RowFields>,
}

impl DepthEvent {
    /// Baseline live update with no fields set.
    pub fn update(kind: BookKind, subtype: EventSubtype) -> Self {
        DepthEvent {
            kind,
            subtype,
            fragment: Fragment::None,
            gap_detected: false,
            table_command: None,
            multi_tick: None,
            sequence_number: None,
            row: RowFields::default(),
            window_size: None,
            book_type: None,
            bid_rows: Vec::new(),
            ask_rows: Vec::new(),
        }
    }

    /// Baseline initial-paint event.
    pub fn initial_paint(kind: BookKind, fragment: Fragment) -> Self {
        DepthEvent {
            fragment,
            ..DepthEvent::update(kind, EventSubtype::TableInitPaint)
        }
    }
}
