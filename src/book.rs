//! Position-indexed depth book
//!
//! Maintains one side of a bounded-depth market book as an ordered sequence of
//! entries, position 0 = best. Table commands reproduce exchange positional
//! semantics: inserts shift worse entries down and drop whatever falls off the
//! window, deletes shift them back up, replaces overwrite in place.

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyError {
    #[error("add position {position} beyond current depth {depth}")]
    PositionBeyondDepth { position: usize, depth: usize },
}

/// One book row. A default-constructed entry is the invalid placeholder used
/// to pad holes; it is never handed out through the read path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookEntry {
    /// By-order books only.
    pub broker: Option<String>,
    pub price: f64,
    /// Formatted HH:MM:SS.mmm, as supplied by the feed.
    pub time: String,
    /// By-level books only.
    pub number_of_orders: i32,
    pub size: i32,
    pub is_valid: bool,
}

impl BookEntry {
    pub fn by_order(broker: impl Into<String>, price: f64, time: impl Into<String>, size: i32) -> Self {
        BookEntry {
            broker: Some(broker.into()),
            price,
            time: time.into(),
            number_of_orders: 0,
            size,
            is_valid: true,
        }
    }

    pub fn by_level(price: f64, time: impl Into<String>, size: i32, number_of_orders: i32) -> Self {
        BookEntry {
            broker: None,
            price,
            time: time.into(),
            number_of_orders,
            size,
            is_valid: true,
        }
    }
}

/// One side of a depth book. Length never exceeds the window size.
#[derive(Debug, Clone, Default)]
pub struct DepthBook {
    window_size: usize,
    book_type: String,
    entries: Vec<BookEntry>,
}

impl DepthBook {
    pub fn new() -> Self {
        DepthBook::default()
    }

    /// Insert at `position`, shifting entries at and after it one slot toward
    /// the back, then truncate to the window. A position beyond the current
    /// depth is a local cache gap and is rejected without touching the book.
    pub fn add(&mut self, position: usize, entry: BookEntry) -> Result<(), ApplyError> {
        if position > self.entries.len() {
            return Err(ApplyError::PositionBeyondDepth {
                position,
                depth: self.entries.len(),
            });
        }
        self.entries.insert(position, entry);
        self.entries.truncate(self.window_size);
        Ok(())
    }

    /// Remove the entry at `position`, shifting subsequent entries up.
    /// No-op out of range.
    pub fn delete(&mut self, position: usize) {
        if position < self.entries.len() {
            self.entries.remove(position);
        }
    }

    pub fn delete_all(&mut self) {
        self.entries.clear();
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Remove all entries at indices `[0, position]`, so the entry formerly
    /// at `position + 1` becomes the new best.
    pub fn delete_better_than(&mut self, position: usize) {
        let end = (position + 1).min(self.entries.len());
        self.entries.drain(..end);
    }

    pub fn delete_side(&mut self) {
        self.entries.clear();
    }

    /// Trade-through: replace the entry at `position`, then drop everything
    /// with better priority than it.
    pub fn execute(&mut self, position: usize, entry: BookEntry) {
        if position >= self.entries.len() {
            debug!(position, depth = self.entries.len(), "execute position out of range");
            return;
        }
        self.entries[position] = entry;
        self.entries.drain(..position);
    }

    /// Replace the entry at `position` in place; no shifting.
    pub fn modify(&mut self, position: usize, entry: BookEntry) {
        match self.entries.get_mut(position) {
            Some(slot) => *slot = entry,
            None => debug!(position, depth = self.entries.len(), "modify position out of range"),
        }
    }

    /// Replace-or-create: pad with invalid entries up to `position` if the
    /// slot does not exist yet, then set it. Positions at or beyond the
    /// window are ignored.
    pub fn replace(&mut self, position: usize, entry: BookEntry) {
        if position >= self.window_size {
            debug!(position, window = self.window_size, "replace position outside window");
            return;
        }
        if position >= self.entries.len() {
            self.entries.resize_with(position + 1, BookEntry::default);
        }
        self.entries[position] = entry;
    }

    /// Clear a single slot without shifting. Pads with invalid entries if the
    /// slot does not exist yet, otherwise resets it to the invalid
    /// placeholder.
    pub fn replace_clear(&mut self, position: usize) {
        if position >= self.window_size {
            debug!(position, window = self.window_size, "replace_clear position outside window");
            return;
        }
        if position >= self.entries.len() {
            self.entries.resize_with(position + 1, BookEntry::default);
        } else {
            self.entries[position] = BookEntry::default();
        }
    }

    /// By-order books only: overwrite the entry whose broker matches the
    /// incoming one. No-op when no entry matches.
    pub fn replace_by_broker(&mut self, entry: BookEntry) {
        let Some(broker) = entry.broker.as_deref() else {
            debug!("replace_by_broker without broker field");
            return;
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.broker.as_deref() == Some(broker))
        {
            Some(slot) => *slot = entry.clone(),
            None => debug!(broker, "replace_by_broker: no matching entry"),
        }
    }

    /// Read path for the display layer. Invalid placeholder entries are
    /// reported as absent.
    pub fn entry(&self, position: usize) -> Option<BookEntry> {
        self.entries
            .get(position)
            .filter(|e| e.is_valid)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn set_window_size(&mut self, window_size: usize) {
        self.window_size = window_size;
    }

    pub fn book_type(&self) -> &str {
        &self.book_type
    }

    pub fn set_book_type(&mut self, book_type: impl Into<String>) {
        self.book_type = book_type.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: f64) -> BookEntry {
        BookEntry::by_level(price, "10:00:00.000", 100, 1)
    }

    fn prices(book: &DepthBook) -> Vec<Option<f64>> {
        (0..book.len()).map(|i| book.entry(i).map(|e| e.price)).collect()
    }

    fn seeded(window: usize, count: usize) -> DepthBook {
        let mut book = DepthBook::new();
        book.set_window_size(window);
        for i in 0..count {
            book.add(i, level(100.0 - i as f64)).unwrap();
        }
        book
    }

    #[test]
    fn test_add_shifts_down() {
        let mut book = seeded(5, 3); // 100, 99, 98
        book.add(1, level(50.0)).unwrap();
        assert_eq!(prices(&book), vec![Some(100.0), Some(50.0), Some(99.0), Some(98.0)]);
    }

    #[test]
    fn test_add_truncates_to_window() {
        let mut book = seeded(3, 3);
        book.add(0, level(101.0)).unwrap();
        assert_eq!(book.len(), 3);
        assert_eq!(prices(&book), vec![Some(101.0), Some(100.0), Some(99.0)]);
    }

    #[test]
    fn test_add_beyond_depth_rejected() {
        let mut book = seeded(5, 2);
        let err = book.add(3, level(1.0)).unwrap_err();
        assert_eq!(err, ApplyError::PositionBeyondDepth { position: 3, depth: 2 });
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_delete_shifts_up() {
        let mut book = seeded(5, 3);
        book.delete(0);
        assert_eq!(prices(&book), vec![Some(99.0), Some(98.0)]);
        book.delete(5); // out of range, no-op
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_delete_better_than() {
        let mut book = seeded(5, 4); // 100, 99, 98, 97
        book.delete_better_than(1);
        assert_eq!(prices(&book), vec![Some(98.0), Some(97.0)]);
    }

    #[test]
    fn test_execute_trades_through() {
        let mut book = seeded(5, 4);
        book.execute(2, level(42.0));
        assert_eq!(prices(&book), vec![Some(42.0), Some(97.0)]);
    }

    #[test]
    fn test_execute_at_best_only_replaces() {
        let mut book = seeded(5, 2);
        book.execute(0, level(42.0));
        assert_eq!(prices(&book), vec![Some(42.0), Some(99.0)]);
    }

    #[test]
    fn test_replace_pads_with_invalid() {
        let mut book = DepthBook::new();
        book.set_window_size(5);
        book.replace(2, level(42.0));
        assert_eq!(book.len(), 3);
        assert_eq!(book.entry(0), None);
        assert_eq!(book.entry(1), None);
        assert_eq!(book.entry(2).unwrap().price, 42.0);
    }

    #[test]
    fn test_replace_clear_does_not_shift() {
        let mut book = seeded(5, 3);
        book.replace_clear(1);
        assert_eq!(book.len(), 3);
        assert_eq!(prices(&book), vec![Some(100.0), None, Some(98.0)]);
    }

    #[test]
    fn test_replace_by_broker() {
        let mut book = DepthBook::new();
        book.set_window_size(5);
        book.add(0, BookEntry::by_order("MMKR", 100.0, "10:00:00.000", 10)).unwrap();
        book.add(1, BookEntry::by_order("ARCA", 99.0, "10:00:00.001", 20)).unwrap();

        book.replace_by_broker(BookEntry::by_order("ARCA", 99.5, "10:00:01.000", 25));
        assert_eq!(book.entry(1).unwrap().price, 99.5);

        // unmatched broker is a no-op
        book.replace_by_broker(BookEntry::by_order("NSDQ", 1.0, "10:00:02.000", 1));
        assert_eq!(book.len(), 2);
        assert_eq!(book.entry(0).unwrap().price, 100.0);
    }

    #[test]
    fn test_window_invariant_over_mixed_commands() {
        let mut book = DepthBook::new();
        book.set_window_size(3);
        for i in 0..10 {
            book.add(0, level(i as f64)).unwrap();
            assert!(book.len() <= 3);
        }
        book.replace(2, level(42.0));
        assert!(book.len() <= 3);
        book.replace(7, level(7.0)); // outside window, ignored
        assert!(book.len() <= 3);
        book.delete_better_than(0);
        assert!(book.len() <= 3);
    }
}
