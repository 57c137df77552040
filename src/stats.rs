//! Feed processing statistics
//!
//! Tracks event and mutation counts, gap/recovery activity, and a sliding
//! window of apply latencies.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const LATENCY_WINDOW: usize = 10000;

#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p99_us: u64,
}

#[derive(Debug, Clone)]
pub struct DepthStats {
    start_time: Option<Instant>,
    events_processed: u64,
    mutations_applied: u64,
    stale_dropped: u64,
    malformed_dropped: u64,
    gap_events: u64,
    resubscriptions: u64,
    retransmission_bursts: u64,
    paints: u64,

    // Apply latencies (in microseconds)
    apply_latencies: VecDeque<u64>,
}

impl DepthStats {
    pub fn new() -> Self {
        DepthStats {
            start_time: None,
            events_processed: 0,
            mutations_applied: 0,
            stale_dropped: 0,
            malformed_dropped: 0,
            gap_events: 0,
            resubscriptions: 0,
            retransmission_bursts: 0,
            paints: 0,
            apply_latencies: VecDeque::with_capacity(LATENCY_WINDOW),
        }
    }

    /// Record an event received
    pub fn record_event(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.events_processed += 1;
    }

    pub fn record_mutation(&mut self) {
        self.mutations_applied += 1;
    }

    pub fn record_stale(&mut self) {
        self.stale_dropped += 1;
    }

    pub fn record_malformed(&mut self) {
        self.malformed_dropped += 1;
    }

    pub fn record_gap(&mut self) {
        self.gap_events += 1;
    }

    pub fn record_resubscription(&mut self) {
        self.resubscriptions += 1;
    }

    pub fn record_burst(&mut self) {
        self.retransmission_bursts += 1;
    }

    pub fn record_paint(&mut self) {
        self.paints += 1;
    }

    /// Record apply latency in microseconds
    pub fn record_apply_latency(&mut self, micros: u64) {
        if self.apply_latencies.len() >= LATENCY_WINDOW {
            self.apply_latencies.pop_front();
        }
        self.apply_latencies.push_back(micros);
    }

    /// Get events per second
    pub fn events_per_sec(&self) -> f64 {
        match self.start_time {
            None => 0.0,
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    self.events_processed as f64 / elapsed
                } else {
                    0.0
                }
            }
        }
    }

    /// Get apply latency statistics
    pub fn apply_latency_stats(&self) -> Option<LatencyStats> {
        if self.apply_latencies.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = self.apply_latencies.iter().copied().collect();
        sorted.sort_unstable();

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let mean = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        let p50 = sorted[sorted.len() / 2];
        let p99 = sorted[(sorted.len() * 99) / 100];

        Some(LatencyStats {
            min_us: min,
            max_us: max,
            mean_us: mean,
            p50_us: p50,
            p99_us: p99,
        })
    }

    /// Get total elapsed time
    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|st| st.elapsed())
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn mutations_applied(&self) -> u64 {
        self.mutations_applied
    }

    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    pub fn malformed_dropped(&self) -> u64 {
        self.malformed_dropped
    }

    pub fn gap_events(&self) -> u64 {
        self.gap_events
    }

    pub fn resubscriptions(&self) -> u64 {
        self.resubscriptions
    }

    pub fn retransmission_bursts(&self) -> u64 {
        self.retransmission_bursts
    }

    pub fn paints(&self) -> u64 {
        self.paints
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = DepthStats::new();
    }

    /// Print statistics summary
    pub fn print_summary(&self) {
        println!("=== Depth Feed Statistics ===");
        println!("Events Processed: {}", self.events_processed);
        println!("Mutations Applied: {}", self.mutations_applied);
        println!("Elapsed: {:?}", self.elapsed());
        println!("Events/sec: {:.2}", self.events_per_sec());

        if let Some(stats) = self.apply_latency_stats() {
            println!("\nApply Latency (us):");
            println!("  Min: {}, Max: {}, Mean: {:.2}", stats.min_us, stats.max_us, stats.mean_us);
            println!("  P50: {}, P99: {}", stats.p50_us, stats.p99_us);
        }

        println!(
            "\nGaps: {} events, {} resubscriptions, {} retransmission bursts",
            self.gap_events, self.resubscriptions, self.retransmission_bursts
        );
        println!(
            "Dropped: {} stale, {} malformed; {} paints",
            self.stale_dropped, self.malformed_dropped, self.paints
        );
    }
}

impl Default for DepthStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_event() {
        let mut stats = DepthStats::new();
        stats.record_event();
        stats.record_mutation();
        assert_eq!(stats.events_processed(), 1);
        assert_eq!(stats.mutations_applied(), 1);
    }

    #[test]
    fn test_apply_latency_stats() {
        let mut stats = DepthStats::new();
        for i in 1..=100 {
            stats.record_apply_latency(i);
        }

        let latency_stats = stats.apply_latency_stats().unwrap();
        assert_eq!(latency_stats.min_us, 1);
        assert_eq!(latency_stats.max_us, 100);
    }

    #[test]
    fn test_gap_counters() {
        let mut stats = DepthStats::new();
        stats.record_gap();
        stats.record_gap();
        stats.record_resubscription();
        assert_eq!(stats.gap_events(), 2);
        assert_eq!(stats.resubscriptions(), 1);
    }

    #[test]
    fn test_reset() {
        let mut stats = DepthStats::new();
        stats.record_event();
        stats.record_apply_latency(5);
        stats.reset();
        assert_eq!(stats.events_processed(), 0);
        assert!(stats.apply_latency_stats().is_none());
    }
}
