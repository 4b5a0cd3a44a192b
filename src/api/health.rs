//! Shared health state for the /health endpoint.
//! Updated by the refresh loop and the prediction writer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// True when the most recent fetch returned a batch.
    pub fetch_ok: AtomicBool,
    /// Nanosecond timestamp of the last published evaluation (0 = none).
    pub last_eval_at_ns: AtomicU64,
    /// Markets in the last fetched batch.
    pub last_market_count: AtomicU64,
    /// Completed refresh cycles since startup.
    pub cycles: AtomicU64,
    /// Approximate count of evaluations queued for DB write.
    pub write_queue_pending: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fetch_ok(&self, v: bool) {
        self.fetch_ok.store(v, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, evaluated_at_ns: u64, market_count: usize) {
        self.last_eval_at_ns.store(evaluated_at_ns, Ordering::Relaxed);
        self.last_market_count.store(market_count as u64, Ordering::Relaxed);
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_write_queue_pending(&self) {
        self.write_queue_pending.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_write_queue_pending(&self) {
        // Never wraps below zero.
        let _ = self
            .write_queue_pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
    }

    pub fn fetch_ok(&self) -> bool {
        self.fetch_ok.load(Ordering::Relaxed)
    }

    pub fn last_eval_at_ns(&self) -> u64 {
        self.last_eval_at_ns.load(Ordering::Relaxed)
    }

    pub fn last_market_count(&self) -> u64 {
        self.last_market_count.load(Ordering::Relaxed)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn write_queue_pending(&self) -> u64 {
        self.write_queue_pending.load(Ordering::Relaxed)
    }
}
