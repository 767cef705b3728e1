use std::sync::atomic::{AtomicU64, Ordering};

use super::Condition;

/// Track congestion-control counters without external dependencies.
pub(crate) struct Metrics;

static ADVISORIES_RECEIVED: AtomicU64 = AtomicU64::new(0);
static TABLE_UPDATES_SENT: AtomicU64 = AtomicU64::new(0);
static TABLE_ENTRIES_INSTALLED: AtomicU64 = AtomicU64::new(0);
static SWITCHBACKS: AtomicU64 = AtomicU64::new(0);
static REDIRECTS: AtomicU64 = AtomicU64::new(0);
static REVERTS: AtomicU64 = AtomicU64::new(0);
static RED_CUTOVERS: AtomicU64 = AtomicU64::new(0);
static GLOBAL_CONGESTION_EPISODES: AtomicU64 = AtomicU64::new(0);
static DECODE_ERRORS: AtomicU64 = AtomicU64::new(0);

struct AdvisoryCounters {
    green: AtomicU64,
    yellow: AtomicU64,
    red: AtomicU64,
}

static ADVISORIES_SENT: AdvisoryCounters = AdvisoryCounters::new();

impl AdvisoryCounters {
    const fn new() -> Self {
        Self {
            green: AtomicU64::new(0),
            yellow: AtomicU64::new(0),
            red: AtomicU64::new(0),
        }
    }

    fn increment(&self, condition: Condition) {
        let counter = match condition {
            Condition::Green => &self.green,
            Condition::Yellow => &self.yellow,
            Condition::Red => &self.red,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Metrics {
    #[inline]
    pub(crate) fn record_advisory_sent(condition: Condition) {
        ADVISORIES_SENT.increment(condition);
    }

    #[inline]
    pub(crate) fn record_advisory_received() {
        ADVISORIES_RECEIVED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_table_update_sent() {
        TABLE_UPDATES_SENT.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_table_entry_installed() {
        TABLE_ENTRIES_INSTALLED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_switchback() {
        SWITCHBACKS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_redirect() {
        REDIRECTS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_revert() {
        REVERTS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_red_cutover() {
        RED_CUTOVERS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_global_congestion() {
        GLOBAL_CONGESTION_EPISODES.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_decode_error() {
        DECODE_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn totals() -> MetricsSnapshot {
        MetricsSnapshot {
            green_advisories_sent: ADVISORIES_SENT.green.load(Ordering::Relaxed),
            yellow_advisories_sent: ADVISORIES_SENT.yellow.load(Ordering::Relaxed),
            red_advisories_sent: ADVISORIES_SENT.red.load(Ordering::Relaxed),
            advisories_received: ADVISORIES_RECEIVED.load(Ordering::Relaxed),
            table_updates_sent: TABLE_UPDATES_SENT.load(Ordering::Relaxed),
            table_entries_installed: TABLE_ENTRIES_INSTALLED.load(Ordering::Relaxed),
            switchbacks: SWITCHBACKS.load(Ordering::Relaxed),
            redirects: REDIRECTS.load(Ordering::Relaxed),
            reverts: REVERTS.load(Ordering::Relaxed),
            red_cutovers: RED_CUTOVERS.load(Ordering::Relaxed),
            global_congestion_episodes: GLOBAL_CONGESTION_EPISODES.load(Ordering::Relaxed),
            decode_errors: DECODE_ERRORS.load(Ordering::Relaxed),
        }
    }
}

/// Lightweight snapshot of process-wide counters.
#[derive(Default, Debug, Clone, Copy)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub green_advisories_sent: u64,
    pub yellow_advisories_sent: u64,
    pub red_advisories_sent: u64,
    pub advisories_received: u64,
    pub table_updates_sent: u64,
    pub table_entries_installed: u64,
    pub switchbacks: u64,
    pub redirects: u64,
    pub reverts: u64,
    pub red_cutovers: u64,
    pub global_congestion_episodes: u64,
    pub decode_errors: u64,
}

impl MetricsSnapshot {
    /// Advisories sent across all conditions.
    #[must_use]
    pub fn advisories_sent(&self) -> u64 {
        self.green_advisories_sent + self.yellow_advisories_sent + self.red_advisories_sent
    }
}

/// Read the current counter values.
#[must_use]
pub fn metrics_snapshot() -> MetricsSnapshot {
    Metrics::totals()
}
