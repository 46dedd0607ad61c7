//! Latest-quote cache with out-of-order rejection and staleness marking.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::QuoteSnapshot;
use crate::domain::instrument::InstrumentCode;

/// Result of offering a snapshot to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Snapshot replaced the cached one (or was the first).
    Accepted,
    /// Snapshot was older than the cached one and was dropped.
    RejectedOutOfOrder {
        /// Timestamp of the snapshot that was kept.
        cached: DateTime<Utc>,
    },
}

/// A cached snapshot together with its age at read time.
#[derive(Debug, Clone)]
pub enum QuoteRead {
    /// Age is within the staleness threshold.
    Fresh {
        /// The snapshot.
        snapshot: Arc<QuoteSnapshot>,
        /// Age at read time.
        age: Duration,
    },
    /// Age exceeds the staleness threshold.
    Stale {
        /// The snapshot.
        snapshot: Arc<QuoteSnapshot>,
        /// Age at read time.
        age: Duration,
    },
}

impl QuoteRead {
    /// The snapshot regardless of freshness.
    #[must_use]
    pub fn snapshot(&self) -> &Arc<QuoteSnapshot> {
        match self {
            Self::Fresh { snapshot, .. } | Self::Stale { snapshot, .. } => snapshot,
        }
    }

    /// Age at read time.
    #[must_use]
    pub const fn age(&self) -> Duration {
        match self {
            Self::Fresh { age, .. } | Self::Stale { age, .. } => *age,
        }
    }

    /// Returns true for the `Stale` marker.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// Most recent quote per instrument.
///
/// Readers clone an `Arc` under a short read lock; writers swap the `Arc`.
/// Timestamps are non-decreasing per instrument.
#[derive(Debug)]
pub struct MarketDataCache {
    entries: RwLock<HashMap<InstrumentCode, Arc<QuoteSnapshot>>>,
    staleness_threshold: Duration,
    accepted_updates: AtomicU64,
    rejected_updates: AtomicU64,
}

impl MarketDataCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(staleness_threshold: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            staleness_threshold,
            accepted_updates: AtomicU64::new(0),
            rejected_updates: AtomicU64::new(0),
        }
    }

    /// Offer a new snapshot. Older-than-cached snapshots are dropped.
    pub fn update(&self, snapshot: QuoteSnapshot) -> UpdateOutcome {
        let mut entries = self.entries.write();
        if let Some(cached) = entries.get(&snapshot.code)
            && snapshot.timestamp < cached.timestamp
        {
            let cached_ts = cached.timestamp;
            drop(entries);
            self.rejected_updates.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                code = %snapshot.code,
                offered = %snapshot.timestamp,
                cached = %cached_ts,
                "Dropped out-of-order quote"
            );
            return UpdateOutcome::RejectedOutOfOrder { cached: cached_ts };
        }
        entries.insert(snapshot.code.clone(), Arc::new(snapshot));
        drop(entries);
        self.accepted_updates.fetch_add(1, Ordering::Relaxed);
        UpdateOutcome::Accepted
    }

    /// Read the latest snapshot as of `now`.
    #[must_use]
    pub fn get_at(&self, code: &InstrumentCode, now: DateTime<Utc>) -> Option<QuoteRead> {
        let snapshot = self.entries.read().get(code).cloned()?;
        let age = (now - snapshot.timestamp).to_std().unwrap_or(Duration::ZERO);
        if age > self.staleness_threshold {
            Some(QuoteRead::Stale { snapshot, age })
        } else {
            Some(QuoteRead::Fresh { snapshot, age })
        }
    }

    /// Read the latest snapshot as of the wall clock.
    #[must_use]
    pub fn get(&self, code: &InstrumentCode) -> Option<QuoteRead> {
        self.get_at(code, Utc::now())
    }

    /// Configured staleness threshold.
    #[must_use]
    pub const fn staleness_threshold(&self) -> Duration {
        self.staleness_threshold
    }

    /// Number of accepted updates.
    #[must_use]
    pub fn accepted_updates(&self) -> u64 {
        self.accepted_updates.load(Ordering::Relaxed)
    }

    /// Number of updates dropped as out of order.
    #[must_use]
    pub fn rejected_updates(&self) -> u64 {
        self.rejected_updates.load(Ordering::Relaxed)
    }

    /// Number of instruments cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
