use serde::Serialize;
use std::time::{Duration, Instant};

/// Bounded hold on CPU wakefulness.
///
/// The lease is only valid for `ceiling` after its last renewal. Whoever
/// holds it must renew before then and release it on every exit path.
#[derive(Debug, Clone)]
pub struct WakeLease {
    acquired_at: Instant,
    renewed_at: Instant,
    ceiling: Duration,
    renewals: u32,
}

impl WakeLease {
    pub fn acquire(ceiling: Duration) -> Self {
        Self::acquire_at(Instant::now(), ceiling)
    }

    pub fn acquire_at(now: Instant, ceiling: Duration) -> Self {
        Self {
            acquired_at: now,
            renewed_at: now,
            ceiling,
            renewals: 0,
        }
    }

    pub fn renew(&mut self) {
        self.renew_at(Instant::now());
    }

    pub fn renew_at(&mut self, now: Instant) {
        self.renewed_at = now;
        self.renewals += 1;
    }

    pub fn expires_at(&self) -> Instant {
        self.renewed_at + self.ceiling
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.expires_at().saturating_duration_since(now)
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    pub fn renewals(&self) -> u32 {
        self.renewals
    }

    pub fn status_at(&self, now: Instant) -> LeaseStatus {
        LeaseStatus {
            held_secs: now.saturating_duration_since(self.acquired_at).as_secs(),
            remaining_secs: self.remaining_at(now).as_secs(),
            renewals: self.renewals,
            expired: self.is_expired_at(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseStatus {
    pub held_secs: u64,
    pub remaining_secs: u64,
    pub renewals: u32,
    pub expired: bool,
}
