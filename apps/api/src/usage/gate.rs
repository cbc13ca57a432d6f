//! Cooldown Gate: decides whether a caller may run another evaluation.
//!
//! The gate itself is pure: it reads a [`UsageSnapshot`] and returns a
//! [`GateDecision`], or returns the snapshot a successful evaluation should
//! leave behind. Persistence is the ledger's job.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::usage::store::UsageSnapshot;

const SECS_PER_HOUR: f64 = 3600.0;
const SECS_PER_MINUTE: f64 = 60.0;

/// Cooldown length and admin secret, fixed at construction.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub cooldown: Duration,
    pub admin_secret: Option<String>,
}

/// Time left before a blocked caller may evaluate again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Remaining {
    pub seconds: f64,
}

impl Remaining {
    pub fn hours(&self) -> u64 {
        (self.seconds / SECS_PER_HOUR).floor() as u64
    }

    pub fn minutes(&self) -> u64 {
        ((self.seconds % SECS_PER_HOUR) / SECS_PER_MINUTE).floor() as u64
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours(), self.minutes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    Allowed,
    Blocked(Remaining),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }
}

#[derive(Debug, Clone)]
pub struct CooldownGate {
    policy: GatePolicy,
}

impl CooldownGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self { policy }
    }

    pub fn cooldown(&self) -> Duration {
        self.policy.cooldown
    }

    /// True only when a secret is configured and `code` matches it exactly.
    /// An empty code never matches.
    pub fn is_admin(&self, code: Option<&str>) -> bool {
        match (self.policy.admin_secret.as_deref(), code) {
            (Some(secret), Some(code)) => !code.is_empty() && code == secret,
            _ => false,
        }
    }

    pub fn evaluate(
        &self,
        store: &UsageSnapshot,
        user_id: &str,
        now: f64,
        is_admin: bool,
    ) -> GateDecision {
        if is_admin {
            return GateDecision::Allowed;
        }

        let Some(last_used) = store.last_used(user_id) else {
            return GateDecision::Allowed;
        };

        let cooldown = self.policy.cooldown.as_secs_f64();
        let elapsed = now - last_used;
        if elapsed >= cooldown {
            GateDecision::Allowed
        } else {
            GateDecision::Blocked(Remaining {
                seconds: cooldown - elapsed,
            })
        }
    }

    /// Snapshot after a successful evaluation. Admin runs leave it untouched.
    pub fn commit(
        &self,
        mut store: UsageSnapshot,
        user_id: &str,
        now: f64,
        is_admin: bool,
    ) -> UsageSnapshot {
        if !is_admin {
            store.upsert(user_id, now);
        }
        store
    }

    pub fn next_eligible_at(&self, now: f64) -> Option<DateTime<Utc>> {
        let at = now + self.policy.cooldown.as_secs_f64();
        DateTime::from_timestamp(at.floor() as i64, 0)
    }
}

/// Current wall-clock time as unix epoch seconds.
pub fn epoch_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
