//! Generic Cell Rate Algorithm.
//!
//! GCRA tracks a single "theoretical arrival time" (TAT) per key instead of
//! a counter array. The TAT is the instant at which the bucket would be
//! exactly empty under ideal pacing; an arrival conforms while it is no more
//! than one full period ahead of schedule. The functions here are pure: they
//! perform no I/O and cannot fail for a valid [`Quota`].

use crate::quota::Quota;
use serde::Serialize;

/// Outcome of one evaluation, reported back to callers and clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the counter entry expires and the bucket fully resets.
    pub reset_after: u64,
}

/// An evaluation plus the state transition it implies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub decision: RateLimitDecision,
    /// The TAT to persist. `None` on reject: a rejected arrival must not
    /// consume capacity or shift the window.
    pub new_tat: Option<f64>,
}

/// Evaluate one arrival against `quota`.
///
/// `now` and `stored_tat` are in seconds since the epoch; an absent stored
/// value means the bucket is empty. The caller is responsible for persisting
/// `new_tat` (with a TTL of one period) when it is returned.
pub fn evaluate(quota: Quota, now: f64, stored_tat: Option<f64>) -> Evaluation {
    let interval = quota.emission_interval();
    let arrival = now;
    let prev = stored_tat.unwrap_or(arrival);
    let candidate = arrival.max(prev) + interval;
    let allow_at = candidate - quota.burst_tolerance();

    // Round half up so arrivals up to half an interval early still conform.
    let rounded = ((arrival - allow_at) / interval + 0.5).floor();

    if rounded < 0.0 {
        let reset_after = (prev - arrival).max(0.0) as u64;
        Evaluation {
            decision: RateLimitDecision {
                allowed: false,
                limit: quota.limit(),
                remaining: 0,
                reset_after,
            },
            new_tat: None,
        }
    } else {
        let remaining = (rounded as u64).min(u64::from(quota.limit())) as u32;
        Evaluation {
            decision: RateLimitDecision {
                allowed: true,
                limit: quota.limit(),
                remaining,
                reset_after: quota.period().as_secs(),
            },
            new_tat: Some(candidate),
        }
    }
}

/// Evaluate without consuming: how much capacity is available right now.
///
/// Used for advisory headers and status endpoints. Never implies a store
/// write.
pub fn peek(quota: Quota, now: f64, stored_tat: Option<f64>) -> RateLimitDecision {
    let eval = evaluate(quota, now, stored_tat);
    let remaining = if eval.decision.allowed {
        (eval.decision.remaining + 1).min(quota.limit())
    } else {
        0
    };
    let reset_after = stored_tat.map_or(0, |tat| (tat - now).max(0.0) as u64);
    RateLimitDecision {
        allowed: eval.decision.allowed,
        limit: quota.limit(),
        remaining,
        reset_after,
    }
}
