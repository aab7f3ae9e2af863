//! # scoring — advisory confidence in [0, 1]
//!
//! Base-plus-increment: the score starts at a configured base and grows with
//! the fired-signal evidence, clamped to 1.0. It rides along on the card for
//! the reader's own judgement — emission is gated only by the trigger set
//! being non-empty, never by this number.

use crate::config::{Config, TriggerPolicy};
use crate::features::FeatureSet;
use crate::triggers::Signal;

/// Score a non-empty trigger set. Returns 0.0 for an empty one (no card is
/// built in that case anyway).
pub fn confidence(signals: &[Signal], features: &FeatureSet, cfg: &Config) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }

    let raw = match cfg.trigger_policy {
        // Linear in hit count: more independent confirmations, more weight.
        TriggerPolicy::Or => {
            cfg.conf_base + cfg.conf_per_signal * signals.len() as f64
        }
        // Named increments per sub-signal, plus a bonus when price sits
        // inside the tighter inner band around the high.
        TriggerPolicy::And => {
            let mut score = cfg.conf_base;
            if signals.contains(&Signal::Drop5m) {
                score += cfg.conf_drop_5m;
            }
            if signals.contains(&Signal::Drop15m) {
                score += cfg.conf_drop_15m;
            }
            if features.dist_to_high_pct.abs() <= cfg.dist_to_high_tight {
                score += cfg.conf_near_tight;
            }
            score
        }
    };

    raw.min(1.0)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
