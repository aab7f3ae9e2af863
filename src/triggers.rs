//! # triggers — the reversal-signal predicate set
//!
//! Four predicates over the [`FeatureSet`]:
//!
//! ```text
//! wick_exhaustion — upper shadow ≥ wick_ratio_min of the body
//! drop_5m         — 5m change  ≤ drop_5m_pct_max  (negative)
//! drop_15m        — 15m change ≤ drop_15m_pct_max (negative)
//! near_24h_high   — |distance to 24h high| ≤ dist_to_high_max
//! ```
//!
//! Under [`TriggerPolicy::Or`] each true predicate contributes its own
//! signal. Under [`TriggerPolicy::And`] the compound condition
//! wick AND (drop_5m OR drop_15m) AND near must hold; when it does, every
//! contributing sub-signal is reported atomically — the evaluation never
//! short-circuits in a way that hides a co-true drop leg.
//!
//! Empty result ⇒ no alert for this symbol this run.

use serde::Serialize;

use crate::config::{Config, TriggerPolicy};
use crate::features::FeatureSet;

/// A named reversal characteristic, serialized as it appears on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signal {
    #[serde(rename = "wick_exhaustion")]
    WickExhaustion,
    #[serde(rename = "drop_5m")]
    Drop5m,
    #[serde(rename = "drop_15m")]
    Drop15m,
    #[serde(rename = "near_24h_high")]
    Near24hHigh,
}

/// Fired signals in fixed declaration order (membership is what matters).
pub fn evaluate(features: &FeatureSet, cfg: &Config) -> Vec<Signal> {
    let wick = features.wick_ratio >= cfg.wick_ratio_min;
    let d5   = features.chg_5m_pct <= cfg.drop_5m_pct_max;
    let d15  = features.chg_15m_pct <= cfg.drop_15m_pct_max;
    let near = features.dist_to_high_pct.abs() <= cfg.dist_to_high_max;

    let mut fired = Vec::new();
    match cfg.trigger_policy {
        TriggerPolicy::Or => {
            if wick { fired.push(Signal::WickExhaustion); }
            if d5   { fired.push(Signal::Drop5m); }
            if d15  { fired.push(Signal::Drop15m); }
            if near { fired.push(Signal::Near24hHigh); }
        }
        TriggerPolicy::And => {
            if wick && (d5 || d15) && near {
                fired.push(Signal::WickExhaustion);
                if d5  { fired.push(Signal::Drop5m); }
                if d15 { fired.push(Signal::Drop15m); }
                fired.push(Signal::Near24hHigh);
            }
        }
    }
    fired
}

// ─── Tests ────────────────────────────────────────────────────────────────────
