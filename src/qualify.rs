//! # qualify — is this candidate worth deep inspection?
//!
//! Two independent gates, both must pass before trigger evaluation:
//!
//! 1. **Freshness** — the contract must be new: enough bars for stable
//!    features, and the first bar no older than the configured maximum.
//!    Age comes from the candles, not the snapshot (the snapshot carries
//!    no listing date).
//! 2. **Heat** — the move must still be live: 24h change over threshold,
//!    OR last price stretched over the EMA by the acceleration ratio.
//!
//! A failed gate is a skip with a reason, never an error.

use crate::candles::CandleSeries;
use crate::config::Config;
use crate::error::SkipReason;
use crate::features::FeatureSet;
use crate::gate::TickerSnapshot;

pub fn qualify(
    series:   &CandleSeries,
    features: &FeatureSet,
    snap:     &TickerSnapshot,
    cfg:      &Config,
) -> Result<(), SkipReason> {
    // ── [1] Freshness gate ────────────────────────────────────────────────
    if series.len() < cfg.min_bars {
        return Err(SkipReason::InsufficientBars {
            got:  series.len(),
            need: cfg.min_bars,
        });
    }
    if features.age_days > cfg.max_age_days {
        return Err(SkipReason::TooOld {
            age_days: features.age_days,
            max_days: cfg.max_age_days,
        });
    }

    // ── [2] Heat gate (either leg suffices) ───────────────────────────────
    let hot_by_change = snap.change_24h_pct >= cfg.heat_change_pct;
    let hot_by_accel =
        features.ema > 0.0 && snap.last / features.ema >= cfg.heat_accel_ratio;

    if !(hot_by_change || hot_by_accel) {
        return Err(SkipReason::NotHot);
    }

    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
