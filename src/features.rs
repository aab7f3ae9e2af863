//! # features — derived technicals for one symbol
//!
//! Pure functions from a normalized [`CandleSeries`] (plus the snapshot's
//! last price and reported 24h high) to a [`FeatureSet`]. Recomputed from
//! scratch every cycle; nothing here carries state between runs.

use serde::Serialize;

use crate::candles::CandleSeries;
use crate::gate::TickerSnapshot;

/// Body-size floor for the wick ratio, so a doji divides by something.
const BODY_EPSILON: f64 = 1e-9;

/// Fallback window for the 24h high when the snapshot doesn't report one:
/// 288 × 5m bars ≈ 24 hours.
const HIGH_LOOKBACK_BARS: usize = 288;

/// Final value of an EMA seeded with the first element.
///
/// k = 2/(period+1); the whole series is folded each call, so the result is
/// deterministic and restartable. Returns 0.0 for an empty slice.
pub fn ema_last(values: &[f64], period: usize) -> f64 {
    let k = 2.0 / (period as f64 + 1.0);
    let mut iter = values.iter();
    let mut ema = match iter.next() {
        Some(&first) => first,
        None => return 0.0,
    };
    for &v in iter {
        ema = v * k + ema * (1.0 - k);
    }
    ema
}

/// Percent change of `a` relative to `b`: (a/b − 1) × 100.
/// Defined as 0.0 when the denominator is zero.
pub fn pct(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        0.0
    } else {
        (a / b - 1.0) * 100.0
    }
}

/// Everything the qualifier, trigger evaluator and scorer look at.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSet {
    /// EMA of closes over the configured period (default 25).
    pub ema:              f64,
    /// Latest close vs. one bar back ("5-minute" change), percent.
    pub chg_5m_pct:       f64,
    /// Latest close vs. three bars back ("15-minute" change), percent.
    pub chg_15m_pct:      f64,
    /// Upper-shadow length of the latest bar relative to its body.
    pub wick_ratio:       f64,
    /// Percent distance of last price from the 24h high (negative = below).
    pub dist_to_high_pct: f64,
    /// The high actually used: snapshot 24h high, or the bar-window fallback.
    pub high_24h_used:    f64,
    /// Now minus first bar's open time, in days.
    pub age_days:         f64,
}

impl FeatureSet {
    /// Extract features from a non-empty series. `now` is unix seconds.
    pub fn extract(
        series:     &CandleSeries,
        snap:       &TickerSnapshot,
        now:        i64,
        ema_period: usize,
    ) -> Self {
        debug_assert!(!series.is_empty(), "extract requires a normalized, non-empty series");

        let closes = series.closes();
        let n = closes.len();

        let chg_5m_pct  = if n >= 2 { pct(closes[n - 1], closes[n - 2]) } else { 0.0 };
        let chg_15m_pct = if n >= 4 { pct(closes[n - 1], closes[n - 4]) } else { 0.0 };

        let last_bar = series.last();
        let body  = (last_bar.close - last_bar.open).abs();
        let upper = (last_bar.high - last_bar.close.max(last_bar.open)).max(0.0);
        let wick_ratio = upper / if body == 0.0 { BODY_EPSILON } else { body };

        let high_24h_used = if snap.high_24h > 0.0 {
            snap.high_24h
        } else {
            series.max_high_recent(HIGH_LOOKBACK_BARS)
        };

        Self {
            ema:              ema_last(&closes, ema_period),
            chg_5m_pct,
            chg_15m_pct,
            wick_ratio,
            dist_to_high_pct: pct(snap.last, high_24h_used),
            high_24h_used,
            age_days:         (now - series.first().timestamp) as f64 / 86_400.0,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
