//! # prefilter — universe reduction before any per-symbol fetch
//!
//! Candle fetches are the expensive part of a cycle, so the full ticker
//! universe is cut down first: list filters, volume floor, then keep only
//! the top movers by 24h change.

use std::cmp::Ordering;

use crate::config::Config;
use crate::gate::TickerSnapshot;

/// Ordered candidate list, at most `cfg.max_candidates` long.
///
/// Stable sort: ties in 24h change keep snapshot order, so identical input
/// always yields identical output.
pub fn prefilter(mut tickers: Vec<TickerSnapshot>, cfg: &Config) -> Vec<TickerSnapshot> {
    tickers.retain(|t| {
        if cfg.blacklist.contains(&t.symbol) {
            return false;
        }
        if !cfg.whitelist.is_empty() && !cfg.whitelist.contains(&t.symbol) {
            return false;
        }
        t.volume_24h >= cfg.min_vol_24h
    });

    tickers.sort_by(|a, b| {
        b.change_24h_pct
            .partial_cmp(&a.change_24h_pct)
            .unwrap_or(Ordering::Equal)
    });
    tickers.truncate(cfg.max_candidates);
    tickers
}

// ─── Tests ────────────────────────────────────────────────────────────────────
