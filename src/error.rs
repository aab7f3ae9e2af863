//! # error
//!
//! Two-tier failure taxonomy for one scan cycle:
//!
//! - [`ScanError`] — systemic: the run itself cannot proceed (the ticker
//!   snapshot is the root input; without it there is nothing to prefilter).
//! - [`SkipReason`] — per-symbol: logged, the symbol is dropped, the run
//!   continues. A run that skips every candidate still completes with zero
//!   alerts, which is a valid silent outcome.
//!
//! No retries happen here; retry policy belongs to the transports.

use thiserror::Error;

/// Run-fatal errors. Surfaced to the caller; no partial prefilter is attempted.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The ticker snapshot fetch or decode failed.
    #[error("ticker snapshot unavailable: {0}")]
    Snapshot(#[source] anyhow::Error),
}

/// Why one symbol was dropped mid-run. Never aborts the cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    /// Candle fetch timed out or the transport failed.
    #[error("candle fetch failed: {0}")]
    Fetch(String),

    /// Bars decoded under neither wire layout, or series invariants broke.
    #[error("malformed candle payload: {0}")]
    MalformedCandles(&'static str),

    /// Too few bars for a stable EMA and the lookback windows.
    #[error("insufficient bars: {got} < {need}")]
    InsufficientBars { got: usize, need: usize },

    /// First bar is older than the freshness gate allows.
    #[error("instrument too old: {age_days:.1}d > {max_days:.1}d")]
    TooOld { age_days: f64, max_days: f64 },

    /// Neither the 24h-change nor the EMA-acceleration heat check passed.
    #[error("not hot enough: 24h change and EMA acceleration below thresholds")]
    NotHot,

    /// The run deadline passed before this symbol was fetched or evaluated.
    #[error("run deadline reached")]
    Deadline,
}
