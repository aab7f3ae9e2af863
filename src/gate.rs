//! # gate — market data collaborator
//!
//! The pipeline only ever sees [`MarketData`]; [`GateClient`] is the real
//! implementation against the Gate v4 REST API. Tests drive the pipeline
//! with an in-memory fake instead.
//!
//! Wire quirks handled here:
//! - ticker numerics arrive as strings, `change_percentage` may carry `%`
//! - rows with unparseable numerics are dropped silently, never errors
//! - candlestick bars arrive as raw JSON arrays in one of two field orders
//!   (see [`crate::candles`])

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::candles::{decode_series, CandleSeries};
use crate::error::{ScanError, SkipReason};

pub const GATE_API: &str = "https://api.gateio.ws";

/// One row of the USDT-perpetual ticker universe, numerics already parsed.
#[derive(Debug, Clone, Serialize)]
pub struct TickerSnapshot {
    pub symbol:         String,
    pub last:           f64,
    pub index_price:    Option<f64>,
    pub mark_price:     Option<f64>,
    pub change_24h_pct: f64,
    /// 24h quote volume in USDT.
    pub volume_24h:     f64,
    pub high_24h:       f64,
    pub low_24h:        f64,
}

/// Ticker row exactly as the exchange sends it.
#[derive(Debug, Deserialize)]
struct RawTicker {
    contract:          String,
    last:              Option<String>,
    index_price:       Option<String>,
    mark_price:        Option<String>,
    change_percentage: Option<String>,
    volume_24h_quote:  Option<String>,
    volume_24h:        Option<String>,
    high_24h:          Option<String>,
    low_24h:           Option<String>,
}

/// Missing field → default; present but unparseable → `None` (row dropped).
fn num_or(field: &Option<String>, default: f64) -> Option<f64> {
    match field {
        Some(s) => s.trim().trim_end_matches('%').parse().ok(),
        None => Some(default),
    }
}

impl RawTicker {
    fn parse(self) -> Option<TickerSnapshot> {
        let index_price: Option<f64> = match &self.index_price {
            Some(s) => Some(s.parse().ok()?),
            None => None,
        };
        let mark_price: Option<f64> = match &self.mark_price {
            Some(s) => Some(s.parse().ok()?),
            None => None,
        };
        // Quote volume preferred, base volume as a stand-in when absent.
        let volume_24h = if self.volume_24h_quote.is_some() {
            num_or(&self.volume_24h_quote, 0.0)?
        } else {
            num_or(&self.volume_24h, 0.0)?
        };
        let last           = num_or(&self.last, 0.0)?;
        let change_24h_pct = num_or(&self.change_percentage, 0.0)?;
        let high_24h       = num_or(&self.high_24h, 0.0)?;
        let low_24h        = num_or(&self.low_24h, 0.0)?;

        Some(TickerSnapshot {
            symbol: self.contract,
            last,
            index_price,
            mark_price,
            change_24h_pct,
            volume_24h,
            high_24h,
            low_24h,
        })
    }
}

/// What the pipeline needs from the outside world, per cycle:
/// one ticker snapshot, then candle series per candidate.
pub trait MarketData {
    /// Full universe snapshot. Failure here is systemic — the run aborts.
    async fn tickers(&self) -> Result<Vec<TickerSnapshot>, ScanError>;

    /// Candle series for one contract. Failure skips that symbol only.
    async fn candles(
        &self,
        symbol:   &str,
        interval: &str,
        limit:    usize,
    ) -> Result<CandleSeries, SkipReason>;
}

/// REST client for the Gate v4 futures endpoints.
#[derive(Debug, Clone)]
pub struct GateClient {
    client:   reqwest::Client,
    base_url: String,
    timeout:  std::time::Duration,
}

impl GateClient {
    pub fn new(client: reqwest::Client, timeout: std::time::Duration) -> Self {
        Self {
            client,
            base_url: GATE_API.to_string(),
            timeout,
        }
    }
}

impl MarketData for GateClient {
    async fn tickers(&self) -> Result<Vec<TickerSnapshot>, ScanError> {
        let url = format!("{}/api/v4/futures/usdt/tickers", self.base_url);

        let rows: Vec<RawTicker> = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .context("tickers endpoint unreachable")
            .map_err(ScanError::Snapshot)?
            .error_for_status()
            .context("tickers endpoint returned an error status")
            .map_err(ScanError::Snapshot)?
            .json()
            .await
            .context("failed to decode tickers response")
            .map_err(ScanError::Snapshot)?;

        // Malformed rows vanish here; the pipeline never sees them.
        Ok(rows.into_iter().filter_map(RawTicker::parse).collect())
    }

    async fn candles(
        &self,
        symbol:   &str,
        interval: &str,
        limit:    usize,
    ) -> Result<CandleSeries, SkipReason> {
        let url = format!("{}/api/v4/futures/usdt/candlesticks", self.base_url);
        let limit = limit.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("contract", symbol),
                ("interval", interval),
                ("limit", limit.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SkipReason::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| SkipReason::Fetch(e.to_string()))?;

        let raw: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| SkipReason::Fetch(e.to_string()))?;

        decode_series(symbol, raw)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
