//! # scanner — one full evaluation cycle
//!
//! ```text
//! tickers ──▶ prefilter ──▶ bounded concurrent candle fetch
//!                                      │
//!                   (prefilter order)  ▼
//!        ┌─ per candidate: features → qualify → triggers → score ─┐
//!        │                                                        │
//!        └──▶ alert gate: budget check → card → dispatch → pacing ┘
//! ```
//!
//! Fetches run concurrently up to `fetch_concurrency`; everything after them
//! is a single serial loop, so the run budget needs no atomics. A per-symbol
//! failure anywhere is a logged skip; only the snapshot fetch aborts the run.
//! Same snapshot + same candles ⇒ same cards — nothing persists across runs.

use std::collections::HashMap;
use std::time::Instant;

use futures_util::{stream, StreamExt};
use tracing::{debug, info, warn};

use crate::alert::AlertCard;
use crate::candles::CandleSeries;
use crate::config::Config;
use crate::error::{ScanError, SkipReason};
use crate::features::FeatureSet;
use crate::gate::MarketData;
use crate::notify::Dispatch;
use crate::prefilter::prefilter;
use crate::qualify::qualify;
use crate::{scoring, triggers};

/// What one cycle did, for the end-of-run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Instruments in the raw snapshot.
    pub universe:   usize,
    /// Candidates that survived the prefilter.
    pub candidates: usize,
    /// Cards emitted (≤ `max_alerts_per_run`).
    pub alerts:     u32,
}

/// Per-run alert allowance. Owned by this cycle's loop, dies with it.
struct RunBudget {
    remaining: u32,
}

impl RunBudget {
    fn new(max: u32) -> Self {
        Self { remaining: max }
    }

    fn exhausted(&self) -> bool {
        self.remaining == 0
    }

    fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Run one scan cycle. Zero alerts is a successful outcome.
pub async fn run_scan<M, D>(
    market:     &M,
    dispatcher: &D,
    cfg:        &Config,
) -> Result<ScanReport, ScanError>
where
    M: MarketData,
    D: Dispatch,
{
    let deadline = cfg.run_deadline.map(|d| Instant::now() + d);

    // ── 1. Snapshot (systemic on failure) ─────────────────────────────────
    let tickers = market.tickers().await?;
    let universe = tickers.len();

    // ── 2. Prefilter fixes the candidate list and its order ───────────────
    let candidates = prefilter(tickers, cfg);
    info!(universe, candidates = candidates.len(), "prefilter complete");

    // ── 3. Bounded concurrent candle fetch ────────────────────────────────
    // Results land in a map; evaluation below walks the candidates in
    // prefilter order so completion order never affects the output.
    let fetched: Vec<(String, Result<CandleSeries, SkipReason>)> =
        stream::iter(candidates.iter().map(|snap| {
            let symbol = snap.symbol.clone();
            async move {
                if past(deadline) {
                    return (symbol, Err(SkipReason::Deadline));
                }
                let result = market
                    .candles(&symbol, &cfg.candle_interval, cfg.candle_limit)
                    .await;
                (symbol, result)
            }
        }))
        .buffer_unordered(cfg.fetch_concurrency)
        .collect()
        .await;
    let mut series_by_symbol: HashMap<_, _> = fetched.into_iter().collect();

    // ── 4. Serial gate loop ───────────────────────────────────────────────
    let mut budget = RunBudget::new(cfg.max_alerts_per_run);
    let mut alerts = 0u32;
    let now = chrono::Utc::now().timestamp();

    for snap in &candidates {
        if budget.exhausted() {
            info!("alert budget exhausted — stopping candidate processing");
            break;
        }
        if past(deadline) {
            warn!("run deadline reached — returning alerts gated so far");
            break;
        }

        let series = match series_by_symbol.remove(&snap.symbol) {
            Some(Ok(series)) => series,
            Some(Err(reason)) => {
                debug!(symbol = %snap.symbol, %reason, "skipping candidate");
                continue;
            }
            None => continue,
        };

        let features = FeatureSet::extract(&series, snap, now, cfg.ema_period);
        if let Err(reason) = qualify(&series, &features, snap, cfg) {
            debug!(symbol = %snap.symbol, %reason, "candidate not qualified");
            continue;
        }

        let fired = triggers::evaluate(&features, cfg);
        if fired.is_empty() {
            debug!(symbol = %snap.symbol, "qualified but no triggers fired");
            continue;
        }

        let confidence = scoring::confidence(&fired, &features, cfg);
        info!(
            symbol     = %snap.symbol,
            signals    = ?fired,
            confidence,
            age_days   = features.age_days,
            "🚨 reversal triggers fired"
        );

        let card = AlertCard::build(snap, &features, fired, confidence, cfg);
        budget.consume();
        alerts += 1;

        // Budget is spent whether or not the transport accepts the card.
        if let Err(e) = dispatcher.dispatch(&card.header(), &card).await {
            warn!(symbol = %snap.symbol, error = %e, "dispatch failed — continuing");
        }

        if !budget.exhausted() {
            tokio::time::sleep(cfg.dispatch_pacing).await;
        }
    }

    Ok(ScanReport {
        universe,
        candidates: candidates.len(),
        alerts,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::candles::Candle;
    use crate::gate::TickerSnapshot;
    use crate::triggers::Signal;

    struct FakeMarket {
        tickers:      Vec<TickerSnapshot>,
        series:       HashMap<String, Vec<Candle>>,
        fail_tickers: bool,
    }

    impl MarketData for FakeMarket {
        async fn tickers(&self) -> Result<Vec<TickerSnapshot>, ScanError> {
            if self.fail_tickers {
                return Err(ScanError::Snapshot(anyhow::anyhow!("exchange down")));
            }
            Ok(self.tickers.clone())
        }

        async fn candles(
            &self,
            symbol: &str,
            _interval: &str,
            _limit: usize,
        ) -> Result<CandleSeries, SkipReason> {
            self.series
                .get(symbol)
                .cloned()
                .map(|bars| CandleSeries { symbol: symbol.into(), bars })
                .ok_or_else(|| SkipReason::Fetch("connection reset".into()))
        }
    }

    #[derive(Default)]
    struct FakeDispatch {
        sent: Mutex<Vec<AlertCard>>,
        fail: bool,
    }

    impl Dispatch for FakeDispatch {
        async fn dispatch(&self, _header: &str, card: &AlertCard) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(card.clone());
            if self.fail {
                anyhow::bail!("transport rejected");
            }
            Ok(())
        }
    }

    fn make_snap(symbol: &str, change: f64) -> TickerSnapshot {
        TickerSnapshot {
            symbol:         symbol.into(),
            last:           97.0,
            index_price:    None,
            mark_price:     None,
            change_24h_pct: change,
            volume_24h:     5_000_000.0,
            high_24h:       97.4,
            low_24h:        50.0,
        }
    }

    /// 60 bars, 3 days old, ending in a rejection bar: wick ratio 2.0,
    /// 5m change −3%, last price just under the 24h high.
    fn hot_bars(now: i64) -> Vec<Candle> {
        let first_ts = now - 3 * 86_400;
        let mut bars: Vec<Candle> = (0..60)
            .map(|i| Candle {
                open: 100.0, high: 101.0, low: 99.0, close: 100.0,
                volume: 10.0, timestamp: first_ts + i as i64 * 300,
            })
            .collect();
        bars[56].low = 97.0;
        bars[56].close = 98.0;
        bars[59] = Candle {
            open: 100.0, high: 106.0, low: 96.0, close: 97.0,
            volume: 10.0, timestamp: bars[59].timestamp,
        };
        bars
    }

    /// Bars that qualify (fresh + would pass heat via snapshot change) but
    /// trigger nothing: flat closes, no wick, far from the high.
    fn quiet_bars(now: i64) -> Vec<Candle> {
        let first_ts = now - 3 * 86_400;
        (0..60)
            .map(|i| Candle {
                open: 80.0, high: 80.0, low: 80.0, close: 80.0,
                volume: 10.0, timestamp: first_ts + i as i64 * 300,
            })
            .collect()
    }

    fn test_cfg() -> Config {
        let mut cfg = Config::or_profile();
        cfg.dispatch_pacing = Duration::ZERO;
        cfg
    }

    #[tokio::test]
    async fn test_hot_new_listing_fires_three_signals() {
        let now = chrono::Utc::now().timestamp();
        let market = FakeMarket {
            tickers:      vec![make_snap("NEW_USDT", 85.0)],
            series:       HashMap::from([("NEW_USDT".to_string(), hot_bars(now))]),
            fail_tickers: false,
        };
        let dispatch = FakeDispatch::default();

        let report = run_scan(&market, &dispatch, &test_cfg()).await.unwrap();
        assert_eq!(report.alerts, 1);

        let sent = dispatch.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].symbol, "NEW_USDT");
        assert_eq!(
            sent[0].signals,
            vec![Signal::WickExhaustion, Signal::Drop5m, Signal::Near24hHigh],
        );
        assert_eq!(sent[0].confidence_0to1, 0.85);
    }

    #[tokio::test]
    async fn test_budget_stops_processing_remaining_candidates() {
        let now = chrono::Utc::now().timestamp();
        let market = FakeMarket {
            // AAA ranks first by 24h change
            tickers: vec![make_snap("AAA_USDT", 90.0), make_snap("BBB_USDT", 80.0)],
            series: HashMap::from([
                ("AAA_USDT".to_string(), hot_bars(now)),
                ("BBB_USDT".to_string(), hot_bars(now)),
            ]),
            fail_tickers: false,
        };
        let dispatch = FakeDispatch::default();
        let mut cfg = test_cfg();
        cfg.max_alerts_per_run = 1;

        let report = run_scan(&market, &dispatch, &cfg).await.unwrap();
        assert_eq!(report.alerts, 1);

        let sent = dispatch.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].symbol, "AAA_USDT");
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_symbol_not_run() {
        let now = chrono::Utc::now().timestamp();
        let market = FakeMarket {
            // AAA has no candle data — its fetch fails
            tickers: vec![make_snap("AAA_USDT", 90.0), make_snap("BBB_USDT", 80.0)],
            series: HashMap::from([("BBB_USDT".to_string(), hot_bars(now))]),
            fail_tickers: false,
        };
        let dispatch = FakeDispatch::default();

        let report = run_scan(&market, &dispatch, &test_cfg()).await.unwrap();
        assert_eq!(report.candidates, 2);
        assert_eq!(report.alerts, 1);
        assert_eq!(dispatch.sent.lock().unwrap()[0].symbol, "BBB_USDT");
    }

    #[tokio::test]
    async fn test_quiet_market_is_silent_success() {
        let now = chrono::Utc::now().timestamp();
        // Hot by 24h change, but price has already faded well off the high
        // and the last bar shows no rejection — qualified, nothing fires.
        let mut snap = make_snap("AAA_USDT", 85.0);
        snap.last = 80.0;
        let market = FakeMarket {
            tickers:      vec![snap],
            series:       HashMap::from([("AAA_USDT".to_string(), quiet_bars(now))]),
            fail_tickers: false,
        };
        let dispatch = FakeDispatch::default();

        let report = run_scan(&market, &dispatch, &test_cfg()).await.unwrap();
        assert_eq!(report.alerts, 0);
        assert!(dispatch.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_failure_aborts_run() {
        let market = FakeMarket {
            tickers:      vec![],
            series:       HashMap::new(),
            fail_tickers: true,
        };
        let dispatch = FakeDispatch::default();

        let result = run_scan(&market, &dispatch, &test_cfg()).await;
        assert!(matches!(result, Err(ScanError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_dispatch_failure_spends_budget_and_continues() {
        let now = chrono::Utc::now().timestamp();
        let market = FakeMarket {
            tickers: vec![make_snap("AAA_USDT", 90.0), make_snap("BBB_USDT", 80.0)],
            series: HashMap::from([
                ("AAA_USDT".to_string(), hot_bars(now)),
                ("BBB_USDT".to_string(), hot_bars(now)),
            ]),
            fail_tickers: false,
        };
        let dispatch = FakeDispatch { fail: true, ..Default::default() };

        let report = run_scan(&market, &dispatch, &test_cfg()).await.unwrap();
        // Both cards attempted: a rejected dispatch neither refunds the
        // budget nor aborts the remaining candidates.
        assert_eq!(report.alerts, 2);
        assert_eq!(dispatch.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_expired_deadline_returns_empty_handed() {
        let now = chrono::Utc::now().timestamp();
        let market = FakeMarket {
            tickers:      vec![make_snap("AAA_USDT", 90.0)],
            series:       HashMap::from([("AAA_USDT".to_string(), hot_bars(now))]),
            fail_tickers: false,
        };
        let dispatch = FakeDispatch::default();
        let mut cfg = test_cfg();
        cfg.run_deadline = Some(Duration::ZERO);

        let report = run_scan(&market, &dispatch, &cfg).await.unwrap();
        assert_eq!(report.alerts, 0);
        assert!(dispatch.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_budget_counter_monotone() {
        let mut budget = RunBudget::new(2);
        assert!(!budget.exhausted());
        budget.consume();
        budget.consume();
        assert!(budget.exhausted());
        budget.consume(); // saturates, never wraps
        assert!(budget.exhausted());
    }
}
