//! # alert — the emitted card
//!
//! One [`AlertCard`] per (symbol, run) pair, never merged or updated. The
//! JSON layout follows the `gate.short_candidate.v1` schema so downstream
//! consumers can key on `schema` and ignore fields they don't know.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::features::FeatureSet;
use crate::gate::TickerSnapshot;
use crate::triggers::Signal;

pub const CARD_SCHEMA: &str = "gate.short_candidate.v1";

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceBlock {
    pub last:    f64,
    pub index:   Option<f64>,
    pub mark:    Option<f64>,
    pub high24h: f64,
    pub low24h:  f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MomentumBlock {
    pub chg_5m_pct:  f64,
    pub chg_15m_pct: f64,
    pub chg_24h_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeBlock {
    pub vol_24h_usdt: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaBlock {
    pub wick_ratio:           f64,
    pub dist_to_24h_high_pct: f64,
    /// Price is effectively printing a fresh 24h high (|dist| < 0.05%).
    pub new_24h_high:         bool,
}

/// Derivatives context. Not computed by this scanner; kept in the schema so
/// consumers see explicit nulls rather than missing keys.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DerivsBlock {
    pub funding_rate_pct:    Option<f64>,
    pub open_interest_usdt:  Option<f64>,
    pub basis_pct:           Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinksBlock {
    pub trade: String,
    pub kline: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RawRefs {
    pub tickers: String,
    pub candles: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertCard {
    pub schema:           &'static str,
    pub alert_id:         Uuid,
    pub generated_at_utc: String,
    pub symbol:           String,
    pub market:           &'static str,
    pub exchange:         &'static str,
    pub age_days:         f64,
    pub price:            PriceBlock,
    pub momentum:         MomentumBlock,
    pub volume:           VolumeBlock,
    pub ta:               TaBlock,
    pub derivs:           DerivsBlock,
    pub signals:          Vec<Signal>,
    pub confidence_0to1:  f64,
    pub links:            LinksBlock,
    pub raw_refs:         RawRefs,
}

impl AlertCard {
    pub fn build(
        snap:       &TickerSnapshot,
        features:   &FeatureSet,
        signals:    Vec<Signal>,
        confidence: f64,
        cfg:        &Config,
    ) -> Self {
        let symbol = snap.symbol.clone();
        Self {
            schema:           CARD_SCHEMA,
            alert_id:         Uuid::new_v4(),
            generated_at_utc: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            market:           "futures",
            exchange:         "gate",
            age_days:         round1(features.age_days),
            price: PriceBlock {
                last:    snap.last,
                index:   snap.index_price,
                mark:    snap.mark_price,
                high24h: features.high_24h_used,
                low24h:  snap.low_24h,
            },
            momentum: MomentumBlock {
                chg_5m_pct:  round2(features.chg_5m_pct),
                chg_15m_pct: round2(features.chg_15m_pct),
                chg_24h_pct: round2(snap.change_24h_pct),
            },
            volume: VolumeBlock {
                vol_24h_usdt: snap.volume_24h,
            },
            ta: TaBlock {
                wick_ratio:           round2(features.wick_ratio),
                dist_to_24h_high_pct: round2(features.dist_to_high_pct),
                new_24h_high:         features.dist_to_high_pct.abs() < 0.05,
            },
            derivs: DerivsBlock::default(),
            signals,
            confidence_0to1: round2(confidence),
            links: LinksBlock {
                trade: format!("https://www.gate.io/futures_trade/USDT/{symbol}"),
                kline: format!("https://www.gate.io/futures_market/{symbol}"),
            },
            raw_refs: RawRefs {
                tickers: "/api/v4/futures/usdt/tickers".to_string(),
                candles: format!(
                    "/api/v4/futures/usdt/candlesticks?contract={symbol}&interval={}&limit={}",
                    cfg.candle_interval, cfg.candle_limit,
                ),
            },
            symbol,
        }
    }

    /// One-line human header sent ahead of the JSON payload.
    pub fn header(&self) -> String {
        format!(
            "📉 Short candidate: {} (listed {:.1}d ago / 24h {:+.1}%)",
            self.symbol, self.age_days, self.momentum.chg_24h_pct,
        )
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
