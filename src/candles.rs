//! # candles — OHLCV bars and the dual wire-layout decode
//!
//! The candlestick feed ships a bar as a 6-element JSON array, but two field
//! orders exist in the wild:
//!
//! ```text
//! layout A (volume-first): [t, vol, close, high, low, open]
//! layout B (OHLC-first):   [t, open, high, low, close, vol]
//! ```
//!
//! Decode strategy: try A, validate the bar's internal invariants, fall back
//! to B, and if neither produces a sane bar the whole series is flagged
//! malformed — the symbol is skipped, never the run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SkipReason;

/// One normalized OHLCV bar. `timestamp` is unix seconds (bar open time).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open:      f64,
    pub high:      f64,
    pub low:       f64,
    pub close:     f64,
    pub volume:    f64,
    pub timestamp: i64,
}

impl Candle {
    /// OHLC consistency: finite, non-negative, high/low actually bracket
    /// open and close. A bar read under the wrong layout almost always
    /// fails this.
    pub fn is_sane(&self) -> bool {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        fields.iter().all(|v| v.is_finite() && *v >= 0.0)
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Ordered bars for one contract, strictly ascending by open time.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    pub symbol: String,
    pub bars:   Vec<Candle>,
}

impl CandleSeries {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> &Candle {
        &self.bars[0]
    }

    pub fn last(&self) -> &Candle {
        &self.bars[self.bars.len() - 1]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Maximum high over the most recent `n` bars (all bars if fewer).
    pub fn max_high_recent(&self, n: usize) -> f64 {
        let start = self.bars.len().saturating_sub(n);
        self.bars[start..]
            .iter()
            .map(|b| b.high)
            .fold(f64::MIN, f64::max)
    }
}

/// Accept numbers that arrive either as JSON numbers or as decimal strings.
fn field_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn field_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn bar_from(ts: i64, o: &Value, h: &Value, l: &Value, c: &Value, v: &Value) -> Option<Candle> {
    Some(Candle {
        open:      field_f64(o)?,
        high:      field_f64(h)?,
        low:       field_f64(l)?,
        close:     field_f64(c)?,
        volume:    field_f64(v)?,
        timestamp: ts,
    })
}

/// Decode one raw bar, preferring the volume-first layout.
pub fn decode_bar(raw: &Value) -> Option<Candle> {
    let arr = raw.as_array()?;
    if arr.len() < 6 {
        return None;
    }
    let ts = field_i64(&arr[0])?;

    // Layout A: [t, vol, close, high, low, open]
    if let Some(bar) = bar_from(ts, &arr[5], &arr[3], &arr[4], &arr[2], &arr[1]) {
        if bar.is_sane() {
            return Some(bar);
        }
    }
    // Layout B: [t, open, high, low, close, vol]
    let bar = bar_from(ts, &arr[1], &arr[2], &arr[3], &arr[4], &arr[5])?;
    bar.is_sane().then_some(bar)
}

/// Decode a full payload into a normalized series: every bar must decode
/// under one of the two layouts, and after ascending sort the open times
/// must be strictly increasing.
pub fn decode_series(symbol: &str, raw: Vec<Value>) -> Result<CandleSeries, SkipReason> {
    if raw.is_empty() {
        return Err(SkipReason::MalformedCandles("empty candle payload"));
    }

    let mut bars = Vec::with_capacity(raw.len());
    for item in &raw {
        match decode_bar(item) {
            Some(bar) => bars.push(bar),
            None => return Err(SkipReason::MalformedCandles("bar decodes under neither layout")),
        }
    }

    bars.sort_by_key(|b| b.timestamp);
    if bars.windows(2).any(|w| w[1].timestamp <= w[0].timestamp) {
        return Err(SkipReason::MalformedCandles("timestamps not strictly increasing"));
    }

    Ok(CandleSeries {
        symbol: symbol.to_string(),
        bars,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_volume_first_layout() {
        // [t, vol, close, high, low, open]
        let raw = json!([1_700_000_000, "1234.5", "101.0", "105.0", "99.0", "100.0"]);
        let bar = decode_bar(&raw).unwrap();
        assert_eq!(bar.timestamp, 1_700_000_000);
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.high, 105.0);
        assert_eq!(bar.low, 99.0);
        assert_eq!(bar.close, 101.0);
        assert_eq!(bar.volume, 1234.5);
    }

    #[test]
    fn test_decode_falls_back_to_ohlc_first_layout() {
        // [t, open, high, low, close, vol] — read as volume-first this puts
        // "high" where close goes and fails the high>=low bracket check.
        let raw = json!([1_700_000_000, "100.0", "105.0", "99.0", "101.0", "1234.5"]);
        let bar = decode_bar(&raw).unwrap();
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.high, 105.0);
        assert_eq!(bar.low, 99.0);
        assert_eq!(bar.close, 101.0);
        assert_eq!(bar.volume, 1234.5);
    }

    #[test]
    fn test_decode_rejects_garbage_bar() {
        assert!(decode_bar(&json!([1_700_000_000, "x", "y", "z", "1", "2"])).is_none());
        assert!(decode_bar(&json!([1_700_000_000, 1.0])).is_none());
        assert!(decode_bar(&json!("not an array")).is_none());
    }

    #[test]
    fn test_decode_rejects_negative_price() {
        let raw = json!([1_700_000_000, "10.0", "-101.0", "105.0", "99.0", "100.0"]);
        assert!(decode_bar(&raw).is_none());
    }

    #[test]
    fn test_series_sorted_ascending() {
        let raw = vec![
            json!([200, "1.0", "10.0", "11.0", "9.0", "10.0"]),
            json!([100, "1.0", "10.0", "11.0", "9.0", "10.0"]),
        ];
        let series = decode_series("X_USDT", raw).unwrap();
        assert_eq!(series.bars[0].timestamp, 100);
        assert_eq!(series.bars[1].timestamp, 200);
    }

    #[test]
    fn test_series_rejects_duplicate_timestamps() {
        let raw = vec![
            json!([100, "1.0", "10.0", "11.0", "9.0", "10.0"]),
            json!([100, "1.0", "10.0", "11.0", "9.0", "10.0"]),
        ];
        assert_eq!(
            decode_series("X_USDT", raw).unwrap_err(),
            SkipReason::MalformedCandles("timestamps not strictly increasing"),
        );
    }

    #[test]
    fn test_series_rejects_empty_payload() {
        assert!(matches!(
            decode_series("X_USDT", vec![]),
            Err(SkipReason::MalformedCandles(_)),
        ));
    }

    #[test]
    fn test_max_high_recent_windows() {
        let bar = |ts: i64, high: f64| Candle {
            open: 1.0, high, low: 1.0, close: 1.0, volume: 0.0, timestamp: ts,
        };
        let series = CandleSeries {
            symbol: "X_USDT".into(),
            bars:   vec![bar(1, 50.0), bar(2, 10.0), bar(3, 20.0)],
        };
        assert_eq!(series.max_high_recent(2), 20.0);
        assert_eq!(series.max_high_recent(10), 50.0);
    }
}
