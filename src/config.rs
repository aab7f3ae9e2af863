//! # config — scan parameters from environment variables
//!
//! Every tunable of the pipeline lives here as one immutable struct, built
//! once in `main` and passed by reference into each stage.
//!
//! `SCAN_PROFILE` picks a named baseline:
//! - `or`       — four independent reversal predicates, any hit alerts
//! - `compound` — wick AND (5m drop OR 15m drop) AND near-high, all at once
//!
//! Individual variables then override single fields, so a profile is a
//! starting point rather than a separate code path.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::bail;

/// How the four reversal predicates compose into a trigger decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Every independently true predicate contributes its own signal.
    Or,
    /// Compound reversal: wick AND (drop_5m OR drop_15m) AND near_24h_high.
    And,
}

impl std::fmt::Display for TriggerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerPolicy::Or  => write!(f, "or"),
            TriggerPolicy::And => write!(f, "compound"),
        }
    }
}

/// Mainstream contracts the scanner never watches — the hunt is for fresh
/// alt listings, not majors.
const DEFAULT_BLACKLIST: [&str; 10] = [
    "BTC_USDT", "ETH_USDT", "BNB_USDT", "SOL_USDT", "XRP_USDT",
    "ADA_USDT", "DOGE_USDT", "TRX_USDT", "TON_USDT", "DOT_USDT",
];

#[derive(Debug, Clone)]
pub struct Config {
    // ── Universe prefilter ────────────────────────────────────────────────
    /// Contracts never scanned.
    pub blacklist:          HashSet<String>,
    /// If non-empty, only these contracts are scanned.
    pub whitelist:          HashSet<String>,
    /// Minimum 24h quote volume in USDT. 0 disables the check.
    pub min_vol_24h:        f64,
    /// Keep at most this many candidates, ranked by 24h change.
    pub max_candidates:     usize,

    // ── Candle fetch ──────────────────────────────────────────────────────
    pub candle_interval:    String,
    /// 288 × 5m ≈ 24h of bars.
    pub candle_limit:       usize,

    // ── Candidate qualifier ───────────────────────────────────────────────
    /// Freshness gate: first bar must be at most this many days old.
    pub max_age_days:       f64,
    /// Minimum series length for a stable EMA and the lookback windows.
    pub min_bars:           usize,
    /// Heat gate (a): 24h change ≥ this percent.
    pub heat_change_pct:    f64,
    /// Heat gate (b): last / EMA ≥ this ratio (EMA must be > 0).
    pub heat_accel_ratio:   f64,
    pub ema_period:         usize,

    // ── Trigger thresholds ────────────────────────────────────────────────
    pub trigger_policy:     TriggerPolicy,
    pub wick_ratio_min:     f64,
    /// Negative percent: 5m change at or below this fires.
    pub drop_5m_pct_max:    f64,
    /// Negative percent: 15m change at or below this fires.
    pub drop_15m_pct_max:   f64,
    /// |distance to 24h high| at or below this percent fires.
    pub dist_to_high_max:   f64,
    /// Tighter inner band, used by the compound-policy scorer.
    pub dist_to_high_tight: f64,

    // ── Confidence scorer ─────────────────────────────────────────────────
    pub conf_base:          f64,
    /// OR policy: added once per fired signal.
    pub conf_per_signal:    f64,
    /// Compound policy: named per-signal increments.
    pub conf_drop_5m:       f64,
    pub conf_drop_15m:      f64,
    pub conf_near_tight:    f64,

    // ── Alert gate & resources ────────────────────────────────────────────
    pub max_alerts_per_run: u32,
    /// Pause between successive dispatches (downstream rate limits).
    pub dispatch_pacing:    Duration,
    pub fetch_concurrency:  usize,
    pub fetch_timeout:      Duration,
    /// Optional soft deadline for the whole cycle.
    pub run_deadline:       Option<Duration>,
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Comma-separated list → set. Empty var → empty set.
fn env_set(key: &str) -> Option<HashSet<String>> {
    let raw = std::env::var(key).ok()?;
    Some(
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

impl Config {
    /// Baseline: OR composition with the classic blow-off-top thresholds.
    pub fn or_profile() -> Self {
        Self {
            blacklist:          DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect(),
            whitelist:          HashSet::new(),
            min_vol_24h:        0.0,
            max_candidates:     60,
            candle_interval:    "5m".to_string(),
            candle_limit:       288,
            max_age_days:       14.0,
            min_bars:           50,
            heat_change_pct:    50.0,
            heat_accel_ratio:   1.25,
            ema_period:         25,
            trigger_policy:     TriggerPolicy::Or,
            wick_ratio_min:     1.7,
            drop_5m_pct_max:    -2.5,
            drop_15m_pct_max:   -5.0,
            dist_to_high_max:   1.5,
            dist_to_high_tight: 0.5,
            conf_base:          0.4,
            conf_per_signal:    0.15,
            conf_drop_5m:       0.2,
            conf_drop_15m:      0.2,
            conf_near_tight:    0.1,
            max_alerts_per_run: 5,
            dispatch_pacing:    Duration::from_secs(1),
            fetch_concurrency:  8,
            fetch_timeout:      Duration::from_secs(15),
            run_deadline:       None,
        }
    }

    /// Baseline: compound reversal. Softer per-predicate thresholds, since
    /// all legs must hold at once; the heat gate opens wider too.
    pub fn compound_profile() -> Self {
        Self {
            trigger_policy:     TriggerPolicy::And,
            wick_ratio_min:     1.5,
            drop_5m_pct_max:    -2.0,
            drop_15m_pct_max:   -4.0,
            dist_to_high_max:   2.0,
            heat_change_pct:    30.0,
            ..Self::or_profile()
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let profile = std::env::var("SCAN_PROFILE")
            .unwrap_or_else(|_| "or".to_string())
            .to_lowercase();

        let mut cfg = match profile.as_str() {
            "or"       => Self::or_profile(),
            "compound" => Self::compound_profile(),
            other => bail!("Unknown SCAN_PROFILE: '{other}'. Use 'or' or 'compound'"),
        };

        if let Some(set) = env_set("BLACKLIST") {
            cfg.blacklist = set;
        }
        if let Some(set) = env_set("WHITELIST") {
            cfg.whitelist = set;
        }
        if let Ok(policy) = std::env::var("TRIGGER_POLICY") {
            cfg.trigger_policy = match policy.to_lowercase().as_str() {
                "or"               => TriggerPolicy::Or,
                "and" | "compound" => TriggerPolicy::And,
                other => bail!("Unknown TRIGGER_POLICY: '{other}'. Use 'or' or 'and'"),
            };
        }

        cfg.min_vol_24h        = env_f64("MIN_VOL_24H", cfg.min_vol_24h);
        cfg.max_candidates     = env_usize("TOP_N_BY_CHANGE", cfg.max_candidates);
        cfg.candle_interval    = std::env::var("CANDLE_INTERVAL").unwrap_or(cfg.candle_interval);
        cfg.candle_limit       = env_usize("CANDLE_LIMIT", cfg.candle_limit);
        cfg.max_age_days       = env_f64("MAX_AGE_DAYS", cfg.max_age_days);
        cfg.min_bars           = env_usize("MIN_BARS", cfg.min_bars);
        cfg.heat_change_pct    = env_f64("HEAT_CHANGE_PCT", cfg.heat_change_pct);
        cfg.heat_accel_ratio   = env_f64("HEAT_ACCEL_RATIO", cfg.heat_accel_ratio);
        cfg.ema_period         = env_usize("EMA_PERIOD", cfg.ema_period);
        cfg.wick_ratio_min     = env_f64("WICK_RATIO_MIN", cfg.wick_ratio_min);
        cfg.drop_5m_pct_max    = env_f64("DROP_5M_PCT_MAX", cfg.drop_5m_pct_max);
        cfg.drop_15m_pct_max   = env_f64("DROP_15M_PCT_MAX", cfg.drop_15m_pct_max);
        cfg.dist_to_high_max   = env_f64("DIST_TO_HIGH_MAX", cfg.dist_to_high_max);
        cfg.dist_to_high_tight = env_f64("DIST_TO_HIGH_TIGHT", cfg.dist_to_high_tight);
        cfg.conf_base          = env_f64("CONF_BASE", cfg.conf_base);
        cfg.conf_per_signal    = env_f64("CONF_PER_SIGNAL", cfg.conf_per_signal);
        cfg.max_alerts_per_run = env_u32("MAX_ALERTS_PER_RUN", cfg.max_alerts_per_run);
        cfg.dispatch_pacing    = Duration::from_secs_f64(
            env_f64("DISPATCH_PACING_SECS", cfg.dispatch_pacing.as_secs_f64()),
        );
        cfg.fetch_concurrency  = env_usize("FETCH_CONCURRENCY", cfg.fetch_concurrency);
        cfg.fetch_timeout      = Duration::from_secs_f64(
            env_f64("FETCH_TIMEOUT_SECS", cfg.fetch_timeout.as_secs_f64()),
        );
        cfg.run_deadline       = std::env::var("RUN_DEADLINE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs_f64);

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.max_candidates == 0 {
            bail!("TOP_N_BY_CHANGE must be at least 1");
        }
        if self.ema_period == 0 {
            bail!("EMA_PERIOD must be at least 1");
        }
        if self.fetch_concurrency == 0 {
            bail!("FETCH_CONCURRENCY must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.conf_base) {
            bail!("CONF_BASE must be within [0, 1]");
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
