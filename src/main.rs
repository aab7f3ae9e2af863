//! # Shortscout — blow-off-top reversal scanner
//!
//! Scans the Gate USDT perpetual universe for fresh alt listings topping out
//! after a vertical run, and pushes a JSON alert card ONLY when reversal
//! triggers fire.
//!
//! ## Cycle
//! ```text
//! 1. Fetch ticker snapshot (whole universe)
//! 2. Prefilter: lists + volume floor + top-N by 24h change
//! 3. Per candidate: fetch candles → features → qualify → triggers
//! 4. Alert gate: budget, card, dispatch (Telegram or log)
//! ```
//!
//! One cycle per invocation; scheduling belongs to cron / CI.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod alert;
mod candles;
mod config;
mod error;
mod features;
mod gate;
mod notify;
mod prefilter;
mod qualify;
mod scanner;
mod scoring;
mod triggers;

use config::Config;
use gate::GateClient;
use notify::Notifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("shortscout=debug".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════╗
  ║   SHORTSCOUT — Top Reversal Scanner       ║
  ║   Gate USDT Perpetual Futures             ║
  ╚═══════════════════════════════════════════╝"#);

    let config = Config::from_env().context("Failed to load config")?;
    let client = reqwest::Client::new();

    let market = GateClient::new(client.clone(), config.fetch_timeout);
    let notifier = Notifier::from_env(client);

    info!(
        policy      = %config.trigger_policy,
        candidates  = config.max_candidates,
        max_alerts  = config.max_alerts_per_run,
        concurrency = config.fetch_concurrency,
        "Shortscout started"
    );

    let report = scanner::run_scan(&market, &notifier, &config)
        .await
        .context("scan cycle failed")?;

    info!(
        universe   = report.universe,
        candidates = report.candidates,
        alerts     = report.alerts,
        "✅ cycle complete — alerts go out only when triggers fire"
    );

    Ok(())
}
