//! Order Coordinator Binary
//!
//! Runs a short paper session against the in-process engine: two orders on
//! one instrument are submitted, merged, and the position is closed.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-coordinator -- [config.yaml]
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (overrides the configured level)

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rust_decimal_macros::dec;

use order_coordinator::application::compose::run_to_completion;
use order_coordinator::config::{Config, load_config};
use order_coordinator::observability::init_logging;
use order_coordinator::{
    ComposeParams, InstrumentId, OrderCoordinator, OrderEventHub, OrderSide, OrderSpec,
    PaperEngine, RetryPolicy,
};

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args().nth(1);
    let config = match load_config(path.as_deref()) {
        Ok(config) => config,
        Err(e) if path.is_none() => {
            eprintln!("No usable config.yaml ({e}), using defaults");
            Config::default()
        }
        Err(e) => return Err(e).context("failed to load configuration"),
    };
    init_logging(&config.observability.logging).context("failed to initialise logging")?;

    if !config.environment.is_paper() {
        bail!("only PAPER mode is supported by this binary");
    }

    tracing::info!(
        mode = ?config.environment.mode,
        event_bus_capacity = config.event_bus.capacity,
        max_retries = config.retry.max_retries,
        "Starting paper session"
    );

    let hub = Arc::new(OrderEventHub::new(config.event_bus.capacity));
    let engine = Arc::new(PaperEngine::new(Arc::clone(&hub)));
    let retry = RetryPolicy::from(&config.retry);
    let coordinator = OrderCoordinator::new(engine, hub, config.orchestration.clone())
        .with_retry_policy(retry.clone());
    let params = ComposeParams::with_retry_policy(retry)?;

    let instrument = InstrumentId::new("EUR/USD");
    for (side, amount) in [(OrderSide::Buy, dec!(0.12)), (OrderSide::Buy, dec!(0.08))] {
        let spec = OrderSpec::market(instrument.clone(), side, amount, "demo")
            .with_stop_loss(dec!(1.0500));
        coordinator.submit(spec, &params).await?;
    }
    let position = coordinator.position(&instrument);
    tracing::info!(
        instrument = %instrument,
        orders = position.size(),
        exposure = %position.signed_exposure(),
        direction = ?position.direction(),
        "Position opened"
    );

    let merge = coordinator.default_merge_params(&instrument)?;
    let merged = run_to_completion(coordinator.merge_position(instrument.clone(), merge)).await?;
    tracing::info!(
        instrument = %instrument,
        events = merged.len(),
        orders = position.size(),
        exposure = %position.signed_exposure(),
        "Position merged"
    );

    let close = coordinator.default_close_params(&instrument)?;
    run_to_completion(coordinator.close_position(instrument.clone(), close)).await?;
    tracing::info!(
        instrument = %instrument,
        orders = position.size(),
        direction = ?position.direction(),
        "Position closed"
    );

    Ok(())
}
