//! # Engine
//!
//! The concurrent runtime around the arbitrage core. One producer enumerates cycles on the
//! blocking pool, the coordinator prices them against the live pair table, and at most one
//! execution sequence talks to the exchange at a time. A price feed task keeps the pair table
//! current in the meantime.
//!
//! Shutdown is a `watch` channel: once it turns true the producer stops, the coordinator stops
//! consuming and an in-flight sequence is abandoned at its next suspension point.

/// Single-flight execution lock
pub mod lock;
/// Candidate evaluation and dispatch
pub mod coordinator;
/// Price tick application
pub mod feed;
/// The cycle producer
pub mod search;
/// Confirmation-gated order submission
pub mod sequence;

use std::sync::Arc;

use eyre::Result;
use log::info;
use serde_json::json;
use tokio::sync::{mpsc, watch};

use crate::arb::{AssetGraph, ExchangePair, Market, PriceUpdate, ProfitSimulator};
use crate::config::Config;
use crate::exchange::{Events, Exchange};

pub use coordinator::{Coordinator, Evaluation, StatsSnapshot};
pub use lock::{ExecutionGuard, ExecutionLock};
pub use search::{spawn_search, Candidate, SearchSummary};
pub use sequence::{ExecutionReport, ExecutionSequence, SequenceOutcome};

/// Resolves once shutdown has been signalled. Never resolves if the signal can no longer be
/// sent.
pub async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// What a run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Producer totals
    pub search: SearchSummary,
    /// Coordinator counters
    pub stats: StatsSnapshot,
    /// Price ticks applied
    pub ticks: u64,
}

/// Wires the producer, the coordinator and the feed together for one run
pub struct Engine {
    /// Startup configuration
    config: Config,
    /// Shutdown signal
    stop: Arc<watch::Sender<bool>>,
}

impl Engine {
    /// Creates an engine for a validated configuration
    #[must_use]
    pub fn new(config: Config) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            config,
            stop: Arc::new(stop),
        }
    }

    /// Handle for signalling shutdown from elsewhere, e.g. a Ctrl-C handler
    #[must_use]
    pub fn stop_handle(&self) -> Arc<watch::Sender<bool>> {
        Arc::clone(&self.stop)
    }

    /// Runs until the cycle stream ends, shutdown is signalled, or (with `once`) the first
    /// execution sequence ends.
    ///
    /// # Arguments
    /// * `exchange` - The exchange to trade on
    /// * `events` - The exchange's order event channel
    /// * `ticks` - Optional price tick stream
    ///
    /// # Errors
    /// * If the exchange cannot list its pairs
    /// * If the pair universe is malformed
    /// * If the initial asset is not in the universe ([`crate::arb::ArbError::InvalidAsset`])
    /// * If a background task panics
    pub async fn run(
        &self,
        exchange: Arc<dyn Exchange>,
        events: Events,
        ticks: Option<mpsc::Receiver<PriceUpdate>>,
    ) -> Result<RunSummary> {
        let pairs = exchange.pairs().await?;
        let market = Arc::new(Market::new(&pairs)?);
        let initial = market.assets().resolve(&self.config.initial_asset)?;
        let graph = AssetGraph::build(market.pairs());
        info!(
            "engine: {} pairs over {} assets from {}, starting at {} ({initial})",
            market.pairs().len(),
            market.assets().len(),
            exchange.name(),
            self.config.initial_asset
        );

        let (sender, receiver) = mpsc::channel(self.config.channel_size);
        let search = spawn_search(
            graph,
            vec![initial],
            self.config.max_path_len,
            sender,
            self.stop.subscribe(),
        );
        let feed = ticks.map(|ticks| {
            feed::spawn_feed(Arc::clone(&market), ticks, self.stop.subscribe())
        });

        let coordinator = Coordinator::new(
            Arc::clone(&market),
            ProfitSimulator::new(initial, self.config.initial_amount, self.config.eta),
            exchange,
            ExecutionLock::new(events),
            self.stop.subscribe(),
            self.config.log_every,
        );
        let stats = coordinator.run(receiver, self.config.once).await;

        self.stop.send_replace(true);
        let search = search.await?;
        let ticks = match feed {
            Some(feed) => feed.await?,
            None => 0,
        };
        info!("engine: stopped, {} cycles searched, {ticks} ticks applied", search.sent);

        Ok(RunSummary {
            search,
            stats,
            ticks,
        })
    }
}

/// The adjacency map and the initial asset index as JSON.
///
/// # Errors
/// * If the pair universe is malformed
/// * If the initial asset is not in the universe
pub fn export_graph(pairs: &[ExchangePair], initial_asset: &str) -> Result<serde_json::Value> {
    let market = Market::new(pairs)?;
    let initial = market.assets().resolve(initial_asset)?;
    let graph = AssetGraph::build(market.pairs());
    Ok(json!({
        "graph": graph,
        "initial_index": initial,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::*;
    use crate::arb::ArbError;
    use crate::exchange::PaperExchange;

    fn pairs() -> Vec<ExchangePair> {
        vec![
            exchange_pair("A", "B", 2.04, 2.0),
            exchange_pair("B", "C", 1.0, 1.0),
            exchange_pair("C", "A", 1.0, 1.0),
        ]
    }

    fn config() -> Config {
        Config {
            initial_asset: "A".to_string(),
            initial_amount: 100.0,
            eta: 0.0,
            once: true,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_run_once() {
        let (exchange, events) = PaperExchange::new(pairs());
        let exchange = Arc::new(exchange);
        let engine = Engine::new(config());

        let summary = engine.run(exchange.clone(), events, None).await.unwrap();
        assert_eq!(summary.stats.dispatched, 1);
        assert_eq!(summary.stats.completed, 1);
        assert_eq!(exchange.submitted(), 2);
        assert_eq!(summary.ticks, 0);
    }

    #[tokio::test]
    async fn test_invalid_initial_asset() {
        let (exchange, events) = PaperExchange::new(pairs());
        let engine = Engine::new(Config {
            initial_asset: "DOGE".to_string(),
            ..config()
        });

        let error = engine.run(Arc::new(exchange), events, None).await.err().unwrap();
        assert_eq!(
            error.downcast_ref::<ArbError>(),
            Some(&ArbError::InvalidAsset("DOGE".to_string()))
        );
    }

    #[tokio::test]
    async fn test_stop_before_run() {
        let (exchange, events) = PaperExchange::new(pairs());
        let engine = Engine::new(Config {
            once: false,
            ..config()
        });
        engine.stop_handle().send_replace(true);

        let summary = engine.run(Arc::new(exchange), events, None).await.unwrap();
        assert_eq!(summary.stats.dispatched, 0);
    }

    #[test]
    fn test_export_graph() {
        let value = export_graph(&pairs(), "B").unwrap();
        assert_eq!(value["initial_index"], 1);
        assert_eq!(value["graph"]["0"], json!([1, 2]));
        assert_eq!(value["graph"]["1"], json!([0, 2]));
        assert_eq!(value["graph"]["2"], json!([1, 0]));
    }
}
