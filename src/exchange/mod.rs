//! Exchange integrations.
//!
//! Defines the `Exchange` capability the engine talks to and the implementations that can be
//! selected at startup:
//! - `paper`: dry run against a pair universe read from a JSON file

/// Dry-run exchange
pub mod paper;

use std::sync::Arc;

use async_trait::async_trait;
use eyre::{bail, Result};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::arb::{Direction, ExchangePair, Step};
use crate::config::Config;

pub use paper::PaperExchange;

/// Raw order events as the exchange delivers them, one message per event
pub type Events = mpsc::UnboundedReceiver<String>;

/// Order type of a submitted order. Cycles only ever use market orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Fill at the best available price
    Market,
}

/// An order as handed to the exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    /// Buy or sell
    pub direction: Direction,
    /// Wire symbol of the pair
    pub pair: String,
    /// Amount in base units
    pub amount: f64,
    /// Simulated price, for reference
    pub price: f64,
    /// Always `market`
    pub order_type: OrderType,
}

impl From<&Step> for OrderRequest {
    fn from(step: &Step) -> Self {
        Self {
            direction: step.direction,
            pair: step.pair.clone(),
            amount: step.amount,
            price: step.price,
            order_type: OrderType::Market,
        }
    }
}

/// The exchange's verdict on the oldest unconfirmed order.
///
/// Confirmations carry no order identifier: they are matched to submissions purely by arrival
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// The order was accepted
    Accepted,
    /// The order was refused or failed
    Rejected {
        /// Exchange-supplied reason
        reason: String,
    },
}

/// What the engine needs from an exchange.
///
/// Constructed once at startup and shared by reference; order events are delivered on the
/// [`Events`] channel handed out alongside it.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Exchange name for logging
    fn name(&self) -> &str;

    /// The tradeable pair universe with initial prices
    async fn pairs(&self) -> Result<Vec<ExchangePair>>;

    /// Sends one order. Success only means the order was sent; the outcome arrives as an event.
    async fn submit(&self, order: &OrderRequest) -> Result<()>;

    /// Interprets a raw event. Events that are not order confirmations yield `None`.
    fn parse_confirmation(&self, event: &str) -> Option<Confirmation>;
}

/// Creates the exchange selected by the configuration.
///
/// # Errors
///
/// * If the exchange name is unknown
/// * If the exchange cannot be initialized
pub fn connect(config: &Config) -> Result<(Arc<dyn Exchange>, Events)> {
    match config.exchange.as_str() {
        "paper" => {
            let (exchange, events) = PaperExchange::from_file(&config.pairs_file)?;
            Ok((Arc::new(exchange), events))
        }
        other => bail!("Invalid exchange {other} selected"),
    }
}
