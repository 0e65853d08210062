use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{Confirmation, Events, Exchange, OrderRequest};
use crate::arb::ExchangePair;

/// Order status event emitted by the paper exchange
#[derive(Debug, Serialize, Deserialize)]
struct OrderStatus {
    /// Always `addOrderStatus`
    event: String,
    /// `ok` or `error`
    status: String,
    /// Pair the order was for
    #[serde(default)]
    pair: String,
    /// Position of the order in submission order, starting at 1
    #[serde(default)]
    sequence: usize,
    /// Reason for an `error` status
    #[serde(default, rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

/// Dry-run exchange.
///
/// Serves a fixed pair universe and acknowledges every order it is sent, optionally rejecting
/// one chosen submission. Nothing leaves the process.
#[derive(Debug)]
pub struct PaperExchange {
    /// The pair universe served by `pairs()`
    pairs: Vec<ExchangePair>,
    /// Where order status events are pushed
    events: mpsc::UnboundedSender<String>,
    /// Orders submitted so far
    submitted: AtomicUsize,
    /// 1-based submission to reject
    reject_at: Option<usize>,
    /// Whether `submit` answers with a status event on its own
    auto_confirm: bool,
}

impl PaperExchange {
    /// Creates a paper exchange serving `pairs`
    #[must_use]
    pub fn new(pairs: Vec<ExchangePair>) -> (Self, Events) {
        let (events, receiver) = mpsc::unbounded_channel();
        let exchange = Self {
            pairs,
            events,
            submitted: AtomicUsize::new(0),
            reject_at: None,
            auto_confirm: true,
        };
        (exchange, receiver)
    }

    /// Loads the pair universe from a JSON array of pairs.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If the file is not a JSON array of pairs
    pub fn from_file(path: impl AsRef<Path>) -> Result<(Self, Events)> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read pairs file {}", path.display()))?;
        let pairs: Vec<ExchangePair> = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse pairs file {}", path.display()))?;
        info!("paper: loaded {} pairs from {}", pairs.len(), path.display());
        Ok(Self::new(pairs))
    }

    /// Rejects the `n`-th submission (1-based)
    #[must_use]
    pub const fn reject_submission(mut self, n: usize) -> Self {
        self.reject_at = Some(n);
        self
    }

    /// Stops answering submissions; events must be pushed through [`PaperExchange::event_sender`]
    #[must_use]
    pub const fn manual_confirmations(mut self) -> Self {
        self.auto_confirm = false;
        self
    }

    /// A handle for pushing raw events by hand
    #[must_use]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<String> {
        self.events.clone()
    }

    /// Orders submitted so far
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// The status event for the `sequence`-th order
    fn status_event(&self, order: &OrderRequest, sequence: usize) -> Result<String> {
        let rejected = self.reject_at == Some(sequence);
        let status = OrderStatus {
            event: "addOrderStatus".to_string(),
            status: if rejected { "error" } else { "ok" }.to_string(),
            pair: order.pair.clone(),
            sequence,
            error_message: rejected.then(|| "EOrder:Rejected by paper exchange".to_string()),
        };
        Ok(serde_json::to_string(&status)?)
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    fn name(&self) -> &str {
        "paper"
    }

    async fn pairs(&self) -> Result<Vec<ExchangePair>> {
        Ok(self.pairs.clone())
    }

    async fn submit(&self, order: &OrderRequest) -> Result<()> {
        let sequence = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "paper: order #{sequence} {} {} {} @ {}",
            order.direction,
            order.amount,
            order.pair,
            order.price
        );
        if self.auto_confirm {
            self.events
                .send(self.status_event(order, sequence)?)
                .map_err(|_| eyre::eyre!("paper: event receiver dropped"))?;
        }
        Ok(())
    }

    fn parse_confirmation(&self, event: &str) -> Option<Confirmation> {
        let status: OrderStatus = serde_json::from_str(event).ok()?;
        if status.event != "addOrderStatus" {
            return None;
        }
        match status.status.as_str() {
            "ok" => Some(Confirmation::Accepted),
            "error" => Some(Confirmation::Rejected {
                reason: status
                    .error_message
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
            _ => None,
        }
    }
}
