//! A tradeable market between two assets.
//!
//! Everything but the quote is fixed for the run. The quote (bid, ask, volume) is written by
//! the market-data side and read by the simulator, always as one consistent snapshot.
use std::fmt::{self, Debug};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::asset::AssetId;

/// A pair as reported by the exchange, before indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangePair {
    /// Wire symbol used when submitting orders and routing ticks, e.g. `ADA/EUR`
    pub trade_name: String,
    /// Exchange lookup name, e.g. `ADAEUR`
    pub name: String,
    /// Base asset symbol
    pub base: String,
    /// Quote asset symbol
    pub quote: String,
    /// Number of decimals an order amount is rounded to
    pub precision: u8,
    /// Maker fee as a fraction
    #[serde(default)]
    pub maker_fee: f64,
    /// Taker fee as a fraction
    #[serde(default)]
    pub taker_fee: f64,
    /// Smallest order amount
    #[serde(default)]
    pub ordermin: f64,
    /// Initial best bid
    #[serde(default)]
    pub bid: f64,
    /// Initial best ask
    #[serde(default)]
    pub ask: f64,
    /// Initial trailing volume
    #[serde(default)]
    pub volume: f64,
}

/// Best bid, best ask and trailing volume taken together.
/// A missing price is carried as `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quote {
    /// Best bid
    pub bid: f64,
    /// Best ask
    pub ask: f64,
    /// Trailing volume
    pub volume: f64,
}

/// An indexed pair owned by the `Market`
pub struct Pair {
    /// Wire symbol
    pub trade_name: String,
    /// Exchange lookup name
    pub name: String,
    /// Index of the base asset
    pub base: AssetId,
    /// Index of the quote asset
    pub quote: AssetId,
    /// Decimals an order amount is rounded to
    pub precision: u8,
    /// Maker fee as a fraction
    pub maker_fee: f64,
    /// Taker fee as a fraction
    pub taker_fee: f64,
    /// Smallest order amount
    pub ordermin: f64,
    /// Live prices
    prices: RwLock<Quote>,
}

impl Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = self.quote();
        write!(
            f,
            "Pair({} {}/{} bid {} ask {})",
            self.trade_name, self.base, self.quote, quote.bid, quote.ask
        )
    }
}

impl Pair {
    /// Creates an indexed pair from the exchange description
    #[must_use]
    pub fn new(source: &ExchangePair, base: AssetId, quote: AssetId) -> Self {
        Self {
            trade_name: source.trade_name.clone(),
            name: source.name.clone(),
            base,
            quote,
            precision: source.precision,
            maker_fee: source.maker_fee,
            taker_fee: source.taker_fee,
            ordermin: source.ordermin,
            prices: RwLock::new(Quote {
                bid: source.bid,
                ask: source.ask,
                volume: source.volume,
            }),
        }
    }

    /// A consistent copy of the current bid, ask and volume
    #[must_use]
    pub fn quote(&self) -> Quote {
        *self.prices.read()
    }

    /// Replaces bid and ask, and volume when given, in one write
    pub fn set_quote(&self, bid: f64, ask: f64, volume: Option<f64>) {
        let mut prices = self.prices.write();
        prices.bid = bid;
        prices.ask = ask;
        if let Some(volume) = volume {
            prices.volume = volume;
        }
    }

    /// The asset on the other side of the pair from `asset`
    #[must_use]
    pub const fn other(&self, asset: AssetId) -> Option<AssetId> {
        if asset == self.base {
            Some(self.quote)
        } else if asset == self.quote {
            Some(self.base)
        } else {
            None
        }
    }
}
