//! # Market
//!
//! The pair universe for one run: the asset universe, the indexed pairs, and the lookups the
//! simulator and the market-data side need. Built once from the exchange's pair list; after
//! that only quotes change.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::asset::{AssetId, AssetUniverse};
use super::error::ArbError;
use super::pair::{ExchangePair, Pair};

/// A price tick for one pair, addressed by trade name or lookup name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Trade name or lookup name of the pair
    pub trade_name: String,
    /// New best bid
    pub bid: f64,
    /// New best ask
    pub ask: f64,
    /// New trailing volume, if the feed reports one
    #[serde(default)]
    pub volume: Option<f64>,
}

/// All pairs of the run and the ways to find them
#[derive(Debug)]
pub struct Market {
    /// The asset universe derived from the pairs
    assets: AssetUniverse,
    /// Indexed pairs in exchange order
    pairs: Vec<Pair>,
    /// `(base, quote)` to pair position
    by_assets: HashMap<(AssetId, AssetId), usize>,
    /// Trade name and lookup name to pair position
    by_name: HashMap<String, usize>,
}

impl Market {
    /// Indexes the exchange pairs.
    ///
    /// Assets are numbered in first-seen order, base before quote. When two pairs connect the
    /// same assets in the same orientation, the later one owns the lookup entry.
    ///
    /// # Errors
    ///
    /// Returns [`ArbError::InvalidPair`] if a pair has the same base and quote
    pub fn new(source: &[ExchangePair]) -> Result<Self, ArbError> {
        let mut assets = AssetUniverse::default();
        let mut pairs = Vec::with_capacity(source.len());
        let mut by_assets = HashMap::with_capacity(source.len());
        let mut by_name = HashMap::with_capacity(source.len() * 2);

        for (position, exchange_pair) in source.iter().enumerate() {
            if exchange_pair.base == exchange_pair.quote {
                return Err(ArbError::InvalidPair {
                    left: exchange_pair.base.clone(),
                    right: exchange_pair.quote.clone(),
                });
            }
            let base = assets.insert(&exchange_pair.base);
            let quote = assets.insert(&exchange_pair.quote);

            by_assets.insert((base, quote), position);
            by_name.insert(exchange_pair.trade_name.clone(), position);
            by_name.insert(exchange_pair.name.clone(), position);
            pairs.push(Pair::new(exchange_pair, base, quote));
        }

        debug!(
            "market: indexed {} pairs over {} assets",
            pairs.len(),
            assets.len()
        );

        Ok(Self {
            assets,
            pairs,
            by_assets,
            by_name,
        })
    }

    /// The asset universe
    #[must_use]
    pub const fn assets(&self) -> &AssetUniverse {
        &self.assets
    }

    /// All pairs in exchange order
    #[must_use]
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// The pair connecting `a` and `b` in either orientation, `(a, b)` first
    #[must_use]
    pub fn lookup(&self, a: AssetId, b: AssetId) -> Option<&Pair> {
        self.by_assets
            .get(&(a, b))
            .or_else(|| self.by_assets.get(&(b, a)))
            .map(|position| &self.pairs[*position])
    }

    /// Like [`Market::lookup`] but names both assets in the error.
    ///
    /// # Errors
    ///
    /// Returns [`ArbError::InvalidPair`] if no pair connects the assets
    pub fn require(&self, a: AssetId, b: AssetId) -> Result<&Pair, ArbError> {
        self.lookup(a, b).ok_or_else(|| ArbError::InvalidPair {
            left: self.assets.symbol(a).to_string(),
            right: self.assets.symbol(b).to_string(),
        })
    }

    /// The pair with the given trade name or lookup name
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Pair> {
        self.by_name.get(name).map(|position| &self.pairs[*position])
    }

    /// Applies a price tick in place.
    ///
    /// # Errors
    ///
    /// Returns [`ArbError::UnknownPair`] if the tick addresses no known pair
    pub fn apply_tick(&self, update: &PriceUpdate) -> Result<(), ArbError> {
        let pair = self
            .by_name(&update.trade_name)
            .ok_or_else(|| ArbError::UnknownPair(update.trade_name.clone()))?;
        pair.set_quote(update.bid, update.ask, update.volume);
        Ok(())
    }
}
