//! # Arbitrage Module
//!
//! The computational core: the asset universe and pair table, the adjacency graph, lazy cycle
//! enumeration and the cycle profit simulator. Nothing in here does I/O.

/// Asset universe
pub mod asset;
/// Lazy simple-cycle enumeration
pub mod cycle;
/// Core error type
pub mod error;
/// Asset adjacency graph
pub mod graph;
/// Pair table and lookups
pub mod market;
/// Pair data structures
pub mod pair;
/// Cycle profit simulation
pub mod simulate;
/// Test helpers and utilities
#[cfg(test)]
pub(crate) mod test_helpers;

pub use asset::{AssetId, AssetUniverse};
pub use cycle::{Cycle, CycleFinder};
pub use error::ArbError;
pub use graph::AssetGraph;
pub use market::{Market, PriceUpdate};
pub use pair::{ExchangePair, Pair, Quote};
pub use simulate::{Direction, ProfitSimulator, SimulationResult, Step};
