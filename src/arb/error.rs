use thiserror::Error;

use super::asset::AssetId;

/// Errors raised by the arbitrage core.
///
/// None of these describe market conditions: a cycle that is too small to trade or simply
/// not profitable is a normal `SimulationResult`, not an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArbError {
    /// The requested symbol is not part of the asset universe
    #[error("invalid asset {0}")]
    InvalidAsset(String),

    /// No pair connects two consecutive assets of a cycle
    #[error("invalid pair requested: {left}, {right}")]
    InvalidPair {
        /// Symbol of the asset held before the leg
        left: String,
        /// Symbol of the asset wanted after the leg
        right: String,
    },

    /// The simulated exposure asset is on neither side of the next pair.
    /// This means the graph and the pair lookup disagree.
    #[error("invariant violation at leg {leg}: exposure {exposure} not in pair {pair} ({base}/{quote})")]
    InvariantViolation {
        /// Zero-based leg index in the cycle
        leg: usize,
        /// Asset held when the leg was reached
        exposure: AssetId,
        /// Trade name of the offending pair
        pair: String,
        /// Base index of the offending pair
        base: AssetId,
        /// Quote index of the offending pair
        quote: AssetId,
    },

    /// A price update addressed a trade name that is not in the universe
    #[error("invalid pair encountered: {0}")]
    UnknownPair(String),

    /// A path that is not a simple closed cycle
    #[error("invalid cycle: {0}")]
    InvalidCycle(String),
}
