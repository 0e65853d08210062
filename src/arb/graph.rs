//! The asset adjacency map.
//!
//! Every pair contributes two directed edges, base to quote and quote to base. Parallel pairs
//! between the same two assets show up as repeated neighbors; which pair a leg actually
//! trades on is decided later by the market lookup, not by the edge.
use std::collections::HashMap;

use serde::Serialize;

use super::asset::AssetId;
use super::pair::Pair;

/// Read-only adjacency map built once per pair universe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AssetGraph {
    /// Neighbors of each asset in insertion order
    neighbors: HashMap<AssetId, Vec<AssetId>>,
}

impl AssetGraph {
    /// Builds the graph from the pair collection.
    ///
    /// Callers must make sure every base and quote index belongs to the asset universe.
    #[must_use]
    pub fn build<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = &'a Pair>,
    {
        Self::from_edges(pairs.into_iter().map(|pair| (pair.base, pair.quote)))
    }

    /// Builds the graph from undirected `(base, quote)` edges
    #[must_use]
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (AssetId, AssetId)>,
    {
        let mut neighbors: HashMap<AssetId, Vec<AssetId>> = HashMap::new();
        for (base, quote) in edges {
            neighbors.entry(base).or_default().push(quote);
            neighbors.entry(quote).or_default().push(base);
        }
        Self { neighbors }
    }

    /// Neighbors of `asset`, empty if it has none
    #[must_use]
    pub fn neighbors(&self, asset: AssetId) -> &[AssetId] {
        self.neighbors.get(&asset).map_or(&[], Vec::as_slice)
    }

    /// Number of assets with at least one neighbor
    #[must_use]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether the graph has no edges
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}
