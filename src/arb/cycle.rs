/// Cycle is a closed walk over asset indices (first and last asset are the same, nothing else repeats).
/// `CycleFinder` enumerates them lazily, shortest first, from a set of starting assets.
use std::fmt::{self, Debug};
use std::mem;

use itertools::Itertools;
use log::debug;

use super::asset::AssetId;
use super::error::ArbError;
use super::graph::AssetGraph;

/// A simple cycle of at least two legs
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cycle(Vec<AssetId>);

impl Debug for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cycle({})", self.0.iter().join(" > "))
    }
}

impl Cycle {
    /// Validates a closed path.
    ///
    /// # Errors
    ///
    /// Returns [`ArbError::InvalidCycle`] if the path has fewer than two legs, is not closed,
    /// steps from an asset to itself, or repeats an interior asset
    pub fn new(assets: Vec<AssetId>) -> Result<Self, ArbError> {
        if assets.len() < 3 {
            return Err(ArbError::InvalidCycle(format!(
                "{assets:?} must have at least 2 legs"
            )));
        }
        if assets.first() != assets.last() {
            return Err(ArbError::InvalidCycle(format!("{assets:?} is not closed")));
        }
        if assets.iter().tuple_windows().any(|(a, b)| a == b) {
            return Err(ArbError::InvalidCycle(format!("{assets:?} contains a self loop")));
        }
        if !assets[..assets.len() - 1].iter().all_unique() {
            return Err(ArbError::InvalidCycle(format!(
                "{assets:?} repeats an interior asset"
            )));
        }
        Ok(Self(assets))
    }

    /// The assets in visiting order, the start repeated at the end
    #[must_use]
    pub fn assets(&self) -> &[AssetId] {
        &self.0
    }

    /// The starting (and ending) asset
    #[must_use]
    pub fn start(&self) -> AssetId {
        self.0[0]
    }

    /// Number of legs (trades)
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len() - 1
    }

    /// Always false: a cycle has at least two legs
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Consecutive `(from, to)` asset pairs, one per leg
    pub fn legs(&self) -> impl Iterator<Item = (AssetId, AssetId)> + '_ {
        self.0.iter().copied().tuple_windows()
    }

    /// Unwraps the asset list
    #[must_use]
    pub fn into_inner(self) -> Vec<AssetId> {
        self.0
    }
}

/// Whether `neighbor` may extend `path`.
///
/// A self loop is never accepted. Otherwise the neighbor is accepted either when it closes the
/// path (it is the first asset) or when it is not on the path at all. Any other asset already
/// on the path would make the walk non-simple.
#[must_use]
pub fn accepts(path: &[AssetId], neighbor: AssetId) -> bool {
    match (path.first(), path.last()) {
        (Some(first), Some(last)) => {
            *last != neighbor && path.contains(&neighbor) == (*first == neighbor)
        }
        _ => false,
    }
}

/// Lazy breadth-first enumeration of simple cycles.
///
/// Generation `k` holds the open paths of `k` legs. Growing a generation emits every closed
/// cycle as soon as it is found and keeps the open paths for the next generation, so cycles
/// come out in non-decreasing length. Without a length cap the iterator ends once no open
/// path is left. With a cap, open paths are never grown past the cap and the search restarts
/// from the start set once a pass is exhausted; it only ends if a whole pass finds nothing.
pub struct CycleFinder<'g> {
    /// Topology being searched
    graph: &'g AssetGraph,
    /// Generation zero
    starts: Vec<AssetId>,
    /// Longest cycle (in legs) to look for, restarting after each pass
    max_len: Option<usize>,
    /// Open paths of the generation being grown
    frontier: std::vec::IntoIter<Vec<AssetId>>,
    /// Path currently being grown and the index of the next neighbor to try
    current: Option<(Vec<AssetId>, usize)>,
    /// Open paths collected for the next generation
    next: Vec<Vec<AssetId>>,
    /// Cycles emitted during the current pass
    found: usize,
    /// Completed passes
    passes: usize,
}

impl<'g> CycleFinder<'g> {
    /// Creates an unbounded search from `starts`
    #[must_use]
    pub fn new(graph: &'g AssetGraph, starts: &[AssetId]) -> Self {
        Self {
            graph,
            starts: starts.to_vec(),
            max_len: None,
            frontier: Self::seeds(starts),
            current: None,
            next: Vec::new(),
            found: 0,
            passes: 0,
        }
    }

    /// Caps cycle length at `max_len` legs and restarts from the start set after each pass
    #[must_use]
    pub const fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    /// Completed passes over the start set (only grows when a cap is set)
    #[must_use]
    pub const fn passes(&self) -> usize {
        self.passes
    }

    /// Generation zero: one single-asset path per start
    fn seeds(starts: &[AssetId]) -> std::vec::IntoIter<Vec<AssetId>> {
        starts
            .iter()
            .map(|start| vec![*start])
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Whether an open path of `legs` legs may still be grown
    fn within_cap(&self, legs: usize) -> bool {
        self.max_len.map_or(true, |max_len| legs < max_len)
    }
}

impl Iterator for CycleFinder<'_> {
    type Item = Cycle;

    fn next(&mut self) -> Option<Cycle> {
        loop {
            if let Some((path, mut cursor)) = self.current.take() {
                let graph = self.graph;
                let neighbors = graph.neighbors(path[path.len() - 1]);
                while let Some(&neighbor) = neighbors.get(cursor) {
                    cursor += 1;
                    if !accepts(&path, neighbor) {
                        continue;
                    }
                    let mut grown = Vec::with_capacity(path.len() + 1);
                    grown.extend_from_slice(&path);
                    grown.push(neighbor);

                    if neighbor == path[0] {
                        self.found += 1;
                        self.current = Some((path, cursor));
                        return Some(Cycle(grown));
                    }
                    if self.within_cap(grown.len() - 1) {
                        self.next.push(grown);
                    }
                }
                continue;
            }

            if let Some(path) = self.frontier.next() {
                self.current = Some((path, 0));
                continue;
            }

            if !self.next.is_empty() {
                self.frontier = mem::take(&mut self.next).into_iter();
                continue;
            }

            // Only a capped search starts over, and only if the last pass was productive
            if self.max_len.is_some() && self.found > 0 {
                self.passes += 1;
                debug!(
                    "cycle finder: pass {} found {} cycles, restarting",
                    self.passes, self.found
                );
                self.found = 0;
                self.frontier = Self::seeds(&self.starts);
                continue;
            }

            return None;
        }
    }
}
