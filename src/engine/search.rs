//! The cycle producer.
//!
//! Enumeration is CPU-bound, so it runs on the blocking pool and hands cycles to the
//! coordinator over a bounded channel. A full channel blocks the producer.

use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::arb::{AssetGraph, AssetId, Cycle, CycleFinder};

/// A cycle on its way to the coordinator
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The cycle found
    pub cycle: Cycle,
    /// Time the finder spent producing this cycle since the previous one
    pub search_time: Duration,
}

/// Why the producer stopped and how much it produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSummary {
    /// Cycles handed to the coordinator
    pub sent: u64,
    /// Completed passes over the start set
    pub passes: usize,
    /// Whether every cycle reachable from the start set was produced
    pub exhausted: bool,
}

/// Starts the producer on the blocking pool.
///
/// The producer owns the graph and the start set. It stops when `shutdown` turns true, when
/// the receiving side is dropped, or when the finder is exhausted.
#[must_use]
pub fn spawn_search(
    graph: AssetGraph,
    starts: Vec<AssetId>,
    max_path_len: Option<usize>,
    sender: mpsc::Sender<Candidate>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<SearchSummary> {
    tokio::task::spawn_blocking(move || {
        let mut finder = CycleFinder::new(&graph, &starts).with_max_len(max_path_len);
        let mut summary = SearchSummary {
            sent: 0,
            passes: 0,
            exhausted: false,
        };
        let mut pass_start = 0;

        info!(
            "search: starting from {starts:?} over {} assets, max path length {max_path_len:?}",
            graph.len()
        );

        loop {
            if *shutdown.borrow() {
                info!("search: shutdown requested");
                break;
            }

            let started = Instant::now();
            let Some(cycle) = finder.next() else {
                summary.exhausted = true;
                info!("search: exhausted after {} cycles", summary.sent);
                break;
            };

            if finder.passes() > summary.passes {
                summary.passes = finder.passes();
                info!(
                    "search: pass {} complete with {} cycles, restarting from {starts:?}",
                    summary.passes,
                    summary.sent - pass_start
                );
                pass_start = summary.sent;
            }

            let candidate = Candidate {
                cycle,
                search_time: started.elapsed(),
            };
            if sender.blocking_send(candidate).is_err() {
                debug!("search: receiver dropped");
                break;
            }
            summary.sent += 1;
        }

        summary
    })
}
