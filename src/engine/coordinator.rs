//! # Execution Coordinator
//!
//! Consumes candidate cycles in the order the search produces them, prices each one against
//! the live quotes and dispatches profitable ones under the execution lock. Evaluation never
//! waits: a profitable cycle that finds the lock held is dropped, not queued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::lock::ExecutionLock;
use super::search::Candidate;
use super::sequence::{ExecutionSequence, SequenceOutcome};
use super::stopped;
use crate::arb::{ArbError, Cycle, Market, ProfitSimulator, SimulationResult};
use crate::exchange::Exchange;

/// What happened to one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Simulation failed; the cycle is skipped
    Failed(ArbError),
    /// A leg was below its pair's order minimum
    NotActionable,
    /// The cycle does not return more than it commits
    Unprofitable {
        /// Simulated final amount
        amount: f64,
    },
    /// Profitable, but another sequence holds the lock
    Busy,
    /// Profitable and handed to a new execution sequence
    Dispatched {
        /// Simulated final amount
        amount: f64,
    },
}

/// Running counters, shared with the sequence tasks
#[derive(Debug, Default)]
pub struct Stats {
    /// Candidates simulated
    evaluated: AtomicU64,
    /// Simulations that failed
    failed: AtomicU64,
    /// Profitable candidates
    profitable: AtomicU64,
    /// Profitable candidates dropped because the lock was held
    busy: AtomicU64,
    /// Sequences started
    dispatched: AtomicU64,
    /// Sequences that confirmed every step
    completed: AtomicU64,
    /// Sequences stopped by a rejected or failed submission
    rejected: AtomicU64,
    /// Sequences abandoned on shutdown or a closed transport
    abandoned: AtomicU64,
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Candidates simulated
    pub evaluated: u64,
    /// Simulations that failed
    pub failed: u64,
    /// Profitable candidates
    pub profitable: u64,
    /// Profitable candidates dropped because the lock was held
    pub busy: u64,
    /// Sequences started
    pub dispatched: u64,
    /// Sequences that confirmed every step
    pub completed: u64,
    /// Sequences stopped by a rejected or failed submission
    pub rejected: u64,
    /// Sequences abandoned on shutdown or a closed transport
    pub abandoned: u64,
}

impl Stats {
    /// Increments a counter, returning the new value
    fn bump(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records how a sequence ended
    fn record(&self, outcome: &SequenceOutcome) {
        let counter = match outcome {
            SequenceOutcome::Completed(_) => &self.completed,
            SequenceOutcome::Rejected { .. } | SequenceOutcome::SubmitFailed { .. } => {
                &self.rejected
            }
            SequenceOutcome::Abandoned { .. } | SequenceOutcome::TransportClosed { .. } => {
                &self.abandoned
            }
        };
        Self::bump(counter);
    }

    /// Copies the counters
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            evaluated: self.evaluated.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            profitable: self.profitable.load(Ordering::Relaxed),
            busy: self.busy.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Evaluates candidates and owns the execution side
pub struct Coordinator {
    /// Live pair table
    market: Arc<Market>,
    /// Starting position every cycle is priced for
    simulator: ProfitSimulator,
    /// Where orders go
    exchange: Arc<dyn Exchange>,
    /// Single-flight lock holding the confirmation channel
    lock: ExecutionLock,
    /// Shutdown signal, passed on to sequences
    shutdown: watch::Receiver<bool>,
    /// Counters
    stats: Arc<Stats>,
    /// Sample rate for logging unprofitable evaluations, 0 disables
    log_every: u64,
    /// The most recently dispatched sequence
    in_flight: Option<JoinHandle<SequenceOutcome>>,
}

impl Coordinator {
    /// Creates a coordinator
    #[must_use]
    pub fn new(
        market: Arc<Market>,
        simulator: ProfitSimulator,
        exchange: Arc<dyn Exchange>,
        lock: ExecutionLock,
        shutdown: watch::Receiver<bool>,
        log_every: u64,
    ) -> Self {
        Self {
            market,
            simulator,
            exchange,
            lock,
            shutdown,
            stats: Arc::new(Stats::default()),
            log_every,
            in_flight: None,
        }
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether an execution sequence holds the lock
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.lock.is_held()
    }

    /// The cycle spelled with asset symbols
    fn describe(&self, cycle: &Cycle) -> String {
        let assets = self.market.assets();
        cycle
            .assets()
            .iter()
            .map(|asset| assets.symbol(*asset))
            .join(" > ")
    }

    /// Whether the `count`-th evaluation should be logged
    const fn sampled(&self, count: u64) -> bool {
        self.log_every > 0 && count % self.log_every == 0
    }

    /// Prices one candidate and dispatches it if it is profitable and the lock is free.
    ///
    /// Never waits. A dispatched sequence runs on its own task, holding the lock until it ends.
    pub fn on_cycle(&mut self, candidate: &Candidate) -> Evaluation {
        let count = Stats::bump(&self.stats.evaluated);
        let started = Instant::now();

        let result = match self.simulator.simulate(&candidate.cycle, &self.market) {
            Ok(result) => result,
            Err(e) => {
                Stats::bump(&self.stats.failed);
                if matches!(e, ArbError::InvariantViolation { .. }) {
                    error!("coordinator: data integrity error on {:?}: {e}", candidate.cycle);
                } else {
                    warn!("coordinator: skipping {:?}: {e}", candidate.cycle);
                }
                return Evaluation::Failed(e);
            }
        };

        let (amount, steps) = match result {
            SimulationResult::NotActionable { steps } => {
                if self.sampled(count) {
                    debug!(
                        "coordinator: #{count} {} not actionable after {} steps",
                        self.describe(&candidate.cycle),
                        steps.len()
                    );
                }
                return Evaluation::NotActionable;
            }
            SimulationResult::Unprofitable { amount } => {
                if self.sampled(count) {
                    debug!(
                        "coordinator: #{count} {} returns {amount}",
                        self.describe(&candidate.cycle)
                    );
                }
                return Evaluation::Unprofitable { amount };
            }
            SimulationResult::Profitable { amount, steps } => (amount, steps),
        };
        Stats::bump(&self.stats.profitable);

        let Some(guard) = self.lock.try_acquire() else {
            Stats::bump(&self.stats.busy);
            debug!(
                "coordinator: dropping {} ({amount}), execution in progress",
                self.describe(&candidate.cycle)
            );
            return Evaluation::Busy;
        };

        let compute = candidate.search_time + started.elapsed();
        info!(
            "coordinator: dispatching {} for {} -> {amount} in {} steps",
            self.describe(&candidate.cycle),
            self.simulator.initial_amount,
            steps.len()
        );
        Stats::bump(&self.stats.dispatched);

        let sequence = ExecutionSequence::new(
            Arc::clone(&self.exchange),
            guard,
            steps,
            amount,
            compute,
        );
        let shutdown = self.shutdown.clone();
        let stats = Arc::clone(&self.stats);
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = sequence.run(shutdown).await;
            stats.record(&outcome);
            outcome
        }));

        Evaluation::Dispatched { amount }
    }

    /// Waits for the most recently dispatched sequence, if any
    pub async fn finish(&mut self) -> Option<SequenceOutcome> {
        let handle = self.in_flight.take()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("coordinator: execution task failed: {e}");
                None
            }
        }
    }

    /// Consumes candidates until the channel closes or shutdown is signalled.
    ///
    /// With `once` set, returns after the first dispatched sequence ends. The channel is
    /// closed and any in-flight sequence is awaited before returning.
    pub async fn run(mut self, mut cycles: mpsc::Receiver<Candidate>, once: bool) -> StatsSnapshot {
        let mut shutdown = self.shutdown.clone();
        info!(
            "coordinator: started on {} with {} {}",
            self.exchange.name(),
            self.simulator.initial_amount,
            self.market.assets().symbol(self.simulator.initial_asset)
        );

        loop {
            tokio::select! {
                biased;
                () = stopped(&mut shutdown) => {
                    info!("coordinator: shutdown requested");
                    break;
                }
                candidate = cycles.recv() => {
                    let Some(candidate) = candidate else {
                        info!("coordinator: cycle stream ended");
                        break;
                    };
                    if matches!(self.on_cycle(&candidate), Evaluation::Dispatched { .. }) && once {
                        let outcome = self.finish().await;
                        info!("coordinator: single run finished: {outcome:?}");
                        break;
                    }
                }
            }
        }

        cycles.close();
        if let Some(outcome) = self.finish().await {
            debug!("coordinator: last sequence ended: {outcome:?}");
        }

        let stats = self.stats();
        info!("coordinator: {stats:?}");
        stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::arb::test_helpers::*;
    use crate::arb::ExchangePair;
    use crate::exchange::PaperExchange;

    const OK: &str = r#"{"event":"addOrderStatus","status":"ok"}"#;

    /// Sell A at 2.04 and buy it back at 2.00 is worth 2%
    fn pairs() -> Vec<ExchangePair> {
        vec![
            exchange_pair("A", "B", 2.04, 2.0),
            exchange_pair("B", "C", 1.0, 1.0),
            exchange_pair("C", "A", 1.0, 1.0),
        ]
    }

    fn coordinator(
        exchange: PaperExchange,
        events: crate::exchange::Events,
        shutdown: watch::Receiver<bool>,
    ) -> (Arc<PaperExchange>, Coordinator) {
        coordinator_with(&pairs(), exchange, events, shutdown)
    }

    fn coordinator_with(
        pairs: &[ExchangePair],
        exchange: PaperExchange,
        events: crate::exchange::Events,
        shutdown: watch::Receiver<bool>,
    ) -> (Arc<PaperExchange>, Coordinator) {
        let exchange = Arc::new(exchange);
        let market = Arc::new(market_with(pairs));
        let coordinator = Coordinator::new(
            market,
            ProfitSimulator::new(0, 100.0, 0.0),
            exchange.clone(),
            ExecutionLock::new(events),
            shutdown,
            1,
        );
        (exchange, coordinator)
    }

    fn candidate(assets: &[usize]) -> Candidate {
        Candidate {
            cycle: cycle(assets),
            search_time: Duration::from_micros(10),
        }
    }

    async fn until_submitted(exchange: &PaperExchange, n: usize) {
        while exchange.submitted() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_single_flight() {
        let (paper, events) = PaperExchange::new(pairs());
        let paper = paper.manual_confirmations();
        let feed = paper.event_sender();
        let (_stop, shutdown) = watch::channel(false);
        let (exchange, mut coordinator) = coordinator(paper, events, shutdown);

        let first = coordinator.on_cycle(&candidate(&[0, 1, 0]));
        assert!(matches!(first, Evaluation::Dispatched { .. }));
        let second = coordinator.on_cycle(&candidate(&[0, 1, 0]));
        assert_eq!(second, Evaluation::Busy);

        until_submitted(&exchange, 1).await;
        assert!(coordinator.is_executing());
        feed.send(OK.to_string()).unwrap();
        until_submitted(&exchange, 2).await;
        assert!(coordinator.is_executing());
        feed.send(OK.to_string()).unwrap();

        let outcome = coordinator.finish().await.unwrap();
        let SequenceOutcome::Completed(report) = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(report.steps, 2);
        assert_eq!(exchange.submitted(), 2);
        assert!(!coordinator.is_executing());

        let stats = coordinator.stats();
        assert_eq!(stats.profitable, 2);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.busy, 1);
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn test_lock_reusable_after_rejection() {
        let (paper, events) = PaperExchange::new(pairs());
        let (_stop, shutdown) = watch::channel(false);
        let (exchange, mut coordinator) =
            coordinator(paper.reject_submission(1), events, shutdown);

        assert!(matches!(
            coordinator.on_cycle(&candidate(&[0, 1, 0])),
            Evaluation::Dispatched { .. }
        ));
        assert_eq!(
            coordinator.finish().await,
            Some(SequenceOutcome::Rejected {
                step: 0,
                reason: "EOrder:Rejected by paper exchange".to_string()
            })
        );
        assert_eq!(exchange.submitted(), 1);
        assert!(!coordinator.is_executing());

        assert!(matches!(
            coordinator.on_cycle(&candidate(&[0, 1, 0])),
            Evaluation::Dispatched { .. }
        ));
        assert!(matches!(
            coordinator.finish().await,
            Some(SequenceOutcome::Completed(_))
        ));
        assert_eq!(coordinator.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_shutdown_abandons_sequence() {
        let (paper, events) = PaperExchange::new(pairs());
        let paper = paper.manual_confirmations();
        let (stop, shutdown) = watch::channel(false);
        let (exchange, mut coordinator) = coordinator(paper, events, shutdown);

        coordinator.on_cycle(&candidate(&[0, 1, 0]));
        until_submitted(&exchange, 1).await;
        stop.send_replace(true);

        assert_eq!(
            coordinator.finish().await,
            Some(SequenceOutcome::Abandoned { submitted: 1 })
        );
        assert!(!coordinator.is_executing());
        assert_eq!(coordinator.stats().abandoned, 1);
    }

    #[tokio::test]
    async fn test_non_profitable_outcomes() {
        let (paper, events) = PaperExchange::new(pairs());
        let (_stop, shutdown) = watch::channel(false);
        let (exchange, mut coordinator) = coordinator(paper, events, shutdown);

        // buying back A at 2.00 after two legs at 1 halves the position
        assert_eq!(
            coordinator.on_cycle(&candidate(&[0, 2, 1, 0])),
            Evaluation::Unprofitable { amount: 50.0 }
        );
        assert!(matches!(
            coordinator.on_cycle(&candidate(&[1, 2, 1])),
            Evaluation::Failed(ArbError::InvalidCycle(_))
        ));
        assert_eq!(exchange.submitted(), 0);
        assert!(coordinator.finish().await.is_none());

        let stats = coordinator.stats();
        assert_eq!(stats.evaluated, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.dispatched, 0);
    }

    #[tokio::test]
    async fn test_missing_pair_fails_without_blocking_dispatch() {
        // no pair closes C back to A
        let pairs = vec![
            exchange_pair("A", "B", 2.04, 2.0),
            exchange_pair("B", "C", 1.0, 1.0),
        ];
        let (paper, events) = PaperExchange::new(pairs.clone());
        let (_stop, shutdown) = watch::channel(false);
        let (exchange, mut coordinator) = coordinator_with(&pairs, paper, events, shutdown);

        assert_eq!(
            coordinator.on_cycle(&candidate(&[0, 1, 2, 0])),
            Evaluation::Failed(ArbError::InvalidPair {
                left: "C".to_string(),
                right: "A".to_string(),
            })
        );
        assert!(!coordinator.is_executing());
        assert_eq!(exchange.submitted(), 0);

        assert!(matches!(
            coordinator.on_cycle(&candidate(&[0, 1, 0])),
            Evaluation::Dispatched { .. }
        ));
        assert!(matches!(
            coordinator.finish().await,
            Some(SequenceOutcome::Completed(_))
        ));
        assert_eq!(exchange.submitted(), 2);

        let stats = coordinator.stats();
        assert_eq!(stats.evaluated, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn test_run_once() {
        let (paper, events) = PaperExchange::new(pairs());
        let (_stop, shutdown) = watch::channel(false);
        let (exchange, coordinator) = coordinator(paper, events, shutdown);

        let (sender, receiver) = mpsc::channel(8);
        sender.send(candidate(&[0, 2, 1, 0])).await.unwrap();
        sender.send(candidate(&[0, 1, 0])).await.unwrap();
        sender.send(candidate(&[0, 1, 0])).await.unwrap();

        let stats = coordinator.run(receiver, true).await;
        assert_eq!(stats.evaluated, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(exchange.submitted(), 2);
        assert!(sender.send(candidate(&[0, 1, 0])).await.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (paper, events) = PaperExchange::new(pairs());
        let (stop, shutdown) = watch::channel(false);
        let (_exchange, coordinator) = coordinator(paper, events, shutdown);
        let (_sender, receiver) = mpsc::channel(8);

        stop.send_replace(true);
        let stats = coordinator.run(receiver, false).await;
        assert_eq!(stats, StatsSnapshot::default());
    }
}
