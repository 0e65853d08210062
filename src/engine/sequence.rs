//! One order-submission sequence.
//!
//! Steps are submitted strictly one at a time: the next order only goes out once the exchange
//! has confirmed the previous one. Confirmations are matched to orders by arrival order. A
//! rejection stops the sequence where it is; orders already filled are not unwound.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::watch;

use super::lock::ExecutionGuard;
use super::stopped;
use crate::arb::Step;
use crate::exchange::{Confirmation, Exchange, OrderRequest};

/// Timing and result of a completed sequence
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    /// Orders submitted and confirmed
    pub steps: usize,
    /// Simulated final amount of the starting asset
    pub final_amount: f64,
    /// First submission to last confirmation
    pub total: Duration,
    /// `total` divided by the number of steps
    pub mean_step: Duration,
    /// Time spent finding and simulating the cycle before dispatch
    pub compute: Duration,
    /// Time spent waiting for confirmations
    pub transport_wait: Duration,
}

/// How a sequence ended
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceOutcome {
    /// Every step was confirmed
    Completed(ExecutionReport),
    /// The exchange rejected a step; later steps were not submitted
    Rejected {
        /// Zero-based index of the rejected step
        step: usize,
        /// Exchange-supplied reason
        reason: String,
    },
    /// Submitting a step failed before it reached the exchange
    SubmitFailed {
        /// Zero-based index of the failed step
        step: usize,
        /// Transport error
        reason: String,
    },
    /// Shutdown was requested mid-sequence
    Abandoned {
        /// Orders submitted before the sequence was abandoned
        submitted: usize,
    },
    /// The event channel closed while waiting for a confirmation
    TransportClosed {
        /// Orders submitted before the channel closed
        submitted: usize,
    },
}

/// A dispatched sequence, holding the execution lock until it ends
pub struct ExecutionSequence {
    /// Where orders go
    exchange: Arc<dyn Exchange>,
    /// The lock, and with it the confirmation channel
    guard: ExecutionGuard,
    /// Orders in submission order
    steps: Vec<Step>,
    /// Simulated final amount
    final_amount: f64,
    /// Search and simulation time spent on this cycle
    compute: Duration,
}

impl ExecutionSequence {
    /// Prepares a sequence for the steps of a profitable simulation
    #[must_use]
    pub fn new(
        exchange: Arc<dyn Exchange>,
        guard: ExecutionGuard,
        steps: Vec<Step>,
        final_amount: f64,
        compute: Duration,
    ) -> Self {
        Self {
            exchange,
            guard,
            steps,
            final_amount,
            compute,
        }
    }

    /// Submits every step, each gated on the confirmation of the one before.
    ///
    /// The execution lock is released when this returns, whatever the outcome.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SequenceOutcome {
        let stale = self.guard.drain_stale();
        if !stale.is_empty() {
            warn!("sequence: dropped {} stale events: {stale:?}", stale.len());
        }

        let start = Instant::now();
        let mut transport_wait = Duration::ZERO;

        for (index, step) in self.steps.iter().enumerate() {
            if *shutdown.borrow() {
                warn!("sequence: abandoned before step {index}, {index} orders submitted");
                return SequenceOutcome::Abandoned { submitted: index };
            }

            let order = OrderRequest::from(step);
            if let Err(e) = self.exchange.submit(&order).await {
                warn!("sequence: submitting step {index} failed: {e}");
                return SequenceOutcome::SubmitFailed {
                    step: index,
                    reason: e.to_string(),
                };
            }
            debug!(
                "sequence: step {index} submitted: {} {} {}",
                step.direction, step.amount, step.pair
            );

            let waiting = Instant::now();
            loop {
                tokio::select! {
                    event = self.guard.events().recv() => {
                        let Some(event) = event else {
                            warn!("sequence: event channel closed at step {index}");
                            return SequenceOutcome::TransportClosed { submitted: index + 1 };
                        };
                        match self.exchange.parse_confirmation(&event) {
                            Some(Confirmation::Accepted) => break,
                            Some(Confirmation::Rejected { reason }) => {
                                warn!("sequence: step {index} rejected: {reason}");
                                return SequenceOutcome::Rejected { step: index, reason };
                            }
                            None => debug!("sequence: ignoring event {event}"),
                        }
                    }
                    () = stopped(&mut shutdown) => {
                        warn!(
                            "sequence: abandoned waiting for step {index}, {} orders submitted",
                            index + 1
                        );
                        return SequenceOutcome::Abandoned { submitted: index + 1 };
                    }
                }
            }
            transport_wait += waiting.elapsed();
        }

        let total = start.elapsed();
        let steps = self.steps.len();
        let report = ExecutionReport {
            steps,
            final_amount: self.final_amount,
            total,
            mean_step: total
                .checked_div(u32::try_from(steps).unwrap_or(u32::MAX))
                .unwrap_or_default(),
            compute: self.compute,
            transport_wait,
        };
        info!(
            "sequence: completed {} steps on {}, final amount {}, total {:?}, mean step {:?}, compute {:?}, transport wait {:?}",
            report.steps,
            self.exchange.name(),
            report.final_amount,
            report.total,
            report.mean_step,
            report.compute,
            report.transport_wait
        );
        SequenceOutcome::Completed(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::arb::Direction;
    use crate::engine::lock::ExecutionLock;
    use crate::exchange::{Events, PaperExchange};

    fn steps() -> Vec<Step> {
        vec![
            Step {
                direction: Direction::Sell,
                pair: "A/B".to_string(),
                amount: 100.0,
                price: 2.0,
                amount_out: 200.0,
            },
            Step {
                direction: Direction::Buy,
                pair: "B/C".to_string(),
                amount: 50.0,
                price: 4.0,
                amount_out: 50.0,
            },
            Step {
                direction: Direction::Sell,
                pair: "C/A".to_string(),
                amount: 50.0,
                price: 2.1,
                amount_out: 105.0,
            },
        ]
    }

    fn sequence(
        exchange: PaperExchange,
        events: Events,
    ) -> (Arc<PaperExchange>, ExecutionLock, ExecutionSequence) {
        let exchange = Arc::new(exchange);
        let lock = ExecutionLock::new(events);
        let guard = lock.try_acquire().unwrap();
        let sequence = ExecutionSequence::new(
            exchange.clone(),
            guard,
            steps(),
            105.0,
            Duration::from_millis(3),
        );
        (exchange, lock, sequence)
    }

    #[tokio::test]
    async fn test_completes_all_steps() {
        let (paper, events) = PaperExchange::new(Vec::new());
        let (exchange, lock, sequence) = sequence(paper, events);
        let (_stop, shutdown) = watch::channel(false);

        let outcome = sequence.run(shutdown).await;
        let SequenceOutcome::Completed(report) = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(report.steps, 3);
        assert_eq!(report.compute, Duration::from_millis(3));
        assert!(report.transport_wait <= report.total);
        assert_eq!(exchange.submitted(), 3);
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn test_rejection_stops_sequence() {
        let (paper, events) = PaperExchange::new(Vec::new());
        let (exchange, lock, sequence) = sequence(paper.reject_submission(2), events);
        let (_stop, shutdown) = watch::channel(false);

        assert_eq!(
            sequence.run(shutdown).await,
            SequenceOutcome::Rejected {
                step: 1,
                reason: "EOrder:Rejected by paper exchange".to_string()
            }
        );
        assert_eq!(exchange.submitted(), 2);
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn test_stale_events_are_not_confirmations() {
        let (paper, events) = PaperExchange::new(Vec::new());
        let paper = paper.manual_confirmations();
        let feed = paper.event_sender();
        feed.send(r#"{"event":"addOrderStatus","status":"ok"}"#.to_string())
            .unwrap();
        let (exchange, lock, sequence) = sequence(paper, events);
        let (stop, shutdown) = watch::channel(false);

        let task = tokio::spawn(sequence.run(shutdown));
        while exchange.submitted() < 1 {
            tokio::task::yield_now().await;
        }
        // the queued event was drained, so the first step is still waiting
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(exchange.submitted(), 1);
        assert!(lock.is_held());

        stop.send_replace(true);
        assert_eq!(
            task.await.unwrap(),
            SequenceOutcome::Abandoned { submitted: 1 }
        );
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn test_transport_closed() {
        let (paper, _paper_events) = PaperExchange::new(Vec::new());
        let (feed, events) = mpsc::unbounded_channel();
        drop(feed);
        let (exchange, lock, sequence) = sequence(paper.manual_confirmations(), events);
        let (_stop, shutdown) = watch::channel(false);

        assert_eq!(
            sequence.run(shutdown).await,
            SequenceOutcome::TransportClosed { submitted: 1 }
        );
        assert_eq!(exchange.submitted(), 1);
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn test_abandoned_before_first_step() {
        let (paper, events) = PaperExchange::new(Vec::new());
        let (exchange, _lock, sequence) = sequence(paper, events);
        let (_stop, shutdown) = watch::channel(true);

        assert_eq!(
            sequence.run(shutdown).await,
            SequenceOutcome::Abandoned { submitted: 0 }
        );
        assert_eq!(exchange.submitted(), 0);
    }

    #[tokio::test]
    async fn test_unrelated_events_are_ignored() {
        let (paper, events) = PaperExchange::new(Vec::new());
        let paper = paper.manual_confirmations();
        let feed = paper.event_sender();
        let (exchange, _lock, sequence) = sequence(paper, events);
        let (_stop, shutdown) = watch::channel(false);

        let task = tokio::spawn(sequence.run(shutdown));
        for submitted in 1..=3 {
            while exchange.submitted() < submitted {
                tokio::task::yield_now().await;
            }
            feed.send(r#"{"event":"heartbeat"}"#.to_string()).unwrap();
            feed.send(r#"{"event":"addOrderStatus","status":"ok"}"#.to_string())
                .unwrap();
        }

        let outcome = task.await.unwrap();
        assert!(matches!(outcome, SequenceOutcome::Completed(_)));
    }
}
