use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use derive_more::Display;
use serde::Serialize;

use super::asset::AssetId;
use super::cycle::Cycle;
use super::error::ArbError;
use super::market::Market;
use super::pair::Pair;

/// Side of a simulated order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Spend the quote asset to get the base asset
    #[display("buy")]
    Buy,
    /// Spend the base asset to get the quote asset
    #[display("sell")]
    Sell,
}

/// One simulated trade, in execution order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    /// Buy or sell
    pub direction: Direction,
    /// Trade name of the pair the order goes to
    pub pair: String,
    /// Order amount in base units, already rounded to the pair's precision
    pub amount: f64,
    /// Price used for the simulation, slippage buffer included
    pub price: f64,
    /// Amount of the next exposure asset after the trade
    pub amount_out: f64,
}

/// What a simulated cycle is worth
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationResult {
    /// A leg fell below its pair's order minimum. Carries the legs simulated before it.
    NotActionable {
        /// Steps simulated before the walk stopped
        steps: Vec<Step>,
    },
    /// The cycle completes but returns no more than it started with
    Unprofitable {
        /// Final amount of the starting asset
        amount: f64,
    },
    /// The cycle returns more than it started with
    Profitable {
        /// Final amount of the starting asset
        amount: f64,
        /// The orders to submit, in order
        steps: Vec<Step>,
    },
}

impl SimulationResult {
    /// Whether the result is worth executing
    #[must_use]
    pub const fn is_profitable(&self) -> bool {
        matches!(self, Self::Profitable { .. })
    }

    /// Final amount, `0` when the walk stopped early
    #[must_use]
    pub const fn amount(&self) -> f64 {
        match self {
            Self::NotActionable { .. } => 0.0,
            Self::Unprofitable { amount } | Self::Profitable { amount, .. } => *amount,
        }
    }
}

/// Rounds an amount to `precision` decimals, halves rounding up.
///
/// Rounding happens on the shortest decimal form of `value`, so `1.005` rounds to `1.01` even
/// though the nearest `f64` lies just below the tie. Non-finite values pass through unchanged.
#[must_use]
pub fn round_to(value: f64, precision: u8) -> f64 {
    if !value.is_finite() {
        return value;
    }
    BigDecimal::from_str(&value.to_string())
        .ok()
        .map(|decimal| decimal.with_scale_round(i64::from(precision), RoundingMode::HalfUp))
        .and_then(|rounded| rounded.to_string().parse().ok())
        .unwrap_or(value)
}

/// Division that yields `0` for a zero divisor instead of an infinite or undefined value
#[must_use]
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Simulates cycles for a fixed starting position.
///
/// The simulation is deterministic for a given set of quotes. Each pair's quote is read once,
/// as a snapshot, when its leg is reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitSimulator {
    /// Asset every cycle starts and ends with
    pub initial_asset: AssetId,
    /// Amount committed to the first leg
    pub initial_amount: f64,
    /// Slippage buffer applied to every price
    pub eta: f64,
}

impl ProfitSimulator {
    /// Creates a simulator for one starting position
    #[must_use]
    pub const fn new(initial_asset: AssetId, initial_amount: f64, eta: f64) -> Self {
        Self {
            initial_asset,
            initial_amount,
            eta,
        }
    }

    /// Simulates the trades implied by `cycle` against the current quotes of `market`.
    ///
    /// # Errors
    ///
    /// * [`ArbError::InvalidCycle`] if the cycle does not start at the initial asset
    /// * [`ArbError::InvalidPair`] if two consecutive assets have no pair
    /// * [`ArbError::InvariantViolation`] if the pairs do not chain from the initial asset
    pub fn simulate(&self, cycle: &Cycle, market: &Market) -> Result<SimulationResult, ArbError> {
        if cycle.start() != self.initial_asset {
            return Err(ArbError::InvalidCycle(format!(
                "{cycle:?} does not start at asset {}",
                self.initial_asset
            )));
        }

        let pairs = cycle
            .legs()
            .map(|(from, to)| market.require(from, to))
            .collect::<Result<Vec<_>, _>>()?;

        self.walk(&pairs)
    }

    /// Checks that the pairs chain from the initial asset, then simulates them in order
    fn walk(&self, pairs: &[&Pair]) -> Result<SimulationResult, ArbError> {
        pairs
            .iter()
            .enumerate()
            .try_fold(self.initial_asset, |exposure, (leg, pair)| {
                pair.other(exposure)
                    .ok_or_else(|| ArbError::InvariantViolation {
                        leg,
                        exposure,
                        pair: pair.trade_name.clone(),
                        base: pair.base,
                        quote: pair.quote,
                    })
            })?;

        let mut exposure = self.initial_asset;
        let mut amount = self.initial_amount;
        let mut steps = Vec::with_capacity(pairs.len());

        for pair in pairs {
            if amount < pair.ordermin {
                return Ok(SimulationResult::NotActionable { steps });
            }
            let step = self.step(pair, exposure, amount);
            exposure = if step.direction == Direction::Sell {
                pair.quote
            } else {
                pair.base
            };
            amount = step.amount_out;
            steps.push(step);
        }

        if amount > self.initial_amount {
            Ok(SimulationResult::Profitable { amount, steps })
        } else {
            Ok(SimulationResult::Unprofitable { amount })
        }
    }

    /// One leg: sell when holding the base asset, buy otherwise
    fn step(&self, pair: &Pair, exposure: AssetId, amount: f64) -> Step {
        let quote = pair.quote();

        if exposure == pair.base {
            let price = quote.bid * (1.0 - self.eta);
            let order = round_to(amount, pair.precision);
            Step {
                direction: Direction::Sell,
                pair: pair.trade_name.clone(),
                amount: order,
                price,
                amount_out: order * price * (1.0 - pair.taker_fee),
            }
        } else {
            let price = quote.ask * (1.0 + self.eta);
            let order = round_to(
                safe_divide(amount, price * (1.0 + pair.taker_fee)),
                pair.precision,
            );
            Step {
                direction: Direction::Buy,
                pair: pair.trade_name.clone(),
                amount: order,
                price,
                amount_out: order,
            }
        }
    }
}
