/*!
 * # Cyclone - Arbitrage Cycle Detection and Execution
 *
 * Cyclone searches the pair graph of a centralized exchange for closed trading loops that
 * return more of the starting asset than they commit, after fees and a slippage buffer, and
 * executes them one order at a time.
 *
 * ## Core Features
 *
 * - **Cycle Search**: Lazy breadth-first enumeration of simple cycles, shortest first
 * - **Profit Simulation**: Deterministic per-leg simulation with precision rounding and fees
 * - **Single-Flight Execution**: At most one order sequence in flight, extra opportunities dropped
 * - **Live Prices**: Quotes updated concurrently and read as consistent snapshots
 *
 * ## Module Structure
 *
 * - `arb`: Asset universe, pair table, graph, cycle enumeration and simulation
 * - `config`: Startup configuration
 * - `engine`: Search producer, coordinator, execution lock and order sequences
 * - `exchange`: The exchange capability and its implementations
 * - `utils`: Utility functions and helpers
 */

/// Arbitrage detection and simulation
pub mod arb;
/// Startup configuration
pub mod config;
/// Concurrent runtime
pub mod engine;
/// Exchange integrations
pub mod exchange;
/// Utility functions and helpers
pub mod utils;
