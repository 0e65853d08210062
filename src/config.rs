//! Startup configuration.
//!
//! Values come from the environment (a `.env` file is loaded first by the binary) and may be
//! overridden by command-line flags before [`Config::validate`] runs.
//!
//! # Environment Variables
//! * `CYCLONE_EXCHANGE` - Exchange implementation, `paper` by default
//! * `CYCLONE_INITIAL_ASSET` - Symbol every cycle starts and ends with, `ADA` by default
//! * `CYCLONE_INITIAL_AMOUNT` - Amount committed to the first leg, `200` by default
//! * `CYCLONE_ETA` - Slippage buffer applied to every simulated price, `0.001` by default
//! * `CYCLONE_MAX_PATH_LEN` - Optional cycle length cap in legs
//! * `CYCLONE_LOG_EVERY` - Sample rate for logging unprofitable evaluations, `10000` by default
//! * `CYCLONE_CHANNEL_SIZE` - Capacity of the search to coordinator channel, `1000` by default
//! * `CYCLONE_PAIRS_FILE` - Pair universe of the paper exchange, `pairs.json` by default

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use eyre::{bail, Result, WrapErr};

/// Runtime configuration of the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Exchange implementation to connect to
    pub exchange: String,
    /// Symbol of the asset every cycle starts and ends with
    pub initial_asset: String,
    /// Amount of the initial asset committed to the first leg
    pub initial_amount: f64,
    /// Slippage buffer, a fraction in `[0, 1)`
    pub eta: f64,
    /// Longest cycle to search for, in legs. `None` searches without a cap.
    pub max_path_len: Option<usize>,
    /// Log every n-th unprofitable evaluation, 0 disables sampling
    pub log_every: u64,
    /// Capacity of the cycle channel
    pub channel_size: usize,
    /// Pair universe for the paper exchange
    pub pairs_file: PathBuf,
    /// Stop after the first execution sequence finishes
    pub once: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: "paper".to_string(),
            initial_asset: "ADA".to_string(),
            initial_amount: 200.0,
            eta: 0.001,
            max_path_len: None,
            log_every: 10_000,
            channel_size: 1000,
            pairs_file: PathBuf::from("pairs.json"),
            once: false,
        }
    }
}

/// Reads and parses `key`, `None` if it is unset
fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| eyre::eyre!("{key} is invalid: {e}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).wrap_err_with(|| format!("{key} could not be read")),
    }
}

impl Config {
    /// Builds the configuration from the environment, falling back to defaults.
    ///
    /// Values are not range-checked here so that command-line overrides can still be applied;
    /// call [`Config::validate`] once they are.
    ///
    /// # Errors
    /// * If a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            exchange: parse_var("CYCLONE_EXCHANGE")?.unwrap_or(defaults.exchange),
            initial_asset: parse_var("CYCLONE_INITIAL_ASSET")?.unwrap_or(defaults.initial_asset),
            initial_amount: parse_var("CYCLONE_INITIAL_AMOUNT")?
                .unwrap_or(defaults.initial_amount),
            eta: parse_var("CYCLONE_ETA")?.unwrap_or(defaults.eta),
            max_path_len: parse_var("CYCLONE_MAX_PATH_LEN")?,
            log_every: parse_var("CYCLONE_LOG_EVERY")?.unwrap_or(defaults.log_every),
            channel_size: parse_var("CYCLONE_CHANNEL_SIZE")?.unwrap_or(defaults.channel_size),
            pairs_file: parse_var("CYCLONE_PAIRS_FILE")?.unwrap_or(defaults.pairs_file),
            once: false,
        })
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// * If the initial amount is not a positive finite number
    /// * If eta is outside `[0, 1)`
    /// * If the path length cap is below 2
    /// * If the channel size is 0
    pub fn validate(&self) -> Result<()> {
        if !self.initial_amount.is_finite() || self.initial_amount <= 0.0 {
            bail!(
                "Initial amount must be positive, got {}",
                self.initial_amount
            );
        }
        if !(0.0..1.0).contains(&self.eta) {
            bail!("Eta must be in [0, 1), got {}", self.eta);
        }
        if let Some(max_len) = self.max_path_len {
            if max_len < 2 {
                bail!("Max path length must be at least 2, got {max_len}");
            }
        }
        if self.channel_size == 0 {
            bail!("Channel size must be at least 1");
        }
        Ok(())
    }
}
