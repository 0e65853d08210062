use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use eyre::{Result, WrapErr};
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::stopped;
use crate::arb::{Market, PriceUpdate};

/// Applies price ticks to the shared pair table until the tick stream ends or shutdown is
/// signalled. Returns the number of ticks applied.
///
/// Ticks for pairs outside the universe are logged and skipped.
#[must_use]
pub fn spawn_feed(
    market: Arc<Market>,
    mut ticks: mpsc::Receiver<PriceUpdate>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut applied = 0;
        loop {
            tokio::select! {
                () = stopped(&mut shutdown) => break,
                tick = ticks.recv() => {
                    let Some(tick) = tick else {
                        info!("feed: tick stream ended after {applied} ticks");
                        break;
                    };
                    match market.apply_tick(&tick) {
                        Ok(()) => {
                            applied += 1;
                            debug!("feed: {} bid {} ask {}", tick.trade_name, tick.bid, tick.ask);
                        }
                        Err(e) => warn!("feed: {e}"),
                    }
                }
            }
        }
        applied
    })
}

/// Parses JSON ticks from `reader`, one per line, and forwards them until the reader ends or
/// the receiver is dropped. Blank lines are skipped and malformed lines are logged.
///
/// The reader runs on a detached OS thread, so a read blocked on a quiet stdin never holds up
/// runtime shutdown.
///
/// # Errors
/// * If the reader thread cannot be spawned
pub fn spawn_tick_reader<R>(reader: R, capacity: usize) -> Result<mpsc::Receiver<PriceUpdate>>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(capacity);
    thread::Builder::new()
        .name("ticks".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("ticks: reading failed: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<PriceUpdate>(&line) {
                    Ok(tick) => {
                        if sender.blocking_send(tick).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("ticks: ignoring malformed tick {line:?}: {e}"),
                }
            }
            debug!("ticks: reader finished");
        })
        .wrap_err("Failed to spawn the tick reader")?;
    Ok(receiver)
}
