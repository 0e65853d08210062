use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cyclone::config::Config;
use cyclone::engine::feed::spawn_tick_reader;
use cyclone::engine::{export_graph, Engine};
use cyclone::exchange;
use cyclone::utils::logger::setup_logger;
use eyre::{Error, Result};
use log::info;

/// Capacity of the stdin tick channel
const TICK_CHANNEL_SIZE: usize = 1000;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    overrides: Overrides,

    /// Log at Debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for and execute cycles (the default)
    Start {
        /// Read JSON price ticks from stdin, one per line
        #[arg(long)]
        stdin_ticks: bool,
    },
    /// Print the asset graph and the initial asset index as JSON, then exit
    Graph,
}

/// Command-line overrides of the environment configuration
#[derive(Args)]
struct Overrides {
    /// Exchange implementation
    #[arg(long, global = true)]
    exchange: Option<String>,
    /// Asset every cycle starts and ends with
    #[arg(long, global = true)]
    initial_asset: Option<String>,
    /// Amount committed to the first leg
    #[arg(long, global = true)]
    initial_amount: Option<f64>,
    /// Slippage buffer
    #[arg(long, global = true)]
    eta: Option<f64>,
    /// Longest cycle to search for, in legs
    #[arg(long, global = true)]
    max_path_len: Option<usize>,
    /// Log every n-th unprofitable evaluation, 0 disables
    #[arg(long, global = true)]
    log_every: Option<u64>,
    /// Pair universe for the paper exchange
    #[arg(long, global = true)]
    pairs_file: Option<PathBuf>,
    /// Stop after the first execution sequence
    #[arg(long, global = true)]
    once: bool,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(exchange) = self.exchange {
            config.exchange = exchange;
        }
        if let Some(initial_asset) = self.initial_asset {
            config.initial_asset = initial_asset;
        }
        if let Some(initial_amount) = self.initial_amount {
            config.initial_amount = initial_amount;
        }
        if let Some(eta) = self.eta {
            config.eta = eta;
        }
        if self.max_path_len.is_some() {
            config.max_path_len = self.max_path_len;
        }
        if let Some(log_every) = self.log_every {
            config.log_every = log_every;
        }
        if let Some(pairs_file) = self.pairs_file {
            config.pairs_file = pairs_file;
        }
        config.once |= self.once;
    }
}

async fn start(config: Config, stdin_ticks: bool) -> Result<(), Error> {
    let (exchange, events) = exchange::connect(&config)?;
    let engine = Engine::new(config);

    let stop = engine.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            stop.send_replace(true);
        }
    });

    let ticks = if stdin_ticks {
        Some(spawn_tick_reader(
            std::io::BufReader::new(std::io::stdin()),
            TICK_CHANNEL_SIZE,
        )?)
    } else {
        None
    };
    let summary = engine.run(exchange, events, ticks).await?;
    info!("Run finished: {summary:?}");
    Ok(())
}

async fn print_graph(config: &Config) -> Result<(), Error> {
    let (exchange, _events) = exchange::connect(config)?;
    let pairs = exchange.pairs().await?;
    let graph = export_graph(&pairs, &config.initial_asset)?;
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenv::dotenv();
    let cli = Cli::parse();
    setup_logger(cli.verbose)?;

    let mut config = Config::from_env()?;
    cli.overrides.apply(&mut config);
    config.validate()?;

    match cli.command {
        Some(Commands::Graph) => print_graph(&config).await?,
        Some(Commands::Start { stdin_ticks }) => start(config, stdin_ticks).await?,
        None => start(config, false).await?,
    }

    Ok(())
}
