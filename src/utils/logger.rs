use chrono::Local;
use eyre::Result;
use fern::Dispatch;
use log::LevelFilter;

/// Parses a `RUST_LOG`-style level, falling back to Info for anything unrecognized
fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|level| level.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Sets up the engine logger on stdout.
///
/// # Arguments
/// * `verbose` - Forces Debug level regardless of `RUST_LOG`
///
/// # Errors
/// * If a logger has already been installed
pub fn setup_logger(verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        parse_level(std::env::var("RUST_LOG").ok().as_deref())
    };

    Dispatch::new()
        .level(level)
        .chain(std::io::stdout())
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ));
        })
        .apply()?;
    Ok(())
}
