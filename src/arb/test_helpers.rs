#![allow(dead_code)]
use super::asset::AssetId;
use super::cycle::Cycle;
use super::market::Market;
use super::pair::ExchangePair;

pub fn pair_with(
    base: &str,
    quote: &str,
    bid: f64,
    ask: f64,
    taker_fee: f64,
    ordermin: f64,
    precision: u8,
) -> ExchangePair {
    ExchangePair {
        trade_name: format!("{base}/{quote}"),
        name: format!("{base}{quote}"),
        base: base.to_string(),
        quote: quote.to_string(),
        precision,
        maker_fee: taker_fee,
        taker_fee,
        ordermin,
        bid,
        ask,
        volume: 0.0,
    }
}

/// A fee-free pair with no order minimum and 8 decimals
pub fn exchange_pair(base: &str, quote: &str, bid: f64, ask: f64) -> ExchangePair {
    pair_with(base, quote, bid, ask, 0.0, 0.0, 8)
}

#[allow(clippy::unwrap_used)]
pub fn market_with(pairs: &[ExchangePair]) -> Market {
    Market::new(pairs).unwrap()
}

pub fn market(pair_args: &[(&str, &str, f64, f64)]) -> Market {
    let pairs: Vec<_> = pair_args
        .iter()
        .map(|(base, quote, bid, ask)| exchange_pair(base, quote, *bid, *ask))
        .collect();
    market_with(&pairs)
}

/// A/B, B/C and C/A at a price of 1
pub fn triangle() -> Market {
    market(&[("A", "B", 1.0, 1.0), ("B", "C", 1.0, 1.0), ("C", "A", 1.0, 1.0)])
}

#[allow(clippy::unwrap_used)]
pub fn cycle(assets: &[AssetId]) -> Cycle {
    Cycle::new(assets.to_vec()).unwrap()
}
