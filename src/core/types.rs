//! Core types - the normalized market-data vocabulary

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Order-book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

/// Aggressor side of a print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// One (price, liquidity) pair on a side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// An incremental change at one price level. A size of zero (or below)
/// deletes the level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

/// A market print. Size is always positive; the direction lives in `side`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: TradeSide,
    pub price: Decimal,
    pub size: Decimal,
    /// UTC instant at microsecond resolution.
    pub timestamp: DateTime<Utc>,
}

/// Normalized instruction emitted by a translator.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Advisory, heartbeat, or subscription acknowledgement. No effect.
    NoOp,
    /// Replace the book entirely.
    Snapshot {
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },
    /// Apply each delta in order.
    Deltas(Vec<Delta>),
    /// Forward as market-buy prints.
    Buys(Vec<Trade>),
    /// Forward as market-sell prints.
    Sells(Vec<Trade>),
}

/// Market category, the `<TYPE>` field of the canonical tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Spot,
    Perp,
    Futures,
}

impl std::fmt::Display for MarketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketKind::Spot => write!(f, "SPOT"),
            MarketKind::Perp => write!(f, "PERP"),
            MarketKind::Futures => write!(f, "FUTURES"),
        }
    }
}

impl std::str::FromStr for MarketKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "spot" => Ok(MarketKind::Spot),
            "perp" => Ok(MarketKind::Perp),
            "futures" => Ok(MarketKind::Futures),
            other => Err(Error::Config(format!("unknown market kind '{other}'"))),
        }
    }
}

/// Translator selector, one per venue dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Bitfinex,
    PoloniexSpot,
    PoloniexFutures,
}

impl std::str::FromStr for Venue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bitfinex" => Ok(Venue::Bitfinex),
            "poloniex_spot" => Ok(Venue::PoloniexSpot),
            "poloniex_futures" => Ok(Venue::PoloniexFutures),
            other => Err(Error::Config(format!("unknown venue '{other}'"))),
        }
    }
}

/// One configured data feed. Immutable after configuration; the session
/// owns everything mutable (book, translation state).
#[derive(Debug, Clone)]
pub struct Market {
    pub exchange: String,
    pub kind: MarketKind,
    pub base: String,
    pub quote: String,
    pub ws_url: String,
    pub venue: Venue,
    pub ping_required: bool,
}

impl Market {
    /// Canonical downstream tag: `<EXCHANGE>.<TYPE>:<BASE>-<QUOTE>`,
    /// fully uppercased. Fields never contain dots, colons, or hyphens.
    pub fn tag(&self) -> String {
        format!(
            "{}.{}:{}-{}",
            self.exchange.to_uppercase(),
            self.kind,
            self.base.to_uppercase(),
            self.quote.to_uppercase()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_tag_is_uppercase() {
        let market = Market {
            exchange: "bitfinex".to_string(),
            kind: MarketKind::Spot,
            base: "btc".to_string(),
            quote: "usd".to_string(),
            ws_url: "wss://api-pub.bitfinex.com/ws/2".to_string(),
            venue: Venue::Bitfinex,
            ping_required: true,
        };
        assert_eq!(market.tag(), "BITFINEX.SPOT:BTC-USD");
    }

    #[test]
    fn test_kind_and_venue_parse() {
        assert_eq!("perp".parse::<MarketKind>().unwrap(), MarketKind::Perp);
        assert_eq!(
            "poloniex_futures".parse::<Venue>().unwrap(),
            Venue::PoloniexFutures
        );
        assert!("swap".parse::<MarketKind>().is_err());
        assert!("kraken".parse::<Venue>().is_err());
    }
}
