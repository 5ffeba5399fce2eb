//! Venue translators - heterogeneous payloads into one instruction stream
//!
//! Each venue module implements the `Translator` strategy from
//! `core::traits`. Translators are pure: state in, instructions and next
//! state out. The session owns the state value and threads it through.

pub mod bitfinex;
pub mod poloniex;

pub use bitfinex::Bitfinex;
pub use poloniex::Poloniex;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::core::traits::Translator;
use crate::core::types::Venue;
use crate::core::{Error, Result};

/// Per-venue translation state, replaced wholesale on every translate
/// call. One variant per venue keeps the payloads typo-proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationState {
    /// Channel ids assigned by Bitfinex on subscription confirmation.
    Bitfinex {
        book_cid: Option<i64>,
        trades_cid: Option<i64>,
    },
    /// Last sequence number seen on the Poloniex aggregate channel.
    Poloniex { last_seq: Option<i64> },
}

/// Select the translator for a configured venue.
pub fn translator_for(venue: Venue) -> Box<dyn Translator> {
    match venue {
        Venue::Bitfinex => Box::new(Bitfinex),
        // TODO: Poloniex futures frames book updates differently from spot
        // (object payloads instead of positional arrays); give it its own
        // translator before enabling futures markets in production.
        Venue::PoloniexSpot | Venue::PoloniexFutures => Box::new(Poloniex),
    }
}

/// Coerce a JSON number to a finite `Decimal`.
pub(crate) fn decimal_num(v: &Value) -> Result<Decimal> {
    let f = v
        .as_f64()
        .ok_or_else(|| Error::Decode(format!("expected number, got {v}")))?;
    Decimal::try_from(f).map_err(|_| Error::Decode(format!("non-finite number {f}")))
}

/// Parse a venue string-decimal (e.g. "12.5") into a `Decimal`.
pub(crate) fn decimal_str(v: &Value) -> Result<Decimal> {
    let s = v
        .as_str()
        .ok_or_else(|| Error::Decode(format!("expected string number, got {v}")))?;
    s.trim()
        .parse()
        .map_err(|_| Error::Decode(format!("bad decimal '{s}'")))
}

/// Millisecond UTC epoch to a microsecond-resolution instant.
pub(crate) fn ts_from_ms(ms: i64) -> Result<DateTime<Utc>> {
    ms.checked_mul(1_000)
        .and_then(DateTime::from_timestamp_micros)
        .ok_or_else(|| Error::Decode(format!("timestamp out of range: {ms}")))
}
