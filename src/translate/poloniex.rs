//! Poloniex translator
//!
//! One aggregate channel per market carries snapshots, book deltas, and
//! trades as tagged positional arrays: `[channel_id, seq, [entries...]]`.
//! Prices and sizes arrive as decimal strings. Spot and futures markets
//! currently share this scheme.
//!
//! The last-seen sequence number is recorded but gaps are not treated as
//! resync triggers; `is_synchronised` stays conservatively true.

use serde_json::{json, Value};

use crate::core::traits::Translator;
use crate::core::types::{Delta, Instruction, PriceLevel, Side, Trade, TradeSide};
use crate::core::{Error, Result};
use crate::translate::{decimal_str, ts_from_ms, TranslationState};

pub struct Poloniex;

/// `["i", {..., "orderBook": [asks_map, bids_map]}, epoch_ms]`
fn snapshot_entry(entry: &[Value]) -> Result<Instruction> {
    let body = entry
        .get(1)
        .ok_or_else(|| Error::Decode("snapshot entry without body".into()))?;
    let book = body
        .get("orderBook")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Decode("snapshot entry without orderBook".into()))?;
    if book.len() != 2 {
        return Err(Error::Decode(format!(
            "orderBook with {} sides, expected 2",
            book.len()
        )));
    }
    // Venue order is asks first, bids second.
    let asks = side_levels(&book[0])?;
    let bids = side_levels(&book[1])?;
    Ok(Instruction::Snapshot { bids, asks })
}

fn side_levels(v: &Value) -> Result<Vec<PriceLevel>> {
    let map = v
        .as_object()
        .ok_or_else(|| Error::Decode(format!("orderBook side not a map: {v}")))?;
    let mut levels = Vec::with_capacity(map.len());
    for (price, size) in map {
        let price = price
            .trim()
            .parse()
            .map_err(|_| Error::Decode(format!("bad price key '{price}'")))?;
        let size = decimal_str(size)?;
        levels.push(PriceLevel { price, size });
    }
    Ok(levels)
}

/// `["o", 1|0, price_str, size_str, ...]`: 1 is a bid, 0 an ask. A size
/// of "0" deletes the level.
fn delta_entry(entry: &[Value]) -> Result<Instruction> {
    if entry.len() < 4 {
        return Err(Error::Decode(format!(
            "order delta with {} fields, expected at least 4",
            entry.len()
        )));
    }
    let side = match entry[1].as_i64() {
        Some(1) => Side::Bid,
        Some(0) => Side::Ask,
        _ => {
            return Err(Error::Decode(format!(
                "order delta side flag not 0/1: {}",
                entry[1]
            )))
        }
    };
    let price = decimal_str(&entry[2])?;
    let size = decimal_str(&entry[3])?;
    Ok(Instruction::Deltas(vec![Delta { side, price, size }]))
}

/// `["t", trade_id, 1|0, price_str, size_str, _ts, epoch_str]` where
/// `epoch_str` is a string of integer milliseconds.
fn trade_entry(entry: &[Value]) -> Result<Instruction> {
    if entry.len() < 7 {
        return Err(Error::Decode(format!(
            "trade entry with {} fields, expected at least 7",
            entry.len()
        )));
    }
    let price = decimal_str(&entry[3])?;
    let size = decimal_str(&entry[4])?;
    let ms: i64 = entry[6]
        .as_str()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| Error::Decode(format!("trade epoch not an integer string: {}", entry[6])))?;
    let timestamp = ts_from_ms(ms)?;

    match entry[2].as_i64() {
        Some(1) => Ok(Instruction::Buys(vec![Trade {
            side: TradeSide::Buy,
            price,
            size,
            timestamp,
        }])),
        Some(0) => Ok(Instruction::Sells(vec![Trade {
            side: TradeSide::Sell,
            price,
            size,
            timestamp,
        }])),
        _ => Err(Error::Decode(format!(
            "trade side flag not 0/1: {}",
            entry[2]
        ))),
    }
}

impl Translator for Poloniex {
    fn initial_state(&self) -> TranslationState {
        TranslationState::Poloniex { last_seq: None }
    }

    fn subscribe_msgs(&self, base: &str, quote: &str) -> Vec<String> {
        vec![json!({"command": "subscribe", "channel": format!("{quote}_{base}")}).to_string()]
    }

    fn ping_msgs(&self, _state: &TranslationState) -> Vec<String> {
        vec![json!({"op": "ping"}).to_string()]
    }

    fn translate(
        &self,
        msg: &Value,
        state: TranslationState,
    ) -> Result<(Vec<Instruction>, TranslationState)> {
        let TranslationState::Poloniex { last_seq } = state else {
            return Err(Error::Decode("poloniex translator fed foreign state".into()));
        };

        let Some(arr) = msg.as_array() else {
            return Ok((
                vec![Instruction::NoOp],
                TranslationState::Poloniex { last_seq },
            ));
        };

        // [1010] keepalive, [1002]/[1003] ticker channels, short acks.
        if arr.len() < 3 {
            return Ok((
                vec![Instruction::NoOp],
                TranslationState::Poloniex { last_seq },
            ));
        }

        let seq = arr[1]
            .as_i64()
            .ok_or_else(|| Error::Decode(format!("sequence number not an integer: {}", arr[1])))?;
        let entries = arr[2]
            .as_array()
            .ok_or_else(|| Error::Decode(format!("message list not an array: {}", arr[2])))?;

        let mut instructions = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry
                .as_array()
                .ok_or_else(|| Error::Decode(format!("message entry not an array: {entry}")))?;
            match entry.first().and_then(Value::as_str) {
                Some("i") => instructions.push(snapshot_entry(entry)?),
                Some("o") => instructions.push(delta_entry(entry)?),
                Some("t") => instructions.push(trade_entry(entry)?),
                _ => instructions.push(Instruction::NoOp),
            }
        }

        Ok((
            instructions,
            TranslationState::Poloniex {
                last_seq: Some(seq),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscribe_channel_is_quote_underscore_base() {
        let frames = Poloniex.subscribe_msgs("BTC", "USDT");
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains(r#""channel":"USDT_BTC""#));
        assert!(frames[0].contains(r#""command":"subscribe""#));
    }

    #[test]
    fn test_ping_is_unconditional() {
        for state in [
            Poloniex.initial_state(),
            TranslationState::Poloniex { last_seq: Some(9) },
        ] {
            assert_eq!(Poloniex.ping_msgs(&state), vec![r#"{"op":"ping"}"#.to_string()]);
        }
    }

    #[test]
    fn test_heartbeat_and_ticker_channels_are_noops() {
        for raw in ["[1010]", "[1002]", "[1003]"] {
            let msg: Value = serde_json::from_str(raw).unwrap();
            let (instructions, state) =
                Poloniex.translate(&msg, Poloniex.initial_state()).unwrap();
            assert_eq!(instructions, vec![Instruction::NoOp], "for {raw}");
            assert_eq!(state, TranslationState::Poloniex { last_seq: None });
        }
    }

    #[test]
    fn test_snapshot_sides_arrive_asks_first() {
        // E3: orderBook lists the ask map before the bid map.
        let msg: Value = serde_json::from_str(
            r#"[148, 1, [["i", {"currencyPair": "USDT_BTC", "orderBook": [{"10.0": "2.0"}, {"9.0": "3.0"}]}, 1700000000000]]]"#,
        )
        .unwrap();
        let (instructions, state) = Poloniex.translate(&msg, Poloniex.initial_state()).unwrap();
        assert_eq!(
            instructions,
            vec![Instruction::Snapshot {
                bids: vec![PriceLevel { price: dec!(9.0), size: dec!(3.0) }],
                asks: vec![PriceLevel { price: dec!(10.0), size: dec!(2.0) }],
            }]
        );
        assert_eq!(state, TranslationState::Poloniex { last_seq: Some(1) });
    }

    #[test]
    fn test_delta_pair_insert_then_delete() {
        // E4: flag 1 is a bid insert, flag 0 with size "0" deletes the ask.
        let msg: Value = serde_json::from_str(
            r#"[148, 2, [["o", 1, "9.5", "1.0", 1700000000000], ["o", 0, "10.5", "0", 1700000000000]]]"#,
        )
        .unwrap();
        let (instructions, _) = Poloniex.translate(&msg, Poloniex.initial_state()).unwrap();
        assert_eq!(
            instructions,
            vec![
                Instruction::Deltas(vec![Delta {
                    side: Side::Bid,
                    price: dec!(9.5),
                    size: dec!(1.0),
                }]),
                Instruction::Deltas(vec![Delta {
                    side: Side::Ask,
                    price: dec!(10.5),
                    size: dec!(0),
                }]),
            ]
        );
    }

    #[test]
    fn test_trades_parse_epoch_strings() {
        let msg: Value = serde_json::from_str(
            r#"[148, 3, [["t", "12345", 1, "9.6", "0.5", 1700000000, "1700000000000"], ["t", "12346", 0, "9.4", "0.25", 1700000000, "1700000000000"]]]"#,
        )
        .unwrap();
        let (instructions, state) = Poloniex.translate(&msg, Poloniex.initial_state()).unwrap();

        let Instruction::Buys(buys) = &instructions[0] else {
            panic!("expected buys, got {instructions:?}");
        };
        assert_eq!(buys[0].price, dec!(9.6));
        assert_eq!(buys[0].size, dec!(0.5));
        assert_eq!(buys[0].timestamp.to_rfc3339(), "2023-11-14T22:13:20+00:00");

        assert!(matches!(&instructions[1], Instruction::Sells(s) if s[0].price == dec!(9.4)));
        assert_eq!(state, TranslationState::Poloniex { last_seq: Some(3) });
    }

    #[test]
    fn test_unknown_entry_tag_is_noop() {
        let msg: Value = serde_json::from_str(r#"[148, 4, [["x", 1, 2]]]"#).unwrap();
        let (instructions, _) = Poloniex.translate(&msg, Poloniex.initial_state()).unwrap();
        assert_eq!(instructions, vec![Instruction::NoOp]);
    }

    #[test]
    fn test_malformed_delta_is_rejected() {
        let msg: Value = serde_json::from_str(r#"[148, 5, [["o", 2, "9.5", "1.0"]]]"#).unwrap();
        assert!(matches!(
            Poloniex.translate(&msg, Poloniex.initial_state()),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_translate_is_pure() {
        let msg: Value = serde_json::from_str(
            r#"[148, 2, [["o", 1, "9.5", "1.0", 1700000000000]]]"#,
        )
        .unwrap();
        let state = TranslationState::Poloniex { last_seq: Some(1) };
        let first = Poloniex.translate(&msg, state.clone()).unwrap();
        let second = Poloniex.translate(&msg, state).unwrap();
        assert_eq!(first, second);
    }
}
