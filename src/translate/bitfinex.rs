//! Bitfinex translator
//!
//! Two channels per market ("book" and "trades") share one socket. The
//! venue assigns a numeric channel id on each subscription confirmation
//! and prefixes every later data frame with it, so the translation state
//! is exactly those two ids.
//!
//! Book rows are `[price, count, amount]`: the amount's sign selects the
//! side, `count = 0` deletes the level. Trade rows arrive as
//! `[chan, "te"|"tu", [id, epoch_ms, amount, price]]`; both tags carry
//! the same payload and both are honored.

use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::core::traits::Translator;
use crate::core::types::{Delta, Instruction, PriceLevel, Side, Trade, TradeSide};
use crate::core::{Error, Result};
use crate::translate::{decimal_num, ts_from_ms, TranslationState};

pub struct Bitfinex;

/// `[price, count, amount]` into one delta.
fn delta_from_row(row: &[Value]) -> Result<Delta> {
    if row.len() != 3 {
        return Err(Error::Decode(format!(
            "book update with {} fields, expected 3",
            row.len()
        )));
    }
    let price = decimal_num(&row[0])?;
    let count = row[1]
        .as_f64()
        .ok_or_else(|| Error::Decode(format!("book count not a number: {}", row[1])))?;
    let amount = decimal_num(&row[2])?;

    let (side, size) = if amount > Decimal::ZERO {
        (Side::Bid, amount)
    } else {
        (Side::Ask, -amount)
    };
    let size = if count == 0.0 { Decimal::ZERO } else { size };
    Ok(Delta { side, price, size })
}

/// A list of `[price, count, amount]` rows into a full snapshot,
/// partitioned by the sign of the amount.
fn snapshot_from_rows(rows: &[Value]) -> Result<Instruction> {
    let mut bids = Vec::with_capacity(rows.len());
    let mut asks = Vec::with_capacity(rows.len());
    for entry in rows {
        let row = entry
            .as_array()
            .ok_or_else(|| Error::Decode(format!("snapshot row not an array: {entry}")))?;
        if row.len() != 3 {
            return Err(Error::Decode(format!(
                "snapshot row with {} fields, expected 3",
                row.len()
            )));
        }
        let price = decimal_num(&row[0])?;
        let amount = decimal_num(&row[2])?;
        if amount > Decimal::ZERO {
            bids.push(PriceLevel {
                price,
                size: amount,
            });
        } else {
            asks.push(PriceLevel {
                price,
                size: -amount,
            });
        }
    }
    Ok(Instruction::Snapshot { bids, asks })
}

/// `[id, epoch_ms, amount, price]` into a buy or sell print.
fn trade_from_row(row: &[Value]) -> Result<Instruction> {
    if row.len() != 4 {
        return Err(Error::Decode(format!(
            "trade row with {} fields, expected 4",
            row.len()
        )));
    }
    let ms = row[1]
        .as_i64()
        .ok_or_else(|| Error::Decode(format!("trade epoch not an integer: {}", row[1])))?;
    let timestamp = ts_from_ms(ms)?;
    let amount = decimal_num(&row[2])?;
    let price = decimal_num(&row[3])?;

    Ok(if amount > Decimal::ZERO {
        Instruction::Buys(vec![Trade {
            side: TradeSide::Buy,
            price,
            size: amount,
            timestamp,
        }])
    } else {
        Instruction::Sells(vec![Trade {
            side: TradeSide::Sell,
            price,
            size: -amount,
            timestamp,
        }])
    })
}

impl Translator for Bitfinex {
    fn initial_state(&self) -> TranslationState {
        TranslationState::Bitfinex {
            book_cid: None,
            trades_cid: None,
        }
    }

    fn subscribe_msgs(&self, base: &str, quote: &str) -> Vec<String> {
        let symbol = format!("t{base}{quote}");
        vec![
            json!({"event": "subscribe", "channel": "book", "symbol": symbol}).to_string(),
            json!({"event": "subscribe", "channel": "trades", "symbol": symbol}).to_string(),
        ]
    }

    fn ping_msgs(&self, state: &TranslationState) -> Vec<String> {
        let TranslationState::Bitfinex {
            book_cid,
            trades_cid,
        } = state
        else {
            return Vec::new();
        };
        let mut frames = Vec::new();
        if let Some(cid) = book_cid {
            frames.push(json!({"event": "ping", "cid": cid}).to_string());
        }
        if let Some(cid) = trades_cid {
            frames.push(json!({"event": "ping", "cid": cid}).to_string());
        }
        frames
    }

    fn translate(
        &self,
        msg: &Value,
        state: TranslationState,
    ) -> Result<(Vec<Instruction>, TranslationState)> {
        let TranslationState::Bitfinex {
            mut book_cid,
            mut trades_cid,
        } = state
        else {
            return Err(Error::Decode("bitfinex translator fed foreign state".into()));
        };

        let noop = |book_cid, trades_cid| {
            (
                vec![Instruction::NoOp],
                TranslationState::Bitfinex {
                    book_cid,
                    trades_cid,
                },
            )
        };

        if let Some(arr) = msg.as_array() {
            // Heartbeat: [chan, "hb"]
            if arr.len() == 2 && arr[1].as_str() == Some("hb") {
                return Ok(noop(book_cid, trades_cid));
            }

            match arr.len() {
                // [chan_id, data]: book delta/snapshot, or a trades summary
                // (which carries no new prints).
                2 => {
                    let chan = arr[0]
                        .as_i64()
                        .ok_or_else(|| Error::Decode(format!("channel id not an integer: {}", arr[0])))?;
                    if Some(chan) == book_cid {
                        let data = arr[1]
                            .as_array()
                            .ok_or_else(|| Error::Decode(format!("book payload not an array: {}", arr[1])))?;
                        let instruction = if data.is_empty()
                            || data.first().map_or(false, Value::is_array)
                        {
                            snapshot_from_rows(data)?
                        } else {
                            Instruction::Deltas(vec![delta_from_row(data)?])
                        };
                        return Ok((
                            vec![instruction],
                            TranslationState::Bitfinex {
                                book_cid,
                                trades_cid,
                            },
                        ));
                    }
                    Ok(noop(book_cid, trades_cid))
                }
                // [chan_id, "te"|"tu", data]: a single print. Only valid on
                // the trades channel; the book channel never uses this
                // shape, so reject it rather than silently pattern-fail.
                3 => {
                    let chan = arr[0]
                        .as_i64()
                        .ok_or_else(|| Error::Decode(format!("channel id not an integer: {}", arr[0])))?;
                    if Some(chan) == trades_cid {
                        let data = arr[2]
                            .as_array()
                            .ok_or_else(|| Error::Decode(format!("trade payload not an array: {}", arr[2])))?;
                        let instruction = trade_from_row(data)?;
                        return Ok((
                            vec![instruction],
                            TranslationState::Bitfinex {
                                book_cid,
                                trades_cid,
                            },
                        ));
                    }
                    if Some(chan) == book_cid {
                        return Err(Error::Decode(
                            "book update arrived in trade-shaped frame".into(),
                        ));
                    }
                    Ok(noop(book_cid, trades_cid))
                }
                _ => Ok(noop(book_cid, trades_cid)),
            }
        } else if let Some(event) = msg.get("event").and_then(Value::as_str) {
            match event {
                "info" | "conf" | "pong" => Ok(noop(book_cid, trades_cid)),
                "subscribed" => {
                    let chan_id = msg
                        .get("chanId")
                        .and_then(Value::as_i64)
                        .ok_or_else(|| Error::Decode("subscribed event without chanId".into()))?;
                    match msg.get("channel").and_then(Value::as_str) {
                        Some("book") => book_cid = Some(chan_id),
                        Some("trades") => trades_cid = Some(chan_id),
                        _ => {}
                    }
                    Ok(noop(book_cid, trades_cid))
                }
                _ => Ok(noop(book_cid, trades_cid)),
            }
        } else {
            Ok(noop(book_cid, trades_cid))
        }
    }
}
