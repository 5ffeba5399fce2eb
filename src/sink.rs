//! EventSink implementations shipped with the core.
//!
//! Real persistence (timeseries writers, candle aggregators) lives in
//! collaborator crates behind the same trait.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::core::traits::EventSink;
use crate::core::types::{PriceLevel, Trade};
use crate::core::Result;

/// Default sink for the binary: logs prints and snapshot applications.
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn append_trades(&self, market_tag: &str, trades: &[Trade]) -> Result<()> {
        for trade in trades {
            debug!(
                market = market_tag,
                side = %trade.side,
                price = %trade.price,
                size = %trade.size,
                ts = %trade.timestamp,
                "trade"
            );
        }
        Ok(())
    }

    async fn append_snapshot(
        &self,
        market_tag: &str,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
    ) -> Result<()> {
        debug!(
            market = market_tag,
            bids = bids.len(),
            asks = asks.len(),
            "snapshot applied"
        );
        Ok(())
    }
}

/// Buffering sink that records everything it receives. Used in tests and
/// handy for integration harnesses.
#[derive(Default)]
pub struct RecordingSink {
    trades: Mutex<Vec<(String, Vec<Trade>)>>,
    snapshots: Mutex<Vec<(String, Vec<PriceLevel>, Vec<PriceLevel>)>>,
}

impl RecordingSink {
    pub fn trades(&self) -> Vec<(String, Vec<Trade>)> {
        self.trades.lock().clone()
    }

    pub fn snapshots(&self) -> Vec<(String, Vec<PriceLevel>, Vec<PriceLevel>)> {
        self.snapshots.lock().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn append_trades(&self, market_tag: &str, trades: &[Trade]) -> Result<()> {
        self.trades
            .lock()
            .push((market_tag.to_string(), trades.to_vec()));
        Ok(())
    }

    async fn append_snapshot(
        &self,
        market_tag: &str,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
    ) -> Result<()> {
        self.snapshots
            .lock()
            .push((market_tag.to_string(), bids.to_vec(), asks.to_vec()));
        Ok(())
    }
}
