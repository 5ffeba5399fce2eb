//! Core traits - the per-venue strategy and collaborator seams

use async_trait::async_trait;
use serde_json::Value;

use crate::core::types::{Instruction, PriceLevel, Trade};
use crate::core::Result;
use crate::translate::TranslationState;

/// Per-venue translation strategy.
///
/// Implementations are pure values: `translate` performs no I/O and
/// mutates nothing outside the returned state. Unknown or uninteresting
/// messages yield `[NoOp]` with the state passed through unchanged.
pub trait Translator: Send + Sync {
    /// Starting translation state for a fresh connection.
    fn initial_state(&self) -> TranslationState;

    /// One-time frames to send right after the transport opens.
    fn subscribe_msgs(&self, base: &str, quote: &str) -> Vec<String>;

    /// Keepalive frames for the ping timer. May be empty, e.g. before the
    /// venue has confirmed a subscription.
    fn ping_msgs(&self, state: &TranslationState) -> Vec<String>;

    /// Whether the local mirror is trusted to reflect the venue's state.
    /// Conservatively `true` today; venues with sequence numbers can
    /// override this once gap detection exists.
    fn is_synchronised(&self, _state: &TranslationState) -> bool {
        true
    }

    /// Consume one decoded frame, produce zero or more instructions and
    /// the next translation state.
    fn translate(
        &self,
        msg: &Value,
        state: TranslationState,
    ) -> Result<(Vec<Instruction>, TranslationState)>;
}

/// Downstream consumer of normalized events. The core hands events over
/// exactly once and never retries; persistence and analytics live behind
/// this seam.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Forward market prints for one market.
    async fn append_trades(&self, market_tag: &str, trades: &[Trade]) -> Result<()>;

    /// Observe a full book replacement that was just applied to the mirror.
    async fn append_snapshot(
        &self,
        market_tag: &str,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
    ) -> Result<()>;
}
