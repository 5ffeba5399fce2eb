//! Per-market session state machine.
//!
//! Owns one venue connection: subscribe on open, translate inbound
//! frames, apply the results to the shared book, forward prints to the
//! sink, reconnect with exponential backoff on any failure. The book and
//! the translation state are discarded before every reconnect, so
//! consumers must treat the book as empty until the next snapshot lands.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::core::traits::{EventSink, Translator};
use crate::core::types::{Instruction, Market};
use crate::core::{Error, Result};
use crate::orderbook::SharedBook;
use crate::translate::{translator_for, TranslationState};

const PING_INTERVAL: Duration = Duration::from_secs(20);

/// Exponential reconnect backoff: 1s doubling to a 32s cap, reset once a
/// connection reaches streaming.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    cap: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self {
            initial,
            cap,
            current: initial,
        }
    }

    /// Delay before the next attempt; doubles up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.cap);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(32))
    }
}

/// How one connection attempt ended.
enum Exit {
    /// Shutdown was requested; leave the reconnect loop.
    Shutdown,
    /// The venue closed the stream or it ran dry; reconnect.
    Disconnected,
}

pub struct MarketSession {
    market: Market,
    tag: String,
    translator: Box<dyn Translator>,
    state: TranslationState,
    book: SharedBook,
    sink: Arc<dyn EventSink>,
    /// Set once the first frame translates cleanly; gates the ping timer
    /// and earns a backoff reset for the connection.
    streaming: bool,
}

impl MarketSession {
    pub fn new(market: Market, book: SharedBook, sink: Arc<dyn EventSink>) -> Self {
        let translator = translator_for(market.venue);
        let state = translator.initial_state();
        let tag = market.tag();
        Self {
            market,
            tag,
            translator,
            state,
            book,
            sink,
            streaming: false,
        }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    /// Whether the mirror is currently trusted to reflect the venue.
    pub fn is_synchronised(&self) -> bool {
        self.translator.is_synchronised(&self.state)
    }

    /// Drop all connection-scoped state: empty book, fresh translation
    /// state. Runs on entry to the disconnected state, so downstream
    /// readers see an empty book until the next snapshot.
    fn reset(&mut self) {
        self.book.clear();
        self.state = self.translator.initial_state();
        self.streaming = false;
    }

    /// Entry into the disconnected state, the instant a connection drops:
    /// earn the backoff reset if this connection reached streaming, then
    /// discard all connection-scoped state. Readers polling the book
    /// during the backoff window see it empty, never stale levels.
    fn enter_disconnected(&mut self, backoff: &mut Backoff) {
        if self.streaming {
            backoff.reset();
        }
        self.reset();
    }

    /// Decode one inbound text frame, translate it, apply the results.
    async fn process_frame(&mut self, text: &str) -> Result<()> {
        let msg: serde_json::Value = serde_json::from_str(text)?;
        let (instructions, next) = self.translator.translate(&msg, self.state.clone())?;
        self.state = next;
        self.streaming = true;
        for instruction in instructions {
            self.apply(instruction).await?;
        }
        Ok(())
    }

    async fn apply(&mut self, instruction: Instruction) -> Result<()> {
        match instruction {
            Instruction::NoOp => {}
            Instruction::Snapshot { bids, asks } => {
                self.book.apply_snapshot(&bids, &asks);
                self.sink.append_snapshot(&self.tag, &bids, &asks).await?;
            }
            Instruction::Deltas(deltas) => {
                for delta in deltas {
                    self.book.apply_delta(delta.side, delta.price, delta.size);
                }
            }
            Instruction::Buys(trades) | Instruction::Sells(trades) => {
                self.sink.append_trades(&self.tag, &trades).await?;
            }
        }
        Ok(())
    }

    /// One connection lifetime: connect, subscribe, stream until failure,
    /// close, or shutdown.
    async fn stream_once(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<Exit> {
        let (ws, _) = connect_async(self.market.ws_url.as_str()).await?;
        info!(market = %self.tag, "connected");
        let (mut write, mut read) = ws.split();

        for frame in self
            .translator
            .subscribe_msgs(&self.market.base, &self.market.quote)
        {
            write.send(Message::Text(frame)).await?;
        }

        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.tick().await; // the first tick completes immediately

        loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.process_frame(&text).await?,
                    Some(Ok(Message::Ping(payload))) => write.send(Message::Pong(payload)).await?,
                    Some(Ok(Message::Close(_))) => {
                        info!(market = %self.tag, "venue closed the stream");
                        return Ok(Exit::Disconnected);
                    }
                    Some(Ok(_)) => {} // binary and pong frames carry nothing for us
                    Some(Err(e)) => return Err(Error::Transport(e.to_string())),
                    None => return Ok(Exit::Disconnected),
                },
                _ = ping.tick() => {
                    if self.market.ping_required && self.streaming {
                        for frame in self.translator.ping_msgs(&self.state) {
                            write.send(Message::Text(frame)).await?;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    // Best-effort close; the venue sees a clean goodbye.
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(Exit::Shutdown);
                }
            }
        }
    }

    /// Drive the session until shutdown. Returns early only when a sink
    /// refuses an event; every transport or decode failure reconnects.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut backoff = Backoff::default();
        info!(market = %self.tag, url = %self.market.ws_url, "market started");
        self.reset();

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.stream_once(&mut shutdown).await {
                Ok(Exit::Shutdown) => break,
                Ok(Exit::Disconnected) => self.enter_disconnected(&mut backoff),
                Err(e @ Error::Sink(_)) => {
                    warn!(market = %self.tag, error = %e, "sink refused event; stopping market");
                    return Err(e);
                }
                Err(e) => {
                    warn!(market = %self.tag, error = %e, "session error");
                    self.enter_disconnected(&mut backoff);
                }
            }

            let delay = backoff.next_delay();
            debug!(market = %self.tag, ?delay, "reconnecting after backoff");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!(market = %self.tag, "market stopped");
        Ok(())
    }
}
