//! In-memory L2 order-book mirror.
//!
//! One `BTreeMap` per side keyed by price. Bids iterate highest-first,
//! asks lowest-first. A level with size <= 0 is never stored; such a
//! delta is a deletion. Crossed books (best bid >= best ask) are a venue
//! inconsistency we mirror observably rather than reject.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::types::{PriceLevel, Side};

/// Two ordered sides of one market. Pure data, no I/O.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    bids: BTreeMap<Decimal, Decimal>, // price -> size
    asks: BTreeMap<Decimal, Decimal>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered bid levels, best (highest price) first.
    pub fn bids(&self) -> Vec<PriceLevel> {
        self.bids
            .iter()
            .rev()
            .map(|(p, s)| PriceLevel { price: *p, size: *s })
            .collect()
    }

    /// Ordered ask levels, best (lowest price) first.
    pub fn asks(&self) -> Vec<PriceLevel> {
        self.asks
            .iter()
            .map(|(p, s)| PriceLevel { price: *p, size: *s })
            .collect()
    }

    /// Both sides as one pair.
    pub fn book(&self) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        (self.bids(), self.asks())
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids
            .iter()
            .next_back()
            .map(|(p, s)| PriceLevel { price: *p, size: *s })
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks
            .iter()
            .next()
            .map(|(p, s)| PriceLevel { price: *p, size: *s })
    }

    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Apply one incremental update. size <= 0 removes the level; removing
    /// an absent price is a no-op.
    pub fn apply_delta(&mut self, side: Side, price: Decimal, size: Decimal) {
        let levels = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        if size <= Decimal::ZERO {
            levels.remove(&price);
        } else {
            levels.insert(price, size);
        }
    }

    /// Atomically replace both sides. Input need not be sorted; duplicate
    /// prices collapse last-write-wins; size <= 0 entries are dropped.
    pub fn apply_snapshot(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) {
        self.bids.clear();
        self.asks.clear();
        for level in bids {
            if level.size > Decimal::ZERO {
                self.bids.insert(level.price, level.size);
            }
        }
        for level in asks {
            if level.size > Decimal::ZERO {
                self.asks.insert(level.price, level.size);
            }
        }
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}

/// Clone-able handle to a book shared between one writing session and any
/// number of readers. A single lock guards both sides, so `book()` never
/// returns a pair torn across a concurrent delta.
#[derive(Debug, Clone, Default)]
pub struct SharedBook {
    inner: Arc<RwLock<OrderBook>>,
}

impl SharedBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bids(&self) -> Vec<PriceLevel> {
        self.inner.read().bids()
    }

    pub fn asks(&self) -> Vec<PriceLevel> {
        self.inner.read().asks()
    }

    pub fn book(&self) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        self.inner.read().book()
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.inner.read().best_bid()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.inner.read().best_ask()
    }

    pub fn spread(&self) -> Option<Decimal> {
        self.inner.read().spread()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn apply_delta(&self, side: Side, price: Decimal, size: Decimal) {
        self.inner.write().apply_delta(side, price, size);
    }

    pub fn apply_snapshot(&self, bids: &[PriceLevel], asks: &[PriceLevel]) {
        self.inner.write().apply_snapshot(bids, asks);
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, size: Decimal) -> PriceLevel {
        PriceLevel { price, size }
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut once = OrderBook::new();
        once.apply_delta(Side::Bid, dec!(100), dec!(2));
        once.apply_delta(Side::Bid, dec!(100), dec!(0));

        let mut twice = OrderBook::new();
        twice.apply_delta(Side::Bid, dec!(100), dec!(2));
        twice.apply_delta(Side::Bid, dec!(100), dec!(0));
        twice.apply_delta(Side::Bid, dec!(100), dec!(0));

        assert_eq!(once, twice);
        assert!(once.is_empty());
    }

    #[test]
    fn test_delete_missing_price_is_noop() {
        let mut book = OrderBook::new();
        book.apply_delta(Side::Ask, dec!(101), dec!(1.5));
        book.apply_delta(Side::Ask, dec!(999), dec!(0));
        assert_eq!(book.asks(), vec![level(dec!(101), dec!(1.5))]);
    }

    #[test]
    fn test_insert_last_write_wins() {
        let mut book = OrderBook::new();
        book.apply_delta(Side::Bid, dec!(100), dec!(2));
        book.apply_delta(Side::Bid, dec!(100), dec!(0));
        book.apply_delta(Side::Bid, dec!(100), dec!(7.25));
        assert_eq!(book.bids(), vec![level(dec!(100), dec!(7.25))]);
    }

    #[test]
    fn test_snapshot_replaces_prior_state() {
        let mut book = OrderBook::new();
        book.apply_delta(Side::Bid, dec!(42), dec!(1));
        book.apply_delta(Side::Ask, dec!(43), dec!(1));

        // Unsorted input with a duplicate price: last write wins.
        book.apply_snapshot(
            &[
                level(dec!(99), dec!(1.5)),
                level(dec!(100), dec!(2)),
                level(dec!(99), dec!(3)),
            ],
            &[level(dec!(102), dec!(4)), level(dec!(101), dec!(3))],
        );

        assert_eq!(
            book.bids(),
            vec![level(dec!(100), dec!(2)), level(dec!(99), dec!(3))]
        );
        assert_eq!(
            book.asks(),
            vec![level(dec!(101), dec!(3)), level(dec!(102), dec!(4))]
        );
    }

    #[test]
    fn test_ordering_and_positive_sizes() {
        let mut book = OrderBook::new();
        for (p, s) in [(dec!(10), dec!(1)), (dec!(12), dec!(2)), (dec!(11), dec!(3))] {
            book.apply_delta(Side::Bid, p, s);
            book.apply_delta(Side::Ask, p + dec!(10), s);
        }

        let bids = book.bids();
        assert!(bids.windows(2).all(|w| w[0].price > w[1].price));
        let asks = book.asks();
        assert!(asks.windows(2).all(|w| w[0].price < w[1].price));
        assert!(bids.iter().chain(&asks).all(|l| l.size > Decimal::ZERO));
    }

    #[test]
    fn test_extremum_matches_head() {
        let mut book = OrderBook::new();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);

        book.apply_delta(Side::Bid, dec!(9), dec!(1));
        book.apply_delta(Side::Bid, dec!(10), dec!(2));
        book.apply_delta(Side::Ask, dec!(11), dec!(3));
        book.apply_delta(Side::Ask, dec!(12), dec!(4));

        assert_eq!(book.best_bid(), book.bids().first().copied());
        assert_eq!(book.best_ask(), book.asks().first().copied());
        assert_eq!(book.spread(), Some(dec!(1)));
    }

    #[test]
    fn test_shared_book_returns_consistent_pair() {
        let shared = SharedBook::new();
        shared.apply_snapshot(
            &[level(dec!(100), dec!(1))],
            &[level(dec!(101), dec!(1))],
        );
        let (bids, asks) = shared.book();
        assert_eq!(bids.len(), 1);
        assert_eq!(asks.len(), 1);

        shared.clear();
        assert!(shared.is_empty());
    }
}
