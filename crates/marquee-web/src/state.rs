use chrono::Utc;
use marquee::{RawPoint, Row, RowKey};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const FEED_CAP: usize = 500;
const TABLE_ROWS: usize = 10;
const FEED_STEP_MILLIS: i64 = 600_000; // upstream recomputes every ~10 minutes

/// In-memory simulated market: one price/volume feed plus recent-trade and
/// recent-request row sets per asset. Stands in for the real exchange state
/// the production endpoints would serve.
pub struct MarketState {
    rng: StdRng,
    assets: HashMap<String, AssetBook>,
}

pub struct AssetBook {
    pub feed: Vec<RawPoint>,
    pub trades: Vec<Row>,
    pub requests: Vec<Row>,
    next_key: i64,
}

impl MarketState {
    pub fn seed(names: &[String]) -> Self {
        let mut rng = StdRng::from_entropy();
        let assets = names
            .iter()
            .map(|name| (name.clone(), AssetBook::seed(&mut rng)))
            .collect();
        MarketState { rng, assets }
    }

    pub fn asset(&self, name: &str) -> Option<&AssetBook> {
        self.assets.get(name)
    }

    /// One simulation step: drift every price, append a feed point, rotate
    /// the trade and request rows.
    pub fn advance(&mut self) {
        for book in self.assets.values_mut() {
            book.advance(&mut self.rng);
        }
    }
}

impl AssetBook {
    fn seed(rng: &mut StdRng) -> Self {
        let mut book = AssetBook {
            feed: Vec::new(),
            trades: Vec::new(),
            requests: Vec::new(),
            next_key: 1,
        };

        let now = Utc::now().timestamp_millis();
        let mut price = rng.gen_range(5.0..50.0);
        for i in 0..48 {
            price = drift(rng, price);
            let stamp = now - (48 - i) * FEED_STEP_MILLIS;
            book.feed
                .push(RawPoint::with_volume(stamp, round4(price), volume(rng)));
        }
        for _ in 0..TABLE_ROWS {
            book.push_trade(rng);
            book.push_request(rng);
        }
        book
    }

    fn advance(&mut self, rng: &mut StdRng) {
        let last = self.feed.last().map(|p| p.price).unwrap_or(10.0);
        self.feed.push(RawPoint::with_volume(
            Utc::now().timestamp_millis(),
            round4(drift(rng, last)),
            volume(rng),
        ));
        if self.feed.len() > FEED_CAP {
            self.feed.remove(0);
        }

        // newest rows enter at the top; older unconfirmed rows confirm over
        // time and the oldest fall off
        self.push_trade(rng);
        self.push_request(rng);
        for row in self.trades.iter_mut().chain(self.requests.iter_mut()).skip(1) {
            if !row.confirmed && rng.gen_bool(0.5) {
                row.confirmed = true;
            }
        }
        self.trades.truncate(TABLE_ROWS);
        self.requests.truncate(TABLE_ROWS);
    }

    fn push_trade(&mut self, rng: &mut StdRng) {
        let side = if rng.gen_bool(0.5) { "Buy" } else { "Sell" };
        let unit_price = self.feed.last().map(|p| p.price).unwrap_or(10.0);
        let amount: u32 = rng.gen_range(1..40);
        let content = vec![
            stamp_text(),
            side.to_string(),
            format!("{unit_price:.4}"),
            amount.to_string(),
            format!("{:.4}", unit_price * amount as f64),
        ];
        let row = Row {
            row_key: self.take_key(),
            confirmed: false,
            content,
        };
        self.trades.insert(0, row);
    }

    fn push_request(&mut self, rng: &mut StdRng) {
        let ok = rng.gen_bool(0.9);
        let content = vec![
            stamp_text(),
            format!("{:016x}{:016x}", rng.gen::<u64>(), rng.gen::<u64>()),
            format!("1{:032x}", rng.gen::<u128>()),
            if ok { "OK" } else { "Error" }.to_string(),
        ];
        let row = Row {
            row_key: self.take_key(),
            confirmed: false,
            content,
        };
        self.requests.insert(0, row);
    }

    fn take_key(&mut self) -> RowKey {
        let key = self.next_key;
        self.next_key += 1;
        RowKey::Num(key)
    }
}

fn drift(rng: &mut StdRng, price: f64) -> f64 {
    (price * (1.0 + rng.gen_range(-0.02..0.02))).max(0.01)
}

fn volume(rng: &mut StdRng) -> f64 {
    rng.gen_range(0.0_f64..200.0).round()
}

fn round4(price: f64) -> f64 {
    (price * 10_000.0).round() / 10_000.0
}

fn stamp_text() -> String {
    Utc::now().format("%a, %d-%b-%Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MarketState {
        MarketState::seed(&["BTC".to_string()])
    }

    #[test]
    fn seeded_books_are_populated() {
        let state = state();
        let book = state.asset("BTC").unwrap();
        assert_eq!(book.feed.len(), 48);
        assert_eq!(book.trades.len(), TABLE_ROWS);
        assert_eq!(book.requests.len(), TABLE_ROWS);
        assert!(book.feed.iter().all(|p| p.volume.is_some()));
    }

    #[test]
    fn row_keys_stay_unique_across_steps() {
        let mut state = state();
        for _ in 0..20 {
            state.advance();
        }
        let book = state.asset("BTC").unwrap();
        assert_eq!(book.trades.len(), TABLE_ROWS);

        let mut keys: Vec<_> = book
            .trades
            .iter()
            .chain(book.requests.iter())
            .map(|r| r.row_key.clone())
            .collect();
        let total = keys.len();
        keys.sort_by_key(|k| format!("{k:?}"));
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn feed_is_ordered_and_capped() {
        let mut state = state();
        for _ in 0..600 {
            state.advance();
        }
        let book = state.asset("BTC").unwrap();
        assert!(book.feed.len() <= FEED_CAP);
        assert!(book.feed.windows(2).all(|w| w[0].stamp <= w[1].stamp));
    }
}
