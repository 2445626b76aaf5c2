//! Many threads trading through one engine

mod common;

use common::*;
use matching_engine::MatchingEngine;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use types::account::SeedBalance;
use types::ids::OrderId;

const THREADS: usize = 8;
const ORDERS_PER_THREAD: usize = 40;

fn seed() -> Vec<SeedBalance> {
    (0..THREADS)
        .flat_map(|t| {
            let user = format!("U{}", t);
            [
                SeedBalance::new(user.clone(), "X", Decimal::from(50)),
                SeedBalance::new(user, "USD", Decimal::from(5_000)),
            ]
        })
        .collect()
}

fn run_traders(engine: &Arc<MatchingEngine>) {
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let engine = Arc::clone(engine);
            thread::spawn(move || {
                let user = format!("U{}", t);
                for i in 0..ORDERS_PER_THREAD {
                    let id = format!("{}-{}", user, i);
                    // Prices straddle 100 so bids and asks keep crossing
                    let price = (95 + (t * 7 + i * 3) % 11).to_string();
                    let qty = (1 + (t + i) % 4).to_string();
                    let order = if (t + i) % 2 == 0 {
                        buy(&id, &user, &price, &qty)
                    } else {
                        sell(&id, &user, &price, &qty)
                    };
                    engine.place_order(order).unwrap();

                    if i % 9 == 0 {
                        // The order may already be gone
                        let _ = engine.cancel_order(&OrderId::new(id));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_trading_conserves_assets() {
    let tmp = TempDir::new().unwrap();
    let engine = Arc::new(start(tmp.path(), &seed()));
    let before = engine.total_balances();

    run_traders(&engine);

    assert_eq!(engine.total_balances(), before);
    for t in 0..THREADS {
        let user = format!("U{}", t);
        assert!(engine.get_balance(&user, "X").0 >= Decimal::ZERO);
        assert!(engine.get_balance(&user, "USD").0 >= Decimal::ZERO);
    }
}

#[test]
fn test_book_uncrossed_after_concurrent_trading() {
    let tmp = TempDir::new().unwrap();
    let engine = Arc::new(start(tmp.path(), &seed()));

    run_traders(&engine);

    if let (Some((bid, _)), Some((ask, _))) = (engine.best_bid(), engine.best_ask()) {
        assert!(bid < ask, "book left crossed: bid {} >= ask {}", bid, ask);
    }
    let book = engine.get_orders();
    for view in book.bids.iter().chain(book.asks.iter()) {
        assert_eq!(view.filled_quantity + view.remaining_quantity, view.quantity);
    }
}

#[test]
fn test_concurrent_session_replays_to_same_digest() {
    let tmp = TempDir::new().unwrap();
    let digest = {
        let engine = Arc::new(start(tmp.path(), &seed()));
        run_traders(&engine);
        engine.shutdown().unwrap();
        engine.state_digest()
    };

    let replayed = start(tmp.path(), &seed());
    assert_eq!(replayed.state_digest(), digest);
}

#[test]
fn test_readers_run_alongside_writers() {
    let tmp = TempDir::new().unwrap();
    let engine = Arc::new(start(tmp.path(), &seed()));
    let totals = engine.total_balances();

    let reader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..200 {
                let book = engine.get_orders();
                if let (Some(bid), Some(ask)) = (book.bids.first(), book.asks.first()) {
                    assert!(bid.price < ask.price);
                }
                let _ = engine.depth(5);
                let _ = engine.get_balance("U0", "USD");
            }
        })
    };

    run_traders(&engine);
    reader.join().unwrap();
    assert_eq!(engine.total_balances(), totals);
}
