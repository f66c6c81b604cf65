//! Brokerage Core Simulation.
//!
//! Demonstrates the settlement engine lifecycle: manual settlement,
//! conditional orders riding the periodic sweep, settlement failures turning
//! into cancellations, and the ledger invariants holding throughout.

use brokerage_core::*;
use rust_decimal_macros::dec;

type SimEngine = Engine<QuoteBoard, RecordingNotifier>;

fn new_engine() -> SimEngine {
    Engine::new(
        EngineConfig::default(),
        QuoteBoard::new(),
        RecordingNotifier::new(),
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("Brokerage Core Settlement Engine Simulation");
    println!("One Ledger, Atomic Settlement, 60s Conditional Sweep\n");

    scenario_1_manual_round_trip();
    scenario_2_rejected_requests();
    scenario_3_conditional_sweep();
    scenario_4_drained_balance_cancel();
    scenario_5_price_feed_outage();
    scenario_6_supply_and_cancellation();
    scenario_7_many_traders();

    println!("\nAll simulations completed successfully.");
}

/// Manual buy and sell settling synchronously at the quote.
fn scenario_1_manual_round_trip() {
    println!("Scenario 1: Manual Round Trip\n");

    let mut engine = new_engine();
    let acme = engine.list_stock("ACME", "Acme Corp", 1_000);
    let alice = engine.register_user("alice");

    engine.deposit(alice, Cash::new(dec!(10_000))).unwrap();
    engine
        .update_quote(acme, price(dec!(99)), price(dec!(101)))
        .unwrap();

    let listed = engine.stock_by_symbol("acme").expect("ACME is listed");
    println!(
        "  Listed {} ({}) with {} shares",
        listed.symbol,
        listed.name,
        engine.available_quantity(acme).unwrap()
    );
    println!("  Alice deposits $10,000; ACME quoted 99 bid / 101 ask");

    let buy = engine
        .create_order(NewOrder::manual(
            alice,
            acme,
            Quantity::new(20).unwrap(),
            Side::Buy,
        ))
        .unwrap();
    println!(
        "  BUY 20 ACME settled at ${} for ${}, status {}",
        buy.closing_price().unwrap(),
        buy.quantity.notional(buy.closing_price().unwrap()),
        buy.status()
    );

    engine
        .update_quote(acme, price(dec!(108)), price(dec!(110)))
        .unwrap();
    println!("  ACME rallies to 108 bid / 110 ask");

    let sell = engine
        .create_order(NewOrder::manual(
            alice,
            acme,
            Quantity::new(20).unwrap(),
            Side::Sell,
        ))
        .unwrap();
    println!("  SELL 20 ACME settled at ${}", sell.closing_price().unwrap());

    println!(
        "  Final balance ${}, holdings {:?}, supply {}",
        engine.balance_of(alice).unwrap(),
        engine.holdings_of(alice),
        engine.available_quantity(acme).unwrap()
    );
    println!(
        "  Notifications delivered: {}\n",
        engine.notifier().len()
    );
}

/// Requests the boundary rejects before any order exists.
fn scenario_2_rejected_requests() {
    println!("Scenario 2: Rejected Requests\n");

    let mut engine = new_engine();
    let acme = engine.list_stock("ACME", "Acme Corp", 1_000);
    let bob = engine.register_user("bob");
    engine.deposit(bob, Cash::new(dec!(100))).unwrap();
    engine
        .update_quote(acme, price(dec!(49)), price(dec!(50)))
        .unwrap();

    let bad_side = OrderRequest {
        user_id: bob.0,
        stock_id: acme.0,
        quantity: 1,
        side: "hold".to_string(),
        kind: None,
        price_limit: None,
        manual: true,
    };
    println!("  side=\"hold\": {}", engine.submit_order(bad_side).unwrap_err());

    let missing_limit = OrderRequest {
        user_id: bob.0,
        stock_id: acme.0,
        quantity: 1,
        side: "buy".to_string(),
        kind: Some("long".to_string()),
        price_limit: None,
        manual: false,
    };
    println!(
        "  conditional without limit: {}",
        engine.submit_order(missing_limit).unwrap_err()
    );

    // 3 shares at the $50 ask needs $150, Bob has $100.
    let too_big = NewOrder::manual(bob, acme, Quantity::new(3).unwrap(), Side::Buy);
    println!("  unaffordable buy: {}", engine.create_order(too_big).unwrap_err());

    // Bob owns nothing to sell.
    let uncovered = NewOrder::manual(bob, acme, Quantity::new(1).unwrap(), Side::Sell);
    println!("  uncovered sell: {}", engine.create_order(uncovered).unwrap_err());

    println!(
        "  Orders on the books after all rejections: {}\n",
        engine.orders_for(bob).len()
    );
}

/// Conditional orders waiting on their triggers across sweep passes.
fn scenario_3_conditional_sweep() {
    println!("Scenario 3: Conditional Orders and the Sweep\n");

    let mut engine = new_engine();
    let acme = engine.list_stock("ACME", "Acme Corp", 1_000);
    let carol = engine.register_user("carol");
    engine.deposit(carol, Cash::new(dec!(10_000))).unwrap();
    engine
        .update_quote(acme, price(dec!(99)), price(dec!(100)))
        .unwrap();

    // Buy the dip at 90, take profit above 115.
    let dip_buy = engine
        .create_order(NewOrder::conditional(
            carol,
            acme,
            Quantity::new(10).unwrap(),
            Side::Buy,
            TriggerKind::Long,
            price(dec!(90)),
        ))
        .unwrap();
    println!("  Placed conditional BUY 10 @ limit 90 (long trigger)");

    let path = [
        (dec!(97), dec!(98)),
        (dec!(92), dec!(93)),
        (dec!(89), dec!(90)),
    ];
    for (bid, ask) in path {
        engine.advance_time(60_000);
        engine.update_quote(acme, price(bid), price(ask)).unwrap();
        let report = engine.poll_sweep().expect("interval elapsed");
        println!(
            "  t+{}s ask={} -> evaluated {}, closed {:?}",
            engine.time().as_millis() / 1000,
            ask,
            report.evaluated,
            report.closed
        );
    }

    let settled = engine.order(dip_buy.id).unwrap();
    println!(
        "  Order {} is {} at ${}",
        settled.id,
        settled.status(),
        settled.closing_price().unwrap()
    );

    // Now a short trigger riding the rally back up.
    let rally_sell = engine
        .create_order(NewOrder::conditional(
            carol,
            acme,
            Quantity::new(10).unwrap(),
            Side::Sell,
            TriggerKind::Short,
            price(dec!(115)),
        ))
        .unwrap();
    println!("  Placed conditional SELL 10 @ limit 115 (short trigger)");

    for (bid, ask) in [(dec!(105), dec!(106)), (dec!(116), dec!(117))] {
        engine.advance_time(60_000);
        engine.update_quote(acme, price(bid), price(ask)).unwrap();
        let report = engine.poll_sweep().expect("interval elapsed");
        println!(
            "  t+{}s bid={} -> closed {:?}",
            engine.time().as_millis() / 1000,
            bid,
            report.closed
        );
    }

    let settled = engine.order(rally_sell.id).unwrap();
    println!(
        "  Order {} is {} at ${}; balance ${}\n",
        settled.id,
        settled.status(),
        settled.closing_price().unwrap(),
        engine.balance_of(carol).unwrap()
    );
}

/// A conditional order whose funding disappears before the trigger fires.
fn scenario_4_drained_balance_cancel() {
    println!("Scenario 4: Drained Balance Cancels at Settlement\n");

    let mut engine = new_engine();
    let acme = engine.list_stock("ACME", "Acme Corp", 1_000);
    let dave = engine.register_user("dave");
    engine.deposit(dave, Cash::new(dec!(1_000))).unwrap();
    engine
        .update_quote(acme, price(dec!(99)), price(dec!(100)))
        .unwrap();

    let order = engine
        .create_order(NewOrder::conditional(
            dave,
            acme,
            Quantity::new(10).unwrap(),
            Side::Buy,
            TriggerKind::Long,
            price(dec!(95)),
        ))
        .unwrap();
    println!("  Conditional BUY 10 @ limit 95 accepted (affordable today)");

    engine.withdraw(dave, Cash::new(dec!(900))).unwrap();
    println!("  Dave withdraws $900, leaving $100");

    engine.advance_time(60_000);
    engine
        .update_quote(acme, price(dec!(94)), price(dec!(95)))
        .unwrap();
    let report = engine.poll_sweep().expect("interval elapsed");
    println!(
        "  Trigger fires; sweep canceled {:?}, closed {:?}",
        report.canceled, report.closed
    );

    let canceled = engine.order(order.id).unwrap();
    println!(
        "  Order {} is {}, closing price {:?}, balance still ${}",
        canceled.id,
        canceled.status(),
        canceled.closing_price(),
        engine.balance_of(dave).unwrap()
    );
    println!(
        "  Last notice status: {:?}\n",
        engine.notifier().last().map(|n| n.status)
    );
}

/// Missing quotes never cancel an order, they only postpone it.
fn scenario_5_price_feed_outage() {
    println!("Scenario 5: Price Feed Outage\n");

    let mut engine = new_engine();
    let acme = engine.list_stock("ACME", "Acme Corp", 1_000);
    let erin = engine.register_user("erin");
    engine.deposit(erin, Cash::new(dec!(5_000))).unwrap();
    engine
        .update_quote(acme, price(dec!(99)), price(dec!(100)))
        .unwrap();

    let order = engine
        .create_order(NewOrder::conditional(
            erin,
            acme,
            Quantity::new(5).unwrap(),
            Side::Buy,
            TriggerKind::Long,
            price(dec!(98)),
        ))
        .unwrap();

    engine.oracle_mut().remove(acme);
    println!("  Quote feed goes dark");

    engine.advance_time(60_000);
    let report = engine.poll_sweep().expect("interval elapsed");
    println!(
        "  Sweep with no quote: evaluated {}, skipped {}, order still {}",
        report.evaluated,
        report.skipped,
        engine.order(order.id).unwrap().status()
    );

    engine.advance_time(60_000);
    engine
        .update_quote(acme, price(dec!(96)), price(dec!(97)))
        .unwrap();
    let report = engine.poll_sweep().expect("interval elapsed");
    println!(
        "  Feed restored at 97 ask: closed {:?}, order now {}\n",
        report.closed,
        engine.order(order.id).unwrap().status()
    );
}

/// Supply exhaustion and the cancel-once rule.
fn scenario_6_supply_and_cancellation() {
    println!("Scenario 6: Supply Limits and Cancellation\n");

    let mut engine = new_engine();
    let tiny = engine.list_stock("TINY", "Tiny Float Inc", 20);
    let frank = engine.register_user("frank");
    engine.deposit(frank, Cash::new(dec!(100_000))).unwrap();
    engine
        .update_quote(tiny, price(dec!(10)), price(dec!(11)))
        .unwrap();

    // Twenty shares exist when the order is accepted.
    let doomed = engine
        .create_order(NewOrder::conditional(
            frank,
            tiny,
            Quantity::new(10).unwrap(),
            Side::Buy,
            TriggerKind::Long,
            price(dec!(12)),
        ))
        .unwrap();
    engine.set_available_quantity(tiny, 5).unwrap();
    println!(
        "  Float cut to 5 while a BUY 10 waits; can_buy now: {}",
        engine.can_buy(tiny, 10)
    );

    engine.advance_time(60_000);
    let report = engine.poll_sweep().expect("interval elapsed");
    println!(
        "  Sweep canceled {:?} ({} left in supply)",
        report.canceled,
        engine.available_quantity(tiny).unwrap()
    );
    println!(
        "  can_cancel on the dead order: {}",
        engine.can_cancel_order(doomed.id).unwrap()
    );
    println!(
        "  cancel again: {}",
        engine.cancel_order(doomed.id).unwrap_err()
    );

    // A fresh order withdrawn by the user before its trigger fires.
    let withdrawn = engine
        .create_order(NewOrder::conditional(
            frank,
            tiny,
            Quantity::new(2).unwrap(),
            Side::Buy,
            TriggerKind::Long,
            price(dec!(5)),
        ))
        .unwrap();
    engine.cancel_order(withdrawn.id).unwrap();
    println!(
        "  User-canceled order {} is {}, supply untouched at {}\n",
        withdrawn.id,
        engine.order(withdrawn.id).unwrap().status(),
        engine.available_quantity(tiny).unwrap()
    );
}

/// Many traders, staggered triggers, conservation checked at the end.
fn scenario_7_many_traders() {
    println!("Scenario 7: Many Traders\n");

    let mut engine = new_engine();
    let acme = engine.list_stock("ACME", "Acme Corp", 10_000);
    engine
        .update_quote(acme, price(dec!(99)), price(dec!(100)))
        .unwrap();

    let num_traders = 20;
    let mut traders = Vec::new();
    for i in 0..num_traders {
        let user = engine.register_user(&format!("trader{i}"));
        engine
            .deposit(user, Cash::new(dec!(50_000)))
            .unwrap();
        // Even traders buy dips at staggered limits, odd traders take profit.
        let order = if i % 2 == 0 {
            NewOrder::conditional(
                user,
                acme,
                Quantity::new(10).unwrap(),
                Side::Buy,
                TriggerKind::Long,
                price(dec!(95) - rust_decimal::Decimal::from(i / 2)),
            )
        } else {
            // Sellers need shares first.
            engine
                .create_order(NewOrder::manual(
                    user,
                    acme,
                    Quantity::new(10).unwrap(),
                    Side::Buy,
                ))
                .unwrap();
            NewOrder::conditional(
                user,
                acme,
                Quantity::new(10).unwrap(),
                Side::Sell,
                TriggerKind::Short,
                price(dec!(104) + rust_decimal::Decimal::from(i / 2)),
            )
        };
        engine.create_order(order).unwrap();
        traders.push(user);
    }
    println!(
        "  {} traders placed conditional orders; {} open",
        num_traders,
        engine.open_order_count()
    );

    let path = [
        (dec!(96), dec!(97)),
        (dec!(92), dec!(93)),
        (dec!(88), dec!(89)),
        (dec!(103), dec!(104)),
        (dec!(109), dec!(110)),
        (dec!(113), dec!(114)),
    ];
    let mut closed = 0;
    let mut canceled = 0;
    for (bid, ask) in path {
        engine.advance_time(60_000);
        engine.update_quote(acme, price(bid), price(ask)).unwrap();
        if let Some(report) = engine.poll_sweep() {
            closed += report.closed.len();
            canceled += report.canceled.len();
        }
    }

    println!(
        "  After the price walk: {} closed, {} canceled, {} still open",
        closed,
        canceled,
        engine.open_order_count()
    );
    println!(
        "  Share conservation: supply + holdings = {}",
        engine.ledger().total_shares(acme)
    );
    println!("  Events generated: {}", engine.events().len());
}

fn price(value: rust_decimal::Decimal) -> Price {
    Price::new(value).unwrap()
}
