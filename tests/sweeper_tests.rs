//! Sweeper tests.
//!
//! Exercise the periodic scan over open conditional orders: trigger
//! evaluation on the side-dependent price, settlement and cancellation
//! during a pass, quote outages, and the polling cadence.

use brokerage_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn engine() -> Engine<QuoteBoard, RecordingNotifier> {
    Engine::new(
        EngineConfig::default(),
        QuoteBoard::new(),
        RecordingNotifier::new(),
    )
}

fn price(value: Decimal) -> Price {
    Price::new(value).unwrap()
}

fn qty(value: u32) -> Quantity {
    Quantity::new(value).unwrap()
}

fn funded_market() -> (Engine<QuoteBoard, RecordingNotifier>, UserId, StockId) {
    let mut engine = engine();
    let stock = engine.list_stock("ACME", "Acme Corp", 1000);
    let user = engine.register_user("trader");
    engine.deposit(user, Cash::new(dec!(10_000))).unwrap();
    engine
        .update_quote(stock, price(dec!(99)), price(dec!(101)))
        .unwrap();
    (engine, user, stock)
}

fn conditional(
    engine: &mut Engine<QuoteBoard, RecordingNotifier>,
    user: UserId,
    stock: StockId,
    quantity: u32,
    side: Side,
    kind: TriggerKind,
    limit: Decimal,
) -> OrderId {
    engine
        .create_order(NewOrder::conditional(
            user,
            stock,
            qty(quantity),
            side,
            kind,
            price(limit),
        ))
        .unwrap()
        .id
}

#[test]
fn long_triggers_fire_at_or_below_the_limit() {
    let (mut engine, user, stock) = funded_market();
    // Buys look at the ask, sells at the bid.
    let buy = conditional(&mut engine, user, stock, 1, Side::Buy, TriggerKind::Long, dec!(95));
    engine
        .create_order(NewOrder::manual(user, stock, qty(5), Side::Buy))
        .unwrap();
    let sell = conditional(&mut engine, user, stock, 1, Side::Sell, TriggerKind::Long, dec!(95));

    // Ask 101 > 95 and bid 99 > 95: neither fires.
    assert!(!engine.is_ready_to_close(buy).unwrap());
    assert!(!engine.is_ready_to_close(sell).unwrap());

    // Bid 94 <= 95 fires the sell; ask 96 > 95 still holds the buy.
    engine
        .update_quote(stock, price(dec!(94)), price(dec!(96)))
        .unwrap();
    assert!(!engine.is_ready_to_close(buy).unwrap());
    assert!(engine.is_ready_to_close(sell).unwrap());

    // Ask 95 <= 95 fires the buy as well.
    engine
        .update_quote(stock, price(dec!(93)), price(dec!(95)))
        .unwrap();
    assert!(engine.is_ready_to_close(buy).unwrap());
}

#[test]
fn short_triggers_fire_at_or_above_the_limit() {
    let (mut engine, user, stock) = funded_market();
    let buy = conditional(&mut engine, user, stock, 1, Side::Buy, TriggerKind::Short, dec!(105));
    engine
        .create_order(NewOrder::manual(user, stock, qty(5), Side::Buy))
        .unwrap();
    let sell = conditional(&mut engine, user, stock, 1, Side::Sell, TriggerKind::Short, dec!(105));

    assert!(!engine.is_ready_to_close(buy).unwrap());
    assert!(!engine.is_ready_to_close(sell).unwrap());

    // Ask 105 >= 105 fires the buy; bid 103 < 105 holds the sell.
    engine
        .update_quote(stock, price(dec!(103)), price(dec!(105)))
        .unwrap();
    assert!(engine.is_ready_to_close(buy).unwrap());
    assert!(!engine.is_ready_to_close(sell).unwrap());

    engine
        .update_quote(stock, price(dec!(106)), price(dec!(108)))
        .unwrap();
    assert!(engine.is_ready_to_close(sell).unwrap());
}

#[test]
fn terminal_orders_are_never_ready() {
    let (mut engine, user, stock) = funded_market();
    let order = conditional(&mut engine, user, stock, 1, Side::Buy, TriggerKind::Long, dec!(200));
    assert!(engine.is_ready_to_close(order).unwrap());

    engine.cancel_order(order).unwrap();
    assert!(!engine.is_ready_to_close(order).unwrap());
}

#[test]
fn sweep_settles_met_triggers_and_leaves_the_rest() {
    let (mut engine, user, stock) = funded_market();
    let dip_buy = conditional(&mut engine, user, stock, 2, Side::Buy, TriggerKind::Long, dec!(90));
    let spike_buy =
        conditional(&mut engine, user, stock, 2, Side::Buy, TriggerKind::Short, dec!(120));

    // Price dips to 90.
    engine
        .update_quote(stock, price(dec!(89)), price(dec!(90)))
        .unwrap();
    let report = engine.run_sweep();

    assert_eq!(report.evaluated, 2);
    assert_eq!(report.closed, vec![dip_buy]);
    assert!(report.canceled.is_empty());
    assert_eq!(report.skipped, 1);

    assert_eq!(engine.order(dip_buy).unwrap().status(), OrderStatus::Closed);
    assert_eq!(
        engine.order(dip_buy).unwrap().closing_price(),
        Some(price(dec!(90)))
    );
    assert_eq!(engine.order(spike_buy).unwrap().status(), OrderStatus::Open);
    assert_eq!(engine.balance_of(user).unwrap(), Cash::new(dec!(9820)));
}

#[test]
fn sweep_cancels_orders_the_ledger_rejects_and_continues() {
    let (mut engine, user, stock) = funded_market();

    // The sell is covered when placed, then the shares leave through a
    // manual sell while it waits on its trigger.
    engine
        .create_order(NewOrder::manual(user, stock, qty(5), Side::Buy))
        .unwrap();
    let bad_sell =
        conditional(&mut engine, user, stock, 5, Side::Sell, TriggerKind::Short, dec!(100));
    let good_buy =
        conditional(&mut engine, user, stock, 2, Side::Buy, TriggerKind::Short, dec!(100));
    engine
        .create_order(NewOrder::manual(user, stock, qty(5), Side::Sell))
        .unwrap();
    assert_eq!(engine.holding(user, stock), 0);

    engine
        .update_quote(stock, price(dec!(102)), price(dec!(104)))
        .unwrap();
    let report = engine.run_sweep();

    // bad_sell was scanned first and canceled; the pass still settled
    // good_buy after it.
    assert_eq!(report.canceled, vec![bad_sell]);
    assert_eq!(report.closed, vec![good_buy]);
    assert_eq!(engine.order(bad_sell).unwrap().status(), OrderStatus::Canceled);
    assert_eq!(engine.order(good_buy).unwrap().status(), OrderStatus::Closed);

    // Both terminal transitions from the sweep were announced.
    let notices = engine.notifier().notices();
    assert!(notices
        .iter()
        .any(|n| n.order == bad_sell && n.status == OrderStatus::Canceled));
    assert!(notices
        .iter()
        .any(|n| n.order == good_buy && n.status == OrderStatus::Closed));
}

#[test]
fn drained_balance_turns_a_met_buy_into_a_cancellation() {
    let (mut engine, user, stock) = funded_market();
    let order = conditional(&mut engine, user, stock, 10, Side::Buy, TriggerKind::Long, dec!(95));

    // The order was affordable when placed. Then the cash leaves.
    engine.withdraw(user, Cash::new(dec!(9_950))).unwrap();
    engine
        .update_quote(stock, price(dec!(93)), price(dec!(94)))
        .unwrap();

    let report = engine.run_sweep();
    assert_eq!(report.canceled, vec![order]);
    assert!(report.closed.is_empty());
    assert_eq!(engine.order(order).unwrap().status(), OrderStatus::Canceled);
    assert_eq!(engine.balance_of(user).unwrap(), Cash::new(dec!(50)));
    assert_eq!(engine.holding(user, stock), 0);
}

#[test]
fn quote_outage_skips_orders_without_canceling_them() {
    let (mut engine, user, stock) = funded_market();
    let order = conditional(&mut engine, user, stock, 2, Side::Buy, TriggerKind::Long, dec!(100));

    engine.oracle_mut().remove(stock);
    let report = engine.run_sweep();

    assert_eq!(report.evaluated, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.closed.is_empty() && report.canceled.is_empty());
    assert_eq!(engine.order(order).unwrap().status(), OrderStatus::Open);

    // Feed recovers, the next pass settles it.
    engine
        .update_quote(stock, price(dec!(97)), price(dec!(98)))
        .unwrap();
    let report = engine.run_sweep();
    assert_eq!(report.closed, vec![order]);
}

#[test]
fn canceled_orders_drop_out_of_the_scan() {
    let (mut engine, user, stock) = funded_market();
    let order = conditional(&mut engine, user, stock, 2, Side::Buy, TriggerKind::Long, dec!(150));
    assert!(engine.is_ready_to_close(order).unwrap());

    engine.cancel_order(order).unwrap();
    let report = engine.run_sweep();

    assert_eq!(report.evaluated, 0);
    assert!(report.is_quiet());
    assert_eq!(engine.order(order).unwrap().status(), OrderStatus::Canceled);
    // Only the cancellation notice, nothing from the sweep.
    assert_eq!(engine.notifier().len(), 1);
}

#[test]
fn manual_orders_are_not_swept() {
    let (mut engine, user, stock) = funded_market();
    engine
        .create_order(NewOrder::manual(user, stock, qty(1), Side::Buy))
        .unwrap();
    conditional(&mut engine, user, stock, 1, Side::Buy, TriggerKind::Long, dec!(10));
    assert_eq!(engine.open_conditional_count(), 1);

    let report = engine.run_sweep();
    // Only the conditional order is on the scan.
    assert_eq!(report.evaluated, 1);
}

#[test]
fn poll_respects_the_configured_interval() {
    let config = EngineConfig {
        sweep_interval_secs: 60,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config, QuoteBoard::new(), RecordingNotifier::new());
    engine.set_time(Timestamp::from_millis(1_000_000));

    // Nothing has ever swept, so the first poll runs.
    assert!(engine.poll_sweep().is_some());
    assert_eq!(engine.last_sweep(), Some(Timestamp::from_millis(1_000_000)));

    engine.advance_time(30_000);
    assert!(engine.poll_sweep().is_none());

    engine.advance_time(30_000);
    assert!(engine.poll_sweep().is_some());
    assert_eq!(engine.last_sweep(), Some(Timestamp::from_millis(1_060_000)));

    engine.advance_time(59_999);
    assert!(engine.poll_sweep().is_none());
    engine.advance_time(1);
    assert!(engine.poll_sweep().is_some());
}

#[test]
fn sweep_completion_lands_on_the_audit_trail() {
    let (mut engine, user, stock) = funded_market();
    conditional(&mut engine, user, stock, 1, Side::Buy, TriggerKind::Long, dec!(100));
    conditional(&mut engine, user, stock, 1, Side::Buy, TriggerKind::Long, dec!(10));

    engine
        .update_quote(stock, price(dec!(98)), price(dec!(99)))
        .unwrap();
    engine.run_sweep();

    let sweep = engine
        .events()
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::SweepCompleted(s) => Some(s.clone()),
            _ => None,
        })
        .expect("a SweepCompleted event");

    assert_eq!(sweep.evaluated, 2);
    assert_eq!(sweep.closed, 1);
    assert_eq!(sweep.canceled, 0);
    assert_eq!(sweep.skipped, 1);
}

#[test]
fn orders_settle_in_placement_order() {
    let (mut engine, user, stock) = funded_market();
    let first = conditional(&mut engine, user, stock, 1, Side::Buy, TriggerKind::Long, dec!(100));
    let second = conditional(&mut engine, user, stock, 1, Side::Buy, TriggerKind::Long, dec!(100));
    let third = conditional(&mut engine, user, stock, 1, Side::Buy, TriggerKind::Long, dec!(100));

    engine
        .update_quote(stock, price(dec!(95)), price(dec!(96)))
        .unwrap();
    let report = engine.run_sweep();

    assert_eq!(report.closed, vec![first, second, third]);
}
