//! Order lifecycle against the paper brokerage
//!
//! Backoff tests run on paused tokio time, so the full 1s→30s schedule
//! completes instantly while elapsed virtual time stays observable.

mod common;

use bastion_clock::ManualClock;
use bastion_core::{AccountStatus, OrderRequest, OrderStatus, RequestInvalid, Side, TradingEvent};
use bastion_gateway::ScriptStep;
use bastion_order_manager::{Error, TrackingConfig};
use bastion_ports::{BrokerError, FillDetails};
use chrono::{TimeZone, Utc};
use common::{harness, harness_with_clock};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn test_validation_happens_before_network() {
    let h = harness(TrackingConfig::default()).await;

    let err = h
        .olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 0))
        .await
        .unwrap_err();
    assert_eq!(err, Error::Validation(RequestInvalid::NonPositiveQuantity(0)));

    let err = h
        .olm
        .submit(OrderRequest::limit("AAPL", Side::Buy, 10, dec!(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(RequestInvalid::NonPositivePrice(_))));

    assert!(h.sim.submitted().await.is_empty());
}

#[tokio::test]
async fn test_submit_requires_connection() {
    let h = harness(TrackingConfig::default()).await;
    h.olm.disconnect();

    let err = h
        .olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
    assert!(h.sim.submitted().await.is_empty());

    h.olm.connect().await.unwrap();
    let id = h
        .olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 10))
        .await
        .unwrap();
    assert_eq!(h.olm.order(&id).unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_connect_fails_when_brokerage_unreachable() {
    let h = harness(TrackingConfig::default()).await;
    h.sim.set_online(false);
    assert!(matches!(h.olm.connect().await, Err(Error::Connection(_))));
    assert!(!h.olm.is_connected());
}

#[tokio::test]
async fn test_network_error_is_ambiguous_not_recorded() {
    let h = harness(TrackingConfig::default()).await;
    h.sim
        .fail_next_submit(BrokerError::Network("connection reset".into()))
        .await;

    let err = h
        .olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(h.olm.orders().is_empty());
}

#[tokio::test]
async fn test_brokerage_rejection_is_typed() {
    let h = harness(TrackingConfig::default()).await;
    h.sim.queue_rejection("AAPL", "INSUFFICIENT_FUNDS", "not enough cash");

    let err = h
        .olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 10))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::BrokerRejected {
            code: "INSUFFICIENT_FUNDS".into(),
            message: "not enough cash".into()
        }
    );
}

#[tokio::test]
async fn test_emergency_stop_vetoes_buys_locally() {
    let h = harness(TrackingConfig::default()).await;
    h.olm.gate().set_status(AccountStatus::EmergencyStop);

    let err = h
        .olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RiskRejected { .. }));

    h.sim.set_price("AAPL", dec!(100));
    assert!(h.olm.submit(OrderRequest::market("AAPL", Side::Sell, 10)).await.is_ok());
    assert_eq!(h.sim.submitted().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pending_three_times_then_filled_applies_once() {
    let h = harness(TrackingConfig::default()).await;
    h.sim.queue_script(
        "AAPL",
        vec![
            ScriptStep::pending(),
            ScriptStep::pending(),
            ScriptStep::pending(),
            ScriptStep::filled(100, dec!(150)),
        ],
    );
    let id = h
        .olm
        .submit(OrderRequest::limit("AAPL", Side::Buy, 100, dec!(150)))
        .await
        .unwrap();

    let started = Instant::now();
    let status = h.olm.track(&id).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(status, OrderStatus::Filled);
    assert_eq!(h.sim.status_queries(&id), 4);
    // 1s + 2s + 4s of backoff between the four queries
    assert!(elapsed >= Duration::from_secs(7) && elapsed < Duration::from_secs(8));

    assert_eq!(h.store.trade_count().await, 1);
    let position = h.ledger.position("AAPL").unwrap();
    assert_eq!(position.quantity, 100);
    assert_eq!(position.avg_cost, dec!(150));

    // Re-tracking a terminal order changes nothing
    assert_eq!(h.olm.track(&id).await.unwrap(), OrderStatus::Filled);
    assert_eq!(h.store.trade_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_polls_and_push_apply_fill_once() {
    let h = harness(TrackingConfig::default()).await;
    h.sim
        .queue_script("MSFT", vec![ScriptStep::filled(20, dec!(300)).with_commission(dec!(2))]);
    let id = h
        .olm
        .submit(OrderRequest::market("MSFT", Side::Buy, 20))
        .await
        .unwrap();

    let report = FillDetails {
        filled_quantity: 20,
        avg_fill_price: dec!(300),
        commission: dec!(2),
    };
    let (a, b, c, d) = tokio::join!(
        h.olm.track(&id),
        h.olm.track(&id),
        h.olm.reconcile(&id),
        h.olm.apply_fill_report(&id, report),
    );
    assert_eq!(a.unwrap(), OrderStatus::Filled);
    assert_eq!(b.unwrap(), OrderStatus::Filled);
    assert_eq!(c.unwrap(), OrderStatus::Filled);
    assert!(d.is_ok());

    assert_eq!(h.store.trade_count().await, 1);
    assert_eq!(h.ledger.held_quantity("MSFT"), 20);
}

#[tokio::test(start_paused = true)]
async fn test_partial_fills_become_incremental_trades() {
    let h = harness(TrackingConfig::default()).await;
    h.sim.queue_script(
        "AAPL",
        vec![
            ScriptStep::partial(40, dec!(150)),
            ScriptStep::filled(100, dec!(152.4)),
        ],
    );
    let id = h
        .olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 100))
        .await
        .unwrap();

    assert_eq!(h.olm.track(&id).await.unwrap(), OrderStatus::Filled);

    let trades = h
        .ledger
        .trades_since(chrono::Utc::now() - chrono::Duration::hours(1))
        .await;
    assert_eq!(trades.len(), 2);
    assert_eq!((trades[0].quantity, trades[0].price), (40, dec!(150)));
    // (152.4 * 100 - 150 * 40) / 60
    assert_eq!((trades[1].quantity, trades[1].price), (60, dec!(154)));

    let position = h.ledger.position("AAPL").unwrap();
    assert_eq!(position.quantity, 100);
    assert_eq!(position.avg_cost, dec!(152.4));
}

#[tokio::test]
async fn test_cancel_loses_race_to_fill() {
    let h = harness(TrackingConfig::default()).await;
    h.sim.queue_script(
        "TSLA",
        vec![ScriptStep::pending(), ScriptStep::filled(10, dec!(200))],
    );
    let id = h
        .olm
        .submit(OrderRequest::market("TSLA", Side::Buy, 10))
        .await
        .unwrap();

    let status = h.olm.cancel(&id).await.unwrap();
    assert_eq!(status, OrderStatus::Filled);
    assert_eq!(h.ledger.held_quantity("TSLA"), 10);
}

#[tokio::test]
async fn test_cancel_after_partial_fill_keeps_fills() {
    let h = harness(TrackingConfig::default()).await;
    h.sim.queue_script("NVDA", vec![ScriptStep::partial(30, dec!(100))]);
    let id = h
        .olm
        .submit(OrderRequest::market("NVDA", Side::Buy, 100))
        .await
        .unwrap();

    assert_eq!(h.olm.reconcile(&id).await.unwrap(), OrderStatus::PartiallyFilled);
    assert_eq!(h.olm.cancel(&id).await.unwrap(), OrderStatus::Cancelled);

    let order = h.olm.order(&id).unwrap();
    assert_eq!(order.filled_quantity, 30);
    assert_eq!(h.ledger.held_quantity("NVDA"), 30);
    assert_eq!(h.store.trade_count().await, 1);
}

#[tokio::test]
async fn test_cancelled_with_fills_walks_through_partial() {
    let h = harness(TrackingConfig::default()).await;
    let mut rx = h.events.subscribe();
    h.sim.queue_script("AMD", vec![ScriptStep::cancelled(25, dec!(80))]);
    let id = h
        .olm
        .submit(OrderRequest::market("AMD", Side::Buy, 50))
        .await
        .unwrap();

    assert_eq!(h.olm.reconcile(&id).await.unwrap(), OrderStatus::Cancelled);
    assert_eq!(h.ledger.held_quantity("AMD"), 25);

    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let TradingEvent::OrderStatusChanged { status, .. } = event {
            statuses.push(status);
        }
    }
    assert_eq!(
        statuses,
        vec![OrderStatus::Pending, OrderStatus::PartiallyFilled, OrderStatus::Cancelled]
    );
}

#[tokio::test]
async fn test_illegal_brokerage_transition_is_ignored() {
    let h = harness(TrackingConfig::default()).await;
    h.sim.queue_script(
        "AAPL",
        vec![ScriptStep::partial(10, dec!(100)), ScriptStep::rejected()],
    );
    let id = h
        .olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 20))
        .await
        .unwrap();

    assert_eq!(h.olm.reconcile(&id).await.unwrap(), OrderStatus::PartiallyFilled);
    // PartiallyFilled -> Rejected is not an edge
    assert_eq!(h.olm.reconcile(&id).await.unwrap(), OrderStatus::PartiallyFilled);
    assert_eq!(h.olm.order(&id).unwrap().status, OrderStatus::PartiallyFilled);
}

#[tokio::test(start_paused = true)]
async fn test_polling_timeout_marks_order_stale() {
    let config = TrackingConfig {
        max_attempts: 3,
        ..Default::default()
    };
    let h = harness(config).await;
    h.sim.queue_script("AAPL", vec![ScriptStep::pending()]);
    let id = h
        .olm
        .submit(OrderRequest::limit("AAPL", Side::Buy, 10, dec!(1)))
        .await
        .unwrap();

    let err = h.olm.track(&id).await.unwrap_err();
    assert_eq!(
        err,
        Error::PollingTimeout {
            order_id: id.clone(),
            attempts: 3,
            last_status: OrderStatus::Pending,
        }
    );
    assert!(err.is_stale());
    assert_eq!(h.olm.order(&id).unwrap().status, OrderStatus::Pending);
    assert_eq!(h.olm.stale_orders().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_signal_interrupts_backoff() {
    let h = harness(TrackingConfig::default()).await;
    h.sim.queue_script("AAPL", vec![ScriptStep::pending()]);
    let id = h
        .olm
        .submit(OrderRequest::limit("AAPL", Side::Buy, 10, dec!(1)))
        .await
        .unwrap();

    let started = Instant::now();
    let handle = h.olm.spawn_tracking(id.clone());
    // Second backoff wait runs from t=1s to t=3s
    tokio::time::sleep(Duration::from_millis(1500)).await;
    h.olm.stop_tracking(&id);

    let result = handle.await.unwrap();
    assert_eq!(result, Err(Error::TrackingStopped(id.clone())));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(h.sim.status_queries(&id), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_all_trackers() {
    let h = harness(TrackingConfig::default()).await;
    let mut handles = Vec::new();
    for symbol in ["AAPL", "MSFT"] {
        h.sim.queue_script(symbol, vec![ScriptStep::pending()]);
        let id = h
            .olm
            .submit(OrderRequest::limit(symbol, Side::Buy, 1, dec!(1)))
            .await
            .unwrap();
        handles.push(h.olm.spawn_tracking(id));
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    h.olm.shutdown();

    for handle in handles {
        assert!(matches!(handle.await.unwrap(), Err(Error::TrackingStopped(_))));
    }
}

#[tokio::test]
async fn test_reconcile_open_orders_and_account_refresh() {
    let h = harness(TrackingConfig::default()).await;
    h.sim.queue_script("AAPL", vec![ScriptStep::filled(5, dec!(10))]);
    h.sim.queue_script("MSFT", vec![ScriptStep::pending()]);
    h.olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 5))
        .await
        .unwrap();
    h.olm
        .submit(OrderRequest::limit("MSFT", Side::Buy, 5, dec!(1)))
        .await
        .unwrap();

    assert_eq!(h.olm.reconcile_open_orders().await, 2);
    assert_eq!(h.olm.open_orders().len(), 1);
    assert_eq!(h.ledger.held_quantity("AAPL"), 5);

    let snapshot = h.olm.refresh_account().await.unwrap();
    assert_eq!(snapshot.total_assets, dec!(100000));
    assert_eq!(h.olm.account().await.unwrap().total_assets, dec!(100000));
}

#[tokio::test]
async fn test_settled_orders_pruned_after_journal_window() {
    let clock = Arc::new(ManualClock::at(Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap()));
    let h = harness_with_clock(TrackingConfig::default(), clock.clone()).await;
    h.sim.queue_script("AAPL", vec![ScriptStep::filled(5, dec!(10))]);
    h.sim.queue_script("MSFT", vec![ScriptStep::pending()]);
    let filled = h
        .olm
        .submit(OrderRequest::market("AAPL", Side::Buy, 5))
        .await
        .unwrap();
    let resting = h
        .olm
        .submit(OrderRequest::limit("MSFT", Side::Buy, 5, dec!(1)))
        .await
        .unwrap();
    h.olm.reconcile_open_orders().await;
    assert_eq!(h.olm.order(&filled).unwrap().status, OrderStatus::Filled);

    clock.advance(chrono::Duration::hours(23));
    assert_eq!(h.olm.prune_settled(), 0);
    assert_eq!(h.olm.orders().len(), 2);

    clock.advance(chrono::Duration::hours(2));
    assert_eq!(h.olm.prune_settled(), 1);
    assert!(h.olm.order(&filled).is_none());
    // Open orders are never pruned, however old
    assert_eq!(h.olm.order(&resting).unwrap().status, OrderStatus::Pending);

    let late = FillDetails {
        filled_quantity: 5,
        avg_fill_price: dec!(10),
        commission: dec!(0),
    };
    assert!(matches!(
        h.olm.apply_fill_report(&filled, late).await,
        Err(Error::UnknownOrder(_))
    ));
    assert_eq!(h.ledger.held_quantity("AAPL"), 5);
}
