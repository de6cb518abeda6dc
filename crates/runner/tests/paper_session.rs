//! Full sessions against the in-process brokerage.
//!
//! The clock is frozen inside trading hours; tokio time is paused so order
//! tracking back-off and monitor ticks advance instantly.

use bastion_clock::ManualClock;
use bastion_core::{AccountStatus, AlertType, OrderStatus};
use bastion_ports::Clock;
use bastion_risk_manager::MitigationKind;
use bastion_runner::{BastionConfig, PaperScenario, PaperSession};
use bastion_strategy::Recommendation;
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn clock() -> Arc<dyn Clock> {
    // 10:00 at UTC+8
    Arc::new(ManualClock::at(Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap()))
}

#[tokio::test(start_paused = true)]
async fn test_demo_session_trades_recommendations_and_stops_losses() {
    let report = PaperSession::new(BastionConfig::default(), PaperScenario::demo(), clock())
        .run()
        .await
        .unwrap();

    assert_eq!(report.recommendation("600519"), Some(Recommendation::StrongBuy));
    assert_eq!(report.recommendation("000001"), Some(Recommendation::Avoid));
    assert_eq!(report.recommendation("300750"), Some(Recommendation::Watch));

    // Bought on the recommendation, sold out of the weakening holding
    assert_eq!(report.position("600519").map(|p| p.quantity), Some(100));
    assert!(report.position("000001").is_none());

    // The holding past the stop-loss line was closed by the monitor
    assert!(report.position("300750").is_none());
    let stop = report
        .mitigations
        .iter()
        .find(|m| m.symbol == "300750")
        .expect("stop-loss dispatched");
    assert_eq!(stop.kind, MitigationKind::StopLoss);
    assert_eq!(stop.quantity, 300);
    assert!(
        report
            .alerts
            .iter()
            .any(|a| a.alert_type == AlertType::PositionLoss
                && a.symbol.as_deref() == Some("300750"))
    );

    assert!(report.rejected.is_empty());
    assert!(report.orders.iter().all(|o| o.status == OrderStatus::Filled));
    assert!(report.metrics.total_checks >= 1);
    assert_ne!(report.status, AccountStatus::EmergencyStop);
}

#[tokio::test(start_paused = true)]
async fn test_account_loss_triggers_emergency_stop() {
    let mut scenario = PaperScenario::demo();
    scenario.account.total_pnl = dec!(-150000);

    let report = PaperSession::new(BastionConfig::default(), scenario, clock())
        .run()
        .await
        .unwrap();

    assert_eq!(report.status, AccountStatus::EmergencyStop);
    assert_eq!(report.metrics.emergency_stops, 1);
    assert!(report.positions.is_empty());
    assert!(
        report
            .alerts
            .iter()
            .any(|a| a.alert_type == AlertType::EmergencyStop)
    );
}

#[tokio::test(start_paused = true)]
async fn test_neutral_scenario_places_no_orders() {
    let scenario = PaperScenario::from_json(
        r#"{
            "account": { "total_assets": "500000", "available_cash": "200000" },
            "duration_secs": 2,
            "symbols": [{
                "symbol": "AAPL",
                "price": "187.4",
                "timeframes": {
                    "high_frequency": { "indicators": { "rsi": "55" } }
                }
            }]
        }"#,
    )
    .unwrap();

    let report = PaperSession::new(BastionConfig::default(), scenario, clock())
        .run()
        .await
        .unwrap();

    assert_eq!(report.recommendation("AAPL"), Some(Recommendation::Watch));
    assert!(report.orders.is_empty());
    assert!(report.positions.is_empty());
    assert_eq!(report.status, AccountStatus::Normal);
}
