//! Reconciliation and restart recovery against scripted gateway reports.

#![allow(clippy::unwrap_used)]

mod common;

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{buy, coordinator, event, fill, hk_code, hk_morning};
use order_coordinator::ErrorCode;
use order_coordinator::application::EventOutcome;
use order_coordinator::application::ports::{GatewayError, GatewayOrderReport};
use order_coordinator::domain::environment::TradeEnvironment;
use order_coordinator::domain::instrument::Market;
use order_coordinator::domain::order_execution::{
    AnomalyKind, OrderEventKind, OrderPricing, OrderSide, OrderStatus,
};
use order_coordinator::domain::shared::{GatewayOrderId, OrderId};

fn report(gateway_order_id: &str, dealt: Decimal, status: OrderStatus) -> GatewayOrderReport {
    GatewayOrderReport {
        gateway_order_id: GatewayOrderId::new(gateway_order_id),
        client_order_id: None,
        code: hk_code(),
        side: OrderSide::Buy,
        quantity: dec!(200),
        pricing: OrderPricing::Limit { price: dec!(320) },
        dealt_quantity: dealt,
        dealt_average_price: (dealt > Decimal::ZERO).then_some(dec!(320)),
        status,
        environment: TradeEnvironment::Simulate,
        created_at: hk_morning() - chrono::Duration::hours(1),
    }
}

fn later(secs: i64) -> DateTime<Utc> {
    hk_morning() + chrono::Duration::seconds(secs)
}

#[tokio::test]
async fn reported_fill_and_cancel_are_applied() {
    let (coordinator, _gateway) = coordinator();
    let receipt = coordinator
        .submit_at(buy(dec!(200), dec!(320)), hk_morning())
        .await
        .unwrap();

    let summary = coordinator
        .reconcile_report(&[report("GW-1", dec!(100), OrderStatus::Cancelled)], later(5))
        .await;

    assert_eq!(summary.matched, 1);
    assert_eq!(summary.fills_applied, 1);
    assert_eq!(summary.finalized, 1);
    let order = coordinator.get_order(&receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.filled_quantity, dec!(100));
}

#[tokio::test]
async fn lower_reported_fill_is_flagged_not_applied() {
    let (coordinator, _gateway) = coordinator();
    let receipt = coordinator
        .submit_at(buy(dec!(200), dec!(320)), hk_morning())
        .await
        .unwrap();
    coordinator.on_gateway_event(fill(1, "GW-1", dec!(100))).await;

    coordinator
        .reconcile_report(&[report("GW-1", dec!(0), OrderStatus::Submitted)], later(5))
        .await;

    let order = coordinator.get_order(&receipt.order_id).await.unwrap();
    assert_eq!(order.filled_quantity, dec!(100));
    assert!(order.has_anomaly(AnomalyKind::FillRegression));
}

#[tokio::test]
async fn order_missing_past_grace_and_threshold_is_flagged_until_resolved() {
    let (coordinator, _gateway) = coordinator();
    let receipt = coordinator
        .submit_at(buy(dec!(200), dec!(320)), hk_morning())
        .await
        .unwrap();

    let first = coordinator.reconcile_report(&[], later(1)).await;
    let second = coordinator.reconcile_report(&[], later(10)).await;
    assert_eq!(first.missing, 1);
    assert!(first.flagged_unreconciled.is_empty());
    assert!(second.flagged_unreconciled.is_empty());

    let third = coordinator.reconcile_report(&[], later(40)).await;
    assert_eq!(third.flagged_unreconciled, vec![receipt.order_id.clone()]);

    // the flag survives the order reappearing
    coordinator
        .reconcile_report(&[report("GW-1", dec!(0), OrderStatus::Submitted)], later(50))
        .await;
    let order = coordinator.get_order(&receipt.order_id).await.unwrap();
    assert!(order.has_anomaly(AnomalyKind::Unreconciled));
    assert_eq!(order.status, OrderStatus::Submitted);

    let resolved = coordinator.resolve_anomaly(&receipt.order_id).await.unwrap();
    assert!(resolved.anomalies.is_empty());
}

#[tokio::test]
async fn many_quick_misses_inside_grace_are_not_flagged() {
    let (coordinator, _gateway) = coordinator();
    coordinator
        .submit_at(buy(dec!(200), dec!(320)), hk_morning())
        .await
        .unwrap();

    for secs in 1..=6 {
        let summary = coordinator.reconcile_report(&[], later(secs)).await;
        assert!(summary.flagged_unreconciled.is_empty());
    }
}

#[tokio::test]
async fn unconfirmed_submit_is_linked_by_client_id_and_deferred_cancel_forwarded() {
    let (coordinator, gateway) = coordinator();
    gateway.fail_next_place(GatewayError::Timeout(Duration::from_secs(5)));
    let receipt = coordinator
        .submit_at(buy(dec!(200), dec!(320)), hk_morning())
        .await
        .unwrap();
    assert_eq!(receipt.status, OrderStatus::PendingSubmit);

    let pending = coordinator.cancel(&receipt.order_id).await.unwrap();
    assert!(pending.cancel_requested);
    assert!(gateway.cancels().is_empty());

    let mut found = report("GW-77", dec!(0), OrderStatus::Submitted);
    found.client_order_id = Some(receipt.order_id.clone());
    let summary = coordinator.reconcile_report(&[found], later(5)).await;

    assert_eq!(summary.linked, 1);
    assert_eq!(summary.cancels_forwarded, 1);
    assert!(summary.adopted.is_empty());
    let cancels = gateway.cancels();
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].gateway_order_id, GatewayOrderId::new("GW-77"));
    let order = coordinator.get_order(&receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Submitted);
    assert_eq!(order.gateway_order_id.as_deref(), Some("GW-77"));
}

#[tokio::test]
async fn unknown_open_orders_are_adopted_on_recovery() {
    let (coordinator, gateway) = coordinator();
    let mut live = report("GW-500", dec!(50), OrderStatus::PartiallyFilled);
    live.client_order_id = Some(OrderId::new("oc-before-restart"));
    let mut other_env = report("GW-501", dec!(0), OrderStatus::Submitted);
    other_env.environment = TradeEnvironment::Real;
    gateway.set_open_orders(vec![
        live,
        report("GW-502", dec!(200), OrderStatus::Filled),
        other_env,
    ]);

    let summary = coordinator.reconcile().await.unwrap();

    assert_eq!(summary.adopted, vec![OrderId::new("oc-before-restart")]);
    let order = coordinator
        .get_order(&OrderId::new("oc-before-restart"))
        .await
        .unwrap();
    assert!(order.recovered);
    assert_eq!(order.status, OrderStatus::PartiallyFilled);
    assert_eq!(order.filled_quantity, dec!(50));

    let again = coordinator.reconcile().await.unwrap();
    assert!(again.adopted.is_empty());
    assert_eq!(coordinator.list_orders().await.len(), 1);
}

#[tokio::test]
async fn day_orders_expire_after_the_close() {
    let (coordinator, _gateway) = coordinator();
    let receipt = coordinator
        .submit_at(buy(dec!(200), dec!(320)), hk_morning())
        .await
        .unwrap();

    let lunch = Utc.with_ymd_and_hms(2024, 3, 4, 4, 30, 0).unwrap();
    assert!(coordinator.expire_day_orders(Market::Hk, lunch).await.is_empty());
    assert!(coordinator.expire_day_orders(Market::Us, later(60)).await.is_empty());

    // 16:05 Hong Kong time
    let after_close = Utc.with_ymd_and_hms(2024, 3, 4, 8, 5, 0).unwrap();
    let expired = coordinator.expire_day_orders(Market::Hk, after_close).await;

    assert_eq!(expired, vec![receipt.order_id.clone()]);
    let order = coordinator.get_order(&receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Expired);
}

#[tokio::test]
async fn finished_orders_are_dropped_after_the_retention_period() {
    let (coordinator, _gateway) = coordinator();
    let receipt = coordinator
        .submit_at(buy(dec!(200), dec!(320)), hk_morning())
        .await
        .unwrap();
    coordinator.on_gateway_event(fill(1, "GW-1", dec!(200))).await;
    let filled = [report("GW-1", dec!(200), OrderStatus::Filled)];

    let early = coordinator.reconcile_report(&filled, later(600)).await;
    assert!(early.pruned.is_empty());
    assert!(coordinator.get_order(&receipt.order_id).await.is_ok());

    let late = coordinator.reconcile_report(&filled, later(3602)).await;
    assert_eq!(late.pruned, vec![receipt.order_id.clone()]);
    assert!(late.adopted.is_empty());
    let err = coordinator.get_order(&receipt.order_id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::OrderNotFound);
    assert_eq!(
        coordinator.on_gateway_event(fill(2, "GW-1", dec!(200))).await,
        EventOutcome::UnknownOrder
    );
}

#[tokio::test]
async fn finished_orders_with_anomalies_stay_until_resolved() {
    let (coordinator, _gateway) = coordinator();
    let receipt = coordinator
        .submit_at(buy(dec!(200), dec!(320)), hk_morning())
        .await
        .unwrap();
    coordinator.on_gateway_event(fill(1, "GW-1", dec!(100))).await;
    coordinator.on_gateway_event(fill(2, "GW-1", dec!(300))).await;
    coordinator
        .on_gateway_event(event(
            3,
            "GW-1",
            OrderEventKind::Cancelled {
                cumulative_quantity: None,
            },
        ))
        .await;

    let kept = coordinator.reconcile_report(&[], later(7200)).await;
    assert!(kept.pruned.is_empty());
    let order = coordinator.get_order(&receipt.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.has_anomaly(AnomalyKind::Overfill));

    coordinator.resolve_anomaly(&receipt.order_id).await.unwrap();
    let pruned = coordinator.reconcile_report(&[], later(7201)).await;
    assert_eq!(pruned.pruned, vec![receipt.order_id]);
}
