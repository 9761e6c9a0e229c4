mod common;

use std::sync::Arc;

use commerce_coordinator::{
    draft::{DraftStorage, JsonFileDraftStorage},
    error::AppError,
    models::{DeliveryMethod, OrderDraft, OrderStatus, PaymentMethod},
    reminder::ReminderId,
    repository::{CartRepository, OrdersRepository},
    services::PlacementState,
};
use futures::StreamExt;

use common::{Fixture, OWNER, settle};

fn port_calls(fx: &Fixture) -> Vec<String> {
    fx.journal
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("cart.") || e.starts_with("orders."))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn pickup_needs_only_a_non_empty_cart() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let checkout = fx.checkout_coordinator();
    settle().await;
    assert_eq!(checkout.delivery_method(), DeliveryMethod::Pickup);
    assert!(!checkout.can_place_order());

    fx.cart.inner.add("p1", 1).await?;
    settle().await;
    assert!(checkout.can_place_order());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn delivery_needs_address_and_phone() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 1)]).await;
    let checkout = fx.checkout_coordinator();
    settle().await;

    checkout.update_delivery_address("  221B Baker Street ");
    assert_eq!(checkout.delivery_method(), DeliveryMethod::Delivery);
    assert_eq!(
        checkout.draft().delivery_address.as_deref(),
        Some("221B Baker Street")
    );
    assert!(!checkout.can_place_order());

    assert!(checkout.update_receiver_phone_input("(555) 123-4567"));
    assert!(checkout.can_place_order());
    assert_eq!(
        checkout.receiver_phone_display().as_deref(),
        Some("+1 (555) 123-4567")
    );

    assert!(!checkout.update_receiver_phone_input("555-12"));
    assert_eq!(checkout.draft().receiver_phone_e164, None);
    assert!(!checkout.can_place_order());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn blank_address_leaves_method_alone() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let checkout = fx.checkout_coordinator();

    checkout.update_delivery_address("   ");
    assert_eq!(checkout.delivery_method(), DeliveryMethod::Pickup);
    assert_eq!(checkout.draft().delivery_address, None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn comment_blank_means_none() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let checkout = fx.checkout_coordinator();

    checkout.update_comment(" \n\t ");
    assert_eq!(checkout.draft().comment, None);

    checkout.update_comment(" ring twice ");
    assert_eq!(checkout.draft().comment.as_deref(), Some(" ring twice "));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn eligibility_stream_emits_on_flips_only() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let checkout = fx.checkout_coordinator();
    let mut eligible = checkout.observe_can_place_order();

    assert_eq!(eligible.next().await, Some(false));

    fx.cart.inner.add("p1", 1).await?;
    assert_eq!(eligible.next().await, Some(true));

    checkout.set_delivery_method(DeliveryMethod::Delivery);
    assert_eq!(eligible.next().await, Some(false));

    // no flip, nothing emitted
    checkout.set_payment_method(PaymentMethod::Card);
    checkout.update_delivery_address("1 Main St");
    checkout.update_receiver_phone(Some("+15551234567"));
    assert_eq!(eligible.next().await, Some(true));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn receiver_phone_stream_follows_draft() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let checkout = fx.checkout_coordinator();
    let mut phones = checkout.observe_receiver_phone();

    assert_eq!(phones.next().await, Some(None));

    assert!(checkout.update_receiver_phone_input("(555) 123-4567"));
    assert_eq!(
        phones.next().await,
        Some(Some("+1 (555) 123-4567".to_string()))
    );

    // same number in another shape, nothing new to show
    checkout.update_receiver_phone(Some("+15551234567"));
    checkout.update_receiver_phone(None);
    assert_eq!(phones.next().await, Some(None));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn placement_stream_reports_progress() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 1)]).await;
    let checkout = Arc::new(fx.checkout_coordinator());
    let mut states = checkout.observe_placement();
    assert_eq!(states.next().await, Some(PlacementState::Idle));

    let held = fx.orders.gate.lock().await;
    let placing = tokio::spawn({
        let checkout = checkout.clone();
        async move { checkout.place_order().await }
    });
    assert_eq!(states.next().await, Some(PlacementState::Placing));

    drop(held);
    let order = placing.await??;
    assert_eq!(
        states.next().await,
        Some(PlacementState::Placed { order_id: order.id })
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn draft_survives_new_coordinator() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("checkout-draft.json");
    let fx = Fixture::with_drafts(Arc::new(JsonFileDraftStorage::new(&path)));

    let checkout = fx.checkout_coordinator();
    checkout.update_delivery_address("1 Main St");
    checkout.update_receiver_phone(Some("+15551234567"));
    checkout.update_comment("gate code 42");
    checkout.set_payment_method(PaymentMethod::Card);
    let expected = checkout.draft();
    drop(checkout);

    let reopened = fx.checkout_coordinator();
    assert_eq!(reopened.draft(), expected);

    // a fresh store over the same file sees the same draft
    let restarted = JsonFileDraftStorage::new(&path);
    assert_eq!(restarted.load(OWNER)?, expected);

    reopened.reset_draft();
    assert_eq!(reopened.draft(), OrderDraft::default());
    assert_eq!(restarted.load(OWNER)?, OrderDraft::default());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_cart_fails_before_any_call() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let checkout = fx.checkout_coordinator();
    settle().await;

    let err = checkout.place_order().await.unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));
    assert!(err.is_validation());
    assert!(port_calls(&fx).is_empty());
    assert!(matches!(
        checkout.placement_state(),
        PlacementState::Failed {
            validation: true,
            ..
        }
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn missing_delivery_fields_fail_before_any_call() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 1)]).await;
    let checkout = fx.checkout_coordinator();
    settle().await;

    checkout.update_delivery_address("1 Main St");
    let err = checkout.place_order().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::MissingDeliveryFields {
            address: false,
            phone: true
        }
    ));

    checkout.update_delivery_address("");
    checkout.update_receiver_phone(Some("+15551234567"));
    let err = checkout.place_order().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::MissingDeliveryFields {
            address: true,
            phone: false
        }
    ));

    assert!(port_calls(&fx).is_empty());
    assert_eq!(fx.cart.inner.lines().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn placement_creates_clears_then_schedules() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 2), ("p2", 1)]).await;
    let checkout = fx.checkout_coordinator();
    settle().await;
    checkout.update_comment("leave at reception");

    let summary = checkout.summary();
    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.total_price, "$70.00");

    let order = checkout.place_order().await?;
    assert_eq!(order.owner_id, OWNER);
    assert_eq!(order.status, OrderStatus::Created);
    assert_eq!(order.receive_address, "Store #1");
    assert_eq!(order.comment.as_deref(), Some("leave at reception"));
    assert_eq!(order.total_items(), 3);
    assert_eq!(order.total_price(), 70.0);

    assert_eq!(
        fx.journal.entries(),
        vec![
            format!("orders.create:{}", order.id),
            "cart.clear".to_string(),
            format!("reminders.cancel:{}", ReminderId::cart(OWNER)),
            format!("reminders.schedule:{}", ReminderId::order_status(&order.id)),
        ]
    );

    let reminder = fx
        .reminders
        .pending(&ReminderId::order_status(&order.id))
        .expect("order status reminder");
    assert_eq!(reminder.category.as_deref(), Some("order_status"));

    assert!(fx.cart.inner.lines().is_empty());
    assert_eq!(fx.orders.inner.orders(), vec![order.clone()]);
    assert_eq!(
        checkout.placement_state(),
        PlacementState::Placed { order_id: order.id }
    );
    assert!(!checkout.can_place_order());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn placed_order_keeps_its_snapshot() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 2)]).await;
    let checkout = fx.checkout_coordinator();
    settle().await;

    let order = checkout.place_order().await?;
    fx.cart.inner.add("p1", 5).await?;
    settle().await;

    let stored = fx.orders.inner.orders();
    assert_eq!(stored[0].lines[0].quantity, 2);
    assert_eq!(order.lines[0].quantity, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_create_leaves_cart_and_reminders_alone() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 1)]).await;
    let checkout = fx.checkout_coordinator();
    settle().await;

    fx.orders.failures.fail("orders.create");
    let err = checkout.place_order().await.unwrap_err();
    assert!(matches!(err, AppError::Repository(_)));
    assert!(!err.is_validation());

    assert_eq!(fx.journal.count("cart.clear"), 0);
    assert_eq!(fx.journal.count("reminders."), 0);
    assert_eq!(fx.cart.inner.lines().len(), 1);
    assert!(checkout.can_place_order());
    assert!(matches!(
        checkout.placement_state(),
        PlacementState::Failed {
            validation: false,
            ..
        }
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_clear_reports_recorded_order() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 1)]).await;
    let checkout = fx.checkout_coordinator();
    settle().await;

    fx.cart.failures.fail("cart.clear");
    let err = checkout.place_order().await.unwrap_err();
    let AppError::CartNotCleared { order_id, .. } = &err else {
        panic!("expected CartNotCleared, got {err:?}");
    };
    assert_eq!(&fx.orders.inner.orders()[0].id, order_id);
    assert_eq!(fx.journal.count("reminders.schedule"), 0);

    // retry the clear, never the placement
    fx.cart.failures.heal("cart.clear");
    checkout.clear_cart().await?;
    settle().await;
    assert!(fx.cart.inner.lines().is_empty());
    assert_eq!(fx.orders.inner.orders().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reminder_failure_does_not_fail_placement() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p3", 4)]).await;
    let checkout = fx.checkout_coordinator();
    settle().await;

    fx.reminders.set_failing(true);
    let order = checkout.place_order().await?;

    assert_eq!(order.total_price(), 100.0);
    assert!(fx.cart.inner.lines().is_empty());
    assert_eq!(fx.orders.inner.orders().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn second_placement_is_rejected_while_first_runs() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 1)]).await;
    let checkout = Arc::new(fx.checkout_coordinator());
    settle().await;

    let held = fx.orders.gate.lock().await;
    let first = tokio::spawn({
        let checkout = checkout.clone();
        async move { checkout.place_order().await }
    });
    settle().await;
    assert_eq!(checkout.placement_state(), PlacementState::Placing);

    let second = checkout.place_order().await;
    let second = second.expect_err("second placement rejected");
    assert!(matches!(second, AppError::PlacementInProgress));
    assert!(!second.is_validation());
    assert!(second.is_transient());

    drop(held);
    let order = first.await??;
    assert_eq!(fx.orders.inner.orders().len(), 1);
    assert_eq!(
        checkout.placement_state(),
        PlacementState::Placed { order_id: order.id }
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn placement_right_after_construction_sees_repository_cart() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 2)]).await;
    let checkout = fx.checkout_coordinator();

    let order = checkout.place_order().await?;

    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].quantity, 2);
    assert!(fx.cart.inner.lines().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn duplicate_order_ids_are_rejected() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.seed_cart(&[("p1", 1)]).await;
    let checkout = fx.checkout_coordinator();
    settle().await;

    let order = checkout.place_order().await?;
    assert!(fx.orders.inner.create(order).await.is_err());
    Ok(())
}
