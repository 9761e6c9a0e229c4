use std::{sync::Arc, time::Duration};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commerce_coordinator::{
    config::AppConfig,
    draft::JsonFileDraftStorage,
    models::Product,
    reminder::LocalReminderScheduler,
    repository::{Catalog, InMemoryCartRepository, InMemoryFavoritesRepository, InMemoryOrdersRepository},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,commerce_coordinator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let catalog = Arc::new(demo_catalog());
    let (reminders, mut deliveries) = LocalReminderScheduler::new();

    let state = AppState {
        cart: Arc::new(InMemoryCartRepository::new(config.owner_id.clone(), catalog.clone())),
        favorites: Arc::new(InMemoryFavoritesRepository::new(config.owner_id.clone(), catalog.clone())),
        orders: Arc::new(InMemoryOrdersRepository::new()),
        reminders: Arc::new(reminders),
        drafts: Arc::new(JsonFileDraftStorage::new(config.draft_storage_path.clone())),
        config,
    };

    tokio::spawn(async move {
        while let Some(delivered) = deliveries.recv().await {
            tracing::info!(
                reminder_id = %delivered.request.id,
                title = %delivered.request.title,
                body = %delivered.request.body,
                "reminder shown"
            );
        }
    });

    run_session(&state).await?;
    Ok(())
}

/// Scripted walk through favorites, cart, checkout and order history.
async fn run_session(state: &AppState) -> anyhow::Result<()> {
    let settle = state.config.coalesce_window + Duration::from_millis(50);

    let cart = state.cart_coordinator();
    let favorites = state.favorites_coordinator();
    let checkout = state.checkout_coordinator();
    let orders = state.orders_projection();

    favorites.toggle_favorite("sneaker-01").await?;
    favorites.toggle_favorite("jacket-02").await?;
    tokio::time::sleep(settle).await;
    tracing::info!(favorites = favorites.count(), "favorites ready");

    favorites.toggle_cart("sneaker-01").await?;
    tokio::time::sleep(settle).await;
    cart.increase("sneaker-01").await?;
    tokio::time::sleep(settle).await;

    let summary = cart.summary();
    tracing::info!(
        total_items = summary.total_items,
        total = %summary.total_price_formatted,
        "cart summary"
    );
    cart.schedule_reminder_for_leaving_screen().await;

    checkout.update_delivery_address("221B Baker Street");
    if !checkout.update_receiver_phone_input("(555) 123-4567") {
        tracing::warn!("receiver phone rejected");
    }
    checkout.update_comment("Leave at the door");
    tokio::time::sleep(settle).await;

    match checkout.place_order().await {
        Ok(order) => tracing::info!(order_id = %order.id, "order placed"),
        Err(err) if err.is_validation() => tracing::warn!(error = %err, "fix checkout input"),
        Err(err) if err.is_transient() => tracing::warn!(error = %err, "placement already running"),
        Err(err) => return Err(err.into()),
    }
    tokio::time::sleep(settle).await;

    for section in 0..orders.sections_count() {
        if let Some(header) = orders.header(section) {
            tracing::info!(
                order_id = %header.order_id,
                status = %header.status,
                total = %header.total_price,
                rows = orders.rows(section),
                "order history"
            );
        }
    }
    Ok(())
}

fn demo_catalog() -> Catalog {
    Catalog::new([
        Product {
            id: "sneaker-01".into(),
            brand_name: "Stride".into(),
            title: "Canvas sneaker".into(),
            unit_price: 79.0,
            image_url: None,
        },
        Product {
            id: "jacket-02".into(),
            brand_name: "Northline".into(),
            title: "Rain jacket".into(),
            unit_price: 149.5,
            image_url: None,
        },
        Product {
            id: "cap-03".into(),
            brand_name: "Stride".into(),
            title: "Logo cap".into(),
            unit_price: 24.0,
            image_url: None,
        },
    ])
}
