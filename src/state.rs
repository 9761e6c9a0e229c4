use std::sync::Arc;

use crate::{
    config::AppConfig,
    draft::DraftStorage,
    format::{PhoneFormatter, PriceFormatter},
    reminder::ReminderScheduler,
    repository::{CartRepository, FavoritesRepository, OrdersRepository},
    services::{
        CartCoordinator, CheckoutCoordinator, FavoritesCoordinator, OrdersProjection,
        checkout_service::{CheckoutPorts, CheckoutSettings},
    },
};

/// The externally owned services every coordinator is built from. Each
/// coordinator receives its ports explicitly through its constructor.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub cart: Arc<dyn CartRepository>,
    pub favorites: Arc<dyn FavoritesRepository>,
    pub orders: Arc<dyn OrdersRepository>,
    pub reminders: Arc<dyn ReminderScheduler>,
    pub drafts: Arc<dyn DraftStorage>,
}

impl AppState {
    pub fn prices(&self) -> PriceFormatter {
        PriceFormatter::new(self.config.currency_symbol.clone())
    }

    pub fn phones(&self) -> PhoneFormatter {
        PhoneFormatter::new(self.config.phone_country_code.clone(), "(XXX) XXX-XXXX")
    }

    pub fn cart_coordinator(&self) -> CartCoordinator {
        CartCoordinator::new(
            self.config.owner_id.clone(),
            self.cart.clone(),
            self.reminders.clone(),
            self.config.cart_reminder_policy(),
            self.prices(),
        )
    }

    pub fn favorites_coordinator(&self) -> FavoritesCoordinator {
        FavoritesCoordinator::new(
            self.config.owner_id.clone(),
            self.favorites.clone(),
            self.cart.clone(),
            self.reminders.clone(),
            self.config.favorites_reminder_policy(),
            self.config.coalesce_window,
            self.prices(),
        )
    }

    pub fn checkout_coordinator(&self) -> CheckoutCoordinator {
        CheckoutCoordinator::new(
            self.config.owner_id.clone(),
            CheckoutPorts {
                cart: self.cart.clone(),
                orders: self.orders.clone(),
                reminders: self.reminders.clone(),
                drafts: self.drafts.clone(),
            },
            CheckoutSettings {
                pickup_address: self.config.pickup_address.clone(),
                order_status_policy: self.config.order_status_reminder_policy(),
                prices: self.prices(),
                phones: self.phones(),
            },
        )
    }

    pub fn orders_projection(&self) -> OrdersProjection {
        OrdersProjection::new(self.orders.clone(), self.prices())
    }
}
