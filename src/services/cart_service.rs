use std::sync::Arc;

use futures::{StreamExt, future::ready, stream::BoxStream};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::{cancel_reminder, first_emission, schedule_reminder};
use crate::{
    dto::cart::{CartLineView, CartSummary},
    error::AppResult,
    format::PriceFormatter,
    models::CartLine,
    reminder::{ReminderId, ReminderPolicy, ReminderRequest, ReminderScheduler},
    repository::CartRepository,
    snapshot::LocalSnapshot,
    subscription::Subscription,
};

type CartState = watch::Sender<LocalSnapshot<CartLine>>;

/// Quantities relayed to the repository never drop below one.
pub fn clamp_quantity(quantity: i32) -> i32 {
    quantity.max(1)
}

pub fn total_items(lines: &[CartLine]) -> i64 {
    lines.iter().map(|line| i64::from(line.quantity)).sum()
}

pub fn total_price(lines: &[CartLine]) -> f64 {
    lines.iter().map(CartLine::line_total).sum()
}

/// Owns the derived cart view for one owner and relays cart intents.
///
/// Must be created inside a tokio runtime: construction spawns the task that
/// follows the repository stream. Dropping the coordinator stops that task.
pub struct CartCoordinator {
    owner_id: String,
    repository: Arc<dyn CartRepository>,
    reminders: Arc<dyn ReminderScheduler>,
    reminder_policy: ReminderPolicy,
    prices: PriceFormatter,
    state: Arc<CartState>,
    subscription: Subscription,
}

impl CartCoordinator {
    pub fn new(
        owner_id: impl Into<String>,
        repository: Arc<dyn CartRepository>,
        reminders: Arc<dyn ReminderScheduler>,
        reminder_policy: ReminderPolicy,
        prices: PriceFormatter,
    ) -> Self {
        let owner_id = owner_id.into();
        let (state, _) = watch::channel(LocalSnapshot::default());
        let state = Arc::new(state);
        let subscription = Subscription::spawn(
            "cart",
            follow_cart(
                owner_id.clone(),
                repository.observe(),
                state.clone(),
                reminders.clone(),
            ),
        );

        Self {
            owner_id,
            repository,
            reminders,
            reminder_policy,
            prices,
            state,
            subscription,
        }
    }

    pub fn reminder_id(&self) -> ReminderId {
        ReminderId::cart(&self.owner_id)
    }

    /// Lines as the repository orders them, starting with the current view.
    pub fn observe_lines(&self) -> BoxStream<'static, Vec<CartLine>> {
        WatchStream::new(self.state.subscribe())
            .filter(|snapshot| ready(snapshot.has_emitted()))
            .map(|snapshot| snapshot.lines().to_vec())
            .boxed()
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.state.borrow().lines().to_vec()
    }

    pub fn line(&self, product_id: &str) -> Option<CartLine> {
        self.state
            .borrow()
            .lines()
            .iter()
            .find(|line| line.product_id == product_id)
            .cloned()
    }

    pub fn quantity(&self, product_id: &str) -> Option<i32> {
        self.line(product_id).map(|line| line.quantity)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.state
            .borrow()
            .lines()
            .iter()
            .any(|line| line.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().lines().is_empty()
    }

    pub fn total_items(&self) -> i64 {
        total_items(self.state.borrow().lines())
    }

    pub fn total_price(&self) -> f64 {
        total_price(self.state.borrow().lines())
    }

    pub fn formatted_total_price(&self) -> String {
        self.prices.format(self.total_price())
    }

    pub fn line_views(&self) -> Vec<CartLineView> {
        self.state
            .borrow()
            .lines()
            .iter()
            .map(|line| CartLineView::from_line(line, &self.prices))
            .collect()
    }

    pub fn summary(&self) -> CartSummary {
        let total_price = self.total_price();
        CartSummary {
            total_items: self.total_items(),
            total_price,
            total_price_formatted: self.prices.format(total_price),
        }
    }

    pub fn is_following(&self) -> bool {
        self.subscription.is_active()
    }

    /// Clamps to at least one, shows the value locally, then relays it.
    pub async fn set_quantity(&self, product_id: &str, quantity: i32) -> AppResult<()> {
        let quantity = clamp_quantity(quantity);
        self.state.send_modify(|snapshot| {
            snapshot.patch(|lines| {
                if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
                    line.quantity = quantity;
                }
            })
        });
        tracing::debug!(owner_id = %self.owner_id, product_id, quantity, "cart quantity update");

        self.repository.set_quantity(product_id, quantity).await?;
        Ok(())
    }

    pub async fn increase(&self, product_id: &str) -> AppResult<()> {
        first_emission(&self.state, LocalSnapshot::has_emitted).await;
        let Some(current) = self.quantity(product_id) else {
            tracing::debug!(product_id, "increase ignored, line not in cart");
            return Ok(());
        };
        self.set_quantity(product_id, current.saturating_add(1)).await
    }

    /// A line at one stays at one; the clamped value is still relayed.
    pub async fn decrease(&self, product_id: &str) -> AppResult<()> {
        first_emission(&self.state, LocalSnapshot::has_emitted).await;
        let Some(current) = self.quantity(product_id) else {
            tracing::debug!(product_id, "decrease ignored, line not in cart");
            return Ok(());
        };
        self.set_quantity(product_id, current.saturating_sub(1)).await
    }

    pub async fn remove(&self, product_id: &str) -> AppResult<()> {
        self.state.send_modify(|snapshot| {
            snapshot.patch(|lines| lines.retain(|l| l.product_id != product_id))
        });
        tracing::debug!(owner_id = %self.owner_id, product_id, "cart line removed");

        self.repository.remove(product_id).await?;
        Ok(())
    }

    pub async fn clear(&self) -> AppResult<()> {
        self.state
            .send_modify(|snapshot| snapshot.patch(|lines| lines.clear()));
        self.repository.clear().await?;
        cancel_reminder(self.reminders.as_ref(), &self.reminder_id()).await;
        tracing::info!(owner_id = %self.owner_id, "cart cleared");
        Ok(())
    }

    /// Called when the cart screen goes away: nudge later if anything is
    /// left in the cart, otherwise drop any pending nudge.
    pub async fn schedule_reminder_for_leaving_screen(&self) {
        let total_items = self.total_items();
        if total_items == 0 {
            cancel_reminder(self.reminders.as_ref(), &self.reminder_id()).await;
            return;
        }

        let request = ReminderRequest::new(
            self.reminder_id(),
            "Your cart is waiting",
            format!(
                "{total_items} item(s) for {} are still in your cart",
                self.formatted_total_price()
            ),
            self.reminder_policy.trigger_now(),
        )
        .with_category("cart")
        .with_payload(serde_json::json!({
            "owner_id": self.owner_id,
            "total_items": total_items,
        }));
        schedule_reminder(self.reminders.as_ref(), request).await;

        // the cart may have emptied while the schedule was in flight
        if self.total_items() == 0 {
            tracing::debug!(owner_id = %self.owner_id, "cart emptied during scheduling");
            cancel_reminder(self.reminders.as_ref(), &self.reminder_id()).await;
        }
    }
}

async fn follow_cart(
    owner_id: String,
    mut emissions: BoxStream<'static, Vec<CartLine>>,
    state: Arc<CartState>,
    reminders: Arc<dyn ReminderScheduler>,
) {
    let reminder_id = ReminderId::cart(&owner_id);
    let mut previous_total: Option<i64> = None;

    while let Some(lines) = emissions.next().await {
        let total = total_items(&lines);
        tracing::debug!(owner_id = %owner_id, lines = lines.len(), total_items = total, "cart snapshot");
        state.send_modify(|snapshot| {
            snapshot.reconcile(lines);
        });

        // empty from any cause, including a sync from another device
        if total == 0 && previous_total != Some(0) {
            cancel_reminder(reminders.as_ref(), &reminder_id).await;
        }
        previous_total = Some(total);
    }
    tracing::debug!(owner_id = %owner_id, "cart stream ended");
}
