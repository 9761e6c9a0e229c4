use std::{collections::HashSet, sync::Arc, time::Duration};

use futures::{StreamExt, future::ready, stream::BoxStream};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::{cancel_reminder, first_emission, schedule_reminder};
use crate::{
    coalesce::Debounce,
    dto::favorites::FavoriteRow,
    error::AppResult,
    format::PriceFormatter,
    models::{CartLine, FavoriteLine},
    reminder::{ReminderId, ReminderPolicy, ReminderRequest, ReminderScheduler},
    repository::{CartRepository, FavoritesRepository},
    snapshot::LocalSnapshot,
    subscription::Subscription,
};

#[derive(Debug, Clone, Default)]
struct FavoritesState {
    favorites: LocalSnapshot<FavoriteLine>,
    cart_product_ids: HashSet<String>,
    cart_emitted: bool,
    applied_query: String,
}

impl FavoritesState {
    fn is_in_cart(&self, product_id: &str) -> bool {
        self.cart_product_ids.contains(product_id)
    }

    /// `Some(true)` to schedule, `Some(false)` to cancel, `None` until both
    /// sources have emitted.
    fn reminder_decision(&self) -> Option<bool> {
        if !self.favorites.has_emitted() || !self.cart_emitted {
            return None;
        }
        let favorites = self.favorites.lines();
        let has_favorites = !favorites.is_empty();
        let any_in_cart = favorites.iter().any(|f| self.is_in_cart(&f.product_id));
        Some(has_favorites && !any_in_cart)
    }

    fn visible(&self) -> Vec<FavoriteLine> {
        let needle = self.applied_query.trim().to_lowercase();
        self.favorites
            .lines()
            .iter()
            .filter(|line| {
                needle.is_empty()
                    || line.title.to_lowercase().contains(&needle)
                    || line.brand_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }
}

/// Favorites view plus cart membership for each favorite.
///
/// A single background task merges the favorites and cart streams and owns
/// the reminder decision: after the combined state has been quiet for the
/// coalescing window it schedules the favorites reminder when favorites
/// exist and none of them are in the cart, and cancels it otherwise.
pub struct FavoritesCoordinator {
    owner_id: String,
    favorites: Arc<dyn FavoritesRepository>,
    cart: Arc<dyn CartRepository>,
    prices: PriceFormatter,
    state: Arc<watch::Sender<FavoritesState>>,
    query: watch::Sender<String>,
    subscription: Subscription,
}

impl FavoritesCoordinator {
    pub fn new(
        owner_id: impl Into<String>,
        favorites: Arc<dyn FavoritesRepository>,
        cart: Arc<dyn CartRepository>,
        reminders: Arc<dyn ReminderScheduler>,
        reminder_policy: ReminderPolicy,
        coalesce_window: Duration,
        prices: PriceFormatter,
    ) -> Self {
        let owner_id = owner_id.into();
        let (state, _) = watch::channel(FavoritesState::default());
        let state = Arc::new(state);
        let (query, query_rx) = watch::channel(String::new());

        let subscription = Subscription::spawn(
            "favorites",
            coordinate(Coordination {
                owner_id: owner_id.clone(),
                favorites: favorites.observe(),
                cart: cart.observe(),
                query: query_rx,
                state: state.clone(),
                reminders,
                reminder_policy,
                window: coalesce_window,
            }),
        );

        Self {
            owner_id,
            favorites,
            cart,
            prices,
            state,
            query,
            subscription,
        }
    }

    pub fn reminder_id(&self) -> ReminderId {
        ReminderId::favorites(&self.owner_id)
    }

    pub fn observe_favorites(&self) -> BoxStream<'static, Vec<FavoriteLine>> {
        WatchStream::new(self.state.subscribe())
            .filter(|state| ready(state.favorites.has_emitted()))
            .map(|state| state.favorites.lines().to_vec())
            .boxed()
    }

    pub fn favorites(&self) -> Vec<FavoriteLine> {
        self.state.borrow().favorites.lines().to_vec()
    }

    /// Favorites matching the settled search query.
    pub fn visible_favorites(&self) -> Vec<FavoriteLine> {
        self.state.borrow().visible()
    }

    pub fn rows(&self) -> Vec<FavoriteRow> {
        let state = self.state.borrow();
        state
            .visible()
            .iter()
            .map(|line| FavoriteRow::from_line(line, state.is_in_cart(&line.product_id), &self.prices))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.state.borrow().favorites.lines().len()
    }

    pub fn has_favorites(&self) -> bool {
        self.count() > 0
    }

    pub fn is_favorite(&self, product_id: &str) -> bool {
        self.state
            .borrow()
            .favorites
            .lines()
            .iter()
            .any(|line| line.product_id == product_id)
    }

    /// Membership in the latest cart emission.
    pub fn is_in_cart(&self, product_id: &str) -> bool {
        self.state.borrow().is_in_cart(product_id)
    }

    pub fn search_query(&self) -> String {
        self.state.borrow().applied_query.clone()
    }

    pub fn is_following(&self) -> bool {
        self.subscription.is_active()
    }

    /// Takes effect once typing pauses for the coalescing window.
    pub fn set_search_query(&self, query: impl Into<String>) {
        self.query.send_replace(query.into());
    }

    /// Removes from the cart when present, otherwise adds one unit. Never
    /// touches the favorites collection. Membership is read from the first
    /// cart emission onwards.
    pub async fn toggle_cart(&self, product_id: &str) -> AppResult<()> {
        first_emission(&self.state, |state| state.cart_emitted).await;
        if self.is_in_cart(product_id) {
            tracing::debug!(owner_id = %self.owner_id, product_id, "favorite removed from cart");
            self.cart.remove(product_id).await?;
        } else {
            tracing::debug!(owner_id = %self.owner_id, product_id, "favorite added to cart");
            self.cart.add(product_id, 1).await?;
        }
        Ok(())
    }

    /// Add-or-remove is decided by the repository.
    pub async fn toggle_favorite(&self, product_id: &str) -> AppResult<()> {
        self.favorites.toggle(product_id).await?;
        Ok(())
    }

    pub async fn remove(&self, product_id: &str) -> AppResult<()> {
        first_emission(&self.state, |state| state.favorites.has_emitted()).await;
        if !self.is_favorite(product_id) {
            return Ok(());
        }
        self.state.send_modify(|state| {
            state
                .favorites
                .patch(|lines| lines.retain(|l| l.product_id != product_id))
        });
        self.favorites.toggle(product_id).await?;
        Ok(())
    }

    pub async fn clear(&self) -> AppResult<()> {
        self.state
            .send_modify(|state| state.favorites.patch(|lines| lines.clear()));
        self.favorites.clear().await?;
        tracing::info!(owner_id = %self.owner_id, "favorites cleared");
        Ok(())
    }
}

struct Coordination {
    owner_id: String,
    favorites: BoxStream<'static, Vec<FavoriteLine>>,
    cart: BoxStream<'static, Vec<CartLine>>,
    query: watch::Receiver<String>,
    state: Arc<watch::Sender<FavoritesState>>,
    reminders: Arc<dyn ReminderScheduler>,
    reminder_policy: ReminderPolicy,
    window: Duration,
}

async fn coordinate(mut c: Coordination) {
    let reminder_id = ReminderId::favorites(&c.owner_id);
    let mut reminder_gate = Debounce::new(c.window);
    let mut search = Debounce::new(c.window);
    let mut favorites_open = true;
    let mut cart_open = true;
    let mut query_open = true;

    loop {
        tokio::select! {
            next = c.favorites.next(), if favorites_open => match next {
                Some(lines) => {
                    let mut changed = false;
                    c.state.send_modify(|state| {
                        let first = !state.favorites.has_emitted();
                        let previous = state.favorites.reconcile(lines);
                        changed = first || !same_products(&previous, state.favorites.authoritative());
                    });
                    if changed {
                        reminder_gate.touch();
                    }
                }
                None => favorites_open = false,
            },
            next = c.cart.next(), if cart_open => match next {
                Some(lines) => {
                    let ids: HashSet<String> = lines.into_iter().map(|l| l.product_id).collect();
                    let changed = c.state.send_if_modified(|state| {
                        if state.cart_emitted && state.cart_product_ids == ids {
                            return false;
                        }
                        state.cart_emitted = true;
                        state.cart_product_ids = ids;
                        true
                    });
                    if changed {
                        reminder_gate.touch();
                    }
                }
                None => cart_open = false,
            },
            changed = c.query.changed(), if query_open => match changed {
                Ok(()) => search.touch(),
                Err(_) => query_open = false,
            },
            _ = reminder_gate.settled() => {
                let (decision, count) = {
                    let state = c.state.borrow();
                    (state.reminder_decision(), state.favorites.lines().len())
                };
                match decision {
                    Some(true) => {
                        let request = ReminderRequest::new(
                            reminder_id.clone(),
                            "Still thinking it over?",
                            format!("{count} favorite(s) are waiting to be added to your cart"),
                            c.reminder_policy.trigger_now(),
                        )
                        .with_category("favorites")
                        .with_payload(serde_json::json!({
                            "owner_id": c.owner_id,
                            "favorites": count,
                        }));
                        schedule_reminder(c.reminders.as_ref(), request).await;
                    }
                    Some(false) => cancel_reminder(c.reminders.as_ref(), &reminder_id).await,
                    None => {}
                }
            },
            _ = search.settled() => {
                let query = c.query.borrow_and_update().clone();
                tracing::debug!(owner_id = %c.owner_id, query = %query, "favorites filter applied");
                c.state.send_modify(|state| state.applied_query = query);
            },
        }
    }
}

fn same_products(previous: &[FavoriteLine], current: &[FavoriteLine]) -> bool {
    if previous.len() != current.len() {
        return false;
    }
    let previous: HashSet<&str> = previous.iter().map(|l| l.product_id.as_str()).collect();
    current
        .iter()
        .all(|l| previous.contains(l.product_id.as_str()))
}
