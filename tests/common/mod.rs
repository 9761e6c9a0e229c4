#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use futures::stream::BoxStream;

use commerce_coordinator::{
    draft::{DraftStorage, InMemoryDraftStorage},
    error::{ReminderError, ReminderResult, RepositoryError, RepositoryResult},
    format::{PhoneFormatter, PriceFormatter},
    models::{CartLine, FavoriteLine, Order, Product},
    reminder::{ReminderId, ReminderPolicy, ReminderRequest, ReminderScheduler},
    repository::{
        CartRepository, Catalog, FavoritesRepository, InMemoryCartRepository,
        InMemoryFavoritesRepository, InMemoryOrdersRepository, OrdersRepository,
    },
    services::{
        CartCoordinator, CheckoutCoordinator, FavoritesCoordinator, OrdersProjection,
        checkout_service::{CheckoutPorts, CheckoutSettings},
    },
};

pub const OWNER: &str = "owner-1";
pub const WINDOW: Duration = Duration::from_millis(200);

/// Ordered log of every port call, shared by all recording doubles.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Fails the named operations while they are in the set.
#[derive(Default)]
pub struct Failures(Mutex<HashSet<&'static str>>);

impl Failures {
    pub fn fail(&self, op: &'static str) {
        self.0.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.0.lock().unwrap().remove(op);
    }

    fn check(&self, op: &'static str) -> RepositoryResult<()> {
        if self.0.lock().unwrap().contains(op) {
            return Err(RepositoryError::Unavailable(format!("{op} offline")));
        }
        Ok(())
    }
}

pub struct RecordingCart {
    pub inner: InMemoryCartRepository,
    pub journal: Journal,
    pub failures: Failures,
}

#[async_trait]
impl CartRepository for RecordingCart {
    fn observe(&self) -> BoxStream<'static, Vec<CartLine>> {
        self.inner.observe()
    }

    async fn add(&self, product_id: &str, by: i32) -> RepositoryResult<()> {
        self.journal.push(format!("cart.add:{product_id}:{by}"));
        self.failures.check("cart.add")?;
        self.inner.add(product_id, by).await
    }

    async fn remove(&self, product_id: &str) -> RepositoryResult<()> {
        self.journal.push(format!("cart.remove:{product_id}"));
        self.failures.check("cart.remove")?;
        self.inner.remove(product_id).await
    }

    async fn set_quantity(&self, product_id: &str, quantity: i32) -> RepositoryResult<()> {
        self.journal.push(format!("cart.set_quantity:{product_id}:{quantity}"));
        self.failures.check("cart.set_quantity")?;
        self.inner.set_quantity(product_id, quantity).await
    }

    async fn clear(&self) -> RepositoryResult<()> {
        self.journal.push("cart.clear");
        self.failures.check("cart.clear")?;
        self.inner.clear().await
    }
}

pub struct RecordingFavorites {
    pub inner: InMemoryFavoritesRepository,
    pub journal: Journal,
}

#[async_trait]
impl FavoritesRepository for RecordingFavorites {
    fn observe(&self) -> BoxStream<'static, Vec<FavoriteLine>> {
        self.inner.observe()
    }

    async fn toggle(&self, product_id: &str) -> RepositoryResult<()> {
        self.journal.push(format!("favorites.toggle:{product_id}"));
        self.inner.toggle(product_id).await
    }

    async fn clear(&self) -> RepositoryResult<()> {
        self.journal.push("favorites.clear");
        self.inner.clear().await
    }
}

pub struct RecordingOrders {
    pub inner: InMemoryOrdersRepository,
    pub journal: Journal,
    pub failures: Failures,
    /// Held by a test to keep `create` in flight.
    pub gate: tokio::sync::Mutex<()>,
}

#[async_trait]
impl OrdersRepository for RecordingOrders {
    fn observe(&self) -> BoxStream<'static, Vec<Order>> {
        self.inner.observe()
    }

    async fn create(&self, order: Order) -> RepositoryResult<()> {
        self.journal.push(format!("orders.create:{}", order.id));
        let _open = self.gate.lock().await;
        self.failures.check("orders.create")?;
        self.inner.create(order).await
    }
}

/// Keeps one pending request per id, like the real port.
#[derive(Default)]
pub struct RecordingReminders {
    pub journal: Journal,
    pending: Mutex<HashMap<ReminderId, ReminderRequest>>,
    failing: Mutex<bool>,
    /// Held by a test to keep `schedule` in flight.
    pub gate: tokio::sync::Mutex<()>,
}

impl RecordingReminders {
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn is_pending(&self, id: &ReminderId) -> bool {
        self.pending.lock().unwrap().contains_key(id)
    }

    pub fn pending(&self, id: &ReminderId) -> Option<ReminderRequest> {
        self.pending.lock().unwrap().get(id).cloned()
    }

    pub fn schedules(&self, id: &ReminderId) -> usize {
        self.journal.count(&format!("reminders.schedule:{id}"))
    }

    pub fn cancels(&self, id: &ReminderId) -> usize {
        self.journal.count(&format!("reminders.cancel:{id}"))
    }
}

#[async_trait]
impl ReminderScheduler for RecordingReminders {
    async fn schedule(&self, request: ReminderRequest) -> ReminderResult<ReminderId> {
        self.journal.push(format!("reminders.schedule:{}", request.id));
        let _open = self.gate.lock().await;
        if *self.failing.lock().unwrap() {
            return Err(ReminderError::Unavailable("notifications disabled".into()));
        }
        let id = request.id.clone();
        self.pending.lock().unwrap().insert(id.clone(), request);
        Ok(id)
    }

    async fn cancel(&self, ids: &[ReminderId]) -> ReminderResult<()> {
        for id in ids {
            self.journal.push(format!("reminders.cancel:{id}"));
        }
        if *self.failing.lock().unwrap() {
            return Err(ReminderError::Unavailable("notifications disabled".into()));
        }
        let mut pending = self.pending.lock().unwrap();
        for id in ids {
            pending.remove(id);
        }
        Ok(())
    }
}

pub fn product(id: &str, brand: &str, title: &str, price: f64) -> Product {
    Product {
        id: id.into(),
        brand_name: brand.into(),
        title: title.into(),
        unit_price: price,
        image_url: Some(format!("https://img.example/{id}.jpg")),
    }
}

pub struct Fixture {
    pub journal: Journal,
    pub cart: Arc<RecordingCart>,
    pub favorites: Arc<RecordingFavorites>,
    pub orders: Arc<RecordingOrders>,
    pub reminders: Arc<RecordingReminders>,
    pub drafts: Arc<dyn DraftStorage>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_drafts(Arc::new(InMemoryDraftStorage::new()))
    }

    pub fn with_drafts(drafts: Arc<dyn DraftStorage>) -> Self {
        let catalog = Arc::new(Catalog::new([
            product("p1", "Acme", "Widget", 10.0),
            product("p2", "Globex", "Gadget", 50.0),
            product("p3", "Initech", "Stapler", 25.0),
        ]));
        let journal = Journal::default();
        Self {
            cart: Arc::new(RecordingCart {
                inner: InMemoryCartRepository::new(OWNER, catalog.clone()),
                journal: journal.clone(),
                failures: Failures::default(),
            }),
            favorites: Arc::new(RecordingFavorites {
                inner: InMemoryFavoritesRepository::new(OWNER, catalog),
                journal: journal.clone(),
            }),
            orders: Arc::new(RecordingOrders {
                inner: InMemoryOrdersRepository::new(),
                journal: journal.clone(),
                failures: Failures::default(),
                gate: tokio::sync::Mutex::new(()),
            }),
            reminders: Arc::new(RecordingReminders {
                journal: journal.clone(),
                ..RecordingReminders::default()
            }),
            drafts,
            journal,
        }
    }

    pub fn cart_coordinator(&self) -> CartCoordinator {
        CartCoordinator::new(
            OWNER,
            self.cart.clone(),
            self.reminders.clone(),
            ReminderPolicy::After(Duration::from_secs(60)),
            PriceFormatter::default(),
        )
    }

    pub fn favorites_coordinator(&self) -> FavoritesCoordinator {
        FavoritesCoordinator::new(
            OWNER,
            self.favorites.clone(),
            self.cart.clone(),
            self.reminders.clone(),
            ReminderPolicy::After(Duration::from_secs(60)),
            WINDOW,
            PriceFormatter::default(),
        )
    }

    pub fn checkout_coordinator(&self) -> CheckoutCoordinator {
        CheckoutCoordinator::new(
            OWNER,
            CheckoutPorts {
                cart: self.cart.clone(),
                orders: self.orders.clone(),
                reminders: self.reminders.clone(),
                drafts: self.drafts.clone(),
            },
            CheckoutSettings {
                pickup_address: "Store #1".into(),
                order_status_policy: ReminderPolicy::After(Duration::from_secs(3600)),
                prices: PriceFormatter::default(),
                phones: PhoneFormatter::default(),
            },
        )
    }

    pub fn orders_projection(&self) -> OrdersProjection {
        OrdersProjection::new(self.orders.clone(), PriceFormatter::default())
    }

    /// Fills the cart directly through the repository, bypassing the journal.
    pub async fn seed_cart(&self, lines: &[(&str, i32)]) {
        for (product_id, quantity) in lines {
            self.cart.inner.add(product_id, *quantity).await.unwrap();
        }
    }

    pub async fn seed_favorites(&self, product_ids: &[&str]) {
        for product_id in product_ids {
            self.favorites.inner.toggle(product_id).await.unwrap();
        }
    }
}

/// Lets spawned coordinator tasks drain their streams. Tests run on a paused
/// clock, so the sleep only returns once every task is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Waits past the coalescing window.
pub async fn settle_window() {
    tokio::time::sleep(WINDOW + Duration::from_millis(50)).await;
}
