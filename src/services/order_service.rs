use std::sync::Arc;

use futures::{StreamExt, stream::BoxStream};
use tokio::sync::watch;

use crate::{
    dto::orders::{IndexPath, OrderRow, OrderSectionHeader},
    format::PriceFormatter,
    models::{Order, OrderLine},
    repository::OrdersRepository,
    subscription::Subscription,
};

/// Read-only sectioned view over the orders stream: one section per order,
/// one row per order line. Every lookup is bounds-checked.
pub struct OrdersProjection {
    repository: Arc<dyn OrdersRepository>,
    prices: PriceFormatter,
    orders: Arc<watch::Sender<Vec<Order>>>,
    subscription: Subscription,
}

impl OrdersProjection {
    pub fn new(repository: Arc<dyn OrdersRepository>, prices: PriceFormatter) -> Self {
        let (orders, _) = watch::channel(Vec::new());
        let orders = Arc::new(orders);
        let subscription = Subscription::spawn(
            "orders",
            follow_orders(repository.observe(), orders.clone()),
        );
        Self {
            repository,
            prices,
            orders,
            subscription,
        }
    }

    /// Passthrough of the repository stream.
    pub fn observe_orders(&self) -> BoxStream<'static, Vec<Order>> {
        self.repository.observe()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.borrow().is_empty()
    }

    pub fn sections_count(&self) -> usize {
        self.orders.borrow().len()
    }

    /// Row count of a section; zero for a section that does not exist.
    pub fn rows(&self, section: usize) -> usize {
        self.orders
            .borrow()
            .get(section)
            .map_or(0, |order| order.lines.len())
    }

    pub fn order(&self, section: usize) -> Option<Order> {
        self.orders.borrow().get(section).cloned()
    }

    pub fn item(&self, index: IndexPath) -> Option<OrderLine> {
        self.orders
            .borrow()
            .get(index.section)
            .and_then(|order| order.lines.get(index.row))
            .cloned()
    }

    pub fn order_total(&self, section: usize) -> Option<f64> {
        self.orders.borrow().get(section).map(Order::total_price)
    }

    pub fn header(&self, section: usize) -> Option<OrderSectionHeader> {
        self.orders
            .borrow()
            .get(section)
            .map(|order| OrderSectionHeader::from_order(order, &self.prices))
    }

    pub fn row(&self, index: IndexPath) -> Option<OrderRow> {
        self.item(index)
            .map(|line| OrderRow::from_line(&line, &self.prices))
    }

    pub fn is_following(&self) -> bool {
        self.subscription.is_active()
    }
}

async fn follow_orders(
    mut emissions: BoxStream<'static, Vec<Order>>,
    orders: Arc<watch::Sender<Vec<Order>>>,
) {
    while let Some(latest) = emissions.next().await {
        tracing::debug!(orders = latest.len(), "orders snapshot");
        orders.send_replace(latest);
    }
}
