//! In-process repositories backed by tokio watch channels.
//!
//! Stand-ins for the remote document store: every mutation replaces the
//! collection held by the channel, and every observer receives the new value.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, stream::BoxStream};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::{CartRepository, FavoritesRepository, OrdersRepository};
use crate::{
    error::{RepositoryError, RepositoryResult},
    models::{CartLine, FavoriteLine, Order, Product},
};

/// Read-only product lookup used to turn product ids into lines.
#[derive(Debug, Default)]
pub struct Catalog {
    products: HashMap<String, Product>,
}

impl Catalog {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    fn require(&self, product_id: &str) -> RepositoryResult<&Product> {
        self.get(product_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("product {product_id}")))
    }
}

pub struct InMemoryCartRepository {
    owner_id: String,
    catalog: Arc<Catalog>,
    lines: watch::Sender<Vec<CartLine>>,
}

impl InMemoryCartRepository {
    pub fn new(owner_id: impl Into<String>, catalog: Arc<Catalog>) -> Self {
        let (lines, _) = watch::channel(Vec::new());
        Self {
            owner_id: owner_id.into(),
            catalog,
            lines,
        }
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.borrow().clone()
    }

    /// Replaces the collection as if another device had synced it.
    pub fn apply_remote(&self, lines: Vec<CartLine>) {
        self.lines.send_replace(lines);
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    fn observe(&self) -> BoxStream<'static, Vec<CartLine>> {
        WatchStream::new(self.lines.subscribe()).boxed()
    }

    async fn add(&self, product_id: &str, by: i32) -> RepositoryResult<()> {
        let product = self.catalog.require(product_id)?;
        if !self.lines.borrow().iter().any(|l| l.product_id == product_id) && by <= 0 {
            return Err(RepositoryError::Rejected(
                "quantity must be greater than 0".to_string(),
            ));
        }

        self.lines.send_modify(|lines| {
            match lines.iter().position(|l| l.product_id == product_id) {
                Some(index) => {
                    let quantity = lines[index].quantity + by;
                    if quantity <= 0 {
                        lines.remove(index);
                    } else {
                        lines[index].quantity = quantity;
                        lines[index].updated_at = Utc::now();
                    }
                }
                None => lines.push(CartLine::from_product(&self.owner_id, product, by)),
            }
        });
        Ok(())
    }

    async fn remove(&self, product_id: &str) -> RepositoryResult<()> {
        let removed = self.lines.send_if_modified(|lines| {
            let before = lines.len();
            lines.retain(|l| l.product_id != product_id);
            lines.len() != before
        });
        if !removed {
            return Err(RepositoryError::NotFound(format!("cart line {product_id}")));
        }
        Ok(())
    }

    async fn set_quantity(&self, product_id: &str, quantity: i32) -> RepositoryResult<()> {
        if quantity <= 0 {
            return Err(RepositoryError::Rejected(
                "quantity must be greater than 0".to_string(),
            ));
        }
        let updated = self.lines.send_if_modified(|lines| {
            match lines.iter_mut().find(|l| l.product_id == product_id) {
                Some(line) => {
                    line.quantity = quantity;
                    line.updated_at = Utc::now();
                    true
                }
                None => false,
            }
        });
        if !updated {
            return Err(RepositoryError::NotFound(format!("cart line {product_id}")));
        }
        Ok(())
    }

    async fn clear(&self) -> RepositoryResult<()> {
        self.lines.send_replace(Vec::new());
        Ok(())
    }
}

pub struct InMemoryFavoritesRepository {
    owner_id: String,
    catalog: Arc<Catalog>,
    lines: watch::Sender<Vec<FavoriteLine>>,
}

impl InMemoryFavoritesRepository {
    pub fn new(owner_id: impl Into<String>, catalog: Arc<Catalog>) -> Self {
        let (lines, _) = watch::channel(Vec::new());
        Self {
            owner_id: owner_id.into(),
            catalog,
            lines,
        }
    }

    pub fn lines(&self) -> Vec<FavoriteLine> {
        self.lines.borrow().clone()
    }

    pub fn apply_remote(&self, lines: Vec<FavoriteLine>) {
        self.lines.send_replace(lines);
    }
}

#[async_trait]
impl FavoritesRepository for InMemoryFavoritesRepository {
    fn observe(&self) -> BoxStream<'static, Vec<FavoriteLine>> {
        WatchStream::new(self.lines.subscribe()).boxed()
    }

    async fn toggle(&self, product_id: &str) -> RepositoryResult<()> {
        let present = self.lines.borrow().iter().any(|l| l.product_id == product_id);
        if present {
            self.lines
                .send_modify(|lines| lines.retain(|l| l.product_id != product_id));
        } else {
            let product = self.catalog.require(product_id)?;
            self.lines
                .send_modify(|lines| lines.push(FavoriteLine::from_product(&self.owner_id, product)));
        }
        Ok(())
    }

    async fn clear(&self) -> RepositoryResult<()> {
        self.lines.send_replace(Vec::new());
        Ok(())
    }
}

pub struct InMemoryOrdersRepository {
    orders: watch::Sender<Vec<Order>>,
}

impl Default for InMemoryOrdersRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrdersRepository {
    pub fn new() -> Self {
        let (orders, _) = watch::channel(Vec::new());
        Self { orders }
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.borrow().clone()
    }
}

#[async_trait]
impl OrdersRepository for InMemoryOrdersRepository {
    fn observe(&self) -> BoxStream<'static, Vec<Order>> {
        WatchStream::new(self.orders.subscribe()).boxed()
    }

    /// Newest orders are listed first.
    async fn create(&self, order: Order) -> RepositoryResult<()> {
        if self.orders.borrow().iter().any(|o| o.id == order.id) {
            return Err(RepositoryError::Rejected(format!(
                "order {} already exists",
                order.id
            )));
        }
        self.orders.send_modify(|orders| orders.insert(0, order));
        Ok(())
    }
}
