//! Ports for the remote-backed cart, favorites and orders collections.
//!
//! Each repository exposes a stream of its whole collection, re-emitted after
//! every change, plus fallible async mutations. The only guarantee is "last
//! write observed": the next emission is the authoritative state.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    error::RepositoryResult,
    models::{CartLine, FavoriteLine, Order},
};

pub mod memory;

pub use memory::{Catalog, InMemoryCartRepository, InMemoryFavoritesRepository, InMemoryOrdersRepository};

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Emits the current lines immediately, then after every change.
    fn observe(&self) -> BoxStream<'static, Vec<CartLine>>;
    async fn add(&self, product_id: &str, by: i32) -> RepositoryResult<()>;
    async fn remove(&self, product_id: &str) -> RepositoryResult<()>;
    async fn set_quantity(&self, product_id: &str, quantity: i32) -> RepositoryResult<()>;
    async fn clear(&self) -> RepositoryResult<()>;
}

#[async_trait]
pub trait FavoritesRepository: Send + Sync {
    fn observe(&self) -> BoxStream<'static, Vec<FavoriteLine>>;
    /// Adds the product if absent, removes it if present.
    async fn toggle(&self, product_id: &str) -> RepositoryResult<()>;
    async fn clear(&self) -> RepositoryResult<()>;
}

#[async_trait]
pub trait OrdersRepository: Send + Sync {
    fn observe(&self) -> BoxStream<'static, Vec<Order>>;
    async fn create(&self, order: Order) -> RepositoryResult<()>;
}
