use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    format::PriceFormatter,
    models::{Order, OrderLine},
};

/// Position of a row inside the sectioned order list: one section per order,
/// one row per order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSectionHeader {
    pub order_id: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub receive_address: String,
    pub total_items: i64,
    pub total_price: String,
}

impl OrderSectionHeader {
    pub fn from_order(order: &Order, prices: &PriceFormatter) -> Self {
        Self {
            order_id: order.id.clone(),
            created_at: order.created_at,
            status: order.status.as_str().to_string(),
            receive_address: order.receive_address.clone(),
            total_items: order.total_items(),
            total_price: prices.format(order.total_price()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRow {
    pub product_id: String,
    pub brand_name: String,
    pub title: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub line_total: String,
}

impl OrderRow {
    pub fn from_line(line: &OrderLine, prices: &PriceFormatter) -> Self {
        Self {
            product_id: line.product_id.clone(),
            brand_name: line.brand_name.clone(),
            title: line.title.clone(),
            image_url: line.image_url.clone(),
            quantity: line.quantity,
            line_total: prices.format(line.line_total()),
        }
    }
}
