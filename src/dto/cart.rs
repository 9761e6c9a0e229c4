use serde::Serialize;

use crate::{format::PriceFormatter, models::CartLine};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineView {
    pub product_id: String,
    pub brand_name: String,
    pub title: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

impl CartLineView {
    pub fn from_line(line: &CartLine, prices: &PriceFormatter) -> Self {
        Self {
            product_id: line.product_id.clone(),
            brand_name: line.brand_name.clone(),
            title: line.title.clone(),
            image_url: line.image_url.clone(),
            quantity: line.quantity,
            unit_price: prices.format(line.unit_price),
            line_total: prices.format(line.line_total()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSummary {
    pub total_items: i64,
    pub total_price: f64,
    pub total_price_formatted: String,
}
