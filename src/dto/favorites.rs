use serde::Serialize;

use crate::{format::PriceFormatter, models::FavoriteLine};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteRow {
    pub product_id: String,
    pub brand_name: String,
    pub title: String,
    pub image_url: Option<String>,
    pub price: String,
    pub in_cart: bool,
}

impl FavoriteRow {
    pub fn from_line(line: &FavoriteLine, in_cart: bool, prices: &PriceFormatter) -> Self {
        Self {
            product_id: line.product_id.clone(),
            brand_name: line.brand_name.clone(),
            title: line.title.clone(),
            image_url: line.image_url.clone(),
            price: prices.format(line.unit_price),
            in_cart,
        }
    }
}
