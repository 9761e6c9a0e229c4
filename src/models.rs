use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry the repositories resolve product ids against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub brand_name: String,
    pub title: String,
    pub unit_price: f64,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub owner_id: String,
    pub product_id: String,
    pub brand_name: String,
    pub title: String,
    pub unit_price: f64,
    pub image_url: Option<String>,
    /// Always at least 1; a line that would drop to 0 is removed instead.
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    pub fn from_product(owner_id: &str, product: &Product, quantity: i32) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            product_id: product.id.clone(),
            brand_name: product.brand_name.clone(),
            title: product.title.clone(),
            unit_price: product.unit_price,
            image_url: product.image_url.clone(),
            quantity: quantity.max(1),
            updated_at: Utc::now(),
        }
    }

    pub fn line_total(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteLine {
    pub owner_id: String,
    pub product_id: String,
    pub brand_name: String,
    pub title: String,
    pub unit_price: f64,
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FavoriteLine {
    pub fn from_product(owner_id: &str, product: &Product) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            product_id: product.id.clone(),
            brand_name: product.brand_name.clone(),
            title: product.title.clone(),
            unit_price: product.unit_price,
            image_url: product.image_url.clone(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    #[default]
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
}

/// Owned by the backend after creation; this crate only ever writes `Created`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Created,
    Confirmed,
    Assembling,
    InDelivery,
    ReadyForPickup,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Assembling => "assembling",
            OrderStatus::InDelivery => "in_delivery",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Checkout form state persisted between launches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub delivery_method: DeliveryMethod,
    pub delivery_address: Option<String>,
    pub receiver_phone_e164: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Product fields copied out of a cart line at placement time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub brand_name: String,
    pub title: String,
    pub unit_price: f64,
    pub image_url: Option<String>,
    pub quantity: i32,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            brand_name: line.brand_name.clone(),
            title: line.title.clone(),
            unit_price: line.unit_price,
            image_url: line.image_url.clone(),
            quantity: line.quantity,
        }
    }
}

impl OrderLine {
    pub fn line_total(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub receive_address: String,
    pub payment_method: PaymentMethod,
    pub comment: Option<String>,
    pub receiver_phone_e164: Option<String>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Builds a new order from a cart snapshot. The lines are deep copies, so
    /// later catalog or cart changes never reach a placed order.
    pub fn from_cart(
        owner_id: &str,
        lines: &[CartLine],
        receive_address: String,
        draft: &OrderDraft,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
            status: OrderStatus::Created,
            receive_address,
            payment_method: draft.payment_method,
            comment: draft.comment.clone(),
            receiver_phone_e164: draft.receiver_phone_e164.clone(),
            lines: lines.iter().map(OrderLine::from).collect(),
        }
    }

    pub fn total_items(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    pub fn total_price(&self) -> f64 {
        self.lines.iter().map(OrderLine::line_total).sum()
    }
}
