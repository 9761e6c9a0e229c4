use serde::Serialize;

use crate::models::{DeliveryMethod, PaymentMethod};

/// Everything the checkout screen renders, derived from the draft and the
/// latest cart snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSummary {
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub delivery_address: Option<String>,
    pub receiver_phone: Option<String>,
    pub comment: Option<String>,
    pub total_items: i64,
    pub total_price: String,
    pub can_place_order: bool,
}
