pub mod cart;
pub mod checkout;
pub mod favorites;
pub mod orders;
