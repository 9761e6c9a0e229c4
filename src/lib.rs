//! Reactive commerce state for a retail shopping app: cart, favorites,
//! checkout and order history kept consistent with remote-backed
//! repositories, plus the engagement reminders they drive.

pub mod coalesce;
pub mod config;
pub mod draft;
pub mod dto;
pub mod error;
pub mod format;
pub mod models;
pub mod reminder;
pub mod repository;
pub mod services;
pub mod snapshot;
pub mod state;
pub mod subscription;
