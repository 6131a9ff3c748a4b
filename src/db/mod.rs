//! Database access layer (PostgreSQL via sqlx)

pub mod analytics;
pub mod carts;
pub mod categories;
pub mod coupons;
pub mod discounts;
pub mod email_verifications;
pub mod messages;
pub mod orders;
pub mod payments;
pub mod products;
pub mod refresh_tokens;
pub mod reviews;
pub mod users;
pub mod webhook_events;
