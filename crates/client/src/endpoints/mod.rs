//! Typed API operations, one `impl ApiClient` block per area.

mod account;
mod admin;
mod auth;
mod cart;
mod catalogue;
mod courier;
mod orders;
mod restaurant;

pub use orders::PlacedOrder;
