//! Gobble Core - Shared types and marketplace rules.
//!
//! This crate provides the types and pure business rules used across all
//! Gobble components:
//! - `server` - REST API for customers, restaurants, couriers, and admins
//! - `client` - Typed REST client used by front-ends and tooling
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. The server enforces these rules authoritatively and the
//! client can evaluate them locally before a round-trip.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, coordinates, and statuses
//! - [`cart`] - Single-restaurant cart and its merge rule
//! - [`pricing`] - Promotion/coupon exclusivity and order totals
//! - [`checkout`] - Checkout validation (empty cart, address, delivery range)
//! - [`dispatch`] - Courier selection for ready orders
//! - [`moderation`] - Ban durations and ban activity
//! - [`listing`] - Pagination and sorting for list endpoints
//! - [`api`] - Request/response bodies shared by server and client

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod dispatch;
pub mod listing;
pub mod moderation;
pub mod pricing;
pub mod types;

pub use types::*;
