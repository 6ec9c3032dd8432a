//! Domain models loaded from the database.
//!
//! Each model converts into its `gobble_core::api` view for responses.

pub mod account;
pub mod address;
pub mod catalogue;
pub mod messaging;
pub mod order;

pub use account::{AdminUser, Courier, Customer, Principal, Restaurant};
pub use address::Address;
pub use catalogue::{Coupon, CouponRejection, MenuItem, Promotion};
pub use messaging::{Message, Notification};
pub use order::{NewOrder, Order, OrderItem};
