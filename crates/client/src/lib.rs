//! Gobble Client - typed async client for the Gobble REST API.
//!
//! Wraps every API area behind methods on [`ApiClient`], keeps the bearer
//! token in a [`TokenStore`], and maps error responses onto
//! [`ClientError`] variants a front-end can act on.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gobble_client::{ApiClient, ClientError, FileTokenStore};
//! use gobble_core::{AccountRole, MenuItemId};
//!
//! # async fn run() -> Result<(), ClientError> {
//! let tokens = Arc::new(FileTokenStore::new("session.json"));
//! let client = ApiClient::new("http://localhost:3000", tokens)?;
//! client.login(AccountRole::Customer, "ada@example.com", "hunter22").await?;
//!
//! match client.add_to_cart(MenuItemId::new(7), 1, false).await {
//!     Err(ClientError::CartConflict { current_restaurant, .. }) => {
//!         println!("Cart holds items from {}", current_restaurant.name);
//!     }
//!     other => {
//!         other?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod checkout;
mod client;
mod endpoints;
mod error;
mod token;
pub mod watch;

pub use checkout::CheckoutAttempt;
pub use client::ApiClient;
pub use endpoints::PlacedOrder;
pub use error::ClientError;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
