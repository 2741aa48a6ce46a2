//! Bazaar Engine
//!
//! The Bazaar engine is the core of a food and grocery delivery marketplace. Customers fill a cart per channel and
//! place orders that may span several sellers. Sellers confirm their own items, delivery agents pick the order up and
//! deliver it, and every delivery credits the sellers' sales history.
//!
//! The library is divided into these sections:
//! 1. Domain types ([`mod@db_types`]) and the fulfilment state machine ([`mod@fulfillment`]). The state machine is
//!    pure: it turns an order and a requested [`fulfillment::StatusChange`] into a [`fulfillment::TransitionPlan`],
//!    or an error, without touching the database.
//! 2. The backend contracts ([`mod@traits`]) and the SQLite backend that implements them ([`SqliteDatabase`]). Backends
//!    apply transition plans atomically.
//! 3. The public API ([`mod@api`]). This is what the HTTP server talks to.
//!
//! The engine also emits events ([`mod@events`]) when orders are placed, change status, or are paid for, so that
//! callers can hook in logging, push notifications and the like.
mod db;

pub mod api;
pub mod checkout;
pub mod db_types;
pub mod events;
pub mod fulfillment;
pub mod helpers;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    accounts_api::AccountApi,
    admin_api::AdminApi,
    auth_api::{AuthApi, LoginOutcome},
    cart_api::CartApi,
    catalog_api::CatalogApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_api::PaymentApi,
};
#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
