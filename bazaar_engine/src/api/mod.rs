//! # Bazaar engine public API
//!
//! The `api` module exposes the programmatic API for the marketplace. Each API wraps a backend that implements the
//! traits in [`crate::traits`] it needs, so clients can pick and choose the functionality they want.
//!
//! * [`order_flow_api`] turns carts into orders and drives the fulfilment state machine for sellers, delivery agents,
//!   customers and admins.
//! * [`payment_api`] creates payment-gateway orders and verifies the signatures the gateway hands back.
//! * [`cart_api`], [`catalog_api`] and [`accounts_api`] cover the rest of the storefront.
//! * [`auth_api`] runs OTP login and signup.
//! * [`admin_api`] provides the read-only aggregates and account registration that admins use.
//!
//! # API usage
//!
//! ```rust,ignore
//! use bazaar_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/bazaar.db", 5).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let orders = api.orders_for_user(user_id).await?;
//! ```

pub mod accounts_api;
pub mod admin_api;
pub mod auth_api;
pub mod cart_api;
pub mod catalog_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_api;
