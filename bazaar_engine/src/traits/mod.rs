//! # Backend contracts
//!
//! The traits in this module define what a database backend must provide to run the marketplace. The public APIs in
//! [`crate::api`] are generic over these traits, so a backend never needs to know about HTTP, and the HTTP layer never
//! needs to know about SQL.
//!
//! * [`OrderManagement`] places orders and applies fulfilment [`crate::fulfillment::TransitionPlan`]s atomically.
//! * [`CartManagement`] keeps the two channel-scoped carts of every user.
//! * [`CatalogManagement`] manages shops and products.
//! * [`AccountManagement`] manages users, address books, delivery agents, notification inboxes and sales history.
//! * [`AuthManagement`] stores one-time passwords.
//! * [`ReportingManagement`] provides the aggregated views used by admins.
//!
//! [`PaymentGateway`] and [`OtpSender`] are the two external collaborators. Only local implementations ship with the
//! engine.
mod account_management;
mod auth_management;
mod cart_management;
mod catalog_management;
mod errors;
mod order_management;
mod otp_sender;
mod payment_gateway;
mod reporting;

pub use account_management::AccountManagement;
pub use auth_management::AuthManagement;
pub use cart_management::CartManagement;
pub use catalog_management::CatalogManagement;
pub use errors::{AccountApiError, AuthApiError, CatalogError, OrderFlowError};
pub use order_management::OrderManagement;
pub use otp_sender::{LogOtpSender, OtpSender};
pub use payment_gateway::{GatewayOrder, LocalPaymentGateway, PaymentGateway};
pub use reporting::ReportingManagement;
