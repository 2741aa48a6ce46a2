//! # Bazaar server
//! The HTTP front end of the Bazaar delivery marketplace. It is responsible for:
//! * Logging users in with one-time passwords and issuing JWT access tokens.
//! * Serving the public catalogue of shops and products.
//! * Exposing the cart, checkout, fulfilment, payment and admin flows of the [`bazaar_engine`] to the roles that may
//!   use them.
//! * Receiving signed payment webhooks from the payment gateway.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/auth/otp` and `/auth/verify`: OTP login.
//! * `/shops/..` and `/products/..`: The public catalogue.
//! * `/webhook/payment`: Payment gateway callbacks. Requests must carry a valid HMAC signature.
//! * `/api/..`: Everything else. Requests must carry a bearer token. See [routes](routes/index.html).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
