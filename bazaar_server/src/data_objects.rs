use std::fmt::Display;

use bazaar_engine::db_types::{Channel, FulfillmentStatus, PaymentMethod, UserAccount};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

//----------------------------------------------   Auth  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRequest {
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpVerification {
    pub phone: String,
    pub code: String,
    /// Only needed the first time a phone number logs in.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserAccount,
    pub new_user: bool,
}

//----------------------------------------------   Catalog  ----------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelQuery {
    #[serde(default)]
    pub channel: Option<Channel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub channel: Option<Channel>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShopOpenParams {
    pub is_open: bool,
}

//----------------------------------------------   Cart  ----------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CartItemParams {
    pub product_id: i64,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuantityParams {
    pub quantity: i64,
}

//----------------------------------------------   Orders  ----------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckoutParams {
    pub channel: Channel,
    pub address_id: i64,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusParams {
    pub status: FulfillmentStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AvailabilityParams {
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

//----------------------------------------------   Payments  ----------------------------------------------------
/// What the client receives from the gateway's checkout once the customer has paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerificationParams {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// The body of a payment webhook. Only `payment.captured` events change anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhook {
    pub event: String,
    pub gateway_order_id: String,
    pub payment_id: String,
}
