use thiserror::Error;

use crate::db_types::{FulfillmentStatus, OrderCode, MAX_CART_QUANTITY, MAX_PRODUCT_PRICE};

/// Errors from the order, cart, payment and delivery flows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderCode),
    #[error("Order code {0} is already in use")]
    DuplicateOrderCode(OrderCode),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product is not available: {0}")]
    ProductUnavailable(String),
    #[error("Shop is closed: {0}")]
    ShopClosed(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Address {0} does not exist")]
    AddressNotFound(i64),
    #[error("Item {0} does not exist in this order")]
    ItemNotFound(i64),
    #[error("Product {product_id} belongs to the {found} channel, not {expected}")]
    ChannelMismatch { product_id: i64, expected: String, found: String },
    #[error("Quantity must be between 1 and {max}, but was {0}", max = MAX_CART_QUANTITY)]
    InvalidQuantity(i64),
    #[error("The order total is too large")]
    AmountTooLarge,
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: FulfillmentStatus, to: FulfillmentStatus },
    #[error("Not all items are ready. {0}")]
    ItemsNotReady(String),
    #[error("Order {0} has already been assigned to a delivery agent")]
    AlreadyAssigned(OrderCode),
    #[error("Order {0} is not ready to be handed to a delivery agent")]
    NotDeliverable(OrderCode),
    #[error("You are not permitted to do that. {0}")]
    Forbidden(String),
    #[error("Order cannot be paid for. {0}")]
    NotPayable(String),
    #[error("Payment has not been initiated for order {0}")]
    PaymentNotInitiated(OrderCode),
    #[error("Payment signature is invalid")]
    InvalidPaymentSignature,
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("The requested change would not modify the order")]
    NoOp,
}

/// Errors from shop and product management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Shop does not exist")]
    ShopNotFound,
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Seller {0} already has a shop")]
    ShopAlreadyExists(i64),
    #[error("Price must be positive and no more than {max}", max = MAX_PRODUCT_PRICE)]
    InvalidPrice,
    #[error("Invalid catalog entry: {0}")]
    ValidationError(String),
    #[error("You do not own this {0}")]
    NotOwner(String),
}

/// Errors from user accounts, address books, notifications and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Address {0} does not exist")]
    AddressNotFound(i64),
    #[error("Notification {0} does not exist")]
    NotificationNotFound(i64),
    #[error("Phone number {0} is already registered")]
    AlreadyRegistered(String),
    #[error("User {0} is not a {1}")]
    WrongRole(i64, String),
    #[error("Invalid account data: {0}")]
    ValidationError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

/// Errors from OTP-based login and signup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),
    #[error("No one-time password was requested for this phone number")]
    OtpNotRequested,
    #[error("The one-time password has expired")]
    OtpExpired,
    #[error("The one-time password is incorrect")]
    OtpInvalid,
    #[error("Too many incorrect attempts. Request a new one-time password")]
    TooManyAttempts,
    #[error("A name is required to sign up")]
    NameRequired,
    #[error("Could not deliver the one-time password. {0}")]
    DeliveryFailed(String),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::Error> for AuthApiError {
    fn from(e: sqlx::Error) -> Self {
        AuthApiError::DatabaseError(e.to_string())
    }
}

impl From<AccountApiError> for OrderFlowError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::AddressNotFound(id) => OrderFlowError::AddressNotFound(id),
            AccountApiError::UserNotFound(id) => OrderFlowError::Forbidden(format!("User {id} does not exist")),
            e => OrderFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl From<AccountApiError> for AuthApiError {
    fn from(e: AccountApiError) -> Self {
        AuthApiError::DatabaseError(e.to_string())
    }
}
