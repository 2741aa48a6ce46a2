use std::{collections::BTreeSet, fmt::Display, str::FromStr};

pub use bazaar_common::Money;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Someone who browses shops and places orders.
    Customer,
    /// Owns a shop, its products, and the order items for those products.
    Seller,
    /// Picks up and delivers orders, and collects cash for cash-on-delivery orders.
    DeliveryBoy,
    /// Can see and override everything.
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "Customer"),
            Role::Seller => write!(f, "Seller"),
            Role::DeliveryBoy => write!(f, "DeliveryBoy"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" | "customer" => Ok(Self::Customer),
            "Seller" | "seller" => Ok(Self::Seller),
            "DeliveryBoy" | "delivery_boy" => Ok(Self::DeliveryBoy),
            "Admin" | "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------       Channel        ---------------------------------------------------------
/// The marketplace runs two storefronts side by side. Every shop, product, cart and order belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Food,
    Grocery,
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Food => write!(f, "Food"),
            Channel::Grocery => write!(f, "Grocery"),
        }
    }
}

impl FromStr for Channel {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "food" => Ok(Self::Food),
            "grocery" => Ok(Self::Grocery),
            _ => Err(ConversionError(format!("Invalid channel: {s}"))),
        }
    }
}

//--------------------------------------     UserAccount      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUserAccount {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub role: Role,
}

impl NewUserAccount {
    pub fn customer<S: Into<String>>(name: S, phone: S) -> Self {
        Self { name: name.into(), phone: phone.into(), email: None, role: Role::Customer }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

//--------------------------------------       Address        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub label: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    pub label: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
    #[serde(default)]
    pub is_default: bool,
}

/// The copy of a shipping address that is frozen into an order when it is placed. Editing or deleting the address
/// book entry afterwards has no effect on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub label: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
}

impl From<&Address> for AddressSnapshot {
    fn from(a: &Address) -> Self {
        Self {
            label: a.label.clone(),
            line1: a.line1.clone(),
            line2: a.line2.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            pincode: a.pincode.clone(),
            phone: a.phone.clone(),
        }
    }
}

//--------------------------------------         Shop         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Shop {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub channel: Channel,
    pub address: String,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShop {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub channel: Channel,
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
}

impl ShopUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.address.is_none()
    }
}

//--------------------------------------       Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub shop_id: i64,
    pub seller_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub channel: Channel,
    pub price: Money,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub is_available: Option<bool>,
    pub image_url: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() &&
            self.description.is_none() &&
            self.price.is_none() &&
            self.is_available.is_none() &&
            self.image_url.is_none()
    }
}

//--------------------------------------         Cart         ---------------------------------------------------------
/// A raw cart row: `quantity` units of `product_id` in the user's cart for `channel`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub channel: Channel,
    pub product_id: i64,
    pub quantity: i64,
}

/// The most units of one product that a cart line or order item may hold.
pub const MAX_CART_QUANTITY: i64 = 99;
/// The highest price a product may be listed at.
pub const MAX_PRODUCT_PRICE: Money = Money::from_rupees(1_000_000);

pub fn is_valid_quantity(quantity: i64) -> bool {
    (1..=MAX_CART_QUANTITY).contains(&quantity)
}

pub fn is_valid_price(price: Money) -> bool {
    price.is_positive() && price <= MAX_PRODUCT_PRICE
}

/// A cart row joined with the current state of its product, as seen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    /// Whether the shop selling the product is currently open.
    pub shop_open: bool,
    pub quantity: i64,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.product.price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub channel: Channel,
    pub lines: Vec<CartLine>,
    pub total: Money,
}

impl Cart {
    pub fn new(channel: Channel, lines: Vec<CartLine>) -> Self {
        let total = lines.iter().map(CartLine::line_total).sum();
        Self { channel, lines, total }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

//--------------------------------------      OrderCode       ---------------------------------------------------------
/// The public, human-friendly identifier of an order (six upper-case alphanumerics).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderCode(pub String);

impl FromStr for OrderCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order code cannot be empty".to_string()));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }
}

impl From<String> for OrderCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------  FulfillmentStatus   ---------------------------------------------------------
/// The delivery status vocabulary shared by order items and orders.
///
/// The forward path is `Processing → Preparing → OutForDelivery → Delivered`. `Cancelled` can be reached from any
/// non-terminal status. `Delivered` and `Cancelled` are terminal. Transition rules live in [`crate::fulfillment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    Processing,
    Preparing,
    #[serde(rename = "Out For Delivery")]
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentStatus::Processing => write!(f, "Processing"),
            FulfillmentStatus::Preparing => write!(f, "Preparing"),
            FulfillmentStatus::OutForDelivery => write!(f, "Out For Delivery"),
            FulfillmentStatus::Delivered => write!(f, "Delivered"),
            FulfillmentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for FulfillmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(Self::Processing),
            "Preparing" => Ok(Self::Preparing),
            "Out For Delivery" | "OutForDelivery" => Ok(Self::OutForDelivery),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid delivery status: {s}"))),
        }
    }
}

impl From<String> for FulfillmentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid delivery status: {value}. But this conversion cannot fail. Defaulting to Processing");
            FulfillmentStatus::Processing
        })
    }
}

impl FulfillmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The position of the status along the forward path. `Cancelled` has no position.
    pub fn stage(&self) -> Option<u8> {
        match self {
            Self::Processing => Some(0),
            Self::Preparing => Some(1),
            Self::OutForDelivery => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }
}

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Paid through the payment gateway before delivery.
    Online,
    /// Paid in cash to the delivery agent on delivery.
    CashOnDelivery,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Online => write!(f, "Online"),
            PaymentMethod::CashOnDelivery => write!(f, "CashOnDelivery"),
        }
    }
}

//--------------------------------------      OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub seller_id: i64,
    /// Product name at the time the order was placed
    pub product_name: String,
    /// Product price at the time the order was placed
    pub unit_price: Money,
    pub quantity: i64,
    pub status: FulfillmentStatus,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub code: OrderCode,
    pub user_id: i64,
    pub channel: Channel,
    /// The sum of the item line totals, frozen at the time the order was placed.
    pub amount: Money,
    pub shipping_address: AddressSnapshot,
    pub delivery_status: FulfillmentStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub delivery_boy_id: Option<i64>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The distinct sellers that have items in this order, in ascending id order. These are the sellers that were
    /// notified when the order was placed.
    pub fn notified_sellers(&self) -> Vec<i64> {
        self.items.iter().map(|i| i.seller_id).collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn items_for_seller(&self, seller_id: i64) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(move |i| i.seller_id == seller_id)
    }

    /// An order may be handed to a delivery agent once it has been paid for, or if the agent will collect cash.
    pub fn is_payable_on_delivery_or_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid || self.payment_method == PaymentMethod::CashOnDelivery
    }
}

//--------------------------------------       NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub seller_id: i64,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl NewOrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub code: OrderCode,
    pub user_id: i64,
    pub channel: Channel,
    pub amount: Money,
    pub shipping_address: AddressSnapshot,
    pub payment_method: PaymentMethod,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn seller_ids(&self) -> Vec<i64> {
        self.items.iter().map(|i| i.seller_id).collect::<BTreeSet<_>>().into_iter().collect()
    }
}

//--------------------------------------     Notification     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub message: String,
    pub order_code: Option<OrderCode>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub message: String,
    pub order_code: Option<OrderCode>,
}

impl NewNotification {
    pub fn for_order<S: Into<String>>(recipient_id: i64, code: &OrderCode, message: S) -> Self {
        Self { recipient_id, message: message.into(), order_code: Some(code.clone()) }
    }
}

//--------------------------------------    Ledger entries    ---------------------------------------------------------
/// One line in a seller's append-only sales history. Written once per seller when an order is delivered.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SalesEntry {
    pub id: i64,
    pub seller_id: i64,
    pub order_code: OrderCode,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

/// Cash that a delivery agent collected on a cash-on-delivery order and still owes the platform until an admin marks
/// it as collected.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CashCollection {
    pub id: i64,
    pub delivery_boy_id: i64,
    pub order_code: OrderCode,
    pub amount: Money,
    pub collected: bool,
    pub created_at: DateTime<Utc>,
    pub collected_at: Option<DateTime<Utc>>,
}

//--------------------------------------    DeliveryAgent     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DeliveryAgent {
    pub user_id: i64,
    pub name: String,
    pub phone: String,
    pub is_available: bool,
}

//--------------------------------------         Otp          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OtpRecord {
    pub phone: String,
    pub code: String,
    pub attempts: i64,
    pub expires_at: DateTime<Utc>,
}
