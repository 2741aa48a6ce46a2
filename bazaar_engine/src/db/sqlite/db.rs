//! `SqliteDatabase` is the concrete marketplace backend.
//!
//! It owns a connection pool and implements every trait in [`crate::traits`]. Every method that writes opens a
//! transaction with `pool.begin()` and passes `&mut tx` to the query functions in the sibling modules. A `RETURNING`
//! statement read with `fetch_one` holds the write lock until its transaction commits, so writes never run on a bare
//! pooled connection.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{
    addresses,
    carts,
    catalog,
    db_url,
    ledgers,
    new_pool,
    notifications,
    orders,
    otp,
    users,
    SqliteDatabaseError,
};
use crate::{
    db_types::{
        is_valid_quantity,
        Address,
        Cart,
        CashCollection,
        Channel,
        DeliveryAgent,
        Money,
        NewAddress,
        NewNotification,
        NewOrder,
        NewProduct,
        NewShop,
        NewUserAccount,
        Notification,
        Order,
        OrderCode,
        OtpRecord,
        PaymentStatus,
        Product,
        ProductUpdate,
        ProfileUpdate,
        Role,
        SalesEntry,
        Shop,
        ShopUpdate,
        UserAccount,
    },
    fulfillment::{plan_transition, StatusChange},
    order_objects::{DashboardSummary, OrderChanged, OrderQueryFilter, OutstandingCash, SellerEarnings},
    traits::{
        AccountApiError,
        AccountManagement,
        AuthApiError,
        AuthManagement,
        CartManagement,
        CatalogError,
        CatalogManagement,
        OrderFlowError,
        OrderManagement,
        ReportingManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `BAZAAR_DATABASE_URL`, or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn place_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let (user_id, channel) = (order.user_id, order.channel);
        let order = orders::insert_order(order, &mut tx).await?;
        let cleared = carts::clear_cart(user_id, channel, &mut tx).await?;
        trace!("🗃️ {cleared} {channel} cart lines cleared for user #{user_id}");
        notifications::insert_notifications(orders::order_placed_notifications(&order), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} placed by user #{user_id} for {}", order.code, order.amount);
        Ok(order)
    }

    async fn fetch_order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_code(code, &mut conn).await?)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        self.search_orders(OrderQueryFilter::default().with_user_id(user_id)).await
    }

    async fn fetch_orders_for_seller(&self, seller_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        self.search_orders(OrderQueryFilter::default().with_seller_id(seller_id)).await
    }

    async fn fetch_orders_for_agent(&self, agent_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        self.search_orders(OrderQueryFilter::default().with_delivery_boy_id(agent_id)).await
    }

    async fn fetch_pending_deliveries(&self, channel: Option<Channel>) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_pending_deliveries(channel, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn apply_status_change(
        &self,
        code: &OrderCode,
        change: StatusChange,
    ) -> Result<OrderChanged, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_code(code, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(code.clone()))?;
        if let StatusChange::Accept { agent_id } = change {
            match users::fetch_delivery_agent(agent_id, &mut tx).await? {
                Some(agent) if agent.is_available => {},
                Some(_) => return Err(OrderFlowError::Forbidden("You are marked as unavailable".into())),
                None => return Err(OrderFlowError::Forbidden(format!("User {agent_id} is not a delivery agent"))),
            }
        }
        let plan = plan_transition(&order, &change)?;
        trace!("🗃️ Applying {change:?} to order {code}: {plan:?}");
        let settlements = plan.settlements.iter().copied().map(Into::into).collect();
        let old_status = order.delivery_status;
        orders::apply_transition_plan(&order, plan, &mut tx).await?;
        let order = orders::fetch_order_by_code(code, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(code.clone()))?;
        tx.commit().await?;
        Ok(OrderChanged { old_status, order, settlements })
    }

    async fn set_gateway_order(&self, code: &OrderCode, gateway_order_id: &str) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_code(code, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(code.clone()))?;
        orders::set_gateway_order(order.id, gateway_order_id, &mut tx).await?;
        let order = orders::fetch_order_by_code(code, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(code.clone()))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_gateway_order(gateway_order_id, &mut conn).await?)
    }

    async fn mark_payment(
        &self,
        code: &OrderCode,
        status: PaymentStatus,
        payment_id: Option<&str>,
    ) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_code(code, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(code.clone()))?;
        // The guard in the UPDATE decides, not the snapshot above. Another connection may have paid in between.
        let changed = orders::set_payment_status(order.id, status, payment_id, &mut tx).await?;
        if changed && status == PaymentStatus::Paid {
            let mut notes = vec![NewNotification::for_order(
                order.user_id,
                &order.code,
                format!("Payment of {} received for order {}", order.amount, order.code),
            )];
            for seller_id in order.notified_sellers() {
                notes.push(NewNotification::for_order(
                    seller_id,
                    &order.code,
                    format!("Order {} has been paid. You can start preparing it", order.code),
                ));
            }
            notifications::insert_notifications(notes, &mut tx).await?;
        }
        let order = orders::fetch_order_by_code(code, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(code.clone()))?;
        tx.commit().await?;
        if changed {
            debug!("🗃️ Payment status for order {code} set to {status}");
        } else {
            debug!("🗃️ Order {code} is already paid. Payment status {status} was not recorded");
        }
        Ok(order)
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, user_id: i64, channel: Channel) -> Result<Cart, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let lines = carts::fetch_cart_lines(user_id, channel, &mut conn).await?;
        Ok(Cart::new(channel, lines))
    }

    async fn upsert_cart_item(
        &self,
        user_id: i64,
        channel: Channel,
        product_id: i64,
        quantity: i64,
    ) -> Result<Cart, OrderFlowError> {
        if !is_valid_quantity(quantity) {
            return Err(OrderFlowError::InvalidQuantity(quantity));
        }
        let mut tx = self.pool.begin().await?;
        let product =
            catalog::fetch_product(product_id, &mut tx).await?.ok_or(OrderFlowError::ProductNotFound(product_id))?;
        check_cart_product(&product, channel)?;
        carts::upsert_cart_item(user_id, channel, product_id, quantity, &mut tx).await?;
        let lines = carts::fetch_cart_lines(user_id, channel, &mut tx).await?;
        tx.commit().await?;
        Ok(Cart::new(channel, lines))
    }

    async fn add_cart_item(
        &self,
        user_id: i64,
        channel: Channel,
        product_id: i64,
        quantity: i64,
    ) -> Result<Cart, OrderFlowError> {
        if !is_valid_quantity(quantity) {
            return Err(OrderFlowError::InvalidQuantity(quantity));
        }
        // Write first. A transaction that has already read cannot wait for the write lock.
        let mut tx = self.pool.begin().await?;
        let added = carts::add_cart_item(user_id, channel, product_id, quantity, &mut tx).await?;
        let lines = carts::fetch_cart_lines(user_id, channel, &mut tx).await?;
        if !added {
            let product = catalog::fetch_product(product_id, &mut tx)
                .await?
                .ok_or(OrderFlowError::ProductNotFound(product_id))?;
            check_cart_product(&product, channel)?;
            let existing = lines.iter().find(|l| l.product.id == product_id).map(|l| l.quantity).unwrap_or_default();
            return Err(OrderFlowError::InvalidQuantity(existing.saturating_add(quantity)));
        }
        tx.commit().await?;
        Ok(Cart::new(channel, lines))
    }

    async fn remove_cart_item(&self, user_id: i64, channel: Channel, product_id: i64) -> Result<Cart, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        if !carts::remove_cart_item(user_id, channel, product_id, &mut tx).await? {
            trace!("🗃️ Product #{product_id} was not in the {channel} cart of user #{user_id}");
        }
        let lines = carts::fetch_cart_lines(user_id, channel, &mut tx).await?;
        tx.commit().await?;
        Ok(Cart::new(channel, lines))
    }

    async fn clear_cart(&self, user_id: i64, channel: Channel) -> Result<(), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        carts::clear_cart(user_id, channel, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn create_shop(&self, seller_id: i64, shop: NewShop) -> Result<Shop, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let shop = catalog::insert_shop(seller_id, shop, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Shop #{} ({}) created for seller #{seller_id}", shop.id, shop.name);
        Ok(shop)
    }

    async fn update_shop(&self, seller_id: i64, update: ShopUpdate) -> Result<Shop, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let shop = catalog::update_shop(seller_id, update, &mut tx).await?.ok_or(CatalogError::ShopNotFound)?;
        tx.commit().await?;
        Ok(shop)
    }

    async fn set_shop_open(&self, seller_id: i64, is_open: bool) -> Result<Shop, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let shop = catalog::set_shop_open(seller_id, is_open, &mut tx).await?.ok_or(CatalogError::ShopNotFound)?;
        tx.commit().await?;
        Ok(shop)
    }

    async fn fetch_shop(&self, shop_id: i64) -> Result<Option<Shop>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_shop(shop_id, &mut conn).await?)
    }

    async fn fetch_shop_for_seller(&self, seller_id: i64) -> Result<Option<Shop>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_shop_for_seller(seller_id, &mut conn).await?)
    }

    async fn list_shops(&self, channel: Option<Channel>) -> Result<Vec<Shop>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::list_shops(channel, &mut conn).await?)
    }

    async fn create_product(&self, seller_id: i64, product: NewProduct) -> Result<Product, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let shop = catalog::fetch_shop_for_seller(seller_id, &mut tx).await?.ok_or(CatalogError::ShopNotFound)?;
        let product = catalog::insert_product(&shop, product, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn update_product(
        &self,
        seller_id: i64,
        product_id: i64,
        update: ProductUpdate,
    ) -> Result<Product, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let product =
            catalog::fetch_product(product_id, &mut tx).await?.ok_or(CatalogError::ProductNotFound(product_id))?;
        if product.seller_id != seller_id {
            return Err(CatalogError::NotOwner(format!("product {product_id}")));
        }
        let product = catalog::update_product(product_id, update, &mut tx)
            .await?
            .ok_or(CatalogError::ProductNotFound(product_id))?;
        tx.commit().await?;
        Ok(product)
    }

    async fn delete_product(&self, seller_id: i64, product_id: i64) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        let product =
            catalog::fetch_product(product_id, &mut tx).await?.ok_or(CatalogError::ProductNotFound(product_id))?;
        if product.seller_id != seller_id {
            return Err(CatalogError::NotOwner(format!("product {product_id}")));
        }
        catalog::delete_product(product_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Product #{product_id} deleted by seller #{seller_id}");
        Ok(())
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_product(product_id, &mut conn).await?)
    }

    async fn list_products_for_shop(&self, shop_id: i64, available_only: bool) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::list_products_for_shop(shop_id, available_only, &mut conn).await?)
    }

    async fn search_products(&self, query: &str, channel: Option<Channel>) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::search_products(query, channel, &mut conn).await?)
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user(user_id, &mut conn).await?)
    }

    async fn fetch_user_by_phone(&self, phone: &str) -> Result<Option<UserAccount>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_by_phone(phone, &mut conn).await?)
    }

    async fn create_user(&self, user: NewUserAccount) -> Result<UserAccount, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let user = users::insert_user(user, &mut tx).await?;
        if user.role == Role::DeliveryBoy {
            users::insert_delivery_agent(user.id, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ {} account #{} created for {}", user.role, user.id, user.phone);
        Ok(user)
    }

    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<UserAccount, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let user =
            users::update_profile(user_id, update, &mut tx).await?.ok_or(AccountApiError::UserNotFound(user_id))?;
        tx.commit().await?;
        Ok(user)
    }

    async fn fetch_addresses(&self, user_id: i64) -> Result<Vec<Address>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(addresses::fetch_addresses(user_id, &mut conn).await?)
    }

    async fn fetch_address(&self, user_id: i64, address_id: i64) -> Result<Option<Address>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(addresses::fetch_address(user_id, address_id, &mut conn).await?)
    }

    async fn add_address(&self, user_id: i64, address: NewAddress) -> Result<Address, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let address = addresses::insert_address(user_id, address, &mut tx).await?;
        tx.commit().await?;
        Ok(address)
    }

    async fn update_address(
        &self,
        user_id: i64,
        address_id: i64,
        address: NewAddress,
    ) -> Result<Address, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let address = addresses::update_address(user_id, address_id, address, &mut tx)
            .await?
            .ok_or(AccountApiError::AddressNotFound(address_id))?;
        tx.commit().await?;
        Ok(address)
    }

    async fn delete_address(&self, user_id: i64, address_id: i64) -> Result<(), AccountApiError> {
        let mut tx = self.pool.begin().await?;
        if !addresses::delete_address(user_id, address_id, &mut tx).await? {
            return Err(AccountApiError::AddressNotFound(address_id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_default_address(&self, user_id: i64, address_id: i64) -> Result<Address, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let address = addresses::set_default_address(user_id, address_id, &mut tx)
            .await?
            .ok_or(AccountApiError::AddressNotFound(address_id))?;
        tx.commit().await?;
        Ok(address)
    }

    async fn fetch_delivery_agent(&self, user_id: i64) -> Result<Option<DeliveryAgent>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_delivery_agent(user_id, &mut conn).await?)
    }

    async fn fetch_delivery_agents(&self) -> Result<Vec<DeliveryAgent>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_delivery_agents(&mut conn).await?)
    }

    async fn set_agent_availability(&self, user_id: i64, is_available: bool) -> Result<DeliveryAgent, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let agent = users::set_agent_availability(user_id, is_available, &mut tx)
            .await?
            .ok_or_else(|| AccountApiError::WrongRole(user_id, Role::DeliveryBoy.to_string()))?;
        tx.commit().await?;
        Ok(agent)
    }

    async fn fetch_notifications(&self, user_id: i64, unread_only: bool) -> Result<Vec<Notification>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::fetch_notifications(user_id, unread_only, &mut conn).await?)
    }

    async fn mark_notification_read(
        &self,
        user_id: i64,
        notification_id: i64,
    ) -> Result<Notification, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let note = notifications::mark_read(user_id, notification_id, &mut tx)
            .await?
            .ok_or(AccountApiError::NotificationNotFound(notification_id))?;
        tx.commit().await?;
        Ok(note)
    }

    async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let count = notifications::mark_all_read(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn fetch_sales_history(&self, seller_id: i64) -> Result<Vec<SalesEntry>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledgers::fetch_sales_history(seller_id, &mut conn).await?)
    }
}

impl AuthManagement for SqliteDatabase {
    async fn upsert_otp(&self, phone: &str, code: &str, expires_at: DateTime<Utc>) -> Result<(), AuthApiError> {
        let mut tx = self.pool.begin().await?;
        otp::upsert_otp(phone, code, expires_at, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_otp(&self, phone: &str) -> Result<Option<OtpRecord>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(otp::fetch_otp(phone, &mut conn).await?)
    }

    async fn increment_otp_attempts(&self, phone: &str) -> Result<i64, AuthApiError> {
        let mut tx = self.pool.begin().await?;
        let attempts = otp::increment_attempts(phone, &mut tx).await?.ok_or(AuthApiError::OtpNotRequested)?;
        tx.commit().await?;
        Ok(attempts)
    }

    async fn delete_otp(&self, phone: &str) -> Result<(), AuthApiError> {
        let mut tx = self.pool.begin().await?;
        otp::delete_otp(phone, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

impl ReportingManagement for SqliteDatabase {
    async fn dashboard_summary(&self) -> Result<DashboardSummary, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders_by_status = ledgers::orders_by_status(&mut conn).await?;
        let total_orders = orders_by_status.iter().map(|s| s.count).sum();
        Ok(DashboardSummary {
            total_orders,
            orders_by_status,
            delivered_revenue: ledgers::delivered_revenue(&mut conn).await?,
            customers: users::count_by_role(Role::Customer, &mut conn).await?,
            sellers: users::count_by_role(Role::Seller, &mut conn).await?,
            delivery_agents: users::count_by_role(Role::DeliveryBoy, &mut conn).await?,
            available_agents: users::count_available_agents(&mut conn).await?,
            outstanding_cash: ledgers::total_outstanding_cash(&mut conn).await?,
        })
    }

    async fn outstanding_cash(&self) -> Result<Vec<OutstandingCash>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledgers::outstanding_cash(&mut conn).await?)
    }

    async fn fetch_cash_ledger(&self, delivery_boy_id: i64) -> Result<Vec<CashCollection>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledgers::fetch_cash_ledger(delivery_boy_id, &mut conn).await?)
    }

    async fn collect_cash(&self, delivery_boy_id: i64) -> Result<Money, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let amount = ledgers::collect_cash(delivery_boy_id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Collected {amount} from delivery agent #{delivery_boy_id}");
        Ok(amount)
    }

    async fn seller_earnings(&self) -> Result<Vec<SellerEarnings>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledgers::seller_earnings(&mut conn).await?)
    }
}

fn check_cart_product(product: &Product, channel: Channel) -> Result<(), OrderFlowError> {
    if product.channel != channel {
        return Err(OrderFlowError::ChannelMismatch {
            product_id: product.id,
            expected: channel.to_string(),
            found: product.channel.to_string(),
        });
    }
    if !product.is_available {
        return Err(OrderFlowError::ProductUnavailable(product.name.clone()));
    }
    Ok(())
}
