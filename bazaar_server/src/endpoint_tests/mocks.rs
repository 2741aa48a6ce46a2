use bazaar_engine::{
    db_types::{
        Address,
        CashCollection,
        Channel,
        DeliveryAgent,
        Money,
        NewAddress,
        NewProduct,
        NewShop,
        NewUserAccount,
        Notification,
        OtpRecord,
        Product,
        ProductUpdate,
        ProfileUpdate,
        SalesEntry,
        Shop,
        ShopUpdate,
        UserAccount,
    },
    order_objects::{DashboardSummary, OutstandingCash, SellerEarnings},
    traits::{
        AccountApiError,
        AccountManagement,
        AuthApiError,
        AuthManagement,
        CatalogError,
        CatalogManagement,
        ReportingManagement,
    },
};
use chrono::{DateTime, Utc};
use mockall::mock;

mock! {
    pub Backend {}
    impl AccountManagement for Backend {
        async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, AccountApiError>;
        async fn fetch_user_by_phone(&self, phone: &str) -> Result<Option<UserAccount>, AccountApiError>;
        async fn create_user(&self, user: NewUserAccount) -> Result<UserAccount, AccountApiError>;
        async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<UserAccount, AccountApiError>;
        async fn fetch_addresses(&self, user_id: i64) -> Result<Vec<Address>, AccountApiError>;
        async fn fetch_address(&self, user_id: i64, address_id: i64) -> Result<Option<Address>, AccountApiError>;
        async fn add_address(&self, user_id: i64, address: NewAddress) -> Result<Address, AccountApiError>;
        async fn update_address(
            &self,
            user_id: i64,
            address_id: i64,
            address: NewAddress,
        ) -> Result<Address, AccountApiError>;
        async fn delete_address(&self, user_id: i64, address_id: i64) -> Result<(), AccountApiError>;
        async fn set_default_address(&self, user_id: i64, address_id: i64) -> Result<Address, AccountApiError>;
        async fn fetch_delivery_agent(&self, user_id: i64) -> Result<Option<DeliveryAgent>, AccountApiError>;
        async fn fetch_delivery_agents(&self) -> Result<Vec<DeliveryAgent>, AccountApiError>;
        async fn set_agent_availability(
            &self,
            user_id: i64,
            is_available: bool,
        ) -> Result<DeliveryAgent, AccountApiError>;
        async fn fetch_notifications(
            &self,
            user_id: i64,
            unread_only: bool,
        ) -> Result<Vec<Notification>, AccountApiError>;
        async fn mark_notification_read(
            &self,
            user_id: i64,
            notification_id: i64,
        ) -> Result<Notification, AccountApiError>;
        async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64, AccountApiError>;
        async fn fetch_sales_history(&self, seller_id: i64) -> Result<Vec<SalesEntry>, AccountApiError>;
    }
    impl AuthManagement for Backend {
        async fn upsert_otp(&self, phone: &str, code: &str, expires_at: DateTime<Utc>) -> Result<(), AuthApiError>;
        async fn fetch_otp(&self, phone: &str) -> Result<Option<OtpRecord>, AuthApiError>;
        async fn increment_otp_attempts(&self, phone: &str) -> Result<i64, AuthApiError>;
        async fn delete_otp(&self, phone: &str) -> Result<(), AuthApiError>;
    }
    impl CatalogManagement for Backend {
        async fn create_shop(&self, seller_id: i64, shop: NewShop) -> Result<Shop, CatalogError>;
        async fn update_shop(&self, seller_id: i64, update: ShopUpdate) -> Result<Shop, CatalogError>;
        async fn set_shop_open(&self, seller_id: i64, is_open: bool) -> Result<Shop, CatalogError>;
        async fn fetch_shop(&self, shop_id: i64) -> Result<Option<Shop>, CatalogError>;
        async fn fetch_shop_for_seller(&self, seller_id: i64) -> Result<Option<Shop>, CatalogError>;
        async fn list_shops(&self, channel: Option<Channel>) -> Result<Vec<Shop>, CatalogError>;
        async fn create_product(&self, seller_id: i64, product: NewProduct) -> Result<Product, CatalogError>;
        async fn update_product(
            &self,
            seller_id: i64,
            product_id: i64,
            update: ProductUpdate,
        ) -> Result<Product, CatalogError>;
        async fn delete_product(&self, seller_id: i64, product_id: i64) -> Result<(), CatalogError>;
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError>;
        async fn list_products_for_shop(
            &self,
            shop_id: i64,
            available_only: bool,
        ) -> Result<Vec<Product>, CatalogError>;
        async fn search_products(&self, query: &str, channel: Option<Channel>) -> Result<Vec<Product>, CatalogError>;
    }
    impl ReportingManagement for Backend {
        async fn dashboard_summary(&self) -> Result<DashboardSummary, AccountApiError>;
        async fn outstanding_cash(&self) -> Result<Vec<OutstandingCash>, AccountApiError>;
        async fn fetch_cash_ledger(&self, delivery_boy_id: i64) -> Result<Vec<CashCollection>, AccountApiError>;
        async fn collect_cash(&self, delivery_boy_id: i64) -> Result<Money, AccountApiError>;
        async fn seller_earnings(&self) -> Result<Vec<SellerEarnings>, AccountApiError>;
    }
}
