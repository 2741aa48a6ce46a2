use crate::{
    db_types::{
        Address,
        DeliveryAgent,
        NewAddress,
        NewUserAccount,
        Notification,
        ProfileUpdate,
        SalesEntry,
        UserAccount,
    },
    traits::AccountApiError,
};

/// The `AccountManagement` trait covers everything that hangs off a user: the profile, the address book, delivery
/// agent availability, the notification inbox and, for sellers, the sales history.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, AccountApiError>;

    async fn fetch_user_by_phone(&self, phone: &str) -> Result<Option<UserAccount>, AccountApiError>;

    /// Creates a user. Delivery agents also get an availability record, initially unavailable.
    async fn create_user(&self, user: NewUserAccount) -> Result<UserAccount, AccountApiError>;

    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<UserAccount, AccountApiError>;

    /// The user's addresses, default first, then oldest first.
    async fn fetch_addresses(&self, user_id: i64) -> Result<Vec<Address>, AccountApiError>;

    async fn fetch_address(&self, user_id: i64, address_id: i64) -> Result<Option<Address>, AccountApiError>;

    /// Adds an address. The first address a user adds is always the default. If `is_default` is set, every other
    /// address of the user stops being the default in the same transaction.
    async fn add_address(&self, user_id: i64, address: NewAddress) -> Result<Address, AccountApiError>;

    async fn update_address(
        &self,
        user_id: i64,
        address_id: i64,
        address: NewAddress,
    ) -> Result<Address, AccountApiError>;

    /// Deletes an address. If it was the default, the oldest remaining address becomes the default.
    async fn delete_address(&self, user_id: i64, address_id: i64) -> Result<(), AccountApiError>;

    async fn set_default_address(&self, user_id: i64, address_id: i64) -> Result<Address, AccountApiError>;

    async fn fetch_delivery_agent(&self, user_id: i64) -> Result<Option<DeliveryAgent>, AccountApiError>;

    async fn fetch_delivery_agents(&self) -> Result<Vec<DeliveryAgent>, AccountApiError>;

    async fn set_agent_availability(&self, user_id: i64, is_available: bool) -> Result<DeliveryAgent, AccountApiError>;

    /// Notifications for the user, newest first.
    async fn fetch_notifications(&self, user_id: i64, unread_only: bool) -> Result<Vec<Notification>, AccountApiError>;

    async fn mark_notification_read(&self, user_id: i64, notification_id: i64) -> Result<Notification, AccountApiError>;

    /// Marks every notification of the user as read and returns how many changed.
    async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64, AccountApiError>;

    /// The seller's sales history, newest first.
    async fn fetch_sales_history(&self, seller_id: i64) -> Result<Vec<SalesEntry>, AccountApiError>;
}
