//! Unifies API for accessing user accounts, address books, notification inboxes and seller sales history.

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Address, DeliveryAgent, NewAddress, Notification, ProfileUpdate, Role, SalesEntry, UserAccount},
    helpers::is_valid_phone,
    traits::{AccountApiError, AccountManagement},
};

pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

fn validate_address(address: &NewAddress) -> Result<(), AccountApiError> {
    let required = [
        ("label", &address.label),
        ("line1", &address.line1),
        ("city", &address.city),
        ("state", &address.state),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(AccountApiError::ValidationError(format!("Address {field} cannot be empty")));
    }
    if address.pincode.len() != 6 || !address.pincode.chars().all(|c| c.is_ascii_digit()) {
        return Err(AccountApiError::ValidationError(format!("Invalid pincode: {}", address.pincode)));
    }
    if !is_valid_phone(&address.phone) {
        return Err(AccountApiError::ValidationError(format!("Invalid phone number: {}", address.phone)));
    }
    Ok(())
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn profile(&self, user_id: i64) -> Result<UserAccount, AccountApiError> {
        self.db.fetch_user(user_id).await?.ok_or(AccountApiError::UserNotFound(user_id))
    }

    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<UserAccount, AccountApiError> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AccountApiError::ValidationError("Name cannot be empty".into()));
        }
        if update.email.as_deref().is_some_and(|e| !e.contains('@')) {
            return Err(AccountApiError::ValidationError("Invalid email address".into()));
        }
        if update.is_empty() {
            return self.profile(user_id).await;
        }
        self.db.update_profile(user_id, update).await
    }

    pub async fn addresses(&self, user_id: i64) -> Result<Vec<Address>, AccountApiError> {
        self.db.fetch_addresses(user_id).await
    }

    /// Saves a new address. A user's first address always becomes their default.
    pub async fn add_address(&self, user_id: i64, address: NewAddress) -> Result<Address, AccountApiError> {
        validate_address(&address)?;
        let address = self.db.add_address(user_id, address).await?;
        debug!("👤️ Address #{} ({}) saved for user #{user_id}", address.id, address.label);
        Ok(address)
    }

    pub async fn update_address(
        &self,
        user_id: i64,
        address_id: i64,
        address: NewAddress,
    ) -> Result<Address, AccountApiError> {
        validate_address(&address)?;
        self.db.update_address(user_id, address_id, address).await
    }

    /// Deletes an address. If it was the default, the oldest remaining address takes its place.
    pub async fn delete_address(&self, user_id: i64, address_id: i64) -> Result<(), AccountApiError> {
        self.db.delete_address(user_id, address_id).await
    }

    pub async fn set_default_address(&self, user_id: i64, address_id: i64) -> Result<Address, AccountApiError> {
        self.db.set_default_address(user_id, address_id).await
    }

    pub async fn notifications(&self, user_id: i64, unread_only: bool) -> Result<Vec<Notification>, AccountApiError> {
        self.db.fetch_notifications(user_id, unread_only).await
    }

    pub async fn mark_notification_read(
        &self,
        user_id: i64,
        notification_id: i64,
    ) -> Result<Notification, AccountApiError> {
        self.db.mark_notification_read(user_id, notification_id).await
    }

    pub async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64, AccountApiError> {
        let n = self.db.mark_all_notifications_read(user_id).await?;
        trace!("👤️ {n} notifications marked as read for user #{user_id}");
        Ok(n)
    }

    pub async fn sales_history(&self, seller_id: i64) -> Result<Vec<SalesEntry>, AccountApiError> {
        self.db.fetch_sales_history(seller_id).await
    }

    pub async fn delivery_agent(&self, user_id: i64) -> Result<DeliveryAgent, AccountApiError> {
        self.db
            .fetch_delivery_agent(user_id)
            .await?
            .ok_or_else(|| AccountApiError::WrongRole(user_id, Role::DeliveryBoy.to_string()))
    }

    /// Delivery agents only see, and can only accept, orders while they are available.
    pub async fn set_availability(&self, user_id: i64, is_available: bool) -> Result<DeliveryAgent, AccountApiError> {
        let agent = self.db.set_agent_availability(user_id, is_available).await?;
        info!("🚚️ Delivery agent #{user_id} is {}", if is_available { "available" } else { "off duty" });
        Ok(agent)
    }
}
