use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CashCollection, DeliveryAgent, Money, NewUserAccount, Role, UserAccount},
    helpers::is_valid_phone,
    order_objects::{DashboardSummary, OutstandingCash, SellerEarnings},
    traits::{AccountApiError, AccountManagement, ReportingManagement},
};

/// Read-only aggregates for the admin dashboard, plus registration of staff accounts and the cash hand-over from
/// delivery agents. Order search and status overrides live in [`crate::OrderFlowApi`].
pub struct AdminApi<B> {
    db: B,
}

impl<B: Debug> Debug for AdminApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdminApi ({:?})", self.db)
    }
}

impl<B> AdminApi<B>
where B: ReportingManagement + AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, AccountApiError> {
        self.db.dashboard_summary().await
    }

    /// Cash still held by each delivery agent, largest first.
    pub async fn outstanding_cash(&self) -> Result<Vec<OutstandingCash>, AccountApiError> {
        self.db.outstanding_cash().await
    }

    pub async fn cash_ledger(&self, delivery_boy_id: i64) -> Result<Vec<CashCollection>, AccountApiError> {
        self.db.fetch_cash_ledger(delivery_boy_id).await
    }

    /// Records that a delivery agent handed over all the cash they were holding. Returns the amount collected.
    pub async fn collect_cash(&self, delivery_boy_id: i64) -> Result<Money, AccountApiError> {
        if self.db.fetch_delivery_agent(delivery_boy_id).await?.is_none() {
            return Err(AccountApiError::WrongRole(delivery_boy_id, Role::DeliveryBoy.to_string()));
        }
        self.db.collect_cash(delivery_boy_id).await
    }

    pub async fn seller_earnings(&self) -> Result<Vec<SellerEarnings>, AccountApiError> {
        self.db.seller_earnings().await
    }

    pub async fn delivery_agents(&self) -> Result<Vec<DeliveryAgent>, AccountApiError> {
        self.db.fetch_delivery_agents().await
    }

    /// Creates a seller, delivery agent or admin account. Customers sign themselves up with an OTP instead.
    pub async fn register_user(&self, user: NewUserAccount) -> Result<UserAccount, AccountApiError> {
        if user.role == Role::Customer {
            return Err(AccountApiError::ValidationError("Customers sign up with a one-time password".into()));
        }
        if user.name.trim().is_empty() {
            return Err(AccountApiError::ValidationError("Name cannot be empty".into()));
        }
        if !is_valid_phone(&user.phone) {
            return Err(AccountApiError::ValidationError(format!("Invalid phone number: {}", user.phone)));
        }
        let user = self.db.create_user(user).await?;
        info!("🛠️ {} account #{} registered for {}", user.role, user.id, user.phone);
        Ok(user)
    }
}
