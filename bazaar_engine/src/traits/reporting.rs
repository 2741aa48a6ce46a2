use crate::{
    db_types::{CashCollection, Money},
    order_objects::{DashboardSummary, OutstandingCash, SellerEarnings},
    traits::AccountApiError,
};

/// Read-mostly aggregates over orders, ledgers and users for the admin dashboard.
#[allow(async_fn_in_trait)]
pub trait ReportingManagement {
    async fn dashboard_summary(&self) -> Result<DashboardSummary, AccountApiError>;

    /// Uncollected cash-on-delivery money per delivery agent, largest first. Agents owing nothing are left out.
    async fn outstanding_cash(&self) -> Result<Vec<OutstandingCash>, AccountApiError>;

    async fn fetch_cash_ledger(&self, delivery_boy_id: i64) -> Result<Vec<CashCollection>, AccountApiError>;

    /// Marks everything the agent owes as handed over and returns the total.
    async fn collect_cash(&self, delivery_boy_id: i64) -> Result<Money, AccountApiError>;

    /// Lifetime sales history totals per seller, largest first.
    async fn seller_earnings(&self) -> Result<Vec<SellerEarnings>, AccountApiError>;
}
