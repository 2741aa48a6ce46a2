use log::*;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::{db_types::Money, traits::OrderFlowError};

/// An order created on the payment gateway. The client uses `id` to open the gateway's checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    pub receipt: String,
}

/// The payment gateway, seen from the marketplace. Signatures are checked locally, so creating orders is all that is
/// needed from the gateway itself.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_order(&self, amount: Money, currency: &str, receipt: &str) -> Result<GatewayOrder, OrderFlowError>;
}

/// A gateway that mints order ids locally. Used in development and tests, where there is no real gateway to talk to.
#[derive(Debug, Clone, Default)]
pub struct LocalPaymentGateway;

impl PaymentGateway for LocalPaymentGateway {
    async fn create_order(&self, amount: Money, currency: &str, receipt: &str) -> Result<GatewayOrder, OrderFlowError> {
        if !amount.is_positive() {
            return Err(OrderFlowError::GatewayError(format!("Cannot create a payment for {amount}")));
        }
        let suffix = rand::thread_rng().sample_iter(&Alphanumeric).take(14).map(char::from).collect::<String>();
        let id = format!("order_{suffix}");
        debug!("💳️ Local gateway created order {id} for {amount} ({receipt})");
        Ok(GatewayOrder { id, amount, currency: currency.to_string(), receipt: receipt.to_string() })
    }
}
