use std::fmt::Debug;

use bazaar_common::{Secret, CURRENCY_CODE};
use log::*;

use crate::{
    db_types::{FulfillmentStatus, Order, OrderCode, PaymentMethod, PaymentStatus},
    events::{EventProducers, PaymentVerifiedEvent},
    helpers::verify_payment_signature,
    traits::{GatewayOrder, OrderFlowError, OrderManagement, PaymentGateway},
};

/// `PaymentApi` handles online payments: it creates a gateway order for a placed order, and then verifies the
/// `(order_id, payment_id, signature)` triple that the gateway returns to the customer's browser.
pub struct PaymentApi<B, G> {
    db: B,
    gateway: G,
    secret: Secret<String>,
    producers: EventProducers,
}

impl<B, G> Debug for PaymentApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi")
    }
}

impl<B, G> PaymentApi<B, G> {
    pub fn new(db: B, gateway: G, secret: Secret<String>, producers: EventProducers) -> Self {
        Self { db, gateway, secret, producers }
    }
}

impl<B, G> PaymentApi<B, G>
where
    B: OrderManagement,
    G: PaymentGateway,
{
    async fn fetch_own_order(&self, user_id: i64, code: &OrderCode) -> Result<Order, OrderFlowError> {
        match self.db.fetch_order_by_code(code).await? {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(OrderFlowError::OrderNotFound(code.clone())),
        }
    }

    /// Asks the payment gateway for a new gateway order covering the full order amount. The gateway order id is
    /// recorded against the order, replacing any earlier attempt.
    pub async fn initiate_payment(&self, user_id: i64, code: &OrderCode) -> Result<GatewayOrder, OrderFlowError> {
        let order = self.fetch_own_order(user_id, code).await?;
        if order.payment_method != PaymentMethod::Online {
            return Err(OrderFlowError::NotPayable(format!("Order {code} is cash on delivery")));
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(OrderFlowError::NotPayable(format!("Order {code} has already been paid")));
        }
        if order.delivery_status == FulfillmentStatus::Cancelled {
            return Err(OrderFlowError::NotPayable(format!("Order {code} has been cancelled")));
        }
        let gateway_order = self.gateway.create_order(order.amount, CURRENCY_CODE, code.as_str()).await?;
        self.db.set_gateway_order(code, &gateway_order.id).await?;
        info!("💳️ Payment of {} initiated for order {code}. Gateway order: {}", order.amount, gateway_order.id);
        Ok(gateway_order)
    }

    /// Verifies a payment returned by the gateway.
    ///
    /// A valid signature marks the order as paid. Verifying the same payment again is a no-op that returns the order.
    /// An invalid signature, or a gateway order that does not belong to this order, marks the payment as failed and
    /// returns [`OrderFlowError::InvalidPaymentSignature`].
    pub async fn verify_payment(
        &self,
        user_id: i64,
        code: &OrderCode,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_own_order(user_id, code).await?;
        let expected =
            order.gateway_order_id.as_deref().ok_or_else(|| OrderFlowError::PaymentNotInitiated(code.clone()))?;
        if order.payment_status == PaymentStatus::Paid {
            return if order.gateway_payment_id.as_deref() == Some(payment_id) {
                debug!("💳️ Payment {payment_id} for order {code} was already verified");
                Ok(order)
            } else {
                Err(OrderFlowError::NotPayable(format!("Order {code} has already been paid")))
            };
        }
        let valid = expected == gateway_order_id &&
            verify_payment_signature(self.secret.reveal(), gateway_order_id, payment_id, signature);
        if !valid {
            warn!("💳️ Invalid payment signature for order {code}. Payment {payment_id} is marked as failed.");
            self.db.mark_payment(code, PaymentStatus::Failed, None).await?;
            return Err(OrderFlowError::InvalidPaymentSignature);
        }
        let order = self.db.mark_payment(code, PaymentStatus::Paid, Some(payment_id)).await?;
        if order.gateway_payment_id.as_deref() != Some(payment_id) {
            return Err(OrderFlowError::NotPayable(format!("Order {code} has already been paid")));
        }
        info!("💳️ Payment {payment_id} verified for order {code}");
        self.call_payment_verified_hook(&order, payment_id).await;
        Ok(order)
    }

    /// Handles the gateway's "payment captured" callback. The HTTP layer is responsible for authenticating the
    /// callback body before calling this.
    pub async fn handle_captured_webhook(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
    ) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_gateway_order(gateway_order_id)
            .await?
            .ok_or_else(|| OrderFlowError::GatewayError(format!("Unknown gateway order {gateway_order_id}")))?;
        if order.payment_status == PaymentStatus::Paid {
            debug!("💳️ Captured payment {payment_id} for order {} was already recorded", order.code);
            return Ok(order);
        }
        let order = self.db.mark_payment(&order.code, PaymentStatus::Paid, Some(payment_id)).await?;
        info!("💳️ Captured payment {payment_id} recorded for order {}", order.code);
        self.call_payment_verified_hook(&order, payment_id).await;
        Ok(order)
    }

    async fn call_payment_verified_hook(&self, order: &Order, payment_id: &str) {
        for emitter in &self.producers.payment_verified_producer {
            debug!("💳️ Notifying payment verified hook subscribers");
            emitter.publish_event(PaymentVerifiedEvent::new(order.clone(), payment_id.to_string())).await;
        }
    }
}
