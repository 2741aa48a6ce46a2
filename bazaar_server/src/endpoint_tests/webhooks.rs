use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use bazaar_common::Secret;
use bazaar_engine::{
    db_types::{Channel, OrderCode, PaymentMethod, PaymentStatus},
    events::EventProducers,
    traits::GatewayOrder,
    CartApi,
    OrderFlowApi,
    PaymentApi,
    SqliteDatabase,
};
use serde_json::json;

use super::{
    helpers::call,
    orders::{market, Market, GATEWAY_SECRET},
};
use crate::{
    config::WEBHOOK_SIGNATURE_HEADER,
    helpers::calculate_hmac,
    middleware::WebhookAuthFactory,
    routes::{Gateway, PaymentWebhookRoute},
};

const WEBHOOK_SECRET: &str = "webhook-secret-for-tests";

fn payments(db: &SqliteDatabase) -> PaymentApi<SqliteDatabase, Gateway> {
    let secret = Secret::new(GATEWAY_SECRET.to_string());
    PaymentApi::new(db.clone(), Gateway::default(), secret, EventProducers::default())
}

/// An online order that is waiting for the gateway to report the payment.
async fn awaiting_payment(m: &Market) -> (OrderCode, GatewayOrder) {
    CartApi::new(m.db.clone()).add_item(m.customer.id, Channel::Food, m.dosa.id, 1).await.expect("Error filling cart");
    let orders = OrderFlowApi::new(m.db.clone(), EventProducers::default());
    let order =
        orders.checkout(m.customer.id, Channel::Food, m.address.id, PaymentMethod::Online).await.expect("checkout");
    let gateway_order = payments(&m.db).initiate_payment(m.customer.id, &order.code).await.expect("initiate");
    (order.code, gateway_order)
}

fn webhook(body: &serde_json::Value, signature: Option<String>) -> TestRequest {
    let req = TestRequest::post()
        .uri("/webhook/payment")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    match signature {
        Some(sig) => req.insert_header((WEBHOOK_SIGNATURE_HEADER, sig)),
        None => req,
    }
}

#[actix_web::test]
async fn captured_payment_marks_the_order_paid() {
    let m = market().await;
    let (code, gateway_order) = awaiting_payment(&m).await;
    let scope = web::scope("/webhook")
        .wrap(WebhookAuthFactory::new(WEBHOOK_SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), true))
        .app_data(web::Data::new(payments(&m.db)))
        .service(PaymentWebhookRoute::<SqliteDatabase>::new());
    let service = test::init_service(App::new().service(scope)).await;

    let body = json!({ "event": "payment.captured", "gateway_order_id": gateway_order.id, "payment_id": "pay_987" });
    let (status, msg) = call(&service, webhook(&body, None).to_request()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(msg.contains("Missing webhook signature"), "{msg}");

    let forged = calculate_hmac("not-the-secret", body.to_string().as_bytes());
    let (status, _) = call(&service, webhook(&body, Some(forged)).to_request()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let orders = OrderFlowApi::new(m.db.clone(), EventProducers::default());
    let order = orders.order_by_code(&code).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    let signature = calculate_hmac(WEBHOOK_SECRET, body.to_string().as_bytes());
    let (status, msg) = call(&service, webhook(&body, Some(signature)).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{msg}");
    assert_eq!(msg, format!(r#"{{"success":true,"message":"Payment recorded for order {code}"}}"#));
    let order = orders.order_by_code(&code).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_987"));
}

#[actix_web::test]
async fn other_events_are_acknowledged_and_ignored() {
    let m = market().await;
    let (code, gateway_order) = awaiting_payment(&m).await;
    let scope = web::scope("/webhook")
        .wrap(WebhookAuthFactory::new(WEBHOOK_SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), true))
        .app_data(web::Data::new(payments(&m.db)))
        .service(PaymentWebhookRoute::<SqliteDatabase>::new());
    let service = test::init_service(App::new().service(scope)).await;

    let body = json!({ "event": "payment.failed", "gateway_order_id": gateway_order.id, "payment_id": "pay_987" });
    let signature = calculate_hmac(WEBHOOK_SECRET, body.to_string().as_bytes());
    let (status, msg) = call(&service, webhook(&body, Some(signature)).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(msg.contains("payment.failed event ignored"), "{msg}");
    let orders = OrderFlowApi::new(m.db.clone(), EventProducers::default());
    let order = orders.order_by_code(&code).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn unknown_gateway_orders_are_rejected() {
    let m = market().await;
    let scope = web::scope("/webhook")
        .wrap(WebhookAuthFactory::new(WEBHOOK_SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), false))
        .app_data(web::Data::new(payments(&m.db)))
        .service(PaymentWebhookRoute::<SqliteDatabase>::new());
    let service = test::init_service(App::new().service(scope)).await;

    // Signature checks are switched off, so no signature is needed to reach the handler
    let body = json!({ "event": "payment.captured", "gateway_order_id": "order_nope", "payment_id": "pay_1" });
    let (status, msg) = call(&service, webhook(&body, None).to_request()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(msg.contains("order_nope"), "{msg}");
}
