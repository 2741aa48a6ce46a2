//! Order flow tests run against a real SQLite database, since a checkout touches carts, addresses, orders and
//! notifications all at once.
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
    Scope,
};
use bazaar_common::Secret;
use bazaar_engine::{
    api::order_objects::{OrderChanged, OutstandingCash},
    db_types::{
        Address,
        Channel,
        FulfillmentStatus,
        Money,
        NewAddress,
        NewProduct,
        NewShop,
        NewUserAccount,
        Order,
        PaymentStatus,
        Product,
        Role,
        UserAccount,
    },
    events::EventProducers,
    helpers::payment_signature,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{AccountManagement, GatewayOrder},
    AccountApi,
    AdminApi,
    CartApi,
    CatalogApi,
    OrderFlowApi,
    PaymentApi,
    SqliteDatabase,
};
use serde_json::{json, Value};

use super::helpers::{call, get_auth_config};
use crate::{
    auth::{TokenIssuer, TokenValidator},
    middleware::JwtMiddlewareFactory,
    routes::*,
};

pub const GATEWAY_SECRET: &str = "gateway-secret-for-tests";

pub struct Market {
    pub db: SqliteDatabase,
    pub customer: UserAccount,
    pub address: Address,
    pub seller: UserAccount,
    pub agent: UserAccount,
    pub admin: UserAccount,
    /// ₹120.00
    pub dosa: Product,
}

impl Market {
    pub fn token(&self, user: &UserAccount) -> String {
        TokenIssuer::new(&get_auth_config()).issue_token(user).expect("Failed to sign token")
    }
}

pub async fn market() -> Market {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let admin_api = AdminApi::new(db.clone());
    let catalog = CatalogApi::new(db.clone());

    let customer = db.create_user(NewUserAccount::customer("Asha", "9000000001")).await.expect("customer");
    let address = NewAddress {
        label: "Home".into(),
        line1: "12 MG Road".into(),
        line2: None,
        city: "Bengaluru".into(),
        state: "Karnataka".into(),
        pincode: "560001".into(),
        phone: "9000000001".into(),
        is_default: true,
    };
    let address = AccountApi::new(db.clone()).add_address(customer.id, address).await.expect("address");
    let staff = |name: &str, phone: &str, role: Role| NewUserAccount::customer(name, phone).with_role(role);
    let seller = admin_api.register_user(staff("Ravi", "9000000002", Role::Seller)).await.expect("seller");
    let agent = admin_api.register_user(staff("Suresh", "9000000005", Role::DeliveryBoy)).await.expect("agent");
    let admin = admin_api.register_user(staff("Anita", "9000000009", Role::Admin)).await.expect("admin");
    let shop = NewShop {
        name: "Dosa Corner".into(),
        description: None,
        channel: Channel::Food,
        address: "Indiranagar, Bengaluru".into(),
    };
    catalog.open_shop(seller.id, shop).await.expect("shop");
    let dosa = NewProduct {
        name: "Masala Dosa".into(),
        description: None,
        price: Money::from_rupees(120),
        image_url: None,
    };
    let dosa = catalog.add_product(seller.id, dosa).await.expect("dosa");
    Market { db, customer, address, seller, agent, admin, dosa }
}

pub fn mount(cfg: &mut ServiceConfig, db: SqliteDatabase) {
    let secret = Secret::new(GATEWAY_SECRET.to_string());
    cfg.app_data(web::Data::new(OrderFlowApi::new(db.clone(), EventProducers::default())))
        .app_data(web::Data::new(PaymentApi::new(db.clone(), Gateway::default(), secret, EventProducers::default())))
        .app_data(web::Data::new(CartApi::new(db.clone())))
        .app_data(web::Data::new(AccountApi::new(db.clone())))
        .app_data(web::Data::new(AdminApi::new(db)))
        .service(AddToCartRoute::<SqliteDatabase>::new())
        .service(CheckoutRoute::<SqliteDatabase>::new())
        .service(MyOrderRoute::<SqliteDatabase>::new())
        .service(CancelOrderRoute::<SqliteDatabase>::new())
        .service(InitiatePaymentRoute::<SqliteDatabase>::new())
        .service(VerifyPaymentRoute::<SqliteDatabase>::new())
        .service(SellerOrdersRoute::<SqliteDatabase>::new())
        .service(UpdateItemStatusRoute::<SqliteDatabase>::new())
        .service(SetAvailabilityRoute::<SqliteDatabase>::new())
        .service(PendingDeliveriesRoute::<SqliteDatabase>::new())
        .service(AcceptDeliveryRoute::<SqliteDatabase>::new())
        .service(PickUpOrderRoute::<SqliteDatabase>::new())
        .service(DeliverOrderRoute::<SqliteDatabase>::new())
        .service(SearchOrdersRoute::<SqliteDatabase>::new())
        .service(OutstandingCashRoute::<SqliteDatabase>::new());
}

fn api_scope(
    db: SqliteDatabase,
) -> Scope<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let validator = TokenValidator::new(&get_auth_config());
    web::scope("/api").wrap(JwtMiddlewareFactory::new(validator)).configure(move |cfg| mount(cfg, db))
}

fn get(token: &str, path: &str) -> TestRequest {
    TestRequest::get().uri(path).insert_header(("Authorization", format!("Bearer {token}")))
}

fn post(token: &str, path: &str, body: Value) -> TestRequest {
    TestRequest::post().uri(path).insert_header(("Authorization", format!("Bearer {token}"))).set_json(body)
}

#[actix_web::test]
async fn cash_on_delivery_order_from_cart_to_doorstep() {
    let m = market().await;
    let service = test::init_service(App::new().service(api_scope(m.db.clone()))).await;
    let customer = m.token(&m.customer);
    let seller = m.token(&m.seller);
    let agent = m.token(&m.agent);
    let admin = m.token(&m.admin);

    let item = json!({ "product_id": m.dosa.id, "quantity": 2 });
    let (status, _) = call(&service, post(&customer, "/api/cart/food/items", item).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let checkout = json!({ "channel": "food", "address_id": m.address.id, "payment_method": "CashOnDelivery" });
    let (status, body) = call(&service, post(&customer, "/api/orders", checkout).to_request()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.amount, Money::from_rupees(240));
    assert_eq!(order.delivery_status, FulfillmentStatus::Processing);
    let code = order.code.clone();

    // Seller sees the order and confirms the item
    let (_, body) = call(&service, get(&seller, "/api/seller/orders").to_request()).await;
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 1);
    let path = format!("/api/seller/orders/{code}/items/{}/status", order.items[0].id);
    let (status, body) = call(&service, post(&seller, &path, json!({ "status": "Preparing" })).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let changed: OrderChanged = serde_json::from_str(&body).unwrap();
    assert_eq!(changed.order.delivery_status, FulfillmentStatus::Preparing);

    // Off-duty agents see nothing and cannot claim the order
    let (_, body) = call(&service, get(&agent, "/api/delivery/pending").to_request()).await;
    assert_eq!(body, "[]");
    let accept = format!("/api/delivery/orders/{code}/accept");
    let (status, _) = call(&service, post(&agent, &accept, json!({})).to_request()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let on_duty = json!({ "is_available": true });
    let (status, _) = call(&service, post(&agent, "/api/delivery/availability", on_duty).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&service, get(&agent, "/api/delivery/pending").to_request()).await;
    let pending: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].code, code);

    let (status, body) = call(&service, post(&agent, &accept, json!({})).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let pickup = format!("/api/delivery/orders/{code}/pickup");
    let (status, body) = call(&service, post(&agent, &pickup, json!({})).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let changed: OrderChanged = serde_json::from_str(&body).unwrap();
    assert_eq!(changed.order.delivery_status, FulfillmentStatus::OutForDelivery);

    // Too late to cancel once the order has left the shop
    let cancel = format!("/api/orders/{code}/cancel");
    let (status, _) = call(&service, post(&customer, &cancel, json!({})).to_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let deliver = format!("/api/delivery/orders/{code}/deliver");
    let (status, body) = call(&service, post(&agent, &deliver, json!({})).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let changed: OrderChanged = serde_json::from_str(&body).unwrap();
    assert_eq!(changed.order.delivery_status, FulfillmentStatus::Delivered);
    assert_eq!(changed.settlements.len(), 1);
    assert_eq!(changed.settlements[0].seller_id, m.seller.id);

    // The agent now owes the cash they collected
    let (status, body) = call(&service, get(&admin, "/api/admin/cash").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let cash: Vec<OutstandingCash> = serde_json::from_str(&body).unwrap();
    assert_eq!(cash.len(), 1);
    assert_eq!(cash[0].delivery_boy_id, m.agent.id);
    assert_eq!(cash[0].amount, Money::from_rupees(240));

    let query = json!({ "status": ["Delivered"] });
    let (status, body) = call(&service, post(&admin, "/api/admin/orders/search", query).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let found: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(found.len(), 1);
    // Customers cannot search
    let (status, _) = call(&service, post(&customer, "/api/admin/orders/search", json!({})).to_request()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn checkout_with_an_empty_cart() {
    let m = market().await;
    let service = test::init_service(App::new().service(api_scope(m.db.clone()))).await;
    let customer = m.token(&m.customer);
    let checkout = json!({ "channel": "food", "address_id": m.address.id, "payment_method": "Online" });
    let (status, _) = call(&service, post(&customer, "/api/orders", checkout).to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn customers_only_see_their_own_orders() {
    let m = market().await;
    let service = test::init_service(App::new().service(api_scope(m.db.clone()))).await;
    let customer = m.token(&m.customer);
    let item = json!({ "product_id": m.dosa.id });
    call(&service, post(&customer, "/api/cart/food/items", item).to_request()).await;
    let checkout = json!({ "channel": "food", "address_id": m.address.id, "payment_method": "CashOnDelivery" });
    let (_, body) = call(&service, post(&customer, "/api/orders", checkout).to_request()).await;
    let order: Order = serde_json::from_str(&body).unwrap();

    let path = format!("/api/orders/{}", order.code);
    let (status, _) = call(&service, get(&customer, &path).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let stranger = m.db.create_user(NewUserAccount::customer("Vikram", "9000000010")).await.unwrap();
    let (status, _) = call(&service, get(&m.token(&stranger), &path).to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&service, get(&customer, "/api/orders/ZZZZZZ").to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn online_payment_is_verified_by_signature() {
    let m = market().await;
    let service = test::init_service(App::new().service(api_scope(m.db.clone()))).await;
    let customer = m.token(&m.customer);
    let seller = m.token(&m.seller);
    let item = json!({ "product_id": m.dosa.id, "quantity": 1 });
    call(&service, post(&customer, "/api/cart/food/items", item).to_request()).await;
    let checkout = json!({ "channel": "food", "address_id": m.address.id, "payment_method": "Online" });
    let (status, body) = call(&service, post(&customer, "/api/orders", checkout).to_request()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order: Order = serde_json::from_str(&body).unwrap();
    let code = order.code.clone();

    // Unpaid online orders cannot be prepared
    let path = format!("/api/seller/orders/{code}/items/{}/status", order.items[0].id);
    let (status, _) = call(&service, post(&seller, &path, json!({ "status": "Preparing" })).to_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let pay = format!("/api/orders/{code}/pay");
    let (status, body) = call(&service, post(&customer, &pay, json!({})).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let gateway_order: GatewayOrder = serde_json::from_str(&body).unwrap();
    assert_eq!(gateway_order.amount, Money::from_rupees(120));

    let verify = format!("/api/orders/{code}/pay/verify");
    let forged = json!({ "gateway_order_id": gateway_order.id, "payment_id": "pay_123", "signature": "00ff" });
    let (status, _) = call(&service, post(&customer, &verify, forged).to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let signature = payment_signature(GATEWAY_SECRET, &gateway_order.id, "pay_123");
    let genuine = json!({ "gateway_order_id": gateway_order.id, "payment_id": "pay_123", "signature": signature });
    let (status, body) = call(&service, post(&customer, &verify, genuine.clone()).to_request()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_123"));

    // Verifying twice is harmless
    let (status, _) = call(&service, post(&customer, &verify, genuine).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&service, post(&seller, &path, json!({ "status": "Preparing" })).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    // Paying again is not
    let (status, _) = call(&service, post(&customer, &pay, json!({})).to_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
