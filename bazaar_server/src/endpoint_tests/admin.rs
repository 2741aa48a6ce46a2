use actix_web::{http::StatusCode, web, web::ServiceConfig};
use bazaar_engine::{
    db_types::{DeliveryAgent, FulfillmentStatus, Money, Role, UserAccount},
    order_objects::{DashboardSummary, StatusCount},
    AdminApi,
};
use mockall::predicate::eq;
use serde_json::{json, Value};

use super::helpers::{get_request, issue_token, post_request, test_user};
use crate::{
    endpoint_tests::mocks::MockBackend,
    routes::{CollectCashRoute, DashboardRoute, RegisterUserRoute},
};

#[actix_web::test]
async fn dashboard_is_for_admins_only() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(2, Role::Seller);
    let (status, _) = get_request(&token, "/api/admin/dashboard", configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = issue_token(1, Role::Admin);
    let (status, body) = get_request(&token, "/api/admin/dashboard", configure).await;
    assert_eq!(status, StatusCode::OK);
    let summary: DashboardSummary = serde_json::from_str(&body).unwrap();
    assert_eq!(summary.total_orders, 3);
    assert_eq!(summary.outstanding_cash, Money::from_rupees(450));
    assert_eq!(summary.orders_by_status[0].status, FulfillmentStatus::Delivered);
}

#[actix_web::test]
async fn collect_cash_from_an_agent() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(1, Role::Admin);
    let (status, body) = post_request(&token, "/api/admin/cash/5/collect", json!({}), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Collected ₹450.00 from agent #5"}"#);

    let (status, body) = post_request(&token, "/api/admin/cash/3/collect", json!({}), configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("User 3 is not a DeliveryBoy"), "{body}");
}

#[actix_web::test]
async fn register_staff() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(1, Role::Admin);
    let seller = json!({ "name": "Ravi", "phone": "9000000002", "role": "seller" });
    let (status, body) = post_request(&token, "/api/admin/users", seller, configure).await;
    assert_eq!(status, StatusCode::CREATED);
    let user: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(user["role"], "seller");
    assert_eq!(user["name"], "Ravi");

    let customer = json!({ "name": "Asha", "phone": "9000000001", "role": "customer" });
    let (status, _) = post_request(&token, "/api/admin/users", customer, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_dashboard_summary().returning(|| {
        Ok(DashboardSummary {
            total_orders: 3,
            orders_by_status: vec![
                StatusCount { status: FulfillmentStatus::Delivered, count: 2 },
                StatusCount { status: FulfillmentStatus::Processing, count: 1 },
            ],
            delivered_revenue: Money::from_rupees(900),
            customers: 4,
            sellers: 2,
            delivery_agents: 1,
            available_agents: 1,
            outstanding_cash: Money::from_rupees(450),
        })
    });
    backend.expect_fetch_delivery_agent().with(eq(5)).returning(|id| {
        Ok(Some(DeliveryAgent { user_id: id, name: "User 5".into(), phone: "9000000005".into(), is_available: true }))
    });
    backend.expect_fetch_delivery_agent().with(eq(3)).returning(|_| Ok(None));
    backend.expect_collect_cash().with(eq(5)).returning(|_| Ok(Money::from_rupees(450)));
    backend.expect_create_user().returning(|new_user| {
        Ok(UserAccount { name: new_user.name, phone: new_user.phone, ..test_user(12, new_user.role) })
    });
    cfg.service(DashboardRoute::<MockBackend>::new())
        .service(CollectCashRoute::<MockBackend>::new())
        .service(RegisterUserRoute::<MockBackend>::new())
        .app_data(web::Data::new(AdminApi::new(backend)));
}
