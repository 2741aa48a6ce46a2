use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bazaar_engine::{
    db_types::{Address, DeliveryAgent, Role},
    traits::AccountApiError,
    AccountApi,
};
use chrono::{Duration, TimeZone, Utc};
use mockall::predicate::eq;
use serde_json::{json, Value};

use super::helpers::{api_request, get_request, issue_token, post_request, test_user};
use crate::{
    auth::TokenIssuer,
    config::AuthConfig,
    endpoint_tests::mocks::MockBackend,
    routes::{
        AddAddressRoute,
        AgentProfileRoute,
        DeleteAddressRoute,
        MarkAllNotificationsReadRoute,
        MyAddressesRoute,
        MyProfileRoute,
        MySalesRoute,
        SetAvailabilityRoute,
    },
};

#[actix_web::test]
async fn fetch_my_profile_no_token() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/api/profile", configure_untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token was provided"), "{body}");
}

#[actix_web::test]
async fn fetch_my_profile_garbage_token() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request("not.a.token", "/api/profile", configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fetch_my_profile_token_from_another_server() {
    let _ = env_logger::try_init().ok();
    let other = AuthConfig::new("a-completely-different-signing-key-98765", Duration::hours(1));
    let token = TokenIssuer::new(&other).issue_token(&test_user(7, Role::Customer)).unwrap();
    let (status, body) = get_request(&token, "/api/profile", configure_untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "{body}");
}

#[actix_web::test]
async fn fetch_my_profile() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(7, Role::Customer);
    let (status, body) = get_request(&token, "/api/profile", configure).await;
    assert_eq!(status, StatusCode::OK);
    let user: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(user["id"], 7);
    assert_eq!(user["name"], "User 7");
    assert_eq!(user["role"], "customer");
}

#[actix_web::test]
async fn profile_of_a_deleted_user() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(99, Role::Customer);
    let (status, body) = get_request(&token, "/api/profile", configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.starts_with(r#"{"error":"#), "{body}");
}

#[actix_web::test]
async fn add_and_list_addresses() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(7, Role::Customer);
    let new_address = json!({
        "label": "Home",
        "line1": "12 MG Road",
        "city": "Bengaluru",
        "state": "Karnataka",
        "pincode": "560001",
        "phone": "9000000007"
    });
    let (status, body) = post_request(&token, "/api/addresses", new_address, configure).await;
    assert_eq!(status, StatusCode::CREATED);
    let address: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(address["is_default"], true);

    let (status, body) = get_request(&token, "/api/addresses", configure).await;
    assert_eq!(status, StatusCode::OK);
    let addresses: Vec<Address> = serde_json::from_str(&body).unwrap();
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].user_id, 7);
}

#[actix_web::test]
async fn invalid_addresses_never_reach_the_database() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(7, Role::Customer);
    let new_address = json!({
        "label": "Home",
        "line1": "12 MG Road",
        "city": "Bengaluru",
        "state": "Karnataka",
        "pincode": "56",
        "phone": "9000000007"
    });
    let (status, _) = post_request(&token, "/api/addresses", new_address, configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn delete_someone_elses_address() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(7, Role::Customer);
    let req = TestRequest::delete().uri("/api/addresses/3");
    let (status, body) = api_request(req, &token, configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Address 3"), "{body}");
}

#[actix_web::test]
async fn mark_all_notifications_read() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(7, Role::Customer);
    let (status, body) = post_request(&token, "/api/notifications/read_all", json!({}), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"4 notifications marked as read"}"#);
}

#[actix_web::test]
async fn seller_routes_are_closed_to_customers() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(7, Role::Customer);
    let (status, body) = get_request(&token, "/api/seller/sales", configure_untouched).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Customer"), "{body}");

    let token = issue_token(2, Role::Seller);
    let (status, body) = get_request(&token, "/api/seller/sales", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[actix_web::test]
async fn agents_go_on_duty() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(5, Role::DeliveryBoy);
    let (status, body) = get_request(&token, "/api/delivery/profile", configure).await;
    assert_eq!(status, StatusCode::OK);
    let agent: DeliveryAgent = serde_json::from_str(&body).unwrap();
    assert!(!agent.is_available);

    let (status, body) =
        post_request(&token, "/api/delivery/availability", json!({ "is_available": true }), configure).await;
    assert_eq!(status, StatusCode::OK);
    let agent: DeliveryAgent = serde_json::from_str(&body).unwrap();
    assert!(agent.is_available);

    let token = issue_token(7, Role::Customer);
    let (status, _) =
        post_request(&token, "/api/delivery/availability", json!({ "is_available": true }), configure_untouched).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn address(id: i64, user_id: i64) -> Address {
    Address {
        id,
        user_id,
        label: "Home".into(),
        line1: "12 MG Road".into(),
        line2: None,
        city: "Bengaluru".into(),
        state: "Karnataka".into(),
        pincode: "560001".into(),
        phone: "9000000007".into(),
        is_default: true,
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    }
}

fn agent(is_available: bool) -> DeliveryAgent {
    DeliveryAgent { user_id: 5, name: "User 5".into(), phone: "9000000005".into(), is_available }
}

fn mount(cfg: &mut ServiceConfig, backend: MockBackend) {
    cfg.service(MyProfileRoute::<MockBackend>::new())
        .service(MyAddressesRoute::<MockBackend>::new())
        .service(AddAddressRoute::<MockBackend>::new())
        .service(DeleteAddressRoute::<MockBackend>::new())
        .service(MarkAllNotificationsReadRoute::<MockBackend>::new())
        .service(MySalesRoute::<MockBackend>::new())
        .service(AgentProfileRoute::<MockBackend>::new())
        .service(SetAvailabilityRoute::<MockBackend>::new())
        .app_data(web::Data::new(AccountApi::new(backend)));
}

// No expectations are set, so any call to the backend fails the test
fn configure_untouched(cfg: &mut ServiceConfig) {
    mount(cfg, MockBackend::new());
}

fn configure(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_user().with(eq(7)).returning(|id| Ok(Some(test_user(id, Role::Customer))));
    backend.expect_fetch_user().with(eq(99)).returning(|_| Ok(None));
    backend.expect_add_address().with(eq(7), mockall::predicate::always()).returning(|user_id, _| {
        Ok(address(1, user_id))
    });
    backend.expect_fetch_addresses().with(eq(7)).returning(|user_id| Ok(vec![address(1, user_id)]));
    backend.expect_delete_address().with(eq(7), eq(3)).returning(|_, id| Err(AccountApiError::AddressNotFound(id)));
    backend.expect_mark_all_notifications_read().with(eq(7)).returning(|_| Ok(4));
    backend.expect_fetch_sales_history().with(eq(2)).returning(|_| Ok(vec![]));
    backend.expect_fetch_delivery_agent().with(eq(5)).returning(|_| Ok(Some(agent(false))));
    backend.expect_set_agent_availability().with(eq(5), eq(true)).returning(|_, available| Ok(agent(available)));
    mount(cfg, backend);
}
