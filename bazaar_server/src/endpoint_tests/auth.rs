use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bazaar_engine::{
    db_types::{OtpRecord, Role, UserAccount},
    AuthApi,
};
use chrono::{Duration, Utc};
use mockall::predicate::{always, eq};
use serde_json::json;

use super::helpers::{get_auth_config, public_request, test_user};
use crate::{
    auth::{TokenIssuer, TokenValidator},
    data_objects::LoginResponse,
    endpoint_tests::mocks::MockBackend,
    routes::{RequestOtpRoute, Sms, VerifyOtpRoute},
};

const PHONE: &str = "9876543210";

#[actix_web::test]
async fn request_otp_for_an_invalid_phone() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/auth/otp").set_json(json!({ "phone": "12345" }));
    let (status, body) = public_request(req, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("12345"), "{body}");
}

#[actix_web::test]
async fn request_otp() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/auth/otp").set_json(json!({ "phone": PHONE }));
    let (status, body) = public_request(req, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"One-time password sent."}"#);
}

#[actix_web::test]
async fn first_login_issues_a_token_for_a_new_customer() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "phone": PHONE, "code": "123456", "name": "Priya" });
    let req = TestRequest::post().uri("/auth/verify").set_json(body);
    let (status, body) = public_request(req, configure).await;
    assert_eq!(status, StatusCode::OK);
    let login: LoginResponse = serde_json::from_str(&body).unwrap();
    assert!(login.new_user);
    assert_eq!(login.user.id, 11);
    assert_eq!(login.user.name, "Priya");
    let claims = TokenValidator::new(&get_auth_config()).validate(&login.access_token).unwrap();
    assert_eq!(claims.user_id, 11);
    assert_eq!(claims.role, Role::Customer);
}

#[actix_web::test]
async fn wrong_code_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "phone": PHONE, "code": "000000" });
    let req = TestRequest::post().uri("/auth/verify").set_json(body);
    let (status, body) = public_request(req, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Login failed"), "{body}");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_upsert_otp().with(eq(PHONE), always(), always()).times(0..=1).returning(|_, code, expires| {
        assert_eq!(code.len(), 6);
        assert!(expires > Utc::now());
        Ok(())
    });
    backend.expect_fetch_otp().with(eq(PHONE)).returning(|phone| {
        Ok(Some(OtpRecord {
            phone: phone.to_string(),
            code: "123456".into(),
            attempts: 0,
            expires_at: Utc::now() + Duration::minutes(5),
        }))
    });
    backend.expect_increment_otp_attempts().with(eq(PHONE)).returning(|_| Ok(1));
    backend.expect_fetch_user_by_phone().with(eq(PHONE)).returning(|_| Ok(None));
    backend.expect_create_user().returning(|new_user| {
        Ok(UserAccount { name: new_user.name, phone: new_user.phone, ..test_user(11, new_user.role) })
    });
    backend.expect_delete_otp().with(eq(PHONE)).returning(|_| Ok(()));
    let auth_api = AuthApi::new(backend, Sms::default());
    cfg.service(RequestOtpRoute::<MockBackend>::new())
        .service(VerifyOtpRoute::<MockBackend>::new())
        .app_data(web::Data::new(auth_api))
        .app_data(web::Data::new(TokenIssuer::new(&get_auth_config())));
}
