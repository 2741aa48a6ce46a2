use actix_http::Request;
use actix_web::{
    body::{to_bytes, MessageBody},
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use bazaar_engine::db_types::{Role, UserAccount};
use chrono::{Duration, TimeZone, Utc};
use log::debug;

use crate::{
    auth::{TokenIssuer, TokenValidator},
    config::AuthConfig,
    middleware::JwtMiddlewareFactory,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this key anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new("3f9d0c3b6a1e4b7d9c2f5a8e1d4c7b0a6e3f9d2c", Duration::hours(1))
}

pub fn test_user(id: i64, role: Role) -> UserAccount {
    let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    UserAccount {
        id,
        name: format!("User {id}"),
        phone: format!("90000000{id:02}"),
        email: None,
        role,
        created_at: created,
        updated_at: created,
    }
}

pub fn issue_token(user_id: i64, role: Role) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(&test_user(user_id, role)).expect("Failed to sign token")
}

/// Calls a route that `configure` mounts inside the authenticated `/api` scope. An empty token sends no
/// `Authorization` header.
pub async fn api_request(req: TestRequest, token: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = if token.is_empty() { req } else { req.insert_header(("Authorization", format!("Bearer {token}"))) };
    let validator = TokenValidator::new(&get_auth_config());
    let app = App::new().service(web::scope("/api").wrap(JwtMiddlewareFactory::new(validator)).configure(configure));
    let service = test::init_service(app).await;
    call(&service, req.to_request()).await
}

/// Calls a route that needs no access token.
pub async fn public_request(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let service = test::init_service(App::new().configure(configure)).await;
    call(&service, req.to_request()).await
}

pub async fn get_request(token: &str, path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    api_request(TestRequest::get().uri(path), token, configure).await
}

pub async fn post_request(
    token: &str,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    api_request(TestRequest::post().uri(path).set_json(body), token, configure).await
}

/// Middleware rejections surface as errors rather than responses in the test harness, so both are turned into a
/// status and a body here.
pub async fn call<S, B>(service: &S, req: Request) -> (StatusCode, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    debug!("Making request to {}", req.path());
    match test::try_call_service(service, req).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = to_bytes(res.into_body()).await.expect("Could not read error body");
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}
