mod accounts;
mod admin;
mod auth;
mod catalog;
mod helpers;
mod mocks;
mod orders;
mod webhooks;

use actix_web::{http::StatusCode, test::TestRequest};

use crate::routes::health;

#[actix_web::test]
async fn health_check() {
    let (status, body) = helpers::public_request(TestRequest::get().uri("/health"), |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}
