use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bazaar_engine::{
    db_types::{Channel, Money, Product, Role, Shop},
    traits::CatalogError,
    CatalogApi,
};
use chrono::{TimeZone, Utc};
use mockall::predicate::{always, eq};
use serde_json::json;

use super::helpers::{api_request, get_request, issue_token, post_request, public_request};
use crate::{
    endpoint_tests::mocks::MockBackend,
    routes::{
        AddProductRoute,
        MyProductsRoute,
        ProductByIdRoute,
        RemoveProductRoute,
        SearchProductsRoute,
        ShopByIdRoute,
        ShopProductsRoute,
        ShopsRoute,
    },
};

#[actix_web::test]
async fn browse_food_shops() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_request(TestRequest::get().uri("/shops?channel=food"), configure_public).await;
    assert_eq!(status, StatusCode::OK);
    let shops: Vec<Shop> = serde_json::from_str(&body).unwrap();
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].channel, Channel::Food);
}

#[actix_web::test]
async fn unknown_channels_are_bad_requests() {
    let _ = env_logger::try_init().ok();
    let (status, _) = public_request(TestRequest::get().uri("/shops?channel=pharmacy"), configure_public).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn shop_menus_only_show_available_products() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_request(TestRequest::get().uri("/shops/1/products"), configure_public).await;
    assert_eq!(status, StatusCode::OK);
    let products: Vec<Product> = serde_json::from_str(&body).unwrap();
    assert_eq!(products.len(), 1);
    let (status, _) = public_request(TestRequest::get().uri("/shops/2/products"), configure_public).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn search_is_not_mistaken_for_a_product_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_request(TestRequest::get().uri("/products/search?q=dosa"), configure_public).await;
    assert_eq!(status, StatusCode::OK);
    let products: Vec<Product> = serde_json::from_str(&body).unwrap();
    assert_eq!(products[0].name, "Masala Dosa");

    let (status, _) = public_request(TestRequest::get().uri("/products/10"), configure_public).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = public_request(TestRequest::get().uri("/products/404"), configure_public).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("404"), "{body}");
}

#[actix_web::test]
async fn sellers_list_their_products() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(2, Role::Seller);
    let product = json!({ "name": "Filter Coffee", "price": 3000 });
    let (status, body) = post_request(&token, "/api/seller/products", product, configure_seller).await;
    assert_eq!(status, StatusCode::CREATED);
    let product: Product = serde_json::from_str(&body).unwrap();
    assert_eq!(product.price, Money::from(3000));

    let free = json!({ "name": "Free Coffee", "price": 0 });
    let (status, _) = post_request(&token, "/api/seller/products", free, configure_seller).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_request(&token, "/api/seller/products", configure_seller).await;
    assert_eq!(status, StatusCode::OK);
    let products: Vec<Product> = serde_json::from_str(&body).unwrap();
    assert_eq!(products.len(), 2);
}

#[actix_web::test]
async fn sellers_cannot_remove_other_sellers_products() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(2, Role::Seller);
    let (status, _) = api_request(TestRequest::delete().uri("/api/seller/products/30"), &token, configure_seller).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = issue_token(1, Role::Admin);
    let (status, _) = api_request(TestRequest::delete().uri("/api/seller/products/30"), &token, configure_seller).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn timestamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn shop(id: i64, seller_id: i64, channel: Channel) -> Shop {
    Shop {
        id,
        seller_id,
        name: format!("Shop {id}"),
        description: None,
        channel,
        address: "Indiranagar, Bengaluru".into(),
        is_open: true,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

fn product(id: i64, name: &str, rupees: i64) -> Product {
    Product {
        id,
        shop_id: 1,
        seller_id: 2,
        name: name.into(),
        description: None,
        channel: Channel::Food,
        price: Money::from_rupees(rupees),
        is_available: true,
        image_url: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

fn configure_public(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_list_shops().with(eq(Some(Channel::Food))).returning(|_| Ok(vec![shop(1, 2, Channel::Food)]));
    backend.expect_fetch_shop().with(eq(1)).returning(|id| Ok(Some(shop(id, 2, Channel::Food))));
    backend.expect_fetch_shop().with(eq(2)).returning(|_| Ok(None));
    backend
        .expect_list_products_for_shop()
        .with(eq(1), eq(true))
        .returning(|_, _| Ok(vec![product(10, "Masala Dosa", 120)]));
    backend
        .expect_search_products()
        .with(eq("dosa"), eq(None::<Channel>))
        .returning(|_, _| Ok(vec![product(10, "Masala Dosa", 120)]));
    backend.expect_fetch_product().with(eq(10)).returning(|id| Ok(Some(product(id, "Masala Dosa", 120))));
    backend.expect_fetch_product().with(eq(404)).returning(|_| Ok(None));
    let catalog_api = CatalogApi::new(backend);
    cfg.service(ShopsRoute::<MockBackend>::new())
        .service(ShopByIdRoute::<MockBackend>::new())
        .service(ShopProductsRoute::<MockBackend>::new())
        .service(SearchProductsRoute::<MockBackend>::new())
        .service(ProductByIdRoute::<MockBackend>::new())
        .app_data(web::Data::new(catalog_api));
}

fn configure_seller(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_create_product().with(eq(2), always()).returning(|_, new_product| {
        Ok(Product { name: new_product.name, price: new_product.price, ..product(31, "", 0) })
    });
    backend
        .expect_fetch_shop_for_seller()
        .with(eq(2))
        .returning(|seller_id| Ok(Some(shop(1, seller_id, Channel::Food))));
    backend.expect_fetch_shop().with(eq(1)).returning(|id| Ok(Some(shop(id, 2, Channel::Food))));
    backend.expect_list_products_for_shop().with(eq(1), eq(false)).returning(|_, _| {
        let mut hidden = product(11, "Chai", 20);
        hidden.is_available = false;
        Ok(vec![product(10, "Masala Dosa", 120), hidden])
    });
    backend
        .expect_delete_product()
        .with(eq(2), eq(30))
        .returning(|_, id| Err(CatalogError::NotOwner(format!("product {id}"))));
    let catalog_api = CatalogApi::new(backend);
    cfg.service(AddProductRoute::<MockBackend>::new())
        .service(MyProductsRoute::<MockBackend>::new())
        .service(RemoveProductRoute::<MockBackend>::new())
        .app_data(web::Data::new(catalog_api));
}
