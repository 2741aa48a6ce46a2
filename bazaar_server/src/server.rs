use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bazaar_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    AccountApi,
    AdminApi,
    AuthApi,
    CartApi,
    CatalogApi,
    OrderFlowApi,
    PaymentApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    auth::{TokenIssuer, TokenValidator},
    config::{ServerConfig, WEBHOOK_SIGNATURE_HEADER},
    errors::ServerError,
    middleware::{JwtMiddlewareFactory, WebhookAuthFactory},
    routes::*,
};

const EVENT_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Order events are written to the `bazaar::events` log target. Push notifications and the like can hook in here.
fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_placed(|ev| {
            Box::pin(async move {
                let order = ev.order;
                info!(target: "bazaar::events", "📦️ Order {} placed by user #{} for {}", order.code, order.user_id,
                    order.amount);
            })
        })
        .on_status_changed(|ev| {
            Box::pin(async move {
                let order = ev.order;
                info!(target: "bazaar::events", "📦️ Order {} is now {} (was {})", order.code, order.delivery_status,
                    ev.old_status);
            })
        })
        .on_payment_verified(|ev| {
            Box::pin(async move {
                info!(target: "bazaar::events", "📦️ Payment {} received for order {}", ev.payment_id, ev.order.code);
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let payments_api =
            PaymentApi::new(db.clone(), Gateway::default(), config.payments.gateway_secret.clone(), producers.clone());
        let cart_api = CartApi::new(db.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let accounts_api = AccountApi::new(db.clone());
        let auth_api = AuthApi::new(db.clone(), Sms::default()).with_ttl(config.otp_ttl);
        let admin_api = AdminApi::new(db.clone());
        let jwt_signer = TokenIssuer::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bazaar::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(admin_api))
            .app_data(web::Data::new(jwt_signer));
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(TokenValidator::new(&config.auth)))
            // Any role
            .service(MyProfileRoute::<SqliteDatabase>::new())
            .service(UpdateMyProfileRoute::<SqliteDatabase>::new())
            .service(MyAddressesRoute::<SqliteDatabase>::new())
            .service(AddAddressRoute::<SqliteDatabase>::new())
            .service(UpdateAddressRoute::<SqliteDatabase>::new())
            .service(DeleteAddressRoute::<SqliteDatabase>::new())
            .service(SetDefaultAddressRoute::<SqliteDatabase>::new())
            .service(MyNotificationsRoute::<SqliteDatabase>::new())
            .service(MarkAllNotificationsReadRoute::<SqliteDatabase>::new())
            .service(MarkNotificationReadRoute::<SqliteDatabase>::new())
            // Customers
            .service(MyCartRoute::<SqliteDatabase>::new())
            .service(ClearCartRoute::<SqliteDatabase>::new())
            .service(AddToCartRoute::<SqliteDatabase>::new())
            .service(SetCartQuantityRoute::<SqliteDatabase>::new())
            .service(RemoveFromCartRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyOrderRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(InitiatePaymentRoute::<SqliteDatabase>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase>::new())
            // Sellers
            .service(MyShopRoute::<SqliteDatabase>::new())
            .service(OpenShopRoute::<SqliteDatabase>::new())
            .service(UpdateShopRoute::<SqliteDatabase>::new())
            .service(SetShopOpenRoute::<SqliteDatabase>::new())
            .service(MyProductsRoute::<SqliteDatabase>::new())
            .service(AddProductRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(RemoveProductRoute::<SqliteDatabase>::new())
            .service(SellerOrdersRoute::<SqliteDatabase>::new())
            .service(UpdateItemStatusRoute::<SqliteDatabase>::new())
            .service(MySalesRoute::<SqliteDatabase>::new())
            // Delivery agents
            .service(AgentProfileRoute::<SqliteDatabase>::new())
            .service(SetAvailabilityRoute::<SqliteDatabase>::new())
            .service(PendingDeliveriesRoute::<SqliteDatabase>::new())
            .service(MyDeliveriesRoute::<SqliteDatabase>::new())
            .service(AcceptDeliveryRoute::<SqliteDatabase>::new())
            .service(PickUpOrderRoute::<SqliteDatabase>::new())
            .service(DeliverOrderRoute::<SqliteDatabase>::new())
            // Admins
            .service(DashboardRoute::<SqliteDatabase>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new())
            .service(AdminOrderRoute::<SqliteDatabase>::new())
            .service(OverrideStatusRoute::<SqliteDatabase>::new())
            .service(RegisterUserRoute::<SqliteDatabase>::new())
            .service(DeliveryAgentsRoute::<SqliteDatabase>::new())
            .service(OutstandingCashRoute::<SqliteDatabase>::new())
            .service(CashLedgerRoute::<SqliteDatabase>::new())
            .service(CollectCashRoute::<SqliteDatabase>::new())
            .service(SellerEarningsRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhook")
            .wrap(WebhookAuthFactory::new(
                WEBHOOK_SIGNATURE_HEADER,
                config.payments.webhook_secret.clone(),
                config.payments.hmac_checks,
            ))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(RequestOtpRoute::<SqliteDatabase>::new())
            .service(VerifyOtpRoute::<SqliteDatabase>::new())
            .service(ShopsRoute::<SqliteDatabase>::new())
            .service(ShopByIdRoute::<SqliteDatabase>::new())
            .service(ShopProductsRoute::<SqliteDatabase>::new())
            // Must be registered before the product id route
            .service(SearchProductsRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(webhook_scope)
            .service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Bazaar server listening on {}:{}", config.host, config.port);
    Ok(srv)
}
