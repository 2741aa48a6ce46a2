//! Request handler definitions
//!
//! Every route and its handler is defined here. Handlers stay thin: they unpack the request, call one of the engine
//! APIs and serialise the result. Anything longer belongs in the engine.
//!
//! Routes fall into three groups:
//! * Public routes (health, OTP login and the read-only catalogue).
//! * The payment webhook, which is authenticated with an HMAC signature over the body.
//! * Everything under `/api`, which needs a bearer token. Routes that are restricted to particular roles declare them
//!   with `where requires [...]`.
//!
//! Since each worker thread processes its requests sequentially, handlers must never block. All database access is
//! async.
use actix_web::{get, web, HttpResponse, Responder};
use bazaar_engine::{
    db_types::{
        Channel,
        NewAddress,
        NewProduct,
        NewShop,
        NewUserAccount,
        Order,
        ProductUpdate,
        ProfileUpdate,
        Role,
        ShopUpdate,
    },
    order_objects::OrderQueryFilter,
    traits::{
        AccountManagement,
        AuthManagement,
        CartManagement,
        CatalogManagement,
        LocalPaymentGateway,
        LogOtpSender,
        OrderManagement,
        ReportingManagement,
    },
    AccountApi,
    AdminApi,
    AuthApi,
    CartApi,
    CatalogApi,
    OrderFlowApi,
    PaymentApi,
};
use log::*;

use crate::{
    auth::{JwtClaims, TokenIssuer},
    data_objects::{
        AvailabilityParams,
        CartItemParams,
        ChannelQuery,
        CheckoutParams,
        JsonResponse,
        LoginResponse,
        NotificationQuery,
        OtpRequest,
        OtpVerification,
        PaymentVerificationParams,
        PaymentWebhook,
        QuantityParams,
        SearchQuery,
        ShopOpenParams,
        StatusParams,
    },
    errors::ServerError,
    helpers::parse_order_code,
};

/// The payment gateway the server talks to.
pub type Gateway = LocalPaymentGateway;
/// How one-time passwords reach the user.
pub type Sms = LogOtpSender;

/// Only captured payments change an order. Other webhook events are acknowledged and ignored.
pub const PAYMENT_CAPTURED_EVENT: &str = "payment.captured";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(request_otp => Post "/auth/otp" impl AuthManagement, AccountManagement);
/// Sends a one-time password to the phone number in the body. The response never reveals whether the phone number
/// belongs to an existing account.
pub async fn request_otp<A>(
    body: web::Json<OtpRequest>,
    api: web::Data<AuthApi<A, Sms>>,
) -> Result<HttpResponse, ServerError>
where
    A: AuthManagement + AccountManagement,
{
    let OtpRequest { phone } = body.into_inner();
    debug!("💻️ POST request_otp for {phone}");
    api.request_otp(&phone).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("One-time password sent.")))
}

route!(verify_otp => Post "/auth/verify" impl AuthManagement, AccountManagement);
/// Exchanges a one-time password for an access token.
///
/// The first successful login for a phone number creates a customer account, in which case `name` must be supplied.
/// The access token is a JWT that must be sent as a bearer token in the `Authorization` header for all `/api` routes.
pub async fn verify_otp<A>(
    body: web::Json<OtpVerification>,
    api: web::Data<AuthApi<A, Sms>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError>
where
    A: AuthManagement + AccountManagement,
{
    let OtpVerification { phone, code, name } = body.into_inner();
    debug!("💻️ POST verify_otp for {phone}");
    let outcome = api.verify_otp(&phone, &code, name.as_deref()).await?;
    let access_token = signer.issue_token(&outcome.user)?;
    trace!("💻️ Issued access token for user #{}", outcome.user.id);
    Ok(HttpResponse::Ok().json(LoginResponse { access_token, user: outcome.user, new_user: outcome.new_user }))
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(shops => Get "/shops" impl CatalogManagement);
pub async fn shops<A: CatalogManagement>(
    query: web::Query<ChannelQuery>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let channel = query.into_inner().channel;
    debug!("💻️ GET shops ({})", channel.map(|c| c.to_string()).unwrap_or_else(|| "all channels".into()));
    let shops = api.shops(channel).await?;
    Ok(HttpResponse::Ok().json(shops))
}

route!(shop_by_id => Get "/shops/{shop_id}" impl CatalogManagement);
pub async fn shop_by_id<A: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let shop_id = path.into_inner();
    debug!("💻️ GET shop #{shop_id}");
    let shop = api.shop(shop_id).await?;
    Ok(HttpResponse::Ok().json(shop))
}

route!(shop_products => Get "/shops/{shop_id}/products" impl CatalogManagement);
/// The products a shop currently offers. Hidden products are left out.
pub async fn shop_products<A: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let shop_id = path.into_inner();
    debug!("💻️ GET products for shop #{shop_id}");
    let products = api.products_for_shop(shop_id, true).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(search_products => Get "/products/search" impl CatalogManagement);
/// Case-insensitive search over the names and descriptions of available products in open shops.
pub async fn search_products<A: CatalogManagement>(
    query: web::Query<SearchQuery>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let SearchQuery { q, channel } = query.into_inner();
    debug!("💻️ GET search_products for '{q}'");
    let products = api.search(&q, channel).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_by_id => Get "/products/{product_id}" impl CatalogManagement);
pub async fn product_by_id<A: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ GET product #{product_id}");
    let product = api.product(product_id).await?;
    Ok(HttpResponse::Ok().json(product))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(payment_webhook => Post "/payment" impl OrderManagement);
/// Receives payment events from the gateway. The body has already been authenticated by the HMAC middleware by the
/// time it gets here.
pub async fn payment_webhook<A: OrderManagement>(
    body: web::Json<PaymentWebhook>,
    api: web::Data<PaymentApi<A, Gateway>>,
) -> Result<HttpResponse, ServerError> {
    let PaymentWebhook { event, gateway_order_id, payment_id } = body.into_inner();
    info!("💻️ Received {event} webhook for gateway order {gateway_order_id}");
    if event != PAYMENT_CAPTURED_EVENT {
        debug!("💻️ Ignoring {event} webhook");
        return Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{event} event ignored"))));
    }
    let order = api.handle_captured_webhook(&gateway_order_id, &payment_id).await.map_err(|e| {
        warn!("💻️ Could not record captured payment {payment_id}. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Payment recorded for order {}", order.code))))
}

//----------------------------------------------   Profile  ----------------------------------------------------
route!(my_profile => Get "/profile" impl AccountManagement);
pub async fn my_profile<A: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET profile for user #{}", claims.user_id);
    let user = api.profile(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

route!(update_my_profile => Patch "/profile" impl AccountManagement);
pub async fn update_my_profile<A: AccountManagement>(
    claims: JwtClaims,
    body: web::Json<ProfileUpdate>,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ PATCH profile for user #{}", claims.user_id);
    let user = api.update_profile(claims.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

//----------------------------------------------   Addresses  ----------------------------------------------------
route!(my_addresses => Get "/addresses" impl AccountManagement);
pub async fn my_addresses<A: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET addresses for user #{}", claims.user_id);
    let addresses = api.addresses(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(addresses))
}

route!(add_address => Post "/addresses" impl AccountManagement);
/// Adds an address to the caller's address book. The first address always becomes the default.
pub async fn add_address<A: AccountManagement>(
    claims: JwtClaims,
    body: web::Json<NewAddress>,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST address for user #{}", claims.user_id);
    let address = api.add_address(claims.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(address))
}

route!(update_address => Put "/addresses/{address_id}" impl AccountManagement);
pub async fn update_address<A: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<NewAddress>,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let address_id = path.into_inner();
    debug!("💻️ PUT address #{address_id} for user #{}", claims.user_id);
    let address = api.update_address(claims.user_id, address_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(address))
}

route!(delete_address => Delete "/addresses/{address_id}" impl AccountManagement);
pub async fn delete_address<A: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let address_id = path.into_inner();
    debug!("💻️ DELETE address #{address_id} for user #{}", claims.user_id);
    api.delete_address(claims.user_id, address_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Address #{address_id} deleted"))))
}

route!(set_default_address => Post "/addresses/{address_id}/default" impl AccountManagement);
pub async fn set_default_address<A: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let address_id = path.into_inner();
    debug!("💻️ POST default address #{address_id} for user #{}", claims.user_id);
    let address = api.set_default_address(claims.user_id, address_id).await?;
    Ok(HttpResponse::Ok().json(address))
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(my_notifications => Get "/notifications" impl AccountManagement);
pub async fn my_notifications<A: AccountManagement>(
    claims: JwtClaims,
    query: web::Query<NotificationQuery>,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let unread_only = query.into_inner().unread_only;
    debug!("💻️ GET notifications for user #{} (unread only: {unread_only})", claims.user_id);
    let notifications = api.notifications(claims.user_id, unread_only).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

route!(mark_notification_read => Post "/notifications/{notification_id}/read" impl AccountManagement);
pub async fn mark_notification_read<A: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let notification_id = path.into_inner();
    debug!("💻️ POST read notification #{notification_id} for user #{}", claims.user_id);
    let notification = api.mark_notification_read(claims.user_id, notification_id).await?;
    Ok(HttpResponse::Ok().json(notification))
}

route!(mark_all_notifications_read => Post "/notifications/read_all" impl AccountManagement);
pub async fn mark_all_notifications_read<A: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST read all notifications for user #{}", claims.user_id);
    let n = api.mark_all_notifications_read(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{n} notifications marked as read"))))
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart/{channel}" impl CartManagement where requires [Role::Customer]);
pub async fn my_cart<A: CartManagement>(
    claims: JwtClaims,
    path: web::Path<Channel>,
    api: web::Data<CartApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let channel = path.into_inner();
    debug!("💻️ GET {channel} cart for user #{}", claims.user_id);
    let cart = api.cart(claims.user_id, channel).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_to_cart => Post "/cart/{channel}/items" impl CartManagement where requires [Role::Customer]);
/// Adds a product to the cart for `channel`, on top of any units already there. The product must belong to the same
/// channel as the cart.
pub async fn add_to_cart<A: CartManagement>(
    claims: JwtClaims,
    path: web::Path<Channel>,
    body: web::Json<CartItemParams>,
    api: web::Data<CartApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let channel = path.into_inner();
    let CartItemParams { product_id, quantity } = body.into_inner();
    debug!("💻️ POST {quantity} of product #{product_id} to the {channel} cart of user #{}", claims.user_id);
    let cart = api.add_item(claims.user_id, channel, product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(set_cart_quantity => Put "/cart/{channel}/items/{product_id}"
    impl CartManagement where requires [Role::Customer]);
pub async fn set_cart_quantity<A: CartManagement>(
    claims: JwtClaims,
    path: web::Path<(Channel, i64)>,
    body: web::Json<QuantityParams>,
    api: web::Data<CartApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let (channel, product_id) = path.into_inner();
    let quantity = body.into_inner().quantity;
    debug!("💻️ PUT quantity {quantity} of product #{product_id} in the {channel} cart of user #{}", claims.user_id);
    let cart = api.set_quantity(claims.user_id, channel, product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_from_cart => Delete "/cart/{channel}/items/{product_id}"
    impl CartManagement where requires [Role::Customer]);
pub async fn remove_from_cart<A: CartManagement>(
    claims: JwtClaims,
    path: web::Path<(Channel, i64)>,
    api: web::Data<CartApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let (channel, product_id) = path.into_inner();
    debug!("💻️ DELETE product #{product_id} from the {channel} cart of user #{}", claims.user_id);
    let cart = api.remove_item(claims.user_id, channel, product_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(clear_cart => Delete "/cart/{channel}" impl CartManagement where requires [Role::Customer]);
pub async fn clear_cart<A: CartManagement>(
    claims: JwtClaims,
    path: web::Path<Channel>,
    api: web::Data<CartApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let channel = path.into_inner();
    debug!("💻️ DELETE {channel} cart for user #{}", claims.user_id);
    api.clear(claims.user_id, channel).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{channel} cart cleared"))))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(checkout => Post "/orders"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::Customer]);
/// Turns the caller's cart for a channel into an order, delivered to one of the caller's addresses.
///
/// Every product must still be available and every shop open. On success the cart is emptied and each seller involved
/// is notified. Online orders must then be paid for via `/api/orders/{code}/pay`.
pub async fn checkout<A>(
    claims: JwtClaims,
    body: web::Json<CheckoutParams>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let CheckoutParams { channel, address_id, payment_method } = body.into_inner();
    debug!("💻️ POST checkout of the {channel} cart for user #{} ({payment_method})", claims.user_id);
    let order = api.checkout(claims.user_id, channel, address_id, payment_method).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::Customer]);
pub async fn my_orders<A>(claims: JwtClaims, api: web::Data<OrderFlowApi<A>>) -> Result<HttpResponse, ServerError>
where A: OrderManagement + CartManagement + AccountManagement {
    debug!("💻️ GET orders for user #{}", claims.user_id);
    let orders = api.orders_for_user(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_order => Get "/orders/{code}"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::Customer]);
/// A single order. Orders that belong to someone else are reported as not found.
pub async fn my_order<A>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ GET order {code} for user #{}", claims.user_id);
    let order = api.order_for_user(claims.user_id, &code).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{code}/cancel"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::Customer]);
/// Customers may cancel their own orders until an agent has picked them up.
pub async fn cancel_order<A>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ POST cancel order {code} for user #{}", claims.user_id);
    let changed = api.cancel_order(claims.user_id, &code).await?;
    Ok(HttpResponse::Ok().json(changed))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(initiate_payment => Post "/orders/{code}/pay" impl OrderManagement where requires [Role::Customer]);
/// Creates a gateway order for an unpaid online order. The client completes the payment with the gateway and then
/// calls `/api/orders/{code}/pay/verify` with what the gateway returned.
pub async fn initiate_payment<A: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<PaymentApi<A, Gateway>>,
) -> Result<HttpResponse, ServerError> {
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ POST initiate payment for order {code}");
    let gateway_order = api.initiate_payment(claims.user_id, &code).await?;
    Ok(HttpResponse::Ok().json(gateway_order))
}

route!(verify_payment => Post "/orders/{code}/pay/verify" impl OrderManagement where requires [Role::Customer]);
/// Checks the gateway's signature over `gateway_order_id|payment_id`. A bad signature marks the payment as failed and
/// returns 400.
pub async fn verify_payment<A: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<PaymentVerificationParams>,
    api: web::Data<PaymentApi<A, Gateway>>,
) -> Result<HttpResponse, ServerError> {
    let code = parse_order_code(&path.into_inner())?;
    let PaymentVerificationParams { gateway_order_id, payment_id, signature } = body.into_inner();
    debug!("💻️ POST verify payment {payment_id} for order {code}");
    let order = api.verify_payment(claims.user_id, &code, &gateway_order_id, &payment_id, &signature).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Sellers  ----------------------------------------------------
route!(my_shop => Get "/seller/shop" impl CatalogManagement where requires [Role::Seller]);
pub async fn my_shop<A: CatalogManagement>(
    claims: JwtClaims,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET shop for seller #{}", claims.user_id);
    let shop = api.my_shop(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(shop))
}

route!(open_shop => Post "/seller/shop" impl CatalogManagement where requires [Role::Seller]);
/// Creates the caller's shop. Each seller has at most one.
pub async fn open_shop<A: CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<NewShop>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST shop for seller #{}", claims.user_id);
    let shop = api.open_shop(claims.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(shop))
}

route!(update_shop => Patch "/seller/shop" impl CatalogManagement where requires [Role::Seller]);
pub async fn update_shop<A: CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<ShopUpdate>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ PATCH shop for seller #{}", claims.user_id);
    let shop = api.update_shop(claims.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(shop))
}

route!(set_shop_open => Post "/seller/shop/open" impl CatalogManagement where requires [Role::Seller]);
pub async fn set_shop_open<A: CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<ShopOpenParams>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let is_open = body.into_inner().is_open;
    debug!("💻️ POST shop open={is_open} for seller #{}", claims.user_id);
    let shop = api.set_shop_open(claims.user_id, is_open).await?;
    Ok(HttpResponse::Ok().json(shop))
}

route!(my_products => Get "/seller/products" impl CatalogManagement where requires [Role::Seller]);
/// All of the seller's products, including hidden ones.
pub async fn my_products<A: CatalogManagement>(
    claims: JwtClaims,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET products for seller #{}", claims.user_id);
    let shop = api.my_shop(claims.user_id).await?;
    let products = api.products_for_shop(shop.id, false).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(add_product => Post "/seller/products" impl CatalogManagement where requires [Role::Seller]);
pub async fn add_product<A: CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST product for seller #{}", claims.user_id);
    let product = api.add_product(claims.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(update_product => Patch "/seller/products/{product_id}" impl CatalogManagement where requires [Role::Seller]);
pub async fn update_product<A: CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ProductUpdate>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ PATCH product #{product_id} for seller #{}", claims.user_id);
    let product = api.update_product(claims.user_id, product_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(remove_product => Delete "/seller/products/{product_id}" impl CatalogManagement where requires [Role::Seller]);
pub async fn remove_product<A: CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ DELETE product #{product_id} for seller #{}", claims.user_id);
    api.remove_product(claims.user_id, product_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Product #{product_id} removed"))))
}

route!(seller_orders => Get "/seller/orders"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::Seller]);
/// Orders that contain at least one of the seller's products.
pub async fn seller_orders<A>(claims: JwtClaims, api: web::Data<OrderFlowApi<A>>) -> Result<HttpResponse, ServerError>
where A: OrderManagement + CartManagement + AccountManagement {
    debug!("💻️ GET orders for seller #{}", claims.user_id);
    let orders = api.orders_for_seller(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(update_item_status => Post "/seller/orders/{code}/items/{item_id}/status"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::Seller]);
/// Confirms (`Preparing`) or rejects (`Cancelled`) one of the seller's order items. The order's own status follows once
/// every seller has caught up.
pub async fn update_item_status<A>(
    claims: JwtClaims,
    path: web::Path<(String, i64)>,
    body: web::Json<StatusParams>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let (code, item_id) = path.into_inner();
    let code = parse_order_code(&code)?;
    let status = body.into_inner().status;
    debug!("💻️ POST item #{item_id} of order {code} to {status} by seller #{}", claims.user_id);
    let changed = api.update_item_status(claims.user_id, &code, item_id, status).await?;
    Ok(HttpResponse::Ok().json(changed))
}

route!(my_sales => Get "/seller/sales" impl AccountManagement where requires [Role::Seller]);
pub async fn my_sales<A: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET sales history for seller #{}", claims.user_id);
    let sales = api.sales_history(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(sales))
}

//----------------------------------------------   Delivery  ----------------------------------------------------
route!(agent_profile => Get "/delivery/profile" impl AccountManagement where requires [Role::DeliveryBoy]);
pub async fn agent_profile<A: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET delivery profile for agent #{}", claims.user_id);
    let agent = api.delivery_agent(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(agent))
}

route!(set_availability => Post "/delivery/availability" impl AccountManagement where requires [Role::DeliveryBoy]);
pub async fn set_availability<A: AccountManagement>(
    claims: JwtClaims,
    body: web::Json<AvailabilityParams>,
    api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let is_available = body.into_inner().is_available;
    debug!("💻️ POST availability={is_available} for agent #{}", claims.user_id);
    let agent = api.set_availability(claims.user_id, is_available).await?;
    Ok(HttpResponse::Ok().json(agent))
}

route!(pending_deliveries => Get "/delivery/pending"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::DeliveryBoy]);
/// Orders that are ready and waiting for an agent. Agents that are off duty see an empty list.
pub async fn pending_deliveries<A>(
    claims: JwtClaims,
    query: web::Query<ChannelQuery>,
    orders_api: web::Data<OrderFlowApi<A>>,
    accounts_api: web::Data<AccountApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    debug!("💻️ GET pending deliveries for agent #{}", claims.user_id);
    let agent = accounts_api.delivery_agent(claims.user_id).await?;
    if !agent.is_available {
        trace!("💻️ Agent #{} is not available. No pending deliveries are shown.", agent.user_id);
        return Ok(HttpResponse::Ok().json(Vec::<Order>::new()));
    }
    let orders = orders_api.pending_deliveries(query.into_inner().channel).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_deliveries => Get "/delivery/orders"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::DeliveryBoy]);
pub async fn my_deliveries<A>(claims: JwtClaims, api: web::Data<OrderFlowApi<A>>) -> Result<HttpResponse, ServerError>
where A: OrderManagement + CartManagement + AccountManagement {
    debug!("💻️ GET deliveries for agent #{}", claims.user_id);
    let orders = api.orders_for_agent(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(accept_delivery => Post "/delivery/orders/{code}/accept"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::DeliveryBoy]);
/// Claims a ready order for delivery. Only one agent can win; everyone else gets a 409.
pub async fn accept_delivery<A>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ POST accept order {code} by agent #{}", claims.user_id);
    let changed = api.accept_delivery(claims.user_id, &code).await?;
    Ok(HttpResponse::Ok().json(changed))
}

route!(pick_up_order => Post "/delivery/orders/{code}/pickup"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::DeliveryBoy]);
pub async fn pick_up_order<A>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ POST pick up order {code} by agent #{}", claims.user_id);
    let changed = api.pick_up(claims.user_id, &code).await?;
    Ok(HttpResponse::Ok().json(changed))
}

route!(deliver_order => Post "/delivery/orders/{code}/deliver"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::DeliveryBoy]);
/// Marks an order as delivered. This credits every seller's sales history and, for cash on delivery orders, records
/// the cash the agent now holds.
pub async fn deliver_order<A>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ POST deliver order {code} by agent #{}", claims.user_id);
    let changed = api.deliver(claims.user_id, &code).await?;
    Ok(HttpResponse::Ok().json(changed))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(dashboard => Get "/admin/dashboard" impl ReportingManagement, AccountManagement where requires [Role::Admin]);
pub async fn dashboard<A>(api: web::Data<AdminApi<A>>) -> Result<HttpResponse, ServerError>
where A: ReportingManagement + AccountManagement {
    debug!("💻️ GET admin dashboard");
    let summary = api.dashboard().await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(search_orders => Post "/admin/orders/search"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::Admin]);
/// Searches all orders. The body is an [`OrderQueryFilter`]; an empty object returns every order.
pub async fn search_orders<A>(
    body: web::Json<OrderQueryFilter>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let query = body.into_inner();
    debug!("💻️ POST admin order search: {query}");
    let orders = api.search_orders(query).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(admin_order => Get "/admin/orders/{code}"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::Admin]);
pub async fn admin_order<A>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ GET admin order {code}");
    let order = api
        .order_by_code(&code)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order #{code} does not exist")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(override_status => Post "/admin/orders/{code}/status"
    impl OrderManagement, CartManagement, AccountManagement where requires [Role::Admin]);
/// Forces an order into any status, bypassing the usual transition rules. Items follow the order, and delivering an
/// order this way still settles with the sellers.
pub async fn override_status<A>(
    path: web::Path<String>,
    body: web::Json<StatusParams>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: OrderManagement + CartManagement + AccountManagement,
{
    let code = parse_order_code(&path.into_inner())?;
    let status = body.into_inner().status;
    info!("💻️ POST admin override of order {code} to {status}");
    let changed = api.override_status(&code, status).await?;
    Ok(HttpResponse::Ok().json(changed))
}

route!(register_user => Post "/admin/users" impl ReportingManagement, AccountManagement where requires [Role::Admin]);
/// Registers sellers, delivery agents and other admins. Customers sign themselves up with an OTP login.
pub async fn register_user<A>(
    body: web::Json<NewUserAccount>,
    api: web::Data<AdminApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: ReportingManagement + AccountManagement,
{
    let user = body.into_inner();
    info!("💻️ POST register {} {}", user.role, user.phone);
    let user = api.register_user(user).await?;
    Ok(HttpResponse::Created().json(user))
}

route!(delivery_agents => Get "/admin/agents" impl ReportingManagement, AccountManagement where requires [Role::Admin]);
pub async fn delivery_agents<A>(api: web::Data<AdminApi<A>>) -> Result<HttpResponse, ServerError>
where A: ReportingManagement + AccountManagement {
    debug!("💻️ GET delivery agents");
    let agents = api.delivery_agents().await?;
    Ok(HttpResponse::Ok().json(agents))
}

route!(outstanding_cash => Get "/admin/cash" impl ReportingManagement, AccountManagement where requires [Role::Admin]);
/// Cash that delivery agents have collected from customers and not yet handed over, per agent.
pub async fn outstanding_cash<A>(api: web::Data<AdminApi<A>>) -> Result<HttpResponse, ServerError>
where A: ReportingManagement + AccountManagement {
    debug!("💻️ GET outstanding cash");
    let cash = api.outstanding_cash().await?;
    Ok(HttpResponse::Ok().json(cash))
}

route!(cash_ledger => Get "/admin/cash/{agent_id}"
    impl ReportingManagement, AccountManagement where requires [Role::Admin]);
pub async fn cash_ledger<A>(path: web::Path<i64>, api: web::Data<AdminApi<A>>) -> Result<HttpResponse, ServerError>
where A: ReportingManagement + AccountManagement {
    let agent_id = path.into_inner();
    debug!("💻️ GET cash ledger for agent #{agent_id}");
    let ledger = api.cash_ledger(agent_id).await?;
    Ok(HttpResponse::Ok().json(ledger))
}

route!(collect_cash => Post "/admin/cash/{agent_id}/collect"
    impl ReportingManagement, AccountManagement where requires [Role::Admin]);
/// Records that an agent has handed over all the cash they were holding.
pub async fn collect_cash<A>(path: web::Path<i64>, api: web::Data<AdminApi<A>>) -> Result<HttpResponse, ServerError>
where A: ReportingManagement + AccountManagement {
    let agent_id = path.into_inner();
    info!("💻️ POST collect cash from agent #{agent_id}");
    let amount = api.collect_cash(agent_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Collected {amount} from agent #{agent_id}"))))
}

route!(seller_earnings => Get "/admin/earnings"
    impl ReportingManagement, AccountManagement where requires [Role::Admin]);
pub async fn seller_earnings<A>(api: web::Data<AdminApi<A>>) -> Result<HttpResponse, ServerError>
where A: ReportingManagement + AccountManagement {
    debug!("💻️ GET seller earnings");
    let earnings = api.seller_earnings().await?;
    Ok(HttpResponse::Ok().json(earnings))
}
