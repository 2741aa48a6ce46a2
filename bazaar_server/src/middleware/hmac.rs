//! Webhook authentication.
//!
//! The payment gateway signs the raw body of every webhook with the secret in `BAZAAR_WEBHOOK_SECRET` and sends the
//! hex-encoded HMAC-SHA256 in the `X-Bazaar-Signature` header. [`WebhookAuthFactory`] buffers the body, checks the
//! signature and then replays the same bytes to the handler. Anything unsigned or mis-signed is refused with a 403.
//!
//! With `BAZAAR_WEBHOOK_HMAC_CHECKS=false` every call is let through untouched. Only do this in development.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    web::Bytes,
    Error,
};
use bazaar_common::Secret;
use futures::future::LocalBoxFuture;
use log::*;

use crate::helpers::verify_hmac;

struct SignatureCheck {
    header: String,
    key: Secret<String>,
    enforced: bool,
}

impl SignatureCheck {
    /// Returns the verified body, or `None` if checks are switched off and the body was not read.
    async fn authenticate(&self, req: &mut ServiceRequest) -> Result<Option<Bytes>, Error> {
        if !self.enforced {
            trace!("🔐️ Webhook signature checks are disabled");
            return Ok(None);
        }
        if !self.key.is_set() {
            warn!("🔐️ A webhook arrived but no webhook secret is configured");
            return Err(ErrorForbidden("Webhooks are not configured."));
        }
        let signature = match req.headers().get(&self.header).map(|v| v.to_str()) {
            Some(Ok(sig)) => sig.to_string(),
            Some(Err(_)) | None => {
                warn!("🔐️ Webhook from {} has no readable {} header", peer(req), self.header);
                return Err(ErrorForbidden("Missing webhook signature."));
            },
        };
        let body = req.extract::<Bytes>().await.map_err(|e| {
            warn!("🔐️ Could not read webhook body. {e}");
            ErrorBadRequest("Could not read request body.")
        })?;
        if !verify_hmac(self.key.reveal(), &body, &signature) {
            warn!("🔐️ Webhook from {} carries an invalid signature", peer(req));
            return Err(ErrorForbidden("Invalid webhook signature."));
        }
        trace!("🔐️ Webhook signature verified ({} bytes)", body.len());
        Ok(Some(body))
    }
}

fn peer(req: &ServiceRequest) -> String {
    req.connection_info().realip_remote_addr().unwrap_or("unknown").to_string()
}

/// Puts an already-consumed body back so that extractors further down can read it.
fn replay(body: Bytes) -> Payload {
    let (_, mut payload) = h1::Payload::create(true);
    payload.unread_data(body);
    Payload::from(payload)
}

/// Wrap the webhook scope with this so that handlers only ever see authentic bodies.
pub struct WebhookAuthFactory {
    check: Rc<SignatureCheck>,
}

impl WebhookAuthFactory {
    /// `header` carries the signature, `key` is the shared webhook secret. If `enforced` is false, nothing is checked.
    pub fn new(header: &str, key: Secret<String>, enforced: bool) -> Self {
        Self { check: Rc::new(SignatureCheck { header: header.to_string(), key, enforced }) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for WebhookAuthFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = WebhookAuthService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WebhookAuthService { check: Rc::clone(&self.check), service: Rc::new(service) }))
    }
}

pub struct WebhookAuthService<S> {
    check: Rc<SignatureCheck>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for WebhookAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let check = Rc::clone(&self.check);
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            if let Some(body) = check.authenticate(&mut req).await? {
                req.set_payload(replay(body));
            }
            service.call(req).await
        })
    }
}
