mod acl;
mod hmac;
mod jwt;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use hmac::{WebhookAuthFactory, WebhookAuthService};
pub use jwt::{JwtMiddlewareFactory, JwtMiddlewareService};
