use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bazaar_engine::traits::{AccountApiError, AuthApiError, CatalogError, OrderFlowError};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Could not serialize access token. {0}")]
    CouldNotSerializeAccessToken(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("The request conflicts with the current state of the resource. {0}")]
    Conflict(String),
    #[error("Payment verification failed. {0}")]
    PaymentVerificationFailed(String),
    #[error("The payment gateway returned an error. {0}")]
    GatewayError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::PaymentVerificationFailed(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::OtpRejected(_) => StatusCode::UNAUTHORIZED,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CouldNotSerializeAccessToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided. Send it in the Authorization header as a bearer token.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Login failed. {0}")]
    OtpRejected(String),
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            OrderFlowError::DuplicateOrderCode(_) => {
                error!("💻️ Could not allocate a unique order code. {e}");
                Self::BackendError(e.to_string())
            },
            OrderFlowError::OrderNotFound(_) |
            OrderFlowError::ProductNotFound(_) |
            OrderFlowError::AddressNotFound(_) |
            OrderFlowError::ItemNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::EmptyCart |
            OrderFlowError::ChannelMismatch { .. } |
            OrderFlowError::InvalidQuantity(_) |
            OrderFlowError::AmountTooLarge => Self::ValidationError(e.to_string()),
            OrderFlowError::ProductUnavailable(_) |
            OrderFlowError::ShopClosed(_) |
            OrderFlowError::InvalidTransition { .. } |
            OrderFlowError::ItemsNotReady(_) |
            OrderFlowError::AlreadyAssigned(_) |
            OrderFlowError::NotDeliverable(_) |
            OrderFlowError::NotPayable(_) |
            OrderFlowError::PaymentNotInitiated(_) |
            OrderFlowError::NoOp => Self::Conflict(e.to_string()),
            OrderFlowError::Forbidden(_) => Self::InsufficientPermissions(e.to_string()),
            OrderFlowError::InvalidPaymentSignature => Self::PaymentVerificationFailed(e.to_string()),
            OrderFlowError::GatewayError(s) => Self::GatewayError(s),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            CatalogError::ShopNotFound | CatalogError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CatalogError::ShopAlreadyExists(_) => Self::Conflict(e.to_string()),
            CatalogError::InvalidPrice | CatalogError::ValidationError(_) => Self::ValidationError(e.to_string()),
            CatalogError::NotOwner(_) => Self::InsufficientPermissions(e.to_string()),
        }
    }
}

impl From<AccountApiError> for ServerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            AccountApiError::UserNotFound(_) |
            AccountApiError::AddressNotFound(_) |
            AccountApiError::NotificationNotFound(_) => Self::NoRecordFound(e.to_string()),
            AccountApiError::AlreadyRegistered(_) => Self::Conflict(e.to_string()),
            AccountApiError::WrongRole(..) => Self::InsufficientPermissions(e.to_string()),
            AccountApiError::ValidationError(_) | AccountApiError::QueryError(_) => {
                Self::ValidationError(e.to_string())
            },
        }
    }
}

impl From<AuthApiError> for ServerError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            AuthApiError::InvalidPhone(_) | AuthApiError::NameRequired => Self::ValidationError(e.to_string()),
            AuthApiError::OtpNotRequested |
            AuthApiError::OtpExpired |
            AuthApiError::OtpInvalid |
            AuthApiError::TooManyAttempts => Self::AuthenticationError(AuthError::OtpRejected(e.to_string())),
            AuthApiError::DeliveryFailed(_) => Self::GatewayError(e.to_string()),
        }
    }
}
