use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use medshop_engine::{traits::StoreError, SettlementError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    Settlement(#[from] SettlementError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::CouldNotIssueToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Settlement(e) => settlement_status(e),
            Self::Store(e) => store_status(e),
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "success": false, "message": self.to_string() }).to_string())
    }
}

fn settlement_status(e: &SettlementError) -> StatusCode {
    use SettlementError::*;
    match e {
        InvalidAddress | EmptyCart | InsufficientStock { .. } | InvalidSignature => StatusCode::BAD_REQUEST,
        InvalidQuantity(_) | InvalidStatusTransition { .. } | ValidationError(_) => StatusCode::BAD_REQUEST,
        LineCancelled { .. } | SessionReleased(_) => StatusCode::BAD_REQUEST,
        MedicineNotFound(_) | OrderNotFound(_) => StatusCode::NOT_FOUND,
        GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError(_) => StatusCode::BAD_GATEWAY,
        StorageConflict(_) | CartChanged => StatusCode::CONFLICT,
        DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn store_status(e: &StoreError) -> StatusCode {
    use StoreError::*;
    match e {
        EmptyCart | InsufficientStock { .. } | InvalidQuantity(_) => StatusCode::BAD_REQUEST,
        InvalidStatusTransition { .. } | ValidationError(_) => StatusCode::BAD_REQUEST,
        MedicineNotFound(_) | OrderNotFound(_) | CartItemNotFound(_) => StatusCode::NOT_FOUND,
        StorageConflict(_) | CartChanged => StatusCode::CONFLICT,
        DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Could not issue an access token. {0}")]
    CouldNotIssueToken(String),
}
