use crate::models::TransactionStatus;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrokerageError>;

#[derive(Error, Debug)]
pub enum BrokerageError {
    #[error("Storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(uuid::Uuid),

    #[error("Account not found for user {0}")]
    AccountNotFound(uuid::Uuid),

    #[error("User not found: {0}")]
    UserNotFound(uuid::Uuid),

    #[error("Address not found: {0}")]
    AddressNotFound(uuid::Uuid),

    #[error("Transaction is not pending (status: {status})")]
    NotPending { status: TransactionStatus },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("No active deposit address for asset {0}")]
    UnsupportedAsset(String),

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Admin role required")]
    Forbidden,

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BrokerageError {
    fn from(err: serde_json::Error) -> Self {
        BrokerageError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl ResponseError for BrokerageError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            BrokerageError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BrokerageError::DecimalParse(_) => StatusCode::BAD_REQUEST,
            BrokerageError::Validation(_) => StatusCode::BAD_REQUEST,
            BrokerageError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
            BrokerageError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            BrokerageError::UserNotFound(_) => StatusCode::NOT_FOUND,
            BrokerageError::AddressNotFound(_) => StatusCode::NOT_FOUND,
            BrokerageError::NotPending { .. } => StatusCode::CONFLICT,
            BrokerageError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            BrokerageError::UnsupportedAsset(_) => StatusCode::BAD_REQUEST,
            BrokerageError::EmailAlreadyRegistered => StatusCode::BAD_REQUEST,
            BrokerageError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            BrokerageError::AccountInactive => StatusCode::FORBIDDEN,
            BrokerageError::Forbidden => StatusCode::FORBIDDEN,
            BrokerageError::Unauthorized => StatusCode::UNAUTHORIZED,
            BrokerageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl BrokerageError {
    fn error_type(&self) -> &str {
        match self {
            BrokerageError::Database(_) => "storage_error",
            BrokerageError::DecimalParse(_) => "decimal_parse_error",
            BrokerageError::Validation(_) => "validation_error",
            BrokerageError::TransactionNotFound(_) => "not_found",
            BrokerageError::AccountNotFound(_) => "not_found",
            BrokerageError::UserNotFound(_) => "not_found",
            BrokerageError::AddressNotFound(_) => "not_found",
            BrokerageError::NotPending { .. } => "not_pending",
            BrokerageError::InsufficientBalance { .. } => "insufficient_balance",
            BrokerageError::UnsupportedAsset(_) => "unsupported_asset",
            BrokerageError::EmailAlreadyRegistered => "email_taken",
            BrokerageError::InvalidCredentials => "invalid_credentials",
            BrokerageError::AccountInactive => "account_inactive",
            BrokerageError::Forbidden => "forbidden",
            BrokerageError::Unauthorized => "unauthorized",
            BrokerageError::Internal(_) => "internal_error",
        }
    }
}
