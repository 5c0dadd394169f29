use std::error::Error as StdError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use leasehold_api_types::{RpcErrorData, RpcErrorShape, RpcFailure};

use crate::application::auth::AuthError;
use crate::application::error::ErrorReport;
use crate::application::properties::PropertyError;
use crate::application::tokens::TokenError;
use crate::application::users::UserError;
use crate::domain::error::DomainError;

const SOURCE: &str = "infra::http::rpc";

/// Wire error codes: the name carried in `data.code`, the JSON-RPC number in
/// `code` and the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    BadRequest,
    ParseError,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotSupported,
    Conflict,
    InternalServerError,
}

impl RpcErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::ParseError => "PARSE_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            Self::Conflict => "CONFLICT",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn json_rpc_code(self) -> i32 {
        match self {
            Self::BadRequest => -32600,
            Self::ParseError => -32700,
            Self::Unauthorized => -32001,
            Self::Forbidden => -32003,
            Self::NotFound => -32004,
            Self::MethodNotSupported => -32005,
            Self::Conflict => -32009,
            Self::InternalServerError => -32603,
        }
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            Self::BadRequest | Self::ParseError => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A failed procedure call. `message` is public; `report` keeps the
/// diagnostic chain for the response logger.
#[derive(Debug, Clone)]
pub struct RpcError {
    pub code: RpcErrorCode,
    pub message: String,
    pub path: Option<String>,
    report: ErrorReport,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            report: ErrorReport::from_message(SOURCE, code.http_status(), message.clone()),
            code,
            message,
            path: None,
        }
    }

    /// Public message is generic; the error chain only reaches the logs.
    pub fn internal(error: &dyn StdError) -> Self {
        let code = RpcErrorCode::InternalServerError;
        Self {
            report: ErrorReport::from_error(SOURCE, code.http_status(), error),
            code,
            message: "Internal server error".to_string(),
            path: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::BadRequest, message)
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::ParseError, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(RpcErrorCode::Unauthorized, "Authentication required")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::NotFound, message)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }

    pub fn to_failure(&self) -> RpcFailure {
        RpcFailure {
            error: RpcErrorShape {
                message: self.message.clone(),
                code: self.code.json_rpc_code(),
                data: RpcErrorData {
                    code: self.code.as_str().to_string(),
                    http_status: self.status().as_u16(),
                    path: self.path.clone(),
                },
            },
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.to_failure())).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<DomainError> for RpcError {
    fn from(err: DomainError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<AuthError> for RpcError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Domain(inner) => inner.into(),
            AuthError::EmailTaken => Self::new(RpcErrorCode::Conflict, err.to_string()),
            AuthError::InvalidCredentials => {
                Self::new(RpcErrorCode::Unauthorized, err.to_string())
            }
            AuthError::Token(TokenError::NotConfigured) => {
                let mut rpc = Self::internal(&err);
                rpc.message = err.to_string();
                rpc
            }
            AuthError::Token(_) | AuthError::Repo(_) => Self::internal(&err),
        }
    }
}

impl From<UserError> for RpcError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Domain(inner) => inner.into(),
            UserError::NotFound => Self::not_found(err.to_string()),
            UserError::Repo(_) => Self::internal(&err),
        }
    }
}

impl From<PropertyError> for RpcError {
    fn from(err: PropertyError) -> Self {
        match err {
            PropertyError::Domain(inner) => inner.into(),
            PropertyError::Slug(_) => Self::bad_request(err.to_string()),
            PropertyError::NotFound => Self::not_found(err.to_string()),
            PropertyError::NotOwner => Self::new(RpcErrorCode::Forbidden, err.to_string()),
            PropertyError::SlugTaken(_) => Self::new(RpcErrorCode::Conflict, err.to_string()),
            PropertyError::Repo(_) => Self::internal(&err),
        }
    }
}
