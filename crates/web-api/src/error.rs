use application::{ApplicationError, RejectionReason};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, RepositoryError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.body.code
    }
}

impl From<RejectionReason> for ApiError {
    fn from(reason: RejectionReason) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, reason.code(), reason.to_string())
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => {
                ApiError::bad_request(format!("{}: {}", field, reason))
            }
            AppErr::Domain(DomainError::EmailTaken) => {
                ApiError::new(StatusCode::CONFLICT, "EMAIL_TAKEN", "email already registered")
            }
            AppErr::Domain(DomainError::UsernameTaken) => ApiError::new(
                StatusCode::CONFLICT,
                "USERNAME_TAKEN",
                "username already registered",
            ),
            AppErr::Domain(DomainError::UserNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "user not found")
            }
            AppErr::Repository(repo_err) => match repo_err {
                RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                RepositoryError::Conflict { field } => ApiError::new(
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("{} already exists", field),
                ),
                RepositoryError::Storage { message } => {
                    tracing::error!(error = %message, "store unavailable");
                    ApiError::new(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "STORE_UNAVAILABLE",
                        "storage is temporarily unavailable",
                    )
                }
            },
            AppErr::Password(err) => {
                tracing::error!(error = %err, "password hashing failed");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PASSWORD_ERROR",
                    "password processing failed",
                )
            }
            AppErr::Authentication(reason) => reason.into(),
            AppErr::InvalidCredentials => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "invalid email or password",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
