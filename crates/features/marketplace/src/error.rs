use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mkt_kernel::security::PathGuardError;
use std::borrow::Cow;
use tracing::{debug, error};

/// A specialized [`MarketplaceError`] enum of this crate.
#[mkt_derive::mkt_error]
pub enum MarketplaceError {
    /// Malformed or unsafe request input.
    #[error("Invalid marketplace request{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The catalog or a download host answered with a non-success status.
    #[error("Upstream responded with {status}{}: {message}", format_context(.context))]
    Upstream { status: u16, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Upstream request failed{}: {source}", format_context(.context))]
    Http { source: reqwest::Error, context: Option<Cow<'static, str>> },

    #[error("Rejected path{}: {source}", format_context(.context))]
    Path { source: PathGuardError, context: Option<Cow<'static, str>> },

    #[error("Plugin archive error{}: {message}", format_context(.context))]
    Archive { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Plugin directory I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Plugin directory scan error{}: {source}", format_context(.context))]
    Walk { source: walkdir::Error, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal marketplace error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl MarketplaceError {
    pub(crate) fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Validation { message: message.into(), context: None }
    }

    pub(crate) fn archive(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Archive { message: message.into(), context: None }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::Path { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            },
            Self::Http { .. }
            | Self::Archive { .. }
            | Self::Io { .. }
            | Self::Walk { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, "{self}");
        } else {
            debug!(%status, "{self}");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_kernel::security::PathGuard;

    #[test]
    fn statuses_follow_error_class() {
        assert_eq!(MarketplaceError::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            MarketplaceError::NotFound { message: "x".into(), context: None }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MarketplaceError::Upstream { status: 429, message: "slow down".into(), context: None }
                .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(MarketplaceError::archive("corrupt").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(MarketplaceError::from("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rejected_slugs_are_client_errors() {
        let err: MarketplaceError = PathGuard::segment("..").unwrap_err().into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
