use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Error returned by every handler. Each variant maps to one category a
/// client can act on (fix input, upgrade, retry later).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    QuotaExceeded { limit: i32, message: String },

    #[error("plan generation failed: {0}")]
    GenerationFailed(String),

    #[error("email delivery is not configured")]
    DeliveryUnavailable,

    #[error("email delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// `Json` body extractor whose rejection goes through the `AppError` envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            AppError::GenerationFailed(_) => "GENERATION_FAILED",
            AppError::DeliveryUnavailable => "DELIVERY_UNAVAILABLE",
            AppError::DeliveryFailed(_) => "DELIVERY_FAILED",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::GenerationFailed(_) | AppError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::DeliveryUnavailable | AppError::UpstreamUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::GenerationFailed(_) => "Plan generation failed. Please try again.".into(),
            AppError::DeliveryFailed(_) => "Failed to send shopping list email.".into(),
            AppError::Database(sqlx::Error::RowNotFound) => "Resource not found".into(),
            AppError::Database(_) | AppError::Internal(_) => "An internal error occurred".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut status = self.status();
        let mut code = self.code();
        match &self {
            AppError::Database(sqlx::Error::RowNotFound) => {
                status = StatusCode::NOT_FOUND;
                code = "NOT_FOUND";
            }
            AppError::Database(e) => tracing::error!(error = %e, "database error"),
            AppError::Internal(e) => tracing::error!(error = %e, "internal error"),
            AppError::GenerationFailed(e) => tracing::warn!(error = %e, "generation failed"),
            AppError::DeliveryFailed(e) => tracing::warn!(error = %e, "email delivery failed"),
            _ => {}
        }

        let mut body = json!({
            "error": self.public_message(),
            "code": code,
        });
        if let AppError::QuotaExceeded { limit, .. } = &self {
            body["limit"] = json!(limit);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_distinct_statuses() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::QuotaExceeded { limit: 1, message: "m".into() }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(AppError::DeliveryUnavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::GenerationFailed("boom".into()).code(), "GENERATION_FAILED");
        assert_eq!(AppError::NotFound("Plan").to_string(), "Plan not found");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AppError::GenerationFailed("upstream said 500".into());
        assert!(!err.public_message().contains("upstream"));
        let err = AppError::Internal(anyhow::anyhow!("secret stack"));
        assert_eq!(err.public_message(), "An internal error occurred");
    }

    #[derive(Debug, serde::Deserialize)]
    struct Body {
        num_days: i32,
    }

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn mistyped_body_is_a_validation_error() {
        let err = AppJson::<Body>::from_request(json_request(r#"{"num_days":"three"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let err = AppJson::<Body>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_a_validation_error() {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .body(axum::body::Body::from(r#"{"num_days":3}"#))
            .unwrap();
        let err = AppJson::<Body>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn well_formed_body_is_extracted() {
        let AppJson(body) = AppJson::<Body>::from_request(json_request(r#"{"num_days":3}"#), &())
            .await
            .unwrap();
        assert_eq!(body.num_days, 3);
    }

    #[test]
    fn quota_response_carries_limit() {
        let res = AppError::QuotaExceeded { limit: 3, message: "limit".into() }.into_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
