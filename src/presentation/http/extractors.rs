//! Custom Extractors
//!
//! JSON and query extractors that turn rejections and validation failures
//! into the API error format, plus path id parsing.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::shared::error::AppError;
use crate::shared::validation::validate;

/// JSON body that has passed its `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        validate(&value)?;
        Ok(Self(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(e) => AppError::BadRequest(e.body_text()),
        JsonRejection::JsonSyntaxError(_) => AppError::BadRequest("Malformed JSON body".into()),
        JsonRejection::MissingJsonContentType(_) => {
            AppError::BadRequest("Expected Content-Type: application/json".into())
        }
        other => AppError::BadRequest(other.body_text()),
    }
}

/// Query string parameters; parse failures become 400 in the API format.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Parse a path or body id, naming the field in the 400 message.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("Invalid {} format", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct Named {
        #[validate(length(min = 2, message = "Name too short"))]
        name: String,
    }

    async fn echo(ValidatedJson(body): ValidatedJson<Named>) -> impl IntoResponse {
        body.name
    }

    async fn post_json(body: &'static str) -> StatusCode {
        let app = Router::new().route("/", post(echo));
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        assert_eq!(post_json(r#"{"name":"Ada"}"#).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_body_is_bad_request() {
        assert_eq!(post_json(r#"{"name":"A"}"#).await, StatusCode::BAD_REQUEST);
        assert_eq!(post_json(r#"{"name":"#).await, StatusCode::BAD_REQUEST);
        assert_eq!(post_json(r#"{}"#).await, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "chat ID").unwrap(), id);
        assert!(matches!(
            parse_id("42", "chat ID"),
            Err(AppError::BadRequest(msg)) if msg == "Invalid chat ID format"
        ));
    }
}
