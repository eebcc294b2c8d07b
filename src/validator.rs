use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use classroll_core::{AppError, CoreError};

fn format_errors(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().filter_map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .or_else(|| Some(format!("{} is invalid", field)))
            })
        })
        .chain(
            errors
                .errors()
                .iter()
                .filter(|(_, kind)| !matches!(kind, validator::ValidationErrorsKind::Field(_)))
                .map(|(field, _)| format!("{} is invalid", field)),
        )
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_rejection(rejection: &JsonRejection) -> String {
    let error_msg = rejection.body_text();

    if error_msg.contains("missing field") {
        let field = error_msg
            .split("missing field `")
            .nth(1)
            .and_then(|s| s.split('`').next())
            .unwrap_or("unknown");
        return format!("{} is required", field);
    }

    if error_msg.contains("invalid type") || error_msg.contains("unknown variant") {
        return "Invalid field type in request".to_string();
    }

    if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
        return "Missing 'Content-Type: application/json' header".to_string();
    }

    "Invalid request body".to_string()
}

/// JSON body extractor that runs `validator` rules before the handler sees it.
#[derive(Debug, Clone, Copy, Default)]
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
            .map_err(|rejection| {
                AppError::bad_request(CoreError::validation(describe_rejection(&rejection)))
            })?;

        value.validate().map_err(|errors| {
            AppError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::validation(format_errors(&errors)),
            )
        })?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use classroll_models::SetGradeDto;

    async fn extract(body: &str) -> Result<ValidatedJson<SetGradeDto>, AppError> {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        ValidatedJson::<SetGradeDto>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let ValidatedJson(dto) = extract(r#"{"score": 8.5}"#).await.unwrap();
        assert_eq!(dto.score, 8.5);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let err = extract("{}").await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.core(),
            Some(&CoreError::validation("score is required"))
        );
    }

    #[tokio::test]
    async fn out_of_range_is_unprocessable() {
        let err = extract(r#"{"score": 11}"#).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.core().map(|e| e.code()), Some("VALIDATION_ERROR"));
    }
}
