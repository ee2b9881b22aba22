//! Custom Axum extractors
//!
//! Every rejection becomes an `ApiError`, so malformed input gets the same
//! JSON 400 body as a failed validation.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use crate::models::{TodoId, ValidationError};

/// Extract and validate a todo id from path
pub struct ValidTodoId(pub TodoId);

impl<S> FromRequestParts<S> for ValidTodoId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation(ValidationError::Empty { field: "id" }))?;

        let id = raw.parse::<i64>().map_err(|_| {
            ApiError::Validation(ValidationError::InvalidFormat {
                field: "id",
                reason: "must be a positive integer",
            })
        })?;

        Ok(Self(TodoId::new(id)?))
    }
}

/// JSON body whose rejections map to a 400 `validation_error`
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    tracing::debug!(%rejection, "rejected request body");
    let reason = match rejection {
        JsonRejection::MissingJsonContentType(_) => "expected content-type application/json",
        JsonRejection::JsonSyntaxError(_) => "malformed JSON",
        _ => "does not match the expected shape",
    };
    ApiError::Validation(ValidationError::InvalidFormat {
        field: "body",
        reason,
    })
}

/// Query string whose rejections map to a 400 `validation_error`
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection: QueryRejection| {
                tracing::debug!(%rejection, "rejected query string");
                ApiError::Validation(ValidationError::InvalidFormat {
                    field: "query",
                    reason: "missing or invalid parameters",
                })
            })
    }
}
