//! Axum extractors that deserialise and validate JSON bodies and query strings

use crate::error::XRayError;

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Json, Query},
    http::{header, request::Parts, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// An axum extractor based on the Json extractor that also performs validation using the validator
/// crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    Json<T>: FromRequest<S, B, Rejection = JsonRejection>,
    B: Send + 'static,
{
    type Rejection = XRayError;

    /// Extract a `ValidatedJson` from a `Request`.
    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Like [ValidatedJson], but yields `None` for a request without a `Content-Type` header.
///
/// Used for endpoints where the body is optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalValidatedJson<T>(pub Option<T>);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for OptionalValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    Json<T>: FromRequest<S, B, Rejection = JsonRejection>,
    B: Send + 'static,
{
    type Rejection = XRayError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        if !req.headers().contains_key(header::CONTENT_TYPE) {
            return Ok(OptionalValidatedJson(None));
        }
        let ValidatedJson(value) = ValidatedJson::<T>::from_request(req, state).await?;
        Ok(OptionalValidatedJson(Some(value)))
    }
}

/// An axum extractor based on the Query extractor that also performs validation using the
/// validator crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = XRayError;

    /// Extract a `ValidatedQuery` from request `Parts`.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        value.validate()?;
        Ok(ValidatedQuery(value))
    }
}
