//! HTTP error mapping
//!
//! Every failure a handler can produce is an [`ApiError`]. Handlers reject
//! with it and [`handle_rejection`] turns it, and warp's own rejections,
//! into a status code and `{"error": ...}` body.

use std::convert::Infallible;

use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::history::StoreError;
use crate::llm::ClientError;
use crate::models::ErrorResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or empty request
    #[error("{0}")]
    BadRequest(String),

    /// Missing or wrong API key
    #[error("unauthorized")]
    Unauthorized,

    #[error("History store error: {0}")]
    Store(#[from] StoreError),

    #[error("Completion provider error: {0}")]
    Provider(#[from] ClientError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Store(_) | ApiError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "input",
            ApiError::Unauthorized => "auth",
            ApiError::Store(_) => "store",
            ApiError::Provider(_) => "provider",
        }
    }

    /// Message safe to return to the client
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Unauthorized => "unauthorized".to_string(),
            ApiError::Store(_) => "failed to access conversation history".to_string(),
            ApiError::Provider(_) => "failed to get a response from the model".to_string(),
        }
    }
}

impl warp::reject::Reject for ApiError {}

/// Build an error reply with the standard body
pub fn error_reply(status: StatusCode, message: impl Into<String>) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&ErrorResponse::new(message)), status)
        .into_response()
}

/// Map any rejection to a JSON error response
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(api_err) = err.find::<ApiError>() {
        let status = api_err.status();
        if status.is_server_error() {
            tracing::error!(
                category = api_err.category(),
                error = %api_err,
                "Request failed on a dependency"
            );
        } else {
            tracing::debug!(category = api_err.category(), error = %api_err, "Request rejected");
        }
        return Ok(error_reply(status, api_err.public_message()));
    }

    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "not found"));
    }

    if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        tracing::debug!(error = %e, "Invalid request body");
        return Ok(error_reply(StatusCode::BAD_REQUEST, "invalid request body"));
    }

    if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        tracing::debug!(error = %e, "Invalid request header");
        return Ok(error_reply(StatusCode::BAD_REQUEST, "invalid header"));
    }

    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(error_reply(
            StatusCode::PAYLOAD_TOO_LARGE,
            "request body too large",
        ));
    }

    if err.find::<warp::reject::LengthRequired>().is_some() {
        return Ok(error_reply(
            StatusCode::LENGTH_REQUIRED,
            "content length required",
        ));
    }

    if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        return Ok(error_reply(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected application/json",
        ));
    }

    if let Some(e) = err.find::<warp::filters::cors::CorsForbidden>() {
        tracing::debug!(error = %e, "Cross-origin request refused");
        return Ok(error_reply(StatusCode::FORBIDDEN, "cross-origin request forbidden"));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply(
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed",
        ));
    }

    tracing::error!(rejection = ?err, "Unhandled rejection");
    Ok(error_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error",
    ))
}
