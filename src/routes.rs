// Route definitions and filters

use warp::Filter;

use crate::error::{handle_rejection, ApiError};
use crate::handlers;
use crate::models::ChatRequest;
use crate::state::AppState;
use crate::telemetry;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Largest accepted request body
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

pub fn configure_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
    // GET /status
    let status = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::status_handler);

    // POST /chat
    let chat = warp::path("chat")
        .and(warp::path::end())
        .and(warp::post())
        .and(chat_request())
        .and(authorized(state.clone()))
        .and_then(handlers::chat_handler);

    // POST /stream
    let stream = warp::path("stream")
        .and(warp::path::end())
        .and(warp::post())
        .and(chat_request())
        .and(authorized(state))
        .and_then(handlers::stream_handler);

    // Browser clients may call from any origin; the key still gates access
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type", API_KEY_HEADER]);

    status
        .or(chat)
        .or(stream)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::log::custom(telemetry::request_log))
}

/// Size-limited JSON body with a non-empty message
fn chat_request() -> impl Filter<Extract = (ChatRequest,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::json())
        .and_then(|request: ChatRequest| async move {
            request
                .validate()
                .map_err(|msg| warp::reject::custom(ApiError::BadRequest(msg)))?;
            Ok::<_, warp::Rejection>(request)
        })
}

/// Pass the state through only when `X-API-KEY` matches
fn authorized(state: AppState) -> impl Filter<Extract = (AppState,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(API_KEY_HEADER).and_then(move |key: Option<String>| {
        let state = state.clone();
        async move {
            if state.authorize(key.as_deref()) {
                Ok(state)
            } else {
                tracing::debug!("Rejected request with missing or invalid API key");
                Err(warp::reject::custom(ApiError::Unauthorized))
            }
        }
    })
}
