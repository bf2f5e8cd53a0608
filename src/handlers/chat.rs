// POST /chat handler

use crate::models::ChatRequest;
use crate::state::AppState;

pub async fn chat_handler(
    request: ChatRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = state.service.chat(request).await?;
    Ok(warp::reply::json(&response))
}
