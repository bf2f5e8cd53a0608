// POST /stream handler

use futures_util::StreamExt;

use crate::models::ChatRequest;
use crate::relay::RelayEvent;
use crate::sse::{create_done_event, relay_event_to_sse};
use crate::state::AppState;

/// Relay the provider's reply as SSE
///
/// Failures before the stream opens become ordinary error responses. Once
/// streaming starts the status is committed, so a broken upstream ends the
/// stream with `done` after whatever was received.
pub async fn stream_handler(
    request: ChatRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let handle = state.service.stream(request).await?;

    // Dropping the event stream (client disconnect) cancels the relay
    let (mut events, _task) = handle.into_stream();

    let event_stream = async_stream::stream! {
        let mut done = false;
        while let Some(event) = events.next().await {
            done = event == RelayEvent::Done;
            yield relay_event_to_sse(event);
        }
        if !done {
            // Relay gave up on a stalled client without a terminal event
            yield create_done_event();
        }
    };

    Ok(warp::sse::reply(
        warp::sse::keep_alive().stream(event_stream),
    ))
}
