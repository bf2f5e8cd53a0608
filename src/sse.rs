use std::convert::Infallible;

use warp::sse::Event;

use crate::models::{DeltaPayload, DonePayload};
use crate::relay::RelayEvent;

/// Event name carrying one text delta
pub const MESSAGE_EVENT: &str = "message";

/// Event name closing the stream
pub const DONE_EVENT: &str = "done";

/// Create a message SSE event carrying one text delta
pub fn create_message_event(delta: &str) -> Result<Event, Infallible> {
    let payload = DeltaPayload { delta };

    Ok(Event::default()
        .event(MESSAGE_EVENT)
        .data(serde_json::to_string(&payload).unwrap_or_default()))
}

/// Create a done SSE event to signal stream completion
pub fn create_done_event() -> Result<Event, Infallible> {
    let payload = DonePayload::default();

    Ok(Event::default()
        .event(DONE_EVENT)
        .data(serde_json::to_string(&payload).unwrap_or_default()))
}

/// Map a relay event to its SSE form
pub fn relay_event_to_sse(event: RelayEvent) -> Result<Event, Infallible> {
    match event {
        RelayEvent::Delta(text) => create_message_event(&text),
        RelayEvent::Done => create_done_event(),
    }
}
