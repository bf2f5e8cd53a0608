//! Streaming relay from the provider to the client
//!
//! The relay owns one spawned task per streaming request. The task:
//! 1. Reads the provider's chunked body and splits it into lines
//! 2. Skips blank and non-`data:` lines
//! 3. Stops on the `[DONE]` sentinel or when the body ends
//! 4. Decodes each frame's text deltas, forwards them in order over a
//!    bounded channel and appends them to an aggregate
//! 5. Persists the aggregate as one [`ChatTurn`](crate::history::ChatTurn)
//!
//! Dropping the receiving side (or cancelling the token) stops the task and
//! releases the upstream body promptly.

pub mod frame;
pub mod task;

pub use frame::{classify_line, Frame, LineSplitter, DATA_PREFIX, DONE_SENTINEL};
pub use task::{
    RelayEvent, RelayHandle, RelayOptions, RelayOutcome, RelayStream, StreamRelay, Termination,
    TurnSink,
};
