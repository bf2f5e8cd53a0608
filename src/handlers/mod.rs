// Handlers module

pub mod chat;
pub mod status;
pub mod stream;

pub use chat::chat_handler;
pub use status::status_handler;
pub use stream::stream_handler;
