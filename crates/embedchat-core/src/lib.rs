//! Core of the embedchat website widget
//!
//! This crate holds everything that does not touch the DOM: rendering of
//! message text, the persisted conversation identity, the single-flight
//! request lifecycle, the endpoint protocol and widget state. The browser
//! binding lives in `embedchat-wasm`.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod render;
pub mod session;
pub mod transcript;
pub mod widget;

pub use config::WidgetConfig;
pub use error::{StorageError, TransportError};
pub use pipeline::{
    ChatTransport, MessagePipeline, PipelineView, RejectReason, RequestState, SendOutcome,
};
pub use protocol::{decode_reply, ChatReply, ChatRequest};
pub use render::{escape_html, render};
pub use session::{KeyValueStore, MemoryStore, SessionIdentityManager, UnavailableStore};
pub use transcript::{Message, Sender, Transcript};
pub use widget::{AutoTrigger, WidgetState};

/// Render raw text from `sender` into a display fragment
pub fn render_message(sender: Sender, raw_text: &str) -> String {
    render::render(raw_text, sender)
}
