use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Body of `POST <api_base>/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
}

/// Wire form of the endpoint's reply. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

/// A successful reply from the chat endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    /// Server-issued session identifier, if any
    pub session_id: Option<String>,
}

/// Classify an HTTP status and body into a reply or a transport failure.
///
/// Non-2xx statuses, undecodable bodies and bodies without a `response`
/// string are all failures.
pub fn decode_reply(status: u16, body: &str) -> Result<ChatReply, TransportError> {
    if !(200..300).contains(&status) {
        return Err(TransportError::Status(status));
    }

    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))?;

    let response = parsed.response.ok_or(TransportError::MissingResponse)?;
    let session_id = parsed.session_id.filter(|id| !id.is_empty());

    Ok(ChatReply {
        response,
        session_id,
    })
}
