use async_trait::async_trait;
use embedchat_core::{decode_reply, ChatReply, ChatRequest, ChatTransport, TransportError};
use gloo_net::http::Request;

/// Posts chat requests with the browser's `fetch`
pub struct FetchTransport {
    endpoint: String,
}

impl FetchTransport {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait(?Send)]
impl ChatTransport for FetchTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        log::debug!("POST {}", self.endpoint);

        let response = Request::post(&self.endpoint)
            .json(request)
            .map_err(|e| TransportError::Network(format!("Failed to serialize request: {}", e)))?
            .send()
            .await
            .map_err(|e| TransportError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Decode(format!("Failed to read response: {}", e)))?;

        decode_reply(status, &body)
    }
}
