//! Webhook client: payload construction, delivery, and the seam where
//! transport failures become user-facing text.

use crate::identity::SessionStore;
use crate::webhook::reply::extract_reply_text;
use crate::webhook::transport::{Transport, TransportError};
use serde::Serialize;

/// Fixed action name the destination switches on.
const ACTION_SEND_MESSAGE: &str = "sendMessage";

/// Request body for one message. `chat_input` and `text` always carry the
/// same string; destinations differ in which field name they read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPayload {
    pub action: &'static str,
    pub chat_input: String,
    pub text: String,
    pub session_id: String,
}

impl OutboundPayload {
    pub fn new(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            action: ACTION_SEND_MESSAGE,
            chat_input: message.clone(),
            text: message,
            session_id: session_id.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook URL is not configured.")]
    MissingUrl,

    /// Raw transport failure rewritten into actionable guidance naming the
    /// proxy setting (the "Failed to fetch" seam).
    #[error(
        "Connection failed. Access to the webhook server was blocked (CORS). \
         Verify the \"Proxy\" setting is enabled."
    )]
    CorsBlocked(#[source] TransportError),

    #[error("{0}")]
    Transport(TransportError),
}

/// Orchestrates one send: payload with session id, delivery, reply extraction.
pub struct WebhookClient {
    identity: SessionStore,
    transport: Transport,
}

impl WebhookClient {
    pub fn new(identity: SessionStore) -> Self {
        Self {
            identity,
            transport: Transport::new(),
        }
    }

    /// Build with an explicit transport (tests inject relay lists here).
    pub fn with_transport(identity: SessionStore, transport: Transport) -> Self {
        Self {
            identity,
            transport,
        }
    }

    /// Send one message and return the reply text. Every failure maps to an
    /// error whose `Display` is ready to show to the user; nothing here is
    /// fatal beyond the current send.
    pub async fn send_message(
        &self,
        url: &str,
        message: &str,
        use_proxy: bool,
    ) -> Result<String, WebhookError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(WebhookError::MissingUrl);
        }

        let session_id = self.identity.get_or_create().await;
        let payload = OutboundPayload::new(message, session_id);

        match self.transport.deliver(url, &payload, use_proxy).await {
            Ok(raw) => Ok(extract_reply_text(&raw)),
            Err(e) => Err(rewrite_transport_error(e)),
        }
    }
}

/// The single place transport errors become user-facing language. A raw
/// transport failure leaking out of the relay pass turns into CORS guidance;
/// every other error keeps its original message. Decode errors are not
/// transport failures: a server that answered 2xx with a non-JSON body was
/// reached fine, so its parse error passes through.
fn rewrite_transport_error(e: TransportError) -> WebhookError {
    match e {
        TransportError::Request(err) if !err.is_decode() => {
            WebhookError::CorsBlocked(TransportError::Request(err))
        }
        other => WebhookError::Transport(other),
    }
}
