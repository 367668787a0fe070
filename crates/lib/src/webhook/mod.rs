//! Webhook delivery: payload construction, transport with relay fallback, and
//! reply extraction.

mod client;
mod reply;
mod transport;

pub use client::{OutboundPayload, WebhookClient, WebhookError};
pub use reply::extract_reply_text;
pub use transport::{default_proxies, ProxyEndpoint, Transport, TransportError};
