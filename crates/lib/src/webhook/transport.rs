//! HTTP delivery: direct POST to the destination, or a single linear pass over
//! the CORS relays when direct requests are blocked.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Bound on each network attempt. The destination owes a single JSON reply;
/// a hung destination or relay fails that attempt instead of blocking forever.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Direct-mode transport failure (connect, TLS, timeout) rather than an
    /// HTTP status. In a browser context this is almost always a cross-origin
    /// block, so the message points at the proxy setting.
    #[error("Direct connection failed (CORS blocked). Please enable Proxy in settings.")]
    CorsBlocked(#[source] reqwest::Error),

    #[error("Direct connection error {status}: {status_text}")]
    DirectStatus { status: u16, status_text: String },

    /// Non-2xx from a relay attempt. Recorded and surfaced only on exhaustion;
    /// a relay's own error page is not distinguished from the destination's.
    #[error("Proxy status {status}: {status_text}")]
    RelayStatus { status: u16, status_text: String },

    /// Relay answered 2xx with a body that is not JSON (typically its own
    /// HTML error page). Soft failure: the next relay is still tried.
    #[error("Received invalid response from server.")]
    InvalidBody,

    /// Raw transport failure from a relay attempt.
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Every relay failed without recording a more specific error.
    #[error("All proxy attempts failed. Check your internet connection or the Webhook URL.")]
    Exhausted,
}

/// A CORS relay: display name plus the URL rewrite that targets it.
pub struct ProxyEndpoint {
    name: String,
    rewrite: Box<dyn Fn(&str) -> String + Send + Sync>,
}

impl ProxyEndpoint {
    pub fn new(
        name: impl Into<String>,
        rewrite: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            rewrite: Box::new(rewrite),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rewrite the (already cache-busted) target URL into the relay request URL.
    pub fn url_for(&self, target: &str) -> String {
        (self.rewrite)(target)
    }
}

/// Relays in the order they are attempted. corsproxy.io wants the target
/// percent-encoded; thingproxy takes it verbatim after the path prefix.
pub fn default_proxies() -> Vec<ProxyEndpoint> {
    vec![
        ProxyEndpoint::new("corsproxy.io", |target| {
            format!("https://corsproxy.io/?{}", urlencoding::encode(target))
        }),
        ProxyEndpoint::new("thingproxy", |target| {
            format!("https://thingproxy.freeboard.io/fetch/{}", target)
        }),
    ]
}

/// Performs one JSON POST per send: straight to the destination, or through
/// the relay list in fixed order. No racing, no retries, no backoff.
pub struct Transport {
    client: reqwest::Client,
    proxies: Vec<ProxyEndpoint>,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self::with_proxies(default_proxies())
    }

    /// Build with an explicit relay list (tests point these at local servers).
    pub fn with_proxies(proxies: Vec<ProxyEndpoint>) -> Self {
        // The destination may be a third party: no cookie store, and never
        // send a Referer on redirects.
        let client = match reqwest::Client::builder()
            .referer(false)
            .timeout(ATTEMPT_TIMEOUT)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                log::warn!(
                    "http client builder failed ({}), falling back to defaults without \
                     attempt timeout or referer hardening",
                    e
                );
                reqwest::Client::new()
            }
        };
        Self { client, proxies }
    }

    /// POST `body` to `target_url` (cache-busted) and return the parsed JSON reply.
    pub async fn deliver<T: Serialize + ?Sized>(
        &self,
        target_url: &str,
        body: &T,
        use_proxy: bool,
    ) -> Result<Value, TransportError> {
        let target = cache_busted(target_url);

        if !use_proxy {
            return self.deliver_direct(&target, body).await;
        }

        let mut last_err: Option<TransportError> = None;
        for proxy in &self.proxies {
            let url = proxy.url_for(&target);
            log::debug!("attempting relay {}: {}", proxy.name(), url);
            match self.attempt_relay(&url, body).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::warn!("relay {} failed: {}", proxy.name(), e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(TransportError::Exhausted))
    }

    async fn deliver_direct<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Value, TransportError> {
        let res = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(TransportError::CorsBlocked)?;
        let status = res.status();
        if !status.is_success() {
            return Err(TransportError::DirectStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        Ok(res.json().await?)
    }

    async fn attempt_relay<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Value, TransportError> {
        let res = self.client.post(url).json(body).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(TransportError::RelayStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        // Relays often answer 200 with their own HTML error page; read as text
        // first so that counts as a failed attempt rather than a decode panic.
        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|_| {
            log::warn!("relay returned non-JSON body: {}", text.trim());
            TransportError::InvalidBody
        })
    }
}

/// Stamp a fresh `_t=<epoch millis>` onto the URL so no cache between here and
/// the destination replays a stale reply. Appends with `&` when the URL already
/// carries a query string.
fn cache_busted(url: &str) -> String {
    let stamp = format!("_t={}", chrono::Utc::now().timestamp_millis());
    if url.contains('?') {
        format!("{}&{}", url, stamp)
    } else {
        format!("{}?{}", url, stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_appends_new_query() {
        let busted = cache_busted("https://example.com/hook");
        assert!(busted.starts_with("https://example.com/hook?_t="), "{}", busted);
        assert_eq!(busted.matches('?').count(), 1);
    }

    #[test]
    fn cache_buster_preserves_existing_query() {
        let busted = cache_busted("https://example.com/hook?mode=chat");
        assert!(
            busted.starts_with("https://example.com/hook?mode=chat&_t="),
            "{}",
            busted
        );
    }

    #[test]
    fn default_relay_order_is_fixed() {
        let proxies = default_proxies();
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[0].name(), "corsproxy.io");
        assert_eq!(proxies[1].name(), "thingproxy");
    }

    #[test]
    fn corsproxy_rewrite_percent_encodes_target() {
        let proxies = default_proxies();
        assert_eq!(
            proxies[0].url_for("https://example.com/hook?_t=1"),
            "https://corsproxy.io/?https%3A%2F%2Fexample.com%2Fhook%3F_t%3D1"
        );
    }

    #[test]
    fn thingproxy_rewrite_keeps_target_verbatim() {
        let proxies = default_proxies();
        assert_eq!(
            proxies[1].url_for("https://example.com/hook?_t=1"),
            "https://thingproxy.freeboard.io/fetch/https://example.com/hook?_t=1"
        );
    }

    #[test]
    fn status_errors_carry_code_and_reason() {
        let e = TransportError::DirectStatus {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Direct connection error 500: Internal Server Error"
        );
        let e = TransportError::RelayStatus {
            status: 502,
            status_text: "Bad Gateway".to_string(),
        };
        assert_eq!(e.to_string(), "Proxy status 502: Bad Gateway");
    }
}
