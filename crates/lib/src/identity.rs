//! Conversation identity: one opaque v4-shaped token per install.
//!
//! The token is sent as `sessionId` with every message so the destination can
//! correlate turns into a single conversation. It is created on first need,
//! persisted, and immutable from then on.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Persisted identity document (e.g. ~/.hookchat/session.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDocument {
    session_id: String,
}

/// Store for the conversation identity token, wrapping the storage path it
/// persists to. One token per storage path; last-write-wins on the file.
pub struct SessionStore {
    path: PathBuf,
    cached: Mutex<Option<String>>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    /// Return the persisted token, generating and persisting a new one on
    /// first need. A failed write is logged and swallowed; the in-memory token
    /// then serves the rest of the session.
    pub async fn get_or_create(&self) -> String {
        let mut cached = self.cached.lock().await;
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }
        let id = match Self::load(&self.path) {
            Some(id) => id,
            None => {
                let id = generate_token();
                if let Err(e) = self.save(&id) {
                    log::warn!(
                        "could not persist session id to {}: {}",
                        self.path.display(),
                        e
                    );
                }
                id
            }
        };
        *cached = Some(id.clone());
        id
    }

    /// Load from JSON file. Returns None if file missing, invalid, or blank.
    fn load(path: &Path) -> Option<String> {
        let s = std::fs::read_to_string(path).ok()?;
        let doc: SessionDocument = serde_json::from_str(&s).ok()?;
        let id = doc.session_id.trim().to_string();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    /// Save to JSON file. Creates parent dirs if needed.
    fn save(&self, id: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let doc = SessionDocument {
            session_id: id.to_string(),
        };
        let s = serde_json::to_string_pretty(&doc)?;
        std::fs::write(&self.path, s)?;
        Ok(())
    }
}

/// New v4 token: strong randomness when available, otherwise a clock-seeded
/// fallback that still satisfies the v4 shape destinations validate.
fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(e) => {
            log::warn!("no strong random source ({}), using weak session token", e);
            fallback_token()
        }
    }
}

/// Weak v4-shaped token from a xorshift stream seeded by the clock. Not a
/// secret; it only has to be well-formed.
fn fallback_token() -> String {
    let mut state = (chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0x5eed) as u64) | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state & 0xf) as u32
    };
    let mut out = String::with_capacity(36);
    for c in "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx".chars() {
        match c {
            'x' => out.push(std::char::from_digit(next(), 16).unwrap_or('0')),
            'y' => out.push(std::char::from_digit(8 + (next() & 0x3), 16).unwrap_or('8')),
            _ => out.push(c),
        }
    }
    out
}
