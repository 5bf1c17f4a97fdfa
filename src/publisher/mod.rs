//! Remote publisher seam
//!
//! The engine materializes playlists and items on an external video platform
//! through this narrow interface. Calls are network-bound; the engine wraps
//! every one in an explicit deadline and never blindly retries creates or
//! attaches (a duplicate remote side effect is worse than a user-visible
//! failure).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::PublisherConfig;
use crate::error::{Error, Result};

/// External platform operations consumed by the engine
#[async_trait]
pub trait RemotePublisher: Send + Sync {
    /// Create a remote playlist; returns the platform-assigned id
    async fn create_playlist(&self, name: &str) -> Result<String>;

    /// Attach a video to a remote playlist; returns the opaque handle
    /// needed to detach it later
    async fn attach_item(&self, playlist_id: &str, video_id: &str) -> Result<String>;

    /// Detach a previously attached video
    async fn detach_item(&self, remote_ref: &str) -> Result<()>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreatePlaylistResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AttachItemResponse {
    #[serde(rename = "ref")]
    remote_ref: String,
}

/// HTTP-backed publisher speaking a small JSON API
///
/// Endpoints:
/// - `POST {base}/playlists` with `{"name": ...}` → `{"id": ...}`
/// - `POST {base}/playlists/{id}/items` with `{"video_id": ...}` → `{"ref": ...}`
/// - `DELETE {base}/items/{ref}`
///
/// 4xx responses are treated as rejections (not retryable); 5xx and
/// transport failures as transient.
pub struct HttpPublisher {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpPublisher {
    /// Create a publisher from configuration
    pub fn new(config: &PublisherConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn triage(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("unable to read response body"));

        if status.is_client_error() {
            Err(Error::publish_rejected(format!("HTTP {status}: {body}")))
        } else {
            Err(Error::publish_unavailable(format!("HTTP {status}: {body}")))
        }
    }
}

#[async_trait]
impl RemotePublisher for HttpPublisher {
    async fn create_playlist(&self, name: &str) -> Result<String> {
        let response = self
            .request(reqwest::Method::POST, "/playlists")
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(|e| Error::publish_unavailable(e.to_string()))?;

        let response = Self::triage(response).await?;
        let parsed: CreatePlaylistResponse = response
            .json()
            .await
            .map_err(|e| Error::publish_rejected(format!("malformed response: {e}")))?;

        tracing::debug!(playlist_id = %parsed.id, name = %name, "remote playlist created");
        Ok(parsed.id)
    }

    async fn attach_item(&self, playlist_id: &str, video_id: &str) -> Result<String> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/playlists/{playlist_id}/items"),
            )
            .json(&serde_json::json!({ "video_id": video_id }))
            .send()
            .await
            .map_err(|e| Error::publish_unavailable(e.to_string()))?;

        let response = Self::triage(response).await?;
        let parsed: AttachItemResponse = response
            .json()
            .await
            .map_err(|e| Error::publish_rejected(format!("malformed response: {e}")))?;

        tracing::debug!(
            playlist_id = %playlist_id,
            video_id = %video_id,
            remote_ref = %parsed.remote_ref,
            "remote item attached"
        );
        Ok(parsed.remote_ref)
    }

    async fn detach_item(&self, remote_ref: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/items/{remote_ref}"))
            .send()
            .await
            .map_err(|e| Error::publish_unavailable(e.to_string()))?;

        Self::triage(response).await?;
        tracing::debug!(remote_ref = %remote_ref, "remote item detached");
        Ok(())
    }
}

// ============================================================================
// Mock Implementation (for testing)
// ============================================================================

/// One recorded publisher invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublisherCall {
    CreatePlaylist { name: String },
    AttachItem { playlist_id: String, video_id: String },
    DetachItem { remote_ref: String },
}

/// Scripted failure behavior for one mock operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    Succeed,
    /// Simulate a transient outage (recoverable)
    Unavailable,
    /// Simulate a platform rejection (not recoverable)
    Rejected,
}

impl FailureMode {
    fn apply(self, operation: &str) -> Result<()> {
        match self {
            Self::Succeed => Ok(()),
            Self::Unavailable => Err(Error::publish_unavailable(format!(
                "scripted outage during {operation}"
            ))),
            Self::Rejected => Err(Error::publish_rejected(format!(
                "scripted rejection during {operation}"
            ))),
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<PublisherCall>,
    create_mode: FailureMode,
    attach_mode: FailureMode,
    detach_mode: FailureMode,
    attach_delay: Option<Duration>,
}

/// In-memory publisher recording all calls, with scriptable failures
/// and delays for timeout tests
#[derive(Default)]
pub struct MockPublisher {
    state: Mutex<MockState>,
    sequence: AtomicU64,
}

impl MockPublisher {
    /// Create a mock that succeeds on every call
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome of subsequent create_playlist calls
    pub fn set_create_mode(&self, mode: FailureMode) {
        self.state.lock().unwrap().create_mode = mode;
    }

    /// Script the outcome of subsequent attach_item calls
    pub fn set_attach_mode(&self, mode: FailureMode) {
        self.state.lock().unwrap().attach_mode = mode;
    }

    /// Script the outcome of subsequent detach_item calls
    pub fn set_detach_mode(&self, mode: FailureMode) {
        self.state.lock().unwrap().detach_mode = mode;
    }

    /// Delay subsequent attach_item calls (engine timeout tests)
    pub fn set_attach_delay(&self, delay: Duration) {
        self.state.lock().unwrap().attach_delay = Some(delay);
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<PublisherCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl RemotePublisher for MockPublisher {
    async fn create_playlist(&self, name: &str) -> Result<String> {
        let mode = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(PublisherCall::CreatePlaylist {
                name: name.to_string(),
            });
            state.create_mode
        };
        mode.apply("create_playlist")?;
        Ok(format!("pl-{}", self.next_sequence()))
    }

    async fn attach_item(&self, playlist_id: &str, video_id: &str) -> Result<String> {
        let (mode, delay) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(PublisherCall::AttachItem {
                playlist_id: playlist_id.to_string(),
                video_id: video_id.to_string(),
            });
            (state.attach_mode, state.attach_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        mode.apply("attach_item")?;
        Ok(format!("ref-{}", self.next_sequence()))
    }

    async fn detach_item(&self, remote_ref: &str) -> Result<()> {
        let mode = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(PublisherCall::DetachItem {
                remote_ref: remote_ref.to_string(),
            });
            state.detach_mode
        };
        mode.apply("detach_item")
    }
}
