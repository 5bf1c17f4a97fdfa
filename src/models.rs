// Core data structures for the tapedeck engine

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use url::Url;

/// A submitted video link attached to a playlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Store-local row identity
    pub id: i64,
    /// External platform identifier of the video (user-supplied or derived)
    pub video_id: String,
    /// Owning playlist id
    pub playlist_id: String,
    /// Opaque handle the remote publisher returned on attach; needed for detach
    pub remote_ref: String,
    /// True once the owning playlist has been released
    pub archived: bool,
    /// Immutable once set
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new item; the store assigns the row id
#[derive(Debug, Clone)]
pub struct NewItem {
    pub video_id: String,
    pub playlist_id: String,
    pub remote_ref: String,
    pub created_at: DateTime<Utc>,
}

/// A named, time-boxed grouping of submitted items (a "mixtape")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    /// Identifier assigned by the remote publisher at creation time
    pub id: String,
    /// Display label, immutable after creation
    pub name: String,
    /// False at creation, flips to true exactly once
    pub released: bool,
    pub created_at: DateTime<Utc>,
    /// Refreshed whenever release eligibility is evaluated
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    /// Sequential display name, e.g. "Mixtape Vol. 4" for the fourth playlist
    pub fn volume_name(sequence: usize) -> String {
        format!("Mixtape Vol. {sequence}")
    }
}

/// Outcome of one playlist's release evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Interval elapsed and threshold met; the playlist was released
    Released {
        playlist_id: String,
        item_count: usize,
    },
    /// Interval elapsed but too few items; nothing released
    Deferred { playlist_id: String },
}

/// User-visible acknowledgement chosen by the chat layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionKind {
    Success,
    NotFound,
    TransientError,
    FatalError,
    Malformed,
}

impl ReactionKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::TransientError => "transient_error",
            Self::FatalError => "fatal_error",
            Self::Malformed => "malformed",
        }
    }
}

fn youtube_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"[?&]v=([A-Za-z0-9_-]{11})").expect("valid pattern"),
            Regex::new(r"youtu\.be/([A-Za-z0-9_-]{11})").expect("valid pattern"),
            Regex::new(r"/shorts/([A-Za-z0-9_-]{11})").expect("valid pattern"),
        ]
    })
}

fn bare_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{6,64}$").expect("valid pattern"))
}

/// Derive a stable video id from a submitted reference.
///
/// Recognized forms:
/// - YouTube watch / short-link / shorts URLs: the 11-character video id
/// - any other http(s) URL: a SHA-256-derived id, stable per URL
/// - a bare platform id token: passed through unchanged
///
/// Returns `None` when the input is not a usable reference.
pub fn derive_video_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = Url::parse(trimmed) {
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return None;
        }
        for pattern in youtube_patterns() {
            if let Some(caps) = pattern.captures(trimmed) {
                return caps.get(1).map(|m| m.as_str().to_string());
            }
        }
        // Unknown platform: hash the normalized URL so the same link
        // always maps to the same id
        let digest = Sha256::digest(parsed.as_str().as_bytes());
        let hex = format!("{digest:x}");
        return Some(format!("link_{}", &hex[..16]));
    }

    if bare_id_pattern().is_match(trimmed) {
        return Some(trimmed.to_string());
    }

    None
}
