//! Chat command routing
//!
//! Thin surface between the chat layer and the engine: parses inbound
//! message text into add/remove intents, enforces the active-channel
//! allowlist, and maps every engine outcome onto exactly one
//! [`ReactionKind`] acknowledgement. The router never touches the entry
//! store directly.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::ChatConfig;
use crate::engine::PlaylistEngine;
use crate::models::{derive_video_id, ReactionKind};

/// A parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Submit a video to the open playlist
    Add(String),
    /// Withdraw a previously submitted video
    Remove(String),
}

/// Result of parsing one chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    /// Not addressed to the bot; no acknowledgement at all
    Ignored,
    /// Recognized command with an unusable argument
    Malformed,
    /// A usable add/remove intent
    Intent(Intent),
}

/// Routes chat messages to engine operations
pub struct CommandRouter {
    engine: Arc<PlaylistEngine>,
    config: ChatConfig,
}

impl CommandRouter {
    /// Create a router over the engine
    pub fn new(engine: Arc<PlaylistEngine>, config: ChatConfig) -> Self {
        Self { engine, config }
    }

    /// Parse message text into a command.
    ///
    /// Messages without the prefix or with an unknown command word are
    /// [`ParsedCommand::Ignored`]; a recognized command with an unusable
    /// argument is [`ParsedCommand::Malformed`].
    pub fn parse(&self, content: &str) -> ParsedCommand {
        let body = match content.strip_prefix(self.config.command_prefix.as_str()) {
            Some(body) => body,
            None => return ParsedCommand::Ignored,
        };

        let mut parts = body.split_whitespace();
        let command = match parts.next() {
            Some(command) => command,
            None => return ParsedCommand::Ignored,
        };
        let argument = parts.next();

        match command {
            "add" | "insert" | "link" => match argument.and_then(derive_video_id) {
                Some(video_id) => ParsedCommand::Intent(Intent::Add(video_id)),
                None => ParsedCommand::Malformed,
            },
            "remove" | "delete" => match argument.and_then(derive_video_id) {
                Some(video_id) => ParsedCommand::Intent(Intent::Remove(video_id)),
                None => ParsedCommand::Malformed,
            },
            _ => ParsedCommand::Ignored,
        }
    }

    /// Handle one inbound chat message.
    ///
    /// Returns `None` when the message is not addressed to the bot (wrong
    /// channel, no prefix, unknown command); otherwise exactly one
    /// acknowledgement, even on failure.
    pub async fn dispatch(&self, channel_id: &str, content: &str) -> Option<ReactionKind> {
        if !self.config.active_channels.is_empty()
            && !self
                .config
                .active_channels
                .iter()
                .any(|c| c == channel_id)
        {
            return None;
        }

        let intent = match self.parse(content) {
            ParsedCommand::Intent(intent) => intent,
            ParsedCommand::Ignored => return None,
            ParsedCommand::Malformed => return Some(ReactionKind::Malformed),
        };

        Some(self.execute(intent).await)
    }

    async fn execute(&self, intent: Intent) -> ReactionKind {
        match intent {
            Intent::Add(video_id) => match self.engine.add_item(&video_id, Utc::now()).await {
                Ok(_) => ReactionKind::Success,
                Err(e) => {
                    warn!(video_id = %video_id, error = %e, "add command failed");
                    e.reaction()
                }
            },
            Intent::Remove(video_id) => match self.engine.remove_item(&video_id).await {
                Ok(()) => ReactionKind::Success,
                Err(e) => {
                    debug!(video_id = %video_id, error = %e, "remove command failed");
                    e.reaction()
                }
            },
        }
    }
}
