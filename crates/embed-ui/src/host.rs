//! Host editor surface
//!
//! The small part of the editor's block API the embed block consumes:
//! shared CSS class names and a way to show a message to the user.

use serde::{Deserialize, Serialize};

/// CSS class names the editor applies to every block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStyles {
    /// Base block class
    pub block: String,
    /// Editor-styled input class
    pub input: String,
}

impl Default for BlockStyles {
    fn default() -> Self {
        Self {
            block: "cdx-block".to_string(),
            input: "cdx-input".to_string(),
        }
    }
}

/// Notification style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStyle {
    /// Informational
    #[default]
    Info,
    /// Something went wrong
    Error,
}

/// Message shown by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Human-readable text
    pub message: String,
    /// Style
    pub style: NotificationStyle,
}

impl Notification {
    /// Create an error notification
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            style: NotificationStyle::Error,
        }
    }
}

/// Block API provided by the host editor
#[cfg_attr(test, mockall::automock)]
pub trait BlockApi: Send + Sync {
    /// Shared block class names
    fn styles(&self) -> BlockStyles;

    /// Show a message; fire and forget
    fn notify(&self, notification: Notification);
}
