//! Frames and the wire responses they are built from
//!
//! A frame is one server-rendered view: the view name the renderer should
//! use, its props and context, and page metadata. Frames are immutable once
//! committed; every navigation replaces the current frame wholesale.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identity of a committed frame.
///
/// A fresh id is minted for every new-view transition; same-view refreshes
/// keep the id of the frame they update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Page-level metadata sent alongside a rendered view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient notification shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

impl Message {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Error, text)
    }
}

/// Body of a `render` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResponse {
    pub view: String,

    /// Set by the server when the view was rendered for an overlay
    #[serde(default)]
    pub overlay: bool,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub props: Value,

    #[serde(default)]
    pub context: Value,

    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Everything the remote service can answer with, tagged by `action`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Response {
    /// A view to display
    Render(RenderResponse),

    /// Navigate again, to `path`
    Redirect { path: String },

    /// Drop all client state and load the current path from scratch
    Reload,

    /// Close the overlay this response was fetched into
    CloseOverlay,
}

impl Response {
    /// Default payload decoding used when no custom `unpack` is configured
    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn action(&self) -> &'static str {
        match self {
            Response::Render(_) => "render",
            Response::Redirect { .. } => "redirect",
            Response::Reload => "reload",
            Response::CloseOverlay => "close-overlay",
        }
    }
}

/// A committed, immutable view
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: FrameId,
    pub path: String,
    pub view: String,
    pub metadata: Metadata,
    pub props: Value,
    pub context: Value,
}

impl Frame {
    /// Build a frame from a render response, splitting off the messages that
    /// travelled with it.
    pub fn from_render(id: FrameId, path: impl Into<String>, render: RenderResponse) -> (Self, Vec<Message>) {
        let frame = Self {
            id,
            path: path.into(),
            view: render.view,
            metadata: render.metadata,
            props: render.props,
            context: render.context,
        };
        (frame, render.messages)
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }
}
