//! Remote frame fetching
//!
//! The shell never talks to the network directly; it hands a [`FrameRequest`]
//! to a [`FrameFetcher`] and gets back the raw JSON payload, which the
//! configured `unpack` hook turns into a [`Response`](crate::frame::Response).

pub mod error;
pub mod http;

pub use error::{ErrorKind, FetchError};
pub use http::HttpFetcher;

use async_trait::async_trait;
use serde_json::Value;

/// Header sent with every request so the server answers with JSON
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
pub const REQUESTED_WITH_VALUE: &str = "DjangoBridge";

/// Header marking requests made on behalf of an overlay
pub const OVERLAY_HEADER: &str = "X-DjangoBridge-Overlay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    /// Form submission with url-encoded fields
    Post(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRequest {
    pub path: String,
    pub overlay: bool,
    pub method: Method,
}

impl FrameRequest {
    pub fn get(path: impl Into<String>, overlay: bool) -> Self {
        Self {
            path: path.into(),
            overlay,
            method: Method::Get,
        }
    }

    pub fn post(path: impl Into<String>, overlay: bool, fields: Vec<(String, String)>) -> Self {
        Self {
            path: path.into(),
            overlay,
            method: Method::Post(fields),
        }
    }
}

/// Fetches raw frame payloads from the remote rendering service
#[async_trait]
pub trait FrameFetcher: Send + Sync {
    async fn fetch(&self, request: FrameRequest) -> Result<Value, FetchError>;
}
