//! The capabilities the automation consumes from a browser.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::signals::Signal;
use crate::humanize::motion::Point;
use crate::humanize::scroll::Viewport;

/// A key delivered to a focused element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
}

/// A browser cookie in a driver-neutral shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Expiry as unix seconds; `None` for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

impl SessionCookie {
    pub fn is_expired_at(&self, unix_secs: i64) -> bool {
        matches!(self.expires, Some(exp) if exp <= unix_secs)
    }
}

/// Low-level browser capabilities.
///
/// Implementations perform each operation immediately; pacing and motion
/// are layered on top by [`Actuator`](crate::actuator::Actuator).
#[async_trait]
pub trait ActionSurface: Send + Sync {
    type Element: Clone + Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Poll for `signal` until `timeout`; `Ok(None)` when it never appears.
    async fn find(&self, signal: Signal, timeout: Duration) -> Result<Option<Self::Element>>;

    async fn read_text(&self, element: &Self::Element) -> Result<String>;

    async fn read_attribute(&self, element: &Self::Element, name: &str)
        -> Result<Option<String>>;

    /// Scroll `element` into view and return its center, or `None` if it
    /// has no rendered box.
    async fn element_center(&self, element: &Self::Element) -> Result<Option<Point>>;

    /// Every absolute link target on the current page.
    async fn collect_links(&self) -> Result<Vec<String>>;

    async fn viewport(&self) -> Result<Viewport>;

    async fn move_pointer(&self, to: Point) -> Result<()>;

    /// Press the primary button on `element`, where the pointer now rests.
    async fn click(&self, element: &Self::Element) -> Result<()>;

    async fn send_key(&self, element: &Self::Element, key: Key) -> Result<()>;

    async fn scroll_by(&self, delta_y: f64) -> Result<()>;

    async fn cookies(&self) -> Result<Vec<SessionCookie>>;

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()>;

    async fn clear_cookies(&self) -> Result<()>;
}
