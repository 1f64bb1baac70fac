//! Page-level protocols for the professional network.
//!
//! Each submodule drives one kind of visit through an [`Actuator`]
//! (`reach_drivers::Actuator`) and reports what it saw. None of them touch
//! the store; recording outcomes is the orchestrator's job.
pub mod discovery;
pub mod invite;
pub mod message;

use std::time::Duration;

use reach_drivers::Span;
use reach_store::TargetUrl;
use url::Url;

pub const HOME_URL: &str = "https://www.linkedin.com/";
pub const FEED_URL: &str = "https://www.linkedin.com/feed/";
pub const LOGIN_URL: &str = "https://www.linkedin.com/login";

/// Gap between invitation visits.
pub const SAFETY_SPACING: Span = Span::new("safety_spacing", 15_000, 30_000);
/// Long rest after every [`BREAK_EVERY`]th sent invitation.
pub const COFFEE_BREAK: Span = Span::new("coffee_break", 60_000, 180_000);
/// Gap between messaging visits.
pub const MESSAGE_COOLDOWN: Span = Span::new("message_cooldown", 5_000, 10_000);
/// Long rest after every [`BREAK_EVERY`]th delivered message.
pub const MESSAGE_BREAK: Span = Span::new("message_break", 45_000, 90_000);
/// Between the discovery and invitation halves of a demo run.
pub const DEMO_SETTLE: Span = Span::new("demo_settle", 9_000, 11_000);
/// Reading a profile before deciding anything.
pub const PROFILE_READ: Span = Span::new("profile_read", 3_000, 5_000);
/// After a dialog or menu opens.
pub const DIALOG_SETTLE: Span = Span::new("dialog_settle", 1_000, 2_000);
/// After submitting a search or turning a results page.
pub const RESULTS_SETTLE: Span = Span::new("results_settle", 4_000, 6_000);

pub const BREAK_EVERY: u32 = 3;

/// Quick look for a cue that is either there already or not at all.
pub(crate) const GLANCE: Duration = Duration::from_secs(1);
/// Wait for a control expected to render shortly.
pub(crate) const CONTROL_TIMEOUT: Duration = Duration::from_secs(3);
/// Wait for a chat composer or form to open.
pub(crate) const PANEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection notes longer than this are refused by the site.
pub const NOTE_LIMIT: usize = 300;

/// Whether `href` points at a full member profile.
///
/// ```
/// use reach_social::linkedin::is_profile_link;
///
/// assert!(is_profile_link("https://www.linkedin.com/in/ada-lovelace?mini=true"));
/// assert!(!is_profile_link("https://www.linkedin.com/in/ACoAAB/minis/"));
/// assert!(!is_profile_link("https://www.google.com/url?q=linkedin.com/in/x"));
/// ```
pub fn is_profile_link(href: &str) -> bool {
    let Ok(url) = Url::parse(href) else {
        return false;
    };
    let host_ok = url
        .host_str()
        .is_some_and(|h| h == "linkedin.com" || h.ends_with(".linkedin.com"));
    let path = url.path();
    host_ok
        && path.starts_with("/in/")
        && path.len() > "/in/".len()
        && !path.contains("/minis/")
        && !path.contains("mini-profile")
}

/// Canonical profile URLs among `links`, deduplicated, in page order.
pub fn profile_targets<'a>(links: impl IntoIterator<Item = &'a str>) -> Vec<TargetUrl> {
    let mut out: Vec<TargetUrl> = Vec::new();
    for href in links {
        if !is_profile_link(href) {
            continue;
        }
        if let Ok(url) = TargetUrl::parse(href) {
            if !out.contains(&url) {
                out.push(url);
            }
        }
    }
    out
}

/// First word of a profile heading, or `"there"` when it has none.
pub fn first_name(heading: &str) -> String {
    heading
        .split_whitespace()
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| "there".to_string())
}

/// Cut `note` to [`NOTE_LIMIT`] characters.
pub fn truncate_note(note: &str) -> String {
    note.chars().take(NOTE_LIMIT).collect()
}

/// First few characters of outgoing text, for logs.
pub(crate) fn preview(text: &str) -> String {
    let head: String = text.chars().take(24).collect();
    if head.len() < text.len() {
        format!("{head}…")
    } else {
        head
    }
}

/// Whether `current` is the sign-in page or an auth wall.
pub fn is_login_url(current: &str) -> bool {
    let Ok(url) = Url::parse(current) else {
        return false;
    };
    let path = url.path();
    ["/login", "/uas/login", "/uas/authenticate", "/checkpoint/lg/login", "/authwall"]
        .iter()
        .any(|p| path.starts_with(p))
}

/// Whether `current` is a verification challenge.
pub fn is_challenge_url(current: &str) -> bool {
    Url::parse(current).is_ok_and(|u| u.path().starts_with("/checkpoint/challenge"))
}

/// Whether `current` is the signed-in home feed.
pub fn is_feed_url(current: &str) -> bool {
    Url::parse(current).is_ok_and(|u| u.path().starts_with("/feed"))
}
