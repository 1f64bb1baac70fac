use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fantoccini::actions::{InputSource, MouseActions, PointerAction, MOUSE_BUTTON_LEFT};
use fantoccini::cookies::Cookie;
use fantoccini::elements::Element;
use fantoccini::{Client, Locator};
use regex::Regex;
use reach_common::StealthLevel;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::cursor;
use super::fingerprint::DesktopProfile;
use super::selectors::{selector_for, text_filter, Selector};
use super::signals::Signal;
use super::stealth::StealthScripts;
use super::surface::{ActionSurface, Key, SessionCookie};
use crate::humanize::motion::Point;
use crate::humanize::scroll::Viewport;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const KEY_BACKSPACE: &str = "\u{E003}";
const KEY_ENTER: &str = "\u{E007}";
const POINTER_ID: &str = "reach-pointer";

/// [`ActionSurface`] over a live WebDriver session.
#[derive(Clone)]
pub struct ReachPage {
    client: Client,
    stealth: StealthLevel,
    profile: DesktopProfile,
    debug_cursor: bool,
    pointer: Arc<Mutex<Point>>,
}

impl ReachPage {
    pub fn new(
        client: Client,
        stealth: StealthLevel,
        profile: DesktopProfile,
        debug_cursor: bool,
    ) -> Self {
        Self {
            client,
            stealth,
            profile,
            debug_cursor,
            pointer: Arc::new(Mutex::new(Point::default())),
        }
    }

    async fn apply_stealth(&self) -> Result<()> {
        for script in StealthScripts::for_level(self.stealth, &self.profile) {
            self.client
                .execute(&script, vec![])
                .await
                .context("stealth script failed")?;
        }
        if self.debug_cursor {
            self.client.execute(cursor::INSTALL_SCRIPT, vec![]).await?;
        }
        Ok(())
    }

    async fn first_match(&self, sel: &Selector, filter: Option<&Regex>) -> Result<Option<Element>> {
        let candidates = self.client.find_all(Locator::Css(sel.css)).await?;
        for el in candidates {
            // Stale or detached nodes are skipped rather than failing the probe.
            if !el.is_displayed().await.unwrap_or(false) {
                continue;
            }
            let Some(re) = filter else {
                return Ok(Some(el));
            };
            let text = el.text().await.unwrap_or_default();
            if re.is_match(text.trim()) {
                return Ok(Some(el));
            }
            if let Ok(Some(label)) = el.attr("aria-label").await {
                if re.is_match(label.trim()) {
                    return Ok(Some(el));
                }
            }
        }
        Ok(None)
    }

    async fn paint_cursor(&self, at: Point, color: &str) {
        if !self.debug_cursor {
            return;
        }
        if let Err(e) = self
            .client
            .execute(&cursor::update_script(at.x, at.y, color), vec![])
            .await
        {
            debug!(error = %e, "page.cursor_overlay");
        }
    }

    fn last_pointer(&self) -> Point {
        self.pointer.lock().map(|p| *p).unwrap_or_default()
    }
}

#[async_trait]
impl ActionSurface for ReachPage {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
        if let Err(e) = self.apply_stealth().await {
            warn!(error = %e, "page.stealth");
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn find(&self, signal: Signal, timeout: Duration) -> Result<Option<Element>> {
        let sel = selector_for(signal);
        let filter = text_filter(signal)?;
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(el) = self.first_match(&sel, filter).await? {
                return Ok(Some(el));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn read_text(&self, element: &Element) -> Result<String> {
        Ok(element.text().await?)
    }

    async fn read_attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        Ok(element.attr(name).await?)
    }

    async fn element_center(&self, element: &Element) -> Result<Option<Point>> {
        let arg = serde_json::to_value(element)?;
        let v = self
            .client
            .execute(
                r#"
                const el = arguments[0];
                el.scrollIntoView({ block: 'center', inline: 'center' });
                const r = el.getBoundingClientRect();
                if (r.width <= 0 || r.height <= 0) return null;
                return [r.left + r.width / 2, r.top + r.height / 2];
                "#,
                vec![arg],
            )
            .await?;
        match v {
            Value::Array(xy) if xy.len() == 2 => {
                let x = xy[0].as_f64().ok_or_else(|| anyhow!("non-numeric x"))?;
                let y = xy[1].as_f64().ok_or_else(|| anyhow!("non-numeric y"))?;
                Ok(Some(Point::new(x, y)))
            }
            _ => Ok(None),
        }
    }

    async fn collect_links(&self) -> Result<Vec<String>> {
        let v = self
            .client
            .execute(
                "return Array.from(document.querySelectorAll('a[href]')).map(a => a.href);",
                vec![],
            )
            .await?;
        Ok(serde_json::from_value(v)?)
    }

    async fn viewport(&self) -> Result<Viewport> {
        let v = self
            .client
            .execute("return [window.innerWidth, window.innerHeight];", vec![])
            .await?;
        let dims: Vec<f64> = serde_json::from_value(v)?;
        match dims.as_slice() {
            [w, h] => Ok(Viewport {
                width: *w,
                height: *h,
            }),
            _ => Err(anyhow!("unexpected viewport shape")),
        }
    }

    async fn move_pointer(&self, to: Point) -> Result<()> {
        let actions = MouseActions::new(POINTER_ID.to_string()).then(PointerAction::MoveTo {
            duration: Some(Duration::ZERO),
            x: to.x.round() as _,
            y: to.y.round() as _,
        });
        self.client.perform_actions(actions).await?;
        if let Ok(mut p) = self.pointer.lock() {
            *p = to;
        }
        self.paint_cursor(to, cursor::MOVING).await;
        Ok(())
    }

    async fn click(&self, _element: &Element) -> Result<()> {
        let at = self.last_pointer();
        self.paint_cursor(at, cursor::PRESSED).await;
        let actions = MouseActions::new(POINTER_ID.to_string())
            .then(PointerAction::MoveTo {
                duration: Some(Duration::ZERO),
                x: at.x.round() as _,
                y: at.y.round() as _,
            })
            .then(PointerAction::Down {
                button: MOUSE_BUTTON_LEFT,
            })
            .then(PointerAction::Up {
                button: MOUSE_BUTTON_LEFT,
            });
        self.client.perform_actions(actions).await?;
        self.paint_cursor(at, cursor::MOVING).await;
        Ok(())
    }

    async fn send_key(&self, element: &Element, key: Key) -> Result<()> {
        let owned;
        let text = match key {
            Key::Char(c) => {
                owned = c.to_string();
                owned.as_str()
            }
            Key::Backspace => KEY_BACKSPACE,
            Key::Enter => KEY_ENTER,
        };
        element.send_keys(text).await?;
        Ok(())
    }

    async fn scroll_by(&self, delta_y: f64) -> Result<()> {
        self.client
            .execute("window.scrollBy(0, arguments[0]);", vec![json!(delta_y)])
            .await?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let jar = self.client.get_all_cookies().await?;
        Ok(jar.iter().map(to_session_cookie).collect())
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()> {
        for c in cookies {
            if let Err(e) = self.client.add_cookie(to_webdriver_cookie(c)).await {
                warn!(cookie = %c.name, error = %e, "page.set_cookie");
            }
        }
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<()> {
        self.client.delete_all_cookies().await?;
        Ok(())
    }
}

fn to_session_cookie(c: &Cookie<'_>) -> SessionCookie {
    SessionCookie {
        name: c.name().to_string(),
        value: c.value().to_string(),
        domain: c.domain().map(str::to_string),
        path: c.path().map(str::to_string),
        secure: c.secure().unwrap_or(false),
        http_only: c.http_only().unwrap_or(false),
        expires: c.expires_datetime().map(|t| t.unix_timestamp()),
    }
}

fn to_webdriver_cookie(s: &SessionCookie) -> Cookie<'static> {
    let mut c = Cookie::new(s.name.clone(), s.value.clone());
    if let Some(domain) = &s.domain {
        c.set_domain(domain.clone());
    }
    if let Some(path) = &s.path {
        c.set_path(path.clone());
    }
    c.set_secure(s.secure);
    c.set_http_only(s.http_only);
    if let Some(exp) = s.expires {
        if let Ok(at) = time::OffsetDateTime::from_unix_timestamp(exp) {
            c.set_expires(at);
        }
    }
    c
}
