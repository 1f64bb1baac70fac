#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reach_config::ReachConfig;
use reach_drivers::humanize::motion::Point;
use reach_drivers::humanize::scroll::Viewport;
use reach_drivers::{ActionSurface, Actuator, HumanizeOptions, Key, SessionCookie, Signal};
use reach_store::{TargetStore, TargetUrl};
use tokio_util::sync::CancellationToken;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// One scripted page: which cues are visible and how controls react.
#[derive(Debug, Clone, Default)]
pub struct Page {
    signals: HashSet<Signal>,
    texts: HashMap<Signal, String>,
    attributes: HashMap<(Signal, String), String>,
    links: Vec<String>,
    redirect: Option<String>,
    reveals: HashMap<Signal, Vec<Signal>>,
    click_goes_to: HashMap<Signal, String>,
    enter_goes_to: HashMap<Signal, String>,
    /// After this many URL checks the page turns into another one.
    settles_to: Option<(u32, String)>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(mut self, signals: &[Signal]) -> Self {
        self.signals.extend(signals.iter().copied());
        self
    }

    pub fn text(mut self, signal: Signal, text: &str) -> Self {
        self.signals.insert(signal);
        self.texts.insert(signal, text.to_string());
        self
    }

    pub fn attribute(mut self, signal: Signal, name: &str, value: &str) -> Self {
        self.attributes
            .insert((signal, name.to_string()), value.to_string());
        self
    }

    pub fn links(mut self, links: &[&str]) -> Self {
        self.links.extend(links.iter().map(|l| l.to_string()));
        self
    }

    pub fn redirect(mut self, to: &str) -> Self {
        self.redirect = Some(to.to_string());
        self
    }

    pub fn click_reveals(mut self, signal: Signal, revealed: &[Signal]) -> Self {
        self.reveals.insert(signal, revealed.to_vec());
        self
    }

    pub fn click_goes_to(mut self, signal: Signal, url: &str) -> Self {
        self.click_goes_to.insert(signal, url.to_string());
        self
    }

    pub fn enter_goes_to(mut self, signal: Signal, url: &str) -> Self {
        self.enter_goes_to.insert(signal, url.to_string());
        self
    }

    pub fn settles_to(mut self, after_checks: u32, url: &str) -> Self {
        self.settles_to = Some((after_checks, url.to_string()));
        self
    }
}

#[derive(Default)]
struct State {
    pages: HashMap<String, Page>,
    current: String,
    visible: HashSet<Signal>,
    checks_on_page: u32,
    typed: HashMap<Signal, String>,
    events: Vec<String>,
    cookies: Vec<SessionCookie>,
    /// Issued by the site once the login form is submitted.
    login_cookies: Vec<SessionCookie>,
}

impl State {
    fn load(&mut self, url: &str) {
        let mut target = url.to_string();
        // Follow redirects, bounded so a scripted loop cannot hang a test.
        for _ in 0..5 {
            match self.pages.get(&target).and_then(|p| p.redirect.clone()) {
                Some(next) => target = next,
                None => break,
            }
        }
        self.visible = self
            .pages
            .get(&target)
            .map(|p| p.signals.clone())
            .unwrap_or_default();
        self.current = target;
        self.checks_on_page = 0;
    }

    fn submit_login(&mut self) {
        let issued = self.login_cookies.clone();
        self.cookies.extend(issued);
    }

    fn page(&self) -> Option<&Page> {
        self.pages.get(&self.current)
    }
}

/// An in-memory [`ActionSurface`] driven by a table of scripted pages.
#[derive(Clone, Default)]
pub struct ScriptedSurface {
    state: Arc<Mutex<State>>,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: &str, page: Page) -> &Self {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), page);
        self
    }

    pub fn with_browser_cookies(&self, cookies: Vec<SessionCookie>) -> &Self {
        self.state.lock().unwrap().cookies = cookies;
        self
    }

    pub fn issues_cookies_on_login(&self, cookies: Vec<SessionCookie>) -> &Self {
        self.state.lock().unwrap().login_cookies = cookies;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("navigate:").map(str::to_string))
            .collect()
    }

    pub fn clicked(&self, signal: Signal) -> bool {
        let needle = format!("click:{signal}");
        self.events().iter().any(|e| *e == needle)
    }

    pub fn typed(&self, signal: Signal) -> String {
        self.state
            .lock()
            .unwrap()
            .typed
            .get(&signal)
            .cloned()
            .unwrap_or_default()
    }

    pub fn browser_cookies(&self) -> Vec<SessionCookie> {
        self.state.lock().unwrap().cookies.clone()
    }
}

#[async_trait]
impl ActionSurface for ScriptedSurface {
    type Element = Signal;

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.events.push(format!("navigate:{url}"));
        s.load(url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let mut s = self.state.lock().unwrap();
        s.events.push("current_url".to_string());
        s.checks_on_page += 1;
        if let Some((after, next)) = s.page().and_then(|p| p.settles_to.clone()) {
            if s.checks_on_page > after {
                s.load(&next);
            }
        }
        Ok(s.current.clone())
    }

    async fn find(&self, signal: Signal, _timeout: Duration) -> Result<Option<Signal>> {
        let s = self.state.lock().unwrap();
        Ok(s.visible.contains(&signal).then_some(signal))
    }

    async fn read_text(&self, element: &Signal) -> Result<String> {
        let s = self.state.lock().unwrap();
        Ok(s
            .page()
            .and_then(|p| p.texts.get(element).cloned())
            .unwrap_or_default())
    }

    async fn read_attribute(&self, element: &Signal, name: &str) -> Result<Option<String>> {
        let s = self.state.lock().unwrap();
        Ok(s
            .page()
            .and_then(|p| p.attributes.get(&(*element, name.to_string())).cloned()))
    }

    async fn element_center(&self, _element: &Signal) -> Result<Option<Point>> {
        Ok(Some(Point::new(600.0, 400.0)))
    }

    async fn collect_links(&self) -> Result<Vec<String>> {
        let s = self.state.lock().unwrap();
        Ok(s.page().map(|p| p.links.clone()).unwrap_or_default())
    }

    async fn viewport(&self) -> Result<Viewport> {
        Ok(Viewport {
            width: 1280.0,
            height: 800.0,
        })
    }

    async fn move_pointer(&self, _to: Point) -> Result<()> {
        Ok(())
    }

    async fn click(&self, element: &Signal) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.events.push(format!("click:{element}"));
        let page = s.page().cloned().unwrap_or_default();
        if let Some(revealed) = page.reveals.get(element) {
            s.visible.extend(revealed.iter().copied());
        }
        if *element == Signal::LoginSubmit {
            s.submit_login();
        }
        if let Some(url) = page.click_goes_to.get(element) {
            s.load(url);
        }
        Ok(())
    }

    async fn send_key(&self, element: &Signal, key: Key) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        match key {
            Key::Char(c) => s.typed.entry(*element).or_default().push(c),
            Key::Backspace => {
                s.typed.entry(*element).or_default().pop();
            }
            Key::Enter => {
                s.events.push(format!("enter:{element}"));
                if *element == Signal::LoginPassword {
                    s.submit_login();
                }
                let next = s
                    .page()
                    .and_then(|p| p.enter_goes_to.get(element).cloned());
                if let Some(url) = next {
                    s.load(&url);
                }
            }
        }
        Ok(())
    }

    async fn scroll_by(&self, _delta_y: f64) -> Result<()> {
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.events.push(format!("set_cookies:{}", cookies.len()));
        s.cookies.extend(cookies.iter().cloned());
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.events.push("clear_cookies".to_string());
        s.cookies.clear();
        Ok(())
    }
}

/// An actuator that never sleeps.
pub fn instant_actuator(surface: &ScriptedSurface, seed: u64) -> Actuator<ScriptedSurface> {
    instant_actuator_with(surface, seed, CancellationToken::new())
}

pub fn instant_actuator_with(
    surface: &ScriptedSurface,
    seed: u64,
    cancel: CancellationToken,
) -> Actuator<ScriptedSurface> {
    let options = HumanizeOptions {
        delay_factor: 0.0,
        typo_probability: 0.05,
        seed: Some(seed),
        scroll_bursts: 1..=2,
    };
    Actuator::new(surface.clone(), options, cancel)
}

pub fn test_config() -> ReachConfig {
    let mut config = ReachConfig::default();
    config.templates.connect_note = "Hi {firstName}, let's connect.".to_string();
    config.templates.follow_up = "Thanks {firstName}!".to_string();
    config.search.keyword = "rust".to_string();
    config.search.max_pages = 3;
    config
}

pub fn profile(slug: &str) -> TargetUrl {
    TargetUrl::parse(&format!("https://www.linkedin.com/in/{slug}")).unwrap()
}

pub async fn store_with_found(slugs: &[&str]) -> TargetStore {
    let store = TargetStore::in_memory().await.unwrap();
    for slug in slugs {
        store.insert_if_absent(&profile(slug)).await.unwrap();
    }
    store
}

pub fn cookie(name: &str) -> SessionCookie {
    SessionCookie {
        name: name.to_string(),
        value: "token".to_string(),
        domain: Some("www.linkedin.com".to_string()),
        path: Some("/".to_string()),
        secure: true,
        http_only: true,
        expires: None,
    }
}
