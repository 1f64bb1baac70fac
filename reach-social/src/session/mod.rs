//! Keeps one authenticated browsing session alive across runs.
//!
//! A saved bundle is tried first. If the site bounces it to the sign-in page
//! the manager goes straight to a credential login; only an inconclusive page
//! is re-probed. A verification challenge after login blocks until someone
//! resolves it in the browser window.
pub mod bundle;

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use reach_common::ReachError;
use reach_config::{AccountConfig, SessionConfig};
use reach_drivers::humanize::cadence::TypingStyle;
use reach_drivers::humanize::pacing::FIELD_GAP;
use reach_drivers::{ActionSurface, ActuationError, Actuator, Signal};
use tracing::{debug, info, warn};

pub use bundle::{BundleLoad, CredentialBundle, DiscardReason, BUNDLE_VERSION};

use crate::linkedin::{
    is_challenge_url, is_feed_url, is_login_url, CONTROL_TIMEOUT, FEED_URL, GLANCE, HOME_URL,
    LOGIN_URL, PANEL_TIMEOUT,
};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("account email and password must both be configured")]
    MissingCredentials,

    #[error("sign-in form incomplete: {0} not found")]
    LoginForm(Signal),

    #[error("the site rejected the configured credentials")]
    Rejected,

    #[error("no signed-in page after {0} checks")]
    Unconfirmed(u32),

    #[error(transparent)]
    Actuation(#[from] ActuationError),
}

impl From<SessionError> for ReachError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Actuation(ActuationError::Interrupted(_)) => ReachError::Interrupted,
            SessionError::Actuation(ActuationError::Surface(e)) => ReachError::Driver(e),
            other => ReachError::Auth(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn from_account(account: &AccountConfig) -> Result<Self> {
        match (account.email.as_deref(), account.password.as_deref()) {
            (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => Ok(Self::new(e, p)),
            _ => Err(SessionError::MissingCredentials),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub bundle_path: PathBuf,
    pub max_age: chrono::Duration,
    /// Inconclusive checks of a restored session before giving up on it.
    pub probe_attempts: u32,
    pub probe_interval: Duration,
    /// Checks after submitting credentials before declaring failure.
    pub manual_login_polls: u32,
    pub challenge_poll: Duration,
    /// Challenge polls between "still waiting" log lines.
    pub challenge_reminder_every: u32,
}

impl SessionSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            bundle_path: config.bundle_path.clone(),
            max_age: chrono::Duration::hours(config.max_age_hours as i64),
            probe_attempts: config.probe_attempts.max(1),
            probe_interval: Duration::from_secs(1),
            manual_login_polls: config.manual_login_polls.max(1),
            challenge_poll: Duration::from_secs(5),
            challenge_reminder_every: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    CookieAttempt,
    Expired,
    ManualAttempt,
    ChallengeWait,
    Authenticated,
    Failed,
}

/// What one look at the current page says about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    Authenticated,
    LoginRedirect,
    Challenge,
    Inconclusive,
}

/// How the session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPath {
    Restored,
    Manual,
}

#[derive(Debug)]
pub struct SessionManager {
    settings: SessionSettings,
    credentials: Credentials,
    state: SessionState,
}

impl SessionManager {
    pub fn new(settings: SessionSettings, credentials: Credentials) -> Self {
        Self {
            settings,
            credentials,
            state: SessionState::NoSession,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn enter(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session.state");
        self.state = next;
    }

    /// Leave the browser signed in, restoring the saved bundle if possible.
    pub async fn establish<S: ActionSurface>(&mut self, act: &mut Actuator<S>) -> Result<AuthPath> {
        self.enter(SessionState::NoSession);
        let load = CredentialBundle::load(&self.settings.bundle_path, Utc::now(), self.settings.max_age);

        if let BundleLoad::Loaded(saved) = load {
            self.enter(SessionState::CookieAttempt);
            if self.restore(act, &saved).await? {
                self.enter(SessionState::Authenticated);
                info!(path = "restored", "session.authenticated");
                return Ok(AuthPath::Restored);
            }
            self.enter(SessionState::Expired);
        }

        self.manual_login(act).await?;
        info!(path = "manual", "session.authenticated");
        Ok(AuthPath::Manual)
    }

    async fn restore<S: ActionSurface>(
        &mut self,
        act: &mut Actuator<S>,
        saved: &CredentialBundle,
    ) -> Result<bool> {
        // Cookies can only be set for the domain currently loaded.
        act.navigate(HOME_URL).await?;
        act.surface()
            .set_cookies(&saved.cookies)
            .await
            .map_err(ActuationError::from)?;
        act.navigate(FEED_URL).await?;

        for attempt in 1..=self.settings.probe_attempts {
            let verdict = probe(act).await?;
            debug!(attempt, verdict = ?verdict, "session.probe");
            match verdict {
                ProbeVerdict::Authenticated => return Ok(true),
                ProbeVerdict::LoginRedirect | ProbeVerdict::Challenge => {
                    info!(verdict = ?verdict, "session.bundle.dead");
                    return Ok(false);
                }
                ProbeVerdict::Inconclusive => {
                    act.pacer()
                        .wait("session_probe", self.settings.probe_interval)
                        .await?;
                }
            }
        }
        warn!(attempts = self.settings.probe_attempts, "session.probe.inconclusive");
        Ok(false)
    }

    async fn manual_login<S: ActionSurface>(&mut self, act: &mut Actuator<S>) -> Result<()> {
        self.enter(SessionState::ManualAttempt);
        act.surface()
            .clear_cookies()
            .await
            .map_err(ActuationError::from)?;
        act.navigate(LOGIN_URL).await?;

        let username = act
            .probe(Signal::LoginUsername, PANEL_TIMEOUT)
            .await?
            .ok_or(SessionError::LoginForm(Signal::LoginUsername))?;
        act.type_into(&username, &self.credentials.email, TypingStyle::Precise)
            .await?;
        act.pause(FIELD_GAP).await?;

        let password = act
            .probe(Signal::LoginPassword, CONTROL_TIMEOUT)
            .await?
            .ok_or(SessionError::LoginForm(Signal::LoginPassword))?;
        act.type_into(&password, &self.credentials.password, TypingStyle::Precise)
            .await?;
        act.pause(FIELD_GAP).await?;

        if !act.click_signal(Signal::LoginSubmit, CONTROL_TIMEOUT).await? {
            act.submit(&password).await?;
        }
        info!("session.login.submitted");

        for poll in 1..=self.settings.manual_login_polls {
            if act.probe(Signal::CredentialRejected, GLANCE).await?.is_some() {
                self.enter(SessionState::Failed);
                return Err(SessionError::Rejected);
            }
            match probe(act).await? {
                ProbeVerdict::Authenticated => return self.persist(act).await,
                ProbeVerdict::Challenge => {
                    self.await_challenge(act).await?;
                    return self.persist(act).await;
                }
                verdict => debug!(poll, verdict = ?verdict, "session.login.poll"),
            }
            act.pacer()
                .wait("session_login_poll", self.settings.probe_interval)
                .await?;
        }

        self.enter(SessionState::Failed);
        Err(SessionError::Unconfirmed(self.settings.manual_login_polls))
    }

    /// Block until a human clears the verification challenge.
    async fn await_challenge<S: ActionSurface>(&mut self, act: &mut Actuator<S>) -> Result<()> {
        self.enter(SessionState::ChallengeWait);
        warn!("session.challenge: complete the verification in the browser window");
        let every = self.settings.challenge_reminder_every.max(1);
        let mut polls: u32 = 0;
        loop {
            act.pacer()
                .wait("session_challenge", self.settings.challenge_poll)
                .await?;
            polls = polls.saturating_add(1);
            if probe(act).await? == ProbeVerdict::Authenticated {
                info!(polls, "session.challenge.cleared");
                return Ok(());
            }
            if polls % every == 0 {
                let waited = self.settings.challenge_poll.saturating_mul(polls);
                warn!(waited_secs = waited.as_secs(), "session.challenge.waiting");
            }
        }
    }

    async fn persist<S: ActionSurface>(&mut self, act: &mut Actuator<S>) -> Result<()> {
        self.enter(SessionState::Authenticated);
        let cookies = act
            .surface()
            .cookies()
            .await
            .map_err(ActuationError::from)?;
        if cookies.is_empty() {
            warn!(path = %self.settings.bundle_path.display(), "session.bundle.empty");
            return Ok(());
        }
        let bundle = CredentialBundle::capture(cookies, Utc::now());
        // A session that works but cannot be saved is still usable now.
        if let Err(e) = bundle.save(&self.settings.bundle_path) {
            warn!(error = %e, "session.bundle.save_failed");
        }
        Ok(())
    }
}

/// Classify the current page.
pub async fn probe<S: ActionSurface>(act: &Actuator<S>) -> Result<ProbeVerdict> {
    let url = act.current_url().await?;
    if is_login_url(&url) {
        return Ok(ProbeVerdict::LoginRedirect);
    }
    if is_challenge_url(&url) {
        return Ok(ProbeVerdict::Challenge);
    }
    if is_feed_url(&url) || act.probe(Signal::AuthenticatedMarker, GLANCE).await?.is_some() {
        return Ok(ProbeVerdict::Authenticated);
    }
    if act.probe(Signal::ChallengeMarker, GLANCE).await?.is_some() {
        return Ok(ProbeVerdict::Challenge);
    }
    Ok(ProbeVerdict::Inconclusive)
}
