use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::signals::Signal;

/// DOM lookup for one [`Signal`]: CSS candidates, optionally narrowed by
/// a regex over the element's visible text or aria-label.
#[derive(Debug, Clone, Copy)]
pub struct Selector {
    pub css: &'static str,
    pub text: Option<&'static str>,
}

const fn css(css: &'static str) -> Selector {
    Selector { css, text: None }
}

const fn css_text(css: &'static str, text: &'static str) -> Selector {
    Selector {
        css,
        text: Some(text),
    }
}

/// Selector table for the professional network's web client.
pub fn selector_for(signal: Signal) -> Selector {
    match signal {
        Signal::OutstandingRequest => css_text("button", r"^(Pending|Withdraw)\b"),
        Signal::ConnectAction => css_text("main button", r"^Connect$"),
        Signal::MoreActions => css_text("main button", r"^More$|More actions"),
        Signal::ConnectInMenu => {
            css_text("div[role='menuitem'], div[role='button'], span", r"^Connect$")
        }
        Signal::AlreadyConnected | Signal::MessageAction => {
            css_text("main button, main a", r"^Message$")
        }
        Signal::MessageLocked => css_text(
            "main button:has(svg[data-test-icon='lock-small']), main a:has(svg[data-test-icon='lock-small'])",
            r"^Message$",
        ),
        Signal::PremiumGate => css("button[aria-label*='Send InMail'], .premium-inmail-button"),
        Signal::ProfileName => css("main h1"),
        Signal::AddNote => css_text("div[role='dialog'] button", r"Add a note"),
        Signal::NoteField => css("div[role='dialog'] textarea"),
        Signal::SendInvite => css_text(
            "div[role='dialog'] button",
            r"^(Send|Send now|Send without a note)$",
        ),
        Signal::ChatComposer => css("div[role='textbox'][aria-label*='Write a message']"),
        Signal::ChatSend => css(".msg-form__send-button, .msg-form button[type='submit']"),
        Signal::PremiumUpsell => css_text(
            "div[role='dialog'], div.artdeco-modal",
            r"Message with Premium|Try Premium|Unlock InMail",
        ),
        Signal::DismissOverlay => {
            css("button[aria-label='Dismiss'], button[aria-label='Close'], button[aria-label*='Close your']")
        }
        Signal::SearchBox => {
            css("input.search-global-typeahead__input, input[placeholder*='Search']")
        }
        Signal::PeopleFilter => css_text("button", r"^People$"),
        Signal::NextPage => css("button[aria-label='Next']"),
        Signal::BlockingModal => css_text("button", r"^(Got it|Close)$"),
        Signal::AuthenticatedMarker => css("#global-nav"),
        Signal::LoginUsername => css("#username"),
        Signal::LoginPassword => css("#password"),
        Signal::LoginSubmit => css("button[type='submit'], .login__form_action_container button"),
        Signal::ChallengeMarker => css(
            "#input__email_verification_pin, #input__phone_verification_pin, form#email-pin-challenge, iframe[title*='captcha' i], #captcha-internal",
        ),
        Signal::CredentialRejected => css("#error-for-password, #error-for-username, .form__label--error"),
    }
}

type FilterTable = HashMap<Signal, Result<Regex, regex::Error>>;

static TEXT_FILTERS: OnceLock<FilterTable> = OnceLock::new();

/// Compiled text filter for `signal`, if its selector has one.
///
/// Filters are compiled once, on first use, for every signal.
pub fn text_filter(signal: Signal) -> anyhow::Result<Option<&'static Regex>> {
    let table = TEXT_FILTERS.get_or_init(|| {
        Signal::ALL
            .into_iter()
            .filter_map(|s| selector_for(s).text.map(|t| (s, Regex::new(t))))
            .collect()
    });
    match table.get(&signal) {
        None => Ok(None),
        Some(Ok(re)) => Ok(Some(re)),
        Some(Err(e)) => Err(anyhow::anyhow!("bad text filter for {signal}: {e}")),
    }
}
