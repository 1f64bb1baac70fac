//! Profile visit that checks for acceptance and sends the follow-up.

use reach_config::TemplatesConfig;
use reach_drivers::humanize::cadence::TypingStyle;
use reach_drivers::humanize::pacing::UI_SETTLE;
use reach_drivers::{ActionSurface, ActuationResult, Actuator, Signal};
use reach_store::{LifecycleStatus, TargetUrl};
use tracing::{debug, info};

use super::{first_name, preview, CONTROL_TIMEOUT, DIALOG_SETTLE, GLANCE, PANEL_TIMEOUT, PROFILE_READ};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Messaged,
    /// Not accepted yet; parked until the next pass.
    Pending,
    PremiumOnly,
    Unresolved(&'static str),
}

impl MessageOutcome {
    pub fn status(&self) -> Option<LifecycleStatus> {
        match self {
            MessageOutcome::Messaged => Some(LifecycleStatus::Messaged),
            MessageOutcome::Pending => Some(LifecycleStatus::Pending),
            MessageOutcome::PremiumOnly => Some(LifecycleStatus::PremiumOnly),
            MessageOutcome::Unresolved(_) => None,
        }
    }
}

/// Open `url` and, if the connection is live, send the rendered follow-up.
pub async fn visit_and_message<S: ActionSurface>(
    act: &mut Actuator<S>,
    url: &TargetUrl,
    template: &str,
) -> ActuationResult<MessageOutcome> {
    act.navigate(url.as_str()).await?;
    act.pause(PROFILE_READ).await?;

    let outcome = decide(act, template).await?;
    info!(url = %url, outcome = ?outcome, "message.outcome");
    Ok(outcome)
}

async fn decide<S: ActionSurface>(
    act: &mut Actuator<S>,
    template: &str,
) -> ActuationResult<MessageOutcome> {
    let Some(button) = act.probe(Signal::MessageAction, CONTROL_TIMEOUT).await? else {
        if act.probe(Signal::OutstandingRequest, GLANCE).await?.is_some() {
            return Ok(MessageOutcome::Pending);
        }
        return Ok(MessageOutcome::Unresolved("not_connected"));
    };

    if act.probe(Signal::MessageLocked, GLANCE).await?.is_some() {
        return Ok(MessageOutcome::PremiumOnly);
    }

    // Read the name before the chat overlay can cover the heading.
    let heading = match act.probe(Signal::ProfileName, GLANCE).await? {
        Some(el) => act.read_text(&el).await?,
        None => String::new(),
    };

    if !act.click(&button).await? {
        return Ok(MessageOutcome::Unresolved("message_not_clickable"));
    }
    act.pause(DIALOG_SETTLE).await?;

    if let Some(composer) = act.probe(Signal::ChatComposer, PANEL_TIMEOUT).await? {
        let text = TemplatesConfig::render(template, &first_name(&heading));
        debug!(text = %preview(&text), "message.compose");
        act.type_into(&composer, &text, TypingStyle::Natural).await?;
        act.pause(DIALOG_SETTLE).await?;

        let sent = act.click_signal(Signal::ChatSend, CONTROL_TIMEOUT).await?;
        if sent {
            act.pause(UI_SETTLE).await?;
        }
        act.click_signal(Signal::DismissOverlay, GLANCE).await?;
        return Ok(if sent {
            MessageOutcome::Messaged
        } else {
            MessageOutcome::Unresolved("send_not_found")
        });
    }

    if act.probe(Signal::PremiumUpsell, GLANCE).await?.is_some() {
        act.click_signal(Signal::DismissOverlay, GLANCE).await?;
        return Ok(MessageOutcome::Pending);
    }
    Ok(MessageOutcome::Unresolved("chat_did_not_open"))
}
