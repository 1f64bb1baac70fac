//! Profile visit that tries to send a connection request.
//!
//! Cue order matters: an outstanding request is looked for before anything
//! else, and "already connected" only once the connect control is known to
//! be absent. A profile can show a message control while a request is still
//! pending, and reading that first would misfile the target for good.

use reach_config::TemplatesConfig;
use reach_drivers::humanize::cadence::TypingStyle;
use reach_drivers::humanize::pacing::UI_SETTLE;
use reach_drivers::{ActionSurface, ActuationResult, Actuator, Signal};
use reach_store::{LifecycleStatus, TargetUrl};
use tracing::{debug, info};

use super::{
    first_name, preview, truncate_note, CONTROL_TIMEOUT, DIALOG_SETTLE, GLANCE, PROFILE_READ,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteOutcome {
    Invited,
    Pending,
    AlreadyConnected,
    PremiumOnly,
    /// Nothing recognisable happened; the target stays retryable.
    Unresolved(&'static str),
}

impl InviteOutcome {
    /// The status to record, if any.
    pub fn status(&self) -> Option<LifecycleStatus> {
        match self {
            InviteOutcome::Invited => Some(LifecycleStatus::Invited),
            InviteOutcome::Pending => Some(LifecycleStatus::Pending),
            InviteOutcome::AlreadyConnected => Some(LifecycleStatus::AlreadyConnected),
            InviteOutcome::PremiumOnly => Some(LifecycleStatus::PremiumOnly),
            InviteOutcome::Unresolved(_) => None,
        }
    }
}

/// Open `url`, read it, and try to send an invitation with a personalised note.
pub async fn visit_and_invite<S: ActionSurface>(
    act: &mut Actuator<S>,
    url: &TargetUrl,
    note_template: &str,
) -> ActuationResult<InviteOutcome> {
    act.navigate(url.as_str()).await?;
    act.pause(PROFILE_READ).await?;
    act.read_page().await?;

    let outcome = decide(act, note_template).await?;
    info!(url = %url, outcome = ?outcome, "invite.outcome");
    Ok(outcome)
}

async fn decide<S: ActionSurface>(
    act: &mut Actuator<S>,
    note_template: &str,
) -> ActuationResult<InviteOutcome> {
    if act.probe(Signal::OutstandingRequest, GLANCE).await?.is_some() {
        return Ok(InviteOutcome::Pending);
    }

    if let Some(connect) = locate_connect(act).await? {
        let name = heading_first_name(act).await?;
        let note = truncate_note(&TemplatesConfig::render(note_template, &name));
        if !act.click(&connect).await? {
            return Ok(InviteOutcome::Unresolved("connect_not_clickable"));
        }
        act.pause(DIALOG_SETTLE).await?;
        return send_from_dialog(act, &note).await;
    }

    if act.probe(Signal::AlreadyConnected, GLANCE).await?.is_some() {
        return Ok(InviteOutcome::AlreadyConnected);
    }
    if act.probe(Signal::PremiumGate, GLANCE).await?.is_some() {
        return Ok(InviteOutcome::PremiumOnly);
    }
    Ok(InviteOutcome::Unresolved("no_connect_control"))
}

/// The connect control, shown directly or behind the overflow menu.
async fn locate_connect<S: ActionSurface>(
    act: &mut Actuator<S>,
) -> ActuationResult<Option<S::Element>> {
    if let Some(direct) = act.probe(Signal::ConnectAction, CONTROL_TIMEOUT).await? {
        debug!("invite.connect.direct");
        return Ok(Some(direct));
    }
    if !act.click_signal(Signal::MoreActions, CONTROL_TIMEOUT).await? {
        return Ok(None);
    }
    act.pause(DIALOG_SETTLE).await?;
    if let Some(item) = act.probe(Signal::ConnectInMenu, CONTROL_TIMEOUT).await? {
        debug!("invite.connect.menu");
        return Ok(Some(item));
    }
    // Close the menu again so it does not hide later cues.
    act.click_signal(Signal::DismissOverlay, GLANCE).await?;
    act.pause(UI_SETTLE).await?;
    Ok(None)
}

async fn heading_first_name<S: ActionSurface>(act: &mut Actuator<S>) -> ActuationResult<String> {
    let heading = match act.probe(Signal::ProfileName, GLANCE).await? {
        Some(el) => act.read_text(&el).await?,
        None => String::new(),
    };
    Ok(first_name(&heading))
}

async fn send_from_dialog<S: ActionSurface>(
    act: &mut Actuator<S>,
    note: &str,
) -> ActuationResult<InviteOutcome> {
    if !note.is_empty() && act.click_signal(Signal::AddNote, CONTROL_TIMEOUT).await? {
        act.pause(DIALOG_SETTLE).await?;
        if let Some(field) = act.probe(Signal::NoteField, CONTROL_TIMEOUT).await? {
            debug!(note = %preview(note), "invite.note");
            act.type_into(&field, note, TypingStyle::Natural).await?;
            act.pause(DIALOG_SETTLE).await?;
        }
    }

    if act.click_signal(Signal::SendInvite, CONTROL_TIMEOUT).await? {
        act.pause(UI_SETTLE).await?;
        Ok(InviteOutcome::Invited)
    } else {
        // Usually an email verification gate on the dialog.
        act.click_signal(Signal::DismissOverlay, GLANCE).await?;
        Ok(InviteOutcome::Unresolved("send_not_found"))
    }
}
