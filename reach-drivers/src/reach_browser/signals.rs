use serde::{Deserialize, Serialize};

/// An abstract UI cue the automation looks for.
///
/// Callers decide which signal to look for and in what order; how a signal
/// maps onto the DOM is private to each [`ActionSurface`](super::surface::ActionSurface)
/// implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    // Profile page
    /// A connection request to this profile is already outstanding.
    OutstandingRequest,
    /// The primary "connect" control, shown directly on the profile.
    ConnectAction,
    /// The overflow menu that may hide the connect control.
    MoreActions,
    /// The connect entry inside the overflow menu.
    ConnectInMenu,
    /// The profile already belongs to the network.
    AlreadyConnected,
    /// Connecting requires a paid messaging tier.
    PremiumGate,
    /// The profile's display name heading.
    ProfileName,

    // Invitation dialog
    AddNote,
    NoteField,
    SendInvite,

    // Messaging
    MessageAction,
    /// The message control is present but locked behind a paid tier.
    MessageLocked,
    ChatComposer,
    ChatSend,
    PremiumUpsell,
    DismissOverlay,

    // Search
    SearchBox,
    PeopleFilter,
    NextPage,
    BlockingModal,

    // Session
    AuthenticatedMarker,
    LoginUsername,
    LoginPassword,
    LoginSubmit,
    ChallengeMarker,
    CredentialRejected,
}

impl Signal {
    pub const ALL: [Signal; 26] = [
        Signal::OutstandingRequest,
        Signal::ConnectAction,
        Signal::MoreActions,
        Signal::ConnectInMenu,
        Signal::AlreadyConnected,
        Signal::PremiumGate,
        Signal::ProfileName,
        Signal::AddNote,
        Signal::NoteField,
        Signal::SendInvite,
        Signal::MessageAction,
        Signal::MessageLocked,
        Signal::ChatComposer,
        Signal::ChatSend,
        Signal::PremiumUpsell,
        Signal::DismissOverlay,
        Signal::SearchBox,
        Signal::PeopleFilter,
        Signal::NextPage,
        Signal::BlockingModal,
        Signal::AuthenticatedMarker,
        Signal::LoginUsername,
        Signal::LoginPassword,
        Signal::LoginSubmit,
        Signal::ChallengeMarker,
        Signal::CredentialRejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::OutstandingRequest => "outstanding_request",
            Signal::ConnectAction => "connect_action",
            Signal::MoreActions => "more_actions",
            Signal::ConnectInMenu => "connect_in_menu",
            Signal::AlreadyConnected => "already_connected",
            Signal::PremiumGate => "premium_gate",
            Signal::ProfileName => "profile_name",
            Signal::AddNote => "add_note",
            Signal::NoteField => "note_field",
            Signal::SendInvite => "send_invite",
            Signal::MessageAction => "message_action",
            Signal::MessageLocked => "message_locked",
            Signal::ChatComposer => "chat_composer",
            Signal::ChatSend => "chat_send",
            Signal::PremiumUpsell => "premium_upsell",
            Signal::DismissOverlay => "dismiss_overlay",
            Signal::SearchBox => "search_box",
            Signal::PeopleFilter => "people_filter",
            Signal::NextPage => "next_page",
            Signal::BlockingModal => "blocking_modal",
            Signal::AuthenticatedMarker => "authenticated_marker",
            Signal::LoginUsername => "login_username",
            Signal::LoginPassword => "login_password",
            Signal::LoginSubmit => "login_submit",
            Signal::ChallengeMarker => "challenge_marker",
            Signal::CredentialRejected => "credential_rejected",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
