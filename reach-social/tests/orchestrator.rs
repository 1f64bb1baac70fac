mod common;

use chrono::{Duration, Utc};
use common::*;
use reach_common::RunMode;
use reach_drivers::Signal;
use reach_social::linkedin::FEED_URL;
use reach_social::Orchestrator;
use reach_store::{LifecycleStatus, TargetStore};
use tokio_util::sync::CancellationToken;

fn orchestrator(
    surface: &ScriptedSurface,
    store: &TargetStore,
    config: &reach_config::ReachConfig,
) -> Orchestrator<ScriptedSurface> {
    Orchestrator::new(instant_actuator(surface, 7), store.clone(), config)
        .with_day_start(Utc::now() - Duration::hours(1))
}

async fn status_of(store: &TargetStore, slug: &str) -> LifecycleStatus {
    store.get(&profile(slug)).await.unwrap().unwrap().status
}

fn connectable(name: &str) -> Page {
    Page::new()
        .text(Signal::ProfileName, name)
        .show(&[Signal::ConnectAction])
        .click_reveals(Signal::ConnectAction, &[Signal::AddNote, Signal::SendInvite])
        .click_reveals(Signal::AddNote, &[Signal::NoteField])
}

#[tokio::test]
async fn outstanding_request_beats_already_connected() {
    init_test_tracing();
    let store = store_with_found(&["ada"]).await;
    let surface = ScriptedSurface::new();
    surface.page(
        profile("ada").as_str(),
        Page::new().show(&[
            Signal::OutstandingRequest,
            Signal::AlreadyConnected,
            Signal::ConnectAction,
        ]),
    );

    let tally = orchestrator(&surface, &store, &test_config())
        .invite()
        .await
        .unwrap();

    assert_eq!(status_of(&store, "ada").await, LifecycleStatus::Pending);
    assert_eq!(tally.parked, 1);
    assert!(!surface.clicked(Signal::ConnectAction));
}

#[tokio::test]
async fn invitation_carries_a_personalised_note() {
    init_test_tracing();
    let store = store_with_found(&["grace"]).await;
    let surface = ScriptedSurface::new();
    surface.page(profile("grace").as_str(), connectable("Grace Hopper"));

    let tally = orchestrator(&surface, &store, &test_config())
        .invite()
        .await
        .unwrap();

    assert_eq!(tally.succeeded, 1);
    assert_eq!(surface.typed(Signal::NoteField), "Hi Grace, let's connect.");
    assert!(surface.clicked(Signal::SendInvite));
    assert_eq!(status_of(&store, "grace").await, LifecycleStatus::Invited);
}

#[tokio::test]
async fn connect_is_found_behind_the_overflow_menu() {
    let store = store_with_found(&["linus"]).await;
    let surface = ScriptedSurface::new();
    surface.page(
        profile("linus").as_str(),
        Page::new()
            .show(&[Signal::MoreActions])
            .click_reveals(Signal::MoreActions, &[Signal::ConnectInMenu])
            .click_reveals(Signal::ConnectInMenu, &[Signal::SendInvite]),
    );

    orchestrator(&surface, &store, &test_config())
        .invite()
        .await
        .unwrap();

    assert!(surface.clicked(Signal::ConnectInMenu));
    assert_eq!(status_of(&store, "linus").await, LifecycleStatus::Invited);
}

#[tokio::test]
async fn connected_only_when_connect_is_absent() {
    let store = store_with_found(&["ken", "barbara"]).await;
    let surface = ScriptedSurface::new();
    surface
        .page(
            profile("ken").as_str(),
            Page::new().show(&[Signal::AlreadyConnected]),
        )
        .page(
            profile("barbara").as_str(),
            Page::new().show(&[Signal::PremiumGate]),
        );

    let tally = orchestrator(&surface, &store, &test_config())
        .invite()
        .await
        .unwrap();

    assert_eq!(status_of(&store, "ken").await, LifecycleStatus::AlreadyConnected);
    assert_eq!(status_of(&store, "barbara").await, LifecycleStatus::PremiumOnly);
    assert_eq!(tally.parked, 2);
    assert_eq!(tally.succeeded, 0);
}

#[tokio::test]
async fn unrecognised_profile_stays_retryable() {
    let store = store_with_found(&["mystery"]).await;
    let surface = ScriptedSurface::new();
    surface.page(profile("mystery").as_str(), Page::new());

    let tally = orchestrator(&surface, &store, &test_config())
        .invite()
        .await
        .unwrap();

    assert_eq!(tally.failed, 1);
    assert_eq!(status_of(&store, "mystery").await, LifecycleStatus::Found);
}

#[tokio::test]
async fn missing_send_button_is_not_an_invitation() {
    let store = store_with_found(&["alan"]).await;
    let surface = ScriptedSurface::new();
    surface.page(
        profile("alan").as_str(),
        Page::new().show(&[Signal::ConnectAction]),
    );

    let tally = orchestrator(&surface, &store, &test_config())
        .invite()
        .await
        .unwrap();

    assert_eq!(tally.failed, 1);
    assert_eq!(status_of(&store, "alan").await, LifecycleStatus::Found);
}

#[tokio::test]
async fn exhausted_quota_skips_the_stage() {
    init_test_tracing();
    let store = store_with_found(&["a", "b", "c", "d", "e"]).await;
    store
        .update_status(&profile("a"), LifecycleStatus::Invited)
        .await
        .unwrap();
    store
        .update_status(&profile("b"), LifecycleStatus::Invited)
        .await
        .unwrap();

    let surface = ScriptedSurface::new();
    for slug in ["c", "d", "e"] {
        surface.page(profile(slug).as_str(), connectable("Someone"));
    }
    let mut config = test_config();
    config.limits.daily_invitations = 2;

    let tally = orchestrator(&surface, &store, &config)
        .invite()
        .await
        .unwrap();

    assert!(tally.skipped);
    assert!(surface.navigations().is_empty());
    assert_eq!(store.count_by_status(LifecycleStatus::Found).await.unwrap(), 3);
}

#[tokio::test]
async fn quota_is_charged_as_the_run_goes() {
    let store = store_with_found(&["first", "second", "third"]).await;
    let surface = ScriptedSurface::new();
    for slug in ["first", "second", "third"] {
        surface.page(profile(slug).as_str(), connectable("Someone"));
    }
    let mut config = test_config();
    config.limits.daily_invitations = 1;

    let tally = orchestrator(&surface, &store, &config)
        .invite()
        .await
        .unwrap();

    assert_eq!(tally.succeeded, 1);
    assert_eq!(status_of(&store, "first").await, LifecycleStatus::Invited);
    assert_eq!(status_of(&store, "second").await, LifecycleStatus::Found);
    assert_eq!(surface.navigations().len(), 1);
}

#[tokio::test]
async fn accepted_connection_gets_the_follow_up() {
    let store = store_with_found(&["ada"]).await;
    store
        .update_status(&profile("ada"), LifecycleStatus::Invited)
        .await
        .unwrap();
    let surface = ScriptedSurface::new();
    surface.page(
        profile("ada").as_str(),
        Page::new()
            .text(Signal::ProfileName, "Ada Lovelace")
            .show(&[Signal::MessageAction])
            .click_reveals(Signal::MessageAction, &[Signal::ChatComposer, Signal::ChatSend]),
    );

    let tally = orchestrator(&surface, &store, &test_config())
        .message()
        .await
        .unwrap();

    assert_eq!(tally.succeeded, 1);
    assert_eq!(surface.typed(Signal::ChatComposer), "Thanks Ada!");
    assert_eq!(status_of(&store, "ada").await, LifecycleStatus::Messaged);
}

#[tokio::test]
async fn messaging_parks_locks_and_upsells() {
    let store = store_with_found(&["waiting", "locked", "upsell", "stranger"]).await;
    for slug in ["waiting", "locked", "upsell", "stranger"] {
        store
            .update_status(&profile(slug), LifecycleStatus::Invited)
            .await
            .unwrap();
    }
    let surface = ScriptedSurface::new();
    surface
        .page(
            profile("waiting").as_str(),
            Page::new().show(&[Signal::OutstandingRequest]),
        )
        .page(
            profile("locked").as_str(),
            Page::new().show(&[Signal::MessageAction, Signal::MessageLocked]),
        )
        .page(
            profile("upsell").as_str(),
            Page::new()
                .show(&[Signal::MessageAction])
                .click_reveals(
                    Signal::MessageAction,
                    &[Signal::PremiumUpsell, Signal::DismissOverlay],
                ),
        )
        .page(profile("stranger").as_str(), Page::new());

    let tally = orchestrator(&surface, &store, &test_config())
        .message()
        .await
        .unwrap();

    assert_eq!(status_of(&store, "waiting").await, LifecycleStatus::Pending);
    assert_eq!(status_of(&store, "locked").await, LifecycleStatus::PremiumOnly);
    assert_eq!(status_of(&store, "upsell").await, LifecycleStatus::Pending);
    assert_eq!(status_of(&store, "stranger").await, LifecycleStatus::Invited);
    assert!(surface.clicked(Signal::DismissOverlay));
    assert_eq!(tally.parked, 3);
    assert_eq!(tally.failed, 1);
}

#[tokio::test]
async fn rechecked_pending_target_moves_to_the_back() {
    let store = store_with_found(&["slow", "fresh"]).await;
    store
        .update_status(&profile("slow"), LifecycleStatus::Pending)
        .await
        .unwrap();
    store
        .update_status(&profile("fresh"), LifecycleStatus::Invited)
        .await
        .unwrap();
    let before = store.get(&profile("slow")).await.unwrap().unwrap().updated_at;

    let surface = ScriptedSurface::new();
    surface.page(
        profile("slow").as_str(),
        Page::new().show(&[Signal::OutstandingRequest]),
    );
    let mut config = test_config();
    config.limits.daily_messages = 1;

    orchestrator(&surface, &store, &config)
        .message()
        .await
        .unwrap();

    let after = store.get(&profile("slow")).await.unwrap().unwrap();
    assert_eq!(after.status, LifecycleStatus::Pending);
    assert!(after.updated_at >= before);
    assert_eq!(surface.navigations(), vec![profile("slow").to_string()]);
}

#[tokio::test]
async fn discovery_walks_result_pages() {
    init_test_tracing();
    let store = TargetStore::in_memory().await.unwrap();
    store.insert_if_absent(&profile("known")).await.unwrap();

    let results = "https://www.linkedin.com/search/results/people/?keywords=rust";
    let page_two = "https://www.linkedin.com/search/results/people/?keywords=rust&page=2";
    let surface = ScriptedSurface::new();
    surface
        .page(
            FEED_URL,
            Page::new()
                .show(&[Signal::SearchBox])
                .enter_goes_to(Signal::SearchBox, results),
        )
        .page(
            results,
            Page::new()
                .show(&[Signal::NextPage, Signal::BlockingModal])
                .links(&[
                    "https://www.linkedin.com/in/ada/?miniProfileUrn=x",
                    "https://www.linkedin.com/in/known/",
                    "https://www.linkedin.com/company/acme/",
                    "https://www.linkedin.com/in/ACoAAB/minis/",
                ])
                .click_goes_to(Signal::NextPage, page_two),
        )
        .page(
            page_two,
            Page::new().links(&[
                "https://www.linkedin.com/in/grace",
                "https://www.linkedin.com/in/ada",
            ]),
        );

    let tally = orchestrator(&surface, &store, &test_config())
        .discover()
        .await
        .unwrap();

    assert_eq!(surface.typed(Signal::SearchBox), "rust");
    assert!(surface.clicked(Signal::BlockingModal));
    assert_eq!(tally.visited, 2);
    assert_eq!(tally.succeeded, 2);
    assert_eq!(tally.duplicates, 2);
    assert!(store.exists(&profile("grace")).await.unwrap());
    assert_eq!(store.count_by_status(LifecycleStatus::Found).await.unwrap(), 3);
}

#[tokio::test]
async fn discovery_stops_at_the_cap() {
    let store = TargetStore::in_memory().await.unwrap();
    let results = "https://www.linkedin.com/search/results/people/?keywords=rust";
    let surface = ScriptedSurface::new();
    surface
        .page(
            FEED_URL,
            Page::new()
                .show(&[Signal::SearchBox])
                .enter_goes_to(Signal::SearchBox, results),
        )
        .page(
            results,
            Page::new().show(&[Signal::NextPage]).links(&[
                "https://www.linkedin.com/in/one",
                "https://www.linkedin.com/in/two",
                "https://www.linkedin.com/in/three",
            ]),
        );
    let mut config = test_config();
    config.limits.daily_discoveries = 2;

    let tally = orchestrator(&surface, &store, &config)
        .discover()
        .await
        .unwrap();

    assert_eq!(tally.succeeded, 2);
    assert!(!surface.clicked(Signal::NextPage));
    assert_eq!(store.stats().await.unwrap().total, 2);
}

#[tokio::test]
async fn missing_search_box_is_a_failure_not_an_error() {
    let store = TargetStore::in_memory().await.unwrap();
    let surface = ScriptedSurface::new();
    surface.page(FEED_URL, Page::new());

    let tally = orchestrator(&surface, &store, &test_config())
        .discover()
        .await
        .unwrap();

    assert_eq!(tally.failed, 1);
}

#[tokio::test]
async fn demo_runs_discovery_then_invitation() {
    let store = TargetStore::in_memory().await.unwrap();
    let results = "https://www.linkedin.com/search/results/people/?keywords=rust";
    let surface = ScriptedSurface::new();
    surface
        .page(
            FEED_URL,
            Page::new()
                .show(&[Signal::SearchBox])
                .enter_goes_to(Signal::SearchBox, results),
        )
        .page(
            results,
            Page::new().links(&["https://www.linkedin.com/in/grace"]),
        )
        .page(profile("grace").as_str(), connectable("Grace Hopper"));

    let tally = orchestrator(&surface, &store, &test_config())
        .run(RunMode::Demo)
        .await
        .unwrap();

    assert_eq!(tally.discovery.unwrap().succeeded, 1);
    assert_eq!(tally.invitation.unwrap().succeeded, 1);
    assert!(tally.messaging.is_none());
    assert_eq!(status_of(&store, "grace").await, LifecycleStatus::Invited);
}

#[tokio::test]
async fn report_counts_today_against_caps() {
    let store = store_with_found(&["a", "b"]).await;
    store
        .update_status(&profile("a"), LifecycleStatus::Invited)
        .await
        .unwrap();
    let surface = ScriptedSurface::new();

    let report = orchestrator(&surface, &store, &test_config())
        .report()
        .await
        .unwrap();

    assert_eq!(report.stats.total, 2);
    assert_eq!(report.today[0].used, 2);
    assert_eq!(report.today[1].used, 1);
    assert_eq!(report.today[2].used, 0);
}

#[tokio::test]
async fn cancellation_interrupts_the_run() {
    let store = store_with_found(&["ada"]).await;
    let surface = ScriptedSurface::new();
    surface.page(profile("ada").as_str(), connectable("Ada"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = Orchestrator::new(
        instant_actuator_with(&surface, 1, cancel),
        store.clone(),
        &test_config(),
    )
    .run(RunMode::Invitation)
    .await
    .unwrap_err();

    assert!(err.is_interrupted());
    assert_eq!(status_of(&store, "ada").await, LifecycleStatus::Found);
}
