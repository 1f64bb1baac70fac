//! One invocation: gate, connect, sign in, do the mode's work, report.

use reach_common::{ReachError, RunMode};
use reach_config::ReachConfig;
use reach_drivers::reach_browser::driver::{DriverOptions, ReachDriver};
use reach_drivers::reach_browser::page::ReachPage;
use reach_drivers::{Actuator, HumanizeOptions};
use reach_social::guard::start_of_today;
use reach_social::{
    Credentials, Operation, Orchestrator, QuotaGuard, RunError, ScheduleGuard, SessionManager,
    SessionSettings,
};
use reach_store::TargetStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run(
    config: ReachConfig,
    dry_schedule: bool,
    cancel: CancellationToken,
) -> Result<(), ReachError> {
    let mode = config.mode;
    let schedule = ScheduleGuard::new(config.schedule.window()?);
    let verdict = schedule.check_now();

    if dry_schedule {
        let store = TargetStore::open(&config.storage.database_path).await?;
        info!(mode = %mode, verdict = %verdict, open = verdict.is_open(), "schedule.verdict");
        let quota = QuotaGuard::new(config.limits.clone());
        let day_start = start_of_today();
        for op in [Operation::Discovery, Operation::Invitation, Operation::Messaging] {
            let budget = quota.budget(&store, op, day_start).await?;
            info!(
                operation = %op,
                used = budget.used,
                cap = budget.cap,
                remaining = budget.remaining(),
                "schedule.budget"
            );
        }
        store.close().await;
        return Ok(());
    }

    if mode.is_scheduled() && !verdict.is_open() {
        info!(mode = %mode, verdict = %verdict, "schedule.closed");
        return Ok(());
    }

    let store = TargetStore::open(&config.storage.database_path).await?;
    let driver = match ReachDriver::connect(driver_options(&config)).await {
        Ok(d) => d,
        Err(e) => {
            store.close().await;
            return Err(ReachError::Driver(e));
        }
    };

    info!(
        platform = %driver.profile().platform,
        timezone = %driver.profile().timezone,
        "driver.profile"
    );
    let act = Actuator::new(driver.page(), humanize_options(&config), cancel);
    let outcome = work(act, store, &config, mode).await;

    if let Err(e) = driver.close().await {
        warn!(error = %e, "driver.close_failed");
    }
    outcome
}

async fn work(
    mut act: Actuator<ReachPage>,
    store: TargetStore,
    config: &ReachConfig,
    mode: RunMode,
) -> Result<(), ReachError> {
    let signed_in = async {
        let credentials = Credentials::from_account(&config.account)?;
        let mut session =
            SessionManager::new(SessionSettings::from_config(&config.session), credentials);
        session.establish(&mut act).await
    }
    .await;
    if let Err(e) = signed_in {
        store.close().await;
        return Err(e.into());
    }

    let mut orchestrator = Orchestrator::new(act, store, config);
    let result: Result<(), RunError> = async {
        orchestrator.run(mode).await?;
        orchestrator.report().await?.log();
        Ok(())
    }
    .await;

    let (_, store) = orchestrator.into_parts();
    store.close().await;
    result.map_err(ReachError::from)
}

fn driver_options(config: &ReachConfig) -> DriverOptions {
    DriverOptions {
        webdriver_url: config.browser.webdriver_url.clone(),
        headless: config.browser.headless,
        stealth: config.browser.stealth,
        debug_cursor: config.browser.debug_cursor,
        seed: config.humanize.seed,
    }
}

fn humanize_options(config: &ReachConfig) -> HumanizeOptions {
    let h = &config.humanize;
    HumanizeOptions {
        delay_factor: h.delay_factor,
        typo_probability: h.typo_probability,
        seed: h.seed,
        scroll_bursts: h.scroll_bursts_min..=h.scroll_bursts_max.max(h.scroll_bursts_min),
    }
}
