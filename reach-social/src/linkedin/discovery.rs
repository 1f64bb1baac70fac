//! People search: typing the query, filtering, and harvesting result pages.

use std::time::Duration;

use reach_drivers::humanize::cadence::TypingStyle;
use reach_drivers::{ActionSurface, ActuationResult, Actuator, Signal};
use reach_store::TargetUrl;
use tracing::{debug, info, warn};

use super::{
    is_feed_url, profile_targets, CONTROL_TIMEOUT, DIALOG_SETTLE, FEED_URL, GLANCE,
    PROFILE_READ, RESULTS_SETTLE,
};

const SEARCH_BOX_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a people search for `keyword` from the feed.
///
/// Returns `Ok(false)` if the search box never appeared.
pub async fn open_search<S: ActionSurface>(
    act: &mut Actuator<S>,
    keyword: &str,
) -> ActuationResult<bool> {
    if !is_feed_url(&act.current_url().await?) {
        act.navigate(FEED_URL).await?;
    }
    act.pause(PROFILE_READ).await?;

    let Some(search_box) = act.probe(Signal::SearchBox, SEARCH_BOX_TIMEOUT).await? else {
        warn!("discovery.search_box.missing");
        return Ok(false);
    };
    act.type_into(&search_box, keyword, TypingStyle::Natural).await?;
    act.submit(&search_box).await?;
    act.pause(RESULTS_SETTLE).await?;

    if !act.current_url().await?.contains("/people/") {
        apply_people_filter(act).await?;
    }
    info!(%keyword, "discovery.search");
    Ok(true)
}

async fn apply_people_filter<S: ActionSurface>(act: &mut Actuator<S>) -> ActuationResult<()> {
    let Some(filter) = act.probe(Signal::PeopleFilter, CONTROL_TIMEOUT).await? else {
        debug!("discovery.people_filter.missing");
        return Ok(());
    };
    let pressed = act.read_attribute(&filter, "aria-pressed").await?;
    if pressed.as_deref() != Some("true") && act.click(&filter).await? {
        act.pause(RESULTS_SETTLE).await?;
    }
    Ok(())
}

/// Read the current results page and return its profile targets.
pub async fn harvest_page<S: ActionSurface>(act: &mut Actuator<S>) -> ActuationResult<Vec<TargetUrl>> {
    if act.click_signal(Signal::BlockingModal, GLANCE).await? {
        debug!("discovery.modal.dismissed");
        act.pause(DIALOG_SETTLE).await?;
    }
    act.read_page().await?;

    let links = act.collect_links().await?;
    let targets = profile_targets(links.iter().map(String::as_str));
    debug!(links = links.len(), profiles = targets.len(), "discovery.harvest");
    Ok(targets)
}

/// Follow the next-page control. `Ok(false)` at the end of the results.
pub async fn next_page<S: ActionSurface>(act: &mut Actuator<S>) -> ActuationResult<bool> {
    let Some(next) = act.probe(Signal::NextPage, CONTROL_TIMEOUT).await? else {
        return Ok(false);
    };
    if !act.click(&next).await? {
        debug!("discovery.next.hidden");
        return Ok(false);
    }
    act.pause(RESULTS_SETTLE).await?;
    Ok(true)
}
