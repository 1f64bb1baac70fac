use std::collections::HashMap;

use anyhow::{Context, Result};
use fantoccini::{Client, ClientBuilder};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reach_common::StealthLevel;
use serde_json::json;
use tracing::info;
use webdriver::capabilities::Capabilities;

use super::fingerprint::{DesktopProfile, ProfilePicker};
use super::page::ReachPage;
use super::stealth::build_stealth_arguments;

/// How to launch the browser session.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub webdriver_url: String,
    pub headless: bool,
    pub stealth: StealthLevel,
    pub debug_cursor: bool,
    /// Seed for fingerprint selection.
    pub seed: Option<u64>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            stealth: StealthLevel::Balanced,
            debug_cursor: false,
            seed: None,
        }
    }
}

/// A `fantoccini` WebDriver session with a fixed fingerprint.
pub struct ReachDriver {
    client: Client,
    profile: DesktopProfile,
    options: DriverOptions,
}

impl ReachDriver {
    /// Connect to a running chromedriver and open a stealth-configured session.
    pub async fn connect(options: DriverOptions) -> Result<Self> {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let profile = ProfilePicker::new().session_profile(&mut rng).clone();

        let args = build_stealth_arguments(options.stealth, &profile, options.headless);
        let mut chrome_opts = HashMap::new();
        chrome_opts.insert("args".to_string(), json!(args));
        chrome_opts.insert(
            "excludeSwitches".to_string(),
            json!(["enable-automation"]),
        );

        let mut caps = Capabilities::new();
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&options.webdriver_url)
            .await
            .with_context(|| format!("cannot reach webdriver at {}", options.webdriver_url))?;

        info!(
            webdriver = %options.webdriver_url,
            headless = options.headless,
            viewport = ?profile.viewport,
            "driver.connected"
        );

        Ok(Self {
            client,
            profile,
            options,
        })
    }

    pub fn profile(&self) -> &DesktopProfile {
        &self.profile
    }

    /// A page handle bound to this session.
    pub fn page(&self) -> ReachPage {
        ReachPage::new(
            self.client.clone(),
            self.options.stealth,
            self.profile.clone(),
            self.options.debug_cursor,
        )
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
