//! Loader for `reach.yaml` with environment overlays.
//!
//! Sources merge lowest to highest: serde defaults, YAML files (in the order
//! attached), inline YAML snippets, then `REACH_`-prefixed environment
//! variables where `__` separates nesting levels, e.g.
//! `REACH_LIMITS__DAILY_INVITATIONS=5`. Any string may carry `${VAR}`
//! placeholders; they are expanded from the process environment after the
//! merge, recursively up to a fixed depth.
//!
//! [`ReachConfig::load_validated`] is the entry point the binary uses: it
//! loads and then runs [`ReachConfig::validate`], so a malformed schedule or
//! missing credentials abort before any browsing starts.
use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Weekday};
use config::{Config, Environment, File, FileFormat};
use reach_common::observability::LogFormat;
use reach_common::{RunMode, StealthLevel};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// File name picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "reach.yaml";

/// Token replaced with the target's first name in message templates.
pub const FIRST_NAME_TOKEN: &str = "{firstName}";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for reach_common::ReachError {
    fn from(err: ConfigError) -> Self {
        reach_common::ReachError::Config(err.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachConfig {
    pub mode: RunMode,
    pub account: AccountConfig,
    pub search: SearchConfig,
    pub limits: LimitsConfig,
    pub schedule: ScheduleConfig,
    pub templates: TemplatesConfig,
    pub humanize: HumanizeConfig,
    pub browser: BrowserConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    /// How long `auth` mode keeps the browser open.
    pub inspect_minutes: u64,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub keyword: String,
    pub max_pages: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keyword: "Software Engineer".to_string(),
            max_pages: 3,
        }
    }
}

/// Daily caps per operation class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub daily_discoveries: u32,
    pub daily_invitations: u32,
    pub daily_messages: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            daily_discoveries: 50,
            daily_invitations: 10,
            daily_messages: 10,
        }
    }
}

/// Raw schedule window as written in YAML; see [`ScheduleConfig::window`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub start: String,
    pub end: String,
    pub weekdays: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start: "09:00".to_string(),
            end: "21:00".to_string(),
            weekdays: ["mon", "tue", "wed", "thu", "fri"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

/// A parsed, checked schedule window: inclusive start, exclusive end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub weekdays: Vec<Weekday>,
}

impl ScheduleConfig {
    /// Parse the `HH:MM` bounds and weekday names.
    ///
    /// ```
    /// use reach_config::ScheduleConfig;
    ///
    /// let window = ScheduleConfig::default().window().unwrap();
    /// assert_eq!(window.start.format("%H:%M").to_string(), "09:00");
    /// assert_eq!(window.weekdays.len(), 5);
    ///
    /// let broken = ScheduleConfig { start: "9am".into(), ..ScheduleConfig::default() };
    /// assert!(broken.window().is_err());
    /// ```
    pub fn window(&self) -> Result<ScheduleWindow, ConfigError> {
        let start = parse_clock("schedule.start", &self.start)?;
        let end = parse_clock("schedule.end", &self.end)?;
        if end <= start {
            return Err(ConfigError::Invalid(format!(
                "schedule.end ({}) must be later than schedule.start ({})",
                self.end, self.start
            )));
        }

        if self.weekdays.is_empty() {
            return Err(ConfigError::Invalid(
                "schedule.weekdays must name at least one day".into(),
            ));
        }
        let mut weekdays = Vec::with_capacity(self.weekdays.len());
        for name in &self.weekdays {
            let day = name
                .trim()
                .parse::<Weekday>()
                .map_err(|_| ConfigError::Invalid(format!("unknown weekday `{name}`")))?;
            if !weekdays.contains(&day) {
                weekdays.push(day);
            }
        }

        Ok(ScheduleWindow {
            start,
            end,
            weekdays,
        })
    }
}

fn parse_clock(field: &str, raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
        ConfigError::Invalid(format!("{field} must be HH:MM (24h), got `{raw}`"))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub connect_note: String,
    pub follow_up: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            connect_note: "Hi {firstName}, I noticed your profile and would love to connect!"
                .to_string(),
            follow_up: "Hi {firstName}, thanks for connecting! Great to meet you.".to_string(),
        }
    }
}

impl TemplatesConfig {
    /// Substitute every `{firstName}` token.
    ///
    /// ```
    /// use reach_config::TemplatesConfig;
    ///
    /// let t = TemplatesConfig::default();
    /// assert_eq!(
    ///     TemplatesConfig::render(&t.follow_up, "Ada"),
    ///     "Hi Ada, thanks for connecting! Great to meet you."
    /// );
    /// ```
    pub fn render(template: &str, first_name: &str) -> String {
        template.replace(FIRST_NAME_TOKEN, first_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizeConfig {
    /// Multiplier applied to every simulated pause; `0` disables waiting.
    pub delay_factor: f64,
    /// Per-character chance of a typo-and-correct sequence.
    pub typo_probability: f64,
    /// Fixed seed for every random source, for reproducible runs.
    pub seed: Option<u64>,
    pub scroll_bursts_min: u32,
    pub scroll_bursts_max: u32,
}

impl Default for HumanizeConfig {
    fn default() -> Self {
        Self {
            delay_factor: 1.0,
            typo_probability: 0.03,
            seed: None,
            scroll_bursts_min: 3,
            scroll_bursts_max: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub stealth: StealthLevel,
    /// Draw a visible cursor overlay that follows synthesized motion.
    pub debug_cursor: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            stealth: StealthLevel::Balanced,
            debug_cursor: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub bundle_path: PathBuf,
    /// Bundles captured longer ago than this are treated as absent.
    pub max_age_hours: u64,
    /// Inconclusive probes tolerated before falling through to manual login.
    pub probe_attempts: u32,
    /// Polls after submitting credentials before deciding the outcome.
    pub manual_login_polls: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bundle_path: default_data_dir().join("session.json"),
            max_age_hours: 168,
            probe_attempts: 15,
            manual_login_polls: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_data_dir().join("reach.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub filter: String,
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            filter: "info".to_string(),
            stderr: true,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reach")
}

impl ReachConfig {
    /// Load from `path` (or `reach.yaml` if present) plus the environment,
    /// then validate.
    pub fn load_validated(path: Option<&Path>) -> Result<Self, ConfigError> {
        let loader = match path {
            Some(p) => ReachConfigLoader::new().with_file(p),
            None => ReachConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
        };
        let cfg = loader.load()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations that must not reach the browser.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let email = self.account.email.as_deref().unwrap_or("").trim();
        let password = self.account.password.as_deref().unwrap_or("");
        if email.is_empty() || email.contains("${") {
            return Err(ConfigError::Invalid("account.email is required".into()));
        }
        if password.is_empty() || password.contains("${") {
            return Err(ConfigError::Invalid("account.password is required".into()));
        }

        self.schedule.window()?;

        if !(self.humanize.delay_factor >= 0.0 && self.humanize.delay_factor.is_finite()) {
            return Err(ConfigError::Invalid(
                "humanize.delay_factor must be a non-negative number".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.humanize.typo_probability) {
            return Err(ConfigError::Invalid(
                "humanize.typo_probability must lie within [0, 1]".into(),
            ));
        }
        if self.humanize.scroll_bursts_min == 0
            || self.humanize.scroll_bursts_min > self.humanize.scroll_bursts_max
        {
            return Err(ConfigError::Invalid(
                "humanize.scroll_bursts_min must be >= 1 and <= scroll_bursts_max".into(),
            ));
        }
        if self.search.max_pages == 0 {
            return Err(ConfigError::Invalid("search.max_pages must be >= 1".into()));
        }
        if self.search.keyword.trim().is_empty() {
            return Err(ConfigError::Invalid("search.keyword must not be empty".into()));
        }
        if self.session.probe_attempts == 0 {
            return Err(ConfigError::Invalid(
                "session.probe_attempts must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => break,
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate wiring.
pub struct ReachConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ReachConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachConfigLoader {
    /// Start with no file sources; defaults fill every section.
    ///
    /// ```
    /// use reach_config::ReachConfigLoader;
    ///
    /// let cfg = ReachConfigLoader::new()
    ///     .with_yaml_str("limits:\n  daily_invitations: 4")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.limits.daily_invitations, 4);
    /// assert_eq!(cfg.limits.daily_discoveries, 50);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and deserialize.
    ///
    /// ```
    /// use reach_config::ReachConfigLoader;
    ///
    /// unsafe { std::env::set_var("REACH_DOC_EMAIL", "ops@example.com"); }
    ///
    /// let cfg = ReachConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// account:
    ///   email: "${REACH_DOC_EMAIL}"
    ///   password: "hunter2"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(cfg.account.email.as_deref(), Some("ops@example.com"));
    /// cfg.validate().expect("credentials present");
    ///
    /// unsafe { std::env::remove_var("REACH_DOC_EMAIL"); }
    /// ```
    pub fn load(self) -> Result<ReachConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("REACH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: ReachConfig = serde_json::from_value(v)
            .map_err(|e| ConfigError::Load(config::ConfigError::Message(e.to_string())))?;
        Ok(typed)
    }
}
