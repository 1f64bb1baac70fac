use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// User agent, viewport and locale presented for one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub platform: String,
    pub languages: Vec<String>,
    pub timezone: String,
}

const USER_AGENTS: [(&str, &str); 5] = [
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        "Win32",
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        "Win32",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        "MacIntel",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
        "MacIntel",
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        "Linux x86_64",
    ),
];

const VIEWPORTS: [(u32, u32); 5] = [
    (1920, 1080),
    (1536, 864),
    (1440, 900),
    (1366, 768),
    (1280, 800),
];

const TIMEZONES: [&str; 4] = [
    "America/New_York",
    "America/Chicago",
    "America/Los_Angeles",
    "Europe/London",
];

/// Picks one plausible desktop profile per session.
#[derive(Debug, Clone, Default)]
pub struct ProfilePicker {
    current: Option<DesktopProfile>,
}

impl ProfilePicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The profile for this session, chosen on first use and then fixed.
    pub fn session_profile<R: Rng>(&mut self, rng: &mut R) -> &DesktopProfile {
        self.current.get_or_insert_with(|| random_profile(rng))
    }
}

fn random_profile<R: Rng>(rng: &mut R) -> DesktopProfile {
    let (user_agent, platform) = USER_AGENTS.choose(rng).copied().unwrap_or(USER_AGENTS[0]);
    let viewport = VIEWPORTS.choose(rng).copied().unwrap_or(VIEWPORTS[0]);
    let timezone = TIMEZONES.choose(rng).copied().unwrap_or(TIMEZONES[0]);
    DesktopProfile {
        user_agent: user_agent.to_string(),
        viewport,
        platform: platform.to_string(),
        languages: vec!["en-US".to_string(), "en".to_string()],
        timezone: timezone.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn profile_is_sticky_for_the_session() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut picker = ProfilePicker::new();
        let first = picker.session_profile(&mut rng).clone();
        for _ in 0..10 {
            assert_eq!(picker.session_profile(&mut rng), &first);
        }
    }

    #[test]
    fn platform_matches_user_agent() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let p = random_profile(&mut rng);
            match p.platform.as_str() {
                "Win32" => assert!(p.user_agent.contains("Windows")),
                "MacIntel" => assert!(p.user_agent.contains("Macintosh")),
                _ => assert!(p.user_agent.contains("Linux")),
            }
        }
    }
}
