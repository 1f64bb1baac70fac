use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::StoreError;

/// Canonical form of a target's address.
///
/// Canonicalisation forces `https`, lowercases the whole address, drops the
/// query string and fragment, and strips trailing slashes, so every spelling
/// of one profile maps to one record.
///
/// ```
/// use reach_store::TargetUrl;
///
/// let a: TargetUrl = "https://www.Example.com/in/Ada-Lovelace/?trk=search".parse().unwrap();
/// let b: TargetUrl = "http://www.example.com/in/ada-lovelace#about".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "https://www.example.com/in/ada-lovelace");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetUrl(String);

impl TargetUrl {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let parsed =
            Url::parse(raw.trim()).map_err(|e| StoreError::InvalidUrl(format!("{raw}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StoreError::InvalidUrl(format!("{raw}: unsupported scheme")));
        }
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| StoreError::InvalidUrl(format!("{raw}: missing host")))?;

        let port = parsed
            .port()
            .filter(|p| *p != 80 && *p != 443)
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        let path = parsed.path().trim_end_matches('/');

        Ok(Self(
            format!("https://{host}{port}{path}").to_lowercase(),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TargetUrl {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TargetUrl {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TargetUrl> for String {
    fn from(value: TargetUrl) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_and_case_collapse() {
        let a = TargetUrl::parse("https://example.com/in/jdoe///").unwrap();
        let b = TargetUrl::parse("HTTPS://EXAMPLE.COM/IN/JDOE").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://example.com/in/jdoe");
    }

    #[test]
    fn root_has_no_trailing_slash() {
        let u = TargetUrl::parse("https://example.com/").unwrap();
        assert_eq!(u.as_str(), "https://example.com");
    }

    #[test]
    fn non_default_ports_are_kept() {
        let u = TargetUrl::parse("http://localhost:8080/in/x/").unwrap();
        assert_eq!(u.as_str(), "https://localhost:8080/in/x");
    }

    #[test]
    fn rejects_non_web_urls() {
        assert!(TargetUrl::parse("mailto:ada@example.com").is_err());
        assert!(TargetUrl::parse("not a url").is_err());
        assert!(TargetUrl::parse("file:///etc/passwd").is_err());
    }
}
