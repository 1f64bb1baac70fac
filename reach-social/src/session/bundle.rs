//! On-disk credential bundle.
//!
//! A bundle is loaded whole or not at all: anything unreadable, from another
//! format version, too old, empty, or fully expired is removed from disk and
//! reported as discarded so the caller falls back to a fresh login.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use reach_drivers::SessionCookie;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub version: u32,
    pub captured_at: DateTime<Utc>,
    pub cookies: Vec<SessionCookie>,
}

/// Why a bundle on disk was not used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    Corrupt(String),
    Version(u32),
    Stale,
    Empty,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleLoad {
    Loaded(CredentialBundle),
    Missing,
    Discarded(DiscardReason),
}

impl CredentialBundle {
    pub fn capture(cookies: Vec<SessionCookie>, at: DateTime<Utc>) -> Self {
        Self {
            version: BUNDLE_VERSION,
            captured_at: at,
            cookies,
        }
    }

    /// Whether this bundle is still worth applying at `now`.
    pub fn check(&self, now: DateTime<Utc>, max_age: Duration) -> Result<(), DiscardReason> {
        if self.version != BUNDLE_VERSION {
            return Err(DiscardReason::Version(self.version));
        }
        if now - self.captured_at > max_age {
            return Err(DiscardReason::Stale);
        }
        if self.cookies.is_empty() {
            return Err(DiscardReason::Empty);
        }
        let unix = now.timestamp();
        if self.cookies.iter().all(|c| c.is_expired_at(unix)) {
            return Err(DiscardReason::Expired);
        }
        Ok(())
    }

    /// Read the bundle at `path`, removing it if it cannot be used.
    pub fn load(path: &Path, now: DateTime<Utc>, max_age: Duration) -> BundleLoad {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return BundleLoad::Missing,
            Err(e) => return discard(path, DiscardReason::Corrupt(e.to_string())),
        };
        let bundle: CredentialBundle = match serde_json::from_slice(&raw) {
            Ok(b) => b,
            Err(e) => return discard(path, DiscardReason::Corrupt(e.to_string())),
        };
        match bundle.check(now, max_age) {
            Ok(()) => {
                debug!(
                    path = %path.display(),
                    cookies = bundle.cookies.len(),
                    "session.bundle.loaded"
                );
                BundleLoad::Loaded(bundle)
            }
            Err(reason) => discard(path, reason),
        }
    }

    /// Atomically replace the file at `path` with this bundle.
    ///
    /// The document is written to a sibling temp file, synced, restricted to
    /// the owner, and renamed over the old bundle.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let json = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(path).map_err(|e| e.error)?;
        info!(
            path = %path.display(),
            cookies = self.cookies.len(),
            "session.bundle.saved"
        );
        Ok(())
    }
}

fn discard(path: &Path, reason: DiscardReason) -> BundleLoad {
    warn!(path = %path.display(), reason = ?reason, "session.bundle.discarded");
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "session.bundle.remove_failed");
        }
    }
    BundleLoad::Discarded(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str, expires: Option<i64>) -> SessionCookie {
        SessionCookie {
            name: name.into(),
            value: "v".into(),
            domain: Some("example.com".into()),
            path: Some("/".into()),
            secure: true,
            http_only: true,
            expires,
        }
    }

    fn week() -> Duration {
        Duration::hours(168)
    }

    #[test]
    fn saved_bundle_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let now = Utc::now();
        let bundle = CredentialBundle::capture(vec![cookie("li_at", None)], now);

        bundle.save(&path).unwrap();

        assert_eq!(CredentialBundle::load(&path, now, week()), BundleLoad::Loaded(bundle));
    }

    #[cfg(unix)]
    #[test]
    fn saved_bundle_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        CredentialBundle::capture(vec![cookie("li_at", None)], Utc::now())
            .save(&path)
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn save_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let now = Utc::now();
        CredentialBundle::capture(vec![cookie("old", None)], now)
            .save(&path)
            .unwrap();
        CredentialBundle::capture(vec![cookie("new", None)], now)
            .save(&path)
            .unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        match CredentialBundle::load(&path, now, week()) {
            BundleLoad::Loaded(b) => assert_eq!(b.cookies[0].name, "new"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn torn_file_is_discarded_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, br#"{"version":1,"captured_at":"2026-"#).unwrap();

        let load = CredentialBundle::load(&path, Utc::now(), week());

        assert!(matches!(load, BundleLoad::Discarded(DiscardReason::Corrupt(_))));
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let load = CredentialBundle::load(&dir.path().join("none.json"), Utc::now(), week());
        assert_eq!(load, BundleLoad::Missing);
    }

    #[test]
    fn stale_empty_and_expired_bundles_are_rejected() {
        let now = Utc::now();
        let old = CredentialBundle::capture(vec![cookie("a", None)], now - Duration::hours(200));
        assert_eq!(old.check(now, week()), Err(DiscardReason::Stale));

        let empty = CredentialBundle::capture(vec![], now);
        assert_eq!(empty.check(now, week()), Err(DiscardReason::Empty));

        let past = now.timestamp() - 60;
        let expired = CredentialBundle::capture(vec![cookie("a", Some(past))], now);
        assert_eq!(expired.check(now, week()), Err(DiscardReason::Expired));

        let mixed = CredentialBundle::capture(
            vec![cookie("a", Some(past)), cookie("b", None)],
            now,
        );
        assert!(mixed.check(now, week()).is_ok());
    }

    #[test]
    fn other_versions_are_rejected() {
        let mut bundle = CredentialBundle::capture(vec![cookie("a", None)], Utc::now());
        bundle.version = 0;
        assert_eq!(
            bundle.check(Utc::now(), week()),
            Err(DiscardReason::Version(0))
        );
    }
}
