//! Package-manager family detection
//!
//! Reads `/etc/os-release` and classifies the host. Detection never fails:
//! missing or unrecognised metadata falls back to probing for apt-get, then
//! to the RHEL family.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

/// System release metadata
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Presence of this binary marks a Debian-like host when os-release is silent
pub const APT_GET_PATH: &str = "/usr/bin/apt-get";

const DEBIAN_MARKERS: &[&str] = &["debian", "ubuntu"];
const RHEL_MARKERS: &[&str] = &["rhel", "fedora", "centos", "amzn"];

/// Supported package-manager families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// apt-get + unattended-upgrade
    Debian,
    /// yum --security
    Rhel,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Debian => "debian",
            OsFamily::Rhel => "rhel",
        }
    }

    /// Detect the family of the running host
    pub fn detect() -> Self {
        let os_release = fs::read_to_string(OS_RELEASE_PATH).ok();
        let family = Self::detect_from(os_release.as_deref(), Path::new(APT_GET_PATH).exists());
        debug!("Detected OS family: {}", family);
        family
    }

    /// Classify from os-release content and the apt-get probe result
    pub fn detect_from(os_release: Option<&str>, apt_get_present: bool) -> Self {
        if let Some(family) = os_release.and_then(Self::from_os_release) {
            return family;
        }

        if apt_get_present {
            OsFamily::Debian
        } else {
            OsFamily::Rhel
        }
    }

    /// First `ID=` / `ID_LIKE=` line carrying a known marker decides
    fn from_os_release(content: &str) -> Option<Self> {
        for line in content.lines() {
            if !(line.starts_with("ID=") || line.starts_with("ID_LIKE=")) {
                continue;
            }

            let value = line
                .split_once('=')
                .map(|(_, v)| v.trim().trim_matches('"').trim_matches('\''))
                .unwrap_or("")
                .to_lowercase();

            if DEBIAN_MARKERS.iter().any(|m| value.contains(m)) {
                return Some(OsFamily::Debian);
            }
            if RHEL_MARKERS.iter().any(|m| value.contains(m)) {
                return Some(OsFamily::Rhel);
            }
        }

        None
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
