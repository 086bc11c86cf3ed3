//! Installed-dependency version checks.
//!
//! `options.version_range` pins the WatermelonDB releases the native patches
//! are known to work with, e.g. `">=0.26.0, <0.28.0"`.

use semver::{Version, VersionReq};
use std::fmt;

#[derive(Debug, Clone)]
pub enum VersionError {
    /// Installed version is not semver (e.g. a git checkout with no version)
    InvalidVersion { value: String, source: String },
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid installed version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Check an installed package version against an optional requirement.
///
/// npm versions may carry a leading `v` or `=`; both are ignored.
///
/// ```
/// use wmelon_prebuild::config::version::matches_requirement;
///
/// assert!(matches_requirement("0.27.1", Some(">=0.26.0, <0.28.0")).unwrap());
/// assert!(!matches_requirement("0.25.5", Some(">=0.26")).unwrap());
/// assert!(matches_requirement("v0.27.0", Some("^0.27")).unwrap());
///
/// // No requirement accepts anything
/// assert!(matches_requirement("0.1.0", None).unwrap());
/// ```
pub fn matches_requirement(
    installed: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let Some(req_str) = requirement.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(true);
    };

    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    let cleaned = installed.trim().trim_start_matches(['v', '=']);
    let version = Version::parse(cleaned).map_err(|e| VersionError::InvalidVersion {
        value: installed.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}
