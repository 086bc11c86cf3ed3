use crate::anchor::AnchorPolicy;
use crate::project::{sanitize_project_name, AppManifest, ProjectLayout};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Contents of `wmelon.toml`. Every section is optional.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub options: PluginOptions,
    #[serde(default)]
    pub anchors: AnchorSettings,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ProjectSection {
    /// App display name; spaces and dashes are stripped to get the Xcode project name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ios_project_name: Option<String>,
    #[serde(default)]
    pub android_package: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PluginOptions {
    #[serde(default = "default_true")]
    pub exclude_simulator_architectures: bool,
    #[serde(default = "default_excluded_architecture")]
    pub excluded_architecture: String,
    /// semver requirement the installed WatermelonDB must satisfy
    #[serde(default)]
    pub version_range: Option<String>,
    #[serde(default)]
    pub platform: PlatformFilter,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            exclude_simulator_architectures: true,
            excluded_architecture: default_excluded_architecture(),
            version_range: None,
            platform: PlatformFilter::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_excluded_architecture() -> String {
    "arm64".to_string()
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct AnchorSettings {
    /// Policy when `import java.util.List;` is missing from MainApplication.java
    #[serde(default)]
    pub android_import: AnchorPolicy,
    /// Policy when the Podfile has no `post_install` hook
    #[serde(default)]
    pub podfile_marker: MarkerPolicy,
}

/// What the Podfile step does when the marker keyword is absent.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerPolicy {
    /// Concatenate the block to the end of the file.
    #[default]
    Append,
    Fail,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Android,
    Ios,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Android => write!(f, "android"),
            Platform::Ios => write!(f, "ios"),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformFilter {
    #[default]
    All,
    Android,
    Ios,
}

impl PlatformFilter {
    pub fn includes(self, platform: Platform) -> bool {
        match self {
            PlatformFilter::All => true,
            PlatformFilter::Android => platform == Platform::Android,
            PlatformFilter::Ios => platform == Platform::Ios,
        }
    }
}

impl PluginConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if let Some(package) = &self.project.android_package {
            if !is_java_package(package) {
                issues.push(ValidationIssue::InvalidValue {
                    field: "project.android_package",
                    message: format!("'{package}' is not a Java package name"),
                });
            }
        }

        if let Some(name) = &self.project.ios_project_name {
            if name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "project.ios_project_name",
                });
            } else if name.contains(['/', '\\']) {
                issues.push(ValidationIssue::InvalidValue {
                    field: "project.ios_project_name",
                    message: "must be a directory name, not a path".to_string(),
                });
            }
        }

        if self.options.exclude_simulator_architectures
            && self.options.excluded_architecture.trim().is_empty()
        {
            issues.push(ValidationIssue::MissingField {
                field: "options.excluded_architecture",
            });
        }

        if let Some(range) = &self.options.version_range {
            if let Err(err) = semver::VersionReq::parse(range.trim()) {
                issues.push(ValidationIssue::InvalidValue {
                    field: "options.version_range",
                    message: err.to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Project layout for `root`, filling gaps from the Expo `app.json`.
    pub fn layout(&self, root: &Path) -> ProjectLayout {
        let manifest = AppManifest::read(root);
        let mut layout = ProjectLayout::new(root);

        let ios_name = self
            .project
            .ios_project_name
            .clone()
            .or_else(|| self.project.name.as_deref().map(sanitize_project_name))
            .or_else(|| manifest.name.as_deref().map(sanitize_project_name))
            .filter(|name| !name.is_empty());
        if let Some(name) = ios_name {
            layout = layout.with_ios_project_name(name);
        }

        if let Some(package) = self
            .project
            .android_package
            .clone()
            .or(manifest.android_package)
        {
            layout = layout.with_android_package(package);
        }

        layout
    }
}

fn is_java_package(package: &str) -> bool {
    !package.is_empty()
        && package.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required value for '{field}'")
            }
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid '{field}': {message}")
            }
        }
    }
}
