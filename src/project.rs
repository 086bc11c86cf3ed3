//! Where the generated native projects live inside a host app.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Resolved locations of every file the patch steps touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Host app root (holds `package.json`, `node_modules`, `android/`, `ios/`)
    pub root: PathBuf,
    /// Java package of the Android app, e.g. `com.example.myapp`
    pub android_package: Option<String>,
    /// Name of the Xcode project directory under `ios/`
    pub ios_project_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AppJson {
    #[serde(default)]
    expo: Option<ExpoSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ExpoSection {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    android: Option<ExpoAndroid>,
}

#[derive(Debug, Default, Deserialize)]
struct ExpoAndroid {
    #[serde(default)]
    package: Option<String>,
}

/// Values read from the Expo `app.json`, when one exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppManifest {
    pub name: Option<String>,
    pub android_package: Option<String>,
}

impl AppManifest {
    /// Read `<root>/app.json`. A missing or unreadable file yields defaults.
    pub fn read(root: &Path) -> Self {
        let path = root.join("app.json");
        let Ok(raw) = fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str::<AppJson>(&raw) {
            Ok(app) => {
                let expo = app.expo.unwrap_or_default();
                Self {
                    name: expo.name,
                    android_package: expo.android.and_then(|a| a.package),
                }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unparsable app.json");
                Self::default()
            }
        }
    }
}

/// Xcode project name derived from an app display name.
pub fn sanitize_project_name(name: &str) -> String {
    name.chars().filter(|c| *c != '-' && *c != ' ').collect()
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            android_package: None,
            ios_project_name: None,
        }
    }

    pub fn with_android_package(mut self, package: impl Into<String>) -> Self {
        self.android_package = Some(package.into());
        self
    }

    pub fn with_ios_project_name(mut self, name: impl Into<String>) -> Self {
        self.ios_project_name = Some(name.into());
        self
    }

    /// Same layout with `root` made absolute and free of symlinks.
    pub fn canonicalize(&self) -> std::io::Result<Self> {
        Ok(Self {
            root: self.root.canonicalize()?,
            ..self.clone()
        })
    }

    pub fn android_root(&self) -> PathBuf {
        self.root.join("android")
    }

    pub fn ios_root(&self) -> PathBuf {
        self.root.join("ios")
    }

    /// `android/app/src/main/java/<package path>/MainApplication.java`
    ///
    /// Without a configured package, searches the Java source tree.
    pub fn main_application(&self) -> Option<PathBuf> {
        let java_root = self.android_root().join("app/src/main/java");
        if let Some(package) = &self.android_package {
            let mut path = java_root;
            for segment in package.split('.') {
                path.push(segment);
            }
            path.push("MainApplication.java");
            return Some(path);
        }

        WalkDir::new(&java_root)
            .into_iter()
            .filter_map(Result::ok)
            .find(|entry| {
                entry.file_type().is_file() && entry.file_name() == "MainApplication.java"
            })
            .map(|entry| entry.into_path())
    }

    /// Xcode project name: configured, else the single `*.xcodeproj` under `ios/`.
    pub fn ios_project(&self) -> Option<String> {
        if let Some(name) = &self.ios_project_name {
            return Some(name.clone());
        }

        let mut found = WalkDir::new(self.ios_root())
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|n| n.strip_suffix(".xcodeproj"))
                    .map(str::to_string)
            })
            .filter(|name| name != "Pods");

        let first = found.next()?;
        if found.next().is_some() {
            tracing::warn!(
                ios = %self.ios_root().display(),
                "several .xcodeproj directories; set ios_project_name"
            );
            return None;
        }
        Some(first)
    }

    /// A file inside `ios/<project>/`.
    pub fn ios_project_file(&self, file_name: &str) -> Option<PathBuf> {
        self.ios_project()
            .map(|project| self.ios_root().join(project).join(file_name))
    }

    pub fn podfile(&self) -> PathBuf {
        self.ios_root().join("Podfile")
    }

    pub fn pbxproj(&self) -> Option<PathBuf> {
        self.ios_project().map(|project| {
            self.ios_root()
                .join(format!("{project}.xcodeproj"))
                .join("project.pbxproj")
        })
    }
}
