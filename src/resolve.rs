//! Node-style package resolution.
//!
//! Mirrors how `require.resolve("<pkg>/package.json")` finds a dependency:
//! starting at the project root, look in `node_modules/<pkg>` of each
//! ancestor directory until one contains a `package.json`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// npm name of the embedded database library.
pub const WATERMELONDB_PACKAGE: &str = "@nozbe/watermelondb";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid package manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The subset of `package.json` we care about.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A dependency located on disk.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    /// Directory holding the package's `package.json`
    pub dir: PathBuf,
    pub manifest: PackageManifest,
}

/// Resolve `package` from `project_root`, or `Ok(None)` when it is not
/// installed anywhere up the tree.
///
/// The walk starts from the canonical root, so relative roots such as `.`
/// still reach hoisted installs in parent directories.
pub fn resolve_package(
    project_root: &Path,
    package: &str,
) -> Result<Option<ResolvedPackage>, ResolveError> {
    let start = project_root
        .canonicalize()
        .map_err(|source| ResolveError::Io {
            path: project_root.to_path_buf(),
            source,
        })?;

    for ancestor in start.ancestors() {
        let dir = ancestor.join("node_modules").join(package);
        let manifest_path = dir.join("package.json");
        if !manifest_path.is_file() {
            continue;
        }

        let raw = fs::read_to_string(&manifest_path).map_err(|source| ResolveError::Io {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest: PackageManifest =
            serde_json::from_str(&raw).map_err(|source| ResolveError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;

        tracing::debug!(
            package,
            dir = %dir.display(),
            version = ?manifest.version,
            "resolved package"
        );
        return Ok(Some(ResolvedPackage { dir, manifest }));
    }

    tracing::debug!(package, root = %project_root.display(), "package not found");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install(root: &Path, version: &str) {
        let dir = root.join("node_modules/@nozbe/watermelondb");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            format!(r#"{{"name": "@nozbe/watermelondb", "version": "{version}"}}"#),
        )
        .unwrap();
    }

    #[test]
    fn test_resolve_in_project_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        install(temp_dir.path(), "0.27.1");

        let resolved = resolve_package(temp_dir.path(), WATERMELONDB_PACKAGE)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.manifest.name.as_deref(), Some("@nozbe/watermelondb"));
        assert_eq!(resolved.manifest.version.as_deref(), Some("0.27.1"));
        assert!(resolved.dir.ends_with("node_modules/@nozbe/watermelondb"));
    }

    #[test]
    fn test_resolve_from_hoisted_ancestor() {
        let temp_dir = tempfile::tempdir().unwrap();
        install(temp_dir.path(), "0.26.0");
        let app = temp_dir.path().join("apps/mobile");
        fs::create_dir_all(&app).unwrap();

        let resolved = resolve_package(&app, WATERMELONDB_PACKAGE).unwrap();
        assert!(resolved.is_some());
    }

    #[test]
    fn test_resolve_missing_package() {
        let temp_dir = tempfile::tempdir().unwrap();
        // Resolution walks up to `/`, so use a name nothing will have installed
        let result = resolve_package(temp_dir.path(), "@nozbe/definitely-not-installed");
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_manifest_without_name_still_resolves() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("node_modules/@nozbe/watermelondb");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), r#"{"version": "0.27.1"}"#).unwrap();

        let resolved = resolve_package(temp_dir.path(), WATERMELONDB_PACKAGE)
            .unwrap()
            .unwrap();
        assert!(resolved.manifest.name.is_none());
        assert_eq!(resolved.manifest.version.as_deref(), Some("0.27.1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_root_reaches_real_ancestors() {
        // `link` points into a monorepo whose hoisted node_modules is not a
        // lexical ancestor of the relative path
        let mono = tempfile::tempdir().unwrap();
        install(mono.path(), "0.27.1");
        let app = mono.path().join("apps/mobile");
        fs::create_dir_all(&app).unwrap();

        let local = tempfile::Builder::new()
            .prefix("resolve-")
            .tempdir_in(".")
            .unwrap();
        std::os::unix::fs::symlink(&app, local.path().join("link")).unwrap();
        let relative = Path::new(local.path().file_name().unwrap()).join("link");
        assert!(relative.is_relative());

        let resolved = resolve_package(&relative, WATERMELONDB_PACKAGE).unwrap();
        assert!(resolved.is_some());
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = resolve_package(&temp_dir.path().join("gone"), WATERMELONDB_PACKAGE);
        assert!(matches!(result, Err(ResolveError::Io { .. })));
    }

    #[test]
    fn test_resolve_invalid_manifest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("node_modules/@nozbe/watermelondb");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), "{ not json").unwrap();

        let result = resolve_package(temp_dir.path(), WATERMELONDB_PACKAGE);
        assert!(matches!(result, Err(ResolveError::Manifest { .. })));
    }
}
