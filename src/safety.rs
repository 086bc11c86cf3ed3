use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories under the project root that belong to package managers or
/// build outputs and must never be patched.
const FORBIDDEN_RELATIVE: &[&str] = &[
    "node_modules",
    "ios/Pods",
    "ios/build",
    "android/build",
    "android/app/build",
];

/// Keeps every write inside the host project and out of generated trees.
#[derive(Debug, Clone)]
pub struct ProjectGuard {
    project_root: PathBuf,
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside project: {path} (project: {project})")]
    OutsideProject { path: PathBuf, project: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl ProjectGuard {
    /// Create a guard rooted at `project_root` (canonicalized).
    pub fn new(project_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let project_root = project_root.as_ref().canonicalize()?;

        let mut forbidden_paths: Vec<PathBuf> = FORBIDDEN_RELATIVE
            .iter()
            .filter_map(|rel| project_root.join(rel).canonicalize().ok())
            .collect();

        // Shared CocoaPods repo and download caches
        if let Some(home) = home::home_dir() {
            for rel in [".cocoapods", "Library/Caches/CocoaPods"] {
                if let Ok(path) = home.join(rel).canonicalize() {
                    forbidden_paths.push(path);
                }
            }
        }

        Ok(Self {
            project_root,
            forbidden_paths,
        })
    }

    /// Check that `path` may be written. The file itself need not exist yet,
    /// but its parent directory must.
    ///
    /// Returns the canonical path of the target.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };

        let canonical = if absolute.exists() {
            absolute.canonicalize()?
        } else {
            let parent = absolute.parent().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
            })?;
            let name = absolute.file_name().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
            })?;
            parent.canonicalize()?.join(name)
        };

        if !canonical.starts_with(&self.project_root) {
            return Err(SafetyError::OutsideProject {
                path: canonical,
                project: self.project_root.clone(),
            });
        }

        if let Some(forbidden) = self
            .forbidden_paths
            .iter()
            .find(|forbidden| canonical.starts_with(forbidden))
        {
            return Err(SafetyError::ForbiddenPath {
                path: canonical,
                forbidden: forbidden.clone(),
            });
        }

        Ok(canonical)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_validate_existing_file_inside_project() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("ios/Podfile");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();

        let guard = ProjectGuard::new(temp_dir.path()).unwrap();
        assert!(guard.validate_path(&file).is_ok());
    }

    #[test]
    fn test_validate_new_file_inside_project() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp_dir.path().join("ios/MyApp")).unwrap();

        let guard = ProjectGuard::new(temp_dir.path()).unwrap();
        let result = guard.validate_path("ios/MyApp/wmelon.swift").unwrap();
        assert!(result.ends_with("ios/MyApp/wmelon.swift"));
    }

    #[test]
    fn test_validate_outside_project() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path().join("app");
        fs::create_dir_all(&project).unwrap();
        let outside = temp_dir.path().join("Podfile");
        fs::write(&outside, b"").unwrap();

        let guard = ProjectGuard::new(&project).unwrap();
        assert!(matches!(
            guard.validate_path(&outside),
            Err(SafetyError::OutsideProject { .. })
        ));
    }

    #[test]
    fn test_validate_inside_pods_is_forbidden() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pods_file = temp_dir.path().join("ios/Pods/Manifest.lock");
        fs::create_dir_all(pods_file.parent().unwrap()).unwrap();
        fs::write(&pods_file, b"").unwrap();

        let guard = ProjectGuard::new(temp_dir.path()).unwrap();
        assert!(matches!(
            guard.validate_path(&pods_file),
            Err(SafetyError::ForbiddenPath { .. })
        ));
    }

    #[test]
    fn test_validate_missing_parent_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let guard = ProjectGuard::new(temp_dir.path()).unwrap();
        assert!(matches!(
            guard.validate_path("ios/Nope/wmelon.swift"),
            Err(SafetyError::Canonicalize(_))
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_symlink_escape() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path().join("app");
        fs::create_dir_all(&project).unwrap();
        let outside = temp_dir.path().join("AppDelegate.h");
        fs::write(&outside, b"").unwrap();
        let link = project.join("AppDelegate.h");
        symlink(&outside, &link).unwrap();

        let guard = ProjectGuard::new(&project).unwrap();
        assert!(matches!(
            guard.validate_path(&link),
            Err(SafetyError::OutsideProject { .. })
        ));
    }
}
