//! The native patch steps.
//!
//! Each step names its target file and computes, from the file's current
//! contents, either the edits to write or a final result. Planning never
//! touches the filesystem beyond dependency resolution; the applicator owns
//! reading and writing.

pub mod android;
pub mod ios;
pub mod podfile;
pub mod xcode;

use crate::config::applicator::{ApplicationError, StepResult};
use crate::config::schema::{Platform, PluginConfig};
use crate::edit::FileEdits;
use crate::project::ProjectLayout;
use std::fmt;
use std::path::{Path, PathBuf};
use time::Date;

pub use android::AndroidMainApplication;
pub use ios::{AppDelegateHeader, BridgingFile};
pub use podfile::PodfileDependencies;
pub use xcode::ExcludeSimulatorArchitectures;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    AndroidMainApplication,
    IosAppDelegate,
    IosBridgingFile,
    IosPodfile,
    IosExcludeSimulatorArchs,
}

impl StepId {
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::AndroidMainApplication => "android-main-application",
            StepId::IosAppDelegate => "ios-app-delegate",
            StepId::IosBridgingFile => "ios-bridging-file",
            StepId::IosPodfile => "ios-podfile",
            StepId::IosExcludeSimulatorArchs => "ios-exclude-simulator-archs",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs shared by every step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub layout: &'a ProjectLayout,
    pub config: &'a PluginConfig,
    /// Date stamped into generated files
    pub today: Date,
}

/// Outcome of planning a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPlan {
    Write(FileEdits),
    Done(StepResult),
}

pub trait PatchStep {
    fn id(&self) -> StepId;

    fn platform(&self) -> Platform;

    fn description(&self) -> &'static str;

    /// Whether the config turns this step on.
    fn enabled(&self, _config: &PluginConfig) -> bool {
        true
    }

    /// File this step reads and writes.
    fn target(&self, ctx: &StepContext<'_>) -> Result<PathBuf, ApplicationError>;

    /// Steps that create their target accept a missing file.
    fn creates_target(&self) -> bool {
        false
    }

    fn plan(
        &self,
        target: &Path,
        existing: Option<&str>,
        ctx: &StepContext<'_>,
    ) -> Result<StepPlan, ApplicationError>;
}

/// All steps in application order.
pub fn pipeline() -> Vec<Box<dyn PatchStep>> {
    vec![
        Box::new(AndroidMainApplication),
        Box::new(AppDelegateHeader),
        Box::new(BridgingFile),
        Box::new(PodfileDependencies),
        Box::new(ExcludeSimulatorArchitectures),
    ]
}

/// Contents of a target that must already exist.
fn require_existing<'a>(
    target: &Path,
    existing: Option<&'a str>,
) -> Result<&'a str, ApplicationError> {
    existing.ok_or_else(|| ApplicationError::Io {
        path: target.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pipeline_order_and_unique_ids() {
        let ids: Vec<StepId> = pipeline().iter().map(|s| s.id()).collect();
        assert_eq!(
            ids,
            vec![
                StepId::AndroidMainApplication,
                StepId::IosAppDelegate,
                StepId::IosBridgingFile,
                StepId::IosPodfile,
                StepId::IosExcludeSimulatorArchs,
            ]
        );
        let names: HashSet<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(names.len(), ids.len());
    }

    #[test]
    fn test_only_first_step_is_android() {
        let platforms: Vec<Platform> = pipeline().iter().map(|s| s.platform()).collect();
        assert_eq!(platforms[0], Platform::Android);
        assert!(platforms[1..].iter().all(|p| *p == Platform::Ios));
    }
}
