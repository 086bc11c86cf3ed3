use super::{require_existing, PatchStep, StepContext, StepId, StepPlan};
use crate::config::applicator::{ApplicationError, StepResult};
use crate::config::schema::{Platform, PluginConfig};
use crate::edit::{Baseline, FileEdits};
use crate::pbxproj::{exclude_simulator_architectures, PbxProject};
use std::path::{Path, PathBuf};

/// Sets `EXCLUDED_ARCHS[sdk=iphonesimulator*]` on every product build
/// configuration of the app's Xcode project.
pub struct ExcludeSimulatorArchitectures;

impl PatchStep for ExcludeSimulatorArchitectures {
    fn id(&self) -> StepId {
        StepId::IosExcludeSimulatorArchs
    }

    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn description(&self) -> &'static str {
        "exclude an architecture from simulator builds in project.pbxproj"
    }

    fn enabled(&self, config: &PluginConfig) -> bool {
        config.options.exclude_simulator_architectures
    }

    fn target(&self, ctx: &StepContext<'_>) -> Result<PathBuf, ApplicationError> {
        ctx.layout
            .pbxproj()
            .ok_or_else(|| ApplicationError::TargetUnresolved {
                step: self.id(),
                reason: "cannot determine the Xcode project; set project.ios_project_name"
                    .to_string(),
            })
    }

    fn plan(
        &self,
        target: &Path,
        existing: Option<&str>,
        ctx: &StepContext<'_>,
    ) -> Result<StepPlan, ApplicationError> {
        let contents = require_existing(target, existing)?;
        let project = PbxProject::parse(contents).map_err(|source| ApplicationError::Pbxproj {
            file: target.to_path_buf(),
            source,
        })?;

        let project =
            exclude_simulator_architectures(project, &ctx.config.options.excluded_architecture);
        if project.pending_changes() == 0 {
            return Ok(StepPlan::Done(StepResult::AlreadyApplied {
                file: target.to_path_buf(),
            }));
        }

        Ok(StepPlan::Write(FileEdits::new(
            target,
            Baseline::of(Some(contents)),
            project.edits(contents),
        )))
    }
}
