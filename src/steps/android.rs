use super::{require_existing, PatchStep, StepContext, StepId, StepPlan};
use crate::anchor::{self, AnchorPolicy, Placement};
use crate::config::applicator::{ApplicationError, StepResult};
use crate::config::schema::Platform;
use crate::edit::{Baseline, Edit, FileEdits};
use std::path::{Path, PathBuf};

pub const WATERMELON_PACKAGE_IMPORT: &str = "import com.nozbe.watermelondb.WatermelonDBPackage;";
pub const IMPORT_ANCHOR: &str = "import java.util.List;";

/// Imports the WatermelonDB React package into `MainApplication.java`.
pub struct AndroidMainApplication;

impl PatchStep for AndroidMainApplication {
    fn id(&self) -> StepId {
        StepId::AndroidMainApplication
    }

    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn description(&self) -> &'static str {
        "import WatermelonDBPackage in MainApplication.java"
    }

    fn target(&self, ctx: &StepContext<'_>) -> Result<PathBuf, ApplicationError> {
        ctx.layout
            .main_application()
            .ok_or_else(|| ApplicationError::TargetUnresolved {
                step: self.id(),
                reason: "no android package configured and no MainApplication.java found"
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

        if contents.contains(WATERMELON_PACKAGE_IMPORT) {
            return Ok(StepPlan::Done(StepResult::AlreadyApplied {
                file: target.to_path_buf(),
            }));
        }

        match anchor::plan_insertion(
            WATERMELON_PACKAGE_IMPORT,
            IMPORT_ANCHOR,
            contents,
            Placement::Before,
        ) {
            Some(insertion) => Ok(StepPlan::Write(FileEdits::new(
                target,
                Baseline::of(Some(contents)),
                vec![Edit::insertion(insertion.offset, insertion.text)],
            ))),
            None => {
                let suggestion = anchor::closest_line(contents, IMPORT_ANCHOR);
                tracing::warn!(
                    file = %target.display(),
                    anchor = IMPORT_ANCHOR,
                    suggestion = ?suggestion,
                    "anchor not found"
                );
                match ctx.config.anchors.android_import {
                    AnchorPolicy::Noop => Ok(StepPlan::Done(StepResult::AnchorMissing {
                        file: target.to_path_buf(),
                        anchor: IMPORT_ANCHOR.to_string(),
                        suggestion,
                    })),
                    AnchorPolicy::Fail => Err(ApplicationError::AnchorNotFound {
                        file: target.to_path_buf(),
                        anchor: IMPORT_ANCHOR.to_string(),
                        suggestion,
                    }),
                }
            }
        }
    }
}
