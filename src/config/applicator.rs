//! Pipeline applicator - runs the patch steps in order
//!
//! This module:
//! - Filters steps by platform and options
//! - Reads each target, plans the step, and writes the planned edits
//! - Stops at the first fatal error; files written by earlier steps stay written
//! - Reports a result per step

use crate::config::schema::PluginConfig;
use crate::config::version::VersionError;
use crate::edit::{EditError, EditResult};
use crate::pbxproj::PbxprojError;
use crate::project::ProjectLayout;
use crate::resolve::ResolveError;
use crate::safety::{ProjectGuard, SafetyError};
use crate::steps::{pipeline, PatchStep, StepContext, StepId, StepPlan};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use time::Date;

/// Result of a single step
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "StepResult should be checked"]
pub enum StepResult {
    /// Step wrote its target (or would, when checking)
    Applied { file: PathBuf },
    /// Target already carries the change
    AlreadyApplied { file: PathBuf },
    /// Anchor absent and the call site tolerates it; file untouched
    AnchorMissing {
        file: PathBuf,
        anchor: String,
        suggestion: Option<String>,
    },
    /// Step not run (platform filtered out, disabled, or nothing safe to do)
    Skipped { reason: String },
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepResult::Applied { file } => write!(f, "Applied to {}", file.display()),
            StepResult::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
            StepResult::AnchorMissing { file, anchor, .. } => {
                write!(f, "Anchor '{}' not found in {}", anchor, file.display())
            }
            StepResult::Skipped { reason } => write!(f, "Skipped: {}", reason),
        }
    }
}

/// Fatal errors; any of these aborts the pipeline.
#[derive(Debug)]
pub enum ApplicationError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Edit(EditError),
    Safety(SafetyError),
    Resolve(ResolveError),
    Version(VersionError),
    /// The embedded database package is not installed
    DependencyMissing { package: &'static str },
    DependencyVersion {
        package: &'static str,
        installed: String,
        required: String,
    },
    AnchorNotFound {
        file: PathBuf,
        anchor: String,
        suggestion: Option<String>,
    },
    AmbiguousMatch {
        file: PathBuf,
        marker: String,
        count: usize,
    },
    Pbxproj {
        file: PathBuf,
        source: PbxprojError,
    },
    /// A step could not work out which file to patch
    TargetUnresolved { step: StepId, reason: String },
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::Edit(e) => write!(f, "edit error: {}", e),
            ApplicationError::Safety(e) => write!(f, "refusing to write: {}", e),
            ApplicationError::Resolve(e) => write!(f, "dependency resolution failed: {}", e),
            ApplicationError::Version(e) => write!(f, "version error: {}", e),
            ApplicationError::DependencyMissing { .. } => {
                write!(f, "Please make sure you have watermelondb installed")
            }
            ApplicationError::DependencyVersion {
                package,
                installed,
                required,
            } => write!(
                f,
                "{} {} does not satisfy version_range {}",
                package, installed, required
            ),
            ApplicationError::AnchorNotFound {
                file,
                anchor,
                suggestion,
            } => {
                write!(f, "anchor '{}' not found in {}", anchor, file.display())?;
                if let Some(line) = suggestion {
                    write!(f, " (closest line: '{}')", line)?;
                }
                Ok(())
            }
            ApplicationError::AmbiguousMatch {
                file,
                marker,
                count,
            } => write!(
                f,
                "ambiguous marker '{}' in {} ({} matches, expected 1)",
                marker,
                file.display(),
                count
            ),
            ApplicationError::Pbxproj { file, source } => {
                write!(f, "cannot parse {}: {}", file.display(), source)
            }
            ApplicationError::TargetUnresolved { step, reason } => {
                write!(f, "{}: {}", step, reason)
            }
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Edit(e) => Some(e),
            ApplicationError::Safety(e) => Some(e),
            ApplicationError::Resolve(e) => Some(e),
            ApplicationError::Version(e) => Some(e),
            ApplicationError::Pbxproj { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<EditError> for ApplicationError {
    fn from(e: EditError) -> Self {
        ApplicationError::Edit(e)
    }
}

impl From<SafetyError> for ApplicationError {
    fn from(e: SafetyError) -> Self {
        ApplicationError::Safety(e)
    }
}

impl From<ResolveError> for ApplicationError {
    fn from(e: ResolveError) -> Self {
        ApplicationError::Resolve(e)
    }
}

impl From<VersionError> for ApplicationError {
    fn from(e: VersionError) -> Self {
        ApplicationError::Version(e)
    }
}

/// Contents of a target before and after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub file: PathBuf,
    /// `None` when the step creates the file
    pub before: Option<String>,
    pub after: String,
}

#[derive(Debug)]
pub struct StepReport {
    pub id: StepId,
    pub result: Result<StepResult, ApplicationError>,
    /// Set when the step wrote, or would write, its target
    pub change: Option<FileChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Apply,
    Check,
}

/// Apply every enabled step to the project.
///
/// Steps run in order. The returned reports end at the first fatal error;
/// later steps are not attempted and earlier writes are not rolled back.
pub fn apply_plugin(
    layout: &ProjectLayout,
    config: &PluginConfig,
    today: Date,
) -> Vec<StepReport> {
    run_pipeline(layout, config, today, Mode::Apply)
}

/// Plan every enabled step without writing anything.
///
/// `Applied` means "would apply". Stops at the first fatal error, like
/// [`apply_plugin`].
pub fn check_plugin(
    layout: &ProjectLayout,
    config: &PluginConfig,
    today: Date,
) -> Vec<StepReport> {
    run_pipeline(layout, config, today, Mode::Check)
}

fn run_pipeline(
    layout: &ProjectLayout,
    config: &PluginConfig,
    today: Date,
    mode: Mode,
) -> Vec<StepReport> {
    // Step targets must share the guard's absolute root
    let canonical = layout.canonicalize();
    let mut reports = Vec::new();

    for step in pipeline() {
        let id = step.id();

        if !config.options.platform.includes(step.platform()) {
            reports.push(skipped(id, format!("platform {} not selected", step.platform())));
            continue;
        }
        if !step.enabled(config) {
            reports.push(skipped(id, "disabled by options".to_string()));
            continue;
        }

        let result = match &canonical {
            Ok(layout) => {
                let ctx = StepContext {
                    layout,
                    config,
                    today,
                };
                run_step(step.as_ref(), &ctx, mode)
            }
            Err(err) => Err(ApplicationError::Io {
                path: layout.root.clone(),
                source: std::io::Error::new(err.kind(), err.to_string()),
            }),
        };

        match result {
            Ok((result, change)) => reports.push(StepReport {
                id,
                result: Ok(result),
                change,
            }),
            Err(err) => {
                tracing::error!(step = %id, error = %err, "aborting pipeline");
                reports.push(StepReport {
                    id,
                    result: Err(err),
                    change: None,
                });
                break;
            }
        }
    }

    reports
}

fn skipped(id: StepId, reason: String) -> StepReport {
    StepReport {
        id,
        result: Ok(StepResult::Skipped { reason }),
        change: None,
    }
}

fn run_step(
    step: &dyn PatchStep,
    ctx: &StepContext<'_>,
    mode: Mode,
) -> Result<(StepResult, Option<FileChange>), ApplicationError> {
    let target = step.target(ctx)?;

    let existing = match fs::read_to_string(&target) {
        Ok(contents) => Some(contents),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && step.creates_target() => None,
        Err(source) => {
            return Err(ApplicationError::Io {
                path: target,
                source,
            })
        }
    };

    tracing::debug!(step = %step.id(), target = %target.display(), "planning");
    let mut edits = match step.plan(&target, existing.as_deref(), ctx)? {
        StepPlan::Done(result) => return Ok((result, None)),
        StepPlan::Write(edits) => edits,
    };

    let change = FileChange {
        file: target.clone(),
        after: edits.preview(existing.as_deref().unwrap_or(""))?,
        before: existing,
    };

    if mode == Mode::Check {
        return Ok((StepResult::Applied { file: target }, Some(change)));
    }

    let guard = ProjectGuard::new(&ctx.layout.root)?;
    edits.file = guard.validate_path(&edits.file)?;

    match edits.apply()? {
        EditResult::Applied { bytes_changed, .. } => {
            tracing::info!(
                step = %step.id(),
                file = %target.display(),
                bytes_changed,
                "patched"
            );
            Ok((StepResult::Applied { file: target }, Some(change)))
        }
        EditResult::AlreadyApplied { .. } => {
            Ok((StepResult::AlreadyApplied { file: target }, None))
        }
    }
}
