//! wmelon-prebuild: links WatermelonDB into generated native projects
//!
//! After an Expo prebuild regenerates `android/` and `ios/`, a handful of
//! native files need small additions before WatermelonDB compiles: a Java
//! import, Objective-C imports, an empty Swift file, pod declarations and a
//! simulator architecture exclusion in the Xcode project.
//!
//! # Architecture
//!
//! Every file change compiles down to [`FileEdits`]: verified byte-span
//! insertions or replacements applied atomically against a recorded baseline.
//! Each step in [`steps`] locates its span (a text anchor, a Podfile keyword,
//! or a node of the parsed `project.pbxproj`) and plans edits; the
//! [`config::applicator`] runs the steps in order and writes the results.
//!
//! # Safety
//!
//! - Steps are idempotent; rerunning reports `AlreadyApplied`
//! - Writes are atomic (tempfile + fsync + rename)
//! - Writes stay inside the project root and out of build output
//! - The run stops at the first fatal error
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use wmelon_prebuild::{apply_plugin, load_for_project};
//!
//! let root = Path::new("my-app");
//! let config = load_for_project(root).unwrap();
//! let today = time::OffsetDateTime::now_utc().date();
//!
//! for report in apply_plugin(&config.layout(root), &config, today) {
//!     println!("{}: {:?}", report.id, report.result);
//! }
//! ```

pub mod anchor;
pub mod config;
pub mod edit;
pub mod pbxproj;
pub mod project;
pub mod resolve;
pub mod safety;
pub mod steps;

// Re-exports
pub use anchor::{closest_line, patch, plan_insertion, AnchorPolicy, Placement};
pub use config::{
    apply_plugin, check_plugin, load_for_project, load_from_path, load_from_str,
    matches_requirement, ApplicationError, ConfigError, PluginConfig, StepReport, StepResult,
    VersionError,
};
pub use edit::{Baseline, Edit, EditError, EditResult, EditVerification, FileEdits};
pub use pbxproj::{exclude_simulator_architectures, PbxProject, PbxprojError};
pub use project::ProjectLayout;
pub use safety::{ProjectGuard, SafetyError};
pub use steps::{pipeline, PatchStep, StepId};
