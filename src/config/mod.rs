pub mod applicator;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{
    apply_plugin, check_plugin, ApplicationError, FileChange, StepReport, StepResult,
};
pub use loader::{load_for_project, load_from_path, load_from_str, ConfigError, DEFAULT_CONFIG_FILE};
pub use schema::{
    AnchorSettings, MarkerPolicy, Platform, PlatformFilter, PluginConfig, PluginOptions,
    ProjectSection, ValidationError, ValidationIssue,
};
pub use version::{matches_requirement, VersionError};
