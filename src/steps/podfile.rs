use super::{require_existing, PatchStep, StepContext, StepId, StepPlan};
use crate::config::applicator::{ApplicationError, StepResult};
use crate::config::schema::{MarkerPolicy, Platform};
use crate::config::version::matches_requirement;
use crate::edit::{Baseline, Edit, FileEdits};
use crate::resolve::{resolve_package, WATERMELONDB_PACKAGE};
use std::path::{Path, PathBuf};

/// Podfile keyword the dependency block is placed in front of.
pub const POST_INSTALL_MARKER: &str = "post_install";

/// Present once the block has been injected.
pub const WATERMELON_POD: &str = "pod 'WatermelonDB'";

pub const POD_BLOCK: &str = "


  # In order to Watermelon work with UseFrameworks (Firebase for example), we need to add this code
  $static_framework = [
    'WatermelonDB',
      'simdjson',
  ]
  pre_install do |installer|
    Pod::Installer::Xcode::TargetValidator.send(:define_method, :verify_no_static_framework_transitive_dependencies) {}
      installer.pod_targets.each do |pod|
        if $static_framework.include?(pod.name)
          def pod.build_type;
          Pod::BuildType.static_library # >= 1.9
        end
      end
    end
  end
  #End Watermelon with Firebase Code Add

  pod 'WatermelonDB', :path => '../node_modules/@nozbe/watermelondb'
  pod 'React-jsi', :path => '../node_modules/react-native/ReactCommon/jsi', :modular_headers => true
  pod 'simdjson', path: '../node_modules/@nozbe/simdjson'

  ";

/// Where the block went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPlacement {
    /// Immediately before the single `post_install` hook.
    BeforeMarker(usize),
    /// No hook: concatenated to the end of the file.
    AppendedAtEnd,
}

/// Offsets where `keyword` occurs as a whole word, so `post_install` does
/// not match inside `react_native_post_install(installer)`.
fn keyword_offsets(contents: &str, keyword: &str) -> Vec<usize> {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    contents
        .match_indices(keyword)
        .map(|(offset, _)| offset)
        .filter(|&offset| {
            let before = contents[..offset].chars().next_back();
            let after = contents[offset + keyword.len()..].chars().next();
            !before.is_some_and(is_word) && !after.is_some_and(is_word)
        })
        .collect()
}

/// Decide where the pod block goes in `contents`.
pub fn place_block(
    file: &Path,
    contents: &str,
    policy: MarkerPolicy,
) -> Result<BlockPlacement, ApplicationError> {
    let markers = keyword_offsets(contents, POST_INSTALL_MARKER);
    match markers.as_slice() {
        [offset] => Ok(BlockPlacement::BeforeMarker(*offset)),
        [] => match policy {
            MarkerPolicy::Append => Ok(BlockPlacement::AppendedAtEnd),
            MarkerPolicy::Fail => Err(ApplicationError::AnchorNotFound {
                file: file.to_path_buf(),
                anchor: POST_INSTALL_MARKER.to_string(),
                suggestion: None,
            }),
        },
        _ => Err(ApplicationError::AmbiguousMatch {
            file: file.to_path_buf(),
            marker: POST_INSTALL_MARKER.to_string(),
            count: markers.len(),
        }),
    }
}

/// Declares the WatermelonDB pods in the iOS Podfile.
pub struct PodfileDependencies;

impl PodfileDependencies {
    /// WatermelonDB must be installed (and satisfy `version_range`) before
    /// the Podfile can point at it.
    fn check_dependency(&self, ctx: &StepContext<'_>) -> Result<(), ApplicationError> {
        let resolved = resolve_package(&ctx.layout.root, WATERMELONDB_PACKAGE)?.ok_or(
            ApplicationError::DependencyMissing {
                package: WATERMELONDB_PACKAGE,
            },
        )?;

        let Some(requirement) = ctx.config.options.version_range.as_deref() else {
            return Ok(());
        };
        let installed = resolved.manifest.version.as_deref().unwrap_or_default();
        if matches_requirement(installed, Some(requirement))? {
            Ok(())
        } else {
            Err(ApplicationError::DependencyVersion {
                package: WATERMELONDB_PACKAGE,
                installed: installed.to_string(),
                required: requirement.to_string(),
            })
        }
    }
}

impl PatchStep for PodfileDependencies {
    fn id(&self) -> StepId {
        StepId::IosPodfile
    }

    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn description(&self) -> &'static str {
        "declare WatermelonDB, React-jsi and simdjson pods in the Podfile"
    }

    fn target(&self, ctx: &StepContext<'_>) -> Result<PathBuf, ApplicationError> {
        Ok(ctx.layout.podfile())
    }

    fn plan(
        &self,
        target: &Path,
        existing: Option<&str>,
        ctx: &StepContext<'_>,
    ) -> Result<StepPlan, ApplicationError> {
        let contents = require_existing(target, existing)?;
        self.check_dependency(ctx)?;

        if contents.contains(WATERMELON_POD) {
            return Ok(StepPlan::Done(StepResult::AlreadyApplied {
                file: target.to_path_buf(),
            }));
        }

        let offset = match place_block(target, contents, ctx.config.anchors.podfile_marker)? {
            BlockPlacement::BeforeMarker(offset) => offset,
            BlockPlacement::AppendedAtEnd => {
                tracing::warn!(
                    file = %target.display(),
                    "no post_install hook; appending pods at end of Podfile"
                );
                contents.len()
            }
        };

        Ok(StepPlan::Write(FileEdits::new(
            target,
            Baseline::of(Some(contents)),
            vec![Edit::insertion(offset, POD_BLOCK)],
        )))
    }
}
