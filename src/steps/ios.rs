use super::{require_existing, PatchStep, StepContext, StepId, StepPlan};
use crate::config::applicator::{ApplicationError, StepResult};
use crate::config::schema::Platform;
use crate::edit::{Baseline, Edit, FileEdits};
use std::path::{Path, PathBuf};
use time::Date;

/// Import that silences the missing-bridging-header warning.
pub const BRIDGING_HEADER_IMPORT: &str =
    "#import \"../../node_modules/@nozbe/watermelondb/native/ios/WatermelonDB/SupportingFiles/Bridging.h\"";

pub const APP_DELEGATE_IMPORTS: &str = "#import <React/RCTBundleURLProvider.h>
#import <React/RCTRootView.h>
#import <React/RCTViewManager.h>
#import <React/RCTBridgeModule.h>

// Silence warning
#import \"../../node_modules/@nozbe/watermelondb/native/ios/WatermelonDB/SupportingFiles/Bridging.h\"

";

pub const BRIDGING_FILE_NAME: &str = "wmelon.swift";

/// Marks a Swift file as generated by this tool.
pub const BRIDGING_SIGNATURE: &str = "Created by Watermelon-plugin";

fn ios_target(
    step: StepId,
    ctx: &StepContext<'_>,
    file_name: &str,
) -> Result<PathBuf, ApplicationError> {
    ctx.layout
        .ios_project_file(file_name)
        .ok_or_else(|| ApplicationError::TargetUnresolved {
            step,
            reason: "cannot determine the iOS project name; set project.ios_project_name"
                .to_string(),
        })
}

/// Prepends the React and WatermelonDB imports to `AppDelegate.h`.
pub struct AppDelegateHeader;

impl PatchStep for AppDelegateHeader {
    fn id(&self) -> StepId {
        StepId::IosAppDelegate
    }

    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn description(&self) -> &'static str {
        "prepend React and Bridging.h imports to AppDelegate.h"
    }

    fn target(&self, ctx: &StepContext<'_>) -> Result<PathBuf, ApplicationError> {
        ios_target(self.id(), ctx, "AppDelegate.h")
    }

    fn plan(
        &self,
        target: &Path,
        existing: Option<&str>,
        _ctx: &StepContext<'_>,
    ) -> Result<StepPlan, ApplicationError> {
        let contents = require_existing(target, existing)?;

        if contents.contains(BRIDGING_HEADER_IMPORT) {
            return Ok(StepPlan::Done(StepResult::AlreadyApplied {
                file: target.to_path_buf(),
            }));
        }

        Ok(StepPlan::Write(FileEdits::new(
            target,
            Baseline::of(Some(contents)),
            vec![Edit::insertion(0, APP_DELEGATE_IMPORTS)],
        )))
    }
}

/// Creates an empty Swift file so Xcode builds the project with Swift support.
pub struct BridgingFile;

/// Swift source written to `wmelon.swift`, stamped with `date`.
pub fn bridging_file_contents(date: Date) -> String {
    format!(
        "
//
//  water.swift
//  watermelonDB
//
//  {BRIDGING_SIGNATURE} on {}/{}/{}.
//

import Foundation",
        u8::from(date.month()),
        date.day(),
        date.year()
    )
}

impl PatchStep for BridgingFile {
    fn id(&self) -> StepId {
        StepId::IosBridgingFile
    }

    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn description(&self) -> &'static str {
        "create wmelon.swift in the iOS project"
    }

    fn target(&self, ctx: &StepContext<'_>) -> Result<PathBuf, ApplicationError> {
        ios_target(self.id(), ctx, BRIDGING_FILE_NAME)
    }

    fn creates_target(&self) -> bool {
        true
    }

    fn plan(
        &self,
        target: &Path,
        existing: Option<&str>,
        ctx: &StepContext<'_>,
    ) -> Result<StepPlan, ApplicationError> {
        match existing {
            None => Ok(StepPlan::Write(FileEdits::new(
                target,
                Baseline::Missing,
                vec![Edit::insertion(0, bridging_file_contents(ctx.today))],
            ))),
            // Any earlier run counts, whatever date it carries
            Some(contents) if contents.contains(BRIDGING_SIGNATURE) => {
                Ok(StepPlan::Done(StepResult::AlreadyApplied {
                    file: target.to_path_buf(),
                }))
            }
            Some(_) => Ok(StepPlan::Done(StepResult::Skipped {
                reason: format!(
                    "{} exists and was not generated by wmelon-prebuild; leaving it untouched",
                    target.display()
                ),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PluginConfig;
    use crate::project::ProjectLayout;
    use crate::steps::test_support::{context, run, Outcome};
    use time::macros::date;

    const APP_DELEGATE: &str =
        "#import <Expo/Expo.h>\n\n@interface AppDelegate : EXAppDelegateWrapper\n@end\n";

    fn layout() -> ProjectLayout {
        ProjectLayout::new("/project").with_ios_project_name("MyApp")
    }

    #[test]
    fn test_targets() {
        let layout = layout();
        let config = PluginConfig::default();
        let ctx = context(&layout, &config);
        assert_eq!(
            AppDelegateHeader.target(&ctx).unwrap(),
            PathBuf::from("/project/ios/MyApp/AppDelegate.h")
        );
        assert_eq!(
            BridgingFile.target(&ctx).unwrap(),
            PathBuf::from("/project/ios/MyApp/wmelon.swift")
        );
    }

    #[test]
    fn test_app_delegate_prepends_imports() {
        let layout = layout();
        let config = PluginConfig::default();
        let out = run(&AppDelegateHeader, &context(&layout, &config), Some(APP_DELEGATE))
            .unwrap()
            .written();

        assert_eq!(out, format!("{APP_DELEGATE_IMPORTS}{APP_DELEGATE}"));
    }

    #[test]
    fn test_app_delegate_is_idempotent() {
        let layout = layout();
        let config = PluginConfig::default();
        let ctx = context(&layout, &config);
        let once = run(&AppDelegateHeader, &ctx, Some(APP_DELEGATE)).unwrap().written();

        assert!(matches!(
            run(&AppDelegateHeader, &ctx, Some(&once)).unwrap(),
            Outcome::Done(StepResult::AlreadyApplied { .. })
        ));
    }

    #[test]
    fn test_bridging_contents_use_injected_date() {
        let contents = bridging_file_contents(date!(2024 - 03 - 07));
        assert!(contents.contains("//  Created by Watermelon-plugin on 3/7/2024.\n"));
        assert!(contents.starts_with("\n//\n//  water.swift\n"));
        assert!(contents.ends_with("import Foundation"));
    }

    #[test]
    fn test_bridging_file_created_when_missing() {
        let layout = layout();
        let config = PluginConfig::default();
        let out = run(&BridgingFile, &context(&layout, &config), None)
            .unwrap()
            .written();
        assert_eq!(out, bridging_file_contents(date!(2024 - 03 - 07)));
    }

    #[test]
    fn test_bridging_file_from_earlier_day_is_kept() {
        let layout = layout();
        let config = PluginConfig::default();
        let earlier = bridging_file_contents(date!(2023 - 12 - 31));

        assert!(matches!(
            run(&BridgingFile, &context(&layout, &config), Some(&earlier)).unwrap(),
            Outcome::Done(StepResult::AlreadyApplied { .. })
        ));
    }

    #[test]
    fn test_foreign_swift_file_is_preserved() {
        let layout = layout();
        let config = PluginConfig::default();
        assert!(matches!(
            run(&BridgingFile, &context(&layout, &config), Some("import UIKit\n")).unwrap(),
            Outcome::Done(StepResult::Skipped { .. })
        ));
    }

    #[test]
    fn test_unresolvable_ios_project() {
        let temp_dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(temp_dir.path());
        let config = PluginConfig::default();
        assert!(matches!(
            AppDelegateHeader.target(&context(&layout, &config)),
            Err(ApplicationError::TargetUnresolved { .. })
        ));
    }
}
