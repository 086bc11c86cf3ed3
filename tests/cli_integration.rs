//! Integration tests for the command-line interface
//!
//! Runs the built binary against throwaway projects.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const MAIN_APPLICATION: &str = "package com.example.myapp;

import com.facebook.react.ReactPackage;
import java.util.List;

public class MainApplication {}
";

const PODFILE: &str = "target 'MyApp' do
  post_install do |installer|
    react_native_post_install(installer)
  end
end
";

const PBXPROJ: &str = "/* Begin XCBuildConfiguration section */
\t\tAA /* Debug */ = {
\t\t\tisa = XCBuildConfiguration;
\t\t\tbuildSettings = {
\t\t\t\tPRODUCT_NAME = MyApp;
\t\t\t};
\t\t\tname = Debug;
\t\t};
/* End XCBuildConfiguration section */
";

/// Helper to create a prebuilt project with WatermelonDB installed
fn setup_test_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    fs::write(
        root.join("app.json"),
        r#"{"expo": {"name": "MyApp", "android": {"package": "com.example.myapp"}}}"#,
    )
    .unwrap();

    let java = root.join("android/app/src/main/java/com/example/myapp");
    fs::create_dir_all(&java).unwrap();
    fs::write(java.join("MainApplication.java"), MAIN_APPLICATION).unwrap();

    fs::create_dir_all(root.join("ios/MyApp")).unwrap();
    fs::write(root.join("ios/MyApp/AppDelegate.h"), "@interface AppDelegate\n@end\n").unwrap();
    fs::write(root.join("ios/Podfile"), PODFILE).unwrap();
    fs::create_dir_all(root.join("ios/MyApp.xcodeproj")).unwrap();
    fs::write(root.join("ios/MyApp.xcodeproj/project.pbxproj"), PBXPROJ).unwrap();

    let pkg = root.join("node_modules/@nozbe/watermelondb");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(
        pkg.join("package.json"),
        r#"{"name": "@nozbe/watermelondb", "version": "0.27.1"}"#,
    )
    .unwrap();

    dir
}

fn wmelon(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wmelon-prebuild"))
        .args(args)
        .env_remove("WMELON_PROJECT")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn apply(project: &Path, extra: &[&str]) -> Output {
    let mut args = vec!["apply", "--project", project.to_str().unwrap()];
    args.extend_from_slice(extra);
    wmelon(&args)
}

#[test]
fn test_apply_help() {
    let output = wmelon(&["apply", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Apply the native patches to a project"));
    assert!(stdout.contains("--no-exclude-simulator-archs"));
}

#[test]
fn test_apply_basic() {
    let project = setup_test_project();
    let output = apply(project.path(), &[]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("android-main-application: Applied to"));
    assert!(stdout.contains("ios-exclude-simulator-archs: Applied to"));
    assert!(stdout.contains("Summary:"));
    assert!(stdout.contains("5 applied"));

    let podfile = fs::read_to_string(project.path().join("ios/Podfile")).unwrap();
    assert!(podfile.contains("pod 'WatermelonDB'"));
}

#[test]
fn test_apply_idempotent() {
    let project = setup_test_project();
    let _ = apply(project.path(), &[]);

    let output = apply(project.path(), &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("5 already applied"));
    assert!(stdout.contains("0 applied"));
}

#[test]
fn test_apply_dry_run() {
    let project = setup_test_project();
    let output = apply(project.path(), &["--dry-run"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("Would apply to"));

    let podfile = fs::read_to_string(project.path().join("ios/Podfile")).unwrap();
    assert_eq!(podfile, PODFILE);
    assert!(!project.path().join("ios/MyApp/wmelon.swift").exists());
}

#[test]
fn test_apply_with_diff() {
    let project = setup_test_project();
    let output = apply(project.path(), &["--dry-run", "--diff"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(patched)"));
    assert!(stdout.contains("+import com.nozbe.watermelondb.WatermelonDBPackage;"));
}

#[test]
fn test_apply_platform_android() {
    let project = setup_test_project();
    let output = apply(project.path(), &["--platform", "android"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("1 applied"));
    assert!(stdout.contains("4 skipped"));
    assert!(!project.path().join("ios/MyApp/wmelon.swift").exists());
}

#[test]
fn test_apply_fails_without_watermelon() {
    let project = setup_test_project();
    fs::remove_dir_all(project.path().join("node_modules")).unwrap();

    let output = apply(project.path(), &[]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Please make sure you have watermelondb installed"));
    assert!(stderr.contains("Not run: ios-exclude-simulator-archs"));

    let podfile = fs::read_to_string(project.path().join("ios/Podfile")).unwrap();
    assert_eq!(podfile, PODFILE);
}

#[test]
fn test_invalid_config_is_reported() {
    let project = setup_test_project();
    fs::write(
        project.path().join("wmelon.toml"),
        "[options]\nversion_range = \"not a range\"\n",
    )
    .unwrap();

    let output = apply(project.path(), &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("options.version_range"));
}

#[test]
fn test_status_command() {
    let project = setup_test_project();
    let path = project.path().to_str().unwrap();

    let output = wmelon(&["status", "--project", path]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Patch Status Report"));
    assert!(stdout.contains("NOT APPLIED (5 steps)"));

    let _ = apply(project.path(), &[]);
    let output = wmelon(&["status", "--project", path]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("APPLIED (5 steps)"));
    assert!(!stdout.contains("NOT APPLIED"));
}

#[test]
fn test_list_command() {
    let output = wmelon(&["list"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("1. android-main-application [android]"));
    assert!(stdout.contains("5. ios-exclude-simulator-archs [ios]"));
}

#[test]
fn test_project_from_environment() {
    let project = setup_test_project();
    let output = Command::new(env!("CARGO_BIN_EXE_wmelon-prebuild"))
        .args(["apply", "--dry-run"])
        .env("WMELON_PROJECT", project.path())
        .env("NO_COLOR", "1")
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("5 applied") || stdout.contains("Would apply to"));
}
