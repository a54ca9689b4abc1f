//! Integration tests for helpers that change the process working directory.
//!
//! The working directory is shared by every test in this binary, so each
//! test holds `CWD_LOCK` for its whole body.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use shmake::files;
use shmake::platform::repack_framework_to_macos;
use shmake::shell::{OutputLevel, Runner, Supervisor};
use shmake::ui::Console;
use shmake::{RunnerConfig, ShmakeError};
use tempfile::TempDir;

static CWD_LOCK: Mutex<()> = Mutex::new(());

fn quiet_runner() -> Runner {
    let (console, _) = Console::buffer();
    let config = RunnerConfig {
        output_level: OutputLevel::Silent,
        ..RunnerConfig::default()
    };
    Runner::new(config)
        .with_supervisor(Arc::new(Supervisor::new()))
        .with_console(console)
}

#[test]
fn in_dir_restores_previous_directory() {
    let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let before = files::cwd().unwrap();

    let inside = files::in_dir(temp.path(), files::cwd).unwrap();
    assert_eq!(
        inside.canonicalize().unwrap(),
        temp.path().canonicalize().unwrap()
    );
    assert_eq!(files::cwd().unwrap(), before);
}

#[test]
fn in_dir_restores_directory_after_error() {
    let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let before = files::cwd().unwrap();

    let result: shmake::Result<()> = files::in_dir(temp.path(), || {
        Err(ShmakeError::UnexpectedStatusCode)
    });
    assert!(result.is_err());
    assert_eq!(files::cwd().unwrap(), before);
}

#[test]
fn in_dir_missing_directory_fails() {
    let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let before = files::cwd().unwrap();

    let result = files::in_dir(temp.path().join("absent"), || Ok(()));
    assert!(result.is_err());
    assert_eq!(files::cwd().unwrap(), before);
}

#[test]
fn commands_run_in_changed_directory() {
    let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let runner = quiet_runner();

    files::in_dir(temp.path(), || runner.sh(["touch", "marker"])).unwrap();
    assert!(temp.path().join("marker").is_file());
}

fn flat_framework(root: &Path, name: &str, with_modules: bool) {
    fs::create_dir_all(root.join("Headers")).unwrap();
    fs::write(root.join("Headers/Foo.h"), "// header\n").unwrap();
    fs::write(root.join(name), "binary").unwrap();
    fs::write(root.join("Info.plist"), "<plist/>").unwrap();
    if with_modules {
        fs::create_dir_all(root.join("Modules")).unwrap();
        fs::write(root.join("Modules/module.modulemap"), "module Foo {}\n").unwrap();
    }
}

#[test]
fn repack_builds_versioned_bundle() {
    let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("Foo.framework");
    flat_framework(&root, "Foo", true);
    let before = files::cwd().unwrap();

    repack_framework_to_macos(&quiet_runner(), &root, "Foo").unwrap();

    assert_eq!(files::cwd().unwrap(), before);
    assert!(root.join("Versions/A/Foo").is_file());
    assert!(root.join("Versions/A/Headers/Foo.h").is_file());
    assert!(root.join("Versions/A/Modules/module.modulemap").is_file());
    assert!(root.join("Versions/A/Resources/Info.plist").is_file());
    assert!(fs::symlink_metadata(root.join("Versions/Current"))
        .unwrap()
        .file_type()
        .is_symlink());
    assert_eq!(fs::read_to_string(root.join("Foo")).unwrap(), "binary");
    assert!(root.join("Headers/Foo.h").is_file());
    assert!(root.join("Resources/Info.plist").is_file());
    assert!(root.join("Modules").exists());
}

#[test]
fn repack_without_modules() {
    let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("Bar.framework");
    flat_framework(&root, "Bar", false);

    repack_framework_to_macos(&quiet_runner(), &root, "Bar").unwrap();

    assert!(root.join("Versions/A/Bar").is_file());
    assert!(!root.join("Modules").exists());
    assert!(!root.join("Versions/A/Modules").exists());
}
