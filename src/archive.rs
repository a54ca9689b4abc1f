//! `xcodebuild` archive and XCFramework assembly.
//!
//! Argument lists are built by pure functions so they can be checked
//! without Xcode; the `xb_*` and [`create_xcframework`] functions hand them
//! to a [`Runner`].

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, ShmakeError};
use crate::platform::{Arch, Platform};
use crate::shell::{Invocation, Runner};

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

/// A platform to archive, minus any architectures to leave out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTarget {
    pub platform: Platform,
    pub excluded_archs: Vec<Arch>,
}

impl PlatformTarget {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            excluded_archs: Vec::new(),
        }
    }

    pub fn excluding(mut self, archs: impl IntoIterator<Item = Arch>) -> Self {
        self.excluded_archs.extend(archs);
        self
    }
}

impl FromStr for PlatformTarget {
    type Err = ShmakeError;

    /// `iPhoneOS` or `iPhoneSimulator:x86_64,arm64`.
    fn from_str(s: &str) -> Result<Self> {
        let (name, archs) = match s.split_once(':') {
            Some((name, archs)) => (name, archs),
            None => (s, ""),
        };
        let excluded_archs = archs
            .split(',')
            .filter(|a| !a.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Arch>>>()?;
        Ok(Self {
            platform: name.parse()?,
            excluded_archs,
        })
    }
}

/// Options for a single `xcodebuild archive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Output path; defaults to `<framework>.xcarchive`.
    pub archive_path: Option<String>,
    /// Project name, with or without the `.xcodeproj` suffix. Empty = none.
    pub project: String,
    pub scheme: String,
    /// Framework name; defaults to the scheme.
    pub framework: String,
    pub platform: Platform,
    pub build_for_distribution: bool,
    pub enable_bitcode: bool,
    pub excluded_archs: Vec<Arch>,
    pub skip_install: bool,
    /// Environment for xcodebuild; `None` passes only `PATH`.
    pub env: Option<BTreeMap<String, String>>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            archive_path: None,
            project: String::new(),
            scheme: String::new(),
            framework: String::new(),
            platform: Platform::IPhoneOs,
            build_for_distribution: true,
            enable_bitcode: false,
            excluded_archs: Vec::new(),
            skip_install: false,
            env: None,
        }
    }
}

impl ArchiveOptions {
    pub fn framework_name(&self) -> &str {
        if self.framework.is_empty() {
            &self.scheme
        } else {
            &self.framework
        }
    }

    pub fn archive_path(&self) -> String {
        self.archive_path
            .clone()
            .unwrap_or_else(|| format!("{}.xcarchive", self.framework_name()))
    }

    /// The `xcodebuild archive` argument list.
    pub fn command(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["xcodebuild".into(), "archive".into()];

        if !self.project.is_empty() {
            args.push("-project".into());
            if self.project.ends_with(".xcodeproj") {
                args.push(self.project.clone());
            } else {
                args.push(format!("{}.xcodeproj", self.project));
            }
        }

        args.extend([
            "-scheme".to_string(),
            self.scheme.clone(),
            "-sdk".to_string(),
            self.platform.sdk(),
            "-archivePath".to_string(),
            self.archive_path(),
        ]);

        if !self.excluded_archs.is_empty() {
            let archs: Vec<&str> = self.excluded_archs.iter().map(Arch::name).collect();
            args.push(format!("EXCLUDED_ARCHS={}", archs.join(",")));
        }

        let catalyst = self.platform == Platform::Catalyst;
        if catalyst {
            args.push("-destination 'platform=macOS,variant=Mac Catalyst'".into());
        }

        args.push(format!(
            "BUILD_FOR_DISTRIBUTION={}",
            yes_no(self.build_for_distribution)
        ));
        args.push(format!("SKIP_INSTALL={}", yes_no(self.skip_install)));
        args.push(format!("ENABLE_BITCODE={}", yes_no(self.enable_bitcode)));

        if catalyst {
            args.push("SUPPORTS_MACCATALYST=YES".into());
        }

        args
    }
}

/// Run one `xcodebuild archive`.
pub fn xb_archive(runner: &Runner, options: &ArchiveOptions) -> Result<()> {
    let mut invocation = Invocation::new(options.command());
    if let Some(env) = &options.env {
        invocation = invocation.env(env.clone());
    }
    runner.run(invocation)
}

/// Options for building an XCFramework out of per-platform archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XcframeworkOptions {
    /// Directory receiving the archives and the XCFramework.
    pub dir: String,
    pub project: String,
    pub scheme: String,
    pub framework: String,
    pub platforms: Vec<PlatformTarget>,
    pub build_for_distribution: bool,
    pub enable_bitcode: bool,
    pub skip_install: bool,
    /// Pass each archive's dSYM as `-debug-symbols`.
    pub include_dsyms: bool,
    pub env: Option<BTreeMap<String, String>>,
}

impl XcframeworkOptions {
    pub fn new(dir: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            project: String::new(),
            scheme: scheme.into(),
            framework: String::new(),
            platforms: Vec::new(),
            build_for_distribution: true,
            enable_bitcode: true,
            skip_install: false,
            include_dsyms: true,
            env: None,
        }
    }

    pub fn framework_name(&self) -> &str {
        if self.framework.is_empty() {
            &self.scheme
        } else {
            &self.framework
        }
    }

    /// `<dir>/<scheme>-<platform>.xcarchive`.
    pub fn archive_path(&self, dir: &str, platform: Platform) -> String {
        format!("{}/{}-{}.xcarchive", dir, self.scheme, platform)
    }

    /// `<dir>/<framework>.xcframework`.
    pub fn xcframework_path(&self) -> String {
        format!("{}/{}.xcframework", self.dir, self.framework_name())
    }

    /// One [`ArchiveOptions`] per platform target.
    pub fn archive_options(&self) -> Vec<ArchiveOptions> {
        self.platforms
            .iter()
            .map(|target| ArchiveOptions {
                archive_path: Some(self.archive_path(&self.dir, target.platform)),
                project: self.project.clone(),
                scheme: self.scheme.clone(),
                framework: self.framework.clone(),
                platform: target.platform,
                build_for_distribution: self.build_for_distribution,
                enable_bitcode: self.enable_bitcode,
                excluded_archs: target.excluded_archs.clone(),
                skip_install: self.skip_install,
                env: self.env.clone(),
            })
            .collect()
    }

    /// The `xcodebuild -create-xcframework` argument list.
    ///
    /// Framework and dSYM paths are made absolute, as xcodebuild requires.
    pub fn create_command(&self) -> Result<Vec<String>> {
        let absolute = std::path::absolute(Path::new(&self.dir))?;
        let dir = absolute.to_string_lossy();
        let name = self.framework_name();

        let mut args: Vec<String> = vec!["xcodebuild".into(), "-create-xcframework".into()];
        for target in &self.platforms {
            let archive = self.archive_path(&dir, target.platform);
            args.push("-framework".into());
            args.push(format!(
                "{}/Products/Library/Frameworks/{}.framework",
                archive, name
            ));
            if self.include_dsyms {
                args.push("-debug-symbols".into());
                args.push(format!("{}/dSYMs/{}.framework.dSYM", archive, name));
            }
        }
        args.push("-output".into());
        args.push(self.xcframework_path());
        Ok(args)
    }
}

/// Archive every platform target in order.
pub fn xb_archive_all(runner: &Runner, options: &XcframeworkOptions) -> Result<()> {
    for archive in options.archive_options() {
        xb_archive(runner, &archive)?;
    }
    Ok(())
}

/// Archive every platform and combine the results into one XCFramework.
///
/// Any XCFramework already at the output path is removed first.
pub fn create_xcframework(runner: &Runner, options: &XcframeworkOptions) -> Result<()> {
    xb_archive_all(runner, options)?;
    let command = options.create_command()?;
    runner.sh(["rm", "-rf", options.xcframework_path().as_str()])?;
    runner.sh(command)
}
