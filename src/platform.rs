//! Apple platform metadata and framework packaging helpers.
//!
//! [`Platform`] is a static table: SDK names, architectures, CMake system
//! names, linker version flags and device families. The `*_path` and
//! `sdk_version` queries shell out to `xcrun`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, ShmakeError};
use crate::files;
use crate::shell::Runner;

/// CPU architecture slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(non_camel_case_types)]
pub enum Arch {
    x86_64,
    arm64,
    arm64e,
    armv7k,
    arm64_32,
}

impl Arch {
    pub const ALL: [Arch; 5] = [
        Self::x86_64,
        Self::arm64,
        Self::arm64e,
        Self::armv7k,
        Self::arm64_32,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::x86_64 => "x86_64",
            Self::arm64 => "arm64",
            Self::arm64e => "arm64e",
            Self::armv7k => "armv7k",
            Self::arm64_32 => "arm64_32",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Arch {
    type Err = ShmakeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|arch| arch.name() == s)
            .ok_or_else(|| ShmakeError::UnknownArch {
                name: s.to_string(),
            })
    }
}

/// `UIDeviceFamily` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceType {
    Iphone = 1,
    Ipad = 2,
    Tv = 3,
    Watch = 4,
    Tv4k = 5,
    Mac = 6,
}

/// How a module map exposes its headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleHeader {
    /// A single umbrella header file.
    Umbrella(String),
    /// Every header in a directory.
    UmbrellaDir(String),
}

impl ModuleHeader {
    fn module_code(&self) -> String {
        match self {
            Self::Umbrella(path) => format!("umbrella header \"{}\"", path),
            Self::UmbrellaDir(path) => format!("umbrella \"{}\"", path),
        }
    }
}

/// Apple build platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    AppleTvOs,
    AppleTvSimulator,
    IPhoneOs,
    IPhoneSimulator,
    MacOsx,
    Catalyst,
    WatchOs,
    WatchSimulator,
}

/// Bundle values for [`Platform::info_plist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    pub name: String,
    pub version: String,
    pub id: String,
    pub min_sdk_version: String,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Self::AppleTvOs,
        Self::AppleTvSimulator,
        Self::IPhoneOs,
        Self::IPhoneSimulator,
        Self::MacOsx,
        Self::Catalyst,
        Self::WatchOs,
        Self::WatchSimulator,
    ];

    /// Platform name as Xcode spells it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AppleTvOs => "AppleTVOS",
            Self::AppleTvSimulator => "AppleTVSimulator",
            Self::IPhoneOs => "iPhoneOS",
            Self::IPhoneSimulator => "iPhoneSimulator",
            Self::MacOsx => "MacOSX",
            Self::Catalyst => "Catalyst",
            Self::WatchOs => "WatchOS",
            Self::WatchSimulator => "WatchSimulator",
        }
    }

    /// SDK name passed to `xcodebuild -sdk` and `xcrun --sdk`.
    pub fn sdk(&self) -> String {
        match self {
            Self::Catalyst => Self::MacOsx.name().to_lowercase(),
            other => other.name().to_lowercase(),
        }
    }

    /// Architectures built for this platform.
    pub fn archs(&self) -> &'static [Arch] {
        match self {
            Self::AppleTvOs => &[Arch::arm64],
            Self::AppleTvSimulator => &[Arch::x86_64],
            Self::IPhoneOs => &[Arch::arm64, Arch::arm64e],
            Self::IPhoneSimulator => &[Arch::x86_64, Arch::arm64],
            Self::WatchOs => &[Arch::arm64_32],
            Self::WatchSimulator => &[Arch::x86_64],
            Self::MacOsx | Self::Catalyst => &[Arch::x86_64, Arch::arm64],
        }
    }

    /// `CMAKE_SYSTEM_NAME` for cross builds.
    pub fn cmake_system_name(&self) -> &'static str {
        match self {
            Self::AppleTvOs | Self::AppleTvSimulator => "tvOS",
            Self::MacOsx | Self::Catalyst => "Darwin",
            Self::IPhoneOs | Self::IPhoneSimulator => "iOS",
            Self::WatchOs | Self::WatchSimulator => "watchOS",
        }
    }

    /// Linker flag selecting the minimum OS version.
    pub fn min_sdk_version_name(&self) -> &'static str {
        match self {
            Self::AppleTvOs => "tvos_version_min",
            Self::AppleTvSimulator => "tvos_simulator_version_min",
            Self::MacOsx => "macosx_version_min",
            Self::Catalyst => "platform_version mac-catalyst 14.0",
            Self::IPhoneOs => "ios_version_min",
            Self::IPhoneSimulator => "ios_simulator_version_min",
            Self::WatchOs => "watchos_version_min",
            Self::WatchSimulator => "watchos_simulator_version_min",
        }
    }

    pub fn device_family(&self) -> &'static [DeviceType] {
        match self {
            Self::AppleTvOs | Self::AppleTvSimulator => &[DeviceType::Tv, DeviceType::Tv4k],
            Self::MacOsx | Self::Catalyst => &[DeviceType::Ipad, DeviceType::Mac],
            Self::IPhoneOs | Self::IPhoneSimulator => &[DeviceType::Iphone, DeviceType::Ipad],
            Self::WatchOs | Self::WatchSimulator => &[DeviceType::Watch],
        }
    }

    fn xcrun(&self, query: &str) -> String {
        format!("xcrun --sdk {} {}", self.sdk(), query)
    }

    pub fn sdk_path(&self, runner: &Runner) -> Result<String> {
        runner.read_line(&self.xcrun("--show-sdk-path"))
    }

    pub fn sdk_version(&self, runner: &Runner) -> Result<String> {
        runner.read_line(&self.xcrun("--show-sdk-version"))
    }

    pub fn cc_path(&self, runner: &Runner) -> Result<String> {
        runner.read_line(&self.xcrun("-f cc"))
    }

    pub fn cxx_path(&self, runner: &Runner) -> Result<String> {
        runner.read_line(&self.xcrun("-f c++"))
    }

    /// `module.modulemap` contents for a framework.
    pub fn module_map(&self, name: &str, headers: &ModuleHeader) -> String {
        format!(
            "module {} {{\n  {}\n\n  export *\n}}",
            name,
            headers.module_code()
        )
    }

    /// Framework `Info.plist`, querying the SDK version through `xcrun`.
    pub fn info_plist(&self, runner: &Runner, bundle: &BundleInfo) -> Result<String> {
        let sdk_version = self.sdk_version(runner)?;
        Ok(self.render_info_plist(bundle, &sdk_version))
    }

    /// Framework `Info.plist` for a known SDK version.
    pub fn render_info_plist(&self, bundle: &BundleInfo, sdk_version: &str) -> String {
        let families = self
            .device_family()
            .iter()
            .map(|d| format!("     <integer>{}</integer>", *d as u8))
            .collect::<Vec<_>>()
            .join("\n");
        let sdk = self.sdk();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>CFBundleDevelopmentRegion</key>
  <string>en</string>
  <key>CFBundleExecutable</key>
  <string>{name}</string>
  <key>CFBundleIdentifier</key>
  <string>{id}</string>
  <key>CFBundleInfoDictionaryVersion</key>
  <string>6.0</string>
  <key>CFBundleName</key>
  <string>{name}</string>
  <key>CFBundlePackageType</key>
  <string>FMWK</string>
  <key>CFBundleShortVersionString</key>
  <string>{version}</string>
  <key>CFBundleVersion</key>
  <string>1</string>
  <key>MinimumOSVersion</key>
  <string>{min_sdk}</string>
  <key>CFBundleSupportedPlatforms</key>
  <array>
    <string>{platform}</string>
  </array>
  <key>UIDeviceFamily</key>
  <array>
{families}
  </array>
  <key>DTPlatformName</key>
  <string>{sdk}</string>
  <key>DTPlatformVersion</key>
  <string>{sdk_version}</string>
  <key>DTSDKName</key>
  <string>{sdk}{sdk_version}</string>
</dict>
</plist>"#,
            name = bundle.name,
            id = bundle.id,
            version = bundle.version,
            min_sdk = bundle.min_sdk_version,
            platform = self.name(),
            families = families,
            sdk = sdk,
            sdk_version = sdk_version,
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = ShmakeError;

    /// Accepts the Xcode name (`iPhoneOS`) or the SDK name (`iphoneos`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ShmakeError::UnknownPlatform {
                name: s.to_string(),
            })
    }
}

/// Summary row used by `shmake platform`.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    pub name: &'static str,
    pub sdk: String,
    pub archs: Vec<String>,
    pub cmake_system_name: &'static str,
    pub min_sdk_version_name: &'static str,
    pub device_family: Vec<u8>,
}

impl From<Platform> for PlatformInfo {
    fn from(platform: Platform) -> Self {
        Self {
            name: platform.name(),
            sdk: platform.sdk(),
            archs: platform.archs().iter().map(|a| a.to_string()).collect(),
            cmake_system_name: platform.cmake_system_name(),
            min_sdk_version_name: platform.min_sdk_version_name(),
            device_family: platform.device_family().iter().map(|d| *d as u8).collect(),
        }
    }
}

/// Turn an iOS-style flat framework at `path` into a versioned macOS bundle.
///
/// Moves the binary, `Headers` and (if present) `Modules` into
/// `Versions/A`, `Info.plist` into `Versions/A/Resources`, and links
/// everything back through `Versions/Current`.
pub fn repack_framework_to_macos(runner: &Runner, path: &Path, name: &str) -> Result<()> {
    files::in_dir(path, || {
        let modules = files::exists("Modules");

        files::mkdir(runner, &["Versions"])?;
        files::mkdir(runner, &["Versions/A"])?;
        files::mkdir(runner, &["Versions/A/Resources"])?;

        let mut moved = vec!["mv", name, "Headers"];
        if modules {
            moved.push("Modules");
        }
        moved.push("Versions/A");
        runner.sh(moved)?;
        runner.sh(["mv", "Info.plist", "Versions/A/Resources"])?;

        files::in_dir("Versions", || runner.sh(["ln", "-s", "A", "Current"]))?;

        let name_link = format!("Versions/Current/{}", name);
        runner.sh(["ln", "-s", name_link.as_str()])?;
        runner.sh(["ln", "-s", "Versions/Current/Headers"])?;
        runner.sh(["ln", "-s", "Versions/Current/Resources"])?;
        if modules {
            runner.sh(["ln", "-s", "Versions/Current/Modules"])?;
        }
        Ok(())
    })
}

/// CMake platform file for cross-compiling to Apple platforms.
///
/// Reads `SECOND_FIND_ROOT_PATH`, `APPLE_PLATFORM` and `APPLE_SDK_PATH`
/// from the environment at configure time.
pub fn apple_cmake_toolchain() -> &'static str {
    r#"include(Platform/Darwin)

list(APPEND CMAKE_FIND_ROOT_PATH $ENV{SECOND_FIND_ROOT_PATH})
set(CMAKE_XCODE_ATTRIBUTE_CODE_SIGNING_REQUIRED "NO")
set(CMAKE_XCODE_ATTRIBUTE_ENABLE_BITCODE "NO")

if (NOT $ENV{APPLE_PLATFORM} MATCHES "macosx")
    set(UNIX True)
    set(APPLE True)

    set(CMAKE_MACOSX_BUNDLE TRUE)
    set(CMAKE_CROSSCOMPILING TRUE)

    set(CMAKE_OSX_SYSROOT $ENV{APPLE_SDK_PATH} CACHE PATH "Sysroot used for Apple support")
endif()
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalyst_uses_macosx_sdk() {
        assert_eq!(Platform::Catalyst.sdk(), "macosx");
        assert_eq!(Platform::IPhoneSimulator.sdk(), "iphonesimulator");
        assert_eq!(Platform::AppleTvOs.sdk(), "appletvos");
    }

    #[test]
    fn parses_xcode_and_sdk_names() {
        assert_eq!("iPhoneOS".parse::<Platform>().unwrap(), Platform::IPhoneOs);
        assert_eq!("iphoneos".parse::<Platform>().unwrap(), Platform::IPhoneOs);
        assert_eq!("catalyst".parse::<Platform>().unwrap(), Platform::Catalyst);
        assert!(matches!(
            "PalmOS".parse::<Platform>(),
            Err(ShmakeError::UnknownPlatform { .. })
        ));
    }

    #[test]
    fn display_round_trips() {
        for platform in Platform::ALL {
            assert_eq!(platform.to_string().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn archs_table() {
        assert_eq!(Platform::IPhoneOs.archs(), &[Arch::arm64, Arch::arm64e]);
        assert_eq!(Platform::WatchOs.archs(), &[Arch::arm64_32]);
        assert_eq!(Platform::AppleTvSimulator.archs(), &[Arch::x86_64]);
    }

    #[test]
    fn arch_parses_names() {
        assert_eq!("arm64_32".parse::<Arch>().unwrap(), Arch::arm64_32);
        assert!("mips".parse::<Arch>().is_err());
    }

    #[test]
    fn cmake_names_group_by_os() {
        assert_eq!(Platform::Catalyst.cmake_system_name(), "Darwin");
        assert_eq!(Platform::WatchSimulator.cmake_system_name(), "watchOS");
    }

    #[test]
    fn device_family_values() {
        let values: Vec<u8> = Platform::AppleTvOs
            .device_family()
            .iter()
            .map(|d| *d as u8)
            .collect();
        assert_eq!(values, vec![3, 5]);
    }

    #[test]
    fn module_map_umbrella_header() {
        let map = Platform::IPhoneOs.module_map("Foo", &ModuleHeader::Umbrella("Foo.h".into()));
        assert_eq!(
            map,
            "module Foo {\n  umbrella header \"Foo.h\"\n\n  export *\n}"
        );
    }

    #[test]
    fn module_map_umbrella_dir() {
        let map =
            Platform::MacOsx.module_map("Foo", &ModuleHeader::UmbrellaDir("Headers".into()));
        assert!(map.contains("umbrella \"Headers\""));
    }

    #[test]
    fn info_plist_fills_bundle_and_sdk() {
        let bundle = BundleInfo {
            name: "Foo".into(),
            version: "1.2.3".into(),
            id: "com.example.foo".into(),
            min_sdk_version: "13.0".into(),
        };
        let plist = Platform::Catalyst.render_info_plist(&bundle, "14.2");

        assert!(plist.contains("<string>com.example.foo</string>"));
        assert!(plist.contains("<string>1.2.3</string>"));
        assert!(plist.contains("<string>Catalyst</string>"));
        assert!(plist.contains("<integer>2</integer>\n     <integer>6</integer>"));
        assert!(plist.contains("<string>macosx14.2</string>"));
        assert!(plist.ends_with("</plist>"));
    }

    #[test]
    fn platform_info_summarises_table() {
        let info = PlatformInfo::from(Platform::IPhoneSimulator);
        assert_eq!(info.name, "iPhoneSimulator");
        assert_eq!(info.archs, vec!["x86_64", "arm64"]);
        assert_eq!(info.device_family, vec![1, 2]);
    }

    #[test]
    fn cmake_toolchain_mentions_sysroot() {
        assert!(apple_cmake_toolchain().contains("CMAKE_OSX_SYSROOT"));
    }
}
