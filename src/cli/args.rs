//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::shell::OutputLevel;

/// shmake - build scripting helpers.
#[derive(Debug, Parser)]
#[command(name = "shmake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides shmake.yml discovery)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output level for shell invocations
    #[arg(short, long, global = true, env = "SHMAKE_OUTPUT_LEVEL")]
    pub level: Option<LevelArg>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output level as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Debug,
    Info,
    Error,
    #[value(alias = "none")]
    Silent,
}

impl From<LevelArg> for OutputLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Debug => Self::Debug,
            LevelArg::Info => Self::Info,
            LevelArg::Error => Self::Error,
            LevelArg::Silent => Self::Silent,
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a command line through the shell
    Sh(ShArgs),

    /// Print the first non-empty line a command writes
    ReadLine(ReadLineArgs),

    /// Create a directory and its parents
    Mkdir(MkdirArgs),

    /// Download a URL into the working directory
    Download(DownloadArgs),

    /// Print a file checksum
    Checksum(ChecksumArgs),

    /// Render tab-separated stdin as a markdown table
    Table(TableArgs),

    /// Show Apple platform metadata
    Platform(PlatformArgs),

    /// Archive a scheme for several platforms and build an XCFramework
    Xcframework(XcframeworkArgs),
}

/// Arguments for the `sh` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ShArgs {
    /// Exit code that counts as success
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub expect: i32,

    /// Shell to run the command with
    #[arg(long)]
    pub shell: Option<PathBuf>,

    /// Command tokens, joined with spaces
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the `read-line` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ReadLineArgs {
    /// Command line to run
    pub command: String,
}

/// Arguments for the `mkdir` command.
#[derive(Debug, Clone, clap::Args)]
pub struct MkdirArgs {
    /// Path components, joined with `/`
    #[arg(required = true)]
    pub parts: Vec<String>,
}

/// Arguments for the `download` command.
#[derive(Debug, Clone, clap::Args)]
pub struct DownloadArgs {
    /// URL to fetch
    pub url: String,

    /// Expected SHA-256 of the downloaded file
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,
}

/// Checksum algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Algorithm {
    Md5,
    #[default]
    Sha256,
}

/// Arguments for the `checksum` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ChecksumArgs {
    /// File to hash
    pub path: PathBuf,

    /// Digest algorithm
    #[arg(short, long, value_enum, default_value_t = Algorithm::Sha256)]
    pub algorithm: Algorithm,

    /// Hash in-process instead of calling the platform tool (sha256 only)
    #[arg(long)]
    pub native: bool,
}

/// Column alignment as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlignArg {
    #[value(alias = "l")]
    Left,
    #[value(alias = "c")]
    Center,
    #[value(alias = "r")]
    Right,
}

/// Arguments for the `table` command.
#[derive(Debug, Clone, clap::Args)]
pub struct TableArgs {
    /// Column headers
    #[arg(long = "header", required = true)]
    pub headers: Vec<String>,

    /// Column alignments (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub align: Vec<AlignArg>,
}

/// Arguments for the `platform` command.
#[derive(Debug, Clone, clap::Args)]
pub struct PlatformArgs {
    /// Show one platform only
    pub name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `xcframework` command.
#[derive(Debug, Clone, clap::Args)]
pub struct XcframeworkArgs {
    /// Output directory for archives and the XCFramework
    #[arg(long)]
    pub dir: String,

    /// Scheme to archive
    #[arg(long)]
    pub scheme: String,

    /// Xcode project
    #[arg(long, default_value = "")]
    pub project: String,

    /// Framework name (defaults to the scheme)
    #[arg(long, default_value = "")]
    pub framework: String,

    /// Platform, optionally with excluded archs: `iPhoneSimulator:x86_64`
    #[arg(long = "platform", required = true)]
    pub platforms: Vec<String>,

    /// Leave out debug symbols
    #[arg(long)]
    pub no_dsyms: bool,

    /// Build with ENABLE_BITCODE=NO
    #[arg(long)]
    pub no_bitcode: bool,

    /// Print the commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sh_with_trailing_args() {
        let cli = Cli::parse_from(["shmake", "sh", "--expect", "2", "--", "exit", "2"]);
        match cli.command {
            Commands::Sh(args) => {
                assert_eq!(args.expect, 2);
                assert_eq!(args.args, vec!["exit", "2"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn global_level_flag() {
        let cli = Cli::parse_from(["shmake", "read-line", "echo hi", "--level", "none"]);
        assert_eq!(cli.level, Some(LevelArg::Silent));
        assert_eq!(OutputLevel::from(LevelArg::Silent), OutputLevel::Silent);
    }

    #[test]
    fn table_aligns_accept_short_names() {
        let cli = Cli::parse_from([
            "shmake", "table", "--header", "A", "--header", "B", "--align", "l,r",
        ]);
        match cli.command {
            Commands::Table(args) => {
                assert_eq!(args.headers, vec!["A", "B"]);
                assert_eq!(args.align, vec![AlignArg::Left, AlignArg::Right]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn checksum_defaults_to_sha256() {
        let cli = Cli::parse_from(["shmake", "checksum", "file.zip"]);
        match cli.command {
            Commands::Checksum(args) => {
                assert_eq!(args.algorithm, Algorithm::Sha256);
                assert!(!args.native);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn xcframework_collects_platforms() {
        let cli = Cli::parse_from([
            "shmake",
            "xcframework",
            "--dir",
            "out",
            "--scheme",
            "Foo",
            "--platform",
            "iPhoneOS",
            "--platform",
            "iPhoneSimulator:x86_64",
        ]);
        match cli.command {
            Commands::Xcframework(args) => assert_eq!(args.platforms.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
