//! Command dispatching.
//!
//! [`CommandDispatcher`] owns the [`Runner`] shared by every subcommand and
//! routes each CLI subcommand to its implementation.

use std::io::{self, BufRead, Write};

use anyhow::anyhow;

use super::args::{
    Algorithm, AlignArg, ChecksumArgs, Cli, Commands, DownloadArgs, PlatformArgs, ShArgs,
    TableArgs, XcframeworkArgs,
};
use crate::archive::{self, PlatformTarget, XcframeworkOptions};
use crate::error::Result;
use crate::files;
use crate::markdown::{Align, Table};
use crate::platform::{Platform, PlatformInfo};
use crate::shell::{Invocation, Runner};

impl From<AlignArg> for Align {
    fn from(arg: AlignArg) -> Self {
        match arg {
            AlignArg::Left => Self::Left,
            AlignArg::Center => Self::Center,
            AlignArg::Right => Self::Right,
        }
    }
}

/// Dispatches CLI commands to their implementations.
#[derive(Debug)]
pub struct CommandDispatcher {
    runner: Runner,
}

impl CommandDispatcher {
    pub fn new(runner: Runner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli) -> Result<()> {
        match &cli.command {
            Commands::Sh(args) => self.sh(args),
            Commands::ReadLine(args) => {
                println!("{}", self.runner.read_line(&args.command)?);
                Ok(())
            }
            Commands::Mkdir(args) => {
                let parts: Vec<&str> = args.parts.iter().map(String::as_str).collect();
                files::mkdir(&self.runner, &parts)
            }
            Commands::Download(args) => self.download(args),
            Commands::Checksum(args) => self.checksum(args),
            Commands::Table(args) => {
                let stdin = io::stdin();
                print!("{}", render_table(args, stdin.lock())?);
                Ok(())
            }
            Commands::Platform(args) => self.platform(args),
            Commands::Xcframework(args) => self.xcframework(args),
        }
    }

    fn sh(&self, args: &ShArgs) -> Result<()> {
        let mut invocation = Invocation::new(args.args.iter().cloned()).expect_status(args.expect);
        if let Some(shell) = &args.shell {
            invocation = invocation.shell(shell);
        }
        self.runner.run(invocation)
    }

    fn download(&self, args: &DownloadArgs) -> Result<()> {
        files::download(&self.runner, &args.url)?;
        if let Some(expected) = &args.sha256 {
            let name = file_name_from_url(&args.url)
                .ok_or_else(|| anyhow!("Cannot derive a file name from {}", args.url))?;
            files::verify_sha256(name, expected)?;
            tracing::info!("Verified {}", name);
        }
        Ok(())
    }

    fn checksum(&self, args: &ChecksumArgs) -> Result<()> {
        let path = args.path.to_string_lossy();
        let digest = match (args.algorithm, args.native) {
            (Algorithm::Sha256, true) => files::sha256_digest(&args.path)?,
            (Algorithm::Sha256, false) => files::sha256(&self.runner, &path)?,
            (Algorithm::Md5, false) => files::md5(&self.runner, &path)?,
            (Algorithm::Md5, true) => {
                return Err(anyhow!("In-process hashing only supports sha256").into())
            }
        };
        println!("{}", digest);
        Ok(())
    }

    fn platform(&self, args: &PlatformArgs) -> Result<()> {
        let platforms = match &args.name {
            Some(name) => vec![name.parse::<Platform>()?],
            None => Platform::ALL.to_vec(),
        };
        let infos: Vec<PlatformInfo> = platforms.into_iter().map(PlatformInfo::from).collect();

        if args.json {
            let json = serde_json::to_string_pretty(&infos).map_err(anyhow::Error::from)?;
            println!("{}", json);
        } else {
            print!("{}", platform_table(&infos).render());
        }
        Ok(())
    }

    fn xcframework(&self, args: &XcframeworkArgs) -> Result<()> {
        let options = xcframework_options(args)?;

        if args.dry_run {
            let mut stdout = io::stdout().lock();
            for archive in options.archive_options() {
                writeln!(stdout, "{}", archive.command().join(" "))?;
            }
            writeln!(stdout, "rm -rf {}", options.xcframework_path())?;
            writeln!(stdout, "{}", options.create_command()?.join(" "))?;
            return Ok(());
        }

        archive::create_xcframework(&self.runner, &options)
    }
}

/// Last path segment of `url`, ignoring any query or fragment.
fn file_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Render tab-separated lines from `input` under the given headers.
fn render_table(args: &TableArgs, input: impl BufRead) -> Result<String> {
    let mut table = Table::new(args.headers.iter())
        .aligns(args.align.iter().copied().map(Align::from));
    for line in input.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        table.add_row(
            line.split('\t')
                .map(|cell| (!cell.is_empty()).then_some(cell)),
        );
    }
    Ok(table.render())
}

fn platform_table(infos: &[PlatformInfo]) -> Table {
    let mut table = Table::new([
        "Platform",
        "SDK",
        "Archs",
        "CMake",
        "Min version flag",
        "Device family",
    ]);
    for info in infos {
        let family: Vec<String> = info.device_family.iter().map(u8::to_string).collect();
        table.add_row([
            info.name.to_string(),
            info.sdk.clone(),
            info.archs.join(", "),
            info.cmake_system_name.to_string(),
            info.min_sdk_version_name.to_string(),
            family.join(", "),
        ]);
    }
    table
}

fn xcframework_options(args: &XcframeworkArgs) -> Result<XcframeworkOptions> {
    let platforms = args
        .platforms
        .iter()
        .map(|p| p.parse::<PlatformTarget>())
        .collect::<Result<Vec<_>>>()?;

    let mut options = XcframeworkOptions::new(args.dir.clone(), args.scheme.clone());
    options.project = args.project.clone();
    options.framework = args.framework.clone();
    options.platforms = platforms;
    options.include_dsyms = !args.no_dsyms;
    options.enable_bitcode = !args.no_bitcode;
    Ok(options)
}
