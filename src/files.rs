//! Filesystem and checksum helpers.
//!
//! Directory creation, downloads and checksums shell out through a
//! [`Runner`], the same way a build script would. The working directory is
//! process-wide state: [`cd`] changes it for everything that runs after,
//! [`in_dir`] changes it for the duration of a closure.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{Result, ShmakeError};
use crate::shell::Runner;

static MD5_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{32}$").expect("MD5_REGEX must compile"));

static SHA256_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{64}$").expect("SHA256_REGEX must compile"));

/// `mkdir -p` of `parts` joined with `/`.
pub fn mkdir(runner: &Runner, parts: &[&str]) -> Result<()> {
    runner.sh(["mkdir -p".to_string(), parts.join("/")])
}

/// Download `url` into the working directory, following redirects.
pub fn download(runner: &Runner, url: &str) -> Result<()> {
    runner.sh(["curl", url, "-O", "-L"])
}

/// Current working directory.
pub fn cwd() -> Result<PathBuf> {
    Ok(std::env::current_dir()?)
}

/// Change the process working directory.
pub fn cd(path: impl AsRef<Path>) -> Result<()> {
    std::env::set_current_dir(path.as_ref())?;
    Ok(())
}

/// Restores the working directory when dropped.
struct DirGuard {
    previous: PathBuf,
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            tracing::warn!(
                "Could not return to {}: {}",
                self.previous.display(),
                e
            );
        }
    }
}

/// Run `f` with `path` as the working directory, then change back.
///
/// The previous directory is restored even when `f` fails.
pub fn in_dir<T, F>(path: impl AsRef<Path>, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let _guard = DirGuard { previous: cwd()? };
    cd(path)?;
    f()
}

pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Write `content` to `path` as UTF-8, replacing any existing file.
pub fn write(content: &str, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, content)?;
    Ok(())
}

fn md5_command(path: &str) -> String {
    if cfg!(target_os = "macos") {
        format!("md5 -q {}", path)
    } else {
        format!("md5sum {}", path)
    }
}

fn sha256_command(path: &str) -> String {
    if cfg!(target_os = "macos") {
        format!("shasum -a 256 {}", path)
    } else {
        format!("sha256sum {}", path)
    }
}

/// First whitespace-separated field of `line`, if it matches `pattern`.
fn digest_field(line: &str, pattern: &Regex) -> Result<String> {
    line.split_whitespace()
        .next()
        .filter(|field| pattern.is_match(field))
        .map(str::to_string)
        .ok_or_else(|| ShmakeError::UnexpectedOutput {
            output: line.to_string(),
        })
}

/// MD5 of `path` as lowercase hex, computed by the platform tool.
pub fn md5(runner: &Runner, path: &str) -> Result<String> {
    let line = runner.read_line(&md5_command(path))?;
    digest_field(&line, &MD5_REGEX)
}

/// SHA-256 of `path` as lowercase hex, computed by the platform tool.
pub fn sha256(runner: &Runner, path: &str) -> Result<String> {
    let line = runner.read_line(&sha256_command(path))?;
    digest_field(&line, &SHA256_REGEX)
}

/// SHA-256 of `path` as lowercase hex, computed in-process.
pub fn sha256_digest(path: impl AsRef<Path>) -> Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Fail unless `path` hashes to `expected` (hex, any case).
pub fn verify_sha256(path: impl AsRef<Path>, expected: &str) -> Result<()> {
    let path = path.as_ref();
    let actual = sha256_digest(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(ShmakeError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.trim().to_string(),
            actual,
        })
    }
}
