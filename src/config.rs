//! Runner configuration.
//!
//! Settings come from, in increasing priority:
//! 1. Built-in defaults
//! 2. `shmake.yml` (or `.shmake.yml`) in the working directory, or a file
//!    passed explicitly
//! 3. `SHMAKE_OUTPUT_LEVEL` and `SHMAKE_SHELL` environment variables

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShmakeError};
use crate::shell::OutputLevel;
use crate::ui::IndicatorStyle;

/// Default shell used for every invocation.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// File names searched for by [`RunnerConfig::discover`], in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["shmake.yml", ".shmake.yml"];

/// Environment variable overriding [`RunnerConfig::output_level`].
pub const OUTPUT_LEVEL_VAR: &str = "SHMAKE_OUTPUT_LEVEL";

/// Environment variable overriding [`RunnerConfig::shell`].
pub const SHELL_VAR: &str = "SHMAKE_SHELL";

/// Settings shared by every invocation a [`Runner`](crate::shell::Runner) makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Level used when an invocation does not set one.
    pub output_level: OutputLevel,

    /// Shell executed as `<shell> -c <command line>`.
    pub shell: PathBuf,

    /// Progress indicator settings.
    pub progress: ProgressConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_level: OutputLevel::default(),
            shell: PathBuf::from(DEFAULT_SHELL),
            progress: ProgressConfig::default(),
        }
    }
}

/// Progress indicator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Text written on every tick.
    pub indicator: String,

    /// Tick interval in milliseconds.
    pub interval_ms: u64,

    /// Rendering style.
    pub style: IndicatorStyle,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            indicator: ".".to_string(),
            interval_ms: 1000,
            style: IndicatorStyle::default(),
        }
    }
}

impl ProgressConfig {
    /// Tick interval. Zero is clamped to one millisecond.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl RunnerConfig {
    /// Parse a config from YAML text.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| ShmakeError::ConfigParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content, path)
    }

    /// Find the config file in `dir`, if there is one.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load the config found in `dir`, or defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `SHMAKE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(OUTPUT_LEVEL_VAR) {
            self.output_level = level.parse()?;
        }
        if let Some(shell) = lookup(SHELL_VAR) {
            if !shell.is_empty() {
                self.shell = PathBuf::from(shell);
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let config = RunnerConfig::default();
        assert_eq!(config.output_level, OutputLevel::Info);
        assert_eq!(config.shell, PathBuf::from("/bin/sh"));
        assert_eq!(config.progress.indicator, ".");
        assert_eq!(config.progress.interval(), Duration::from_secs(1));
        assert_eq!(config.progress.style, IndicatorStyle::Dots);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
output_level: error
progress:
  indicator: "*"
"#;
        let config = RunnerConfig::from_yaml(yaml, Path::new("shmake.yml")).unwrap();
        assert_eq!(config.output_level, OutputLevel::Error);
        assert_eq!(config.progress.indicator, "*");
        assert_eq!(config.progress.interval_ms, 1000);
        assert_eq!(config.shell, PathBuf::from(DEFAULT_SHELL));
    }

    #[test]
    fn invalid_yaml_reports_path() {
        let err = RunnerConfig::from_yaml("output_level: [", Path::new("/x/shmake.yml"))
            .unwrap_err();
        assert!(matches!(err, ShmakeError::ConfigParseError { .. }));
        assert!(err.to_string().contains("/x/shmake.yml"));
    }

    #[test]
    fn discover_finds_dotfile() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".shmake.yml"), "shell: /bin/bash\n").unwrap();

        let config = RunnerConfig::discover(temp.path()).unwrap();
        assert_eq!(config.shell, PathBuf::from("/bin/bash"));
    }

    #[test]
    fn discover_prefers_plain_name() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("shmake.yml"), "output_level: debug\n").unwrap();
        fs::write(temp.path().join(".shmake.yml"), "output_level: silent\n").unwrap();

        let config = RunnerConfig::discover(temp.path()).unwrap();
        assert_eq!(config.output_level, OutputLevel::Debug);
    }

    #[test]
    fn discover_without_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = RunnerConfig::discover(temp.path()).unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn overrides_apply_level_and_shell() {
        let vars: HashMap<&str, &str> = [(OUTPUT_LEVEL_VAR, "silent"), (SHELL_VAR, "/bin/zsh")]
            .into_iter()
            .collect();

        let config = RunnerConfig::default()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.output_level, OutputLevel::Silent);
        assert_eq!(config.shell, PathBuf::from("/bin/zsh"));
    }

    #[test]
    fn invalid_level_override_fails() {
        let result = RunnerConfig::default().with_overrides(|key| {
            (key == OUTPUT_LEVEL_VAR).then(|| "shouty".to_string())
        });
        assert!(matches!(
            result,
            Err(ShmakeError::UnknownOutputLevel { .. })
        ));
    }
}
