//! Progress indicator shown while a child process runs.
//!
//! The default rendering appends one indicator string per tick to the
//! console, which reads well in CI logs. On an interactive terminal the
//! `spinner` style swaps that for an indicatif spinner.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};

use super::Console;
use crate::config::ProgressConfig;

/// How the indicator is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorStyle {
    /// Append the indicator string on every tick.
    #[default]
    Dots,
    /// Animated spinner on terminals; dots everywhere else.
    Spinner,
}

enum Ticker {
    Dots {
        cancel: Sender<()>,
        handle: JoinHandle<bool>,
    },
    Spinner(ProgressBar),
}

/// A running progress indicator.
///
/// Cancel it once the monitored process has exited. Dropping it cancels
/// it as well.
pub struct ProgressIndicator {
    ticker: Option<Ticker>,
}

impl ProgressIndicator {
    /// Start an indicator according to `config`.
    pub fn attach(console: &Console, config: &ProgressConfig) -> io::Result<Self> {
        let every = config.interval();
        match config.style {
            IndicatorStyle::Spinner if console.is_term() => Ok(Self::spinner(every)),
            _ => Self::dots(console.clone(), config.indicator.clone(), every),
        }
    }

    /// Write `indicator` to `console` every `every` until cancelled.
    pub fn dots(console: Console, indicator: String, every: Duration) -> io::Result<Self> {
        let (cancel, ticks) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("shmake-progress".to_string())
            .spawn(move || {
                let mut printed = false;
                while let Err(RecvTimeoutError::Timeout) = ticks.recv_timeout(every) {
                    console.write_bytes(indicator.as_bytes());
                    printed = true;
                }
                if printed {
                    console.newline();
                }
                printed
            })?;

        Ok(Self {
            ticker: Some(Ticker::Dots { cancel, handle }),
        })
    }

    /// Animated spinner drawn on standard output.
    pub fn spinner(every: Duration) -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        bar.set_style(ProgressStyle::default_spinner().tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        bar.enable_steady_tick(every);
        Self {
            ticker: Some(Ticker::Spinner(bar)),
        }
    }

    /// Stop the indicator and wait for it to finish writing.
    ///
    /// Returns whether any indicator output was written to the console.
    pub fn cancel(mut self) -> bool {
        self.stop()
    }

    fn stop(&mut self) -> bool {
        match self.ticker.take() {
            Some(Ticker::Dots { cancel, handle }) => {
                let _ = cancel.send(());
                handle.join().unwrap_or(false)
            }
            Some(Ticker::Spinner(bar)) => {
                bar.finish_and_clear();
                false
            }
            None => false,
        }
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_before_first_tick_prints_nothing() {
        let (console, buffer) = Console::buffer();
        let indicator =
            ProgressIndicator::dots(console, ".".to_string(), Duration::from_secs(60)).unwrap();

        let printed = indicator.cancel();

        assert!(!printed);
        assert!(buffer.is_empty());
    }

    #[test]
    fn ticks_then_trailing_newline() {
        let (console, buffer) = Console::buffer();
        let indicator =
            ProgressIndicator::dots(console, ".".to_string(), Duration::from_millis(10)).unwrap();

        thread::sleep(Duration::from_millis(200));
        let printed = indicator.cancel();

        assert!(printed);
        let text = buffer.text();
        assert!(text.starts_with('.'));
        assert!(text.ends_with(".\n"));
        assert_eq!(text.matches('\n').count(), 1);
    }

    #[test]
    fn custom_indicator_string() {
        let (console, buffer) = Console::buffer();
        let indicator =
            ProgressIndicator::dots(console, "#".to_string(), Duration::from_millis(10)).unwrap();

        thread::sleep(Duration::from_millis(100));
        indicator.cancel();

        assert!(buffer.text().contains('#'));
        assert!(!buffer.text().contains('.'));
    }

    #[test]
    fn drop_stops_the_ticker() {
        let (console, buffer) = Console::buffer();
        {
            let _indicator =
                ProgressIndicator::dots(console, ".".to_string(), Duration::from_millis(10))
                    .unwrap();
            thread::sleep(Duration::from_millis(50));
        }
        let after_drop = buffer.text();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(buffer.text(), after_drop);
    }

    #[test]
    fn spinner_style_falls_back_to_dots_off_terminal() {
        let (console, buffer) = Console::buffer();
        let config = ProgressConfig {
            style: IndicatorStyle::Spinner,
            interval_ms: 10,
            ..ProgressConfig::default()
        };

        let indicator = ProgressIndicator::attach(&console, &config).unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(indicator.cancel());
        assert!(buffer.text().contains('.'));
    }
}
