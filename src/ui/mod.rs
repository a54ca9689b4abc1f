//! Terminal output used by the runner itself.
//!
//! Child processes write to the inherited streams directly; everything the
//! runner prints on its own behalf (echoed commands, failure reports, the
//! progress indicator) goes through a [`Console`].

pub mod console;
pub mod progress;

pub use console::Console;
pub use progress::{IndicatorStyle, ProgressIndicator};
