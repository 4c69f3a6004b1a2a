//! Spinner for indeterminate operations using indicatif

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} [{elapsed}]";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

/// Create a spinner on stderr
///
/// Hidden when `quiet` is set or stderr is not a terminal, so JSON output
/// and pipes stay clean.
pub fn create_spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if quiet || !console::Term::stderr().is_term() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
        pb.set_style(style.tick_chars(SPINNER_CHARS));
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
