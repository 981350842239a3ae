use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner on stderr shown while a metastore request is in flight
///
/// indicatif hides it automatically when stderr is not a terminal, so piped
/// output stays clean.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
