//! Spinner for sync progress.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use webmeta_lib::SyncEvent;

pub(crate) struct SyncSpinner {
    pb: ProgressBar,
}

impl SyncSpinner {
    pub(crate) fn new(quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        pb.set_style(
            ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                .expect("static pattern")
                .tick_chars("/-\\|"),
        );
        pb.set_message("Starting sync...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub(crate) fn handle(&self, event: SyncEvent) {
        match event {
            SyncEvent::Phase(message) => self.pb.set_message(message),
            SyncEvent::Item {
                current,
                total,
                message,
            } => self.pb.set_message(format!("[{current}/{total}] {message}")),
            SyncEvent::Complete(message) => self.pb.println(format!(
                "  {} {}",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                message
            )),
        }
    }

    pub(crate) fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
