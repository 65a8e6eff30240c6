//! Progress bar driven by sync events

use console::style;
use dirmirror_types::{SyncEvent, SyncObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Observer rendering phase progress with an `indicatif` bar
pub struct ProgressObserver {
    progress_bar: ProgressBar,
}

impl ProgressObserver {
    /// Create an observer; a hidden bar is used when `visible` is false
    pub fn new(visible: bool) -> Self {
        let progress_bar = if visible {
            let pb = ProgressBar::new(0);
            if let Ok(progress_style) = ProgressStyle::default_bar()
                .template("{spinner:.green} {prefix:.bold} [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(progress_style.progress_chars("█▉▊▋▌▍▎▏  "));
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        Self { progress_bar }
    }

    /// Clear the bar once the run is over
    pub fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}

impl SyncObserver for ProgressObserver {
    fn on_event(&self, event: &SyncEvent) {
        let pb = &self.progress_bar;
        match event {
            SyncEvent::PhaseStarted { phase, items } => {
                pb.set_prefix(phase.to_string());
                pb.set_length(*items as u64);
                pb.set_position(0);
            }
            SyncEvent::LocalCopied { path, .. } | SyncEvent::RemoteUploaded { path, .. } => {
                pb.set_message(path.to_string());
            }
            SyncEvent::LocalDeleted { path, .. } | SyncEvent::RemoteRemoved { path, .. } => {
                pb.set_message(path.to_string());
            }
            SyncEvent::StepFailed {
                path,
                step,
                message,
                ..
            } => {
                pb.println(format!(
                    "{} {} failed for {}: {}",
                    style("✗").red().bold(),
                    step,
                    path,
                    message
                ));
            }
            SyncEvent::ItemFinished { .. } | SyncEvent::Planned { .. } => pb.inc(1),
            SyncEvent::Interrupted { phase } => {
                pb.abandon_with_message(format!("interrupted during {}", phase));
            }
            SyncEvent::RunStarted { .. }
            | SyncEvent::PlanReady { .. }
            | SyncEvent::RunFinished { .. } => {}
        }
    }
}
