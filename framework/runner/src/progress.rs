use std::cmp::min;
use std::fmt::Write;
use std::time::{Duration, Instant};

use gust_core::prelude::ShutdownListener;
use indicatif::{ProgressBar, ProgressState, ProgressStyle};

/// Displays a progress bar spanning the script's planned load time so the
/// operator can see how far through the run the worker is.
pub fn start_progress(planned: Duration, mut shutdown: ShutdownListener) {
    std::thread::Builder::new()
        .name("progress".to_string())
        .spawn(move || {
            let started = Instant::now();
            let bar = ProgressBar::new(planned.as_secs());
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {planned}]",
                )
                .expect("Failed to set progress style")
                .with_key("planned", {
                    let hours = planned.as_secs() / 3600;
                    let minutes = (planned.as_secs() % 3600) / 60;
                    let seconds = planned.as_secs() % 60;
                    move |_state: &ProgressState, w: &mut dyn Write| {
                        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
                            .expect("Could not write the planned duration")
                    }
                })
                .progress_chars("#>-"),
            );

            loop {
                if shutdown.is_triggered() {
                    log::trace!("Progress thread shutting down");
                    bar.finish_and_clear();
                    break;
                }

                bar.set_position(min(started.elapsed().as_secs(), planned.as_secs()));
                std::thread::sleep(Duration::from_secs(1));
            }
        })
        .expect("Failed to start progress thread");
}
