//! Download progress rendering.

use indicatif::{ProgressBar, ProgressStyle};
use jdkfetch::{DownloadProgress, ProgressCallback};
use std::sync::Arc;

const BAR_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner} {msg} {bytes} ({bytes_per_sec})";

/// Progress bar on stderr driven by download events.
pub fn download_bar() -> ProgressCallback {
    let bar = ProgressBar::hidden();
    bar.set_message("Downloading JDK");

    Arc::new(move |event: DownloadProgress| match event {
        DownloadProgress::Started { total } => {
            bar.reset();
            bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            if let Some(total) = total {
                bar.set_length(total);
                if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                    bar.set_style(style.progress_chars("=> "));
                }
            } else if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE)
            {
                bar.set_style(style);
            }
        }
        DownloadProgress::Advanced { downloaded } => bar.set_position(downloaded),
        DownloadProgress::Finished { .. } => bar.finish_with_message("Download complete"),
    })
}
