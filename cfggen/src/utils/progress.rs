// SPDX-License-Identifier: MIT

use indicatif::{ProgressBar, ProgressStyle};

/// Byte progress bar for one partition copy; hidden when `visible` is false.
pub fn copy_progress(total_size: u64, message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total_size);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.white}] {bytes}/{total_bytes} (ETA {eta_precise}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░░");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}
