// Progress indicator for the retention-cleaner CLI.
//
// Reads RetentionStatistics from an async channel and keeps a single
// indicatif line updated with the run counters and a moving-average
// deletion rate.

use std::io;
use std::io::Write;

use async_channel::Receiver;
use indicatif::{HumanCount, HumanDuration, ProgressBar, ProgressStyle};
use retention_cleaner::types::RetentionStatistics;
use simple_moving_average::{SMA, SumTreeSMA};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Totals returned by [`show_indicator`] after the stats channel closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorSummary {
    pub total_scanned_count: u64,
    pub total_candidate_count: u64,
    pub total_delete_count: u64,
    pub total_failed_count: u64,
    pub total_warning_count: u64,
}

impl IndicatorSummary {
    fn apply(&mut self, stats: RetentionStatistics) -> u64 {
        match stats {
            RetentionStatistics::DirectoryScanned => self.total_scanned_count += 1,
            RetentionStatistics::CandidateFound { .. } => self.total_candidate_count += 1,
            RetentionStatistics::DeleteComplete { .. } => {
                self.total_delete_count += 1;
                return 1;
            }
            RetentionStatistics::DeleteFailed { .. } => {
                self.total_failed_count += 1;
                self.total_warning_count += 1;
            }
            RetentionStatistics::WalkWarning { .. } => self.total_warning_count += 1,
        }
        0
    }

    fn format(&self, deletes_per_sec: u64, dry_run: bool) -> String {
        let deleted_label = if dry_run { "would delete" } else { "deleted" };
        format!(
            "scanned {:>3} dirs,  candidates {:>3},  {} {:>3} | {:>3} dirs/sec,  failed {},  warning {}",
            HumanCount(self.total_scanned_count),
            HumanCount(self.total_candidate_count),
            deleted_label,
            HumanCount(self.total_delete_count),
            HumanCount(deletes_per_sec),
            self.total_failed_count,
            self.total_warning_count,
        )
    }
}

/// Moving average window in seconds (samples).
const MOVING_AVERAGE_PERIOD_SECS: usize = 10;

/// How often (in seconds) to refresh the progress display.
const REFRESH_INTERVAL: f32 = 1.0;

/// Spawn a background task that reads retention statistics from the channel
/// and displays progress.
///
/// The task runs until `stats_receiver` is closed and drained. Returns a
/// `JoinHandle` that should be awaited after the pipeline finishes.
pub fn show_indicator(
    stats_receiver: Receiver<RetentionStatistics>,
    show_progress: bool,
    show_result: bool,
    dry_run: bool,
) -> JoinHandle<IndicatorSummary> {
    let progress_text = ProgressBar::new(0);
    if let Ok(progress_style) = ProgressStyle::with_template("{wide_msg}") {
        progress_text.set_style(progress_style);
    }

    tokio::spawn(async move {
        let start_time = Instant::now();

        let mut ma_deleted_count = SumTreeSMA::<_, u64, MOVING_AVERAGE_PERIOD_SECS>::new();
        let mut summary = IndicatorSummary::default();

        loop {
            let mut period_count: u64 = 0;

            let period = Instant::now();
            loop {
                while let Ok(stats) = stats_receiver.try_recv() {
                    period_count += summary.apply(stats);
                }

                if REFRESH_INTERVAL < period.elapsed().as_secs_f32() {
                    break;
                }

                if stats_receiver.is_closed() && stats_receiver.is_empty() {
                    if show_result {
                        let elapsed = start_time.elapsed();
                        let elapsed_secs_f64 = elapsed.as_secs_f64();

                        let mut deletes_per_sec =
                            (summary.total_delete_count as f64 / elapsed_secs_f64) as u64;
                        if elapsed_secs_f64 < REFRESH_INTERVAL as f64 {
                            deletes_per_sec = summary.total_delete_count;
                        }
                        if dry_run {
                            deletes_per_sec = 0;
                        }

                        if let Ok(style) = ProgressStyle::with_template("{msg}") {
                            progress_text.set_style(style);
                        }
                        progress_text.finish_with_message(format!(
                            "{},  duration {}",
                            summary.format(deletes_per_sec, dry_run),
                            HumanDuration(elapsed),
                        ));

                        println!();
                        let _ = io::stdout().flush();
                    }

                    return summary;
                }

                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }

            if !dry_run {
                ma_deleted_count.add_sample(period_count);
            }

            if show_progress {
                progress_text.set_message(summary.format(ma_deleted_count.get_average(), dry_run));
            }
        }
    })
}
