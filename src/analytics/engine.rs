//! Summary engine reducing the full sheet into aggregate statistics

use std::collections::HashSet;
use tracing::debug;

use super::coerce::{redact_identity, round_to};
use super::models::{RecentSubmission, SubmissionRecord, Summary};

/// Reduces persisted submissions into a [`Summary`].
///
/// Pure over its input: the same records always produce the same
/// summary, and an empty sheet produces the zeroed default without any
/// division.
pub struct AnalyticsEngine {
    recent_limit: usize,
}

impl AnalyticsEngine {
    /// Create an engine with the given recency-view size.
    pub fn new(recent_limit: usize) -> Self {
        Self { recent_limit }
    }

    /// Compute the aggregate summary over all records, oldest first.
    pub fn summarize(&self, records: &[SubmissionRecord]) -> Summary {
        let mut summary = Summary {
            count: records.len() as u64,
            ..Default::default()
        };

        let mut identities: HashSet<&str> = HashSet::new();
        let mut total_time_min = 0.0;

        // Per-record averages carry unequal sample sizes, so combining
        // them is a weighted sum over the per-record counts. An
        // unweighted mean of means would overweight small records.
        let mut shot_time_num = 0.0;
        let mut shot_time_den = 0.0;
        let mut break_speed_num = 0.0;
        let mut break_speed_den = 0.0;

        for record in records {
            identities.insert(record.identity.as_str());

            summary.total_sessions += record.total_sessions;
            total_time_min += record.total_time_min;
            summary.total_shots += record.tempo_total_shots;
            summary.total_breaks += record.velocity_breaks;
            summary.total_calibrations += record.truelevel_calibrations;
            summary.total_flips += record.luck_flips;
            summary.total_heads += record.luck_heads;
            summary.total_tails += record.luck_tails;

            shot_time_num += record.tempo_avg_shot_s * record.tempo_total_shots as f64;
            shot_time_den += record.tempo_total_shots as f64;
            break_speed_num += record.velocity_avg_mph * record.velocity_breaks as f64;
            break_speed_den += record.velocity_breaks as f64;

            summary.max_break_speed = summary.max_break_speed.max(record.velocity_max_mph);

            if record.signed_in {
                summary.signed_in_users += 1;
            }
            if record.pro_user {
                summary.pro_users += 1;
            }
        }

        summary.unique_users = identities.len() as u64;
        summary.total_time_hours = round_to(total_time_min / 60.0, 1);
        summary.avg_shot_time = weighted(shot_time_num, shot_time_den, 2);
        summary.avg_break_speed = weighted(break_speed_num, break_speed_den, 1);
        summary.max_break_speed = round_to(summary.max_break_speed.max(0.0), 1);

        summary.recent_submissions = records
            .iter()
            .rev()
            .take(self.recent_limit)
            .map(|record| RecentSubmission {
                timestamp: record.timestamp.clone(),
                identity: redact_identity(&record.identity),
                sessions: record.total_sessions,
                time_min: record.total_time_min,
            })
            .collect();

        debug!(
            "Summarized {} records from {} unique users",
            summary.count, summary.unique_users
        );
        summary
    }
}

fn weighted(numerator: f64, denominator: f64, places: u32) -> f64 {
    if denominator > 0.0 {
        round_to(numerator / denominator, places)
    } else {
        0.0
    }
}
