//! Data models for billiards analytics submissions

use serde::{Deserialize, Serialize};

use super::coerce::{parse_cell_bool, parse_cell_num};

/// Column headers for the pinned sheet schema (v3).
///
/// Column order and meaning are frozen for rows written under this
/// version; schema evolution means a new column set, never reinterpreting
/// cells in place. Older, narrower rows read back with missing columns
/// defaulted.
pub const COLUMNS: [&str; 28] = [
    "Timestamp",
    "User ID",
    "Display Name",
    "Device Type",
    "Browser",
    "Screen Size",
    "Timezone",
    "Signed In",
    "Pro User",
    "Promo Code",
    "Total Sessions",
    "Total Time (min)",
    "Tempo Avg Shot (s)",
    "Tempo Total Shots",
    "Tempo Sessions",
    "Velocity Avg MPH",
    "Velocity Max MPH",
    "Velocity Breaks",
    "Vectors Shots",
    "Vectors Avg Power",
    "Vectors Sessions",
    "TrueLevel Calibrations",
    "TrueLevel Tables",
    "Luck Total Flips",
    "Luck Heads",
    "Luck Tails",
    "Luck Sessions",
    "Module Usage",
];

/// One persisted analytics submission. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Server-assigned `%Y-%m-%d %H:%M:%S` UTC timestamp, never client-trusted
    pub timestamp: String,
    /// Anonymous or signed-in identifier; one identity submits many rows
    pub identity: String,
    pub display_name: String,
    pub device_type: String,
    pub browser: String,
    pub screen_size: String,
    pub timezone: String,
    pub signed_in: bool,
    pub pro_user: bool,
    pub promo_code: String,
    pub total_sessions: u64,
    pub total_time_min: f64,
    pub tempo_avg_shot_s: f64,
    pub tempo_total_shots: u64,
    pub tempo_sessions: u64,
    pub velocity_avg_mph: f64,
    pub velocity_max_mph: f64,
    pub velocity_breaks: u64,
    pub vectors_shots: u64,
    pub vectors_avg_power: f64,
    pub vectors_sessions: u64,
    pub truelevel_calibrations: u64,
    pub truelevel_tables: u64,
    pub luck_flips: u64,
    pub luck_heads: u64,
    pub luck_tails: u64,
    pub luck_sessions: u64,
    /// Per-module `{sessions, timeMs}` counters serialized whole
    pub modules_json: String,
}

impl Default for SubmissionRecord {
    fn default() -> Self {
        Self {
            timestamp: String::new(),
            identity: "anonymous".to_string(),
            display_name: String::new(),
            device_type: "unknown".to_string(),
            browser: "unknown".to_string(),
            screen_size: "unknown".to_string(),
            timezone: "unknown".to_string(),
            signed_in: false,
            pro_user: false,
            promo_code: String::new(),
            total_sessions: 0,
            total_time_min: 0.0,
            tempo_avg_shot_s: 0.0,
            tempo_total_shots: 0,
            tempo_sessions: 0,
            velocity_avg_mph: 0.0,
            velocity_max_mph: 0.0,
            velocity_breaks: 0,
            vectors_shots: 0,
            vectors_avg_power: 0.0,
            vectors_sessions: 0,
            truelevel_calibrations: 0,
            truelevel_tables: 0,
            luck_flips: 0,
            luck_heads: 0,
            luck_tails: 0,
            luck_sessions: 0,
            modules_json: "{}".to_string(),
        }
    }
}

impl SubmissionRecord {
    /// Encode as one fixed-width sheet row, in [`COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.identity.clone(),
            self.display_name.clone(),
            self.device_type.clone(),
            self.browser.clone(),
            self.screen_size.clone(),
            self.timezone.clone(),
            self.signed_in.to_string(),
            self.pro_user.to_string(),
            self.promo_code.clone(),
            self.total_sessions.to_string(),
            self.total_time_min.to_string(),
            self.tempo_avg_shot_s.to_string(),
            self.tempo_total_shots.to_string(),
            self.tempo_sessions.to_string(),
            self.velocity_avg_mph.to_string(),
            self.velocity_max_mph.to_string(),
            self.velocity_breaks.to_string(),
            self.vectors_shots.to_string(),
            self.vectors_avg_power.to_string(),
            self.vectors_sessions.to_string(),
            self.truelevel_calibrations.to_string(),
            self.truelevel_tables.to_string(),
            self.luck_flips.to_string(),
            self.luck_heads.to_string(),
            self.luck_tails.to_string(),
            self.luck_sessions.to_string(),
            self.modules_json.clone(),
        ]
    }

    /// Decode a stored row, re-coercing every cell.
    ///
    /// The sheet is the source of truth, not the in-memory type: cells may
    /// have been edited out of band or written under an older, narrower
    /// schema, so missing and malformed cells fall back to field defaults
    /// instead of rejecting the row.
    pub fn from_row(row: &csv::StringRecord) -> Self {
        let cell = |i: usize| row.get(i).unwrap_or("").trim();
        let text = |i: usize, default: &str| {
            let c = cell(i);
            if c.is_empty() {
                default.to_string()
            } else {
                c.to_string()
            }
        };
        let num = |i: usize| parse_cell_num(cell(i));
        let count = |i: usize| num(i).round() as u64;

        let modules_json = {
            let c = cell(27);
            if c.is_empty() {
                "{}".to_string()
            } else {
                c.to_string()
            }
        };

        Self {
            timestamp: cell(0).to_string(),
            identity: text(1, "anonymous"),
            display_name: cell(2).to_string(),
            device_type: text(3, "unknown"),
            browser: text(4, "unknown"),
            screen_size: text(5, "unknown"),
            timezone: text(6, "unknown"),
            signed_in: parse_cell_bool(cell(7)),
            pro_user: parse_cell_bool(cell(8)),
            promo_code: cell(9).to_string(),
            total_sessions: count(10),
            total_time_min: num(11),
            tempo_avg_shot_s: num(12),
            tempo_total_shots: count(13),
            tempo_sessions: count(14),
            velocity_avg_mph: num(15),
            velocity_max_mph: num(16),
            velocity_breaks: count(17),
            vectors_shots: count(18),
            vectors_avg_power: num(19),
            vectors_sessions: count(20),
            truelevel_calibrations: count(21),
            truelevel_tables: count(22),
            luck_flips: count(23),
            luck_heads: count(24),
            luck_tails: count(25),
            luck_sessions: count(26),
            modules_json,
        }
    }
}

/// Aggregate view over every stored submission.
///
/// Recomputed from a full scan on every request; it has no stored
/// identity and no cache. Every ratio field falls back to 0 when there
/// are no records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub count: u64,
    pub unique_users: u64,
    pub total_sessions: u64,
    pub total_time_hours: f64,
    pub avg_shot_time: f64,
    pub avg_break_speed: f64,
    pub max_break_speed: f64,
    pub total_breaks: u64,
    pub total_shots: u64,
    pub total_calibrations: u64,
    pub total_flips: u64,
    pub total_heads: u64,
    pub total_tails: u64,
    pub signed_in_users: u64,
    pub pro_users: u64,
    pub recent_submissions: Vec<RecentSubmission>,
}

/// One entry of the bounded recency view, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSubmission {
    pub timestamp: String,
    /// Redacted to an 8-character prefix for privacy
    pub identity: String,
    pub sessions: u64,
    pub time_min: f64,
}
