//! Ingestion normalizer: untyped client payloads to fixed-width rows
//!
//! A sync payload arrives as flat query-string parameters, a JSON-encoded
//! `data` query parameter, or a JSON request body. All fields are
//! optional and unknown fields are ignored; only a completely unparseable
//! envelope fails the request.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::trace;

use crate::storage::{StoreError, StoreResult};

use super::coerce::{coerce_bool, coerce_identity_str, coerce_num, coerce_str, round_to};
use super::models::SubmissionRecord;

/// One untyped submission payload, keyed by the client field names.
#[derive(Debug, Clone)]
pub struct SubmissionInput {
    fields: Map<String, Value>,
}

impl SubmissionInput {
    /// Build from a decoded JSON body. Anything but an object is a
    /// malformed envelope.
    pub fn from_json(value: Value) -> StoreResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(StoreError::malformed(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Build from a raw JSON body; an empty body counts as an empty
    /// submission, matching the original endpoint.
    pub fn from_json_str(body: &str) -> StoreResult<Self> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(Self { fields: Map::new() });
        }
        let value: Value = serde_json::from_str(body)?;
        Self::from_json(value)
    }

    /// Build from flat query-string parameters.
    ///
    /// The legacy client wrapped the whole payload into one JSON-encoded
    /// `data` parameter; when present that envelope wins, and a `data`
    /// parameter that fails to parse is a hard failure.
    pub fn from_query(params: HashMap<String, String>) -> StoreResult<Self> {
        if let Some(encoded) = params.get("data") {
            let value: Value = serde_json::from_str(encoded)?;
            return Self::from_json(value);
        }

        let fields = params
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Ok(Self { fields })
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Per-module `{sessions, timeMs}` counters, bundled by the client.
    /// Accepts either a nested object or a JSON-encoded string (the query
    /// parameter form). Unusable values degrade to an empty map.
    fn module_usage(&self) -> Map<String, Value> {
        match self.get("modules") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            _ => Map::new(),
        }
    }

    /// Normalize into one fixed-width record with a server-assigned
    /// timestamp. Total, never fails: every field coerces independently.
    pub fn normalize(&self, now: DateTime<Utc>) -> SubmissionRecord {
        let count = |key: &str| coerce_num(self.get(key)).round() as u64;

        // Flat totals first; a non-empty module usage map overrides them
        // with totals derived per module.
        let mut total_sessions = count("totalSessions");
        let mut total_time_min = round_to(coerce_num(self.get("totalTimeMs")) / 60_000.0, 0);

        let modules = self.module_usage();
        if !modules.is_empty() {
            let mut sessions = 0.0;
            let mut time_ms = 0.0;
            for usage in modules.values() {
                sessions += coerce_num(usage.get("sessions"));
                time_ms += coerce_num(usage.get("timeMs"));
            }
            total_sessions = sessions.round() as u64;
            total_time_min = round_to(time_ms / 60_000.0, 1);
        }
        let modules_json =
            serde_json::to_string(&Value::Object(modules)).unwrap_or_else(|_| "{}".to_string());

        trace!("Normalizing submission with {} raw fields", self.fields.len());

        SubmissionRecord {
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            identity: coerce_str(self.get("userId"), "anonymous"),
            display_name: coerce_str(self.get("displayName"), ""),
            device_type: coerce_str(self.get("deviceType"), "unknown"),
            browser: coerce_str(self.get("browser"), "unknown"),
            screen_size: coerce_str(self.get("screenSize"), "unknown"),
            timezone: coerce_identity_str(self.get("timezone"), "unknown"),
            signed_in: coerce_bool(self.get("signedIn")),
            pro_user: coerce_bool(self.get("proUser")),
            promo_code: coerce_str(self.get("promoCode"), ""),
            total_sessions,
            total_time_min,
            tempo_avg_shot_s: coerce_num(self.get("tempoAvgShotTime")),
            tempo_total_shots: count("tempoTotalShots"),
            tempo_sessions: count("tempoSessions"),
            velocity_avg_mph: coerce_num(self.get("velocityAvgSpeed")),
            velocity_max_mph: coerce_num(self.get("velocityMaxSpeed")),
            velocity_breaks: count("velocityBreaks"),
            vectors_shots: count("vectorsShots"),
            vectors_avg_power: coerce_num(self.get("vectorsAvgPower")),
            vectors_sessions: count("vectorsSessions"),
            truelevel_calibrations: count("truelevelCalibrations"),
            truelevel_tables: count("truelevelTables"),
            luck_flips: count("luckFlips"),
            luck_heads: count("luckHeads"),
            luck_tails: count("luckTails"),
            luck_sessions: count("luckSessions"),
            modules_json,
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, 12, 30, 0).unwrap()
    }

    #[test]
    fn empty_submission_gets_all_defaults() {
        let input = SubmissionInput::from_json_str("").unwrap();
        let record = input.normalize(at());

        assert_eq!(record.timestamp, "2026-08-29 12:30:00");
        assert_eq!(record, SubmissionRecord {
            timestamp: "2026-08-29 12:30:00".to_string(),
            ..Default::default()
        });
    }

    #[test]
    fn flat_json_body_is_coerced() {
        let input = SubmissionInput::from_json(json!({
            "userId": "player-000042",
            "deviceType": "tablet",
            "signedIn": "true",
            "proUser": false,
            "totalSessions": "7",
            "totalTimeMs": 120000,
            "tempoAvgShotTime": 4.2,
            "tempoTotalShots": 100,
            "velocityMaxSpeed": "26.3",
            "somethingUnknown": {"ignored": true}
        }))
        .unwrap();
        let record = input.normalize(at());

        assert_eq!(record.identity, "player-000042");
        assert_eq!(record.device_type, "tablet");
        assert!(record.signed_in);
        assert!(!record.pro_user);
        assert_eq!(record.total_sessions, 7);
        assert_eq!(record.total_time_min, 2.0);
        assert_eq!(record.tempo_avg_shot_s, 4.2);
        assert_eq!(record.tempo_total_shots, 100);
        assert_eq!(record.velocity_max_mph, 26.3);
    }

    #[test]
    fn query_params_are_all_strings() {
        let mut params = HashMap::new();
        params.insert("userId".to_string(), "player-1".to_string());
        params.insert("luckFlips".to_string(), "12".to_string());
        params.insert("luckHeads".to_string(), "not-a-number".to_string());
        params.insert("timezone".to_string(), "undefined".to_string());

        let record = SubmissionInput::from_query(params).unwrap().normalize(at());
        assert_eq!(record.identity, "player-1");
        assert_eq!(record.luck_flips, 12);
        assert_eq!(record.luck_heads, 0);
        assert_eq!(record.timezone, "unknown");
    }

    #[test]
    fn data_envelope_is_decoded() {
        let mut params = HashMap::new();
        params.insert(
            "data".to_string(),
            r#"{"userId":"player-2","totalSessions":3}"#.to_string(),
        );

        let record = SubmissionInput::from_query(params).unwrap().normalize(at());
        assert_eq!(record.identity, "player-2");
        assert_eq!(record.total_sessions, 3);
    }

    #[test]
    fn malformed_envelopes_are_hard_failures() {
        assert!(SubmissionInput::from_json_str("{not json").is_err());
        assert!(SubmissionInput::from_json(json!([1, 2, 3])).is_err());

        let mut params = HashMap::new();
        params.insert("data".to_string(), "{broken".to_string());
        assert!(SubmissionInput::from_query(params).is_err());
    }

    #[test]
    fn module_usage_map_derives_totals() {
        let input = SubmissionInput::from_json(json!({
            "totalSessions": 99,
            "totalTimeMs": 999999,
            "modules": {
                "tempo": {"sessions": 3, "timeMs": 90000},
                "velocity": {"sessions": 2, "timeMs": 45000},
                "luck": {"sessions": "1", "timeMs": "junk"}
            }
        }))
        .unwrap();
        let record = input.normalize(at());

        // Derived totals override the flat fields.
        assert_eq!(record.total_sessions, 6);
        assert_eq!(record.total_time_min, 2.3); // 135000ms / 60000, 1 dp
        let parsed: Value = serde_json::from_str(&record.modules_json).unwrap();
        assert_eq!(parsed["tempo"]["sessions"], 3);
    }

    #[test]
    fn module_usage_accepts_encoded_string() {
        let mut params = HashMap::new();
        params.insert(
            "modules".to_string(),
            r#"{"tempo":{"sessions":2,"timeMs":60000}}"#.to_string(),
        );

        let record = SubmissionInput::from_query(params).unwrap().normalize(at());
        assert_eq!(record.total_sessions, 2);
        assert_eq!(record.total_time_min, 1.0);
    }

    #[test]
    fn flat_time_rounds_to_whole_minutes() {
        let input = SubmissionInput::from_json(json!({"totalTimeMs": 95000})).unwrap();
        assert_eq!(input.normalize(at()).total_time_min, 2.0);
    }
}
