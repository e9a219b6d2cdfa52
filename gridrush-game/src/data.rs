//! External feed payloads and lenient normalization.
//!
//! The excluded fetch layer hands the core three JSON payloads (map, jobs,
//! weather) already parsed into generic structures. The upstream feed is
//! unreliable: coordinates arrive as array pairs, objects under several key
//! conventions, or delimited strings, and deadlines arrive as ISO-8601
//! strings or bare second offsets. Normalization degrades malformed fields
//! to safe defaults instead of aborting initialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::grid::Coord;
use crate::job::Job;

/// Map payload: clock bounds and the money goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MapData {
    /// ISO-8601 opening time of the map day.
    #[serde(default)]
    pub start_time: Option<String>,
    /// Total game duration in simulated seconds.
    #[serde(default)]
    pub max_time: f64,
    /// Money target to win.
    #[serde(default)]
    pub goal: f64,
}

impl MapData {
    /// Parse this payload from a JSON string. Malformed JSON yields the
    /// all-default payload rather than an error.
    #[must_use]
    pub fn from_json(json_str: &str) -> Self {
        serde_json::from_str(json_str).unwrap_or_default()
    }

    /// The map start as an absolute UTC instant, when present and valid.
    #[must_use]
    pub fn parsed_start(&self) -> Option<DateTime<Utc>> {
        let raw = self.start_time.as_deref()?;
        parse_utc_timestamp(raw)
    }
}

/// One raw job record from the feed. Heterogeneous fields stay as
/// `serde_json::Value` until [`RawJob::normalize`] runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawJob {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub pickup: Value,
    #[serde(default)]
    pub dropoff: Value,
    #[serde(default)]
    pub payout: Value,
    #[serde(default)]
    pub priority: Value,
    #[serde(default)]
    pub weight: Value,
    #[serde(default)]
    pub release_time: Value,
    #[serde(default)]
    pub deadline: Value,
}

impl RawJob {
    /// Normalize into a typed [`Job`]. Returns `None` only when the record
    /// carries no usable id; every other malformed field falls back to a
    /// safe default.
    #[must_use]
    pub fn normalize(&self, map_start: Option<DateTime<Utc>>) -> Option<Job> {
        let id = self.id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let mut job = Job::new(id, parse_coord(&self.pickup), parse_coord(&self.dropoff));
        job.payout = value_to_f64(&self.payout).max(0.0);
        job.weight = value_to_f64(&self.weight).max(0.0);
        job.priority = value_to_i32(&self.priority);
        job.release_time = value_to_f64(&self.release_time).max(0.0);
        job.deadline = parse_deadline(&self.deadline, map_start);
        Some(job)
    }
}

/// Weather payload: optional transition matrix and scripted bursts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WeatherData {
    /// condition -> (condition -> probability weight)
    #[serde(default)]
    pub transitions: HashMap<String, HashMap<String, f64>>,
    #[serde(default)]
    pub bursts: Vec<BurstDef>,
}

/// A scripted weather segment, queued ahead of Markov sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstDef {
    pub condition: String,
    #[serde(default)]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl WeatherData {
    #[must_use]
    pub fn from_json(json_str: &str) -> Self {
        serde_json::from_str(json_str).unwrap_or_default()
    }
}

/// Everything the excluded fetch layer supplies for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorldData {
    #[serde(default)]
    pub map: MapData,
    #[serde(default)]
    pub jobs: Vec<RawJob>,
    #[serde(default)]
    pub weather: WeatherData,
}

impl WorldData {
    #[must_use]
    pub fn from_json(json_str: &str) -> Self {
        serde_json::from_str(json_str).unwrap_or_default()
    }
}

/// Normalize a heterogeneous coordinate value into an integer grid cell.
///
/// Accepted shapes: `[x, y]` arrays, objects under the `x`/`y`, `col`/`row`,
/// or `cx`/`cy` conventions, and `"x,y"` delimited strings. Anything else
/// lands on `(0, 0)` — a deliberate lenient-parsing policy for the
/// unreliable upstream feed, not a silent bug.
#[must_use]
pub fn parse_coord(value: &Value) -> Coord {
    match value {
        Value::Array(items) if items.len() >= 2 => Coord::new(
            value_to_cell(items.first()),
            value_to_cell(items.get(1)),
        ),
        Value::Object(map) => {
            for (kx, ky) in [("x", "y"), ("col", "row"), ("cx", "cy")] {
                if map.contains_key(kx) || map.contains_key(ky) {
                    return Coord::new(value_to_cell(map.get(kx)), value_to_cell(map.get(ky)));
                }
            }
            Coord::default()
        }
        Value::String(s) => parse_coord_string(s),
        _ => Coord::default(),
    }
}

fn parse_coord_string(raw: &str) -> Coord {
    let mut parts = raw.split([',', ';']).map(str::trim);
    let x = parts.next().and_then(|p| p.parse::<f64>().ok());
    let y = parts.next().and_then(|p| p.parse::<f64>().ok());
    match (x, y) {
        (Some(x), Some(y)) => Coord::new(f64_to_cell(x), f64_to_cell(y)),
        _ => Coord::default(),
    }
}

fn value_to_cell(value: Option<&Value>) -> i64 {
    value.map_or(0, |v| f64_to_cell(value_to_f64(v)))
}

#[allow(clippy::cast_possible_truncation)]
fn f64_to_cell(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}

/// Coerce a feed value into f64, defaulting to 0.0. Numeric strings count.
#[must_use]
pub fn value_to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Coerce a feed value into i32, defaulting to 0.
#[must_use]
pub fn value_to_i32(value: &Value) -> i32 {
    crate::numbers::round_f64_to_i32(value_to_f64(value))
}

/// Parse a deadline into seconds from map start.
///
/// Numbers (and numeric strings) are bare second offsets; other strings are
/// tried as ISO-8601 instants and converted relative to `map_start`. Absent
/// or unusable values mean "no deadline".
#[must_use]
pub fn parse_deadline(value: &Value, map_start: Option<DateTime<Utc>>) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(offset) = trimmed.parse::<f64>() {
                return offset.is_finite().then_some(offset);
            }
            let instant = parse_utc_timestamp(trimmed)?;
            let start = map_start?;
            let millis = (instant - start).num_milliseconds();
            Some(crate::numbers::i64_to_f64(millis) / 1000.0)
        }
        _ => None,
    }
}

fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coord_accepts_array_object_and_string_shapes() {
        assert_eq!(parse_coord(&json!([4, 7])), Coord::new(4, 7));
        assert_eq!(parse_coord(&json!([4.9, -2.1])), Coord::new(4, -2));
        assert_eq!(parse_coord(&json!({"x": 3, "y": 5})), Coord::new(3, 5));
        assert_eq!(parse_coord(&json!({"col": 2, "row": 8})), Coord::new(2, 8));
        assert_eq!(parse_coord(&json!({"cx": 1, "cy": 1})), Coord::new(1, 1));
        assert_eq!(parse_coord(&json!("6, 9")), Coord::new(6, 9));
        assert_eq!(parse_coord(&json!("6;9")), Coord::new(6, 9));
    }

    #[test]
    fn coord_defaults_on_garbage() {
        assert_eq!(parse_coord(&json!(null)), Coord::default());
        assert_eq!(parse_coord(&json!("nowhere")), Coord::default());
        assert_eq!(parse_coord(&json!({"lat": 1.0})), Coord::default());
        assert_eq!(parse_coord(&json!([1])), Coord::default());
    }

    #[test]
    fn deadline_accepts_both_feed_formats() {
        let start = DateTime::parse_from_rfc3339("2024-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_deadline(&json!(600), Some(start)), Some(600.0));
        assert_eq!(parse_deadline(&json!("450"), Some(start)), Some(450.0));
        assert_eq!(
            parse_deadline(&json!("2024-03-01T08:10:00Z"), Some(start)),
            Some(600.0)
        );
        assert_eq!(parse_deadline(&json!(null), Some(start)), None);
        // ISO deadline without a map start cannot be anchored.
        assert_eq!(parse_deadline(&json!("2024-03-01T08:10:00Z"), None), None);
    }

    #[test]
    fn raw_job_normalizes_with_defaults() {
        let raw: RawJob = serde_json::from_value(json!({
            "id": "J1",
            "pickup": [1, 1],
            "dropoff": {"x": 3, "y": 3},
            "payout": "125.5",
            "priority": 2,
            "weight": -4.0,
            "release_time": "30",
            "deadline": 600
        }))
        .unwrap();
        let job = raw.normalize(None).unwrap();
        assert_eq!(job.pickup, Coord::new(1, 1));
        assert_eq!(job.dropoff, Coord::new(3, 3));
        assert!((job.payout - 125.5).abs() < f64::EPSILON);
        assert!(job.weight.abs() < f64::EPSILON, "negative weight clamps to 0");
        assert_eq!(job.priority, 2);
        assert!((job.release_time - 30.0).abs() < f64::EPSILON);
        assert_eq!(job.deadline, Some(600.0));
    }

    #[test]
    fn raw_job_without_id_is_skipped() {
        let raw = RawJob::default();
        assert!(raw.normalize(None).is_none());
        let blank: RawJob = serde_json::from_value(json!({"id": "  "})).unwrap();
        assert!(blank.normalize(None).is_none());
    }

    #[test]
    fn world_payload_survives_malformed_json() {
        let world = WorldData::from_json("{not json");
        assert!(world.jobs.is_empty());
        let world = WorldData::from_json(r#"{"map": {"max_time": 900, "goal": 500}}"#);
        assert!((world.map.max_time - 900.0).abs() < f64::EPSILON);
        assert!((world.map.goal - 500.0).abs() < f64::EPSILON);
    }
}
