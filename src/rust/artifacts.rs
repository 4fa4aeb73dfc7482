//! On-disk artifacts exchanged between the ingestion and scoring stages.
//!
//! ```text
//!  ingestion ──► result.json              ──► scoring ──► scores.json
//!            └─► ingestion_duration.json ──┘
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

pub const RESULT_FILE: &str = "result.json";
pub const DURATION_FILE: &str = "ingestion_duration.json";
pub const SCORES_FILE: &str = "scores.json";

/// Mapping from grain id to predicted variety.
pub type PredictionMap = BTreeMap<String, i64>;

/// Contents of `result.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResult {
    #[serde(default, deserialize_with = "deserialize_variety_map")]
    pub predictions: PredictionMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub num_predictions: usize,
}

impl IngestionResult {
    pub fn new(predictions: PredictionMap) -> Self {
        let num_predictions = predictions.len();
        Self {
            predictions,
            num_predictions,
        }
    }
}

/// Contents of `ingestion_duration.json`, in whole minutes.
///
/// Fractional minutes written by other tools are floored on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionDuration {
    #[serde(default, deserialize_with = "deserialize_minutes")]
    pub ingestion_duration: Option<u64>,
}

/// Contents of `scores.json`. The `score` key is the leaderboard column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score: f64,
    pub correct: u64,
    pub total: u64,
    pub accuracy_percent: f64,
}

impl ScoreRecord {
    /// Record for a run that could not be scored.
    pub fn zero() -> Self {
        Self {
            score: 0.0,
            correct: 0,
            total: 0,
            accuracy_percent: 0.0,
        }
    }
}

/// Coerces a variety label to an integer.
///
/// Strings must hold an integral value; fractional strings are rejected.
///
/// Accepts plain integers as well as integral floats such as `"3.0"`, which is
/// what spreadsheet exports tend to produce.
pub fn coerce_variety(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Some(value as i64),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVariety {
    Int(i64),
    Float(f64),
    Text(String),
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Numeric predictions are truncated towards zero, so `3.7` scores as `3`.
fn deserialize_variety_map<'de, D>(deserializer: D) -> std::result::Result<PredictionMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, RawVariety> = null_as_default(deserializer)?;
    raw.into_iter()
        .map(|(grain_id, value)| {
            let variety = match &value {
                RawVariety::Int(v) => Some(*v),
                RawVariety::Float(v) if v.is_finite() => Some(v.trunc() as i64),
                RawVariety::Float(_) => None,
                RawVariety::Text(s) => coerce_variety(s),
            };
            variety.map(|v| (grain_id.clone(), v)).ok_or_else(|| {
                serde::de::Error::custom(format!("prediction for grain '{}' is not an integer", grain_id))
            })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMinutes {
    Whole(u64),
    Fractional(f64),
}

fn deserialize_minutes<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawMinutes> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawMinutes::Whole(minutes)) => Some(minutes),
        Some(RawMinutes::Fractional(minutes)) if minutes.is_finite() && minutes >= 0.0 => Some(minutes.floor() as u64),
        _ => None,
    })
}

/// Serializes `value` with four-space indentation and writes it to `dir/file_name`,
/// creating `dir` if needed.
pub fn write_json<T: Serialize>(dir: &Path, file_name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;

    fs::write(&path, buf)?;
    Ok(path)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_variety() {
        assert_eq!(coerce_variety("4"), Some(4));
        assert_eq!(coerce_variety(" 7 "), Some(7));
        assert_eq!(coerce_variety("3.0"), Some(3));
        assert_eq!(coerce_variety("3.5"), None);
        assert_eq!(coerce_variety("wheat"), None);
    }

    #[test]
    fn test_predictions_accept_loose_numbers() {
        let json = r#"{"predictions": {"1": 2, "3": 4.0, "5": "6"}, "num_predictions": 3}"#;
        let result: IngestionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.predictions["1"], 2);
        assert_eq!(result.predictions["3"], 4);
        assert_eq!(result.predictions["5"], 6);
    }

    #[test]
    fn test_fractional_predictions_truncate() {
        let json = r#"{"predictions": {"1": 2.5, "2": 3.7}, "num_predictions": 2}"#;
        let result: IngestionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.predictions["1"], 2);
        assert_eq!(result.predictions["2"], 3);
    }

    #[test]
    fn test_predictions_reject_fractional_strings() {
        let json = r#"{"predictions": {"1": "2.5"}}"#;
        assert!(serde_json::from_str::<IngestionResult>(json).is_err());
    }

    #[test]
    fn test_null_fields_default_to_empty() {
        let json = r#"{"predictions": null, "num_predictions": null}"#;
        let result: IngestionResult = serde_json::from_str(json).unwrap();
        assert!(result.predictions.is_empty());
        assert_eq!(result.num_predictions, 0);
    }

    #[test]
    fn test_duration_accepts_any_number() {
        let parse = |json: &str| serde_json::from_str::<IngestionDuration>(json).unwrap().ingestion_duration;
        assert_eq!(parse(r#"{"ingestion_duration": 4}"#), Some(4));
        assert_eq!(parse(r#"{"ingestion_duration": 0.5}"#), Some(0));
        assert_eq!(parse(r#"{"ingestion_duration": 2.9}"#), Some(2));
        assert_eq!(parse(r#"{"ingestion_duration": -1.5}"#), None);
        assert_eq!(parse(r#"{"ingestion_duration": null}"#), None);
        assert_eq!(parse("{}"), None);
    }

    #[test]
    fn test_missing_predictions_key_defaults_to_empty() {
        let result: IngestionResult = serde_json::from_str("{}").unwrap();
        assert!(result.predictions.is_empty());
        assert_eq!(result.num_predictions, 0);
    }

    #[test]
    fn test_write_json_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), DURATION_FILE, &IngestionDuration { ingestion_duration: Some(3) }).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, "{\n    \"ingestion_duration\": 3\n}");
    }
}
