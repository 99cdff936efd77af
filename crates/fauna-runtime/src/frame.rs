//! Serialisable observation snapshot.
//!
//! [`ObservationFrame`] bundles every observation output of one tick so it
//! can be dumped as JSON or handed across a process boundary. Its JSON
//! schema is generated with `schemars` so consumers can validate payloads.

use fauna_types::{FaunaError, Point3};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObservationFrame {
    /// Simulation time (seconds).
    pub timestamp: f32,
    pub position: Point3,
    pub yaw: f32,
    pub live_entries: usize,
    /// One 17-column row per live index entry.
    pub table: Vec<Vec<f32>>,
    /// `recency_slots × 5` values.
    pub recency: Vec<f32>,
    /// `focus_slots × 3` values.
    pub focus: Vec<f32>,
    /// `[found, distance, bearing / π]`.
    pub closest_food: [f32; 3],
    pub closest_threat: [f32; 3],
}

impl ObservationFrame {
    /// Single-line JSON encoding.
    ///
    /// # Errors
    ///
    /// [`FaunaError::Serialization`] if encoding fails (non-finite values
    /// are written as `null`, so this is not expected in practice).
    pub fn to_json(&self) -> Result<String, FaunaError> {
        serde_json::to_string(self).map_err(|e| FaunaError::Serialization(e.to_string()))
    }

    /// Pretty-printed JSON schema of the frame.
    ///
    /// # Errors
    ///
    /// [`FaunaError::Serialization`] if the schema cannot be encoded.
    pub fn json_schema() -> Result<String, FaunaError> {
        let schema = schemars::schema_for!(ObservationFrame);
        serde_json::to_string_pretty(&schema).map_err(|e| FaunaError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> ObservationFrame {
        ObservationFrame {
            timestamp: 1.5,
            position: Point3::new(1.0, 0.0, 2.0),
            yaw: 0.0,
            live_entries: 0,
            table: Vec::new(),
            recency: vec![0.0; 20],
            focus: vec![0.0; 24],
            closest_food: [0.0; 3],
            closest_threat: [0.0; 3],
        }
    }

    #[test]
    fn json_round_trip() {
        let json = frame().to_json().unwrap();
        let back: ObservationFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame());
    }

    #[test]
    fn schema_names_every_field() {
        let schema = ObservationFrame::json_schema().unwrap();
        for field in ["timestamp", "table", "recency", "focus", "closest_food", "closest_threat"] {
            assert!(schema.contains(field), "schema is missing {field}");
        }
    }
}
