// src/types/work_session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::application::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkBreak {
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: RecordId,
    pub application_id: RecordId,
    pub clock_in_time: DateTime<Utc>,
    #[serde(default)]
    pub clock_out_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_hours: Option<f64>,
    #[serde(default)]
    pub total_earnings: Option<f64>,
    #[serde(default)]
    pub is_within_geofence: Option<bool>,
    #[serde(default)]
    pub breaks: Vec<WorkBreak>,
}

impl WorkSession {
    pub fn is_open(&self) -> bool {
        self.clock_out_time.is_none()
    }

    pub fn open_break(&self) -> Option<&WorkBreak> {
        self.breaks.iter().find(|b| b.end_time.is_none())
    }

    pub fn is_on_break(&self) -> bool {
        self.open_break().is_some()
    }
}

// ===== Clock in / out payloads =====

#[derive(Debug, Clone, Serialize)]
pub struct ClockInRequest {
    pub application_id: RecordId,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockInResponse {
    #[serde(default)]
    pub session: Option<WorkSession>,
    /// `None` when the server did not evaluate the geofence.
    #[serde(default)]
    pub is_within_geofence: Option<bool>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClockOutRequest {
    pub session_id: RecordId,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockOutResponse {
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default)]
    pub total_earnings: f64,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_break_state() {
        let json = r#"{
            "id": 7,
            "application_id": 42,
            "clock_in_time": "2024-03-05T08:45:00Z",
            "breaks": [
                {"start_time": "2024-03-05T10:00:00Z", "end_time": "2024-03-05T10:15:00Z"},
                {"start_time": "2024-03-05T12:00:00Z"}
            ]
        }"#;
        let session: WorkSession = serde_json::from_str(json).unwrap();
        assert!(session.is_open());
        assert!(session.is_on_break());
        assert_eq!(session.application_id.as_str(), "42");
    }

    #[test]
    fn test_clock_in_response_defaults() {
        let response: ClockInResponse =
            serde_json::from_str(r#"{"message": "Clocked in"}"#).unwrap();
        assert!(response.session.is_none());
        assert_eq!(response.is_within_geofence, None);

        let flagged: ClockInResponse =
            serde_json::from_str(r#"{"is_within_geofence": false, "message": ""}"#).unwrap();
        assert_eq!(flagged.is_within_geofence, Some(false));
        assert_eq!(response.message, "Clocked in");
    }
}
