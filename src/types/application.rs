// src/types/application.rs
//! Application records as returned by the marketplace API

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::lifecycle::rules;

// ===== Identifiers =====

/// Opaque server-assigned identifier. The API emits either integers or
/// strings depending on the resource, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => RecordId(n.to_string()),
            RawId::Text(s) => RecordId(s),
        })
    }
}

// ===== Status =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Shortlisted,
    Accepted,
    ContractSent,
    ContractAcknowledged,
    Active,
    Completed,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    /// Pipeline order, excluding the absorbing states.
    pub const PIPELINE: [ApplicationStatus; 8] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Accepted,
        ApplicationStatus::ContractSent,
        ApplicationStatus::ContractAcknowledged,
        ApplicationStatus::Active,
        ApplicationStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::ContractSent => "contract_sent",
            ApplicationStatus::ContractAcknowledged => "contract_acknowledged",
            ApplicationStatus::Active => "active",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// Human readable label used by list output.
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Reviewed => "Reviewed",
            ApplicationStatus::Shortlisted => "Shortlisted",
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::ContractSent => "Contract sent",
            ApplicationStatus::ContractAcknowledged => "Contract acknowledged",
            ApplicationStatus::Active => "Active",
            ApplicationStatus::Completed => "Completed",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Withdrawn => "Withdrawn",
        }
    }

    /// Position along the pipeline. `None` for `rejected` and `withdrawn`.
    pub fn pipeline_rank(&self) -> Option<usize> {
        Self::PIPELINE.iter().position(|s| s == self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Completed | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "reviewed" => Ok(ApplicationStatus::Reviewed),
            "shortlisted" => Ok(ApplicationStatus::Shortlisted),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "contract_sent" => Ok(ApplicationStatus::ContractSent),
            "contract_acknowledged" => Ok(ApplicationStatus::ContractAcknowledged),
            "active" => Ok(ApplicationStatus::Active),
            "completed" => Ok(ApplicationStatus::Completed),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "withdrawn" => Ok(ApplicationStatus::Withdrawn),
            other => Err(format!("Unknown application status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    #[default]
    Apply,
    Bid,
}

/// Sub-phase of the contract step, computed from auxiliary fields because
/// the server only reports `contract_sent` for both halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractPhase {
    NotSent,
    AwaitingSignature,
    AwaitingVerification,
    Acknowledged,
    Closed,
}

impl ContractPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ContractPhase::NotSent => "no contract yet",
            ContractPhase::AwaitingSignature => "awaiting signature",
            ContractPhase::AwaitingVerification => "awaiting verification",
            ContractPhase::Acknowledged => "contract acknowledged",
            ContractPhase::Closed => "closed",
        }
    }
}

// ===== Contract and shift =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftDetails {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// `HH:MM` or `HH:MM:SS`
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

// ===== Application =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: RecordId,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub application_type: ApplicationType,
    #[serde(default)]
    pub proposed_rate: Option<f64>,
    #[serde(default)]
    pub contract_terms: Option<ContractTerms>,
    #[serde(default)]
    pub seeker_signature: Option<String>,
    #[serde(default)]
    pub seeker_signed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub employer_verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shift_details: Option<ShiftDetails>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub job_id: Option<RecordId>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub applicant_name: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
}

impl Application {
    pub fn contract_phase(&self) -> ContractPhase {
        rules::contract_phase(self)
    }

    /// Title shown in lists, falling back to the contract terms.
    pub fn display_title(&self) -> String {
        self.job_title
            .clone()
            .or_else(|| self.contract_terms.as_ref().and_then(|t| t.job_title.clone()))
            .unwrap_or_else(|| format!("Application {}", self.id))
    }

    pub fn is_bid(&self) -> bool {
        self.application_type == ApplicationType::Bid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in ApplicationStatus::PIPELINE {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
        assert_eq!(
            "WITHDRAWN".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::Withdrawn)
        );
        assert!("hired".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_pipeline_rank() {
        assert_eq!(ApplicationStatus::Pending.pipeline_rank(), Some(0));
        assert_eq!(ApplicationStatus::Completed.pipeline_rank(), Some(7));
        assert_eq!(ApplicationStatus::Rejected.pipeline_rank(), None);
        assert_eq!(ApplicationStatus::Withdrawn.pipeline_rank(), None);
    }

    #[test]
    fn test_deserialize_application_with_numeric_id() {
        let json = r#"{
            "id": 42,
            "status": "contract_sent",
            "application_type": "bid",
            "proposed_rate": 21.5,
            "created_at": "2024-03-01T10:00:00Z",
            "seeker_signed_at": "2024-03-02T09:00:00Z",
            "shift_details": {"date": "2024-03-05", "start_time": "09:00", "end_time": "17:00"},
            "job_title": "Warehouse associate"
        }"#;

        let app: Application = serde_json::from_str(json).unwrap();
        assert_eq!(app.id.as_str(), "42");
        assert_eq!(app.status, ApplicationStatus::ContractSent);
        assert!(app.is_bid());
        assert_eq!(app.proposed_rate, Some(21.5));
        assert_eq!(
            app.shift_details.unwrap().date,
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert!(app.employer_verified_at.is_none());
    }

    #[test]
    fn test_display_title_falls_back_to_contract_terms() {
        let json = r#"{
            "id": "abc",
            "status": "accepted",
            "created_at": "2024-03-01T10:00:00Z",
            "contract_terms": {"job_title": "Barista"}
        }"#;
        let app: Application = serde_json::from_str(json).unwrap();
        assert_eq!(app.display_title(), "Barista");
        assert_eq!(app.application_type, ApplicationType::Apply);
    }
}
