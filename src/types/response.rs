// src/types/response.rs
use serde::{Deserialize, Serialize};

use crate::types::application::{Application, ApplicationStatus, ContractTerms};

// ===== Auth =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Refresh endpoints may or may not rotate the refresh token.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

// ===== Lists =====

/// List endpoints return either a bare array or a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Page {
        results: Vec<T>,
        #[serde(default)]
        count: Option<u64>,
    },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Page { results, .. } => results,
            ListResponse::Bare(items) => items,
        }
    }
}

// ===== Transitions =====

#[derive(Debug, Serialize)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Serialize)]
pub struct SignContractRequest<'a> {
    pub signature: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SendContractRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_terms: Option<&'a ContractTerms>,
}

/// Body returned by transition endpoints. Some return the full record,
/// some only the new status and a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransitionResponse {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub application: Option<Application>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TransitionResponse {
    /// Status the server reported, if any.
    pub fn reported_status(&self) -> Option<ApplicationStatus> {
        self.application
            .as_ref()
            .map(|a| a.status)
            .or(self.status)
    }
}
