// src/types/profile.rs
use serde::{Deserialize, Serialize};

use super::application::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    JobSeeker,
    Employer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: RecordId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, alias = "user_type")]
    pub role: UserRole,
}

impl UserProfile {
    /// Name a contract signature has to match.
    pub fn legal_name(&self) -> Option<String> {
        let joined = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let joined = joined.trim();
        if !joined.is_empty() {
            return Some(joined.to_string());
        }

        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }

    pub fn is_employer(&self) -> bool {
        self.role == UserRole::Employer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(first: &str, last: &str, full: Option<&str>) -> UserProfile {
        UserProfile {
            id: RecordId::from(1u64),
            email: "jane@example.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            full_name: full.map(str::to_string),
            role: UserRole::JobSeeker,
        }
    }

    #[test]
    fn test_legal_name() {
        assert_eq!(profile("Jane", "Doe", None).legal_name().as_deref(), Some("Jane Doe"));
        assert_eq!(profile(" Jane ", "", None).legal_name().as_deref(), Some("Jane"));
        assert_eq!(
            profile("", "", Some("Jane Q. Doe")).legal_name().as_deref(),
            Some("Jane Q. Doe")
        );
        assert_eq!(profile("", " ", Some("  ")).legal_name(), None);
    }

    #[test]
    fn test_role_accepts_user_type_alias() {
        let p: UserProfile =
            serde_json::from_str(r#"{"id": 3, "user_type": "employer"}"#).unwrap();
        assert!(p.is_employer());
    }
}
