// src/lifecycle/signature.rs
use crate::error::{ApiError, ApiResult};
use crate::types::UserProfile;
use crate::utils::normalize_name;

/// Case-insensitive comparison; surrounding and repeated whitespace is ignored.
pub fn signature_matches(signature: &str, expected_name: &str) -> bool {
    let expected = normalize_name(expected_name);
    !expected.is_empty() && normalize_name(signature) == expected
}

/// Validate a typed signature against the signer's legal name before
/// anything is submitted.
pub fn check_signature(signature: &str, signer: &UserProfile) -> ApiResult<()> {
    let Some(expected) = signer.legal_name() else {
        return Err(ApiError::precondition(
            "Your profile has no legal name. Add your first and last name before signing.",
        ));
    };

    if signature.trim().is_empty() {
        return Err(ApiError::precondition(
            "Type your full legal name to sign the contract.",
        ));
    }

    if !signature_matches(signature, &expected) {
        return Err(ApiError::precondition(format!(
            "Signature must match your full legal name exactly: {}",
            expected
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{RecordId, UserRole};

    fn jane() -> UserProfile {
        UserProfile {
            id: RecordId::from(5u64),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            full_name: None,
            role: UserRole::JobSeeker,
        }
    }

    #[test]
    fn test_signature_is_case_insensitive() {
        assert!(signature_matches("jane doe", "Jane Doe"));
        assert!(signature_matches("JANE DOE", "Jane Doe"));
        assert!(signature_matches("  Jane   Doe ", "Jane Doe"));
        assert!(!signature_matches("Jane D", "Jane Doe"));
        assert!(!signature_matches("", ""));
    }

    #[test]
    fn test_check_signature_messages() {
        assert!(check_signature("jane doe", &jane()).is_ok());

        let err = check_signature("Jane D", &jane()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Precondition);
        assert!(err.message.contains("Jane Doe"));

        assert!(check_signature("   ", &jane()).is_err());

        let mut nameless = jane();
        nameless.first_name.clear();
        nameless.last_name.clear();
        assert!(check_signature("Jane Doe", &nameless).is_err());
    }
}
