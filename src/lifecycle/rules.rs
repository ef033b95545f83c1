// src/lifecycle/rules.rs
//! Client-side gates for lifecycle transitions.
//!
//! The server enforces the real state machine; these checks only decide which
//! actions are offered and reject obviously invalid requests before they are sent.

use crate::error::{ApiError, ApiResult};
use crate::types::{Application, ApplicationStatus, ContractPhase, UserRole};

use ApplicationStatus::*;

pub const WITHDRAWABLE_STATUSES: [ApplicationStatus; 2] = [Pending, Reviewed];
pub const REVIEW_TARGETS: [ApplicationStatus; 4] = [Reviewed, Shortlisted, Accepted, Rejected];
pub const CLOCK_IN_STATUSES: [ApplicationStatus; 2] = [ContractAcknowledged, Active];

/// Actions a view can offer for an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Withdraw,
    SignContract,
    ClockIn,
    Review(ApplicationStatus),
    SendContract,
    VerifyContract,
}

impl LifecycleAction {
    pub fn label(&self) -> String {
        match self {
            LifecycleAction::Withdraw => "withdraw".to_string(),
            LifecycleAction::SignContract => "sign contract".to_string(),
            LifecycleAction::ClockIn => "clock in".to_string(),
            LifecycleAction::Review(target) => format!("mark {}", target.label().to_lowercase()),
            LifecycleAction::SendContract => "send contract".to_string(),
            LifecycleAction::VerifyContract => "verify contract".to_string(),
        }
    }
}

pub fn contract_phase(app: &Application) -> ContractPhase {
    let acknowledged_rank = ContractAcknowledged.pipeline_rank();

    match app.status {
        ContractSent => match (app.seeker_signed_at, app.employer_verified_at) {
            (None, _) => ContractPhase::AwaitingSignature,
            (Some(_), None) => ContractPhase::AwaitingVerification,
            (Some(_), Some(_)) => ContractPhase::Acknowledged,
        },
        Rejected | Withdrawn => {
            if app.employer_verified_at.is_some() {
                ContractPhase::Acknowledged
            } else {
                ContractPhase::Closed
            }
        }
        status if status.pipeline_rank() >= acknowledged_rank => ContractPhase::Acknowledged,
        _ => ContractPhase::NotSent,
    }
}

pub fn check_withdraw(app: &Application) -> ApiResult<()> {
    if WITHDRAWABLE_STATUSES.contains(&app.status) {
        Ok(())
    } else {
        Err(ApiError::precondition(format!(
            "Only pending or reviewed applications can be withdrawn (this one is {}).",
            app.status.label().to_lowercase()
        )))
    }
}

pub fn check_sign(app: &Application) -> ApiResult<()> {
    match contract_phase(app) {
        ContractPhase::AwaitingSignature => Ok(()),
        ContractPhase::AwaitingVerification => Err(ApiError::precondition(
            "You have already signed this contract; it is awaiting employer verification.",
        )),
        _ => Err(ApiError::precondition(
            "There is no contract waiting for your signature.",
        )),
    }
}

pub fn check_verify(app: &Application) -> ApiResult<()> {
    match contract_phase(app) {
        ContractPhase::AwaitingVerification => Ok(()),
        ContractPhase::AwaitingSignature => Err(ApiError::precondition(
            "The candidate has not signed the contract yet.",
        )),
        _ => Err(ApiError::precondition(
            "There is no signed contract waiting for verification.",
        )),
    }
}

pub fn check_clock_in_status(app: &Application) -> ApiResult<()> {
    if CLOCK_IN_STATUSES.contains(&app.status) {
        Ok(())
    } else {
        Err(ApiError::precondition(
            "You can clock in once the contract has been acknowledged.",
        ))
    }
}

pub fn check_review(app: &Application, target: ApplicationStatus) -> ApiResult<()> {
    if !REVIEW_TARGETS.contains(&target) {
        return Err(ApiError::precondition(format!(
            "'{}' is not a review decision.",
            target
        )));
    }

    if app.status.is_terminal() {
        return Err(ApiError::precondition(format!(
            "This application is already {}.",
            app.status.label().to_lowercase()
        )));
    }

    Ok(())
}

pub fn check_send_contract(app: &Application) -> ApiResult<()> {
    if app.status == Accepted {
        Ok(())
    } else {
        Err(ApiError::precondition(
            "A contract can only be sent for an accepted application.",
        ))
    }
}

pub fn can_withdraw(app: &Application) -> bool {
    check_withdraw(app).is_ok()
}

pub fn can_sign(app: &Application) -> bool {
    check_sign(app).is_ok()
}

pub fn can_verify(app: &Application) -> bool {
    check_verify(app).is_ok()
}

/// Status-only part of clock-in eligibility; the time window is separate.
pub fn can_clock_in_status(app: &Application) -> bool {
    check_clock_in_status(app).is_ok()
}

/// Actions valid from the application's current status for the given role.
pub fn available_actions(app: &Application, role: UserRole) -> Vec<LifecycleAction> {
    let mut actions = Vec::new();

    match role {
        UserRole::JobSeeker => {
            if can_withdraw(app) {
                actions.push(LifecycleAction::Withdraw);
            }
            if can_sign(app) {
                actions.push(LifecycleAction::SignContract);
            }
            if can_clock_in_status(app) {
                actions.push(LifecycleAction::ClockIn);
            }
        }
        UserRole::Employer => {
            if !app.status.is_terminal() {
                let current = app.status.pipeline_rank();
                for target in REVIEW_TARGETS {
                    // Review decisions only move forward; rejection stays open until the end.
                    let offered = match target {
                        Rejected => true,
                        _ => current < Accepted.pipeline_rank() && target.pipeline_rank() > current,
                    };
                    if offered {
                        actions.push(LifecycleAction::Review(target));
                    }
                }
            }
            if check_send_contract(app).is_ok() {
                actions.push(LifecycleAction::SendContract);
            }
            if can_verify(app) {
                actions.push(LifecycleAction::VerifyContract);
            }
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn app(status: ApplicationStatus) -> Application {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "status": status,
            "created_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap()
    }

    fn signed(mut app: Application) -> Application {
        app.seeker_signed_at = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).single();
        app.seeker_signature = Some("Jane Doe".to_string());
        app
    }

    #[test]
    fn test_withdraw_only_from_pending_or_reviewed() {
        for status in ApplicationStatus::PIPELINE.into_iter().chain([Rejected, Withdrawn]) {
            let allowed = matches!(status, Pending | Reviewed);
            assert_eq!(can_withdraw(&app(status)), allowed, "status {}", status);
        }
    }

    #[test]
    fn test_signed_unverified_contract_is_awaiting_verification() {
        let application = signed(app(ContractSent));
        assert_eq!(contract_phase(&application), ContractPhase::AwaitingVerification);
        assert!(!can_sign(&application));
        assert!(can_verify(&application));
    }

    #[test]
    fn test_contract_phases() {
        assert_eq!(contract_phase(&app(Accepted)), ContractPhase::NotSent);
        assert_eq!(
            contract_phase(&app(ContractSent)),
            ContractPhase::AwaitingSignature
        );
        assert_eq!(
            contract_phase(&app(ContractAcknowledged)),
            ContractPhase::Acknowledged
        );
        assert_eq!(contract_phase(&app(Completed)), ContractPhase::Acknowledged);
        assert_eq!(contract_phase(&app(Withdrawn)), ContractPhase::Closed);
    }

    #[test]
    fn test_verify_requires_signature() {
        let err = check_verify(&app(ContractSent)).unwrap_err();
        assert!(err.is_local());
        assert!(check_verify(&app(Accepted)).is_err());
    }

    #[test]
    fn test_review_targets() {
        let pending = app(Pending);
        for target in REVIEW_TARGETS {
            assert!(check_review(&pending, target).is_ok());
        }
        assert!(check_review(&pending, ContractSent).is_err());
        assert!(check_review(&pending, Withdrawn).is_err());
        assert!(check_review(&app(Withdrawn), Rejected).is_err());
        assert!(check_review(&app(Active), Rejected).is_ok());
    }

    #[test]
    fn test_clock_in_status_gate() {
        assert!(can_clock_in_status(&app(ContractAcknowledged)));
        assert!(can_clock_in_status(&app(Active)));
        assert!(!can_clock_in_status(&signed(app(ContractSent))));
        assert!(!can_clock_in_status(&app(Completed)));
    }

    #[test]
    fn test_available_actions_by_role() {
        assert_eq!(
            available_actions(&app(Pending), UserRole::JobSeeker),
            vec![LifecycleAction::Withdraw]
        );
        assert_eq!(
            available_actions(&app(ContractSent), UserRole::JobSeeker),
            vec![LifecycleAction::SignContract]
        );
        assert_eq!(
            available_actions(&app(Shortlisted), UserRole::Employer),
            vec![
                LifecycleAction::Review(Accepted),
                LifecycleAction::Review(Rejected)
            ]
        );
        assert_eq!(
            available_actions(&app(Accepted), UserRole::Employer),
            vec![
                LifecycleAction::Review(Rejected),
                LifecycleAction::SendContract
            ]
        );
        assert_eq!(
            available_actions(&signed(app(ContractSent)), UserRole::Employer),
            vec![
                LifecycleAction::Review(Rejected),
                LifecycleAction::VerifyContract
            ]
        );
        assert!(available_actions(&app(Withdrawn), UserRole::Employer).is_empty());
    }
}
