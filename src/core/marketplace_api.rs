// src/core/marketplace_api.rs
//! The remote collaborator: every lifecycle transition is enacted by the server.

use async_trait::async_trait;

use super::service_client::ServiceClient;
use crate::error::ApiResult;
use crate::types::response::{
    ListResponse, SendContractRequest, SignContractRequest, StatusUpdateRequest,
    TransitionResponse,
};
use crate::types::work_session::{
    ClockInRequest, ClockInResponse, ClockOutRequest, ClockOutResponse,
};
use crate::types::{
    Application, ApplicationStatus, ContractTerms, RecordId, UserProfile, WorkSession,
};

const PROFILE_ENDPOINT: &str = "/auth/profile/";
const MY_APPLICATIONS_ENDPOINT: &str = "/jobs/applications/my/";
const CLOCK_IN_ENDPOINT: &str = "/work/sessions/clock_in/";
const CLOCK_OUT_ENDPOINT: &str = "/work/sessions/clock_out/";
const ACTIVE_SESSION_ENDPOINT: &str = "/work/sessions/active/";

fn job_applications_endpoint(job_id: &RecordId) -> String {
    format!("/jobs/{}/applications/", job_id)
}

fn application_action_endpoint(id: &RecordId, action: &str) -> String {
    format!("/applications/{}/{}/", id, action)
}

fn session_action_endpoint(id: &RecordId, action: &str) -> String {
    format!("/work/sessions/{}/{}/", id, action)
}

/// Which application collection a view mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationScope {
    /// The signed-in seeker's own applications.
    Mine,
    /// Applications received for one of the employer's jobs.
    ForJob(RecordId),
}

#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn fetch_profile(&self) -> ApiResult<UserProfile>;

    async fn list_applications(&self, scope: &ApplicationScope) -> ApiResult<Vec<Application>>;

    async fn withdraw(&self, id: &RecordId) -> ApiResult<TransitionResponse>;

    async fn sign_contract(&self, id: &RecordId, signature: &str)
        -> ApiResult<TransitionResponse>;

    async fn verify_contract(&self, id: &RecordId) -> ApiResult<TransitionResponse>;

    async fn update_status(
        &self,
        id: &RecordId,
        status: ApplicationStatus,
    ) -> ApiResult<TransitionResponse>;

    async fn send_contract(
        &self,
        id: &RecordId,
        terms: Option<&ContractTerms>,
    ) -> ApiResult<TransitionResponse>;

    async fn clock_in(&self, request: &ClockInRequest) -> ApiResult<ClockInResponse>;

    async fn clock_out(&self, request: &ClockOutRequest) -> ApiResult<ClockOutResponse>;

    async fn active_session(&self) -> ApiResult<Option<WorkSession>>;

    async fn start_break(&self, session_id: &RecordId) -> ApiResult<WorkSession>;

    async fn end_break(&self, session_id: &RecordId) -> ApiResult<WorkSession>;
}

#[async_trait]
impl MarketplaceApi for ServiceClient {
    async fn fetch_profile(&self) -> ApiResult<UserProfile> {
        let profile: UserProfile = self.get(PROFILE_ENDPOINT).await?;
        self.session().set_current_user(profile.clone());
        Ok(profile)
    }

    async fn list_applications(&self, scope: &ApplicationScope) -> ApiResult<Vec<Application>> {
        let endpoint = match scope {
            ApplicationScope::Mine => MY_APPLICATIONS_ENDPOINT.to_string(),
            ApplicationScope::ForJob(job_id) => job_applications_endpoint(job_id),
        };

        let response: ListResponse<Application> = self.get(&endpoint).await?;
        Ok(response.into_items())
    }

    async fn withdraw(&self, id: &RecordId) -> ApiResult<TransitionResponse> {
        self.post_empty(&application_action_endpoint(id, "withdraw"))
            .await
    }

    async fn sign_contract(
        &self,
        id: &RecordId,
        signature: &str,
    ) -> ApiResult<TransitionResponse> {
        self.post_json(
            &application_action_endpoint(id, "sign_contract"),
            &SignContractRequest { signature },
        )
        .await
    }

    async fn verify_contract(&self, id: &RecordId) -> ApiResult<TransitionResponse> {
        self.post_empty(&application_action_endpoint(id, "verify_contract"))
            .await
    }

    async fn update_status(
        &self,
        id: &RecordId,
        status: ApplicationStatus,
    ) -> ApiResult<TransitionResponse> {
        self.post_json(
            &application_action_endpoint(id, "status"),
            &StatusUpdateRequest { status },
        )
        .await
    }

    async fn send_contract(
        &self,
        id: &RecordId,
        terms: Option<&ContractTerms>,
    ) -> ApiResult<TransitionResponse> {
        self.post_json(
            &application_action_endpoint(id, "send_contract"),
            &SendContractRequest {
                contract_terms: terms,
            },
        )
        .await
    }

    async fn clock_in(&self, request: &ClockInRequest) -> ApiResult<ClockInResponse> {
        self.post_json(CLOCK_IN_ENDPOINT, request).await
    }

    async fn clock_out(&self, request: &ClockOutRequest) -> ApiResult<ClockOutResponse> {
        self.post_json(CLOCK_OUT_ENDPOINT, request).await
    }

    async fn active_session(&self) -> ApiResult<Option<WorkSession>> {
        self.get_optional(ACTIVE_SESSION_ENDPOINT).await
    }

    async fn start_break(&self, session_id: &RecordId) -> ApiResult<WorkSession> {
        self.post_empty(&session_action_endpoint(session_id, "start_break"))
            .await
    }

    async fn end_break(&self, session_id: &RecordId) -> ApiResult<WorkSession> {
        self.post_empty(&session_action_endpoint(session_id, "end_break"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        let id = RecordId::from(12u64);
        assert_eq!(
            application_action_endpoint(&id, "sign_contract"),
            "/applications/12/sign_contract/"
        );
        assert_eq!(job_applications_endpoint(&id), "/jobs/12/applications/");
        assert_eq!(
            session_action_endpoint(&id, "end_break"),
            "/work/sessions/12/end_break/"
        );
    }
}
