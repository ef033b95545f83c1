// src/lifecycle/view.rs
//! Application lifecycle view.
//!
//! Mirrors one application collection fetched from the server and exposes the
//! transitions valid from each application's status. Every transition is
//! delegated to the [`MarketplaceApi`]; its result is shown as a tentative copy
//! and then superseded by a full re-fetch. Tentative copies are never merged
//! field-by-field with fetched data: a refresh replaces the whole collection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

use super::clock_window::{self, Clock, ClockInWindow, SystemClock};
use super::{rules, signature};
use crate::core::{ApplicationScope, MarketplaceApi};
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::types::response::TransitionResponse;
use crate::types::work_session::{ClockInRequest, ClockOutRequest, ClockOutResponse};
use crate::types::{
    Application, ApplicationStatus, ContractTerms, Coordinates, RecordId, UserProfile,
    WorkSession,
};

/// Device position, acquired fresh for every clock-in/out.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> ApiResult<Coordinates>;
}

/// Position supplied up front, e.g. from CLI flags.
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> ApiResult<Coordinates> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tracked {
    pub application: Application,
    /// False while the record is a local patch awaiting the next fetch.
    pub confirmed: bool,
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// Latest known record. `None` if the re-fetch no longer lists it.
    pub application: Option<Application>,
    /// Whether the post-transition re-fetch succeeded.
    pub confirmed: bool,
    pub message: Option<String>,
    /// Set after an employer accepts; the next step is sending a contract.
    pub offer_send_contract: bool,
}

#[derive(Debug, Clone)]
pub struct ClockInOutcome {
    pub session: Option<WorkSession>,
    pub within_geofence: Option<bool>,
    pub message: String,
    pub confirmed: bool,
}

#[derive(Default)]
struct ViewState {
    entries: Vec<Tracked>,
    in_flight: HashSet<RecordId>,
    open_session: Option<WorkSession>,
    last_refreshed: Option<DateTime<Utc>>,
}

/// Marks an application as having a request in flight until dropped.
struct InFlightGuard<'a> {
    state: &'a Mutex<ViewState>,
    id: RecordId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight.remove(&self.id);
    }
}

pub struct ApplicationLifecycleView {
    api: Arc<dyn MarketplaceApi>,
    location: Arc<dyn LocationProvider>,
    clock: Arc<dyn Clock>,
    scope: ApplicationScope,
    state: Mutex<ViewState>,
}

impl ApplicationLifecycleView {
    pub fn new(
        api: Arc<dyn MarketplaceApi>,
        location: Arc<dyn LocationProvider>,
        scope: ApplicationScope,
    ) -> Self {
        Self {
            api,
            location,
            clock: Arc::new(SystemClock),
            scope,
            state: Mutex::new(ViewState::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn scope(&self) -> &ApplicationScope {
        &self.scope
    }

    pub fn entries(&self) -> Vec<Tracked> {
        self.state().entries.clone()
    }

    pub fn applications(&self) -> Vec<Application> {
        self.state()
            .entries
            .iter()
            .map(|t| t.application.clone())
            .collect()
    }

    /// Applications still moving through the pipeline.
    pub fn active_applications(&self) -> Vec<Application> {
        self.applications()
            .into_iter()
            .filter(|a| a.status.is_active())
            .collect()
    }

    pub fn get(&self, id: &RecordId) -> Option<Tracked> {
        self.state()
            .entries
            .iter()
            .find(|t| &t.application.id == id)
            .cloned()
    }

    pub fn is_in_flight(&self, id: &RecordId) -> bool {
        self.state().in_flight.contains(id)
    }

    pub fn open_session(&self) -> Option<WorkSession> {
        self.state().open_session.clone()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.state().last_refreshed
    }

    /// Current clock-in window for an application, for display.
    pub fn clock_in_window(&self, id: &RecordId) -> ApiResult<ClockInWindow> {
        let application = self.find(id)?;
        Ok(clock_window::evaluate(
            application.shift_details.as_ref(),
            self.clock.now_local(),
        ))
    }

    /// Replace the whole collection with the server's current view.
    pub async fn refresh(&self) -> ApiResult<Vec<Application>> {
        let applications = self.api.list_applications(&self.scope).await?;

        let mut state = self.state();
        state.entries = applications
            .iter()
            .cloned()
            .map(|application| Tracked {
                application,
                confirmed: true,
            })
            .collect();
        state.last_refreshed = Some(self.clock.now_utc());

        info!("Fetched {} applications", applications.len());
        Ok(applications)
    }

    async fn refresh_quietly(&self) -> bool {
        match self.refresh().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Re-fetch failed, keeping tentative copies: {}", e);
                false
            }
        }
    }

    fn find(&self, id: &RecordId) -> ApiResult<Application> {
        self.get(id).map(|t| t.application).ok_or_else(|| {
            ApiError::new(
                ErrorKind::NotFound,
                format!("Application {} is not loaded; refresh and try again.", id),
            )
        })
    }

    fn begin(&self, id: &RecordId) -> ApiResult<InFlightGuard<'_>> {
        let mut state = self.state();
        if !state.in_flight.insert(id.clone()) {
            return Err(ApiError::busy(
                "This application is already being updated, please wait.",
            ));
        }

        Ok(InFlightGuard {
            state: &self.state,
            id: id.clone(),
        })
    }

    fn put_tentative(&self, application: Application) {
        let mut state = self.state();
        let tracked = Tracked {
            application,
            confirmed: false,
        };

        let position = state
            .entries
            .iter()
            .position(|t| t.application.id == tracked.application.id);
        match position {
            Some(index) => state.entries[index] = tracked,
            None => state.entries.push(tracked),
        }
    }

    /// Roll back to `previous` unless a fetch already replaced the patch.
    fn restore_if_tentative(&self, previous: Tracked) {
        let mut state = self.state();
        if let Some(entry) = state
            .entries
            .iter_mut()
            .find(|t| t.application.id == previous.application.id)
        {
            if !entry.confirmed {
                *entry = previous;
            }
        }
    }

    /// Patched copy from a transition response: the returned record if any,
    /// otherwise `base` with the reported (or expected) status.
    fn tentative_from(
        base: &Application,
        response: &TransitionResponse,
        expected: ApplicationStatus,
    ) -> Application {
        match &response.application {
            Some(application) => application.clone(),
            None => {
                let mut application = base.clone();
                application.status = response.status.unwrap_or(expected);
                application
            }
        }
    }

    async fn reconcile(
        &self,
        id: &RecordId,
        message: Option<String>,
        offer_send_contract: bool,
    ) -> TransitionOutcome {
        let confirmed = self.refresh_quietly().await;
        TransitionOutcome {
            application: self.get(id).map(|t| t.application),
            confirmed,
            message,
            offer_send_contract,
        }
    }

    // ===== Seeker actions =====

    pub async fn withdraw(&self, id: &RecordId) -> ApiResult<TransitionOutcome> {
        let _guard = self.begin(id)?;
        let application = self.find(id)?;
        rules::check_withdraw(&application)?;

        match self.api.withdraw(id).await {
            Ok(response) => {
                self.put_tentative(Self::tentative_from(
                    &application,
                    &response,
                    ApplicationStatus::Withdrawn,
                ));
                info!("Application {} withdrawn", id);
                Ok(self.reconcile(id, response.message, false).await)
            }
            Err(e) => {
                error!("Withdraw of application {} failed: {}", id, e);
                // The server may or may not have applied it; ask rather than guess.
                self.refresh_quietly().await;
                Err(e)
            }
        }
    }

    pub async fn sign_contract(
        &self,
        id: &RecordId,
        signature_text: &str,
        signer: &UserProfile,
    ) -> ApiResult<TransitionOutcome> {
        let _guard = self.begin(id)?;
        let application = self.find(id)?;
        rules::check_sign(&application)?;
        signature::check_signature(signature_text, signer)?;

        let signature_text = signature_text.trim();
        let previous = self.get(id);

        let mut tentative = application;
        tentative.seeker_signature = Some(signature_text.to_string());
        tentative.seeker_signed_at = Some(self.clock.now_utc());
        self.put_tentative(tentative.clone());

        match self.api.sign_contract(id, signature_text).await {
            Ok(response) => {
                if let Some(record) = response.application.clone() {
                    self.put_tentative(record);
                } else if let Some(status) = response.status {
                    tentative.status = status;
                    self.put_tentative(tentative);
                }
                info!("Contract for application {} signed", id);
                Ok(self.reconcile(id, response.message, false).await)
            }
            Err(e) => {
                error!("Signing contract for application {} failed: {}", id, e);
                if let Some(previous) = previous {
                    self.restore_if_tentative(previous);
                }
                Err(e)
            }
        }
    }

    pub async fn clock_in(&self, id: &RecordId) -> ApiResult<ClockInOutcome> {
        let _guard = self.begin(id)?;
        let application = self.find(id)?;
        rules::check_clock_in_status(&application)?;

        let window = clock_window::evaluate(
            application.shift_details.as_ref(),
            self.clock.now_local(),
        );
        if let Some(explanation) = window.explanation() {
            return Err(ApiError::precondition(explanation));
        }

        let position = self.location.current_position().await?;
        let request = ClockInRequest {
            application_id: id.clone(),
            latitude: position.latitude,
            longitude: position.longitude,
        };

        let response = self.api.clock_in(&request).await.map_err(|e| {
            error!("Clock-in for application {} failed: {}", id, e);
            e
        })?;

        if response.is_within_geofence == Some(false) {
            warn!(
                "Clock-in for application {} flagged outside geofence: {}",
                id, response.message
            );
        }

        if let Some(session) = &response.session {
            self.state().open_session = Some(session.clone());
        }
        if application.status == ApplicationStatus::ContractAcknowledged {
            let mut tentative = application;
            tentative.status = ApplicationStatus::Active;
            self.put_tentative(tentative);
        }

        info!("Clocked in for application {}", id);
        let confirmed = self.refresh_quietly().await;

        Ok(ClockInOutcome {
            session: response.session,
            within_geofence: response.is_within_geofence,
            message: response.message,
            confirmed,
        })
    }

    pub async fn clock_out(&self, id: &RecordId) -> ApiResult<ClockOutResponse> {
        let _guard = self.begin(id)?;
        let session = self.session_for(id).await?;

        let position = self.location.current_position().await?;
        let request = ClockOutRequest {
            session_id: session.id.clone(),
            latitude: position.latitude,
            longitude: position.longitude,
        };

        let response = self.api.clock_out(&request).await.map_err(|e| {
            error!("Clock-out for application {} failed: {}", id, e);
            e
        })?;

        self.state().open_session = None;
        info!(
            "Clocked out of application {}: {:.2} hours, {:.2} earned",
            id, response.total_hours, response.total_earnings
        );

        self.refresh_quietly().await;
        Ok(response)
    }

    pub async fn start_break(&self, id: &RecordId) -> ApiResult<WorkSession> {
        let _guard = self.begin(id)?;
        let session = self.session_for(id).await?;
        if session.is_on_break() {
            return Err(ApiError::precondition("You are already on a break."));
        }

        let updated = self.api.start_break(&session.id).await?;
        self.state().open_session = Some(updated.clone());
        Ok(updated)
    }

    pub async fn end_break(&self, id: &RecordId) -> ApiResult<WorkSession> {
        let _guard = self.begin(id)?;
        let session = self.session_for(id).await?;
        if !session.is_on_break() {
            return Err(ApiError::precondition("You are not on a break."));
        }

        let updated = self.api.end_break(&session.id).await?;
        self.state().open_session = Some(updated.clone());
        Ok(updated)
    }

    /// Open session for the application, asking the server if none is cached.
    async fn session_for(&self, id: &RecordId) -> ApiResult<WorkSession> {
        let cached = self.open_session();
        if let Some(session) = cached.filter(|s| &s.application_id == id && s.is_open()) {
            return Ok(session);
        }

        match self.api.active_session().await? {
            Some(session) if &session.application_id == id && session.is_open() => {
                self.state().open_session = Some(session.clone());
                Ok(session)
            }
            _ => Err(ApiError::precondition(
                "You are not clocked in for this job.",
            )),
        }
    }

    // ===== Employer actions =====

    pub async fn update_status(
        &self,
        id: &RecordId,
        target: ApplicationStatus,
    ) -> ApiResult<TransitionOutcome> {
        let _guard = self.begin(id)?;
        let application = self.find(id)?;
        rules::check_review(&application, target)?;

        let response = self.api.update_status(id, target).await.map_err(|e| {
            error!("Status update of application {} failed: {}", id, e);
            e
        })?;

        let mut tentative = Self::tentative_from(&application, &response, target);
        if tentative.reviewed_at.is_none() {
            tentative.reviewed_at = Some(self.clock.now_utc());
        }
        let accepted = tentative.status == ApplicationStatus::Accepted;
        self.put_tentative(tentative);

        info!("Application {} moved to {}", id, target);
        Ok(self.reconcile(id, response.message, accepted).await)
    }

    pub async fn send_contract(
        &self,
        id: &RecordId,
        terms: Option<ContractTerms>,
    ) -> ApiResult<TransitionOutcome> {
        let _guard = self.begin(id)?;
        let application = self.find(id)?;
        rules::check_send_contract(&application)?;

        let response = self
            .api
            .send_contract(id, terms.as_ref())
            .await
            .map_err(|e| {
                error!("Sending contract for application {} failed: {}", id, e);
                e
            })?;

        let mut tentative =
            Self::tentative_from(&application, &response, ApplicationStatus::ContractSent);
        if tentative.contract_terms.is_none() {
            tentative.contract_terms = terms;
        }
        self.put_tentative(tentative);

        info!("Contract sent for application {}", id);
        Ok(self.reconcile(id, response.message, false).await)
    }

    pub async fn verify_contract(&self, id: &RecordId) -> ApiResult<TransitionOutcome> {
        let _guard = self.begin(id)?;
        let application = self.find(id)?;
        rules::check_verify(&application)?;

        let response = self.api.verify_contract(id).await.map_err(|e| {
            error!("Verifying contract for application {} failed: {}", id, e);
            e
        })?;

        let mut tentative = Self::tentative_from(
            &application,
            &response,
            ApplicationStatus::ContractAcknowledged,
        );
        if tentative.employer_verified_at.is_none() {
            tentative.employer_verified_at = Some(self.clock.now_utc());
        }
        self.put_tentative(tentative);

        info!("Contract for application {} verified", id);
        Ok(self.reconcile(id, response.message, false).await)
    }
}
