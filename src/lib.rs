// src/lib.rs
//! Client for a job marketplace: follows an application from submission
//! through review, contract signing and verification to clock-in.

pub mod cli;
pub mod core;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod types;
pub mod utils;

pub use crate::core::{ApplicationScope, MarketplaceApi, ServiceClient, SessionContext};
pub use error::{ApiError, ApiResult, ErrorKind};
pub use lifecycle::{ApplicationLifecycleView, TransitionOutcome};
pub use types::{Application, ApplicationStatus, ContractPhase, RecordId};
