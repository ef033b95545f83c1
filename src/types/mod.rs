// src/types/mod.rs
pub mod application;
pub mod profile;
pub mod response;
pub mod work_session;

pub use application::{
    Application, ApplicationStatus, ApplicationType, ContractPhase, ContractTerms, RecordId,
    ShiftDetails,
};
pub use profile::{UserProfile, UserRole};
pub use response::TokenPair;
pub use work_session::{Coordinates, WorkBreak, WorkSession};
