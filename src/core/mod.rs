// src/core/mod.rs
//! Configuration, session and HTTP plumbing shared by the lifecycle view and the CLI

pub mod config_manager;
pub mod marketplace_api;
pub mod service_client;
pub mod session;
pub mod token_store;

pub use config_manager::ConfigManager;
pub use marketplace_api::{ApplicationScope, MarketplaceApi};
pub use service_client::ServiceClient;
pub use session::{MemoryTokenStore, SessionContext, TokenStore};
pub use token_store::SqliteTokenStore;
