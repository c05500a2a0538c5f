//! # ragdesk-server
//!
//! HTTP front end for [`ragdesk_core::RagService`]: document management,
//! question answering and health over JSON, configured from the environment.
//!
//! ```rust,ignore
//! let settings = ragdesk_server::Settings::from_env()?;
//! ragdesk_server::run_server(settings).await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod startup;

pub use config::{EmbeddingBackend, Settings};
pub use error::ApiError;
pub use server::{AppState, app_router, run_server};
pub use startup::build_service;
