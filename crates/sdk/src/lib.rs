//! # Tourney Scheduler SDK
//!
//! Client used by the web tier to schedule tournament processing whenever a
//! tournament is created or edited.
//!
//! Only a 2xx response counts as scheduled. Validation failures, conflicts
//! with a running job and an unavailable queue store come back as distinct
//! [`SdkError`] variants, and the client never retries on its own.

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
#[allow(missing_docs)]
pub mod models;

pub use client::{ClientBuilder, SchedulerClient};
pub use config::ClientConfig;
pub use error::{SdkError, SdkResult};
pub use models::{PendingJob, ScheduleConfirmation};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default scheduler API URL
pub const DEFAULT_API_URL: &str = "http://localhost:8080";
