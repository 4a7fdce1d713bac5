//! Causelist client: session handling, typed API calls and the extraction job runtime.
mod api;
mod auth;
mod config;
mod controller;
mod models;
mod persist;

pub use api::{payload_message, ApiClient, ApiError};
pub use auth::{AuthContext, FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};
pub use config::{ClientConfig, DEFAULT_API_BASE, DEFAULT_TOKEN_FILE};
pub use controller::{
    trigger_outcome, ControllerSettings, DisplaySink, JobController, NullSink, RunEnd,
    DEFAULT_POLL_INTERVAL,
};
pub use models::{
    CaseSearch, Cause, ProgressSnapshot, RelatedCase, ScraperLogEntry, ScraperStatus,
    TokenResponse, TriggerResponse,
};
pub use persist::{ensure_dir, write_atomic, PersistError};
