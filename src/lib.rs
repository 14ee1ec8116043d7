// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod telegram;
pub mod databricks;
pub mod remediation;
pub mod report;
pub mod server;
pub mod scheduler;

// Re-export commonly used items
pub use types::*;
pub use error::{ApiError, RemoteErrorBody};
pub use config::{
    load_settings, load_settings_with_env, resolve_accounts, resolve_accounts_with_defaults,
    EnvironmentProvider, MockEnvironment, RedactedAccount, SystemEnvironment,
};
pub use telegram::{templates, Notifier};
pub use databricks::AppsClient;
pub use remediation::Remediator;
pub use report::{AppsSummary, RestartTally, StatusReport};
pub use server::{build_router, AppState};
