//! Client core for the clinic CRM dashboard: backend access, local session
//! storage, the central store, and the campaign wizard.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod listing;
pub mod metrics;
pub mod orchestration;
pub mod routes;
pub mod storage;
pub mod store;
pub mod tasks;
pub mod wizard;

pub use api::{ApiResult, CrmApi, CrmBackend};
pub use config::{load_settings, ClientSettings};
pub use error::{ClientError, ErrorCategory};
pub use http::{ApiClient, LogoutReason, SessionEvent};
pub use metrics::{derive_lead_metrics, LeadMetrics, MetricName};
pub use routes::Route;
pub use storage::{FileStore, KeyValueStore, LocalStorage, MemoryStore, StorageError};
pub use store::{reduce, Action, AppState, Store};
pub use tasks::TaskScope;
pub use wizard::{AdvanceOutcome, CampaignField, WizardController, WizardError, WizardStep};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
