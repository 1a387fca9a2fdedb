use shared::{
    domain::{CampaignAction, CampaignId, CampaignStatus},
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("session expired or missing credentials")]
    Unauthorized,
    #[error("request to {path} failed with status {status}: {body}")]
    Status {
        path: String,
        status: u16,
        error: Option<ApiError>,
        body: String,
    },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response payload from {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("local storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("cannot {action} campaign {campaign_id} while it is {status}")]
    InvalidTransition {
        campaign_id: CampaignId,
        action: CampaignAction,
        status: CampaignStatus,
    },
    #[error("unknown campaign {0}")]
    UnknownCampaign(CampaignId),
    #[error("invalid input: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Transport,
    Validation,
    Backend,
    Local,
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized => ErrorCategory::Auth,
            Self::Status { status: 403, .. } => ErrorCategory::Auth,
            Self::Status { status: 400 | 422, .. } => ErrorCategory::Validation,
            Self::Status { .. } | Self::Decode { .. } => ErrorCategory::Backend,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::InvalidTransition { .. } | Self::UnknownCampaign(_) | Self::Validation(_) => {
                ErrorCategory::Validation
            }
            Self::InvalidUrl(_) | Self::Storage(_) => ErrorCategory::Local,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Backend error code, taken from the error body when present.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Unauthorized => Some(ErrorCode::Unauthorized),
            Self::Status { status, error, .. } => Some(
                error
                    .as_ref()
                    .map(|e| e.code)
                    .unwrap_or_else(|| ErrorCode::from_status(*status)),
            ),
            _ => None,
        }
    }

    /// Short message fit for a toast or status line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Your session has expired; please sign in again.".to_string(),
            Self::Status {
                error: Some(error), ..
            } => error.message.clone(),
            Self::Status { status, .. } => format!("The server rejected the request ({status})."),
            Self::Transport(_) => "Server unreachable; check the network and retry.".to_string(),
            other => other.to_string(),
        }
    }
}
