use serde::Serialize;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors surfaced by dashboard operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// The submission had nothing valid to record. No gateway call was made.
    #[error("{0}")]
    Validation(String),

    /// Any gateway failure: network, auth, constraint violation, timeout.
    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: GatewayError,
    },

    /// Missing or invalid backend settings. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Coarse error category handed to presentation listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Persistence,
    Configuration,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Persistence { .. } => ErrorKind::Persistence,
            AppError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// True when retrying the same call may succeed (timeouts, dropped connections).
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Persistence { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Adapter for `map_err` that tags a gateway failure with what was being attempted.
    pub(crate) fn persistence(context: impl Into<String>) -> impl FnOnce(GatewayError) -> AppError {
        let context = context.into();
        move |source| AppError::Persistence { context, source }
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
