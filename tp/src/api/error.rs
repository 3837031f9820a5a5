//! Travel API error types

use thiserror::Error;

/// Marker the backend puts in messages that need a paid subscription
const SUBSCRIPTION_MARKER: &str = "subscription";

/// Errors from one call to a backend collaborator
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Stream(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// The endpoint does not exist (protocol version mismatch)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    /// HTTP 403, or a message carrying the subscription marker
    pub fn is_subscription_required(&self) -> bool {
        match self {
            ApiError::Status { status: 403, .. } => true,
            ApiError::Status { message, .. } | ApiError::Stream(message) | ApiError::InvalidResponse(message) => {
                message.to_lowercase().contains(SUBSCRIPTION_MARKER)
            }
            ApiError::Network(_) | ApiError::InvalidUrl(_) | ApiError::Json(_) => false,
        }
    }

    /// Human-facing text without the variant prefix
    pub fn message(&self) -> String {
        match self {
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Stream(message) | ApiError::InvalidResponse(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Outcome of a failed planning request, after fallback has been tried
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("An active subscription is required for this trip")]
    SubscriptionRequired,

    #[error("Planning failed: {0}")]
    Failed(String),
}

impl PlanError {
    /// Generic message used when no collaborator said anything useful
    pub const GENERIC: &'static str = "Failed to plan trip";

    /// Pick the most specific error after both planning paths failed
    ///
    /// Prefers the streaming error, then the fallback error, then a generic
    /// message.
    pub fn from_failures(streaming: Option<&ApiError>, fallback: Option<&ApiError>) -> Self {
        if streaming.into_iter().chain(fallback).any(ApiError::is_subscription_required) {
            return PlanError::SubscriptionRequired;
        }
        let message = streaming
            .or(fallback)
            .map(ApiError::message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| Self::GENERIC.to_string());
        PlanError::Failed(message)
    }

    pub fn is_subscription_required(&self) -> bool {
        matches!(self, PlanError::SubscriptionRequired)
    }
}
