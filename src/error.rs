use std::time::Duration;
use thiserror::Error;

/// Why one subject's evaluation did not produce a report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    #[error("no data available for {subject_id}: {reason}")]
    NoDataAvailable { subject_id: String, reason: String },

    #[error("rate limit exhausted on every source for {subject_id}")]
    RateLimited { subject_id: String },

    #[error("evaluation of {subject_id} timed out after {after:?}")]
    Timeout { subject_id: String, after: Duration },

    #[error("every source rejected our credentials for {subject_id}")]
    Unauthorized { subject_id: String },
}

impl EvaluationError {
    pub fn subject_id(&self) -> &str {
        match self {
            EvaluationError::NoDataAvailable { subject_id, .. }
            | EvaluationError::RateLimited { subject_id }
            | EvaluationError::Timeout { subject_id, .. }
            | EvaluationError::Unauthorized { subject_id } => subject_id,
        }
    }

    /// Transient failures are worth another attempt; missing data and bad
    /// credentials are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EvaluationError::RateLimited { .. } | EvaluationError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let subject_id = "s-1".to_string();
        assert!(EvaluationError::RateLimited { subject_id: subject_id.clone() }.is_retryable());
        assert!(EvaluationError::Timeout {
            subject_id: subject_id.clone(),
            after: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!EvaluationError::NoDataAvailable {
            subject_id: subject_id.clone(),
            reason: "all sources failed".to_string()
        }
        .is_retryable());
        assert!(!EvaluationError::Unauthorized { subject_id }.is_retryable());
    }
}
