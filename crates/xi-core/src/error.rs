//! Error types for the Xi synthesis engine.
//!
//! Safety breaches are not errors: a failed veto is the normal
//! [`crate::SynthesisOutcome::Halted`] outcome. The variants here cover
//! invalid configuration (fatal at construction) and requests that cannot
//! be evaluated at all.

use thiserror::Error;

use crate::opinion::AuthorityId;

/// Errors that can occur while configuring or running the engine.
#[derive(Debug, Error)]
pub enum XiError {
    /// Configured priority weights do not sum to 1.0.
    #[error("priority weights sum to {sum}, expected 1.0")]
    WeightSum {
        /// The observed sum.
        sum: f64,
    },

    /// A single priority weight lies outside [0, 1].
    #[error("weight for authority {id} is {weight}, must lie within [0, 1]")]
    WeightOutOfRange {
        /// Authority the weight belongs to.
        id: AuthorityId,
        /// The offending weight.
        weight: f64,
    },

    /// A supplementary imprint entry is missing or blank.
    #[error("supplementary imprint entry '{0}' is missing")]
    MissingImprint(&'static str),

    /// The tier layout is inconsistent with the weights.
    #[error("invalid tier layout: {0}")]
    TierLayout(String),

    /// A certified constraint id has no definition.
    #[error("certified constraint '{0}' is not defined")]
    UnknownConstraint(String),

    /// The safety floor is not a usable threshold.
    #[error("safety floor {0} must be finite and non-negative")]
    InvalidSafetyFloor(f64),

    /// The top-authority opinion is absent, so the veto cannot be evaluated.
    #[error("top-authority opinion {id} is missing; veto cannot be evaluated")]
    MissingTopAuthority {
        /// The authority id that was expected.
        id: AuthorityId,
    },

    /// A certificate was requested for an opinion without a safety score.
    #[error("top-authority opinion {id} carries no safety score to certify")]
    UncertifiedScore {
        /// The authority id that lacked a score.
        id: AuthorityId,
    },

    /// The upstream opinion source failed.
    #[error("opinion source failed: {0}")]
    Source(String),

    /// Reading a configuration file failed.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing configuration JSON failed.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Internal engine error.
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl XiError {
    /// Returns true for errors that prevent an engine from being built.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            XiError::WeightSum { .. }
                | XiError::WeightOutOfRange { .. }
                | XiError::MissingImprint(_)
                | XiError::TierLayout(_)
                | XiError::UnknownConstraint(_)
                | XiError::InvalidSafetyFloor(_)
                | XiError::Parse(_)
                | XiError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_sum_display() {
        let err = XiError::WeightSum { sum: 0.95 };
        assert!(err.to_string().contains("0.95"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_imprint_display() {
        let err = XiError::MissingImprint("systemic");
        assert!(err.to_string().contains("systemic"));
    }

    #[test]
    fn test_missing_top_authority_is_not_configuration() {
        let err = XiError::MissingTopAuthority { id: AuthorityId::new(9) };
        assert!(err.to_string().contains('9'));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_source_error_display() {
        let err = XiError::Source("upstream offline".to_string());
        assert!(err.to_string().contains("upstream offline"));
    }
}
