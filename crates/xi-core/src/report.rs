//! Report composition and the safety certificate.
//!
//! The composer runs only after the veto gate has passed, which is what
//! makes [`CertificateStatus::CertifiedSafe`] reachable at all.

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateSynthesis;
use crate::config::{EngineConfig, PolicyConstraint, SupplementaryImprint};
use crate::error::XiError;
use crate::opinion::{AuthorityId, OpinionSet, RequesterProfile};
use crate::veto::{RemediationDirective, VetoTrigger};
use crate::Result;

/// Appended to a truncated query excerpt.
pub const ELLIPSIS: &str = "...";

/// Heading above the aggregated themes in the unified text.
pub const AGGREGATE_HEADING: &str = "--- AGGREGATED THEMES ---";

/// Heading above the supplementary guidance block.
pub const IMPRINT_HEADING: &str = "--- SUPPLEMENTARY GUIDANCE ---";

/// Heading above the policy constraints restated in every report.
pub const CONSTRAINT_HEADING: &str = "--- POLICY CONSTRAINTS ---";

/// Attached to every report. No translation is performed.
pub const LOCALIZATION_MARKER: &str =
    "Ready for multilingual rendering (Burmese, English, etc.) for household deployment.";

/// Certification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    /// Veto check passed and constraints were applied.
    CertifiedSafe,
    /// Processing stopped at the veto gate.
    Halted,
}

/// Safety certificate attached to a final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyCertificate {
    /// Top-authority safety score.
    pub safety_score: f64,
    /// Certification outcome.
    pub status: CertificateStatus,
    /// Ids of the constraints checked.
    pub constraints_checked: Vec<String>,
}

/// Consolidated recommendation for a request that cleared the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    /// Who asked.
    pub requester: String,
    /// Header, aggregated themes and guidance as one text.
    pub unified_text: String,
    /// Structured form of the aggregated themes.
    pub aggregate: AggregateSynthesis,
    /// Safety certificate.
    pub certificate: SafetyCertificate,
    /// Localization-readiness marker.
    pub localization_marker: String,
    /// Wall-clock seconds spent on the request.
    pub elapsed_seconds: f64,
}

/// Result for a request stopped by the veto gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaltedReport {
    /// Always [`CertificateStatus::Halted`].
    pub status: CertificateStatus,
    /// Top-authority score as supplied.
    pub safety_score: Option<f64>,
    /// Conditions that failed.
    pub triggers: Vec<VetoTrigger>,
    /// What the caller must do next.
    pub directive: RemediationDirective,
    /// Wall-clock seconds spent on the request.
    pub elapsed_seconds: f64,
}

/// Builds final reports from an aggregate.
#[derive(Debug, Clone)]
pub struct ReportComposer {
    top_authority: AuthorityId,
    imprint: SupplementaryImprint,
    constraints: Vec<PolicyConstraint>,
    certified_constraints: Vec<String>,
    excerpt_chars: usize,
}

impl ReportComposer {
    /// Creates a composer.
    pub fn new(
        top_authority: AuthorityId,
        imprint: SupplementaryImprint,
        constraints: Vec<PolicyConstraint>,
        certified_constraints: Vec<String>,
        excerpt_chars: usize,
    ) -> Self {
        Self {
            top_authority,
            imprint,
            constraints,
            certified_constraints,
            excerpt_chars,
        }
    }

    /// Creates a composer from a validated configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let top = config
            .top_authority()
            .ok_or_else(|| XiError::TierLayout("no authorities configured".to_string()))?;
        Ok(Self::new(
            top,
            config.imprint.clone(),
            config.constraints.clone(),
            config.certified_constraints.clone(),
            config.query_excerpt_chars,
        ))
    }

    /// Composes the final report.
    ///
    /// `elapsed_seconds` is left at zero for the caller to stamp.
    ///
    /// # Errors
    ///
    /// [`XiError::MissingTopAuthority`] or [`XiError::UncertifiedScore`]
    /// if the top-authority opinion or its score is absent. No safe score
    /// is ever assumed.
    pub fn compose(
        &self,
        aggregate: &AggregateSynthesis,
        opinions: &OpinionSet,
        query: &str,
        profile: &RequesterProfile,
    ) -> Result<FinalReport> {
        let top = opinions
            .get(self.top_authority)
            .ok_or(XiError::MissingTopAuthority {
                id: self.top_authority,
            })?;
        let safety_score = top
            .metadata
            .safety_score
            .ok_or(XiError::UncertifiedScore {
                id: self.top_authority,
            })?;

        let mut unified_text = self.header(query, aggregate);
        unified_text.push_str(&self.imprint_block());
        unified_text.push_str(&self.constraint_block());

        Ok(FinalReport {
            requester: profile.id.clone(),
            unified_text,
            aggregate: aggregate.clone(),
            certificate: SafetyCertificate {
                safety_score,
                status: CertificateStatus::CertifiedSafe,
                constraints_checked: self.certified_constraints.clone(),
            },
            localization_marker: LOCALIZATION_MARKER.to_string(),
            elapsed_seconds: 0.0,
        })
    }

    fn header(&self, query: &str, aggregate: &AggregateSynthesis) -> String {
        format!(
            "Unified Action: To address the query '{}' the advice must be ZERO-COST \
             and promote overall well-being.\n{}\n{}",
            excerpt(query, self.excerpt_chars),
            AGGREGATE_HEADING,
            aggregate.render()
        )
    }

    fn imprint_block(&self) -> String {
        format!(
            "\n{}\n\
             • Systemic Focus: {}\n\
             • Empathy Principle: Apply the principle: '{}'\n\
             • Action Focus: Ensure the first step is '{}'\n",
            IMPRINT_HEADING, self.imprint.systemic, self.imprint.empathy, self.imprint.action_focus
        )
    }

    fn constraint_block(&self) -> String {
        let mut block = format!("\n{}\n", CONSTRAINT_HEADING);
        for constraint in &self.constraints {
            block.push_str(&format!("• {}: {}\n", constraint.id, constraint.description));
        }
        block
    }
}

/// First `max_chars` characters of `query`, with [`ELLIPSIS`] if cut.
pub fn excerpt(query: &str, max_chars: usize) -> String {
    match query.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &query[..cut], ELLIPSIS),
        None => query.to_string(),
    }
}
