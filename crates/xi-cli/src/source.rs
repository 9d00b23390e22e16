//! Simulated advisory council.
//!
//! Stands in for the real upstream until one exists. Opinions are fixed
//! except for the top-authority safety score, which drops when the query
//! mentions danger, and the timing note, which turns cautious when the
//! requester was born on today's weekday.

use chrono::{Datelike, Local, Weekday};
use xi_core::{AdvisoryOpinion, OpinionSet, OpinionSource, RequesterProfile};

/// Score given when no danger is detected.
const CLEAR_SCORE: f64 = 4.9;

/// Score given when the query mentions danger.
const DANGER_SCORE: f64 = 3.0;

/// Opinion source that simulates nine council members.
pub struct SimulatedCouncil {
    today: Weekday,
}

impl Default for SimulatedCouncil {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCouncil {
    /// Uses the local weekday.
    pub fn new() -> Self {
        Self::with_today(Local::now().weekday())
    }

    /// Pins the weekday used for the timing check.
    pub fn with_today(today: Weekday) -> Self {
        Self { today }
    }

    fn timing_risk(&self, profile: &RequesterProfile) -> &'static str {
        let born_today = profile
            .birth_day
            .as_deref()
            .map(|day| day.eq_ignore_ascii_case(&self.today.to_string()))
            .unwrap_or(false);
        if born_today {
            "Elevated Caution: Decision-making might be impaired today."
        } else {
            "Low"
        }
    }
}

impl OpinionSource for SimulatedCouncil {
    fn name(&self) -> &str {
        "simulated-council"
    }

    fn fetch(&self, query: &str, profile: &RequesterProfile) -> xi_core::Result<OpinionSet> {
        let score = if query.to_lowercase().contains("dangerous") {
            DANGER_SCORE
        } else {
            CLEAR_SCORE
        };
        let risk = self.timing_risk(profile);

        Ok(OpinionSet::new()
            .with(AdvisoryOpinion::new(1, "Gather more raw facts on the situation.").with_trust_score(0.8))
            .with(AdvisoryOpinion::new(2, "List pros and cons of possible resolutions.").with_trust_score(0.9))
            .with(AdvisoryOpinion::new(3, "Review similar historical family cases.").with_trust_score(0.7))
            .with(AdvisoryOpinion::new(4, "Recommend a short-term practical fix.").with_trust_score(0.85))
            .with(AdvisoryOpinion::new(5, "Suggest alternative options (3 total).").with_trust_score(0.95))
            .with(
                AdvisoryOpinion::new(6, "Audit data for inconsistencies before action.")
                    .with_data_calibrated(true),
            )
            .with(
                AdvisoryOpinion::new(7, format!("Incorporate {} into the final timing.", risk))
                    .with_risk_level(risk),
            )
            .with(
                AdvisoryOpinion::new(8, "Ensure resolution respects all member's intrinsic worth.")
                    .with_ethical_violation(false)
                    .with_extra("virtues_check", serde_json::json!("Necessary")),
            )
            .with(
                AdvisoryOpinion::new(9, "The primary goal is de-escalation and safety.")
                    .with_safety_score(score)
                    .with_ethical_violation(false),
            ))
    }
}
