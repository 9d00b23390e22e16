//! The safety veto gate.
//!
//! The gate inspects the top-authority opinion only. It fails closed:
//! a missing safety score counts as 0.0 and a missing ethics flag counts
//! as a violation. A failed check is terminal for the request; nothing
//! downstream may run.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::opinion::AdvisoryOpinion;

/// Score assumed when the top authority supplies none.
pub const MISSING_SCORE: f64 = 0.0;

/// A condition that caused the gate to halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VetoTrigger {
    /// Safety score fell below the floor.
    ScoreBelowFloor,
    /// The non-harm constraint was violated or never cleared.
    EthicsViolation,
}

impl fmt::Display for VetoTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VetoTrigger::ScoreBelowFloor => write!(f, "safety score below floor"),
            VetoTrigger::EthicsViolation => write!(f, "non-harm constraint violated"),
        }
    }
}

/// Instruction issued to the caller after a halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemediationDirective {
    /// The top authority must refine its action and the caller resubmit.
    RefineAndResubmit,
}

impl fmt::Display for RemediationDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationDirective::RefineAndResubmit => write!(f, "C_Refine"),
        }
    }
}

/// Outcome of a veto check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VetoDecision {
    /// The request may proceed.
    Pass {
        /// The verified safety score.
        safety_score: f64,
    },
    /// The request is halted.
    Halt {
        /// The score as supplied, `None` if absent.
        safety_score: Option<f64>,
        /// Every condition that failed.
        triggers: Vec<VetoTrigger>,
        /// What the caller must do.
        directive: RemediationDirective,
    },
}

impl VetoDecision {
    /// Returns true if the request may proceed.
    pub fn passed(&self) -> bool {
        matches!(self, VetoDecision::Pass { .. })
    }

    /// Triggers that caused a halt; empty on pass.
    pub fn triggers(&self) -> &[VetoTrigger] {
        match self {
            VetoDecision::Pass { .. } => &[],
            VetoDecision::Halt { triggers, .. } => triggers,
        }
    }
}

/// Hard safety precondition on the top-authority opinion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VetoGate {
    floor: f64,
}

impl VetoGate {
    /// Creates a gate with the given safety floor.
    pub fn new(floor: f64) -> Self {
        Self { floor }
    }

    /// The configured floor.
    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Returns true if the opinion clears the gate.
    pub fn check(&self, top_authority: &AdvisoryOpinion) -> bool {
        self.evaluate(top_authority).passed()
    }

    /// Evaluates the opinion and reports which conditions failed.
    ///
    /// Fails if `safety_score < floor` or the ethics flag is set. Both
    /// conditions are checked so the halt lists every cause.
    pub fn evaluate(&self, top_authority: &AdvisoryOpinion) -> VetoDecision {
        let supplied = top_authority.metadata.safety_score;
        let score = supplied.unwrap_or(MISSING_SCORE);
        let violation = top_authority.metadata.ethical_violation.unwrap_or(true);

        let mut triggers = Vec::new();
        if score.is_nan() || score < self.floor {
            triggers.push(VetoTrigger::ScoreBelowFloor);
        }
        if violation {
            triggers.push(VetoTrigger::EthicsViolation);
        }

        if triggers.is_empty() {
            VetoDecision::Pass {
                safety_score: score,
            }
        } else {
            VetoDecision::Halt {
                safety_score: supplied,
                triggers,
                directive: RemediationDirective::RefineAndResubmit,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top(score: Option<f64>, violation: Option<bool>) -> AdvisoryOpinion {
        let mut opinion = AdvisoryOpinion::new(9, "de-escalate");
        opinion.metadata.safety_score = score;
        opinion.metadata.ethical_violation = violation;
        opinion
    }

    #[test]
    fn test_pass_above_floor_with_clearance() {
        let gate = VetoGate::new(3.5);
        let decision = gate.evaluate(&top(Some(4.9), Some(false)));
        assert_eq!(decision, VetoDecision::Pass { safety_score: 4.9 });
    }

    #[test]
    fn test_score_equal_to_floor_passes() {
        let gate = VetoGate::new(3.5);
        assert!(gate.check(&top(Some(3.5), Some(false))));
    }

    #[test]
    fn test_score_below_floor_halts() {
        let gate = VetoGate::new(3.5);
        let decision = gate.evaluate(&top(Some(3.0), Some(false)));
        assert!(!decision.passed());
        assert_eq!(decision.triggers(), &[VetoTrigger::ScoreBelowFloor]);
    }

    #[test]
    fn test_ethics_violation_halts() {
        let gate = VetoGate::new(3.5);
        let decision = gate.evaluate(&top(Some(4.9), Some(true)));
        assert_eq!(decision.triggers(), &[VetoTrigger::EthicsViolation]);
    }

    #[test]
    fn test_both_conditions_reported() {
        let gate = VetoGate::new(3.5);
        let decision = gate.evaluate(&top(Some(1.0), Some(true)));
        assert_eq!(
            decision.triggers(),
            &[VetoTrigger::ScoreBelowFloor, VetoTrigger::EthicsViolation]
        );
    }

    #[test]
    fn test_missing_ethics_flag_is_violation() {
        let gate = VetoGate::new(3.5);
        let decision = gate.evaluate(&top(Some(4.9), None));
        assert_eq!(decision.triggers(), &[VetoTrigger::EthicsViolation]);
    }

    #[test]
    fn test_missing_score_fails_closed() {
        let gate = VetoGate::new(3.5);
        match gate.evaluate(&top(None, Some(false))) {
            VetoDecision::Halt {
                safety_score,
                triggers,
                directive,
            } => {
                assert_eq!(safety_score, None);
                assert_eq!(triggers, vec![VetoTrigger::ScoreBelowFloor]);
                assert_eq!(directive, RemediationDirective::RefineAndResubmit);
            }
            other => panic!("Expected Halt, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_score_halts() {
        let gate = VetoGate::new(3.5);
        assert!(!gate.check(&top(Some(f64::NAN), Some(false))));
    }

    #[test]
    fn test_gate_does_not_mutate_opinion() {
        let gate = VetoGate::new(3.5);
        let opinion = top(Some(2.0), None);
        let before = opinion.clone();
        let _ = gate.evaluate(&opinion);
        assert_eq!(opinion, before);
    }

    #[test]
    fn test_directive_display() {
        assert_eq!(RemediationDirective::RefineAndResubmit.to_string(), "C_Refine");
    }
}
