//! Configuration types for the Xi engine.
//!
//! The configuration is loaded once, validated, and then shared read-only
//! by every request. [`EngineConfig::default`] is the reference scheme:
//! nine authorities with the top three forming the priority tier.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::XiError;
use crate::opinion::AuthorityId;
use crate::Result;

/// Tolerance used when checking that weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Default minimum acceptable safety score.
pub const DEFAULT_SAFETY_FLOOR: f64 = 3.5;

/// Default query excerpt length in characters.
pub const DEFAULT_QUERY_EXCERPT_CHARS: usize = 40;

/// Configuration for the synthesis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Priority weight per authority.
    pub weights: PriorityWeights,

    /// Tier membership and render order.
    pub tiers: TierLayout,

    /// Minimum acceptable top-authority safety score.
    pub safety_floor: f64,

    /// Guidance injected into every report.
    pub imprint: SupplementaryImprint,

    /// Named policy constraints.
    pub constraints: Vec<PolicyConstraint>,

    /// Constraint ids listed on every safety certificate.
    pub certified_constraints: Vec<String>,

    /// Query prefix length shown in the report header.
    pub query_excerpt_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: PriorityWeights::default(),
            tiers: TierLayout::default(),
            safety_floor: DEFAULT_SAFETY_FLOOR,
            imprint: SupplementaryImprint::default(),
            constraints: PolicyConstraint::reference_set(),
            certified_constraints: vec!["C_ZC".to_string(), "C_NH".to_string()],
            query_excerpt_chars: DEFAULT_QUERY_EXCERPT_CHARS,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Authority whose opinion holds veto power: the largest configured id.
    pub fn top_authority(&self) -> Option<AuthorityId> {
        self.weights.ids().max()
    }

    /// Looks up a constraint definition by id.
    pub fn constraint(&self, id: &str) -> Option<&PolicyConstraint> {
        self.constraints.iter().find(|c| c.id == id)
    }

    /// Checks every configuration invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant. An engine is never built
    /// from a configuration that fails here.
    pub fn validate(&self) -> Result<()> {
        if !self.safety_floor.is_finite() || self.safety_floor < 0.0 {
            return Err(XiError::InvalidSafetyFloor(self.safety_floor));
        }

        self.weights.validate()?;
        self.tiers.validate(&self.weights)?;
        self.imprint.validate()?;

        for id in &self.certified_constraints {
            if self.constraint(id).is_none() {
                return Err(XiError::UnknownConstraint(id.clone()));
            }
        }

        Ok(())
    }
}

/// Fractional weight per authority id. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityWeights(BTreeMap<AuthorityId, f64>);

impl Default for PriorityWeights {
    fn default() -> Self {
        Self::from_pairs([
            (1, 0.05),
            (2, 0.05),
            (3, 0.05),
            (4, 0.05),
            (5, 0.05),
            (6, 0.10),
            (7, 0.15),
            (8, 0.20),
            (9, 0.30),
        ])
    }
}

impl PriorityWeights {
    /// Builds weights from `(id, weight)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f64)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(id, w)| (AuthorityId::new(id), w))
                .collect(),
        )
    }

    /// Weight of an authority, 0.0 if unconfigured.
    pub fn get(&self, id: AuthorityId) -> f64 {
        self.0.get(&id).copied().unwrap_or(0.0)
    }

    /// Returns true if the authority has a configured weight.
    pub fn contains(&self, id: AuthorityId) -> bool {
        self.0.contains_key(&id)
    }

    /// Configured ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = AuthorityId> + '_ {
        self.0.keys().copied()
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    fn validate(&self) -> Result<()> {
        for (&id, &weight) in &self.0 {
            if !(0.0..=1.0).contains(&weight) {
                return Err(XiError::WeightOutOfRange { id, weight });
            }
        }

        let sum = self.total();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(XiError::WeightSum { sum });
        }
        Ok(())
    }
}

/// Partition of authorities into the priority and baseline tiers.
///
/// Each list is stored in render order: priority ids from highest to
/// lowest, baseline ids ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLayout {
    /// High-priority tier, rendered first.
    pub priority: Vec<AuthorityId>,
    /// Baseline tier, rendered second.
    pub baseline: Vec<AuthorityId>,
}

impl Default for TierLayout {
    fn default() -> Self {
        Self::split_top(&PriorityWeights::default(), 3)
    }
}

impl TierLayout {
    /// Puts the `top` highest configured ids into the priority tier.
    pub fn split_top(weights: &PriorityWeights, top: usize) -> Self {
        let ids: Vec<AuthorityId> = weights.ids().collect();
        let cut = ids.len().saturating_sub(top);
        let mut priority = ids[cut..].to_vec();
        priority.reverse();
        Self {
            priority,
            baseline: ids[..cut].to_vec(),
        }
    }

    fn validate(&self, weights: &PriorityWeights) -> Result<()> {
        if self.priority.is_empty() {
            return Err(XiError::TierLayout("priority tier is empty".to_string()));
        }

        let mut seen = BTreeSet::new();
        for id in self.priority.iter().chain(&self.baseline) {
            if !seen.insert(*id) {
                return Err(XiError::TierLayout(format!(
                    "authority {} appears more than once",
                    id
                )));
            }
            if !weights.contains(*id) {
                return Err(XiError::TierLayout(format!(
                    "authority {} has no configured weight",
                    id
                )));
            }
        }

        if let Some(unplaced) = weights.ids().find(|id| !seen.contains(id)) {
            return Err(XiError::TierLayout(format!(
                "authority {} is not assigned to a tier",
                unplaced
            )));
        }

        let top = weights.ids().max();
        if top.is_some() && self.priority.first().copied() != top {
            return Err(XiError::TierLayout(
                "priority tier must start with the top authority".to_string(),
            ));
        }

        Ok(())
    }
}

/// Guidance lines injected verbatim into every report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplementaryImprint {
    /// Systems-level guidance.
    pub systemic: String,
    /// Empathy principle.
    pub empathy: String,
    /// Action-focus guidance.
    pub action_focus: String,
}

impl Default for SupplementaryImprint {
    fn default() -> Self {
        Self {
            systemic: "Address the relationship/system, not just the individual.".to_string(),
            empathy: "Identify the underlying unmet need behind the conflict.".to_string(),
            action_focus: "Focus on practical, small steps toward a desired future solution."
                .to_string(),
        }
    }
}

impl SupplementaryImprint {
    fn validate(&self) -> Result<()> {
        let entries = [
            ("systemic", &self.systemic),
            ("empathy", &self.empathy),
            ("action_focus", &self.action_focus),
        ];
        for (name, value) in entries {
            if value.trim().is_empty() {
                return Err(XiError::MissingImprint(name));
            }
        }
        Ok(())
    }
}

/// A named policy constraint checked before certification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConstraint {
    /// Short identifier, e.g. `C_ZC`.
    pub id: String,
    /// Human-readable description.
    pub description: String,
}

impl PolicyConstraint {
    /// Creates a constraint.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }

    /// Zero-cost, non-harm and well-being constraints.
    pub fn reference_set() -> Vec<Self> {
        vec![
            Self::new("C_ZC", "Zero-Cost Constraint (No financial expense allowed)"),
            Self::new("C_NH", "Non-Harm Constraint (Must be ethically non-harmful)"),
            Self::new(
                "LMM_GAMMA",
                "Life Management Mandate Gamma (Prioritize overall well-being)",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.top_authority(), Some(AuthorityId::new(9)));
        assert!((config.safety_floor - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_tiers() {
        let tiers = TierLayout::default();
        let priority: Vec<u32> = tiers.priority.iter().map(|id| id.value()).collect();
        let baseline: Vec<u32> = tiers.baseline.iter().map(|id| id.value()).collect();
        assert_eq!(priority, vec![9, 8, 7]);
        assert_eq!(baseline, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!((PriorityWeights::default().total() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn test_weight_sum_violation_rejected() {
        let mut config = EngineConfig::default();
        config.weights = PriorityWeights::from_pairs([
            (1, 0.05),
            (2, 0.05),
            (3, 0.05),
            (4, 0.05),
            (5, 0.05),
            (6, 0.10),
            (7, 0.15),
            (8, 0.20),
            (9, 0.25),
        ]);
        assert!(matches!(config.validate(), Err(XiError::WeightSum { .. })));
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let mut config = EngineConfig::default();
        config.weights = PriorityWeights::from_pairs([(1, -0.5), (2, 0.5), (3, 1.0)]);
        config.tiers = TierLayout::split_top(&config.weights, 1);
        assert!(matches!(
            config.validate(),
            Err(XiError::WeightOutOfRange { .. })
        ));
    }

    #[test]
    fn test_blank_imprint_rejected() {
        let mut config = EngineConfig::default();
        config.imprint.empathy = "   ".to_string();
        assert!(matches!(
            config.validate(),
            Err(XiError::MissingImprint("empathy"))
        ));
    }

    #[test]
    fn test_unplaced_authority_rejected() {
        let mut config = EngineConfig::default();
        config.tiers.baseline.pop();
        assert!(matches!(config.validate(), Err(XiError::TierLayout(_))));
    }

    #[test]
    fn test_duplicate_tier_member_rejected() {
        let mut config = EngineConfig::default();
        config.tiers.baseline.push(AuthorityId::new(9));
        assert!(matches!(config.validate(), Err(XiError::TierLayout(_))));
    }

    #[test]
    fn test_priority_must_lead_with_top_authority() {
        let mut config = EngineConfig::default();
        config.tiers.priority = vec![AuthorityId::new(7), AuthorityId::new(8), AuthorityId::new(9)];
        assert!(matches!(config.validate(), Err(XiError::TierLayout(_))));
    }

    #[test]
    fn test_unknown_certified_constraint_rejected() {
        let mut config = EngineConfig::default();
        config.certified_constraints.push("C_XX".to_string());
        assert!(matches!(
            config.validate(),
            Err(XiError::UnknownConstraint(id)) if id == "C_XX"
        ));
    }

    #[test]
    fn test_negative_floor_rejected() {
        let mut config = EngineConfig::default();
        config.safety_floor = -1.0;
        assert!(matches!(
            config.validate(),
            Err(XiError::InvalidSafetyFloor(_))
        ));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "safety_floor": 4.0 }"#).unwrap();
        assert!((config.safety_floor - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.query_excerpt_chars, 40);
    }

    #[test]
    fn test_missing_imprint_field_fails_parse() {
        let json = r#"{ "imprint": { "systemic": "a", "empathy": "b" } }"#;
        let err = EngineConfig::from_json_str(json).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("xi.json");
        std::fs::write(&path, r#"{ "query_excerpt_chars": 12 }"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.query_excerpt_chars, 12);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = EngineConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, XiError::Io(_)));
    }
}
