//! Priority-weighted thematic aggregation.
//!
//! Opinions carry qualitative recommendations, so nothing is averaged.
//! Each present authority contributes one line tagged with its display
//! weight. Ordering comes from the tier layout alone, never from opinion
//! content or map iteration, so identical input gives identical text.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{PriorityWeights, TierLayout};
use crate::opinion::{AuthorityId, OpinionSet};

/// Heading above the high-priority lines.
pub const PRIORITY_HEADING: &str = "-- PRIORITY THEMES --";

/// Heading above the baseline lines.
pub const BASELINE_HEADING: &str = "-- BASELINE THEMES --";

/// One rendered contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeLine {
    /// Contributing authority.
    pub id: AuthorityId,
    /// Configured weight of that authority.
    pub weight: f64,
    /// Recommendation text.
    pub action: String,
}

impl fmt::Display for ThemeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.0}% Weight) {}", self.weight * 100.0, self.action)
    }
}

/// Tiered combination of the surviving opinions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSynthesis {
    /// High-priority lines, highest authority first.
    pub priority: Vec<ThemeLine>,
    /// Baseline lines, lowest authority first.
    pub baseline: Vec<ThemeLine>,
}

impl AggregateSynthesis {
    /// Renders both sections as text.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Returns true if no authority contributed.
    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.baseline.is_empty()
    }
}

impl fmt::Display for AggregateSynthesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", PRIORITY_HEADING)?;
        for line in &self.priority {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", BASELINE_HEADING)?;
        for line in &self.baseline {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Combines an opinion set into an [`AggregateSynthesis`].
pub trait Aggregator: Send + Sync {
    /// Combines the opinions. Never fails: missing authorities are skipped.
    fn combine(&self, opinions: &OpinionSet) -> AggregateSynthesis;
}

/// Aggregator driven by the configured weights and tier layout.
#[derive(Debug, Clone)]
pub struct WeightedAggregator {
    weights: PriorityWeights,
    tiers: TierLayout,
}

impl WeightedAggregator {
    /// Creates an aggregator.
    pub fn new(weights: PriorityWeights, tiers: TierLayout) -> Self {
        Self { weights, tiers }
    }

    fn tier_lines(&self, ids: &[AuthorityId], opinions: &OpinionSet) -> Vec<ThemeLine> {
        ids.iter()
            .filter_map(|&id| opinions.get(id))
            .map(|opinion| ThemeLine {
                id: opinion.id,
                weight: self.weights.get(opinion.id),
                action: opinion.action.clone(),
            })
            .collect()
    }
}

impl Aggregator for WeightedAggregator {
    fn combine(&self, opinions: &OpinionSet) -> AggregateSynthesis {
        AggregateSynthesis {
            priority: self.tier_lines(&self.tiers.priority, opinions),
            baseline: self.tier_lines(&self.tiers.baseline, opinions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opinion::AdvisoryOpinion;

    fn aggregator() -> WeightedAggregator {
        WeightedAggregator::new(PriorityWeights::default(), TierLayout::default())
    }

    fn ids(lines: &[ThemeLine]) -> Vec<u32> {
        lines.iter().map(|l| l.id.value()).collect()
    }

    #[test]
    fn test_theme_line_display() {
        let line = ThemeLine {
            id: AuthorityId::new(9),
            weight: 0.30,
            action: "Stay safe.".to_string(),
        };
        assert_eq!(line.to_string(), "(30% Weight) Stay safe.");
    }

    #[test]
    fn test_tier_ordering_is_fixed() {
        let opinions: OpinionSet = [3, 9, 1, 7, 8]
            .into_iter()
            .map(|id| AdvisoryOpinion::new(id, format!("action {}", id)))
            .collect();

        let agg = aggregator().combine(&opinions);
        assert_eq!(ids(&agg.priority), vec![9, 8, 7]);
        assert_eq!(ids(&agg.baseline), vec![1, 3]);
    }

    #[test]
    fn test_unconfigured_authority_ignored() {
        let opinions = OpinionSet::new()
            .with(AdvisoryOpinion::new(9, "top"))
            .with(AdvisoryOpinion::new(42, "stray"));

        let agg = aggregator().combine(&opinions);
        assert_eq!(ids(&agg.priority), vec![9]);
        assert!(agg.baseline.is_empty());
        assert!(!agg.render().contains("stray"));
    }

    #[test]
    fn test_empty_input_yields_empty_sections() {
        let agg = aggregator().combine(&OpinionSet::new());
        assert!(agg.is_empty());
        assert_eq!(
            agg.render(),
            format!("{}\n\n{}\n", PRIORITY_HEADING, BASELINE_HEADING)
        );
    }

    #[test]
    fn test_rendered_weights() {
        let opinions = OpinionSet::new()
            .with(AdvisoryOpinion::new(7, "timing"))
            .with(AdvisoryOpinion::new(6, "audit"))
            .with(AdvisoryOpinion::new(2, "pros and cons"));

        let text = aggregator().combine(&opinions).render();
        assert!(text.contains("(15% Weight) timing"));
        assert!(text.contains("(10% Weight) audit"));
        assert!(text.contains("(5% Weight) pros and cons"));
    }

    #[test]
    fn test_combine_is_idempotent() {
        let opinions: OpinionSet = (1..=9)
            .map(|id| AdvisoryOpinion::new(id, format!("step {}", id)))
            .collect();
        let agg = aggregator();
        assert_eq!(agg.combine(&opinions).render(), agg.combine(&opinions).render());
    }
}
