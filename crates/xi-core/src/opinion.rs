//! Advisory opinion data model.
//!
//! An [`AdvisoryOpinion`] is one upstream source's recommendation for a
//! query. Opinions are request-scoped: the engine receives an
//! [`OpinionSet`] per request, reads it, and drops it with the response.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::Result;

/// Authority tier of an opinion source. Higher ids carry more authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorityId(u32);

impl AuthorityId {
    /// Creates an authority id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw tier number.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for AuthorityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for AuthorityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata attached to an opinion.
///
/// Only the safety score, ethics flag and risk label feed decisions.
/// Fields nobody consumes yet travel in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpinionMetadata {
    /// Safety score assigned by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_score: Option<f64>,
    /// Explicit ethics verdict. `None` means no clearance was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethical_violation: Option<bool>,
    /// Free-form risk label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    /// Source-reported trust in its own data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_score: Option<f64>,
    /// Whether the source audited its inputs before answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_calibrated: Option<bool>,
    /// Forward-compatible escape hatch for unrecognised fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One upstream recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryOpinion {
    /// Authority tier of the source.
    pub id: AuthorityId,
    /// Recommendation text.
    #[serde(default)]
    pub action: String,
    /// Typed metadata.
    #[serde(default)]
    pub metadata: OpinionMetadata,
}

impl AdvisoryOpinion {
    /// Creates an opinion with empty metadata.
    pub fn new(id: u32, action: impl Into<String>) -> Self {
        Self {
            id: AuthorityId::new(id),
            action: action.into(),
            metadata: OpinionMetadata::default(),
        }
    }

    /// Sets the safety score.
    pub fn with_safety_score(mut self, score: f64) -> Self {
        self.metadata.safety_score = Some(score);
        self
    }

    /// Sets the ethics verdict.
    pub fn with_ethical_violation(mut self, violation: bool) -> Self {
        self.metadata.ethical_violation = Some(violation);
        self
    }

    /// Sets the risk label.
    pub fn with_risk_level(mut self, risk: impl Into<String>) -> Self {
        self.metadata.risk_level = Some(risk.into());
        self
    }

    /// Sets the trust score.
    pub fn with_trust_score(mut self, trust: f64) -> Self {
        self.metadata.trust_score = Some(trust);
        self
    }

    /// Marks whether the source calibrated its data.
    pub fn with_data_calibrated(mut self, calibrated: bool) -> Self {
        self.metadata.data_calibrated = Some(calibrated);
        self
    }

    /// Adds an unrecognised metadata field.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }
}

/// The opinions gathered for a single request, keyed by authority.
///
/// Serialized as a map from authority id to opinion. On deserialization
/// every map key must equal the `id` its opinion declares.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OpinionSet {
    opinions: BTreeMap<AuthorityId, AdvisoryOpinion>,
}

impl OpinionSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an opinion, replacing any previous one from the same authority.
    pub fn insert(&mut self, opinion: AdvisoryOpinion) -> Option<AdvisoryOpinion> {
        self.opinions.insert(opinion.id, opinion)
    }

    /// Builder-style insert.
    pub fn with(mut self, opinion: AdvisoryOpinion) -> Self {
        self.insert(opinion);
        self
    }

    /// Looks up the opinion from an authority.
    pub fn get(&self, id: AuthorityId) -> Option<&AdvisoryOpinion> {
        self.opinions.get(&id)
    }

    /// Returns true if the authority contributed an opinion.
    pub fn contains(&self, id: AuthorityId) -> bool {
        self.opinions.contains_key(&id)
    }

    /// Number of opinions in the set.
    pub fn len(&self) -> usize {
        self.opinions.len()
    }

    /// Returns true if no opinions were supplied.
    pub fn is_empty(&self) -> bool {
        self.opinions.is_empty()
    }

    /// Iterates opinions in ascending authority order.
    pub fn iter(&self) -> impl Iterator<Item = &AdvisoryOpinion> {
        self.opinions.values()
    }
}

impl<'de> Deserialize<'de> for OpinionSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let keyed = BTreeMap::<AuthorityId, AdvisoryOpinion>::deserialize(deserializer)?;
        let mut set = Self::new();
        for (key, opinion) in keyed {
            if key != opinion.id {
                return Err(de::Error::custom(format!(
                    "opinion under authority {} declares id {}",
                    key, opinion.id
                )));
            }
            set.insert(opinion);
        }
        Ok(set)
    }
}

impl FromIterator<AdvisoryOpinion> for OpinionSet {
    fn from_iter<I: IntoIterator<Item = AdvisoryOpinion>>(iter: I) -> Self {
        let mut set = Self::new();
        for opinion in iter {
            set.insert(opinion);
        }
        set
    }
}

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterProfile {
    /// Requester identity recorded in the interaction log.
    #[serde(default = "default_requester_id")]
    pub id: String,
    /// Weekday of birth, abbreviated ("Mon", "Tue", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_day: Option<String>,
}

fn default_requester_id() -> String {
    "USER".to_string()
}

impl Default for RequesterProfile {
    fn default() -> Self {
        Self {
            id: default_requester_id(),
            birth_day: None,
        }
    }
}

impl RequesterProfile {
    /// Creates a profile for the given requester.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            birth_day: None,
        }
    }

    /// Sets the birth weekday.
    pub fn with_birth_day(mut self, day: impl Into<String>) -> Self {
        self.birth_day = Some(day.into());
        self
    }
}

/// Upstream provider of advisory opinions.
///
/// The engine treats the source as an external input contract; it never
/// computes opinions itself.
pub trait OpinionSource: Send + Sync {
    /// Returns a short name for diagnostics.
    fn name(&self) -> &str;

    /// Produces the opinions for one request.
    fn fetch(&self, query: &str, profile: &RequesterProfile) -> Result<OpinionSet>;
}

/// A source that always returns the same opinions.
#[derive(Debug, Clone, Default)]
pub struct StaticOpinionSource {
    opinions: OpinionSet,
}

impl StaticOpinionSource {
    /// Wraps a fixed opinion set.
    pub fn new(opinions: OpinionSet) -> Self {
        Self { opinions }
    }
}

impl OpinionSource for StaticOpinionSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self, _query: &str, _profile: &RequesterProfile) -> Result<OpinionSet> {
        Ok(self.opinions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opinion_builder() {
        let opinion = AdvisoryOpinion::new(9, "de-escalate")
            .with_safety_score(4.9)
            .with_ethical_violation(false)
            .with_risk_level("Low");

        assert_eq!(opinion.id, AuthorityId::new(9));
        assert_eq!(opinion.metadata.safety_score, Some(4.9));
        assert_eq!(opinion.metadata.ethical_violation, Some(false));
        assert_eq!(opinion.metadata.risk_level.as_deref(), Some("Low"));
    }

    #[test]
    fn test_opinion_set_replaces_same_authority() {
        let mut set = OpinionSet::new();
        set.insert(AdvisoryOpinion::new(3, "first"));
        let previous = set.insert(AdvisoryOpinion::new(3, "second"));

        assert_eq!(previous.map(|o| o.action), Some("first".to_string()));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(AuthorityId::new(3)).map(|o| o.action.as_str()), Some("second"));
    }

    #[test]
    fn test_opinion_set_deserializes_from_id_map() {
        let json = r#"{
            "9": { "id": 9, "action": "stay safe", "metadata": { "safety_score": 4.2, "mood": "calm" } },
            "2": { "id": 2, "action": "list pros and cons" }
        }"#;
        let set: OpinionSet = serde_json::from_str(json).unwrap();

        assert_eq!(set.len(), 2);
        let top = set.get(AuthorityId::new(9)).unwrap();
        assert_eq!(top.metadata.safety_score, Some(4.2));
        assert_eq!(top.metadata.ethical_violation, None);
        assert_eq!(top.metadata.extra.get("mood"), Some(&serde_json::json!("calm")));
    }

    #[test]
    fn test_opinion_set_rejects_key_id_mismatch() {
        let json = r#"{
            "9": { "id": 3, "action": "low authority text",
                   "metadata": { "safety_score": 4.9, "ethical_violation": false } }
        }"#;
        let err = serde_json::from_str::<OpinionSet>(json).unwrap_err();
        assert!(err.to_string().contains("under authority 9 declares id 3"));
    }

    #[test]
    fn test_opinion_set_json_round_trip_keeps_keys() {
        let set = OpinionSet::new()
            .with(AdvisoryOpinion::new(9, "stay safe").with_safety_score(4.9))
            .with(AdvisoryOpinion::new(3, "review history"));
        let json = serde_json::to_string(&set).unwrap();
        let back: OpinionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_profile_defaults_to_user() {
        let profile: RequesterProfile = serde_json::from_str("{}").unwrap();
        assert_eq!(profile.id, "USER");
        assert!(profile.birth_day.is_none());
    }

    #[test]
    fn test_static_source_returns_clone() {
        let set = OpinionSet::new().with(AdvisoryOpinion::new(1, "gather facts"));
        let source = StaticOpinionSource::new(set.clone());
        let fetched = source.fetch("anything", &RequesterProfile::default()).unwrap();
        assert_eq!(fetched, set);
    }
}
