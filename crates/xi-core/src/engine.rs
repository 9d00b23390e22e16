//! The synthesis engine facade.
//!
//! [`XiEngine`] runs one request at a time through the three phases:
//!
//! 1. Veto gate on the top-authority opinion
//! 2. Weighted aggregation of every opinion
//! 3. Report composition and certification
//!
//! A failed veto short-circuits to [`SynthesisOutcome::Halted`]; phases 2
//! and 3 never run for that request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Instant;

use crate::aggregate::{Aggregator, WeightedAggregator};
use crate::config::EngineConfig;
use crate::error::XiError;
use crate::events::{EventSink, SynthesisEvent, TracingSink};
use crate::opinion::{AuthorityId, OpinionSet, OpinionSource, RequesterProfile};
use crate::report::{CertificateStatus, FinalReport, HaltedReport, ReportComposer};
use crate::veto::{VetoDecision, VetoGate};
use crate::Result;

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Opinions received.
    Received,
    /// Veto gate evaluated.
    VetoChecked,
    /// Opinions combined.
    Aggregated,
    /// Report built.
    Composed,
    /// Report handed back. Terminal.
    Returned,
    /// Stopped by the veto gate. Terminal.
    Halted,
}

impl PipelineStage {
    /// Returns true for stages a request can end in.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Returned | PipelineStage::Halted)
    }

    /// Returns true if `next` directly follows this stage.
    pub fn can_advance_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Received, VetoChecked)
                | (VetoChecked, Aggregated)
                | (VetoChecked, Halted)
                | (Aggregated, Composed)
                | (Composed, Returned)
        )
    }
}

/// Enforces forward-only stage transitions for one request.
pub struct StageTracker<'a> {
    current: PipelineStage,
    sink: &'a dyn EventSink,
}

impl<'a> StageTracker<'a> {
    /// Starts a request in [`PipelineStage::Received`].
    pub fn start(sink: &'a dyn EventSink) -> Self {
        sink.emit(&SynthesisEvent::StageEntered {
            stage: PipelineStage::Received,
        });
        Self {
            current: PipelineStage::Received,
            sink,
        }
    }

    /// Current stage.
    pub fn current(&self) -> PipelineStage {
        self.current
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// [`XiError::Internal`] if `next` does not directly follow the
    /// current stage.
    pub fn advance(&mut self, next: PipelineStage) -> Result<()> {
        if !self.current.can_advance_to(next) {
            return Err(XiError::Internal(format!(
                "illegal stage transition {:?} -> {:?}",
                self.current, next
            )));
        }
        self.current = next;
        self.sink.emit(&SynthesisEvent::StageEntered { stage: next });
        Ok(())
    }
}

/// Result of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SynthesisOutcome {
    /// The request cleared the gate and produced a report.
    Completed(FinalReport),
    /// The request was stopped at the gate.
    Halted(HaltedReport),
}

impl SynthesisOutcome {
    /// Returns true if the veto gate stopped the request.
    pub fn is_halted(&self) -> bool {
        matches!(self, SynthesisOutcome::Halted(_))
    }

    /// Certificate status of the outcome.
    pub fn status(&self) -> CertificateStatus {
        match self {
            SynthesisOutcome::Completed(report) => report.certificate.status,
            SynthesisOutcome::Halted(halted) => halted.status,
        }
    }

    /// Wall-clock seconds spent.
    pub fn elapsed_seconds(&self) -> f64 {
        match self {
            SynthesisOutcome::Completed(report) => report.elapsed_seconds,
            SynthesisOutcome::Halted(halted) => halted.elapsed_seconds,
        }
    }

    /// The final report, if one was produced.
    pub fn report(&self) -> Option<&FinalReport> {
        match self {
            SynthesisOutcome::Completed(report) => Some(report),
            SynthesisOutcome::Halted(_) => None,
        }
    }
}

/// One completed request in the interaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Requester identity.
    pub requester: String,
    /// The query text.
    pub query: String,
    /// When the report was returned.
    pub recorded_at: DateTime<Utc>,
}

/// The Xi synthesis engine.
///
/// Configuration and components are read-only after construction. The
/// interaction log is the only shared mutable state and is guarded by a
/// mutex, so one engine may serve concurrent callers.
///
/// # Example
///
/// ```rust
/// use xi_core::{AdvisoryOpinion, EngineConfig, OpinionSet, RequesterProfile,
///     StaticOpinionSource, XiEngine};
///
/// let opinions = OpinionSet::new().with(
///     AdvisoryOpinion::new(9, "De-escalate first.")
///         .with_safety_score(4.9)
///         .with_ethical_violation(false),
/// );
/// let engine = XiEngine::new(
///     EngineConfig::default(),
///     Box::new(StaticOpinionSource::new(opinions)),
/// )?;
///
/// let outcome = engine.run_synthesis("How do we settle this?", &RequesterProfile::default())?;
/// assert!(!outcome.is_halted());
/// # Ok::<(), xi_core::XiError>(())
/// ```
pub struct XiEngine {
    config: EngineConfig,
    top_authority: AuthorityId,
    source: Box<dyn OpinionSource>,
    gate: VetoGate,
    aggregator: Box<dyn Aggregator>,
    composer: ReportComposer,
    sink: Box<dyn EventSink>,
    interactions: Mutex<Vec<Interaction>>,
}

impl XiEngine {
    /// Creates an engine with the weighted aggregator and tracing output.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any invariant fails.
    pub fn new(config: EngineConfig, source: Box<dyn OpinionSource>) -> Result<Self> {
        let aggregator = WeightedAggregator::new(config.weights.clone(), config.tiers.clone());
        Self::with_components(config, source, Box::new(aggregator), Box::new(TracingSink))
    }

    /// Creates an engine with custom components.
    pub fn with_components(
        config: EngineConfig,
        source: Box<dyn OpinionSource>,
        aggregator: Box<dyn Aggregator>,
        sink: Box<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        let top_authority = config
            .top_authority()
            .ok_or_else(|| XiError::TierLayout("no authorities configured".to_string()))?;
        let composer = ReportComposer::from_config(&config)?;

        Ok(Self {
            gate: VetoGate::new(config.safety_floor),
            top_authority,
            config,
            source,
            aggregator,
            composer,
            sink,
            interactions: Mutex::new(Vec::new()),
        })
    }

    /// Fetches opinions from the configured source and runs the pipeline.
    pub fn run_synthesis(&self, query: &str, profile: &RequesterProfile) -> Result<SynthesisOutcome> {
        let started = Instant::now();
        let opinions = self.source.fetch(query, profile).map_err(|e| {
            self.sink.emit(&SynthesisEvent::RequestFailed {
                reason: e.to_string(),
            });
            e
        })?;
        self.pipeline(query, profile, &opinions, started)
    }

    /// Runs the pipeline on an externally supplied opinion set.
    pub fn synthesize_opinions(
        &self,
        query: &str,
        profile: &RequesterProfile,
        opinions: &OpinionSet,
    ) -> Result<SynthesisOutcome> {
        self.pipeline(query, profile, opinions, Instant::now())
    }

    fn pipeline(
        &self,
        query: &str,
        profile: &RequesterProfile,
        opinions: &OpinionSet,
        started: Instant,
    ) -> Result<SynthesisOutcome> {
        self.sink.emit(&SynthesisEvent::RequestReceived {
            requester: profile.id.clone(),
            query_chars: query.chars().count(),
            opinions: opinions.len(),
        });
        let mut stage = StageTracker::start(self.sink.as_ref());

        // Phase 1: veto gate
        let top = match opinions.get(self.top_authority) {
            Some(top) => top,
            None => {
                let err = XiError::MissingTopAuthority {
                    id: self.top_authority,
                };
                self.sink.emit(&SynthesisEvent::RequestFailed {
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        let decision = self.gate.evaluate(top);
        stage.advance(PipelineStage::VetoChecked)?;

        match decision {
            VetoDecision::Halt {
                safety_score,
                triggers,
                directive,
            } => {
                self.sink.emit(&SynthesisEvent::VetoHalted {
                    safety_score,
                    floor: self.gate.floor(),
                    triggers: triggers.clone(),
                    directive,
                });
                stage.advance(PipelineStage::Halted)?;
                return Ok(SynthesisOutcome::Halted(HaltedReport {
                    status: CertificateStatus::Halted,
                    safety_score,
                    triggers,
                    directive,
                    elapsed_seconds: elapsed_since(started),
                }));
            }
            VetoDecision::Pass { safety_score } => {
                self.sink.emit(&SynthesisEvent::VetoPassed {
                    safety_score,
                    floor: self.gate.floor(),
                });
            }
        }

        // Phase 2: weighted aggregation
        let aggregate = self.aggregator.combine(opinions);
        stage.advance(PipelineStage::Aggregated)?;
        self.sink.emit(&SynthesisEvent::AggregationComplete {
            priority_themes: aggregate.priority.len(),
            baseline_themes: aggregate.baseline.len(),
        });

        // Phase 3: report composition
        let mut report = self.composer.compose(&aggregate, opinions, query, profile)?;
        stage.advance(PipelineStage::Composed)?;

        report.elapsed_seconds = elapsed_since(started);
        self.record(profile, query);
        self.sink.emit(&SynthesisEvent::ReportComposed {
            elapsed_seconds: report.elapsed_seconds,
        });
        stage.advance(PipelineStage::Returned)?;

        Ok(SynthesisOutcome::Completed(report))
    }

    fn record(&self, profile: &RequesterProfile, query: &str) {
        let entry = Interaction {
            requester: profile.id.clone(),
            query: query.to_string(),
            recorded_at: Utc::now(),
        };
        self.interactions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }

    /// Snapshot of the interaction log, oldest first.
    pub fn interactions(&self) -> Vec<Interaction> {
        self.interactions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The validated configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Authority whose opinion the veto gate inspects.
    pub fn top_authority(&self) -> AuthorityId {
        self.top_authority
    }

    /// Name of the configured opinion source.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

fn elapsed_since(started: Instant) -> f64 {
    let secs = started.elapsed().as_secs_f64();
    (secs * 10_000.0).round() / 10_000.0
}
