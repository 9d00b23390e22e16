//! # Xi Core
//!
//! Veto-gated synthesis of advisory opinions into one certified
//! recommendation report.
//!
//! ## Overview
//!
//! An upstream council of nine advisory sources each returns an
//! [`AdvisoryOpinion`] for a query. The engine turns that set into a
//! single [`FinalReport`] in three phases:
//!
//! | Phase | Component | Outcome |
//! |-------|-----------|---------|
//! | 1 | [`VetoGate`] | Halt unless the top authority is safe and ethically cleared |
//! | 2 | [`WeightedAggregator`] | Tiered, weight-tagged themes in fixed order |
//! | 3 | [`ReportComposer`] | Policy header, guidance imprint, safety certificate |
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ OpinionSource  │  ← external upstream
//! └───────┬────────┘
//!         ▼
//! ┌────────────────┐   fail   ┌──────────────┐
//! │   Veto Gate    │ ───────▶ │ HaltedReport │
//! └───────┬────────┘          └──────────────┘
//!         ▼ pass
//! ┌────────────────┐
//! │   Aggregator   │
//! └───────┬────────┘
//!         ▼
//! ┌────────────────┐
//! │ ReportComposer │ ───────▶ FinalReport (CERTIFIED_SAFE)
//! └────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xi_core::{EngineConfig, RequesterProfile, SynthesisOutcome, XiEngine};
//!
//! let engine = XiEngine::new(EngineConfig::default(), Box::new(source))?;
//! match engine.run_synthesis(query, &RequesterProfile::new("Parent"))? {
//!     SynthesisOutcome::Completed(report) => render(report),
//!     SynthesisOutcome::Halted(halted) => resubmit_after(halted.directive),
//! }
//! ```
//!
//! ## Safety Notes
//!
//! - The gate fails closed: a missing safety score counts as 0.0 and a
//!   missing ethics flag counts as a violation
//! - No report is ever produced for a request that failed the gate
//! - Certificates never assume a safe score
//! - Invalid configuration (weights not summing to 1.0, missing imprint
//!   entries) prevents the engine from being constructed

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod opinion;
pub mod report;
pub mod veto;

pub use aggregate::{AggregateSynthesis, Aggregator, ThemeLine, WeightedAggregator};
pub use config::{
    EngineConfig, PolicyConstraint, PriorityWeights, SupplementaryImprint, TierLayout,
};
pub use engine::{Interaction, PipelineStage, StageTracker, SynthesisOutcome, XiEngine};
pub use error::XiError;
pub use events::{EventSink, MemorySink, Severity, SynthesisEvent, TracingSink};
pub use opinion::{
    AdvisoryOpinion, AuthorityId, OpinionMetadata, OpinionSet, OpinionSource, RequesterProfile,
    StaticOpinionSource,
};
pub use report::{
    CertificateStatus, FinalReport, HaltedReport, ReportComposer, SafetyCertificate,
};
pub use veto::{RemediationDirective, VetoDecision, VetoGate, VetoTrigger};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, XiError>;
