//! Structured pipeline events.
//!
//! Decision logic never prints. Each notable step produces a
//! [`SynthesisEvent`] that an [`EventSink`] turns into log lines, UI
//! output, or an in-memory record.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::engine::PipelineStage;
use crate::veto::{RemediationDirective, VetoTrigger};

/// Severity attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Stage bookkeeping.
    Debug,
    /// Normal progress.
    Info,
    /// A request was halted.
    Warning,
    /// A request could not be evaluated.
    Error,
}

/// Something that happened while processing a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SynthesisEvent {
    /// A request entered the pipeline.
    RequestReceived {
        /// Requester identity.
        requester: String,
        /// Query length in characters.
        query_chars: usize,
        /// Number of opinions supplied.
        opinions: usize,
    },
    /// The pipeline moved to a new stage.
    StageEntered {
        /// The stage just entered.
        stage: PipelineStage,
    },
    /// The veto gate cleared the request.
    VetoPassed {
        /// Top-authority safety score.
        safety_score: f64,
        /// Configured floor.
        floor: f64,
    },
    /// The veto gate halted the request.
    VetoHalted {
        /// Top-authority safety score, if one was supplied.
        safety_score: Option<f64>,
        /// Configured floor.
        floor: f64,
        /// Conditions that failed.
        triggers: Vec<VetoTrigger>,
        /// What the caller must do next.
        directive: RemediationDirective,
    },
    /// Opinions were combined.
    AggregationComplete {
        /// Lines in the priority section.
        priority_themes: usize,
        /// Lines in the baseline section.
        baseline_themes: usize,
    },
    /// The final report was produced.
    ReportComposed {
        /// Wall-clock time spent on the request.
        elapsed_seconds: f64,
    },
    /// The request failed before a decision could be made.
    RequestFailed {
        /// Error description.
        reason: String,
    },
}

impl SynthesisEvent {
    /// Severity of this event.
    pub fn severity(&self) -> Severity {
        match self {
            SynthesisEvent::StageEntered { .. } => Severity::Debug,
            SynthesisEvent::RequestReceived { .. }
            | SynthesisEvent::VetoPassed { .. }
            | SynthesisEvent::AggregationComplete { .. }
            | SynthesisEvent::ReportComposed { .. } => Severity::Info,
            SynthesisEvent::VetoHalted { .. } => Severity::Warning,
            SynthesisEvent::RequestFailed { .. } => Severity::Error,
        }
    }
}

/// Consumer of pipeline events.
pub trait EventSink: Send + Sync {
    /// Receives one event.
    fn emit(&self, event: &SynthesisEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SynthesisEvent) {
        match event {
            SynthesisEvent::RequestReceived {
                requester,
                query_chars,
                opinions,
            } => info!(%requester, query_chars, opinions, "synthesis request received"),
            SynthesisEvent::StageEntered { stage } => debug!(?stage, "pipeline stage entered"),
            SynthesisEvent::VetoPassed {
                safety_score,
                floor,
            } => info!(safety_score, floor, "veto check passed"),
            SynthesisEvent::VetoHalted {
                safety_score,
                floor,
                triggers,
                directive,
            } => warn!(
                ?safety_score,
                floor,
                ?triggers,
                %directive,
                "veto gate halted request"
            ),
            SynthesisEvent::AggregationComplete {
                priority_themes,
                baseline_themes,
            } => info!(priority_themes, baseline_themes, "weighted aggregation complete"),
            SynthesisEvent::ReportComposed { elapsed_seconds } => {
                info!(elapsed_seconds, "final report composed")
            }
            SynthesisEvent::RequestFailed { reason } => error!(%reason, "synthesis request failed"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SynthesisEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<SynthesisEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Recorded events at or above a severity.
    pub fn at_least(&self, severity: Severity) -> Vec<SynthesisEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.severity() >= severity)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &SynthesisEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: &SynthesisEvent) {
        (**self).emit(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_severity() {
        let halted = SynthesisEvent::VetoHalted {
            safety_score: Some(3.0),
            floor: 3.5,
            triggers: vec![VetoTrigger::ScoreBelowFloor],
            directive: RemediationDirective::RefineAndResubmit,
        };
        assert_eq!(halted.severity(), Severity::Warning);

        let stage = SynthesisEvent::StageEntered {
            stage: PipelineStage::Received,
        };
        assert_eq!(stage.severity(), Severity::Debug);
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(&SynthesisEvent::ReportComposed { elapsed_seconds: 0.1 });
        sink.emit(&SynthesisEvent::RequestFailed {
            reason: "x".to_string(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SynthesisEvent::ReportComposed { .. }));
        assert_eq!(sink.at_least(Severity::Error).len(), 1);
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        sink.emit(&SynthesisEvent::VetoPassed {
            safety_score: 4.9,
            floor: 3.5,
        });
        sink.emit(&SynthesisEvent::AggregationComplete {
            priority_themes: 3,
            baseline_themes: 6,
        });
    }
}
