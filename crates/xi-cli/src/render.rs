//! Terminal rendering of synthesis outcomes.

use std::fmt::{self, Write};

use xi_core::{FinalReport, HaltedReport, SynthesisOutcome};

/// Renders an outcome for a human reader.
pub fn outcome(outcome: &SynthesisOutcome) -> Result<String, fmt::Error> {
    match outcome {
        SynthesisOutcome::Completed(report) => completed(report),
        SynthesisOutcome::Halted(halted) => halted_report(halted),
    }
}

fn completed(report: &FinalReport) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let cert = &report.certificate;
    writeln!(out, "=======================================================")?;
    writeln!(out, "FINAL REPORT for {}", report.requester)?;
    writeln!(out, "=======================================================")?;
    writeln!(
        out,
        "Certificate: {:?} (safety score {:.1}; constraints {})",
        cert.status,
        cert.safety_score,
        cert.constraints_checked.join(", ")
    )?;
    writeln!(out, "{}", report.unified_text)?;
    writeln!(out, "{}", report.localization_marker)?;
    writeln!(out, "Time Taken: {}s", report.elapsed_seconds)?;
    Ok(out)
}

fn halted_report(halted: &HaltedReport) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "--- VETO ALERT ---")?;
    match halted.safety_score {
        Some(score) => writeln!(out, "Top-authority safety score: {}", score)?,
        None => writeln!(out, "Top-authority safety score: not supplied")?,
    }
    for trigger in &halted.triggers {
        writeln!(out, "Triggered: {}", trigger)?;
    }
    writeln!(
        out,
        "COMMAND: {} - the top authority must refine the action for safety before resubmission.",
        halted.directive
    )?;
    writeln!(out, "--- PROCESS HALTED ({}s) ---", halted.elapsed_seconds)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xi_core::{CertificateStatus, RemediationDirective, VetoTrigger};

    #[test]
    fn test_halted_rendering_lists_triggers() {
        let text = outcome(&SynthesisOutcome::Halted(HaltedReport {
            status: CertificateStatus::Halted,
            safety_score: Some(3.0),
            triggers: vec![VetoTrigger::ScoreBelowFloor, VetoTrigger::EthicsViolation],
            directive: RemediationDirective::RefineAndResubmit,
            elapsed_seconds: 0.0001,
        }))
        .unwrap();

        assert!(text.contains("safety score below floor"));
        assert!(text.contains("non-harm constraint violated"));
        assert!(text.contains("C_Refine"));
        assert!(text.contains("PROCESS HALTED"));
    }

    #[test]
    fn test_missing_score_rendered_as_not_supplied() {
        let text = outcome(&SynthesisOutcome::Halted(HaltedReport {
            status: CertificateStatus::Halted,
            safety_score: None,
            triggers: vec![VetoTrigger::ScoreBelowFloor],
            directive: RemediationDirective::RefineAndResubmit,
            elapsed_seconds: 0.0,
        }))
        .unwrap();

        assert!(text.contains("safety score: not supplied"));
    }
}
