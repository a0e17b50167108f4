//! Rendering of session outcomes — a human score table or JSON.

use anyhow::Result;
use faceprobe_core::{Decision, SessionReport};
use std::fmt::Write;

/// Render the per-candidate score table and verdict for terminal output.
pub fn render_human(report: &SessionReport, certainty: f64) -> String {
    let mut out = String::new();

    if let Some(result) = &report.result {
        let _ = writeln!(out, "Scores against enrolled models:");
        for candidate in &result.candidates {
            let status = if candidate.matched { "MATCH" } else { "NO MATCH" };
            let _ = writeln!(
                out,
                "  {}: distance {:.4} (score {:.2}) [{status}]",
                candidate.label, candidate.distance, candidate.score
            );
        }
        let _ = writeln!(out);

        let best = result.best_candidate();
        match report.decision {
            Decision::Accept => {
                let _ = writeln!(
                    out,
                    "ACCEPT: authenticated as '{}' (score {:.2} <= certainty {certainty:.2})",
                    best.label, best.score
                );
            }
            Decision::Reject => {
                let _ = writeln!(
                    out,
                    "REJECT: best score {:.2} > certainty {certainty:.2}",
                    best.score
                );
                if let Some(suggested) = result.suggested_certainty {
                    let _ = writeln!(
                        out,
                        "  suggestion: raise certainty to {suggested:.1} or re-enroll"
                    );
                }
            }
            Decision::Inconclusive => {}
        }
    } else {
        let _ = writeln!(
            out,
            "INCONCLUSIVE: no usable face observed in {} attempt(s)",
            report.attempts
        );
    }

    out
}

pub fn render_json(report: &SessionReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
