//! Terminal rendering for predictions and model info.

use std::fmt::Write;

use renewa_ai::StartupReport;
use renewa_core::{LabelVocabulary, Prediction};

const BAR_WIDTH: usize = 30;

/// Ranked prediction card for one image.
pub fn prediction_card(image: &str, prediction: &Prediction, top_k: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {image} ===");
    if let Some((label, p)) = prediction.best() {
        let _ = writeln!(out, "Prediction: {label} ({:.1}%)", p * 100.0);
    }
    out.push('\n');

    let ranked = prediction.top(top_k);
    let width = ranked.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (i, (label, p)) in ranked.iter().enumerate() {
        let filled = ((p.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
        let _ = writeln!(
            out,
            "  {:>2}. {:<width$}  {:>6.1}%  {}{}",
            i + 1,
            label,
            p * 100.0,
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled),
        );
    }
    out
}

/// Model summary for `renewa info`.
pub fn model_card(report: &StartupReport, backend: &str, vocabulary: &LabelVocabulary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", report.artifact.display());
    let size = report
        .artifact_mib()
        .map(|mib| format!("{mib:.2} MiB"))
        .unwrap_or_else(|| "missing".to_string());
    let _ = writeln!(out, "  {:<12} {}", "backend", backend);
    let _ = writeln!(
        out,
        "  {:<12} {}",
        "runtime",
        report.runtime.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(out, "  {:<12} {}", "size", size);
    let _ = writeln!(out, "  {:<12} {}", "labels", vocabulary.len());
    out.push('\n');
    for (i, label) in vocabulary.iter().enumerate() {
        let _ = writeln!(out, "  {i:>3}  {label}");
    }
    out
}
