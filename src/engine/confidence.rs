// ── EWEF Engine: Analysis Confidence Scorer ────────────────────────────────
//
// Folds the per-stage confidences into the single epistemic score the
// calling system gates on. The weighting is fixed:
//   0.4 · appraisal confidence
// + 0.3 · mean of the four MHH rule-variable confidences
// + 0.3 · VAD confidence
// clamped to [0,1]. The gate threshold itself (`ANALYSIS_CONFIDENCE_GATE`)
// and the fallback-to-safe-acknowledgment policy live in the caller.

use crate::atoms::types::EwefAnalysis;

/// Composite epistemic confidence for one turn's analysis bundle.
pub fn calculate_analysis_confidence(analysis: &EwefAnalysis) -> f32 {
    compose(
        analysis.p_instance.appraisal_confidence,
        analysis.rule_variables.mean_confidence(),
        analysis.vad.confidence,
    )
}

/// The raw 0.4/0.3/0.3 composition, exposed for direct numeric testing.
pub fn compose(appraisal_confidence: f32, mean_mhh_confidence: f32, vad_confidence: f32) -> f32 {
    (0.4 * appraisal_confidence.clamp(0.0, 1.0)
        + 0.3 * mean_mhh_confidence.clamp(0.0, 1.0)
        + 0.3 * vad_confidence.clamp(0.0, 1.0))
    .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composition_matches_the_documented_weighted_sum() {
        // 0.4·0.8 + 0.3·0.7 + 0.3·0.6 = 0.32 + 0.21 + 0.18 = 0.71
        let score = compose(0.8, 0.7, 0.6);
        assert!((score - 0.71).abs() < 1e-6, "score={}", score);
    }

    #[test]
    fn all_ones_clamp_to_one() {
        assert!((compose(1.0, 1.0, 1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_inputs_are_reclamped() {
        let score = compose(7.0, -3.0, 0.5);
        // 0.4·1.0 + 0.3·0.0 + 0.3·0.5 = 0.55
        assert!((score - 0.55).abs() < 1e-6, "score={}", score);
    }
}
