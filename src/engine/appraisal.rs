// ── EWEF Engine: Perception Appraisal ──────────────────────────────────────
//
// Fuses the rule variables, active attachments and sentiment into one
// structured perception instance: a valuation-shift estimate, a power /
// significance level, and an appraisal confidence.
//
// Dual-path design, modeled as a capability trait with two implementations
// composed by a fallback chain — not as conditional branching at call sites:
//   LlmAppraiser (structured call) → HeuristicAppraiser → neutral default.
// The chain can never fail: whatever breaks, the pipeline receives a valid
// `PerceptionInstance`.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{LlmOptions, StructuredLlm};
use crate::atoms::types::{
    AppraisalEstimate, BootstrappedEp, PerceptionInstance, RuleVariables, Sentiment,
    SentimentLabel,
};
use crate::engine::nlp::lexical_intensity;
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════
// Appraiser Capability
// ═══════════════════════════════════════════════════════════════════════════

/// Everything an appraiser may consider for one utterance.
#[derive(Debug, Clone, Copy)]
pub struct AppraisalInput<'a> {
    pub text: &'a str,
    pub sentiment: &'a Sentiment,
    pub rule_variables: &'a RuleVariables,
    pub active_eps: &'a [BootstrappedEp],
}

/// One appraisal strategy. Implementations must be side-effect free with
/// respect to the pipeline — errors are allowed, panics are not.
#[async_trait]
pub trait Appraiser: Send + Sync {
    fn name(&self) -> &'static str;
    async fn appraise(&self, input: &AppraisalInput<'_>) -> EngineResult<AppraisalEstimate>;
}

/// Ordered chain of appraisers. The first success wins; if every stage
/// fails, the documented neutral default is substituted.
pub struct FallbackChain {
    stages: Vec<Box<dyn Appraiser>>,
}

impl FallbackChain {
    pub fn new(stages: Vec<Box<dyn Appraiser>>) -> Self {
        Self { stages }
    }

    /// Heuristic-only chain — the configuration used when no LLM gateway is
    /// wired in.
    pub fn heuristic_only() -> Self {
        Self::new(vec![Box::new(HeuristicAppraiser)])
    }

    /// LLM-first chain with heuristic fallback.
    pub fn llm_with_heuristic(llm: Arc<dyn StructuredLlm>, opts: LlmOptions) -> Self {
        Self::new(vec![
            Box::new(LlmAppraiser::new(llm, opts)),
            Box::new(HeuristicAppraiser),
        ])
    }

    pub async fn appraise_or_neutral(&self, input: &AppraisalInput<'_>) -> AppraisalEstimate {
        for stage in &self.stages {
            match stage.appraise(input).await {
                Ok(estimate) => {
                    debug!("[ewef::appraisal] {} produced the estimate", stage.name());
                    return AppraisalEstimate {
                        valuation_shift: estimate.valuation_shift.clamp(-1.0, 1.0),
                        power_level: estimate.power_level.clamp(0.0, 1.0),
                        appraisal_confidence: estimate.appraisal_confidence.clamp(0.0, 1.0),
                    };
                }
                Err(e) => {
                    warn!("[ewef::appraisal] {} failed: {e}", stage.name());
                }
            }
        }
        AppraisalEstimate::neutral()
    }
}

/// Appraise one utterance and merge the estimate with the rule variables.
pub async fn appraise_perception(
    chain: &FallbackChain,
    input: &AppraisalInput<'_>,
) -> PerceptionInstance {
    let estimate = chain.appraise_or_neutral(input).await;
    PerceptionInstance::from_parts(input.rule_variables, &estimate)
}

// ═══════════════════════════════════════════════════════════════════════════
// Heuristic Appraiser
// ═══════════════════════════════════════════════════════════════════════════

/// Lexical-intensity / sentiment-magnitude / attachment-overlap calculator.
/// Always available, deterministic, sub-millisecond.
pub struct HeuristicAppraiser;

#[async_trait]
impl Appraiser for HeuristicAppraiser {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn appraise(&self, input: &AppraisalInput<'_>) -> EngineResult<AppraisalEstimate> {
        let intensity = lexical_intensity(input.text);
        let signed = input.sentiment.signed();

        // Valuation shift: sentiment direction scaled by intensity, pulled
        // toward the valuation of whatever attachments the utterance touched.
        let ep_bias = weighted_ep_valuation(input.active_eps);
        let valuation_shift = (signed * (0.6 + 0.4 * intensity)) * 0.7 + ep_bias * 0.3;

        // Power level: how much is at stake — emphasis plus the importance
        // of the activated attachments.
        let ep_power = max_ep_power(input.active_eps);
        let power_level = 0.3
            + 0.3 * intensity
            + 0.3 * ep_power
            + if input.active_eps.is_empty() { 0.0 } else { 0.1 };

        // Confidence: one independent signal at a time.
        let mut confidence: f32 = 0.45;
        if input.sentiment.label != SentimentLabel::Neutral {
            confidence += 0.15;
        }
        if intensity > 0.2 {
            confidence += 0.1;
        }
        if !input.active_eps.is_empty() {
            confidence += 0.1;
        }

        Ok(AppraisalEstimate {
            valuation_shift: valuation_shift.clamp(-1.0, 1.0),
            power_level: power_level.clamp(0.0, 1.0),
            appraisal_confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

/// Activation- and importance-weighted mean valuation of the active set.
fn weighted_ep_valuation(eps: &[BootstrappedEp]) -> f32 {
    let mut num = 0.0;
    let mut den = 0.0;
    for ep in eps {
        let w = ep.activation_weight * ep.power_level;
        num += ep.valuation * w;
        den += w;
    }
    if den > f32::EPSILON {
        num / den
    } else {
        0.0
    }
}

fn max_ep_power(eps: &[BootstrappedEp]) -> f32 {
    eps.iter()
        .map(|ep| ep.power_level * ep.activation_weight)
        .fold(0.0, f32::max)
}

// ═══════════════════════════════════════════════════════════════════════════
// LLM Appraiser
// ═══════════════════════════════════════════════════════════════════════════

/// Wire shape requested from the structured LLM.
#[derive(Debug, Deserialize)]
struct LlmAppraisalWire {
    #[serde(rename = "pValuationShiftEstimate")]
    valuation_shift: f32,
    #[serde(rename = "pPowerLevel")]
    power_level: f32,
    #[serde(rename = "pAppraisalConfidence")]
    appraisal_confidence: f32,
}

/// Structured-LLM appraisal path.
pub struct LlmAppraiser {
    llm: Arc<dyn StructuredLlm>,
    opts: LlmOptions,
}

impl LlmAppraiser {
    pub fn new(llm: Arc<dyn StructuredLlm>, opts: LlmOptions) -> Self {
        Self { llm, opts }
    }

    fn build_prompt(input: &AppraisalInput<'_>) -> String {
        let ep_summary = if input.active_eps.is_empty() {
            "none".to_string()
        } else {
            input
                .active_eps
                .iter()
                .map(|ep| {
                    format!(
                        "{} (importance {:.2}, valuation {:+.2})",
                        ep.name, ep.power_level, ep.valuation
                    )
                })
                .collect::<Vec<_>>()
                .join("; ")
        };
        format!(
            "Appraise the utterance against the user's standards.\n\
             Return ONLY a JSON object: {{\"pValuationShiftEstimate\": -1.0..1.0, \
             \"pPowerLevel\": 0.0..1.0, \"pAppraisalConfidence\": 0.0..1.0}}.\n\
             Sentiment: {:?} ({:.2})\n\
             Appraisal variables: source={:?}, perspective={:?}, timeframe={:?}, acceptance={:?}\n\
             Touched attachments: {}\n\
             Utterance: \"{}\"",
            input.sentiment.label,
            input.sentiment.score,
            input.rule_variables.source.value,
            input.rule_variables.perspective.value,
            input.rule_variables.timeframe.value,
            input.rule_variables.acceptance_state.value,
            ep_summary,
            input.text
        )
    }
}

#[async_trait]
impl Appraiser for LlmAppraiser {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn appraise(&self, input: &AppraisalInput<'_>) -> EngineResult<AppraisalEstimate> {
        let prompt = Self::build_prompt(input);
        let value = self.llm.generate_structured(&prompt, &self.opts).await?;
        let wire: LlmAppraisalWire = serde_json::from_value(value)
            .map_err(|e| EngineError::MalformedOutput(e.to_string()))?;
        Ok(AppraisalEstimate {
            valuation_shift: wire.valuation_shift.clamp(-1.0, 1.0),
            power_level: wire.power_level.clamp(0.0, 1.0),
            appraisal_confidence: wire.appraisal_confidence.clamp(0.0, 1.0),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::EpType;

    fn input_for<'a>(
        text: &'a str,
        sentiment: &'a Sentiment,
        rv: &'a RuleVariables,
        eps: &'a [BootstrappedEp],
    ) -> AppraisalInput<'a> {
        AppraisalInput {
            text,
            sentiment,
            rule_variables: rv,
            active_eps: eps,
        }
    }

    fn ep(name: &str, power: f32, valuation: f32) -> BootstrappedEp {
        BootstrappedEp {
            id: name.to_string(),
            name: name.to_string(),
            ep_type: EpType::Goal,
            power_level: power,
            valuation,
            activation_weight: 1.0,
        }
    }

    #[tokio::test]
    async fn heuristic_negative_sentiment_gives_negative_shift() {
        let rv = RuleVariables::defaults_at(0.6);
        let s = Sentiment {
            label: SentimentLabel::Negative,
            score: 0.15,
        };
        let input = input_for("I am really worried about this!", &s, &rv, &[]);
        let est = HeuristicAppraiser.appraise(&input).await.unwrap();
        assert!(est.valuation_shift < 0.0, "shift={}", est.valuation_shift);
        assert!((0.0..=1.0).contains(&est.power_level));
        assert!((0.0..=1.0).contains(&est.appraisal_confidence));
    }

    #[tokio::test]
    async fn attachments_raise_power_and_confidence() {
        let rv = RuleVariables::defaults_at(0.6);
        let s = Sentiment::neutral();
        let eps = [ep("career growth", 0.9, 0.8)];
        let bare = HeuristicAppraiser
            .appraise(&input_for("about work", &s, &rv, &[]))
            .await
            .unwrap();
        let touched = HeuristicAppraiser
            .appraise(&input_for("about work", &s, &rv, &eps))
            .await
            .unwrap();
        assert!(touched.power_level > bare.power_level);
        assert!(touched.appraisal_confidence > bare.appraisal_confidence);
    }

    #[tokio::test]
    async fn chain_falls_back_to_heuristic_when_llm_errors() {
        struct DownLlm;
        #[async_trait]
        impl StructuredLlm for DownLlm {
            async fn generate_structured(
                &self,
                _prompt: &str,
                _opts: &LlmOptions,
            ) -> EngineResult<serde_json::Value> {
                Err(EngineError::llm("gateway down"))
            }
        }

        let chain = FallbackChain::llm_with_heuristic(Arc::new(DownLlm), LlmOptions::default());
        let rv = RuleVariables::defaults_at(0.6);
        let s = Sentiment {
            label: SentimentLabel::Negative,
            score: 0.2,
        };
        let input = input_for("this is awful", &s, &rv, &[]);
        let estimate = chain.appraise_or_neutral(&input).await;
        // Heuristic output, not the neutral default.
        assert!(estimate.valuation_shift < 0.0);
    }

    #[tokio::test]
    async fn chain_uses_llm_estimate_when_well_formed() {
        struct GoodLlm;
        #[async_trait]
        impl StructuredLlm for GoodLlm {
            async fn generate_structured(
                &self,
                _prompt: &str,
                _opts: &LlmOptions,
            ) -> EngineResult<serde_json::Value> {
                Ok(serde_json::json!({
                    "pValuationShiftEstimate": -0.8,
                    "pPowerLevel": 0.9,
                    "pAppraisalConfidence": 0.85
                }))
            }
        }

        let chain = FallbackChain::llm_with_heuristic(Arc::new(GoodLlm), LlmOptions::default());
        let rv = RuleVariables::defaults_at(0.6);
        let s = Sentiment::neutral();
        let input = input_for("text", &s, &rv, &[]);
        let estimate = chain.appraise_or_neutral(&input).await;
        assert!((estimate.valuation_shift + 0.8).abs() < 1e-6);
        assert!((estimate.power_level - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn empty_chain_yields_neutral_default() {
        let chain = FallbackChain::new(vec![]);
        let rv = RuleVariables::defaults_at(0.6);
        let s = Sentiment::neutral();
        let input = input_for("", &s, &rv, &[]);
        let estimate = chain.appraise_or_neutral(&input).await;
        assert_eq!(estimate, AppraisalEstimate::neutral());
    }

    #[tokio::test]
    async fn malformed_llm_output_falls_through() {
        struct WeirdLlm;
        #[async_trait]
        impl StructuredLlm for WeirdLlm {
            async fn generate_structured(
                &self,
                _prompt: &str,
                _opts: &LlmOptions,
            ) -> EngineResult<serde_json::Value> {
                Ok(serde_json::json!({"unexpected": true}))
            }
        }

        let chain = FallbackChain::llm_with_heuristic(Arc::new(WeirdLlm), LlmOptions::default());
        let rv = RuleVariables::defaults_at(0.6);
        let s = Sentiment {
            label: SentimentLabel::Positive,
            score: 0.9,
        };
        let input = input_for("great news!", &s, &rv, &[]);
        let estimate = chain.appraise_or_neutral(&input).await;
        assert!(estimate.valuation_shift > 0.0);
    }
}
