// ── EWEF Atoms: Pipeline Data Types ────────────────────────────────────────
//
// Type definitions for the emotion appraisal & core-affect engine.
// These are pure data types (no collaborator access, no I/O).
//
// Follows the project pattern: structs in atoms/, logic in engine/.
//
// Range invariant: every score/confidence field is clamped to its declared
// range at the point of computation. Constructors here re-clamp rather than
// trusting the caller — consumers must never assume upstream clamping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 1: MHH Rule Variables
// ═══════════════════════════════════════════════════════════════════════════

/// Where the appraised situation originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MhhSource {
    /// The user's own inner state ("I feel…").
    Internal,
    /// The outside world ("they", "the deadline…").
    External,
    /// A held value or standard of the self ("I believe…", "my principles").
    ValueSelf,
}

impl Default for MhhSource {
    fn default() -> Self {
        MhhSource::External
    }
}

/// Whose viewpoint the utterance takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MhhPerspective {
    /// The speaker's own viewpoint.
    #[serde(rename = "self")]
    SelfPerspective,
    /// Another person's viewpoint.
    Other,
    /// Both at once ("we", "us").
    Both,
}

impl Default for MhhPerspective {
    fn default() -> Self {
        MhhPerspective::SelfPerspective
    }
}

/// Temporal orientation of the appraised situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MhhTimeframe {
    Past,
    Present,
    Future,
}

impl Default for MhhTimeframe {
    fn default() -> Self {
        MhhTimeframe::Present
    }
}

/// Whether the speaker accepts or resists the situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MhhAcceptanceState {
    Accepted,
    Resisted,
    Uncertain,
}

impl Default for MhhAcceptanceState {
    fn default() -> Self {
        MhhAcceptanceState::Uncertain
    }
}

/// One categorical appraisal dimension plus the lexical-signal strength
/// backing it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleVariable<T> {
    pub value: T,
    /// 0.0–1.0, reflecting how many indicator phrases matched.
    pub confidence: f32,
}

impl<T> RuleVariable<T> {
    pub fn new(value: T, confidence: f32) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// The four MHH appraisal dimensions for one utterance.
/// Produced once per utterance; immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleVariables {
    pub source: RuleVariable<MhhSource>,
    pub perspective: RuleVariable<MhhPerspective>,
    pub timeframe: RuleVariable<MhhTimeframe>,
    pub acceptance_state: RuleVariable<MhhAcceptanceState>,
}

impl RuleVariables {
    /// All-default record at a uniform confidence. Used both for the
    /// no-match case (0.6) and the inference-failed case (0.5).
    pub fn defaults_at(confidence: f32) -> Self {
        let c = confidence.clamp(0.0, 1.0);
        Self {
            source: RuleVariable::new(MhhSource::default(), c),
            perspective: RuleVariable::new(MhhPerspective::default(), c),
            timeframe: RuleVariable::new(MhhTimeframe::default(), c),
            acceptance_state: RuleVariable::new(MhhAcceptanceState::default(), c),
        }
    }

    /// Mean of the four dimension confidences.
    pub fn mean_confidence(&self) -> f32 {
        (self.source.confidence
            + self.perspective.confidence
            + self.timeframe.confidence
            + self.acceptance_state.confidence)
            / 4.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 2: Perception Instance
// ═══════════════════════════════════════════════════════════════════════════

/// The structured appraisal of one utterance against the user's standards.
/// One per utterance; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerceptionInstance {
    pub source: MhhSource,
    pub perspective: MhhPerspective,
    pub timeframe: MhhTimeframe,
    pub acceptance_state: MhhAcceptanceState,
    /// How far the perception moves the user's valuation, −1.0 … 1.0.
    pub valuation_shift: f32,
    /// Power / significance of the perception, 0.0 … 1.0.
    pub power_level: f32,
    /// Confidence of the appraisal itself, 0.0 … 1.0.
    pub appraisal_confidence: f32,
}

impl PerceptionInstance {
    /// Build from an appraisal estimate plus the rule variables it merges with.
    pub fn from_parts(rule_variables: &RuleVariables, estimate: &AppraisalEstimate) -> Self {
        Self {
            source: rule_variables.source.value,
            perspective: rule_variables.perspective.value,
            timeframe: rule_variables.timeframe.value,
            acceptance_state: rule_variables.acceptance_state.value,
            valuation_shift: estimate.valuation_shift.clamp(-1.0, 1.0),
            power_level: estimate.power_level.clamp(0.0, 1.0),
            appraisal_confidence: estimate.appraisal_confidence.clamp(0.0, 1.0),
        }
    }

    /// Fixed neutral default — the appraisal stage substitutes this when both
    /// the LLM and heuristic paths fail.
    pub fn neutral(rule_variables: &RuleVariables) -> Self {
        Self::from_parts(rule_variables, &AppraisalEstimate::neutral())
    }
}

/// The three scalars an appraiser produces, before merging with the rule
/// variables into a full `PerceptionInstance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalEstimate {
    pub valuation_shift: f32,
    pub power_level: f32,
    pub appraisal_confidence: f32,
}

impl AppraisalEstimate {
    /// The documented neutral default: no shift, mid power, mid confidence.
    pub fn neutral() -> Self {
        Self {
            valuation_shift: 0.0,
            power_level: 0.5,
            appraisal_confidence: 0.5,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 3: Attachments
// ═══════════════════════════════════════════════════════════════════════════

/// Durable attachment kinds eligible for contextual activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EpType {
    Value,
    Goal,
    Need,
}

/// An attachment activated (weighted) for the current utterance.
/// `activation_weight` is ephemeral, recomputed per turn: 1.0 for a direct
/// lexical match, else the semantic-similarity score when it clears the
/// activation threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrappedEp {
    pub id: String,
    pub name: String,
    pub ep_type: EpType,
    /// Importance of the attachment to the user, 0.0 … 1.0.
    pub power_level: f32,
    /// How positively/negatively the user holds it, −1.0 … 1.0.
    pub valuation: f32,
    /// Per-utterance activation strength, 0.0 … 1.0.
    pub activation_weight: f32,
}

/// Full taxonomy of durable self-map node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttachmentType {
    Value,
    Goal,
    Need,
    Belief,
    Interest,
    Identity,
    Concept,
}

impl AttachmentType {
    /// The subset eligible for contextual activation (bootstrapping).
    pub fn as_ep_type(&self) -> Option<EpType> {
        match self {
            AttachmentType::Value => Some(EpType::Value),
            AttachmentType::Goal => Some(EpType::Goal),
            AttachmentType::Need => Some(EpType::Need),
            _ => None,
        }
    }
}

/// Which candidate generator produced an inferred attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InferenceMethod {
    Zsc,
    Ner,
    Embedding,
    Keyword,
    Llm,
    Combined,
}

/// A candidate (or refined) attachment inferred from text. Candidates are
/// ephemeral; only those surviving certainty filtering and synthesis are
/// merged into the durable self-map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredAttachment {
    pub name: String,
    #[serde(rename = "type")]
    pub attachment_type: AttachmentType,
    /// Estimated importance on the store's 0–10 scale.
    #[serde(rename = "estimatedPL")]
    pub estimated_pl: f32,
    /// Estimated valence on the store's −10…10 scale.
    #[serde(rename = "estimatedV")]
    pub estimated_v: f32,
    /// 0.0 … 1.0.
    pub certainty: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    pub inference_method: InferenceMethod,
}

impl InferredAttachment {
    /// Re-clamp every scored field to its declared range.
    pub fn clamped(mut self) -> Self {
        self.estimated_pl = self.estimated_pl.clamp(0.0, 10.0);
        self.estimated_v = self.estimated_v.clamp(-10.0, 10.0);
        self.certainty = self.certainty.clamp(0.0, 1.0);
        self
    }
}

/// A durable self-map node as stored in the graph, keyed by `(name, type)`
/// with per-user edge properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub attachment_type: AttachmentType,
    /// Edge property: importance on the 0–10 store scale.
    pub power_level: f32,
    /// Edge property: valence on the −10…10 store scale.
    pub valence: f32,
    /// Edge property: 0.0 … 1.0.
    pub certainty: f32,
    /// Node embedding, when one has been computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 4: Core Affect (VAD)
// ═══════════════════════════════════════════════════════════════════════════

/// Continuous core-affect estimate. Derived per turn, not persisted directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadOutput {
    /// Pleasure/displeasure, −1.0 … 1.0.
    pub valence: f32,
    /// Activation, 0.0 … 1.0.
    pub arousal: f32,
    /// Sense of control, 0.0 … 1.0.
    pub dominance: f32,
    /// Confidence of the estimate, 0.0 … 1.0.
    pub confidence: f32,
}

impl VadOutput {
    pub fn new(valence: f32, arousal: f32, dominance: f32, confidence: f32) -> Self {
        Self {
            valence: valence.clamp(-1.0, 1.0),
            arousal: arousal.clamp(0.0, 1.0),
            dominance: dominance.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The failure-containment default for the affect engine. Sits in the hot
    /// path of every turn: any internal error yields this instead of an Err.
    pub fn safe_default() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.1,
            dominance: 0.0,
            confidence: 0.5,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 5: Rolling Mood/Stress State
// ═══════════════════════════════════════════════════════════════════════════

/// Per-(user, session) rolling mood/stress scalars with exponential decay.
/// Read-modify-write on every turn; lifetime bound to the cache TTL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimalState {
    pub timestamp: DateTime<Utc>,
    /// −1.0 … 1.0.
    pub mood_estimate: f32,
    /// 0.0 … 1.0.
    pub stress_estimate: f32,
}

impl MinimalState {
    /// Zeroed state at the given instant — the caller-supplied default on
    /// cache miss.
    pub fn zero_at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            mood_estimate: 0.0,
            stress_estimate: 0.0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 6: Social Context
// ═══════════════════════════════════════════════════════════════════════════

/// Scenario/involvement flags detected from keywords, entities and concepts.
/// Ephemeral; recomputed per utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialContext {
    /// Harm or wrong done to another person (guilt territory).
    pub is_harm_to_other_scenario: bool,
    /// Accomplishment / success scenario (pride territory).
    pub is_achievement_scenario: bool,
    /// Being seen or judged by others (embarrassment territory).
    pub is_public_exposure_scenario: bool,
    /// Another person figures in the utterance at all.
    pub involves_another_person: bool,
    /// How strongly the perspective signals support the flags, 0.0 … 1.0.
    pub perspective_confidence: f32,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 7: NLP Feature Bundle
// ═══════════════════════════════════════════════════════════════════════════

/// Sentiment polarity label from the upstream classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

/// Sentiment with a polarity score: 0.0 = strongly negative, 0.5 = neutral,
/// 1.0 = strongly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: f32,
}

impl Sentiment {
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.5,
        }
    }

    /// Polarity normalized from [0,1] to [−1,1].
    pub fn signed(&self) -> f32 {
        (self.score.clamp(0.0, 1.0) * 2.0 - 1.0).clamp(-1.0, 1.0)
    }
}

/// A named entity surfaced by the external NER collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// The single normalized input most core components consume. Produced by
/// external NLP collaborators; `engine::nlp` supplies a heuristic fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NlpFeatures {
    pub keywords: Vec<String>,
    pub sentiment: Sentiment,
    pub entities: Vec<Entity>,
    pub abstract_concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl NlpFeatures {
    /// The empty-input bundle: no features, neutral sentiment.
    pub fn neutral() -> Self {
        Self {
            keywords: Vec::new(),
            sentiment: Sentiment::neutral(),
            entities: Vec::new(),
            abstract_concepts: Vec::new(),
            embedding: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 8: Profile Modifiers
// ═══════════════════════════════════════════════════════════════════════════

/// Hofstede-style cultural dimensions, each 0.0 … 1.0 (0.5 = neutral).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalContext {
    pub individualism: f32,
    pub power_distance: f32,
    pub uncertainty_avoidance: f32,
}

impl Default for CulturalContext {
    fn default() -> Self {
        Self {
            individualism: 0.5,
            power_distance: 0.5,
            uncertainty_avoidance: 0.5,
        }
    }
}

/// Five-factor personality profile, each trait 0.0 … 1.0 (0.5 = neutral).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personality {
    pub openness: f32,
    pub conscientiousness: f32,
    pub extraversion: f32,
    pub agreeableness: f32,
    pub neuroticism: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 9: Emotion Categorization
// ═══════════════════════════════════════════════════════════════════════════

/// One entry of the categorical emotion distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub label: String,
    pub probability: f32,
}

/// Discrete emotion estimate derived from the MHH variables and checked for
/// consistency against the VAD vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionCategorization {
    pub primary_label: String,
    pub emotion_group: String,
    /// Normalized to sum ≈ 1.0, sorted descending by probability.
    pub category_distribution: Vec<CategoryScore>,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 10: Analysis Bundle & Guidance
// ═══════════════════════════════════════════════════════════════════════════

/// The aggregate per-turn analysis handed to downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EwefAnalysis {
    pub vad: VadOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<MinimalState>,
    pub active_eps: Vec<BootstrappedEp>,
    pub p_instance: PerceptionInstance,
    pub rule_variables: RuleVariables,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_categorization: Option<EmotionCategorization>,
    /// Composite epistemic confidence, 0.0 … 1.0. Callers gate "deep
    /// insight" behavior below `ANALYSIS_CONFIDENCE_GATE`.
    pub analysis_confidence: f32,
}

/// Dialogue acts the guidance layer can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialogueAct {
    ValidateEmotion,
    DeEscalate,
    OfferSupport,
    AskClarify,
    AmplifyPositive,
    ExploreTopic,
    Acknowledge,
}

/// Dialogue-policy recommendation for the downstream conversational agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionGuidance {
    pub primary_dialogue_act: DialogueAct,
    /// Act-specific parameters (e.g. the emotion being validated).
    pub parameters: HashMap<String, serde_json::Value>,
    /// Topical focus tags appended from rule-variable signals.
    pub suggested_focus: Vec<String>,
}

impl InteractionGuidance {
    /// The neutral default when guidance generation fails.
    pub fn neutral() -> Self {
        Self {
            primary_dialogue_act: DialogueAct::Acknowledge,
            parameters: HashMap::new(),
            suggested_focus: Vec::new(),
        }
    }
}

/// Everything the engine produces for one conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnAnalysis {
    pub analysis: EwefAnalysis,
    pub guidance: InteractionGuidance,
    pub explanation: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_variable_clamps_confidence() {
        let v = RuleVariable::new(MhhSource::Internal, 1.7);
        assert_eq!(v.confidence, 1.0);
        let v = RuleVariable::new(MhhSource::Internal, -0.2);
        assert_eq!(v.confidence, 0.0);
    }

    #[test]
    fn vad_output_clamps_all_dimensions() {
        let vad = VadOutput::new(-3.0, 2.0, -1.0, 1.5);
        assert_eq!(vad.valence, -1.0);
        assert_eq!(vad.arousal, 1.0);
        assert_eq!(vad.dominance, 0.0);
        assert_eq!(vad.confidence, 1.0);
    }

    #[test]
    fn safe_default_is_the_documented_fallback() {
        let vad = VadOutput::safe_default();
        assert_eq!(vad.valence, 0.0);
        assert_eq!(vad.arousal, 0.1);
        assert_eq!(vad.dominance, 0.0);
        assert_eq!(vad.confidence, 0.5);
    }

    #[test]
    fn sentiment_signed_normalization() {
        assert!((Sentiment::neutral().signed()).abs() < f32::EPSILON);
        let pos = Sentiment {
            label: SentimentLabel::Positive,
            score: 1.0,
        };
        assert!((pos.signed() - 1.0).abs() < f32::EPSILON);
        let neg = Sentiment {
            label: SentimentLabel::Negative,
            score: 0.0,
        };
        assert!((neg.signed() + 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn inferred_attachment_clamped_ranges() {
        let a = InferredAttachment {
            name: "career growth".into(),
            attachment_type: AttachmentType::Goal,
            estimated_pl: 14.0,
            estimated_v: -22.0,
            certainty: 1.8,
            source_text: None,
            inference_method: InferenceMethod::Keyword,
        }
        .clamped();
        assert_eq!(a.estimated_pl, 10.0);
        assert_eq!(a.estimated_v, -10.0);
        assert_eq!(a.certainty, 1.0);
    }

    #[test]
    fn mhh_serde_round_trip_uses_wire_names() {
        let json = serde_json::to_string(&MhhSource::ValueSelf).unwrap();
        assert_eq!(json, "\"valueSelf\"");
        let json = serde_json::to_string(&MhhPerspective::SelfPerspective).unwrap();
        assert_eq!(json, "\"self\"");
        let json = serde_json::to_string(&DialogueAct::OfferSupport).unwrap();
        assert_eq!(json, "\"OFFER_SUPPORT\"");
    }

    #[test]
    fn mean_confidence_averages_four_dimensions() {
        let mut rv = RuleVariables::defaults_at(0.6);
        rv.source.confidence = 0.8;
        rv.timeframe.confidence = 0.4;
        assert!((rv.mean_confidence() - 0.6).abs() < 1e-6);
    }
}
