//! Complexity assessment and robust dialogue synthesis.
//!
//! The reliability-critical component: synthesis must always return a
//! structurally valid script. The sophisticated branch builds evidence-rich
//! prompts through the generation service; any failure there drops to the
//! simplified branch, which builds turns from deterministic rhetorical
//! templates and never needs the service for structure.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{PersonalitiesConfig, PromptsConfig, SynthesisConfig};
use crate::error::RundownError;
use crate::generation::{GenerationService, sanitize_reply};
use crate::script::{DebateScript, DraftTurn, GenerationMethod};
use crate::stage1::{CoreUnderstanding, StoryRole};
use crate::stage2::{ComprehensiveEvidence, lexical_overlap};

/// Replies at or below this length after sanitization are degenerate.
const MIN_REPLY_CHARS: usize = 10;

const EXCHANGE_MAX_LENGTH: u32 = 400;
const POLISH_MAX_LENGTH: u32 = 250;

/// Fields that are inherently harder to debate well.
const COMPLEX_FIELD_WORDS: &[&str] = &["theoretical", "mathematical", "quantum", "biomedical"];

/// How analytically demanding a document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Simple,
    Standard,
    Complex,
}

/// Complexity classification with the factors behind it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplexityAssessment {
    pub tier: ComplexityTier,
    pub score: u8,
    pub evidence_mappings_count: usize,
    pub technical_elements_count: usize,
    pub estimated_context_chars: usize,
    pub factors: Vec<String>,
}

impl ComplexityAssessment {
    /// Sophisticated generation is attempted for every tier but complex.
    pub fn attempt_sophisticated(&self) -> bool {
        self.tier != ComplexityTier::Complex
    }
}

/// Classify a document's complexity from the analysis counts and the
/// evidence-strength distribution.
pub fn assess_complexity(
    core: &CoreUnderstanding,
    evidence: &ComprehensiveEvidence,
    config: &SynthesisConfig,
) -> ComplexityAssessment {
    let mut score = 0u8;
    let mut factors = Vec::new();

    let mapping_count = evidence.evidence_mappings.len();
    if mapping_count > config.max_evidence_mappings {
        score += 3;
        factors.push(format!(
            "too many evidence mappings ({} > {})",
            mapping_count, config.max_evidence_mappings
        ));
    } else if mapping_count > 5 {
        score += 1;
        factors.push(format!("moderate evidence mappings ({})", mapping_count));
    }

    let technical_count =
        evidence.technical_deep_dive.element_count() + core.technical_elements.len();
    if technical_count > config.max_technical_elements {
        score += 2;
        factors.push(format!(
            "too many technical elements ({} > {})",
            technical_count, config.max_technical_elements
        ));
    } else if technical_count > 8 {
        score += 1;
        factors.push(format!("moderate technical complexity ({})", technical_count));
    }

    let context_chars = estimate_context_chars(evidence);
    if context_chars > config.max_context_chars {
        score += 4;
        factors.push(format!(
            "evidence context too large ({} > {} chars)",
            context_chars, config.max_context_chars
        ));
    } else if context_chars > config.max_context_chars * 2 / 3 {
        score += 2;
        factors.push(format!("large evidence context ({} chars)", context_chars));
    }

    let field = core.field_classification.to_lowercase();
    if COMPLEX_FIELD_WORDS.iter().any(|w| field.contains(w)) {
        score += 1;
        factors.push(format!("complex field: {}", core.field_classification));
    }

    let tier = match score {
        0..=2 => ComplexityTier::Simple,
        3..=5 => ComplexityTier::Standard,
        _ => ComplexityTier::Complex,
    };

    ComplexityAssessment {
        tier,
        score,
        evidence_mappings_count: mapping_count,
        technical_elements_count: technical_count,
        estimated_context_chars: context_chars,
        factors,
    }
}

/// Estimate how much evidence context sophisticated prompts would carry.
fn estimate_context_chars(evidence: &ComprehensiveEvidence) -> usize {
    let mut estimated = 200usize;

    for mapping in &evidence.evidence_mappings {
        estimated += mapping.claim.len();
        estimated += mapping
            .supporting_evidence
            .iter()
            .take(2)
            .map(String::len)
            .sum::<usize>();
        estimated += mapping
            .contradictory_evidence
            .iter()
            .take(2)
            .map(String::len)
            .sum::<usize>();
    }

    let tech = &evidence.technical_deep_dive;
    estimated += tech.algorithms.iter().take(3).map(String::len).sum::<usize>();
    estimated += tech
        .performance_metrics
        .iter()
        .take(3)
        .map(String::len)
        .sum::<usize>();
    estimated += evidence
        .claim_evidence_gaps
        .iter()
        .take(3)
        .map(String::len)
        .sum::<usize>();

    estimated
}

/// Synthesis progress states. `SimplifiedAttempt` is defined to never fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SynthesisState {
    NotStarted,
    Assessing,
    SophisticatedAttempt,
    SimplifiedAttempt,
    Done,
}

/// Dual-mode script generator with guaranteed success.
pub struct DialogueSynthesizer<'a> {
    service: &'a dyn GenerationService,
    personalities: &'a PersonalitiesConfig,
    prompts: &'a PromptsConfig,
    config: &'a SynthesisConfig,
}

impl<'a> DialogueSynthesizer<'a> {
    pub fn new(
        service: &'a dyn GenerationService,
        personalities: &'a PersonalitiesConfig,
        prompts: &'a PromptsConfig,
        config: &'a SynthesisConfig,
    ) -> Self {
        Self {
            service,
            personalities,
            prompts,
            config,
        }
    }

    /// Generate a debate script. The only error this can surface is a
    /// post-fallback structural violation, which is a defect rather than a
    /// runtime condition; service failures and degenerate output are
    /// handled internally by falling back to simplified generation.
    pub async fn synthesize(
        &self,
        core: &CoreUnderstanding,
        evidence: &ComprehensiveEvidence,
        assessment: &ComplexityAssessment,
        title: &str,
        max_topics: usize,
        exchanges_per_topic: usize,
    ) -> Result<DebateScript, RundownError> {
        let mut state = SynthesisState::NotStarted;
        debug!(?state, "synthesis requested");

        state = SynthesisState::Assessing;
        debug!(?state, tier = ?assessment.tier, "complexity assessed");

        let topics = debate_topics(core, max_topics);
        let lead_topic = topics.first().cloned().unwrap_or_else(|| title.to_string());

        state = SynthesisState::SophisticatedAttempt;
        debug!(?state, attempt = assessment.attempt_sophisticated(), "entering primary branch");
        if assessment.attempt_sophisticated() {
            match self
                .sophisticated_drafts(core, evidence, title, &topics, exchanges_per_topic)
                .await
            {
                Ok(drafts) => {
                    let script = DebateScript::freeze(
                        format!("Research Rundown: {}", title),
                        lead_topic,
                        drafts,
                        GenerationMethod::Sophisticated,
                    )?;
                    state = SynthesisState::Done;
                    debug!(?state, turns = script.turns.len(), "sophisticated synthesis complete");
                    return Ok(script);
                }
                Err(e) => {
                    warn!(error = %e, "sophisticated generation failed, falling back");
                }
            }
        } else {
            warn!(factors = ?assessment.factors, "complexity too high, using simplified generation");
        }

        state = SynthesisState::SimplifiedAttempt;
        debug!(?state, "entering fallback branch");
        let mut drafts = self.simplified_drafts(core, evidence, title, &topics, exchanges_per_topic);
        if self.config.polish_simplified {
            self.polish_drafts(&mut drafts).await;
        }

        let script = DebateScript::freeze(
            format!("Research Rundown: {}", title),
            lead_topic,
            drafts,
            GenerationMethod::Simplified,
        )?;
        state = SynthesisState::Done;
        debug!(?state, turns = script.turns.len(), "simplified synthesis complete");
        Ok(script)
    }

    /// Sophisticated branch: evidence-conditioned prompts per exchange.
    /// Any service error or degenerate reply fails the whole attempt.
    async fn sophisticated_drafts(
        &self,
        core: &CoreUnderstanding,
        evidence: &ComprehensiveEvidence,
        title: &str,
        topics: &[String],
        exchanges_per_topic: usize,
    ) -> Result<Vec<DraftTurn>, RundownError> {
        let mut drafts = vec![self.intro_draft(core, title)];

        for (topic_idx, topic) in topics.iter().enumerate() {
            let topic_evidence = topic_evidence_block(topic, evidence);
            let mut previous: Option<String> = None;

            for exchange in 0..exchanges_per_topic {
                let persona = if exchange % 2 == 0 {
                    &self.personalities.optimist
                } else {
                    &self.personalities.skeptic
                };
                let stance = if exchange % 2 == 0 {
                    "a brief supportive argument grounded in the strongest evidence"
                } else {
                    "a brief critical response that questions assumptions and evidence quality"
                };

                let prompt = self.prompts.exchange_prompt(
                    persona,
                    &core.field_classification,
                    topic,
                    &topic_evidence,
                    stance,
                    previous.as_deref(),
                );

                let reply = self.service.generate(&prompt, EXCHANGE_MAX_LENGTH).await?;
                let content = sanitize_reply(&reply);
                if content.len() <= MIN_REPLY_CHARS {
                    return Err(RundownError::MalformedResponse(format!(
                        "degenerate reply for topic {} exchange {}",
                        topic_idx + 1,
                        exchange + 1
                    )));
                }

                previous = Some(content.clone());
                drafts.push(DraftTurn {
                    speaker: persona.name.clone(),
                    role: persona.role.clone(),
                    content,
                    topic: topic.clone(),
                });
            }
        }

        drafts.push(self.outro_draft(core, title));
        Ok(drafts)
    }

    /// Simplified branch: deterministic rhetorical templates over the
    /// seed points. Needs nothing from the service.
    fn simplified_drafts(
        &self,
        core: &CoreUnderstanding,
        evidence: &ComprehensiveEvidence,
        title: &str,
        topics: &[String],
        exchanges_per_topic: usize,
    ) -> Vec<DraftTurn> {
        let mut drafts = vec![self.intro_draft(core, title)];

        for (topic_idx, topic) in topics.iter().enumerate() {
            for exchange in 0..exchanges_per_topic {
                let variant = topic_idx * exchanges_per_topic + exchange;
                let (persona, content) = if exchange % 2 == 0 {
                    (
                        &self.personalities.optimist,
                        optimist_template(topic, core, evidence, variant),
                    )
                } else {
                    (
                        &self.personalities.skeptic,
                        skeptic_template(topic, evidence, variant),
                    )
                };

                drafts.push(DraftTurn {
                    speaker: persona.name.clone(),
                    role: persona.role.clone(),
                    content,
                    topic: topic.clone(),
                });
            }
        }

        drafts.push(self.outro_draft(core, title));
        drafts
    }

    /// Best-effort text polish of the template drafts. Service failures
    /// and degenerate replies leave the template text in place.
    async fn polish_drafts(&self, drafts: &mut [DraftTurn]) {
        for draft in drafts.iter_mut() {
            let prompt = self.prompts.polish_prompt(&draft.content);
            match self.service.generate(&prompt, POLISH_MAX_LENGTH).await {
                Ok(reply) => {
                    let polished = sanitize_reply(&reply);
                    if polished.len() > MIN_REPLY_CHARS {
                        draft.content = polished;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "polish call failed, keeping template text");
                }
            }
        }
    }

    fn intro_draft(&self, core: &CoreUnderstanding, title: &str) -> DraftTurn {
        let descriptor = field_descriptor(&core.field_classification);
        let content = format!(
            "What happens when brilliant {descriptor} researchers examine the same \
             paper with completely different viewpoints? Welcome to Research Rundown, \
             where expert analysis meets engaging debate. Today we're exploring \
             '{title}'. {optimist} and {skeptic} bring their expertise to uncover \
             what this research really means. Let's dive in!",
            descriptor = descriptor,
            title = title,
            optimist = self.personalities.optimist.name,
            skeptic = self.personalities.skeptic.name,
        );
        DraftTurn {
            speaker: "Narrator".to_string(),
            role: "Host".to_string(),
            content,
            topic: title.to_string(),
        }
    }

    fn outro_draft(&self, core: &CoreUnderstanding, title: &str) -> DraftTurn {
        let content = format!(
            "That was a thorough examination of the research. {optimist} and {skeptic} \
             brought their {field} expertise to '{title}', helping us understand not \
             just what the research claims, but what it means. This is Research \
             Rundown, where complex research meets clear expert analysis. Thanks for \
             listening, and remember: good science deserves good discussion.",
            optimist = self.personalities.optimist.name,
            skeptic = self.personalities.skeptic.name,
            field = core.field_classification.to_lowercase(),
            title = title,
        );
        DraftTurn {
            speaker: "Narrator".to_string(),
            role: "Host".to_string(),
            content,
            topic: title.to_string(),
        }
    }
}

/// Pick the debate topics: seed points first, padded from the research
/// story and generic material so the requested count is always met.
pub fn debate_topics(core: &CoreUnderstanding, max_topics: usize) -> Vec<String> {
    let mut candidates: Vec<String> = core.debate_seed_points.clone();

    for role in [
        StoryRole::Finding,
        StoryRole::Significance,
        StoryRole::Solution,
        StoryRole::Problem,
    ] {
        if let Some(value) = core.research_story.get(&role) {
            candidates.push(format!("How well supported is the claim that {}", value));
        }
    }
    candidates.push(format!(
        "What this {} work actually establishes",
        core.field_classification
    ));
    candidates.push("Whether the paper's conclusions are justified by its evidence".to_string());

    (0..max_topics)
        .map(|i| candidates[i % candidates.len()].clone())
        .collect()
}

fn topic_evidence_block(topic: &str, evidence: &ComprehensiveEvidence) -> String {
    let mut lines = Vec::new();

    for mapping in &evidence.evidence_mappings {
        if lexical_overlap(&mapping.claim, topic) >= 2 {
            for fragment in mapping.supporting_evidence.iter().take(2) {
                lines.push(format!("- For: {}", fragment));
            }
            for fragment in mapping.contradictory_evidence.iter().take(2) {
                lines.push(format!("- Against: {}", fragment));
            }
        }
    }
    for point in evidence.ammunition.supportive.iter().take(2) {
        lines.push(format!("- {}", point));
    }
    for point in evidence.ammunition.critical.iter().take(2) {
        lines.push(format!("- {}", point));
    }

    if lines.is_empty() {
        "- No located evidence; argue from the paper's framing.".to_string()
    } else {
        lines.join("\n")
    }
}

fn optimist_template(
    topic: &str,
    core: &CoreUnderstanding,
    evidence: &ComprehensiveEvidence,
    variant: usize,
) -> String {
    let support = evidence
        .ammunition
        .supportive
        .get(variant % evidence.ammunition.supportive.len().max(1))
        .cloned()
        .or_else(|| {
            core.research_story
                .get(&StoryRole::Finding)
                .map(|f| format!("The authors report that {}", f))
        })
        .unwrap_or_else(|| {
            "The reported findings are consistent across the evaluations presented".to_string()
        });

    match variant % 3 {
        0 => format!(
            "What excites me most here is the question \"{topic}\". {support}. \
             That is exactly the kind of signal that moves a field forward.",
        ),
        1 => format!(
            "Think about the possibilities. If we take \"{topic}\" seriously, the \
             groundwork is already there: {support}. The potential applications \
             alone justify the attention this paper is getting.",
        ),
        _ => format!(
            "I keep coming back to the strength of the results. {support}. On \
             \"{topic}\", the authors deliver more than most papers in this area.",
        ),
    }
}

fn skeptic_template(topic: &str, evidence: &ComprehensiveEvidence, variant: usize) -> String {
    let concern = evidence
        .ammunition
        .critical
        .get(variant % evidence.ammunition.critical.len().max(1))
        .cloned()
        .or_else(|| {
            evidence
                .claim_evidence_gaps
                .get(variant % evidence.claim_evidence_gaps.len().max(1))
                .cloned()
        })
        .unwrap_or_else(|| {
            "The supporting evidence is thinner than the confidence of the claims".to_string()
        });

    match variant % 3 {
        0 => format!(
            "Hold on, let's examine this more carefully. {concern}. Until that is \
             addressed, \"{topic}\" remains an open question.",
        ),
        1 => format!(
            "I'm not convinced. {concern}. The data simply doesn't settle \
             \"{topic}\" one way or the other.",
        ),
        _ => format!(
            "We need to be more cautious here. {concern}. That weakens any strong \
             reading of \"{topic}\".",
        ),
    }
}

fn field_descriptor(field: &str) -> &'static str {
    let field = field.to_lowercase();
    if field.contains("computer science") || field.contains("machine learning") {
        "computer science"
    } else if field.contains("biology") || field.contains("medical") {
        "biomedical"
    } else if field.contains("psychology") || field.contains("social") {
        "behavioral science"
    } else {
        "research"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::script::Speaker;
    use crate::stage1::UNCLASSIFIED_FIELD;
    use crate::stage2::{
        DebateAmmunition, EvidenceMapping, EvidenceStrength, MethodologyAnalysis,
        TechnicalDeepDive,
    };
    use crate::test_support::{CannedService, FailingService};
    use std::collections::BTreeMap;

    fn core_with_seeds(n: usize) -> CoreUnderstanding {
        CoreUnderstanding {
            field_classification: "Computer Science - Graph Algorithms".to_string(),
            research_story: BTreeMap::new(),
            confidence_assessment: BTreeMap::new(),
            debate_seed_points: (0..n)
                .map(|i| format!("Is finding number {} robust across workloads?", i))
                .collect(),
            technical_elements: vec![],
        }
    }

    fn empty_evidence() -> ComprehensiveEvidence {
        ComprehensiveEvidence {
            evidence_mappings: vec![],
            technical_deep_dive: TechnicalDeepDive::default(),
            methodology_analysis: MethodologyAnalysis::default(),
            claim_evidence_gaps: vec![],
            overclaims: vec![],
            ammunition: DebateAmmunition::default(),
        }
    }

    fn mapping(claim: &str) -> EvidenceMapping {
        EvidenceMapping {
            claim: claim.to_string(),
            supporting_evidence: vec![format!("a fragment of evidence about {}", claim)],
            contradictory_evidence: vec![],
            strength: EvidenceStrength::Moderate,
            evidence_locations: vec![],
        }
    }

    #[test]
    fn test_assess_complexity_simple() {
        let config = default_config().synthesis;
        let assessment = assess_complexity(&core_with_seeds(2), &empty_evidence(), &config);
        assert_eq!(assessment.tier, ComplexityTier::Simple);
        assert!(assessment.attempt_sophisticated());
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_assess_complexity_complex() {
        let config = default_config().synthesis;
        let mut evidence = empty_evidence();
        evidence.evidence_mappings = (0..12)
            .map(|i| {
                let mut m = mapping(&format!("claim {}", i));
                m.supporting_evidence = vec!["x".repeat(200), "y".repeat(200)];
                m
            })
            .collect();

        let assessment = assess_complexity(&core_with_seeds(2), &evidence, &config);
        assert_eq!(assessment.tier, ComplexityTier::Complex);
        assert!(!assessment.attempt_sophisticated());
        assert!(!assessment.factors.is_empty());
    }

    #[test]
    fn test_debate_topics_pads_when_seeds_are_scarce() {
        let topics = debate_topics(&core_with_seeds(0), 3);
        assert_eq!(topics.len(), 3);

        let topics = debate_topics(&core_with_seeds(5), 2);
        assert_eq!(topics.len(), 2);
        assert!(topics[0].contains("finding number 0"));
    }

    #[tokio::test]
    async fn test_service_failure_falls_back_to_simplified() {
        let config = default_config();
        let service = FailingService;
        let synthesizer = DialogueSynthesizer::new(
            &service,
            &config.personalities,
            &config.prompts,
            &config.synthesis,
        );

        let core = core_with_seeds(2);
        let evidence = empty_evidence();
        let assessment = assess_complexity(&core, &evidence, &config.synthesis);

        let script = synthesizer
            .synthesize(&core, &evidence, &assessment, "Widget Routing", 2, 2)
            .await
            .expect("never fails");

        assert_eq!(script.method, GenerationMethod::Simplified);
        // intro + 2 topics x 2 exchanges + outro
        assert_eq!(script.turns.len(), 6);
        assert!(script.turns.iter().all(|t| !t.content.trim().is_empty()));
    }

    #[tokio::test]
    async fn test_zero_seed_points_still_produces_script() {
        let config = default_config();
        let service = FailingService;
        let synthesizer = DialogueSynthesizer::new(
            &service,
            &config.personalities,
            &config.prompts,
            &config.synthesis,
        );

        let mut core = core_with_seeds(0);
        core.field_classification = UNCLASSIFIED_FIELD.to_string();
        let evidence = empty_evidence();
        let assessment = assess_complexity(&core, &evidence, &config.synthesis);

        let script = synthesizer
            .synthesize(&core, &evidence, &assessment, "Untitled Paper", 3, 4)
            .await
            .expect("never fails");

        assert!(!script.turns.is_empty());
        assert_eq!(script.turns.len(), 2 + 3 * 4);
    }

    #[tokio::test]
    async fn test_sophisticated_happy_path() {
        let config = default_config();
        let exchange_reply = "The evidence in Table 3 is solid: a 23% gain held across \
                              all three benchmark datasets, which is hard to dismiss.";
        let service = CannedService::new(vec![exchange_reply.to_string(); 4]);
        let synthesizer = DialogueSynthesizer::new(
            &service,
            &config.personalities,
            &config.prompts,
            &config.synthesis,
        );

        let core = core_with_seeds(2);
        let mut evidence = empty_evidence();
        evidence.evidence_mappings =
            vec![mapping("finding number 0 robust across workloads question")];
        let assessment = assess_complexity(&core, &evidence, &config.synthesis);

        let script = synthesizer
            .synthesize(&core, &evidence, &assessment, "Widget Routing", 2, 2)
            .await
            .expect("synthesizes");

        assert_eq!(script.method, GenerationMethod::Sophisticated);
        assert_eq!(script.turns.len(), 6);
        assert_eq!(script.turns[0].speaker, Speaker::Narrator);
        assert_eq!(script.turns[1].speaker, Speaker::Optimist);
        assert_eq!(script.turns[2].speaker, Speaker::Skeptic);
        assert_eq!(script.turns[5].speaker, Speaker::Narrator);
    }

    #[tokio::test]
    async fn test_degenerate_reply_triggers_fallback() {
        let config = default_config();
        // Sophisticated exchanges get a useless reply; polish calls then
        // reuse it, which is also too short to replace template text.
        let service = CannedService::new(vec!["ok".to_string()]);
        let synthesizer = DialogueSynthesizer::new(
            &service,
            &config.personalities,
            &config.prompts,
            &config.synthesis,
        );

        let core = core_with_seeds(1);
        let evidence = empty_evidence();
        let assessment = assess_complexity(&core, &evidence, &config.synthesis);

        let script = synthesizer
            .synthesize(&core, &evidence, &assessment, "Widget Routing", 1, 2)
            .await
            .expect("never fails");

        assert_eq!(script.method, GenerationMethod::Simplified);
        assert!(script.turns.iter().all(|t| t.content.len() > MIN_REPLY_CHARS));
    }

    #[tokio::test]
    async fn test_complex_tier_skips_service_for_structure() {
        let mut config = default_config();
        config.synthesis.polish_simplified = false;

        let service = CannedService::new(vec![]);
        let synthesizer = DialogueSynthesizer::new(
            &service,
            &config.personalities,
            &config.prompts,
            &config.synthesis,
        );

        let core = core_with_seeds(2);
        let mut evidence = empty_evidence();
        evidence.evidence_mappings = (0..12)
            .map(|i| {
                let mut m = mapping(&format!("claim {}", i));
                m.supporting_evidence = vec!["x".repeat(200), "y".repeat(200)];
                m
            })
            .collect();
        let assessment = assess_complexity(&core, &evidence, &config.synthesis);
        assert!(!assessment.attempt_sophisticated());

        let script = synthesizer
            .synthesize(&core, &evidence, &assessment, "Widget Routing", 2, 2)
            .await
            .expect("never fails");

        assert_eq!(script.method, GenerationMethod::Simplified);
        assert!(service.prompts().is_empty(), "service must not be consulted");
    }

    #[test]
    fn test_templates_embed_material() {
        let core = core_with_seeds(1);
        let mut evidence = empty_evidence();
        evidence.ammunition.supportive = vec!["Strong evidence: Table 3 shows a gain".to_string()];
        evidence.ammunition.critical = vec!["Potential bias: benchmark selection".to_string()];

        let optimist = optimist_template("the topic", &core, &evidence, 0);
        assert!(optimist.contains("Table 3"));

        let skeptic = skeptic_template("the topic", &evidence, 0);
        assert!(skeptic.contains("benchmark selection"));
    }
}
