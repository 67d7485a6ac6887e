//! Stage 2: evidence hunting.
//!
//! Binds each debate seed point to supporting and contradictory evidence
//! located in the full document, then layers on a technical deep dive, a
//! methodology review, gap/overclaim detection, and the two ammunition
//! lists the synthesizer draws from.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::document::Document;
use crate::error::RundownError;
use crate::freeform;
use crate::generation::GenerationService;
use crate::stage1::CoreUnderstanding;

const MAPPING_MAX_LENGTH: u32 = 2000;
const TECHNICAL_MAX_LENGTH: u32 = 3000;
const METHODOLOGY_MAX_LENGTH: u32 = 2500;

/// Sections most likely to contain evidence, in priority order.
const EVIDENCE_SECTION_PRIORITY: &[&str] = &[
    "results",
    "findings",
    "discussion",
    "methodology",
    "methods",
    "experiments",
    "evaluation",
];

/// Language that makes a claim "strong" for gap detection.
const STRONG_CLAIM_WORDS: &[&str] = &[
    "significant",
    "substantial",
    "breakthrough",
    "revolutionary",
    "superior",
];

/// Language that flags a possible overclaim when evidence is only moderate.
const OVERCLAIM_WORDS: &[&str] = &["revolutionary", "breakthrough", "unprecedented"];

const AMMUNITION_CAP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStrength {
    Weak,
    Moderate,
    Strong,
}

/// A claim bound to the textual evidence located for and against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceMapping {
    pub claim: String,
    pub supporting_evidence: Vec<String>,
    pub contradictory_evidence: Vec<String>,
    pub strength: EvidenceStrength,
    pub evidence_locations: Vec<String>,
}

impl EvidenceMapping {
    /// A mapping with no evidence on either side carries no information
    /// and is discarded.
    pub fn has_evidence(&self) -> bool {
        !self.supporting_evidence.is_empty() || !self.contradictory_evidence.is_empty()
    }
}

/// Detailed technical findings from the full document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TechnicalDeepDive {
    pub algorithms: Vec<String>,
    pub experimental_design: Vec<String>,
    pub statistical_results: Vec<String>,
    pub performance_metrics: Vec<String>,
    pub implementation_details: Vec<String>,
    pub comparison_results: Vec<String>,
    pub limitations: Vec<String>,
}

impl TechnicalDeepDive {
    pub fn element_count(&self) -> usize {
        self.algorithms.len() + self.performance_metrics.len() + self.implementation_details.len()
    }
}

/// Methodology rigor review.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MethodologyAnalysis {
    pub data_collection: Vec<String>,
    pub sample_characteristics: Vec<String>,
    pub control_measures: Vec<String>,
    pub validation_approaches: Vec<String>,
    pub statistical_methods: Vec<String>,
    pub potential_biases: Vec<String>,
}

/// Ranked material for the two sides of the debate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DebateAmmunition {
    pub supportive: Vec<String>,
    pub critical: Vec<String>,
}

/// Complete Stage 2 output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComprehensiveEvidence {
    pub evidence_mappings: Vec<EvidenceMapping>,
    pub technical_deep_dive: TechnicalDeepDive,
    pub methodology_analysis: MethodologyAnalysis,
    pub claim_evidence_gaps: Vec<String>,
    pub overclaims: Vec<String>,
    pub ammunition: DebateAmmunition,
}

impl ComprehensiveEvidence {
    pub fn strong_mapping_count(&self) -> usize {
        self.evidence_mappings
            .iter()
            .filter(|m| m.strength == EvidenceStrength::Strong)
            .count()
    }
}

/// Hunts for evidence throughout the full document using the Stage 1
/// understanding to steer the search.
pub struct EvidenceHunter<'a> {
    service: &'a dyn GenerationService,
    config: &'a AnalysisConfig,
}

impl<'a> EvidenceHunter<'a> {
    pub fn new(service: &'a dyn GenerationService, config: &'a AnalysisConfig) -> Self {
        Self { service, config }
    }

    pub async fn hunt(
        &self,
        core: &CoreUnderstanding,
        document: &Document,
    ) -> Result<ComprehensiveEvidence, RundownError> {
        let context = evidence_context(document, self.config.evidence_context_chars);

        let mut mappings = Vec::new();
        for claim in &core.debate_seed_points {
            let prompt = build_mapping_prompt(claim, &context, &core.field_classification);
            let reply = self.service.generate(&prompt, MAPPING_MAX_LENGTH).await?;
            mappings.push(parse_evidence_mapping(claim, &reply)?);
        }

        resolve_shared_evidence(
            &mut mappings,
            &core.debate_seed_points,
            self.config.min_claim_overlap,
        );

        let unsupported_claims: Vec<String> = mappings
            .iter()
            .filter(|m| !m.has_evidence())
            .map(|m| m.claim.clone())
            .collect();
        mappings.retain(EvidenceMapping::has_evidence);

        let technical_prompt = build_technical_prompt(&context, &core.field_classification);
        let technical_reply = self
            .service
            .generate(&technical_prompt, TECHNICAL_MAX_LENGTH)
            .await?;
        let technical_deep_dive = parse_technical_deep_dive(&technical_reply)?;

        let methodology_prompt = build_methodology_prompt(&context, &core.field_classification);
        let methodology_reply = self
            .service
            .generate(&methodology_prompt, METHODOLOGY_MAX_LENGTH)
            .await?;
        let methodology_analysis = parse_methodology_analysis(&methodology_reply)?;

        let (claim_evidence_gaps, overclaims) =
            detect_gaps_and_overclaims(&mappings, &unsupported_claims);
        let ammunition = build_ammunition(&mappings, &technical_deep_dive, &methodology_analysis);

        debug!(
            mappings = mappings.len(),
            gaps = claim_evidence_gaps.len(),
            overclaims = overclaims.len(),
            "stage 2 evidence hunt complete"
        );

        Ok(ComprehensiveEvidence {
            evidence_mappings: mappings,
            technical_deep_dive,
            methodology_analysis,
            claim_evidence_gaps,
            overclaims,
            ammunition,
        })
    }
}

/// Assemble the evidence-bearing sections into one bounded context string,
/// priority sections first.
fn evidence_context(document: &Document, budget: usize) -> String {
    let mut context = String::new();

    let mut append = |name: &str, text: &str| {
        if context.len() >= budget {
            return;
        }
        let remaining = budget - context.len();
        let slice_end = text
            .char_indices()
            .nth(remaining)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        context.push_str(&format!("\n\n{}:\n{}", name.to_uppercase(), &text[..slice_end]));
    };

    for &name in EVIDENCE_SECTION_PRIORITY {
        if let Some(section) = document.section(name) {
            append(name, &section.text);
        }
    }
    for section in &document.sections {
        if !EVIDENCE_SECTION_PRIORITY.contains(&section.name.as_str()) {
            append(&section.name, &section.text);
        }
    }

    context
}

fn build_mapping_prompt(claim: &str, context: &str, field: &str) -> String {
    format!(
        r#"You are an expert peer reviewer conducting evidence analysis in {field}.

SPECIFIC CLAIM TO VERIFY:
"{claim}"

FULL PAPER SECTIONS FOR EVIDENCE:
{context}

TASK: Analyze whether this specific claim is supported by evidence in the paper sections.

REQUIRED ANALYSIS:

**SUPPORTING EVIDENCE:**
- [Specific evidence that supports this claim, quoting exact numbers or findings]

**CONTRADICTORY EVIDENCE:**
- [Any evidence that contradicts or weakens this claim]

**EVIDENCE STRENGTH:**
- [Rate as: STRONG, MODERATE, or WEAK]

**EVIDENCE LOCATION:**
- [Which paper sections contain relevant evidence]

Be specific and quote exact evidence. Focus only on this specific claim."#,
    )
}

fn build_technical_prompt(context: &str, field: &str) -> String {
    format!(
        r#"You are a technical expert analyzing this research paper for detailed implementation and performance information.

RESEARCH FIELD: {field}

FULL PAPER SECTIONS:
{context}

EXTRACT DETAILED TECHNICAL INFORMATION:

**ALGORITHMS:**
- [Specific algorithm names, formulations, implementation choices]

**EXPERIMENTAL DESIGN:**
- [Setup, procedures, control groups and variables]

**STATISTICAL RESULTS:**
- [Exact statistical tests, p-values, confidence intervals, sample sizes]

**PERFORMANCE METRICS:**
- [Baseline comparisons, benchmarks, quantitative results with exact numbers]

**IMPLEMENTATION DETAILS:**
- [Software, hardware, parameter settings, reproducibility information]

**COMPARISON RESULTS:**
- [How the method compares to alternatives and whether comparisons are fair]

**LIMITATIONS:**
- [Technical limitations, scope constraints, known failure modes]

Extract specific, technical details that domain experts would need for evaluation."#,
    )
}

fn build_methodology_prompt(context: &str, field: &str) -> String {
    format!(
        r#"You are a methodology expert reviewing this research for experimental rigor and potential biases.

RESEARCH FIELD: {field}

PAPER SECTIONS:
{context}

ANALYZE METHODOLOGY RIGOR:

**DATA COLLECTION:**
- [How data was collected, sampling methodology, validation procedures]

**SAMPLE CHARACTERISTICS:**
- [Sample size justification, representativeness, inclusion criteria]

**CONTROL MEASURES:**
- [Control groups, randomization, blinding and bias prevention]

**VALIDATION APPROACHES:**
- [Cross-validation, holdout sets, replication measures]

**STATISTICAL METHODS:**
- [Appropriateness of tests, corrections, assumption checking]

**POTENTIAL BIASES:**
- [Selection bias, confounding variables, measurement issues]

Focus on methodological strengths and weaknesses that experts would debate."#,
    )
}

#[derive(Clone, Copy, PartialEq)]
enum MappingSection {
    Supporting,
    Contradictory,
    Strength,
    Location,
}

/// Parse one claim's evidence reply. A reply with none of the four headers
/// is malformed; empty evidence lists under recognized headers are a
/// quality signal handled by the caller.
pub fn parse_evidence_mapping(claim: &str, reply: &str) -> Result<EvidenceMapping, RundownError> {
    let mut supporting_evidence = Vec::new();
    let mut contradictory_evidence = Vec::new();
    let mut strength = None;
    let mut evidence_locations = Vec::new();

    let mut current: Option<MappingSection> = None;

    for line in reply.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if freeform::is_header(line, &["SUPPORTING EVIDENCE"]) {
            current = Some(MappingSection::Supporting);
            continue;
        } else if freeform::is_header(line, &["CONTRADICTORY EVIDENCE"]) {
            current = Some(MappingSection::Contradictory);
            continue;
        } else if freeform::is_header(line, &["EVIDENCE STRENGTH"]) {
            current = Some(MappingSection::Strength);
            continue;
        } else if freeform::is_header(line, &["EVIDENCE LOCATION"]) {
            current = Some(MappingSection::Location);
            continue;
        }

        match current {
            Some(MappingSection::Supporting) => {
                if let Some(item) = freeform::list_item(line) {
                    if item.len() > 20 {
                        supporting_evidence.push(item);
                    }
                }
            }
            Some(MappingSection::Contradictory) => {
                if let Some(item) = freeform::list_item(line) {
                    if item.len() > 20 {
                        contradictory_evidence.push(item);
                    }
                }
            }
            Some(MappingSection::Strength) => {
                if strength.is_none() {
                    strength = parse_strength(line);
                }
            }
            Some(MappingSection::Location) => {
                if let Some(item) = freeform::list_item(line) {
                    if item.len() > 5 {
                        evidence_locations.push(item);
                    }
                }
            }
            None => {}
        }
    }

    if current.is_none() {
        return Err(RundownError::MalformedResponse(format!(
            "no recognizable evidence structure in reply for claim '{}'",
            truncate(claim, 60)
        )));
    }

    Ok(EvidenceMapping {
        claim: claim.to_string(),
        supporting_evidence,
        contradictory_evidence,
        // Unstated strength reads as weak; the gate treats it the same way.
        strength: strength.unwrap_or(EvidenceStrength::Weak),
        evidence_locations,
    })
}

fn parse_strength(line: &str) -> Option<EvidenceStrength> {
    let upper = line.to_uppercase();
    if upper.contains("STRONG") {
        Some(EvidenceStrength::Strong)
    } else if upper.contains("MODERATE") {
        Some(EvidenceStrength::Moderate)
    } else if upper.contains("WEAK") || upper.contains("ABSENT") {
        Some(EvidenceStrength::Weak)
    } else {
        None
    }
}

/// Lowercased alphanumeric tokens of a text fragment.
fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shared lexical tokens between two text fragments.
pub(crate) fn lexical_overlap(a: &str, b: &str) -> usize {
    token_set(a).intersection(&token_set(b)).count()
}

/// Deterministic tie-break: an evidence fragment held by multiple claims is
/// assigned to the claim with the greatest lexical-token overlap; an
/// overlap below `min_overlap`, or an exact tie, resolves to the earliest
/// claim in seed-point order.
pub fn resolve_shared_evidence(
    mappings: &mut [EvidenceMapping],
    claims: &[String],
    min_overlap: usize,
) {
    let lists: [fn(&mut EvidenceMapping) -> &mut Vec<String>; 2] = [
        |m| &mut m.supporting_evidence,
        |m| &mut m.contradictory_evidence,
    ];
    for list in lists {
        // Fragment key -> ordered claim indices that hold it.
        let mut holders: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, mapping) in mappings.iter_mut().enumerate() {
            for fragment in list(mapping).iter() {
                let key = fragment.to_lowercase();
                let entry = holders.entry(key).or_default();
                if !entry.contains(&idx) {
                    entry.push(idx);
                }
            }
        }

        for (key, claim_indices) in &holders {
            if claim_indices.len() < 2 {
                continue;
            }

            let mut winner = claim_indices[0];
            let mut best = 0usize;
            for &idx in claim_indices {
                let overlap = claims
                    .get(idx)
                    .map(|claim| lexical_overlap(key, claim))
                    .unwrap_or(0);
                if overlap > best {
                    best = overlap;
                    winner = idx;
                }
            }
            if best < min_overlap {
                winner = claim_indices[0];
            }

            for &idx in claim_indices {
                if idx != winner {
                    list(&mut mappings[idx]).retain(|f| f.to_lowercase() != *key);
                }
            }
        }
    }
}

/// Gaps: claims with no located evidence, strong claims on weak evidence,
/// and claims with counter-evidence. Overclaims: very strong language over
/// merely moderate evidence.
pub fn detect_gaps_and_overclaims(
    mappings: &[EvidenceMapping],
    unsupported_claims: &[String],
) -> (Vec<String>, Vec<String>) {
    let mut gaps = Vec::new();
    let mut overclaims = Vec::new();

    for claim in unsupported_claims {
        gaps.push(format!("No evidence located for claim '{}'", truncate(claim, 60)));
    }

    for mapping in mappings {
        let claim_lower = mapping.claim.to_lowercase();

        if mapping.strength == EvidenceStrength::Weak
            && STRONG_CLAIM_WORDS.iter().any(|w| claim_lower.contains(w))
        {
            gaps.push(format!(
                "Strong claim '{}' has weak evidence",
                truncate(&mapping.claim, 60)
            ));
        }

        if mapping.strength == EvidenceStrength::Moderate
            && OVERCLAIM_WORDS.iter().any(|w| claim_lower.contains(w))
        {
            overclaims.push(format!(
                "Claim uses strong language '{}' but evidence is only moderate",
                truncate(&mapping.claim, 60)
            ));
        }

        if !mapping.contradictory_evidence.is_empty() {
            gaps.push(format!(
                "Contradictory evidence found for claim '{}': {} counter-points",
                truncate(&mapping.claim, 60),
                mapping.contradictory_evidence.len()
            ));
        }
    }

    (gaps, overclaims)
}

/// Rank material for the two debate sides, capped to the most important
/// points per side.
pub fn build_ammunition(
    mappings: &[EvidenceMapping],
    technical: &TechnicalDeepDive,
    methodology: &MethodologyAnalysis,
) -> DebateAmmunition {
    let mut supportive = Vec::new();
    let mut critical = Vec::new();

    for mapping in mappings {
        if mapping.strength == EvidenceStrength::Strong {
            for evidence in mapping.supporting_evidence.iter().take(2) {
                supportive.push(format!("Strong evidence: {}", evidence));
            }
        }
        if mapping.strength == EvidenceStrength::Weak || !mapping.contradictory_evidence.is_empty()
        {
            critical.push(format!(
                "Weak evidence for key claim: {}",
                truncate(&mapping.claim, 60)
            ));
            for evidence in mapping.contradictory_evidence.iter().take(2) {
                critical.push(format!("Contradictory finding: {}", evidence));
            }
        }
    }

    for metric in technical.performance_metrics.iter().take(2) {
        supportive.push(format!("Impressive performance: {}", metric));
    }
    for limit in technical.limitations.iter().take(2) {
        critical.push(format!("Significant limitation: {}", limit));
    }
    for approach in methodology.validation_approaches.iter().take(2) {
        supportive.push(format!("Rigorous validation: {}", approach));
    }
    for bias in methodology.potential_biases.iter().take(2) {
        critical.push(format!("Potential bias: {}", bias));
    }

    supportive.truncate(AMMUNITION_CAP);
    critical.truncate(AMMUNITION_CAP);
    DebateAmmunition { supportive, critical }
}

pub fn parse_technical_deep_dive(reply: &str) -> Result<TechnicalDeepDive, RundownError> {
    let mut dive = TechnicalDeepDive::default();
    let mut current: Option<usize> = None;

    let headers: [(&[&str], fn(&mut TechnicalDeepDive) -> &mut Vec<String>); 7] = [
        (&["ALGORITHM"], |d| &mut d.algorithms),
        (&["EXPERIMENTAL DESIGN"], |d| &mut d.experimental_design),
        (&["STATISTICAL RESULT"], |d| &mut d.statistical_results),
        (&["PERFORMANCE METRIC"], |d| &mut d.performance_metrics),
        (&["IMPLEMENTATION"], |d| &mut d.implementation_details),
        (&["COMPARISON"], |d| &mut d.comparison_results),
        (&["LIMITATION"], |d| &mut d.limitations),
    ];

    for line in reply.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(idx) = headers
            .iter()
            .position(|(keywords, _)| freeform::is_header(line, keywords))
        {
            current = Some(idx);
            continue;
        }

        if let (Some(idx), Some(item)) = (current, freeform::list_item(line)) {
            if item.len() > 20 {
                (headers[idx].1)(&mut dive).push(item);
            }
        }
    }

    if current.is_none() {
        return Err(RundownError::MalformedResponse(
            "no recognizable structure in technical analysis reply".to_string(),
        ));
    }
    Ok(dive)
}

pub fn parse_methodology_analysis(reply: &str) -> Result<MethodologyAnalysis, RundownError> {
    let mut analysis = MethodologyAnalysis::default();
    let mut current: Option<usize> = None;

    let headers: [(&[&str], fn(&mut MethodologyAnalysis) -> &mut Vec<String>); 6] = [
        (&["DATA COLLECTION"], |m| &mut m.data_collection),
        (&["SAMPLE CHARACTERISTIC"], |m| &mut m.sample_characteristics),
        (&["CONTROL MEASURE"], |m| &mut m.control_measures),
        (&["VALIDATION"], |m| &mut m.validation_approaches),
        (&["STATISTICAL METHOD"], |m| &mut m.statistical_methods),
        (&["POTENTIAL BIAS"], |m| &mut m.potential_biases),
    ];

    for line in reply.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(idx) = headers
            .iter()
            .position(|(keywords, _)| freeform::is_header(line, keywords))
        {
            current = Some(idx);
            continue;
        }

        if let (Some(idx), Some(item)) = (current, freeform::list_item(line)) {
            if item.len() > 20 {
                (headers[idx].1)(&mut analysis).push(item);
            }
        }
    }

    if current.is_none() {
        return Err(RundownError::MalformedResponse(
            "no recognizable structure in methodology reply".to_string(),
        ));
    }
    Ok(analysis)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
