//! Stage 1: core-understanding extraction.
//!
//! One structured-extraction request over the document's core sections,
//! parsed into [`CoreUnderstanding`]. Empty fields are a quality signal for
//! the readiness gate, not an error; an unreachable service or a reply with
//! no recognizable structure at all aborts the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::document::Document;
use crate::error::RundownError;
use crate::freeform;
use crate::generation::GenerationService;

/// Sentinel value for an unclassified document.
pub const UNCLASSIFIED_FIELD: &str = "General Research";

const STAGE1_MAX_LENGTH: u32 = 2500;

/// Sections fed to the structured-extraction prompt, in order of interest.
const CORE_SECTION_ORDER: &[&str] = &["title", "abstract", "conclusion", "future work"];

/// Recognized narrative roles in a research story, in fixed order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum StoryRole {
    Problem,
    Gap,
    Solution,
    Method,
    Finding,
    Contribution,
    Significance,
    Implication,
}

impl StoryRole {
    /// Map a free-text key (e.g. "Core Problem", "Key Findings") onto a
    /// narrative role. Unrecognized keys are dropped by the parser.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.to_lowercase();
        if key.contains("problem") {
            Some(StoryRole::Problem)
        } else if key.contains("gap") {
            Some(StoryRole::Gap)
        } else if key.contains("solution") || key.contains("approach") {
            Some(StoryRole::Solution)
        } else if key.contains("method") {
            Some(StoryRole::Method)
        } else if key.contains("finding") || key.contains("result") {
            Some(StoryRole::Finding)
        } else if key.contains("contribution") {
            Some(StoryRole::Contribution)
        } else if key.contains("significance") {
            Some(StoryRole::Significance)
        } else if key.contains("implication") {
            Some(StoryRole::Implication)
        } else {
            None
        }
    }
}

/// Stage 1 analysis results. Produced once, read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreUnderstanding {
    pub field_classification: String,
    pub research_story: BTreeMap<StoryRole, String>,
    pub confidence_assessment: BTreeMap<String, String>,
    /// Ordered, deduplicated candidate discussion questions.
    pub debate_seed_points: Vec<String>,
    pub technical_elements: Vec<String>,
}

impl CoreUnderstanding {
    pub fn is_classified(&self) -> bool {
        self.field_classification != UNCLASSIFIED_FIELD
    }
}

/// Drives the one-shot Stage 1 extraction through the generation service.
pub struct CoreUnderstandingExtractor<'a> {
    service: &'a dyn GenerationService,
}

impl<'a> CoreUnderstandingExtractor<'a> {
    pub fn new(service: &'a dyn GenerationService) -> Self {
        Self { service }
    }

    pub async fn extract(&self, document: &Document) -> Result<CoreUnderstanding, RundownError> {
        let prompt = build_stage1_prompt(document);
        let reply = self.service.generate(&prompt, STAGE1_MAX_LENGTH).await?;
        let understanding = parse_core_understanding(&reply)?;

        debug!(
            field = %understanding.field_classification,
            seeds = understanding.debate_seed_points.len(),
            story = understanding.research_story.len(),
            "stage 1 extraction complete"
        );
        Ok(understanding)
    }
}

fn build_stage1_prompt(document: &Document) -> String {
    let mut core_content = String::new();
    for &name in CORE_SECTION_ORDER {
        if let Some(section) = document.section(name) {
            core_content.push_str(&format!("\n\n{}:\n{}", name.to_uppercase(), section.text));
        }
    }
    // A document with none of the core sections (fallback slice, unusual
    // heading set) still gets analyzed on whatever was segmented.
    if core_content.trim().is_empty() {
        for section in &document.sections {
            core_content.push_str(&format!(
                "\n\n{}:\n{}",
                section.name.to_uppercase(),
                section.text
            ));
        }
    }

    format!(
        r#"You are an expert academic researcher and peer reviewer. Analyze ONLY the provided sections of this research paper. Provide a deep, critical analysis following this EXACT structure:

CORE SECTIONS TO ANALYZE:
{core_content}

REQUIRED ANALYSIS STRUCTURE:

**1. RESEARCH STORY ARC:**
- Core Problem: [What specific problem does this address?]
- Claimed Solution: [What approach do they propose?]
- Key Findings: [What are their main results?]
- Claimed Significance: [Why do they say this matters?]

**2. CONFIDENCE ASSESSMENT:**
- Author Confidence Level: [How confident are they in their claims?]
- Acknowledged Limitations: [What gaps do they admit?]
- Language Analysis: [Modest language or strong claims?]

**3. FIELD CLASSIFICATION:**
- Primary Domain: [Specific field, e.g. "Machine Learning - Natural Language Processing"]

**4. TECHNICAL ELEMENTS:**
- [Key methodological choices, measurable claims, scope boundaries]

**5. DEBATE SEED POINTS:**
- [Methodology concerns, evidence gaps, scope disputes, innovation claims that experts would actually argue about]

Be specific, quote exact phrases, and provide evidence-based analysis."#,
    )
}

#[derive(Clone, Copy, PartialEq)]
enum Stage1Section {
    Story,
    Confidence,
    Field,
    Technical,
    Debate,
}

/// Parse the free-text Stage 1 reply. Tolerates arbitrary emphasis markup
/// and both numbered and bulleted list styles. A reply in which none of the
/// five headers is recognizable signals a malformed response.
pub fn parse_core_understanding(reply: &str) -> Result<CoreUnderstanding, RundownError> {
    let mut research_story = BTreeMap::new();
    let mut confidence_assessment = BTreeMap::new();
    let mut debate_seed_points: Vec<String> = Vec::new();
    let mut technical_elements = Vec::new();
    let mut field_classification = UNCLASSIFIED_FIELD.to_string();

    let mut current: Option<Stage1Section> = None;
    let mut seen_seeds: HashSet<String> = HashSet::new();

    for line in reply.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Header detection, in the same priority order the prompt uses.
        if freeform::is_header(line, &["RESEARCH STORY", "STORY ARC"]) {
            current = Some(Stage1Section::Story);
            continue;
        } else if freeform::is_header(line, &["CONFIDENCE", "ASSESSMENT"]) {
            current = Some(Stage1Section::Confidence);
            continue;
        } else if freeform::is_header(line, &["FIELD", "CLASSIFICATION", "DOMAIN"]) {
            current = Some(Stage1Section::Field);
            // "Primary Domain: X" may share the line with the header cue.
            if let Some((key, value)) = freeform::key_value(line) {
                if key.to_lowercase().contains("domain") {
                    field_classification = value;
                }
            }
            continue;
        } else if freeform::is_header(line, &["TECHNICAL", "ELEMENTS"]) {
            current = Some(Stage1Section::Technical);
            continue;
        } else if freeform::is_header(line, &["DEBATE", "SEED"]) {
            current = Some(Stage1Section::Debate);
            continue;
        }

        match current {
            Some(Stage1Section::Story) => {
                if let Some((key, value)) = freeform::key_value(line) {
                    if let Some(role) = StoryRole::from_key(&key) {
                        research_story.entry(role).or_insert(value);
                    }
                }
            }
            Some(Stage1Section::Confidence) => {
                if let Some((key, value)) = freeform::key_value(line) {
                    let key = key.to_lowercase();
                    if ["confidence", "limitation", "language", "claim"]
                        .iter()
                        .any(|k| key.contains(k))
                    {
                        confidence_assessment.entry(key.replace(' ', "_")).or_insert(value);
                    }
                }
            }
            Some(Stage1Section::Field) => {
                if let Some((key, value)) = freeform::key_value(line) {
                    if key.to_lowercase().contains("domain") {
                        field_classification = value;
                        continue;
                    }
                }
                if let Some(item) = freeform::list_item(line) {
                    if item.len() > 15 {
                        technical_elements.push(item);
                    }
                }
            }
            Some(Stage1Section::Technical) => {
                if let Some(item) = freeform::list_item(line) {
                    if item.len() > 15 {
                        technical_elements.push(item);
                    }
                }
            }
            Some(Stage1Section::Debate) => {
                if let Some(item) = freeform::list_item(line) {
                    if item.len() > 15 && seen_seeds.insert(item.to_lowercase()) {
                        debate_seed_points.push(item);
                    }
                }
            }
            None => {}
        }
    }

    if current.is_none() {
        return Err(RundownError::MalformedResponse(
            "no recognizable analysis structure in stage 1 reply".to_string(),
        ));
    }

    Ok(CoreUnderstanding {
        field_classification,
        research_story,
        confidence_assessment,
        debate_seed_points,
        technical_elements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::test_support::{CannedService, FailingService};

    const SAMPLE_REPLY: &str = r#"
**1. RESEARCH STORY ARC:**
- Core Problem: Scaling community detection to billion-edge graphs
- Claimed Solution: A parallel connectivity modifier with task batching
- Key Findings: 23% faster than the prior state of the art
- Narrative Flourish: should be dropped

**2. CONFIDENCE ASSESSMENT:**
- Author Confidence Level: High, with strong language throughout
- Acknowledged Limitations: No evaluation on dynamic graphs

**3. FIELD CLASSIFICATION:**
- Primary Domain: Computer Science - Graph Algorithms

**4. TECHNICAL ELEMENTS:**
1. Chapel tasking model with work stealing
2. Billion-edge benchmark suite across three datasets

**5. DEBATE SEED POINTS:**
* Is the 23% speedup attributable to the algorithm or the runtime?
* Does the benchmark suite represent real-world workloads?
* Is the 23% speedup attributable to the algorithm or the runtime?
"#;

    #[test]
    fn test_parse_full_reply() {
        let core = parse_core_understanding(SAMPLE_REPLY).expect("parses");

        assert_eq!(core.field_classification, "Computer Science - Graph Algorithms");
        assert_eq!(
            core.research_story.get(&StoryRole::Problem).map(String::as_str),
            Some("Scaling community detection to billion-edge graphs")
        );
        assert!(core.research_story.get(&StoryRole::Finding).is_some());
        // "Narrative Flourish" is not a recognized role.
        assert_eq!(core.research_story.len(), 3);
        assert_eq!(core.confidence_assessment.len(), 2);
        assert_eq!(core.technical_elements.len(), 2);
        // Duplicate seed point dropped, order preserved.
        assert_eq!(core.debate_seed_points.len(), 2);
        assert!(core.debate_seed_points[0].contains("23% speedup"));
    }

    #[test]
    fn test_parse_tolerates_markup_and_numbering() {
        let reply = "## DEBATE SEED POINTS\n1. **Does the sample size justify the claims made here?**\n2) __Are the baselines tuned fairly for comparison?__\n";
        let core = parse_core_understanding(reply).expect("parses");
        assert_eq!(core.debate_seed_points.len(), 2);
        assert!(core.debate_seed_points[1].starts_with("Are the baselines"));
    }

    #[test]
    fn test_empty_fields_are_not_an_error() {
        let reply = "**RESEARCH STORY ARC:**\n(nothing of substance found)\n";
        let core = parse_core_understanding(reply).expect("parses");
        assert!(core.research_story.is_empty());
        assert!(core.debate_seed_points.is_empty());
        assert!(!core.is_classified());
    }

    #[test]
    fn test_unrecognizable_reply_is_malformed() {
        let reply = "I'm sorry, I can't help with that request.";
        let result = parse_core_understanding(reply);
        assert!(matches!(result, Err(RundownError::MalformedResponse(_))));
    }

    #[test]
    fn test_round_trip() {
        let core = parse_core_understanding(SAMPLE_REPLY).expect("parses");
        let json = serde_json::to_string(&core).expect("serialize");
        let back: CoreUnderstanding = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(core, back);
    }

    #[tokio::test]
    async fn test_extractor_happy_path() {
        let text = format!(
            "Abstract\n{}\n\nConclusion\n{}\n",
            "We present a parallel community detection algorithm. ".repeat(3),
            "The approach scales to billion-edge graphs in practice. ".repeat(3),
        );
        let document = Document::segment(&text, &AnalysisConfig::default());
        let service = CannedService::new(vec![SAMPLE_REPLY.to_string()]);

        let extractor = CoreUnderstandingExtractor::new(&service);
        let core = extractor.extract(&document).await.expect("extracts");
        assert!(core.is_classified());

        let prompts = service.prompts();
        assert!(prompts[0].contains("ABSTRACT:"));
        assert!(prompts[0].contains("CONCLUSION:"));
    }

    #[tokio::test]
    async fn test_extractor_service_failure_is_fatal() {
        let document = Document::fallback_slice("some text", 100);
        let service = FailingService;
        let extractor = CoreUnderstandingExtractor::new(&service);
        let result = extractor.extract(&document).await;
        assert!(matches!(result, Err(RundownError::ServiceUnavailable(_))));
    }
}
