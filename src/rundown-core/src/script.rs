//! Debate script model.
//!
//! Turns are drafted with free-text speaker labels during synthesis and
//! normalized onto the canonical roster exactly once, at freeze time. A
//! frozen script has passed its structural invariants and is immutable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::PersonalitiesConfig;
use crate::error::RundownError;

/// Terms counted as technical concepts for the sophistication score.
const TECHNICAL_CONCEPT_TERMS: &[&str] = &[
    "algorithm",
    "methodology",
    "statistical",
    "experimental",
    "validation",
    "benchmark",
    "baseline",
];

/// The canonical speaker roster: two debaters plus a narrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Optimist,
    Skeptic,
    Narrator,
}

impl Speaker {
    /// Resolve a free-text speaker label onto the roster, recognizing
    /// alternate name forms for the same debater. Returns `None` for
    /// labels that match nobody.
    pub fn resolve(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if ["narrator", "host", "announcer"].iter().any(|n| label.contains(n)) {
            Some(Speaker::Narrator)
        } else if ["marcus", "webb"].iter().any(|n| label.contains(n)) {
            Some(Speaker::Skeptic)
        } else if ["ava", "sarah", "chen"].iter().any(|n| label.contains(n)) {
            Some(Speaker::Optimist)
        } else {
            None
        }
    }

    /// Canonical display name from the injected roster configuration.
    pub fn display_name(&self, personalities: &PersonalitiesConfig) -> String {
        match self {
            Speaker::Optimist => personalities.optimist.name.clone(),
            Speaker::Skeptic => personalities.skeptic.name.clone(),
            Speaker::Narrator => "Narrator".to_string(),
        }
    }
}

/// Which synthesis branch produced the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMethod {
    Sophisticated,
    Simplified,
}

impl std::fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMethod::Sophisticated => write!(f, "sophisticated"),
            GenerationMethod::Simplified => write!(f, "simplified"),
        }
    }
}

/// Coarse fitness bucket for downstream production use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Excellent,
    Good,
    Acceptable,
}

/// One spoken turn in the frozen script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub speaker: Speaker,
    pub role: String,
    pub content: String,
    pub topic: String,
    pub index: usize,
}

/// Segment kind markers used by the audio assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Intro,
    Exchange,
    Outro,
}

impl Turn {
    pub fn kind(&self, total: usize) -> TurnKind {
        if self.index == 0 {
            TurnKind::Intro
        } else if self.index + 1 == total {
            TurnKind::Outro
        } else {
            TurnKind::Exchange
        }
    }
}

/// A turn as drafted by the synthesizer, before speaker normalization.
#[derive(Debug, Clone)]
pub struct DraftTurn {
    pub speaker: String,
    pub role: String,
    pub content: String,
    pub topic: String,
}

/// A structurally valid, frozen debate script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateScript {
    pub title: String,
    pub topic: String,
    pub turns: Vec<Turn>,
    pub method: GenerationMethod,
    /// 0-100 richness measure over citations, concepts, and branch taken.
    pub sophistication_score: u8,
    pub quality_tier: QualityTier,
}

impl DebateScript {
    /// Normalize drafted turns onto the canonical roster, check the
    /// structural invariants, and compute the derived quality measures.
    ///
    /// The fallback branch is defined so that these invariants always hold;
    /// a violation here is a defect, not a recoverable condition.
    pub fn freeze(
        title: impl Into<String>,
        topic: impl Into<String>,
        drafts: Vec<DraftTurn>,
        method: GenerationMethod,
    ) -> Result<Self, RundownError> {
        if drafts.is_empty() {
            return Err(RundownError::StructuralViolation(
                "script has no turns".to_string(),
            ));
        }

        let mut turns = Vec::with_capacity(drafts.len());
        for (index, draft) in drafts.into_iter().enumerate() {
            if draft.content.trim().is_empty() {
                return Err(RundownError::StructuralViolation(format!(
                    "turn {} has empty content",
                    index
                )));
            }
            let speaker = Speaker::resolve(&draft.speaker).ok_or_else(|| {
                RundownError::StructuralViolation(format!(
                    "speaker '{}' is not on the roster",
                    draft.speaker
                ))
            })?;
            turns.push(Turn {
                speaker,
                role: draft.role,
                content: draft.content,
                topic: draft.topic,
                index,
            });
        }

        let sophistication_score = sophistication_score(&turns, method);
        let quality_tier = quality_tier(&turns, sophistication_score);

        Ok(Self {
            title: title.into(),
            topic: topic.into(),
            turns,
            method,
            sophistication_score,
            quality_tier,
        })
    }
}

/// Extract citation-like fragments (tables, figures, percentages,
/// significance levels) from spoken content.
pub fn extract_citations(text: &str) -> Vec<String> {
    let patterns = [
        r"(?i)Table \d+",
        r"(?i)Figure \d+",
        r"\d+(?:\.\d+)?%",
        r"(?i)p\s*[<>=]\s*0\.\d+",
    ];
    let mut citations = Vec::new();
    for pattern in patterns {
        let re = Regex::new(pattern).expect("static citation pattern");
        citations.extend(re.find_iter(text).map(|m| m.as_str().to_string()));
    }
    citations
}

fn unique_technical_concepts(turns: &[Turn]) -> usize {
    let mut seen: HashSet<&str> = HashSet::new();
    for turn in turns {
        let lower = turn.content.to_lowercase();
        for &term in TECHNICAL_CONCEPT_TERMS {
            if lower.contains(term) {
                seen.insert(term);
            }
        }
    }
    seen.len()
}

fn sophistication_score(turns: &[Turn], method: GenerationMethod) -> u8 {
    if turns.is_empty() {
        return 0;
    }

    let mut score = 0usize;

    let citations: usize = turns
        .iter()
        .map(|t| extract_citations(&t.content).len())
        .sum();
    score += (citations * 15 / turns.len()).min(30);

    score += (unique_technical_concepts(turns) * 3).min(25);

    let avg_length = turns.iter().map(|t| t.content.len()).sum::<usize>() / turns.len();
    if avg_length > 150 {
        score += 25;
    } else if avg_length > 100 {
        score += 15;
    }

    score += match method {
        GenerationMethod::Sophisticated => 20,
        GenerationMethod::Simplified => 5,
    };

    score.min(100) as u8
}

fn quality_tier(turns: &[Turn], sophistication: u8) -> QualityTier {
    let mut points = 0usize;

    points += match turns.len() {
        n if n >= 8 => 3,
        n if n >= 6 => 2,
        n if n >= 4 => 1,
        _ => 0,
    };
    points += match sophistication {
        s if s >= 70 => 4,
        s if s >= 50 => 3,
        s if s >= 30 => 2,
        _ => 1,
    };
    let avg_length = if turns.is_empty() {
        0
    } else {
        turns.iter().map(|t| t.content.len()).sum::<usize>() / turns.len()
    };
    if avg_length >= 150 {
        points += 2;
    } else if avg_length >= 100 {
        points += 1;
    }
    if turns.iter().any(|t| !extract_citations(&t.content).is_empty()) {
        points += 1;
    }

    if points >= 8 {
        QualityTier::Excellent
    } else if points >= 6 {
        QualityTier::Good
    } else {
        QualityTier::Acceptable
    }
}
