//! Analysis quality scoring.
//!
//! A pure function over counts from the two analysis stages. The score is
//! advisory: synthesis proceeds regardless, but downstream quality tiers
//! are informed by it.

use serde::{Deserialize, Serialize};

use crate::stage1::CoreUnderstanding;
use crate::stage2::ComprehensiveEvidence;

/// Score at or above which the analysis is considered ready for
/// high-fidelity synthesis.
pub const READY_THRESHOLD: u8 = 12;

pub const MAX_SCORE: u8 = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct QualityReport {
    /// Bounded analysis quality score, 0 to [`MAX_SCORE`].
    pub score: u8,
    /// Advisory readiness flag: `score >= READY_THRESHOLD`.
    pub ready: bool,
}

/// Score the combined analysis via fixed weighted thresholds. Identical
/// inputs always yield identical scores; no side effects.
pub fn assess_quality(core: &CoreUnderstanding, evidence: &ComprehensiveEvidence) -> QualityReport {
    let mut score: u8 = 0;

    // Stage 1 contribution (max 10).
    if core.is_classified() {
        score += 2;
    }
    score += match core.debate_seed_points.len() {
        n if n >= 8 => 3,
        n if n >= 5 => 2,
        _ => 0,
    };
    score += match core.research_story.len() {
        n if n >= 5 => 2,
        n if n >= 3 => 1,
        _ => 0,
    };
    score += match core.technical_elements.len() {
        n if n >= 6 => 2,
        n if n >= 3 => 1,
        _ => 0,
    };
    if core.confidence_assessment.len() >= 4 {
        score += 1;
    }

    // Stage 2 contribution (max 10).
    if evidence.evidence_mappings.len() >= 3 {
        score += 2;
    }
    score += match evidence.strong_mapping_count() {
        n if n >= 2 => 2,
        n if n >= 1 => 1,
        _ => 0,
    };
    let tech = &evidence.technical_deep_dive;
    if tech.algorithms.len() + tech.performance_metrics.len() >= 4 {
        score += 2;
    }
    if evidence.methodology_analysis.potential_biases.len() + evidence.claim_evidence_gaps.len()
        >= 3
    {
        score += 2;
    }
    if evidence.ammunition.supportive.len() >= 3 && evidence.ammunition.critical.len() >= 3 {
        score += 2;
    }

    let score = score.min(MAX_SCORE);
    QualityReport {
        score,
        ready: score >= READY_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage1::UNCLASSIFIED_FIELD;
    use crate::stage2::{
        DebateAmmunition, EvidenceMapping, EvidenceStrength, MethodologyAnalysis,
        TechnicalDeepDive,
    };
    use std::collections::BTreeMap;

    fn empty_core() -> CoreUnderstanding {
        CoreUnderstanding {
            field_classification: UNCLASSIFIED_FIELD.to_string(),
            research_story: BTreeMap::new(),
            confidence_assessment: BTreeMap::new(),
            debate_seed_points: vec![],
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

    fn strong_mapping(i: usize) -> EvidenceMapping {
        EvidenceMapping {
            claim: format!("claim {}", i),
            supporting_evidence: vec![format!("evidence for claim {}", i)],
            contradictory_evidence: vec![],
            strength: EvidenceStrength::Strong,
            evidence_locations: vec![],
        }
    }

    #[test]
    fn test_empty_analysis_scores_zero() {
        let report = assess_quality(&empty_core(), &empty_evidence());
        assert_eq!(report.score, 0);
        assert!(!report.ready);
    }

    #[test]
    fn test_scorer_is_pure() {
        let mut core = empty_core();
        core.field_classification = "Computer Science - Graph Algorithms".to_string();
        core.debate_seed_points = (0..6).map(|i| format!("seed point {}", i)).collect();

        let first = assess_quality(&core, &empty_evidence());
        let second = assess_quality(&core, &empty_evidence());
        assert_eq!(first, second);
        // +2 classified, +2 for 5..8 seeds.
        assert_eq!(first.score, 4);
    }

    #[test]
    fn test_rich_analysis_is_ready() {
        let mut core = empty_core();
        core.field_classification = "Machine Learning".to_string();
        core.debate_seed_points = (0..9).map(|i| format!("seed point {}", i)).collect();
        core.technical_elements = (0..6).map(|i| format!("technical element {}", i)).collect();

        let mut evidence = empty_evidence();
        evidence.evidence_mappings = (0..3).map(strong_mapping).collect();
        evidence.technical_deep_dive.algorithms =
            (0..2).map(|i| format!("algorithm {}", i)).collect();
        evidence.technical_deep_dive.performance_metrics =
            (0..2).map(|i| format!("metric {}", i)).collect();
        evidence.claim_evidence_gaps = (0..3).map(|i| format!("gap {}", i)).collect();
        evidence.ammunition = DebateAmmunition {
            supportive: (0..3).map(|i| format!("supportive {}", i)).collect(),
            critical: (0..3).map(|i| format!("critical {}", i)).collect(),
        };

        let report = assess_quality(&core, &evidence);
        // 2+3+2 from stage 1, 2+2+2+2+2 from stage 2.
        assert_eq!(report.score, 17);
        assert!(report.ready);
    }

    #[test]
    fn test_score_is_bounded() {
        let report = assess_quality(&empty_core(), &empty_evidence());
        assert!(report.score <= MAX_SCORE);
    }
}
