//! Document model and text segmentation.
//!
//! Partitions raw document text into named sections by matching an ordered
//! vocabulary of heading variants. The resulting [`Document`] is created
//! once per run and immutable after segmentation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::RundownError;

/// Ordered heading vocabulary. Order matters only for stable iteration;
/// boundary positions decide section order in the document.
const HEADING_VOCABULARY: &[&str] = &[
    "abstract",
    "introduction",
    "background",
    "related work",
    "methodology",
    "methods",
    "materials",
    "experiments",
    "evaluation",
    "results",
    "findings",
    "discussion",
    "conclusions",
    "conclusion",
    "future work",
    "references",
    "acknowledgments",
    "appendix",
];

/// Section name used for the positional-slice fallback when no headings
/// were detected.
pub const FALLBACK_SECTION: &str = "content";

/// A named, positioned span of document text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub name: String,
    /// Byte offset where the section content starts in the raw text.
    pub start: usize,
    /// Byte offset one past the end of the section content.
    pub end: usize,
    pub text: String,
}

/// A segmented source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub raw_text: String,
    /// Sections ordered by position. First occurrence wins per name.
    pub sections: Vec<Section>,
}

impl Document {
    /// Segment normalized text into named sections.
    pub fn segment(raw_text: &str, config: &AnalysisConfig) -> Self {
        let sections = detect_sections(raw_text, config.min_section_chars);
        Self {
            raw_text: raw_text.to_string(),
            sections,
        }
    }

    /// Build a document from the positional-slice fallback: a fixed-size
    /// slice of the document start under the [`FALLBACK_SECTION`] name.
    pub fn fallback_slice(raw_text: &str, slice_chars: usize) -> Self {
        let end = raw_text
            .char_indices()
            .nth(slice_chars)
            .map(|(i, _)| i)
            .unwrap_or(raw_text.len());
        let text = raw_text[..end].trim().to_string();

        Self {
            raw_text: raw_text.to_string(),
            sections: vec![Section {
                name: FALLBACK_SECTION.to_string(),
                start: 0,
                end,
                text,
            }],
        }
    }

    pub fn has_sections(&self) -> bool {
        !self.sections.is_empty()
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// Normalize extracted text before segmentation: repair hyphenation breaks,
/// drop standalone page numbers, and collapse runs of blank lines and
/// horizontal whitespace while keeping line structure intact.
pub fn normalize_text(text: &str) -> String {
    let hyphen_break = Regex::new(r"-[ \t]*\n[ \t]*").expect("static regex");
    let page_number = Regex::new(r"(?m)^\s*\d+\s*$").expect("static regex");
    let blank_runs = Regex::new(r"\n{3,}").expect("static regex");
    let space_runs = Regex::new(r"[ \t]{2,}").expect("static regex");

    let text = hyphen_break.replace_all(text, "");
    let text = page_number.replace_all(&text, "");
    let text = blank_runs.replace_all(&text, "\n\n");
    let text = space_runs.replace_all(&text, " ");
    text.trim().to_string()
}

/// A candidate section boundary: heading match position plus where the
/// section content begins.
struct Boundary {
    pos: usize,
    content_start: usize,
    name: &'static str,
}

fn detect_sections(text: &str, min_section_chars: usize) -> Vec<Section> {
    let mut boundaries: Vec<Boundary> = Vec::new();

    for &name in HEADING_VOCABULARY {
        // Heading on its own line, optionally numbered (arabic or roman),
        // optionally followed by a colon. Case-insensitive.
        let pattern = format!(
            r"(?im)^[ \t]*(?:(?:\d+(?:\.\d+)*|[ivxl]+)\.?[ \t]+)?{}[ \t]*:?[ \t]*\r?$",
            regex::escape(name)
        );
        let re = Regex::new(&pattern).expect("heading pattern");
        for m in re.find_iter(text) {
            boundaries.push(Boundary {
                pos: m.start(),
                content_start: m.end(),
                name,
            });
        }
    }

    boundaries.sort_by_key(|b| b.pos);

    let mut sections = Vec::new();
    for (i, boundary) in boundaries.iter().enumerate() {
        let end = boundaries
            .get(i + 1)
            .map(|next| next.pos)
            .unwrap_or(text.len());
        let start = boundary.content_start.min(end);
        let span = text[start..end].trim();

        if span.len() <= min_section_chars {
            continue;
        }
        // Duplicate headings: first occurrence wins. Later matches still
        // terminate the preceding span.
        if sections.iter().any(|s: &Section| s.name == boundary.name) {
            continue;
        }

        sections.push(Section {
            name: boundary.name.to_string(),
            start,
            end,
            text: span.to_string(),
        });
    }

    // A short untitled block before the first heading is usually the title.
    if let Some(first) = boundaries.first() {
        let head = text[..first.pos].trim();
        if (20..=300).contains(&head.len()) {
            sections.insert(
                0,
                Section {
                    name: "title".to_string(),
                    start: 0,
                    end: first.pos,
                    text: head.to_string(),
                },
            );
        }
    }

    sections
}

/// Metadata returned alongside extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceMetadata {
    pub total_chars: usize,
}

/// Source-document extraction boundary. Binary formats are handled by
/// external collaborators; the pipeline only assumes plain text with the
/// document's logical headings somewhere in the stream.
pub trait DocumentSource {
    fn extract(&self, path: &Path) -> Result<(String, SourceMetadata), RundownError>;
}

/// Reads a plain-text document from disk.
pub struct PlainTextSource;

impl DocumentSource for PlainTextSource {
    fn extract(&self, path: &Path) -> Result<(String, SourceMetadata), RundownError> {
        let raw = fs::read_to_string(path)?;
        let text = normalize_text(&raw);
        let metadata = SourceMetadata {
            total_chars: text.chars().count(),
        };
        Ok((text, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    fn filler(sentence: &str) -> String {
        format!("{} {} {}", sentence, sentence, sentence)
    }

    #[test]
    fn test_sections_ordered_and_non_overlapping() {
        let text = format!(
            "A Study of Widget Routing in Large Systems\n\nAbstract\n{}\n\nIntroduction\n{}\n\nConclusion\n{}\n",
            filler("We study widget routing and its failure modes in practice."),
            filler("Routing widgets at scale is a long-standing systems problem."),
            filler("Widget routing benefits from adaptive batching under load."),
        );
        let doc = Document::segment(&text, &config());

        let names: Vec<&str> = doc.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["title", "abstract", "introduction", "conclusion"]);

        for pair in doc.sections.windows(2) {
            assert!(pair[0].start <= pair[1].start, "sections out of order");
            assert!(pair[0].end <= pair[1].start, "sections overlap");
        }
    }

    #[test]
    fn test_short_span_rejected() {
        // A table-of-contents style entry: the heading matches but the span
        // until the next boundary is tiny.
        let text = format!(
            "Abstract\n1\n\nIntroduction\n{}\n",
            filler("This introduction carries enough content to be retained.")
        );
        let doc = Document::segment(&text, &config());
        assert!(doc.section("abstract").is_none());
        assert!(doc.section("introduction").is_some());
    }

    #[test]
    fn test_duplicate_heading_first_wins() {
        let first = filler("The first abstract block is the one that should be kept.");
        let text = format!(
            "Abstract\n{}\n\nAbstract\n{}\n",
            first,
            filler("A second abstract block appearing later in the stream.")
        );
        let doc = Document::segment(&text, &config());
        let kept: Vec<&Section> = doc
            .sections
            .iter()
            .filter(|s| s.name == "abstract")
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].text.starts_with("The first abstract"));
    }

    #[test]
    fn test_numbered_headings_detected() {
        let text = format!(
            "3. Results\n{}\n\nIV. Discussion\n{}\n",
            filler("The measured throughput improved by a factor of two."),
            filler("These results suggest the batching layer dominates cost.")
        );
        let doc = Document::segment(&text, &config());
        assert!(doc.section("results").is_some());
        assert!(doc.section("discussion").is_some());
    }

    #[test]
    fn test_no_headings_yields_no_sections() {
        let doc = Document::segment("Just one flat paragraph with no headings anywhere.", &config());
        assert!(!doc.has_sections());
    }

    #[test]
    fn test_fallback_slice() {
        let text = "x".repeat(5000);
        let doc = Document::fallback_slice(&text, 2000);
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].name, FALLBACK_SECTION);
        assert_eq!(doc.sections[0].text.len(), 2000);
    }

    #[test]
    fn test_normalize_text() {
        let raw = "Routing wid-\ngets is hard.\n\n\n\n42\n\nNext   line here.";
        let normalized = normalize_text(raw);
        assert!(normalized.contains("widgets is hard."));
        assert!(!normalized.contains("\n\n\n"));
        assert!(!normalized.contains("42"));
        assert!(normalized.contains("Next line here."));
    }

    #[test]
    fn test_document_round_trip() {
        let text = format!(
            "Abstract\n{}\n",
            filler("Round-tripping the segmented document must lose nothing.")
        );
        let doc = Document::segment(&text, &config());
        let json = serde_json::to_string(&doc).expect("serialize");
        let back: Document = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(doc, back);
    }
}
