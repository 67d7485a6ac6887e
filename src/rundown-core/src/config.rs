//! Configuration module for loading TOML config files.
//!
//! Everything the pipeline components need (voices, debater personas,
//! analysis thresholds) is constructed here once and passed in explicitly.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::RundownError;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub voices: VoicesConfig,
    #[serde(default)]
    pub personalities: PersonalitiesConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

/// Thresholds for segmentation and the two analysis stages.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum characters a detected section must contain to be kept.
    /// Rejects spurious matches such as a table-of-contents entry.
    pub min_section_chars: usize,
    /// Size of the positional slice taken from the document start when no
    /// headings are found at all.
    pub fallback_slice_chars: usize,
    /// Minimum shared lexical tokens for an evidence fragment to stay
    /// attached to a claim during the tie-break pass.
    pub min_claim_overlap: usize,
    /// Budget for the evidence context assembled into Stage 2 prompts.
    pub evidence_context_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_section_chars: 50,
            fallback_slice_chars: 2000,
            min_claim_overlap: 2,
            evidence_context_chars: 4000,
        }
    }
}

/// Thresholds for complexity assessment and script synthesis.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// Evidence mappings beyond this count push the document toward the
    /// complex tier.
    pub max_evidence_mappings: usize,
    /// Technical elements beyond this count push the document toward the
    /// complex tier.
    pub max_technical_elements: usize,
    /// Estimated evidence-context size beyond this pushes the document
    /// toward the complex tier.
    pub max_context_chars: usize,
    /// Whether simplified generation may ask the service to polish its
    /// template text. Polish failures never propagate.
    pub polish_simplified: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_evidence_mappings: 8,
            max_technical_elements: 15,
            max_context_chars: 3000,
            polish_simplified: true,
        }
    }
}

/// Voice configuration for speech synthesis.
#[derive(Debug, Clone, Deserialize)]
pub struct VoicesConfig {
    pub optimist_voice: String,
    pub skeptic_voice: String,
    pub narrator_voice: String,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            optimist_voice: "bf_emma".to_string(),
            skeptic_voice: "bm_george".to_string(),
            narrator_voice: "af_sky".to_string(),
        }
    }
}

/// One debater persona.
#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    pub name: String,
    pub role: String,
    /// Short style description woven into generation prompts.
    pub style: String,
}

/// The fixed two-debater roster.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonalitiesConfig {
    pub optimist: Persona,
    pub skeptic: Persona,
}

impl Default for PersonalitiesConfig {
    fn default() -> Self {
        Self {
            optimist: Persona {
                name: "Dr. Ava D.".to_string(),
                role: "The Innovation Advocate".to_string(),
                style: "enthusiastic, application-focused, sees potential".to_string(),
            },
            skeptic: Persona {
                name: "Prof. Marcus Webb".to_string(),
                role: "The Critical Methodologist".to_string(),
                style: "rigorous, methodology-focused, demands proof".to_string(),
            },
        }
    }
}

/// Prompt templates for script synthesis. `{placeholder}` markers are
/// substituted at render time.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptsConfig {
    pub exchange_template: String,
    pub polish_template: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            exchange_template: DEFAULT_EXCHANGE_TEMPLATE.to_string(),
            polish_template: DEFAULT_POLISH_TEMPLATE.to_string(),
        }
    }
}

impl PromptsConfig {
    /// Render the exchange template for one debater turn.
    pub fn exchange_prompt(
        &self,
        persona: &Persona,
        field: &str,
        topic: &str,
        evidence_block: &str,
        stance: &str,
        previous: Option<&str>,
    ) -> String {
        let previous_block = previous
            .map(|p| format!("\nPREVIOUS STATEMENT: {}\n", p))
            .unwrap_or_default();

        self.exchange_template
            .replace("{name}", &persona.name)
            .replace("{role}", &persona.role)
            .replace("{style}", &persona.style)
            .replace("{field}", field)
            .replace("{topic}", topic)
            .replace("{evidence}", evidence_block)
            .replace("{previous}", &previous_block)
            .replace("{stance}", stance)
    }

    /// Render the polish template for one drafted line.
    pub fn polish_prompt(&self, line: &str) -> String {
        self.polish_template.replace("{line}", line)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RundownError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| RundownError::ConfigError(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| RundownError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, RundownError> {
        toml::from_str(content)
            .map_err(|e| RundownError::ConfigError(format!("Failed to parse config: {}", e)))
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config {
        analysis: AnalysisConfig::default(),
        synthesis: SynthesisConfig::default(),
        voices: VoicesConfig::default(),
        personalities: PersonalitiesConfig::default(),
        prompts: PromptsConfig::default(),
    }
}

const DEFAULT_EXCHANGE_TEMPLATE: &str = r#"You are {name}, {role}, an expert {field} researcher in a spoken debate about a research paper. Your style: {style}.

DEBATE TOPIC: {topic}

EVIDENCE AVAILABLE TO YOU:
{evidence}
{previous}
Give {stance} (2-3 sentences). Cite the specific evidence where it helps. Output ONLY your spoken words - no stage directions, no markdown, no name prefix.

{name}:"#;

const DEFAULT_POLISH_TEMPLATE: &str = r#"Rewrite the following spoken line so it sounds natural in a recorded discussion. Keep the meaning and length, output only the rewritten line.

{line}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roster() {
        let config = default_config();
        assert_eq!(config.personalities.optimist.name, "Dr. Ava D.");
        assert_eq!(config.personalities.skeptic.name, "Prof. Marcus Webb");
        assert_eq!(config.voices.narrator_voice, "af_sky");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_str(
            r#"
[analysis]
min_section_chars = 80
fallback_slice_chars = 1500
min_claim_overlap = 3
evidence_context_chars = 2500
"#,
        )
        .expect("valid toml");

        assert_eq!(config.analysis.min_section_chars, 80);
        assert_eq!(config.analysis.min_claim_overlap, 3);
        // Untouched tables fall back to defaults.
        assert_eq!(config.synthesis.max_evidence_mappings, 8);
        assert_eq!(config.voices.optimist_voice, "bf_emma");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = Config::from_str("not = [valid");
        assert!(matches!(result, Err(RundownError::ConfigError(_))));
    }

    #[test]
    fn test_exchange_prompt_substitutes_placeholders() {
        let config = default_config();
        let prompt = config.prompts.exchange_prompt(
            &config.personalities.skeptic,
            "Machine Learning",
            "Is the benchmark fair?",
            "- Against: accuracy regressed on two datasets",
            "a brief critical response",
            Some("The gains look solid to me."),
        );

        assert!(prompt.contains("Prof. Marcus Webb"));
        assert!(prompt.contains("DEBATE TOPIC: Is the benchmark fair?"));
        assert!(prompt.contains("PREVIOUS STATEMENT: The gains look solid to me."));
        assert!(!prompt.contains("{name}"));
        assert!(!prompt.contains("{previous}"));

        let polish = config.prompts.polish_prompt("A drafted line.");
        assert!(polish.ends_with("A drafted line."));
    }
}
