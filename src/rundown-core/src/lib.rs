//! Research Rundown core library.
//!
//! Turns a source document into a multi-voice debate script and narrated
//! audio: segmentation, two-stage analysis through an external generation
//! service, quality gating, guaranteed-success dialogue synthesis, and
//! audio assembly.

pub mod audio;
pub mod config;
pub mod document;
pub mod error;
pub mod freeform;
pub mod generation;
pub mod orchestrator;
pub mod quality;
pub mod script;
pub mod stage1;
pub mod stage2;
pub mod synthesizer;

pub use audio::{AudioAssembler, AudioReport, AudioSegment, KokoroVoice, VoiceService};
pub use config::{Config, default_config};
pub use document::{Document, DocumentSource, PlainTextSource};
pub use error::RundownError;
pub use generation::{GenerationConfig, GenerationService, OpenAiGeneration};
pub use orchestrator::{PipelineConfig, PipelineEvent, PipelineOrchestrator, RunArtifacts};
pub use quality::{QualityReport, assess_quality};
pub use script::{DebateScript, GenerationMethod, QualityTier, Speaker, Turn};
pub use stage1::{CoreUnderstanding, CoreUnderstandingExtractor};
pub use stage2::{ComprehensiveEvidence, EvidenceHunter};
pub use synthesizer::{ComplexityAssessment, ComplexityTier, DialogueSynthesizer, assess_complexity};
