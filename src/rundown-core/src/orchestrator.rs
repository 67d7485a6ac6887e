//! Pipeline orchestration.
//!
//! Sequences segmentation, the two analysis stages, the quality gate,
//! complexity assessment, synthesis, and audio assembly for one document.
//! The orchestrator exclusively owns phase outputs and is the sole writer
//! of persisted state; every phase record is written as JSON through a
//! temp-file rename so an aborting caller never leaves a half-written
//! file. Concurrent runs into the same output directory are unsupported
//! (last writer wins).

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::audio::{AudioAssembler, AudioReport, VoiceService};
use crate::config::Config;
use crate::document::{Document, DocumentSource};
use crate::error::RundownError;
use crate::generation::GenerationService;
use crate::quality::{QualityReport, assess_quality};
use crate::script::DebateScript;
use crate::stage1::{CoreUnderstanding, CoreUnderstandingExtractor};
use crate::stage2::{ComprehensiveEvidence, EvidenceHunter};
use crate::synthesizer::{ComplexityAssessment, DialogueSynthesizer, assess_complexity};

/// Persisted phase state file names, in pipeline order.
pub const DOCUMENT_FILE: &str = "01_document.json";
pub const CORE_UNDERSTANDING_FILE: &str = "02_core_understanding.json";
pub const EVIDENCE_FILE: &str = "03_evidence.json";
pub const QUALITY_FILE: &str = "04_quality.json";
pub const COMPLEXITY_FILE: &str = "05_complexity.json";
pub const SCRIPT_FILE: &str = "06_script.json";

/// Run parameters for one document.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_topics: usize,
    pub exchanges_per_topic: usize,
    pub output_dir: PathBuf,
}

/// Events emitted while the pipeline runs.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A phase is starting.
    PhaseStart { phase: &'static str },
    /// A phase finished, with a short human-readable summary.
    PhaseComplete { phase: &'static str, summary: String },
    /// The whole pipeline finished.
    PipelineComplete { output_file: String },
}

/// Callback for pipeline events.
pub type PipelineCallback = Box<dyn Fn(PipelineEvent) + Send + Sync>;

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub document: Document,
    pub core: CoreUnderstanding,
    pub evidence: ComprehensiveEvidence,
    pub quality: QualityReport,
    pub assessment: ComplexityAssessment,
    pub script: DebateScript,
    pub audio: AudioReport,
}

/// Sequences the pipeline phases for one document at a time.
pub struct PipelineOrchestrator<'a> {
    source: &'a dyn DocumentSource,
    generation: &'a dyn GenerationService,
    voice: &'a mut dyn VoiceService,
    config: &'a Config,
    pipeline: PipelineConfig,
    callback: Option<PipelineCallback>,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(
        source: &'a dyn DocumentSource,
        generation: &'a dyn GenerationService,
        voice: &'a mut dyn VoiceService,
        config: &'a Config,
        pipeline: PipelineConfig,
    ) -> Self {
        Self {
            source,
            generation,
            voice,
            config,
            pipeline,
            callback: None,
        }
    }

    /// Set a callback for pipeline events.
    pub fn with_callback(mut self, callback: PipelineCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Run the full pipeline for one document. On a fatal phase failure
    /// the error carries the document and phase name, and whatever phase
    /// state was already persisted stays on disk for post-mortem.
    pub async fn run(&mut self, document_path: &Path) -> Result<RunArtifacts, RundownError> {
        let doc_name = document_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();

        fs::create_dir_all(&self.pipeline.output_dir)?;

        // Segmentation.
        self.emit(PipelineEvent::PhaseStart {
            phase: "segmentation",
        });
        let (raw_text, metadata) = self
            .source
            .extract(document_path)
            .map_err(|e| e.in_phase(&doc_name, "segmentation"))?;
        info!(chars = metadata.total_chars, document = %doc_name, "document extracted");

        let mut document = Document::segment(&raw_text, &self.config.analysis);
        if !document.has_sections() {
            document = Document::fallback_slice(&raw_text, self.config.analysis.fallback_slice_chars);
        }
        self.persist(DOCUMENT_FILE, &document)
            .map_err(|e| e.in_phase(&doc_name, "segmentation"))?;
        self.emit(PipelineEvent::PhaseComplete {
            phase: "segmentation",
            summary: format!("{} sections", document.sections.len()),
        });

        // Stage 1: core understanding.
        self.emit(PipelineEvent::PhaseStart {
            phase: "core-understanding",
        });
        let extractor = CoreUnderstandingExtractor::new(self.generation);
        let core = extractor
            .extract(&document)
            .await
            .map_err(|e| e.in_phase(&doc_name, "core-understanding"))?;
        self.persist(CORE_UNDERSTANDING_FILE, &core)
            .map_err(|e| e.in_phase(&doc_name, "core-understanding"))?;
        self.emit(PipelineEvent::PhaseComplete {
            phase: "core-understanding",
            summary: format!(
                "{}, {} seed points",
                core.field_classification,
                core.debate_seed_points.len()
            ),
        });

        // Stage 2: evidence hunting.
        self.emit(PipelineEvent::PhaseStart {
            phase: "evidence-hunting",
        });
        let hunter = EvidenceHunter::new(self.generation, &self.config.analysis);
        let evidence = hunter
            .hunt(&core, &document)
            .await
            .map_err(|e| e.in_phase(&doc_name, "evidence-hunting"))?;
        self.persist(EVIDENCE_FILE, &evidence)
            .map_err(|e| e.in_phase(&doc_name, "evidence-hunting"))?;
        self.emit(PipelineEvent::PhaseComplete {
            phase: "evidence-hunting",
            summary: format!(
                "{} mappings, {} gaps",
                evidence.evidence_mappings.len(),
                evidence.claim_evidence_gaps.len()
            ),
        });

        // Quality gate (advisory).
        self.emit(PipelineEvent::PhaseStart {
            phase: "quality-gate",
        });
        let quality = assess_quality(&core, &evidence);
        self.persist(QUALITY_FILE, &quality)
            .map_err(|e| e.in_phase(&doc_name, "quality-gate"))?;
        self.emit(PipelineEvent::PhaseComplete {
            phase: "quality-gate",
            summary: format!("score {}/20, ready: {}", quality.score, quality.ready),
        });

        // Complexity assessment.
        self.emit(PipelineEvent::PhaseStart {
            phase: "complexity-assessment",
        });
        let assessment = assess_complexity(&core, &evidence, &self.config.synthesis);
        self.persist(COMPLEXITY_FILE, &assessment)
            .map_err(|e| e.in_phase(&doc_name, "complexity-assessment"))?;
        self.emit(PipelineEvent::PhaseComplete {
            phase: "complexity-assessment",
            summary: format!("{:?} tier", assessment.tier),
        });

        // Synthesis. Failures are handled inside the synthesizer; only a
        // structural violation escapes, and that is a defect.
        self.emit(PipelineEvent::PhaseStart { phase: "synthesis" });
        let title = document
            .section("title")
            .map(|s| s.text.clone())
            .unwrap_or_else(|| doc_name.clone());
        let synthesizer = DialogueSynthesizer::new(
            self.generation,
            &self.config.personalities,
            &self.config.prompts,
            &self.config.synthesis,
        );
        let script = synthesizer
            .synthesize(
                &core,
                &evidence,
                &assessment,
                &title,
                self.pipeline.max_topics,
                self.pipeline.exchanges_per_topic,
            )
            .await
            .map_err(|e| e.in_phase(&doc_name, "synthesis"))?;
        self.persist(SCRIPT_FILE, &script)
            .map_err(|e| e.in_phase(&doc_name, "synthesis"))?;
        self.emit(PipelineEvent::PhaseComplete {
            phase: "synthesis",
            summary: format!(
                "{} turns via {}, sophistication {}",
                script.turns.len(),
                script.method,
                script.sophistication_score
            ),
        });

        // Audio assembly.
        self.emit(PipelineEvent::PhaseStart {
            phase: "audio-assembly",
        });
        let audio_dir = self.pipeline.output_dir.join("audio");
        let mut assembler = AudioAssembler::new(
            &mut *self.voice,
            &self.config.voices,
            &self.config.personalities,
            &audio_dir,
        );
        let audio = assembler
            .assemble(&script, &doc_name)
            .map_err(|e| e.in_phase(&doc_name, "audio-assembly"))?;
        self.persist(&format!("{}_metadata.json", doc_name), &audio)
            .map_err(|e| e.in_phase(&doc_name, "audio-assembly"))?;
        self.emit(PipelineEvent::PhaseComplete {
            phase: "audio-assembly",
            summary: format!(
                "{} segments, {:.1}s via {}",
                audio.num_segments, audio.total_duration, audio.method
            ),
        });

        self.emit(PipelineEvent::PipelineComplete {
            output_file: audio.output_file.clone(),
        });

        Ok(RunArtifacts {
            document,
            core,
            evidence,
            quality,
            assessment,
            script,
            audio,
        })
    }

    /// Persist one phase record as JSON. The write goes to a temp file
    /// first and is renamed into place, so an abort between phases leaves
    /// either the previous state or the new one, never a torn file.
    fn persist<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf, RundownError> {
        let path = self.pipeline.output_dir.join(file_name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::document::PlainTextSource;
    use crate::script::GenerationMethod;
    use crate::test_support::{CannedService, FailingService, SilentVoice};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const STAGE1_REPLY: &str = r#"
**1. RESEARCH STORY ARC:**
- Core Problem: Scaling community detection to billion-edge graphs
- Key Findings: 23% faster than the prior state of the art

**3. FIELD CLASSIFICATION:**
- Primary Domain: Computer Science - Graph Algorithms

**5. DEBATE SEED POINTS:**
- Is the 23% speedup attributable to the algorithm or the runtime?
- Does the benchmark suite represent real-world workloads fairly?
"#;

    const MAPPING_REPLY: &str = r#"
**SUPPORTING EVIDENCE:**
- Table 3 reports a 23% throughput improvement over the baseline

**CONTRADICTORY EVIDENCE:**

**EVIDENCE STRENGTH:**
- STRONG across all three datasets

**EVIDENCE LOCATION:**
- Results section, Table 3
"#;

    const TECHNICAL_REPLY: &str = r#"
**ALGORITHMS:**
- Connectivity modifier with work-stealing task pool

**PERFORMANCE METRICS:**
- 23% throughput improvement on billion-edge graphs
"#;

    const METHODOLOGY_REPLY: &str = r#"
**VALIDATION APPROACHES:**
- Five-fold cross-validation over partition seeds

**POTENTIAL BIASES:**
- Benchmark selection favors static well-partitioned graphs
"#;

    const EXCHANGE_REPLY: &str = "The evidence in Table 3 is hard to dismiss: a 23% gain \
                                  held across all three benchmark datasets we examined.";

    fn write_document(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("paper.txt");
        let text = format!(
            "Abstract\n{}\n\nConclusion\n{}\n",
            "We present a parallel community detection algorithm for graphs. ".repeat(3),
            "The approach scales to billion-edge graphs in our evaluation. ".repeat(3),
        );
        std::fs::write(&path, text).expect("write document");
        path
    }

    fn pipeline_config(dir: &TempDir) -> PipelineConfig {
        PipelineConfig {
            max_topics: 2,
            exchanges_per_topic: 2,
            output_dir: dir.path().join("out"),
        }
    }

    #[tokio::test]
    async fn test_full_run_persists_every_phase() {
        let dir = TempDir::new().expect("tempdir");
        let document_path = write_document(&dir);
        let config = default_config();

        // Queue order: stage 1, one mapping per seed point, technical,
        // methodology, then four sophisticated exchanges.
        let replies = vec![
            STAGE1_REPLY.to_string(),
            MAPPING_REPLY.to_string(),
            MAPPING_REPLY.to_string(),
            TECHNICAL_REPLY.to_string(),
            METHODOLOGY_REPLY.to_string(),
            EXCHANGE_REPLY.to_string(),
            EXCHANGE_REPLY.to_string(),
            EXCHANGE_REPLY.to_string(),
            EXCHANGE_REPLY.to_string(),
        ];
        let generation = CannedService::new(replies);
        let mut voice = SilentVoice::new(1.0);
        let source = PlainTextSource;

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_sink = Arc::clone(&events);

        let pipeline = pipeline_config(&dir);
        let output_dir = pipeline.output_dir.clone();
        let mut orchestrator =
            PipelineOrchestrator::new(&source, &generation, &mut voice, &config, pipeline)
                .with_callback(Box::new(move |event| {
                    events_sink.lock().unwrap().push(format!("{:?}", event));
                }));

        let artifacts = orchestrator.run(&document_path).await.expect("runs");

        // Scenario from the design: two seed points, 2x2 exchanges gives
        // intro + 4 exchanges + outro.
        assert_eq!(artifacts.script.turns.len(), 6);
        assert_eq!(artifacts.script.method, GenerationMethod::Sophisticated);
        assert_eq!(artifacts.audio.num_segments, 6);
        let sum: f64 = artifacts.audio.segments.iter().map(|s| s.duration).sum();
        assert!((artifacts.audio.total_duration - sum).abs() < 1e-9);

        for file in [
            DOCUMENT_FILE,
            CORE_UNDERSTANDING_FILE,
            EVIDENCE_FILE,
            QUALITY_FILE,
            COMPLEXITY_FILE,
            SCRIPT_FILE,
            "paper_metadata.json",
        ] {
            assert!(output_dir.join(file).exists(), "missing {}", file);
        }

        // No torn temp files remain.
        let leftovers: Vec<_> = std::fs::read_dir(&output_dir)
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());

        assert!(!events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persisted_phase_state_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let document_path = write_document(&dir);
        let config = default_config();

        let generation = CannedService::new(vec![
            STAGE1_REPLY.to_string(),
            MAPPING_REPLY.to_string(),
            MAPPING_REPLY.to_string(),
            TECHNICAL_REPLY.to_string(),
            METHODOLOGY_REPLY.to_string(),
            EXCHANGE_REPLY.to_string(),
        ]);
        let mut voice = SilentVoice::new(0.5);
        let source = PlainTextSource;

        let pipeline = pipeline_config(&dir);
        let output_dir = pipeline.output_dir.clone();
        let mut orchestrator =
            PipelineOrchestrator::new(&source, &generation, &mut voice, &config, pipeline);

        let artifacts = orchestrator.run(&document_path).await.expect("runs");

        let core_json =
            std::fs::read_to_string(output_dir.join(CORE_UNDERSTANDING_FILE)).expect("read");
        let core: crate::stage1::CoreUnderstanding =
            serde_json::from_str(&core_json).expect("deserialize");
        assert_eq!(core, artifacts.core);

        let evidence_json = std::fs::read_to_string(output_dir.join(EVIDENCE_FILE)).expect("read");
        let evidence: crate::stage2::ComprehensiveEvidence =
            serde_json::from_str(&evidence_json).expect("deserialize");
        assert_eq!(evidence, artifacts.evidence);

        let quality_json = std::fs::read_to_string(output_dir.join(QUALITY_FILE)).expect("read");
        let quality: QualityReport = serde_json::from_str(&quality_json).expect("deserialize");
        assert_eq!(quality, artifacts.quality);

        let complexity_json =
            std::fs::read_to_string(output_dir.join(COMPLEXITY_FILE)).expect("read");
        let assessment: ComplexityAssessment =
            serde_json::from_str(&complexity_json).expect("deserialize");
        assert_eq!(assessment, artifacts.assessment);

        let script_json = std::fs::read_to_string(output_dir.join(SCRIPT_FILE)).expect("read");
        let script: DebateScript = serde_json::from_str(&script_json).expect("deserialize");
        assert_eq!(script, artifacts.script);
    }

    #[tokio::test]
    async fn test_stage1_failure_aborts_with_phase_context() {
        let dir = TempDir::new().expect("tempdir");
        let document_path = write_document(&dir);
        let config = default_config();

        let generation = FailingService;
        let mut voice = SilentVoice::new(0.5);
        let source = PlainTextSource;

        let pipeline = pipeline_config(&dir);
        let output_dir = pipeline.output_dir.clone();
        let mut orchestrator =
            PipelineOrchestrator::new(&source, &generation, &mut voice, &config, pipeline);

        let result = orchestrator.run(&document_path).await;
        match result {
            Err(RundownError::Phase {
                document, phase, ..
            }) => {
                assert_eq!(document, "paper");
                assert_eq!(phase, "core-understanding");
            }
            other => panic!("expected phase error, got {:?}", other.map(|_| ())),
        }

        // Partial state from the completed phase stays for post-mortem.
        assert!(output_dir.join(DOCUMENT_FILE).exists());
        assert!(!output_dir.join(CORE_UNDERSTANDING_FILE).exists());
    }
}
