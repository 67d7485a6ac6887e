//! Speech synthesis and audio assembly.
//!
//! Each script turn becomes one synthesized segment; segments are combined
//! into a single artifact by the first viable strategy from a fixed ordered
//! list. Every strategy is idempotent and cleans up any manifest it writes.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use kokoro_tiny::TtsEngine;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use crate::config::{PersonalitiesConfig, VoicesConfig};
use crate::error::RundownError;
use crate::script::{DebateScript, Speaker, TurnKind};

/// Words-per-minute rate for the duration estimate used when probing the
/// produced media fails.
const FALLBACK_WPM: f64 = 150.0;

/// One synthesized speech segment, consumed by the combiner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioSegment {
    pub speaker: Speaker,
    pub text: String,
    pub path: PathBuf,
    /// Seconds; never negative.
    pub duration: f64,
    pub segment_type: TurnKind,
}

/// Voice synthesis boundary. The production implementation wraps the
/// kokoro engine; tests substitute a silent writer.
pub trait VoiceService {
    /// Synthesize speech for `text` into a WAV file at `out_path`.
    fn synthesize(&mut self, text: &str, voice_id: &str, out_path: &Path)
    -> Result<(), RundownError>;
}

/// Voice service backed by the kokoro-tiny engine.
pub struct KokoroVoice {
    engine: TtsEngine,
    available_voices: Vec<String>,
}

impl KokoroVoice {
    /// Initialize the TTS engine (downloads the model on first run).
    pub async fn new() -> Result<Self, RundownError> {
        let engine = TtsEngine::new().await.map_err(|e| {
            RundownError::MissingPrerequisite(format!("Failed to initialize TTS: {}", e))
        })?;
        let available_voices = engine.voices();
        Ok(Self {
            engine,
            available_voices,
        })
    }

    pub fn available_voices(&self) -> &[String] {
        &self.available_voices
    }

    fn validate_voice(&self, voice_id: &str) -> Result<(), RundownError> {
        if voice_id.is_empty() || !self.available_voices.contains(&voice_id.to_string()) {
            return Err(RundownError::AudioError(format!(
                "Unknown voice '{}'",
                voice_id
            )));
        }
        Ok(())
    }
}

impl VoiceService for KokoroVoice {
    fn synthesize(
        &mut self,
        text: &str,
        voice_id: &str,
        out_path: &Path,
    ) -> Result<(), RundownError> {
        self.validate_voice(voice_id)?;

        // Kokoro has a strict limit on text length per call.
        let chunks = split_into_chunks(text, 200);
        let mut all_samples = Vec::new();

        for chunk in chunks {
            if chunk.trim().is_empty() {
                continue;
            }
            let samples = self
                .engine
                .synthesize(&chunk, Some(voice_id))
                .map_err(|e| RundownError::AudioError(format!("Synthesis failed: {}", e)))?;
            all_samples.extend(samples);
            // Pause between chunks (0.3s at 24kHz) to prevent cutoff.
            all_samples.extend(vec![0.0; 7200]);
        }
        // Trailing padding (0.5s) to prevent final cutoff.
        all_samples.extend(vec![0.0; 12000]);

        let path_str = out_path.to_str().ok_or_else(|| {
            RundownError::AudioError(format!("non-UTF8 output path: {}", out_path.display()))
        })?;
        self.engine
            .save_wav(path_str, &all_samples)
            .map_err(|e| RundownError::AudioError(format!("Failed to save WAV: {}", e)))
    }
}

/// Split text into chunks that are safe for synthesis, breaking at
/// sentence boundaries and falling back to commas for run-on sentences.
fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current_chunk = String::new();

    for sentence in text.split_inclusive(&['.', '!', '?', ';'][..]) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if current_chunk.len() + sentence.len() > max_chars {
            if !current_chunk.is_empty() {
                chunks.push(current_chunk.trim().to_string());
                current_chunk = String::new();
            }

            if sentence.len() > max_chars {
                for part in sentence.split_inclusive(',') {
                    if current_chunk.len() + part.len() > max_chars && !current_chunk.is_empty() {
                        chunks.push(current_chunk.trim().to_string());
                        current_chunk = String::new();
                    }
                    current_chunk.push_str(part);
                    current_chunk.push(' ');
                }
            } else {
                current_chunk.push_str(sentence);
                current_chunk.push(' ');
            }
        } else {
            current_chunk.push_str(sentence);
            current_chunk.push(' ');
        }
    }

    if !current_chunk.trim().is_empty() {
        chunks.push(current_chunk.trim().to_string());
    }

    chunks
}

/// Exact duration of a WAV file from its header.
pub fn probe_wav_duration(path: &Path) -> Result<f64, RundownError> {
    let reader = WavReader::open(path)
        .map_err(|e| RundownError::AudioError(format!("probe failed: {}", e)))?;
    let spec = reader.spec();
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Words-per-minute duration estimate, for when probing fails.
pub fn estimate_duration(text: &str) -> f64 {
    let words = text.split_whitespace().count() as f64;
    words / FALLBACK_WPM * 60.0
}

/// Voice id for a canonical speaker.
pub fn voice_for(speaker: Speaker, voices: &VoicesConfig) -> &str {
    match speaker {
        Speaker::Optimist => &voices.optimist_voice,
        Speaker::Skeptic => &voices.skeptic_voice,
        Speaker::Narrator => &voices.narrator_voice,
    }
}

/// One way of combining segments into a single artifact. Implementations
/// share one success/failure contract and are tried in a fixed order.
pub trait CombineStrategy {
    fn name(&self) -> &'static str;
    fn combine(&self, segments: &[AudioSegment], output: &Path) -> Result<(), RundownError>;
}

/// Lossless concatenation through the external media tool, driven by a
/// generated file manifest. The manifest is removed whether or not the
/// tool succeeds.
pub struct ManifestConcat;

impl CombineStrategy for ManifestConcat {
    fn name(&self) -> &'static str {
        "manifest_concat"
    }

    fn combine(&self, segments: &[AudioSegment], output: &Path) -> Result<(), RundownError> {
        let manifest = output.with_extension("ffconcat");
        let mut listing = String::new();
        for segment in segments {
            listing.push_str(&format!("file '{}'\n", segment.path.display()));
        }
        fs::write(&manifest, listing)?;

        let result = Command::new("ffmpeg")
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(&manifest)
            .args(["-c", "copy", "-y"])
            .arg(output)
            .output();

        // The manifest is temporary regardless of outcome.
        let _ = fs::remove_file(&manifest);

        match result {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(RundownError::AudioError(format!(
                "ffmpeg concat failed: {}",
                String::from_utf8_lossy(&out.stderr)
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                RundownError::MissingPrerequisite("ffmpeg not found on PATH".to_string()),
            ),
            Err(e) => Err(RundownError::AudioError(format!("ffmpeg error: {}", e))),
        }
    }
}

/// Sample-level combiner for inconsistent inputs: decode every segment,
/// resample to a common rate, and write one mono 16-bit artifact.
pub struct NormalizeConcat;

impl CombineStrategy for NormalizeConcat {
    fn name(&self) -> &'static str {
        "normalize_concat"
    }

    fn combine(&self, segments: &[AudioSegment], output: &Path) -> Result<(), RundownError> {
        let first = segments.first().ok_or_else(|| {
            RundownError::AudioError("no segments to combine".to_string())
        })?;
        let target_rate = WavReader::open(&first.path)
            .map_err(|e| RundownError::AudioError(format!("read failed: {}", e)))?
            .spec()
            .sample_rate;

        let mut combined: Vec<f32> = Vec::new();
        for segment in segments {
            let samples = decode_mono(&segment.path)?;
            combined.extend(resample(&samples.1, samples.0, target_rate));
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: target_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(output, spec)
            .map_err(|e| RundownError::AudioError(format!("write failed: {}", e)))?;
        for sample in combined {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| RundownError::AudioError(format!("write failed: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| RundownError::AudioError(format!("write failed: {}", e)))
    }
}

/// Decode a WAV file to mono f32 samples. Returns (sample_rate, samples).
fn decode_mono(path: &Path) -> Result<(u32, Vec<f32>), RundownError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| RundownError::AudioError(format!("read failed: {}", e)))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| RundownError::AudioError(format!("decode failed: {}", e)))?,
        SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<Result<_, _>>()
            .map_err(|e| RundownError::AudioError(format!("decode failed: {}", e)))?,
    };

    let channels = spec.channels.max(1) as usize;
    if channels == 1 {
        return Ok((spec.sample_rate, interleaved));
    }
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((spec.sample_rate, mono))
}

/// Linear-interpolation resample.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f32 / to_rate as f32;
    let new_len = (samples.len() as f32 / ratio) as usize;
    let mut result = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_pos = i as f32 * ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f32;

        if src_idx + 1 < samples.len() {
            result.push(samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac);
        } else if src_idx < samples.len() {
            result.push(samples[src_idx]);
        }
    }

    result
}

/// Degenerate fallback guaranteeing some output: a copy of the first
/// segment.
pub struct CopyFirst;

impl CombineStrategy for CopyFirst {
    fn name(&self) -> &'static str {
        "copy_first"
    }

    fn combine(&self, segments: &[AudioSegment], output: &Path) -> Result<(), RundownError> {
        let first = segments.first().ok_or_else(|| {
            RundownError::AudioError("no segments to combine".to_string())
        })?;
        fs::copy(&first.path, output)?;
        Ok(())
    }
}

/// The fixed strategy order.
pub fn default_strategies() -> Vec<Box<dyn CombineStrategy>> {
    vec![
        Box::new(ManifestConcat),
        Box::new(NormalizeConcat),
        Box::new(CopyFirst),
    ]
}

/// Try each strategy in order; return the name of the one that succeeded.
pub fn combine_segments(
    segments: &[AudioSegment],
    output: &Path,
    strategies: &[Box<dyn CombineStrategy>],
) -> Result<&'static str, RundownError> {
    if segments.is_empty() {
        return Err(RundownError::AudioError(
            "no segments to combine".to_string(),
        ));
    }

    let mut last_error = None;
    for strategy in strategies {
        match strategy.combine(segments, output) {
            Ok(()) => {
                debug!(method = strategy.name(), "audio combination succeeded");
                return Ok(strategy.name());
            }
            Err(e) => {
                warn!(method = strategy.name(), error = %e, "combination strategy failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        RundownError::AudioError("all combination strategies failed".to_string())
    }))
}

/// Per-segment entry in the compositing-tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentInfo {
    pub speaker: String,
    pub duration: f64,
    #[serde(rename = "type")]
    pub segment_type: TurnKind,
}

/// Result metadata for the combined artifact. Serialized as the interface
/// consumed by the downstream compositing tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioReport {
    pub output_file: String,
    pub method: String,
    pub total_duration: f64,
    pub num_segments: usize,
    pub segments: Vec<SegmentInfo>,
}

/// Turns script turns into timed speech segments and combines them.
pub struct AudioAssembler<'a> {
    voice: &'a mut dyn VoiceService,
    voices: &'a VoicesConfig,
    personalities: &'a PersonalitiesConfig,
    output_dir: PathBuf,
}

impl<'a> AudioAssembler<'a> {
    pub fn new(
        voice: &'a mut dyn VoiceService,
        voices: &'a VoicesConfig,
        personalities: &'a PersonalitiesConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            voice,
            voices,
            personalities,
            output_dir: output_dir.into(),
        }
    }

    /// Synthesize every turn and combine the segments into one artifact.
    pub fn assemble(
        &mut self,
        script: &DebateScript,
        base_name: &str,
    ) -> Result<AudioReport, RundownError> {
        fs::create_dir_all(&self.output_dir)?;

        let total = script.turns.len();
        let mut segments = Vec::with_capacity(total);

        for turn in &script.turns {
            let kind = turn.kind(total);
            let text = clean_spoken_text(&turn.content, self.personalities);
            let voice_id = voice_for(turn.speaker, self.voices).to_string();

            let file_name = format!(
                "{:02}_{}_{:?}.wav",
                turn.index,
                speaker_slug(turn.speaker, self.personalities),
                kind
            )
            .to_lowercase();
            let path = self.output_dir.join(file_name);

            self.voice.synthesize(&text, &voice_id, &path)?;

            let duration = match probe_wav_duration(&path) {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "probe failed, estimating duration from word count");
                    estimate_duration(&text)
                }
            };

            segments.push(AudioSegment {
                speaker: turn.speaker,
                text,
                path,
                duration,
                segment_type: kind,
            });
        }

        let output = self.output_dir.join(format!("{}_rundown.wav", base_name));
        let strategies = default_strategies();
        let method = combine_segments(&segments, &output, &strategies)?;

        Ok(AudioReport {
            output_file: output.display().to_string(),
            method: method.to_string(),
            total_duration: segments.iter().map(|s| s.duration).sum(),
            num_segments: segments.len(),
            segments: segments
                .iter()
                .map(|s| SegmentInfo {
                    speaker: s.speaker.display_name(self.personalities),
                    duration: s.duration,
                    segment_type: s.segment_type,
                })
                .collect(),
        })
    }
}

fn speaker_slug(speaker: Speaker, personalities: &PersonalitiesConfig) -> String {
    speaker
        .display_name(personalities)
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c == ' ' {
                Some('_')
            } else {
                None
            }
        })
        .collect()
}

/// Fix stale name forms and leftover markup in spoken content before it
/// reaches the voice service.
pub fn clean_spoken_text(text: &str, personalities: &PersonalitiesConfig) -> String {
    let mut cleaned = text.to_string();

    // Legacy name forms for the same debaters.
    for old in ["Dr. Sarah Chen", "Dr. Chen", "Sarah Chen", "Sarah"] {
        cleaned = cleaned.replace(old, &personalities.optimist.name);
    }
    for old in ["Professor Marcus Webb", "Dr. Marcus Webb"] {
        cleaned = cleaned.replace(old, &personalities.skeptic.name);
    }

    cleaned = cleaned.replace('*', "").replace('#', "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut cleaned = cleaned.trim().to_string();
    if !cleaned.is_empty() && !cleaned.ends_with(['.', '!', '?']) {
        cleaned.push('.');
    }
    cleaned
}
