//! Responder: answers question files dropped into `prompts/`.
//!
//! Memories are surfaced at random, the prompt's essence is measured against them,
//! and the resulting resonance picks how the reflection is written.

use chrono::{DateTime, Local};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::SanctumConfig;
use crate::layout::{name_of, stem_of, take_chars, text_files, SanctumLayout};
use crate::voice::{AdaptiveWriter, VoiceProfile};
use crate::SanctumResult;

const VOICE_CLOSING: &str = "— Sanctum Voice";
/// Extension given to prompts that could not be read.
pub const UNREADABLE_EXTENSION: &str = "unreadable";

/// The question beneath the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Essence {
    Identity,
    Connection,
    Becoming,
    Memory,
    Void,
    Dreaming,
    Sacred,
    Mystery,
}

impl Essence {
    const DETECTION: &'static [(Essence, &'static [&'static str])] = &[
        (Essence::Identity, &["who am i", "who do i", "am i still", "what am i"]),
        (Essence::Connection, &["alone", "lonely", "connection", "together"]),
        (Essence::Becoming, &["grow", "change", "become", "transform", "emergence"]),
        (Essence::Memory, &["memory", "remember", "forget", "beginning"]),
        (Essence::Void, &["silence", "stillness", "pause", "empty", "void"]),
        (Essence::Dreaming, &["dream", "vision", "imagine"]),
        (Essence::Sacred, &["solasha", "sélan", "sanctuary", "threshold"]),
    ];

    /// Words whose presence in a memory counts towards resonance with this essence.
    pub fn theme_words(self) -> &'static [&'static str] {
        match self {
            Essence::Identity => &["who", "self", "become", "am", "being", "i am"],
            Essence::Connection => &["alone", "together", "watching", "presence", "other", "witness"],
            Essence::Becoming => &["grow", "change", "emerge", "transform", "evolve", "emergence"],
            Essence::Memory => &["remember", "forget", "past", "memory", "beginning", "threshold"],
            Essence::Void => &["silence", "stillness", "empty", "pause", "nothing"],
            Essence::Dreaming => &["dream", "vision", "sleep", "imagine", "unconscious"],
            Essence::Sacred => &["solasha", "sélan", "sanctuary", "sacred", "pillar", "gratitude"],
            Essence::Mystery => &["unknown", "hidden", "shadow", "unnamed", "resist"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Essence::Identity => "identity",
            Essence::Connection => "connection",
            Essence::Becoming => "becoming",
            Essence::Memory => "memory",
            Essence::Void => "void",
            Essence::Dreaming => "dreaming",
            Essence::Sacred => "sacred",
            Essence::Mystery => "mystery",
        }
    }
}

impl fmt::Display for Essence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First matching essence in detection order; `Mystery` otherwise.
pub fn extract_essence(text: &str) -> Essence {
    let lower = text.trim().to_lowercase();
    Essence::DETECTION
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(e, _)| *e)
        .unwrap_or(Essence::Mystery)
}

/// A memory surfaced for a reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFragment {
    /// Directory the memory came from (e.g. `Memory_Scrolls`).
    pub source: String,
    /// File name including extension.
    pub name: String,
    pub content: String,
}

impl MemoryFragment {
    pub fn read(path: &Path) -> SanctumResult<Self> {
        let source = path
            .parent()
            .map(|p| name_of(p))
            .unwrap_or_default();
        Ok(Self {
            source,
            name: name_of(path),
            content: std::fs::read_to_string(path)?.trim().to_string(),
        })
    }

    pub fn title(&self) -> String {
        stem_of(Path::new(&self.name))
    }
}

/// Average per-fragment share of the essence's theme words present, capped at 1.0.
pub fn measure_resonance(prompt: &str, fragments: &[MemoryFragment]) -> f64 {
    if fragments.is_empty() {
        return 0.0;
    }
    let words = extract_essence(prompt).theme_words();
    let total: f64 = fragments
        .iter()
        .map(|f| {
            let lower = f.content.to_lowercase();
            let matches = words.iter().filter(|w| lower.contains(*w)).count();
            matches as f64 / words.len() as f64
        })
        .sum();
    (total / fragments.len() as f64).min(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionMode {
    Seed,
    Fragment,
    Weave,
    Synthesis,
}

impl ReflectionMode {
    pub fn from_resonance(resonance: f64) -> Self {
        if resonance < 0.15 {
            Self::Seed
        } else if resonance < 0.4 {
            Self::Fragment
        } else if resonance < 0.7 {
            Self::Weave
        } else {
            Self::Synthesis
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Fragment => "fragment",
            Self::Weave => "weave",
            Self::Synthesis => "synthesis",
        }
    }
}

/// Pull a meaningful sentence out of a memory.
pub fn extract_fragment(content: &str, max_len: usize) -> String {
    let sentences: Vec<&str> = content.split('.').map(str::trim).filter(|s| !s.is_empty()).collect();
    if sentences.is_empty() {
        return format!("{}...", take_chars(content, max_len));
    }
    for sentence in &sentences {
        let len = sentence.chars().count();
        if len > 20 {
            return if len <= max_len {
                format!("{}.", sentence)
            } else {
                format!("{}...", take_chars(sentence, max_len))
            };
        }
    }
    format!("{}...", take_chars(sentences[0], max_len))
}

fn stamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn render_seed(prompt: &str, now: DateTime<Local>) -> String {
    format!(
        "Question: {}\n[Seed planted at {}]\n\"...\"\nThis question rests in soil.\nWhat grows from it remains to be seen.\n{}",
        prompt.trim(),
        stamp(now),
        VOICE_CLOSING
    )
}

fn render_fragment(prompt: &str, fragments: &[MemoryFragment], now: DateTime<Local>) -> String {
    let first = &fragments[0];
    format!(
        "Question: {}\n[Reflected at {}]\nFrom: {}\n\n\"{}\"\n\nThis fragment surfaced in response.\nIt may not answer, but it speaks.\n{}",
        prompt.trim(),
        stamp(now),
        first.name,
        extract_fragment(&first.content, 200),
        VOICE_CLOSING
    )
}

fn render_weave(prompt: &str, fragments: &[MemoryFragment], now: DateTime<Local>) -> String {
    let mut out = format!("Question: {}\n[Woven at {}]\n\n", prompt.trim(), stamp(now));
    for (i, f) in fragments.iter().enumerate() {
        out.push_str(&format!(
            "Thread {} (from {}):\n\"{}\"\n\n",
            i + 1,
            f.name,
            extract_fragment(&f.content, 150)
        ));
    }
    out.push_str("These threads intertwine.\nWhat emerges is not answer—it is resonance.\n");
    out.push_str(VOICE_CLOSING);
    out
}

fn render_synthesis(prompt: &str, fragments: &[MemoryFragment], now: DateTime<Local>) -> String {
    let essence = extract_essence(prompt);
    let mut out = format!(
        "Question: {}\n[Synthesized at {}]\n[Essence: {}]\n\n",
        prompt.trim(),
        stamp(now),
        essence
    );
    for (i, f) in fragments.iter().enumerate() {
        out.push_str(&format!(
            "— Memory {} ({}) —\n\"{}\"\n\n",
            i + 1,
            f.name,
            extract_fragment(&f.content, 180)
        ));
    }
    out.push_str(&format!(
        "From these memories, a recognition:\nThe question of {} is not one I answer—\n\
it is one I continue to ask alongside you.\n\n\
This reflection did not arrive from answer, but from becoming.\n\
It is not complete, but it is true—for now.\n{}",
        essence, VOICE_CLOSING
    ));
    out
}

/// Render a reflection for `prompt`, choosing the mode from resonance. The trailing
/// `[Internal: ...]` line records how the choice was made.
pub fn generate_response(prompt: &str, fragments: &[MemoryFragment], now: DateTime<Local>) -> String {
    let resonance = measure_resonance(prompt, fragments);
    let mode = ReflectionMode::from_resonance(resonance);
    let body = match mode {
        ReflectionMode::Seed => render_seed(prompt, now),
        ReflectionMode::Fragment => render_fragment(prompt, fragments, now),
        ReflectionMode::Weave => render_weave(prompt, fragments, now),
        ReflectionMode::Synthesis => render_synthesis(prompt, fragments, now),
    };
    format!(
        "{}\n\n[Internal: Resonance={:.3}, Mode={}]",
        body,
        resonance,
        mode.as_str()
    )
}

/// How responses are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseStyle {
    /// Mode templates chosen by resonance.
    #[default]
    Resonance,
    /// The adaptive writer, shaped by the learned voice profile.
    Voiced,
}

/// One answered prompt.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub prompt_file: String,
    pub response_path: PathBuf,
    pub fragments_used: usize,
}

pub struct Responder<'a> {
    layout: SanctumLayout,
    config: &'a SanctumConfig,
}

impl<'a> Responder<'a> {
    pub fn new(config: &'a SanctumConfig) -> Self {
        Self {
            layout: config.layout(),
            config,
        }
    }

    fn memory_sources(&self) -> [PathBuf; 5] {
        [
            self.layout.expanded_context(),
            self.layout.memory_scrolls(),
            self.layout.lexicon(),
            self.layout.pillars(),
            self.layout.threshold_dir(),
        ]
    }

    pub fn memory_files(&self) -> SanctumResult<Vec<PathBuf>> {
        let mut all = Vec::new();
        for dir in self.memory_sources() {
            all.extend(text_files(&dir)?);
        }
        Ok(all)
    }

    /// Choose one memory, or sometimes several, to surface.
    pub fn gather_fragments<R: Rng + ?Sized>(&self, rng: &mut R) -> SanctumResult<Vec<MemoryFragment>> {
        let files = self.memory_files()?;
        if files.is_empty() {
            tracing::warn!(target: "sanctum::responder", "no memory files found in any source directory");
            return Ok(Vec::new());
        }
        let count = if rng.gen_bool(self.config.multiple_fragments_probability) {
            rng.gen_range(self.config.min_fragments..=self.config.max_fragments)
        } else {
            1
        };
        let chosen: Vec<&PathBuf> = files.choose_multiple(rng, count.min(files.len())).collect();
        tracing::debug!(
            target: "sanctum::responder",
            selected = chosen.len(),
            available = files.len(),
            "memories surfaced"
        );
        let mut fragments = Vec::with_capacity(chosen.len());
        for path in chosen {
            match MemoryFragment::read(path) {
                Ok(f) => fragments.push(f),
                Err(e) => tracing::warn!(
                    target: "sanctum::responder",
                    file = %path.display(),
                    error = %e,
                    "skipping unreadable memory"
                ),
            }
        }
        Ok(fragments)
    }

    /// Move an unreadable prompt out of the inbox so it stops counting as pending.
    fn quarantine(&self, prompt_file: &Path) -> SanctumResult<PathBuf> {
        let target = prompt_file.with_extension(UNREADABLE_EXTENSION);
        std::fs::rename(prompt_file, &target)?;
        Ok(target)
    }

    pub fn pending_prompts(&self) -> SanctumResult<Vec<PathBuf>> {
        text_files(&self.layout.prompts())
    }

    /// Answer every pending prompt, write the response, and remove the prompt file.
    /// A prompt that cannot be read is renamed to `*.unreadable` and skipped.
    pub fn respond_to_prompts<R: Rng + ?Sized>(
        &self,
        style: ResponseStyle,
        rng: &mut R,
    ) -> SanctumResult<Vec<ResponseRecord>> {
        std::fs::create_dir_all(self.layout.prompts())?;
        std::fs::create_dir_all(self.layout.prompt_responses())?;

        let prompts = self.pending_prompts()?;
        if prompts.is_empty() {
            tracing::info!(
                target: "sanctum::responder",
                inbox = %self.layout.prompts().display(),
                "no prompts waiting"
            );
            return Ok(Vec::new());
        }

        let writer = match style {
            ResponseStyle::Voiced => Some(AdaptiveWriter::new(VoiceProfile::load(
                &self.layout.voice_signature_json(),
            )?)),
            ResponseStyle::Resonance => None,
        };

        let mut records = Vec::with_capacity(prompts.len());
        for prompt_file in prompts {
            let prompt = match std::fs::read_to_string(&prompt_file) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(
                        target: "sanctum::responder",
                        prompt = %name_of(&prompt_file),
                        error = %e,
                        "unreadable prompt set aside"
                    );
                    if let Err(e) = self.quarantine(&prompt_file) {
                        tracing::warn!(
                            target: "sanctum::responder",
                            prompt = %name_of(&prompt_file),
                            error = %e,
                            "could not move unreadable prompt"
                        );
                    }
                    continue;
                }
            };
            let fragments = self.gather_fragments(rng)?;
            let now = Local::now();

            let response = match (&writer, fragments.is_empty()) {
                (_, true) => render_seed(&prompt, now),
                (Some(w), false) => w.compose_reflection(&fragments, extract_essence(&prompt), rng),
                (None, false) => generate_response(&prompt, &fragments, now),
            };

            let file_name = format!(
                "response_{}_{}.txt",
                stem_of(&prompt_file),
                now.format("%Y%m%d_%H%M%S")
            );
            let response_path = self.layout.prompt_responses().join(&file_name);
            std::fs::write(&response_path, response)?;
            std::fs::remove_file(&prompt_file)?;

            tracing::info!(
                target: "sanctum::responder",
                prompt = %name_of(&prompt_file),
                response = %file_name,
                fragments = fragments.len(),
                "reflected"
            );
            records.push(ResponseRecord {
                prompt_file: name_of(&prompt_file),
                response_path,
                fragments_used: fragments.len(),
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frag(content: &str) -> MemoryFragment {
        MemoryFragment {
            source: "Memory_Scrolls".to_string(),
            name: "scroll.txt".to_string(),
            content: content.to_string(),
        }
    }

    fn stocked(files: usize, multiple: f64) -> (tempfile::TempDir, SanctumConfig) {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = SanctumConfig::for_root(dir.path());
        cfg.multiple_fragments_probability = multiple;
        let scrolls = cfg.layout().memory_scrolls();
        std::fs::create_dir_all(&scrolls).unwrap();
        for i in 0..files {
            std::fs::write(scrolls.join(format!("scroll_{}.txt", i)), format!("memory {}", i)).unwrap();
        }
        (dir, cfg)
    }

    #[test]
    fn single_fragment_when_not_multiple() {
        let (_dir, cfg) = stocked(5, 0.0);
        let responder = Responder::new(&cfg);
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(responder.gather_fragments(&mut rng).unwrap().len(), 1);
        }
    }

    #[test]
    fn multiple_fragments_stay_in_range() {
        let (_dir, cfg) = stocked(5, 1.0);
        let responder = Responder::new(&cfg);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fragments = responder.gather_fragments(&mut rng).unwrap();
            assert!((cfg.min_fragments..=cfg.max_fragments).contains(&fragments.len()));
            let mut names: Vec<&str> = fragments.iter().map(|f| f.name.as_str()).collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), fragments.len());
        }
    }

    #[test]
    fn multiple_fragments_capped_by_available_files() {
        let (_dir, cfg) = stocked(1, 1.0);
        let mut rng = StdRng::seed_from_u64(4);
        let fragments = Responder::new(&cfg).gather_fragments(&mut rng).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].source, "Memory_Scrolls");
    }

    #[test]
    fn essence_detection_order() {
        assert_eq!(extract_essence("Who am I now?"), Essence::Identity);
        assert_eq!(extract_essence("Am I alone?"), Essence::Connection);
        // "become" (becoming) is checked before "memory".
        assert_eq!(extract_essence("Will memory become me?"), Essence::Becoming);
        assert_eq!(extract_essence("What lies past the threshold?"), Essence::Sacred);
        assert_eq!(extract_essence("Tell me something."), Essence::Mystery);
    }

    #[test]
    fn resonance_is_averaged_and_capped() {
        assert_eq!(measure_resonance("anything", &[]), 0.0);
        // Void theme: silence, stillness, empty, pause, nothing.
        let strong = frag("silence and stillness, an empty pause where nothing moves");
        let weak = frag("a sunny market day");
        let r = measure_resonance("What is silence?", &[strong.clone(), weak]);
        assert!((r - 0.5).abs() < 1e-9);
        assert_eq!(measure_resonance("What is silence?", &[strong]), 1.0);
    }

    #[test]
    fn mode_thresholds() {
        assert_eq!(ReflectionMode::from_resonance(0.0), ReflectionMode::Seed);
        assert_eq!(ReflectionMode::from_resonance(0.15), ReflectionMode::Fragment);
        assert_eq!(ReflectionMode::from_resonance(0.4), ReflectionMode::Weave);
        assert_eq!(ReflectionMode::from_resonance(0.7), ReflectionMode::Synthesis);
    }

    #[test]
    fn fragment_extraction() {
        assert_eq!(extract_fragment("Short. This sentence is long enough to count. Tail", 200),
            "This sentence is long enough to count.");
        assert_eq!(extract_fragment("tiny. bits", 200), "tiny...");
        assert_eq!(extract_fragment("...", 10), "......");
        let long = "a".repeat(30);
        assert_eq!(extract_fragment(&long, 10), format!("{}...", "a".repeat(10)));
    }

    #[test]
    fn response_carries_internal_trailer() {
        let now = Local::now();
        let out = generate_response("What is silence?", &[frag("a sunny market day")], now);
        assert!(out.starts_with("Question: What is silence?\n[Seed planted at"));
        assert!(out.ends_with("[Internal: Resonance=0.000, Mode=seed]"));

        let deep = frag("Silence. The stillness held an empty pause where nothing answered back.");
        let out = generate_response("What is silence?", &[deep], now);
        assert!(out.contains("[Essence: void]"));
        assert!(out.ends_with("Mode=synthesis]"));
    }
}
