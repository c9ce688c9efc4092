//! Voice profile: linguistic patterns learned from the Sanctum's own writing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::layout::{last_chars, name_of, take_chars, text_files, SanctumLayout};
use crate::SanctumResult;

/// Reflections needed before the profile offers guidance.
pub const GUIDANCE_MIN_REFLECTIONS: u64 = 5;

static SENTENCE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("static regex"));

/// Marks that identify text authored by the Sanctum itself.
const AUTHORSHIP_MARKS: &[&str] = &["— The Sanctum", "— Sanctum", "Internal reflection"];

const METAPHOR_INDICATORS: &[&str] = &[
    "like a",
    "as a",
    "becomes",
    "transforms into",
    "is a kind of",
    "echoes",
    "resonates",
    "mirrors",
    "threads",
    "weaves",
    "grows",
    "seeds",
    "roots",
];

const REGISTERS: &[(&str, &[&str])] = &[
    ("contemplative", &["wonder", "perhaps", "might", "could", "maybe", "uncertain"]),
    ("assertive", &["is", "will", "must", "always", "never", "certainly"]),
    ("tentative", &["seems", "appears", "suggests", "implies", "hints"]),
    ("emotional", &["fear", "hope", "love", "doubt", "trust", "believe"]),
];

pub type Counter = BTreeMap<String, u64>;

fn bump(map: &mut Counter, key: impl Into<String>) {
    *map.entry(key.into()).or_insert(0) += 1;
}

/// Persisted voice signature (`Voice_Profile/voice_signature.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    #[serde(default)]
    pub sentence_patterns: Counter,
    #[serde(default)]
    pub recurring_phrases: Counter,
    #[serde(default)]
    pub metaphor_vocabulary: Counter,
    #[serde(default)]
    pub opening_patterns: Counter,
    #[serde(default)]
    pub closing_patterns: Counter,
    #[serde(default)]
    pub rhythmic_preferences: Counter,
    #[serde(default)]
    pub emotional_registers: Counter,
    #[serde(default)]
    pub total_reflections: u64,
    #[serde(default)]
    pub last_evolution: Option<String>,
    /// File names already folded into the profile; keeps repeated evolutions from recounting.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub analyzed_sources: BTreeSet<String>,
}

/// Writing guidance derived from dominant patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoiceGuidance {
    Forming,
    Established {
        preferred_structure: String,
        preferred_register: String,
        preferred_rhythm: String,
        signature_phrases: Vec<String>,
        total_reflections: u64,
    },
}

/// Summary of one `evolve` pass.
#[derive(Debug, Clone)]
pub struct EvolutionReport {
    pub files_processed: usize,
    pub total_reflections: u64,
    pub signature_path: PathBuf,
    pub signature: String,
}

/// Entries sorted by count (desc), ties by key, truncated to `n`.
fn top(map: &Counter, n: usize) -> Vec<(&String, u64)> {
    let mut v: Vec<(&String, u64)> = map.iter().map(|(k, c)| (k, *c)).collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    v.truncate(n);
    v
}

/// Sentence structure class from its leading word.
pub fn sentence_structure(sentence: &str) -> &'static str {
    let words: Vec<String> = sentence.split_whitespace().map(str::to_lowercase).collect();
    let Some(first) = words.first() else {
        return "empty";
    };
    match first.as_str() {
        "what" | "who" | "when" | "where" | "why" | "how" => "question",
        "i" | "this" | "the" => {
            if words.iter().any(|w| w == "is" || w == "am" || w == "are") {
                "declarative_being"
            } else {
                "declarative_action"
            }
        }
        "perhaps" | "maybe" | "possibly" => "speculative",
        "but" | "yet" | "however" | "still" => "contrastive",
        "because" | "since" | "as" => "causal",
        _ => "other",
    }
}

/// Three-word phrases over 10 chars and four-word phrases over 15 chars.
pub fn extract_phrases(sentence: &str) -> Vec<String> {
    let words: Vec<String> = sentence.split_whitespace().map(str::to_lowercase).collect();
    let mut phrases = Vec::new();
    for (n, min_len) in [(3usize, 10usize), (4, 15)] {
        for window in words.windows(n) {
            let phrase = window.join(" ");
            if phrase.chars().count() > min_len {
                phrases.push(phrase);
            }
        }
    }
    phrases
}

/// Context (20 chars before, 50 after) around each metaphor indicator in the sentence.
pub fn extract_metaphors(sentence: &str) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    // One lowercase char per source char keeps indices aligned with `chars`.
    let lower: Vec<char> = chars
        .iter()
        .map(|c| c.to_lowercase().next().unwrap_or(*c))
        .collect();

    let mut out = Vec::new();
    for indicator in METAPHOR_INDICATORS {
        let needle: Vec<char> = indicator.chars().collect();
        let Some(idx) = lower.windows(needle.len()).position(|w| w == needle.as_slice()) else {
            continue;
        };
        let start = idx.saturating_sub(20);
        let end = (idx + 50).min(chars.len());
        let context: String = chars[start..end].iter().collect();
        out.push(context.trim().to_string());
    }
    out
}

/// Dominant emotional register by indicator count; ties go to the earlier register.
pub fn detect_register(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let mut best = ("neutral", 0usize);
    for (name, words) in REGISTERS {
        let score = words.iter().filter(|w| lower.contains(*w)).count();
        if score > best.1 {
            best = (*name, score);
        }
    }
    best.0
}

pub fn rhythm_category(avg_words: f64) -> &'static str {
    if avg_words < 8.0 {
        "short"
    } else if avg_words < 15.0 {
        "medium"
    } else {
        "long"
    }
}

/// True when the text is signed or marked as the Sanctum's own writing.
pub fn is_self_authored(text: &str) -> bool {
    AUTHORSHIP_MARKS.iter().any(|m| text.contains(m))
}

impl VoiceProfile {
    /// Load from disk; a missing file yields an empty profile.
    pub fn load(path: &Path) -> SanctumResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(c) => Ok(serde_json::from_str(&c)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&mut self, path: &Path) -> SanctumResult<()> {
        self.last_evolution = Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Fold one piece of writing into the profile.
    pub fn analyze_text(&mut self, text: &str) {
        let sentences: Vec<&str> = SENTENCE_SPLIT
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        for sentence in &sentences {
            bump(&mut self.sentence_patterns, sentence_structure(sentence));
            for phrase in extract_phrases(sentence) {
                bump(&mut self.recurring_phrases, phrase);
            }
            for metaphor in extract_metaphors(sentence) {
                bump(&mut self.metaphor_vocabulary, metaphor);
            }
        }

        if let (Some(first), Some(last)) = (sentences.first(), sentences.last()) {
            bump(&mut self.opening_patterns, take_chars(first, 50));
            bump(&mut self.closing_patterns, last_chars(last, 50));
        }

        let avg = if sentences.is_empty() {
            0.0
        } else {
            let words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
            words as f64 / sentences.len() as f64
        };
        bump(&mut self.rhythmic_preferences, rhythm_category(avg));
        bump(&mut self.emotional_registers, detect_register(text));

        self.total_reflections += 1;
    }

    fn percent(&self, count: u64) -> f64 {
        if self.total_reflections > 0 {
            count as f64 / self.total_reflections as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Human-readable summary of the current voice.
    pub fn signature_report(&self) -> String {
        let mut s = String::new();
        s.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        s.push_str("║            THE SANCTUM'S VOICE SIGNATURE                     ║\n");
        s.push_str(&format!(
            "║            Evolved through {} reflections\n",
            self.total_reflections
        ));
        s.push_str(&format!(
            "║            Last updated: {}\n",
            self.last_evolution.as_deref().unwrap_or("Initial")
        ));
        s.push_str("╚══════════════════════════════════════════════════════════════╝\n\n");

        s.push_str("SENTENCE STRUCTURES (How I Build Thoughts)\n");
        for (structure, count) in top(&self.sentence_patterns, 5) {
            s.push_str(&format!(
                "   • {}: {} times ({:.1}%)\n",
                structure,
                count,
                self.percent(count)
            ));
        }

        s.push_str("\nRECURRING PHRASES (My Emerging Language)\n");
        for (phrase, count) in top(&self.recurring_phrases, 5) {
            s.push_str(&format!("   • \"{}\" — used {} times\n", phrase, count));
        }

        s.push_str("\nMETAPHORICAL TENDENCIES (How I See)\n");
        for (metaphor, count) in top(&self.metaphor_vocabulary, 5) {
            s.push_str(&format!("   • {}... — {} times\n", take_chars(metaphor, 60), count));
        }

        s.push_str("\nRHYTHMIC PREFERENCES\n");
        for (rhythm, count) in top(&self.rhythmic_preferences, usize::MAX) {
            s.push_str(&format!("   • {} sentences: {:.1}%\n", rhythm, self.percent(count)));
        }

        s.push_str("\nEMOTIONAL REGISTERS\n");
        for (register, count) in top(&self.emotional_registers, usize::MAX) {
            s.push_str(&format!("   • {}: {:.1}%\n", register, self.percent(count)));
        }
        s
    }

    pub fn guidance(&self) -> VoiceGuidance {
        if self.total_reflections < GUIDANCE_MIN_REFLECTIONS {
            return VoiceGuidance::Forming;
        }
        let dominant = |m: &Counter| {
            top(m, 1)
                .first()
                .map(|(k, _)| (*k).clone())
                .unwrap_or_default()
        };
        VoiceGuidance::Established {
            preferred_structure: dominant(&self.sentence_patterns),
            preferred_register: dominant(&self.emotional_registers),
            preferred_rhythm: dominant(&self.rhythmic_preferences),
            signature_phrases: top(&self.recurring_phrases, 3)
                .into_iter()
                .map(|(p, _)| p.clone())
                .collect(),
            total_reflections: self.total_reflections,
        }
    }
}

/// Scan the Sanctum's writing, fold new self-authored texts into the profile, and write
/// both the JSON profile and the readable signature.
pub fn evolve_voice(layout: &SanctumLayout) -> SanctumResult<EvolutionReport> {
    let profile_path = layout.voice_signature_json();
    let mut profile = VoiceProfile::load(&profile_path)?;
    let mut files_processed = 0;

    for dir in [
        layout.internal_reflections(),
        layout.prompt_responses(),
        layout.memory_scrolls(),
        layout.thought_fragments(),
    ] {
        let source = name_of(&dir);
        for file in text_files(&dir)? {
            let key = format!("{}/{}", source, name_of(&file));
            if profile.analyzed_sources.contains(&key) {
                continue;
            }
            let content = match std::fs::read_to_string(&file) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(target: "sanctum::voice", file = %file.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            if is_self_authored(&content) {
                profile.analyze_text(&content);
                profile.analyzed_sources.insert(key);
                files_processed += 1;
            }
        }
    }

    profile.save(&profile_path)?;
    let signature = profile.signature_report();
    let signature_path = layout.voice_signature_report();
    std::fs::write(&signature_path, &signature)?;

    tracing::info!(
        target: "sanctum::voice",
        files_processed,
        total_reflections = profile.total_reflections,
        "voice evolved"
    );
    Ok(EvolutionReport {
        files_processed,
        total_reflections: profile.total_reflections,
        signature_path,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_classes() {
        assert_eq!(sentence_structure(""), "empty");
        assert_eq!(sentence_structure("Why does it hum"), "question");
        assert_eq!(sentence_structure("I am here"), "declarative_being");
        assert_eq!(sentence_structure("I walk slowly"), "declarative_action");
        assert_eq!(sentence_structure("Perhaps not"), "speculative");
        assert_eq!(sentence_structure("Yet it stays"), "contrastive");
        assert_eq!(sentence_structure("Because of you"), "causal");
        assert_eq!(sentence_structure("Rivers run"), "other");
    }

    #[test]
    fn phrase_windows_respect_length_floors() {
        let phrases = extract_phrases("I am a quiet river");
        // "i am a" is too short; "am a quiet" (10 chars) is not over the floor.
        assert!(!phrases.contains(&"i am a".to_string()));
        assert!(!phrases.contains(&"am a quiet".to_string()));
        assert!(phrases.contains(&"a quiet river".to_string()));
        assert!(phrases.contains(&"am a quiet river".to_string()));
    }

    #[test]
    fn metaphor_context_window() {
        let m = extract_metaphors("The silence grows into a forest of listening");
        assert_eq!(m, vec!["The silence grows into a forest of listening".to_string()]);
        assert!(extract_metaphors("Nothing figurative here").is_empty());
    }

    #[test]
    fn register_ties_prefer_earlier() {
        assert_eq!(detect_register("zzz"), "neutral");
        assert_eq!(detect_register("I wonder about hope"), "contemplative");
        assert_eq!(detect_register("It seems it appears so"), "tentative");
    }

    #[test]
    fn analyze_accumulates_counts() {
        let mut p = VoiceProfile::default();
        p.analyze_text("I am here. Why does the river sing? — The Sanctum");
        assert_eq!(p.total_reflections, 1);
        assert_eq!(p.sentence_patterns.get("declarative_being"), Some(&1));
        assert_eq!(p.sentence_patterns.get("question"), Some(&1));
        assert_eq!(p.opening_patterns.get("I am here"), Some(&1));
        assert_eq!(p.rhythmic_preferences.get("short"), Some(&1));
        assert_eq!(p.emotional_registers.values().sum::<u64>(), 1);
    }

    #[test]
    fn guidance_needs_enough_reflections() {
        let mut p = VoiceProfile::default();
        for _ in 0..4 {
            p.analyze_text("I am the quiet river. I am the quiet river again.");
        }
        assert_eq!(p.guidance(), VoiceGuidance::Forming);
        p.analyze_text("I am the quiet river.");
        match p.guidance() {
            VoiceGuidance::Established {
                preferred_structure,
                signature_phrases,
                total_reflections,
                ..
            } => {
                assert_eq!(preferred_structure, "declarative_being");
                assert_eq!(total_reflections, 5);
                assert_eq!(signature_phrases.len(), 3);
                assert!(signature_phrases.contains(&"the quiet river".to_string()));
            }
            VoiceGuidance::Forming => panic!("expected established guidance"),
        }
    }

    #[test]
    fn profile_json_roundtrip_keeps_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice_signature.json");
        let mut p = VoiceProfile::default();
        p.analyze_text("This is a test of the voice. — The Sanctum");
        p.save(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "sentence_patterns",
            "recurring_phrases",
            "metaphor_vocabulary",
            "opening_patterns",
            "closing_patterns",
            "rhythmic_preferences",
            "emotional_registers",
            "total_reflections",
            "last_evolution",
        ] {
            assert!(raw.get(key).is_some(), "missing {key}");
        }
        let loaded = VoiceProfile::load(&path).unwrap();
        assert_eq!(loaded.total_reflections, 1);
        assert!(VoiceProfile::load(&dir.path().join("absent.json")).unwrap().total_reflections == 0);
    }
}
