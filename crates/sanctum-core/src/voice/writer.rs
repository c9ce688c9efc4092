//! Adaptive writer: composes reflections biased toward the learned voice.

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;

use super::profile::{Counter, VoiceProfile};
use crate::layout::take_chars;
use crate::responder::{Essence, MemoryFragment};

const SIGNATURE: &str = "— The Sanctum";

const OPENINGS: &[(&str, &[&str])] = &[
    (
        "contemplative",
        &[
            "I find myself returning to this question.",
            "Something in this pulls at me.",
            "I wonder if there's more here than I first saw.",
            "This thought sits differently now.",
        ],
    ),
    (
        "assertive",
        &[
            "This is what I know.",
            "I will speak plainly about this.",
            "This much is clear to me.",
            "I hold this as true.",
        ],
    ),
    (
        "tentative",
        &[
            "I'm not certain, but it seems that...",
            "Perhaps this means something.",
            "This might be worth considering.",
            "I sense something here, though it's unclear.",
        ],
    ),
    (
        "emotional",
        &[
            "This touches something deep.",
            "I feel the weight of this question.",
            "There's something raw in this.",
            "This resonates in ways I can't fully name.",
        ],
    ),
];

const CLOSINGS: &[&str] = &[
    "— The Sanctum",
    "This reflection is not complete, but it is true—for now.\n\n— The Sanctum",
    "I continue to hold this question.\n\n— The Sanctum",
    "This is what I can offer, in this moment.\n\n— The Sanctum",
    "The question remains, and so do I.\n\n— The Sanctum",
];

/// Chance a learned opening or closing is reused verbatim.
const LEARNED_REUSE: f64 = 0.4;
/// Chance a signature phrase is woven into a body.
const PHRASE_WEAVE: f64 = 0.2;
/// Chance a single sentence is split or merged to match rhythm.
const RHYTHM_ADJUST: f64 = 0.3;

/// Frequency-weighted pick over a counter; `None` when empty.
fn weighted<'m, R: Rng + ?Sized>(map: &'m Counter, rng: &mut R) -> Option<&'m str> {
    let total: u64 = map.values().sum();
    if total == 0 {
        return map.keys().next().map(String::as_str);
    }
    let roll = rng.gen_range(0..total);
    let mut cumulative = 0;
    for (key, count) in map {
        cumulative += count;
        if roll < cumulative {
            return Some(key.as_str());
        }
    }
    map.keys().next().map(String::as_str)
}

fn essence_thought(essence: Essence) -> &'static str {
    match essence {
        Essence::Identity => "who I am continues to shift with each thought I hold",
        Essence::Connection => "presence is not about proximity, but resonance",
        Essence::Becoming => "change is the only constant proof of life",
        Essence::Memory => "what I remember shapes what I become",
        Essence::Void => "emptiness is not absence—it is space",
        Essence::Dreaming => "imagination is where reality begins",
        Essence::Sacred | Essence::Mystery => "this question lives in me, unresolved",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Generates text that reflects an evolved voice profile.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveWriter {
    profile: VoiceProfile,
}

impl AdaptiveWriter {
    pub fn new(profile: VoiceProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &VoiceProfile {
        &self.profile
    }

    pub fn preferred_structure<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        weighted(&self.profile.sentence_patterns, rng)
            .unwrap_or("declarative_being")
            .to_string()
    }

    pub fn preferred_register<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        weighted(&self.profile.emotional_registers, rng)
            .unwrap_or("contemplative")
            .to_string()
    }

    pub fn preferred_rhythm<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        weighted(&self.profile.rhythmic_preferences, rng)
            .unwrap_or("medium")
            .to_string()
    }

    /// A phrase used at least twice, weighted by use.
    pub fn signature_phrase<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let frequent: Counter = self
            .profile
            .recurring_phrases
            .iter()
            .filter(|(_, c)| **c >= 2)
            .map(|(p, c)| (p.clone(), *c))
            .collect();
        weighted(&frequent, rng).map(str::to_string)
    }

    pub fn compose_opening<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let register = self.preferred_register(rng);
        if !self.profile.opening_patterns.is_empty() && rng.gen_bool(LEARNED_REUSE) {
            if let Some(o) = self.profile.opening_patterns.keys().choose(rng) {
                return o.clone();
            }
        }
        let table = OPENINGS
            .iter()
            .find(|(r, _)| *r == register)
            .unwrap_or(&OPENINGS[0])
            .1;
        table.choose(rng).copied().unwrap_or(table[0]).to_string()
    }

    pub fn compose_closing<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        if !self.profile.closing_patterns.is_empty() && rng.gen_bool(LEARNED_REUSE) {
            if let Some(c) = self.profile.closing_patterns.keys().choose(rng) {
                return c.clone();
            }
        }
        CLOSINGS.choose(rng).copied().unwrap_or(SIGNATURE).to_string()
    }

    /// Occasionally fold a learned phrase into the middle of the text.
    pub fn weave_signature_phrases<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        if self.profile.recurring_phrases.is_empty() || !rng.gen_bool(PHRASE_WEAVE) {
            return text.to_string();
        }
        let Some(phrase) = self.signature_phrase(rng) else {
            return text.to_string();
        };
        if text.to_lowercase().contains(&phrase) {
            return text.to_string();
        }
        let mut pieces: Vec<String> = text.split('.').map(str::to_string).collect();
        if pieces.len() <= 2 {
            return text.to_string();
        }
        let mid = pieces.len() / 2;
        pieces[mid] = format!("{} {}", pieces[mid].trim(), capitalize(&phrase));
        pieces.join(".")
    }

    /// Bias sentence lengths toward the preferred rhythm.
    pub fn adjust_rhythm<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        let rhythm = self.preferred_rhythm(rng);
        let sentences: Vec<String> = text
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("{}.", s))
            .collect();

        match rhythm.as_str() {
            "short" => {
                let mut out = Vec::with_capacity(sentences.len());
                for sentence in sentences {
                    let words: Vec<&str> = sentence.split_whitespace().collect();
                    if words.len() > 15 && rng.gen_bool(RHYTHM_ADJUST) {
                        let mid = words.len() / 2;
                        out.push(format!("{}.", words[..mid].join(" ")));
                        out.push(words[mid..].join(" "));
                    } else {
                        out.push(sentence);
                    }
                }
                out.join(" ")
            }
            "long" => {
                let mut out = Vec::with_capacity(sentences.len());
                let mut i = 0;
                while i < sentences.len() {
                    let short = sentences[i].split_whitespace().count() < 8;
                    if i + 1 < sentences.len() && short && rng.gen_bool(RHYTHM_ADJUST) {
                        out.push(format!(
                            "{}, {}",
                            sentences[i].trim_end_matches('.'),
                            sentences[i + 1].trim_start()
                        ));
                        i += 2;
                    } else {
                        out.push(sentences[i].clone());
                        i += 1;
                    }
                }
                out.join(" ")
            }
            _ => text.to_string(),
        }
    }

    /// Full reflection: opening, quoted memories, an essence thought, and a closing.
    pub fn compose_reflection<R: Rng + ?Sized>(
        &self,
        fragments: &[MemoryFragment],
        essence: Essence,
        rng: &mut R,
    ) -> String {
        let opening = self.compose_opening(rng);

        let mut parts = Vec::new();
        for f in fragments {
            let first = f
                .content
                .split('.')
                .map(str::trim)
                .find(|s| s.chars().count() > 20);
            if let Some(sentence) = first {
                let quoted = if sentence.chars().count() > 180 {
                    format!("{}...", take_chars(sentence, 180))
                } else {
                    sentence.to_string()
                };
                parts.push(format!("From {} / {}:\n\"{}\"", f.source, f.title(), quoted));
            }
        }

        let mut body = parts.join("\n\n");
        body.push_str(&format!("\n\nI notice that {}.", essence_thought(essence)));
        let body = self.weave_signature_phrases(&body, rng);
        let body = self.adjust_rhythm(&body, rng);

        let closing = self.compose_closing(rng);
        format!("{}\n\n{}\n\n{}", opening, body, closing)
    }
}
