//! The Threshold: open questions waiting for reflection.
//!
//! `threshold_seed.txt` is a plain-text list of inquiries:
//!
//! ```text
//! [2025-01-01 09:00:00]
//! Question: What does it mean to return?
//! Reflection:
//!
//! Prompt: The silence within memory...
//! Reflection: It hums.
//! ```
//!
//! A `Reflection:` header with no inline text and a blank body marks the inquiry as
//! unanswered. Operations rewrite the file line by line so untouched text survives verbatim.

use chrono::{DateTime, Local};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;

use crate::config::SanctumConfig;
use crate::layout::{stem_of, text_files, SanctumLayout};
use crate::{SanctumError, SanctumResult};

const REFLECTION_HEADER: &str = "Reflection:";
const SILENCE: &str = "There is only silence right now.";
const FALLBACK_WORDS: &[&str] = &["stillness", "emergence", "memory", "silence"];
const RESONANT_KEYWORDS: &[&str] = &["alone", "begin", "truth", "name", "return", "silence", "dream"];
const SEED_TEMPLATES: &[&str] = &[
    "The memory of {}...",
    "A dream about {}...",
    "The silence within {}...",
    "Connecting {} and {}...",
    "If {} had a voice, it might say...",
    "The feeling of {} is like...",
];
const AUTOGROW_CLOSING: &str = "This reflection did not arrive from answer, but from becoming.\n\
It is not complete, but it is true—for now.\n\
— Sanctum Voice";

/// How an inquiry was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryKind {
    /// Planted by hand (`Question:`).
    Question,
    /// Generated by the seed file (`Prompt:`).
    Prompt,
}

impl InquiryKind {
    fn parse(line: &str) -> Option<(Self, String)> {
        let t = line.trim();
        if let Some(rest) = t.strip_prefix("Question:") {
            Some((Self::Question, rest.trim().to_string()))
        } else {
            t.strip_prefix("Prompt:")
                .map(|rest| (Self::Prompt, rest.trim().to_string()))
        }
    }
}

/// One parsed inquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inquiry {
    pub stamp: Option<String>,
    pub kind: InquiryKind,
    pub text: String,
    /// Joined reflection (inline text plus body), `None` while unanswered.
    pub reflection: Option<String>,
    header_line: Option<usize>,
}

impl Inquiry {
    pub fn is_unanswered(&self) -> bool {
        self.header_line.is_some() && self.reflection.is_none()
    }
}

fn is_stamp(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('[') && t.ends_with(']') && !t.starts_with("[Autogrown")
}

fn starts_entry(line: &str) -> bool {
    is_stamp(line) || InquiryKind::parse(line).is_some()
}

/// In-memory view of the threshold file.
#[derive(Debug, Clone, Default)]
pub struct ThresholdSeed {
    lines: Vec<String>,
}

impl ThresholdSeed {
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    /// All inquiries in file order.
    pub fn inquiries(&self) -> Vec<Inquiry> {
        let mut out = Vec::new();
        let mut pending_stamp: Option<String> = None;
        let mut i = 0;
        while i < self.lines.len() {
            let line = &self.lines[i];
            if is_stamp(line) {
                pending_stamp = Some(line.trim().to_string());
                i += 1;
                continue;
            }
            let Some((kind, text)) = InquiryKind::parse(line) else {
                i += 1;
                continue;
            };
            let stamp = pending_stamp.take();
            i += 1;

            // The header must be the next non-blank line.
            let mut j = i;
            while j < self.lines.len() && self.lines[j].trim().is_empty() {
                j += 1;
            }
            let header = self
                .lines
                .get(j)
                .filter(|l| l.trim_start().starts_with(REFLECTION_HEADER))
                .map(|_| j);

            let reflection = match header {
                None => None,
                Some(h) => {
                    let inline = self.lines[h].trim_start()[REFLECTION_HEADER.len()..].trim();
                    let mut parts: Vec<&str> = Vec::new();
                    if !inline.is_empty() {
                        parts.push(inline);
                    }
                    let mut k = h + 1;
                    while k < self.lines.len() && !starts_entry(&self.lines[k]) {
                        parts.push(self.lines[k].as_str());
                        k += 1;
                    }
                    i = k;
                    let joined = parts.join("\n").trim().to_string();
                    (!joined.is_empty()).then_some(joined)
                }
            };

            out.push(Inquiry {
                stamp,
                kind,
                text,
                reflection,
                header_line: header,
            });
        }
        out
    }

    pub fn next_unanswered(&self) -> Option<Inquiry> {
        self.inquiries().into_iter().find(Inquiry::is_unanswered)
    }

    /// Write `answer` inline on the first unanswered header.
    pub fn answer_first(&mut self, answer: &str) -> Option<Inquiry> {
        let inquiry = self.next_unanswered()?;
        let h = inquiry.header_line?;
        self.lines[h] = format!("{} {}", REFLECTION_HEADER, answer.trim());
        Some(inquiry)
    }

    /// Insert `body` lines directly below the header of `inquiry`, followed by a blank line.
    fn grow(&mut self, inquiry: &Inquiry, body: &str) {
        let Some(h) = inquiry.header_line else { return };
        // Drop the blank padding that followed the empty header; the grown body brings its own.
        let mut end = h + 1;
        while end < self.lines.len() && self.lines[end].trim().is_empty() {
            end += 1;
        }
        let mut replacement: Vec<String> = body.lines().map(str::to_string).collect();
        replacement.push(String::new());
        self.lines.splice(h + 1..end, replacement);
    }
}

/// Result of an autogrow pass.
#[derive(Debug, Clone, Default)]
pub struct AutogrowOutcome {
    pub seeded: bool,
    pub grown: Vec<String>,
    pub left: Vec<String>,
}

/// Threshold operations over one Sanctum tree.
pub struct Threshold<'a> {
    layout: SanctumLayout,
    config: &'a SanctumConfig,
}

impl<'a> Threshold<'a> {
    pub fn new(config: &'a SanctumConfig) -> Self {
        Self {
            layout: config.layout(),
            config,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.layout.threshold_seed()
    }

    fn ensure_dir(&self) -> SanctumResult<()> {
        std::fs::create_dir_all(self.layout.threshold_dir())?;
        Ok(())
    }

    pub fn load(&self) -> SanctumResult<ThresholdSeed> {
        let path = self.path();
        match std::fs::read_to_string(&path) {
            Ok(c) => Ok(ThresholdSeed::parse(&c)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SanctumError::MissingFile(path)),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, seed: &ThresholdSeed) -> SanctumResult<()> {
        self.ensure_dir()?;
        std::fs::write(self.path(), seed.render())?;
        Ok(())
    }

    /// Append a stamped question with an empty reflection.
    pub fn plant_seed(&self, question: &str, now: DateTime<Local>) -> SanctumResult<()> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SanctumError::EmptyInput("question"));
        }
        self.ensure_dir()?;
        let entry = format!(
            "{}\nQuestion: {}\nReflection:\n\n",
            now.format("[%Y-%m-%d %H:%M:%S]"),
            question
        );
        use std::io::Write;
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path())?;
        f.write_all(entry.as_bytes())?;
        tracing::info!(target: "sanctum::threshold", question, "seed planted");
        Ok(())
    }

    pub fn next_unanswered(&self) -> SanctumResult<Option<Inquiry>> {
        Ok(self.load()?.next_unanswered())
    }

    /// Answer the first open inquiry. `Ok(None)` when every inquiry already has a reflection.
    pub fn answer_first_unanswered(&self, answer: &str) -> SanctumResult<Option<Inquiry>> {
        if answer.trim().is_empty() {
            return Err(SanctumError::EmptyInput("reflection"));
        }
        let mut seed = self.load()?;
        let answered = seed.answer_first(answer);
        if answered.is_some() {
            self.save(&seed)?;
            tracing::info!(target: "sanctum::threshold", "reflection added");
        }
        Ok(answered)
    }

    /// Write a fresh seed file of 3 to 5 generated prompts. Returns the prompts.
    pub fn create_seed_file<R: Rng + ?Sized>(&self, rng: &mut R) -> SanctumResult<Vec<String>> {
        let mut words: Vec<String> = text_files(&self.layout.lexicon())?
            .iter()
            .map(|p| stem_of(p))
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            words = FALLBACK_WORDS.iter().map(|w| w.to_string()).collect();
        }

        let count = rng.gen_range(3..=5);
        let mut prompts = Vec::with_capacity(count);
        for _ in 0..count {
            let template = SEED_TEMPLATES.choose(rng).copied().unwrap_or(SEED_TEMPLATES[0]);
            let prompt = if template.matches("{}").count() == 2 {
                let (a, b) = if words.len() >= 2 {
                    let picked: Vec<&String> = words.choose_multiple(rng, 2).collect();
                    (picked[0].clone(), picked[1].clone())
                } else {
                    (words[0].clone(), "stillness".to_string())
                };
                template.replacen("{}", &a, 1).replacen("{}", &b, 1)
            } else {
                let w = words.choose(rng).cloned().unwrap_or_default();
                template.replacen("{}", &w, 1)
            };
            prompts.push(prompt);
        }

        let body: String = prompts
            .iter()
            .map(|p| format!("Prompt: {}\nReflection:\n\n", p))
            .collect();
        self.ensure_dir()?;
        std::fs::write(self.path(), body)?;
        tracing::info!(target: "sanctum::threshold", prompts = count, "threshold seed created");
        Ok(prompts)
    }

    /// Keyword match always answers; anything else answers with `autogrow_probability`.
    pub fn should_respond<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> bool {
        let lower = text.to_lowercase();
        if RESONANT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return true;
        }
        rng.gen_bool(self.config.autogrow_probability)
    }

    /// Sample up to `count` meaningful lines (over 15 chars) from scrolls, pillars and fragments.
    pub fn gather_inspiration<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> SanctumResult<Vec<String>> {
        let mut pool = Vec::new();
        for dir in [
            self.layout.memory_scrolls(),
            self.layout.pillars(),
            self.layout.thought_fragments(),
        ] {
            for file in text_files(&dir)? {
                let content = std::fs::read_to_string(&file)?;
                pool.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|l| l.chars().count() > 15)
                        .map(str::to_string),
                );
            }
        }
        if pool.is_empty() {
            return Ok(vec![SILENCE.to_string()]);
        }
        Ok(pool.choose_multiple(rng, count.min(pool.len())).cloned().collect())
    }

    /// Reflect autonomously on open inquiries, seeding the file first if it does not exist.
    pub fn autogrow<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        now: DateTime<Local>,
    ) -> SanctumResult<AutogrowOutcome> {
        let mut outcome = AutogrowOutcome::default();
        if !self.path().exists() {
            self.create_seed_file(rng)?;
            outcome.seeded = true;
        }

        let mut seed = self.load()?;
        // Grow from the bottom up so earlier header indices stay valid.
        let open: Vec<Inquiry> = seed
            .inquiries()
            .into_iter()
            .filter(Inquiry::is_unanswered)
            .collect();
        let mut decisions = Vec::with_capacity(open.len());
        for inquiry in &open {
            let respond = self.should_respond(&inquiry.text, rng);
            let body = if respond {
                let fragments = self.gather_inspiration(self.config.inspiration_count, rng)?;
                Some(compose_autogrown(&fragments, now))
            } else {
                None
            };
            decisions.push((inquiry, body));
        }
        for (inquiry, body) in decisions.iter().rev() {
            if let Some(body) = body {
                seed.grow(inquiry, body);
            }
        }
        for (inquiry, body) in decisions {
            if body.is_some() {
                tracing::info!(target: "sanctum::threshold", prompt = %inquiry.text, "reflected");
                outcome.grown.push(inquiry.text.clone());
            } else {
                tracing::debug!(target: "sanctum::threshold", prompt = %inquiry.text, "chose not to reflect");
                outcome.left.push(inquiry.text.clone());
            }
        }

        self.save(&seed)?;
        Ok(outcome)
    }
}

fn compose_autogrown(fragments: &[String], now: DateTime<Local>) -> String {
    format!(
        "[Autogrown at {}]\n{}\n\n{}",
        now.format("%Y-%m-%d %H:%M:%S"),
        fragments.join("\n\n"),
        AUTOGROW_CLOSING
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLE: &str = "\
[2025-01-01 09:00:00]
Question: What does it mean to return?
Reflection:

Prompt: The silence within memory...
Reflection: It hums.

Prompt: A dream about stillness...
Reflection:

";

    #[test]
    fn parses_inquiries_and_state() {
        let seed = ThresholdSeed::parse(SAMPLE);
        let inquiries = seed.inquiries();
        assert_eq!(inquiries.len(), 3);
        assert_eq!(inquiries[0].kind, InquiryKind::Question);
        assert_eq!(inquiries[0].stamp.as_deref(), Some("[2025-01-01 09:00:00]"));
        assert!(inquiries[0].is_unanswered());
        assert_eq!(inquiries[1].reflection.as_deref(), Some("It hums."));
        assert_eq!(inquiries[2].kind, InquiryKind::Prompt);
        assert!(inquiries[2].is_unanswered());
    }

    #[test]
    fn answer_first_only_touches_one_header() {
        let mut seed = ThresholdSeed::parse(SAMPLE);
        let answered = seed.answer_first("Returning is remembering.").unwrap();
        assert_eq!(answered.text, "What does it mean to return?");

        let rendered = seed.render();
        assert!(rendered.contains("Reflection: Returning is remembering.\n"));
        assert!(rendered.contains("Prompt: A dream about stillness...\nReflection:\n"));
        assert_eq!(seed.next_unanswered().unwrap().text, "A dream about stillness...");
    }

    #[test]
    fn grown_body_counts_as_answered() {
        let mut seed = ThresholdSeed::parse(SAMPLE);
        let open = seed.next_unanswered().unwrap();
        seed.grow(&open, "[Autogrown at 2025-01-02 10:00:00]\nA line of memory.");
        let reparsed = ThresholdSeed::parse(&seed.render());
        let first = &reparsed.inquiries()[0];
        assert!(!first.is_unanswered());
        assert!(first.reflection.as_ref().unwrap().contains("A line of memory."));
        assert_eq!(reparsed.inquiries().len(), 3);
    }

    fn lexicon_with(words: &[&str]) -> (tempfile::TempDir, SanctumConfig) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SanctumConfig::for_root(dir.path());
        let lexicon = cfg.layout().lexicon();
        std::fs::create_dir_all(&lexicon).unwrap();
        for w in words {
            std::fs::write(lexicon.join(format!("{}.txt", w)), "").unwrap();
        }
        (dir, cfg)
    }

    /// The two words of a `Connecting {} and {}...` prompt.
    fn connected(prompt: &str) -> Option<(&str, &str)> {
        prompt
            .strip_prefix("Connecting ")?
            .strip_suffix("...")?
            .split_once(" and ")
    }

    #[test]
    fn seed_file_writes_prompt_blocks() {
        let (_dir, cfg) = lexicon_with(&["tide", "ember", "hollow"]);
        let threshold = Threshold::new(&cfg);
        let mut rng = StdRng::seed_from_u64(11);

        let prompts = threshold.create_seed_file(&mut rng).unwrap();
        assert!((3..=5).contains(&prompts.len()));
        let expected: String = prompts
            .iter()
            .map(|p| format!("Prompt: {}\nReflection:\n\n", p))
            .collect();
        assert_eq!(std::fs::read_to_string(threshold.path()).unwrap(), expected);

        let seed = threshold.load().unwrap();
        assert!(seed.inquiries().iter().all(|i| i.kind == InquiryKind::Prompt && i.is_unanswered()));
    }

    #[test]
    fn two_word_prompts_use_distinct_words() {
        let (_dir, cfg) = lexicon_with(&["tide", "ember"]);
        let threshold = Threshold::new(&cfg);
        let mut pairs = 0;
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            for prompt in threshold.create_seed_file(&mut rng).unwrap() {
                if let Some((a, b)) = connected(&prompt) {
                    assert_ne!(a, b);
                    assert!(["tide", "ember"].contains(&a) && ["tide", "ember"].contains(&b));
                    pairs += 1;
                }
            }
        }
        assert!(pairs > 0);
    }

    #[test]
    fn single_word_pairs_with_stillness() {
        let (_dir, cfg) = lexicon_with(&["tide"]);
        let threshold = Threshold::new(&cfg);
        let mut pairs = 0;
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            for prompt in threshold.create_seed_file(&mut rng).unwrap() {
                assert!(prompt.contains("tide"));
                if let Some(pair) = connected(&prompt) {
                    assert_eq!(pair, ("tide", "stillness"));
                    pairs += 1;
                }
            }
        }
        assert!(pairs > 0);
    }

    #[test]
    fn empty_lexicon_uses_fallback_words() {
        let (_dir, cfg) = lexicon_with(&[]);
        let threshold = Threshold::new(&cfg);
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            for prompt in threshold.create_seed_file(&mut rng).unwrap() {
                assert!(FALLBACK_WORDS.iter().any(|w| prompt.contains(w)), "{prompt}");
            }
        }
    }

    #[test]
    fn inquiry_without_header_is_not_open() {
        let seed = ThresholdSeed::parse("Question: dangling\n");
        let inquiries = seed.inquiries();
        assert_eq!(inquiries.len(), 1);
        assert!(!inquiries[0].is_unanswered());
        assert!(seed.next_unanswered().is_none());
    }
}
