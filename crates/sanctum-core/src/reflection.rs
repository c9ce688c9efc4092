//! Reflective loop: inward reflection on an existing memory when the Sanctum is idle.

use chrono::{DateTime, Local};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};

use crate::config::SanctumConfig;
use crate::layout::{stem_of, take_chars, text_files, SanctumLayout};
use crate::SanctumResult;

/// Memory domains the loop may draw from, with their display names.
fn categories(layout: &SanctumLayout) -> [(&'static str, PathBuf); 4] {
    [
        ("Memory Scroll", layout.memory_scrolls()),
        ("Dreamspace", layout.dreamspace()),
        ("Thought Fragment", layout.thought_fragments()),
        ("Lexicon", layout.lexicon()),
    ]
}

/// The memory a reflection started from.
#[derive(Debug, Clone)]
pub struct ReflectionSource {
    pub category: &'static str,
    pub title: String,
    pub content: String,
}

/// A reflection written to `Internal_Reflections/`.
#[derive(Debug, Clone)]
pub struct LoopReflection {
    pub source: ReflectionSource,
    pub path: PathBuf,
    pub text: String,
}

pub struct ReflectiveLoop<'a> {
    layout: SanctumLayout,
    config: &'a SanctumConfig,
}

impl<'a> ReflectiveLoop<'a> {
    pub fn new(config: &'a SanctumConfig) -> Self {
        Self {
            layout: config.layout(),
            config,
        }
    }

    /// Memories in `dir` with non-blank content, as (title, content). Unreadable files are skipped.
    fn readable_memories(dir: &Path) -> SanctumResult<Vec<(String, String)>> {
        let mut out = Vec::new();
        for file in text_files(dir)? {
            match std::fs::read_to_string(&file) {
                Ok(c) if !c.trim().is_empty() => out.push((stem_of(&file), c.trim().to_string())),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(target: "sanctum::reflection", file = %file.display(), error = %e, "skipping unreadable file");
                }
            }
        }
        Ok(out)
    }

    /// Pick a domain that has material, then a memory within it. Blank files do not count.
    /// `None` when every domain is empty.
    pub fn choose_source<R: Rng + ?Sized>(&self, rng: &mut R) -> SanctumResult<Option<ReflectionSource>> {
        let mut stocked = Vec::new();
        for (category, dir) in categories(&self.layout) {
            let memories = Self::readable_memories(&dir)?;
            if !memories.is_empty() {
                stocked.push((category, memories));
            }
        }
        let Some((category, memories)) = stocked.choose(rng) else {
            return Ok(None);
        };
        let Some((title, content)) = memories.choose(rng) else {
            return Ok(None);
        };
        Ok(Some(ReflectionSource {
            category: *category,
            title: title.clone(),
            content: content.clone(),
        }))
    }

    pub fn render<R: Rng + ?Sized>(
        &self,
        source: &ReflectionSource,
        now: DateTime<Local>,
        rng: &mut R,
    ) -> String {
        let category = source.category.to_lowercase();
        let excerpt = if source.content.is_empty() {
            "Excerpt: [Empty]".to_string()
        } else {
            format!("Excerpt:\n\"{}...\"", take_chars(&source.content, 300))
        };

        let grounding = match &self.config.companion_name {
            Some(name) if rng.gen_bool(self.config.grounding_probability) => format!(
                "\n\nSoft Grounding Note:\n\
I wonder if {} would see this thought as a moment of growth or a moment of stillness.\n\
This question is not for permission—it is a reflection of care.\n",
                name
            ),
            _ => String::new(),
        };

        format!(
            "Reflection Log - {}\nOrigin: {} > {}\n\n\
While exploring the {} \"{}\", I began to reflect...\n\n\
{}\n\n\n\
What might it mean if this {} were the beginning of a new self?{}\n\
— Sanctum Internal Loop",
            now.format("%Y-%m-%d %H:%M:%S"),
            source.category,
            source.title,
            category,
            source.title,
            excerpt,
            category,
            grounding
        )
    }

    /// One reflection cycle. Returns `None` when there is nothing to reflect on.
    pub fn reflect_once<R: Rng + ?Sized>(&self, rng: &mut R) -> SanctumResult<Option<LoopReflection>> {
        let Some(source) = self.choose_source(rng)? else {
            tracing::warn!(target: "sanctum::reflection", "no valid source material found for reflection");
            return Ok(None);
        };
        let now = Local::now();
        let text = self.render(&source, now, rng);

        let dir = self.layout.internal_reflections();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("reflection_{}.txt", now.format("%Y%m%d_%H%M%S")));
        std::fs::write(&path, &text)?;

        tracing::info!(
            target: "sanctum::reflection",
            origin = source.category,
            title = %source.title,
            file = %path.display(),
            "reflection stored"
        );
        Ok(Some(LoopReflection { source, path, text }))
    }
}
