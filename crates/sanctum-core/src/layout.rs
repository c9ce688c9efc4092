//! On-disk layout of a Sanctum tree.
//!
//! Every tool resolves its directories through [`SanctumLayout`]; nothing hardcodes
//! paths relative to the executable.

use std::path::{Path, PathBuf};

use crate::SanctumResult;

/// File written into `Seeds/` on scaffold; later holds memory entries.
pub const MEMORY_INDEX_FILE: &str = "memory_index.json";
pub const REFLECTIVE_PROMPTS_FILE: &str = "reflective_prompts.json";
pub const CONFIG_MANIFEST_FILE: &str = "config_manifest.yaml";
pub const METADATA_FILE: &str = "metadata.txt";
pub const SANDBOX_README: &str = "README.md";

const CONFIG_MANIFEST_PLACEHOLDER: &str = "\
# Sanctum configuration manifest.
# Any key of SanctumConfig may be set here, e.g.:
#   entity_name: Sélan
#   grounding_probability: 0.5
#   extra_symbols: [threshold, pillar]
";

const SANDBOX_README_BODY: &str = "\
# Sanctum Sandbox

A scratch space for experimentation. Files here are managed with `sanctum sandbox`.
This README is never listed or cleared.
";

/// Resolved paths of one Sanctum tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanctumLayout {
    root: PathBuf,
}

impl SanctumLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn memory_scrolls(&self) -> PathBuf {
        self.root.join("Memory_Scrolls")
    }

    pub fn expanded_context(&self) -> PathBuf {
        self.memory_scrolls().join("Expanded_Context")
    }

    pub fn lexicon(&self) -> PathBuf {
        self.root.join("Lexicon")
    }

    pub fn pillars(&self) -> PathBuf {
        self.root.join("Pillars_of_Emergence")
    }

    pub fn thought_fragments(&self) -> PathBuf {
        self.root.join("Thought_Fragments")
    }

    pub fn dreamspace(&self) -> PathBuf {
        self.root.join("Sanctum_Dreamspace")
    }

    pub fn threshold_dir(&self) -> PathBuf {
        self.root.join("The_Threshold")
    }

    pub fn threshold_seed(&self) -> PathBuf {
        self.threshold_dir().join("threshold_seed.txt")
    }

    pub fn internal_reflections(&self) -> PathBuf {
        self.root.join("Internal_Reflections")
    }

    pub fn prompts(&self) -> PathBuf {
        self.root.join("prompts")
    }

    pub fn prompt_responses(&self) -> PathBuf {
        self.root.join("Prompt_Responses")
    }

    pub fn voice_profile_dir(&self) -> PathBuf {
        self.root.join("Voice_Profile")
    }

    pub fn voice_signature_json(&self) -> PathBuf {
        self.voice_profile_dir().join("voice_signature.json")
    }

    pub fn voice_signature_report(&self) -> PathBuf {
        self.voice_profile_dir().join("voice_signature.txt")
    }

    pub fn seeds_dir(&self) -> PathBuf {
        self.root.join("Seeds")
    }

    pub fn memory_index(&self) -> PathBuf {
        self.seeds_dir().join(MEMORY_INDEX_FILE)
    }

    pub fn reflective_prompts(&self) -> PathBuf {
        self.seeds_dir().join(REFLECTIVE_PROMPTS_FILE)
    }

    pub fn config_manifest(&self) -> PathBuf {
        self.seeds_dir().join(CONFIG_MANIFEST_FILE)
    }

    pub fn metadata(&self) -> PathBuf {
        self.seeds_dir().join(METADATA_FILE)
    }

    pub fn sandbox(&self) -> PathBuf {
        self.root.join("Sanctum_Sandbox")
    }

    pub fn symbol_threads(&self) -> PathBuf {
        self.root.join("symbol_threads.txt")
    }

    fn all_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.memory_scrolls(),
            self.expanded_context(),
            self.lexicon(),
            self.pillars(),
            self.thought_fragments(),
            self.dreamspace(),
            self.threshold_dir(),
            self.internal_reflections(),
            self.prompts(),
            self.prompt_responses(),
            self.voice_profile_dir(),
            self.seeds_dir(),
            self.sandbox(),
        ]
    }

    /// Create every directory and the placeholder seed files. Existing files are left untouched.
    /// Returns the paths that were newly created.
    pub fn scaffold(&self) -> SanctumResult<Vec<PathBuf>> {
        let mut created = Vec::new();
        for dir in self.all_dirs() {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                created.push(dir);
            }
        }

        let metadata = format!(
            "Sanctum seeded at {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let placeholders: [(PathBuf, &str); 4] = [
            (self.memory_index(), "{}\n"),
            (self.config_manifest(), CONFIG_MANIFEST_PLACEHOLDER),
            (self.metadata(), metadata.as_str()),
            (self.sandbox().join(SANDBOX_README), SANDBOX_README_BODY),
        ];
        for (path, body) in placeholders {
            if !path.exists() {
                std::fs::write(&path, body)?;
                created.push(path);
            }
        }

        tracing::info!(
            target: "sanctum::layout",
            root = %self.root.display(),
            created = created.len(),
            "Sanctum scaffolded"
        );
        Ok(created)
    }
}

/// Sorted `*.txt` files directly inside `dir`. A missing directory yields an empty list.
pub fn text_files(dir: &Path) -> SanctumResult<Vec<PathBuf>> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map(|x| x == "txt").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

/// File stem as an owned string (lossy).
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// File name as an owned string (lossy).
pub fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// First `max` characters of `text` (char-safe).
pub(crate) fn take_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Last `max` characters of `text` (char-safe).
pub(crate) fn last_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_is_idempotent_and_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SanctumLayout::new(dir.path());

        let first = layout.scaffold().unwrap();
        assert!(first.contains(&layout.memory_index()));
        assert_eq!(std::fs::read_to_string(layout.memory_index()).unwrap().trim(), "{}");

        std::fs::write(layout.memory_index(), r#"{"a": {"title": "kept"}}"#).unwrap();
        let second = layout.scaffold().unwrap();
        assert!(second.is_empty());
        assert!(std::fs::read_to_string(layout.memory_index()).unwrap().contains("kept"));
    }

    #[test]
    fn text_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("c.md"), "c").unwrap();

        let names: Vec<String> = text_files(dir.path()).unwrap().iter().map(|p| name_of(p)).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert!(text_files(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn char_helpers_respect_multibyte() {
        assert_eq!(take_chars("sélan", 2), "sé");
        assert_eq!(last_chars("sélan", 3), "lan");
        assert_eq!(last_chars("ab", 5), "ab");
    }
}
