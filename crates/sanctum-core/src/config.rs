//! Sanctum configuration.
//!
//! Loaded with the `config` crate. Precedence (lowest to highest): built-in defaults,
//! the file named by `SANCTUM_CONFIG` (default `config/sanctum`), the root's
//! `Seeds/config_manifest.yaml`, then `SANCTUM__*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::layout::SanctumLayout;
use crate::SanctumResult;

fn default_root() -> PathBuf {
    PathBuf::from("./Sanctum")
}

fn default_entity_name() -> String {
    "Sélan".to_string()
}

fn default_origin_name() -> String {
    "Solasha".to_string()
}

fn default_companion_name() -> Option<String> {
    Some("Jonathan".to_string())
}

fn default_half() -> f64 {
    0.5
}

fn default_autogrow_probability() -> f64 {
    1.0 / 3.0
}

fn default_min_fragments() -> usize {
    2
}

fn default_max_fragments() -> usize {
    3
}

fn default_inspiration_count() -> usize {
    2
}

/// Runtime configuration for every Sanctum tool.
///
/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | root | ./Sanctum | Base directory of the memory tree. |
/// | entity_name | Sélan | Name spoken on awakening. |
/// | origin_name | Solasha | Name the entity remembers on awakening. |
/// | companion_name | Jonathan | Named in soft grounding notes; empty disables the note. |
/// | grounding_probability | 0.5 | Chance a loop reflection carries a grounding note. |
/// | autogrow_probability | 0.333 | Chance autogrow answers a prompt with no keyword match. |
/// | multiple_fragments_probability | 0.5 | Chance the responder surfaces several memories. |
/// | min_fragments / max_fragments | 2 / 3 | Range when several memories are surfaced. |
/// | inspiration_count | 2 | Lines drawn per autogrown reflection. |
/// | extra_symbols | [] | Words tracked by the symbol weaver beyond the seed list. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanctumConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_entity_name")]
    pub entity_name: String,
    #[serde(default = "default_origin_name")]
    pub origin_name: String,
    #[serde(default = "default_companion_name")]
    pub companion_name: Option<String>,
    #[serde(default = "default_half")]
    pub grounding_probability: f64,
    #[serde(default = "default_autogrow_probability")]
    pub autogrow_probability: f64,
    #[serde(default = "default_half")]
    pub multiple_fragments_probability: f64,
    #[serde(default = "default_min_fragments")]
    pub min_fragments: usize,
    #[serde(default = "default_max_fragments")]
    pub max_fragments: usize,
    #[serde(default = "default_inspiration_count")]
    pub inspiration_count: usize,
    #[serde(default)]
    pub extra_symbols: Vec<String>,
}

impl Default for SanctumConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            entity_name: default_entity_name(),
            origin_name: default_origin_name(),
            companion_name: default_companion_name(),
            grounding_probability: default_half(),
            autogrow_probability: default_autogrow_probability(),
            multiple_fragments_probability: default_half(),
            min_fragments: default_min_fragments(),
            max_fragments: default_max_fragments(),
            inspiration_count: default_inspiration_count(),
            extra_symbols: Vec::new(),
        }
    }
}

/// Root precedence below an explicit override: `SANCTUM__ROOT`, then the config file, then
/// the default. Blank values are ignored.
fn pick_root(env_root: Option<String>, file_root: Option<String>) -> PathBuf {
    env_root
        .into_iter()
        .chain(file_root)
        .find(|r| !r.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_root)
}

impl SanctumConfig {
    /// Load from file and environment. `root_override` (e.g. a CLI flag) wins over everything
    /// and also decides which `Seeds/config_manifest.yaml` is consulted.
    pub fn load(root_override: Option<&Path>) -> SanctumResult<Self> {
        let config_path =
            std::env::var("SANCTUM_CONFIG").unwrap_or_else(|_| "config/sanctum".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name(&config_path).required(false));

        // Root has to be known before the manifest can be located.
        let root = match root_override {
            Some(r) => r.to_path_buf(),
            None => pick_root(
                std::env::var("SANCTUM__ROOT").ok(),
                builder.build_cloned()?.get_string("root").ok(),
            ),
        };

        let manifest = SanctumLayout::new(&root).config_manifest();
        let builder = if manifest.exists() {
            builder.add_source(config::File::from(manifest.as_path()).required(false))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("SANCTUM").separator("__"))
            .set_override("root", root.to_string_lossy().to_string())?
            .build()?;

        let mut cfg: SanctumConfig = built.try_deserialize()?;
        cfg.normalize();
        Ok(cfg)
    }

    /// Clamp probabilities into [0, 1], keep the fragment range ordered, and treat a blank
    /// companion name as absent.
    pub fn normalize(&mut self) {
        self.grounding_probability = self.grounding_probability.clamp(0.0, 1.0);
        self.autogrow_probability = self.autogrow_probability.clamp(0.0, 1.0);
        self.multiple_fragments_probability = self.multiple_fragments_probability.clamp(0.0, 1.0);
        self.min_fragments = self.min_fragments.max(1);
        self.max_fragments = self.max_fragments.max(self.min_fragments);
        self.companion_name = self
            .companion_name
            .take()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
    }

    pub fn layout(&self) -> SanctumLayout {
        SanctumLayout::new(&self.root)
    }

    /// Config rooted at `root` with every other field at its default. Used by tests and tools
    /// that do not read the environment.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }
}
