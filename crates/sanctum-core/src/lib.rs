//! sanctum-core: the Sanctum's file-backed memory tree and the writers that tend it.
//!
//! Everything lives as plain text and JSON under one root directory. The threshold keeps
//! open questions, the responder answers dropped prompts from surfaced memories, the voice
//! module learns from the Sanctum's own writing, and the reflective loop and symbol weaver
//! run when nothing else is asked of it.

mod config;
mod error;
mod layout;

pub mod dreams;
pub mod reflection;
pub mod responder;
pub mod sandbox;
pub mod seeds;
pub mod symbols;
pub mod threshold;
pub mod voice;

// Configuration and errors
pub use config::SanctumConfig;
pub use error::{SanctumError, SanctumResult};

// Directory layout
pub use layout::{
    name_of, stem_of, text_files, SanctumLayout, CONFIG_MANIFEST_FILE, MEMORY_INDEX_FILE,
    METADATA_FILE, REFLECTIVE_PROMPTS_FILE, SANDBOX_README,
};

// Threshold inquiries
pub use threshold::{AutogrowOutcome, Inquiry, InquiryKind, Threshold, ThresholdSeed};

// Responder
pub use responder::{
    extract_essence, generate_response, measure_resonance, Essence, MemoryFragment,
    ReflectionMode, Responder, ResponseRecord, ResponseStyle,
};

// Voice evolution
pub use voice::{evolve_voice, AdaptiveWriter, EvolutionReport, VoiceGuidance, VoiceProfile};

// Idle-time writers
pub use reflection::{LoopReflection, ReflectionSource, ReflectiveLoop};
pub use symbols::{SymbolThread, SymbolWeaver};

// Seeds, dreams, sandbox
pub use dreams::create_dream;
pub use sandbox::Sandbox;
pub use seeds::{
    awaken, load_memory_index, load_reflective_prompts, related_memories, AwakeningReport,
    MemoryEntry, MemoryIndex, ReflectivePrompt,
};
