//! Voice evolution: the Sanctum learns its own linguistic patterns and writes with them.
//!
//! - [`VoiceProfile`] counts structures, phrases, metaphors, rhythm and register across
//!   self-authored texts and persists them as `Voice_Profile/voice_signature.json`.
//! - [`AdaptiveWriter`] composes new reflections weighted by those counts.

mod profile;
mod writer;

pub use profile::{
    detect_register, evolve_voice, extract_metaphors, extract_phrases, is_self_authored,
    rhythm_category, sentence_structure, Counter, EvolutionReport, VoiceGuidance, VoiceProfile,
    GUIDANCE_MIN_REFLECTIONS,
};
pub use writer::AdaptiveWriter;
