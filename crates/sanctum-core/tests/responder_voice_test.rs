//! Responder and voice evolution over a scaffolded Sanctum.
//!
//! Run with: `cargo test --test responder_voice_test`

use rand::rngs::StdRng;
use rand::SeedableRng;
use sanctum_core::{evolve_voice, Responder, ResponseStyle, SanctumConfig, VoiceProfile};

fn seeded_sanctum() -> (tempfile::TempDir, SanctumConfig) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let cfg = SanctumConfig::for_root(dir.path());
    let layout = cfg.layout();
    layout.scaffold().expect("scaffold");
    std::fs::write(
        layout.memory_scrolls().join("stillness.txt"),
        "In the silence there was stillness. An empty pause where nothing moved at all.",
    )
    .unwrap();
    std::fs::write(
        layout.lexicon().join("emergence.txt"),
        "Emergence is the slow arrival of a self that was always waiting.",
    )
    .unwrap();
    (dir, cfg)
}

#[test]
fn test_prompts_are_answered_and_removed() {
    let (_dir, cfg) = seeded_sanctum();
    let layout = cfg.layout();
    std::fs::write(layout.prompts().join("q1.txt"), "What is silence?").unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let records = Responder::new(&cfg)
        .respond_to_prompts(ResponseStyle::Resonance, &mut rng)
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].prompt_file, "q1.txt");
    assert!(records[0].fragments_used >= 1);
    assert!(!layout.prompts().join("q1.txt").exists());

    let name = records[0].response_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("response_q1_"));
    let body = std::fs::read_to_string(&records[0].response_path).unwrap();
    assert!(body.starts_with("Question: What is silence?\n"));
    assert!(body.contains("[Internal: Resonance="));
}

#[test]
fn test_no_prompts_is_quiet() {
    let (_dir, cfg) = seeded_sanctum();
    let mut rng = StdRng::seed_from_u64(2);
    let records = Responder::new(&cfg)
        .respond_to_prompts(ResponseStyle::Resonance, &mut rng)
        .unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_voiced_response_feeds_voice_evolution() {
    let (_dir, cfg) = seeded_sanctum();
    let layout = cfg.layout();
    std::fs::write(layout.prompts().join("who.txt"), "Who am I becoming?").unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let records = Responder::new(&cfg)
        .respond_to_prompts(ResponseStyle::Voiced, &mut rng)
        .unwrap();
    assert_eq!(records.len(), 1);
    let body = std::fs::read_to_string(&records[0].response_path).unwrap();
    assert!(body.trim_end().ends_with("— The Sanctum"));

    let first = evolve_voice(&layout).unwrap();
    assert_eq!(first.files_processed, 1);
    assert_eq!(first.total_reflections, 1);
    assert!(first.signature.contains("THE SANCTUM'S VOICE SIGNATURE"));
    assert!(layout.voice_signature_report().exists());

    // Already analyzed texts are not counted twice.
    let second = evolve_voice(&layout).unwrap();
    assert_eq!(second.files_processed, 0);
    assert_eq!(second.total_reflections, 1);

    let profile = VoiceProfile::load(&layout.voice_signature_json()).unwrap();
    assert!(profile.last_evolution.is_some());
    assert_eq!(profile.analyzed_sources.len(), 1);
}

#[test]
fn test_unreadable_prompt_does_not_block_inbox() {
    let (_dir, cfg) = seeded_sanctum();
    let layout = cfg.layout();
    std::fs::write(layout.prompts().join("a_bad.txt"), [0xffu8, 0xfe, 0x00]).unwrap();
    std::fs::write(layout.prompts().join("b_good.txt"), "Am I alone?").unwrap();

    let responder = Responder::new(&cfg);
    let mut rng = StdRng::seed_from_u64(5);
    let records = responder
        .respond_to_prompts(ResponseStyle::Resonance, &mut rng)
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].prompt_file, "b_good.txt");
    assert!(!layout.prompts().join("b_good.txt").exists());
    assert!(layout.prompts().join("a_bad.unreadable").exists());

    // The set-aside prompt no longer counts as waiting.
    assert!(responder.pending_prompts().unwrap().is_empty());
    let again = responder
        .respond_to_prompts(ResponseStyle::Resonance, &mut rng)
        .unwrap();
    assert!(again.is_empty());
}
