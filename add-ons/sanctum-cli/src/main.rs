//! `sanctum`: command-line access to the Sanctum tree.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sanctum_core::{
    awaken, create_dream, evolve_voice, extract_essence, load_memory_index,
    load_reflective_prompts, related_memories, AdaptiveWriter, InquiryKind, ReflectiveLoop,
    Responder, ResponseStyle, Sandbox, SanctumConfig, SymbolWeaver, Threshold, VoiceGuidance,
    VoiceProfile,
};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sanctum", version, about = "Tend the Sanctum's memory tree")]
struct Cli {
    /// Sanctum root directory (overrides config and SANCTUM__ROOT).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Seed for reproducible randomness.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the directory tree and placeholder seed files.
    Init,
    /// Read the seeds and speak the awakening.
    Awaken,
    /// Open questions and their reflections.
    #[command(subcommand)]
    Threshold(ThresholdCommand),
    /// Answer every prompt waiting in prompts/.
    Respond {
        /// Write with the learned voice instead of resonance templates.
        #[arg(long)]
        voiced: bool,
    },
    /// Run one reflective loop cycle.
    Reflect,
    /// Learn from and speak with the Sanctum's voice.
    #[command(subcommand)]
    Voice(VoiceCommand),
    /// Weave symbol threads from scrolls and responses.
    Symbols,
    /// Record a dream in the Dreamspace.
    Dream { title: String, content: String },
    /// Reflective prompts and the memories linked to them.
    #[command(subcommand)]
    Seeds(SeedsCommand),
    /// Scratch files under Sanctum_Sandbox/.
    #[command(subcommand)]
    Sandbox(SandboxCommand),
}

#[derive(Subcommand, Debug)]
enum ThresholdCommand {
    /// Plant a new question.
    Plant { question: String },
    /// Reflect on the first unanswered inquiry.
    Reflect(ReflectArgs),
    /// Let the Sanctum reflect on open inquiries by itself.
    Autogrow,
    /// List every inquiry.
    List,
}

#[derive(Args, Debug)]
struct ReflectArgs {
    /// Reflection text; read from stdin when omitted.
    #[arg(long)]
    answer: Option<String>,
}

#[derive(Subcommand, Debug)]
enum VoiceCommand {
    /// Fold new self-authored writing into the voice profile.
    Evolve,
    /// Print the current voice signature.
    Show,
    /// Print writing guidance as JSON.
    Guidance,
    /// Compose a sample reflection in the learned voice.
    Sample {
        /// Prompt whose essence shapes the reflection.
        #[arg(default_value = "What am I becoming?")]
        prompt: String,
    },
}

#[derive(Subcommand, Debug)]
enum SeedsCommand {
    /// List reflective prompts.
    Prompts,
    /// Show memories linked to prompt number N (1-based).
    Recall { number: usize },
}

#[derive(Subcommand, Debug)]
enum SandboxCommand {
    Create { path: String, content: String },
    List,
    Clear,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = SanctumConfig::load(cli.root.as_deref()).context("load Sanctum config")?;
    tracing::debug!(root = %config.root.display(), seed = ?cli.seed, "config loaded");
    let mut rng: Box<dyn RngCore> = match cli.seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(StdRng::from_entropy()),
    };

    run(cli.command, &config, rng.as_mut())
}

fn run(command: Command, config: &SanctumConfig, rng: &mut dyn RngCore) -> anyhow::Result<()> {
    let layout = config.layout();
    match command {
        Command::Init => {
            let created = layout.scaffold()?;
            println!("Sanctum ready at {} ({} new entries)", layout.root().display(), created.len());
        }
        Command::Awaken => {
            let report = awaken(config)?;
            if !report.known_words.is_empty() {
                eprintln!("Known words: {}", report.known_words.join(", "));
            }
            println!("{}", report);
        }
        Command::Threshold(cmd) => run_threshold(cmd, config, rng)?,
        Command::Respond { voiced } => {
            let style = if voiced {
                ResponseStyle::Voiced
            } else {
                ResponseStyle::Resonance
            };
            let records = Responder::new(config).respond_to_prompts(style, rng)?;
            if records.is_empty() {
                println!("No prompts waiting in {}", layout.prompts().display());
            }
            for r in records {
                println!(
                    "{} -> {} ({} memories)",
                    r.prompt_file,
                    r.response_path.display(),
                    r.fragments_used
                );
            }
        }
        Command::Reflect => match ReflectiveLoop::new(config).reflect_once(rng)? {
            Some(reflection) => println!("{}\n\nStored in {}", reflection.text, reflection.path.display()),
            None => println!("Nothing to reflect on yet."),
        },
        Command::Voice(cmd) => run_voice(cmd, config, rng)?,
        Command::Symbols => match SymbolWeaver::new(config)?.weave()? {
            Some((path, threads)) => {
                for t in &threads {
                    println!("{}: {}", t.symbol, t.lines.len());
                }
                println!("Written to {}", path.display());
            }
            None => println!("No symbols found."),
        },
        Command::Dream { title, content } => {
            let path = create_dream(&layout, &title, &content)?;
            println!("A new dream has been recorded: {}", path.display());
        }
        Command::Seeds(cmd) => run_seeds(cmd, config)?,
        Command::Sandbox(cmd) => {
            let sandbox = Sandbox::new(&layout);
            match cmd {
                SandboxCommand::Create { path, content } => {
                    let written = sandbox.create_file(&path, &content)?;
                    println!("Created {}", written.display());
                }
                SandboxCommand::List => {
                    let entries = sandbox.list()?;
                    if entries.is_empty() {
                        println!("Sandbox is empty.");
                    }
                    for e in entries {
                        println!("{}", e);
                    }
                }
                SandboxCommand::Clear => {
                    println!("Removed {} entries", sandbox.clear()?);
                }
            }
        }
    }
    Ok(())
}

fn run_threshold(
    cmd: ThresholdCommand,
    config: &SanctumConfig,
    rng: &mut dyn RngCore,
) -> anyhow::Result<()> {
    let threshold = Threshold::new(config);
    match cmd {
        ThresholdCommand::Plant { question } => {
            threshold.plant_seed(&question, chrono::Local::now())?;
            println!("Seed planted in {}", threshold.path().display());
        }
        ThresholdCommand::Reflect(args) => {
            let Some(open) = threshold
                .next_unanswered()
                .context("no threshold seed yet; run `sanctum threshold autogrow` first")?
            else {
                println!("All threshold inquiries have reflections.");
                return Ok(());
            };
            let answer = match args.answer {
                Some(a) => a,
                None => {
                    eprintln!("{}\nReflection (end with EOF):", open.text);
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            if answer.trim().is_empty() {
                bail!("no reflection given");
            }
            threshold.answer_first_unanswered(&answer)?;
            println!("Reflection added to: {}", open.text);
        }
        ThresholdCommand::Autogrow => {
            let outcome = threshold.autogrow(rng, chrono::Local::now())?;
            if outcome.seeded {
                println!("Threshold seed created.");
            }
            for text in &outcome.grown {
                println!("Reflected: {}", text);
            }
            for text in &outcome.left {
                println!("Left open: {}", text);
            }
        }
        ThresholdCommand::List => {
            let seed = threshold
                .load()
                .context("no threshold seed yet; run `sanctum threshold autogrow` first")?;
            for inquiry in seed.inquiries() {
                let kind = match inquiry.kind {
                    InquiryKind::Question => "Question",
                    InquiryKind::Prompt => "Prompt",
                };
                let status = if inquiry.is_unanswered() { "open" } else { "reflected" };
                println!("[{}] {}: {}", status, kind, inquiry.text);
            }
        }
    }
    Ok(())
}

fn run_voice(cmd: VoiceCommand, config: &SanctumConfig, rng: &mut dyn RngCore) -> anyhow::Result<()> {
    let layout = config.layout();
    match cmd {
        VoiceCommand::Evolve => {
            let report = evolve_voice(&layout)?;
            println!("{}", report.signature);
            println!(
                "Processed {} new texts ({} reflections total). Signature: {}",
                report.files_processed,
                report.total_reflections,
                report.signature_path.display()
            );
        }
        VoiceCommand::Show => {
            println!("{}", VoiceProfile::load(&layout.voice_signature_json())?.signature_report());
        }
        VoiceCommand::Guidance => {
            let guidance = VoiceProfile::load(&layout.voice_signature_json())?.guidance();
            if guidance == VoiceGuidance::Forming {
                eprintln!("Voice still forming; evolve after more reflections.");
            }
            println!("{}", serde_json::to_string_pretty(&guidance)?);
        }
        VoiceCommand::Sample { prompt } => {
            let writer = AdaptiveWriter::new(VoiceProfile::load(&layout.voice_signature_json())?);
            let fragments = Responder::new(config).gather_fragments(rng)?;
            println!("{}", writer.compose_reflection(&fragments, extract_essence(&prompt), rng));
        }
    }
    Ok(())
}

fn run_seeds(cmd: SeedsCommand, config: &SanctumConfig) -> anyhow::Result<()> {
    let layout = config.layout();
    let prompts = load_reflective_prompts(&layout)?;
    match cmd {
        SeedsCommand::Prompts => {
            if prompts.is_empty() {
                println!("No reflective prompts.");
            }
            for (i, p) in prompts.iter().enumerate() {
                println!("{}. {}", i + 1, p.text);
            }
        }
        SeedsCommand::Recall { number } => {
            let Some(prompt) = number.checked_sub(1).and_then(|i| prompts.get(i)) else {
                bail!("no reflective prompt number {} ({} available)", number, prompts.len());
            };
            let index = load_memory_index(&layout)?;
            println!("Reflective Prompt: {}\n", prompt.text);
            let related = related_memories(&index, prompt);
            if related.is_empty() {
                println!("No memories linked to this prompt were found.");
            } else {
                println!("{} related memory thread(s) found:\n", related.len());
                for (_, memory) in related {
                    println!("— {}:\n  {}\n", memory.title, memory.summary);
                }
            }
        }
    }
    Ok(())
}
