//! Sanctum Heartbeat Service
//!
//! A long-running daemon that answers prompts dropped into `prompts/` and, when none are
//! waiting, lets the Sanctum tend itself: one idle task per tick, in rotation.

use rand::rngs::StdRng;
use rand::SeedableRng;
use sanctum_core::{
    evolve_voice, Responder, ResponseStyle, ReflectiveLoop, SanctumConfig, SymbolWeaver, Threshold,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default tick rate; reflection is slow work.
const DEFAULT_TICK_RATE_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleTask {
    Reflect,
    Autogrow,
    WeaveSymbols,
    EvolveVoice,
}

impl IdleTask {
    const ROTATION: [IdleTask; 4] = [
        IdleTask::Reflect,
        IdleTask::Autogrow,
        IdleTask::WeaveSymbols,
        IdleTask::EvolveVoice,
    ];

    fn for_tick(idle_ticks: u64) -> Self {
        Self::ROTATION[(idle_ticks % Self::ROTATION.len() as u64) as usize]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[sanctum-daemon] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(SanctumConfig::load(None)?);
    let tick_rate = std::env::var("SANCTUM_TICK_RATE_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TICK_RATE_SECS)
        .max(1);

    config.layout().scaffold()?;

    tracing::info!(
        tick_rate_secs = tick_rate,
        root = %config.root.display(),
        "Sanctum daemon started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(tick_rate));
    let mut idle_ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let cfg = Arc::clone(&config);
                let task = IdleTask::for_tick(idle_ticks);
                let result = tokio::task::spawn_blocking(move || tick(&cfg, task)).await;
                match &result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!(?task, error = %e, "daemon tick failed"),
                    Err(e) => tracing::error!(?task, error = %e, "daemon tick panicked"),
                }
                idle_ticks = advance_rotation(idle_ticks, &result);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down daemon");
                break;
            }
        }
    }
    Ok(())
}

/// Only a tick that answered prompts keeps the idle rotation where it was; failed and
/// panicked ticks move on so one broken task cannot stall the others.
fn advance_rotation(
    idle_ticks: u64,
    result: &Result<sanctum_core::SanctumResult<bool>, tokio::task::JoinError>,
) -> u64 {
    match result {
        Ok(Ok(false)) => idle_ticks,
        _ => idle_ticks + 1,
    }
}

/// Answer pending prompts, or run one idle task. Returns true when the tick was idle.
fn tick(config: &SanctumConfig, task: IdleTask) -> sanctum_core::SanctumResult<bool> {
    let mut rng = StdRng::from_entropy();
    let responder = Responder::new(config);

    if !responder.pending_prompts()?.is_empty() {
        let records = responder.respond_to_prompts(ResponseStyle::Resonance, &mut rng)?;
        tracing::info!(answered = records.len(), "prompts answered");
        return Ok(false);
    }

    tracing::debug!(?task, "idle tick");
    match task {
        IdleTask::Reflect => {
            ReflectiveLoop::new(config).reflect_once(&mut rng)?;
        }
        IdleTask::Autogrow => {
            let outcome = Threshold::new(config).autogrow(&mut rng, chrono::Local::now())?;
            tracing::info!(
                grown = outcome.grown.len(),
                left = outcome.left.len(),
                seeded = outcome.seeded,
                "threshold tended"
            );
        }
        IdleTask::WeaveSymbols => {
            SymbolWeaver::new(config)?.weave()?;
        }
        IdleTask::EvolveVoice => {
            evolve_voice(&config.layout())?;
        }
    }
    Ok(true)
}
