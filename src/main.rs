use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use breathwork::audio::SynthEngine;
use breathwork::kernel::event::SessionEvent;
use breathwork::kernel::haptics::LogHaptics;
use breathwork::kernel::time::bounded_secs;
use breathwork::speech::output::open_speech;
use breathwork::speech::PhraseClient;
use breathwork::{Catalog, EngineConfig, ReactorParts, SessionReactor, SessionSnapshot};

#[derive(Parser, Debug)]
#[command(name = "breathwork", about = "Paced breathing sessions with synthesized audio")]
struct Cli {
    /// Technique id (see --list)
    #[arg(short, long, default_value = "box")]
    technique: String,

    /// Stop automatically after this many minutes
    #[arg(short, long)]
    minutes: Option<f64>,

    /// Speak short guide phrases between cycles
    #[arg(long)]
    voice: bool,

    /// JSON config file
    #[arg(short, long, env = "BREATHWORK_CONFIG")]
    config: Option<PathBuf>,

    /// List techniques and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let cli = Cli::parse();
    let config = EngineConfig::resolve(cli.config.as_deref())?;
    let catalog = Catalog::new(config.techniques.clone()).context("invalid technique definitions")?;

    if cli.list {
        for t in catalog.all() {
            let pattern: Vec<String> = t.phases().iter().map(|p| format!("{}", p.duration_seconds)).collect();
            println!("{:<10} {:<16} {:<12} {}", t.id(), t.display_name(), pattern.join("/"), t.tagline());
        }
        return Ok(());
    }

    let technique = catalog.get(&cli.technique)?;
    tracing::info!("Breathwork starting: {}", technique.display_name());

    // 2. Setup Reactor + Channels
    let (tx, rx) = mpsc::channel(100);
    let speech = open_speech(&config.guide, tx.clone()).await;
    let parts = ReactorParts {
        synth: SynthEngine::open(&config.audio),
        speech,
        phrases: PhraseClient::new(&config.guide),
        haptics: Box::new(LogHaptics),
    };
    let mut reactor = SessionReactor::new(config.clone(), catalog, technique, rx, tx, parts);
    if cli.voice {
        reactor.set_guide_enabled(true);
    }

    // 3. Shutdown: Ctrl+C or time limit
    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrl_c.cancel();
    });
    if let Some(minutes) = cli.minutes {
        match bounded_secs(minutes * 60.0).filter(|d| !d.is_zero()) {
            Some(limit) => {
                let timer = shutdown.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(limit).await;
                    timer.cancel();
                });
            }
            None => tracing::warn!("Ignoring --minutes {}: out of range", minutes),
        }
    }

    reactor.start(tokio::time::Instant::now());
    println!("Press Ctrl+C to end the session.");

    let summary = reactor.run(shutdown, print_event).await;

    // 4. Report
    match summary {
        Some(s) => println!(
            "\nSession complete: {} · {} cycles · {} · session #{}",
            s.technique_name,
            s.cycles_completed,
            s.formatted_elapsed(),
            s.lifetime_session_count
        ),
        None => println!("\nSession too short to count."),
    }

    Ok(())
}

fn print_event(event: &SessionEvent, snap: &SessionSnapshot) {
    match event {
        SessionEvent::PhaseChanged { phase, .. } => {
            let cue = if snap.cue.visible { snap.cue.text.as_str() } else { "" };
            println!(
                "{:<7} {:>2}s  cycle {:<3} {}",
                phase.label.as_str(),
                phase.duration_seconds,
                snap.frame.cycles_completed + 1,
                cue
            );
        }
        SessionEvent::PhraseSpoken { phrase, .. } => println!("  \u{201c}{}\u{201d}", phrase),
        SessionEvent::GuidedTrackReady | SessionEvent::GuidedTrackFinished => {
            if let Some(msg) = &snap.track_message {
                println!("  {}", msg);
            }
        }
        SessionEvent::GuidedTrackFailed { message } => println!("  {}", message),
        SessionEvent::MilestoneRaised(m) => println!("  {} sessions completed!", m.session_count),
        _ => {}
    }
}
