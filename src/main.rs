use clap::{Parser, Subcommand};
use room_presence::{AnchorRegistry, PresenceConfig, PresenceError};
use serde::Deserialize;
use serde_json::Value;
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Room-presence estimation from anchor distance readings
#[derive(Debug, Parser)]
#[command(name = "room-presence", version)]
struct Cli {
    /// JSON configuration with room volumes and anchors
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay line-delimited updates from stdin and print room guesses
    Replay,
    /// Resolve a room from readings given as anchor=distance pairs
    Resolve {
        #[arg(required = true, value_parser = parse_reading)]
        readings: Vec<(String, f64)>,
    },
}

/// One transport update: `{"anchor": "...", "entity": "...", "payload": {"distance": 1.5}}`
#[derive(Debug, Deserialize)]
struct UpdateLine {
    anchor: String,
    entity: String,
    payload: Value,
}

fn parse_reading(text: &str) -> Result<(String, f64), String> {
    let (anchor, distance) = text
        .split_once('=')
        .ok_or_else(|| format!("expected anchor=distance, got '{}'", text))?;
    let distance = distance
        .parse::<f64>()
        .map_err(|e| format!("invalid distance '{}': {}", distance, e))?;
    if !distance.is_finite() || distance < 0.0 {
        return Err(format!("distance must be finite and non-negative, got {}", distance));
    }
    Ok((anchor.to_string(), distance))
}

fn replay(registry: &mut AnchorRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut applied = 0usize;
    let mut dropped = 0usize;

    for (number, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let update: UpdateLine = match serde_json::from_str(&line) {
            Ok(update) => update,
            Err(e) => {
                warn!(line = number + 1, error = %e, "Skipping unreadable update line");
                dropped += 1;
                continue;
            }
        };

        match registry.route_update(&update.anchor, &update.entity, &update.payload) {
            Ok(outcome) => {
                applied += 1;
                println!("{} -> {}", outcome.entity, outcome.room);
            }
            Err(e) if e.is_recoverable() => dropped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    info!(applied, dropped, entities = registry.entity_names().len(), "Replay finished");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PresenceConfig::from_file(&cli.config)?;
    let mut registry = AnchorRegistry::initialize(&config)?;

    match cli.command {
        Command::Replay => replay(&mut registry)?,
        Command::Resolve { readings } => {
            for (anchor, _) in &readings {
                if registry.coordinator().anchor(anchor).is_none() {
                    return Err(PresenceError::UnknownAnchor {
                        anchor: anchor.clone(),
                    }
                    .into());
                }
            }
            println!("{}", registry.coordinator().resolve_room(&readings));
        }
    }

    Ok(())
}
