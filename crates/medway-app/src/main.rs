//! Medway application binary - composition root.
//!
//! Wires the conversation orchestrator to a set of providers and exposes
//! it as an interactive terminal session:
//! 1. Load configuration from TOML
//! 2. Build the provider set (scripted stubs in this build)
//! 3. Run a stdin REPL that feeds turns to the orchestrator and prints
//!    the transcript and facility results as they land
//!
//! Domain events are consumed on a background task so search completions
//! and emergency alerts surface even when they finish after the turn that
//! triggered them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use medway_chat::{ConversationOrchestrator, ProviderSet};
use medway_core::config::MedwayConfig;
use medway_core::events::DomainEvent;
use medway_core::types::{Coordinates, TurnAuthor, TurnKind};
use medway_files::UploadPoller;
use medway_providers::stub::{
    FixedGeocoder, MemoryFileStore, ScriptedChat, ScriptedClassifier, ScriptedMedication,
    ScriptedPlaces, ScriptedTriage, StubPositioning,
};

/// Resolve the config file path (MEDWAY_CONFIG env, or ~/.medway/config.toml).
fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("MEDWAY_CONFIG") {
        return PathBuf::from(p);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".medway").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// Scripted providers for running the conversation loop without live
/// backends. Unscripted classifier turns fall back to chat, so free-form
/// input still produces a response.
fn stub_providers() -> ProviderSet {
    ProviderSet {
        classifier: Arc::new(ScriptedClassifier::new()),
        triage: Arc::new(ScriptedTriage::new()),
        medication: Arc::new(ScriptedMedication::new()),
        chat: Arc::new(ScriptedChat::new()),
        geocoder: Arc::new(FixedGeocoder::new("San Isidro, Lima")),
        positioning: Arc::new(StubPositioning::fixed(Coordinates {
            lat: -12.0464,
            lng: -77.0428,
        })),
        places: Arc::new(ScriptedPlaces::new()),
        files: Arc::new(MemoryFileStore::default()),
    }
}

/// Print transcript turns appended since `printed`, advancing the cursor.
fn print_new_turns(orchestrator: &ConversationOrchestrator, printed: &mut usize) {
    let turns = orchestrator.turns();
    for turn in turns.iter().skip(*printed) {
        match (turn.author, turn.kind) {
            (TurnAuthor::System, TurnKind::Text) => println!("  asistente> {}", turn.text),
            (TurnAuthor::System, TurnKind::RegionPick) => {
                println!("  asistente> [elige una region: /region <nombre>]")
            }
            (TurnAuthor::System, TurnKind::ProvincePick) => {
                println!("  asistente> [elige una provincia: /provincia <nombre>]")
            }
            (TurnAuthor::System, TurnKind::DistrictPick) => {
                println!("  asistente> [elige un distrito: /distrito <nombre>]")
            }
            (TurnAuthor::System, TurnKind::LocationPrompt) => {
                println!("  asistente> [comparte tu ubicacion: /ubicacion o /lugar <nombre>]")
            }
            _ => {}
        }
    }
    *printed = turns.len();
}

fn print_places(orchestrator: &ConversationOrchestrator) {
    let state = orchestrator.state();
    if state.places.is_empty() {
        println!("  (sin resultados)");
        return;
    }
    for place in &state.places {
        let rating = place
            .rating
            .map(|r| format!(" ({:.1})", r))
            .unwrap_or_default();
        println!("  - {}{} | {}", place.name, rating, place.address);
    }
}

#[tokio::main]
async fn main() {
    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Medway v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = config_path();
    let config = MedwayConfig::load_or_default(&config_file);
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let poll_interval = Duration::from_secs(config.files.poll_interval_secs);
    let orchestrator = Arc::new(ConversationOrchestrator::new(config, stub_providers()));

    // Domain event listener: out-of-turn notifications only. Transcript
    // printing happens inline in the REPL.
    {
        let mut events = orchestrator.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                match event {
                    DomainEvent::SearchCompleted {
                        result_count,
                        background: true,
                    } => {
                        println!("  [nuevos resultados: {} establecimientos]", result_count);
                    }
                    DomainEvent::EmergencyDetected { specialty, .. } => {
                        tracing::warn!(specialty = %specialty, "Emergency detected");
                    }
                    _ => {}
                }
            }
        });
    }

    println!("Medway - asistente de salud (escribe /ayuda para ver los comandos)");

    let mut printed = 0usize;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_new_turns(&orchestrator, &mut printed);

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/salir", _) => break,
            ("/ayuda", _) => {
                println!("  /ubicacion            usar la ubicacion del dispositivo");
                println!("  /lugar <nombre>       fijar la ubicacion manualmente");
                println!("  /region <nombre>      paso 1 de la seleccion en cascada");
                println!("  /provincia <nombre>   paso 2 de la seleccion en cascada");
                println!("  /distrito <nombre>    paso 3 de la seleccion en cascada");
                println!("  /archivo <nombre>     adjuntar un documento (contenido simulado)");
                println!("  /resultados           mostrar los establecimientos encontrados");
                println!("  /reiniciar            empezar una conversacion nueva");
                println!("  /salir                terminar");
            }
            ("/ubicacion", _) => orchestrator.request_device_location().await,
            ("/lugar", name) if !name.is_empty() => orchestrator.select_location(name).await,
            ("/region", name) if !name.is_empty() => orchestrator.pick_region(name),
            ("/provincia", name) if !name.is_empty() => orchestrator.pick_province(name),
            ("/distrito", name) if !name.is_empty() => orchestrator.pick_district(name).await,
            ("/archivo", name) if !name.is_empty() => {
                if orchestrator.attach_file(name, b"").await.is_some() {
                    println!("  (documento subido, procesando)");
                    // Keep document states fresh until processing settles.
                    let poller =
                        UploadPoller::new(orchestrator.uploads().clone(), poll_interval);
                    tokio::spawn(async move { poller.run().await });
                }
            }
            ("/resultados", _) => print_places(&orchestrator),
            ("/reiniciar", _) => {
                orchestrator.reset();
                printed = 0;
                println!("  (conversacion reiniciada)");
            }
            _ => {
                if let Err(e) = orchestrator.handle_text(line).await {
                    println!("  error: {}", e);
                }
            }
        }
    }

    tracing::info!("Medway session ended");
}
