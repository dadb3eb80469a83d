// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use keytape::config::ConfigWatcher;
use keytape::{
    Engine, EngineConfig, EngineEvent, ExportFormat, Fired, FileStore, SoundConfig, SystemClock,
    TokioScheduler,
};

const DEFAULT_CONFIG_FILE: &str = "keytape.yaml";

fn print_usage() {
    println!("keytape - key performance recorder");
    println!();
    println!("Usage: keytape [--data <DIR>] [--config <FILE>] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  --list                     List stored recordings");
    println!("  --export <ID> [json|yaml]  Print a recording in interchange form");
    println!("  --import <FILE>            Import an exported recording");
    println!("  --rename <ID> <NAME>       Rename a recording");
    println!("  --delete <ID>              Delete a recording");
    println!("  --play <ID> [SPEED]        Play a recording (speed default from config)");
    println!("  --demo [NAME]              Record a short scripted performance");
    println!("  --help                     Show this help message");
}

/// Remove `--flag <value>` from the argument list
fn take_option(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{} requires a value", flag);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

/// Load the configuration, returning the file it came from if any
fn load_config(path: Option<String>) -> Result<(EngineConfig, Option<PathBuf>)> {
    let path = match path {
        Some(path) => Some(PathBuf::from(path)),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Some(PathBuf::from(DEFAULT_CONFIG_FILE)),
        None => None,
    };
    match path {
        Some(path) => Ok((EngineConfig::load(&path)?, Some(path))),
        None => Ok((EngineConfig::default(), None)),
    }
}

/// Watch the config file during live sessions; failure only costs hot reload
fn watch_config(path: Option<&Path>) -> Option<ConfigWatcher> {
    let path = path?;
    match ConfigWatcher::new(path, None) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!(error = %e, "config hot reload disabled");
            None
        }
    }
}

fn apply_reloaded(engine: &mut Engine<TokioScheduler>, watcher: Option<&ConfigWatcher>) {
    if let Some(config) = watcher.and_then(ConfigWatcher::latest) {
        engine.apply_config(config);
    }
}

fn arg<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing {}", what))
}

fn print_events(events: &Receiver<EngineEvent>) {
    for event in events.try_iter() {
        match event {
            EngineEvent::PlaybackNote(note) => println!(
                "{:>7}ms  {:<4} {}{} ({})",
                note.timestamp,
                note.key,
                note.sound_config.note,
                note.sound_config.octave,
                note.sound_config.instrument
            ),
            EngineEvent::NoteRecorded(note) => {
                println!("recorded {} at {}ms for {}ms", note.key, note.timestamp, note.duration)
            }
            EngineEvent::PlaybackStopped(_) => println!("playback finished"),
            EngineEvent::RecordingLimitReached => println!("recording limit reached"),
            _ => {}
        }
    }
}

fn list(engine: &Engine<TokioScheduler>) {
    let recordings = engine.list();
    if recordings.is_empty() {
        println!("No recordings");
        return;
    }
    for recording in recordings {
        let nps = recording
            .metadata
            .as_ref()
            .map(|m| m.avg_notes_per_second)
            .unwrap_or(0.0);
        println!(
            "{}  {:<24} {:>5} notes {:>8}ms  {:.2} notes/s",
            recording.id,
            recording.name,
            recording.note_count(),
            recording.duration,
            nps
        );
    }
}

async fn play(
    engine: &mut Engine<TokioScheduler>,
    fired: &mut UnboundedReceiver<Fired>,
    watcher: Option<&ConfigWatcher>,
    id: &str,
    speed: Option<f64>,
) -> Result<()> {
    let events = engine.subscribe();
    if !engine.play(id, speed) {
        bail!("could not play recording {}", id);
    }

    while engine.is_playing() {
        match fired.recv().await {
            Some(task) => engine.dispatch(task),
            None => break,
        }
        print_events(&events);
        apply_reloaded(engine, watcher);
    }
    Ok(())
}

async fn demo(
    engine: &mut Engine<TokioScheduler>,
    fired: &mut UnboundedReceiver<Fired>,
    watcher: Option<&ConfigWatcher>,
    name: Option<&str>,
) -> Result<()> {
    // key, note, octave, frequency, hold, gap after release
    let script: [(&str, &str, i8, f64, u64, u64); 8] = [
        ("a", "C", 4, 261.63, 180, 60),
        ("s", "D", 4, 293.66, 180, 60),
        ("d", "E", 4, 329.63, 180, 60),
        ("f", "F", 4, 349.23, 180, 60),
        ("g", "G", 4, 392.00, 360, 120),
        ("g", "G", 4, 392.00, 360, 120),
        ("h", "A", 4, 440.00, 180, 60),
        ("j", "B", 4, 493.88, 420, 0),
    ];

    let events = engine.subscribe();
    if !engine.start_recording(name) {
        bail!("engine busy");
    }

    for (key, note, octave, frequency, hold, gap) in script {
        let sound = SoundConfig::new("piano", note, octave, frequency);
        engine.note_start(key, &sound);
        tokio::time::sleep(Duration::from_millis(hold)).await;
        engine.note_end(key, &sound);
        tokio::time::sleep(Duration::from_millis(gap)).await;
        while let Ok(task) = fired.try_recv() {
            engine.dispatch(task);
        }
        print_events(&events);
        apply_reloaded(engine, watcher);
        if !engine.is_recording() {
            break;
        }
    }

    // A limit stop has already stored the recording
    let recording = match engine.stop_recording() {
        Some(recording) => recording,
        None => engine
            .list()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("recording was not stored"))?,
    };
    println!("saved {} ({}) {}ms", recording.name, recording.id, recording.duration);

    println!("replaying at 2x");
    if engine.play(&recording.id, Some(2.0)) {
        engine.run_until_idle(fired).await;
        print_events(&events);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keytape=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let data_dir = take_option(&mut args, "--data")?;
    let (config, config_path) = load_config(take_option(&mut args, "--config")?)?;

    if args.is_empty() || args[0] == "--help" {
        print_usage();
        return Ok(());
    }

    let data_dir = PathBuf::from(data_dir.unwrap_or_else(|| config.storage.path.clone()));
    let backend = FileStore::open(&data_dir)?.with_quota(config.storage.quota_bytes);
    let (scheduler, mut fired) = TokioScheduler::new();
    let mut engine = Engine::new(
        config,
        Arc::new(SystemClock::new()),
        scheduler,
        Box::new(backend),
    );

    match args[0].as_str() {
        "--list" => list(&engine),
        "--export" => {
            let id = arg(&args, 1, "recording id")?;
            let format = match args.get(2) {
                Some(name) => ExportFormat::from_name(name)
                    .ok_or_else(|| anyhow!("unknown export format: {}", name))?,
                None => engine.codec().format(),
            };
            let recording = engine
                .get(id)
                .ok_or_else(|| anyhow!("no recording with id {}", id))?;
            let text = engine.codec().export_as(recording, format)?;
            println!("{}", text);
        }
        "--import" => {
            let path = arg(&args, 1, "file to import")?;
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read import file: {:?}", path))?;
            let recording = engine
                .import(&text)
                .ok_or_else(|| anyhow!("{} is not a valid recording export", path))?;
            println!("imported {} as {}", recording.name, recording.id);
        }
        "--rename" => {
            let id = arg(&args, 1, "recording id")?;
            let name = arg(&args, 2, "new name")?;
            if !engine.rename(id, name) {
                bail!("could not rename {}", id);
            }
        }
        "--delete" => {
            let id = arg(&args, 1, "recording id")?;
            if !engine.delete(id) {
                bail!("no recording with id {}", id);
            }
        }
        "--play" => {
            let id = arg(&args, 1, "recording id")?.to_string();
            let speed = match args.get(2) {
                Some(s) => Some(
                    s.parse::<f64>()
                        .map_err(|_| anyhow!("Invalid speed: {}", s))?,
                ),
                None => None,
            };
            let watcher = watch_config(config_path.as_deref());
            play(&mut engine, &mut fired, watcher.as_ref(), &id, speed).await?;
        }
        "--demo" => {
            let name = args.get(1).cloned();
            let watcher = watch_config(config_path.as_deref());
            demo(&mut engine, &mut fired, watcher.as_ref(), name.as_deref()).await?;
        }
        other => {
            eprintln!("Unknown option: {}", other);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
