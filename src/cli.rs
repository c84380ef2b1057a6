// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! Each command builds a small tokio runtime for the probe calls and runs
//! to completion; nothing stays resident.

use camcaps::backends::camera::{
    CameraDevice, CapabilityMap, V4l2Ctl, enumerate_cameras, parse_capabilities,
};
use camcaps::command_sink::{CommandSink, FifoSink, NullSink};
use camcaps::constants::keys;
use camcaps::negotiation::{JsonFileStore, NegotiationSession, Outcome, PreferenceStore};
use camcaps::Config;
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;
use tokio::runtime::Runtime;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn runtime() -> Result<Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn open_store(config: &Config) -> JsonFileStore {
    JsonFileStore::open(config.settings_path())
}

fn session(
    config: &Config,
    send: bool,
) -> NegotiationSession<V4l2Ctl, JsonFileStore, Box<dyn CommandSink>> {
    let sink: Box<dyn CommandSink> = if send {
        Box::new(FifoSink::new(&config.command_pipe))
    } else {
        Box::new(NullSink)
    };
    NegotiationSession::new(V4l2Ctl::from_config(config), open_store(config), sink, config)
}

/// Device given on the command line, else the stored one if still present, else the first
fn resolve_device(explicit: Option<String>, stored: Option<String>, cameras: &[CameraDevice]) -> String {
    explicit
        .or_else(|| stored.filter(|path| cameras.iter().any(|camera| &camera.path == path)))
        .or_else(|| cameras.first().map(|camera| camera.path.clone()))
        .unwrap_or_else(|| camcaps::constants::defaults::DEVICE_PATH.to_string())
}

fn print_capabilities(capabilities: &CapabilityMap) {
    if capabilities.is_empty() {
        println!("  (no formats reported)");
        return;
    }
    for (resolution, rates) in capabilities.iter() {
        let rates: Vec<String> = rates.iter().map(u32::to_string).collect();
        println!("  {:>10}  {} fps", resolution.to_string(), rates.join(", "));
    }
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Applied(selection) => println!("Selected: {}", selection),
        Outcome::Superseded => println!("Superseded by a newer request"),
    }
}

/// List capture devices
pub fn list_cameras(config: &Config) -> CliResult {
    let cameras = runtime()?.block_on(enumerate_cameras(config));

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  {}  {}", camera.path, camera.name);
    }

    Ok(())
}

/// Probe one device and print its capability map
///
/// A failed query is an error here rather than an empty map.
pub fn probe_device(config: &Config, device: Option<String>, as_json: bool) -> CliResult {
    let rt = runtime()?;
    let cameras = rt.block_on(enumerate_cameras(config));
    let device = resolve_device(device, open_store(config).input_device(), &cameras);

    let capabilities =
        rt.block_on(V4l2Ctl::from_config(config).try_probe(&device, &config.parser))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&capabilities)?);
    } else {
        println!("Formats for {}:", device);
        print_capabilities(&capabilities);
    }

    Ok(())
}

/// Parse capability text from a file or stdin
pub fn parse_file(config: &Config, file: Option<PathBuf>) -> CliResult {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let capabilities = parse_capabilities(&text, &config.parser);
    println!("{}", serde_json::to_string_pretty(&capabilities)?);

    Ok(())
}

/// Negotiate for a device, optionally overriding the stored preference first
pub fn negotiate(
    config: &Config,
    device: Option<String>,
    resolution: Option<String>,
    fps: Option<u32>,
    no_send: bool,
) -> CliResult {
    let rt = runtime()?;
    let session = session(config, !no_send);

    let cameras = rt.block_on(enumerate_cameras(config));
    let stored = session.with_store(|store| store.input_device());
    let device = resolve_device(device, stored, &cameras);

    session.with_store(|store| -> camcaps::AppResult<()> {
        if let Some(resolution) = &resolution {
            store.set(keys::RESOLUTION, json!(resolution))?;
        }
        if let Some(fps) = fps {
            store.set(keys::FPS, json!(fps))?;
        }
        Ok(())
    })?;

    let outcome = rt.block_on(session.refresh(&device));
    println!("Device: {}", device);
    print_outcome(&outcome);

    Ok(())
}

/// Switch to a device and negotiate for it
pub fn select_device(config: &Config, device: &str) -> CliResult {
    let outcome = runtime()?.block_on(session(config, true).switch_device(device));
    print_outcome(&outcome);
    Ok(())
}

/// Restore the stored device (or the first available) and negotiate
pub fn startup(config: &Config) -> CliResult {
    let rt = runtime()?;
    let session = session(config, true);

    let cameras = rt.block_on(enumerate_cameras(config));
    let outcome = rt.block_on(session.startup(&cameras));
    print_outcome(&outcome);

    Ok(())
}
