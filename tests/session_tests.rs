// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for negotiation sessions

use camcaps::backends::camera::{CameraDevice, CapabilitySource, Resolution, Selection};
use camcaps::command_sink::{Command, CommandSink};
use camcaps::constants::keys;
use camcaps::negotiation::{JsonFileStore, MemoryStore, NegotiationSession, Outcome, PreferenceStore};
use camcaps::{AppError, AppResult, Config};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned capability text per device, optionally delayed
#[derive(Default)]
struct FakeSource {
    outputs: HashMap<String, (Duration, Option<String>)>,
}

impl FakeSource {
    fn with(mut self, device: &str, delay_ms: u64, output: Option<&str>) -> Self {
        self.outputs.insert(
            device.to_string(),
            (Duration::from_millis(delay_ms), output.map(str::to_string)),
        );
        self
    }
}

impl CapabilitySource for FakeSource {
    async fn query_formats(&self, device_path: &str) -> Option<String> {
        let (delay, output) = self.outputs.get(device_path).cloned()?;
        tokio::time::sleep(delay).await;
        output
    }
}

/// Records every command; can be told to fail
#[derive(Clone, Default)]
struct RecordingSink {
    sent: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingSink {
    fn lines(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl CommandSink for RecordingSink {
    fn send(&self, command: &Command) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Sink("no reader".to_string()));
        }
        self.sent.lock().unwrap().push(command.to_string());
        Ok(())
    }
}

const WEBCAM: &str = "Size: Discrete 1280x720\n(30.000 fps)\n(60.000 fps)\nSize: Discrete 640x480\n(30.000 fps)\n";
const CAPTURE_CARD: &str = "Size: Discrete 1920x1080\n(60.000 fps)\n";

fn camera(path: &str) -> CameraDevice {
    CameraDevice {
        path: path.to_string(),
        name: format!("Camera ({})", path),
    }
}

#[tokio::test]
async fn test_refresh_stores_and_announces_selection() {
    let source = FakeSource::default().with("/dev/video0", 0, Some(WEBCAM));
    let sink = RecordingSink::default();
    let mut store = MemoryStore::new();
    store.set(keys::RESOLUTION, json!("1280x720")).unwrap();
    store.set(keys::FPS, json!(60)).unwrap();

    let session = NegotiationSession::new(source, store, sink.clone(), &Config::default());
    let outcome = session.refresh("/dev/video0").await;

    assert_eq!(
        outcome,
        Outcome::Applied(Selection {
            resolution: Resolution::new(1280, 720),
            fps: 60
        })
    );
    assert_eq!(sink.lines(), vec!["RESOLUTION:1280x720", "FPS:60"]);
}

#[tokio::test]
async fn test_unavailable_tool_falls_back_to_defaults() {
    let source = FakeSource::default();
    let sink = RecordingSink::default();
    let session = NegotiationSession::new(source, MemoryStore::new(), sink.clone(), &Config::default());

    let outcome = session.refresh("/dev/video3").await;

    assert_eq!(
        outcome.selection(),
        Some(Selection {
            resolution: Resolution::new(640, 480),
            fps: 15
        })
    );
    assert_eq!(
        session.with_store(|store| store.preferred_resolution()),
        Some("640x480".to_string())
    );
    assert_eq!(session.with_store(|store| store.preferred_fps()), Some(15));
}

#[tokio::test]
async fn test_rapid_switch_discards_stale_result() {
    let source = FakeSource::default()
        .with("/dev/video0", 200, Some(WEBCAM))
        .with("/dev/video2", 0, Some(CAPTURE_CARD));
    let sink = RecordingSink::default();
    let session = NegotiationSession::new(source, MemoryStore::new(), sink.clone(), &Config::default());

    let (first, second) = tokio::join!(
        session.switch_device("/dev/video0"),
        session.switch_device("/dev/video2")
    );

    assert_eq!(first, Outcome::Superseded);
    assert_eq!(
        second.selection(),
        Some(Selection {
            resolution: Resolution::new(1920, 1080),
            fps: 60
        })
    );

    // The slow probe finished last but changed nothing
    assert_eq!(
        session.with_store(|store| store.preferred_resolution()),
        Some("1920x1080".to_string())
    );
    assert_eq!(
        session.with_store(|store| store.input_device()),
        Some("/dev/video2".to_string())
    );
    assert_eq!(
        sink.lines(),
        vec![
            "DEVICE:/dev/video0",
            "DEVICE:/dev/video2",
            "RESOLUTION:1920x1080",
            "FPS:60"
        ]
    );
}

#[tokio::test]
async fn test_sink_failure_is_not_fatal() {
    let source = FakeSource::default().with("/dev/video0", 0, Some(WEBCAM));
    let sink = RecordingSink {
        fail: true,
        ..RecordingSink::default()
    };
    let session = NegotiationSession::new(source, MemoryStore::new(), sink, &Config::default());

    let outcome = session.switch_device("/dev/video0").await;
    assert_eq!(
        outcome.selection(),
        Some(Selection {
            resolution: Resolution::new(640, 480),
            fps: 30
        })
    );
}

#[tokio::test]
async fn test_startup_prefers_stored_device_when_present() {
    let source = FakeSource::default()
        .with("/dev/video0", 0, Some(WEBCAM))
        .with("/dev/video2", 0, Some(CAPTURE_CARD));
    let sink = RecordingSink::default();
    let mut store = MemoryStore::new();
    store.set(keys::INPUT_DEVICE, json!("/dev/video2")).unwrap();

    let session = NegotiationSession::new(source, store, sink.clone(), &Config::default());
    session
        .startup(&[camera("/dev/video0"), camera("/dev/video2")])
        .await;

    assert_eq!(sink.lines()[0], "DEVICE:/dev/video2");
}

#[tokio::test]
async fn test_startup_ignores_vanished_device() {
    let source = FakeSource::default().with("/dev/video0", 0, Some(WEBCAM));
    let sink = RecordingSink::default();
    let mut store = MemoryStore::new();
    store.set(keys::INPUT_DEVICE, json!("/dev/video4")).unwrap();

    let session = NegotiationSession::new(source, store, sink.clone(), &Config::default());
    session.startup(&[camera("/dev/video0")]).await;

    assert_eq!(sink.lines()[0], "DEVICE:/dev/video0");
    assert_eq!(
        session.with_store(|store| store.input_device()),
        Some("/dev/video0".to_string())
    );
}

#[tokio::test]
async fn test_file_store_written_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let source = FakeSource::default().with("/dev/video0", 0, Some(WEBCAM));

    let session = NegotiationSession::new(
        source,
        JsonFileStore::open(&path),
        RecordingSink::default(),
        &Config::default(),
    );
    session.switch_device("/dev/video0").await;

    let reopened = JsonFileStore::open(&path);
    assert_eq!(reopened.preferred_resolution().as_deref(), Some("640x480"));
    assert_eq!(reopened.preferred_fps(), Some(30));
    assert_eq!(reopened.input_device().as_deref(), Some("/dev/video0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_refresh_waiting_on_store_is_discarded() {
    let source = FakeSource::default()
        .with("/dev/video0", 0, Some(WEBCAM))
        .with("/dev/video2", 0, Some(CAPTURE_CARD));
    let sink = RecordingSink::default();
    let session = Arc::new(NegotiationSession::new(
        source,
        MemoryStore::new(),
        sink.clone(),
        &Config::default(),
    ));

    // Hold the store so both refreshes finish probing and queue on it
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let holder = {
        let session = Arc::clone(&session);
        std::thread::spawn(move || {
            session.with_store(|_| {
                locked_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
        })
    };
    locked_rx.recv().unwrap();

    let older = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.refresh("/dev/video0").await })
    };
    std::thread::sleep(Duration::from_millis(200));

    let newer = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.refresh("/dev/video2").await })
    };
    std::thread::sleep(Duration::from_millis(200));

    release_tx.send(()).unwrap();
    holder.join().unwrap();

    assert_eq!(older.await.unwrap(), Outcome::Superseded);
    assert_eq!(
        newer.await.unwrap().selection(),
        Some(Selection {
            resolution: Resolution::new(1920, 1080),
            fps: 60
        })
    );
    assert_eq!(
        session.with_store(|store| store.preferred_resolution()),
        Some("1920x1080".to_string())
    );
    assert_eq!(sink.lines(), vec!["RESOLUTION:1920x1080", "FPS:60"]);
}
