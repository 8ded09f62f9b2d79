//! Full pipeline runs with the synthetic capture source and a scripted model.

mod common;

use crossbeam_channel::Sender;
use rdev::Key;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use common::{row, RecordingPointer, ScriptedEngine, ScriptedPresenter};
use esp_overlay::aim::AimSettings;
use esp_overlay::capture::{CaptureThread, FrameSource, SyntheticDevice, SyntheticSettings};
use esp_overlay::detect::{Detector, DetectorConfig};
use esp_overlay::pipeline::{Components, Pipeline, PipelineError, PipelineSettings, StopReason};
use esp_overlay::state::SharedState;

fn settings() -> PipelineSettings {
    PipelineSettings {
        aim: AimSettings {
            sensitivity: 0.15,
            tick: Duration::from_millis(5),
        },
        ..PipelineSettings::default()
    }
}

fn synthetic(pipeline: &Pipeline, width: u32, height: u32) -> Box<dyn FrameSource> {
    Box::new(CaptureThread::<SyntheticDevice>::new(
        SyntheticSettings {
            width,
            height,
            fps: 120,
        },
        pipeline.frame_queue(),
        pipeline.state(),
    ))
}

/// One 20x20 candidate 10 px right of centre in a 64x64 input. On a 320x240
/// frame (scale 0.2, 8 px vertical pad) it lands at x 160..260, y 70..170,
/// 50 px right of the frame centre.
fn scripted_engine() -> ScriptedEngine {
    ScriptedEngine::new(64, 64, &[row(42.0, 32.0, 20.0, 20.0, 0.9, 0.9)])
}

struct Harness {
    components: Components,
    pointer: RecordingPointer,
    keys: Sender<Key>,
}

fn harness(pipeline: &Pipeline, engine: ScriptedEngine, presenter: ScriptedPresenter) -> Harness {
    let pointer = RecordingPointer::default();
    let (keys, key_rx) = crossbeam_channel::unbounded();
    Harness {
        components: Components {
            source: synthetic(pipeline, 320, 240),
            detector: Detector::new(Box::new(engine), DetectorConfig::default()),
            pointer: Box::new(pointer.clone()),
            presenter: Box::new(presenter),
            keys: key_rx,
        },
        pointer,
        keys,
    }
}

#[test]
fn test_runs_until_presenter_exits() {
    let pipeline = Pipeline::new(settings(), SharedState::new(true, true));
    let state = pipeline.state();

    let engine = scripted_engine();
    let calls = engine.calls();
    let (presenter, log) = ScriptedPresenter::new(5);
    let Harness {
        components,
        pointer,
        keys: _keys,
    } = harness(&pipeline, engine, presenter);

    let summary = pipeline.run(components).unwrap();

    assert_eq!(summary.reason, StopReason::UserExit);
    assert_eq!(summary.frames_presented, 5);
    assert!(calls.load(Ordering::SeqCst) >= 5);
    assert!(!state.is_running());
    assert_eq!(state.center(), Some((160, 120)));

    let log = log.lock().unwrap();
    assert_eq!(log.shown, 5);
    assert!(log.detections.iter().all(|&n| n == 1));
    assert!(log.esp_flags.iter().all(|&esp| esp));
    assert!(log.shut_down);

    // 50 px offset at 0.15 gain
    assert!(pointer.moves().iter().all(|&m| m == (7, 0)));
}

#[test]
fn test_exit_hotkey_shuts_down() {
    let pipeline = Pipeline::new(settings(), SharedState::new(false, false));
    let state = pipeline.state();
    let (presenter, log) = ScriptedPresenter::new(usize::MAX);
    let harness = harness(&pipeline, scripted_engine(), presenter);

    harness.keys.send(Key::F1).unwrap();
    harness.keys.send(Key::F4).unwrap();

    let started = Instant::now();
    let summary = pipeline.run(harness.components).unwrap();

    assert_eq!(summary.reason, StopReason::ShutdownRequested);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!state.is_running());
    assert!(state.esp_enabled());
    assert!(log.lock().unwrap().shut_down);
    // aim stayed disabled
    assert!(harness.pointer.moves().is_empty());
}

#[test]
fn test_esp_off_still_presents_frames() {
    let pipeline = Pipeline::new(settings(), SharedState::new(false, false));
    let (presenter, log) = ScriptedPresenter::new(3);
    let harness = harness(&pipeline, scripted_engine(), presenter);

    let summary = pipeline.run(harness.components).unwrap();

    assert_eq!(summary.reason, StopReason::UserExit);
    let log = log.lock().unwrap();
    assert_eq!(log.shown, 3);
    assert!(log.esp_flags.iter().all(|&esp| !esp));
}

#[test]
fn test_zero_resolution_source_is_fatal() {
    let pipeline = Pipeline::new(settings(), SharedState::default());
    let state = pipeline.state();
    let (presenter, log) = ScriptedPresenter::new(1);
    let mut harness = harness(&pipeline, scripted_engine(), presenter);
    harness.components.source = synthetic(&pipeline, 0, 240);

    let err = pipeline.run(harness.components).unwrap_err();

    assert!(matches!(err, PipelineError::Capture(_)), "{err}");
    assert!(!state.is_running());
    assert_eq!(log.lock().unwrap().shown, 0);
}
