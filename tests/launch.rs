// Integration tests for the launch driver
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use launch_rs::communication::frame::Frame;
use launch_rs::launch::{self, Bootstrap, LaunchError, MOTION_SOURCE, PAUSED, SIMULATOR_POSITION};
use launch_rs::motion::oscillate::{MIN_POSITION, SPEED};
use launch_rs::motion::prediction::predict_move_duration;
use launch_rs::{
    Command, CommandLink, Config, HeadlessHost, HostBindings, LaunchDriver, ParamValue,
    TransportError,
};

#[derive(Clone, Default)]
struct RecordingLink {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl CommandLink for RecordingLink {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    fn recv_latest(&mut self) -> Result<(Option<Vec<u8>>, u64), TransportError> {
        Ok((None, 0))
    }
}

/// Host that journals every binding call and frame.
#[derive(Clone, Default)]
struct RecordingHost {
    journal: Arc<Mutex<Vec<String>>>,
}

impl HostBindings for RecordingHost {
    fn bind_param(&mut self, name: &str, _label: &str) {
        self.journal.lock().unwrap().push(format!("bind {}", name));
    }

    fn unbind_param(&mut self, name: &str) {
        self.journal.lock().unwrap().push(format!("unbind {}", name));
    }

    fn on_frame(&mut self, _dt: f32) {
        self.journal.lock().unwrap().push("frame".to_string());
    }
}

const DT: f32 = 1.0 / 60.0;

fn start(
    bootstrap: &Bootstrap,
    config: &Config,
    link: &RecordingLink,
) -> Result<LaunchDriver<RecordingLink>, LaunchError> {
    let link = link.clone();
    bootstrap.start(config, move |_| Ok(link), Box::new(HeadlessHost::new()))
}

#[test]
fn test_first_oscillation_command_is_sent() {
    let mut config = Config::default();
    config.motion.paused = false;
    let link = RecordingLink::default();
    let mut driver = start(&Bootstrap::new(), &config, &link).unwrap();

    let report = driver.tick(DT);
    assert_eq!(report.command, Some(Command { position: 80, speed: 30 }));
    assert!(report.transmitted);
    assert_eq!(driver.controller().last_sent_position(), 80);

    let sent = link.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    let frame = Frame::decode(&sent[0]).unwrap();
    assert_eq!((frame.position, frame.speed), (80, 30));
    assert_eq!(frame.duration, predict_move_duration(80.0, 30.0));
}

#[test]
fn test_second_driver_is_rejected_until_first_dropped() {
    let bootstrap = Bootstrap::new();
    let config = Config::default();
    let link = RecordingLink::default();
    let first = start(&bootstrap, &config, &link).unwrap();
    assert!(bootstrap.is_running());

    let connected = Arc::new(AtomicBool::new(false));
    let flag = connected.clone();
    let second = bootstrap.start(
        &config,
        move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(RecordingLink::default())
        },
        Box::new(HeadlessHost::new()),
    );
    assert!(matches!(second, Err(LaunchError::AlreadyRunning)));
    assert!(!connected.load(Ordering::SeqCst), "rejected start must not open a link");

    drop(first);
    assert!(!bootstrap.is_running());
    assert!(start(&bootstrap, &config, &link).is_ok());
}

#[test]
fn test_unavailable_link_runs_simulation_only() {
    let mut config = Config::default();
    config.motion.paused = false;
    let bootstrap = Bootstrap::new();
    let mut driver: LaunchDriver<RecordingLink> = bootstrap
        .start(&config, |_| Err(TransportError::Closed), Box::new(HeadlessHost::new()))
        .unwrap();
    assert!(!driver.controller().has_transport());

    let report = driver.tick(DT);
    assert!(report.command.is_some());
    assert!(!report.transmitted);
    assert_eq!(driver.controller().simulator().target(), 80.0);
}

#[test]
fn test_required_link_failure_is_fatal() {
    let mut config = Config::default();
    config.network.required = true;
    let bootstrap = Bootstrap::new();
    let result: Result<LaunchDriver<RecordingLink>, _> =
        bootstrap.start(&config, |_| Err(TransportError::Closed), Box::new(HeadlessHost::new()));
    assert!(matches!(result, Err(LaunchError::Transport(TransportError::Closed))));
    assert!(!bootstrap.is_running());
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = Config::default();
    config.motion.frame_rate = 0.0;
    let result = start(&Bootstrap::new(), &config, &RecordingLink::default());
    assert!(matches!(result, Err(LaunchError::Config(_))));
}

#[test]
fn test_unknown_start_source_is_rejected_before_connecting() {
    let mut config = Config::default();
    config.motion.source = "Bogus".to_string();
    let bootstrap = Bootstrap::new();
    let connected = Arc::new(AtomicBool::new(false));
    let flag = connected.clone();
    let result = bootstrap.start(
        &config,
        move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(RecordingLink::default())
        },
        Box::new(HeadlessHost::new()),
    );
    assert!(matches!(result, Err(LaunchError::Config(_))));
    assert!(!connected.load(Ordering::SeqCst));
    assert!(!bootstrap.is_running());
}

#[test]
fn test_saved_params_are_restored() {
    let mut config = Config::default();
    config.params.insert(SPEED.to_string(), ParamValue::Float(45.0));
    config.params.insert(PAUSED.to_string(), ParamValue::Bool(false));
    let mut driver = start(&Bootstrap::new(), &config, &RecordingLink::default()).unwrap();

    assert_eq!(driver.params().float(SPEED), Some(45.0));
    assert!(!driver.controller().is_paused());
    let report = driver.tick(DT);
    assert_eq!(report.command.map(|c| c.speed), Some(45));
}

#[test]
fn test_source_selection_through_params() {
    let config = Config::default();
    let mut driver = start(&Bootstrap::new(), &config, &RecordingLink::default()).unwrap();
    driver.tick(DT);
    assert_eq!(driver.controller().active_name(), Some("Oscillate"));

    driver.request(MOTION_SOURCE, "Pattern");
    driver.tick(DT);
    assert_eq!(driver.controller().active_name(), Some("Pattern"));

    // Not a registered source: rejected by the selector, nothing changes.
    driver.request(MOTION_SOURCE, "Bogus");
    driver.tick(DT);
    assert_eq!(driver.controller().active_name(), Some("Pattern"));
    assert_eq!(driver.params().choice(MOTION_SOURCE), Some("Pattern"));

    driver.request(MOTION_SOURCE, "");
    driver.tick(DT);
    assert_eq!(driver.controller().active_name(), None);
}

#[test]
fn test_changes_in_switch_frame_reach_new_source() {
    let mut config = Config::default();
    config.motion.source = "Pattern".to_string();
    let mut driver = start(&Bootstrap::new(), &config, &RecordingLink::default()).unwrap();
    driver.tick(DT);
    assert_eq!(driver.controller().active_name(), Some("Pattern"));

    driver.request(MOTION_SOURCE, "Oscillate");
    driver.request(MIN_POSITION, 75.0);
    driver.tick(DT);
    assert_eq!(driver.controller().active_name(), Some("Oscillate"));
    // Max stays at 80, so the minimum stroke pulls the new minimum back down.
    assert_eq!(driver.params().float(MIN_POSITION), Some(60.0));
}

#[test]
fn test_switch_unbinds_old_controls_before_binding_new() {
    let host = RecordingHost::default();
    let journal = host.journal.clone();
    let bootstrap = Bootstrap::new();
    let link = RecordingLink::default();
    let mut driver = bootstrap
        .start(&Config::default(), move |_| Ok(link), Box::new(host))
        .unwrap();

    driver.tick(DT);
    journal.lock().unwrap().clear();
    driver.request(MOTION_SOURCE, "Zone");
    driver.tick(DT);

    let journal = journal.lock().unwrap().clone();
    let last_unbind = journal.iter().rposition(|e| e.starts_with("unbind osc_")).unwrap();
    let first_bind = journal.iter().position(|e| e.starts_with("bind zone_")).unwrap();
    assert!(last_unbind < first_bind, "{:?}", journal);
    assert!(!journal.iter().any(|e| e.starts_with("bind osc_")));
    assert_eq!(journal.last().map(String::as_str), Some("frame"));
}

#[test]
fn test_launch_actions_toggle_pause() {
    let link = RecordingLink::default();
    let mut driver = start(&Bootstrap::new(), &Config::default(), &link).unwrap();
    assert!(driver.controller().is_paused());

    driver.toggle_launch();
    driver.tick(DT);
    assert!(!driver.controller().is_paused());
    assert_eq!(driver.params().flag(PAUSED), Some(false));

    driver.stop_launch();
    driver.tick(DT);
    assert!(driver.controller().is_paused());

    driver.start_launch();
    driver.tick(DT);
    assert!(!driver.controller().is_paused());
}

#[test]
fn test_simulator_position_is_published() {
    let link = RecordingLink::default();
    let mut driver = start(&Bootstrap::new(), &Config::default(), &link).unwrap();
    for _ in 0..20 {
        driver.tick(DT);
    }
    let position = driver.controller().simulator().position();
    assert!(position > 0.0);
    assert_eq!(driver.params().float(SIMULATOR_POSITION), Some(position));
}

#[test]
fn test_oversized_frame_step_does_not_panic() {
    let mut config = Config::default();
    config.motion.paused = false;
    let link = RecordingLink::default();
    let mut driver = start(&Bootstrap::new(), &config, &link).unwrap();
    driver.tick(DT);

    driver.tick(1.0e20);
    let position = driver.controller().simulator().position();
    assert!(position.is_finite());
    assert_eq!(driver.controller().simulator().target(), position);

    driver.tick(f32::INFINITY);
    assert!(driver.controller().simulator().position().is_finite());
    driver.tick(DT);
    assert!(!link.sent.lock().unwrap().is_empty());
}

#[test]
fn test_shutdown_is_idempotent() {
    let link = RecordingLink::default();
    let mut driver = start(&Bootstrap::new(), &Config::default(), &link).unwrap();
    driver.tick(DT);
    driver.shutdown();
    driver.shutdown();
    assert!(driver.is_shut_down());
    assert!(!driver.controller().has_transport());
    assert_eq!(driver.controller().active_name(), None);
    assert_eq!(driver.tick(DT).command, None);
}

#[tokio::test]
async fn test_run_loop_stops_on_shutdown_signal() {
    let mut config = Config::default();
    config.motion.paused = false;
    let bootstrap = Bootstrap::new();
    let link = RecordingLink::default();
    let mut driver = start(&bootstrap, &config, &link).unwrap();

    let stop = tokio::time::sleep(Duration::from_millis(100));
    let frames = launch::run(&mut driver, 200.0, stop).await;
    assert!(frames > 0);
    assert!(driver.is_shut_down());
    assert!(!link.sent.lock().unwrap().is_empty());

    drop(driver);
    assert!(!bootstrap.is_running());
}
