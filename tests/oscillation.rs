// Integration tests for the oscillating motion source
use launch_rs::motion::oscillate::{OscillateSource, MAX_POSITION, MIN_POSITION, SPEED};
use launch_rs::motion::prediction::{predict_move_duration, SpeedBand};
use launch_rs::motion::{Command, MotionSource, SourceContext};
use launch_rs::{HeadlessHost, ParamRegistry};

const DT: f32 = 1.0 / 60.0;

fn setup() -> (OscillateSource, ParamRegistry, HeadlessHost) {
    let mut source = OscillateSource::default();
    let mut params = ParamRegistry::new();
    source.configure(&mut params);
    (source, params, HeadlessHost::new())
}

#[test]
fn test_first_reversal_targets_max() {
    let (mut source, mut params, mut host) = setup();
    let mut ctx = SourceContext {
        params: &mut params,
        host: &mut host,
        speed_band: SpeedBand::default(),
    };
    source.activate(&mut ctx);

    let command = source.tick(DT, &mut ctx);
    assert_eq!(command, Some(Command { position: 80, speed: 30 }));

    let expected = predict_move_duration(70.0, 30.0) + 0.02;
    assert!((source.direction_change_duration() - expected).abs() < 1e-6);
    // The overshoot of the already-expired timer shortens the first period.
    assert!((source.time_to_reversal() - (expected - DT)).abs() < 1e-5);
}

#[test]
fn test_reversals_do_not_drift() {
    let (mut source, mut params, mut host) = setup();
    let mut ctx = SourceContext {
        params: &mut params,
        host: &mut host,
        speed_band: SpeedBand::default(),
    };
    source.activate(&mut ctx);

    let period = (predict_move_duration(70.0, 30.0) + 0.02) as f64;
    let mut emissions: Vec<(f64, Command)> = Vec::new();
    let mut frame: u64 = 0;
    while emissions.len() < 1001 {
        frame += 1;
        if let Some(command) = source.tick(DT, &mut ctx) {
            emissions.push((frame as f64 * DT as f64, command));
        }
    }

    for (k, (time, command)) in emissions.iter().enumerate().skip(1) {
        let ideal = k as f64 * period;
        assert!(
            (time - ideal).abs() <= 2.0 * DT as f64,
            "reversal {} at {:.4}s, expected {:.4}s",
            k,
            time,
            ideal
        );
        let expected = if k % 2 == 0 { 80 } else { 10 };
        assert_eq!(command.position, expected, "reversal {}", k);
    }
}

#[test]
fn test_frame_rate_does_not_change_timing() {
    let period = predict_move_duration(70.0, 30.0) + 0.02;
    for dt in [1.0 / 30.0f32, 1.0 / 144.0] {
        let (mut source, mut params, mut host) = setup();
        let mut ctx = SourceContext {
            params: &mut params,
            host: &mut host,
            speed_band: SpeedBand::default(),
        };
        source.activate(&mut ctx);

        let mut elapsed = 0.0f32;
        let mut reversals = 0;
        while elapsed < period * 20.0 {
            elapsed += dt;
            if source.tick(dt, &mut ctx).is_some() {
                reversals += 1;
            }
        }
        // One reversal at start, then one per elapsed period.
        assert!((20..=22).contains(&reversals), "dt {} gave {} reversals", dt, reversals);
    }
}

#[test]
fn test_minimum_stroke_is_enforced() {
    let (mut source, mut params, mut host) = setup();
    let mut ctx = SourceContext {
        params: &mut params,
        host: &mut host,
        speed_band: SpeedBand::default(),
    };
    source.activate(&mut ctx);

    ctx.params.request(MIN_POSITION, 75.0);
    for change in ctx.params.drain_changes() {
        source.on_config_changed(&change, &mut ctx);
    }
    assert_eq!(ctx.params.float(MIN_POSITION), Some(60.0));

    ctx.params.request(MAX_POSITION, 65.0);
    for change in ctx.params.drain_changes() {
        source.on_config_changed(&change, &mut ctx);
    }
    assert_eq!(ctx.params.float(MAX_POSITION), Some(80.0));
}

#[test]
fn test_speed_change_applies_at_next_reversal() {
    let (mut source, mut params, mut host) = setup();
    let mut ctx = SourceContext {
        params: &mut params,
        host: &mut host,
        speed_band: SpeedBand::default(),
    };
    source.activate(&mut ctx);
    assert_eq!(source.tick(DT, &mut ctx).map(|c| c.speed), Some(30));

    ctx.params.set(SPEED, 60.0).unwrap();
    let mut next = None;
    while next.is_none() {
        next = source.tick(DT, &mut ctx);
    }
    assert_eq!(next, Some(Command { position: 10, speed: 60 }));
    let expected = predict_move_duration(70.0, 60.0) + 0.02;
    assert!((source.direction_change_duration() - expected).abs() < 1e-6);
}
