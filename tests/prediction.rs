// Integration tests for the actuator response model
use launch_rs::motion::prediction::{
    predict_distance_traveled, predict_move_duration, predict_move_speed, predict_move_speed_in,
    SpeedBand,
};

// The two exponents of the fit are not exact inverses, so a round trip is off
// by up to ~2% at the slow end of the band.
const ROUND_TRIP_TOLERANCE: f32 = 0.025;

#[test]
fn test_speed_duration_round_trip() {
    for speed in (10..=90).step_by(5) {
        let speed = speed as f32;
        for distance in [5.0f32, 20.0, 45.0, 70.0, 90.0] {
            let duration = predict_move_duration(distance, speed);
            let recovered = predict_move_speed(0.0, distance, duration);
            let error = (recovered - speed).abs() / speed;
            assert!(
                error <= ROUND_TRIP_TOLERANCE,
                "speed {} over {} recovered as {} ({:.2}%)",
                speed,
                distance,
                recovered,
                error * 100.0
            );
        }
    }
}

#[test]
fn test_direction_of_move_does_not_matter() {
    let up = predict_move_speed(10.0, 80.0, 0.5);
    let down = predict_move_speed(80.0, 10.0, 0.5);
    assert_eq!(up, down);
}

#[test]
fn test_duration_decreases_with_speed() {
    let mut previous = f32::INFINITY;
    for speed in 10..=90 {
        let duration = predict_move_duration(50.0, speed as f32);
        assert!(duration < previous, "duration not decreasing at speed {}", speed);
        previous = duration;
    }
}

#[test]
fn test_duration_scales_with_distance() {
    let half = predict_move_duration(45.0, 40.0);
    let full = predict_move_duration(90.0, 40.0);
    assert!((full - 2.0 * half).abs() < 1e-5);
}

#[test]
fn test_distance_increases_with_time() {
    let mut previous = f32::NEG_INFINITY;
    for step in 0..50 {
        let distance = predict_distance_traveled(50.0, step as f32 * 0.01);
        assert!(distance > previous);
        previous = distance;
    }
}

#[test]
fn test_distance_matches_duration_model() {
    // Covering the predicted duration of a move travels exactly that move.
    for speed in [15.0f32, 30.0, 60.0, 85.0] {
        let duration = predict_move_duration(90.0, speed);
        let distance = predict_distance_traveled(speed, duration);
        assert!((distance - 90.0).abs() < 1e-3, "speed {} travelled {}", speed, distance);
    }
}

#[test]
fn test_zero_edge_cases() {
    assert_eq!(predict_move_duration(0.0, 50.0), 0.0);
    assert_eq!(predict_move_duration(-3.0, 50.0), 0.0);
    assert_eq!(predict_distance_traveled(0.0, 1.0), 0.0);
    assert_eq!(predict_distance_traveled(-5.0, 1.0), 0.0);
    assert_eq!(predict_distance_traveled(50.0, 0.0), 0.0);
}

#[test]
fn test_speed_saturates_to_band() {
    // Very long and very short moves hit the band edges.
    assert_eq!(predict_move_speed(0.0, 1.0, 10.0), 10.0);
    assert_eq!(predict_move_speed(0.0, 90.0, 0.01), 90.0);

    let band = SpeedBand::new(20.0, 60.0);
    assert_eq!(predict_move_speed_in(0.0, 1.0, 10.0, band), 20.0);
    assert_eq!(predict_move_speed_in(0.0, 90.0, 0.01, band), 60.0);
}
