//! Whole-model scenarios driven by a minimal point-mass integrator.
//!
//! The chassis is held level at ride height and only its speed along the
//! heading is integrated, which is all the straight-line scenarios need.

use approx::assert_relative_eq;
use nalgebra::UnitQuaternion;

use kart_physics::config::{KartConfig, KartProfile};
use kart_physics::input::DriverInput;
use kart_physics::kart_model::drivetrain::TorqueCurve;
use kart_physics::kart_model::types::{AppliedForce, ForceSource, Pt3, Vec3, WheelId};
use kart_physics::kart_model::{FlatGround, KartDynamics, KinematicState};

struct StraightLine {
    config: KartConfig,
    model: KartDynamics,
    speed: f32,
    forces: Vec<AppliedForce>,
}

impl StraightLine {
    fn new(config: KartConfig, speed: f32) -> Self {
        let model = KartDynamics::new(config.clone()).unwrap();
        Self { config, model, speed, forces: Vec::new() }
    }

    fn ride_height(&self) -> f32 {
        let s = &self.config.suspension.rear;
        s.rest_length + s.wheel_radius
    }

    fn state(&self) -> KinematicState {
        KinematicState::from_rigid_pose(
            &self.config.chassis,
            Pt3::new(0.0, self.ride_height(), 0.0),
            &UnitQuaternion::identity(),
            Vec3::new(0.0, 0.0, -self.speed),
            Vec3::zeros(),
        )
    }

    /// One tick; returns the net force along the heading.
    fn tick(&mut self, input: DriverInput) -> f32 {
        let state = self.state();
        self.forces.clear();
        self.model.step(&input, &state, &FlatGround::default(), &mut self.forces);

        let along: f32 = self.forces.iter().map(|f| f.force.dot(&state.chassis.forward)).sum();
        self.speed += along / self.config.chassis.mass * self.model.dt().secs();
        along
    }
}

#[test]
fn full_throttle_saturates_at_max_speed() {
    let config = KartConfig::default();
    let max_speed = config.drivetrain.max_speed;
    let mut run = StraightLine::new(config, 0.0);

    let mut top = 0.0f32;
    for _ in 0..3_000 {
        run.tick(DriverInput::new(0.0, 1.0, false));
        top = top.max(run.speed);
    }

    assert!(run.speed > max_speed - 0.5, "ended at {}", run.speed);
    assert!(top < max_speed + 0.1, "overshot to {top}");
    assert!(run.model.telemetry().speed > max_speed - 0.5);
}

#[test]
fn tall_gearing_still_reaches_max_speed() {
    let mut config = KartConfig::default();
    config
        .apply_profile(&KartProfile { gear_ratio: Some(15.0), ..KartProfile::default() })
        .unwrap();
    let max_speed = config.drivetrain.max_speed;
    let mut run = StraightLine::new(config, 0.0);
    // Redline arrives before max_speed with this ratio.
    assert!(run.model.drivetrain().coupled_rpm(max_speed) > run.model.config().engine.max_rpm);

    for _ in 0..6_000 {
        run.tick(DriverInput::new(0.0, 1.0, false));
    }

    assert!(run.speed > max_speed - 0.5, "ended at {}", run.speed);
    assert!(run.speed < max_speed + 0.1);
    assert!(run.model.telemetry().red_line);
}

#[test]
fn no_speed_cap_in_reverse_governor() {
    let config = KartConfig::default();
    let mut run = StraightLine::new(config, 0.0);
    for _ in 0..200 {
        run.tick(DriverInput::new(0.0, -1.0, false));
    }
    assert!(run.speed < -1.0);
    assert!(!run.model.telemetry().governed);
}

#[test]
fn stationary_kart_at_rest_height_has_no_suspension_or_anti_roll_force() {
    let mut run = StraightLine::new(KartConfig::default(), 0.0);
    for _ in 0..50 {
        let along = run.tick(DriverInput::default());
        assert_relative_eq!(along, 0.0, epsilon = 1e-3);
    }

    for id in WheelId::ALL {
        let w = run.model.telemetry().wheel(id);
        assert!(w.in_contact);
        assert_relative_eq!(w.compression, 0.0, epsilon = 1e-5);
        assert_relative_eq!(w.suspension_force, 0.0, epsilon = 0.5);
        assert_eq!(w.anti_roll_force, 0.0);
    }
    assert!(!run.forces.iter().any(|f| matches!(f.source, ForceSource::AntiRoll(_))));
    assert_eq!(run.speed, 0.0);
}

#[test]
fn handbrake_brings_the_kart_to_a_stop() {
    let mut run = StraightLine::new(KartConfig::default(), 10.0);
    for _ in 0..250 {
        run.tick(DriverInput::new(0.0, 0.0, true));
    }
    assert!(run.speed.abs() < 0.15, "still moving at {}", run.speed);
}

#[test]
fn coasting_slows_down_from_drag_and_rolling_resistance() {
    let mut run = StraightLine::new(KartConfig::default(), 15.0);
    let first = run.tick(DriverInput::default());
    assert!(first < 0.0);

    for _ in 0..100 {
        run.tick(DriverInput::default());
    }
    assert!(run.speed < 15.0 && run.speed > 0.0);
    let drag = run.model.telemetry().aero.drag;
    let expected = 0.5 * 1.225 * 0.9 * 0.6 * run.speed * run.speed;
    assert_relative_eq!(drag, expected, max_relative = 0.05);
}

struct Flat(f32);

impl TorqueCurve for Flat {
    fn torque_at(&self, _rpm: f32) -> f32 {
        self.0
    }
}

#[test]
fn custom_torque_curve_drives_the_tires() {
    let config = KartConfig::default();
    let mut model = KartDynamics::with_torque_curve(config.clone(), Box::new(Flat(10.0))).unwrap();
    let state = KinematicState::from_rigid_pose(
        &config.chassis,
        Pt3::new(0.0, 0.75, 0.0),
        &UnitQuaternion::identity(),
        Vec3::zeros(),
        Vec3::zeros(),
    );

    let mut forces = Vec::new();
    model.step(&DriverInput::new(0.0, 1.0, false), &state, &FlatGround::default(), &mut forces);

    // 10 N*m * 8 * 0.9 / 2 wheels / 0.3 m = 120 N per rear tire.
    let rear = forces
        .iter()
        .find(|f| f.source == ForceSource::Tire(WheelId::RL))
        .unwrap();
    assert_relative_eq!(rear.force.dot(&state.chassis.forward), 120.0, epsilon = 1e-2);
}
