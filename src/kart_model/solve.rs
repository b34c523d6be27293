// ==============================================================================
// solve.rs — ONE FIXED TICK OF KART DYNAMICS
// ------------------------------------------------------------------------------
// KartDynamics owns every piece of per-tick state (corner compressions, engine
// rpm, tire grip, telemetry) and runs the fixed pipeline:
//
//   Phase 1: suspension, all four corners     (writes last_compression + contact)
//   Phase 2: anti-roll, once per axle         (reads what phase 1 just wrote)
//   Phase 3: drivetrain, once per tick        (throttle + road speed -> torque)
//   Phase 4: tires, once per wheel            (front frames steered here)
//   Phase 5: aero, once per chassis
//
// Every force leaves through the ForceSink; the host integrates them.
//
// Notes:
// - Mount poses arrive chassis-fixed. Steering only turns the tire frame used
//   for slip and force directions in phase 4.
// - Normal load per tire is the static share unless NormalLoadModel::Dynamic
//   is configured, in which case it is this tick's suspension + anti-roll load.
// ==============================================================================

use tracing::{debug, info, trace};

use crate::config::{KartConfig, NormalLoadModel};
use crate::error::ConfigError;
use crate::input::DriverInput;
use crate::kart_model::aero;
use crate::kart_model::anti_roll;
use crate::kart_model::drivetrain::{Drivetrain, TorqueCurve, TorqueCut};
use crate::kart_model::kinematics::{slip_components, ForceSink, GroundProbe, KinematicState};
use crate::kart_model::steering::{steer_mount, Steering};
use crate::kart_model::suspension::WheelCorner;
use crate::kart_model::tire::{Tire, TireInput};
use crate::kart_model::types::{Axle, FixedDt, ForceSource, Side, Vec3, WheelId};
use crate::telemetry::Telemetry;

#[derive(Debug)]
pub struct KartDynamics {
    config: KartConfig,
    dt: FixedDt,
    corners: [WheelCorner; 4],
    tires: [Tire; 4],
    drivetrain: Drivetrain,
    steering: Steering,
    telemetry: Telemetry,
    tick: u64,
}

impl KartDynamics {
    /// Validate `config` and build the model. Nothing after this returns an error.
    pub fn new(config: KartConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let drivetrain = Drivetrain::new(&config.drivetrain, &config.engine)?;
        Self::build(config, drivetrain)
    }

    /// Same as [`KartDynamics::new`] with a caller-supplied engine curve.
    pub fn with_torque_curve(config: KartConfig, curve: Box<dyn TorqueCurve>) -> Result<Self, ConfigError> {
        config.validate()?;
        let drivetrain = Drivetrain::with_curve(&config.drivetrain, &config.engine, curve);
        Self::build(config, drivetrain)
    }

    fn build(config: KartConfig, drivetrain: Drivetrain) -> Result<Self, ConfigError> {
        let dt = FixedDt::new(config.simulation.fixed_dt)?;
        let corners = WheelId::ALL.map(|id| WheelCorner::new(id, config.static_wheel_load(id)));
        let tires = WheelId::ALL.map(Tire::new);
        let steering = Steering::new(&config.steering);

        info!(
            mass = config.chassis.mass,
            dt = dt.secs(),
            front_load = corners[0].static_load,
            rear_load = corners[2].static_load,
            "kart dynamics initialized"
        );

        Ok(Self {
            config,
            dt,
            corners,
            tires,
            drivetrain,
            steering,
            telemetry: Telemetry::default(),
            tick: 0,
        })
    }

    pub fn config(&self) -> &KartConfig {
        &self.config
    }

    pub fn dt(&self) -> FixedDt {
        self.dt
    }

    pub fn corner(&self, id: WheelId) -> &WheelCorner {
        &self.corners[id.index()]
    }

    pub fn tire(&self, id: WheelId) -> &Tire {
        &self.tires[id.index()]
    }

    pub fn drivetrain(&self) -> &Drivetrain {
        &self.drivetrain
    }

    pub fn steering(&self) -> &Steering {
        &self.steering
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Run one fixed tick and push every resulting force into `sink`.
    pub fn step(
        &mut self,
        input: &DriverInput,
        state: &KinematicState,
        probe: &impl GroundProbe,
        sink: &mut impl ForceSink,
    ) -> &Telemetry {
        let input = input.clamped();
        let dt = self.dt;
        self.tick += 1;

        // --------------------------------------------------
        // Phase 1: suspension (all four corners first)
        // --------------------------------------------------
        let airborne = self.config.simulation.airborne;
        for id in WheelId::ALL {
            let wheel = state.wheel(id);
            let cfg = self.config.suspension.for_axle(id.axle());
            let distance = probe.cast_down(&wheel.mount.position, &wheel.mount.down(), cfg.probe_length());

            let corner = &mut self.corners[id.index()];
            if let Some((force, point)) = corner.simulate(&wheel.mount, distance, dt, cfg, airborne) {
                sink.apply_force(ForceSource::Suspension(id), force, point);
            }
        }

        // --------------------------------------------------
        // Phase 2: anti-roll (per axle, reads phase 1 output)
        // --------------------------------------------------
        let mut arb_force = [0.0f32; 4];
        for axle in [Axle::Front, Axle::Rear] {
            let left = WheelId::new(axle, Side::Left);
            let right = WheelId::new(axle, Side::Right);
            let forces = anti_roll::axle_forces(
                &self.corners[left.index()],
                &self.corners[right.index()],
                self.config.anti_roll.stiffness(axle),
                &self.config.anti_roll,
            );

            for (id, magnitude) in [(left, forces.left), (right, forces.right)] {
                arb_force[id.index()] = magnitude;
                if magnitude != 0.0 {
                    let mount = &state.wheel(id).mount;
                    sink.apply_force(ForceSource::AntiRoll(id), mount.up * magnitude, mount.position);
                }
            }
        }

        // --------------------------------------------------
        // Phase 3: drivetrain (once)
        // --------------------------------------------------
        let road_speed = state.chassis.speed_along_forward();
        self.drivetrain.simulate(input.throttle, road_speed, dt);
        let driven_axle = self.drivetrain.driven_axle();
        let torque_per_wheel = self.drivetrain.torque_per_wheel();
        let drive_radius = self.drivetrain.wheel_radius();

        // --------------------------------------------------
        // Phase 4: tires
        // --------------------------------------------------
        for id in WheelId::ALL {
            let i = id.index();
            let wheel = state.wheel(id);
            let steer_angle = if id.is_front() {
                self.steering.wheel_angle(input.steer, id.side())
            } else {
                0.0
            };
            let frame = steer_mount(&wheel.mount, steer_angle);

            let corner = &self.corners[i];
            let normal_force = match self.config.tire.normal_load {
                NormalLoadModel::Static => corner.static_load,
                // Net up force this corner puts into the chassis. A bar pressing the
                // chassis down here lifts the wheel by the same amount.
                NormalLoadModel::Dynamic if corner.in_contact => {
                    (corner.last_output.total_force() + arb_force[i]).max(0.0)
                }
                NormalLoadModel::Dynamic => 0.0,
            };

            let driven = id.axle() == driven_axle;
            let tire_input = TireInput {
                velocity: slip_components(wheel.point_velocity, frame.forward, frame.right),
                normal_force,
                driven,
                drive_torque: if driven { torque_per_wheel } else { 0.0 },
                wheel_radius: drive_radius,
                handbrake: input.handbrake,
            };

            let tire = &mut self.tires[i];
            if let Some((force, point)) =
                tire.simulate(&tire_input, &self.config.tire, frame.forward, frame.right, frame.position)
            {
                sink.apply_force(ForceSource::Tire(id), force, point);
            }

            let w = self.telemetry.wheel_mut(id);
            w.in_contact = corner.in_contact;
            w.compression = corner.last_compression;
            w.suspension_force = corner.last_output.total_force();
            w.anti_roll_force = arb_force[i];
            w.normal_load = normal_force;
            w.steer_angle_deg = steer_angle.to_degrees();
            w.fx = tire.last_force.fx;
            w.fy = tire.last_force.fy;
            w.grip = tire.grip;
        }

        // --------------------------------------------------
        // Phase 5: aero
        // --------------------------------------------------
        let aero = aero::compute(&self.config.aero, &state.chassis, state.wing_mount, probe);
        let center = state.chassis.center;
        if aero.drag != Vec3::zeros() {
            sink.apply_force(ForceSource::Drag, aero.drag, center);
        }
        if let Some(point) = aero.wing_point {
            sink.apply_force(ForceSource::WingDownforce, aero.wing, point);
        }
        if aero.ride_height.is_some() {
            sink.apply_force(ForceSource::GroundEffect, aero.ground_effect, center);
        }

        // --------------------------------------------------
        // Telemetry
        // --------------------------------------------------
        let t = &mut self.telemetry;
        t.tick = self.tick;
        t.set_speed(road_speed);
        t.engine_rpm = self.drivetrain.current_rpm();
        t.engine_torque = self.drivetrain.current_torque();
        t.wheel_torque = self.drivetrain.wheel_torque();
        t.red_line = self.drivetrain.is_red_lined();
        t.governed = self.drivetrain.cut() == Some(TorqueCut::Governor);
        t.throttle = input.throttle;
        t.handbrake = input.handbrake;
        t.aero.drag = aero.drag.norm();
        t.aero.wing_downforce = aero.wing.norm();
        t.aero.ground_effect = aero.ground_effect.norm();
        t.aero.ride_height = aero.ride_height;

        if t.grounded_wheels() == 0 {
            debug!(tick = t.tick, "all wheels airborne");
        }
        trace!(
            tick = t.tick,
            speed = t.speed,
            rpm = t.engine_rpm,
            grounded = t.grounded_wheels(),
            "kart step"
        );

        &self.telemetry
    }
}
