// ==============================================================================
// config.rs — KART PARAMETERS (IMMUTABLE AFTER LOAD)
// ------------------------------------------------------------------------------
// Every tunable the model reads lives here, grouped per subsystem:
// - ChassisConfig: mass, axle load split, wheel / wing mounts (chassis space)
// - SuspensionConfig: per-axle spring/damper corner
// - AntiRollConfig: per-axle bar stiffness + contact gating
// - TireConfig: friction circle, slip stiffness, rolling resistance, handbrake
// - DrivetrainConfig / EngineConfig: gearing, governor, torque curve, rpm lag
// - SteeringConfig: steer lock + ackermann blend
// - AeroConfig: drag, rear wing, ground effect
// - SimulationConfig: fixed tick, gravity, airborne compression policy
//
// Loading:
// - KartConfig::default() is the built-in club kart.
// - JSON files may carry any subset of fields (serde(default) everywhere).
// - KartProfile is the short "import" override set applied once at startup.
// - validate() runs before any simulation object is built.
// ==============================================================================

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kart_model::types::{Axle, WheelId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisConfig {
    pub mass: f32,              // kg
    pub front_axle_share: f32,  // 0..1 of static weight on the front axle
    pub half_extents: [f32; 3], // [hx, hy, hz] meters (host collider)
    pub inertia: [f32; 3],      // kg*m^2 about chassis X (pitch), Y (yaw), Z (roll)

    /// Suspension mount points in chassis space, indexed FL, FR, RL, RR.
    /// Chassis space is right-handed: +X right, +Y up, -Z forward.
    pub wheel_mounts: [[f32; 3]; 4],

    /// Rear wing mount in chassis space. Required whenever the wing has area.
    pub wing_mount: Option<[f32; 3]>,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            mass: 180.0,
            front_axle_share: 0.5,
            half_extents: [0.55, 0.12, 0.9],
            inertia: [80.0, 100.0, 80.0],
            wheel_mounts: [
                [-0.55, 0.0, -0.52], // FL
                [0.55, 0.0, -0.52],  // FR
                [-0.55, 0.0, 0.52],  // RL
                [0.55, 0.0, 0.52],   // RR
            ],
            wing_mount: Some([0.0, 0.3, 0.85]),
        }
    }
}

impl ChassisConfig {
    pub fn mount(&self, id: WheelId) -> [f32; 3] {
        self.wheel_mounts[id.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionConfig {
    pub rest_length: f32,      // m
    pub spring_travel: f32,    // m, either side of rest
    pub spring_stiffness: f32, // N/m
    pub damper_stiffness: f32, // N*s/m
    pub wheel_radius: f32,     // m
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            rest_length: 0.4,
            spring_travel: 0.2,
            spring_stiffness: 20_000.0,
            damper_stiffness: 3_500.0,
            wheel_radius: 0.35,
        }
    }
}

impl SuspensionConfig {
    /// Longest ray the corner probe casts: fully extended leg plus tire.
    pub fn probe_length(&self) -> f32 {
        self.rest_length + self.spring_travel + self.wheel_radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AxleSuspension {
    pub front: SuspensionConfig,
    pub rear: SuspensionConfig,
}

impl AxleSuspension {
    pub fn for_axle(&self, axle: Axle) -> &SuspensionConfig {
        match axle {
            Axle::Front => &self.front,
            Axle::Rear => &self.rear,
        }
    }
}

/// How the anti-roll pass decides a corner is still loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntiRollGating {
    /// Use the contact flag the suspension step wrote this tick.
    #[default]
    ContactFlag,
    /// Treat `last_compression > -contact_epsilon` as loaded.
    CompressionThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiRollConfig {
    pub front_stiffness: f32, // N per m of compression difference
    pub rear_stiffness: f32,
    pub gating: AntiRollGating,
    pub contact_epsilon: f32, // m, only read by CompressionThreshold
}

impl Default for AntiRollConfig {
    fn default() -> Self {
        Self {
            front_stiffness: 8_000.0,
            rear_stiffness: 6_000.0,
            gating: AntiRollGating::ContactFlag,
            contact_epsilon: 1e-4,
        }
    }
}

impl AntiRollConfig {
    pub fn stiffness(&self, axle: Axle) -> f32 {
        match axle {
            Axle::Front => self.front_stiffness,
            Axle::Rear => self.rear_stiffness,
        }
    }
}

/// Which load bounds the friction circle of each tire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalLoadModel {
    /// Static share computed from mass and axle split at startup.
    #[default]
    Static,
    /// This tick's suspension + anti-roll force, zero while airborne.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireConfig {
    pub friction_coefficient: f32, // scales normal load to the max combined force
    pub lateral_stiffness: f32,    // N per m/s of lateral slip
    pub rolling_resistance: f32,   // N per m/s, non-driven wheels
    pub handbrake_force: f32,      // N per driven wheel
    pub normal_load: NormalLoadModel,
}

impl Default for TireConfig {
    fn default() -> Self {
        Self {
            friction_coefficient: 1.0,
            lateral_stiffness: 80.0,
            rolling_resistance: 2.0,
            handbrake_force: 2_500.0,
            normal_load: NormalLoadModel::Static,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivetrainConfig {
    pub gear_ratio: f32,
    pub drivetrain_efficiency: f32, // 0..1
    pub wheel_radius: f32,          // m, driven tire rolling radius
    pub max_speed: f32,             // m/s, forward governor
    pub driven_axle: Axle,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            gear_ratio: 8.0,
            drivetrain_efficiency: 0.9,
            wheel_radius: 0.3,
            max_speed: 20.0,
            driven_axle: Axle::Rear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub idle_rpm: f32,
    pub max_rpm: f32,
    pub rpm_time_constant: f32, // s, first-order lag toward target rpm
    pub clutch_slip: f32,       // 0..1 of the rev band reachable above road speed
    pub torque_curve: Vec<[f32; 2]>, // [rpm, N*m], rpm strictly increasing
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_rpm: 1_800.0,
            max_rpm: 8_500.0,
            rpm_time_constant: 0.25,
            clutch_slip: 0.35,
            torque_curve: vec![
                [1_800.0, 11.0],
                [3_000.0, 15.0],
                [4_500.0, 18.0],
                [6_000.0, 18.5],
                [7_500.0, 16.0],
                [8_500.0, 12.0],
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    pub max_steer_angle_deg: f32,
    pub wheelbase: f32,   // m
    pub track_width: f32, // m
    pub ackermann: f32,   // 0 = parallel, 1 = full ackermann
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_steer_angle_deg: 25.0,
            wheelbase: 1.04,
            track_width: 1.1,
            ackermann: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AeroConfig {
    pub air_density: f32,      // kg/m^3
    pub drag_coefficient: f32, // Cd
    pub frontal_area: f32,     // m^2
    pub wing_area: f32,        // m^2
    pub lift_slope: f32,       // Cl per radian
    pub wing_angle_deg: f32,
    pub ground_effect_strength: f32, // N*m
    pub ground_ray_length: f32,      // m
    pub min_speed: f32,              // m/s, below this drag + wing are skipped
    pub height_floor: f32,           // m, ground effect height clamp
}

impl Default for AeroConfig {
    fn default() -> Self {
        Self {
            air_density: 1.225,
            drag_coefficient: 0.9,
            frontal_area: 0.6,
            wing_area: 0.4,
            lift_slope: 0.05,
            wing_angle_deg: 10.0,
            ground_effect_strength: 300.0,
            ground_ray_length: 1.0,
            min_speed: 0.01,
            height_floor: 0.01,
        }
    }
}

impl AeroConfig {
    pub fn has_wing(&self) -> bool {
        self.wing_area > 0.0 && self.lift_slope * self.wing_angle_deg != 0.0
    }
}

/// What an airborne corner does with its stored compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirbornePolicy {
    /// Keep the last grounded value; landing damps against it.
    #[default]
    Hold,
    /// Forget it; landing damps against a fully extended (rest) spring.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub fixed_dt: f32, // s
    pub gravity: f32,  // m/s^2, magnitude
    pub airborne: AirbornePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 0.02,
            gravity: 9.81,
            airborne: AirbornePolicy::Hold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KartConfig {
    pub chassis: ChassisConfig,
    pub suspension: AxleSuspension,
    pub anti_roll: AntiRollConfig,
    pub tire: TireConfig,
    pub drivetrain: DrivetrainConfig,
    pub engine: EngineConfig,
    pub steering: SteeringConfig,
    pub aero: AeroConfig,
    pub simulation: SimulationConfig,
}

/// Override set a kart asset may carry on top of the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KartProfile {
    pub mass: Option<f32>,
    pub friction_coefficient: Option<f32>,
    pub rolling_resistance: Option<f32>,
    pub max_steer_angle: Option<f32>, // degrees
    pub gear_ratio: Option<f32>,
    pub wheel_radius: Option<f32>, // driven tire radius
    pub lateral_stiffness: Option<f32>,
}

impl KartProfile {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }
}

impl KartConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: KartConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }

    /// Apply a profile on top of this config. Call before building the model;
    /// the model copies what it needs and never re-reads the config.
    pub fn apply_profile(&mut self, profile: &KartProfile) -> Result<(), ConfigError> {
        if let Some(mass) = profile.mass {
            self.chassis.mass = mass;
        }
        if let Some(mu) = profile.friction_coefficient {
            self.tire.friction_coefficient = mu;
        }
        if let Some(rr) = profile.rolling_resistance {
            self.tire.rolling_resistance = rr;
        }
        if let Some(angle) = profile.max_steer_angle {
            self.steering.max_steer_angle_deg = angle;
        }
        if let Some(ratio) = profile.gear_ratio {
            self.drivetrain.gear_ratio = ratio;
        }
        if let Some(radius) = profile.wheel_radius {
            self.drivetrain.wheel_radius = radius;
        }
        if let Some(stiffness) = profile.lateral_stiffness {
            self.tire.lateral_stiffness = stiffness;
        }
        self.validate()
    }

    /// Static normal load (N) carried by one corner at rest.
    pub fn static_wheel_load(&self, id: WheelId) -> f32 {
        let total_weight = self.chassis.mass * self.simulation.gravity;
        let front_weight = total_weight * self.chassis.front_axle_share;
        let axle_weight = match id.axle() {
            Axle::Front => front_weight,
            Axle::Rear => total_weight - front_weight,
        };
        axle_weight * 0.5
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if !(sim.fixed_dt.is_finite() && sim.fixed_dt > 0.0) {
            return Err(ConfigError::NonPositiveTick(sim.fixed_dt));
        }
        non_negative("simulation.gravity", sim.gravity)?;

        let chassis = &self.chassis;
        positive("chassis.mass", chassis.mass)?;
        in_range("chassis.front_axle_share", chassis.front_axle_share, 0.0, 1.0)?;
        for h in chassis.half_extents {
            positive("chassis.half_extents", h)?;
        }
        for i in chassis.inertia {
            positive("chassis.inertia", i)?;
        }
        for id in WheelId::ALL {
            for c in chassis.mount(id) {
                finite("chassis.wheel_mounts", c)?;
            }
        }

        validate_suspension(&FRONT_SUSPENSION_FIELDS, &self.suspension.front)?;
        validate_suspension(&REAR_SUSPENSION_FIELDS, &self.suspension.rear)?;

        let arb = &self.anti_roll;
        non_negative("anti_roll.front_stiffness", arb.front_stiffness)?;
        non_negative("anti_roll.rear_stiffness", arb.rear_stiffness)?;
        non_negative("anti_roll.contact_epsilon", arb.contact_epsilon)?;

        let tire = &self.tire;
        non_negative("tire.friction_coefficient", tire.friction_coefficient)?;
        non_negative("tire.lateral_stiffness", tire.lateral_stiffness)?;
        non_negative("tire.rolling_resistance", tire.rolling_resistance)?;
        non_negative("tire.handbrake_force", tire.handbrake_force)?;

        let dt = &self.drivetrain;
        positive("drivetrain.gear_ratio", dt.gear_ratio)?;
        in_range("drivetrain.drivetrain_efficiency", dt.drivetrain_efficiency, 0.0, 1.0)?;
        positive("drivetrain.wheel_radius", dt.wheel_radius)?;
        positive("drivetrain.max_speed", dt.max_speed)?;

        validate_engine(&self.engine)?;

        let steer = &self.steering;
        in_range("steering.max_steer_angle_deg", steer.max_steer_angle_deg, 0.0, 89.0)?;
        positive("steering.wheelbase", steer.wheelbase)?;
        positive("steering.track_width", steer.track_width)?;
        in_range("steering.ackermann", steer.ackermann, 0.0, 1.0)?;

        let aero = &self.aero;
        non_negative("aero.air_density", aero.air_density)?;
        non_negative("aero.drag_coefficient", aero.drag_coefficient)?;
        non_negative("aero.frontal_area", aero.frontal_area)?;
        non_negative("aero.wing_area", aero.wing_area)?;
        finite("aero.lift_slope", aero.lift_slope)?;
        finite("aero.wing_angle_deg", aero.wing_angle_deg)?;
        non_negative("aero.ground_effect_strength", aero.ground_effect_strength)?;
        non_negative("aero.ground_ray_length", aero.ground_ray_length)?;
        positive("aero.min_speed", aero.min_speed)?;
        positive("aero.height_floor", aero.height_floor)?;
        if aero.has_wing() && chassis.wing_mount.is_none() {
            return Err(ConfigError::MissingMount("chassis.wing_mount (rear wing has area)"));
        }
        if let Some(wing) = chassis.wing_mount {
            for c in wing {
                finite("chassis.wing_mount", c)?;
            }
        }

        Ok(())
    }
}

const FRONT_SUSPENSION_FIELDS: [&str; 5] = [
    "suspension.front.rest_length",
    "suspension.front.spring_travel",
    "suspension.front.spring_stiffness",
    "suspension.front.damper_stiffness",
    "suspension.front.wheel_radius",
];

const REAR_SUSPENSION_FIELDS: [&str; 5] = [
    "suspension.rear.rest_length",
    "suspension.rear.spring_travel",
    "suspension.rear.spring_stiffness",
    "suspension.rear.damper_stiffness",
    "suspension.rear.wheel_radius",
];

fn validate_suspension(fields: &[&'static str; 5], s: &SuspensionConfig) -> Result<(), ConfigError> {
    positive(fields[0], s.rest_length)?;
    non_negative(fields[1], s.spring_travel)?;
    non_negative(fields[2], s.spring_stiffness)?;
    non_negative(fields[3], s.damper_stiffness)?;
    positive(fields[4], s.wheel_radius)?;
    Ok(())
}

fn validate_engine(e: &EngineConfig) -> Result<(), ConfigError> {
    positive("engine.idle_rpm", e.idle_rpm)?;
    if !(e.max_rpm.is_finite() && e.max_rpm > e.idle_rpm) {
        return Err(ConfigError::OutOfRange {
            field: "engine.max_rpm",
            value: e.max_rpm,
            min: e.idle_rpm,
            max: f32::INFINITY,
        });
    }
    positive("engine.rpm_time_constant", e.rpm_time_constant)?;
    in_range("engine.clutch_slip", e.clutch_slip, 0.0, 1.0)?;

    if e.torque_curve.len() < 2 {
        return Err(ConfigError::TorqueCurve(format!(
            "needs at least two points, got {}",
            e.torque_curve.len()
        )));
    }
    for [rpm, torque] in &e.torque_curve {
        finite("engine.torque_curve.rpm", *rpm)?;
        non_negative("engine.torque_curve.torque", *torque)?;
    }
    for pair in e.torque_curve.windows(2) {
        if pair[1][0] <= pair[0][0] {
            return Err(ConfigError::TorqueCurve(format!(
                "rpm must be strictly increasing ({} then {})",
                pair[0][0], pair[1][0]
            )));
        }
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange { field, value, min, max });
    }
    Ok(())
}
