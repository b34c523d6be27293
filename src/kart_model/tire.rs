// ==============================================================================
// tire.rs — TIRE FORCE MODEL (LINEAR SLIP + FRICTION CIRCLE)
// ------------------------------------------------------------------------------
// Per wheel, in the wheel's own forward/right frame:
//
//   driven wheels:      Fx = drive_torque / wheel_radius  (+ handbrake)
//   non-driven wheels:  Fx = -rolling_resistance * v_long
//   every wheel:        Fy = -lateral_stiffness  * v_lat
//
// Combined-slip limit:
//   limit = mu * Fz
//   |F| > limit  =>  (Fx, Fy) *= limit / |F|     (uniform radial pullback)
//
// Notes:
// - Fx = Fy = 0 skips the pullback; nothing is emitted for that wheel.
// - Handbrake opposes v_long. At exactly v_long = 0 it pushes backward.
// - TireGrip is a telemetry state with hysteresis; it never feeds back into
//   the force math.
// ==============================================================================

use serde::Serialize;

use crate::config::TireConfig;
use crate::kart_model::kinematics::WheelFrameVelocity;
use crate::kart_model::types::{Pt3, Vec3, WheelId};

/// Demand ratio below which a sliding tire is considered gripping again.
const GRIP_RECOVER_RATIO: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TireInput {
    pub velocity: WheelFrameVelocity,
    pub normal_force: f32, // N
    pub driven: bool,
    pub drive_torque: f32, // N*m at this wheel, already split across the axle
    pub wheel_radius: f32, // m
    pub handbrake: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TireForce {
    pub fx: f32,
    pub fy: f32,
    /// |F| before the pullback divided by the limit. >1 means it saturated.
    pub demand: f32,
}

impl TireForce {
    pub fn magnitude(&self) -> f32 {
        self.fx.hypot(self.fy)
    }

    pub fn is_zero(&self) -> bool {
        self.fx == 0.0 && self.fy == 0.0
    }

    pub fn saturated(&self) -> bool {
        self.demand > 1.0
    }

    /// World-space force along the wheel's forward/right axes.
    pub fn to_world(&self, forward: Vec3, right: Vec3) -> Vec3 {
        forward * self.fx + right * self.fy
    }
}

/// +1 or -1 along the wheel's forward axis.
#[inline]
pub fn handbrake_direction(v_long: f32) -> f32 {
    if v_long > 0.0 {
        -1.0
    } else if v_long < 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Scale (fx, fy) onto the friction circle of radius `limit` if it lies outside.
pub fn saturate(fx: f32, fy: f32, limit: f32) -> TireForce {
    let mag = fx.hypot(fy);
    if mag == 0.0 {
        return TireForce::default();
    }
    let limit = limit.max(0.0);
    let demand = if limit > 0.0 { mag / limit } else { f32::INFINITY };

    if mag > limit {
        let scale = limit / mag;
        TireForce {
            fx: fx * scale,
            fy: fy * scale,
            demand,
        }
    } else {
        TireForce { fx, fy, demand }
    }
}

pub fn compute_force(input: &TireInput, cfg: &TireConfig) -> TireForce {
    let v = input.velocity;

    let fx = if input.driven {
        let mut fx = input.drive_torque / input.wheel_radius;
        if input.handbrake {
            fx += handbrake_direction(v.long) * cfg.handbrake_force;
        }
        fx
    } else {
        -cfg.rolling_resistance * v.long
    };
    let fy = -cfg.lateral_stiffness * v.lat;

    let limit = cfg.friction_coefficient * input.normal_force.max(0.0);
    let force = saturate(fx, fy, limit);

    debug_assert!(
        force.fx.is_finite() && force.fy.is_finite(),
        "non-finite tire force: {force:?} from {input:?}"
    );
    force
}

// ============================================
// Grip state (telemetry)
// ============================================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TireGrip {
    #[default]
    Grip,
    Slide,
}

pub fn update_grip(prev: TireGrip, force: &TireForce) -> TireGrip {
    if force.saturated() {
        return TireGrip::Slide;
    }
    match prev {
        TireGrip::Slide if force.demand >= GRIP_RECOVER_RATIO => TireGrip::Slide,
        _ => TireGrip::Grip,
    }
}

/// One wheel's tire: runs the model and keeps the telemetry state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tire {
    pub id: WheelId,
    pub grip: TireGrip,
    pub last_force: TireForce,
}

impl Tire {
    pub fn new(id: WheelId) -> Self {
        Self {
            id,
            grip: TireGrip::Grip,
            last_force: TireForce::default(),
        }
    }

    /// Returns the world force and its application point, or None when both
    /// components are zero.
    pub fn simulate(
        &mut self,
        input: &TireInput,
        cfg: &TireConfig,
        forward: Vec3,
        right: Vec3,
        at: Pt3,
    ) -> Option<(Vec3, Pt3)> {
        let force = compute_force(input, cfg);
        self.grip = update_grip(self.grip, &force);
        self.last_force = force;

        (!force.is_zero()).then(|| (force.to_world(forward, right), at))
    }
}
