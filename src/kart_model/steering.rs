// ==============================================================================
// steering.rs — FRONT WHEEL STEER ANGLES (PARALLEL / ACKERMANN BLEND)
// ==============================================================================
// Given:
// - driver steer input in [-1, 1] (positive = turn right)
// - max_steer_angle, wheelbase, track_width, ackermann blend (0..1)
//
// wheel_angles(steer):
// - base   = steer * max_steer_angle     (bicycle-model angle at the centerline)
// - ackermann: inner wheel follows the tighter radius r - track/2
// - result = lerp(base, ackermann, blend) per wheel, returned as (left, right)
//
// steer_mount(pose, angle):
// - Rotates a mount's forward/right axes about its up axis.
//   forward' = forward * cos(a) + right * sin(a)
//   right'   = forward' x up
// - Position and up are untouched; only the tire frame turns.
// ==============================================================================

use crate::config::SteeringConfig;
use crate::kart_model::types::{MountPose, Side};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    max_steer_angle: f32, // radians
    wheelbase: f32,
    track_width: f32,
    ackermann: f32,
}

impl Steering {
    pub fn new(cfg: &SteeringConfig) -> Self {
        Self {
            max_steer_angle: cfg.max_steer_angle_deg.to_radians(),
            wheelbase: cfg.wheelbase,
            track_width: cfg.track_width,
            ackermann: cfg.ackermann,
        }
    }

    pub fn max_steer_angle(&self) -> f32 {
        self.max_steer_angle
    }

    /// (left, right) front wheel angles in radians.
    pub fn wheel_angles(&self, steer: f32) -> (f32, f32) {
        let base = steer.clamp(-1.0, 1.0) * self.max_steer_angle;
        let (ack_l, ack_r) = ackermann_angles(base, self.wheelbase, self.track_width);

        let left = (1.0 - self.ackermann) * base + self.ackermann * ack_l;
        let right = (1.0 - self.ackermann) * base + self.ackermann * ack_r;
        (left, right)
    }

    pub fn wheel_angle(&self, steer: f32, side: Side) -> f32 {
        let (left, right) = self.wheel_angles(steer);
        match side {
            Side::Left => left,
            Side::Right => right,
        }
    }
}

/// Full ackermann (left, right) angles for a centerline angle `base`.
fn ackermann_angles(base: f32, wheelbase: f32, track: f32) -> (f32, f32) {
    let eps = 1e-4;
    if base.abs() < eps {
        return (0.0, 0.0);
    }

    let sign = base.signum();
    let a = base.abs();

    // turning radius of the centerline bicycle model
    let r = wheelbase / a.tan();

    let r_in = (r - track * 0.5).max(0.01);
    let r_out = (r + track * 0.5).max(0.01);

    let inner = (wheelbase / r_in).atan() * sign;
    let outer = (wheelbase / r_out).atan() * sign;

    // right turn: right wheel is inside
    if sign > 0.0 { (outer, inner) } else { (inner, outer) }
}

pub fn steer_mount(pose: &MountPose, angle: f32) -> MountPose {
    if angle == 0.0 {
        return *pose;
    }
    let (s, c) = angle.sin_cos();
    let forward = (pose.forward * c + pose.right * s).normalize();
    let right = forward.cross(&pose.up).normalize();

    debug_assert!(forward.dot(&right).abs() < 1e-4);

    MountPose {
        position: pose.position,
        up: pose.up,
        forward,
        right,
    }
}
