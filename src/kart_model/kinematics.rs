// ==============================================================================
// kinematics.rs — HOST BOUNDARY (STATE IN, FORCES OUT)
// ------------------------------------------------------------------------------
// Everything the model reads from, or writes to, the outside world:
// - KinematicState: chassis pose + velocity and per-wheel mount poses with
//   their point velocities. Supplied fresh by the host every tick.
// - GroundProbe: "how far down along this axis is the ground?". Used by each
//   suspension corner and by the ground-effect term with its own range.
// - ForceSink: the single outward primitive, apply_force(force, world_point).
//
// Helpers:
// - point_velocity(): v(p) = v_com + w x (p - com) for hosts without one.
// - slip_components(): projects a point velocity onto a wheel frame.
// - FlatGround: analytic plane probe for tests and headless runs.
// ==============================================================================

use nalgebra::UnitQuaternion;

use crate::config::ChassisConfig;
use crate::kart_model::types::{AppliedForce, ForceSource, MountPose, Pt3, Vec3, WheelId};

/// Chassis-level state for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisState {
    /// Center the aero terms act through (and cast the ride-height probe from).
    pub center: Pt3,
    pub up: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub linear_velocity: Vec3,
}

impl ChassisState {
    /// Signed speed along the chassis heading; what the governor compares.
    pub fn speed_along_forward(&self) -> f32 {
        self.linear_velocity.dot(&self.forward)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelKinematics {
    pub mount: MountPose,
    /// World velocity of the chassis point at the mount.
    pub point_velocity: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicState {
    pub chassis: ChassisState,
    /// Indexed by `WheelId::index()`.
    pub wheels: [WheelKinematics; 4],
    pub wing_mount: Option<Pt3>,
}

impl KinematicState {
    pub fn wheel(&self, id: WheelId) -> &WheelKinematics {
        &self.wheels[id.index()]
    }

    /// Build the tick's state from a rigid chassis pose and its velocities.
    /// Mounts come out chassis-fixed (unsteered); the model turns the front
    /// tire frames itself.
    pub fn from_rigid_pose(
        chassis: &ChassisConfig,
        position: Pt3,
        rotation: &UnitQuaternion<f32>,
        linvel: Vec3,
        angvel: Vec3,
    ) -> Self {
        let up = rotation * Vec3::y();
        let forward = rotation * -Vec3::z();
        let right = rotation * Vec3::x();
        let to_world = |local: [f32; 3]| position + rotation * Vec3::from(local);

        let wheels = WheelId::ALL.map(|id| {
            let p = to_world(chassis.mount(id));
            WheelKinematics {
                mount: MountPose { position: p, up, forward, right },
                point_velocity: point_velocity(linvel, angvel, position, p),
            }
        });

        Self {
            chassis: ChassisState {
                center: position,
                up,
                forward,
                right,
                linear_velocity: linvel,
            },
            wheels,
            wing_mount: chassis.wing_mount.map(to_world),
        }
    }
}

/// Wheel-frame velocity: `long` along the wheel forward axis, `lat` along its
/// right axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelFrameVelocity {
    pub long: f32,
    pub lat: f32,
}

#[inline]
pub fn slip_components(point_vel: Vec3, forward: Vec3, right: Vec3) -> WheelFrameVelocity {
    WheelFrameVelocity {
        long: point_vel.dot(&forward),
        lat: point_vel.dot(&right),
    }
}

/// World-space velocity of an arbitrary point rigidly attached to the body:
/// v(p) = v_com + ω × (p - com)
#[inline]
pub fn point_velocity(linvel: Vec3, angvel: Vec3, com: Pt3, p: Pt3) -> Vec3 {
    let r = p.coords - com.coords;
    linvel + angvel.cross(&r)
}

/// Distance query against the track.
pub trait GroundProbe {
    /// Cast from `origin` along the unit vector `down` and return the hit
    /// distance if the ground is within `max_distance`.
    fn cast_down(&self, origin: &Pt3, down: &Vec3, max_distance: f32) -> Option<f32>;
}

impl<F> GroundProbe for F
where
    F: Fn(&Pt3, &Vec3, f32) -> Option<f32>,
{
    fn cast_down(&self, origin: &Pt3, down: &Vec3, max_distance: f32) -> Option<f32> {
        self(origin, down, max_distance)
    }
}

/// Horizontal plane `y = height`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlatGround {
    pub height: f32,
}

impl GroundProbe for FlatGround {
    fn cast_down(&self, origin: &Pt3, down: &Vec3, max_distance: f32) -> Option<f32> {
        // Rays that do not point at the plane never hit it.
        if down.y >= -1e-6 {
            return None;
        }
        let t = (origin.y - self.height) / -down.y;
        (t >= 0.0 && t <= max_distance).then_some(t)
    }
}

/// Where the model's forces go.
pub trait ForceSink {
    fn apply_force(&mut self, source: ForceSource, force: Vec3, point: Pt3);
}

impl ForceSink for Vec<AppliedForce> {
    fn apply_force(&mut self, source: ForceSource, force: Vec3, point: Pt3) {
        self.push(AppliedForce { source, force, point });
    }
}
