// ==============================================================================
// telemetry.rs — PER-TICK SNAPSHOT (MODEL -> HUD / LOGS / DUMPS)
// ------------------------------------------------------------------------------
// Serializable, read-only view of one tick:
// - Telemetry: speed, engine, driver flags, aero terms
// - WheelTelemetry: per-corner contact, compression, loads, tire forces, grip
// - ForceRecord: one entry of the force list (for dumps and debugging)
//
// Rendering is external. This file has no physics side effects; KartDynamics
// fills a Telemetry in place every tick.
// ==============================================================================

use serde::Serialize;

use crate::kart_model::tire::TireGrip;
use crate::kart_model::types::{AppliedForce, ForceSource, WheelId};

const MS_TO_KMH: f32 = 3.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WheelTelemetry {
    pub id: WheelId,
    pub in_contact: bool,
    pub compression: f32,       // m
    pub suspension_force: f32,  // N along mount up
    pub anti_roll_force: f32,   // N along mount up
    pub normal_load: f32,       // N bounding the friction circle
    pub steer_angle_deg: f32,
    pub fx: f32,
    pub fy: f32,
    pub grip: TireGrip,
}

impl WheelTelemetry {
    pub fn new(id: WheelId) -> Self {
        Self {
            id,
            in_contact: false,
            compression: 0.0,
            suspension_force: 0.0,
            anti_roll_force: 0.0,
            normal_load: 0.0,
            steer_angle_deg: 0.0,
            fx: 0.0,
            fy: 0.0,
            grip: TireGrip::Grip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AeroTelemetry {
    pub drag: f32,           // N
    pub wing_downforce: f32, // N
    pub ground_effect: f32,  // N
    pub ride_height: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    pub tick: u64,
    pub speed: f32, // m/s along chassis forward
    pub speed_kmh: f32,
    pub engine_rpm: f32,
    pub engine_torque: f32,
    pub wheel_torque: f32,
    pub red_line: bool,
    pub governed: bool,
    pub throttle: f32,
    pub handbrake: bool,
    pub wheels: [WheelTelemetry; 4],
    pub aero: AeroTelemetry,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            tick: 0,
            speed: 0.0,
            speed_kmh: 0.0,
            engine_rpm: 0.0,
            engine_torque: 0.0,
            wheel_torque: 0.0,
            red_line: false,
            governed: false,
            throttle: 0.0,
            handbrake: false,
            wheels: WheelId::ALL.map(WheelTelemetry::new),
            aero: AeroTelemetry::default(),
        }
    }
}

impl Telemetry {
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
        self.speed_kmh = speed * MS_TO_KMH;
    }

    pub fn wheel(&self, id: WheelId) -> &WheelTelemetry {
        &self.wheels[id.index()]
    }

    pub fn wheel_mut(&mut self, id: WheelId) -> &mut WheelTelemetry {
        &mut self.wheels[id.index()]
    }

    pub fn grounded_wheels(&self) -> usize {
        self.wheels.iter().filter(|w| w.in_contact).count()
    }
}

/// Flattened force for JSON dumps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForceRecord {
    pub source: ForceSource,
    pub force: [f32; 3],
    pub point: [f32; 3],
}

impl From<&AppliedForce> for ForceRecord {
    fn from(f: &AppliedForce) -> Self {
        Self {
            source: f.source,
            force: [f.force.x, f.force.y, f.force.z],
            point: [f.point.x, f.point.y, f.point.z],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kart_model::types::{Pt3, Vec3};

    #[test]
    fn snapshot_serializes_with_wheel_ids() {
        let mut t = Telemetry::default();
        t.set_speed(10.0);
        t.wheel_mut(WheelId::RR).in_contact = true;

        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["speed_kmh"], 36.0);
        assert_eq!(json["wheels"][3]["id"], "RR");
        assert_eq!(json["wheels"][3]["grip"], "grip");
        assert_eq!(t.grounded_wheels(), 1);
    }

    #[test]
    fn force_record_flattens_vectors() {
        let f = AppliedForce {
            source: ForceSource::Tire(WheelId::FL),
            force: Vec3::new(1.0, 2.0, 3.0),
            point: Pt3::new(-1.0, 0.0, 4.0),
        };
        let r = ForceRecord::from(&f);
        assert_eq!(r.force, [1.0, 2.0, 3.0]);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains(r#""source":{"Tire":"FL"}"#));
    }
}
