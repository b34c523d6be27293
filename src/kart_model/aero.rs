// ==============================================================================
// aero.rs — DRAG, REAR WING DOWNFORCE, GROUND EFFECT
// ------------------------------------------------------------------------------
// Three independent terms per chassis per tick:
//
//   q        = 0.5 * rho * |v|^2
//   drag     = q * Cd * A                       opposing v, at chassis center
//   Cl       = lift_slope * wing_angle_rad
//   wing     = q * Cl * wing_area               along chassis down, at wing mount
//   ground   = strength / max(height, floor)    along chassis down, at center
//
// Skips (branch, not error):
// - |v| < min_speed: no drag, no wing (direction of v is meaningless)
// - no wing mount (or no wing area): no wing
// - ground probe misses within ground_ray_length: no ground effect
// ==============================================================================

use crate::config::AeroConfig;
use crate::kart_model::kinematics::{ChassisState, GroundProbe};
use crate::kart_model::types::{safe_normalize, Pt3, Vec3};

/// World-space aero forces for one tick. Zero vectors for skipped terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroForces {
    pub drag: Vec3,
    pub wing: Vec3,
    pub wing_point: Option<Pt3>,
    pub ground_effect: Vec3,
    /// Probe distance from the chassis center, if the ground was in range.
    pub ride_height: Option<f32>,
}

impl Default for AeroForces {
    fn default() -> Self {
        Self {
            drag: Vec3::zeros(),
            wing: Vec3::zeros(),
            wing_point: None,
            ground_effect: Vec3::zeros(),
            ride_height: None,
        }
    }
}

#[inline]
fn dynamic_pressure(air_density: f32, speed: f32) -> f32 {
    0.5 * air_density * speed * speed
}

/// Quadratic drag opposing `velocity`, or None below the speed threshold.
pub fn drag_force(cfg: &AeroConfig, velocity: Vec3) -> Option<Vec3> {
    let speed = velocity.norm();
    if speed < cfg.min_speed {
        return None;
    }
    let direction = safe_normalize(-velocity)?;
    let magnitude = dynamic_pressure(cfg.air_density, speed) * cfg.drag_coefficient * cfg.frontal_area;
    Some(direction * magnitude)
}

/// Wing downforce magnitude (N) at `speed`, or None below the speed threshold.
pub fn wing_downforce(cfg: &AeroConfig, speed: f32) -> Option<f32> {
    if speed < cfg.min_speed {
        return None;
    }
    let cl = cfg.lift_slope * cfg.wing_angle_deg.to_radians();
    Some(dynamic_pressure(cfg.air_density, speed) * cl * cfg.wing_area)
}

/// Ground-effect magnitude (N) for a measured ride height.
pub fn ground_effect(cfg: &AeroConfig, height: f32) -> f32 {
    cfg.ground_effect_strength / height.max(cfg.height_floor)
}

pub fn compute(
    cfg: &AeroConfig,
    chassis: &ChassisState,
    wing_mount: Option<Pt3>,
    probe: &impl GroundProbe,
) -> AeroForces {
    let mut out = AeroForces::default();
    let down = -chassis.up;
    let speed = chassis.linear_velocity.norm();

    if let Some(drag) = drag_force(cfg, chassis.linear_velocity) {
        out.drag = drag;
    }

    let wing_mount = wing_mount.filter(|_| cfg.has_wing());
    if let (Some(point), Some(magnitude)) = (wing_mount, wing_downforce(cfg, speed)) {
        out.wing = down * magnitude;
        out.wing_point = Some(point);
    }

    out.ride_height = probe.cast_down(&chassis.center, &down, cfg.ground_ray_length);
    if let Some(height) = out.ride_height {
        out.ground_effect = down * ground_effect(cfg, height);
    }

    debug_assert!(
        out.drag.iter().chain(out.wing.iter()).chain(out.ground_effect.iter()).all(|c| c.is_finite()),
        "non-finite aero force: {out:?}"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kart_model::kinematics::FlatGround;
    use approx::assert_relative_eq;

    fn chassis(velocity: Vec3, height: f32) -> ChassisState {
        ChassisState {
            center: Pt3::new(0.0, height, 0.0),
            up: Vec3::y(),
            forward: -Vec3::z(),
            right: Vec3::x(),
            linear_velocity: velocity,
        }
    }

    #[test]
    fn drag_at_ten_metres_per_second() {
        let cfg = AeroConfig::default();
        let v = Vec3::new(0.0, 0.0, -10.0);
        let drag = drag_force(&cfg, v).unwrap();

        assert_relative_eq!(drag.norm(), 33.075, epsilon = 1e-3);
        assert_relative_eq!(drag.normalize(), -v.normalize(), epsilon = 1e-6);
    }

    #[test]
    fn drag_quadruples_when_speed_doubles() {
        let cfg = AeroConfig::default();
        let dir = Vec3::new(1.0, 0.0, -2.0).normalize();
        let slow = drag_force(&cfg, dir * 7.0).unwrap().norm();
        let fast = drag_force(&cfg, dir * 14.0).unwrap().norm();
        assert_relative_eq!(fast / slow, 4.0, epsilon = 1e-4);
    }

    #[test]
    fn drag_and_wing_vanish_below_threshold() {
        let cfg = AeroConfig::default();
        let v = Vec3::new(0.0, 0.0, cfg.min_speed * 0.5);
        assert!(drag_force(&cfg, v).is_none());
        assert!(wing_downforce(&cfg, v.norm()).is_none());

        let out = compute(&cfg, &chassis(v, 5.0), Some(Pt3::origin()), &FlatGround::default());
        assert_eq!(out.drag, Vec3::zeros());
        assert_eq!(out.wing, Vec3::zeros());
    }

    #[test]
    fn wing_pushes_along_chassis_down_not_against_velocity() {
        let cfg = AeroConfig::default();
        let mut c = chassis(Vec3::new(6.0, 0.0, -8.0), 5.0);
        c.up = Vec3::new(0.0, 0.6, 0.8);
        let mount = Pt3::new(0.0, 5.3, 0.85);

        let out = compute(&cfg, &c, Some(mount), &FlatGround::default());
        let expected = 0.5 * 1.225 * (0.05 * 10f32.to_radians()) * 0.4 * 100.0;
        assert_relative_eq!(out.wing.norm(), expected, epsilon = 1e-4);
        assert_relative_eq!(out.wing.normalize(), -c.up, epsilon = 1e-5);
        assert_eq!(out.wing_point, Some(mount));
    }

    #[test]
    fn no_wing_mount_means_no_wing() {
        let cfg = AeroConfig::default();
        let out = compute(&cfg, &chassis(Vec3::new(0.0, 0.0, -20.0), 5.0), None, &FlatGround::default());
        assert_eq!(out.wing, Vec3::zeros());
        assert!(out.wing_point.is_none());
        assert!(out.drag.norm() > 0.0);
    }

    #[test]
    fn ground_effect_grows_as_height_drops() {
        let cfg = AeroConfig::default();
        let ground = FlatGround::default();

        let high = compute(&cfg, &chassis(Vec3::zeros(), 0.8), None, &ground);
        let low = compute(&cfg, &chassis(Vec3::zeros(), 0.2), None, &ground);

        assert_relative_eq!(high.ride_height.unwrap(), 0.8, epsilon = 1e-6);
        assert_relative_eq!(high.ground_effect.y, -cfg.ground_effect_strength / 0.8, epsilon = 1e-3);
        assert!(low.ground_effect.norm() > high.ground_effect.norm());
    }

    #[test]
    fn ground_effect_floor_and_range() {
        let cfg = AeroConfig::default();
        assert_relative_eq!(ground_effect(&cfg, 0.0), cfg.ground_effect_strength / cfg.height_floor);

        let out = compute(&cfg, &chassis(Vec3::zeros(), cfg.ground_ray_length + 0.5), None, &FlatGround::default());
        assert!(out.ride_height.is_none());
        assert_eq!(out.ground_effect, Vec3::zeros());
    }
}
