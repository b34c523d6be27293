// ==============================================================================
// suspension.rs — RAYCAST SPRING/DAMPER CORNER
// ------------------------------------------------------------------------------
// One corner, one probe, one tick:
//
//   length      = clamp(hit - wheel_radius, rest - travel, rest + travel)
//   compression = max(rest - length, 0)            (rest is the zero point)
//   spring      = k * compression
//   damper      = c * (compression - last_compression) / dt
//   force       = (spring + damper) along the mount's up axis, at the mount
//
// The corner persists last_compression and an explicit contact flag; the
// anti-roll pass reads both later in the same tick.
//
// Notes:
// - A miss (or a hit past the probe length) is an airborne wheel: no force.
//   AirbornePolicy decides whether the stored compression is kept or cleared.
// - This file does NOT apply forces. It only measures and returns them.
// ==============================================================================

use tracing::debug;

use crate::config::{AirbornePolicy, SuspensionConfig};
use crate::kart_model::types::{FixedDt, MountPose, Pt3, Vec3, WheelId};

/// Result of one corner evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SuspensionOutput {
    pub in_contact: bool,
    pub compression: f32,
    pub compression_velocity: f32,
    pub spring_force: f32,
    pub damper_force: f32,
}

impl SuspensionOutput {
    /// Signed force magnitude along the mount's up axis.
    pub fn total_force(&self) -> f32 {
        self.spring_force + self.damper_force
    }
}

/// Evaluate a corner for one tick and update its stored compression.
///
/// `ground_distance` is the raw probe hit measured from the mount along its
/// down axis.
pub fn step(
    ground_distance: Option<f32>,
    dt: FixedDt,
    cfg: &SuspensionConfig,
    airborne: AirbornePolicy,
    last_compression: &mut f32,
) -> SuspensionOutput {
    let Some(distance) = ground_distance.filter(|d| *d <= cfg.probe_length()) else {
        if airborne == AirbornePolicy::Reset {
            *last_compression = 0.0;
        }
        return SuspensionOutput::default();
    };

    let min_length = cfg.rest_length - cfg.spring_travel;
    let max_length = cfg.rest_length + cfg.spring_travel;
    let current_length = (distance - cfg.wheel_radius).clamp(min_length, max_length);

    let compression = (cfg.rest_length - current_length).max(0.0);
    let spring_force = compression * cfg.spring_stiffness;

    let compression_velocity = (compression - *last_compression) / dt.secs();
    let damper_force = compression_velocity * cfg.damper_stiffness;

    *last_compression = compression;

    SuspensionOutput {
        in_contact: true,
        compression,
        compression_velocity,
        spring_force,
        damper_force,
    }
}

/// Persistent per-wheel state, one per corner of the chassis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelCorner {
    pub id: WheelId,
    pub static_load: f32, // N
    pub last_compression: f32,
    pub in_contact: bool,
    pub last_output: SuspensionOutput,
}

impl WheelCorner {
    pub fn new(id: WheelId, static_load: f32) -> Self {
        Self {
            id,
            static_load,
            last_compression: 0.0,
            in_contact: false,
            last_output: SuspensionOutput::default(),
        }
    }

    /// Probe, evaluate, and return the world force along the mount axis.
    pub fn simulate(
        &mut self,
        mount: &MountPose,
        distance: Option<f32>,
        dt: FixedDt,
        cfg: &SuspensionConfig,
        airborne: AirbornePolicy,
    ) -> Option<(Vec3, Pt3)> {
        let out = step(distance, dt, cfg, airborne, &mut self.last_compression);

        if out.in_contact != self.in_contact {
            debug!(
                wheel = %self.id,
                grounded = out.in_contact,
                compression = out.compression,
                "suspension contact changed"
            );
        }
        self.in_contact = out.in_contact;
        self.last_output = out;

        out.in_contact
            .then(|| (mount.up * out.total_force(), mount.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn dt() -> FixedDt {
        FixedDt::new(0.02).unwrap()
    }

    #[test]
    fn worked_example_spring_plus_damper() {
        let cfg = SuspensionConfig {
            rest_length: 0.4,
            spring_travel: 0.2,
            spring_stiffness: 20_000.0,
            damper_stiffness: 3_500.0,
            wheel_radius: 0.35,
        };
        let mut last = 0.0;
        // 0.1 m closer than rest.
        let out = step(Some(0.65), dt(), &cfg, AirbornePolicy::Hold, &mut last);

        assert!(out.in_contact);
        assert_relative_eq!(out.compression, 0.1, epsilon = 1e-5);
        assert_relative_eq!(out.spring_force, 2_000.0, epsilon = 0.5);
        assert_relative_eq!(out.compression_velocity, 5.0, epsilon = 1e-3);
        assert_relative_eq!(out.damper_force, 17_500.0, epsilon = 5.0);
        assert_relative_eq!(out.total_force(), 19_500.0, epsilon = 5.0);
        assert_relative_eq!(last, out.compression);
    }

    #[test]
    fn hit_at_rest_is_neutral() {
        let cfg = SuspensionConfig::default();
        let mut last = 0.0;
        let out = step(
            Some(cfg.rest_length + cfg.wheel_radius),
            dt(),
            &cfg,
            AirbornePolicy::Hold,
            &mut last,
        );
        assert!(out.in_contact);
        assert_relative_eq!(out.compression, 0.0, epsilon = 1e-6);
        assert_relative_eq!(out.total_force(), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn airborne_corner_emits_nothing() {
        let cfg = SuspensionConfig::default();
        let mut last = 0.05;

        let out = step(None, dt(), &cfg, AirbornePolicy::Hold, &mut last);
        assert!(!out.in_contact);
        assert_eq!(out.total_force(), 0.0);
        assert_relative_eq!(last, 0.05);

        // A hit beyond the probe length counts as a miss too.
        let out = step(Some(cfg.probe_length() + 0.1), dt(), &cfg, AirbornePolicy::Reset, &mut last);
        assert_eq!(out.total_force(), 0.0);
        assert_eq!(last, 0.0);
    }

    #[test]
    fn rebound_damps_negative() {
        let cfg = SuspensionConfig::default();
        let mut last = 0.1;
        let out = step(
            Some(cfg.rest_length + cfg.wheel_radius - 0.05),
            dt(),
            &cfg,
            AirbornePolicy::Hold,
            &mut last,
        );
        assert!(out.compression_velocity < 0.0);
        assert!(out.damper_force < 0.0);
    }

    #[test]
    fn corner_pushes_along_mount_up() {
        let cfg = SuspensionConfig::default();
        let up = Vec3::new(0.0, 0.8, 0.6);
        let mount = MountPose {
            position: Pt3::new(1.0, 2.0, 3.0),
            up,
            forward: Vec3::new(0.0, -0.6, 0.8),
            right: Vec3::x(),
        };
        let mut corner = WheelCorner::new(WheelId::FL, 400.0);
        let (force, at) = corner
            .simulate(&mount, Some(0.7), dt(), &cfg, AirbornePolicy::Hold)
            .unwrap();

        assert_eq!(at, mount.position);
        assert_relative_eq!(force.normalize(), up, epsilon = 1e-5);
        assert!(corner.in_contact);

        assert!(corner.simulate(&mount, None, dt(), &cfg, AirbornePolicy::Hold).is_none());
        assert!(!corner.in_contact);
    }

    proptest! {
        #[test]
        fn compression_stays_within_travel(
            distance in 0.0f32..2.0,
            last in -0.3f32..0.3,
            rest in 0.1f32..0.8,
            travel in 0.0f32..0.3,
        ) {
            let cfg = SuspensionConfig { rest_length: rest, spring_travel: travel, ..SuspensionConfig::default() };
            let mut last = last;
            let out = step(Some(distance), dt(), &cfg, AirbornePolicy::Hold, &mut last);
            if out.in_contact {
                prop_assert!(out.compression >= 0.0);
                prop_assert!(out.compression <= travel + 1e-6);
                prop_assert!(out.total_force().is_finite());
            }
        }
    }
}
