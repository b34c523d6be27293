// ==============================================================================
// drivetrain.rs — ENGINE + GEARING (THE ONLY TIME-INTEGRATED SUBSYSTEM)
// ------------------------------------------------------------------------------
// Per tick, called ONCE (not once per driven wheel):
//
//   coupled_rpm  = |road_speed| / wheel_radius * gear_ratio * 60 / 2pi
//   free_rpm     = idle + |throttle| * (max - idle) * clutch_slip
//   target_rpm   = clamp(max(coupled_rpm, free_rpm), idle, max)
//   current_rpm += (target_rpm - current_rpm) * (1 - exp(-dt / tau))
//   torque       = curve(current_rpm) * throttle
//
// Cut:
// - governor: throttle > 0 and road_speed >= max_speed -> torque = 0
//
// Redline is reported only. Past it the rpm holds at max_rpm and the curve is
// read there, so a tall gear ratio still reaches max_speed.
//
// Output toward the tires:
//   wheel_torque = torque * gear_ratio * efficiency, split evenly across the
//   two wheels of the driven axle.
// ==============================================================================

use std::f32::consts::TAU;
use std::fmt;

use tracing::debug;

use crate::config::{DrivetrainConfig, EngineConfig};
use crate::error::ConfigError;
use crate::kart_model::types::{Axle, FixedDt};

/// Engine torque (N*m) at full throttle as a function of rpm.
pub trait TorqueCurve: Send + Sync {
    fn torque_at(&self, rpm: f32) -> f32;
}

/// Piecewise-linear table, held flat past either end.
#[derive(Debug, Clone, PartialEq)]
pub struct TorqueTable {
    points: Vec<[f32; 2]>,
}

impl TorqueTable {
    pub fn new(points: Vec<[f32; 2]>) -> Result<Self, ConfigError> {
        if points.len() < 2 {
            return Err(ConfigError::TorqueCurve(format!(
                "needs at least two points, got {}",
                points.len()
            )));
        }
        if points.windows(2).any(|w| !(w[1][0] > w[0][0])) {
            return Err(ConfigError::TorqueCurve("rpm must be strictly increasing".into()));
        }
        Ok(Self { points })
    }
}

impl TorqueCurve for TorqueTable {
    fn torque_at(&self, rpm: f32) -> f32 {
        let pts = &self.points;
        let first = pts[0];
        let last = pts[pts.len() - 1];
        if rpm <= first[0] {
            return first[1];
        }
        if rpm >= last[0] {
            return last[1];
        }
        let i = pts.partition_point(|p| p[0] <= rpm);
        let [r0, t0] = pts[i - 1];
        let [r1, t1] = pts[i];
        t0 + (t1 - t0) * (rpm - r0) / (r1 - r0)
    }
}

/// Why forward torque was cut this tick, if it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorqueCut {
    Governor,
}

pub struct Drivetrain {
    cfg: DrivetrainConfig,
    idle_rpm: f32,
    max_rpm: f32,
    rpm_time_constant: f32,
    clutch_slip: f32,
    curve: Box<dyn TorqueCurve>,

    current_rpm: f32,
    current_torque: f32,
    cut: Option<TorqueCut>,
}

impl fmt::Debug for Drivetrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drivetrain")
            .field("current_rpm", &self.current_rpm)
            .field("current_torque", &self.current_torque)
            .field("cut", &self.cut)
            .finish_non_exhaustive()
    }
}

impl Drivetrain {
    pub fn new(cfg: &DrivetrainConfig, engine: &EngineConfig) -> Result<Self, ConfigError> {
        let table = TorqueTable::new(engine.torque_curve.clone())?;
        Ok(Self::with_curve(cfg, engine, Box::new(table)))
    }

    /// Same as [`Drivetrain::new`] with a caller-supplied torque curve.
    pub fn with_curve(
        cfg: &DrivetrainConfig,
        engine: &EngineConfig,
        curve: Box<dyn TorqueCurve>,
    ) -> Self {
        Self {
            cfg: *cfg,
            idle_rpm: engine.idle_rpm,
            max_rpm: engine.max_rpm,
            rpm_time_constant: engine.rpm_time_constant,
            clutch_slip: engine.clutch_slip,
            curve,
            current_rpm: engine.idle_rpm,
            current_torque: 0.0,
            cut: None,
        }
    }

    /// Engine rpm the road speed forces through a locked clutch.
    pub fn coupled_rpm(&self, road_speed: f32) -> f32 {
        road_speed.abs() / self.cfg.wheel_radius * self.cfg.gear_ratio * 60.0 / TAU
    }

    /// Advance the engine one tick and return its torque output (N*m).
    pub fn simulate(&mut self, throttle: f32, road_speed: f32, dt: FixedDt) -> f32 {
        let throttle = throttle.clamp(-1.0, 1.0);

        let coupled = self.coupled_rpm(road_speed);
        let free = self.idle_rpm + throttle.abs() * (self.max_rpm - self.idle_rpm) * self.clutch_slip;
        let target = coupled.max(free).clamp(self.idle_rpm, self.max_rpm);

        let alpha = 1.0 - (-dt.secs() / self.rpm_time_constant).exp();
        self.current_rpm += (target - self.current_rpm) * alpha;
        self.current_rpm = self.current_rpm.clamp(self.idle_rpm, self.max_rpm);

        let cut = if throttle > 0.0 && road_speed >= self.cfg.max_speed {
            Some(TorqueCut::Governor)
        } else {
            None
        };
        if cut != self.cut {
            debug!(?cut, road_speed, rpm = self.current_rpm, "drive torque cut changed");
        }
        self.cut = cut;

        self.current_torque = match cut {
            Some(_) => 0.0,
            None => self.curve.torque_at(self.current_rpm) * throttle,
        };
        self.current_torque
    }

    pub fn current_rpm(&self) -> f32 {
        self.current_rpm
    }

    pub fn current_torque(&self) -> f32 {
        self.current_torque
    }

    pub fn cut(&self) -> Option<TorqueCut> {
        self.cut
    }

    pub fn driven_axle(&self) -> Axle {
        self.cfg.driven_axle
    }

    pub fn wheel_radius(&self) -> f32 {
        self.cfg.wheel_radius
    }

    pub fn is_red_lined(&self) -> bool {
        self.current_rpm >= self.max_rpm - 1.0
    }

    /// Torque delivered to the whole driven axle (N*m).
    pub fn wheel_torque(&self) -> f32 {
        self.current_torque * self.cfg.gear_ratio * self.cfg.drivetrain_efficiency
    }

    /// Torque at one wheel of the driven axle (N*m).
    pub fn torque_per_wheel(&self) -> f32 {
        self.wheel_torque() * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dt() -> FixedDt {
        FixedDt::new(0.02).unwrap()
    }

    fn drivetrain() -> Drivetrain {
        Drivetrain::new(&DrivetrainConfig::default(), &EngineConfig::default()).unwrap()
    }

    struct Flat(f32);

    impl TorqueCurve for Flat {
        fn torque_at(&self, _rpm: f32) -> f32 {
            self.0
        }
    }

    #[test]
    fn table_interpolates_and_holds_ends() {
        let t = TorqueTable::new(vec![[1000.0, 10.0], [2000.0, 20.0], [4000.0, 0.0]]).unwrap();
        assert_relative_eq!(t.torque_at(500.0), 10.0);
        assert_relative_eq!(t.torque_at(1500.0), 15.0);
        assert_relative_eq!(t.torque_at(2000.0), 20.0);
        assert_relative_eq!(t.torque_at(3000.0), 10.0);
        assert_relative_eq!(t.torque_at(9000.0), 0.0);
    }

    #[test]
    fn table_rejects_bad_shapes() {
        assert!(TorqueTable::new(vec![[1000.0, 10.0]]).is_err());
        assert!(TorqueTable::new(vec![[1000.0, 10.0], [1000.0, 12.0]]).is_err());
    }

    #[test]
    fn wheel_torque_applies_gearing_and_efficiency() {
        let cfg = DrivetrainConfig::default();
        let mut d = Drivetrain::with_curve(&cfg, &EngineConfig::default(), Box::new(Flat(10.0)));
        let out = d.simulate(1.0, 5.0, dt());

        assert_relative_eq!(out, 10.0);
        assert_relative_eq!(d.wheel_torque(), 10.0 * 8.0 * 0.9, epsilon = 1e-4);
        assert_relative_eq!(d.torque_per_wheel(), 36.0, epsilon = 1e-4);
    }

    #[test]
    fn rpm_lags_toward_target() {
        let mut d = drivetrain();
        let idle = EngineConfig::default().idle_rpm;
        assert_relative_eq!(d.current_rpm(), idle);

        d.simulate(1.0, 0.0, dt());
        let first = d.current_rpm();
        assert!(first > idle);

        for _ in 0..500 {
            d.simulate(1.0, 0.0, dt());
        }
        let e = EngineConfig::default();
        let free = e.idle_rpm + (e.max_rpm - e.idle_rpm) * e.clutch_slip;
        assert!(d.current_rpm() > first);
        assert_relative_eq!(d.current_rpm(), free, epsilon = 1.0);
    }

    #[test]
    fn rpm_follows_road_speed_when_coupled() {
        let mut d = drivetrain();
        for _ in 0..500 {
            d.simulate(0.2, 15.0, dt());
        }
        assert_relative_eq!(d.current_rpm(), d.coupled_rpm(15.0), epsilon = 1.0);
    }

    #[test]
    fn governor_cuts_forward_drive_only() {
        let mut d = drivetrain();
        let max = DrivetrainConfig::default().max_speed;

        assert_eq!(d.simulate(1.0, max, dt()), 0.0);
        assert_eq!(d.cut(), Some(TorqueCut::Governor));
        assert_eq!(d.wheel_torque(), 0.0);

        // Reverse is never capped.
        assert!(d.simulate(-1.0, max + 5.0, dt()) < 0.0);
        assert_eq!(d.cut(), None);

        assert!(d.simulate(1.0, max - 0.5, dt()) > 0.0);
    }

    #[test]
    fn zero_throttle_makes_no_torque() {
        let mut d = drivetrain();
        assert_eq!(d.simulate(0.0, 3.0, dt()), 0.0);
    }

    #[test]
    fn over_redline_holds_rpm_and_keeps_driving() {
        let cfg = DrivetrainConfig {
            max_speed: 100.0,
            ..DrivetrainConfig::default()
        };
        let engine = EngineConfig::default();
        let mut d = Drivetrain::new(&cfg, &engine).unwrap();
        assert!(d.coupled_rpm(40.0) > engine.max_rpm);

        for _ in 0..200 {
            d.simulate(1.0, 40.0, dt());
        }
        assert_eq!(d.cut(), None);
        assert!(d.is_red_lined());
        assert_relative_eq!(d.current_rpm(), engine.max_rpm, epsilon = 1.0);
        assert_relative_eq!(d.current_torque(), 12.0, epsilon = 1e-3);
    }
}
