//! Core shared types for `kart_model` (host-agnostic).
// kart_model/types.rs
use std::fmt;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub type Vec3 = Vector3<f32>;
pub type Pt3 = Point3<f32>;

/// Below this length a vector is not normalized.
pub const NORMALIZE_EPS: f32 = 1e-6;

#[inline]
pub fn safe_normalize(v: Vec3) -> Option<Vec3> {
    let n = v.norm();
    if n > NORMALIZE_EPS { Some(v / n) } else { None }
}

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axle {
    Front,
    Rear,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Side {
    Left,
    Right,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    /// Array order used by every per-corner table in the crate.
    pub const ALL: [WheelId; 4] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn new(axle: Axle, side: Side) -> Self {
        match (axle, side) {
            (Axle::Front, Side::Left) => WheelId::FL,
            (Axle::Front, Side::Right) => WheelId::FR,
            (Axle::Rear, Side::Left) => WheelId::RL,
            (Axle::Rear, Side::Right) => WheelId::RR,
        }
    }

    pub fn index(self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn axle(self) -> Axle {
        match self {
            WheelId::FL | WheelId::FR => Axle::Front,
            WheelId::RL | WheelId::RR => Axle::Rear,
        }
    }

    pub fn side(self) -> Side {
        match self {
            WheelId::FL | WheelId::RL => Side::Left,
            WheelId::FR | WheelId::RR => Side::Right,
        }
    }

    pub fn is_front(self) -> bool {
        self.axle() == Axle::Front
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Fixed tick
// ============================================

/// A tick length that is known to be positive and finite.
///
/// The damper and the engine lag both divide or exponentiate by `dt`, so the
/// only way to get one is through [`FixedDt::new`], which rejects anything
/// else as a configuration error.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FixedDt(f32);

impl FixedDt {
    pub fn new(dt: f32) -> Result<Self, ConfigError> {
        if dt.is_finite() && dt > 0.0 {
            Ok(Self(dt))
        } else {
            Err(ConfigError::NonPositiveTick(dt))
        }
    }

    #[inline]
    pub fn secs(self) -> f32 {
        self.0
    }
}

// ============================================
// Poses + forces
// ============================================

/// World-space position and orthonormal axes of a mount, refreshed by the
/// host every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountPose {
    pub position: Pt3,
    pub up: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
}

impl MountPose {
    pub fn down(&self) -> Vec3 {
        -self.up
    }
}

/// Which subsystem produced a force. Hosts ignore it; telemetry and tests
/// use it to pull one contribution out of the tick's force list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ForceSource {
    Suspension(WheelId),
    AntiRoll(WheelId),
    Tire(WheelId),
    Drag,
    WingDownforce,
    GroundEffect,
}

/// One world-space force and where it acts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedForce {
    pub source: ForceSource,
    pub force: Vec3,
    pub point: Pt3,
}
