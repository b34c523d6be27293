// ==============================================================================
// anti_roll.rs — ANTI-ROLL BAR (ARB) COUPLING, ONE AXLE AT A TIME
// ------------------------------------------------------------------------------
// Anti-roll bars resist body roll by pushing the two corners of an axle against
// each other in proportion to their compression difference:
//
//   diff  = compression_left - compression_right
//   force = diff * stiffness
//   left  receives -up * force   (more compressed side is pressed down)
//   right receives +up * force   (other side is lifted)
//
// Ordering:
// - Runs AFTER all four suspension corners for the tick. It reads the
//   compressions the suspension step just wrote, never last tick's.
//
// Gating:
// - ContactFlag: a corner receives its share only if the suspension step
//   found ground this tick.
// - CompressionThreshold: the older heuristic, "compression > -epsilon".
//   It cannot tell an airborne wheel holding its last compression from a
//   loaded one, so it is opt-in.
// ==============================================================================

use crate::config::{AntiRollConfig, AntiRollGating};
use crate::kart_model::suspension::WheelCorner;

/// Compressions of one axle pair, as written by this tick's suspension step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxleCompression {
    pub left: f32,
    pub right: f32,
}

/// Signed magnitudes along each corner's up axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AntiRollForces {
    pub left: f32,
    pub right: f32,
}

/// Bar force for one axle, before gating.
pub fn apply(axle: AxleCompression, stiffness: f32) -> AntiRollForces {
    let force = (axle.left - axle.right) * stiffness;
    AntiRollForces {
        left: -force,
        right: force,
    }
}

/// Whether a corner is treated as loaded for anti-roll purposes.
pub fn is_loaded(corner: &WheelCorner, cfg: &AntiRollConfig) -> bool {
    match cfg.gating {
        AntiRollGating::ContactFlag => corner.in_contact,
        AntiRollGating::CompressionThreshold => corner.last_compression > -cfg.contact_epsilon,
    }
}

/// Bar force for an axle pair with gating applied: an unloaded corner gets 0.
pub fn axle_forces(
    left: &WheelCorner,
    right: &WheelCorner,
    stiffness: f32,
    cfg: &AntiRollConfig,
) -> AntiRollForces {
    let raw = apply(
        AxleCompression {
            left: left.last_compression,
            right: right.last_compression,
        },
        stiffness,
    );

    AntiRollForces {
        left: if is_loaded(left, cfg) { raw.left } else { 0.0 },
        right: if is_loaded(right, cfg) { raw.right } else { 0.0 },
    }
}
