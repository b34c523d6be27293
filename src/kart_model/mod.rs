//! kart_model - host-agnostic kart dynamics (pure types + per-tick solver)

pub mod types;
pub mod kinematics;
pub mod suspension;
pub mod anti_roll;
pub mod tire;
pub mod drivetrain;
pub mod aero;
pub mod steering;
pub mod solve;

pub use types::*;
pub use kinematics::{FlatGround, ForceSink, GroundProbe, KinematicState};
pub use solve::KartDynamics;
