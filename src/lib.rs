//! Kart vehicle dynamics: raycast suspension, anti-roll bars, a friction-circle
//! tire model, engine + drivetrain and aerodynamics, evaluated once per fixed
//! tick and emitted as world-space forces for an external integrator.
//!
//! `kart_model` is host-agnostic. `physics` is a rapier host used by the demo
//! binary.

pub mod config;
pub mod error;
pub mod input;
pub mod kart_model;
pub mod physics;
pub mod state;
pub mod telemetry;

pub use config::{KartConfig, KartProfile};
pub use error::ConfigError;
pub use kart_model::KartDynamics;
