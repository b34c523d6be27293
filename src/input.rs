// ==============================================================================
// input.rs — DRIVER INPUT (SAMPLED OFF THE PHYSICS TICK)
// ------------------------------------------------------------------------------
// DriverInput is the normalized control triple the physics step reads:
//   steer    in [-1, 1]   (positive = right)
//   throttle in [-1, 1]   (negative = reverse drive)
//   handbrake bool
//
// InputSource is whatever produces it (keyboard, network, script). The host
// samples it on its own cadence and the physics step always reads the most
// recent sample.
//
// ScriptedDriver: timed segments for headless runs and tests.
// ==============================================================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverInput {
    pub steer: f32,
    pub throttle: f32,
    pub handbrake: bool,
}

impl DriverInput {
    pub fn new(steer: f32, throttle: f32, handbrake: bool) -> Self {
        Self { steer, throttle, handbrake }.clamped()
    }

    /// NaN reads as released.
    pub fn clamped(self) -> Self {
        let clamp = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
        Self {
            steer: clamp(self.steer),
            throttle: clamp(self.throttle),
            handbrake: self.handbrake,
        }
    }
}

pub trait InputSource: Send {
    /// Sample the controls at `time` seconds since start.
    fn sample(&mut self, time: f32) -> DriverInput;
}

/// One timed segment: `input` holds from the previous segment's end for
/// `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptSegment {
    pub duration: f32,
    pub input: DriverInput,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptedDriver {
    segments: Vec<ScriptSegment>,
}

impl ScriptedDriver {
    pub fn new(segments: Vec<ScriptSegment>) -> Self {
        Self { segments }
    }

    /// Launch, sweep right then left, pull the handbrake, coast.
    pub fn demo_lap() -> Self {
        Self::new(vec![
            ScriptSegment { duration: 1.0, input: DriverInput::default() },
            ScriptSegment { duration: 6.0, input: DriverInput::new(0.0, 1.0, false) },
            ScriptSegment { duration: 3.0, input: DriverInput::new(0.4, 1.0, false) },
            ScriptSegment { duration: 3.0, input: DriverInput::new(-0.4, 0.8, false) },
            ScriptSegment { duration: 1.5, input: DriverInput::new(0.6, 0.0, true) },
            ScriptSegment { duration: 4.0, input: DriverInput::new(0.0, 0.0, false) },
        ])
    }

    pub fn total_duration(&self) -> f32 {
        self.segments.iter().map(|s| s.duration.max(0.0)).sum()
    }
}

impl InputSource for ScriptedDriver {
    fn sample(&mut self, time: f32) -> DriverInput {
        let mut end = 0.0;
        for segment in &self.segments {
            end += segment.duration.max(0.0);
            if time < end {
                return segment.input.clamped();
            }
        }
        // Past the script: controls released.
        DriverInput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_is_clamped() {
        let i = DriverInput::new(-3.0, 2.0, true);
        assert_eq!(i, DriverInput { steer: -1.0, throttle: 1.0, handbrake: true });

        let i = DriverInput::new(f32::NAN, 0.5, false);
        assert_eq!(i.steer, 0.0);
    }

    #[test]
    fn script_walks_segments_in_order() {
        let mut d = ScriptedDriver::new(vec![
            ScriptSegment { duration: 1.0, input: DriverInput::new(0.0, 1.0, false) },
            ScriptSegment { duration: 0.5, input: DriverInput::new(0.3, 0.0, true) },
        ]);

        assert_eq!(d.sample(0.0).throttle, 1.0);
        assert_eq!(d.sample(0.99).throttle, 1.0);
        assert!(d.sample(1.2).handbrake);
        assert_eq!(d.sample(1.6), DriverInput::default());
        assert_eq!(d.total_duration(), 1.5);
    }

    #[test]
    fn demo_lap_has_a_launch() {
        let mut d = ScriptedDriver::demo_lap();
        assert_eq!(d.sample(0.5).throttle, 0.0);
        assert_eq!(d.sample(2.0).throttle, 1.0);
        assert!(d.total_duration() > 10.0);
    }
}
