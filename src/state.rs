use serde::Serialize;

use crate::input::DriverInput;
use crate::telemetry::{ForceRecord, Telemetry};

/// One dumped frame: the model's telemetry plus where the chassis was.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub time: f32,
    pub position: [f32; 3],
    pub telemetry: Telemetry,
    pub forces: Vec<ForceRecord>,
}

#[derive(Debug, Default, Serialize)]
pub struct Recording {
    pub frames: Vec<Frame>,
}

/// Shared between the input sampler task and the fixed-step physics loop.
pub struct SimState {
    pub tick: u64,
    /// Most recent sample; the physics loop reads it at every tick.
    pub input: DriverInput,
    pub input_samples: u64,
    pub recording: Recording,
    pub finished: bool,
}

impl SimState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            input: DriverInput::default(),
            input_samples: 0,
            recording: Recording::default(),
            finished: false,
        }
    }

    pub fn latch_input(&mut self, input: DriverInput) {
        self.input = input.clamped();
        self.input_samples += 1;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.recording)
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}
