//! Random LFO — a held-value ("sample and hold") random generator.
//!
//! Runs inside an AudioWorklet. Every `ceil(sample_rate / frequency)` frames a
//! new uniform value in [-1, 1) is drawn and held until the next refresh.
//! The output is a mono modulation signal copied to every output channel.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Name the processor is registered under in the worklet scope.
pub const PROCESSOR_NAME: &str = "random-lfo";

/// Descriptor of the single `frequency` parameter, as handed to
/// `AudioWorkletProcessor.parameterDescriptors`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub default_value: f32,
    pub min_value: f32,
    pub max_value: f32,
    pub automation_rate: &'static str,
}

/// The `frequency` parameter: 0.1–100 Hz, default 5, control rate.
pub const FREQUENCY_PARAM: ParamDescriptor = ParamDescriptor {
    name: "frequency",
    default_value: 5.0,
    min_value: 0.1,
    max_value: 100.0,
    automation_rate: "k-rate",
};

#[derive(Debug, Clone)]
pub struct RandomLfo {
    sample_rate: f32,
    /// Frames elapsed since the last refresh.
    phase: u64,
    value: f32,
    rng: SmallRng,
}

impl RandomLfo {
    /// Create a generator. The first held value is drawn immediately.
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let value = rng.gen_range(-1.0..1.0);
        RandomLfo {
            sample_rate,
            phase: 0,
            value,
            rng,
        }
    }

    /// The currently held value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Frames between refreshes for `frequency`, or `None` when frozen.
    ///
    /// The frequency is clamped to (0, sample_rate / 2].
    pub fn samples_per_cycle(&self, frequency: f32) -> Option<u64> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }
        let frequency = frequency.min(self.sample_rate / 2.0);
        Some((self.sample_rate / frequency).ceil().max(1.0) as u64)
    }

    /// Advance one frame at `frequency` and return the held value.
    pub fn next_sample(&mut self, frequency: f32) -> f32 {
        if let Some(threshold) = self.samples_per_cycle(frequency) {
            self.phase += 1;
            if self.phase >= threshold {
                // Keep the remainder so a rate change never drifts the phase.
                self.phase -= threshold;
                self.value = self.rng.gen_range(-1.0..1.0);
            }
        }
        self.value
    }

    /// Render one block.
    ///
    /// `frequency` holds either one value for the whole block (k-rate) or one
    /// value per frame (a-rate). Every channel receives the same samples.
    pub fn process(&mut self, frequency: &[f32], outputs: &mut [&mut [f32]]) {
        let Some((first, rest)) = outputs.split_first_mut() else {
            return;
        };

        for (i, sample) in first.iter_mut().enumerate() {
            let f = match frequency {
                [] => FREQUENCY_PARAM.default_value,
                [k] => *k,
                per_frame => per_frame.get(i).copied().unwrap_or(per_frame[per_frame.len() - 1]),
            };
            *sample = self.next_sample(f);
        }

        for channel in rest.iter_mut() {
            let n = channel.len().min(first.len());
            channel[..n].copy_from_slice(&first[..n]);
        }
    }
}
