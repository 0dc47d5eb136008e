//! Generated audio buffers — the noise loop and the reverb impulse response.

use rand::Rng;
use serde::Serialize;

/// Planar PCM audio handed to the host (one `Vec` per channel).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBuffer {
    pub sample_rate: f32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }
}

fn frame_count(sample_rate: f32, seconds: f64) -> usize {
    ((sample_rate as f64 * seconds).round() as usize).max(1)
}

/// Mono white noise, uniform in [-1, 1), for a looping buffer source.
pub fn white_noise<R: Rng>(sample_rate: f32, seconds: f64, rng: &mut R) -> AudioBuffer {
    let frames = frame_count(sample_rate, seconds);
    let samples: Vec<f32> = (0..frames).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    AudioBuffer {
        sample_rate,
        channels: vec![samples],
    }
}

/// Stereo impulse response: noise under a `(1 - t)^decay` envelope.
///
/// Each channel gets independent noise so the tail is decorrelated.
pub fn impulse_response<R: Rng>(sample_rate: f32, seconds: f64, decay: f64, rng: &mut R) -> AudioBuffer {
    let frames = frame_count(sample_rate, seconds);
    let channels = (0..2)
        .map(|_| {
            (0..frames)
                .map(|i| {
                    let remaining = 1.0 - i as f64 / frames as f64;
                    let envelope = remaining.powf(decay) as f32;
                    rng.gen_range(-1.0f32..1.0) * envelope
                })
                .collect::<Vec<f32>>()
        })
        .collect();
    AudioBuffer {
        sample_rate,
        channels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn noise_length_and_range() {
        let mut rng = SmallRng::seed_from_u64(1);
        let buf = white_noise(48000.0, 2.0, &mut rng);
        assert_eq!(buf.channels.len(), 1);
        assert_eq!(buf.len(), 96000);
        assert!((buf.duration() - 2.0).abs() < 1e-9);
        assert!(buf.channels[0].iter().all(|s| (-1.0..1.0).contains(s)));
    }

    #[test]
    fn impulse_decays() {
        let mut rng = SmallRng::seed_from_u64(2);
        let buf = impulse_response(8000.0, 1.0, 2.0, &mut rng);
        assert_eq!(buf.channels.len(), 2);
        assert_ne!(buf.channels[0], buf.channels[1], "channels should be decorrelated");

        let energy = |s: &[f32]| s.iter().map(|x| x * x).sum::<f32>();
        let head = energy(&buf.channels[0][..800]);
        let tail = energy(&buf.channels[0][7200..]);
        assert!(head > tail * 10.0, "impulse should decay: head {head}, tail {tail}");
    }

    #[test]
    fn zero_length_still_has_a_frame() {
        let mut rng = SmallRng::seed_from_u64(3);
        let buf = white_noise(48000.0, 0.0, &mut rng);
        assert_eq!(buf.len(), 1);
        assert!(!buf.is_empty());
    }
}
