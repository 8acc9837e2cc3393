use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

/// Haptic feedback categories. Hardware without a vibration motor gets the
/// same patterns as short audio pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticKind {
    /// Double pulse.
    Success,
    /// Single strong pulse.
    Error,
    /// Single medium pulse.
    Warning,
    /// Same pattern as `Warning`.
    Medium,
    /// Single light pulse.
    Light,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PulseSpec {
    pub freq: f32,
    pub amplitude: f32,
    pub millis: u64,
}

const fn pulse(freq: f32, amplitude: f32, millis: u64) -> PulseSpec {
    PulseSpec {
        freq,
        amplitude,
        millis,
    }
}

const fn gap(millis: u64) -> PulseSpec {
    pulse(0.0, 0.0, millis)
}

impl HapticKind {
    /// The fixed physical pattern; zero-amplitude entries are gaps.
    pub(crate) fn pattern(self) -> Vec<PulseSpec> {
        match self {
            HapticKind::Success => vec![pulse(180.0, 0.6, 90), gap(70), pulse(180.0, 0.45, 70)],
            HapticKind::Error => vec![pulse(110.0, 0.9, 200)],
            HapticKind::Warning | HapticKind::Medium => vec![pulse(160.0, 0.6, 120)],
            HapticKind::Light => vec![pulse(220.0, 0.35, 60)],
        }
    }
}

/// Finite sine burst for one pulse of a haptic pattern.
pub(crate) struct HapticPulse {
    freq: f32,
    amplitude: f32,
    sample_rate: u32,
    total_samples: usize,
    num_sample: usize,
}

impl HapticPulse {
    pub(crate) fn new(spec: PulseSpec) -> Self {
        let sample_rate = 44100;
        Self {
            freq: spec.freq,
            amplitude: spec.amplitude,
            sample_rate,
            total_samples: (sample_rate as u64 * spec.millis / 1000) as usize,
            num_sample: 0,
        }
    }
}

impl Iterator for HapticPulse {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        self.num_sample += 1;

        let t = self.num_sample as f32 / self.sample_rate as f32;
        Some((2.0 * PI * self.freq * t).sin() * self.amplitude)
    }
}

impl Source for HapticPulse {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / self.sample_rate as f32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_a_double_pulse() {
        let pattern = HapticKind::Success.pattern();
        let audible: Vec<_> = pattern.iter().filter(|p| p.amplitude > 0.0).collect();
        assert_eq!(audible.len(), 2);
    }

    #[test]
    fn warning_and_medium_share_a_pattern() {
        let warning = HapticKind::Warning.pattern();
        let medium = HapticKind::Medium.pattern();
        assert_eq!(warning.len(), medium.len());
        assert_eq!(warning[0].millis, medium[0].millis);
    }

    #[test]
    fn pulse_ends_after_its_duration() {
        let samples: Vec<f32> = HapticPulse::new(pulse(180.0, 0.5, 10)).collect();
        assert_eq!(samples.len(), 441);
        assert!(samples.iter().all(|s| s.abs() <= 0.5));
    }
}
