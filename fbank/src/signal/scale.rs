//! Perceptual frequency scales.
//!
//! Every scale is a monotonically increasing map from Hz with an exact
//! inverse, so band edges can be spaced uniformly on the scale and mapped
//! back to Hz.

const MEL_HTK_FACTOR: f64 = 1127.0;
const MEL_HTK_BREAK: f64 = 700.0;

const MEL_SLANEY_LINEAR_STEP: f64 = 200.0 / 3.0;
const MEL_SLANEY_LOG_HZ: f64 = 1000.0;
const MEL_SLANEY_LOG_MEL: f64 = 15.0;

/// Ear quality factor of the Glasberg and Moore ERB model.
pub const EAR_Q: f64 = 9.26449;
/// Minimum ERB bandwidth in Hz.
pub const MIN_BW: f64 = 24.7;

/// Concert pitch in Hz.
pub const A440: f64 = 440.0;

fn mel_slaney_log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// HTK mel: `1127 · ln(1 + f/700)`.
pub fn hz_to_mel(hz: f64) -> f64 {
    MEL_HTK_FACTOR * (1.0 + hz / MEL_HTK_BREAK).ln()
}

/// Inverse of [`hz_to_mel`].
pub fn mel_to_hz(mel: f64) -> f64 {
    MEL_HTK_BREAK * ((mel / MEL_HTK_FACTOR).exp() - 1.0)
}

/// Slaney mel: linear below 1 kHz, logarithmic above.
pub fn hz_to_mel_slaney(hz: f64) -> f64 {
    if hz < MEL_SLANEY_LOG_HZ {
        hz / MEL_SLANEY_LINEAR_STEP
    } else {
        MEL_SLANEY_LOG_MEL + (hz / MEL_SLANEY_LOG_HZ).ln() / mel_slaney_log_step()
    }
}

/// Inverse of [`hz_to_mel_slaney`].
pub fn mel_slaney_to_hz(mel: f64) -> f64 {
    if mel < MEL_SLANEY_LOG_MEL {
        mel * MEL_SLANEY_LINEAR_STEP
    } else {
        MEL_SLANEY_LOG_HZ * (mel_slaney_log_step() * (mel - MEL_SLANEY_LOG_MEL)).exp()
    }
}

/// Traunmüller bark: `26.81 f / (1960 + f) − 0.53`.
pub fn hz_to_bark(hz: f64) -> f64 {
    26.81 * hz / (1960.0 + hz) - 0.53
}

/// Inverse of [`hz_to_bark`].
pub fn bark_to_hz(bark: f64) -> f64 {
    1960.0 / (26.81 / (bark + 0.53) - 1.0)
}

/// Slaney bark: `6 · asinh(f / 600)`.
pub fn hz_to_bark_slaney(hz: f64) -> f64 {
    6.0 * (hz / 600.0).asinh()
}

/// Inverse of [`hz_to_bark_slaney`].
pub fn bark_slaney_to_hz(bark: f64) -> f64 {
    600.0 * (bark / 6.0).sinh()
}

/// ERB-rate: `EAR_Q · ln(1 + f / (MIN_BW · EAR_Q))`.
pub fn hz_to_erb(hz: f64) -> f64 {
    EAR_Q * (1.0 + hz / (MIN_BW * EAR_Q)).ln()
}

/// Inverse of [`hz_to_erb`].
pub fn erb_to_hz(erb: f64) -> f64 {
    ((erb / EAR_Q).exp() - 1.0) * MIN_BW * EAR_Q
}

fn tuned_a440(tuning: f64, bins_per_octave: usize) -> f64 {
    A440 * 2f64.powf(tuning / bins_per_octave as f64)
}

/// Octave number relative to C0 (`A440 / 16`), with A440 detuned by
/// `tuning` fractions of a bin.
pub fn hz_to_octave(hz: f64, tuning: f64, bins_per_octave: usize) -> f64 {
    (hz / (tuned_a440(tuning, bins_per_octave) / 16.0)).log2()
}

/// Inverse of [`hz_to_octave`].
pub fn octave_to_hz(octave: f64, tuning: f64, bins_per_octave: usize) -> f64 {
    tuned_a440(tuning, bins_per_octave) / 16.0 * 2f64.powf(octave)
}

/// MIDI note number, with A4 = 69.
pub fn hz_to_midi(hz: f64) -> f64 {
    12.0 * (hz / A440).log2() + 69.0
}

/// Inverse of [`hz_to_midi`].
pub fn midi_to_hz(note: f64) -> f64 {
    A440 * 2f64.powf((note - 69.0) / 12.0)
}

/// A frequency scale bands can be laid out on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Scale {
    /// Linear frequency.
    #[default]
    Hz,
    /// HTK mel.
    Mel,
    /// Slaney mel.
    MelSlaney,
    /// Traunmüller bark.
    Bark,
    /// Slaney bark.
    BarkSlaney,
    /// ERB-rate.
    Erb,
    /// Octaves relative to C0.
    Octave {
        /// Detuning in fractions of a bin.
        tuning: f64,
        /// Bins per octave.
        bins_per_octave: usize,
    },
}

impl Scale {
    /// Map a frequency in Hz onto the scale.
    pub fn from_hz(&self, hz: f64) -> f64 {
        match *self {
            Scale::Hz => hz,
            Scale::Mel => hz_to_mel(hz),
            Scale::MelSlaney => hz_to_mel_slaney(hz),
            Scale::Bark => hz_to_bark(hz),
            Scale::BarkSlaney => hz_to_bark_slaney(hz),
            Scale::Erb => hz_to_erb(hz),
            Scale::Octave {
                tuning,
                bins_per_octave,
            } => hz_to_octave(hz, tuning, bins_per_octave),
        }
    }

    /// Map a scale value back to Hz.
    pub fn to_hz(&self, value: f64) -> f64 {
        match *self {
            Scale::Hz => value,
            Scale::Mel => mel_to_hz(value),
            Scale::MelSlaney => mel_slaney_to_hz(value),
            Scale::Bark => bark_to_hz(value),
            Scale::BarkSlaney => bark_slaney_to_hz(value),
            Scale::Erb => erb_to_hz(value),
            Scale::Octave {
                tuning,
                bins_per_octave,
            } => octave_to_hz(value, tuning, bins_per_octave),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn reference_points() {
        assert_abs_diff_eq!(hz_to_mel(700.0), 1127.0 * 2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(hz_to_mel_slaney(1000.0), 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hz_to_mel_slaney(500.0), 7.5, epsilon = 1e-12);
        assert_abs_diff_eq!(hz_to_midi(440.0), 69.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hz_to_octave(440.0, 0.0, 12), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hz_to_erb(0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hz_to_bark_slaney(0.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn every_scale_inverts() {
        let scales = [
            Scale::Hz,
            Scale::Mel,
            Scale::MelSlaney,
            Scale::Bark,
            Scale::BarkSlaney,
            Scale::Erb,
            Scale::Octave {
                tuning: 0.25,
                bins_per_octave: 12,
            },
        ];
        for scale in scales {
            for hz in [50.0, 440.0, 999.0, 1000.0, 4321.0, 11025.0] {
                assert_relative_eq!(scale.to_hz(scale.from_hz(hz)), hz, max_relative = 1e-10);
            }
        }
    }

    #[test]
    fn scales_are_monotonic() {
        let grid: Vec<f64> = (1..200).map(|i| i as f64 * 40.0).collect();
        for scale in [Scale::Mel, Scale::MelSlaney, Scale::Bark, Scale::Erb] {
            assert!(grid
                .windows(2)
                .all(|pair| scale.from_hz(pair[0]) < scale.from_hz(pair[1])));
        }
    }
}
