use itertools::Itertools;
use log::debug;

use super::Band;
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::signal::scale::Scale;
use crate::signal::traits::BandLayoutDesign;

/// Lower edge used by [`octave_bands`] when none is given.
pub const DEFAULT_OCTAVE_LOW: f64 = 62.5;

const CRITICAL_EDGES: [f64; 25] = [
    20.0, 100.0, 200.0, 300.0, 400.0, 510.0, 630.0, 770.0, 920.0, 1080.0, 1270.0, 1480.0, 1720.0,
    2000.0, 2320.0, 2700.0, 3150.0, 3700.0, 4400.0, 5300.0, 6400.0, 7700.0, 9500.0, 12000.0,
    15500.0,
];

const CRITICAL_CENTERS: [f64; 24] = [
    50.0, 150.0, 250.0, 350.0, 450.0, 570.0, 700.0, 840.0, 1000.0, 1170.0, 1370.0, 1600.0, 1850.0,
    2150.0, 2500.0, 2900.0, 3400.0, 4000.0, 4800.0, 5800.0, 7000.0, 8500.0, 10500.0, 13500.0,
];

/// How band edges are placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandLayout {
    /// Edges spaced uniformly on a scale.
    Uniform(Scale),
    /// The fixed 24-band critical-band table.
    Critical,
    /// Doubling recurrence from the lower edge.
    Octave,
}

/// Constructor config for [`BandLayoutKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandLayoutConfig {
    /// Edge placement.
    pub layout: BandLayout,
    /// Number of bands requested. Table-driven layouts may return fewer.
    pub count: usize,
    /// Sampling rate in Hz.
    pub sample_rate: f64,
    /// Lower frequency in Hz. Negative values are clamped to 0.
    pub low: f64,
    /// Upper frequency in Hz. Values `<= low` mean Nyquist.
    pub high: f64,
    /// Overlapping bands share edges with their neighbors' centers;
    /// otherwise bands tile the range edge to edge.
    pub overlap: bool,
}

/// Band layout kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandLayoutKernel {
    layout: BandLayout,
    count: usize,
    low: f64,
    high: f64,
    overlap: bool,
}

impl KernelLifecycle for BandLayoutKernel {
    type Config = BandLayoutConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.count == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "count",
                reason: "band count must be > 0",
            });
        }
        if !config.sample_rate.is_finite() || config.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "sample_rate",
                reason: "sample_rate must be finite and > 0",
            });
        }
        let low = if config.layout == BandLayout::Octave && config.low <= 0.0 {
            DEFAULT_OCTAVE_LOW
        } else {
            config.low.max(0.0)
        };
        let high = if config.high <= low {
            config.sample_rate / 2.0
        } else {
            config.high
        };
        if !(low < high) || !high.is_finite() {
            return Err(ConfigError::InvalidArgument {
                arg: "low",
                reason: "lower frequency must be below the upper frequency",
            });
        }
        Ok(Self {
            layout: config.layout,
            count: config.count,
            low,
            high,
            overlap: config.overlap,
        })
    }
}

impl BandLayoutKernel {
    fn uniform(&self, scale: Scale) -> Vec<Band> {
        let start = scale.from_hz(self.low);
        let span = scale.from_hz(self.high) - start;
        if self.overlap {
            let step = span / (self.count + 1) as f64;
            (0..self.count + 2)
                .map(|i| scale.to_hz(start + i as f64 * step))
                .tuple_windows()
                .map(|(left, center, right)| Band::new(left, center, right))
                .collect()
        } else {
            let step = span / self.count as f64;
            (0..self.count + 1)
                .map(|i| scale.to_hz(start + i as f64 * step))
                .tuple_windows()
                .map(|(left, right)| Band::new(left, (left + right) / 2.0, right))
                .collect()
        }
    }

    fn critical(&self) -> Vec<Band> {
        (0..CRITICAL_CENTERS.len())
            .filter(|&i| CRITICAL_CENTERS[i] >= self.low && CRITICAL_CENTERS[i] <= self.high)
            .take(self.count)
            .map(|i| Band::new(CRITICAL_EDGES[i], CRITICAL_CENTERS[i], CRITICAL_EDGES[i + 1]))
            .collect()
    }

    fn octave(&self) -> Vec<Band> {
        (0..self.count)
            .map(|i| {
                let left = self.low * 2f64.powi(i as i32);
                if self.overlap {
                    Band::new(left, 2.0 * left, 4.0 * left)
                } else {
                    Band::new(left, left * core::f64::consts::SQRT_2, 2.0 * left)
                }
            })
            .take_while(|band| band.right <= self.high)
            .collect()
    }
}

impl BandLayoutDesign for BandLayoutKernel {
    fn run_alloc(&self) -> Result<Vec<Band>, ExecInvariantViolation> {
        let bands = match self.layout {
            BandLayout::Uniform(scale) => self.uniform(scale),
            BandLayout::Critical => self.critical(),
            BandLayout::Octave => self.octave(),
        };
        if bands.is_empty() {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "no band fits inside the frequency range",
            });
        }
        if bands.len() < self.count {
            debug!(
                "{:?} layout: {} of {} requested bands fit in [{}, {}] Hz",
                self.layout,
                bands.len(),
                self.count,
                self.low,
                self.high
            );
        }
        Ok(bands)
    }
}

fn layout(
    layout: BandLayout,
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
    overlap: bool,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    BandLayoutKernel::try_new(BandLayoutConfig {
        layout,
        count,
        sample_rate,
        low,
        high,
        overlap,
    })?
    .run_alloc()
}

/// Bands spaced uniformly on `scale`.
pub fn uniform_bands(
    scale: Scale,
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
    overlap: bool,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    layout(BandLayout::Uniform(scale), count, sample_rate, low, high, overlap)
}

/// Overlapping bands spaced uniformly in Hz.
pub fn herz_bands(
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    uniform_bands(Scale::Hz, count, sample_rate, low, high, true)
}

/// Overlapping bands spaced uniformly in HTK mel.
pub fn mel_bands(
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    uniform_bands(Scale::Mel, count, sample_rate, low, high, true)
}

/// Overlapping bands spaced uniformly in Slaney mel.
pub fn mel_bands_slaney(
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    uniform_bands(Scale::MelSlaney, count, sample_rate, low, high, true)
}

/// Overlapping bands spaced uniformly in Traunmüller bark.
pub fn bark_bands(
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    uniform_bands(Scale::Bark, count, sample_rate, low, high, true)
}

/// Overlapping bands spaced uniformly in Slaney bark.
pub fn bark_bands_slaney(
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    uniform_bands(Scale::BarkSlaney, count, sample_rate, low, high, true)
}

/// Overlapping bands spaced uniformly in ERB-rate.
pub fn erb_bands(
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    uniform_bands(Scale::Erb, count, sample_rate, low, high, true)
}

/// Bands from the critical-band table whose centers lie in `[low, high]`.
pub fn critical_bands(
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    layout(BandLayout::Critical, count, sample_rate, low, high, false)
}

/// Octave bands starting at `low` (or [`DEFAULT_OCTAVE_LOW`] when
/// `low <= 0`), cut where the upper edge would pass `high`.
pub fn octave_bands(
    count: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
    overlap: bool,
) -> Result<Vec<Band>, ExecInvariantViolation> {
    layout(BandLayout::Octave, count, sample_rate, low, high, overlap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mel_bands_span_zero_to_nyquist() {
        let bands = mel_bands(10, 16000.0, 0.0, 0.0).expect("mel bands");
        assert_eq!(bands.len(), 10);
        assert_abs_diff_eq!(bands[0].left, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bands[9].right, 8000.0, epsilon = 1e-6);
        assert!(bands.windows(2).all(|w| w[0].center < w[1].center));
        // Overlapping bands share edges with neighbor centers.
        for w in bands.windows(2) {
            assert_abs_diff_eq!(w[0].center, w[1].left, epsilon = 1e-9);
            assert_abs_diff_eq!(w[0].right, w[1].center, epsilon = 1e-9);
        }
    }

    #[test]
    fn non_overlapping_bands_tile_the_range() {
        let bands = uniform_bands(Scale::Hz, 4, 8000.0, 0.0, 4000.0, false).expect("bands");
        assert_eq!(
            bands,
            vec![
                Band::new(0.0, 500.0, 1000.0),
                Band::new(1000.0, 1500.0, 2000.0),
                Band::new(2000.0, 2500.0, 3000.0),
                Band::new(3000.0, 3500.0, 4000.0),
            ]
        );
    }

    #[test]
    fn range_defaults_are_applied() {
        let bands = herz_bands(3, 8000.0, -100.0, 0.0).expect("bands");
        assert_eq!(bands[0].left, 0.0);
        assert_abs_diff_eq!(bands[2].right, 4000.0, epsilon = 1e-9);
        let slaney = mel_bands_slaney(5, 22050.0, 0.0, 0.0).expect("bands");
        assert_abs_diff_eq!(slaney[4].right, 11025.0, epsilon = 1e-6);
        for bands in [
            bark_bands(8, 16000.0, 50.0, 0.0),
            bark_bands_slaney(8, 16000.0, 50.0, 0.0),
            erb_bands(8, 16000.0, 50.0, 0.0),
        ] {
            let bands = bands.expect("bands");
            assert_abs_diff_eq!(bands[0].left, 50.0, epsilon = 1e-9);
            assert_abs_diff_eq!(bands[7].right, 8000.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn critical_bands_come_from_the_table() {
        let bands = critical_bands(24, 16000.0, 0.0, 0.0).expect("bands");
        assert_eq!(bands.len(), 21);
        assert_eq!(bands[0], Band::new(20.0, 50.0, 100.0));
        assert_eq!(bands[20], Band::new(6400.0, 7000.0, 7700.0));

        let bands = critical_bands(3, 44100.0, 400.0, 0.0).expect("bands");
        assert_eq!(bands[0], Band::new(400.0, 450.0, 510.0));
        assert_eq!(bands.len(), 3);
    }

    #[test]
    fn octave_bands_double_and_truncate() {
        let bands = octave_bands(10, 16000.0, 0.0, 0.0, false).expect("bands");
        assert_eq!(bands.len(), 7);
        assert_eq!(bands[0].left, 62.5);
        assert_abs_diff_eq!(bands[0].center, 62.5 * 2f64.sqrt(), epsilon = 1e-12);
        assert_eq!(bands[6].right, 8000.0);

        let overlapping = octave_bands(3, 16000.0, 100.0, 0.0, true).expect("bands");
        assert_eq!(overlapping[1], Band::new(200.0, 400.0, 800.0));

        assert!(octave_bands(4, 16000.0, 5000.0, 0.0, false).is_err());
    }

    #[test]
    fn invalid_layouts_fail_fast() {
        let err = BandLayoutKernel::try_new(BandLayoutConfig {
            layout: BandLayout::Uniform(Scale::Mel),
            count: 0,
            sample_rate: 16000.0,
            low: 0.0,
            high: 0.0,
            overlap: true,
        })
        .expect_err("zero bands");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "count", .. }));
        assert!(mel_bands(10, 16000.0, 9000.0, 0.0).is_err());
        assert!(mel_bands(10, -1.0, 0.0, 0.0).is_err());
    }
}
