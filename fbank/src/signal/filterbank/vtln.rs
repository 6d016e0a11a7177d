use crate::kernel::{ConfigError, KernelLifecycle};

/// Constructor config for [`VtlnWarper`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VtlnConfig {
    /// Warping factor; frequencies inside the middle segment are divided by it.
    pub alpha: f64,
    /// Lower end of the warped range in Hz.
    pub low: f64,
    /// Upper end of the warped range in Hz.
    pub high: f64,
    /// Lower break frequency, before scaling by `alpha`.
    pub low_vtln: f64,
    /// Upper break frequency, before scaling by `alpha`.
    pub high_vtln: f64,
}

/// Piecewise-linear vocal tract length warping.
///
/// Three segments: `[low, l)` maps linearly onto `[low, l / alpha)`,
/// `[l, h)` is scaled by `1 / alpha` and `[h, high]` maps onto
/// `[h / alpha, high]`, with `l = low_vtln · max(1, alpha)` and
/// `h = high_vtln · min(1, alpha)`. Frequencies outside `[low, high]` pass
/// through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VtlnWarper {
    low: f64,
    high: f64,
    low_vtln: f64,
    high_vtln: f64,
    scale: f64,
    scale_left: f64,
    scale_right: f64,
}

impl KernelLifecycle for VtlnWarper {
    type Config = VtlnConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if !config.alpha.is_finite() || config.alpha <= 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "alpha",
                reason: "alpha must be finite and > 0",
            });
        }
        if !(config.low < config.low_vtln
            && config.low_vtln < config.high_vtln
            && config.high_vtln < config.high)
        {
            return Err(ConfigError::InvalidArgument {
                arg: "low_vtln",
                reason: "frequencies must satisfy low < low_vtln < high_vtln < high",
            });
        }
        let scale = 1.0 / config.alpha;
        let low_vtln = config.low_vtln * config.alpha.max(1.0);
        let high_vtln = config.high_vtln * config.alpha.min(1.0);
        if !(config.low < low_vtln && low_vtln < high_vtln && high_vtln < config.high) {
            return Err(ConfigError::InvalidArgument {
                arg: "alpha",
                reason: "scaled break frequencies leave the warped range",
            });
        }
        Ok(Self {
            low: config.low,
            high: config.high,
            low_vtln,
            high_vtln,
            scale,
            scale_left: (scale * low_vtln - config.low) / (low_vtln - config.low),
            scale_right: (config.high - scale * high_vtln) / (config.high - high_vtln),
        })
    }
}

impl VtlnWarper {
    /// Warp one frequency in Hz.
    pub fn warp(&self, frequency: f64) -> f64 {
        if frequency < self.low || frequency > self.high {
            frequency
        } else if frequency < self.low_vtln {
            self.low + self.scale_left * (frequency - self.low)
        } else if frequency < self.high_vtln {
            self.scale * frequency
        } else {
            self.high + self.scale_right * (frequency - self.high)
        }
    }

    /// Warp every frequency of `frequencies`.
    pub fn warp_all(&self, frequencies: &[f64]) -> Vec<f64> {
        frequencies.iter().map(|f| self.warp(*f)).collect()
    }
}
