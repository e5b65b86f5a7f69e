//! Bit-error corruption and on-board delay model of the satellite channel.

use rand_distr::Normal;
use relaysim_core::{ChannelConfig, ConfigError};

use crate::deterministic::DeterministicRng;

/// Probability that at least one of `bits` bits is flipped at the given
/// per-bit error rate.
pub fn corruption_probability(bits: u64, bit_error_rate: f64) -> f64 {
    1.0 - (-bit_error_rate * bits as f64).exp()
}

/// Rolls whether a packet of `bits` bits is corrupted on one hop.
///
/// Always consumes exactly one draw from `rng`.
pub fn is_corrupted(bits: u64, bit_error_rate: f64, rng: &mut DeterministicRng) -> bool {
    rng.random_bool(corruption_probability(bits, bit_error_rate))
}

/// Impairments applied to every packet relayed by the satellite.
#[derive(Debug, Clone)]
pub struct SatelliteChannel {
    bit_error_rate: f64,
    processing_delay_min_s: f64,
    processing_delay_max_s: f64,
    atmospheric_noise: Normal<f64>,
    orbital_noise: Normal<f64>,
}

impl SatelliteChannel {
    /// Builds the channel model from its configuration.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidNoise` - If a noise deviation is negative or not finite
    pub fn new(config: &ChannelConfig) -> Result<Self, ConfigError> {
        let noise = |name: &'static str, value: f64| {
            let invalid = || ConfigError::InvalidNoise { name, value };
            if !(value >= 0.0 && value.is_finite()) {
                return Err(invalid());
            }
            Normal::new(0.0, value).map_err(|_| invalid())
        };

        Ok(Self {
            bit_error_rate: config.bit_error_rate,
            processing_delay_min_s: config.processing_delay_min_s,
            processing_delay_max_s: config.processing_delay_max_s,
            atmospheric_noise: noise("atmospheric", config.atmospheric_noise_std_s)?,
            orbital_noise: noise("orbital", config.orbital_noise_std_s)?,
        })
    }

    /// Returns the per-bit error rate.
    pub fn bit_error_rate(&self) -> f64 {
        self.bit_error_rate
    }

    /// Samples the delay the satellite adds on top of the downlink
    /// transmission: processing, propagation, atmospheric and orbital noise.
    ///
    /// Draw order is processing, atmospheric, orbital. The total is clamped
    /// at zero.
    pub fn sample_extra_delay(&self, propagation_delay: f64, rng: &mut DeterministicRng) -> f64 {
        let processing = rng.uniform(self.processing_delay_min_s, self.processing_delay_max_s);
        let atmospheric = rng.gaussian(&self.atmospheric_noise);
        let orbital = rng.gaussian(&self.orbital_noise);
        (processing + propagation_delay + atmospheric + orbital).max(0.0)
    }

    /// Rolls corruption for one hop of a `bits` bit packet.
    pub fn roll_corruption(&self, bits: u64, rng: &mut DeterministicRng) -> bool {
        is_corrupted(bits, self.bit_error_rate, rng)
    }
}
