//! Centralized configuration for relaysim.
//!
//! All tunable parameters of a relay simulation are defined here to avoid
//! hard-coded values scattered throughout the engine. A configuration is
//! immutable once handed to the simulation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Time step must be positive, got {value}")]
    NonPositiveTimeStep { value: f64 },

    #[error("Maximum simulated time must be positive, got {value}")]
    NonPositiveMaxTime { value: f64 },

    #[error("Packet size must be at least one bit")]
    ZeroPacketSize,

    #[error("Link {link} nominal rate must be positive, got {value} bps")]
    NonPositiveRate { link: &'static str, value: f64 },

    #[error("Link {link} buffer capacity must be positive or unbounded")]
    ZeroBufferCapacity { link: &'static str },

    #[error("Flow {flow} send interval must be positive, got {value}")]
    NonPositiveInterval { flow: &'static str, value: f64 },

    #[error("Bit error rate must lie in [0, 1], got {value}")]
    InvalidBitErrorRate { value: f64 },

    #[error("Rate fluctuation must lie in [0, 1), got {value}")]
    InvalidRateFluctuation { value: f64 },

    #[error("Processing delay range [{min}, {max}] is invalid")]
    InvalidProcessingDelay { min: f64, max: f64 },

    #[error("Noise standard deviation {name} must be finite and non-negative, got {value}")]
    InvalidNoise { name: &'static str, value: f64 },

    #[error("Invalid orbit: {reason}")]
    InvalidOrbit { reason: String },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Central configuration for a relay simulation run.
///
/// Groups related settings into logical sections. Supports JSON files and
/// environment variable overrides on top of the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub simulation: SimulationConfig,
    pub links: LinkSetConfig,
    pub channel: ChannelConfig,
    pub flows: FlowSetConfig,
    pub orbit: OrbitConfig,
}

/// Clock, packet and reproducibility settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated time after which the run is stopped, in seconds
    pub max_time_s: f64,
    /// Fixed tick size in seconds
    pub time_step_s: f64,
    /// Size of every generated packet in bits
    pub packet_size_bits: u64,
    /// Seed for the single pseudorandom stream
    pub seed: u64,
    /// Emit one human-readable line per loss, corruption and delivery
    pub verbose: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_time_s: 300.0,
            time_step_s: 0.001,
            packet_size_bits: 1024 * 8, // 1 KiB payload
            seed: 42,
            verbose: false,
        }
    }
}

/// A single directional link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Nominal bit rate in bits per second
    pub rate_bps: f64,
    /// Buffer capacity in bits (None = unbounded)
    pub buffer_capacity_bits: Option<u64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::uplink()
    }
}

impl LinkConfig {
    /// 20 Mbps ground-to-satellite link with a 50 kB buffer.
    pub fn uplink() -> Self {
        Self {
            rate_bps: 20e6,
            buffer_capacity_bits: Some(50_000 * 8),
        }
    }

    /// 100 Mbps satellite-to-ground link with a 50 kB buffer.
    pub fn downlink() -> Self {
        Self {
            rate_bps: 100e6,
            buffer_capacity_bits: Some(50_000 * 8),
        }
    }

    /// Returns a copy of this link with an unbounded buffer.
    pub fn unbounded(mut self) -> Self {
        self.buffer_capacity_bits = None;
        self
    }
}

/// The four links of the relay.
///
/// `downlink_a` carries traffic from the satellite to station A and
/// `downlink_b` from the satellite to station B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSetConfig {
    pub uplink_a: LinkConfig,
    pub uplink_b: LinkConfig,
    pub downlink_a: LinkConfig,
    pub downlink_b: LinkConfig,
}

impl Default for LinkSetConfig {
    fn default() -> Self {
        Self {
            uplink_a: LinkConfig::uplink(),
            uplink_b: LinkConfig::uplink(),
            downlink_a: LinkConfig::downlink(),
            downlink_b: LinkConfig::downlink(),
        }
    }
}

impl LinkSetConfig {
    /// Applies the same buffer capacity to all four links.
    pub fn set_buffer_capacity(&mut self, capacity_bits: Option<u64>) {
        self.uplink_a.buffer_capacity_bits = capacity_bits;
        self.uplink_b.buffer_capacity_bits = capacity_bits;
        self.downlink_a.buffer_capacity_bits = capacity_bits;
        self.downlink_b.buffer_capacity_bits = capacity_bits;
    }

    fn named(&self) -> [(&'static str, &LinkConfig); 4] {
        [
            ("uplink_A", &self.uplink_a),
            ("uplink_B", &self.uplink_b),
            ("downlink_A", &self.downlink_a),
            ("downlink_B", &self.downlink_b),
        ]
    }
}

/// Channel impairments shared by every hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Per-bit error probability
    pub bit_error_rate: f64,
    /// Rate noise as a fraction of nominal (0.05 = +/-5%)
    pub rate_fluctuation: f64,
    /// Lower bound of the on-board processing delay in seconds
    pub processing_delay_min_s: f64,
    /// Upper bound of the on-board processing delay in seconds
    pub processing_delay_max_s: f64,
    /// Standard deviation of atmospheric delay noise in seconds
    pub atmospheric_noise_std_s: f64,
    /// Standard deviation of orbital delay noise in seconds
    pub orbital_noise_std_s: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            bit_error_rate: 1e-7,
            rate_fluctuation: 0.05,
            processing_delay_min_s: 0.0002,
            processing_delay_max_s: 0.001,
            atmospheric_noise_std_s: 0.0005,
            orbital_noise_std_s: 0.0005,
        }
    }
}

impl ChannelConfig {
    /// Channel without bit errors, rate noise or delay noise.
    pub fn ideal() -> Self {
        Self {
            bit_error_rate: 0.0,
            rate_fluctuation: 0.0,
            processing_delay_min_s: 0.0005,
            processing_delay_max_s: 0.0005,
            atmospheric_noise_std_s: 0.0,
            orbital_noise_std_s: 0.0,
        }
    }

    /// Mean of the uniform processing delay.
    pub fn processing_delay_mean_s(&self) -> f64 {
        (self.processing_delay_min_s + self.processing_delay_max_s) / 2.0
    }
}

/// Fixed-interval traffic generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Time of the first packet in seconds
    pub start_time_s: f64,
    /// Gap between packets in seconds
    pub interval_s: f64,
    /// Send budget
    pub max_packets: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            start_time_s: 1.0,
            interval_s: 0.1,
            max_packets: 10_000,
        }
    }
}

impl FlowConfig {
    /// A flow that never sends.
    pub fn silent() -> Self {
        Self {
            max_packets: 0,
            ..Default::default()
        }
    }
}

/// The two competing flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSetConfig {
    pub a_to_b: FlowConfig,
    pub b_to_a: FlowConfig,
}

impl Default for FlowSetConfig {
    fn default() -> Self {
        Self {
            a_to_b: FlowConfig {
                start_time_s: 1.1,
                ..Default::default()
            },
            b_to_a: FlowConfig {
                start_time_s: 1.0,
                ..Default::default()
            },
        }
    }
}

/// Relay orbit and ground geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub earth_radius_m: f64,
    pub altitude_m: f64,
    /// Shortened LEO period so delay variation shows within one run
    pub orbital_period_s: f64,
    /// Distance between ground stations A and B
    pub station_distance_m: f64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            earth_radius_m: 6371e3,
            altitude_m: 550e3,
            orbital_period_s: 300.0,
            station_distance_m: 2000e3,
        }
    }
}

impl OrbitConfig {
    /// Radius of the circular orbit measured from the Earth's center.
    pub fn orbit_radius_m(&self) -> f64 {
        self.earth_radius_m + self.altitude_m
    }
}

impl RelayConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Reads `RELAYSIM_SEED`, `RELAYSIM_MAX_TIME`, `RELAYSIM_TIME_STEP`,
    /// `RELAYSIM_BER` and `RELAYSIM_VERBOSE`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Applies environment variable overrides on top of this configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(seed) = std::env::var("RELAYSIM_SEED") {
            if let Ok(seed_value) = seed.parse::<u64>() {
                self.simulation.seed = seed_value;
            }
        }

        if let Ok(max_time) = std::env::var("RELAYSIM_MAX_TIME") {
            if let Ok(seconds) = max_time.parse::<f64>() {
                self.simulation.max_time_s = seconds;
            }
        }

        if let Ok(step) = std::env::var("RELAYSIM_TIME_STEP") {
            if let Ok(seconds) = step.parse::<f64>() {
                self.simulation.time_step_s = seconds;
            }
        }

        if let Ok(ber) = std::env::var("RELAYSIM_BER") {
            if let Ok(rate) = ber.parse::<f64>() {
                self.channel.bit_error_rate = rate;
            }
        }

        if let Ok(verbose) = std::env::var("RELAYSIM_VERBOSE") {
            self.simulation.verbose = verbose.parse().unwrap_or(false);
        }
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Parse` - If the document is not valid configuration JSON
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Io` - If the file cannot be read
    /// - `ConfigError::Parse` - If the file is not valid configuration JSON
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Creates a short, lossless, noiseless configuration for tests.
    ///
    /// One flow (A to B) sends five packets every 100 ms from t = 1 s over
    /// unbounded buffers.
    pub fn for_testing() -> Self {
        let mut links = LinkSetConfig::default();
        links.set_buffer_capacity(None);

        Self {
            simulation: SimulationConfig {
                max_time_s: 10.0,
                ..Default::default()
            },
            links,
            channel: ChannelConfig::ideal(),
            flows: FlowSetConfig {
                a_to_b: FlowConfig {
                    start_time_s: 1.0,
                    interval_s: 0.1,
                    max_packets: 5,
                },
                b_to_a: FlowConfig::silent(),
            },
            orbit: OrbitConfig::default(),
        }
    }

    /// Checks every parameter before a simulation starts.
    ///
    /// # Errors
    ///
    /// - `ConfigError` - Describing the first invalid parameter found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if !(sim.time_step_s > 0.0 && sim.time_step_s.is_finite()) {
            return Err(ConfigError::NonPositiveTimeStep {
                value: sim.time_step_s,
            });
        }
        if !(sim.max_time_s > 0.0 && sim.max_time_s.is_finite()) {
            return Err(ConfigError::NonPositiveMaxTime {
                value: sim.max_time_s,
            });
        }
        if sim.packet_size_bits == 0 {
            return Err(ConfigError::ZeroPacketSize);
        }

        for (link, link_config) in self.links.named() {
            if !(link_config.rate_bps > 0.0 && link_config.rate_bps.is_finite()) {
                return Err(ConfigError::NonPositiveRate {
                    link,
                    value: link_config.rate_bps,
                });
            }
            if link_config.buffer_capacity_bits == Some(0) {
                return Err(ConfigError::ZeroBufferCapacity { link });
            }
        }

        for (flow, flow_config) in [("AtoB", &self.flows.a_to_b), ("BtoA", &self.flows.b_to_a)] {
            if !(flow_config.interval_s > 0.0 && flow_config.interval_s.is_finite()) {
                return Err(ConfigError::NonPositiveInterval {
                    flow,
                    value: flow_config.interval_s,
                });
            }
        }

        self.validate_channel()?;
        self.validate_orbit()
    }

    fn validate_channel(&self) -> Result<(), ConfigError> {
        let channel = &self.channel;
        if !(0.0..=1.0).contains(&channel.bit_error_rate) {
            return Err(ConfigError::InvalidBitErrorRate {
                value: channel.bit_error_rate,
            });
        }
        if !(0.0..1.0).contains(&channel.rate_fluctuation) {
            return Err(ConfigError::InvalidRateFluctuation {
                value: channel.rate_fluctuation,
            });
        }

        let (min, max) = (
            channel.processing_delay_min_s,
            channel.processing_delay_max_s,
        );
        if !(min >= 0.0 && max.is_finite() && min <= max) {
            return Err(ConfigError::InvalidProcessingDelay { min, max });
        }

        for (name, value) in [
            ("atmospheric", channel.atmospheric_noise_std_s),
            ("orbital", channel.orbital_noise_std_s),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::InvalidNoise { name, value });
            }
        }

        Ok(())
    }

    fn validate_orbit(&self) -> Result<(), ConfigError> {
        let orbit = &self.orbit;
        if !(orbit.orbital_period_s > 0.0 && orbit.orbital_period_s.is_finite()) {
            return Err(ConfigError::InvalidOrbit {
                reason: format!("orbital period {} must be positive", orbit.orbital_period_s),
            });
        }
        if !(orbit.orbit_radius_m() > 0.0 && orbit.orbit_radius_m().is_finite()) {
            return Err(ConfigError::InvalidOrbit {
                reason: format!("orbit radius {} must be positive", orbit.orbit_radius_m()),
            });
        }
        if !(orbit.station_distance_m >= 0.0 && orbit.station_distance_m.is_finite()) {
            return Err(ConfigError::InvalidOrbit {
                reason: format!(
                    "station distance {} must be non-negative",
                    orbit.station_distance_m
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = RelayConfig::default();

        assert_eq!(config.simulation.max_time_s, 300.0);
        assert_eq!(config.simulation.time_step_s, 0.001);
        assert_eq!(config.simulation.packet_size_bits, 8192);
        assert_eq!(config.links.uplink_a.rate_bps, 20e6);
        assert_eq!(config.links.downlink_b.rate_bps, 100e6);
        assert_eq!(config.links.uplink_b.buffer_capacity_bits, Some(400_000));
        assert_eq!(config.flows.a_to_b.start_time_s, 1.1);
        assert_eq!(config.flows.b_to_a.start_time_s, 1.0);
        assert_eq!(config.orbit.orbit_radius_m(), 6921e3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_preset() {
        let config = RelayConfig::for_testing();

        assert!(config.validate().is_ok());
        assert_eq!(config.channel.bit_error_rate, 0.0);
        assert_eq!(config.flows.a_to_b.max_packets, 5);
        assert_eq!(config.flows.b_to_a.max_packets, 0);
        assert!(config.links.downlink_a.buffer_capacity_bits.is_none());
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let mut config = RelayConfig::default();
        config.links.downlink_b.rate_bps = 0.0;

        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::NonPositiveRate {
                link: "downlink_B",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_buffer_and_packet_size() {
        let mut config = RelayConfig::default();
        config.links.uplink_a.buffer_capacity_bits = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroBufferCapacity { link: "uplink_A" })
        ));

        let mut config = RelayConfig::default();
        config.simulation.packet_size_bits = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPacketSize)));
    }

    #[test]
    fn test_rejects_bad_interval_and_step() {
        let mut config = RelayConfig::default();
        config.flows.b_to_a.interval_s = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveInterval { flow: "BtoA", .. })
        ));

        let mut config = RelayConfig::default();
        config.simulation.time_step_s = -0.001;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveTimeStep { .. })
        ));

        let mut config = RelayConfig::default();
        config.simulation.max_time_s = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveMaxTime { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_channel() {
        let mut config = RelayConfig::default();
        config.channel.processing_delay_min_s = 0.002;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProcessingDelay { .. })
        ));

        let mut config = RelayConfig::default();
        config.channel.orbital_noise_std_s = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNoise {
                name: "orbital",
                ..
            })
        ));

        let mut config = RelayConfig::default();
        config.channel.rate_fluctuation = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRateFluctuation { .. })
        ));
    }

    #[test]
    fn test_json_partial_override() {
        let json = r#"{
            "simulation": { "seed": 7, "max_time_s": 20.0 },
            "links": { "uplink_a": { "rate_bps": 1e6, "buffer_capacity_bits": null } }
        }"#;

        let config = RelayConfig::from_json_str(json).unwrap();
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.max_time_s, 20.0);
        assert_eq!(config.simulation.time_step_s, 0.001);
        assert_eq!(config.links.uplink_a.rate_bps, 1e6);
        assert!(config.links.uplink_a.buffer_capacity_bits.is_none());
        assert_eq!(config.links.downlink_a, LinkConfig::downlink());
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        let config = RelayConfig::for_testing();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = RelayConfig::from_file(&path).unwrap();
        assert_eq!(loaded.simulation.seed, config.simulation.seed);
        assert_eq!(loaded.flows.a_to_b.max_packets, 5);
        assert_eq!(loaded.links.uplink_b.buffer_capacity_bits, None);
        assert_eq!(loaded.simulation.packet_size_bits, 8192);

        let missing = RelayConfig::from_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("RELAYSIM_SEED", "12345");
            std::env::set_var("RELAYSIM_MAX_TIME", "12.5");
            std::env::set_var("RELAYSIM_VERBOSE", "true");
        }

        let config = RelayConfig::from_env();

        assert_eq!(config.simulation.seed, 12345);
        assert_eq!(config.simulation.max_time_s, 12.5);
        assert!(config.simulation.verbose);

        unsafe {
            std::env::remove_var("RELAYSIM_SEED");
            std::env::remove_var("RELAYSIM_MAX_TIME");
            std::env::remove_var("RELAYSIM_VERBOSE");
        }
    }
}
