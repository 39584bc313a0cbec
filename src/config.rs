//! Configuration loading using Figment.
//!
//! Configuration is loaded from:
//! 1. `config/event_ring.toml` (or an explicit path), base configuration
//! 2. Environment variables prefixed with `EVENT_RING_`, nested keys split on `__`
//!
//! Every section is optional and falls back to its defaults.
//!
//! # Example
//! ```no_run
//! use daq_event_ring::config::Settings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // EVENT_RING_RING__HOLDOFF=50 overrides [ring] holdoff
//! let settings = Settings::load()?;
//! settings.validate()?;
//! println!("ring size: {}", settings.ring.size);
//! # Ok(())
//! # }
//! ```

use crate::error::{RingError, RingResult};
use crate::tracing_setup::OutputFormat;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/event_ring.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "EVENT_RING_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application settings
    pub application: ApplicationConfig,
    /// Event ring options
    pub ring: RingConfig,
    /// Rolling-average stability cut
    pub rolling_average: RollingAverageConfig,
    /// Per-pulse cuts applied by the producer
    pub cuts: PulseCutsConfig,
    /// Optional diagnostic outputs
    pub diagnostics: DiagnosticsConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name, recorded on the run's log events
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: OutputFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "event-ring".to_string(),
            log_level: "info".to_string(),
            log_format: OutputFormat::default(),
        }
    }
}

/// Event ring options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Ring capacity in events.
    pub size: usize,
    /// Stability cut switch. Any value > 0 enables the rolling average and the
    /// beam-trip holdoff.
    pub stability_cut: f64,
    /// Number of pushes during which the whole ring is tainted after a trip.
    pub holdoff: u32,
    /// Print the rolling-average summary when the ring is unwound.
    pub print_after_unwind: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            size: 4800,
            stability_cut: 1.0,
            holdoff: 200,
            print_after_unwind: false,
        }
    }
}

impl RingConfig {
    /// Whether the stability cut (and with it trip detection) is active.
    #[must_use]
    pub fn stability_enabled(&self) -> bool {
        self.stability_cut > 0.0
    }

    /// Check ring options for semantic errors.
    pub fn validate(&self) -> RingResult<()> {
        if self.size == 0 {
            return Err(RingError::InvalidConfiguration(
                "ring.size must be at least 1".to_string(),
            ));
        }
        if !self.stability_cut.is_finite() {
            return Err(RingError::InvalidConfiguration(format!(
                "ring.stability_cut must be finite, got {}",
                self.stability_cut
            )));
        }
        Ok(())
    }
}

/// Rolling-average stability cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingAverageConfig {
    /// Largest RMS (beam current or any channel) the window may show.
    pub max_rms: f64,
    /// Minimum number of clean events before the cut is evaluated.
    pub min_samples: usize,
}

impl Default for RollingAverageConfig {
    fn default() -> Self {
        Self {
            max_rms: 5.0,
            min_samples: 100,
        }
    }
}

/// Per-pulse cuts applied to every record before it is pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseCutsConfig {
    /// Beam current below this value raises `BEAM_CURRENT`.
    pub min_beam_current: f64,
    /// Channel readings below this value raise `LOW_SIGNAL`.
    pub min_channel_signal: f64,
    /// Readings at or above this value raise `SATURATION`.
    pub saturation_level: f64,
}

impl Default for PulseCutsConfig {
    fn default() -> Self {
        Self {
            min_beam_current: 1.0,
            min_channel_signal: 0.0,
            saturation_level: 1.0e6,
        }
    }
}

/// Optional diagnostic outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Plain-text slot log (one entry per push/pop).
    pub ring_log: Option<PathBuf>,
}

impl Settings {
    /// Load configuration from [`DEFAULT_CONFIG_PATH`] and environment variables.
    pub fn load() -> RingResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file is not an error; defaults and environment overrides
    /// still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> RingResult<Self> {
        let settings = Self::figment(path.as_ref()).extract()?;
        Ok(settings)
    }

    /// The layered provider used by [`Settings::load_from`].
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> RingResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(RingError::InvalidConfiguration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        self.ring.validate()?;

        let rms = self.rolling_average.max_rms;
        if !rms.is_finite() || rms <= 0.0 {
            return Err(RingError::InvalidConfiguration(format!(
                "rolling_average.max_rms must be positive and finite, got {}",
                rms
            )));
        }

        let cuts = [
            ("cuts.min_beam_current", self.cuts.min_beam_current),
            ("cuts.min_channel_signal", self.cuts.min_channel_signal),
            ("cuts.saturation_level", self.cuts.saturation_level),
        ];
        for (name, value) in cuts {
            if !value.is_finite() {
                return Err(RingError::InvalidConfiguration(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
