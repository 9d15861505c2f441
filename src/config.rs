use crate::error::{Error, Result};
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;

// Fixed by the MCP3004/3008
pub const ADC_MAX_READING: u16 = 1023;
pub const ADC_CHANNELS: u8 = 8;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tone: ToneConfig,
    pub adc: AdcConfig,
    pub detector: DetectorConfig,
    pub control: ControlConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub frequency_hz: f64,
    pub duration_ms: u32,
    /// BCM numbering. GPIO18 is wiringPi pin 1.
    pub pin: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    pub spi_bus: u8,
    pub slave_select: u8,
    pub clock_hz: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub channel: u8,
    pub threshold_voltage: f64,
    pub reference_voltage: f64,
    pub sample_period_us: u64,
    /// Loop iterations counted as one millisecond when reporting elapsed time.
    pub iterations_per_ms: f64,
    /// `None` blocks until the threshold is crossed.
    pub max_iterations: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub cadence_ms: u64,
    pub monitor_interval_ms: u64,
    pub record_rate_hz: u32,
    pub record_duration_s: f64,
    pub recordings_dir: String,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1000.0,
            duration_ms: 100,
            pin: 18,
        }
    }
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            slave_select: 0,
            clock_hz: 1_350_000,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            threshold_voltage: 1.2,
            reference_voltage: 3.3,
            sample_period_us: 1,
            iterations_per_ms: 1000.0,
            max_iterations: None,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cadence_ms: 500,
            monitor_interval_ms: 100,
            record_rate_hz: 2000,
            record_duration_s: 0.5,
            recordings_dir: "recordings".to_string(),
        }
    }
}

impl Config {
    /// Reads a TOML config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let toml_str = fs::read_to_string(path)?;
        let config = Self::from_toml(&toml_str).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    pub fn validate(&self) -> Result<()> {
        self.tone.validate()?;
        self.adc.validate()?;
        self.detector.validate()?;
        self.control.validate()
    }
}

impl ToneConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            return Err(Error::Config(format!(
                "tone frequency must be positive, got {} Hz",
                self.frequency_hz
            )));
        }
        Ok(())
    }
}

impl AdcConfig {
    pub fn validate(&self) -> Result<()> {
        if self.clock_hz == 0 {
            return Err(Error::Config("SPI clock must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel >= ADC_CHANNELS {
            return Err(Error::Config(format!(
                "ADC channel must be below {}, got {}",
                ADC_CHANNELS, self.channel
            )));
        }
        if !self.reference_voltage.is_finite() || self.reference_voltage <= 0.0 {
            return Err(Error::Config(format!(
                "reference voltage must be positive, got {}V",
                self.reference_voltage
            )));
        }
        if !(0.0..=self.reference_voltage).contains(&self.threshold_voltage) {
            return Err(Error::Config(format!(
                "threshold {}V is outside 0..={}V",
                self.threshold_voltage, self.reference_voltage
            )));
        }
        if !self.iterations_per_ms.is_finite() || self.iterations_per_ms <= 0.0 {
            return Err(Error::Config(format!(
                "iterations per ms must be positive, got {}",
                self.iterations_per_ms
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(Error::Config(
                "max iterations must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.record_rate_hz == 0 {
            return Err(Error::Config("record rate must be non-zero".to_string()));
        }
        if !self.record_duration_s.is_finite() || self.record_duration_s <= 0.0 {
            return Err(Error::Config(format!(
                "record duration must be positive, got {}s",
                self.record_duration_s
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_lab_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.tone, ToneConfig::default());
        assert_eq!(config.detector.threshold_voltage, 1.2);
        assert_eq!(config.detector.max_iterations, None);
        assert_eq!(config.control.cadence_ms, 500);
        config.validate().unwrap();
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config = Config::from_toml(include_str!("../pingpi.toml")).unwrap();
        assert_eq!(config.tone, ToneConfig::default());
        assert_eq!(config.adc, AdcConfig::default());
        assert_eq!(config.detector, DetectorConfig::default());
        assert_eq!(config.control, ControlConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [tone]
            frequency_hz = 440.0

            [detector]
            threshold_voltage = 2.0
            max_iterations = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.tone.frequency_hz, 440.0);
        assert_eq!(config.tone.duration_ms, 100);
        assert_eq!(config.detector.threshold_voltage, 2.0);
        assert_eq!(config.detector.max_iterations, Some(5000));
        assert_eq!(config.detector.reference_voltage, 3.3);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("pingpi-does-not-exist.toml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.adc, AdcConfig::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let path = std::env::temp_dir().join("pingpi-malformed-config.toml");
        fs::write(&path, "[tone]\nfrequency_hz = \"loud\"\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert!(err.to_string().contains("pingpi-malformed-config.toml"));
    }

    #[test]
    fn rejects_non_positive_frequency() {
        for frequency_hz in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let tone = ToneConfig {
                frequency_hz,
                ..ToneConfig::default()
            };
            assert!(matches!(tone.validate(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn rejects_bad_detector_settings() {
        let bad = [
            DetectorConfig {
                channel: 8,
                ..DetectorConfig::default()
            },
            DetectorConfig {
                reference_voltage: 0.0,
                ..DetectorConfig::default()
            },
            DetectorConfig {
                threshold_voltage: 3.4,
                ..DetectorConfig::default()
            },
            DetectorConfig {
                iterations_per_ms: 0.0,
                ..DetectorConfig::default()
            },
            DetectorConfig {
                max_iterations: Some(0),
                ..DetectorConfig::default()
            },
        ];
        for detector in bad {
            assert!(matches!(detector.validate(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn rejects_empty_recording_window() {
        let control = ControlConfig {
            record_duration_s: 0.0,
            ..ControlConfig::default()
        };
        assert!(control.validate().is_err());
        let control = ControlConfig {
            record_rate_hz: 0,
            ..ControlConfig::default()
        };
        assert!(control.validate().is_err());
    }
}
