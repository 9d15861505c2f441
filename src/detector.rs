use crate::capabilities::{AnalogInput, Delay};
use crate::config::{DetectorConfig, ADC_MAX_READING};
use crate::error::{Error, Result};
use log::debug;

/// One ADC reading and the voltage it stands for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub raw: u16,
    pub voltage: f64,
}

impl Sample {
    pub fn from_raw(raw: u16, reference_voltage: f64) -> Result<Self> {
        if raw > ADC_MAX_READING {
            return Err(Error::Read(format!(
                "reading {} outside 0..={}",
                raw, ADC_MAX_READING
            )));
        }
        Ok(Self {
            raw,
            voltage: to_voltage(raw, reference_voltage),
        })
    }
}

pub fn to_voltage(raw: u16, reference_voltage: f64) -> f64 {
    raw as f64 / ADC_MAX_READING as f64 * reference_voltage
}

/// Reads and converts a single sample from the configured channel.
pub fn read_sample<I: AnalogInput>(input: &mut I, config: &DetectorConfig) -> Result<Sample> {
    Sample::from_raw(input.read(config.channel)?, config.reference_voltage)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionResult {
    pub iterations: u64,
    /// `iterations / iterations_per_ms`. Counts polling iterations rather than
    /// wall-clock time, so it drifts whenever read overhead changes.
    pub elapsed_ms: f64,
    pub sample: Sample,
}

/// Polls until a sample rises above the threshold.
///
/// Blocks forever unless `config.max_iterations` is set, in which case
/// `Ok(None)` comes back after that many quiet samples. Read failures are
/// returned as-is.
pub fn wait_for_trigger<I, D>(
    input: &mut I,
    delay: &mut D,
    config: &DetectorConfig,
) -> Result<Option<DetectionResult>>
where
    I: AnalogInput,
    D: Delay,
{
    let mut iterations: u64 = 0;
    loop {
        if config.max_iterations.is_some_and(|max| iterations >= max) {
            debug!("No trigger after {} samples", iterations);
            return Ok(None);
        }
        iterations += 1;

        let sample = read_sample(input, config)?;
        if sample.voltage > config.threshold_voltage {
            return Ok(Some(DetectionResult {
                iterations,
                elapsed_ms: iterations as f64 / config.iterations_per_ms,
                sample,
            }));
        }
        delay.delay_us(config.sample_period_us);
    }
}
