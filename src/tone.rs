use crate::capabilities::{Delay, DigitalOutput};
use crate::config::ToneConfig;
use crate::error::Result;
use log::debug;

impl ToneConfig {
    /// Length of one high or low phase, truncated to whole microseconds.
    pub fn half_cycle_us(&self) -> u64 {
        (1_000_000.0 / (2.0 * self.frequency_hz)) as u64
    }

    /// Full cycles that fit in the tone duration. Zero when the tone is
    /// shorter than one period.
    pub fn cycles(&self) -> u64 {
        (self.duration_ms as f64 * self.frequency_hz / 1000.0) as u64
    }
}

/// Bit-bangs a square wave on `output` and returns the number of cycles emitted.
///
/// Blocks for roughly `tone.duration_ms` and cannot be interrupted. The output
/// is always left low.
pub fn emit_tone<O, D>(output: &mut O, delay: &mut D, tone: &ToneConfig) -> Result<u64>
where
    O: DigitalOutput,
    D: Delay,
{
    tone.validate()?;
    let half_cycle = tone.half_cycle_us();
    let cycles = tone.cycles();
    debug!(
        "Tone {} Hz on GPIO{}: {} cycles of 2x{}us",
        tone.frequency_hz, tone.pin, cycles, half_cycle
    );

    for _ in 0..cycles {
        output.set_high()?;
        delay.delay_us(half_cycle);
        output.set_low()?;
        delay.delay_us(half_cycle);
    }
    Ok(cycles)
}
