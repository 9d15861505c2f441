//! Hardware capabilities consumed by the tone and detection loops.
//!
//! The rppal-backed implementations live in `utils`, in-memory ones in `fakes`.
use crate::error::Result;

pub trait DigitalOutput {
    fn set_high(&mut self) -> Result<()>;
    fn set_low(&mut self) -> Result<()>;
}

pub trait AnalogInput {
    /// Blocking read of one 10-bit sample from `channel`.
    fn read(&mut self, channel: u8) -> Result<u16>;
}

pub trait Delay {
    fn delay_us(&mut self, us: u64);

    fn delay_ms(&mut self, ms: u64) {
        self.delay_us(ms * 1000);
    }
}
