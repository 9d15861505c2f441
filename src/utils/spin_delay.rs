use crate::capabilities::Delay;
use std::hint;
use std::thread;
use std::time::{Duration, Instant};

/// Busy-waits for microsecond delays, sleeps for millisecond ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl Delay for SpinDelay {
    fn delay_us(&mut self, us: u64) {
        let deadline = Instant::now() + Duration::from_micros(us);
        while Instant::now() < deadline {
            hint::spin_loop();
        }
    }

    fn delay_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}
