//! In-memory capabilities for unit tests.
use crate::capabilities::{AnalogInput, Delay, DigitalOutput};
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    High,
    Low,
    Wait(u64),
}

/// Pin writes and delays in the order they happened.
pub type Timeline = Rc<RefCell<Vec<Event>>>;

#[derive(Debug, Default)]
pub struct RecordingOutput {
    pub timeline: Timeline,
    /// Fail every write once this many have succeeded.
    pub fail_after: Option<usize>,
}

impl RecordingOutput {
    fn push(&mut self, event: Event) -> Result<()> {
        if self.fail_after.is_some_and(|n| self.levels().len() >= n) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "pin unavailable",
            )));
        }
        self.timeline.borrow_mut().push(event);
        Ok(())
    }

    /// Pin writes only, without the waits between them.
    pub fn levels(&self) -> Vec<Event> {
        self.timeline
            .borrow()
            .iter()
            .copied()
            .filter(|e| !matches!(e, Event::Wait(_)))
            .collect()
    }

    pub fn rising_edges(&self) -> usize {
        self.levels().iter().filter(|e| **e == Event::High).count()
    }

    pub fn is_high(&self) -> bool {
        self.levels().last() == Some(&Event::High)
    }
}

impl DigitalOutput for RecordingOutput {
    fn set_high(&mut self) -> Result<()> {
        self.push(Event::High)
    }

    fn set_low(&mut self) -> Result<()> {
        self.push(Event::Low)
    }
}

/// Replays scripted readings, then either repeats a fallback value or errors.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    pub script: VecDeque<Result<u16>>,
    pub then_repeat: Option<u16>,
    pub reads: u64,
    pub channels: Vec<u8>,
}

impl ScriptedInput {
    pub fn new(raw: &[u16]) -> Self {
        Self {
            script: raw.iter().copied().map(Ok).collect(),
            ..Self::default()
        }
    }

    pub fn constant(raw: u16) -> Self {
        Self {
            then_repeat: Some(raw),
            ..Self::default()
        }
    }
}

impl AnalogInput for ScriptedInput {
    fn read(&mut self, channel: u8) -> Result<u16> {
        self.reads += 1;
        self.channels.push(channel);
        match self.script.pop_front() {
            Some(reading) => reading,
            None => self
                .then_repeat
                .ok_or_else(|| Error::Read("script exhausted".to_string())),
        }
    }
}

/// Accumulates simulated time instead of waiting.
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub timeline: Timeline,
    pub waits: Vec<u64>,
    pub elapsed_us: u64,
    /// Raises the flag once simulated time reaches the given microsecond.
    pub shutdown_at: Option<(u64, Arc<AtomicBool>)>,
}

impl FakeDelay {
    /// Logs waits on the same timeline as `output`'s pin writes.
    pub fn sharing(output: &RecordingOutput) -> Self {
        Self {
            timeline: Rc::clone(&output.timeline),
            ..Self::default()
        }
    }

    pub fn shutting_down_at(us: u64, shutdown_signal: &Arc<AtomicBool>) -> Self {
        Self {
            shutdown_at: Some((us, Arc::clone(shutdown_signal))),
            ..Self::default()
        }
    }
}

impl Delay for FakeDelay {
    fn delay_us(&mut self, us: u64) {
        self.waits.push(us);
        self.elapsed_us += us;
        self.timeline.borrow_mut().push(Event::Wait(us));
        if let Some((at, signal)) = &self.shutdown_at {
            if self.elapsed_us >= *at {
                signal.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Volts to the raw reading that maps back to them on a 3.3V reference.
pub fn raw_for(volts: f64) -> u16 {
    (volts / 3.3 * 1023.0).round() as u16
}
