use crate::capabilities::{AnalogInput, Delay, DigitalOutput};
use crate::config::{DetectorConfig, ToneConfig};
use crate::detector::{read_sample, wait_for_trigger, DetectionResult};
use crate::error::Result;
use crate::recorder::Recorder;
use crate::tone::emit_tone;
use log::{debug, info, warn};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Paces the ping loop. Returns `false` once no further pings should be sent.
pub trait PingTrigger {
    fn wait<D: Delay>(&mut self, delay: &mut D) -> Result<bool>;
}

/// Waits for the operator to press enter. End of input or a shutdown request
/// stops the loop.
pub struct ConsoleTrigger<R, W> {
    input: R,
    prompt: W,
    shutdown_signal: Arc<AtomicBool>,
}

impl<R: BufRead, W: Write> ConsoleTrigger<R, W> {
    pub fn new(input: R, prompt: W, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            input,
            prompt,
            shutdown_signal,
        }
    }
}

impl<R: BufRead, W: Write> PingTrigger for ConsoleTrigger<R, W> {
    fn wait<D: Delay>(&mut self, _delay: &mut D) -> Result<bool> {
        if self.shutdown_signal.load(Ordering::SeqCst) {
            return Ok(false);
        }
        writeln!(self.prompt, "Press enter to send a signal: ")?;
        self.prompt.flush()?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        Ok(read > 0 && !self.shutdown_signal.load(Ordering::SeqCst))
    }
}

/// Fires every `period_ms` until shutdown is requested.
pub struct CadenceTrigger {
    period_ms: u64,
    fired: bool,
    shutdown_signal: Arc<AtomicBool>,
}

impl CadenceTrigger {
    pub fn new(period_ms: u64, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            period_ms,
            fired: false,
            shutdown_signal,
        }
    }
}

impl PingTrigger for CadenceTrigger {
    fn wait<D: Delay>(&mut self, delay: &mut D) -> Result<bool> {
        // First ping goes out immediately
        if self.fired {
            delay.delay_ms(self.period_ms);
        }
        self.fired = true;
        Ok(!self.shutdown_signal.load(Ordering::SeqCst))
    }
}

fn keep_going(done: u64, limit: Option<u64>, shutdown_signal: &AtomicBool) -> bool {
    !shutdown_signal.load(Ordering::SeqCst) && limit.map_or(true, |limit| done < limit)
}

pub fn format_detection(detection: &DetectionResult) -> String {
    format!(
        "Time: {:.2}ms | ADC Value: {} | Voltage: {:.2}V",
        detection.elapsed_ms, detection.sample.raw, detection.sample.voltage
    )
}

/// Tone, then detection, once per trigger. Runs until the trigger stops it or
/// something fails. Returns the number of pings sent.
pub fn run_ping_loop<T, O, I, D, W>(
    trigger: &mut T,
    output: &mut O,
    input: &mut I,
    delay: &mut D,
    console: &mut W,
    tone: &ToneConfig,
    detector: &DetectorConfig,
) -> Result<u64>
where
    T: PingTrigger,
    O: DigitalOutput,
    I: AnalogInput,
    D: Delay,
    W: Write,
{
    let mut pings: u64 = 0;
    while trigger.wait(delay)? {
        pings += 1;
        emit_tone(output, delay, tone)?;
        match wait_for_trigger(input, delay, detector)? {
            Some(detection) => {
                let report = format_detection(&detection);
                info!("Ping {}: {}", pings, report);
                writeln!(console, "{}", report)?;
            }
            None => warn!(
                "Ping {}: nothing above {:.2}V within {} samples",
                pings,
                detector.threshold_voltage,
                detector.max_iterations.unwrap_or_default()
            ),
        }
    }
    info!("Trigger closed after {} pings", pings);
    Ok(pings)
}

/// Listens, and answers every detection with a tone. `limit` bounds the
/// number of responses. Returns the responses sent.
pub fn run_responder<I, O, D>(
    input: &mut I,
    output: &mut O,
    delay: &mut D,
    detector: &DetectorConfig,
    tone: &ToneConfig,
    limit: Option<u64>,
    shutdown_signal: &AtomicBool,
) -> Result<u64>
where
    I: AnalogInput,
    O: DigitalOutput,
    D: Delay,
{
    let mut responses: u64 = 0;
    while keep_going(responses, limit, shutdown_signal) {
        match wait_for_trigger(input, delay, detector)? {
            Some(detection) => {
                info!(
                    "Signal detected ({}). Sending response beep.",
                    format_detection(&detection)
                );
                emit_tone(output, delay, tone)?;
                responses += 1;
            }
            None => debug!("Still listening"),
        }
    }
    info!("Responder stopped after {} responses", responses);
    Ok(responses)
}

/// Beeps, pauses, repeats. `limit` bounds the number of beeps.
pub fn run_beacon<O, D>(
    output: &mut O,
    delay: &mut D,
    tone: &ToneConfig,
    pause_ms: u64,
    limit: Option<u64>,
    shutdown_signal: &AtomicBool,
) -> Result<u64>
where
    O: DigitalOutput,
    D: Delay,
{
    let mut beeps: u64 = 0;
    while keep_going(beeps, limit, shutdown_signal) {
        let cycles = emit_tone(output, delay, tone)?;
        beeps += 1;
        debug!("Beep {} ({} cycles)", beeps, cycles);
        delay.delay_ms(pause_ms);
    }
    Ok(beeps)
}

/// Prints one reading per interval. `limit` bounds the number of readings.
pub fn run_monitor<I, D, W>(
    input: &mut I,
    delay: &mut D,
    console: &mut W,
    detector: &DetectorConfig,
    interval_ms: u64,
    limit: Option<u64>,
    shutdown_signal: &AtomicBool,
) -> Result<u64>
where
    I: AnalogInput,
    D: Delay,
    W: Write,
{
    let mut readings: u64 = 0;
    while keep_going(readings, limit, shutdown_signal) {
        let sample = read_sample(input, detector)?;
        readings += 1;
        writeln!(
            console,
            "ADC Value: {} | Voltage: {:.2}V",
            sample.raw, sample.voltage
        )?;
        delay.delay_ms(interval_ms);
    }
    Ok(readings)
}

/// Whole microseconds between samples at `rate_hz`. The CSV time column uses
/// the same period.
pub fn sample_period_us(rate_hz: u32) -> u64 {
    1_000_000 / rate_hz as u64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchStats {
    pub samples: u64,
    pub achieved_rate_hz: f64,
}

/// Samples `rate_hz * duration_s` readings into `recorder` and measures the
/// rate actually reached.
pub fn record_batch<I, D>(
    input: &mut I,
    delay: &mut D,
    recorder: &Recorder,
    detector: &DetectorConfig,
    rate_hz: u32,
    duration_s: f64,
) -> Result<BatchStats>
where
    I: AnalogInput,
    D: Delay,
{
    let samples = (rate_hz as f64 * duration_s) as u64;
    let period_us = sample_period_us(rate_hz);

    let start = Instant::now();
    for _ in 0..samples {
        recorder.record(read_sample(input, detector)?)?;
        delay.delay_us(period_us);
    }
    let elapsed = start.elapsed().as_secs_f64();

    let achieved_rate_hz = if elapsed > 0.0 {
        samples as f64 / elapsed
    } else {
        0.0
    };
    Ok(BatchStats {
        samples,
        achieved_rate_hz,
    })
}
