mod capabilities;
mod config;
mod control_loop;
mod detector;
mod error;
#[cfg(test)]
mod fakes;
mod recorder;
mod tone;
mod utils;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::Config;
use control_loop::{
    record_batch, run_beacon, run_monitor, run_ping_loop, run_responder, sample_period_us,
    CadenceTrigger, ConsoleTrigger,
};
use log::{error, info};
use recorder::{new_file_name, Recorder};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use utils::{mcp3008::Mcp3008, speaker::GpioSpeaker, spin_delay::SpinDelay};

#[derive(Parser)]
#[command(name = "pingpi")]
#[command(about = "Emit a tone on a GPIO pin and time its arrival at an ADC microphone", long_about = None)]
struct Cli {
    /// TOML config file; missing file means defaults
    #[arg(short, long, default_value = "pingpi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a tone, then wait for the microphone to hear it. Repeats forever.
    Ping {
        /// Ping every N ms instead of waiting for enter
        #[arg(long)]
        every: Option<u64>,
        #[command(flatten)]
        tone: ToneArgs,
        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// Wait for the microphone to hear a signal, then beep back. Repeats forever.
    Respond {
        /// Stop after this many responses
        #[arg(long)]
        count: Option<u64>,
        #[command(flatten)]
        tone: ToneArgs,
        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// Beep, pause, repeat
    Beacon {
        /// Pause between beeps in ms
        #[arg(long)]
        pause: Option<u64>,
        #[arg(long)]
        count: Option<u64>,
        #[command(flatten)]
        tone: ToneArgs,
    },
    /// Print microphone readings on a fixed interval
    Monitor {
        /// Interval between readings in ms
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        count: Option<u64>,
        #[arg(long)]
        channel: Option<u8>,
    },
    /// Sample the microphone into a CSV file
    Record {
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Sample rate in Hz
        #[arg(long)]
        rate: Option<u32>,
        /// Recording length in seconds
        #[arg(long)]
        duration: Option<f64>,
        #[arg(long)]
        channel: Option<u8>,
    },
}

#[derive(Args)]
struct ToneArgs {
    /// Tone frequency in Hz
    #[arg(long)]
    frequency: Option<f64>,
    /// Tone length in ms
    #[arg(long)]
    duration: Option<u32>,
    /// BCM GPIO pin driving the speaker
    #[arg(long)]
    pin: Option<u8>,
}

#[derive(Args)]
struct DetectorArgs {
    /// Trigger voltage
    #[arg(long)]
    threshold: Option<f64>,
    #[arg(long)]
    channel: Option<u8>,
    /// Give up on a ping after this many samples
    #[arg(long)]
    max_iterations: Option<u64>,
}

impl ToneArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(frequency) = self.frequency {
            config.tone.frequency_hz = frequency;
        }
        if let Some(duration) = self.duration {
            config.tone.duration_ms = duration;
        }
        if let Some(pin) = self.pin {
            config.tone.pin = pin;
        }
    }
}

impl DetectorArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.detector.threshold_voltage = threshold;
        }
        if let Some(channel) = self.channel {
            config.detector.channel = channel;
        }
        if self.max_iterations.is_some() {
            config.detector.max_iterations = self.max_iterations;
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

/// First Ctrl-C asks the loops to stop between steps so the pins are released
/// low. A second one exits at once, for when a detection never returns.
fn install_shutdown_handler() -> Result<Arc<AtomicBool>> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let shutdown_signal_clone = Arc::clone(&shutdown_signal);
    ctrlc::set_handler(move || {
        if shutdown_signal_clone.swap(true, Ordering::SeqCst) {
            println!("\nForced exit");
            std::process::exit(130);
        }
        println!("\nStopping after the current step (Ctrl+C again to force)...");
    })?;
    Ok(shutdown_signal)
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)?;
    let mut delay = SpinDelay;
    let shutdown_signal = install_shutdown_handler()?;

    match cli.command {
        Commands::Ping {
            every,
            tone,
            detector,
        } => {
            tone.apply(&mut config);
            detector.apply(&mut config);
            config.validate()?;

            let mut speaker = GpioSpeaker::new(config.tone.pin).context("speaker setup")?;
            let mut adc = Mcp3008::new(&config.adc).context("ADC setup")?;
            let mut console = io::stdout();

            let pings = match every {
                Some(period_ms) => {
                    info!("Pinging every {} ms", period_ms);
                    run_ping_loop(
                        &mut CadenceTrigger::new(period_ms, Arc::clone(&shutdown_signal)),
                        &mut speaker,
                        &mut adc,
                        &mut delay,
                        &mut console,
                        &config.tone,
                        &config.detector,
                    )?
                }
                None => run_ping_loop(
                    &mut ConsoleTrigger::new(
                        io::stdin().lock(),
                        io::stdout(),
                        Arc::clone(&shutdown_signal),
                    ),
                    &mut speaker,
                    &mut adc,
                    &mut delay,
                    &mut console,
                    &config.tone,
                    &config.detector,
                )?,
            };
            info!("Sent {} pings", pings);
        }
        Commands::Respond {
            count,
            tone,
            detector,
        } => {
            tone.apply(&mut config);
            detector.apply(&mut config);
            config.validate()?;

            let mut speaker = GpioSpeaker::new(config.tone.pin).context("speaker setup")?;
            let mut adc = Mcp3008::new(&config.adc).context("ADC setup")?;
            info!(
                "Listening on channel {} for signals above {:.2}V",
                config.detector.channel, config.detector.threshold_voltage
            );
            let responses = run_responder(
                &mut adc,
                &mut speaker,
                &mut delay,
                &config.detector,
                &config.tone,
                count,
                &shutdown_signal,
            )?;
            info!("Sent {} responses", responses);
        }
        Commands::Beacon { pause, count, tone } => {
            tone.apply(&mut config);
            config.validate()?;
            let pause_ms = pause.unwrap_or(config.control.cadence_ms);

            let mut speaker = GpioSpeaker::new(config.tone.pin).context("speaker setup")?;
            info!(
                "Beeping {} Hz for {} ms every {} ms on GPIO{}",
                config.tone.frequency_hz, config.tone.duration_ms, pause_ms, config.tone.pin
            );
            let beeps = run_beacon(
                &mut speaker,
                &mut delay,
                &config.tone,
                pause_ms,
                count,
                &shutdown_signal,
            )?;
            info!("Sent {} beeps", beeps);
        }
        Commands::Monitor {
            interval,
            count,
            channel,
        } => {
            if let Some(channel) = channel {
                config.detector.channel = channel;
            }
            config.validate()?;
            let interval_ms = interval.unwrap_or(config.control.monitor_interval_ms);

            let mut adc = Mcp3008::new(&config.adc).context("ADC setup")?;
            run_monitor(
                &mut adc,
                &mut delay,
                &mut io::stdout(),
                &config.detector,
                interval_ms,
                count,
                &shutdown_signal,
            )?;
        }
        Commands::Record {
            output,
            rate,
            duration,
            channel,
        } => {
            if let Some(channel) = channel {
                config.detector.channel = channel;
            }
            if let Some(rate) = rate {
                config.control.record_rate_hz = rate;
            }
            if let Some(duration) = duration {
                config.control.record_duration_s = duration;
            }
            config.validate()?;

            let mut adc = Mcp3008::new(&config.adc).context("ADC setup")?;
            let path = output.unwrap_or_else(|| new_file_name(&config.control.recordings_dir));
            let period_us = sample_period_us(config.control.record_rate_hz);
            let recorder = Recorder::create(&path, period_us as f64 / 1_000_000.0)
                .with_context(|| format!("creating {}", path.display()))?;

            let stats = record_batch(
                &mut adc,
                &mut delay,
                &recorder,
                &config.detector,
                config.control.record_rate_hz,
                config.control.record_duration_s,
            )?;
            let path = recorder.path().to_path_buf();
            let rows = recorder.finish()?;
            println!(
                "Sampled {} readings, actual sample rate: {:.2} Hz",
                stats.samples, stats.achieved_rate_hz
            );
            println!("Wrote {} rows to {}", rows, path.display());
        }
    }

    Ok(())
}
