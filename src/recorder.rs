mod channel_messages;
mod writing_thread;

use crate::detector::Sample;
use crate::error::{Error, Result};
use channel_messages::RecorderToWriterChannelMessage::{self, Data, EndThread};
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{info, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use writing_thread::writing_thread_logic;

/// Persists samples to a CSV file from a background writing thread.
pub struct Recorder {
    sender: Sender<RecorderToWriterChannelMessage>,
    writing_thread: Option<JoinHandle<io::Result<u64>>>,
    path: PathBuf,
}

impl Recorder {
    /// Creates the file up front so a bad path fails before sampling starts.
    pub fn create(path: &Path, sample_period_s: f64) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;

        let (sender, receiver): (
            Sender<RecorderToWriterChannelMessage>,
            Receiver<RecorderToWriterChannelMessage>,
        ) = unbounded();

        let writing_thread =
            thread::spawn(move || writing_thread_logic(receiver, file, sample_period_s));

        info!("Recording to {}", path.display());
        Ok(Recorder {
            sender,
            writing_thread: Some(writing_thread),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, sample: Sample) -> Result<()> {
        self.sender
            .send(Data(sample))
            .map_err(|_| Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "CSV writer stopped")))
    }

    /// Flushes outstanding rows and returns how many were written.
    pub fn finish(mut self) -> Result<u64> {
        // The writer may already have exited on an IO error; its result says why.
        let _ = self.sender.send(EndThread);
        match self.writing_thread.take() {
            Some(handle) => {
                let rows = handle.join().map_err(|_| {
                    Error::Io(io::Error::new(io::ErrorKind::Other, "CSV writer panicked"))
                })??;
                info!("File written: {} ({} rows)", self.path.display(), rows);
                Ok(rows)
            }
            None => Ok(0),
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(thread_handle) = self.writing_thread.take() {
            let _ = self.sender.send(EndThread);
            match thread_handle.join() {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => warn!("Failed to write {}: {}", self.path.display(), err),
                Err(_) => warn!("CSV writer for {} panicked", self.path.display()),
            }
        }
    }
}

pub fn new_file_name(recordings_dir: &str) -> PathBuf {
    Path::new(recordings_dir).join(format!("{}.csv", chrono::Utc::now().timestamp()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_flushes_every_row() {
        let path = std::env::temp_dir()
            .join("pingpi-recorder-test")
            .join("finish.csv");
        let recorder = Recorder::create(&path, 0.5).unwrap();
        for raw in [0, 1023] {
            recorder.record(Sample::from_raw(raw, 3.3).unwrap()).unwrap();
        }
        assert_eq!(recorder.finish().unwrap(), 2);

        let csv = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(csv, "time_s,voltage,raw\n0.000000,0.0000,0\n0.500000,3.3000,1023\n");
    }

    #[test]
    fn drop_still_closes_the_file() {
        let path = std::env::temp_dir()
            .join("pingpi-recorder-test")
            .join("drop.csv");
        {
            let recorder = Recorder::create(&path, 1.0).unwrap();
            recorder.record(Sample::from_raw(512, 3.3).unwrap()).unwrap();
        }
        let csv = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn file_names_live_in_the_recordings_dir() {
        let path = new_file_name("recordings");
        assert_eq!(path.parent(), Some(Path::new("recordings")));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
    }
}
