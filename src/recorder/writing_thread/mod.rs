mod csv_utils;
use super::channel_messages::RecorderToWriterChannelMessage::{self, Data, EndThread};
use crossbeam::channel::Receiver;
use csv_utils::{write_csv_header, write_csv_row};
use std::io::{BufWriter, Result, Write};

/// Writes samples to `writer` as CSV rows, in the order they arrive.
///
/// Stops on `EndThread` or when every sender is gone. Returns the row count.
pub fn writing_thread_logic<W: Write>(
    receiver: Receiver<RecorderToWriterChannelMessage>,
    writer: W,
    sample_period_s: f64,
) -> Result<u64> {
    let mut writer = BufWriter::new(writer);
    write_csv_header(&mut writer)?;

    let mut rows: u64 = 0;
    for message in receiver {
        match message {
            EndThread => break,
            Data(sample) => {
                write_csv_row(&mut writer, rows as f64 * sample_period_s, &sample)?;
                rows += 1;
            }
        }
    }
    writer.flush()?;
    Ok(rows)
}
