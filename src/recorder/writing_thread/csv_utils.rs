use crate::detector::Sample;
use std::io::{Result, Write};

pub(crate) const CSV_HEADER: &str = "time_s,voltage,raw";

pub(crate) fn write_csv_header<W: Write>(writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", CSV_HEADER)
}

// time_s is nominal (row index * sample period), not measured
pub(crate) fn write_csv_row<W: Write>(writer: &mut W, time_s: f64, sample: &Sample) -> Result<()> {
    writeln!(writer, "{:.6},{:.4},{}", time_s, sample.voltage, sample.raw)
}
