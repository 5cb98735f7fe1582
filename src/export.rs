//! Plain-text series export.
//!
//! Every output series (samples, differences, means, steps, RTT estimates,
//! rates) is written one value per line, newline-terminated.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write up to `limit` values, one per line. Returns the count written.
pub fn write_series<W, T>(writer: &mut W, values: &[T], limit: Option<usize>) -> io::Result<usize>
where
    W: Write,
    T: Display,
{
    let count = limit.map_or(values.len(), |l| l.min(values.len()));
    for value in &values[..count] {
        writeln!(writer, "{value}")?;
    }
    Ok(count)
}

/// Write a series to a file, replacing any existing file.
pub fn write_series_file<T: Display>(
    path: impl AsRef<Path>,
    values: &[T],
    limit: Option<usize>,
) -> io::Result<usize> {
    let mut writer = BufWriter::new(File::create(path)?);
    let count = write_series(&mut writer, values, limit)?;
    writer.flush()?;
    Ok(count)
}
