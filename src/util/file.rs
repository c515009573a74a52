use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

/// Serialize `value` as JSON into a gzip file at `path`.
pub fn write_object<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    serde_json::to_writer(&mut encoder, value).map_err(std::io::Error::from)?;
    encoder.finish()?.sync_all()?;
    Ok(())
}

pub fn read_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let file = File::open(path.as_ref())?;
    let decoder = GzDecoder::new(BufReader::new(file));
    serde_json::from_reader(decoder).map_err(|err| {
        if err.is_io() {
            Error::from_structure(err.into(), "object stream")
        } else {
            Error::Corrupt("object stream is not valid json")
        }
    })
}

/// Read one line starting at byte `offset`, without its terminator.
///
/// Returns `None` when `offset` is at or past the end of the file.
pub fn read_line_at<R: Read + Seek>(file: &mut R, offset: u64) -> Result<Option<String>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut line = String::new();
    if BufReader::new(file).read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches('\n').trim_end_matches('\r').len();
    line.truncate(trimmed);
    Ok(Some(line))
}

pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }
    Ok(lines)
}

/// Whole file as text, each line terminated by `\n`.
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let mut out = String::new();
    for line in read_lines(path)? {
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

pub fn print_string(path: impl AsRef<Path>, s: &str) -> Result<()> {
    let mut file = File::create(path.as_ref())?;
    file.write_all(s.as_bytes())?;
    Ok(())
}
