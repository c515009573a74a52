use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::{Error, Result};

/// Gzip `input` as a single member.
pub fn zip(input: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(input)?;
    Ok(encoder.finish()?)
}

/// Inflate exactly `result_size` bytes from a gzip member.
///
/// Fails with `Error::Corrupt` when the member holds fewer bytes. Trailing
/// bytes past `result_size` are ignored.
pub fn unzip(input: &[u8], result_size: usize) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(input);
    let mut result = vec![0u8; result_size];
    decoder
        .read_exact(&mut result)
        .map_err(|err| Error::from_structure(err, "gzip data shorter than expected"))?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_unzip_round_trip() -> Result<()> {
        let input: Vec<u8> = (0..4096).map(|i| (i % 17) as u8).collect();
        let zipped = zip(&input)?;
        assert!(zipped.len() < input.len());
        assert_eq!(&zipped[..2], &[0x1f, 0x8b]);
        assert_eq!(unzip(&zipped, input.len())?, input);
        Ok(())
    }

    #[test]
    fn unzip_prefix_and_short_input() -> Result<()> {
        let zipped = zip(b"dictionary")?;
        assert_eq!(unzip(&zipped, 4)?, b"dict");
        assert!(matches!(unzip(&zipped, 64), Err(Error::Corrupt(_))));
        assert!(matches!(unzip(b"plain", 3), Err(Error::Corrupt(_))));
        Ok(())
    }
}
