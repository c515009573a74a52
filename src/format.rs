//! On-disk framing for compressed lists.
//!
//! ```text
//! [start]       i64 toc_offset
//!               gzip chunk block, one per chunk
//! [toc_offset]  gzip { i32 chunk_count, chunk_count x { i64 chunk_start, i32 last_element } }
//! ```
//!
//! A chunk block decompresses to
//! `i32 element_count, i32[element_count] element_starts, i32 payload_len, payload`.
//! All integers are big-endian.

use std::io::{Read, Seek, SeekFrom, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::{Error, Result};

pub const HEADER_LEN: u64 = 8;
pub const TOC_ENTRY_LEN: usize = 12;

/// Chunk locations loaded from the table of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    pub chunk_starts: Vec<u64>,
    pub last_elements: Vec<u32>,
}

impl Toc {
    pub fn num_chunks(&self) -> usize {
        self.chunk_starts.len()
    }

    pub fn num_elements(&self) -> usize {
        self.last_elements.last().map_or(0, |&last| last as usize)
    }

    /// Smallest chunk whose `last_element` is past `index`.
    pub fn chunk_for_element(&self, index: usize) -> Option<usize> {
        let chunk = self
            .last_elements
            .partition_point(|&last| (last as usize) <= index);
        (chunk < self.last_elements.len()).then_some(chunk)
    }

    /// First element index covered by `chunk`.
    pub fn first_element(&self, chunk: usize) -> usize {
        if chunk == 0 {
            0
        } else {
            self.last_elements[chunk - 1] as usize
        }
    }

    pub fn push(&mut self, chunk_start: u64, last_element: u32) {
        self.chunk_starts.push(chunk_start);
        self.last_elements.push(last_element);
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = to_i32(self.num_chunks(), "chunk count exceeds i32")?;
        let mut buf = Vec::with_capacity(4 + self.num_chunks() * TOC_ENTRY_LEN);
        buf.extend_from_slice(&count.to_be_bytes());
        for (start, last) in self.chunk_starts.iter().zip(&self.last_elements) {
            let start = i64::try_from(*start)
                .map_err(|_| Error::Corrupt("chunk offset exceeds i64"))?;
            let last = to_i32(*last as usize, "element count exceeds i32")?;
            buf.extend_from_slice(&start.to_be_bytes());
            buf.extend_from_slice(&last.to_be_bytes());
        }
        Ok(buf)
    }

    /// Parses a decompressed TOC and checks it against the list bounds.
    pub fn decode(reader: &mut impl Read, start_offset: u64, toc_offset: u64) -> Result<Self> {
        let count = read_count(reader, "toc chunk count")?;
        let mut toc = Toc {
            chunk_starts: Vec::with_capacity(count.min(1 << 20)),
            last_elements: Vec::with_capacity(count.min(1 << 20)),
        };
        let mut prev_start: Option<u64> = None;
        let mut prev_last = 0u32;
        for _ in 0..count {
            let start = read_i64(reader).map_err(|e| Error::from_structure(e, "toc entry"))?;
            let last = read_i32(reader).map_err(|e| Error::from_structure(e, "toc entry"))?;
            let start = u64::try_from(start).map_err(|_| Error::Corrupt("negative chunk offset"))?;
            let last = u32::try_from(last).map_err(|_| Error::Corrupt("negative last element"))?;
            if start < start_offset + HEADER_LEN || start >= toc_offset {
                return Err(Error::Corrupt("chunk offset outside list"));
            }
            if prev_start.is_some_and(|prev| start <= prev) {
                return Err(Error::Corrupt("chunk offsets not increasing"));
            }
            if last <= prev_last {
                return Err(Error::Corrupt("last element not strictly increasing"));
            }
            toc.push(start, last);
            prev_start = Some(start);
            prev_last = last;
        }
        finish_block(reader, "toc block checksum")?;
        Ok(toc)
    }
}

/// Decoded contents of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkContents {
    pub first_element: usize,
    pub element_starts: Vec<u32>,
    pub payload: Vec<u8>,
}

impl ChunkContents {
    pub fn len(&self) -> usize {
        self.element_starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.element_starts.is_empty()
    }

    /// Bytes held by this chunk once decoded.
    pub fn weight(&self) -> usize {
        self.payload.len() + self.element_starts.len() * 4
    }

    /// Payload bytes of the element at `relative` within this chunk.
    pub fn element_bytes(&self, relative: usize) -> Option<&[u8]> {
        let start = *self.element_starts.get(relative)? as usize;
        let end = self
            .element_starts
            .get(relative + 1)
            .map_or(self.payload.len(), |&next| next as usize);
        self.payload.get(start..end)
    }

    /// Parses a decompressed chunk block expected to hold `expected_len` elements.
    pub fn decode(reader: &mut impl Read, first_element: usize, expected_len: usize) -> Result<Self> {
        let count = read_count(reader, "chunk element count")?;
        if count != expected_len {
            return Err(Error::Corrupt("chunk element count disagrees with toc"));
        }
        let mut element_starts = Vec::with_capacity(count);
        for _ in 0..count {
            let start = read_i32(reader).map_err(|e| Error::from_structure(e, "chunk offset table"))?;
            let start = u32::try_from(start).map_err(|_| Error::Corrupt("negative element offset"))?;
            if element_starts.last().is_some_and(|&prev| start < prev) {
                return Err(Error::Corrupt("element offsets decreasing"));
            }
            element_starts.push(start);
        }
        let payload_len = read_count(reader, "chunk payload length")?;
        if element_starts.last().is_some_and(|&last| last as usize > payload_len) {
            return Err(Error::Corrupt("element offset past payload"));
        }
        let mut payload = Vec::new();
        reader
            .by_ref()
            .take(payload_len as u64)
            .read_to_end(&mut payload)
            .map_err(|e| Error::from_structure(e, "chunk payload"))?;
        if payload.len() != payload_len {
            return Err(Error::Corrupt("chunk payload"));
        }
        finish_block(reader, "chunk block checksum")?;
        Ok(Self {
            first_element,
            element_starts,
            payload,
        })
    }
}

/// Serializes a chunk block from the pending element table and payload.
pub fn encode_chunk(element_starts: &[u32], payload: &[u8]) -> Result<Vec<u8>> {
    let count = to_i32(element_starts.len(), "chunk element count exceeds i32")?;
    let payload_len = to_i32(payload.len(), "chunk payload exceeds i32")?;
    let mut buf = Vec::with_capacity(8 + element_starts.len() * 4 + payload.len());
    buf.extend_from_slice(&count.to_be_bytes());
    for &start in element_starts {
        let start = to_i32(start as usize, "element offset exceeds i32")?;
        buf.extend_from_slice(&start.to_be_bytes());
    }
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

pub fn compress(raw: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2 + 32), Compression::new(level));
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Positions `source` at `offset` and returns a decompressing reader over it.
pub fn open_block<R: Read + Seek>(source: &mut R, offset: u64) -> Result<GzDecoder<&mut R>> {
    source.seek(SeekFrom::Start(offset))?;
    Ok(GzDecoder::new(source))
}

pub fn read_header<R: Read + Seek>(source: &mut R, start_offset: u64) -> Result<u64> {
    source.seek(SeekFrom::Start(start_offset))?;
    let toc_offset = read_i64(source).map_err(|e| Error::from_structure(e, "list header"))?;
    u64::try_from(toc_offset).map_err(|_| Error::Corrupt("negative toc offset"))
}

pub fn write_header<W: Write + Seek>(sink: &mut W, header_offset: u64, toc_offset: u64) -> Result<()> {
    let toc_offset = i64::try_from(toc_offset).map_err(|_| Error::Corrupt("toc offset exceeds i64"))?;
    sink.seek(SeekFrom::Start(header_offset))?;
    sink.write_all(&toc_offset.to_be_bytes())?;
    Ok(())
}

pub fn read_i32(reader: &mut impl Read) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

pub fn read_i64(reader: &mut impl Read) -> std::io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_be_bytes(buf))
}

/// Reads to the end of a decompressed block so the gzip trailer is verified.
/// Any byte left after the parsed structure is corruption.
fn finish_block(reader: &mut impl Read, what: &'static str) -> Result<()> {
    let mut byte = [0u8; 1];
    match reader.read(&mut byte) {
        Ok(0) => Ok(()),
        Ok(_) => Err(Error::Corrupt("trailing bytes in block")),
        Err(e) => Err(Error::from_structure(e, what)),
    }
}

fn read_count(reader: &mut impl Read, what: &'static str) -> Result<usize> {
    let value = read_i32(reader).map_err(|e| Error::from_structure(e, what))?;
    usize::try_from(value).map_err(|_| Error::Corrupt(what))
}

fn to_i32(value: usize, what: &'static str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::Corrupt(what))
}
