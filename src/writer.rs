use std::io::{Seek, SeekFrom, Write};

use crate::codec::Codec;
use crate::config::ListConfig;
use crate::format::{self, Toc, HEADER_LEN};
use crate::{Error, Result};

/// What a finished write produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSummary {
    pub start_offset: u64,
    pub toc_offset: u64,
    pub end_offset: u64,
    pub num_chunks: usize,
    pub num_elements: usize,
}

impl ListSummary {
    pub fn total_bytes(&self) -> u64 {
        self.end_offset - self.start_offset
    }
}

/// Accumulates encoded elements and emits compressed chunk blocks.
///
/// The threshold is checked before an element is added, so a chunk always
/// holds at least one element and may overshoot the threshold by the size of
/// its last element.
pub(crate) struct ChunkBuilder {
    threshold: usize,
    level: u32,
    pending: Vec<u8>,
    element_starts: Vec<u32>,
    element_count: usize,
    toc: Toc,
}

impl ChunkBuilder {
    pub(crate) fn new(threshold: usize, level: u32) -> Self {
        Self {
            threshold,
            level,
            pending: Vec::with_capacity(threshold.saturating_add(1).min(1 << 20)),
            element_starts: Vec::new(),
            element_count: 0,
            toc: Toc::default(),
        }
    }

    pub(crate) fn push<T, C, W>(&mut self, sink: &mut W, codec: &C, value: &T) -> Result<()>
    where
        C: Codec<T> + ?Sized,
        W: Write + Seek,
    {
        if self.pending.len() > self.threshold {
            self.flush(sink)?;
        }
        let start = u32::try_from(self.pending.len())
            .map_err(|_| Error::Corrupt("chunk payload exceeds u32"))?;
        self.element_starts.push(start);
        if let Err(err) = Codec::write(codec, &mut self.pending, value) {
            // Drop the partial encoding so the chunk stays consistent with
            // the element count.
            self.pending.truncate(start as usize);
            self.element_starts.pop();
            return Err(err.into());
        }
        self.element_count += 1;
        Ok(())
    }

    /// Writes the pending elements as one chunk. Does nothing when no
    /// element is pending.
    pub(crate) fn flush<W: Write + Seek>(&mut self, sink: &mut W) -> Result<()> {
        if self.element_starts.is_empty() {
            return Ok(());
        }
        let chunk_start = sink.stream_position()?;
        let raw = format::encode_chunk(&self.element_starts, &self.pending)?;
        let compressed = format::compress(&raw, self.level)?;
        sink.write_all(&compressed)?;

        let last_element = u32::try_from(self.element_count)
            .ok()
            .filter(|&last| last <= i32::MAX as u32)
            .ok_or(Error::Corrupt("element count exceeds i32"))?;
        self.toc.push(chunk_start, last_element);
        log::debug!(
            "chunk {} at {}: {} elements, {} raw bytes, {} compressed",
            self.toc.num_chunks() - 1,
            chunk_start,
            self.element_starts.len(),
            raw.len(),
            compressed.len()
        );

        self.element_starts.clear();
        self.pending.clear();
        Ok(())
    }

    pub(crate) fn element_count(&self) -> usize {
        self.element_count
    }

    pub(crate) fn finish<W: Write + Seek>(mut self, sink: &mut W) -> Result<Toc> {
        self.flush(sink)?;
        Ok(self.toc)
    }
}

/// Single-pass writer for a compressed list.
///
/// ```no_run
/// use std::fs::File;
/// use compressed_list::{I64Codec, ListConfig, ListWriter};
///
/// let mut file = File::create("numbers.clist")?;
/// let mut writer = ListWriter::begin(&mut file, I64Codec, &ListConfig::with_threshold(4096))?;
/// for n in 0..1_000i64 {
///     writer.push(&n)?;
/// }
/// let summary = writer.finish()?;
/// assert_eq!(summary.num_elements, 1_000);
/// # Ok::<(), compressed_list::Error>(())
/// ```
pub struct ListWriter<'a, W: Write + Seek, C> {
    sink: &'a mut W,
    codec: C,
    header_offset: u64,
    level: u32,
    builder: ChunkBuilder,
}

impl<'a, W: Write + Seek, C> ListWriter<'a, W, C> {
    /// Reserves the header at the current sink position.
    pub fn begin(sink: &'a mut W, codec: C, config: &ListConfig) -> Result<Self> {
        config.validate()?;
        let header_offset = sink.stream_position()?;
        sink.write_all(&[0u8; HEADER_LEN as usize])?;
        Ok(Self {
            sink,
            codec,
            header_offset,
            level: config.compression_level,
            builder: ChunkBuilder::new(config.chunk_threshold_bytes, config.compression_level),
        })
    }

    pub fn push<T>(&mut self, value: &T) -> Result<()>
    where
        C: Codec<T>,
    {
        self.builder.push(&mut *self.sink, &self.codec, value)
    }

    pub fn len(&self) -> usize {
        self.builder.element_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes the last chunk, writes the TOC and patches the header.
    ///
    /// The sink is left positioned at the end of the list.
    pub fn finish(self) -> Result<ListSummary> {
        let Self {
            sink,
            header_offset,
            level,
            builder,
            ..
        } = self;
        let num_elements = builder.element_count();
        let toc = builder.finish(&mut *sink)?;

        let toc_offset = sink.stream_position()?;
        let compressed = format::compress(&toc.encode()?, level)?;
        sink.write_all(&compressed)?;

        let end_offset = sink.stream_position()?;
        format::write_header(&mut *sink, header_offset, toc_offset)?;
        sink.seek(SeekFrom::Start(end_offset))?;
        sink.flush()?;

        log::info!(
            "wrote compressed list at {}: {} elements in {} chunks, toc at {}, end at {}",
            header_offset,
            num_elements,
            toc.num_chunks(),
            toc_offset,
            end_offset
        );
        Ok(ListSummary {
            start_offset: header_offset,
            toc_offset,
            end_offset,
            num_chunks: toc.num_chunks(),
            num_elements,
        })
    }
}

/// Writes `items` as a compressed list at the sink's current position.
pub fn write_list<'i, T, I, C, W>(
    sink: &mut W,
    items: I,
    codec: C,
    chunk_threshold_bytes: usize,
) -> Result<ListSummary>
where
    T: 'i,
    I: IntoIterator<Item = &'i T>,
    C: Codec<T>,
    W: Write + Seek,
{
    write_list_with_config(sink, items, codec, &ListConfig::with_threshold(chunk_threshold_bytes))
}

pub fn write_list_with_config<'i, T, I, C, W>(
    sink: &mut W,
    items: I,
    codec: C,
    config: &ListConfig,
) -> Result<ListSummary>
where
    T: 'i,
    I: IntoIterator<Item = &'i T>,
    C: Codec<T>,
    W: Write + Seek,
{
    let mut writer = ListWriter::begin(sink, codec, config)?;
    for item in items {
        writer.push(item)?;
    }
    writer.finish()
}
