use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::ChunkCache;
use crate::codec::Codec;
use crate::config::{CacheConfig, ListConfig};
use crate::format::{self, ChunkContents, Toc, HEADER_LEN, TOC_ENTRY_LEN};
use crate::{Error, Result};

/// Read-only view over a written compressed list.
///
/// Only the TOC is loaded on open. `get` decompresses the one chunk holding
/// the requested element and keeps it in the reader's [`ChunkCache`].
///
/// The underlying handle is shared by every `get` on this reader and its
/// position is guarded by a single lock held for each seek-and-read. Use
/// [`CompressedList::open_path`] to give a reader its own handle.
pub struct CompressedList<T, C, R = File> {
    source: Mutex<R>,
    codec: C,
    start_offset: u64,
    toc_offset: u64,
    toc: Toc,
    cache: ChunkCache,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: Codec<T>> CompressedList<T, C, File> {
    /// Opens `path` with a dedicated file handle.
    pub fn open_path(path: impl AsRef<Path>, codec: C, start_offset: u64) -> Result<Self> {
        Self::open_path_with_config(path, codec, start_offset, &ListConfig::default())
    }

    pub fn open_path_with_config(
        path: impl AsRef<Path>,
        codec: C,
        start_offset: u64,
        config: &ListConfig,
    ) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::open_with_cache(file, codec, start_offset, config.cache)
    }
}

impl<T, C: Codec<T>, R: Read + Seek> CompressedList<T, C, R> {
    pub fn open(source: R, codec: C, start_offset: u64) -> Result<Self> {
        Self::open_with_cache(source, codec, start_offset, CacheConfig::default())
    }

    /// Reads the header at `start_offset` and loads the TOC.
    ///
    /// # Errors
    ///
    /// - `Error::Config`: invalid cache bounds
    /// - `Error::Corrupt`: header or TOC fails validation
    /// - `Error::Io`: the source could not be read
    pub fn open_with_cache(
        mut source: R,
        codec: C,
        start_offset: u64,
        cache: CacheConfig,
    ) -> Result<Self> {
        cache.validate()?;
        let stream_len = source.seek(SeekFrom::End(0))?;
        if start_offset.saturating_add(HEADER_LEN) > stream_len {
            return Err(Error::Corrupt("list header past end of stream"));
        }
        let toc_offset = format::read_header(&mut source, start_offset)?;
        if toc_offset < start_offset + HEADER_LEN || toc_offset >= stream_len {
            return Err(Error::Corrupt("toc offset outside stream"));
        }

        let toc = {
            let mut block = format::open_block(&mut source, toc_offset)?;
            Toc::decode(&mut block, start_offset, toc_offset)?
        };
        log::debug!(
            "opened compressed list at {}: {} elements in {} chunks",
            start_offset,
            toc.num_elements(),
            toc.num_chunks()
        );

        Ok(Self {
            source: Mutex::new(source),
            codec,
            start_offset,
            toc_offset,
            toc,
            cache: ChunkCache::new(cache),
            _marker: PhantomData,
        })
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// - `Error::OutOfRange`: `index >= self.len()`
    /// - `Error::Corrupt`: the chunk holding `index` fails validation
    /// - `Error::Codec`: the element bytes could not be decoded
    pub fn get(&self, index: usize) -> Result<T> {
        let chunk = self.toc.chunk_for_element(index).ok_or(Error::OutOfRange {
            index,
            len: self.len(),
        })?;
        let contents = self.chunk(chunk)?;
        let relative = index - contents.first_element;
        let mut bytes = contents
            .element_bytes(relative)
            .ok_or(Error::Corrupt("element missing from chunk"))?;
        Codec::read(&self.codec, &mut bytes).map_err(|source| Error::Codec { index, source })
    }

    pub fn len(&self) -> usize {
        self.toc.num_elements()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_chunks(&self) -> usize {
        self.toc.num_chunks()
    }

    /// Size of the uncompressed TOC entries.
    pub fn toc_bytes(&self) -> usize {
        self.toc.num_chunks() * TOC_ENTRY_LEN
    }

    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    pub fn toc_offset(&self) -> u64 {
        self.toc_offset
    }

    /// `[first, last)` element range of each chunk.
    pub fn chunk_ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.toc.num_chunks()).map(|c| (self.toc.first_element(c), self.toc.last_elements[c] as usize))
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    pub fn iter(&self) -> Iter<'_, T, C, R> {
        Iter {
            list: self,
            next: 0,
        }
    }

    fn chunk(&self, chunk: usize) -> Result<Arc<ChunkContents>> {
        if let Some(contents) = self.cache.get(chunk) {
            return Ok(contents);
        }
        let contents = Arc::new(self.read_chunk(chunk)?);
        self.cache.insert(chunk, Arc::clone(&contents));
        Ok(contents)
    }

    fn read_chunk(&self, chunk: usize) -> Result<ChunkContents> {
        let first = self.toc.first_element(chunk);
        let expected = self.toc.last_elements[chunk] as usize - first;
        let mut source = self.source.lock();
        let mut block = format::open_block(&mut *source, self.toc.chunk_starts[chunk])?;
        let contents = ChunkContents::decode(&mut block, first, expected)?;
        log::trace!(
            "decoded chunk {} ({} elements, {} bytes)",
            chunk,
            contents.len(),
            contents.payload.len()
        );
        Ok(contents)
    }
}

impl<T, C, R> std::fmt::Debug for CompressedList<T, C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedList")
            .field("start_offset", &self.start_offset)
            .field("toc_offset", &self.toc_offset)
            .field("num_chunks", &self.toc.num_chunks())
            .field("len", &self.toc.num_elements())
            .field("cache", &self.cache)
            .finish()
    }
}

/// In-order iterator over a [`CompressedList`].
pub struct Iter<'a, T, C, R> {
    list: &'a CompressedList<T, C, R>,
    next: usize,
}

impl<'a, T, C: Codec<T>, R: Read + Seek> Iterator for Iter<'a, T, C, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.list.len() {
            return None;
        }
        let item = self.list.get(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.list.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<'a, T, C: Codec<T>, R: Read + Seek> ExactSizeIterator for Iter<'a, T, C, R> {}
