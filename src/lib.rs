//! Write-once, random-access compressed lists.
//!
//! A list is written in one pass into any seekable sink. Elements are encoded
//! with a [`Codec`], packed into gzip chunks of roughly
//! `chunk_threshold_bytes` uncompressed bytes, and indexed by a table of
//! contents stored after the last chunk. A reader loads only that table and
//! decompresses the single chunk holding a requested element.
//!
//! ```no_run
//! use std::fs::OpenOptions;
//! use compressed_list::{write_list, CompressedList, StringCodec};
//!
//! let words: Vec<String> = vec!["aback".into(), "abacus".into(), "abandon".into()];
//! let mut file = OpenOptions::new()
//!     .read(true)
//!     .write(true)
//!     .create(true)
//!     .truncate(true)
//!     .open("words.clist")?;
//! write_list(&mut file, &words, StringCodec, 32 * 1024)?;
//!
//! let list = CompressedList::open_path("words.clist", StringCodec, 0)?;
//! assert_eq!(list.get(1)?, "abacus");
//! # Ok::<(), compressed_list::Error>(())
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod reader;
pub mod util;
pub mod writer;

pub use cache::{CacheStats, ChunkCache};
pub use codec::{Codec, I64Codec, Record, RecordCodec, StringCodec};
pub use config::{CacheConfig, ListConfig};
pub use error::{Error, Result};
pub use reader::{CompressedList, Iter};
pub use writer::{write_list, write_list_with_config, ListSummary, ListWriter};
