//! Element codecs.
//!
//! A codec turns one element into bytes and back. Encodings do not need to be
//! self-delimiting: the chunk offset table bounds every element, and the
//! reader hands the codec a view that ends where the next element starts.

use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::sync::Arc;

/// Encodes and decodes one element type to and from bytes.
pub trait Codec<T> {
    /// Append the encoding of `value` to `sink`.
    fn write(&self, sink: &mut dyn Write, value: &T) -> io::Result<()>;

    /// Consume one encoding from `source` and rebuild the value.
    fn read(&self, source: &mut dyn Read) -> io::Result<T>;
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for &C {
    fn write(&self, sink: &mut dyn Write, value: &T) -> io::Result<()> {
        (**self).write(sink, value)
    }

    fn read(&self, source: &mut dyn Read) -> io::Result<T> {
        (**self).read(source)
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for Arc<C> {
    fn write(&self, sink: &mut dyn Write, value: &T) -> io::Result<()> {
        (**self).write(sink, value)
    }

    fn read(&self, source: &mut dyn Read) -> io::Result<T> {
        (**self).read(source)
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for Box<C> {
    fn write(&self, sink: &mut dyn Write, value: &T) -> io::Result<()> {
        (**self).write(sink, value)
    }

    fn read(&self, source: &mut dyn Read) -> io::Result<T> {
        (**self).read(source)
    }
}

/// UTF-8 text behind a 2-byte big-endian length prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec<String> for StringCodec {
    fn write(&self, sink: &mut dyn Write, value: &String) -> io::Result<()> {
        let len = u16::try_from(value.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("string of {} bytes exceeds u16 length prefix", value.len()),
            )
        })?;
        sink.write_all(&len.to_be_bytes())?;
        sink.write_all(value.as_bytes())
    }

    fn read(&self, source: &mut dyn Read) -> io::Result<String> {
        let mut len = [0u8; 2];
        source.read_exact(&mut len)?;
        let mut buf = vec![0u8; u16::from_be_bytes(len) as usize];
        source.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

/// Fixed-width 8-byte big-endian integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct I64Codec;

impl Codec<i64> for I64Codec {
    fn write(&self, sink: &mut dyn Write, value: &i64) -> io::Result<()> {
        sink.write_all(&value.to_be_bytes())
    }

    fn read(&self, source: &mut dyn Read) -> io::Result<i64> {
        let mut buf = [0u8; 8];
        source.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }
}

/// A type that knows how to write itself and how to be rebuilt from a cursor.
pub trait Record: Sized {
    fn encode(&self, sink: &mut dyn Write) -> io::Result<()>;

    fn decode(source: &mut dyn Read) -> io::Result<Self>;
}

/// Codec for any [`Record`]; the decode routine is fixed by the type parameter.
pub struct RecordCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> RecordCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for RecordCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RecordCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Copy for RecordCodec<T> {}

impl<T> std::fmt::Debug for RecordCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCodec")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Record> Codec<T> for RecordCodec<T> {
    fn write(&self, sink: &mut dyn Write, value: &T) -> io::Result<()> {
        value.encode(sink)
    }

    fn read(&self, source: &mut dyn Read) -> io::Result<T> {
        T::decode(source)
    }
}
