//! Sequential primitive reads over a seekable byte source.
//!

use std::io::{self, Read, Seek, SeekFrom};

use binrw::{BinRead, Endian};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::{
    error::{Error, Result},
    types::FixedSize,
};

/// A reader that tracks its position and the length of the underlying source
///
/// Every read checks the remaining length first, so a corrupt size field fails
/// with [`Error::TruncatedRead`] instead of allocating or reading past the end.
///
/// ```
/// use binrw::Endian;
/// use eso_mnf::cursor::BinaryCursor;
/// use std::io::Cursor;
///
/// let mut cursor = BinaryCursor::new(Cursor::new([0x00, 0x03, 0x03, 0x00])).unwrap();
/// assert_eq!(cursor.read_u16(Endian::Big).unwrap(), 3);
/// assert_eq!(cursor.read_u16(Endian::Little).unwrap(), 3);
/// assert!(cursor.read_u8().is_err());
/// ```
#[derive(Debug)]
pub struct BinaryCursor<R> {
    inner: R,
    position: u64,
    len: u64,
}

impl<R: Read + Seek> BinaryCursor<R> {
    /// Wrap a reader, measuring its length and keeping its current position
    pub fn new(mut inner: R) -> Result<Self> {
        let position = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(position))?;

        Ok(BinaryCursor {
            inner,
            position,
            len,
        })
    }

    /// Current absolute position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total length of the source
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the source is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes left between the position and the end of the source
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }

    /// Move to an absolute or relative position
    ///
    /// Seeking past the end is allowed, the next read reports the truncation.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
        }
        .ok_or_else(|| {
            Error::IOError(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of source",
            ))
        })?;

        self.position = self.inner.seek(SeekFrom::Start(target))?;
        Ok(self.position)
    }

    /// Skip `count` bytes, failing if they are not there
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.ensure(count)?;
        self.seek(SeekFrom::Current(count as i64))?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let value = self.inner.read_u8()?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self, endian: Endian) -> Result<u16> {
        self.ensure(2)?;
        let value = match endian {
            Endian::Big => self.inner.read_u16::<BigEndian>()?,
            Endian::Little => self.inner.read_u16::<LittleEndian>()?,
        };
        self.position += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self, endian: Endian) -> Result<u32> {
        self.ensure(4)?;
        let value = match endian {
            Endian::Big => self.inner.read_u32::<BigEndian>()?,
            Endian::Little => self.inner.read_u32::<LittleEndian>()?,
        };
        self.position += 4;
        Ok(value)
    }

    pub fn read_u64(&mut self, endian: Endian) -> Result<u64> {
        self.ensure(8)?;
        let value = match endian {
            Endian::Big => self.inner.read_u64::<BigEndian>()?,
            Endian::Little => self.inner.read_u64::<LittleEndian>()?,
        };
        self.position += 8;
        Ok(value)
    }

    /// Read exactly `count` bytes
    pub fn read_bytes(&mut self, count: u64) -> Result<Vec<u8>> {
        self.ensure(count)?;
        let mut buffer = vec![0u8; count as usize];
        self.inner.read_exact(&mut buffer)?;
        self.position += count;
        Ok(buffer)
    }

    /// Read a fixed-layout structure
    ///
    /// Structures declare their own endianness, `Little` is only the fallback
    /// for types that do not.
    pub fn read_struct<T>(&mut self) -> Result<T>
    where
        T: for<'a> BinRead<Args<'a> = ()> + FixedSize,
    {
        self.ensure(T::SIZE)?;
        let value = T::read_options(&mut self.inner, Endian::Little, ())?;
        self.position = self.inner.stream_position()?;
        Ok(value)
    }

    /// Unwrap and return the inner reader
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn ensure(&self, needed: u64) -> Result<()> {
        let available = self.remaining();
        if available < needed {
            return Err(Error::TruncatedRead {
                position: self.position,
                needed,
                available,
            });
        }
        Ok(())
    }
}
