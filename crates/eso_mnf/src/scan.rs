//! Pull-based cursors over decompressed record streams.
//!
//! Table blocks store their records in parallel streams that are joined by
//! position. Each stream gets its own scanner; the scanner keeps its position
//! between records so an exhausted stream simply stops contributing.

use std::io::Cursor;

use binrw::{BinRead, Endian};

use crate::error::Result;

/// Fourth byte of a stream 0 window that marks a record start
pub const SPARSE_SENTINEL: u8 = 0x80;

const SPARSE_STRIDE: usize = 4;

/// Yields the tagged 4 byte windows of a sparse stream
///
/// Windows whose last byte is not [`SPARSE_SENTINEL`] are continuation data and
/// are stepped over. Once fewer than four bytes remain the scanner is done and
/// stays done.
#[derive(Debug, Clone)]
pub struct SparseScanner<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SparseScanner<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SparseScanner { data, position: 0 }
    }

    /// Offset of the next window to look at
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Iterator for SparseScanner<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        while let Some(window) = self.data.get(self.position..self.position + SPARSE_STRIDE) {
            self.position += SPARSE_STRIDE;
            if window[3] == SPARSE_SENTINEL {
                return Some(u32::from_le_bytes([window[0], window[1], window[2], window[3]]));
            }
        }

        self.position = self.data.len();
        None
    }
}

/// Reads consecutive fixed-size records from a stream
#[derive(Debug, Clone)]
pub struct StrideScanner<'a> {
    data: &'a [u8],
    stride: usize,
    position: usize,
}

impl<'a> StrideScanner<'a> {
    pub fn new(data: &'a [u8], stride: usize) -> Self {
        StrideScanner {
            data,
            stride,
            position: 0,
        }
    }

    /// Number of whole records left
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position) / self.stride.max(1)
    }

    /// The next raw record, `None` once less than a full stride is left
    pub fn next_bytes(&mut self) -> Option<&'a [u8]> {
        let end = self.position.checked_add(self.stride)?;
        let record = self.data.get(self.position..end)?;
        self.position = end;
        Some(record)
    }

    /// The next record decoded as `T`
    pub fn next_record<T>(&mut self) -> Result<Option<T>>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        match self.next_bytes() {
            Some(bytes) => Ok(Some(T::read_options(
                &mut Cursor::new(bytes),
                Endian::Little,
                (),
            )?)),
            None => Ok(None),
        }
    }
}
