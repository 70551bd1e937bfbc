/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::mem;
use std::num::NonZeroUsize;

use bytes::Bytes;
use log::warn;

use crate::source::read_some;
use crate::{AsyncSource, BufIoError, BufReaderConfig};

mod line;
pub use line::ReadLine;

/// Read-ahead buffering over an [`AsyncSource`].
///
/// The window size is fixed at creation. Slices returned by
/// [`read_slice`](Self::read_slice), [`read_line`](Self::read_line) and
/// [`peek`](Self::peek) point into the window and are only valid until the
/// next read.
pub struct BufReader<R> {
    inner: R,
    buf: Box<[u8]>,
    r: usize,
    w: usize,
    eof: bool,
    max_empty_reads: NonZeroUsize,
}

impl<R> BufReader<R> {
    pub fn new(inner: R) -> Self {
        BufReader::with_config(&BufReaderConfig::default(), inner)
    }

    /// Creates a new `BufReader` with the specified window size, which will
    /// be raised to [`MIN_BUF_SIZE`](crate::MIN_BUF_SIZE) if too small.
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        BufReader::with_config(&BufReaderConfig::with_buffer_size(capacity), inner)
    }

    pub fn with_config(config: &BufReaderConfig, inner: R) -> Self {
        BufReader {
            inner,
            buf: vec![0u8; config.buffer_size()].into_boxed_slice(),
            r: 0,
            w: 0,
            eof: false,
            max_empty_reads: config.max_empty_reads(),
        }
    }

    /// Size of the window in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes that can be read from the window.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.w - self.r
    }

    /// The buffered data, without trying to read more.
    pub fn buffer(&self) -> &[u8] {
        &self.buf[self.r..self.w]
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Gets a mutable reference to the underlying source.
    ///
    /// It is inadvisable to directly read from the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consumes this `BufReader`, returning the underlying source.
    ///
    /// Note that any leftover data in the window is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Discard all buffered data and switch to a new source, keeping the
    /// window allocation. The old source is returned.
    pub fn reset(&mut self, inner: R) -> R {
        self.r = 0;
        self.w = 0;
        self.eof = false;
        mem::replace(&mut self.inner, inner)
    }
}

impl<R> BufReader<R>
where
    R: AsyncSource + Unpin,
{
    /// Read a new chunk into the window, moving unread data to the front first.
    async fn fill(&mut self) -> Result<(), BufIoError> {
        if self.r > 0 {
            self.buf.copy_within(self.r..self.w, 0);
            self.w -= self.r;
            self.r = 0;
        }
        if self.w >= self.buf.len() {
            return Err(io::Error::other("tried to fill a full buffer").into());
        }

        for _ in 0..self.max_empty_reads.get() {
            match read_some(&mut self.inner, &mut self.buf[self.w..]).await? {
                Some(0) => {}
                Some(nr) => {
                    self.w += nr;
                    return Ok(());
                }
                None => {
                    self.eof = true;
                    return Ok(());
                }
            }
        }
        warn!(
            "no data read after {} consecutive empty reads",
            self.max_empty_reads
        );
        Err(BufIoError::NoProgress(self.max_empty_reads.get()))
    }

    /// Read data into `dst`.
    ///
    /// At most one read is issued to the underlying source, so fewer than
    /// `dst.len()` bytes may be returned. `None` means end of stream, while an
    /// empty `dst` always gets `Some(0)`.
    pub async fn read(&mut self, dst: &mut [u8]) -> Result<Option<usize>, BufIoError> {
        if dst.is_empty() {
            return Ok(Some(0));
        }

        if self.r == self.w {
            if dst.len() >= self.buf.len() {
                // large read with an empty window, skip the copy
                return Ok(read_some(&mut self.inner, dst).await?);
            }
            self.r = 0;
            self.w = 0;
            match read_some(&mut self.inner, &mut self.buf[..]).await? {
                Some(0) => return Ok(Some(0)),
                Some(nr) => self.w = nr,
                None => return Ok(None),
            }
        }

        let n = dst.len().min(self.w - self.r);
        dst[..n].copy_from_slice(&self.buf[self.r..self.r + n]);
        self.r += n;
        Ok(Some(n))
    }

    /// Read exactly `dst.len()` bytes.
    ///
    /// Returns `None` if the stream ended before any byte was read, and
    /// [`BufIoError::PartialRead`] if it ended in the middle.
    pub async fn read_full(&mut self, dst: &mut [u8]) -> Result<Option<usize>, BufIoError> {
        let mut filled = 0;
        let mut empty_reads = 0;
        while filled < dst.len() {
            match self.read(&mut dst[filled..]).await? {
                Some(0) => {
                    empty_reads += 1;
                    if empty_reads >= self.max_empty_reads.get() {
                        warn!("no data read after {empty_reads} consecutive empty reads");
                        return Err(BufIoError::NoProgress(empty_reads));
                    }
                }
                Some(nr) => {
                    filled += nr;
                    empty_reads = 0;
                }
                None if filled == 0 => return Ok(None),
                None => {
                    return Err(BufIoError::PartialRead {
                        partial: Bytes::copy_from_slice(&dst[..filled]),
                    });
                }
            }
        }
        Ok(Some(filled))
    }

    pub async fn read_byte(&mut self) -> Result<Option<u8>, BufIoError> {
        while self.r == self.w {
            if self.eof {
                return Ok(None);
            }
            self.fill().await?;
        }
        let c = self.buf[self.r];
        self.r += 1;
        Ok(Some(c))
    }

    pub async fn read_u16(&mut self) -> Result<Option<u16>, BufIoError> {
        let mut b = [0u8; 2];
        Ok(self.read_full(&mut b).await?.map(|_| u16::from_be_bytes(b)))
    }

    pub async fn read_u32(&mut self) -> Result<Option<u32>, BufIoError> {
        let mut b = [0u8; 4];
        Ok(self.read_full(&mut b).await?.map(|_| u32::from_be_bytes(b)))
    }

    pub async fn read_u64(&mut self) -> Result<Option<u64>, BufIoError> {
        let mut b = [0u8; 8];
        Ok(self.read_full(&mut b).await?.map(|_| u64::from_be_bytes(b)))
    }

    /// Return the next `n` bytes without advancing the reader.
    ///
    /// Fewer bytes are returned only at the end of stream. If `n` bytes can
    /// not fit into the window [`BufIoError::BufferFull`] is returned.
    pub async fn peek(&mut self, n: usize) -> Result<Option<&[u8]>, BufIoError> {
        let mut avail = self.buffered();
        while avail < n && avail < self.buf.len() && !self.eof {
            self.fill().await?;
            avail = self.buffered();
        }

        if avail == 0 && self.eof {
            Ok(None)
        } else if avail < n && self.eof {
            Ok(Some(&self.buf[self.r..self.w]))
        } else if avail < n {
            Err(BufIoError::BufferFull {
                partial: Bytes::copy_from_slice(&self.buf[self.r..self.w]),
            })
        } else {
            Ok(Some(&self.buf[self.r..self.r + n]))
        }
    }
}
