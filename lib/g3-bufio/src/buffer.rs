/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use log::{trace, warn};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::source::read_some;
use crate::{AsyncSource, BufferError, MAX_CONSECUTIVE_EMPTY_READS, MAX_SIZE, MIN_READ};

/// A variable-sized byte buffer with separate read and write positions.
///
/// Unread data lives in `buf[off..end]`. Reading advances `off` and writing
/// advances `end`, growing the allocation only when sliding the unread data
/// back to the front does not make enough room.
#[derive(Clone, Debug, Default)]
pub struct Buffer {
    buf: Vec<u8>,
    off: usize,
    end: usize,
}

impl From<Vec<u8>> for Buffer {
    fn from(buf: Vec<u8>) -> Self {
        let end = buf.len();
        Buffer { buf, off: 0, end }
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Buffer::from(data.to_vec())
    }
}

impl Buffer {
    pub fn new() -> Self {
        Buffer::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Buffer {
            buf: vec![0; capacity],
            off: 0,
            end: 0,
        }
    }

    /// The unread portion of the buffer.
    ///
    /// The slice is only valid until the next buffer modification.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.off..self.end]
    }

    /// Copy out the unread portion of the buffer.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_slice())
    }

    pub fn into_vec(mut self) -> Vec<u8> {
        self.buf.truncate(self.end);
        self.buf.drain(..self.off);
        self.buf
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.off
    }

    /// Number of bytes of the unread portion of the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.off
    }

    /// Size of the underlying allocation.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Discard all unread data while keeping the allocated storage.
    pub fn reset(&mut self) {
        self.off = 0;
        self.end = 0;
    }

    /// Discard all but the first `n` unread bytes.
    pub fn truncate(&mut self, n: usize) -> Result<(), BufferError> {
        if n == 0 {
            self.reset();
            return Ok(());
        }
        let length = self.len();
        if n > length {
            return Err(BufferError::OutOfRange {
                requested: n,
                length,
            });
        }
        self.end = self.off + n;
        Ok(())
    }

    /// Read the next `dst.len()` bytes or until the buffer is drained.
    ///
    /// Returns `None` if the buffer has no data left and `dst` is not empty.
    pub fn read_into(&mut self, dst: &mut [u8]) -> Option<usize> {
        if self.is_empty() {
            self.reset();
            if dst.is_empty() {
                return Some(0);
            }
            return None;
        }
        let n = dst.len().min(self.len());
        dst[..n].copy_from_slice(&self.buf[self.off..self.off + n]);
        self.off += n;
        Some(n)
    }

    /// Append the whole `src` to the buffer, growing it as needed.
    pub fn write_from(&mut self, src: &[u8]) -> Result<usize, BufferError> {
        self.make_room(src.len())?;
        let n = src.len();
        self.buf[self.end..self.end + n].copy_from_slice(src);
        self.end += n;
        Ok(n)
    }

    /// Make sure another `n` bytes can be written without a reallocation.
    pub fn grow(&mut self, n: usize) -> Result<(), BufferError> {
        self.make_room(n)
    }

    fn make_room(&mut self, n: usize) -> Result<(), BufferError> {
        let m = self.len();
        if m == 0 && self.off != 0 {
            self.reset();
        }
        if n <= self.buf.len() - self.end {
            return Ok(());
        }

        let c = self.capacity();
        if n <= (c / 2).saturating_sub(m) {
            // at most half of the space is in use, slide down
            self.buf.copy_within(self.off..self.end, 0);
        } else {
            match c.checked_add(n) {
                Some(total) if total <= MAX_SIZE => {}
                _ => return Err(BufferError::TooLarge),
            }
            let new_cap = c.saturating_mul(2).saturating_add(n).min(MAX_SIZE);
            trace!("buffer grown from {c} to {new_cap} bytes");
            let mut buf = vec![0u8; new_cap];
            buf[..m].copy_from_slice(&self.buf[self.off..self.end]);
            self.buf = buf;
        }
        self.off = 0;
        self.end = m;
        Ok(())
    }

    fn slide_to_front(&mut self) {
        if self.off > 0 {
            self.buf.copy_within(self.off..self.end, 0);
            self.end -= self.off;
            self.off = 0;
        }
    }

    /// Read data from `source` until the end of stream, appending it to the buffer.
    ///
    /// Returns the total bytes read. Data already read stays in the buffer if
    /// the source fails, or if it gives no data for
    /// [`MAX_CONSECUTIVE_EMPTY_READS`] reads in a row.
    pub async fn read_from<R>(&mut self, source: &mut R) -> Result<usize, BufferError>
    where
        R: AsyncSource + Unpin + ?Sized,
    {
        let mut total = 0;
        let mut empty_reads = 0;
        let mut scratch: Option<Box<[u8]>> = None;
        loop {
            let nr = if self.capacity() - self.len() < MIN_READ {
                let tmp = scratch.get_or_insert_with(|| vec![0u8; MIN_READ].into_boxed_slice());
                let Some(nr) = read_some(source, tmp).await? else {
                    return Ok(total);
                };
                self.write_from(&tmp[..nr])?;
                nr
            } else {
                if self.buf.len() - self.end < MIN_READ {
                    self.slide_to_front();
                }
                let Some(nr) = read_some(source, &mut self.buf[self.end..]).await? else {
                    return Ok(total);
                };
                self.end += nr;
                nr
            };
            if nr == 0 {
                empty_reads += 1;
                if empty_reads >= MAX_CONSECUTIVE_EMPTY_READS {
                    warn!("no data read after {empty_reads} consecutive empty reads");
                    return Err(BufferError::NoProgress(empty_reads));
                }
            } else {
                empty_reads = 0;
                total += nr;
            }
        }
    }

    /// The blocking version of [`Buffer::read_from`].
    pub fn read_from_sync<R>(&mut self, source: &mut R) -> Result<usize, BufferError>
    where
        R: io::Read + ?Sized,
    {
        let mut total = 0;
        let mut scratch: Option<Box<[u8]>> = None;
        loop {
            let nr = if self.capacity() - self.len() < MIN_READ {
                let tmp = scratch.get_or_insert_with(|| vec![0u8; MIN_READ].into_boxed_slice());
                match source.read(tmp) {
                    Ok(0) => return Ok(total),
                    Ok(nr) => {
                        self.write_from(&tmp[..nr])?;
                        nr
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            } else {
                if self.buf.len() - self.end < MIN_READ {
                    self.slide_to_front();
                }
                match source.read(&mut self.buf[self.end..]) {
                    Ok(0) => return Ok(total),
                    Ok(nr) => {
                        self.end += nr;
                        nr
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            };
            total += nr;
        }
    }
}

/// Read everything from `source` into a new vector.
pub async fn read_all<R>(source: &mut R) -> Result<Vec<u8>, BufferError>
where
    R: AsyncSource + Unpin + ?Sized,
{
    let mut buf = Buffer::new();
    buf.read_from(source).await?;
    Ok(buf.into_vec())
}

/// The blocking version of [`read_all`].
pub fn read_all_sync<R>(source: &mut R) -> Result<Vec<u8>, BufferError>
where
    R: io::Read + ?Sized,
{
    let mut buf = Buffer::new();
    buf.read_from_sync(source)?;
    Ok(buf.into_vec())
}

impl io::Read for Buffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf).unwrap_or(0))
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_from(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsyncRead for Buffer {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if let Some(nr) = me.read_into(buf.initialize_unfilled()) {
            buf.advance(nr);
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for Buffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(self.get_mut().write_from(buf).map_err(io::Error::from))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
