/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::MAX_SIZE;

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("the buffer cannot be grown beyond the maximum size {}", MAX_SIZE)]
    TooLarge,
    #[error("truncation out of range: {requested} > {length}")]
    OutOfRange { requested: usize, length: usize },
    #[error("no progress after {0} consecutive empty reads")]
    NoProgress(usize),
    #[error("io error: {0:?}")]
    Io(#[from] io::Error),
}

impl From<BufferError> for io::Error {
    fn from(e: BufferError) -> Self {
        match e {
            BufferError::Io(e) => e,
            BufferError::TooLarge => io::Error::new(io::ErrorKind::OutOfMemory, e),
            BufferError::OutOfRange { .. } => io::Error::new(io::ErrorKind::InvalidInput, e),
            BufferError::NoProgress(_) => io::Error::other(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum BufIoError {
    #[error("io error: {0:?}")]
    Io(#[from] io::Error),
    /// The reader window filled up before the delimiter or the requested
    /// amount was found. `partial` holds the undelivered window contents.
    #[error("buffer full with {} bytes", .partial.len())]
    BufferFull { partial: Bytes },
    /// The source ended after only `partial` was read.
    #[error("unexpected eof after {} bytes", .partial.len())]
    PartialRead { partial: Bytes },
    #[error("no progress after {0} consecutive empty reads")]
    NoProgress(usize),
    #[error("invalid utf-8 encoding: {0}")]
    InvalidUtf8(#[from] Utf8Error),
}

impl BufIoError {
    /// The bytes carried by a `BufferFull` or `PartialRead` error.
    pub fn partial(&self) -> Option<&Bytes> {
        match self {
            BufIoError::BufferFull { partial } | BufIoError::PartialRead { partial } => {
                Some(partial)
            }
            _ => None,
        }
    }
}

impl From<BufIoError> for io::Error {
    fn from(e: BufIoError) -> Self {
        match e {
            BufIoError::Io(e) => e,
            BufIoError::PartialRead { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, e),
            BufIoError::InvalidUtf8(_) => io::Error::new(io::ErrorKind::InvalidData, e),
            BufIoError::BufferFull { .. } | BufIoError::NoProgress(_) => io::Error::other(e),
        }
    }
}

/// The first sink failure of a buffered writer.
///
/// It is kept by the writer and handed out again on every later call, so all
/// the clones share the same underlying [`io::Error`].
#[derive(Clone, Debug, Error)]
#[error("sink write failed: {0}")]
pub struct WriteError(Arc<io::Error>);

impl WriteError {
    pub fn kind(&self) -> io::ErrorKind {
        self.0.kind()
    }

    pub fn get_ref(&self) -> &io::Error {
        &self.0
    }

    /// Check if both errors come from the same sink failure.
    pub fn same_as(&self, other: &WriteError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<io::Error> for WriteError {
    fn from(e: io::Error) -> Self {
        WriteError(Arc::new(e))
    }
}

impl From<WriteError> for io::Error {
    fn from(e: WriteError) -> Self {
        io::Error::new(e.kind(), e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_clone() {
        let e = WriteError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        let e2 = e.clone();
        assert!(e.same_as(&e2));
        assert_eq!(e2.kind(), io::ErrorKind::BrokenPipe);

        let other = WriteError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(!e.same_as(&other));

        let io_err = io::Error::from(e2);
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn partial_payload() {
        let e = BufIoError::BufferFull {
            partial: Bytes::from_static(b"abc"),
        };
        assert_eq!(e.partial().unwrap().as_ref(), b"abc");
        assert_eq!(e.to_string(), "buffer full with 3 bytes");

        let e = BufIoError::NoProgress(100);
        assert!(e.partial().is_none());

        let e = BufIoError::PartialRead {
            partial: Bytes::from_static(b"ab"),
        };
        let io_err = io::Error::from(e);
        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
