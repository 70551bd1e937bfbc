/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::mem;

use futures_util::stream::{self, Stream};

use crate::{AsyncSource, BufIoError, BufReader};

/// Complete text lines read from a [`BufReader`].
///
/// Lines longer than the reader window are joined back together, and the
/// line endings (`\n` or `\r\n`) are removed.
pub struct Lines<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

/// Read text lines from `source` with a default sized [`BufReader`].
pub fn read_lines<R: AsyncSource + Unpin>(source: R) -> Lines<R> {
    BufReader::new(source).lines()
}

impl<R> Lines<R> {
    pub(crate) fn new(reader: BufReader<R>) -> Self {
        Lines {
            reader,
            pending: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &BufReader<R> {
        &self.reader
    }

    /// Consumes this `Lines`, returning the reader. A partly read line is lost.
    pub fn into_inner(self) -> BufReader<R> {
        self.reader
    }
}

impl<R> Lines<R>
where
    R: AsyncSource + Unpin,
{
    /// Get the next line, or `None` at the end of stream.
    ///
    /// A line which is not valid UTF-8 is returned as
    /// [`BufIoError::InvalidUtf8`], and reading can go on with the next line.
    pub async fn next_line(&mut self) -> Result<Option<String>, BufIoError> {
        loop {
            match self.reader.read_line().await? {
                Some(l) => {
                    self.pending.extend_from_slice(l.line);
                    if !l.more {
                        break;
                    }
                }
                None if self.pending.is_empty() => return Ok(None),
                // the stream ended right after a full window
                None => break,
            }
        }

        let line = mem::take(&mut self.pending);
        let line = String::from_utf8(line).map_err(|e| e.utf8_error())?;
        Ok(Some(line))
    }

    /// Convert into a [`Stream`] of lines.
    ///
    /// The stream ends after the first error, except for invalid UTF-8 lines.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, BufIoError>> {
        stream::unfold(Some(self), |state| async move {
            let mut lines = state?;
            match lines.next_line().await {
                Ok(Some(line)) => Some((Ok(line), Some(lines))),
                Ok(None) => None,
                Err(e @ BufIoError::InvalidUtf8(_)) => Some((Err(e), Some(lines))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
