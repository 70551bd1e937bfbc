/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::mem;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::WriteWindow;
use crate::{BufWriterConfig, WriteError};

/// Write-behind buffering over an [`AsyncWrite`] sink.
///
/// After the first sink failure every call returns that same error until
/// [`reset`](Self::reset) is called. Buffered data is lost if the writer is
/// dropped without a [`flush`](Self::flush).
pub struct BufWriter<W> {
    inner: W,
    window: WriteWindow,
}

impl<W> BufWriter<W> {
    pub fn new(inner: W) -> Self {
        BufWriter::with_config(&BufWriterConfig::default(), inner)
    }

    /// Creates a new `BufWriter` with the specified window size. A zero size
    /// means the default size.
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        BufWriter::with_config(&BufWriterConfig::with_buffer_size(capacity), inner)
    }

    pub fn with_config(config: &BufWriterConfig, inner: W) -> Self {
        BufWriter {
            inner,
            window: WriteWindow::new(config.buffer_size()),
        }
    }

    /// Size of the window in bytes.
    pub fn size(&self) -> usize {
        self.window.size()
    }

    /// Number of bytes that can still be put into the window.
    pub fn available(&self) -> usize {
        self.window.available()
    }

    /// Number of bytes written into the window but not yet to the sink.
    pub fn buffered(&self) -> usize {
        self.window.buffered()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consumes this `BufWriter`, returning the underlying sink.
    ///
    /// Data not yet flushed is lost.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Discard buffered data and the recorded error, and switch to a new sink.
    /// The old sink is returned.
    pub fn reset(&mut self, inner: W) -> W {
        self.window.reset();
        mem::replace(&mut self.inner, inner)
    }
}

impl<W> BufWriter<W>
where
    W: AsyncWrite + Unpin,
{
    async fn sink_write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        match self.inner.write(data).await {
            Ok(0) => Err(self.window.record(io::ErrorKind::WriteZero.into())),
            Ok(n) => Ok(n),
            Err(e) => Err(self.window.record(e)),
        }
    }

    /// Write the window content out to the sink.
    async fn flush_window(&mut self) -> Result<(), WriteError> {
        self.window.check()?;
        let mut written = 0;
        while written < self.window.buffered() {
            let r = self.inner.write(&self.window.pending()[written..]).await;
            match r {
                Ok(0) => return Err(self.window.record(io::ErrorKind::WriteZero.into())),
                Ok(n) => written += n,
                Err(e) => return Err(self.window.record(e)),
            }
        }
        self.window.clear();
        Ok(())
    }

    /// Write all buffered data to the sink and flush the sink.
    ///
    /// The sink is flushed even with an empty window, as large writes may have
    /// gone to it directly.
    pub async fn flush(&mut self) -> Result<(), WriteError> {
        self.flush_window().await?;
        if let Err(e) = self.inner.flush().await {
            return Err(self.window.record(e));
        }
        Ok(())
    }

    /// Write all of `data`, flushing the window whenever it is full.
    ///
    /// Data larger than the window is written to the sink directly if there
    /// is nothing buffered.
    pub async fn write(&mut self, mut data: &[u8]) -> Result<usize, WriteError> {
        self.window.check()?;
        if data.is_empty() {
            return Ok(0);
        }

        let mut total = 0;
        while data.len() > self.window.available() {
            let n = if self.window.buffered() == 0 {
                self.sink_write(data).await?
            } else {
                let n = self.window.copy_in(data);
                self.flush_window().await?;
                n
            };
            total += n;
            data = &data[n..];
        }
        total += self.window.copy_in(data);
        Ok(total)
    }
}
