/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::mem;

use super::WriteWindow;
use crate::{BufWriterConfig, WriteError};

/// Blocking version of [`BufWriter`](crate::BufWriter) over a [`Write`] sink.
pub struct BufWriterSync<W> {
    inner: W,
    window: WriteWindow,
}

impl<W> BufWriterSync<W> {
    pub fn new(inner: W) -> Self {
        BufWriterSync::with_config(&BufWriterConfig::default(), inner)
    }

    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        BufWriterSync::with_config(&BufWriterConfig::with_buffer_size(capacity), inner)
    }

    pub fn with_config(config: &BufWriterConfig, inner: W) -> Self {
        BufWriterSync {
            inner,
            window: WriteWindow::new(config.buffer_size()),
        }
    }

    pub fn size(&self) -> usize {
        self.window.size()
    }

    pub fn available(&self) -> usize {
        self.window.available()
    }

    pub fn buffered(&self) -> usize {
        self.window.buffered()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Data not yet flushed is lost.
    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn reset(&mut self, inner: W) -> W {
        self.window.reset();
        mem::replace(&mut self.inner, inner)
    }
}

impl<W: Write> BufWriterSync<W> {
    fn sink_write(inner: &mut W, data: &[u8]) -> io::Result<usize> {
        loop {
            match inner.write(data) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn flush_window(&mut self) -> Result<(), WriteError> {
        self.window.check()?;
        let mut written = 0;
        while written < self.window.buffered() {
            match Self::sink_write(&mut self.inner, &self.window.pending()[written..]) {
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
    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.flush_window()?;
        self.inner.flush().map_err(|e| self.window.record(e))
    }

    /// Write all of `data`, flushing the window whenever it is full.
    pub fn write(&mut self, mut data: &[u8]) -> Result<usize, WriteError> {
        self.window.check()?;
        if data.is_empty() {
            return Ok(0);
        }

        let mut total = 0;
        while data.len() > self.window.available() {
            let n = if self.window.buffered() == 0 {
                Self::sink_write(&mut self.inner, data).map_err(|e| self.window.record(e))?
            } else {
                let n = self.window.copy_in(data);
                self.flush_window()?;
                n
            };
            total += n;
            data = &data[n..];
        }
        total += self.window.copy_in(data);
        Ok(total)
    }
}
