/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use log::debug;

use crate::WriteError;

mod async_writer;
pub use async_writer::BufWriter;

mod sync_writer;
pub use sync_writer::BufWriterSync;

/// The window shared by both writers, together with the sticky error.
struct WriteWindow {
    buf: Box<[u8]>,
    used: usize,
    err: Option<WriteError>,
}

impl WriteWindow {
    fn new(size: usize) -> Self {
        WriteWindow {
            buf: vec![0u8; size].into_boxed_slice(),
            used: 0,
            err: None,
        }
    }

    #[inline]
    fn size(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn available(&self) -> usize {
        self.buf.len() - self.used
    }

    #[inline]
    fn buffered(&self) -> usize {
        self.used
    }

    #[inline]
    fn pending(&self) -> &[u8] {
        &self.buf[..self.used]
    }

    fn check(&self) -> Result<(), WriteError> {
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Copy as much of `data` as fits, returning the copied size.
    fn copy_in(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.available());
        self.buf[self.used..self.used + n].copy_from_slice(&data[..n]);
        self.used += n;
        n
    }

    fn clear(&mut self) {
        self.used = 0;
    }

    fn record(&mut self, e: io::Error) -> WriteError {
        debug!("buffered writer stopped after sink error: {e}");
        let e = WriteError::from(e);
        self.err = Some(e.clone());
        e
    }

    fn reset(&mut self) {
        self.used = 0;
        self.err = None;
    }
}
