/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::num::NonZeroUsize;

#[cfg(feature = "yaml")]
mod yaml;

/// Default window size of buffered readers and writers.
pub const DEFAULT_BUF_SIZE: usize = 4096;

/// Smallest window a [`BufReader`](crate::BufReader) will be created with.
pub const MIN_BUF_SIZE: usize = 16;

/// How many `Some(0)` answers a source may give in a row before a fill gives up.
pub const MAX_CONSECUTIVE_EMPTY_READS: usize = 100;

/// Minimal read size used by [`Buffer::read_from`](crate::Buffer::read_from).
pub const MIN_READ: usize = 32 * 1024;

/// Hard limit of a [`Buffer`](crate::Buffer) allocation, 2^32 - 2.
pub const MAX_SIZE: usize = u32::MAX as usize - 1;

/// Smallest read size of the delimiter scanner.
pub const MIN_DELIM_CHUNK_SIZE: usize = 1024;

const DEFAULT_MAX_EMPTY_READS: NonZeroUsize = NonZeroUsize::new(MAX_CONSECUTIVE_EMPTY_READS)
    .expect("MAX_CONSECUTIVE_EMPTY_READS should not be zero");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufReaderConfig {
    buffer_size: usize,
    max_empty_reads: NonZeroUsize,
}

impl Default for BufReaderConfig {
    fn default() -> Self {
        BufReaderConfig {
            buffer_size: DEFAULT_BUF_SIZE,
            max_empty_reads: DEFAULT_MAX_EMPTY_READS,
        }
    }
}

impl BufReaderConfig {
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let mut config = BufReaderConfig::default();
        config.set_buffer_size(buffer_size);
        config
    }

    pub fn set_buffer_size(&mut self, size: usize) {
        self.buffer_size = size;
    }

    pub fn set_max_empty_reads(&mut self, count: NonZeroUsize) {
        self.max_empty_reads = count;
    }

    /// The window size, never less than [`MIN_BUF_SIZE`].
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size.max(MIN_BUF_SIZE)
    }

    #[inline]
    pub fn max_empty_reads(&self) -> NonZeroUsize {
        self.max_empty_reads
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufWriterConfig {
    buffer_size: usize,
}

impl Default for BufWriterConfig {
    fn default() -> Self {
        BufWriterConfig {
            buffer_size: DEFAULT_BUF_SIZE,
        }
    }
}

impl BufWriterConfig {
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        BufWriterConfig { buffer_size }
    }

    pub fn set_buffer_size(&mut self, size: usize) {
        self.buffer_size = size;
    }

    /// The window size, a zero size falls back to [`DEFAULT_BUF_SIZE`].
    #[inline]
    pub fn buffer_size(&self) -> usize {
        if self.buffer_size == 0 {
            DEFAULT_BUF_SIZE
        } else {
            self.buffer_size
        }
    }
}
