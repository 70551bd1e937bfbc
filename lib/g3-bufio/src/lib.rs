/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod buffer;
mod config;
mod error;
mod matcher;
mod reader;
mod scan;
mod source;
mod writer;

pub use buffer::{Buffer, read_all, read_all_sync};
pub use config::{
    BufReaderConfig, BufWriterConfig, DEFAULT_BUF_SIZE, MAX_CONSECUTIVE_EMPTY_READS, MAX_SIZE,
    MIN_BUF_SIZE, MIN_DELIM_CHUNK_SIZE, MIN_READ,
};
pub use error::{BufIoError, BufferError, WriteError};
pub use matcher::DelimiterMatcher;
pub use reader::{BufReader, ReadLine};
pub use scan::*;
pub use source::AsyncSource;
pub use writer::{BufWriter, BufWriterSync};
