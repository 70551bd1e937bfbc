/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::num::NonZeroUsize;

use anyhow::{Context, anyhow};
use humanize_rs::bytes::Bytes;
use yaml_rust::Yaml;

use super::{BufReaderConfig, BufWriterConfig};

enum ConfigKey {
    BufferSize,
    MaxEmptyReads,
}

/// Keys are case insensitive, and `-` may be used in place of `_`.
fn parse_key(k: &Yaml) -> anyhow::Result<ConfigKey> {
    let Yaml::String(raw) = k else {
        return Err(anyhow!("config key should be a string"));
    };
    match raw.to_lowercase().replace('-', "_").as_str() {
        "buffer_size" | "buf_size" => Ok(ConfigKey::BufferSize),
        "max_empty_reads" | "max_consecutive_empty_reads" => Ok(ConfigKey::MaxEmptyReads),
        _ => Err(anyhow!("invalid key {raw}")),
    }
}

/// A byte size, either an integer or a humanized string like `8KiB`.
fn parse_size(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(s) => {
            let size = s.parse::<Bytes>().context(format!("invalid size string {s}"))?;
            Ok(size.size())
        }
        Yaml::Integer(i) => usize::try_from(*i).context(format!("invalid size value {i}")),
        _ => Err(anyhow!("buffer size should be an integer or a string")),
    }
}

fn parse_empty_reads(v: &Yaml) -> anyhow::Result<NonZeroUsize> {
    let count = match v {
        Yaml::String(s) => s.parse::<usize>()?,
        Yaml::Integer(i) => usize::try_from(*i)?,
        _ => return Err(anyhow!("empty read count should be an integer")),
    };
    NonZeroUsize::new(count).ok_or_else(|| anyhow!("empty read count should not be zero"))
}

impl BufReaderConfig {
    /// Parse from a map, or from a bare buffer size.
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = v else {
            let size = parse_size(v).context("invalid buf reader config")?;
            return Ok(BufReaderConfig::with_buffer_size(size));
        };

        let mut config = BufReaderConfig::default();
        for (k, v) in map {
            match parse_key(k)? {
                ConfigKey::BufferSize => {
                    let size = parse_size(v).context("invalid value for buffer_size")?;
                    config.set_buffer_size(size);
                }
                ConfigKey::MaxEmptyReads => {
                    let count = parse_empty_reads(v).context("invalid value for max_empty_reads")?;
                    config.set_max_empty_reads(count);
                }
            }
        }
        Ok(config)
    }
}

impl BufWriterConfig {
    /// Parse from a map, or from a bare buffer size.
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = v else {
            let size = parse_size(v).context("invalid buf writer config")?;
            return Ok(BufWriterConfig::with_buffer_size(size));
        };

        let mut config = BufWriterConfig::default();
        for (k, v) in map {
            match parse_key(k)? {
                ConfigKey::BufferSize => {
                    let size = parse_size(v).context("invalid value for buffer_size")?;
                    config.set_buffer_size(size);
                }
                ConfigKey::MaxEmptyReads => {
                    return Err(anyhow!("max_empty_reads is not a writer setting"));
                }
            }
        }
        Ok(config)
    }
}
