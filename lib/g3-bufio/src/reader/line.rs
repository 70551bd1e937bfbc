/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use bytes::Bytes;
use log::debug;

use super::BufReader;
use crate::{AsyncSource, BufIoError, Lines};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// A line returned by [`BufReader::read_line`].
#[derive(Debug, PartialEq, Eq)]
pub struct ReadLine<'a> {
    /// Line content without the trailing `\n` or `\r\n`.
    pub line: &'a [u8],
    /// Set if the line did not fit into the window, the rest of it will be
    /// returned by the following calls.
    pub more: bool,
}

enum SliceScan {
    Found { start: usize, end: usize },
    Full { start: usize, end: usize },
    Exhausted,
}

impl<R> BufReader<R>
where
    R: AsyncSource + Unpin,
{
    async fn scan_slice(&mut self, delim: u8) -> Result<SliceScan, BufIoError> {
        // bytes before `self.r + searched` are known to contain no delim
        let mut searched = 0;
        loop {
            if let Some(p) = memchr::memchr(delim, &self.buf[self.r + searched..self.w]) {
                let start = self.r;
                self.r += searched + p + 1;
                return Ok(SliceScan::Found { start, end: self.r });
            }

            if self.eof {
                if self.r == self.w {
                    return Ok(SliceScan::Exhausted);
                }
                let start = self.r;
                self.r = self.w;
                return Ok(SliceScan::Found { start, end: self.w });
            }

            if self.buffered() >= self.buf.len() {
                debug!("no delimiter found in a full {} bytes window", self.buf.len());
                let start = self.r;
                self.r = self.w;
                return Ok(SliceScan::Full { start, end: self.w });
            }

            searched = self.w - self.r;
            self.fill().await?;
        }
    }

    /// Read until the first occurrence of `delim`, returning the data up to
    /// and including the delimiter.
    ///
    /// The end of stream acts as a delimiter, so the last slice may not end
    /// with `delim`. If the window fills up first, the window content is
    /// consumed and returned within [`BufIoError::BufferFull`].
    pub async fn read_slice(&mut self, delim: u8) -> Result<Option<&[u8]>, BufIoError> {
        match self.scan_slice(delim).await? {
            SliceScan::Found { start, end } => Ok(Some(&self.buf[start..end])),
            SliceScan::Full { start, end } => Err(BufIoError::BufferFull {
                partial: Bytes::copy_from_slice(&self.buf[start..end]),
            }),
            SliceScan::Exhausted => Ok(None),
        }
    }

    /// Read a line, which ends with `\n` or `\r\n`.
    ///
    /// A line longer than the window is returned in pieces with `more` set on
    /// all but the last one. A `\r` without the following `\n` is kept.
    pub async fn read_line(&mut self) -> Result<Option<ReadLine<'_>>, BufIoError> {
        let (start, mut end) = match self.scan_slice(LF).await? {
            SliceScan::Found { start, end } => (start, end),
            SliceScan::Full { start, end } => {
                let mut end = end;
                // keep a trailing CR for the next call, as it may be followed
                // by LF in the next window
                if !self.eof && end > start && self.buf[end - 1] == CR {
                    self.r -= 1;
                    end -= 1;
                }
                return Ok(Some(ReadLine {
                    line: &self.buf[start..end],
                    more: !self.eof,
                }));
            }
            SliceScan::Exhausted => return Ok(None),
        };

        if end > start && self.buf[end - 1] == LF {
            end -= 1;
            if end > start && self.buf[end - 1] == CR {
                end -= 1;
            }
        }
        Ok(Some(ReadLine {
            line: &self.buf[start..end],
            more: false,
        }))
    }

    /// Like [`read_slice`](Self::read_slice), with the result decoded as UTF-8.
    pub async fn read_string(&mut self, delim: u8) -> Result<Option<String>, BufIoError> {
        match self.read_slice(delim).await? {
            Some(s) => Ok(Some(std::str::from_utf8(s)?.to_string())),
            None => Ok(None),
        }
    }

    pub fn lines(self) -> Lines<R> {
        Lines::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio_util::io::StreamReader;

    fn chunked(chunks: &[&'static [u8]]) -> impl AsyncSource + Unpin + use<> {
        let chunks = chunks
            .iter()
            .map(|c| io::Result::Ok(Bytes::from_static(c)))
            .collect::<Vec<_>>();
        StreamReader::new(tokio_stream::iter(chunks))
    }

    async fn all_lines<R: AsyncSource + Unpin>(r: &mut BufReader<R>) -> Vec<(Vec<u8>, bool)> {
        let mut lines = Vec::new();
        while let Some(l) = r.read_line().await.unwrap() {
            lines.push((l.line.to_vec(), l.more));
        }
        lines
    }

    #[tokio::test]
    async fn read_slice() {
        let mut r = BufReader::with_capacity(16, chunked(&[b"ab,c", b"d,", b"ef"]));
        assert_eq!(r.read_slice(b',').await.unwrap(), Some(&b"ab,"[..]));
        assert_eq!(r.read_slice(b',').await.unwrap(), Some(&b"cd,"[..]));
        assert_eq!(r.read_slice(b',').await.unwrap(), Some(&b"ef"[..]));
        assert_eq!(r.read_slice(b',').await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_slice_full() {
        let mut r = BufReader::with_capacity(16, chunked(&[b"0123456789", b"abcdefgh,xy"]));
        let e = r.read_slice(b',').await.unwrap_err();
        match e {
            BufIoError::BufferFull { partial } => {
                assert_eq!(partial.as_ref(), b"0123456789abcdef")
            }
            e => panic!("unexpected error {e}"),
        }
        assert_eq!(r.read_slice(b',').await.unwrap(), Some(&b"gh,"[..]));
        assert_eq!(r.read_slice(b',').await.unwrap(), Some(&b"xy"[..]));
    }

    #[tokio::test]
    async fn read_string() {
        let mut r = BufReader::with_capacity(16, chunked(&["héllo wörld".as_bytes()]));
        assert_eq!(
            r.read_string(b' ').await.unwrap().as_deref(),
            Some("héllo ")
        );
        assert_eq!(r.read_string(b' ').await.unwrap().as_deref(), Some("wörld"));
        assert_eq!(r.read_string(b' ').await.unwrap(), None);

        let mut r = BufReader::with_capacity(16, chunked(&[b"\xff\xfe\n"]));
        assert!(matches!(
            r.read_string(b'\n').await,
            Err(BufIoError::InvalidUtf8(_))
        ));
    }

    #[tokio::test]
    async fn line_endings() {
        let mut r = BufReader::new(chunked(&[b"a\r\n"]));
        assert_eq!(all_lines(&mut r).await, vec![(b"a".to_vec(), false)]);

        let mut r = BufReader::new(chunked(&[b"a\n"]));
        assert_eq!(all_lines(&mut r).await, vec![(b"a".to_vec(), false)]);

        let mut r = BufReader::new(chunked(&[b"a\r"]));
        assert_eq!(all_lines(&mut r).await, vec![(b"a\r".to_vec(), false)]);

        let mut r = BufReader::new(chunked(&[b""]));
        assert!(all_lines(&mut r).await.is_empty());

        let mut r = BufReader::new(chunked(&[b"\n"]));
        assert_eq!(all_lines(&mut r).await, vec![(Vec::new(), false)]);

        let mut r = BufReader::new(chunked(&[b"a\r", b"\nb\n\r\nc"]));
        assert_eq!(
            all_lines(&mut r).await,
            vec![
                (b"a".to_vec(), false),
                (b"b".to_vec(), false),
                (Vec::new(), false),
                (b"c".to_vec(), false),
            ]
        );
    }

    #[tokio::test]
    async fn long_line() {
        let mut r = BufReader::with_capacity(16, chunked(&[b"0123456789abcdefghij\nk"]));
        let l = r.read_line().await.unwrap().unwrap();
        assert_eq!(l.line, b"0123456789abcdef");
        assert!(l.more);
        let l = r.read_line().await.unwrap().unwrap();
        assert_eq!(l.line, b"ghij");
        assert!(!l.more);
        let l = r.read_line().await.unwrap().unwrap();
        assert_eq!(l.line, b"k");
        assert!(!l.more);
        assert!(r.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn long_line_total() {
        let line = [b'x'; 50];
        let mut data = line.to_vec();
        data.extend_from_slice(b"\r\n");
        let data: &'static [u8] = Vec::leak(data);
        let mut r = BufReader::with_capacity(16, chunked(&[data]));

        let lines = all_lines(&mut r).await;
        let total: usize = lines.iter().map(|(l, _)| l.len()).sum();
        assert_eq!(total, line.len());
        assert!(lines.iter().all(|(l, _)| l.len() <= 16));
        assert!(!lines.last().unwrap().1);
        assert!(lines[..lines.len() - 1].iter().all(|(_, more)| *more));
    }

    #[tokio::test]
    async fn crlf_across_window() {
        // the CR is the last byte of a full window
        let mut r = BufReader::with_capacity(16, chunked(&[b"0123456789abcde\r\nnext\n"]));
        let l = r.read_line().await.unwrap().unwrap();
        assert_eq!(l.line, b"0123456789abcde");
        assert!(l.more);
        let l = r.read_line().await.unwrap().unwrap();
        assert_eq!(l.line, b"");
        assert!(!l.more);
        let l = r.read_line().await.unwrap().unwrap();
        assert_eq!(l.line, b"next");
        assert!(!l.more);
    }
}
