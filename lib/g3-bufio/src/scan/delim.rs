/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use futures_util::stream::{FusedStream, Map, Stream, StreamExt};
use log::warn;
use pin_project_lite::pin_project;

use crate::{
    AsyncSource, BufIoError, DelimiterMatcher, MAX_CONSECUTIVE_EMPTY_READS, MIN_DELIM_CHUNK_SIZE,
};

pin_project! {
    /// Stream of the chunks of a source separated by a multi-byte delimiter.
    ///
    /// Created by [`read_delim`]. The delimiter is not included in the chunks.
    /// At the end of stream the remaining data is yielded as the last chunk,
    /// which is empty if the source ended right after a delimiter.
    #[must_use = "streams do nothing unless polled"]
    pub struct ReadDelim<R> {
        #[pin]
        inner: R,
        matcher: DelimiterMatcher,
        chunk: BytesMut,
        // bytes of `chunk` already fed to the matcher
        scanned: usize,
        matched: usize,
        read_buf: Box<[u8]>,
        empty_reads: usize,
        done: bool,
    }
}

/// Split `source` by `delim`.
///
/// An empty `delim` is rejected with [`io::ErrorKind::InvalidInput`].
pub fn read_delim<R: AsyncSource>(source: R, delim: &[u8]) -> io::Result<ReadDelim<R>> {
    let Some(matcher) = DelimiterMatcher::new(delim) else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty delimiter"));
    };
    let read_size = MIN_DELIM_CHUNK_SIZE.max(matcher.len() + 1);
    Ok(ReadDelim {
        inner: source,
        matcher,
        chunk: BytesMut::new(),
        scanned: 0,
        matched: 0,
        read_buf: vec![0u8; read_size].into_boxed_slice(),
        empty_reads: 0,
        done: false,
    })
}

impl<R> ReadDelim<R> {
    pub fn delimiter(&self) -> &[u8] {
        self.matcher.delimiter()
    }

    /// Consumes the stream, returning the source. Data not yet yielded is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncSource + Unpin> ReadDelim<R> {
    /// Get the next chunk, or `None` if the stream has ended.
    pub async fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        self.next().await
    }
}

impl<R: AsyncSource> Stream for ReadDelim<R> {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        loop {
            while *me.scanned < me.chunk.len() {
                let b = me.chunk[*me.scanned];
                *me.scanned += 1;
                *me.matched = me.matcher.advance(b, *me.matched);
                if *me.matched == me.matcher.len() {
                    let mut token = me.chunk.split_to(*me.scanned);
                    token.truncate(*me.scanned - *me.matched);
                    *me.scanned = 0;
                    *me.matched = 0;
                    return Poll::Ready(Some(Ok(token.freeze())));
                }
            }

            if *me.done {
                return Poll::Ready(None);
            }

            match ready!(me.inner.as_mut().poll_read_some(cx, &mut me.read_buf[..])) {
                Ok(Some(0)) => {
                    *me.empty_reads += 1;
                    if *me.empty_reads >= MAX_CONSECUTIVE_EMPTY_READS {
                        warn!("no data read after {} consecutive empty reads", me.empty_reads);
                        *me.done = true;
                        me.chunk.clear();
                        *me.scanned = 0;
                        let e = BufIoError::NoProgress(*me.empty_reads);
                        return Poll::Ready(Some(Err(e.into())));
                    }
                }
                Ok(Some(nr)) => {
                    *me.empty_reads = 0;
                    me.chunk.extend_from_slice(&me.read_buf[..nr]);
                }
                Ok(None) => {
                    *me.done = true;
                    *me.scanned = 0;
                    *me.matched = 0;
                    return Poll::Ready(Some(Ok(me.chunk.split().freeze())));
                }
                Err(e) => {
                    *me.done = true;
                    me.chunk.clear();
                    *me.scanned = 0;
                    return Poll::Ready(Some(Err(e)));
                }
            }
        }
    }
}

impl<R: AsyncSource> FusedStream for ReadDelim<R> {
    fn is_terminated(&self) -> bool {
        self.done && self.chunk.is_empty()
    }
}

pub type ReadStringDelim<R> = Map<ReadDelim<R>, fn(io::Result<Bytes>) -> io::Result<String>>;

fn decode_chunk(chunk: io::Result<Bytes>) -> io::Result<String> {
    String::from_utf8(Vec::from(chunk?)).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Like [`read_delim`], with every chunk decoded as UTF-8.
///
/// A chunk which is not valid UTF-8 is yielded as an
/// [`io::ErrorKind::InvalidData`] error, and the stream goes on.
pub fn read_string_delim<R: AsyncSource>(
    source: R,
    delim: &[u8],
) -> io::Result<ReadStringDelim<R>> {
    let decode: fn(io::Result<Bytes>) -> io::Result<String> = decode_chunk;
    Ok(read_delim(source, delim)?.map(decode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use tokio_util::io::StreamReader;

    fn chunked<I, C>(chunks: I) -> impl AsyncSource + Unpin
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        let chunks = chunks
            .into_iter()
            .map(|c| io::Result::Ok(Bytes::copy_from_slice(c.as_ref())))
            .collect::<Vec<_>>();
        StreamReader::new(tokio_stream::iter(chunks))
    }

    async fn split_all<R: AsyncSource + Unpin>(source: R, delim: &[u8]) -> Vec<Bytes> {
        read_delim(source, delim).unwrap().try_collect().await.unwrap()
    }

    /// Hands out `data`, then answers every read with zero bytes.
    struct StallSource {
        data: &'static [u8],
    }

    impl AsyncSource for StallSource {
        fn poll_read_some(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut [u8],
        ) -> Poll<io::Result<Option<usize>>> {
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Poll::Ready(Ok(Some(n)))
        }
    }

    #[tokio::test]
    async fn single_byte() {
        let chunks = split_all(chunked([&b"a,b"[..], b",c"]), b",").await;
        assert_eq!(chunks, vec!["a", "b", "c"]);

        let chunks = split_all(chunked([&b"a,"[..]]), b",").await;
        assert_eq!(chunks, vec!["a", ""]);

        let chunks = split_all(chunked([&b",,"[..]]), b",").await;
        assert_eq!(chunks, vec!["", "", ""]);

        let chunks = split_all(chunked(Vec::<Vec<u8>>::new()), b",").await;
        assert_eq!(chunks, vec![""]);
    }

    #[tokio::test]
    async fn empty_delimiter() {
        let e = read_delim(chunked([b"abc"]), b"").err().unwrap();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn split_at_every_boundary() {
        let data = b"hello\r\n\r\nworld\r\n\r\n!";
        for i in 0..=data.len() {
            let (a, b) = data.split_at(i);
            let chunks = split_all(chunked([a, b]), b"\r\n\r\n").await;
            assert_eq!(chunks, vec!["hello", "world", "!"], "split at {i}");
        }
    }

    #[tokio::test]
    async fn one_byte_chunks() {
        let data = b"xx--==--yy--==--";
        let chunks = split_all(chunked(data.chunks(1)), b"--==--").await;
        assert_eq!(chunks, vec!["xx", "yy", ""]);

        // a delimiter longer than the minimal read size
        let delim = vec![b'#'; MIN_DELIM_CHUNK_SIZE + 10];
        let mut data = b"head".to_vec();
        data.extend_from_slice(&delim);
        data.extend_from_slice(b"tail");
        let chunks = split_all(chunked(data.chunks(7)), &delim).await;
        assert_eq!(chunks, vec!["head", "tail"]);
    }

    #[tokio::test]
    async fn overlapping_prefix() {
        let chunks = split_all(chunked([&b"aaab"[..]]), b"aab").await;
        assert_eq!(chunks, vec!["a", ""]);

        let chunks = split_all(chunked([&b"1aa"[..], &b"aab2aab"[..]]), b"aab").await;
        assert_eq!(chunks, vec!["1aa", "2", ""]);

        // a partial match left at the end of stream is plain data
        let chunks = split_all(chunked([&b"xyzaa"[..]]), b"aab").await;
        assert_eq!(chunks, vec!["xyzaa"]);
    }

    #[tokio::test]
    async fn reconstruct() {
        let delim = b"abcab";
        let data = b"xabcabcabyyabcababcabzzabca";
        for size in 1..=delim.len() + 2 {
            let chunks = split_all(chunked(data.chunks(size)), delim).await;
            let chunks = chunks.iter().map(|c| c.as_ref()).collect::<Vec<_>>();
            assert_eq!(chunks.join(&delim[..]), data, "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn source_error() {
        let stream = tokio_test::io::Builder::new()
            .read(b"a;b")
            .read_error(io::Error::from(io::ErrorKind::ConnectionReset))
            .build();
        let mut s = read_delim(stream, b";").unwrap();
        assert_eq!(s.next_chunk().await.unwrap().unwrap(), "a");
        let e = s.next_chunk().await.unwrap().unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::ConnectionReset);
        assert!(s.is_terminated());
        assert!(s.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn no_progress() {
        let mut s = read_delim(StallSource { data: b"" }, b";").unwrap();
        let e = s.next_chunk().await.unwrap().unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::Other);
        assert!(s.is_terminated());
        assert!(s.next_chunk().await.is_none());

        // data read before the stall is dropped with it
        let mut s = read_delim(StallSource { data: b"a;b" }, b";").unwrap();
        assert_eq!(s.next_chunk().await.unwrap().unwrap(), "a");
        assert!(s.next_chunk().await.unwrap().is_err());
        assert!(s.is_terminated());
        assert!(s.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn string_chunks() {
        let s = read_string_delim(chunked(["αβ|γ".as_bytes()]), b"|").unwrap();
        let chunks: Vec<String> = s.try_collect().await.unwrap();
        assert_eq!(chunks, vec!["αβ", "γ"]);

        let mut s = read_string_delim(chunked([&b"\xff|ok"[..]]), b"|").unwrap();
        let e = s.next().await.unwrap().unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
        assert_eq!(s.next().await.unwrap().unwrap(), "ok");
        assert!(s.next().await.is_none());
    }
}
