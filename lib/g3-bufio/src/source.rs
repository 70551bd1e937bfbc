/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, ReadBuf};

/// A byte source which is able to tell "nothing read this time" apart from
/// "end of stream".
///
/// Every [`AsyncRead`] is a source, with a zero-length read into a non-empty
/// buffer treated as the end of stream.
pub trait AsyncSource {
    /// Read some bytes into `buf`.
    ///
    /// Returns `Ok(Some(n))` with the number of bytes read, which may be zero
    /// even when `buf` is not empty, or `Ok(None)` if the stream ended.
    fn poll_read_some(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<Option<usize>>>;
}

impl<R: AsyncRead + ?Sized> AsyncSource for R {
    fn poll_read_some(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<Option<usize>>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(Some(0)));
        }
        let mut read_buf = ReadBuf::new(buf);
        ready!(self.poll_read(cx, &mut read_buf))?;
        let nr = read_buf.filled().len();
        if nr == 0 {
            Poll::Ready(Ok(None))
        } else {
            Poll::Ready(Ok(Some(nr)))
        }
    }
}

pub(crate) async fn read_some<R>(source: &mut R, buf: &mut [u8]) -> io::Result<Option<usize>>
where
    R: AsyncSource + Unpin + ?Sized,
{
    poll_fn(|cx| Pin::new(&mut *source).poll_read_some(cx, &mut *buf)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_async_read() {
        let mut stream = tokio_test::io::Builder::new().read(b"1234").build();
        let mut buf = [0u8; 8];
        let nr = read_some(&mut stream, &mut buf).await.unwrap();
        assert_eq!(nr, Some(4));
        assert_eq!(&buf[..4], b"1234");

        let nr = read_some(&mut stream, &mut buf[..0]).await.unwrap();
        assert_eq!(nr, Some(0));

        let nr = read_some(&mut stream, &mut buf).await.unwrap();
        assert_eq!(nr, None);
    }

    #[tokio::test]
    async fn read_error() {
        let mut stream = tokio_test::io::Builder::new()
            .read_error(io::Error::from(io::ErrorKind::ConnectionReset))
            .build();
        let mut buf = [0u8; 8];
        let e = read_some(&mut stream, &mut buf).await.unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::ConnectionReset);
    }
}
