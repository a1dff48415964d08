/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

const DEFAULT_BUFFER_SIZE: usize = 32 * 1024; // 32KB
const MINIMAL_BUFFER_SIZE: usize = 4 * 1024; // 4KB
const DEFAULT_YIELD_SIZE: usize = 1024 * 1024; // 1MB
const MINIMAL_YIELD_SIZE: usize = 256 * 1024; // 256KB

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StreamCopyConfig {
    buffer_size: usize,
    yield_size: usize,
}

impl Default for StreamCopyConfig {
    fn default() -> Self {
        StreamCopyConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
            yield_size: DEFAULT_YIELD_SIZE,
        }
    }
}

impl StreamCopyConfig {
    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size.max(MINIMAL_BUFFER_SIZE);
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn set_yield_size(&mut self, yield_size: usize) {
        self.yield_size = yield_size.max(MINIMAL_YIELD_SIZE);
    }

    #[inline]
    pub fn yield_size(&self) -> usize {
        self.yield_size
    }
}

#[derive(Error, Debug)]
pub enum StreamCopyError {
    #[error("read failed: {0:?}")]
    ReadFailed(io::Error),
    #[error("write failed: {0:?}")]
    WriteFailed(io::Error),
}

#[derive(Debug)]
struct CopyBuffer {
    buf: Box<[u8]>,
    yield_size: usize,
    r_off: usize,
    w_off: usize,
    read_done: bool,
    need_flush: bool,
    active: bool,
    total: u64,
}

impl CopyBuffer {
    fn new(config: &StreamCopyConfig) -> Self {
        CopyBuffer {
            buf: vec![0; config.buffer_size].into_boxed_slice(),
            yield_size: config.yield_size,
            r_off: 0,
            w_off: 0,
            read_done: false,
            need_flush: false,
            active: false,
            total: 0,
        }
    }

    fn poll_fill<R>(&mut self, cx: &mut Context<'_>, reader: Pin<&mut R>) -> Poll<io::Result<()>>
    where
        R: AsyncRead + ?Sized,
    {
        let mut buf = ReadBuf::new(&mut self.buf);
        buf.set_filled(self.r_off);

        let res = reader.poll_read(cx, &mut buf);
        if let Poll::Ready(Ok(_)) = res {
            let filled = buf.filled().len();
            if filled == self.r_off {
                self.read_done = true;
            } else {
                self.r_off = filled;
                self.active = true;
            }
        }
        res
    }

    fn poll_drain<W>(
        &mut self,
        cx: &mut Context<'_>,
        writer: Pin<&mut W>,
    ) -> Poll<Result<usize, StreamCopyError>>
    where
        W: AsyncWrite + ?Sized,
    {
        match writer.poll_write(cx, &self.buf[self.w_off..self.r_off]) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => Poll::Ready(Err(StreamCopyError::WriteFailed(e))),
            Poll::Ready(Ok(0)) => Poll::Ready(Err(StreamCopyError::WriteFailed(io::Error::new(
                io::ErrorKind::WriteZero,
                "write zero byte into writer",
            )))),
            Poll::Ready(Ok(n)) => {
                self.w_off += n;
                self.total += n as u64;
                self.need_flush = true;
                self.active = true;
                Poll::Ready(Ok(n))
            }
        }
    }

    fn poll_copy<R, W>(
        &mut self,
        cx: &mut Context<'_>,
        mut reader: Pin<&mut R>,
        mut writer: Pin<&mut W>,
    ) -> Poll<Result<u64, StreamCopyError>>
    where
        R: AsyncRead + ?Sized,
        W: AsyncWrite + ?Sized,
    {
        let mut copy_this_round = 0usize;
        loop {
            if !self.read_done {
                if self.w_off == self.r_off {
                    // empty, reset
                    self.w_off = 0;
                    self.r_off = 0;
                } else if self.w_off > 0 && self.r_off == self.buf.len() {
                    // a full buffer with a written head, compact so the
                    // tail can keep filling while the writer is slow
                    self.buf.copy_within(self.w_off..self.r_off, 0);
                    self.r_off -= self.w_off;
                    self.w_off = 0;
                }

                if self.r_off < self.buf.len() {
                    match self.poll_fill(cx, reader.as_mut()) {
                        Poll::Ready(Ok(_)) => {}
                        Poll::Ready(Err(e)) => {
                            return Poll::Ready(Err(StreamCopyError::ReadFailed(e)));
                        }
                        Poll::Pending => {
                            if self.w_off >= self.r_off {
                                // no data to write
                                if self.need_flush {
                                    ready!(writer.as_mut().poll_flush(cx))
                                        .map_err(StreamCopyError::WriteFailed)?;
                                    self.need_flush = false;
                                }
                                return Poll::Pending;
                            }
                        }
                    }
                }
            }

            // drain everything buffered before the next fill, a short
            // write is simply retried with the remainder
            while self.w_off < self.r_off {
                let n = ready!(self.poll_drain(cx, writer.as_mut()))?;
                copy_this_round += n;
            }

            // yield if this poll has copied a lot already
            if copy_this_round >= self.yield_size {
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }

            if self.read_done && self.w_off == self.r_off {
                if self.need_flush {
                    ready!(writer.as_mut().poll_flush(cx)).map_err(StreamCopyError::WriteFailed)?;
                    self.need_flush = false;
                }
                return Poll::Ready(Ok(self.total));
            }
        }
    }

    async fn write_flush<W>(&mut self, writer: &mut W) -> Result<(), StreamCopyError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if self.w_off < self.r_off {
            writer
                .write_all(&self.buf[self.w_off..self.r_off])
                .await
                .map_err(StreamCopyError::WriteFailed)?;
            self.total += (self.r_off - self.w_off) as u64;
            self.w_off = self.r_off;
            writer
                .flush()
                .await
                .map_err(StreamCopyError::WriteFailed)?;
            self.need_flush = false;
        }
        Ok(())
    }
}

/// A unidirectional buffered copy between a reader and a writer.
///
/// The future resolves with the total byte count once the reader reaches
/// EOF and the buffer has drained. Activity tracking lets the owner run
/// an idle watchdog beside it: [`StreamCopy::is_idle`] reports whether
/// any fill or drain made progress since the last
/// [`StreamCopy::reset_active`].
#[derive(Debug)]
pub struct StreamCopy<'a, R: ?Sized, W: ?Sized> {
    reader: &'a mut R,
    writer: &'a mut W,
    buf: CopyBuffer,
}

impl<'a, R, W> StreamCopy<'a, R, W>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    pub fn new(reader: &'a mut R, writer: &'a mut W, config: &StreamCopyConfig) -> Self {
        StreamCopy {
            reader,
            writer,
            buf: CopyBuffer::new(config),
        }
    }

    #[inline]
    pub fn no_cached_data(&self) -> bool {
        self.buf.r_off == self.buf.w_off
    }

    #[inline]
    pub fn finished(&self) -> bool {
        self.buf.read_done && self.no_cached_data()
    }

    #[inline]
    pub fn copied_size(&self) -> u64 {
        self.buf.total
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.buf.active
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.buf.active
    }

    #[inline]
    pub fn reset_active(&mut self) {
        self.buf.active = false;
    }

    /// Push out whatever is still buffered. Used when the opposite
    /// direction ended and this one will be torn down.
    pub async fn write_flush(&mut self) -> Result<(), StreamCopyError> {
        self.buf.write_flush(&mut self.writer).await
    }
}

impl<R, W> Future for StreamCopy<'_, R, W>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    type Output = Result<u64, StreamCopyError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<u64, StreamCopyError>> {
        let me = &mut *self;

        me.buf
            .poll_copy(cx, Pin::new(&mut *me.reader), Pin::new(&mut *me.writer))
    }
}
