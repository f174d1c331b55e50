//! Closable wrapper for the session's socket and bet file.
//!
//! A [`Closable`] owns its resource until either the session closes it or
//! its cancellation token fires. Every read and write also polls the token,
//! so a task parked in I/O is woken when shutdown starts; the wrapper then
//! drops the resource and fails the pending call with
//! [`io::ErrorKind::ConnectionAborted`]. Dropping happens at most once.
//!
//! Firing the token does not drop the resource by itself. The drop happens
//! on the owner's next poll of the wrapper, which is immediate for a task
//! parked in I/O; otherwise the owner's own `close` releases it.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// A socket or file that can be closed once, from either the owning task or
/// a cancellation token.
pub struct Closable<S> {
    inner: Option<S>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    name: &'static str,
}

impl<S> Closable<S> {
    /// Wraps `inner`; cancelling `token` closes it.
    pub fn new(inner: S, token: CancellationToken, name: &'static str) -> Self {
        Self {
            inner: Some(inner),
            cancelled: Box::pin(token.cancelled_owned()),
            name,
        }
    }

    /// Returns whether the resource is still open.
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Checks the token before an I/O poll. Registers the waker when the
    /// token has not fired yet.
    fn poll_open(&mut self, cx: &mut Context<'_>) -> Result<&mut S, io::Error> {
        if self.inner.is_some() && self.cancelled.as_mut().poll(cx).is_ready() {
            tracing::debug!(resource = self.name, "closing on shutdown");
            self.inner = None;
        }
        let name = self.name;
        self.inner.as_mut().ok_or_else(|| closed_error(name))
    }
}

fn closed_error(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::ConnectionAborted,
        format!("{} closed by shutdown", name),
    )
}

impl<S: AsyncWrite + Unpin> Closable<S> {
    /// Shuts the resource down and drops it.
    ///
    /// Returns `true` if this call closed it, `false` if it was already
    /// closed. Shutdown errors are logged and otherwise ignored.
    pub async fn close(&mut self) -> bool {
        match self.inner.take() {
            Some(mut inner) => {
                if let Err(e) = inner.shutdown().await {
                    tracing::debug!(resource = self.name, error = %e, "shutdown failed");
                }
                tracing::debug!(resource = self.name, "closed");
                true
            }
            None => false,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Closable<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().poll_open(cx) {
            Ok(inner) => Pin::new(inner).poll_read(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Closable<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut().poll_open(cx) {
            Ok(inner) => Pin::new(inner).poll_write(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().poll_open(cx) {
            Ok(inner) => Pin::new(inner).poll_flush(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().inner.as_mut() {
            Some(inner) => Pin::new(inner).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}
