//! Client sockets and per-operation I/O timeouts.

use crate::base::neterror::TimeoutPhase;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::Sleep;

/// A connected socket, plain or TLS.
#[derive(Debug)]
pub enum SocketType {
    Tcp(TcpStream),
    Ssl(tokio_boring::SslStream<TcpStream>),
}

impl SocketType {
    pub fn is_tls(&self) -> bool {
        matches!(self, SocketType::Ssl(_))
    }

    /// ALPN protocol negotiated during the handshake.
    pub fn negotiated_alpn(&self) -> Option<&[u8]> {
        match self {
            SocketType::Tcp(_) => None,
            SocketType::Ssl(s) => s.ssl().selected_alpn_protocol(),
        }
    }
}

impl AsyncRead for SocketType {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            SocketType::Ssl(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketType {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            SocketType::Ssl(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_flush(cx),
            SocketType::Ssl(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            SocketType::Ssl(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Error carried inside an `io::Error` when a socket operation times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoTimeout {
    pub phase: TimeoutPhase,
    pub after: Duration,
}

impl fmt::Display for IoTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} timed out after {:?}", self.phase, self.after)
    }
}

impl std::error::Error for IoTimeout {}

impl From<IoTimeout> for io::Error {
    fn from(t: IoTimeout) -> Self {
        io::Error::new(io::ErrorKind::TimedOut, t)
    }
}

#[derive(Debug, Default)]
struct Armed {
    /// Bumped on every `arm`, so timers started for an earlier request are
    /// never carried over.
    epoch: u64,
    read: Option<Duration>,
    write: Option<Duration>,
    active: bool,
    fired: Option<IoTimeout>,
}

/// Read/write limits shared between a pooled connection and its socket.
///
/// Timers only run while armed, i.e. while a request is in flight. The
/// connection driver keeps a read pending on idle keepalive sockets, and
/// that read must not time out.
#[derive(Debug, Default)]
pub struct IoTimeouts {
    state: Mutex<Armed>,
}

impl IoTimeouts {
    pub fn arm(&self, read: Option<Duration>, write: Option<Duration>) {
        let mut st = self.state.lock();
        st.epoch += 1;
        st.read = read;
        st.write = write;
        st.active = true;
        st.fired = None;
    }

    pub fn disarm(&self) {
        let mut st = self.state.lock();
        st.active = false;
    }

    /// The timeout that fired during the current request, if any.
    pub fn fired(&self) -> Option<IoTimeout> {
        self.state.lock().fired
    }

    fn limit(&self, phase: TimeoutPhase) -> Option<(u64, Duration)> {
        let st = self.state.lock();
        if !st.active {
            return None;
        }
        let limit = match phase {
            TimeoutPhase::Read => st.read,
            TimeoutPhase::Write => st.write,
            _ => None,
        };
        limit.map(|d| (st.epoch, d))
    }

    fn record(&self, timeout: IoTimeout) {
        self.state.lock().fired = Some(timeout);
    }
}

struct Timer {
    epoch: u64,
    sleep: Pin<Box<Sleep>>,
}

/// Socket wrapper enforcing [`IoTimeouts`] on each read and write.
pub struct TimedSocket<S> {
    inner: S,
    timeouts: std::sync::Arc<IoTimeouts>,
    read_timer: Option<Timer>,
    write_timer: Option<Timer>,
}

impl<S> TimedSocket<S> {
    pub fn new(inner: S, timeouts: std::sync::Arc<IoTimeouts>) -> Self {
        Self {
            inner,
            timeouts,
            read_timer: None,
            write_timer: None,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S: fmt::Debug> fmt::Debug for TimedSocket<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedSocket")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

/// Poll the timer for a pending operation, starting it if needed.
fn poll_timer(
    slot: &mut Option<Timer>,
    timeouts: &IoTimeouts,
    phase: TimeoutPhase,
    cx: &mut Context<'_>,
) -> Poll<io::Error> {
    let Some((epoch, limit)) = timeouts.limit(phase) else {
        *slot = None;
        return Poll::Pending;
    };
    if slot.as_ref().map_or(true, |t| t.epoch != epoch) {
        *slot = Some(Timer {
            epoch,
            sleep: Box::pin(tokio::time::sleep(limit)),
        });
    }
    let Some(timer) = slot.as_mut() else {
        return Poll::Pending;
    };
    match timer.sleep.as_mut().poll(cx) {
        Poll::Ready(()) => {
            *slot = None;
            let timeout = IoTimeout {
                phase,
                after: limit,
            };
            timeouts.record(timeout);
            Poll::Ready(timeout.into())
        }
        Poll::Pending => Poll::Pending,
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TimedSocket<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(res) => {
                this.read_timer = None;
                Poll::Ready(res)
            }
            Poll::Pending => {
                poll_timer(&mut this.read_timer, &this.timeouts, TimeoutPhase::Read, cx)
                    .map(Err)
            }
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TimedSocket<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(res) => {
                this.write_timer = None;
                Poll::Ready(res)
            }
            Poll::Pending => {
                poll_timer(&mut this.write_timer, &this.timeouts, TimeoutPhase::Write, cx)
                    .map(Err)
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(res) => {
                this.write_timer = None;
                Poll::Ready(res)
            }
            Poll::Pending => {
                poll_timer(&mut this.write_timer, &this.timeouts, TimeoutPhase::Write, cx)
                    .map(Err)
            }
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Find an [`IoTimeout`] anywhere in an error's source chain.
pub fn find_io_timeout(err: &(dyn std::error::Error + 'static)) -> Option<IoTimeout> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(t) = e.downcast_ref::<IoTimeout>() {
            return Some(*t);
        }
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if let Some(t) = io_err.get_ref().and_then(|i| i.downcast_ref::<IoTimeout>()) {
                return Some(*t);
            }
        }
        current = e.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_read_times_out_only_when_armed() {
        let (client, _server) = duplex(64);
        let timeouts = Arc::new(IoTimeouts::default());
        let mut socket = TimedSocket::new(client, timeouts.clone());

        // Disarmed: a pending read just stays pending.
        let mut buf = [0u8; 8];
        let idle = tokio::time::timeout(Duration::from_millis(50), socket.read(&mut buf)).await;
        assert!(idle.is_err());

        timeouts.arm(Some(Duration::from_millis(20)), None);
        let err = socket.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        let found = find_io_timeout(&err).unwrap();
        assert_eq!(found.phase, TimeoutPhase::Read);
        assert_eq!(timeouts.fired(), Some(found));
    }

    #[tokio::test]
    async fn test_data_resets_read_timer() {
        let (client, mut server) = duplex(64);
        let timeouts = Arc::new(IoTimeouts::default());
        timeouts.arm(Some(Duration::from_millis(200)), None);
        let mut socket = TimedSocket::new(client, timeouts.clone());

        server.write_all(b"hi").await.unwrap();
        let mut buf = [0u8; 2];
        socket.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");
        assert!(timeouts.fired().is_none());
    }

    #[test]
    fn test_find_io_timeout_through_io_error() {
        let err: io::Error = IoTimeout {
            phase: TimeoutPhase::Write,
            after: Duration::from_secs(1),
        }
        .into();
        assert_eq!(
            find_io_timeout(&err).map(|t| t.phase),
            Some(TimeoutPhase::Write)
        );
        let plain = io::Error::new(io::ErrorKind::Other, "boom");
        assert!(find_io_timeout(&plain).is_none());
    }
}
