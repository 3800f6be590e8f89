use async_io::Timer;
use futures_util::future;
use pin_utils::pin_mut;
use std::future::Future;
use std::io;
use std::time::Instant;

/// Runs `f` against an absolute deadline.
///
/// The transfer engine restarts the receive future after dropping a bogus
/// datagram; anchoring the timer to a deadline keeps ignored packets from
/// extending the retransmission interval.
pub async fn io_timeout_at<T>(
    deadline: Instant,
    f: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    let timer = async move {
        Timer::at(deadline).await;
        Err(io::ErrorKind::TimedOut.into())
    };

    pin_mut!(f);
    pin_mut!(timer);

    future::select(f, timer).await.factor_first().0
}

#[cfg(test)]
pub async fn io_timeout<T>(
    dur: std::time::Duration,
    f: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    io_timeout_at(Instant::now() + dur, f).await
}
