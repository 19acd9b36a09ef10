//! Racing a unit of work against a deadline timer.
//!
//! This is the primitive both middleware in this crate are built on. The work
//! and the timer are polled from a single context; whichever finishes first
//! decides the [`Outcome`], and the loser is dropped without its result ever
//! becoming observable.

use pin_project_lite::pin_project;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::{Instant, Sleep};

/// The result of racing a unit of work against a deadline timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The work finished before the deadline and produced this value.
    Completed(T),
    /// The deadline fired first. Carries the time spent on the work before it
    /// was abandoned, which approximates the configured duration.
    TimedOut(Duration),
}

impl<T> Outcome<T> {
    /// Returns `true` if the deadline fired before the work finished.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut(_))
    }

    /// Returns the work's value, if it finished in time.
    pub fn into_completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::TimedOut(_) => None,
        }
    }
}

/// Runs `work`, bounding the time it may take by `timeout`.
///
/// The returned future resolves to [`Outcome::Completed`] with the work's
/// value if it finishes first, or to [`Outcome::TimedOut`] with the measured
/// elapsed time if the deadline fires first. The work is polled before the
/// deadline, so a result that is already available always wins.
///
/// Cancellation is cooperative: once the race resolves the losing future is
/// never polled again and is dropped together with the race.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tower_request_timeout::race::{run_with_timeout, Outcome};
///
/// # #[tokio::main]
/// # async fn main() {
/// let outcome = run_with_timeout(
///     async { tokio::time::sleep(Duration::from_secs(10)).await },
///     Duration::from_millis(10),
/// )
/// .await;
///
/// assert!(outcome.is_timed_out());
/// # }
/// ```
///
/// # Panics
///
/// Panics if `timeout` is zero.
pub fn run_with_timeout<F>(work: F, timeout: Duration) -> Race<F>
where
    F: Future,
{
    assert!(timeout > Duration::ZERO, "timeout duration must be positive");
    Race {
        work,
        deadline: tokio::time::sleep(timeout),
        armed_at: Instant::now(),
    }
}

pin_project! {
    /// Future returned by [`run_with_timeout`].
    pub struct Race<F> {
        #[pin]
        work: F,
        #[pin]
        deadline: Sleep,
        armed_at: Instant,
    }
}

impl<F> Race<F>
where
    F: Future,
{
    // Polls only the work, leaving the deadline untouched. Used when an
    // enclosing timeout has been disarmed by a more specific one.
    pub(crate) fn poll_work(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        self.project().work.poll(cx)
    }
}

impl<F> Future for Race<F>
where
    F: Future,
{
    type Output = Outcome<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if let Poll::Ready(value) = this.work.poll(cx) {
            return Poll::Ready(Outcome::Completed(value));
        }

        if this.deadline.poll(cx).is_ready() {
            return Poll::Ready(Outcome::TimedOut(this.armed_at.elapsed()));
        }

        Poll::Pending
    }
}
