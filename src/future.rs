//! Response future shared by the two timeout middleware.

use crate::{
    policy::TimeoutPolicy,
    race::{Outcome, Race},
    response::TimeoutHandler,
};
use bytes::Bytes;
use http::{request::Parts, Response};
use http_body::Body;
use http_body_util::{combinators::UnsyncBoxBody, BodyExt};
use pin_project_lite::pin_project;
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{ready, Context, Poll},
};

// Ties a timeout registration to the request it guards. A clone travels
// inward through request extensions; a registration closer to the handler
// disarms the enclosing one, so at most one deadline is ever acted upon per
// request. Disarming happens while the service stack is being called, before
// the outer future's first poll.
#[derive(Debug, Clone)]
pub(crate) struct ArmHandle(Arc<AtomicBool>);

impl ArmHandle {
    pub(crate) fn armed() -> Self {
        ArmHandle(Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn disarm(&self) {
        self.0.store(false, Ordering::Release);
    }

    fn is_armed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pin_project! {
    /// Response future for [`Timeout`] and [`RouteTimeout`].
    ///
    /// [`Timeout`]: crate::service::Timeout
    /// [`RouteTimeout`]: crate::route::RouteTimeout
    pub struct ResponseFuture<F, H> {
        #[pin]
        race: Race<F>,
        parts: Parts,
        policy: TimeoutPolicy,
        handler: H,
        armed: ArmHandle,
    }
}

impl<F, H> ResponseFuture<F, H> {
    pub(crate) fn new(
        race: Race<F>,
        parts: Parts,
        policy: TimeoutPolicy,
        handler: H,
        armed: ArmHandle,
    ) -> Self {
        ResponseFuture {
            race,
            parts,
            policy,
            handler,
            armed,
        }
    }
}

impl<F, B, E, H> Future for ResponseFuture<F, H>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: Body<Data = Bytes> + Send + 'static,
    H: TimeoutHandler,
{
    type Output = Result<Response<UnsyncBoxBody<Bytes, B::Error>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        // A more specific timeout has taken over this request; forward the
        // handler's result untouched and let the deadline lapse.
        if !this.armed.is_armed() {
            return this
                .race
                .poll_work(cx)
                .map(|result| result.map(|res| res.map(|body| body.boxed_unsync())));
        }

        match ready!(this.race.poll(cx)) {
            Outcome::Completed(Ok(res)) => {
                Poll::Ready(Ok(res.map(|body| body.boxed_unsync())))
            }
            Outcome::Completed(Err(err)) => Poll::Ready(Err(err)),
            Outcome::TimedOut(elapsed) => {
                tracing::trace!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    timeout_ms = this.policy.timeout.as_millis() as u64,
                    "request exceeded its deadline, synthesizing timeout response"
                );

                let res = this.handler.on_timeout(this.parts, this.policy, elapsed);
                Poll::Ready(Ok(
                    res.map(|body| body.map_err(|err| match err {}).boxed_unsync())
                ))
            }
        }
    }
}
