//! Middleware that bounds the time requests to a single route may take.
//!
//! [`RouteTimeout`] behaves like [`Timeout`] but is meant to wrap one handler
//! rather than the whole stack, and it takes precedence over any enclosing
//! timeout: when a request reaches a route-level registration, the enclosing
//! one is disarmed for that request, so only the route's deadline can fire
//! and only one timeout response is ever synthesized.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use std::{convert::Infallible, time::Duration};
//! use tower::ServiceBuilder;
//! use tower_request_timeout::{RouteTimeoutLayer, TimeoutLayer};
//!
//! async fn handle(_: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
//!     Ok(Response::new(Full::from("done")))
//! }
//!
//! // The stack-wide limit is 30 seconds, but requests routed through this
//! // service are given only two.
//! let svc = ServiceBuilder::new()
//!     .layer(TimeoutLayer::new(Duration::from_secs(30)))
//!     .layer(RouteTimeoutLayer::new(Duration::from_secs(2)))
//!     .service_fn(handle);
//! # drop(svc);
//! ```
//!
//! [`Timeout`]: crate::service::Timeout

use crate::{
    future::{ArmHandle, ResponseFuture},
    policy::TimeoutPolicy,
    race::run_with_timeout,
    response::{DefaultTimeoutHandler, TimeoutHandler},
};
use bytes::Bytes;
use http::{Request, Response};
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use std::{
    task::{Context, Poll},
    time::Duration,
};
use tower_layer::Layer;
use tower_service::Service;

/// Layer that applies the [`RouteTimeout`] middleware to a single route.
///
/// See the [module docs](self) for an example.
#[derive(Debug, Clone)]
pub struct RouteTimeoutLayer<H = DefaultTimeoutHandler> {
    policy: TimeoutPolicy,
    handler: H,
}

impl RouteTimeoutLayer {
    /// Creates a layer that times the route's requests out after `timeout`,
    /// using the default response settings.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero.
    pub fn new(timeout: Duration) -> Self {
        RouteTimeoutLayer::with_policy(TimeoutPolicy::new(timeout))
    }

    /// Creates a layer from a fully configured [`TimeoutPolicy`].
    pub fn with_policy(policy: TimeoutPolicy) -> Self {
        RouteTimeoutLayer {
            policy,
            handler: DefaultTimeoutHandler::new(),
        }
    }
}

impl<H> RouteTimeoutLayer<H> {
    /// Replaces the handler invoked when a request times out.
    ///
    /// The handler's response is returned verbatim; the policy's status,
    /// message and elapsed-time settings do not apply to it.
    pub fn on_timeout<H2>(self, handler: H2) -> RouteTimeoutLayer<H2>
    where
        H2: TimeoutHandler,
    {
        RouteTimeoutLayer {
            policy: self.policy,
            handler,
        }
    }
}

impl<S, H> Layer<S> for RouteTimeoutLayer<H>
where
    H: Clone,
{
    type Service = RouteTimeout<S, H>;

    fn layer(&self, inner: S) -> Self::Service {
        RouteTimeout {
            inner,
            policy: self.policy.clone(),
            handler: self.handler.clone(),
        }
    }
}

/// Middleware that bounds the time requests to a single route may take,
/// overriding any enclosing timeout for those requests.
///
/// See the [module docs](self) for an example.
#[derive(Debug, Clone)]
pub struct RouteTimeout<S, H = DefaultTimeoutHandler> {
    inner: S,
    policy: TimeoutPolicy,
    handler: H,
}

impl<S> RouteTimeout<S> {
    /// Creates a middleware that times the route's requests out after
    /// `timeout`, using the default response settings.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero.
    pub fn new(inner: S, timeout: Duration) -> Self {
        RouteTimeout::with_policy(inner, TimeoutPolicy::new(timeout))
    }

    /// Creates a middleware from a fully configured [`TimeoutPolicy`].
    pub fn with_policy(inner: S, policy: TimeoutPolicy) -> Self {
        RouteTimeout {
            inner,
            policy,
            handler: DefaultTimeoutHandler::new(),
        }
    }

    /// Returns a new [`Layer`] that wraps services with a `RouteTimeout`
    /// middleware.
    ///
    /// [`Layer`]: tower_layer::Layer
    pub fn layer(timeout: Duration) -> RouteTimeoutLayer {
        RouteTimeoutLayer::new(timeout)
    }
}

impl<S, H> RouteTimeout<S, H> {
    define_inner_service_accessors!();

    /// Replaces the handler invoked when a request times out.
    ///
    /// The handler's response is returned verbatim; the policy's status,
    /// message and elapsed-time settings do not apply to it.
    pub fn on_timeout<H2>(self, handler: H2) -> RouteTimeout<S, H2>
    where
        H2: TimeoutHandler,
    {
        RouteTimeout {
            inner: self.inner,
            policy: self.policy,
            handler,
        }
    }
}

impl<S, H, ReqBody, ResBody> Service<Request<ReqBody>> for RouteTimeout<S, H>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Body<Data = Bytes> + Send + 'static,
    H: TimeoutHandler + Clone,
{
    type Response = Response<UnsyncBoxBody<Bytes, ResBody::Error>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, H>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let (mut parts, body) = req.into_parts();

        // Take over from any enclosing timeout. The registration closest to
        // the handler is authoritative for this request; the outer deadline
        // must not fire a second, competing timeout.
        if let Some(enclosing) = parts.extensions.get::<ArmHandle>() {
            enclosing.disarm();
        }

        let armed = ArmHandle::armed();
        parts.extensions.insert(armed.clone());

        let head = parts.clone();
        let req = Request::from_parts(parts, body);

        ResponseFuture::new(
            run_with_timeout(self.inner.call(req), self.policy.timeout),
            head,
            self.policy.clone(),
            self.handler.clone(),
            armed,
        )
    }
}
