//! Middleware that bounds the time every request may spend in the wrapped
//! service.
//!
//! If the inner service does not produce a response within the configured
//! duration, the request is abandoned and a synthesized response is returned
//! in its place, so a slow handler never appears to the client as a hung
//! connection. Errors from the inner service are not affected and propagate
//! unchanged.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use http_body_util::Full;
//! use std::{convert::Infallible, time::Duration};
//! use tower::{ServiceBuilder, ServiceExt};
//! use tower_request_timeout::TimeoutLayer;
//!
//! async fn handle(_: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
//!     tokio::time::sleep(Duration::from_secs(10)).await;
//!     Ok(Response::new(Full::from("done")))
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let svc = ServiceBuilder::new()
//!     .layer(TimeoutLayer::new(Duration::from_millis(50)))
//!     .service_fn(handle);
//!
//! let res = svc.oneshot(Request::new(Full::from(""))).await.unwrap();
//! assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
//! # }
//! ```

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

/// Layer that applies the [`Timeout`] middleware with one shared
/// [`TimeoutPolicy`] for every request passing through the stack.
///
/// See the [module docs](self) for an example.
#[derive(Debug, Clone)]
pub struct TimeoutLayer<H = DefaultTimeoutHandler> {
    policy: TimeoutPolicy,
    handler: H,
}

impl TimeoutLayer {
    /// Creates a layer that times requests out after `timeout`, using the
    /// default response settings.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero.
    pub fn new(timeout: Duration) -> Self {
        TimeoutLayer::with_policy(TimeoutPolicy::new(timeout))
    }

    /// Creates a layer from a fully configured [`TimeoutPolicy`].
    pub fn with_policy(policy: TimeoutPolicy) -> Self {
        TimeoutLayer {
            policy,
            handler: DefaultTimeoutHandler::new(),
        }
    }
}

impl<H> TimeoutLayer<H> {
    /// Replaces the handler invoked when a request times out.
    ///
    /// The handler's response is returned verbatim; the policy's status,
    /// message and elapsed-time settings do not apply to it.
    pub fn on_timeout<H2>(self, handler: H2) -> TimeoutLayer<H2>
    where
        H2: TimeoutHandler,
    {
        TimeoutLayer {
            policy: self.policy,
            handler,
        }
    }
}

impl<S, H> Layer<S> for TimeoutLayer<H>
where
    H: Clone,
{
    type Service = Timeout<S, H>;

    fn layer(&self, inner: S) -> Self::Service {
        Timeout {
            inner,
            policy: self.policy.clone(),
            handler: self.handler.clone(),
        }
    }
}

/// Middleware that bounds the time every request may spend in the wrapped
/// service.
///
/// See the [module docs](self) for an example.
#[derive(Debug, Clone)]
pub struct Timeout<S, H = DefaultTimeoutHandler> {
    inner: S,
    policy: TimeoutPolicy,
    handler: H,
}

impl<S> Timeout<S> {
    /// Creates a middleware that times requests out after `timeout`, using
    /// the default response settings.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero.
    pub fn new(inner: S, timeout: Duration) -> Self {
        Timeout::with_policy(inner, TimeoutPolicy::new(timeout))
    }

    /// Creates a middleware from a fully configured [`TimeoutPolicy`].
    pub fn with_policy(inner: S, policy: TimeoutPolicy) -> Self {
        Timeout {
            inner,
            policy,
            handler: DefaultTimeoutHandler::new(),
        }
    }

    /// Returns a new [`Layer`] that wraps services with a `Timeout`
    /// middleware.
    ///
    /// [`Layer`]: tower_layer::Layer
    pub fn layer(timeout: Duration) -> TimeoutLayer {
        TimeoutLayer::new(timeout)
    }
}

impl<S, H> Timeout<S, H> {
    define_inner_service_accessors!();

    /// Replaces the handler invoked when a request times out.
    ///
    /// The handler's response is returned verbatim; the policy's status,
    /// message and elapsed-time settings do not apply to it.
    pub fn on_timeout<H2>(self, handler: H2) -> Timeout<S, H2>
    where
        H2: TimeoutHandler,
    {
        Timeout {
            inner: self.inner,
            policy: self.policy,
            handler,
        }
    }
}

impl<S, H, ReqBody, ResBody> Service<Request<ReqBody>> for Timeout<S, H>
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

        let armed = ArmHandle::armed();
        parts.extensions.insert(armed.clone());

        // The head is kept around so timeout handlers can inspect the
        // request their response replaces.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{body_text, json_body};
    use http::{header, request::Parts, StatusCode};
    use http_body_util::Full;
    use std::convert::Infallible;
    use tokio::time::{sleep, Instant};
    use tower::{ServiceBuilder, ServiceExt};

    async fn hello(_: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
        sleep(Duration::from_millis(100)).await;
        Ok(Response::new(Full::from(r#"{"message": "Hello World"}"#)))
    }

    async fn sleepy(_: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
        sleep(Duration::from_secs(10)).await;
        Ok(Response::new(Full::from("too late")))
    }

    #[tokio::test(start_paused = true)]
    async fn handler_finishing_in_time_passes_through_unchanged() {
        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(5)))
            .service_fn(hello);

        let started = Instant::now();
        let res = svc.oneshot(Request::new(Full::from(""))).await.unwrap();

        // Latency tracks the handler, not the deadline.
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res.into_body()).await, r#"{"message": "Hello World"}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_gets_a_synthesized_response() {
        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(5)))
            .service_fn(sleepy);

        let started = Instant::now();
        let res = svc.oneshot(Request::new(Full::from(""))).await.unwrap();

        let total = started.elapsed();
        assert!(total >= Duration::from_secs(5) && total < Duration::from_secs(6));

        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");

        let body = json_body(res.into_body()).await;
        assert_eq!(body["detail"], "Request processing time exceeded limit");
        assert_eq!(body["timeout_seconds"], 5.0);
        let processing_time = body["processing_time"].as_f64().unwrap();
        assert!((5.0..5.1).contains(&processing_time));
    }

    #[tokio::test(start_paused = true)]
    async fn policy_settings_shape_the_response() {
        let policy = TimeoutPolicy::new(Duration::from_secs(2))
            .message("Gateway timeout")
            .include_elapsed_time(false);
        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::with_policy(policy))
            .service_fn(sleepy);

        let res = svc.oneshot(Request::new(Full::from(""))).await.unwrap();

        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = json_body(res.into_body()).await;
        assert_eq!(body["detail"], "Gateway timeout");
        assert_eq!(body["timeout_seconds"], 2.0);
        assert!(body.get("processing_time").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn custom_handler_response_is_used_verbatim() {
        let layer = TimeoutLayer::new(Duration::from_millis(500)).on_timeout(
            |request: &Parts, elapsed: Duration| {
                let body = serde_json::json!({
                    "error": "Custom timeout",
                    "path": request.uri.path(),
                    "time": elapsed.as_secs_f64(),
                });
                let mut res = Response::new(Full::from(body.to_string()));
                *res.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
                res.headers_mut().insert(
                    "x-timeout-reason",
                    http::HeaderValue::from_static("processing-timeout"),
                );
                res
            },
        );
        let svc = ServiceBuilder::new().layer(layer).service_fn(sleepy);

        let req = Request::builder()
            .uri("/test")
            .body(Full::from(""))
            .unwrap();
        let res = svc.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.headers()["x-timeout-reason"], "processing-timeout");
        let body = json_body(res.into_body()).await;
        assert_eq!(body["error"], "Custom timeout");
        assert_eq!(body["path"], "/test");
        assert!(body["time"].as_f64().unwrap() >= 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn handler_errors_propagate_unchanged() {
        #[derive(Debug, PartialEq)]
        struct AppError;

        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(5)))
            .service_fn(|_: Request<Full<Bytes>>| async {
                sleep(Duration::from_millis(10)).await;
                Err::<Response<Full<Bytes>>, _>(AppError)
            });

        let err = svc.oneshot(Request::new(Full::from(""))).await.unwrap_err();
        assert_eq!(err, AppError);
    }

    #[tokio::test(start_paused = true)]
    async fn outcome_class_is_stable_across_repetitions() {
        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(1)))
            .service_fn(sleepy);

        for _ in 0..3 {
            let res = svc
                .clone()
                .oneshot(Request::new(Full::from("")))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_race_independently() {
        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(1)))
            .service_fn(|req: Request<Full<Bytes>>| async move {
                let millis: u64 = req.uri().path().trim_start_matches('/').parse().unwrap();
                sleep(Duration::from_millis(millis)).await;
                Ok::<_, Infallible>(Response::new(Full::from("ok")))
            });

        let request = |millis: u64| {
            Request::builder()
                .uri(format!("/{}", millis))
                .body(Full::from(""))
                .unwrap()
        };

        let (fast, also_fast, slow) = tokio::join!(
            svc.clone().oneshot(request(100)),
            svc.clone().oneshot(request(500)),
            svc.clone().oneshot(request(2000)),
        );

        assert_eq!(fast.unwrap().status(), StatusCode::OK);
        assert_eq!(also_fast.unwrap().status(), StatusCode::OK);
        assert_eq!(slow.unwrap().status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
