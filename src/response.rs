//! Synthesizing the response returned when a request times out.

use crate::policy::TimeoutPolicy;
use bytes::Bytes;
use http::{header, request::Parts, HeaderValue, Response};
use http_body_util::Full;
use std::time::Duration;

/// Builds the structured timeout response described by `policy`.
///
/// The body is a JSON object with a `detail` field holding the policy's
/// message and a `timeout_seconds` field holding the configured duration.
/// When the policy includes elapsed time, a `processing_time` field reports
/// how long the request ran before the deadline fired, rounded to
/// milliseconds.
///
/// This constructs and returns a value; it does not log and has no other
/// side effects.
pub fn timeout_response(policy: &TimeoutPolicy, elapsed: Duration) -> Response<Full<Bytes>> {
    let mut payload = serde_json::json!({
        "detail": &*policy.message,
        "timeout_seconds": policy.timeout.as_secs_f64(),
    });
    if policy.include_elapsed_time {
        payload["processing_time"] = serde_json::json!(round_to_millis(elapsed));
    }

    let mut res = Response::new(Full::from(payload.to_string()));
    *res.status_mut() = policy.status;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    res
}

fn round_to_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}

/// Produces the response returned to the client when a request times out.
///
/// The default implementation, [`DefaultTimeoutHandler`], builds the
/// structured response described by the [`TimeoutPolicy`]. Supplying a custom
/// handler replaces that construction entirely: whatever the handler returns
/// is sent verbatim, so it is responsible for the status code, headers and
/// body.
///
/// The trait is implemented for closures taking the request head and the
/// elapsed processing time:
///
/// ```
/// use bytes::Bytes;
/// use http::{request::Parts, Response, StatusCode};
/// use http_body_util::Full;
/// use std::time::Duration;
/// use tower_request_timeout::TimeoutLayer;
///
/// let layer = TimeoutLayer::new(Duration::from_secs(5)).on_timeout(
///     |request: &Parts, elapsed: Duration| {
///         let body = format!(
///             "{} {} gave up after {:?}",
///             request.method, request.uri, elapsed,
///         );
///         let mut res = Response::new(Full::from(body));
///         *res.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
///         res
///     },
/// );
/// # drop(layer);
/// ```
pub trait TimeoutHandler {
    /// Called with the head of the timed out request, the policy of the
    /// registration whose deadline fired, and the time the request spent
    /// processing before it was abandoned.
    fn on_timeout(
        &mut self,
        request: &Parts,
        policy: &TimeoutPolicy,
        elapsed: Duration,
    ) -> Response<Full<Bytes>>;
}

impl<F> TimeoutHandler for F
where
    F: FnMut(&Parts, Duration) -> Response<Full<Bytes>>,
{
    fn on_timeout(
        &mut self,
        request: &Parts,
        _policy: &TimeoutPolicy,
        elapsed: Duration,
    ) -> Response<Full<Bytes>> {
        self(request, elapsed)
    }
}

/// [`TimeoutHandler`] that builds the structured response described by the
/// policy, via [`timeout_response`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTimeoutHandler {
    _priv: (),
}

impl DefaultTimeoutHandler {
    /// Creates a new `DefaultTimeoutHandler`.
    pub fn new() -> Self {
        DefaultTimeoutHandler { _priv: () }
    }
}

impl TimeoutHandler for DefaultTimeoutHandler {
    fn on_timeout(
        &mut self,
        _request: &Parts,
        policy: &TimeoutPolicy,
        elapsed: Duration,
    ) -> Response<Full<Bytes>> {
        timeout_response(policy, elapsed)
    }
}
