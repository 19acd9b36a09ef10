//! Configuration for a timeout registration.

use http::StatusCode;
use std::{borrow::Cow, time::Duration};

/// Duration a wrapped handler is given before timing out, unless configured
/// otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Message carried in the `detail` field of synthesized responses, unless
/// configured otherwise.
pub const DEFAULT_MESSAGE: &str = "Request processing time exceeded limit";

/// How a timeout registration behaves: the duration after which the deadline
/// fires and the shape of the synthesized response.
///
/// A policy is built once, when a layer is registered, and is immutable for
/// the lifetime of that registration.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use std::time::Duration;
/// use tower_request_timeout::TimeoutPolicy;
///
/// let policy = TimeoutPolicy::new(Duration::from_secs(10))
///     .status(StatusCode::SERVICE_UNAVAILABLE)
///     .message("upstream took too long")
///     .include_elapsed_time(false);
/// # drop(policy);
/// ```
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    pub(crate) timeout: Duration,
    pub(crate) status: StatusCode,
    pub(crate) message: Cow<'static, str>,
    pub(crate) include_elapsed_time: bool,
}

impl TimeoutPolicy {
    /// Creates a policy that times requests out after `timeout`, responding
    /// with `504 Gateway Timeout`, [`DEFAULT_MESSAGE`] and the measured
    /// processing time included.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero.
    pub fn new(timeout: Duration) -> Self {
        assert!(timeout > Duration::ZERO, "timeout duration must be positive");
        TimeoutPolicy {
            timeout,
            status: StatusCode::GATEWAY_TIMEOUT,
            message: Cow::Borrowed(DEFAULT_MESSAGE),
            include_elapsed_time: true,
        }
    }

    /// Sets the status code of synthesized responses.
    ///
    /// Defaults to `504 Gateway Timeout`; `503 Service Unavailable` is the
    /// other reasonable choice.
    ///
    /// # Panics
    ///
    /// Panics if `status` is `408 Request Timeout`. Browsers and many HTTP
    /// clients transparently retry requests answered with 408, which turns a
    /// slow endpoint into a retry storm.
    pub fn status(mut self, status: StatusCode) -> Self {
        assert!(
            status != StatusCode::REQUEST_TIMEOUT,
            "HTTP 408 should not be used for synthesized timeout responses \
             since clients automatically retry requests that receive it; \
             use 504 or 503 instead"
        );
        self.status = status;
        self
    }

    /// Sets the message carried in the `detail` field of synthesized
    /// responses.
    pub fn message<M>(mut self, message: M) -> Self
    where
        M: Into<Cow<'static, str>>,
    {
        self.message = message.into();
        self
    }

    /// Sets whether synthesized responses report how long the request was
    /// processed before the deadline fired. Enabled by default.
    pub fn include_elapsed_time(mut self, include: bool) -> Self {
        self.include_elapsed_time = include;
        self
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy::new(DEFAULT_TIMEOUT)
    }
}
