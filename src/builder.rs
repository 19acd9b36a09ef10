//! Extension trait for `tower::ServiceBuilder`.

use crate::{
    policy::TimeoutPolicy, route::RouteTimeoutLayer, service::TimeoutLayer,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_layer::Stack;

mod sealed {
    #[allow(unreachable_pub)]
    pub trait Sealed<T> {}
    impl<L> Sealed<L> for tower::ServiceBuilder<L> {}
}

/// Extension trait that adds timeout middleware methods to
/// [`tower::ServiceBuilder`].
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use http::{Request, Response};
/// use http_body_util::Full;
/// use std::{convert::Infallible, time::Duration};
/// use tower::ServiceBuilder;
/// use tower_request_timeout::ServiceBuilderExt;
///
/// async fn handle(_: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
///     Ok(Response::new(Full::from("done")))
/// }
///
/// let svc = ServiceBuilder::new()
///     .request_timeout(Duration::from_secs(30))
///     .service_fn(handle);
/// # drop(svc);
/// ```
pub trait ServiceBuilderExt<L>: sealed::Sealed<L> + Sized {
    /// Bound the time every request may spend in the wrapped stack.
    ///
    /// See [`crate::service`] for more details.
    fn request_timeout(self, timeout: Duration) -> ServiceBuilder<Stack<TimeoutLayer, L>>;

    /// Like [`request_timeout`], with a fully configured [`TimeoutPolicy`].
    ///
    /// [`request_timeout`]: ServiceBuilderExt::request_timeout
    fn request_timeout_with_policy(
        self,
        policy: TimeoutPolicy,
    ) -> ServiceBuilder<Stack<TimeoutLayer, L>>;

    /// Bound the time requests to a single route may take, overriding any
    /// enclosing timeout for those requests.
    ///
    /// See [`crate::route`] for more details.
    fn route_timeout(self, timeout: Duration) -> ServiceBuilder<Stack<RouteTimeoutLayer, L>>;

    /// Like [`route_timeout`], with a fully configured [`TimeoutPolicy`].
    ///
    /// [`route_timeout`]: ServiceBuilderExt::route_timeout
    fn route_timeout_with_policy(
        self,
        policy: TimeoutPolicy,
    ) -> ServiceBuilder<Stack<RouteTimeoutLayer, L>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn request_timeout(self, timeout: Duration) -> ServiceBuilder<Stack<TimeoutLayer, L>> {
        self.layer(TimeoutLayer::new(timeout))
    }

    fn request_timeout_with_policy(
        self,
        policy: TimeoutPolicy,
    ) -> ServiceBuilder<Stack<TimeoutLayer, L>> {
        self.layer(TimeoutLayer::with_policy(policy))
    }

    fn route_timeout(self, timeout: Duration) -> ServiceBuilder<Stack<RouteTimeoutLayer, L>> {
        self.layer(RouteTimeoutLayer::new(timeout))
    }

    fn route_timeout_with_policy(
        self,
        policy: TimeoutPolicy,
    ) -> ServiceBuilder<Stack<RouteTimeoutLayer, L>> {
        self.layer(RouteTimeoutLayer::with_policy(policy))
    }
}
