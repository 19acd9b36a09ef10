//! Tower middleware that bounds how long a request may be processed.
//!
//! A wrapped service is raced against a deadline timer: whichever finishes
//! first decides the response. If the handler wins, its response (or error)
//! is passed through unchanged. If the deadline fires first the request is
//! abandoned and a synthesized response is returned in its place, so a slow
//! handler surfaces to clients as a well-formed error instead of a hung
//! connection.
//!
//! The synthesized response defaults to `504 Gateway Timeout` with a JSON
//! body:
//!
//! ```json
//! {
//!     "detail": "Request processing time exceeded limit",
//!     "timeout_seconds": 5.0,
//!     "processing_time": 5.002
//! }
//! ```
//!
//! Status code, message and the `processing_time` field are configurable via
//! [`TimeoutPolicy`], and the whole construction can be replaced with a
//! custom [`TimeoutHandler`].
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
//!
//! # Stack-wide and per-route timeouts
//!
//! [`TimeoutLayer`] applies one policy to every request passing through the
//! stack. [`RouteTimeoutLayer`] wraps a single route and takes precedence:
//! for requests that reach it, the enclosing stack-wide deadline is disarmed
//! and only the route's policy decides if and how the request times out. At
//! most one timeout response is ever synthesized per request. See
//! [`route`] for details.
//!
//! # Cancellation
//!
//! Cancellation of the losing side is cooperative. The abandoned handler
//! future is dropped and never polled again; work it may have spawned
//! elsewhere can run to completion, but its result is discarded and is never
//! delivered to the client.

#![warn(
    clippy::all,
    clippy::dbg_macro,
    clippy::todo,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::mem_forget,
    clippy::unused_self,
    clippy::filter_map_next,
    clippy::needless_continue,
    clippy::needless_borrow,
    clippy::match_wildcard_for_single_variants,
    clippy::if_let_mutex,
    clippy::await_holding_lock,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::lossy_float_literal,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::fn_params_excessive_bools,
    clippy::exit,
    clippy::inefficient_to_string,
    clippy::linkedlist,
    clippy::macro_use_imports,
    clippy::option_option,
    clippy::verbose_file_reads,
    clippy::unnested_or_patterns,
    rust_2018_idioms,
    future_incompatible,
    nonstandard_style,
    missing_docs
)]
#![deny(unreachable_pub)]
#![allow(elided_lifetimes_in_paths, clippy::type_complexity)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(test, allow(clippy::float_cmp))]

#[macro_use]
mod macros;

pub mod builder;
pub mod future;
pub mod policy;
pub mod race;
pub mod response;
pub mod route;
pub mod service;

#[cfg(test)]
mod test_helpers;

#[doc(inline)]
pub use self::{
    builder::ServiceBuilderExt,
    policy::{TimeoutPolicy, DEFAULT_MESSAGE, DEFAULT_TIMEOUT},
    race::{run_with_timeout, Outcome, Race},
    response::{timeout_response, DefaultTimeoutHandler, TimeoutHandler},
    route::{RouteTimeout, RouteTimeoutLayer},
    service::{Timeout, TimeoutLayer},
};
