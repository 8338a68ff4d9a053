//! Request handler capability.

use crate::message::{Request, Response};

/// Anything that can answer a request.
///
/// Handlers never fail: every failure is expressed as a response with a
/// suitable status code and reason phrase. Implementations are shared between
/// connection tasks and must therefore be `Send + Sync`.
///
/// Closures taking `&Request` and returning a [`Response`] implement this
/// trait, so small handlers need no dedicated type.
pub trait RequestHandler: Send + Sync + 'static {
    /// Produce the response for `request`.
    fn handle_request(&self, request: &Request) -> Response;
}

impl<F> RequestHandler for F
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    fn handle_request(&self, request: &Request) -> Response {
        self(request)
    }
}
