//! Longest-prefix request routing.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use log::warn;

use crate::server::handler::RequestHandler;

/// Represents a route in the HTTP server.
pub struct Route {
    /// The path prefix to match.
    pub path: String,
    /// The handler answering requests under `path`.
    pub handler: Arc<dyn RequestHandler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("path", &self.path).finish_non_exhaustive()
    }
}

/// Dispatch table from path prefixes to handlers.
///
/// Routes are kept ordered from most to least specific: more `/`-separated
/// segments first, then segment-wise in descending lexicographic order so that
/// `/ab` is tried before `/a`. The root path `/` has no segments and is
/// therefore always the fallback.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every URI starting with `path`.
    ///
    /// Returns `false` if `path` does not start with `/` or is already
    /// registered.
    pub fn register<H: RequestHandler>(&mut self, path: impl Into<String>, handler: H) -> bool {
        self.register_shared(path, Arc::new(handler))
    }

    /// Like [`Router::register`] for a handler that is already shared.
    pub fn register_shared(
        &mut self,
        path: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
    ) -> bool {
        let path = path.into();
        if !path.starts_with('/') {
            warn!("Rejected route {path:?}: paths must start with '/'");
            return false;
        }

        match self
            .routes
            .binary_search_by(|route| specificity(&route.path, &path))
        {
            Ok(_) => {
                warn!("Rejected route {path:?}: already registered");
                false
            }
            Err(index) => {
                self.routes.insert(index, Route { path, handler });
                true
            }
        }
    }

    /// The handler of the most specific route that prefixes `uri`.
    pub fn dispatch(&self, uri: &str) -> Option<&dyn RequestHandler> {
        self.routes
            .iter()
            .find(|route| uri.starts_with(route.path.as_str()))
            .map(|route| route.handler.as_ref())
    }

    /// Registered paths, most specific first.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Orders `a` before `b` when `a` is the more specific path.
fn specificity(a: &str, b: &str) -> Ordering {
    let a_segments = segments(a);
    let b_segments = segments(b);

    b_segments
        .len()
        .cmp(&a_segments.len())
        .then_with(|| b_segments.cmp(&a_segments))
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.cmp(b))
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}
